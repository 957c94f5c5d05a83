//! Channel registry
//!
//! The registry is loaded once from the channel file and never changes
//! afterwards. Its iteration order is the order of the file, which is also
//! the order used to break ties between live channels.
//!
//! ```json
//! {
//!   "channels": [
//!     {"name": "everything", "host": "localhost", "port": 6600},
//!     {"name": "swing", "label": "Swing & Jazz", "host": "localhost", "port": 6602}
//!   ]
//! }
//! ```

use crate::error::ConfigurationError;
use radiompd::Endpoint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One radio channel and the MPD instance sequencing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Channel {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip)]
    pub endpoint: Endpoint,
}

impl Channel {
    pub fn new(name: impl Into<String>, endpoint: Endpoint) -> Self {
        Self {
            name: name.into(),
            label: None,
            endpoint,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Human-friendly name, falling back to the identifier
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Deserialize)]
struct ChannelFile {
    channels: Vec<ChannelEntry>,
}

#[derive(Deserialize)]
struct ChannelEntry {
    name: String,
    host: String,
    port: u16,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

/// Known channels, in configuration order, with O(1) lookup by name
#[derive(Debug, Clone)]
pub struct ChannelRegistry {
    channels: Vec<Channel>,
    index: HashMap<String, usize>,
}

impl ChannelRegistry {
    /// Loads and validates a channel file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigurationError> {
        let file: ChannelFile = serde_json::from_str(content)?;
        let channels = file
            .channels
            .into_iter()
            .map(|entry| {
                let mut endpoint = Endpoint::new(entry.host, entry.port);
                endpoint.password = entry.password;
                Channel {
                    name: entry.name,
                    label: entry.label,
                    endpoint,
                }
            })
            .collect();
        Self::new(channels)
    }

    /// Builds a registry, rejecting unusable channel definitions
    pub fn new(channels: Vec<Channel>) -> Result<Self, ConfigurationError> {
        if channels.is_empty() {
            return Err(ConfigurationError::invalid("no channel defined"));
        }

        let mut index = HashMap::with_capacity(channels.len());
        for (position, channel) in channels.iter().enumerate() {
            validate(channel)?;
            if index.insert(channel.name.clone(), position).is_some() {
                return Err(ConfigurationError::invalid(format!(
                    "channel {:?} is defined twice",
                    channel.name
                )));
            }
        }

        Ok(Self { channels, index })
    }

    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.index.get(name).map(|&position| &self.channels[position])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Channels in configuration order
    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

// Names end up in URLs (`/playlist/<name>.json`)
fn validate(channel: &Channel) -> Result<(), ConfigurationError> {
    let name = &channel.name;
    if name.trim().is_empty() {
        return Err(ConfigurationError::invalid("channel with an empty name"));
    }
    if name.contains('/') || name.contains('.') {
        return Err(ConfigurationError::invalid(format!(
            "channel name {:?} must not contain '/' or '.'",
            name
        )));
    }
    if channel.endpoint.host.trim().is_empty() {
        return Err(ConfigurationError::invalid(format!(
            "channel {:?} has an empty host",
            name
        )));
    }
    if channel.endpoint.port == 0 {
        return Err(ConfigurationError::invalid(format!(
            "channel {:?} has port 0",
            name
        )));
    }
    Ok(())
}
