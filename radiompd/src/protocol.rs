//! Line-level parsing of the MPD text protocol
//!
//! A reply is a sequence of `key: value` lines terminated by `OK`, or by a
//! single `ACK [code@index] {command} message` line on failure.

use crate::error::{Error, Result};
use crate::models::{PlayState, PlayerStatus, QueueItem};

/// Prefix of the banner MPD sends right after accepting a connection
pub const GREETING_PREFIX: &str = "OK MPD ";

/// ACK code for an argument MPD rejected (e.g. `Bad song index`)
pub const ACK_ERROR_ARG: u32 = 2;

/// Terminal line of a reply
#[derive(Debug, PartialEq, Eq)]
pub enum Terminator {
    Ok,
    Ack {
        code: u32,
        command: String,
        message: String,
    },
}

/// Extracts the server version from the greeting line
pub fn parse_greeting(line: &str) -> Result<String> {
    line.strip_prefix(GREETING_PREFIX)
        .map(|version| version.trim().to_string())
        .ok_or_else(|| Error::protocol(format!("unexpected greeting {:?}", line)))
}

/// Recognises `OK` and `ACK ...` lines
pub fn parse_terminator(line: &str) -> Option<Terminator> {
    if line == "OK" {
        return Some(Terminator::Ok);
    }
    line.strip_prefix("ACK ").map(parse_ack)
}

// ACK [50@0] {play} song doesn't exist: "10240"
fn parse_ack(rest: &str) -> Terminator {
    let code = rest
        .strip_prefix('[')
        .and_then(|s| s.split('@').next())
        .and_then(|c| c.parse().ok())
        .unwrap_or(0);
    let command = rest
        .find('{')
        .and_then(|start| {
            rest[start + 1..]
                .find('}')
                .map(|end| rest[start + 1..start + 1 + end].to_string())
        })
        .unwrap_or_default();
    let message = rest
        .find("} ")
        .map(|i| rest[i + 2..].to_string())
        .unwrap_or_else(|| rest.to_string());

    Terminator::Ack {
        code,
        command,
        message,
    }
}

/// Splits a `key: value` line, lower-casing the key
pub fn parse_pair(line: &str) -> Result<(String, String)> {
    let (key, value) = line
        .split_once(": ")
        .ok_or_else(|| Error::protocol(format!("expected `key: value`, got {:?}", line)))?;
    Ok((key.to_ascii_lowercase(), value.to_string()))
}

/// Groups `playlistinfo` pairs into queue items, one per `file` key
pub fn split_items(pairs: Vec<(String, String)>) -> Result<Vec<QueueItem>> {
    let mut items = Vec::new();
    let mut current: Vec<(String, String)> = Vec::new();

    for (key, value) in pairs {
        if key == "file" && !current.is_empty() {
            items.push(QueueItem::new(std::mem::take(&mut current)));
        } else if current.is_empty() && key != "file" {
            return Err(Error::protocol(format!(
                "queue item does not start with `file` (got `{}`)",
                key
            )));
        }
        current.push((key, value));
    }

    if !current.is_empty() {
        items.push(QueueItem::new(current));
    }

    Ok(items)
}

/// Builds a `PlayerStatus` from the pairs of a `status` reply
pub fn parse_status(pairs: &[(String, String)]) -> Result<PlayerStatus> {
    let field = |name: &str| {
        pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    };

    let playlist_length = field("playlistlength")
        .ok_or_else(|| Error::protocol("status without playlistlength"))?
        .parse::<usize>()
        .map_err(|e| Error::protocol(format!("invalid playlistlength: {}", e)))?;

    let state = match field("state") {
        Some(value) => PlayState::parse(value)
            .ok_or_else(|| Error::protocol(format!("unknown player state {:?}", value)))?,
        None => PlayState::Stop,
    };

    let song = field("song")
        .map(|value| {
            value
                .parse::<usize>()
                .map_err(|e| Error::protocol(format!("invalid song position: {}", e)))
        })
        .transpose()?;

    let elapsed = match field("elapsed") {
        Some(value) => {
            let secs = value
                .parse::<f64>()
                .map_err(|e| Error::protocol(format!("invalid elapsed time: {}", e)))?;
            if secs.is_finite() && secs > 0.0 {
                secs
            } else {
                0.0
            }
        }
        None => 0.0,
    };

    Ok(PlayerStatus {
        state,
        song,
        playlist_length,
        elapsed,
    })
}

/// Quotes a command argument
pub fn quote(arg: &str) -> String {
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
