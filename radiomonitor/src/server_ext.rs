//! Extension radioserver pour le moniteur de chaînes
//!
//! Ce module fournit un trait d'extension pour ajouter l'API du moniteur
//! à un `radioserver::Server`, sans que radioserver dépende de radiomonitor.

use crate::cache::PlaylistCache;
use crate::liveness::LiveSignal;
use crate::refresh::Monitor;
use anyhow::Result;
use radiompd::PlayerConnector;
use std::sync::Arc;

/// État partagé par les handlers du moniteur
///
/// Ne contient que des vues en lecture : le cache et le signal de direct.
#[derive(Clone)]
pub struct MonitorState {
    pub cache: Arc<PlaylistCache>,
    pub live: LiveSignal,
}

impl MonitorState {
    pub fn new(cache: Arc<PlaylistCache>, live: LiveSignal) -> Self {
        Self { cache, live }
    }

    pub fn from_monitor<C: PlayerConnector>(monitor: &Monitor<C>) -> Self {
        Self::new(monitor.cache(), monitor.live_signal())
    }
}

/// Trait pour étendre radioserver avec l'API du moniteur
///
/// # Exemple
///
/// ```rust,no_run
/// use radiomonitor::{ChannelRegistry, Monitor, MonitorExt, MonitorSettings, MonitorState};
/// use radiompd::MpdConnector;
/// use radioserver::ServerBuilder;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let registry = Arc::new(ChannelRegistry::load("channels.json")?);
///     let monitor = Monitor::new(MpdConnector::default(), registry, MonitorSettings::default());
///
///     let mut server = ServerBuilder::new("radio", 8080).build();
///     server.init_monitor(MonitorState::from_monitor(&monitor)).await?;
///     server.start().await?;
///     server.wait().await;
///     Ok(())
/// }
/// ```
pub trait MonitorExt {
    /// Enregistre les routes du moniteur à la racine du serveur
    ///
    /// # Routes enregistrées
    ///
    /// - `GET /playlist/{channel}.json` - Fenêtre de playlist d'une chaîne
    /// - `GET /live.json` - Chaîne en direct
    /// - `GET /channels.json` - État de chaque chaîne
    async fn init_monitor(&mut self, state: MonitorState) -> Result<()>;
}
