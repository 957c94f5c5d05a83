//! Implémentation du trait MonitorExt pour radioserver::Server

use crate::api_rest::create_router;
use crate::server_ext::{MonitorExt, MonitorState};
use anyhow::Result;
use radioserver::Server;
use tracing::info;

impl MonitorExt for Server {
    async fn init_monitor(&mut self, state: MonitorState) -> Result<()> {
        let router = create_router(state);
        self.add_router("/", router).await;

        info!("Channel monitor API available at /playlist/{{channel}}.json, /live.json, /channels.json");
        Ok(())
    }
}
