//! Implémentation du trait MediaExt pour radioserver::Server

use crate::api_rest::create_router;
use crate::library::MediaLibrary;
use crate::server_ext::{MediaExt, MediaState};
use anyhow::Result;
use radioserver::Server;
use tracing::info;

impl MediaExt for Server {
    async fn init_media(&mut self, library: MediaLibrary) -> Result<()> {
        info!(
            http_dir = %library.http_dir().display(),
            music_dir = %library.music_dir().display(),
            "Media routes available at /background, /transition.mp3, /webm.html, /upload/bump"
        );
        let router = create_router(MediaState::new(library));
        self.add_router("/", router).await;
        Ok(())
    }
}
