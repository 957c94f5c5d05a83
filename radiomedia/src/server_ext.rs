//! Extension radioserver pour les médias de la radio
//!
//! Ce module fournit un trait d'extension pour ajouter les routes des
//! médias à un `radioserver::Server`.

use crate::library::MediaLibrary;
use anyhow::Result;
use std::sync::Arc;

/// État partagé par les handlers des médias
#[derive(Clone)]
pub struct MediaState {
    pub library: Arc<MediaLibrary>,
}

impl MediaState {
    pub fn new(library: MediaLibrary) -> Self {
        Self {
            library: Arc::new(library),
        }
    }
}

/// Trait pour étendre radioserver avec les routes des médias
///
/// # Exemple
///
/// ```rust,no_run
/// use radiomedia::{MediaExt, MediaLibrary};
/// use radioserver::ServerBuilder;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let mut server = ServerBuilder::new("radio", 8080).build();
///     server
///         .init_media(MediaLibrary::new("/srv/http", "/srv/radio/music"))
///         .await?;
///     server.start().await?;
///     server.wait().await;
///     Ok(())
/// }
/// ```
pub trait MediaExt {
    /// Enregistre les routes des médias à la racine du serveur
    ///
    /// # Routes enregistrées
    ///
    /// - `GET /background` - Fond d'écran tiré au hasard
    /// - `GET /transition.mp3` - Jingle tiré au hasard
    /// - `GET /webm.html` - Page jouant une webm tirée au hasard
    /// - `POST /upload/bump` - Envoi d'un bump (fichier et/ou lien)
    async fn init_media(&mut self, library: MediaLibrary) -> Result<()>;
}
