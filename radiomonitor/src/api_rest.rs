//! Endpoints REST du moniteur de chaînes
//!
//! Les handlers ne lisent que le cache : aucune requête HTTP n'attend une
//! réponse d'un serveur MPD.
//!
//! - `GET /playlist/{channel}.json` : fenêtre de playlist d'une chaîne
//! - `GET /live.json` : chaîne actuellement en direct
//! - `GET /channels.json` : état de chaque chaîne

use crate::cache::ChannelStats;
use crate::error::LookupError;
use crate::liveness::LiveSnapshot;
use crate::server_ext::MonitorState;
use crate::window::PlaylistWindow;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

// ============ Gestion des erreurs ============

struct AppError(LookupError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LookupError::NotFound(_) => StatusCode::NOT_FOUND,
            LookupError::Unavailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(serde_json::json!({
            "error": self.0.to_string()
        }));

        (status, body).into_response()
    }
}

impl From<LookupError> for AppError {
    fn from(err: LookupError) -> Self {
        Self(err)
    }
}

/// Crée le router de l'API du moniteur
pub fn create_router(state: MonitorState) -> Router {
    Router::new()
        .route("/playlist/{file}", get(get_playlist))
        .route("/live.json", get(get_live))
        .route("/channels.json", get(get_channels))
        .with_state(state)
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /playlist/{channel}.json
async fn get_playlist(
    State(state): State<MonitorState>,
    Path(file): Path<String>,
) -> Result<Json<PlaylistWindow>, AppError> {
    // the route captures the whole segment, suffix included
    let channel = file
        .strip_suffix(".json")
        .ok_or_else(|| LookupError::NotFound(file.clone()))?;

    let cached = state.cache.get(channel).await?;
    Ok(Json(cached.window.clone()))
}

/// GET /live.json
async fn get_live(State(state): State<MonitorState>) -> Json<LiveSnapshot> {
    Json(state.live.current())
}

/// GET /channels.json
async fn get_channels(State(state): State<MonitorState>) -> Json<Vec<ChannelStats>> {
    let live = state.live.current();
    Json(state.cache.stats(&live).await)
}
