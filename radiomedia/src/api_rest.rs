//! Endpoints des médias
//!
//! - `GET /background` : fichier tiré au hasard dans `<http_dir>/backgrounds`
//! - `GET /transition.mp3` : fichier tiré au hasard dans `<music_dir>/transitions`
//! - `GET /webm.html` : page HTML jouant une webm de `<http_dir>/webms`
//! - `POST /upload/bump` : formulaire multipart avec `file` et/ou `url`
//!
//! Un dossier vide renvoie `404.html` avec le statut 404. Les fichiers tirés
//! au hasard ne sont jamais mis en cache par le navigateur.

use crate::error::MediaError;
use crate::library::random_file;
use crate::server_ext::MediaState;
use crate::upload::{bump_stem, store_bump, Bump};
use crate::webm::{random_webm, render_webm_page};
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use std::path::PathBuf;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::warn;

/// Taille maximale d'un envoi de bump (64 Mio)
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

// ============ Gestion des erreurs ============

enum AppError {
    Media(MediaError),
    /// Formulaire multipart illisible
    BadForm(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Media(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            AppError::BadForm(message) => (StatusCode::BAD_REQUEST, message),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        Self::Media(err)
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        Self::BadForm(err.body_text())
    }
}

/// Crée le router des médias
pub fn create_router(state: MediaState) -> Router {
    Router::new()
        .route("/background", get(get_background))
        .route("/transition.mp3", get(get_transition))
        .route("/webm.html", get(get_webm))
        .route(
            "/upload/bump",
            post(post_bump).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .with_state(state)
}

// ============================================================================
// Helpers
// ============================================================================

async fn serve_file(path: PathBuf, request: Request) -> Response {
    let mut response = match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    };
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

async fn not_found(state: &MediaState, request: Request) -> Response {
    let mut response = serve_file(state.library.not_found_page(), request).await;
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

/// Sert un fichier de `dir` tiré au hasard
async fn send_random(state: &MediaState, dir: PathBuf, request: Request) -> Result<Response, AppError> {
    match random_file(&dir).await {
        Ok(name) => Ok(serve_file(dir.join(name), request).await),
        Err(MediaError::Empty(dir)) => {
            warn!(dir = %dir.display(), "No media to pick from");
            Ok(not_found(state, request).await)
        }
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /background
async fn get_background(State(state): State<MediaState>, request: Request) -> Result<Response, AppError> {
    let dir = state.library.backgrounds();
    send_random(&state, dir, request).await
}

/// GET /transition.mp3
async fn get_transition(State(state): State<MediaState>, request: Request) -> Result<Response, AppError> {
    let dir = state.library.transitions();
    send_random(&state, dir, request).await
}

/// GET /webm.html
async fn get_webm(State(state): State<MediaState>, request: Request) -> Result<Response, AppError> {
    match random_webm(&state.library.webms()).await {
        Ok(name) => Ok(Html(render_webm_page(&name)).into_response()),
        Err(MediaError::Empty(dir)) => {
            warn!(dir = %dir.display(), "No webm to pick from");
            Ok(not_found(&state, request).await)
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /upload/bump
async fn post_bump(State(state): State<MediaState>, mut form: Multipart) -> Result<Response, AppError> {
    let stem = bump_stem(Utc::now());

    let mut bump = Bump::default();
    while let Some(field) = form.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let named = field.file_name().is_some_and(|f| !f.is_empty());
                let content = field.bytes().await?;
                // a file input left blank is sent without a file name
                if named {
                    bump.file = Some(content.to_vec());
                }
            }
            "url" => bump.url = Some(field.text().await?),
            _ => {}
        }
    }

    store_bump(&state.library.uploads(), &stem, &bump).await?;
    Ok(serve_file(state.library.thank_you_page(), Request::new(Body::empty())).await)
}
