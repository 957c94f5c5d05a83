//! Logs en mémoire, diffusés en SSE
//!
//! Un buffer circulaire garde les derniers événements de tracing. Ils sont
//! exposés par `/log-dump` (JSON), `/log-sse` (flux temps réel) et le niveau
//! minimum se règle à chaud via `/api/logs/log_setup`.

mod sselayer;

pub use sselayer::SseLayer;

use std::{
    collections::VecDeque,
    str::FromStr,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use chrono::{DateTime, Utc};
use radioconfig::get_config;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{warn, Level};
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, reload, util::SubscriberInitExt, Registry,
};

const LEVELS: [&str; 5] = ["ERROR", "WARN", "INFO", "DEBUG", "TRACE"];

/// Représente une entrée de log
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub target: String,
    pub message: String,
}

/// Buffer circulaire partagé
#[derive(Clone)]
pub struct LogState {
    buffer: Arc<RwLock<VecDeque<LogEntry>>>,
    capacity: usize,
    tx: broadcast::Sender<LogEntry>,
    max_level: Arc<RwLock<Level>>,
    reload_handle: reload::Handle<LevelFilter, Registry>,
}

// A panic while holding one of these locks leaves plain data behind
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

impl LogState {
    pub fn new(
        capacity: usize,
        level: Level,
        reload_handle: reload::Handle<LevelFilter, Registry>,
    ) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
            tx: broadcast::channel(1000).0,
            max_level: Arc::new(RwLock::new(level)),
            reload_handle,
        }
    }

    pub fn set_max_level(&self, level: Level) {
        *write(&self.max_level) = level;

        if let Err(e) = self.reload_handle.reload(LevelFilter::from_level(level)) {
            warn!(error = %e, "failed to reload log level filter");
        }
    }

    pub fn get_max_level(&self) -> Level {
        *read(&self.max_level)
    }

    fn push(&self, entry: LogEntry) {
        {
            let mut buf = write(&self.buffer);
            while buf.len() >= self.capacity {
                buf.pop_front();
            }
            buf.push_back(entry.clone());
        }
        let _ = self.tx.send(entry);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.tx.subscribe()
    }

    pub fn dump(&self) -> Vec<LogEntry> {
        read(&self.buffer).iter().cloned().collect()
    }
}

/// Filtres de `/log-sse`
///
/// - `levels` : liste séparée par des virgules (`warn,error`), tous si absent
/// - `channel` : seulement les événements portant `channel=<nom>`
/// - `search` : sous-chaîne du message ou de la cible
#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    #[serde(default)]
    pub levels: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

impl LogQuery {
    fn matches(&self, entry: &LogEntry) -> bool {
        let level_ok = match self.levels.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(levels) => levels
                .split(',')
                .any(|level| level.trim().eq_ignore_ascii_case(&entry.level)),
        };
        let channel_ok = self.channel.as_ref().is_none_or(|channel| {
            entry
                .message
                .split_whitespace()
                .any(|field| field.strip_prefix("channel=") == Some(channel.as_str()))
        });
        let search_ok = self
            .search
            .as_ref()
            .is_none_or(|s| entry.message.contains(s.as_str()) || entry.target.contains(s.as_str()));

        level_ok && channel_ok && search_ok
    }
}

fn sse_event(entry: &LogEntry, query: &LogQuery, max_level: Level) -> Option<Event> {
    if !is_level_allowed(&entry.level, max_level) || !query.matches(entry) {
        return None;
    }
    serde_json::to_string(entry)
        .ok()
        .map(|json| Event::default().data(json))
}

/// Handler SSE : l'historique du buffer, puis les nouveaux logs en temps réel
pub async fn log_sse(
    State(state): State<LogState>,
    Query(query): Query<LogQuery>,
) -> impl IntoResponse {
    let mut rx = state.subscribe();
    let history = state.dump();

    let stream = async_stream::stream! {
        for entry in &history {
            if let Some(event) = sse_event(entry, &query, state.get_max_level()) {
                yield Ok::<_, axum::Error>(event);
            }
        }

        loop {
            match rx.recv().await {
                Ok(entry) => {
                    if let Some(event) = sse_event(&entry, &query, state.get_max_level()) {
                        yield Ok::<_, axum::Error>(event);
                    }
                }
                // un client lent saute ce qu'il a manqué
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "log stream lagging");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// `GET /log-dump` : le contenu du buffer en JSON
pub async fn log_dump(State(state): State<LogState>) -> impl IntoResponse {
    Json(state.dump())
}

// ERROR(1) < WARN(2) < INFO(3) < DEBUG(4) < TRACE(5)
fn verbosity(level: Level) -> u8 {
    match level {
        Level::ERROR => 1,
        Level::WARN => 2,
        Level::INFO => 3,
        Level::DEBUG => 4,
        Level::TRACE => 5,
    }
}

/// Un niveau inconnu n'est jamais diffusé
fn is_level_allowed(log_level: &str, max_level: Level) -> bool {
    Level::from_str(log_level).is_ok_and(|level| verbosity(level) <= verbosity(max_level))
}

/// Options d'initialisation du système de logging
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// Capacité du buffer circulaire (nombre d'entrées conservées)
    pub buffer_capacity: usize,
    /// Activer la sortie vers stderr
    pub enable_console: bool,
    pub min_level: Level,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            buffer_capacity: 1000,
            enable_console: true,
            min_level: Level::INFO,
        }
    }
}

impl LoggingOptions {
    /// Lit `host.logger` dans la configuration globale
    pub fn from_config() -> Self {
        let config = get_config();
        let defaults = Self::default();
        Self {
            buffer_capacity: config
                .get_log_cache_size()
                .unwrap_or(defaults.buffer_capacity),
            enable_console: config
                .get_log_enable_console()
                .unwrap_or(defaults.enable_console),
            min_level: config
                .get_log_min_level()
                .ok()
                .and_then(|l| Level::from_str(&l).ok())
                .unwrap_or(defaults.min_level),
        }
    }
}

/// Installe le subscriber global : filtre rechargeable, buffer SSE et
/// optionnellement la console
///
/// Si un subscriber global est déjà installé, le `LogState` retourné reste
/// utilisable mais ne reçoit rien.
pub fn init_logging(options: LoggingOptions) -> LogState {
    let (filter, reload_handle) = reload::Layer::new(LevelFilter::from_level(options.min_level));
    let log_state = LogState::new(options.buffer_capacity, options.min_level, reload_handle);

    // L'ordre est important : le filtre doit être appliqué en premier
    let subscriber = Registry::default()
        .with(filter)
        .with(SseLayer::new(log_state.clone()));

    let installed = if options.enable_console {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .try_init()
    } else {
        subscriber.try_init()
    };

    if let Err(e) = installed {
        eprintln!("log subscriber already installed: {}", e);
    }

    log_state
}

/// Request body pour la configuration du logging
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LogSetupRequest {
    pub level: String,
}

/// Response pour la configuration du logging
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LogSetupResponse {
    pub current_level: String,
    pub available_levels: Vec<String>,
}

impl LogSetupResponse {
    fn new(level: Level) -> Self {
        Self {
            current_level: level.to_string(),
            available_levels: LEVELS.iter().map(|l| l.to_string()).collect(),
        }
    }
}

/// Handler pour GET /api/logs/log_setup - retourne la configuration actuelle
#[utoipa::path(
    get,
    path = "/log_setup",
    responses(
        (status = 200, description = "Log configuration retrieved successfully", body = LogSetupResponse)
    ),
    tag = "logs"
)]
pub async fn log_setup_get(State(state): State<LogState>) -> impl IntoResponse {
    Json(LogSetupResponse::new(state.get_max_level()))
}

/// Handler pour POST /api/logs/log_setup - met à jour le niveau de log
#[utoipa::path(
    post,
    path = "/log_setup",
    request_body = LogSetupRequest,
    responses(
        (status = 200, description = "Log level updated successfully", body = LogSetupResponse),
        (status = 400, description = "Invalid log level")
    ),
    tag = "logs"
)]
pub async fn log_setup_post(
    State(state): State<LogState>,
    Json(payload): Json<LogSetupRequest>,
) -> impl IntoResponse {
    let level = match Level::from_str(&payload.level) {
        Ok(l) => l,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": format!("Invalid log level. Must be one of: {}", LEVELS.join(", "))
                })),
            )
                .into_response();
        }
    };

    state.set_max_level(level);
    tracing::info!("Log level changed to: {}", level);

    (StatusCode::OK, Json(LogSetupResponse::new(level))).into_response()
}

/// Crée le router pour l'API de gestion des logs
pub fn create_logs_router(log_state: LogState) -> axum::Router {
    use axum::routing::get;
    axum::Router::new()
        .route("/log_setup", get(log_setup_get).post(log_setup_post))
        .with_state(log_state)
}

/// API OpenAPI pour la gestion des logs
#[derive(utoipa::OpenApi)]
#[openapi(
    paths(log_setup_get, log_setup_post),
    components(schemas(LogSetupRequest, LogSetupResponse)),
    tags(
        (name = "logs", description = "Log level configuration endpoints")
    )
)]
pub struct LogsApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    fn state(capacity: usize) -> LogState {
        let (_filter, handle) = reload::Layer::<LevelFilter, Registry>::new(LevelFilter::INFO);
        LogState::new(capacity, Level::INFO, handle)
    }

    fn entry(level: &str, target: &str, message: &str) -> LogEntry {
        LogEntry {
            timestamp: Utc::now(),
            level: level.to_string(),
            target: target.to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_buffer_keeps_the_latest_entries() {
        let state = state(3);
        for i in 0..5 {
            state.push(entry("INFO", "radio", &format!("message {}", i)));
        }

        let dump = state.dump();
        assert_eq!(dump.len(), 3);
        assert_eq!(dump[0].message, "message 2");
        assert_eq!(dump[2].message, "message 4");
    }

    #[test]
    fn test_level_allowed() {
        assert!(is_level_allowed("ERROR", Level::INFO));
        assert!(is_level_allowed("INFO", Level::INFO));
        assert!(!is_level_allowed("DEBUG", Level::INFO));
        assert!(is_level_allowed("TRACE", Level::TRACE));
        assert!(!is_level_allowed("LOUD", Level::TRACE));
    }

    #[test]
    fn test_query_filters() {
        let warn = entry(
            "WARN",
            "radiomonitor::cache",
            "playlist refresh failed channel=swing error=timeout",
        );
        assert!(LogQuery::default().matches(&warn));

        let only_errors = LogQuery {
            levels: Some("error".into()),
            ..LogQuery::default()
        };
        assert!(!only_errors.matches(&warn));

        let swing = LogQuery {
            levels: Some("warn, error".into()),
            channel: Some("swing".into()),
            search: Some("radiomonitor".into()),
        };
        assert!(swing.matches(&warn));

        let cyberia = LogQuery {
            channel: Some("cyberia".into()),
            ..LogQuery::default()
        };
        assert!(!cyberia.matches(&warn));
    }

    #[test]
    fn test_events_respect_the_max_level() {
        let debug = entry("DEBUG", "radiompd::client", "status channel=swing");
        let query = LogQuery::default();
        assert!(sse_event(&debug, &query, Level::INFO).is_none());
        assert!(sse_event(&debug, &query, Level::DEBUG).is_some());
    }

    #[test]
    fn test_set_max_level() {
        let state = state(10);
        state.set_max_level(Level::DEBUG);
        assert_eq!(state.get_max_level(), Level::DEBUG);
    }
}
