use crate::convert::MAX_CONVERT_BYTES;
use crate::output::{EntryOutput, HealthOutput, ModuleOutput, StatusOutput, WebpackOutput};
use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use cssmap_indexer::RefreshScheduler;
use cssmap_protocol::ErrorEnvelope;
use cssmap_search::{QueryEngine, SearchError, TextRewriter};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiState {
    engine: QueryEngine,
    scheduler: Option<RefreshScheduler>,
}

impl ApiState {
    pub fn new(engine: QueryEngine, scheduler: Option<RefreshScheduler>) -> Self {
        Self { engine, scheduler }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(http_health))
        .route("/status", get(http_status))
        .route("/module/:module_id", get(http_module))
        .route("/class/:css_class", get(http_css_class))
        .route("/webpack/:webpack_key", get(http_webpack))
        .route("/suggest/class", get(http_suggest_class))
        .route("/suggest/webpack", get(http_suggest_webpack))
        .route(
            "/convert",
            post(http_convert).layer(DefaultBodyLimit::max(MAX_CONVERT_BYTES as usize)),
        )
        .with_state(Arc::new(state))
}

pub(crate) struct ApiError {
    status: StatusCode,
    envelope: ErrorEnvelope,
}

impl ApiError {
    fn not_found(kind: &str, key: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            envelope: ErrorEnvelope::new("not_found", format!("{kind} {key} not found")),
        }
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            envelope: ErrorEnvelope::new("not_ready", err.to_string())
                .with_hint("The first mappings refresh has not completed; retry shortly."),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}

type SharedState = State<Arc<ApiState>>;

#[derive(Debug, Deserialize)]
struct SuggestQuery {
    #[serde(default)]
    q: String,
}

async fn http_health(State(state): SharedState) -> Json<HealthOutput> {
    Json(HealthOutput {
        initialized: state.engine.view().is_ok(),
        refresh: state.scheduler.as_ref().map(RefreshScheduler::health_snapshot),
    })
}

async fn http_status(State(state): SharedState) -> Result<Json<StatusOutput>, ApiError> {
    let view = state.engine.view()?;
    Ok(Json(StatusOutput::from_snapshot(view.snapshot())))
}

async fn http_module(
    State(state): SharedState,
    Path(module_id): Path<String>,
) -> Result<Json<ModuleOutput>, ApiError> {
    let view = state.engine.view()?;
    let module = view
        .find_module(&module_id)
        .ok_or_else(|| ApiError::not_found("module", &module_id))?;
    Ok(Json(ModuleOutput::new(&module_id, module)))
}

async fn http_css_class(
    State(state): SharedState,
    Path(css_class): Path<String>,
) -> Result<Json<EntryOutput>, ApiError> {
    let view = state.engine.view()?;
    let entry = view
        .find_css_class(&css_class)
        .ok_or_else(|| ApiError::not_found("css class", &css_class))?;
    Ok(Json(EntryOutput::new(&entry)))
}

async fn http_webpack(
    State(state): SharedState,
    Path(webpack_key): Path<String>,
) -> Result<Json<WebpackOutput>, ApiError> {
    let view = state.engine.view()?;
    let entries = view
        .find_webpack_key(&webpack_key)
        .ok_or_else(|| ApiError::not_found("webpack key", &webpack_key))?;
    Ok(Json(WebpackOutput::new(&entries)))
}

async fn http_suggest_class(
    State(state): SharedState,
    Query(query): Query<SuggestQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let view = state.engine.view()?;
    let found = view.suggest_css_classes(&query.q);
    Ok(Json(found.into_iter().map(str::to_string).collect()))
}

async fn http_suggest_webpack(
    State(state): SharedState,
    Query(query): Query<SuggestQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let view = state.engine.view()?;
    let found = view.suggest_webpack_keys(&query.q);
    Ok(Json(found.into_iter().map(str::to_string).collect()))
}

async fn http_convert(State(state): SharedState, body: String) -> Result<String, ApiError> {
    let view = state.engine.view()?;
    Ok(TextRewriter::new(&view).rewrite(&body))
}
