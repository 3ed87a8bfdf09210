// Falcon Registry - REST API with Axum
// Thin adapter: every handler is one call into the store or the broker.

use crate::error::RegistryError;
use crate::export::{export_to_string, ExportFormat};
use crate::filter::filter;
use crate::registration::{FalconRegistration, NewRegistration};
use crate::selection::{SelectionBroker, SelectionMessage};
use crate::store::{RegistryStore, SqliteStore};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<SqliteStore>>,
    selection: SelectionBroker,
}

impl AppState {
    pub fn new(store: SqliteStore, selection: SelectionBroker) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            selection,
        }
    }

    fn store(&self) -> MutexGuard<'_, SqliteStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: String) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message),
        }
    }
}

fn failure(status: StatusCode, message: String) -> Response {
    (status, Json(ApiResponse::err(message))).into_response()
}

fn registry_failure(err: RegistryError) -> Response {
    let status = match err {
        RegistryError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RegistryError::WrongMode { .. } => StatusCode::CONFLICT,
        RegistryError::Storage(_) => {
            error!("storage failure: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    failure(status, err.to_string())
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    format: Option<String>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/falcons?q= - List registrations, optionally filtered by name
async fn list_falcons(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    let listed = state.store().list();

    match listed {
        Ok(records) => Json(ApiResponse::ok(filter(&records, &params.q))).into_response(),
        Err(e) => registry_failure(e.into()),
    }
}

/// POST /api/falcons - Register a falcon
async fn create_falcon(State(state): State<AppState>, Json(input): Json<NewRegistration>) -> Response {
    let created = state.store().create(input);

    match created {
        Ok(record) => (StatusCode::CREATED, Json(ApiResponse::ok(record))).into_response(),
        Err(e) => registry_failure(e),
    }
}

/// GET /api/falcons/:id - One registration
async fn get_falcon(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let found = state.store().find(&id);

    match found {
        Ok(Some(record)) => Json(ApiResponse::ok(record)).into_response(),
        Ok(None) => failure(StatusCode::NOT_FOUND, format!("Falcon not found: {}", id)),
        Err(e) => registry_failure(e.into()),
    }
}

/// GET /api/selection - The active falcon (null when nothing selected)
async fn get_selection(State(state): State<AppState>) -> Json<ApiResponse<Option<FalconRegistration>>> {
    Json(ApiResponse::ok(state.selection.current()))
}

/// POST /api/selection - Apply a SELECT_FALCON message; other types are ignored
async fn post_selection(State(state): State<AppState>, Json(body): Json<serde_json::Value>) -> Response {
    match SelectionMessage::from_value(body) {
        Ok(Some(message)) => state.selection.dispatch(message),
        Ok(None) => {}
        Err(e) => return failure(StatusCode::UNPROCESSABLE_ENTITY, format!("Invalid selection: {}", e)),
    }

    Json(ApiResponse::ok(state.selection.current())).into_response()
}

/// GET /api/export?format=csv|json - Download the registry
async fn export_falcons(State(state): State<AppState>, Query(params): Query<ExportParams>) -> Response {
    let format = match params.format.as_deref().map(str::parse::<ExportFormat>) {
        None => ExportFormat::default(),
        Some(Ok(format)) => format,
        Some(Err(e)) => return failure(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let listed = state.store().list();
    let records = match listed {
        Ok(records) => records,
        Err(e) => return registry_failure(e.into()),
    };

    match export_to_string(&records, format) {
        Ok(body) => {
            let disposition = format!("attachment; filename=\"falcons.{}\"", format.extension());
            (
                [
                    (header::CONTENT_TYPE, format.content_type().to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response()
        }
        Err(e) => {
            error!("export failed: {:#}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/falcons", get(list_falcons).post(create_falcon))
        .route("/falcons/:id", get(get_falcon))
        .route("/selection", get(get_selection).post(post_selection))
        .route("/export", get(export_falcons))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_app() -> (Router, AppState) {
        let state = AppState::new(SqliteStore::open_in_memory().unwrap(), SelectionBroker::new());
        (router(state.clone()), state)
    }

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = test_app();
        let (status, json) = call(&app, get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"], "OK");
    }

    #[tokio::test]
    async fn test_create_list_and_search() {
        let (app, _) = test_app();

        let (status, json) = call(
            &app,
            post_json(
                "/api/falcons",
                serde_json::json!({"name": "Red Wing", "breed": "Peregrine", "weight": "850", "notes": "fast"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["weight"], "850");

        call(&app, post_json("/api/falcons", serde_json::json!({"name": "Amber"}))).await;

        let (_, all) = call(&app, get("/api/falcons")).await;
        assert_eq!(all["data"].as_array().unwrap().len(), 2);

        let (_, found) = call(&app, get("/api/falcons?q=RED")).await;
        let found = found["data"].as_array().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["name"], "Red Wing");
    }

    #[tokio::test]
    async fn test_blank_name_is_unprocessable() {
        let (app, state) = test_app();

        let (status, json) = call(&app, post_json("/api/falcons", serde_json::json!({"name": "  "}))).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["success"], false);
        assert_eq!(state.store().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_missing_falcon() {
        let (app, _) = test_app();
        let (status, _) = call(&app, get("/api/falcons/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_selection_round_trip() {
        let (app, state) = test_app();
        let tracking = state.selection.clone();

        let (_, created) = call(&app, post_json("/api/falcons", serde_json::json!({"name": "Red Wing"}))).await;
        let record = created["data"].clone();

        let (_, before) = call(&app, get("/api/selection")).await;
        assert!(before["data"].is_null());

        let (status, after) = call(
            &app,
            post_json("/api/selection", serde_json::json!({"type": "SELECT_FALCON", "payload": record})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(after["data"]["name"], "Red Wing");
        assert_eq!(tracking.current().unwrap().name, "Red Wing");

        // Not for the broker: ignored, selection unchanged
        let (status, ignored) = call(
            &app,
            post_json("/api/selection", serde_json::json!({"type": "STOP_RACE", "payload": null})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ignored["data"]["name"], "Red Wing");
    }

    #[tokio::test]
    async fn test_export_csv() {
        let (app, _) = test_app();
        call(&app, post_json("/api/falcons", serde_json::json!({"name": "Red Wing"}))).await;

        let resp = app.clone().oneshot(get("/api/export?format=csv")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/csv"));

        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.starts_with("id,name,breed,weight,notes,createdAt"));
        assert!(body.contains("Red Wing"));
    }

    #[tokio::test]
    async fn test_export_unknown_format() {
        let (app, _) = test_app();
        let (status, _) = call(&app, get("/api/export?format=xml")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
