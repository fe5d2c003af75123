//! # API REST
//!
//! REST API implementation for the grid maker.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON bodies, status codes, CORS)
//!
//! There is no interactive prompt over HTTP: a destructive request is its own confirmation.

#![warn(rust_2018_idioms)]

mod health;

pub use health::{HealthRes, HealthService};

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use grid_core::constants::IMPORT_ERROR_MESSAGE;
use grid_core::{
    export, importer, AlwaysConfirm, Census, ContentType, CoreConfig, GridDataElement, GridError,
    GridSession, GridSettings, GridState, GridStore, GridUpdate, Item, Section,
};
use grid_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

/// Shared state for the REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn GridStore>,
    pub cfg: Arc<CoreConfig>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceGridReq {
    pub grid_data: Vec<GridDataElement>,
    /// Replaces the layout as well when present.
    #[serde(default)]
    pub location_layout: Option<Vec<String>>,
    /// Replaces the stored settings when present.
    #[serde(default)]
    pub settings: Option<GridSettings>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRes {
    pub grid_data: Vec<GridDataElement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<GridSettings>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidationErrorRes {
    pub messages: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportRes {
    pub location_layout: Vec<String>,
    pub grid_data: Vec<GridDataElement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<GridSettings>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LocationReq {
    /// Blank names are rejected while the body is parsed.
    #[schema(value_type = String)]
    pub location: NonEmptyText,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    /// Comma-separated locations to export; all locations when absent.
    pub locations: Option<String>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        read_grid,
        replace_grid,
        validate_grid,
        import_grid,
        export_grid,
        census,
        add_location,
        remove_location,
        rename_location,
    ),
    components(schemas(
        HealthRes,
        GridState,
        GridDataElement,
        Section,
        Item,
        ContentType,
        GridSettings,
        Census,
        ReplaceGridReq,
        ValidateRes,
        ValidationErrorRes,
        ImportRes,
        LocationReq,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router over `state`, including Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/grid", get(read_grid).put(replace_grid))
        .route("/grid/validate", post(validate_grid))
        .route("/grid/import", post(import_grid))
        .route("/grid/export", get(export_grid))
        .route("/census", get(census))
        .route("/layout", post(add_location))
        .route(
            "/layout/:location",
            put(rename_location).delete(remove_location),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

type ApiError = (StatusCode, &'static str);

fn api_error(context: &'static str, e: GridError) -> ApiError {
    match e {
        GridError::DuplicateLocation(_) => (StatusCode::CONFLICT, "Location already exists"),
        GridError::UnknownLocation(_) => (StatusCode::NOT_FOUND, "Unknown location"),
        GridError::InvalidInput(_) | GridError::Text(_) | GridError::Uuid(_) => {
            tracing::warn!("{context} rejected: {e}");
            (StatusCode::BAD_REQUEST, "Invalid request")
        }
        GridError::Validation(_) | GridError::JsonParse(_) => {
            tracing::warn!("{context} rejected: {e}");
            (StatusCode::UNPROCESSABLE_ENTITY, IMPORT_ERROR_MESSAGE)
        }
        other => {
            tracing::error!("{context} error: {:?}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes),
        (status = 503, description = "Grid store cannot be read", body = HealthRes)
    )
)]
#[axum::debug_handler]
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthRes>) {
    let res = HealthService::check_store(state.store.as_ref());
    let status = if res.ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(res))
}

#[utoipa::path(
    get,
    path = "/grid",
    responses(
        (status = 200, description = "Current grid", body = GridState),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn read_grid(State(state): State<AppState>) -> Result<Json<GridState>, ApiError> {
    state
        .store
        .read()
        .map(Json)
        .map_err(|e| api_error("Read grid", e))
}

#[utoipa::path(
    put,
    path = "/grid",
    request_body = ReplaceGridReq,
    responses(
        (status = 200, description = "Grid replaced", body = GridState),
        (status = 400, description = "Blank layout entry, element outside the layout, or malformed id"),
        (status = 409, description = "Duplicate location"),
        (status = 500, description = "Internal server error")
    )
)]
/// Replace the whole grid. The last writer wins.
///
/// Every element must sit at a layout location and carry either no id or a canonical one.
#[axum::debug_handler]
async fn replace_grid(
    State(state): State<AppState>,
    Json(req): Json<ReplaceGridReq>,
) -> Result<Json<GridState>, ApiError> {
    let change = GridUpdate {
        grid_data: req.grid_data,
        location_layout: req.location_layout,
        settings: req.settings,
    };
    state.store.commit(change).map_err(|e| match e {
        GridError::UnknownLocation(location) => {
            tracing::warn!(%location, "Replace grid rejected: element outside the layout");
            (StatusCode::BAD_REQUEST, "Element location is not in the layout")
        }
        other => api_error("Replace grid", other),
    })?;
    read_grid(State(state)).await
}

#[utoipa::path(
    post,
    path = "/grid/validate",
    request_body(content = String, description = "Grid document to check", content_type = "application/json"),
    responses(
        (status = 200, description = "Cleaned data and warnings", body = ValidateRes),
        (status = 400, description = "Body is not JSON", body = ValidationErrorRes),
        (status = 422, description = "Fatal validation errors", body = ValidationErrorRes)
    )
)]
/// Validate and clean a document without storing it.
///
/// Unlike import, this reports the detailed fatal messages so a document can be fixed.
#[axum::debug_handler]
async fn validate_grid(
    body: String,
) -> Result<Json<ValidateRes>, (StatusCode, Json<ValidationErrorRes>)> {
    match grid_core::validate_str(&body) {
        Ok(validated) => Ok(Json(ValidateRes {
            grid_data: validated.cleaned.grid_data,
            settings: validated.cleaned.settings,
            warnings: validated.warnings,
        })),
        Err(GridError::Validation(e)) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ValidationErrorRes {
                messages: e.messages,
            }),
        )),
        Err(e) => Err((
            StatusCode::BAD_REQUEST,
            Json(ValidationErrorRes {
                messages: vec![e.to_string()],
            }),
        )),
    }
}

#[utoipa::path(
    post,
    path = "/grid/import",
    request_body(content = String, description = "Grid document to import", content_type = "application/json"),
    responses(
        (status = 200, description = "Import committed", body = ImportRes),
        (status = 409, description = "Duplicate location in imported data"),
        (status = 422, description = "The document could not be imported"),
        (status = 500, description = "Internal server error")
    )
)]
/// Import a document, replacing the grid and rebuilding the layout from its locations.
#[axum::debug_handler]
async fn import_grid(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<ImportRes>, ApiError> {
    let staged = importer::stage_text(Path::new("<request body>"), &body)
        .map_err(|e| api_error("Import", e))?;
    let location_layout = staged.location_layout();
    let settings = staged.document.settings;

    let grid_data = state
        .store
        .commit(GridUpdate {
            grid_data: staged.document.grid_data,
            location_layout: Some(location_layout.clone()),
            settings: settings.clone(),
        })
        .map_err(|e| api_error("Import", e))?;
    tracing::info!(elements = grid_data.len(), "import committed over REST");

    Ok(Json(ImportRes {
        location_layout,
        grid_data,
        settings,
        warnings: staged.warnings,
    }))
}

#[utoipa::path(
    get,
    path = "/grid/export",
    params(ExportQuery),
    responses(
        (status = 200, description = "Canonical export document", content_type = "application/json", body = String),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn export_grid(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let grid = state.store.read().map_err(|e| api_error("Export", e))?;

    let settings = grid.settings.as_ref();
    let elements = match query.locations.as_deref() {
        Some(list) => {
            let wanted: Vec<String> = list
                .split(',')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect();
            export::select(&grid.grid_data, &wanted)
        }
        None => grid.grid_data,
    };

    let text =
        export::serialize_document(&elements, settings).map_err(|e| api_error("Export", e))?;
    let file_name = export::export_file_name(settings, state.cfg.export_file_name());
    let disposition = format!("attachment; filename=\"{file_name}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        text,
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/census",
    responses(
        (status = 200, description = "Census counts", body = Census),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn census(State(state): State<AppState>) -> Result<Json<Census>, ApiError> {
    state
        .store
        .read()
        .map(|grid| Json(grid.census))
        .map_err(|e| api_error("Census", e))
}

#[utoipa::path(
    post,
    path = "/layout",
    request_body = LocationReq,
    responses(
        (status = 201, description = "Location added", body = GridDataElement),
        (status = 422, description = "Blank location"),
        (status = 409, description = "Location already exists"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn add_location(
    State(state): State<AppState>,
    Json(req): Json<LocationReq>,
) -> Result<(StatusCode, Json<GridDataElement>), ApiError> {
    let mut session = GridSession::new(state.store.clone());
    session
        .add_location(req.location.as_str())
        .map(|element| (StatusCode::CREATED, Json(element)))
        .map_err(|e| api_error("Add location", e))
}

#[utoipa::path(
    delete,
    path = "/layout/{location}",
    params(("location" = String, Path, description = "Location to remove")),
    responses(
        (status = 204, description = "Location removed"),
        (status = 404, description = "Unknown location"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn remove_location(
    State(state): State<AppState>,
    AxumPath(location): AxumPath<String>,
) -> Result<StatusCode, ApiError> {
    let mut session = GridSession::new(state.store.clone());
    session
        .remove_location(&location, &mut AlwaysConfirm)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(|e| api_error("Remove location", e))
}

#[utoipa::path(
    put,
    path = "/layout/{location}",
    params(("location" = String, Path, description = "Location to rename")),
    request_body(content = LocationReq, description = "The new location name"),
    responses(
        (status = 200, description = "Location renamed; its row is now blank", body = GridState),
        (status = 422, description = "Blank location"),
        (status = 404, description = "Unknown location"),
        (status = 409, description = "Location already exists"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn rename_location(
    State(state): State<AppState>,
    AxumPath(location): AxumPath<String>,
    Json(req): Json<LocationReq>,
) -> Result<Json<GridState>, ApiError> {
    let mut session = GridSession::new(state.store.clone());
    session
        .rename_location(&location, req.location.as_str(), &mut AlwaysConfirm)
        .map_err(|e| api_error("Rename location", e))?;
    read_grid(State(state)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use grid_core::MemoryGridStore;
    use http_body_util::BodyExt;
    use std::path::PathBuf;
    use tower::ServiceExt;

    fn app_with(locations: &[&str]) -> (Router, Arc<MemoryGridStore>) {
        let layout: Vec<String> = locations.iter().map(|s| s.to_string()).collect();
        let data = locations
            .iter()
            .map(|l| GridDataElement::blank("", *l))
            .collect();
        let store = Arc::new(MemoryGridStore::with_grid(layout, data).unwrap());
        let cfg = CoreConfig::new(PathBuf::from("unused"), "test".into(), "ward-7").unwrap();
        let app = router(AppState {
            store: store.clone(),
            cfg: Arc::new(cfg),
        });
        (app, store)
    }

    fn request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _) = app_with(&[]);
        let (status, body) = send(app, request("GET", "/health", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    /// Store whose reads always fail.
    struct UnreadableStore(MemoryGridStore);

    impl GridStore for UnreadableStore {
        fn read(&self) -> grid_core::GridResult<GridState> {
            Err(GridError::StoreUnavailable("disk gone".into()))
        }

        fn subscribe(&self) -> tokio::sync::watch::Receiver<GridState> {
            self.0.subscribe()
        }

        fn commit(&self, change: GridUpdate) -> grid_core::GridResult<Vec<GridDataElement>> {
            self.0.commit(change)
        }
    }

    #[tokio::test]
    async fn health_is_unavailable_when_store_cannot_be_read() {
        let cfg = CoreConfig::new(PathBuf::from("unused"), "test".into(), "grid").unwrap();
        let app = router(AppState {
            store: Arc::new(UnreadableStore(MemoryGridStore::new())),
            cfg: Arc::new(cfg),
        });
        let (status, body) = send(app, request("GET", "/health", "")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["ok"], false);
    }

    #[tokio::test]
    async fn validate_reports_fatal_messages() {
        let (app, _) = app_with(&[]);
        let (status, body) =
            send(app, request("POST", "/grid/validate", r#"{"gridData": "x"}"#)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let messages = body["messages"].as_array().unwrap();
        assert!(messages[0].as_str().unwrap().contains("should be an array"));
    }

    #[tokio::test]
    async fn validate_returns_cleaned_data_and_warnings() {
        let (app, store) = app_with(&["1"]);
        let (status, body) = send(
            app,
            request(
                "POST",
                "/grid/validate",
                r#"{"gridData": [{"location": 3, "id": "abc"}]}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gridData"][0]["location"], "3");
        assert_eq!(body["gridData"][0]["id"], "");
        assert!(!body["warnings"].as_array().unwrap().is_empty());
        assert_eq!(store.read().unwrap().location_layout, vec!["1"]);
    }

    #[tokio::test]
    async fn validate_rejects_non_json() {
        let (app, _) = app_with(&[]);
        let (status, _) = send(app, request("POST", "/grid/validate", "{oops")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn import_replaces_grid_and_layout() {
        let (app, store) = app_with(&["old"]);
        let (status, body) = send(
            app.clone(),
            request(
                "POST",
                "/grid/import",
                r#"{"gridData": [
                    {"location": "2", "lastName": "Doe", "team": "Renal"},
                    {"location": "10"}
                ]}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["locationLayout"], serde_json::json!(["2", "10"]));

        let state = store.read().unwrap();
        assert_eq!(state.location_layout, vec!["2", "10"]);
        assert!(state.grid_data.iter().all(|e| !e.id.is_empty()));

        let (status, census) = send(app, request("GET", "/census", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(census["filled"], 1);
        assert_eq!(census["total"], 2);
        assert_eq!(census["teams"]["Renal"], 1);
    }

    #[tokio::test]
    async fn import_hides_fatal_details() {
        let (app, store) = app_with(&["1"]);
        let res = app
            .oneshot(request("POST", "/grid/import", "{}"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes.as_ref(), IMPORT_ERROR_MESSAGE.as_bytes());
        assert_eq!(store.read().unwrap().location_layout, vec!["1"]);
    }

    #[tokio::test]
    async fn export_orders_filters_and_names_file() {
        let (app, _) = app_with(&["10", "2", "1"]);
        let res = app
            .oneshot(request("GET", "/grid/export?locations=10,1", ""))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"ward-7.json\""
        );

        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let locations: Vec<&str> = body["gridData"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["location"].as_str().unwrap())
            .collect();
        assert_eq!(locations, vec!["1", "10"]);
        assert!(body["gridData"][0].get("id").is_none());
    }

    #[tokio::test]
    async fn layout_add_rename_remove() {
        let (app, store) = app_with(&["1"]);

        let (status, added) =
            send(app.clone(), request("POST", "/layout", r#"{"location": "2"}"#)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(!added["id"].as_str().unwrap().is_empty());

        let (status, _) =
            send(app.clone(), request("POST", "/layout", r#"{"location": "2"}"#)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, grid) =
            send(app.clone(), request("PUT", "/layout/2", r#"{"location": "2A"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(grid["locationLayout"], serde_json::json!(["1", "2A"]));

        let (status, _) = send(app.clone(), request("DELETE", "/layout/9", "")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(app, request("DELETE", "/layout/1", "")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(store.read().unwrap().location_layout, vec!["2A"]);
    }

    #[tokio::test]
    async fn replace_grid_rejects_duplicate_locations() {
        let (app, store) = app_with(&["1"]);
        let (status, _) = send(
            app,
            request(
                "PUT",
                "/grid",
                r#"{"gridData": [{"location": "1"}, {"location": "1"}]}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(store.read().unwrap().grid_data.len(), 1);
    }

    #[tokio::test]
    async fn replace_grid_rejects_rows_outside_layout_and_bad_ids() {
        let (app, store) = app_with(&["1"]);
        let before = store.read().unwrap();

        for body in [
            r#"{"gridData": [{"location": "1"}, {"location": "", "lastName": "Doe"}]}"#,
            r#"{"gridData": [{"location": "2"}]}"#,
            r#"{"gridData": [{"location": "1", "id": "not-an-id"}]}"#,
        ] {
            let (status, _) = send(app.clone(), request("PUT", "/grid", body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        }
        assert_eq!(store.read().unwrap(), before);
    }

    #[tokio::test]
    async fn blank_location_names_are_rejected() {
        let (app, store) = app_with(&["1"]);
        let (status, _) =
            send(app.clone(), request("POST", "/layout", r#"{"location": "  "}"#)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(app, request("PUT", "/layout/1", r#"{"location": ""}"#)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(store.read().unwrap().location_layout, vec!["1"]);
    }

    #[tokio::test]
    async fn imported_settings_name_the_export() {
        let (app, store) = app_with(&[]);
        let (status, body) = send(
            app.clone(),
            request(
                "POST",
                "/grid/import",
                r#"{"gridData": [{"location": "1"}],
                    "settings": {"title": "ICU", "exportFileName": "icu-board"}}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["settings"]["title"], "ICU");
        assert_eq!(store.read().unwrap().settings.unwrap().title, "ICU");

        let res = app
            .oneshot(request("GET", "/grid/export", ""))
            .await
            .unwrap();
        assert_eq!(
            res.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"icu-board.json\""
        );
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["settings"]["exportFileName"], "icu-board");
    }
}
