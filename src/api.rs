//! REST API for the pallet planner.
//!
//! Stateless planning endpoints take a full snapshot per request; the
//! `/workbench` endpoints drive the single shared operator session. Uses Axum
//! as the web framework and supports CORS.

use std::sync::{Arc, OnceLock};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, RawQuery, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::{StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};

use crate::allocator::{LabelStyle, Pallet, PalletSegment, build_plan, build_plan_with_progress};
use crate::config::{ApiConfig, PlannerConfig};
use crate::model::{ExtraKey, Extras, PlanSnapshot, ValidationError};
use crate::navigator::{NavAction, PagerView, PalletNavigator};
use crate::planner::{PlanOutcome, evaluate};
use crate::share::{ShareError, decode_share_query, encode_share_query, share_path};
use crate::summary::Summary;
use crate::types::{BucketName, CaseSpan};
use crate::workbench::{Edit, Workbench, WorkbenchView};

/// Shared state of all handlers.
#[derive(Clone)]
pub struct ApiState {
    style: Arc<LabelStyle>,
    share_base: Arc<str>,
    workbench: Workbench,
}

impl ApiState {
    pub fn new(planner: &PlannerConfig) -> Self {
        let style = Arc::new(planner.label_style().clone());
        Self {
            workbench: Workbench::new(Arc::clone(&style), planner.debounce()),
            share_base: Arc::from(planner.share_path()),
            style,
        }
    }
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>pallet-plan API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                window.ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Embedded operator page (HTML, CSS, JS).
#[derive(RustEmbed)]
#[folder = "web/"]
struct WebAssets;

/// Request body of the planning endpoints.
///
/// `current` is the pallet the operator was looking at; it is clamped into
/// the new plan.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "snapshot": {
            "buckets": { "A": 10, "B": 5 },
            "extras": { "zeroCase": 3 },
            "bottlePerCase": 12,
            "casePerPallet": 8
        },
        "current": 1
    })
)]
pub struct PlanRequest {
    pub snapshot: PlanSnapshot,
    #[serde(default)]
    #[schema(nullable = true)]
    pub current: Option<usize>,
}

/// Full planning result plus the copy-ready report and a share path.
#[derive(Serialize, ToSchema)]
pub struct PlanResponse {
    #[serde(flatten)]
    pub outcome: PlanOutcome,
    pub report: String,
    pub share_path: String,
}

#[derive(Deserialize, ToSchema)]
pub struct NavigateRequest {
    pub snapshot: PlanSnapshot,
    #[serde(default)]
    #[schema(nullable = true)]
    pub current: Option<usize>,
    pub action: NavAction,
    /// Raw jump input, only read for `jump`.
    #[serde(default)]
    #[schema(nullable = true)]
    pub target: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ShareResponse {
    /// `data=<percent-encoded snapshot JSON>`
    pub query: String,
    pub path: String,
}

#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "edits": [
            { "kind": "set_bucket", "name": "A", "value": "10" },
            { "kind": "set_extra", "key": "zeroCase", "value": "3" }
        ]
    })
)]
pub struct EditsRequest {
    pub edits: Vec<Edit>,
}

#[derive(Deserialize, ToSchema)]
pub struct WorkbenchNavigateRequest {
    pub action: NavAction,
    #[serde(default)]
    #[schema(nullable = true)]
    pub target: Option<String>,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(err: ValidationError) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        err.to_string(),
    )
}

fn share_error(err: ShareError) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid share link",
        err.to_string(),
    )
}

fn parse_json<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(value)| value)
        .map_err(json_deserialize_error)
}

impl ApiState {
    fn plan_response(&self, snapshot: &PlanSnapshot, current: Option<usize>) -> Response {
        let mut navigator = PalletNavigator::resume_at(current.unwrap_or(0));
        let outcome = evaluate(snapshot, &self.style, &mut navigator);
        let share_path = match share_path(&self.share_base, snapshot) {
            Ok(path) => path,
            Err(err) => {
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Could not encode share link",
                    err.to_string(),
                );
            }
        };

        info!(
            "📦 Plan: {} pallets, {}",
            outcome.pallets.len(),
            outcome.summary.case_text
        );
        let response = PlanResponse {
            report: outcome.summary.report(),
            outcome,
            share_path,
        };
        (StatusCode::OK, Json(response)).into_response()
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handle_plan,
        handle_plan_link,
        handle_navigate,
        handle_plan_stream,
        handle_share,
        handle_workbench_view,
        handle_workbench_edits,
        handle_workbench_navigate,
        handle_workbench_clear,
        handle_workbench_load
    ),
    components(
        schemas(
            PlanRequest,
            PlanResponse,
            NavigateRequest,
            ShareResponse,
            EditsRequest,
            WorkbenchNavigateRequest,
            WorkbenchView,
            ErrorResponse,
            PlanOutcome,
            PlanSnapshot,
            Extras,
            ExtraKey,
            Summary,
            Pallet,
            PalletSegment,
            CaseSpan,
            BucketName,
            PagerView,
            NavAction,
            Edit
        )
    ),
    tags(
        (name = "planning", description = "Stateless pallet planning"),
        (name = "workbench", description = "Live operator session with debounced recalculation")
    )
)]
struct ApiDoc;

/// Builds the router with all API, documentation and web routes.
pub fn build_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        // API endpoints
        .route("/plan", post(handle_plan).get(handle_plan_link))
        .route("/plan/navigate", post(handle_navigate))
        .route("/plan_stream", post(handle_plan_stream))
        .route("/share", post(handle_share))
        .route("/workbench", get(handle_workbench_view))
        .route("/workbench/edits", post(handle_workbench_edits))
        .route("/workbench/navigate", post(handle_workbench_navigate))
        .route("/workbench/clear", post(handle_workbench_clear))
        .route("/workbench/snapshot", post(handle_workbench_load))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        // Web-UI (embedded)
        .route("/", get(serve_index))
        .route("/{*path}", get(serve_static))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server and blocks until it terminates.
pub async fn start_api_server(config: ApiConfig, planner: PlannerConfig) -> std::io::Result<()> {
    let app = build_router(ApiState::new(&planner));

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await.inspect_err(|err| {
        error!("❌ Could not bind API server to {}: {}", addr, err);
    })?;

    let display_host = config.display_host();
    info!("🚀 Server running on http://{}:{}", display_host, config.port());
    if config.binds_to_all_interfaces() && config.uses_default_host() {
        info!("💡 Local access: http://localhost:{}", config.port());
    }
    info!("📦 API Endpoints: POST /plan, GET /plan?data=, POST /plan/navigate, POST /plan_stream, POST /share");
    info!("🧮 Workbench: GET /workbench, POST /workbench/edits, /workbench/navigate, /workbench/clear, /workbench/snapshot");
    info!("📑 Documentation: GET /docs, GET /docs/openapi.json");
    info!(
        "⏱️ Recalculation debounce: {} ms",
        planner.debounce().as_millis()
    );

    axum::serve(listener, app).await.inspect_err(|err| {
        error!("❌ API server terminated with an error: {err}");
    })
}

/// Handler for POST /plan.
///
/// Builds summary, pallets and pager for a snapshot.
#[utoipa::path(
    post,
    path = "/plan",
    request_body = PlanRequest,
    responses(
        (status = 200, description = "Plan computed", body = PlanResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request body", body = ErrorResponse)
    ),
    tag = "planning"
)]
async fn handle_plan(
    State(state): State<ApiState>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    state.plan_response(&request.snapshot, request.current)
}

/// Handler for GET /plan?data=... (share link).
#[utoipa::path(
    get,
    path = "/plan",
    params(("data" = String, Query, description = "Snapshot JSON, percent-encoded")),
    responses(
        (status = 200, description = "Plan computed from the shared snapshot", body = PlanResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Missing or malformed share payload", body = ErrorResponse)
    ),
    tag = "planning"
)]
async fn handle_plan_link(State(state): State<ApiState>, RawQuery(query): RawQuery) -> Response {
    match decode_share_query(query.as_deref().unwrap_or_default()) {
        Ok(snapshot) => {
            info!("🔗 Opening shared snapshot");
            state.plan_response(&snapshot, None)
        }
        Err(err) => share_error(err),
    }
}

/// Handler for POST /plan/navigate.
///
/// Recomputes the pallets of the snapshot and moves the cursor.
#[utoipa::path(
    post,
    path = "/plan/navigate",
    request_body = NavigateRequest,
    responses(
        (status = 200, description = "Pager after the move", body = PagerView),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request body", body = ErrorResponse)
    ),
    tag = "planning"
)]
async fn handle_navigate(
    State(state): State<ApiState>,
    payload: Result<Json<NavigateRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let plan = build_plan(&request.snapshot, &state.style);
    let mut navigator = PalletNavigator::resume_at(request.current.unwrap_or(0));
    let view = navigator.apply(&plan.pallets, request.action, request.target.as_deref());
    (StatusCode::OK, Json(view)).into_response()
}

/// Handler for POST /plan_stream (SSE).
///
/// Streams plan events as Server-Sent Events while pallets are labelled.
#[utoipa::path(
    post,
    path = "/plan_stream",
    request_body = PlanRequest,
    responses(
        (
            status = 200,
            description = "Streams plan events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request body", body = ErrorResponse)
    ),
    tag = "planning"
)]
async fn handle_plan_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let (tx, rx) = mpsc::channel::<String>(32);
    let style = Arc::clone(&state.style);

    tokio::task::spawn_blocking(move || {
        build_plan_with_progress(&request.snapshot, &style, |evt| {
            if let Ok(json) = serde_json::to_string(evt) {
                // A closed receiver means the client left; later events are dropped.
                let _ = tx.blocking_send(json);
            }
        });
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for POST /share.
#[utoipa::path(
    post,
    path = "/share",
    request_body = PlanSnapshot,
    responses(
        (status = 200, description = "Share link for the snapshot", body = ShareResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request body", body = ErrorResponse)
    ),
    tag = "planning"
)]
async fn handle_share(
    State(state): State<ApiState>,
    payload: Result<Json<PlanSnapshot>, JsonRejection>,
) -> Response {
    let snapshot = match parse_json(payload) {
        Ok(snapshot) => snapshot,
        Err(response) => return response,
    };

    let encoded = encode_share_query(&snapshot).and_then(|query| {
        share_path(&state.share_base, &snapshot).map(|path| (path, query))
    });
    match encoded {
        Ok((path, query)) => (StatusCode::OK, Json(ShareResponse { query, path })).into_response(),
        Err(err) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Could not encode share link",
            err.to_string(),
        ),
    }
}

/// Handler for GET /workbench.
#[utoipa::path(
    get,
    path = "/workbench",
    responses((status = 200, description = "Current session", body = WorkbenchView)),
    tag = "workbench"
)]
async fn handle_workbench_view(State(state): State<ApiState>) -> Json<WorkbenchView> {
    Json(state.workbench.view().await)
}

/// Handler for POST /workbench/edits.
///
/// Applies the edits atomically and schedules a debounced recalculation; the
/// returned view still shows the previous outcome with `pending` set.
#[utoipa::path(
    post,
    path = "/workbench/edits",
    request_body = EditsRequest,
    responses(
        (status = 200, description = "Edits accepted", body = WorkbenchView),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid edit", body = ErrorResponse)
    ),
    tag = "workbench"
)]
async fn handle_workbench_edits(
    State(state): State<ApiState>,
    payload: Result<Json<EditsRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    match state.workbench.apply(&request.edits).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => validation_error(err),
    }
}

/// Handler for POST /workbench/navigate.
#[utoipa::path(
    post,
    path = "/workbench/navigate",
    request_body = WorkbenchNavigateRequest,
    responses(
        (status = 200, description = "Pager after the move", body = PagerView),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request body", body = ErrorResponse)
    ),
    tag = "workbench"
)]
async fn handle_workbench_navigate(
    State(state): State<ApiState>,
    payload: Result<Json<WorkbenchNavigateRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let view = state
        .workbench
        .navigate(request.action, request.target.as_deref())
        .await;
    (StatusCode::OK, Json(view)).into_response()
}

/// Handler for POST /workbench/clear.
#[utoipa::path(
    post,
    path = "/workbench/clear",
    responses((status = 200, description = "Session reset", body = WorkbenchView)),
    tag = "workbench"
)]
async fn handle_workbench_clear(State(state): State<ApiState>) -> Json<WorkbenchView> {
    info!("🧹 Workbench cleared");
    Json(state.workbench.clear().await)
}

/// Handler for POST /workbench/snapshot.
///
/// Replaces the session input, e.g. when the page was opened from a share
/// link, and schedules a recalculation.
#[utoipa::path(
    post,
    path = "/workbench/snapshot",
    request_body = PlanSnapshot,
    responses(
        (status = 200, description = "Snapshot loaded", body = WorkbenchView),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request body", body = ErrorResponse)
    ),
    tag = "workbench"
)]
async fn handle_workbench_load(
    State(state): State<ApiState>,
    payload: Result<Json<PlanSnapshot>, JsonRejection>,
) -> Response {
    let snapshot = match parse_json(payload) {
        Ok(snapshot) => snapshot,
        Err(response) => return response,
    };

    info!("🔗 Loading snapshot into workbench");
    (StatusCode::OK, Json(state.workbench.replace(snapshot).await)).into_response()
}

/// Serves the index.html main page
async fn serve_index() -> Response {
    match WebAssets::get("index.html") {
        Some(content) => Html(content.data).into_response(),
        None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}

/// Serves static assets (JS, CSS, etc.)
async fn serve_static(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');

    match WebAssets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.as_ref())], content.data).into_response()
        }
        None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::model::Quantity;

    fn router() -> Router {
        crate::logging::init_test();
        build_router(ApiState::new(&PlannerConfig::default()))
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .oneshot(builder.body(body).expect("request should build"))
            .await
            .expect("router should answer");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        (status, bytes.to_vec())
    }

    async fn send_json(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = send(app, method, uri, body).await;
        let value = serde_json::from_slice(&bytes).expect("response should be JSON");
        (status, value)
    }

    fn example_snapshot() -> Value {
        json!({
            "buckets": { "A": 10, "B": 5 },
            "extras": { "zeroCase": 3 },
            "bottlePerCase": 12,
            "casePerPallet": 8
        })
    }

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        for path in [
            "/plan",
            "/plan/navigate",
            "/plan_stream",
            "/share",
            "/workbench",
            "/workbench/edits",
            "/workbench/navigate",
            "/workbench/clear",
            "/workbench/snapshot",
        ] {
            assert!(
                paths.contains_key(path),
                "OpenAPI documentation is missing the {path} path"
            );
        }
    }

    #[test]
    fn openapi_doc_contains_key_schemas() {
        let doc = openapi_doc();
        let components = doc
            .components
            .as_ref()
            .expect("OpenAPI documentation contains no components");
        let schemas = &components.schemas;
        for name in ["PlanRequest", "PlanResponse", "PlanSnapshot", "Edit", "ErrorResponse"] {
            assert!(
                schemas.contains_key(name),
                "Expected schema '{}' is missing from OpenAPI spec",
                name
            );
        }
    }

    #[test]
    fn plan_request_current_is_optional() {
        let request: PlanRequest =
            serde_json::from_str(r#"{ "snapshot": {} }"#).expect("Should parse minimal request");
        assert_eq!(request.current, None);
        assert_eq!(request.snapshot, PlanSnapshot::default());
    }

    #[tokio::test]
    async fn post_plan_returns_labelled_pallets() {
        let (status, body) = send_json(
            router(),
            "POST",
            "/plan",
            Some(json!({ "snapshot": example_snapshot(), "current": 5 })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pallets"][0]["text"], "A1-A8");
        assert_eq!(body["pallets"][0]["bottle_count"], 96);
        assert_eq!(
            body["pallets"][1]["text"],
            "A9-A10、B1-B5 short-fill B6(3 units)"
        );
        assert_eq!(body["pallets"][1]["bottle_count"], 87);
        assert_eq!(body["pager"]["current"], 2, "cursor 5 is clamped to the tail");
        assert_eq!(body["summary"]["case_text"], "15 units+3 units");
        assert!(
            body["report"]
                .as_str()
                .is_some_and(|report| report.contains("Pallets: 1 full pallets+7 units+3 units"))
        );
        assert!(
            body["share_path"]
                .as_str()
                .is_some_and(|path| path.starts_with("/?data="))
        );
    }

    #[tokio::test]
    async fn post_plan_saturates_oversized_quantities() {
        let snapshot = json!({
            "buckets": { "A": "79228162514264337593543950335", "B": "1e20" },
            "bottlePerCase": 12,
            "casePerPallet": 100000
        });
        let (status, body) = send_json(
            router(),
            "POST",
            "/plan",
            Some(json!({ "snapshot": snapshot })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"]["total_cases"], 200000.0);
        assert_eq!(body["summary"]["total_bottles"], 2400000.0);
        assert_eq!(body["pallets"][1]["text"], "B1-B100000");
        assert_eq!(body["pager"]["total"], 2);
    }

    #[tokio::test]
    async fn get_plan_decodes_share_link() {
        let mut snapshot = PlanSnapshot::default().with_bucket(BucketName::A, Quantity::whole(3));
        snapshot.case_per_pallet = Some(2);
        let query = encode_share_query(&snapshot).expect("snapshot should encode");

        let (status, body) = send_json(router(), "GET", &format!("/plan?{query}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pallets"][1]["text"], "A3");
        assert_eq!(body["pager"]["total"], 2);
    }

    #[tokio::test]
    async fn broken_share_link_is_unprocessable() {
        let (status, body) = send_json(router(), "GET", "/plan?data=%7Bnope", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Invalid share link");

        let (status, _) = send_json(router(), "GET", "/plan", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn navigate_moves_and_clamps() {
        let (status, body) = send_json(
            router(),
            "POST",
            "/plan/navigate",
            Some(json!({ "snapshot": example_snapshot(), "current": 1, "action": "jump", "target": "9" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["current"], 2);
        assert_eq!(body["bottle_count"], 87);
    }

    #[tokio::test]
    async fn plan_stream_ends_with_finished_event() {
        let (status, bytes) = send(
            router(),
            "POST",
            "/plan_stream",
            Some(json!({ "snapshot": example_snapshot() })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(bytes).expect("SSE body is UTF-8");
        assert!(text.contains(r#""type":"PalletStarted""#));
        assert!(text.contains(r#""type":"Finished""#));
    }

    #[tokio::test]
    async fn share_endpoint_returns_query_and_path() {
        let (status, body) =
            send_json(router(), "POST", "/share", Some(example_snapshot())).await;
        assert_eq!(status, StatusCode::OK);
        let query = body["query"].as_str().expect("query is a string");
        assert!(query.starts_with("data="));
        assert_eq!(body["path"], format!("/?{query}"));
    }

    #[tokio::test]
    async fn unknown_bucket_edit_is_unprocessable() {
        let (status, body) = send_json(
            router(),
            "POST",
            "/workbench/edits",
            Some(json!({ "edits": [{ "kind": "set_bucket", "name": "K", "value": "1" }] })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Invalid input data");
        assert_eq!(body["details"], "Unknown bucket: K");
    }

    #[tokio::test]
    async fn malformed_json_is_unprocessable() {
        let app = router();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/plan")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{ not json"))
                    .expect("request should build"),
            )
            .await
            .expect("router should answer");
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn workbench_clear_resets_session() {
        let (status, body) = send_json(router(), "POST", "/workbench/clear", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pending"], false);
        assert_eq!(body["outcome"]["pager"]["total"], 0);
    }

    #[tokio::test]
    async fn index_page_is_embedded() {
        let (status, bytes) = send(router(), "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8_lossy(&bytes).contains("<html"));
    }
}
