//! REST API for the packing service.
//!
//! Provides the HTTP boundary around the packing pipeline. The `/pack`
//! endpoint accepts either JSON or classic form-encoded payloads; both are
//! parsed into one internal request model so the orchestrator stays
//! payload-format agnostic. Uses Axum as the web framework and supports CORS.

use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::{Form, FromRequest, Json, Request, State};
use axum::{
    Router,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use std::sync::OnceLock;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, PackerConfig};
use crate::model::{BoxType, ContainerTemplate, ValidationError};
use crate::packer::{
    ContainerReport, PackError, PackOptions, PackedItemReport, PackingStrategy, aggregate, pack,
};
use crate::placement::GridPlacer;

#[derive(Clone)]
struct ApiState {
    packer_config: PackerConfig,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>loadplan API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                window.ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                });
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Container template as it arrives in a request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ContainerSpec {
    pub length: f64,
    pub width: f64,
    pub height: f64,
    /// Weight ceiling per container; the configured default applies when
    /// omitted.
    #[serde(default)]
    #[schema(nullable = true)]
    pub max_weight: Option<f64>,
}

impl ContainerSpec {
    fn into_template(self, default_max_weight: f64) -> Result<ContainerTemplate, ValidationError> {
        ContainerTemplate::new(
            (self.length, self.width, self.height),
            self.max_weight.unwrap_or(default_max_weight),
        )
    }
}

/// One box line as it arrives in a request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BoxSpec {
    pub name: String,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub weight: f64,
    pub quantity: f64,
}

impl BoxSpec {
    fn into_box_type(self) -> Result<BoxType, ValidationError> {
        BoxType::new(
            self.name,
            (self.length, self.width, self.height),
            self.weight,
            self.quantity,
        )
    }
}

/// Internal request model shared by the JSON and form payload shapes.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "container": { "length": 10.0, "width": 10.0, "height": 10.0 },
        "boxes": [
            { "name": "Cube", "length": 4.0, "width": 4.0, "height": 4.0, "weight": 1.0, "quantity": 10.0 }
        ],
        "rotation": true,
        "packing_strategy": "best_fit"
    })
)]
pub struct PackRequestBody {
    pub container: ContainerSpec,
    #[serde(default)]
    pub boxes: Vec<BoxSpec>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub bigger_first: Option<bool>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub distribute_items: Option<bool>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub rotation: Option<bool>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub packing_strategy: Option<String>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub verbose: Option<bool>,
}

/// Extractor that accepts `application/json` or
/// `application/x-www-form-urlencoded` bodies on the same route.
pub struct PackPayload(pub PackRequestBody);

impl<S> FromRequest<S> for PackPayload
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if content_type.starts_with("application/json") {
            match Json::<PackRequestBody>::from_request(req, state).await {
                Ok(Json(body)) => Ok(PackPayload(body)),
                Err(err) => Err(json_deserialize_error(err)),
            }
        } else {
            match Form::<Vec<(String, String)>>::from_request(req, state).await {
                Ok(Form(pairs)) => body_from_form_pairs(&pairs)
                    .map(PackPayload)
                    .map_err(|err| validation_error(err.to_string())),
                Err(err) => Err(form_deserialize_error(err)),
            }
        }
    }
}

fn form_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn form_values<'a>(pairs: &'a [(String, String)], key: &str) -> Vec<&'a str> {
    pairs
        .iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .collect()
}

fn parse_numeric_field(field: &str, raw: &str) -> Result<f64, ValidationError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::NonNumericField {
            field: field.to_string(),
            value: raw.to_string(),
        })
}

fn required_numeric_field(
    pairs: &[(String, String)],
    field: &str,
) -> Result<f64, ValidationError> {
    let raw = form_value(pairs, field).ok_or_else(|| ValidationError::MissingField {
        field: field.to_string(),
    })?;
    parse_numeric_field(field, raw)
}

fn form_flag(pairs: &[(String, String)], key: &str) -> Option<bool> {
    form_value(pairs, key).map(|raw| {
        matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

/// Assembles the internal request model from flat form pairs.
///
/// The form shape mirrors the classic HTML frontend: scalar
/// `container_*` fields plus parallel `box_*[]` arrays.
fn body_from_form_pairs(pairs: &[(String, String)]) -> Result<PackRequestBody, ValidationError> {
    let container = ContainerSpec {
        length: required_numeric_field(pairs, "container_length")?,
        width: required_numeric_field(pairs, "container_width")?,
        height: required_numeric_field(pairs, "container_height")?,
        max_weight: form_value(pairs, "container_max_weight")
            .map(|raw| parse_numeric_field("container_max_weight", raw))
            .transpose()?,
    };

    let names = form_values(pairs, "box_name[]");
    let mut boxes = Vec::with_capacity(names.len());
    let columns = [
        ("box_length[]", form_values(pairs, "box_length[]")),
        ("box_width[]", form_values(pairs, "box_width[]")),
        ("box_height[]", form_values(pairs, "box_height[]")),
        ("box_weight[]", form_values(pairs, "box_weight[]")),
        ("box_quantity[]", form_values(pairs, "box_quantity[]")),
    ];
    for (field, values) in &columns {
        if values.len() != names.len() {
            return Err(ValidationError::MismatchedBoxArrays {
                field: field.to_string(),
                expected: names.len(),
                actual: values.len(),
            });
        }
    }

    for (i, name) in names.iter().enumerate() {
        boxes.push(BoxSpec {
            name: name.to_string(),
            length: parse_numeric_field("box_length[]", columns[0].1[i])?,
            width: parse_numeric_field("box_width[]", columns[1].1[i])?,
            height: parse_numeric_field("box_height[]", columns[2].1[i])?,
            weight: parse_numeric_field("box_weight[]", columns[3].1[i])?,
            quantity: parse_numeric_field("box_quantity[]", columns[4].1[i])?,
        });
    }

    Ok(PackRequestBody {
        container,
        boxes,
        bigger_first: form_flag(pairs, "bigger_first"),
        distribute_items: form_flag(pairs, "distribute_items"),
        rotation: form_flag(pairs, "rotation"),
        packing_strategy: form_value(pairs, "packing_strategy").map(str::to_string),
        verbose: form_flag(pairs, "verbose"),
    })
}

/// Response structure with all packed containers.
#[derive(Debug, Serialize, ToSchema)]
pub struct PackResponse {
    pub results: Vec<ContainerReport>,
    pub num_containers: usize,
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

fn form_deserialize_error(err: FormRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid form data",
        err.to_string(),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn pack_error_response(err: PackError) -> Response {
    match err {
        PackError::Validation(err) => validation_error(err.to_string()),
        PackError::UnpackableItem { .. } => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Unpackable item",
            err.to_string(),
        ),
        PackError::PlacementTimeout { .. } => error_response(
            StatusCode::GATEWAY_TIMEOUT,
            "Placement timed out",
            err.to_string(),
        ),
        PackError::Placement(err) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Placement engine failure",
            err.to_string(),
        ),
    }
}

/// Applies request-level flag overrides on top of the configured defaults.
fn request_options(body: &PackRequestBody, config: &PackerConfig) -> PackOptions {
    let mut options = config.pack_options();
    if let Some(bigger_first) = body.bigger_first {
        options.placement.bigger_first = bigger_first;
    }
    if let Some(distribute_items) = body.distribute_items {
        options.placement.distribute_items = distribute_items;
    }
    if let Some(rotation) = body.rotation {
        options.placement.allow_rotation = rotation;
    }
    if let Some(strategy) = body.packing_strategy.as_deref() {
        options.strategy = PackingStrategy::from_name(strategy);
    }
    options
}

/// Runs the whole pipeline for one parsed request.
fn execute(body: PackRequestBody, config: &PackerConfig) -> Result<PackResponse, PackError> {
    let verbose = body.verbose.unwrap_or(true);
    let options = request_options(&body, config);

    let template = body
        .container
        .into_template(config.default_max_weight())?;
    let box_types = body
        .boxes
        .into_iter()
        .map(BoxSpec::into_box_type)
        .collect::<Result<Vec<_>, ValidationError>>()?;

    let outcome = pack(&template, &box_types, &options, &GridPlacer)?;
    let results = aggregate(&outcome.containers, verbose);
    let num_containers = results.len();
    Ok(PackResponse {
        results,
        num_containers,
    })
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_pack),
    components(
        schemas(
            PackRequestBody,
            ContainerSpec,
            BoxSpec,
            PackResponse,
            ContainerReport,
            PackedItemReport,
            ErrorResponse
        )
    ),
    tags((name = "packing", description = "Endpoints for multi-container packing"))
)]
struct ApiDoc;

/// Starts the API server.
///
/// Configures CORS for cross-origin requests. Blocks until the server is
/// terminated.
pub async fn start_api_server(config: ApiConfig, packer_config: PackerConfig) {
    let app = build_router(packer_config);

    let addr = config.socket_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            panic!("❌ Could not bind API server to {}: {}", addr, err);
        }
    };

    let display_host = config.display_host().to_string();
    println!(
        "🚀 Server running on http://{}:{}",
        display_host,
        config.port()
    );
    if config.binds_to_all_interfaces() && config.uses_default_host() {
        println!("💡 Local access: http://localhost:{}", config.port());
    }
    println!("📦 API Endpoints:");
    println!("   - POST /pack");
    println!("📑 Documentation:");
    println!("   - GET /docs");
    println!("   - GET /docs/openapi.json");

    if let Err(err) = axum::serve(listener, app).await {
        eprintln!("❌ API server terminated with an error: {err}");
    }
}

fn build_router(packer_config: PackerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState { packer_config };

    Router::new()
        .route("/pack", post(handle_pack))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .route("/", get(serve_service_info))
        .layer(cors)
        .with_state(state)
}

/// Handler for the POST /pack endpoint.
///
/// Expands the requested box types, validates them against the container
/// template, runs the overflow packing loop, and reports per-container
/// utilization.
#[utoipa::path(
    post,
    path = "/pack",
    request_body = PackRequestBody,
    responses(
        (status = 200, description = "Successfully packed all items", body = PackResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request data or an item that fits no container",
            body = ErrorResponse
        ),
        (
            status = GATEWAY_TIMEOUT,
            description = "Placement exceeded the configured time budget",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack(State(state): State<ApiState>, payload: PackPayload) -> Response {
    let PackPayload(body) = payload;

    println!(
        "📥 New pack request: {} box types, container {:?}",
        body.boxes.len(),
        (body.container.length, body.container.width, body.container.height)
    );

    match execute(body, &state.packer_config) {
        Ok(response) => {
            println!("📦 Result: {} containers", response.num_containers);
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => {
            println!("🚫 Pack request failed: {}", err);
            pack_error_response(err)
        }
    }
}

async fn serve_service_info() -> impl IntoResponse {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
