use crate::{
    prompt::{GenerationMode, GenerationRequest, ReferenceImage},
    style_memory::TemplateDraft,
    verifier::SimilarityReport,
    ConfigError, Studio, StudioError,
};
use axum::{
    extract::{multipart::Field, DefaultBodyLimit, Multipart, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

/// Uploads are screenshots; a handful of them fit comfortably.
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Errors returned to HTTP clients as `{"error": message}`.
#[derive(Debug)]
pub enum ServerError {
    BadRequest(String),
    BadGateway(String),
    Internal(String),
    ServiceUnavailable(String),
}

impl From<StudioError> for ServerError {
    fn from(error: StudioError) -> Self {
        match error {
            StudioError::InvalidInput(message) => Self::BadRequest(message),
            StudioError::Generation(error) => Self::BadGateway(error.to_string()),
            StudioError::Store(error) => Self::BadGateway(error.to_string()),
            StudioError::Persistence(error) => Self::Internal(error.to_string()),
            StudioError::StyleMemoryDisabled => Self::ServiceUnavailable(
                "Style memory is not configured. Set QDRANT_URL to enable it.".to_string(),
            ),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::BadGateway(message) => (StatusCode::BAD_GATEWAY, message),
            Self::Internal(message) => {
                error!(%message, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            Self::ServiceUnavailable(message) => (StatusCode::SERVICE_UNAVAILABLE, message),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HtmlResponse {
    pub html: String,
}

#[derive(Debug, Deserialize)]
pub struct RefineBody {
    pub current_html: String,
    pub instructions: String,
}

#[derive(Debug, Deserialize)]
pub struct RuleBody {
    pub rule: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RuleAdded {
    pub added: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TemplateCreated {
    pub id: String,
}

/// Build the HTTP surface over a shared [`Studio`].
pub fn router(studio: Arc<Studio>) -> Router {
    Router::new()
        .route("/generate-code", post(generate_code))
        .route("/refine-code", post(refine_code))
        .route("/verify-design", post(verify_design))
        .route("/memory-rules", get(list_rules).post(add_rule))
        .route("/style-templates", post(create_style_template))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(studio)
}

/// Restrict CORS to `app_url` when set, allow any origin otherwise.
pub fn cors_layer(app_url: Option<&str>) -> Result<CorsLayer, ConfigError> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    match app_url {
        Some(url) => {
            let origin = url
                .trim_end_matches('/')
                .parse::<HeaderValue>()
                .map_err(|_| ConfigError::Invalid {
                    name: "APP_URL",
                    value: url.to_string(),
                })?;
            Ok(layer.allow_origin(origin))
        }
        None => Ok(layer.allow_origin(Any)),
    }
}

async fn field_text(field: Field<'_>) -> Result<String, ServerError> {
    field
        .text()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Read error: {e}")))
}

async fn field_image(field: Field<'_>) -> Result<ReferenceImage, ServerError> {
    let file_name = field
        .file_name()
        .or_else(|| field.name())
        .unwrap_or("upload")
        .to_string();
    let data = field
        .bytes()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Read error: {e}")))?;
    Ok(ReferenceImage::new(file_name, data.to_vec()))
}

fn multipart_error(error: &axum::extract::multipart::MultipartError) -> ServerError {
    ServerError::BadRequest(format!("Multipart error: {error}"))
}

/// Generate a prototype from reference screenshots.
///
/// # Multipart Fields
/// - `prompt`: instruction text (optional, may be empty)
/// - `mode`: `clone-layout` (default), `restyle` or `marketing-asset`
/// - `contexts`: one label per file, repeated, in file order
/// - `files`: reference images, repeated. Empty files are skipped together
///   with their label.
async fn generate_code(
    State(studio): State<Arc<Studio>>,
    mut multipart: Multipart,
) -> Result<Json<HtmlResponse>, ServerError> {
    let mut instruction = String::new();
    let mut mode = GenerationMode::default();
    let mut contexts: Vec<String> = Vec::new();
    let mut files: Vec<ReferenceImage> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e))?
    {
        let field_name = field.name().map(ToString::to_string);
        match field_name.as_deref() {
            Some("prompt") => instruction = field_text(field).await?,
            Some("mode") => {
                mode = field_text(field)
                    .await?
                    .parse()
                    .map_err(ServerError::BadRequest)?;
            }
            Some("contexts") => contexts.push(field_text(field).await?),
            Some("files") => files.push(field_image(field).await?),
            _ => {}
        }
    }

    let (images, contexts): (Vec<_>, Vec<_>) = files
        .into_iter()
        .enumerate()
        .filter(|(_, image)| !image.data.is_empty())
        .map(|(index, image)| (image, contexts.get(index).cloned().unwrap_or_default()))
        .unzip();

    let request = GenerationRequest::new(instruction)
        .with_mode(mode)
        .with_images(images, contexts);
    let artifact = studio.generate(request).await?;

    Ok(Json(HtmlResponse {
        html: artifact.final_markup,
    }))
}

async fn refine_code(
    State(studio): State<Arc<Studio>>,
    Json(body): Json<RefineBody>,
) -> Result<Json<HtmlResponse>, ServerError> {
    let artifact = studio.refine(&body.current_html, &body.instructions).await?;
    Ok(Json(HtmlResponse {
        html: artifact.final_markup,
    }))
}

/// Compare a reference screenshot with a screenshot of the generated page.
///
/// # Multipart Fields
/// - `original_file`: the reference design (required)
/// - `generated_screenshot`: the rendered prototype (required)
async fn verify_design(
    State(studio): State<Arc<Studio>>,
    mut multipart: Multipart,
) -> Result<Json<SimilarityReport>, ServerError> {
    let mut original: Option<ReferenceImage> = None;
    let mut generated: Option<ReferenceImage> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e))?
    {
        let field_name = field.name().map(ToString::to_string);
        match field_name.as_deref() {
            Some("original_file") => original = Some(field_image(field).await?),
            Some("generated_screenshot") => generated = Some(field_image(field).await?),
            _ => {}
        }
    }

    let original = original
        .filter(|image| !image.data.is_empty())
        .ok_or_else(|| ServerError::BadRequest("Missing original_file".to_string()))?;
    let generated = generated
        .filter(|image| !image.data.is_empty())
        .ok_or_else(|| ServerError::BadRequest("Missing generated_screenshot".to_string()))?;

    Ok(Json(studio.verify(&original, &generated).await))
}

async fn list_rules(State(studio): State<Arc<Studio>>) -> Result<Json<Vec<String>>, ServerError> {
    Ok(Json(studio.rules().await?))
}

async fn add_rule(
    State(studio): State<Arc<Studio>>,
    Json(body): Json<RuleBody>,
) -> Result<Json<RuleAdded>, ServerError> {
    let added = studio.remember_rule(&body.rule).await?;
    Ok(Json(RuleAdded { added }))
}

async fn create_style_template(
    State(studio): State<Arc<Studio>>,
    Json(draft): Json<TemplateDraft>,
) -> Result<Json<TemplateCreated>, ServerError> {
    let id = studio.ingest_template(&draft).await?;
    Ok(Json(TemplateCreated { id }))
}
