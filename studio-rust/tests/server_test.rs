mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use common::PNG_HEADER;
use protoforge_sdk::{
    testing::{MockGenerateResult, MockLanguageModel},
    LanguageModelError,
};
use protoforge_studio::{
    postprocess::DESIGN_TOOLS_MARKER, rules::InMemoryRuleStore, server::router, Studio,
    StudioParams,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "protoforge-test-boundary";

enum FormPart<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart(parts: &[FormPart<'_>]) -> Body {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            FormPart::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            FormPart::File(name, file_name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    Body::from(body)
}

fn multipart_request(uri: &str, parts: &[FormPart<'_>]) -> Request<Body> {
    Request::post(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(multipart(parts))
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn app(model: &Arc<MockLanguageModel>) -> Router {
    router(Arc::new(Studio::new(StudioParams::new(
        model.clone(),
        Arc::new(InMemoryRuleStore::new()),
    ))))
}

#[tokio::test]
async fn generate_code_returns_final_markup() {
    let model = Arc::new(MockLanguageModel::new());
    model.enqueue_generate(MockGenerateResult::text(
        "```html\n<html><body><img src=\"LOGO_TOKEN\"></body></html>\n```",
    ));
    let mut image = PNG_HEADER.to_vec();
    image.push(1);

    let (status, body) = send(
        app(&model),
        multipart_request(
            "/generate-code",
            &[
                FormPart::Text("prompt", "match colors"),
                FormPart::Text("mode", "restyle"),
                FormPart::Text("contexts", "Target app"),
                FormPart::Text("contexts", "Skipped"),
                FormPart::Text("contexts", "Inspiration site"),
                FormPart::File("files", "target.png", &image),
                FormPart::File("files", "empty.png", &[]),
                FormPart::File("files", "inspiration.png", &image),
            ],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let html = body["html"].as_str().unwrap();
    assert!(html.contains(DESIGN_TOOLS_MARKER));
    assert!(html.contains("https://via.placeholder.com/150x50?text=Logo"));

    let inputs = model.tracked_generate_inputs();
    let prompt: String = inputs[0].texts().collect();
    assert_eq!(inputs[0].images().count(), 2);
    assert!(prompt.contains("- Image 1 (target): Target app"));
    assert!(prompt.contains("- Image 2 (inspiration): Inspiration site"));
    assert!(!prompt.contains("Skipped"));
}

#[tokio::test]
async fn unknown_mode_is_a_bad_request() {
    let model = Arc::new(MockLanguageModel::new());

    let (status, body) = send(
        app(&model),
        multipart_request("/generate-code", &[FormPart::Text("mode", "poster")]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("poster"));
    assert!(model.tracked_generate_inputs().is_empty());
}

#[tokio::test]
async fn backend_failure_is_a_bad_gateway() {
    let model = Arc::new(MockLanguageModel::new());
    model.enqueue_generate(LanguageModelError::Refusal("blocked".to_string()));

    let (status, body) = send(
        app(&model),
        multipart_request("/generate-code", &[FormPart::Text("prompt", "Hero")]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("blocked"));
}

#[tokio::test]
async fn refine_code_returns_updated_markup() {
    let model = Arc::new(MockLanguageModel::new());
    model.enqueue_generate(MockGenerateResult::text("<html><body><h1>Big</h1></body></html>"));

    let (status, body) = send(
        app(&model),
        json_request(
            "POST",
            "/refine-code",
            &json!({ "current_html": "<html><body><h1>Hi</h1></body></html>", "instructions": "Bigger" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["html"].as_str().unwrap().contains("<h1>Big</h1>"));
}

#[tokio::test]
async fn verify_design_requires_both_images() {
    let model = Arc::new(MockLanguageModel::new());

    let (status, _) = send(
        app(&model),
        multipart_request(
            "/verify-design",
            &[FormPart::File("original_file", "a.png", &PNG_HEADER)],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(model.tracked_generate_inputs().is_empty());
}

#[tokio::test]
async fn verify_design_degrades_instead_of_failing() {
    let model = Arc::new(MockLanguageModel::new());
    model.enqueue_generate(MockGenerateResult::text("not json"));

    let (status, body) = send(
        app(&model),
        multipart_request(
            "/verify-design",
            &[
                FormPart::File("original_file", "a.png", &PNG_HEADER),
                FormPart::File("generated_screenshot", "b.png", &PNG_HEADER),
            ],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["similarity_score"], 0);
    assert_eq!(body["similar_features"], json!([]));
    assert_eq!(body["dissimilar_features"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn memory_rules_round_trip_over_http() {
    let model = Arc::new(MockLanguageModel::new());
    let app = app(&model);

    let (status, first) = send(
        app.clone(),
        json_request("POST", "/memory-rules", &json!({ "rule": "No gradients" })),
    )
    .await;
    let (_, second) = send(
        app.clone(),
        json_request("POST", "/memory-rules", &json!({ "rule": "No gradients" })),
    )
    .await;
    let (blank, _) = send(
        app.clone(),
        json_request("POST", "/memory-rules", &json!({ "rule": " " })),
    )
    .await;
    let (_, rules) = send(
        app,
        Request::get("/memory-rules").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, json!({ "added": true }));
    assert_eq!(second, json!({ "added": false }));
    assert_eq!(blank, StatusCode::BAD_REQUEST);
    assert_eq!(rules, json!(["No gradients"]));
}

#[tokio::test]
async fn style_templates_need_style_memory() {
    let model = Arc::new(MockLanguageModel::new());

    let (status, body) = send(
        app(&model),
        json_request(
            "POST",
            "/style-templates",
            &json!({ "name": "Dashboard", "overall_description": "Dark" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().is_some());
}
