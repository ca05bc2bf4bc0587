mod common;

use axum::http::StatusCode;
use common::{BoxedError, StubServer};
use protoforge_sdk::{
    google::{GoogleEmbeddingModel, GoogleModel, GoogleModelOptions},
    EmbeddingModel, ImagePart, LanguageModel, LanguageModelError, LanguageModelInput, Message,
    Part, ResponseFormatJson, ResponseFormatOption,
};
use serde_json::json;

fn options(stub: &StubServer) -> GoogleModelOptions {
    GoogleModelOptions {
        api_key: "test-key".to_string(),
        base_url: Some(stub.url().to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn generate_sends_interleaved_parts_and_reads_text() -> Result<(), BoxedError> {
    let stub = StubServer::start().await?;
    stub.respond(
        StatusCode::OK,
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "<html></html>" }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 3 }
        }),
    );

    let model = GoogleModel::new("gemini-2.5-flash", options(&stub));
    let response = model
        .generate(LanguageModelInput {
            messages: vec![Message::user(vec![
                Part::text("Rebuild this layout"),
                Part::Image(ImagePart::from_bytes(&[1, 2, 3], "image/png")),
            ])],
            ..Default::default()
        })
        .await?;

    assert_eq!(response.text().as_deref(), Some("<html></html>"));
    assert_eq!(response.usage.map(|u| u.input_tokens), Some(12));

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].uri, "/models/gemini-2.5-flash:generateContent");
    assert_eq!(requests[0].header("x-goog-api-key"), Some("test-key"));
    let body = requests[0].body.clone().unwrap_or_default();
    assert_eq!(body["contents"][0]["role"], "user");
    assert_eq!(body["contents"][0]["parts"][0]["text"], "Rebuild this layout");
    assert_eq!(
        body["contents"][0]["parts"][1]["inlineData"],
        json!({ "data": "AQID", "mimeType": "image/png" })
    );

    stub.stop().await;
    Ok(())
}

#[tokio::test]
async fn generate_forwards_json_schema() -> Result<(), BoxedError> {
    let stub = StubServer::start().await?;
    stub.respond(
        StatusCode::OK,
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "{}" }] }
            }]
        }),
    );

    let model = GoogleModel::new("gemini-2.5-flash-lite", options(&stub));
    model
        .generate(LanguageModelInput {
            messages: vec![Message::user(vec![Part::text("compare")])],
            response_format: Some(ResponseFormatOption::Json(ResponseFormatJson {
                name: "report".to_string(),
                description: None,
                schema: Some(json!({ "type": "object" })),
            })),
            ..Default::default()
        })
        .await?;

    let body = stub.requests()[0].body.clone().unwrap_or_default();
    assert_eq!(
        body["generationConfig"]["responseMimeType"],
        "application/json"
    );
    assert_eq!(
        body["generationConfig"]["responseJsonSchema"],
        json!({ "type": "object" })
    );

    stub.stop().await;
    Ok(())
}

#[tokio::test]
async fn generate_surfaces_status_errors() -> Result<(), BoxedError> {
    let stub = StubServer::start().await?;
    stub.respond(
        StatusCode::TOO_MANY_REQUESTS,
        json!({ "error": { "message": "quota" } }),
    );

    let model = GoogleModel::new("gemini-2.5-flash", options(&stub));
    let result = model
        .generate(LanguageModelInput {
            messages: vec![Message::user(vec![Part::text("hi")])],
            ..Default::default()
        })
        .await;

    match result {
        Err(LanguageModelError::StatusCode(status, body)) => {
            assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
            assert!(body.contains("quota"));
        }
        other => panic!("expected status error, got {other:?}"),
    }

    stub.stop().await;
    Ok(())
}

#[tokio::test]
async fn generate_maps_blocked_prompt_to_refusal() -> Result<(), BoxedError> {
    let stub = StubServer::start().await?;
    stub.respond(
        StatusCode::OK,
        json!({ "promptFeedback": { "blockReason": "SAFETY" } }),
    );

    let model = GoogleModel::new("gemini-2.5-flash", options(&stub));
    let result = model
        .generate(LanguageModelInput {
            messages: vec![Message::user(vec![Part::text("hi")])],
            ..Default::default()
        })
        .await;

    assert!(matches!(result, Err(LanguageModelError::Refusal(_))));

    stub.stop().await;
    Ok(())
}

#[tokio::test]
async fn embed_requests_output_dimensionality() -> Result<(), BoxedError> {
    let stub = StubServer::start().await?;
    stub.respond(
        StatusCode::OK,
        json!({ "embedding": { "values": [0.1, 0.2, 0.3] } }),
    );

    let model = GoogleEmbeddingModel::new("text-embedding-004", 3, options(&stub));
    let vector = model.embed("minimal dark dashboard").await?;

    assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    let request = &stub.requests()[0];
    assert_eq!(request.uri, "/models/text-embedding-004:embedContent");
    assert_eq!(request.header("x-goog-api-key"), Some("test-key"));
    let body = request.body.clone().unwrap_or_default();
    assert_eq!(body["model"], "models/text-embedding-004");
    assert_eq!(body["outputDimensionality"], 3);
    assert_eq!(body["content"]["parts"][0]["text"], "minimal dark dashboard");

    stub.stop().await;
    Ok(())
}

#[tokio::test]
async fn embed_returns_vectors_as_received() -> Result<(), BoxedError> {
    let stub = StubServer::start().await?;
    stub.respond(StatusCode::OK, json!({ "embedding": { "values": [0.1] } }));

    let model = GoogleEmbeddingModel::new("text-embedding-004", 3, options(&stub));
    let vector = model.embed("anything").await?;

    assert_eq!(vector, vec![0.1]);

    stub.stop().await;
    Ok(())
}

#[tokio::test]
async fn transport_errors_do_not_echo_the_api_key() {
    let options = GoogleModelOptions {
        api_key: "SUPER_SECRET_KEY".to_string(),
        base_url: Some("http://127.0.0.1:1".to_string()),
        ..Default::default()
    };

    let generate = GoogleModel::new("gemini-2.5-flash", options.clone())
        .generate(LanguageModelInput {
            messages: vec![Message::user(vec![Part::text("hi")])],
            ..Default::default()
        })
        .await
        .unwrap_err();
    let embed = GoogleEmbeddingModel::new("text-embedding-004", 3, options)
        .embed("hi")
        .await
        .unwrap_err();

    for error in [generate, embed] {
        assert!(matches!(error, LanguageModelError::Transport(_)), "{error}");
        assert!(!error.to_string().contains("SUPER_SECRET_KEY"), "{error}");
        assert!(!format!("{error:?}").contains("SUPER_SECRET_KEY"), "{error:?}");
    }
}
