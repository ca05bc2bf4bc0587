use super::api::{
    Blob, Content, FinishReason, GenerateContentConfig, GenerateContentParameters,
    GenerateContentResponse, GenerateContentResponseUsageMetadata, Part as GooglePart,
};
use crate::{
    client_utils, ImagePart, LanguageModel, LanguageModelError, LanguageModelInput,
    LanguageModelResult, Message, ModelResponse, ModelUsage, Part, ResponseFormatOption,
};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client,
};
use std::collections::HashMap;

pub(super) const PROVIDER: &str = "google";
pub(super) const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GoogleModel {
    model_id: String,
    api_key: String,
    base_url: String,
    client: Client,
    headers: HashMap<String, String>,
}

#[derive(Clone, Default)]
pub struct GoogleModelOptions {
    pub api_key: String,
    pub base_url: Option<String>,
    pub headers: Option<HashMap<String, String>>,
    pub client: Option<Client>,
}

impl GoogleModel {
    #[must_use]
    pub fn new(model_id: impl Into<String>, options: GoogleModelOptions) -> Self {
        let GoogleModelOptions {
            api_key,
            base_url,
            headers,
            client,
        } = options;

        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let client = client.unwrap_or_else(Client::new);
        let headers = headers.unwrap_or_default();

        Self {
            model_id: model_id.into(),
            api_key,
            base_url,
            client,
            headers,
        }
    }

    fn request_headers(&self) -> LanguageModelResult<HeaderMap> {
        build_headers(&self.api_key, &self.headers)
    }
}

/// The key travels in `x-goog-api-key`, never in the URL, so transport
/// errors that echo the URL cannot leak it.
pub(super) fn build_headers(
    api_key: &str,
    extra: &HashMap<String, String>,
) -> LanguageModelResult<HeaderMap> {
    let mut headers = HeaderMap::new();

    let mut key = HeaderValue::from_str(api_key).map_err(|error| {
        LanguageModelError::InvalidInput(format!("Invalid Google API key: {error}"))
    })?;
    key.set_sensitive(true);
    headers.insert(API_KEY_HEADER, key);

    for (key, value) in extra {
        let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|error| {
            LanguageModelError::InvalidInput(format!("Invalid Google header name '{key}': {error}"))
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|error| {
            LanguageModelError::InvalidInput(format!(
                "Invalid Google header value for '{key}': {error}"
            ))
        })?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

#[async_trait::async_trait]
impl LanguageModel for GoogleModel {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn model_id(&self) -> String {
        self.model_id.clone()
    }

    async fn generate(&self, input: LanguageModelInput) -> LanguageModelResult<ModelResponse> {
        crate::opentelemetry::trace_generate(
            self.provider(),
            &self.model_id(),
            input,
            |input| async move {
                let params = convert_to_generate_content_parameters(input);

                let url = format!("{}/models/{}:generateContent", self.base_url, self.model_id);

                let headers = self.request_headers()?;
                let response: GenerateContentResponse =
                    client_utils::post_json(&self.client, &url, &params, headers).await?;

                map_google_response(response)
            },
        )
        .await
    }
}

fn convert_to_generate_content_parameters(input: LanguageModelInput) -> GenerateContentParameters {
    let mut params = GenerateContentParameters {
        contents: convert_to_google_contents(input.messages),
        ..Default::default()
    };
    let mut config = GenerateContentConfig::default();

    if let Some(system_prompt) = input.system_prompt {
        params.system_instruction = Some(Content {
            role: Some("system".to_string()),
            parts: Some(vec![GooglePart {
                text: Some(system_prompt),
                ..Default::default()
            }]),
        });
    }

    if let Some(temp) = input.temperature {
        config.temperature = Some(temp);
    }
    if let Some(max_tokens) = input.max_tokens {
        config.max_output_tokens = Some(max_tokens);
    }

    if let Some(response_format) = input.response_format {
        let (response_mime_type, response_json_schema) =
            convert_to_google_response_schema(response_format);
        config.response_mime_type = Some(response_mime_type);
        config.response_json_schema = response_json_schema;
    }

    params.generation_config = Some(config);

    params
}

fn convert_to_google_contents(messages: Vec<Message>) -> Vec<Content> {
    messages
        .into_iter()
        .map(|message| match message {
            Message::User(user_message) => Content {
                role: Some("user".to_string()),
                parts: Some(
                    user_message
                        .content
                        .into_iter()
                        .map(convert_to_google_part)
                        .collect(),
                ),
            },
            Message::Assistant(assistant_message) => Content {
                role: Some("model".to_string()),
                parts: Some(
                    assistant_message
                        .content
                        .into_iter()
                        .map(convert_to_google_part)
                        .collect(),
                ),
            },
        })
        .collect()
}

fn convert_to_google_part(part: Part) -> GooglePart {
    match part {
        Part::Text(text_part) => GooglePart {
            text: Some(text_part.text),
            ..Default::default()
        },
        Part::Image(image_part) => GooglePart {
            inline_data: Some(Blob {
                data: Some(image_part.image_data),
                mime_type: Some(image_part.mime_type),
            }),
            ..Default::default()
        },
    }
}

fn convert_to_google_response_schema(
    response_format: ResponseFormatOption,
) -> (String, Option<serde_json::Value>) {
    match response_format {
        ResponseFormatOption::Text => ("text/plain".to_string(), None),
        ResponseFormatOption::Json(json_format) => {
            ("application/json".to_string(), json_format.schema)
        }
    }
}

fn map_google_response(response: GenerateContentResponse) -> LanguageModelResult<ModelResponse> {
    let Some(candidate) = response.candidates.and_then(|c| c.into_iter().next()) else {
        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(LanguageModelError::Refusal(format!(
                "Prompt blocked by provider: {reason}"
            )));
        }
        return Err(LanguageModelError::Invariant(
            PROVIDER,
            "No candidate in response".to_string(),
        ));
    };

    if let Some(
        reason @ (FinishReason::Safety
        | FinishReason::Blocklist
        | FinishReason::ProhibitedContent
        | FinishReason::ImageSafety),
    ) = candidate.finish_reason
    {
        return Err(LanguageModelError::Refusal(format!(
            "Generation stopped by provider: {reason:?}"
        )));
    }

    let content = map_google_content(candidate.content.and_then(|c| c.parts).unwrap_or_default())?;
    let usage = response
        .usage_metadata
        .as_ref()
        .map(map_google_usage_metadata);

    Ok(ModelResponse { content, usage })
}

fn map_google_content(parts: Vec<GooglePart>) -> LanguageModelResult<Vec<Part>> {
    parts
        .into_iter()
        .filter_map(|part| {
            if let Some(text) = part.text {
                // Thought summaries are not part of the answer.
                if part.thought.unwrap_or(false) {
                    None
                } else {
                    Some(Ok(Part::text(text)))
                }
            } else if let Some(inline_data) = part.inline_data {
                match (inline_data.data, inline_data.mime_type) {
                    (Some(data), Some(mime_type)) if mime_type.starts_with("image/") => {
                        Some(Ok(Part::Image(ImagePart::new(data, mime_type))))
                    }
                    (Some(_), Some(_)) => None,
                    _ => Some(Err(LanguageModelError::Invariant(
                        PROVIDER,
                        "Inline data missing data or mime type".to_string(),
                    ))),
                }
            } else {
                None
            }
        })
        .collect()
}

fn map_google_usage_metadata(usage: &GenerateContentResponseUsageMetadata) -> ModelUsage {
    ModelUsage {
        input_tokens: usage.prompt_token_count.unwrap_or(0),
        output_tokens: usage.candidates_token_count.unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ResponseFormatJson, UserMessage};
    use serde_json::json;

    #[test]
    fn converts_interleaved_parts_in_order() {
        let params = convert_to_generate_content_parameters(LanguageModelInput {
            messages: vec![Message::User(UserMessage {
                content: vec![
                    Part::text("Compare"),
                    Part::image("AAAA", "image/png"),
                    Part::image("BBBB", "image/jpeg"),
                ],
            })],
            ..Default::default()
        });

        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(
            value["contents"][0]["parts"],
            json!([
                { "text": "Compare" },
                { "inlineData": { "data": "AAAA", "mimeType": "image/png" } },
                { "inlineData": { "data": "BBBB", "mimeType": "image/jpeg" } },
            ])
        );
    }

    #[test]
    fn json_response_format_sets_mime_type_and_schema() {
        let params = convert_to_generate_content_parameters(LanguageModelInput {
            messages: vec![Message::user(vec![Part::text("hi")])],
            response_format: Some(ResponseFormatOption::Json(ResponseFormatJson {
                name: "report".to_string(),
                description: None,
                schema: Some(json!({ "type": "object" })),
            })),
            ..Default::default()
        });

        let config = params.generation_config.unwrap();
        assert_eq!(config.response_mime_type.as_deref(), Some("application/json"));
        assert_eq!(config.response_json_schema, Some(json!({ "type": "object" })));
    }

    #[test]
    fn safety_finish_reason_is_a_refusal() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();

        let result = map_google_response(response);

        assert!(matches!(result, Err(LanguageModelError::Refusal(_))));
    }

    #[test]
    fn unknown_finish_reason_still_parses() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "<div></div>" }] },
                "finishReason": "SOMETHING_NEW"
            }]
        }))
        .unwrap();

        let result = map_google_response(response).unwrap();

        assert_eq!(result.text().as_deref(), Some("<div></div>"));
    }

    #[test]
    fn thought_parts_are_dropped() {
        let parts = vec![
            GooglePart {
                text: Some("thinking".to_string()),
                thought: Some(true),
                ..Default::default()
            },
            GooglePart {
                text: Some("answer".to_string()),
                ..Default::default()
            },
        ];

        let content = map_google_content(parts).unwrap();

        assert_eq!(content, vec![Part::text("answer")]);
    }
}
