use super::{
    api::{Content, EmbedContentRequest, EmbedContentResponse, Part as GooglePart},
    model::{build_headers, DEFAULT_BASE_URL, PROVIDER},
    GoogleModelOptions,
};
use crate::{client_utils, EmbeddingModel, LanguageModelError, LanguageModelResult};
use reqwest::Client;
use std::collections::HashMap;

/// Text embeddings through `models.embedContent`.
///
/// The requested dimension is forwarded as `outputDimensionality`. Vectors are
/// returned as the provider sends them; callers that need a fixed length check
/// it themselves.
pub struct GoogleEmbeddingModel {
    model_id: String,
    dimension: usize,
    api_key: String,
    base_url: String,
    client: Client,
    headers: HashMap<String, String>,
}

impl GoogleEmbeddingModel {
    #[must_use]
    pub fn new(model_id: impl Into<String>, dimension: usize, options: GoogleModelOptions) -> Self {
        let GoogleModelOptions {
            api_key,
            base_url,
            headers,
            client,
        } = options;

        Self {
            model_id: model_id.into(),
            dimension,
            api_key,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            client: client.unwrap_or_else(Client::new),
            headers: headers.unwrap_or_default(),
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingModel for GoogleEmbeddingModel {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn model_id(&self) -> String {
        self.model_id.clone()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> LanguageModelResult<Vec<f32>> {
        crate::opentelemetry::trace_embed(PROVIDER, &self.model_id, text, || async move {
            if text.trim().is_empty() {
                return Err(LanguageModelError::InvalidInput(
                    "Cannot embed empty text".to_string(),
                ));
            }

            let request = EmbedContentRequest {
                model: format!("models/{}", self.model_id),
                content: Content {
                    role: None,
                    parts: Some(vec![GooglePart {
                        text: Some(text.to_string()),
                        ..Default::default()
                    }]),
                },
                output_dimensionality: Some(self.dimension),
            };

            let url = format!("{}/models/{}:embedContent", self.base_url, self.model_id);
            let headers = build_headers(&self.api_key, &self.headers)?;
            let response: EmbedContentResponse =
                client_utils::post_json(&self.client, &url, &request, headers).await?;

            Ok(response.embedding.values)
        })
        .await
    }
}
