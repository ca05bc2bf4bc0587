use crate::{prompt::Payload, GenerationError};
use protoforge_sdk::{
    LanguageModel, LanguageModelInput, Message, ResponseFormatJson, ResponseFormatOption,
};
use std::sync::Arc;
use tracing::debug;

/// What the backend is asked to produce.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputKind {
    Html,
    /// JSON constrained by the given schema.
    Json(ResponseFormatJson),
}

/// Sends one payload to the generation backend and returns its cleaned
/// text. One call per dispatch, never retried.
#[derive(Clone)]
pub struct Dispatcher {
    model: Arc<dyn LanguageModel + Send + Sync>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel + Send + Sync>) -> Self {
        Self { model }
    }

    #[must_use]
    pub fn model_id(&self) -> String {
        self.model.model_id()
    }

    pub async fn dispatch(
        &self,
        payload: Payload,
        kind: OutputKind,
    ) -> Result<String, GenerationError> {
        let is_html = matches!(kind, OutputKind::Html);
        let response_format = match kind {
            OutputKind::Html => None,
            OutputKind::Json(format) => Some(ResponseFormatOption::Json(format)),
        };

        let input = LanguageModelInput {
            messages: vec![Message::user(payload.parts)],
            response_format,
            ..Default::default()
        };

        debug!(
            provider = self.model.provider(),
            model = %self.model.model_id(),
            structured = !is_html,
            "dispatching to generation backend"
        );
        let response = self.model.generate(input).await?;

        let text = response.text().ok_or_else(|| {
            GenerationError::MalformedResponse("backend returned no text".to_string())
        })?;
        let text = strip_code_fences(&text);

        if is_html && text.is_empty() {
            return Err(GenerationError::MalformedResponse(
                "backend returned empty markup".to_string(),
            ));
        }

        Ok(text)
    }
}

const FENCE: &str = "```";
const FENCE_LANGUAGES: [&str; 2] = ["html", "json"];

/// Remove markdown code fence markers (with or without an `html`/`json`
/// tag) anywhere in the text, then trim.
#[must_use]
pub fn strip_code_fences(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(index) = rest.find(FENCE) {
        output.push_str(&rest[..index]);
        rest = &rest[index + FENCE.len()..];
        for language in FENCE_LANGUAGES {
            if rest
                .get(..language.len())
                .is_some_and(|tag| tag.eq_ignore_ascii_case(language))
            {
                rest = &rest[language.len()..];
                break;
            }
        }
    }
    output.push_str(rest);

    output.trim().to_string()
}
