use crate::{LanguageModelInput, LanguageModelResult, ModelResponse, ModelUsage};
use opentelemetry::trace::Status;
use std::time::Instant;
use tracing::{info_span, Span};
use tracing_futures::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub struct LmSpan {
    span: Span,
    usage: Option<ModelUsage>,
    start_time: Instant,
    image_count: usize,
    max_tokens: Option<u32>,
    temperature: Option<f64>,
    structured: bool,
}

impl LmSpan {
    pub fn new(provider: &str, model_id: &str, input: &LanguageModelInput) -> Self {
        let span = info_span!("protoforge_sdk.generate");
        span.set_attribute("gen_ai.operation.name", "generate_content");
        span.set_attribute("gen_ai.provider.name", provider.to_string());
        span.set_attribute("gen_ai.request.model", model_id.to_string());

        Self {
            span,
            usage: None,
            start_time: Instant::now(),
            image_count: input.images().count(),
            max_tokens: input.max_tokens,
            temperature: input.temperature,
            structured: matches!(
                input.response_format,
                Some(crate::ResponseFormatOption::Json(_))
            ),
        }
    }

    fn span(&self) -> Span {
        self.span.clone()
    }

    pub async fn instrument_future<F>(&self, future: F) -> F::Output
    where
        F: std::future::Future,
    {
        future.instrument(self.span()).await
    }

    pub fn on_response(&mut self, response: &ModelResponse) {
        if let Some(usage) = &response.usage {
            self.usage = Some(usage.clone());
        }
    }

    pub fn on_error(&mut self, error: &(dyn std::error::Error + 'static)) {
        self.span
            .set_attribute("exception.message", error.to_string());
        self.span.set_status(Status::error(error.to_string()));
    }

    pub fn on_end(&mut self) {
        if let Some(usage) = &self.usage {
            self.span
                .set_attribute("gen_ai.usage.input_tokens", i64::from(usage.input_tokens));
            self.span
                .set_attribute("gen_ai.usage.output_tokens", i64::from(usage.output_tokens));
        }
        if let Some(max_tokens) = self.max_tokens {
            self.span
                .set_attribute("gen_ai.request.max_tokens", i64::from(max_tokens));
        }
        if let Some(temperature) = self.temperature {
            self.span
                .set_attribute("gen_ai.request.temperature", temperature);
        }
        self.span.set_attribute(
            "protoforge_sdk.image_count",
            i64::try_from(self.image_count).unwrap_or(i64::MAX),
        );
        self.span
            .set_attribute("protoforge_sdk.structured_output", self.structured);
        self.span.set_attribute(
            "protoforge_sdk.duration_seconds",
            self.start_time.elapsed().as_secs_f64(),
        );
    }
}

pub async fn trace_generate<F, Fut>(
    provider: &str,
    model_id: &str,
    input: LanguageModelInput,
    f: F,
) -> LanguageModelResult<ModelResponse>
where
    F: FnOnce(LanguageModelInput) -> Fut,
    Fut: std::future::Future<Output = LanguageModelResult<ModelResponse>>,
{
    let mut span = LmSpan::new(provider, model_id, &input);
    let result = span.instrument_future(f(input)).await;

    match &result {
        Ok(response) => span.on_response(response),
        Err(error) => span.on_error(error),
    }

    span.on_end();
    result
}

pub async fn trace_embed<F, Fut>(
    provider: &str,
    model_id: &str,
    text: &str,
    f: F,
) -> LanguageModelResult<Vec<f32>>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = LanguageModelResult<Vec<f32>>>,
{
    let span = info_span!("protoforge_sdk.embed");
    span.set_attribute("gen_ai.operation.name", "embeddings");
    span.set_attribute("gen_ai.provider.name", provider.to_string());
    span.set_attribute("gen_ai.request.model", model_id.to_string());
    span.set_attribute(
        "protoforge_sdk.input_chars",
        i64::try_from(text.chars().count()).unwrap_or(i64::MAX),
    );

    let result = f().instrument(span.clone()).await;

    match &result {
        Ok(vector) => {
            span.set_attribute(
                "protoforge_sdk.dimension",
                i64::try_from(vector.len()).unwrap_or(i64::MAX),
            );
        }
        Err(error) => {
            span.set_attribute("exception.message", error.to_string());
            span.set_status(Status::error(error.to_string()));
        }
    }

    result
}
