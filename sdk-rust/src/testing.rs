//! Test doubles for the model traits. They track inputs and yield
//! predefined outputs.
use crate::{
    EmbeddingModel, LanguageModel, LanguageModelError, LanguageModelInput, LanguageModelResult,
    ModelResponse, Part,
};
use reqwest::StatusCode;
use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, MutexGuard, PoisonError},
};

/// Result for a mocked `generate` call.
/// It can either be a full response or an error to return.
pub enum MockGenerateResult {
    Response(ModelResponse),
    Error(LanguageModelError),
}

impl MockGenerateResult {
    /// Construct a result that yields the provided response.
    #[must_use]
    pub fn response(response: ModelResponse) -> Self {
        Self::Response(response)
    }

    /// Construct a result whose only content is the given text.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Response(ModelResponse {
            content: vec![Part::text(text)],
            usage: None,
        })
    }

    /// Construct a result that yields the provided error.
    #[must_use]
    pub fn error(error: LanguageModelError) -> Self {
        Self::Error(error)
    }
}

impl From<ModelResponse> for MockGenerateResult {
    fn from(response: ModelResponse) -> Self {
        Self::response(response)
    }
}

impl From<LanguageModelError> for MockGenerateResult {
    fn from(error: LanguageModelError) -> Self {
        Self::error(error)
    }
}

impl From<LanguageModelResult<ModelResponse>> for MockGenerateResult {
    fn from(result: LanguageModelResult<ModelResponse>) -> Self {
        match result {
            Ok(response) => Self::Response(response),
            Err(error) => Self::Error(error),
        }
    }
}

#[derive(Default)]
struct MockLanguageModelState {
    mocked_generate_results: VecDeque<MockGenerateResult>,
    tracked_generate_inputs: Vec<LanguageModelInput>,
}

/// A mock language model for testing that tracks inputs and yields predefined outputs.
pub struct MockLanguageModel {
    provider: &'static str,
    model_id: String,
    state: Mutex<MockLanguageModelState>,
}

impl Default for MockLanguageModel {
    fn default() -> Self {
        Self {
            provider: "mock",
            model_id: "mock-model".to_string(),
            state: Mutex::new(MockLanguageModelState::default()),
        }
    }
}

impl MockLanguageModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the model identifier returned by the mock.
    pub fn set_model_id<S: Into<String>>(&mut self, model_id: S) {
        self.model_id = model_id.into();
    }

    fn state(&self) -> MutexGuard<'_, MockLanguageModelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue one or more mocked generate results.
    pub fn enqueue_generate_results<I>(&self, results: I) -> &Self
    where
        I: IntoIterator<Item = MockGenerateResult>,
    {
        self.state().mocked_generate_results.extend(results);
        self
    }

    /// Convenience to enqueue a single mocked generate result.
    pub fn enqueue_generate<R>(&self, result: R) -> &Self
    where
        R: Into<MockGenerateResult>,
    {
        self.enqueue_generate_results(std::iter::once(result.into()))
    }

    /// Retrieve the tracked generate inputs accumulated so far.
    #[must_use]
    pub fn tracked_generate_inputs(&self) -> Vec<LanguageModelInput> {
        self.state().tracked_generate_inputs.clone()
    }

    /// Reset tracked inputs without touching enqueued results.
    pub fn reset(&self) {
        self.state().tracked_generate_inputs.clear();
    }
}

#[async_trait::async_trait]
impl LanguageModel for MockLanguageModel {
    fn provider(&self) -> &'static str {
        self.provider
    }

    fn model_id(&self) -> String {
        self.model_id.clone()
    }

    async fn generate(&self, input: LanguageModelInput) -> LanguageModelResult<ModelResponse> {
        let mut state = self.state();
        state.tracked_generate_inputs.push(input);

        let result = state.mocked_generate_results.pop_front().ok_or_else(|| {
            LanguageModelError::Invariant(
                self.provider,
                "no mocked generate results available".into(),
            )
        })?;

        match result {
            MockGenerateResult::Response(response) => Ok(response),
            MockGenerateResult::Error(error) => Err(error),
        }
    }
}

#[derive(Default)]
struct MockEmbeddingState {
    fixed: HashMap<String, Vec<f32>>,
    failing: bool,
    tracked_inputs: Vec<String>,
}

/// A mock embedding model. Texts registered with
/// [`MockEmbeddingModel::set_vector`] return that vector; any other text gets
/// a deterministic vector derived from its bytes.
pub struct MockEmbeddingModel {
    dimension: usize,
    state: Mutex<MockEmbeddingState>,
}

impl MockEmbeddingModel {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            state: Mutex::new(MockEmbeddingState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockEmbeddingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_vector(&self, text: impl Into<String>, vector: Vec<f32>) -> &Self {
        self.state().fixed.insert(text.into(), vector);
        self
    }

    /// Make every subsequent call fail as if the provider were unavailable.
    pub fn set_failing(&self, failing: bool) -> &Self {
        self.state().failing = failing;
        self
    }

    #[must_use]
    pub fn tracked_inputs(&self) -> Vec<String> {
        self.state().tracked_inputs.clone()
    }

    fn derive_vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension.max(1)];
        let len = vector.len();
        for (index, byte) in text.bytes().enumerate() {
            vector[(index + usize::from(byte)) % len] += f32::from(byte) / 255.0;
        }
        vector.truncate(self.dimension);
        vector
    }
}

#[async_trait::async_trait]
impl EmbeddingModel for MockEmbeddingModel {
    fn provider(&self) -> &'static str {
        "mock"
    }

    fn model_id(&self) -> String {
        "mock-embedding".to_string()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> LanguageModelResult<Vec<f32>> {
        let mut state = self.state();
        state.tracked_inputs.push(text.to_string());

        if state.failing {
            return Err(LanguageModelError::StatusCode(
                StatusCode::SERVICE_UNAVAILABLE,
                "mock embedding failure".to_string(),
            ));
        }

        Ok(state
            .fixed
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.derive_vector(text)))
    }
}
