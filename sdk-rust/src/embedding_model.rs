use crate::LanguageModelResult;

/// Converts free text into a fixed-length vector.
#[async_trait::async_trait]
pub trait EmbeddingModel: Send + Sync {
    fn provider(&self) -> &'static str;
    fn model_id(&self) -> String;
    /// Length of every vector returned by [`EmbeddingModel::embed`].
    fn dimension(&self) -> usize;
    async fn embed(&self, text: &str) -> LanguageModelResult<Vec<f32>>;
}
