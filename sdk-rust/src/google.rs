mod api;
mod embedding;
mod model;

pub use embedding::GoogleEmbeddingModel;
pub use model::{GoogleModel, GoogleModelOptions};
