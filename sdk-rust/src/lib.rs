mod client_utils;
mod embedding_model;
mod errors;
pub mod google;
mod language_model;
pub mod opentelemetry;
pub mod qdrant;
pub mod testing;
mod types;
mod types_ext;
mod vector_store;

pub use embedding_model::EmbeddingModel;
pub use errors::*;
pub use language_model::LanguageModel;
pub use types::*;
pub use vector_store::{
    CollectionInfo, Distance, InMemoryVectorStore, ScoredPoint, VectorPoint, VectorStore,
};
