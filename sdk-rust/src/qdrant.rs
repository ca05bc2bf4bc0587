mod api;
mod store;

pub use store::{QdrantVectorStore, QdrantVectorStoreOptions};
