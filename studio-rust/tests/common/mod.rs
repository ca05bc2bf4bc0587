#![allow(dead_code)]

use protoforge_sdk::{
    testing::MockEmbeddingModel, CollectionInfo, Distance, InMemoryVectorStore, ScoredPoint,
    VectorPoint, VectorStore, VectorStoreError, VectorStoreResult,
};
use protoforge_studio::{ReferenceImage, StyleMemory};
use std::sync::Arc;

pub const DIMENSION: usize = 8;
pub const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

pub fn png(name: &str, marker: u8) -> ReferenceImage {
    let mut data = PNG_HEADER.to_vec();
    data.push(marker);
    ReferenceImage::new(name, data)
}

pub fn fenced(markup: &str) -> String {
    format!("```html\n{markup}\n```")
}

/// Accepts the collection, then fails every read and write.
pub struct FailingVectorStore;

#[async_trait::async_trait]
impl VectorStore for FailingVectorStore {
    fn provider(&self) -> &'static str {
        "failing"
    }

    async fn ensure_collection(
        &self,
        name: &str,
        dimension: usize,
        distance: Distance,
    ) -> VectorStoreResult<CollectionInfo> {
        Ok(CollectionInfo {
            name: name.to_string(),
            dimension,
            distance,
        })
    }

    async fn upsert(&self, _collection: &str, _points: Vec<VectorPoint>) -> VectorStoreResult<()> {
        Err(VectorStoreError::Invariant("failing", "store is down".to_string()))
    }

    async fn search(
        &self,
        _collection: &str,
        _vector: &[f32],
        _limit: usize,
    ) -> VectorStoreResult<Vec<ScoredPoint>> {
        Err(VectorStoreError::Invariant("failing", "store is down".to_string()))
    }
}

/// A store that cannot be reached at all.
pub struct UnreachableVectorStore;

#[async_trait::async_trait]
impl VectorStore for UnreachableVectorStore {
    fn provider(&self) -> &'static str {
        "unreachable"
    }

    async fn ensure_collection(
        &self,
        _name: &str,
        _dimension: usize,
        _distance: Distance,
    ) -> VectorStoreResult<CollectionInfo> {
        Err(VectorStoreError::Invariant(
            "unreachable",
            "connection refused".to_string(),
        ))
    }

    async fn upsert(&self, _collection: &str, _points: Vec<VectorPoint>) -> VectorStoreResult<()> {
        Err(VectorStoreError::Invariant(
            "unreachable",
            "connection refused".to_string(),
        ))
    }

    async fn search(
        &self,
        _collection: &str,
        _vector: &[f32],
        _limit: usize,
    ) -> VectorStoreResult<Vec<ScoredPoint>> {
        Err(VectorStoreError::Invariant(
            "unreachable",
            "connection refused".to_string(),
        ))
    }
}

pub async fn in_memory_style_memory() -> (Arc<StyleMemory>, Arc<MockEmbeddingModel>) {
    let embedder = Arc::new(MockEmbeddingModel::new(DIMENSION));
    let memory = StyleMemory::connect(
        embedder.clone(),
        Arc::new(InMemoryVectorStore::new()),
        "styles",
        DIMENSION,
    )
    .await
    .expect("connect style memory");
    (Arc::new(memory), embedder)
}

pub async fn failing_style_memory() -> Arc<StyleMemory> {
    let memory = StyleMemory::connect(
        Arc::new(MockEmbeddingModel::new(DIMENSION)),
        Arc::new(FailingVectorStore),
        "styles",
        DIMENSION,
    )
    .await
    .expect("connect style memory");
    Arc::new(memory)
}
