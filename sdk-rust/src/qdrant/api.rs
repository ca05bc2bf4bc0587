#![allow(clippy::pedantic, clippy::style)]
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Every Qdrant REST response wraps its payload in `result`.
#[derive(Deserialize, Debug, Clone)]
pub struct QdrantResponse<T> {
    pub result: T,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CollectionExistence {
    pub exists: bool,
}

#[derive(Serialize, Debug, Clone)]
pub struct CreateCollection {
    pub vectors: VectorParams,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VectorParams {
    pub size: usize,
    pub distance: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CollectionInfoResult {
    pub config: CollectionConfig,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CollectionConfig {
    pub params: CollectionParams,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CollectionParams {
    /// Either a single unnamed vector config or a map of named ones.
    pub vectors: Value,
}

#[derive(Serialize, Debug, Clone)]
pub struct UpsertPoints {
    pub points: Vec<PointStruct>,
}

#[derive(Serialize, Debug, Clone)]
pub struct PointStruct {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Map<String, Value>,
}

#[derive(Serialize, Debug, Clone)]
pub struct SearchRequest<'a> {
    pub vector: &'a [f32],
    pub limit: usize,
    pub with_payload: bool,
    pub with_vector: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ScoredPointResult {
    /// Unsigned integer or UUID string.
    pub id: Value,
    pub score: f32,
    #[serde(default)]
    pub payload: Option<Map<String, Value>>,
    #[serde(default)]
    pub vector: Option<Value>,
}
