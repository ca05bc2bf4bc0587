use crate::{VectorStoreError, VectorStoreResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{collections::HashMap, sync::RwLock};

/// Metric used to rank matches within a collection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Distance {
    Cosine,
    Dot,
    Euclid,
}

/// Parameters of an existing collection as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInfo {
    pub name: String,
    pub dimension: usize,
    pub distance: Distance,
}

/// A vector together with its opaque payload.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Map<String, Value>,
}

/// A search match, best first.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: Map<String, Value>,
    pub vector: Option<Vec<f32>>,
}

/// Nearest-neighbour storage for fixed-dimension vectors.
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    fn provider(&self) -> &'static str;

    /// Create the collection if it does not exist, then report the
    /// parameters it actually has. An existing collection is never altered,
    /// so the returned dimension may differ from the requested one.
    async fn ensure_collection(
        &self,
        name: &str,
        dimension: usize,
        distance: Distance,
    ) -> VectorStoreResult<CollectionInfo>;

    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> VectorStoreResult<()>;

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> VectorStoreResult<Vec<ScoredPoint>>;
}

const IN_MEMORY_PROVIDER: &str = "in-memory";

struct InMemoryCollection {
    dimension: usize,
    distance: Distance,
    points: Vec<VectorPoint>,
}

/// Process-local vector store. Useful when no vector database is deployed
/// and as a test double.
#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, InMemoryCollection>>,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> VectorStoreError {
        VectorStoreError::Invariant(IN_MEMORY_PROVIDER, "collection lock poisoned".to_string())
    }
}

#[async_trait::async_trait]
impl VectorStore for InMemoryVectorStore {
    fn provider(&self) -> &'static str {
        IN_MEMORY_PROVIDER
    }

    async fn ensure_collection(
        &self,
        name: &str,
        dimension: usize,
        distance: Distance,
    ) -> VectorStoreResult<CollectionInfo> {
        let mut collections = self.collections.write().map_err(|_| Self::poisoned())?;
        let collection = collections
            .entry(name.to_string())
            .or_insert_with(|| InMemoryCollection {
                dimension,
                distance,
                points: Vec::new(),
            });

        Ok(CollectionInfo {
            name: name.to_string(),
            dimension: collection.dimension,
            distance: collection.distance,
        })
    }

    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> VectorStoreResult<()> {
        let mut collections = self.collections.write().map_err(|_| Self::poisoned())?;
        let target = collections.get_mut(collection).ok_or_else(|| {
            VectorStoreError::Invariant(
                IN_MEMORY_PROVIDER,
                format!("Collection {collection} does not exist"),
            )
        })?;

        for point in points {
            if point.vector.len() != target.dimension {
                return Err(VectorStoreError::Invariant(
                    IN_MEMORY_PROVIDER,
                    format!(
                        "Vector of length {} does not fit collection of dimension {}",
                        point.vector.len(),
                        target.dimension
                    ),
                ));
            }
            target.points.retain(|existing| existing.id != point.id);
            target.points.push(point);
        }

        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> VectorStoreResult<Vec<ScoredPoint>> {
        let collections = self.collections.read().map_err(|_| Self::poisoned())?;
        let target = collections.get(collection).ok_or_else(|| {
            VectorStoreError::Invariant(
                IN_MEMORY_PROVIDER,
                format!("Collection {collection} does not exist"),
            )
        })?;

        if vector.len() != target.dimension {
            return Err(VectorStoreError::Invariant(
                IN_MEMORY_PROVIDER,
                format!(
                    "Query vector of length {} does not fit collection of dimension {}",
                    vector.len(),
                    target.dimension
                ),
            ));
        }

        let mut matches: Vec<ScoredPoint> = target
            .points
            .iter()
            .map(|point| ScoredPoint {
                id: point.id.clone(),
                score: score(target.distance, vector, &point.vector),
                payload: point.payload.clone(),
                vector: Some(point.vector.clone()),
            })
            .collect();

        // Euclid is a distance, the others are similarities.
        if target.distance == Distance::Euclid {
            matches.sort_by(|a, b| a.score.total_cmp(&b.score));
        } else {
            matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        }
        matches.truncate(limit);

        Ok(matches)
    }
}

fn score(distance: Distance, a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    match distance {
        Distance::Dot => dot,
        Distance::Cosine => {
            let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
            let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm_a == 0.0 || norm_b == 0.0 {
                0.0
            } else {
                dot / (norm_a * norm_b)
            }
        }
        Distance::Euclid => a
            .iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt(),
    }
}
