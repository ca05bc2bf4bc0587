use super::api::{
    CollectionExistence, CollectionInfoResult, CreateCollection, PointStruct, QdrantResponse,
    ScoredPointResult, SearchRequest, UpsertPoints, VectorParams,
};
use crate::{
    client_utils, CollectionInfo, Distance, ScoredPoint, VectorPoint, VectorStore,
    VectorStoreError, VectorStoreResult,
};
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client, Method,
};
use serde_json::Value;
use tracing::debug;

const PROVIDER: &str = "qdrant";

/// Qdrant over its REST API.
pub struct QdrantVectorStore {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

#[derive(Clone, Default)]
pub struct QdrantVectorStoreOptions {
    pub url: String,
    pub api_key: Option<String>,
    pub client: Option<Client>,
}

impl QdrantVectorStore {
    #[must_use]
    pub fn new(options: QdrantVectorStoreOptions) -> Self {
        Self {
            base_url: options.url.trim_end_matches('/').to_string(),
            api_key: options.api_key,
            client: options.client.unwrap_or_else(Client::new),
        }
    }

    fn headers(&self) -> VectorStoreResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            let mut value = HeaderValue::from_str(api_key).map_err(|error| {
                VectorStoreError::Invariant(PROVIDER, format!("Invalid Qdrant API key: {error}"))
            })?;
            value.set_sensitive(true);
            headers.insert("api-key", value);
        }
        Ok(headers)
    }

    fn collection_url(&self, name: &str) -> String {
        format!("{}/collections/{name}", self.base_url)
    }

    async fn collection_exists(&self, name: &str) -> VectorStoreResult<bool> {
        let url = format!("{}/exists", self.collection_url(name));
        let response: QdrantResponse<CollectionExistence> =
            client_utils::get_json(&self.client, &url, self.headers()?).await?;
        Ok(response.result.exists)
    }

    async fn collection_info(&self, name: &str) -> VectorStoreResult<CollectionInfo> {
        let response: QdrantResponse<CollectionInfoResult> =
            client_utils::get_json(&self.client, &self.collection_url(name), self.headers()?)
                .await?;
        let params = parse_vector_params(response.result.config.params.vectors)?;

        Ok(CollectionInfo {
            name: name.to_string(),
            dimension: params.size,
            distance: parse_distance(&params.distance)?,
        })
    }
}

#[async_trait::async_trait]
impl VectorStore for QdrantVectorStore {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    async fn ensure_collection(
        &self,
        name: &str,
        dimension: usize,
        distance: Distance,
    ) -> VectorStoreResult<CollectionInfo> {
        if !self.collection_exists(name).await? {
            debug!(collection = name, dimension, "creating qdrant collection");
            let body = CreateCollection {
                vectors: VectorParams {
                    size: dimension,
                    distance: distance_name(distance).to_string(),
                },
            };
            let _: QdrantResponse<Value> = client_utils::send_json(
                &self.client,
                Method::PUT,
                &self.collection_url(name),
                Some(&body),
                self.headers()?,
            )
            .await?;
        }

        self.collection_info(name).await
    }

    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> VectorStoreResult<()> {
        let body = UpsertPoints {
            points: points
                .into_iter()
                .map(|point| PointStruct {
                    id: point.id,
                    vector: point.vector,
                    payload: point.payload,
                })
                .collect(),
        };
        let url = format!("{}/points?wait=true", self.collection_url(collection));
        let _: QdrantResponse<Value> =
            client_utils::send_json(&self.client, Method::PUT, &url, Some(&body), self.headers()?)
                .await?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> VectorStoreResult<Vec<ScoredPoint>> {
        let body = SearchRequest {
            vector,
            limit,
            with_payload: true,
            with_vector: true,
        };
        let url = format!("{}/points/search", self.collection_url(collection));
        let response: QdrantResponse<Vec<ScoredPointResult>> =
            client_utils::post_json(&self.client, &url, &body, self.headers()?).await?;

        Ok(response.result.into_iter().map(map_scored_point).collect())
    }
}

fn parse_vector_params(vectors: Value) -> VectorStoreResult<VectorParams> {
    serde_json::from_value(vectors).map_err(|_| {
        VectorStoreError::Invariant(
            PROVIDER,
            "Collection does not have a single unnamed vector config".to_string(),
        )
    })
}

fn distance_name(distance: Distance) -> &'static str {
    match distance {
        Distance::Cosine => "Cosine",
        Distance::Dot => "Dot",
        Distance::Euclid => "Euclid",
    }
}

fn parse_distance(name: &str) -> VectorStoreResult<Distance> {
    match name {
        "Cosine" => Ok(Distance::Cosine),
        "Dot" => Ok(Distance::Dot),
        "Euclid" => Ok(Distance::Euclid),
        other => Err(VectorStoreError::Invariant(
            PROVIDER,
            format!("Unsupported distance {other}"),
        )),
    }
}

fn map_scored_point(point: ScoredPointResult) -> ScoredPoint {
    let id = match point.id {
        Value::String(id) => id,
        other => other.to_string(),
    };
    // Named vectors come back as an object; only the unnamed form is kept.
    let vector = point
        .vector
        .and_then(|value| serde_json::from_value::<Vec<f32>>(value).ok());

    ScoredPoint {
        id,
        score: point.score,
        payload: point.payload.unwrap_or_default(),
        vector,
    }
}
