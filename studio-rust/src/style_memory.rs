use crate::StoreError;
use protoforge_sdk::{Distance, EmbeddingModel, VectorPoint, VectorStore};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

const PAYLOAD_DESCRIPTION: &str = "description";
const PAYLOAD_METADATA: &str = "metadata";
/// Embedded once at connect to learn the provider's real vector length.
const DIMENSION_SAMPLE: &str = "style memory dimension check";

/// A stored design template. Immutable once inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleTemplate {
    pub id: String,
    /// Text the embedding was computed from. Never rendered into prompts.
    pub description: String,
    pub metadata: Map<String, Value>,
    pub embedding: Vec<f32>,
}

impl StyleTemplate {
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.metadata.get("name").and_then(Value::as_str)
    }

    /// Render the style guide block injected into generation prompts.
    #[must_use]
    pub fn style_context(&self) -> String {
        let mut lines = vec![
            "STRICT STYLE GUIDE (FROM DATABASE):".to_string(),
            format!("- Base Design: {}", self.name().unwrap_or("Unnamed template")),
        ];

        for (key, value) in &self.metadata {
            if key == "name" {
                continue;
            }
            let value = match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            lines.push(format!("- {}: {value}", humanize_key(key)));
        }

        lines.push("PLEASE ADHERE TO THIS VISUAL THEME.".to_string());
        lines.join("\n")
    }
}

fn humanize_key(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => spaced,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateElement {
    #[serde(alias = "type")]
    pub kind: String,
    #[serde(alias = "desc")]
    pub description: String,
}

/// The ingestion form of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDraft {
    pub name: String,
    pub overall_description: String,
    #[serde(default)]
    pub elements: Vec<TemplateElement>,
    #[serde(default)]
    pub theme: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_rules: Option<String>,
}

impl TemplateDraft {
    /// The text that gets embedded.
    #[must_use]
    pub fn embedding_text(&self) -> String {
        let components = self
            .elements
            .iter()
            .map(|element| element.kind.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "Style Name: {}\nVisual Style: {}\nKey Components: {components}\nTheme: {}",
            self.name.trim(),
            self.overall_description.trim(),
            self.theme.trim()
        )
    }

    #[must_use]
    pub fn metadata(&self) -> Map<String, Value> {
        let mut metadata = Map::new();
        metadata.insert("name".to_string(), Value::String(self.name.trim().to_string()));
        if let Some(image_path) = &self.image_path {
            metadata.insert("image_path".to_string(), Value::String(image_path.clone()));
        }
        if let Some(style_rules) = &self.style_rules {
            metadata.insert("style_rules".to_string(), Value::String(style_rules.clone()));
        }
        metadata
    }
}

/// Outcome of the retrieval stage as recorded on the artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StyleOutcome {
    Found { name: String },
    NotFound,
    Degraded,
}

/// A style lookup after the degrade policy has been applied.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleLookup {
    Found(StyleTemplate),
    NotFound,
    /// The store failed; generation continues without style.
    Degraded(String),
}

impl StyleLookup {
    /// Map every store failure to a degraded lookup.
    #[must_use]
    pub fn from_result(result: Result<Option<StyleTemplate>, StoreError>) -> Self {
        match result {
            Ok(Some(template)) => {
                info!(
                    template = template.name().unwrap_or_default(),
                    "using style template"
                );
                Self::Found(template)
            }
            Ok(None) => Self::NotFound,
            Err(error) => {
                warn!(%error, "style lookup failed, continuing without style");
                Self::Degraded(error.to_string())
            }
        }
    }

    #[must_use]
    pub fn style_context(&self) -> Option<String> {
        match self {
            Self::Found(template) => Some(template.style_context()),
            Self::NotFound | Self::Degraded(_) => None,
        }
    }

    #[must_use]
    pub fn outcome(&self) -> StyleOutcome {
        match self {
            Self::Found(template) => StyleOutcome::Found {
                name: template.name().unwrap_or_default().to_string(),
            },
            Self::NotFound => StyleOutcome::NotFound,
            Self::Degraded(_) => StyleOutcome::Degraded,
        }
    }
}

/// Persistent nearest-neighbour memory of design templates.
pub struct StyleMemory {
    embedder: Arc<dyn EmbeddingModel>,
    store: Arc<dyn VectorStore>,
    collection: String,
    dimension: usize,
}

impl StyleMemory {
    /// Prepare the collection (cosine, `dimension`) and check that the
    /// embedder and an existing collection both agree with it.
    ///
    /// The embedder is asked for one sample vector, since providers may
    /// ignore the requested output size.
    pub async fn connect(
        embedder: Arc<dyn EmbeddingModel>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        dimension: usize,
    ) -> Result<Self, StoreError> {
        let collection = collection.into();

        if embedder.dimension() != dimension {
            return Err(StoreError::DimensionMismatch {
                expected: dimension,
                actual: embedder.dimension(),
            });
        }

        let sample = embedder
            .embed(DIMENSION_SAMPLE)
            .await
            .map_err(StoreError::Embedding)?;
        if sample.len() != dimension {
            return Err(StoreError::DimensionMismatch {
                expected: dimension,
                actual: sample.len(),
            });
        }

        let info = store
            .ensure_collection(&collection, dimension, Distance::Cosine)
            .await?;
        if info.dimension != dimension {
            return Err(StoreError::DimensionMismatch {
                expected: info.dimension,
                actual: dimension,
            });
        }
        if info.distance != Distance::Cosine {
            return Err(StoreError::DistanceMismatch {
                expected: Distance::Cosine,
                actual: info.distance,
            });
        }

        info!(
            collection = %collection,
            dimension,
            provider = store.provider(),
            "style memory connected"
        );

        Ok(Self {
            embedder,
            store,
            collection,
            dimension,
        })
    }

    /// Like [`StyleMemory::connect`], but an unreachable store or embedder
    /// disables the memory instead of failing. A collection that disagrees
    /// on dimension or distance is still an error.
    pub async fn connect_optional(
        embedder: Arc<dyn EmbeddingModel>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        dimension: usize,
    ) -> Result<Option<Self>, StoreError> {
        match Self::connect(embedder, store, collection, dimension).await {
            Ok(memory) => Ok(Some(memory)),
            Err(
                error @ (StoreError::DimensionMismatch { .. }
                | StoreError::DistanceMismatch { .. }),
            ) => Err(error),
            Err(error) => {
                warn!(%error, "could not connect style memory, running without it");
                Ok(None)
            }
        }
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, StoreError> {
        let vector = self
            .embedder
            .embed(text)
            .await
            .map_err(StoreError::Embedding)?;
        if vector.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }

    /// Embed `description` and store it with `metadata`. Returns the new id.
    pub async fn insert(
        &self,
        description: &str,
        metadata: Map<String, Value>,
    ) -> Result<String, StoreError> {
        let vector = self.embed(description).await?;
        let id = uuid::Uuid::new_v4().to_string();

        let mut payload = Map::new();
        payload.insert(
            PAYLOAD_DESCRIPTION.to_string(),
            Value::String(description.to_string()),
        );
        payload.insert(PAYLOAD_METADATA.to_string(), Value::Object(metadata));

        self.store
            .upsert(
                &self.collection,
                vec![VectorPoint {
                    id: id.clone(),
                    vector,
                    payload,
                }],
            )
            .await?;

        debug!(id = %id, collection = %self.collection, "style template stored");
        Ok(id)
    }

    pub async fn insert_draft(&self, draft: &TemplateDraft) -> Result<String, StoreError> {
        self.insert(&draft.embedding_text(), draft.metadata()).await
    }

    /// Return the closest of the top `k` templates for `text`, if any.
    pub async fn query(&self, text: &str, k: usize) -> Result<Option<StyleTemplate>, StoreError> {
        let vector = self.embed(text).await?;
        let matches = self
            .store
            .search(&self.collection, &vector, k.max(1))
            .await?;

        Ok(matches.into_iter().next().map(|point| {
            let mut payload = point.payload;
            let description = match payload.remove(PAYLOAD_DESCRIPTION) {
                Some(Value::String(description)) => description,
                _ => String::new(),
            };
            let metadata = match payload.remove(PAYLOAD_METADATA) {
                Some(Value::Object(metadata)) => metadata,
                _ => Map::new(),
            };
            StyleTemplate {
                id: point.id,
                description,
                metadata,
                embedding: point.vector.unwrap_or_default(),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft() -> TemplateDraft {
        serde_json::from_value(json!({
            "name": "Transformation Dashboard",
            "overall_description": "A dark dashboard with red call-to-action buttons.",
            "elements": [
                { "type": "logo", "desc": "Red circular logo top-left." },
                { "kind": "button", "description": "Large red button aligned right." }
            ],
            "theme": "Dark Mode, Enterprise, Red Accents.",
            "style_rules": "Background: Dark (#121212), Primary Color: Red (#FF0000)"
        }))
        .unwrap()
    }

    #[test]
    fn draft_embedding_text_lists_components() {
        let text = draft().embedding_text();

        assert_eq!(
            text,
            "Style Name: Transformation Dashboard\n\
             Visual Style: A dark dashboard with red call-to-action buttons.\n\
             Key Components: logo, button\n\
             Theme: Dark Mode, Enterprise, Red Accents."
        );
    }

    #[test]
    fn style_context_uses_metadata_only() {
        let template = StyleTemplate {
            id: "1".to_string(),
            description: "secret embedding text".to_string(),
            metadata: draft().metadata(),
            embedding: vec![],
        };

        let context = template.style_context();

        assert!(context.contains("- Base Design: Transformation Dashboard"));
        assert!(context.contains("- Style rules: Background: Dark (#121212)"));
        assert!(context.ends_with("PLEASE ADHERE TO THIS VISUAL THEME."));
        assert!(!context.contains("secret embedding text"));
    }

    #[test]
    fn failed_lookup_degrades() {
        let lookup = StyleLookup::from_result(Err(StoreError::DimensionMismatch {
            expected: 768,
            actual: 3,
        }));

        assert!(matches!(lookup, StyleLookup::Degraded(_)));
        assert_eq!(lookup.outcome(), StyleOutcome::Degraded);
        assert!(lookup.style_context().is_none());
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let value = serde_json::to_value(StyleOutcome::Found {
            name: "Dashboard".to_string(),
        })
        .unwrap();

        assert_eq!(value, json!({ "status": "found", "name": "Dashboard" }));
    }
}
