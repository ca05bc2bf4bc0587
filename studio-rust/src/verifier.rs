use crate::{
    dispatcher::{Dispatcher, OutputKind},
    prompt::{Payload, ReferenceImage},
    GenerationError,
};
use protoforge_sdk::{Part, ResponseFormatJson};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

const VERIFY_PROMPT: &str = "You are a QA design engineer comparing two web page screenshots.

Image 1 is the ORIGINAL reference design. Image 2 is a screenshot of the GENERATED implementation.

Compare them ONLY on visual design:
- layout and alignment
- colors
- typography
- spacing
- component styling (buttons, cards, borders, shadows, radii)

Ignore semantic and content differences entirely: different words, data or page purpose are not differences. Do not mention them.

Scoring:
- 100: pixel-perfect match.
- 50 to 99: same design with minor visual deviations.
- below 50: major visual deviations.

Return ONLY a raw JSON object, no markdown, with this structure:
{\"similarity_score\": <integer 0-100>, \"similar_features\": [\"...\"], \"dissimilar_features\": [\"...\"]}";

/// Visual comparison of a reference image and a rendered candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarityReport {
    /// 0 to 100 inclusive.
    #[serde(rename = "similarity_score")]
    pub score: u8,
    pub similar_features: Vec<String>,
    pub dissimilar_features: Vec<String>,
}

impl SimilarityReport {
    /// The report returned when verification could not be completed.
    pub fn degraded(reason: impl std::fmt::Display) -> Self {
        Self {
            score: 0,
            similar_features: Vec::new(),
            dissimilar_features: vec![format!("Verification failed: {reason}")],
        }
    }

    /// Parse a backend report. Scores outside 0..=100 or non-integral
    /// scores are malformed.
    pub fn parse(text: &str) -> Result<Self, GenerationError> {
        #[derive(Deserialize)]
        struct RawReport {
            similarity_score: f64,
            #[serde(default)]
            similar_features: Vec<String>,
            #[serde(default)]
            dissimilar_features: Vec<String>,
        }

        let raw: RawReport = serde_json::from_str(text).map_err(|error| {
            GenerationError::MalformedResponse(format!("invalid similarity report: {error}"))
        })?;

        let score = raw.similarity_score;
        if !(0.0..=100.0).contains(&score) || score.fract() != 0.0 {
            return Err(GenerationError::MalformedResponse(format!(
                "similarity score {score} is not an integer in 0..=100"
            )));
        }

        // Range checked above.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let score = score as u8;

        Ok(Self {
            score,
            similar_features: raw.similar_features,
            dissimilar_features: raw.dissimilar_features,
        })
    }
}

fn report_format() -> ResponseFormatJson {
    ResponseFormatJson {
        name: "similarity_report".to_string(),
        description: Some("Visual similarity between two screenshots".to_string()),
        schema: Some(json!({
            "type": "object",
            "properties": {
                "similarity_score": { "type": "integer", "minimum": 0, "maximum": 100 },
                "similar_features": { "type": "array", "items": { "type": "string" } },
                "dissimilar_features": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["similarity_score", "similar_features", "dissimilar_features"]
        })),
    }
}

/// Scores how closely a candidate matches a reference. Never fails: every
/// error becomes a degraded report.
#[derive(Clone)]
pub struct Verifier {
    dispatcher: Dispatcher,
}

impl Verifier {
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn verify(
        &self,
        reference: &ReferenceImage,
        candidate: &ReferenceImage,
    ) -> SimilarityReport {
        let payload = Payload {
            parts: vec![
                Part::text(VERIFY_PROMPT),
                reference.to_part("Image 1: original reference"),
                candidate.to_part("Image 2: generated output"),
            ],
        };

        let result = match self
            .dispatcher
            .dispatch(payload, OutputKind::Json(report_format()))
            .await
        {
            Ok(text) => SimilarityReport::parse(&text),
            Err(error) => Err(error),
        };

        match result {
            Ok(report) => {
                info!(score = report.score, "verification complete");
                report
            }
            Err(error) => {
                warn!(%error, "verification degraded");
                SimilarityReport::degraded(error)
            }
        }
    }
}
