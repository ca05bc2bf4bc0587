mod config;
mod dispatcher;
mod errors;
pub mod ledger;
mod pipeline;
pub mod postprocess;
pub mod prompt;
pub mod rules;
pub mod server;
pub mod style_memory;
mod verifier;

pub use config::{StudioConfig, StyleMemoryConfig};
pub use dispatcher::{strip_code_fences, Dispatcher, OutputKind};
pub use errors::*;
pub use pipeline::{GeneratedArtifact, PipelineStage, Provenance, Studio, StudioParams};
pub use prompt::{GenerationMode, GenerationRequest, ImageRole, ReferenceImage};
pub use style_memory::{StyleMemory, StyleOutcome, StyleTemplate, TemplateDraft};
pub use verifier::{SimilarityReport, Verifier};
