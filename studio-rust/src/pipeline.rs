use crate::{
    dispatcher::{Dispatcher, OutputKind},
    ledger::AssetManager,
    postprocess::postprocess,
    prompt::{assemble, assemble_refinement, GenerationMode, GenerationRequest, ReferenceImage},
    rules::RuleStore,
    style_memory::{StyleLookup, StyleMemory, StyleOutcome, TemplateDraft},
    verifier::{SimilarityReport, Verifier},
    StudioError,
};
use chrono::{Local, SecondsFormat};
use protoforge_sdk::LanguageModel;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::{debug, info, info_span, warn};
use tracing_futures::Instrument;

const REFINED_FILE_NAME: &str = "refined_ui.html";

/// Where a generation currently is. Logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Retrieving,
    Assembling,
    Dispatching,
    PostProcessing,
    Done,
    Failed,
}

impl PipelineStage {
    fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Retrieving => "retrieving",
            Self::Assembling => "assembling",
            Self::Dispatching => "dispatching",
            Self::PostProcessing => "post_processing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn enter(stage: PipelineStage) {
    debug!(stage = stage.as_str(), "pipeline stage");
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub context: String,
    /// RFC 3339.
    pub timestamp: String,
    /// Outcome of the style lookup. `None` for refinements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleOutcome>,
}

impl Provenance {
    fn now(context: impl Into<String>, style: Option<StyleOutcome>) -> Self {
        Self {
            context: context.into(),
            timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
            style,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    /// Backend output with code fences stripped.
    pub raw_markup: String,
    /// After logo substitution and tooling injection. Never empty.
    pub final_markup: String,
    pub provenance: Provenance,
}

/// Parameters required to create a [`Studio`].
/// # Default Values
/// - `verification_model`: the generation model
/// - `style_memory`: `None` (generation runs unstyled)
/// - `assets`: `None` (nothing is written to disk)
/// - `style_matches`: 1
pub struct StudioParams {
    pub model: Arc<dyn LanguageModel + Send + Sync>,
    pub verification_model: Option<Arc<dyn LanguageModel + Send + Sync>>,
    pub rules: Arc<dyn RuleStore>,
    pub style_memory: Option<Arc<StyleMemory>>,
    pub assets: Option<Arc<AssetManager>>,
    /// How many neighbours the style lookup asks the store for. The closest
    /// one is used.
    pub style_matches: usize,
}

impl StudioParams {
    pub fn new(model: Arc<dyn LanguageModel + Send + Sync>, rules: Arc<dyn RuleStore>) -> Self {
        Self {
            model,
            verification_model: None,
            rules,
            style_memory: None,
            assets: None,
            style_matches: 1,
        }
    }

    /// Use a separate (usually cheaper) model for similarity checks.
    #[must_use]
    pub fn verification_model(mut self, model: Arc<dyn LanguageModel + Send + Sync>) -> Self {
        self.verification_model = Some(model);
        self
    }

    #[must_use]
    pub fn style_memory(mut self, style_memory: Option<Arc<StyleMemory>>) -> Self {
        self.style_memory = style_memory;
        self
    }

    #[must_use]
    pub fn assets(mut self, assets: Arc<AssetManager>) -> Self {
        self.assets = Some(assets);
        self
    }

    #[must_use]
    pub fn style_matches(mut self, style_matches: usize) -> Self {
        self.style_matches = style_matches.max(1);
        self
    }
}

/// Sequences retrieval, assembly, dispatch and post-processing for each
/// request. Requests are independent; the only shared state lives behind
/// the rule store, the style memory and the asset manager.
pub struct Studio {
    dispatcher: Dispatcher,
    verifier: Verifier,
    rules: Arc<dyn RuleStore>,
    style_memory: Option<Arc<StyleMemory>>,
    assets: Option<Arc<AssetManager>>,
    style_matches: usize,
}

impl Studio {
    #[must_use]
    pub fn new(params: StudioParams) -> Self {
        let verification_model = params
            .verification_model
            .unwrap_or_else(|| params.model.clone());
        Self {
            dispatcher: Dispatcher::new(params.model),
            verifier: Verifier::new(Dispatcher::new(verification_model)),
            rules: params.rules,
            style_memory: params.style_memory,
            assets: params.assets,
            style_matches: params.style_matches,
        }
    }

    #[must_use]
    pub fn has_style_memory(&self) -> bool {
        self.style_memory.is_some()
    }

    /// Run one generation end to end. A failing style lookup only removes
    /// the style guide; a failing backend fails the whole request and
    /// writes nothing.
    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GeneratedArtifact, StudioError> {
        let span = info_span!(
            "protoforge.generate",
            mode = request.mode.as_str(),
            images = request.images.len()
        );
        self.generate_inner(request).instrument(span).await
    }

    async fn generate_inner(
        &self,
        mut request: GenerationRequest,
    ) -> Result<GeneratedArtifact, StudioError> {
        enter(PipelineStage::Idle);

        enter(PipelineStage::Retrieving);
        let lookup = self.lookup_style(&request.instruction).await;
        if request.style_context.is_none() {
            request.style_context = lookup.style_context();
        }
        request.learned_rules = merge_rules(self.rules.rules().await?, request.learned_rules);

        enter(PipelineStage::Assembling);
        let payload = assemble(&request);

        enter(PipelineStage::Dispatching);
        let raw_markup = match self.dispatcher.dispatch(payload, OutputKind::Html).await {
            Ok(markup) => markup,
            Err(error) => {
                enter(PipelineStage::Failed);
                warn!(%error, "generation failed");
                return Err(error.into());
            }
        };

        enter(PipelineStage::PostProcessing);
        let final_markup = postprocess(&raw_markup, request.logo());

        let context = context_tag(&request.instruction, request.mode);
        self.save_generation(&request, &context, &final_markup).await;

        enter(PipelineStage::Done);
        let style = lookup.outcome();
        info!(style = ?style, "generation complete");

        Ok(GeneratedArtifact {
            raw_markup,
            final_markup,
            provenance: Provenance::now(context, Some(style)),
        })
    }

    async fn lookup_style(&self, instruction: &str) -> StyleLookup {
        let Some(memory) = &self.style_memory else {
            return StyleLookup::NotFound;
        };
        if instruction.trim().is_empty() {
            return StyleLookup::NotFound;
        }
        StyleLookup::from_result(memory.query(instruction, self.style_matches).await)
    }

    async fn save_generation(&self, request: &GenerationRequest, context: &str, markup: &str) {
        let Some(assets) = &self.assets else {
            return;
        };

        for (index, image) in request.images.iter().enumerate() {
            if let Err(error) = assets
                .save_upload(&image.file_name, &image.data, request.context_label(index))
                .await
            {
                warn!(%error, file = %image.file_name, "could not save upload");
            }
        }

        if let Err(error) = assets
            .save_prototype(prototype_file_name(request.mode), markup, context)
            .await
        {
            warn!(%error, "could not save prototype");
        }
    }

    /// Apply free-text edits to existing markup. Injected tooling is
    /// stripped before the markup goes back to the backend.
    pub async fn refine(
        &self,
        current_html: &str,
        instructions: &str,
    ) -> Result<GeneratedArtifact, StudioError> {
        let instructions = instructions.trim();
        if instructions.is_empty() {
            return Err(StudioError::InvalidInput(
                "Refinement instructions must not be empty".to_string(),
            ));
        }
        if current_html.trim().is_empty() {
            return Err(StudioError::InvalidInput(
                "There is no code to refine".to_string(),
            ));
        }

        async {
            let rules = self.rules.rules().await?;
            let payload = assemble_refinement(current_html, instructions, &rules);

            let raw_markup = self.dispatcher.dispatch(payload, OutputKind::Html).await?;
            let final_markup = postprocess(&raw_markup, None);

            if let Some(assets) = &self.assets {
                if let Err(error) = assets
                    .save_prototype(REFINED_FILE_NAME, &final_markup, instructions)
                    .await
                {
                    warn!(%error, "could not save refined prototype");
                }
            }

            info!("refinement complete");
            Ok::<_, StudioError>(GeneratedArtifact {
                raw_markup,
                final_markup,
                provenance: Provenance::now(instructions, None),
            })
        }
        .instrument(info_span!("protoforge.refine"))
        .await
    }

    /// Score a rendered candidate against its reference. Never fails.
    pub async fn verify(
        &self,
        reference: &ReferenceImage,
        candidate: &ReferenceImage,
    ) -> SimilarityReport {
        self.verifier
            .verify(reference, candidate)
            .instrument(info_span!("protoforge.verify"))
            .await
    }

    /// Remember a user rule for all later generations. Returns `false` when
    /// the rule was already known.
    pub async fn remember_rule(&self, rule: &str) -> Result<bool, StudioError> {
        if rule.trim().is_empty() {
            return Err(StudioError::InvalidInput("Rule must not be empty".to_string()));
        }
        Ok(self.rules.add(rule).await?)
    }

    pub async fn rules(&self) -> Result<Vec<String>, StudioError> {
        Ok(self.rules.rules().await?)
    }

    /// Store a design template in the style memory. Returns its id.
    pub async fn ingest_template(&self, draft: &TemplateDraft) -> Result<String, StudioError> {
        let memory = self
            .style_memory
            .as_ref()
            .ok_or(StudioError::StyleMemoryDisabled)?;
        if draft.name.trim().is_empty() {
            return Err(StudioError::InvalidInput(
                "Template name must not be empty".to_string(),
            ));
        }

        let id = memory.insert_draft(draft).await?;
        info!(id = %id, name = draft.name.trim(), "style template ingested");
        Ok(id)
    }
}

fn merge_rules(stored: Vec<String>, extra: Vec<String>) -> Vec<String> {
    let mut rules = stored;
    for rule in extra {
        if !rules.contains(&rule) {
            rules.push(rule);
        }
    }
    rules
}

fn context_tag(instruction: &str, mode: GenerationMode) -> String {
    match instruction.trim() {
        "" => mode.as_str().to_string(),
        instruction => instruction.to_string(),
    }
}

fn prototype_file_name(mode: GenerationMode) -> &'static str {
    match mode {
        GenerationMode::CloneLayout => "generated_prototype.html",
        GenerationMode::Restyle => "redesigned_ui.html",
        GenerationMode::MarketingAsset => "marketing_asset.html",
    }
}
