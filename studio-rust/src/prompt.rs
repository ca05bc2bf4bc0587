//! Builds the multimodal payload sent to the generation backend.
//!
//! Assembly is pure: the same request always yields the same parts, and
//! nothing here touches the network or the filesystem.

use crate::postprocess::strip_design_tools;
use protoforge_sdk::{ImagePart, Part};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Reserved token the model must use as the `src` of the primary logo.
pub const LOGO_TOKEN: &str = "LOGO_TOKEN";
/// Label used for images without a usable context label.
pub const UNKNOWN_COMPONENT: &str = "Unknown Component";
/// Placeholder pattern the model must use for every non-logo image.
pub const IMAGE_PLACEHOLDER: &str = "https://via.placeholder.com/WIDTHxHEIGHT";

const CONTENT_RULES: &str = "CONTENT RULES (CRITICAL):
1. Specific text: if the USER INSTRUCTION provides a headline or specific copy, use it verbatim.
2. Filler text: for every other text area (body paragraphs, secondary cards, nav links) use Lorem Ipsum. Do NOT invent marketing copy or generic English text.
3. Images: use src=\"LOGO_TOKEN\" for the primary logo. Use https://via.placeholder.com/WIDTHxHEIGHT for all other images.";

const OUTPUT_RULE: &str = "OUTPUT: Return ONLY valid HTML code styled with TailwindCSS classes. Do not include markdown code blocks.";

const REFINE_ROLE: &str = "You are an Expert Frontend Developer who edits production-ready HTML styled with TailwindCSS.";

/// Which prompt template drives a generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationMode {
    /// Reproduce the layout of the reference images exactly.
    #[default]
    CloneLayout,
    /// Keep the target's structure, apply the inspiration's look.
    Restyle,
    /// A single-screen marketing banner in the brand of the references.
    MarketingAsset,
}

struct ModeTemplate {
    role: &'static str,
    mission: &'static [&'static str],
}

const CLONE_LAYOUT: ModeTemplate = ModeTemplate {
    role: "You are a Frontend Cloning Expert specialized in pixel-perfect HTML/TailwindCSS replication.",
    mission: &[
        "CLONE THE LAYOUT: your HTML structure (grid, spacing, alignment, element placement) must mimic the attached VISUAL REFERENCES exactly. Do not invent a generic hero section or marketing template unless no image is provided.",
        "APPLY THE BRANDING: use the colors, border radii and shadows from the STYLE GUIDE when one is given.",
        "INJECT CONTENT: use the USER INSTRUCTION to decide what the text should say.",
    ],
};

const RESTYLE: ModeTemplate = ModeTemplate {
    role: "You are a UI Redesign Specialist.",
    mission: &[
        "The TARGET image is the source of truth for structure and content. Keep all of its text, buttons, navigation links and general layout.",
        "The INSPIRATION image is the source of truth for visuals. Change colors, fonts, border radii, shadows, gradients and spacing to match it.",
        "Rewrite the TARGET UI so that it looks like it belongs to the INSPIRATION UI.",
    ],
};

const MARKETING_ASSET: ModeTemplate = ModeTemplate {
    role: "You are a Corporate Brand Designer creating new assets from existing brand templates.",
    mission: &[
        "Create a MARKETING BANNER that uses the same branding and theme as the attached VISUAL REFERENCES.",
        "Layout: single screen, centered content, optimized for 1200x630px but responsive.",
        "Typography: large, bold and impactful. Calls to action use high-contrast buttons.",
    ],
};

impl GenerationMode {
    fn template(self) -> &'static ModeTemplate {
        match self {
            Self::CloneLayout => &CLONE_LAYOUT,
            Self::Restyle => &RESTYLE,
            Self::MarketingAsset => &MARKETING_ASSET,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CloneLayout => "clone-layout",
            Self::Restyle => "restyle",
            Self::MarketingAsset => "marketing-asset",
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "clone-layout" | "clone_layout" | "" => Ok(Self::CloneLayout),
            "restyle" => Ok(Self::Restyle),
            "marketing-asset" | "marketing_asset" => Ok(Self::MarketingAsset),
            other => Err(format!("Unknown generation mode '{other}'")),
        }
    }
}

/// What a reference image is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageRole {
    Target,
    Inspiration,
    Logo,
    Reference,
}

impl ImageRole {
    /// Tag an image from its context label. Labels mentioning a logo always
    /// win; in restyle mode unlabeled images are target then inspiration.
    #[must_use]
    pub fn from_label(label: &str, index: usize, mode: GenerationMode) -> Self {
        let label = label.to_lowercase();
        if label.contains("logo") {
            Self::Logo
        } else if label.contains("inspiration") {
            Self::Inspiration
        } else if label.contains("target") {
            Self::Target
        } else {
            match (mode, index) {
                (GenerationMode::Restyle, 0) => Self::Target,
                (GenerationMode::Restyle, 1) => Self::Inspiration,
                _ => Self::Reference,
            }
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Target => "target",
            Self::Inspiration => "inspiration",
            Self::Logo => "logo",
            Self::Reference => "reference",
        }
    }
}

/// An uploaded image together with how it should be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
    pub role: ImageRole,
}

impl ReferenceImage {
    /// The MIME type is sniffed from the bytes, then guessed from the file
    /// extension.
    pub fn new(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = match infer::get(&data) {
            Some(kind) if kind.mime_type().starts_with("image/") => kind.mime_type().to_string(),
            _ => mime_from_extension(&file_name).to_string(),
        };
        Self {
            file_name,
            mime_type,
            data,
            role: ImageRole::Reference,
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: ImageRole) -> Self {
        self.role = role;
        self
    }

    pub(crate) fn to_part(&self, label: &str) -> Part {
        Part::Image(ImagePart::from_bytes(&self.data, self.mime_type.clone()).with_name(label))
    }
}

fn mime_from_extension(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/png",
    }
}

/// One user action's worth of generation input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationRequest {
    /// Free-text instruction; may be empty.
    pub instruction: String,
    /// Per-image labels, aligned with `images` by index. May be shorter.
    pub contexts: Vec<String>,
    pub style_context: Option<String>,
    pub images: Vec<ReferenceImage>,
    /// Injected verbatim, in order.
    pub learned_rules: Vec<String>,
    pub mode: GenerationMode,
}

impl GenerationRequest {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: GenerationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Attach images with their labels. Roles are tagged from the labels
    /// and the current mode, so set the mode first.
    #[must_use]
    pub fn with_images(mut self, images: Vec<ReferenceImage>, contexts: Vec<String>) -> Self {
        self.contexts = contexts;
        self.images = images;
        for index in 0..self.images.len() {
            let role = ImageRole::from_label(self.context_label(index), index, self.mode);
            self.images[index].role = role;
        }
        self
    }

    #[must_use]
    pub fn with_style_context(mut self, style_context: Option<String>) -> Self {
        self.style_context = style_context;
        self
    }

    #[must_use]
    pub fn with_learned_rules(mut self, learned_rules: Vec<String>) -> Self {
        self.learned_rules = learned_rules;
        self
    }

    /// The label of image `index`, defaulting when missing or blank.
    #[must_use]
    pub fn context_label(&self, index: usize) -> &str {
        self.contexts
            .get(index)
            .map(|label| label.trim())
            .filter(|label| !label.is_empty())
            .unwrap_or(UNKNOWN_COMPONENT)
    }

    /// The image whose bytes replace [`LOGO_TOKEN`]: the first one tagged
    /// as a logo.
    #[must_use]
    pub fn logo(&self) -> Option<&ReferenceImage> {
        self.images
            .iter()
            .find(|image| image.role == ImageRole::Logo)
    }
}

/// Ordered multimodal parts for one backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub parts: Vec<Part>,
}

impl Payload {
    /// The leading instruction block.
    #[must_use]
    pub fn instruction(&self) -> &str {
        match self.parts.first() {
            Some(Part::Text(text)) => &text.text,
            _ => "",
        }
    }

    pub fn images(&self) -> impl Iterator<Item = &ImagePart> {
        self.parts.iter().filter_map(|part| match part {
            Part::Image(image) => Some(image),
            Part::Text(_) => None,
        })
    }
}

/// Build the generation payload: one instruction block, then every image
/// in the order supplied.
#[must_use]
pub fn assemble(request: &GenerationRequest) -> Payload {
    let template = request.mode.template();
    let mut blocks: Vec<String> = Vec::with_capacity(6);

    blocks.push(template.role.to_string());

    let mut mission = String::from("YOUR MISSION:");
    for (index, rule) in template.mission.iter().enumerate() {
        mission.push_str(&format!("\n{}. {rule}", index + 1));
    }
    if !request.images.is_empty() {
        mission.push_str("\n\nVISUAL REFERENCES (attached in this order):");
        for (index, image) in request.images.iter().enumerate() {
            mission.push_str(&format!(
                "\n- Image {} ({}): {}",
                index + 1,
                image.role.as_str(),
                request.context_label(index)
            ));
        }
    }
    blocks.push(mission);

    blocks.push(format!("USER INSTRUCTION: {}", request.instruction));

    if let Some(rules) = learned_rules_block(&request.learned_rules) {
        blocks.push(rules);
    }

    if let Some(style_context) = &request.style_context {
        blocks.push(style_context.clone());
    }

    blocks.push(format!("{CONTENT_RULES}\n\n{OUTPUT_RULE}"));

    let mut parts = Vec::with_capacity(request.images.len() + 1);
    parts.push(Part::text(blocks.join("\n\n")));
    parts.extend(
        request
            .images
            .iter()
            .enumerate()
            .map(|(index, image)| image.to_part(request.context_label(index))),
    );

    Payload { parts }
}

/// Build a text-only payload asking the model to edit existing markup.
/// Injected tooling is stripped from `current_html` first.
#[must_use]
pub fn assemble_refinement(
    current_html: &str,
    instructions: &str,
    learned_rules: &[String],
) -> Payload {
    let mut blocks = vec![
        REFINE_ROLE.to_string(),
        "TASK: Update the following HTML code based strictly on the USER INSTRUCTIONS.".to_string(),
        format!("USER INSTRUCTIONS: {instructions}"),
    ];

    if let Some(rules) = learned_rules_block(learned_rules) {
        blocks.push(rules);
    }

    blocks.push(format!(
        "CURRENT CODE:\n{}",
        strip_design_tools(current_html).trim()
    ));
    blocks.push(format!(
        "Keep src=\"{LOGO_TOKEN}\" and image URLs as they are.\n\n{OUTPUT_RULE}"
    ));

    Payload {
        parts: vec![Part::text(blocks.join("\n\n"))],
    }
}

fn learned_rules_block(rules: &[String]) -> Option<String> {
    if rules.is_empty() {
        return None;
    }
    let mut block = String::from("LEARNED USER RULES:");
    for rule in rules {
        block.push_str("\n- ");
        block.push_str(rule);
    }
    Some(block)
}
