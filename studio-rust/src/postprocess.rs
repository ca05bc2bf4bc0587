use crate::prompt::{ReferenceImage, LOGO_TOKEN};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};

/// Used for the logo when no logo image was supplied.
pub const LOGO_PLACEHOLDER_URL: &str = "https://via.placeholder.com/150x50?text=Logo";

/// Opens the injected tooling fragment. Appears exactly once in every
/// post-processed artifact.
pub const DESIGN_TOOLS_MARKER: &str = "<!-- protoforge:design-tools -->";
const DESIGN_TOOLS_END: &str = "<!-- /protoforge:design-tools -->";

const DESIGN_TOOLS: &str = include_str!("design_tools.html");

const BODY_CLOSE: &str = "</body>";

/// Turn raw backend markup into the final artifact: logo substitution, then
/// tooling injection.
#[must_use]
pub fn postprocess(raw_markup: &str, logo: Option<&ReferenceImage>) -> String {
    inject_design_tools(&substitute_logo(raw_markup, logo))
}

/// Replace every [`LOGO_TOKEN`] with the logo as a data URI, or with the
/// placeholder URL when there is no logo.
#[must_use]
pub fn substitute_logo(markup: &str, logo: Option<&ReferenceImage>) -> String {
    let replacement = match logo {
        Some(logo) => logo_data_uri(&logo.file_name, &logo.data),
        None => LOGO_PLACEHOLDER_URL.to_string(),
    };
    markup.replace(LOGO_TOKEN, &replacement)
}

/// `data:` URI with the MIME type chosen by file extension.
#[must_use]
pub fn logo_data_uri(file_name: &str, data: &[u8]) -> String {
    let lower = file_name.to_ascii_lowercase();
    let mime = if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else {
        "image/png"
    };
    format!("data:{mime};base64,{}", BASE64_STANDARD.encode(data))
}

/// Insert the tooling fragment before the last closing body tag, or append
/// it. Any fragment already present is removed first.
#[must_use]
pub fn inject_design_tools(markup: &str) -> String {
    let markup = strip_design_tools(markup);

    // ASCII lowercasing keeps byte offsets intact.
    match markup.to_ascii_lowercase().rfind(BODY_CLOSE) {
        Some(index) => {
            let mut output = String::with_capacity(markup.len() + DESIGN_TOOLS.len());
            output.push_str(&markup[..index]);
            output.push_str(DESIGN_TOOLS);
            output.push_str(&markup[index..]);
            output
        }
        None => {
            let mut output = markup;
            if !output.is_empty() && !output.ends_with('\n') {
                output.push('\n');
            }
            output.push_str(DESIGN_TOOLS);
            output
        }
    }
}

/// Remove every injected tooling fragment. A marker without a matching end
/// marker is dropped on its own and the markup after it is kept.
#[must_use]
pub fn strip_design_tools(markup: &str) -> String {
    let mut output = markup.to_string();
    while let Some(start) = output.find(DESIGN_TOOLS_MARKER) {
        let end = output[start..].find(DESIGN_TOOLS_END).map_or(
            start + DESIGN_TOOLS_MARKER.len(),
            |offset| start + offset + DESIGN_TOOLS_END.len(),
        );
        let end = if output[end..].starts_with('\n') {
            end + 1
        } else {
            end
        };
        output.replace_range(start..end, "");
    }
    output
}
