use crate::{
    AssistantMessage, ImagePart, LanguageModelInput, Message, ModelResponse, Part, TextPart,
    UserMessage,
};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};

impl TextPart {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl From<&str> for TextPart {
    fn from(value: &str) -> Self {
        Self {
            text: value.to_string(),
        }
    }
}

impl From<String> for TextPart {
    fn from(value: String) -> Self {
        Self { text: value }
    }
}

impl ImagePart {
    pub fn new(image_data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            image_data: image_data.into(),
            name: None,
        }
    }

    /// Build an image part from raw bytes, base64-encoding them.
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self::new(BASE64_STANDARD.encode(bytes), mime_type)
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextPart::new(text))
    }

    pub fn image(image_data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::Image(ImagePart::new(image_data, mime_type))
    }
}

impl From<TextPart> for Part {
    fn from(value: TextPart) -> Self {
        Self::Text(value)
    }
}

impl From<ImagePart> for Part {
    fn from(value: ImagePart) -> Self {
        Self::Image(value)
    }
}

impl Message {
    pub fn user(content: impl Into<Vec<Part>>) -> Self {
        Self::User(UserMessage {
            content: content.into(),
        })
    }

    pub fn assistant(content: impl Into<Vec<Part>>) -> Self {
        Self::Assistant(AssistantMessage {
            content: content.into(),
        })
    }

    pub fn content(&self) -> &[Part] {
        match self {
            Self::User(message) => &message.content,
            Self::Assistant(message) => &message.content,
        }
    }
}

impl LanguageModelInput {
    /// Iterate over every image part across all messages, in order.
    pub fn images(&self) -> impl Iterator<Item = &ImagePart> {
        self.messages
            .iter()
            .flat_map(Message::content)
            .filter_map(|part| match part {
                Part::Image(image_part) => Some(image_part),
                Part::Text(_) => None,
            })
    }

    /// Iterate over every text part across all messages, in order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.messages
            .iter()
            .flat_map(Message::content)
            .filter_map(|part| match part {
                Part::Text(text_part) => Some(text_part.text.as_str()),
                Part::Image(_) => None,
            })
    }
}

impl ModelResponse {
    /// Concatenate the text parts of the response. Returns `None` when the
    /// response has no text part at all.
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|part| match part {
                Part::Text(text_part) => Some(text_part.text.as_str()),
                Part::Image(_) => None,
            })
            .collect();

        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_text_concatenates_text_parts_in_order() {
        let response = ModelResponse {
            content: vec![
                Part::text("<div>"),
                Part::image("aGVsbG8=", "image/png"),
                Part::text("</div>"),
            ],
            usage: None,
        };

        assert_eq!(response.text().as_deref(), Some("<div></div>"));
    }

    #[test]
    fn response_text_is_none_without_text_parts() {
        let response = ModelResponse::default();
        assert_eq!(response.text(), None);
    }

    #[test]
    fn image_part_from_bytes_encodes_base64() {
        let part = ImagePart::from_bytes(b"hello", "image/png");
        assert_eq!(part.image_data, "aGVsbG8=");
        assert_eq!(part.mime_type, "image/png");
    }
}
