use serde::{Deserialize, Serialize};

use crate::core::text;

/// A run of text extracted from the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedText {
    pub text: String,
}

impl FormattedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// The emotion an actor plays a line with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Emotion {
    #[default]
    Neutral,
    Anger,
    Disgust,
    Fear,
    Sad,
    Happy,
    Surprise,
    Puzzled,
}

/// Default emotion intensity for freshly built responses.
pub const DEFAULT_EMOTION_VALUE: u8 = 50;

/// One spoken line.
///
/// Two responses are equal when their text and script note are equal; the
/// emotion is performance metadata and does not take part in comparisons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueResponse {
    pub text: String,
    #[serde(default)]
    pub script_note: String,
    #[serde(default)]
    pub emotion: Emotion,
    #[serde(default = "default_emotion_value")]
    pub emotion_value: u8,
}

fn default_emotion_value() -> u8 {
    DEFAULT_EMOTION_VALUE
}

impl DialogueResponse {
    /// Build a response from document snippets through the text processing
    /// chain (see [`crate::core::text`]).
    pub fn build(snippets: &[FormattedText]) -> Self {
        text::build_response(snippets)
    }

    /// A response with the given text and no note.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            script_note: String::new(),
            emotion: Emotion::Neutral,
            emotion_value: DEFAULT_EMOTION_VALUE,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.script_note = note.into();
        self
    }

    /// Set the emotion; the intensity is clamped to 0..=100.
    pub fn with_emotion(mut self, emotion: Emotion, value: u8) -> Self {
        self.emotion = emotion;
        self.emotion_value = value.min(100);
        self
    }

    /// Annotation markers still present in the spoken text.
    pub fn notes(&self) -> Vec<&str> {
        text::annotation_markers(&self.text)
    }
}

impl Default for DialogueResponse {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl PartialEq for DialogueResponse {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text && self.script_note == other.script_note
    }
}

impl Eq for DialogueResponse {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_emotion() {
        let a = DialogueResponse::new("Hello.").with_emotion(Emotion::Happy, 80);
        let b = DialogueResponse::new("Hello.").with_emotion(Emotion::Anger, 10);
        assert_eq!(a, b);
    }

    #[test]
    fn equality_includes_note() {
        let a = DialogueResponse::new("Hello.").with_note("[waves]");
        let b = DialogueResponse::new("Hello.");
        assert_ne!(a, b);
    }

    #[test]
    fn emotion_value_defaults_and_clamps() {
        assert_eq!(DialogueResponse::new("x").emotion_value, 50);
        let r = DialogueResponse::new("x").with_emotion(Emotion::Fear, 250);
        assert_eq!(r.emotion_value, 100);
    }

    #[test]
    fn deserialize_fills_defaults() {
        let r: DialogueResponse = ron::from_str(r#"(text: "Hi.")"#).unwrap();
        assert_eq!(r.emotion, Emotion::Neutral);
        assert_eq!(r.emotion_value, 50);
        assert!(r.script_note.is_empty());
    }
}
