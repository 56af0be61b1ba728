use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of interaction happened between the two participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Text,
    Image,
    Voice,
    VideoCall,
}

impl InteractionKind {
    /// Base energy awarded for this kind of interaction.
    pub fn base_energy(&self) -> u32 {
        match self {
            InteractionKind::Text => 1,
            InteractionKind::Image => 2,
            InteractionKind::Voice => 3,
            InteractionKind::VideoCall => 4,
        }
    }
}

impl std::fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InteractionKind::Text => write!(f, "text"),
            InteractionKind::Image => write!(f, "image"),
            InteractionKind::Voice => write!(f, "voice"),
            InteractionKind::VideoCall => write!(f, "video_call"),
        }
    }
}

/// A single interaction event to be scored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub kind: InteractionKind,

    /// Text content, used only to fingerprint repeated messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// When the interaction happened.
    pub at: DateTime<Utc>,
}

impl InteractionEvent {
    pub fn new(kind: InteractionKind, at: DateTime<Utc>) -> Self {
        Self {
            kind,
            content: None,
            at,
        }
    }

    pub fn text(content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            kind: InteractionKind::Text,
            content: Some(content.into()),
            at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_energy() {
        assert_eq!(InteractionKind::Text.base_energy(), 1);
        assert_eq!(InteractionKind::Image.base_energy(), 2);
        assert_eq!(InteractionKind::Voice.base_energy(), 3);
        assert_eq!(InteractionKind::VideoCall.base_energy(), 4);
    }

    #[test]
    fn test_text_constructor() {
        let at = Utc::now();
        let event = InteractionEvent::text("hello", at);
        assert_eq!(event.kind, InteractionKind::Text);
        assert_eq!(event.content, Some("hello".to_string()));
        assert_eq!(event.at, at);
    }
}
