use serde::{Deserialize, Serialize};

use super::ids::RecordId;

/// Who says a line.
///
/// The variants are mutually exclusive; the condition builder derives exactly
/// one identity condition from whichever one is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Speaker {
    /// A specific actor.
    Npc { name: String, id: RecordId },
    /// Any member of a faction.
    Faction { name: String, id: RecordId },
    /// Any actor using a voice type.
    VoiceType { name: String, id: RecordId },
    /// Any actor using one of the voice types in a form list.
    FormList { name: String, id: RecordId },
    /// A quest or scene alias slot.
    Alias {
        name: String,
        id: Option<RecordId>,
        alias_index: i32,
    },
    /// A label the document parser could not map to anything.
    Unresolved { name: String },
}

impl Speaker {
    pub fn name(&self) -> &str {
        match self {
            Self::Npc { name, .. }
            | Self::Faction { name, .. }
            | Self::VoiceType { name, .. }
            | Self::FormList { name, .. }
            | Self::Alias { name, .. }
            | Self::Unresolved { name } => name,
        }
    }

    /// Speaker name with all whitespace removed, used in editor ids.
    pub fn name_no_spaces(&self) -> String {
        self.name().split_whitespace().collect()
    }

    /// The referenced record, if the speaker points at one.
    pub fn record_id(&self) -> Option<RecordId> {
        match self {
            Self::Npc { id, .. }
            | Self::Faction { id, .. }
            | Self::VoiceType { id, .. }
            | Self::FormList { id, .. } => Some(*id),
            Self::Alias { id, .. } => *id,
            Self::Unresolved { .. } => None,
        }
    }
}

impl Default for Speaker {
    fn default() -> Self {
        Self::Unresolved {
            name: String::new(),
        }
    }
}

impl From<AliasSpeaker> for Speaker {
    fn from(alias: AliasSpeaker) -> Self {
        Self::Alias {
            name: alias.name,
            id: alias.id,
            alias_index: alias.alias_index,
        }
    }
}

/// A speaker label bound to an alias slot by a speaker resolver.
///
/// `id == None` means the resolver has not picked an identity yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasSpeaker {
    pub name: String,
    pub id: Option<RecordId>,
    pub alias_index: i32,
}

impl AliasSpeaker {
    pub fn new(name: impl Into<String>, id: RecordId, alias_index: i32) -> Self {
        Self {
            name: name.into(),
            id: Some(id),
            alias_index,
        }
    }

    pub fn unresolved(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            alias_index: -1,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.id.is_some_and(|id| !id.is_null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_no_spaces_strips_whitespace() {
        let speaker = Speaker::Npc {
            name: "Old Man Harlow".to_string(),
            id: RecordId(0x801),
        };
        assert_eq!(speaker.name_no_spaces(), "OldManHarlow");
    }

    #[test]
    fn alias_speaker_resolution_state() {
        assert!(AliasSpeaker::new("Anna", RecordId(0x10), 0).is_resolved());
        assert!(!AliasSpeaker::unresolved("Anna").is_resolved());
        assert!(!AliasSpeaker::new("Anna", RecordId::NULL, 0).is_resolved());
    }

    #[test]
    fn alias_speaker_converts_to_alias_variant() {
        let speaker: Speaker = AliasSpeaker::new("Bob", RecordId(0x20), 3).into();
        assert!(matches!(speaker, Speaker::Alias { alias_index: 3, .. }));
        assert_eq!(speaker.record_id(), Some(RecordId(0x20)));
    }
}
