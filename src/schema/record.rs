//! Target engine records produced by compilation.
//!
//! These mirror the relational layout of the engine's plugin format at the
//! field level only; byte layout and serialization belong to the host.

use serde::{Deserialize, Serialize};

use super::condition::Condition;
use super::ids::RecordId;
use super::response::Emotion;
use super::script::ScriptProperty;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Topic,
    Branch,
    Scene,
    Quest,
    Npc,
    Faction,
    VoiceType,
    FormList,
    Keyword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopicCategory {
    Topic,
    Misc,
    Scene,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopicSubtype {
    Custom,
    Hello,
    Goodbye,
    Idle,
    SharedInfo,
    Scene,
}

impl TopicSubtype {
    /// Four-letter subtype code stored on the topic.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Custom => "CUST",
            Self::Hello => "HELO",
            Self::Goodbye => "GBYE",
            Self::Idle => "IDLE",
            Self::SharedInfo => "SHRD",
            Self::Scene => "SCEN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResponseFlags {
    pub say_once: bool,
    pub goodbye: bool,
    pub invisible_continue: bool,
    pub random: bool,
    pub reset_hours: Option<f32>,
}

/// One compiled line inside a response set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseLine {
    /// 1-based position in the set.
    pub number: u8,
    pub text: String,
    pub script_note: String,
    pub emotion: Emotion,
    pub emotion_value: u8,
    pub use_emotion_animation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptFragment {
    pub bind_data_version: u8,
    pub script_name: String,
    pub fragment_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptFragments {
    pub file_name: String,
    pub on_begin: Option<ScriptFragment>,
    pub on_end: Option<ScriptFragment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptEntry {
    pub name: String,
    pub local: bool,
    pub properties: Vec<ScriptProperty>,
}

/// Script binding attached to a response set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptAdapter {
    pub entry: ScriptEntry,
    pub fragments: ScriptFragments,
}

/// The compiled form of one topic info.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSet {
    pub id: RecordId,
    pub flags: ResponseFlags,
    pub prompt: Option<String>,
    pub conditions: Vec<Condition>,
    /// The set played before this one in the same topic.
    pub previous: Option<RecordId>,
    pub responses: Vec<ResponseLine>,
    pub link_to: Vec<RecordId>,
    /// Shared response body this set speaks instead of its own lines.
    pub shared_data: Option<RecordId>,
    pub script: Option<ScriptAdapter>,
}

impl ResponseSet {
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            flags: ResponseFlags::default(),
            prompt: None,
            conditions: Vec::new(),
            previous: None,
            responses: Vec::new(),
            link_to: Vec::new(),
            shared_data: None,
            script: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogTopic {
    pub id: RecordId,
    pub editor_id: Option<String>,
    /// Player-visible topic text.
    pub name: Option<String>,
    pub quest: RecordId,
    pub category: TopicCategory,
    pub subtype: TopicSubtype,
    pub priority: u32,
    pub responses: Vec<ResponseSet>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BranchFlags {
    pub top_level: bool,
    pub blocking: bool,
    pub exclusive: bool,
}

/// Associates a starting topic with a quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogBranch {
    pub id: RecordId,
    pub editor_id: String,
    pub quest: RecordId,
    pub flags: BranchFlags,
    pub starting_topic: RecordId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SceneFlags {
    pub begin_on_quest_start: bool,
    pub stop_on_quest_end: bool,
    pub interruptable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenePhase {
    pub name: String,
    pub editor_width: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SceneActionKind {
    Dialog,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneAction {
    pub index: u32,
    pub kind: SceneActionKind,
    pub actor_alias: i32,
    pub start_phase: u32,
    pub end_phase: u32,
    /// Topic spoken by the actor; `None` for reaction-only actions.
    pub topic: Option<RecordId>,
    pub face_target: bool,
    pub headtrack_alias: Option<i32>,
    pub looping_min: u32,
    pub looping_max: u32,
    pub emotion: Emotion,
    pub emotion_value: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneActor {
    pub alias_id: u32,
    pub death_end: bool,
    pub combat_end: bool,
    pub dialogue_pause: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: RecordId,
    pub editor_id: String,
    pub quest: RecordId,
    pub flags: SceneFlags,
    pub phases: Vec<ScenePhase>,
    pub actions: Vec<SceneAction>,
    pub actors: Vec<SceneActor>,
    /// Highest action index handed out so far.
    pub last_action_index: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestAlias {
    pub name: String,
    pub unique_actor: Option<RecordId>,
    /// Story-manager event the alias is filled from.
    pub from_event: Option<String>,
    pub conditions: Vec<Condition>,
    pub allow_reserved: bool,
    pub allow_reuse: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    pub id: RecordId,
    pub editor_id: String,
    pub name: String,
    pub priority: u8,
    pub start_game_enabled: bool,
    /// Story-manager event that starts the quest.
    pub event: Option<String>,
    pub dialog_conditions: Vec<Condition>,
    pub aliases: Vec<QuestAlias>,
}

impl Quest {
    pub fn new(id: RecordId, editor_id: impl Into<String>) -> Self {
        let editor_id = editor_id.into();
        Self {
            id,
            name: editor_id.clone(),
            editor_id,
            priority: 0,
            start_game_enabled: false,
            event: None,
            dialog_conditions: Vec::new(),
            aliases: Vec::new(),
        }
    }
}

/// A record the compiler only needs to identify (actors, factions, voice
/// types, keywords, form lists).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRecord {
    pub id: RecordId,
    pub editor_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    Topic(DialogTopic),
    Branch(DialogBranch),
    Scene(Scene),
    Quest(Quest),
    Npc(NamedRecord),
    Faction(NamedRecord),
    VoiceType(NamedRecord),
    FormList(NamedRecord),
    Keyword(NamedRecord),
}

impl Record {
    pub fn id(&self) -> RecordId {
        match self {
            Self::Topic(t) => t.id,
            Self::Branch(b) => b.id,
            Self::Scene(s) => s.id,
            Self::Quest(q) => q.id,
            Self::Npc(r) | Self::Faction(r) | Self::VoiceType(r) | Self::FormList(r) | Self::Keyword(r) => r.id,
        }
    }

    pub fn editor_id(&self) -> Option<&str> {
        match self {
            Self::Topic(t) => t.editor_id.as_deref(),
            Self::Branch(b) => Some(&b.editor_id),
            Self::Scene(s) => Some(&s.editor_id),
            Self::Quest(q) => Some(&q.editor_id),
            Self::Npc(r) | Self::Faction(r) | Self::VoiceType(r) | Self::FormList(r) | Self::Keyword(r) => {
                Some(&r.editor_id)
            }
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Topic(_) => RecordKind::Topic,
            Self::Branch(_) => RecordKind::Branch,
            Self::Scene(_) => RecordKind::Scene,
            Self::Quest(_) => RecordKind::Quest,
            Self::Npc(_) => RecordKind::Npc,
            Self::Faction(_) => RecordKind::Faction,
            Self::VoiceType(_) => RecordKind::VoiceType,
            Self::FormList(_) => RecordKind::FormList,
            Self::Keyword(_) => RecordKind::Keyword,
        }
    }

    pub fn as_topic(&self) -> Option<&DialogTopic> {
        match self {
            Self::Topic(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_topic_mut(&mut self) -> Option<&mut DialogTopic> {
        match self {
            Self::Topic(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_scene_mut(&mut self) -> Option<&mut Scene> {
        match self {
            Self::Scene(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_quest(&self) -> Option<&Quest> {
        match self {
            Self::Quest(q) => Some(q),
            _ => None,
        }
    }
}
