use serde::{Deserialize, Serialize};

use super::ids::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompareOperator {
    #[default]
    EqualTo,
    NotEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
}

/// The engine function a condition evaluates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConditionData {
    /// Is the subject the Nth alias of the running scene or quest.
    GetIsAliasRef { alias_index: i32 },
    GetIsId { npc: RecordId },
    GetInFaction { faction: RecordId },
    /// Accepts a voice type or a form list of voice types.
    GetIsVoiceType { voice_type_or_list: RecordId },
    IsCommandedActor,
    HasKeyword { keyword: RecordId },
    /// Any other function, written by the author.
    Custom {
        function: String,
        #[serde(default)]
        parameters: Vec<String>,
    },
}

/// A boolean precondition on a response set, quest or alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub data: ConditionData,
    #[serde(default)]
    pub operator: CompareOperator,
    pub value: f32,
    /// Chains with the next condition by OR instead of AND.
    #[serde(default)]
    pub or: bool,
}

impl Condition {
    /// `data == value`, AND-chained.
    pub fn equal_to(data: ConditionData, value: f32) -> Self {
        Self {
            data,
            operator: CompareOperator::EqualTo,
            value,
            or: false,
        }
    }

    pub fn or(mut self, or: bool) -> Self {
        self.or = or;
        self
    }
}
