use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype wrapper for identifiers allocated by a record repository.
///
/// Displayed as eight upper-case hex digits, which is also the form used
/// inside generated script names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub u32);

impl RecordId {
    /// The null reference.
    pub const NULL: RecordId = RecordId(0);

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

/// Index of a topic inside a [`DialogueGraph`](super::graph::DialogueGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TopicId(pub usize);

/// Index of a shared info inside a [`DialogueGraph`](super::graph::DialogueGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SharedInfoId(pub usize);
