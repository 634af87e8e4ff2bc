use serde::{Deserialize, Serialize};

use super::ids::RecordId;

/// Inline behavior code attached to a topic info.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogueScript {
    /// Lines run when the info starts playing.
    #[serde(default)]
    pub start_lines: Vec<String>,
    /// Lines run when the info finishes playing.
    #[serde(default)]
    pub end_lines: Vec<String>,
    #[serde(default)]
    pub properties: Vec<ScriptProperty>,
}

impl DialogueScript {
    pub fn is_empty(&self) -> bool {
        self.start_lines.is_empty() && self.end_lines.is_empty()
    }
}

/// An auto-property declared by a script and bound on the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptProperty {
    /// Script type of the property, e.g. `Quest` or `GlobalVariable`.
    pub type_name: String,
    pub name: String,
    pub value: PropertyValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Object(RecordId),
    Int(i32),
    Float(f32),
    Bool(bool),
    Str(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_emptiness_ignores_properties() {
        let script = DialogueScript {
            properties: vec![ScriptProperty {
                type_name: "Quest".to_string(),
                name: "MQ101".to_string(),
                value: PropertyValue::Object(RecordId(0x44)),
            }],
            ..Default::default()
        };
        assert!(script.is_empty());
    }
}
