//! Script fragment stubs for response sets with inline code.
//!
//! The generated source is deterministic: the same script and response set
//! id always produce byte-identical text.

use crate::core::context::ScriptRegistry;
use crate::schema::ids::RecordId;
use crate::schema::record::{ScriptAdapter, ScriptEntry, ScriptFragment, ScriptFragments};
use crate::schema::script::DialogueScript;

pub const BIND_DATA_VERSION: u8 = 2;

const BEGIN_FRAGMENT: &str = "Fragment_0";
const END_FRAGMENT: &str = "Fragment_1";

/// Script name for a response set: `{prefix}_TIF__{id}`, or `TIF__{id}`
/// without a prefix.
pub fn script_name(prefix: &str, response_set: RecordId) -> String {
    if prefix.is_empty() {
        format!("TIF__{response_set}")
    } else {
        format!("{prefix}_TIF__{response_set}")
    }
}

/// Emit the fragment source for `script`, register it, and return the
/// binding to attach to the response set. `None` when neither block has code.
pub fn build_fragment(
    script: &DialogueScript,
    response_set: RecordId,
    prefix: &str,
    registry: &mut ScriptRegistry,
) -> Option<ScriptAdapter> {
    let has_start = !script.start_lines.is_empty();
    let has_end = !script.end_lines.is_empty();
    if !has_start && !has_end {
        return None;
    }

    let name = script_name(prefix, response_set);
    let text = fragment_source(&name, script);
    registry.register(name.clone(), text);
    tracing::debug!(script = %name, "registered fragment script");

    let fragment = |fragment_name: &str| ScriptFragment {
        bind_data_version: BIND_DATA_VERSION,
        script_name: name.clone(),
        fragment_name: fragment_name.to_string(),
    };

    Some(ScriptAdapter {
        entry: ScriptEntry {
            name: name.clone(),
            local: true,
            properties: script.properties.clone(),
        },
        fragments: ScriptFragments {
            file_name: name.clone(),
            on_begin: has_start.then(|| fragment(BEGIN_FRAGMENT)),
            on_end: has_end.then(|| fragment(END_FRAGMENT)),
        },
    })
}

fn fragment_source(name: &str, script: &DialogueScript) -> String {
    let blocks = [(0, &script.start_lines), (1, &script.end_lines)];

    let mut middle = String::new();
    let mut emitted = 0;
    for (index, lines) in blocks {
        if lines.is_empty() {
            continue;
        }
        middle.push_str(&fragment_block(index, lines));
        middle.push('\n');
        emitted += 1;
    }

    let properties: Vec<String> = script
        .properties
        .iter()
        .map(|property| format!("{} Property {} Auto", property.type_name, property.name))
        .collect();

    format!(
        ";BEGIN FRAGMENT CODE - Do not edit anything between this and the end comment\n\
         ;NEXT FRAGMENT INDEX {emitted}\n\
         Scriptname {name} Extends TopicInfo Hidden\n\
         \n\
         {middle}\n\
         \n\
         ;END FRAGMENT CODE - Do not edit anything between this and the begin comment\n\
         \n\
         {}",
        properties.join("\r\n")
    )
}

fn fragment_block(index: usize, lines: &[String]) -> String {
    format!(
        ";BEGIN FRAGMENT Fragment_{index}\n\
         Function Fragment_{index}(ObjectReference akSpeakerRef)\n\
         Actor akSpeaker = akSpeakerRef as Actor\n\
         ;BEGIN CODE\n\
         {}\n\
         ;END CODE\n\
         EndFunction\n\
         ;END FRAGMENT",
        lines.join("\r\n")
    )
}
