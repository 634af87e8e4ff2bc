//! Text processing chain for spoken lines.
//!
//! Every document snippet runs through the pre-processors on its own, the
//! results are concatenated, and the combined response runs through the
//! post-processors. Pre-processing is character-local, so building from
//! `[a, b]` gives the same result as building from `[a ++ b]` as long as no
//! snippet boundary splits a `[...]` script note.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::response::{DialogueResponse, FormattedText};

static SCRIPT_NOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\[\]]*\]").unwrap());
static ANNOTATION_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\[\]]*\]|\([^()]*\)").unwrap());

/// Typographic characters the target engine cannot display, with their
/// plain replacements.
pub const INVALID_STRINGS: &[(&str, &str)] = &[
    ("\u{2018}", "'"),
    ("\u{2019}", "'"),
    ("\u{201C}", "\""),
    ("\u{201D}", "\""),
    ("\u{2026}", "..."),
    ("\u{2013}", "-"),
    ("\u{2014}", "-"),
    ("\u{00A0}", " "),
];

/// Runs on each snippet before snippets are combined.
pub trait ResponsePreProcessor {
    fn process(&self, response: DialogueResponse, source: &FormattedText) -> DialogueResponse;
}

/// Runs once on the combined response.
pub trait ResponsePostProcessor {
    fn process(&self, response: &mut DialogueResponse);
}

/// Replaces characters from [`INVALID_STRINGS`].
#[derive(Debug, Clone, Copy, Default)]
pub struct InvalidStringFixer;

impl InvalidStringFixer {
    pub fn fix(text: &str) -> String {
        let mut fixed = text.to_string();
        for (invalid, replacement) in INVALID_STRINGS {
            if fixed.contains(invalid) {
                fixed = fixed.replace(invalid, replacement);
            }
        }
        fixed
    }
}

impl ResponsePreProcessor for InvalidStringFixer {
    fn process(&self, mut response: DialogueResponse, _source: &FormattedText) -> DialogueResponse {
        response.text = Self::fix(&response.text);
        response
    }
}

/// Moves `[...]` segments out of the spoken text into the script note.
///
/// Brackets are kept in the note so notes from separate snippets concatenate
/// the same way as notes from one snippet.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptNotesParser;

impl ResponsePreProcessor for ScriptNotesParser {
    fn process(&self, mut response: DialogueResponse, _source: &FormattedText) -> DialogueResponse {
        let mut notes = String::new();
        for note in SCRIPT_NOTE.find_iter(&response.text) {
            notes.push_str(note.as_str());
        }
        if notes.is_empty() {
            return response;
        }
        response.text = SCRIPT_NOTE.replace_all(&response.text, "").into_owned();
        response.script_note.push_str(&notes);
        response
    }
}

/// Drops stray `{` and `}` left over from document formatting.
#[derive(Debug, Clone, Copy, Default)]
pub struct BracesRemover;

impl ResponsePostProcessor for BracesRemover {
    fn process(&self, response: &mut DialogueResponse) {
        response.text.retain(|c| c != '{' && c != '}');
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Trimmer;

impl ResponsePostProcessor for Trimmer {
    fn process(&self, response: &mut DialogueResponse) {
        let text = response.text.trim();
        if text.len() != response.text.len() {
            response.text = text.to_string();
        }
        let note = response.script_note.trim();
        if note.len() != response.script_note.len() {
            response.script_note = note.to_string();
        }
    }
}

const PRE_PROCESSORS: &[&dyn ResponsePreProcessor] = &[&InvalidStringFixer, &ScriptNotesParser];
const POST_PROCESSORS: &[&dyn ResponsePostProcessor] = &[&BracesRemover, &Trimmer];

/// Build one response from document snippets.
pub fn build_response(snippets: &[FormattedText]) -> DialogueResponse {
    let mut combined = DialogueResponse::default();

    for snippet in snippets {
        let mut response = DialogueResponse::new(snippet.text.clone());
        for pre in PRE_PROCESSORS {
            response = pre.process(response, snippet);
        }
        combined.text.push_str(&response.text);
        combined.script_note.push_str(&response.script_note);
    }

    for post in POST_PROCESSORS {
        post.process(&mut combined);
    }

    combined
}

/// Topic and prompt text as written to records: fixed and trimmed, `None`
/// when blank.
pub fn display_text(raw: &str) -> Option<String> {
    let fixed = InvalidStringFixer::fix(raw);
    let trimmed = fixed.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Every `[...]` and `(...)` segment in `text`.
///
/// Used to report notes the author left in prompts or spoken text.
pub fn annotation_markers(text: &str) -> Vec<&str> {
    ANNOTATION_MARKER
        .find_iter(text)
        .map(|m| m.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippets(parts: &[&str]) -> Vec<FormattedText> {
        parts.iter().map(|p| FormattedText::new(*p)).collect()
    }

    #[test]
    fn fixes_typographic_characters() {
        let r = build_response(&snippets(&["\u{201C}Don\u{2019}t\u{2026}\u{201D}"]));
        assert_eq!(r.text, "\"Don't...\"");
    }

    #[test]
    fn extracts_script_notes() {
        let r = build_response(&snippets(&["[Sighs] I suppose so. [Looks away]"]));
        assert_eq!(r.text, "I suppose so.");
        assert_eq!(r.script_note, "[Sighs][Looks away]");
    }

    #[test]
    fn removes_braces_and_trims() {
        let r = build_response(&snippets(&["  {Well}, then.  "]));
        assert_eq!(r.text, "Well, then.");
    }

    #[test]
    fn building_is_associative_over_snippets() {
        let split = build_response(&snippets(&["Hello [waves] there, ", "friend [nods]."]));
        let joined = build_response(&snippets(&["Hello [waves] there, friend [nods]."]));
        assert_eq!(split, joined);
        assert_eq!(split.script_note, joined.script_note);
    }

    #[test]
    fn unclosed_note_stays_in_text() {
        let r = build_response(&snippets(&["Wait [what"]));
        assert_eq!(r.text, "Wait [what");
        assert!(r.script_note.is_empty());
    }

    #[test]
    fn annotation_markers_found() {
        let markers = annotation_markers("Friends? (Illusion) [Hard]");
        assert_eq!(markers, vec!["(Illusion)", "[Hard]"]);
        assert!(annotation_markers("Plain text.").is_empty());
    }

    #[test]
    fn empty_snippet_list_builds_empty_response() {
        let r = build_response(&[]);
        assert!(r.text.is_empty());
        assert!(r.script_note.is_empty());
    }
}
