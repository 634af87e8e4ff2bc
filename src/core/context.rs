//! Per-run compilation state: repository handle, target quest, collected
//! script sources and content issues.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::config::CompilerConfig;
use crate::core::repository::RecordRepository;
use crate::schema::ids::RecordId;
use crate::schema::record::Record;

/// Generated script sources of one run, keyed by script name.
///
/// Accumulate-only. Registering the same name twice keeps the first text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScriptRegistry {
    scripts: BTreeMap<String, String>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if a script with this name was already registered.
    pub fn register(&mut self, name: impl Into<String>, text: impl Into<String>) -> bool {
        let name = name.into();
        if self.scripts.contains_key(&name) {
            let text = text.into();
            if self.scripts.get(&name) != Some(&text) {
                tracing::warn!(script = %name, "script re-registered with different text; keeping the first");
            }
            return false;
        }
        self.scripts.insert(name, text.into());
        true
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.scripts.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.scripts.iter().map(|(name, text)| (name.as_str(), text.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IssueKind {
    /// Script note or parenthetical left in a player prompt.
    PromptNote,
    /// Script note or parenthetical left in a spoken line.
    ResponseNote,
    /// A link that points outside the conversation graph.
    DanglingLink,
    /// Lines beyond what one response set can hold.
    TooManyLines,
}

/// A content warning raised while compiling. Never aborts compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub kind: IssueKind,
    /// Speaker name without spaces, or the record the issue is about.
    pub subject: String,
    pub message: String,
    /// Annotation markers found in the text, in order.
    pub notes: Vec<String>,
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.subject, self.message)?;
        for note in &self.notes {
            write!(f, "\n  Note: {note}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssueList {
    issues: Vec<Issue>,
}

impl IssueList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: Issue) {
        tracing::warn!(kind = ?issue.kind, subject = %issue.subject, "{}", issue.message);
        self.issues.push(issue);
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Issue> {
        self.issues.iter()
    }

    pub fn of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |issue| issue.kind == kind)
    }
}

impl<'a> IntoIterator for &'a IssueList {
    type Item = &'a Issue;
    type IntoIter = std::slice::Iter<'a, Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.iter()
    }
}

/// Everything a category compiler needs while emitting records.
pub struct DialogueContext<'a> {
    pub repository: &'a mut dyn RecordRepository,
    /// Quest the compiled records belong to.
    pub quest: RecordId,
    pub config: &'a CompilerConfig,
    pub scripts: &'a mut ScriptRegistry,
    pub issues: &'a mut IssueList,
}

impl<'a> DialogueContext<'a> {
    pub fn new(
        repository: &'a mut dyn RecordRepository,
        quest: RecordId,
        config: &'a CompilerConfig,
        scripts: &'a mut ScriptRegistry,
        issues: &'a mut IssueList,
    ) -> Self {
        Self {
            repository,
            quest,
            config,
            scripts,
            issues,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.config.prefix
    }

    /// `name` with the prefix in front, not doubled if `name` already has it.
    pub fn prefixed(&self, name: &str) -> String {
        let prefix = self.prefix();
        format!("{prefix}{}", name.strip_prefix(prefix).unwrap_or(name))
    }

    /// First `{base}{n:02}` editor id, counting from 1, that no layer uses.
    pub fn free_editor_id(&self, base: &str) -> String {
        (1..)
            .map(|n| format!("{base}{n:02}"))
            .find(|candidate| self.repository.resolve_by_editor_id(candidate).is_none())
            .unwrap_or_else(|| base.to_string())
    }

    pub fn next_id(&mut self) -> RecordId {
        let id = self.repository.next_id();
        tracing::debug!(%id, "allocated record id");
        id
    }

    /// Editor id of the context quest, empty if the repository doesn't know it.
    pub fn quest_editor_id(&self) -> String {
        self.repository
            .resolve(self.quest)
            .and_then(Record::editor_id)
            .unwrap_or_default()
            .to_string()
    }

    /// Identifier of the record with this editor id, creating it with `make`
    /// when no layer has one. The new record is given a fresh id.
    pub fn get_or_add(&mut self, editor_id: &str, make: impl FnOnce(RecordId) -> Record) -> RecordId {
        if let Some(existing) = self.repository.resolve_by_editor_id(editor_id) {
            let id = existing.id();
            tracing::debug!(editor_id, %id, "reusing existing record");
            return id;
        }
        let id = self.next_id();
        self.repository.add(make(id));
        tracing::debug!(editor_id, %id, "added record");
        id
    }

    /// Pull a record into the target layer and edit it there.
    pub fn with_override<T>(&mut self, id: RecordId, edit: impl FnOnce(&mut Record) -> T) -> Option<T> {
        self.repository.resolve_override(id).map(edit)
    }

    pub fn report(&mut self, issue: Issue) {
        self.issues.push(issue);
    }
}
