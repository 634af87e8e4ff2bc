//! The record repository capability and an in-memory implementation.
//!
//! The compiler only talks to [`RecordRepository`]; concrete plugin storage
//! belongs to the host. [`InMemoryRepository`] keeps one writable target
//! layer on top of read-only lower layers, the same way overrides stack in a
//! load order: lookups and enumeration see the highest layer first.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::core::text::display_text;
use crate::schema::graph::{DialogueGraph, TopicInfo};
use crate::schema::ids::{RecordId, TopicId};
use crate::schema::record::{DialogTopic, Record, RecordKind, ResponseSet};
use crate::schema::speaker::AliasSpeaker;

/// First identifier handed out by a fresh repository.
pub const FIRST_RECORD_ID: u32 = 0x800;

pub trait RecordRepository {
    /// Allocate a fresh identifier, unique within the target layer.
    fn next_id(&mut self) -> RecordId;

    /// Insert a record into the target layer. Returns `false` and leaves
    /// the layer untouched when the identifier is already present.
    fn add(&mut self, record: Record) -> bool;

    /// Winning override for an identifier.
    fn resolve(&self, id: RecordId) -> Option<&Record>;

    fn resolve_by_editor_id(&self, editor_id: &str) -> Option<&Record>;

    /// Mutable access to a record in the target layer, copying the winning
    /// override up from a lower layer first if needed.
    fn resolve_override(&mut self, id: RecordId) -> Option<&mut Record>;

    /// Winning overrides of one kind, highest priority layer first.
    fn winning_overrides(&self, kind: RecordKind) -> Vec<&Record>;

    /// Winning topic records, highest priority first.
    fn winning_topics(&self) -> Vec<&DialogTopic> {
        self.winning_overrides(RecordKind::Topic)
            .into_iter()
            .filter_map(Record::as_topic)
            .collect()
    }

    /// A response set anywhere in the winning topics.
    fn find_response_set(&self, id: RecordId) -> Option<&ResponseSet> {
        self.winning_topics()
            .into_iter()
            .flat_map(|topic| topic.responses.iter())
            .find(|set| set.id == id)
    }
}

/// Maps scene speaker labels to alias slots. May be interactive.
pub trait SpeakerResolver {
    /// One entry per requested label, in request order. Entries whose `id`
    /// is `None` are asked for again.
    fn resolve_speakers(&mut self, names: &[String]) -> Vec<AliasSpeaker>;
}

/// A resolver backed by a fixed table, for batch and test hosts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticSpeakerResolver {
    speakers: FxHashMap<String, AliasSpeaker>,
}

impl StaticSpeakerResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_speaker(mut self, speaker: AliasSpeaker) -> Self {
        self.insert(speaker);
        self
    }

    pub fn insert(&mut self, speaker: AliasSpeaker) {
        self.speakers.insert(speaker.name.clone(), speaker);
    }

    pub fn from_speakers(speakers: impl IntoIterator<Item = AliasSpeaker>) -> Self {
        let mut resolver = Self::new();
        for speaker in speakers {
            resolver.insert(speaker);
        }
        resolver
    }
}

impl SpeakerResolver for StaticSpeakerResolver {
    fn resolve_speakers(&mut self, names: &[String]) -> Vec<AliasSpeaker> {
        names
            .iter()
            .map(|name| {
                self.speakers
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| AliasSpeaker::unresolved(name.clone()))
            })
            .collect()
    }
}

/// One plugin's worth of records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordLayer {
    pub name: String,
    records: Vec<Record>,
    #[serde(skip)]
    index: FxHashMap<RecordId, usize>,
}

impl RecordLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_record(mut self, record: Record) -> Self {
        self.insert(record);
        self
    }

    /// Insert or replace.
    pub fn insert(&mut self, record: Record) {
        let id = record.id();
        match self.index.get(&id) {
            Some(&slot) => self.records[slot] = record,
            None => {
                self.index.insert(id, self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.index.get(&id).map(|&slot| &self.records[slot])
    }

    pub fn get_mut(&mut self, id: RecordId) -> Option<&mut Record> {
        self.index.get(&id).map(|&slot| &mut self.records[slot])
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn max_id(&self) -> Option<u32> {
        self.records.iter().map(|record| record.id().0).max()
    }

    /// Rebuild the id index after deserialization.
    pub fn reindex(&mut self) {
        self.index = self
            .records
            .iter()
            .enumerate()
            .map(|(slot, record)| (record.id(), slot))
            .collect();
    }
}

/// A writable target layer over read-only lower layers.
#[derive(Debug, Clone)]
pub struct InMemoryRepository {
    target: RecordLayer,
    /// Highest priority first.
    masters: Vec<RecordLayer>,
    next_id: u32,
}

impl InMemoryRepository {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            target: RecordLayer::new(name),
            masters: Vec::new(),
            next_id: FIRST_RECORD_ID,
        }
    }

    /// Add a lower layer below every layer added so far.
    pub fn with_master(mut self, layer: RecordLayer) -> Self {
        self.bump_next_id(&layer);
        self.masters.push(layer);
        self
    }

    /// Seed the target layer, e.g. with the output of an earlier run.
    pub fn with_target_record(mut self, record: Record) -> Self {
        self.target.insert(record);
        let target = self.target.clone();
        self.bump_next_id(&target);
        self
    }

    pub fn target(&self) -> &RecordLayer {
        &self.target
    }

    pub fn into_target(self) -> RecordLayer {
        self.target
    }

    fn bump_next_id(&mut self, layer: &RecordLayer) {
        if let Some(max) = layer.max_id() {
            self.next_id = self.next_id.max(max + 1);
        }
    }

    fn layers(&self) -> impl Iterator<Item = &RecordLayer> {
        std::iter::once(&self.target).chain(self.masters.iter())
    }
}

impl RecordRepository for InMemoryRepository {
    fn next_id(&mut self) -> RecordId {
        let id = RecordId(self.next_id);
        self.next_id += 1;
        id
    }

    fn add(&mut self, record: Record) -> bool {
        if self.target.contains(record.id()) {
            return false;
        }
        let id = record.id().0;
        self.target.insert(record);
        self.next_id = self.next_id.max(id + 1);
        true
    }

    fn resolve(&self, id: RecordId) -> Option<&Record> {
        self.layers().find_map(|layer| layer.get(id))
    }

    fn resolve_by_editor_id(&self, editor_id: &str) -> Option<&Record> {
        self.layers()
            .flat_map(|layer| layer.records().iter())
            .find(|record| record.editor_id() == Some(editor_id))
    }

    fn resolve_override(&mut self, id: RecordId) -> Option<&mut Record> {
        if !self.target.contains(id) {
            let winning = self.masters.iter().find_map(|layer| layer.get(id))?.clone();
            self.target.insert(winning);
        }
        self.target.get_mut(id)
    }

    fn winning_overrides(&self, kind: RecordKind) -> Vec<&Record> {
        let mut seen = FxHashSet::default();
        self.layers()
            .flat_map(|layer| layer.records().iter())
            .filter(|record| seen.insert(record.id()))
            .filter(|record| record.kind() == kind)
            .collect()
    }
}

/// An already-compiled topic of `quest` with the same content as `topic`.
///
/// Topics are compared on player text, info count and, per info in order,
/// prompt, shared-info use, flags and spoken text or shared body length.
/// Emotions, conditions and scripts are ignored. The highest-priority match
/// wins.
pub fn find_matching_topic(
    repository: &dyn RecordRepository,
    quest: RecordId,
    graph: &DialogueGraph,
    topic: TopicId,
) -> Option<RecordId> {
    let source = graph.topics.get(topic.0)?;
    let player_text = display_text(source.player_text());

    repository
        .winning_topics()
        .into_iter()
        .filter(|candidate| candidate.quest == quest)
        .find(|candidate| {
            if player_text.is_some() && candidate.name != player_text {
                return false;
            }
            source.infos.len() == candidate.responses.len()
                && source
                    .infos
                    .iter()
                    .zip(&candidate.responses)
                    .all(|(info, set)| info_matches(info, set, player_text.is_some(), graph, repository))
        })
        .map(|candidate| candidate.id)
}

/// Whether a compiled response set has the content of `info`.
///
/// The prompt is only compared when the topic has no player text of its own
/// and the info is not reached through an invisible continue. Infos using a
/// shared body match sets whose shared data holds as many lines as the body.
pub fn info_matches(
    info: &TopicInfo,
    set: &ResponseSet,
    topic_has_player_text: bool,
    graph: &DialogueGraph,
    repository: &dyn RecordRepository,
) -> bool {
    if !topic_has_player_text && !info.invisible_continue && display_text(&info.prompt) != set.prompt {
        return false;
    }
    if info.shared_info.is_some() != set.shared_data.is_some() {
        return false;
    }
    let flags = &set.flags;
    if info.invisible_continue != flags.invisible_continue
        || info.goodbye != flags.goodbye
        || info.random != flags.random
        || info.say_once != flags.say_once
    {
        return false;
    }
    if let Some(shared) = info.shared_info {
        let body = graph.shared_info(shared).ok().map(|body| body.responses.len());
        let emitted = set
            .shared_data
            .and_then(|id| repository.find_response_set(id))
            .map(|data| data.responses.len());
        return set.responses.is_empty() && body.is_some() && body == emitted;
    }
    info.responses.len() == set.responses.len()
        && info
            .responses
            .iter()
            .zip(&set.responses)
            .all(|(response, line)| response.text == line.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::record::{NamedRecord, Quest};

    fn npc(id: u32, editor_id: &str) -> Record {
        Record::Npc(NamedRecord {
            id: RecordId(id),
            editor_id: editor_id.to_string(),
        })
    }

    #[test]
    fn next_id_is_monotonic_and_skips_existing() {
        let mut repo = InMemoryRepository::new("Test.esp")
            .with_master(RecordLayer::new("Master.esm").with_record(npc(0x900, "Anna")));
        let first = repo.next_id();
        let second = repo.next_id();
        assert_eq!(first, RecordId(0x901));
        assert_eq!(second, RecordId(0x902));
    }

    #[test]
    fn add_is_idempotent() {
        let mut repo = InMemoryRepository::new("Test.esp");
        assert!(repo.add(npc(0x800, "Anna")));
        assert!(!repo.add(npc(0x800, "Changed")));
        assert_eq!(
            repo.resolve(RecordId(0x800)).and_then(Record::editor_id),
            Some("Anna")
        );
    }

    #[test]
    fn target_layer_wins_over_masters() {
        let master = RecordLayer::new("Master.esm").with_record(Record::Quest(Quest::new(RecordId(0x10), "MQ")));
        let mut repo = InMemoryRepository::new("Test.esp").with_master(master);

        let quest = repo.resolve_override(RecordId(0x10)).unwrap();
        if let Record::Quest(q) = quest {
            q.priority = 70;
        }

        let winning = repo.winning_overrides(RecordKind::Quest);
        assert_eq!(winning.len(), 1);
        assert_eq!(winning[0].as_quest().unwrap().priority, 70);
        assert_eq!(repo.target().len(), 1);
    }

    #[test]
    fn resolve_by_editor_id_searches_all_layers() {
        let repo = InMemoryRepository::new("Test.esp")
            .with_master(RecordLayer::new("A.esm").with_record(npc(0x20, "Bob")));
        assert_eq!(repo.resolve_by_editor_id("Bob").map(Record::id), Some(RecordId(0x20)));
        assert!(repo.resolve_by_editor_id("Nobody").is_none());
    }

    #[test]
    fn static_resolver_marks_unknown_names_unresolved() {
        let mut resolver =
            StaticSpeakerResolver::new().with_speaker(AliasSpeaker::new("Anna", RecordId(0x30), 0));
        let resolved = resolver.resolve_speakers(&["Anna".to_string(), "Ghost".to_string()]);
        assert!(resolved[0].is_resolved());
        assert!(!resolved[1].is_resolved());
        assert_eq!(resolved[1].name, "Ghost");
    }
}
