//! The in-memory conversation graph.
//!
//! Topics live in an arena owned by [`DialogueGraph`]; a topic info's `links`
//! are [`TopicId`] edges into that arena, never owning references. Link
//! cycles (a branch returning to a hub menu) are legal. Invisible-continue
//! cycles are not, and [`DialogueGraph::append`] refuses to create one.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::condition::Condition;
use super::ids::{SharedInfoId, TopicId};
use super::response::DialogueResponse;
use super::script::DialogueScript;
use super::speaker::Speaker;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("unknown topic {0:?}")]
    UnknownTopic(TopicId),
    #[error("topic {topic:?} has no info at index {index}")]
    UnknownInfo { topic: TopicId, index: usize },
    #[error("unknown shared info {0:?}")]
    UnknownSharedInfo(SharedInfoId),
    #[error("appending {next:?} to {topic:?} would create an invisible-continue cycle")]
    ContinuationCycle { topic: TopicId, next: TopicId },
}

/// One branch of a topic: an actor's turn plus linkage and metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicInfo {
    #[serde(default)]
    pub speaker: Speaker,
    /// Text the player picks to reach this info, if player initiated.
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub responses: Vec<DialogueResponse>,
    /// Reuse an existing response body instead of `responses`.
    #[serde(default)]
    pub shared_info: Option<SharedInfoId>,
    #[serde(default)]
    pub say_once: bool,
    #[serde(default)]
    pub goodbye: bool,
    #[serde(default)]
    pub invisible_continue: bool,
    #[serde(default)]
    pub random: bool,
    /// Only values in `(0, 24]` reach the compiled record.
    #[serde(default)]
    pub reset_hours: f32,
    #[serde(default)]
    pub links: Vec<TopicId>,
    #[serde(default)]
    pub extra_conditions: Vec<Condition>,
    #[serde(default)]
    pub script: DialogueScript,
}

impl TopicInfo {
    pub fn new(speaker: Speaker) -> Self {
        Self {
            speaker,
            ..Default::default()
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_response(mut self, response: DialogueResponse) -> Self {
        self.responses.push(response);
        self
    }

    pub fn with_link(mut self, topic: TopicId) -> Self {
        self.links.push(topic);
        self
    }
}

/// An entry point of a conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogueTopic {
    /// Player-visible topic text.
    #[serde(default)]
    pub prompt: Option<String>,
    /// Scene topics carry the speaker of their turn.
    #[serde(default)]
    pub speaker: Option<Speaker>,
    #[serde(default)]
    pub infos: Vec<TopicInfo>,
    /// Assigned during pre-processing.
    #[serde(default)]
    pub editor_id: Option<String>,
}

impl DialogueTopic {
    pub fn new(infos: Vec<TopicInfo>) -> Self {
        Self {
            infos,
            ..Default::default()
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Player text of the topic, empty when there is none.
    pub fn player_text(&self) -> &str {
        self.prompt.as_deref().unwrap_or_default()
    }
}

/// A response body spoken by several infos.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedInfo {
    pub speaker: Speaker,
    pub responses: Vec<DialogueResponse>,
    /// Set once the body has been written to a repository.
    #[serde(default)]
    pub emitted: Option<super::ids::RecordId>,
}

/// Arena of topics and shared infos.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogueGraph {
    #[serde(default)]
    pub topics: Vec<DialogueTopic>,
    #[serde(default)]
    pub shared_infos: Vec<SharedInfo>,
}

impl DialogueGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_topic(&mut self, topic: DialogueTopic) -> TopicId {
        self.topics.push(topic);
        TopicId(self.topics.len() - 1)
    }

    pub fn add_shared_info(&mut self, shared: SharedInfo) -> SharedInfoId {
        self.shared_infos.push(shared);
        SharedInfoId(self.shared_infos.len() - 1)
    }

    pub fn topic(&self, id: TopicId) -> Result<&DialogueTopic, GraphError> {
        self.topics.get(id.0).ok_or(GraphError::UnknownTopic(id))
    }

    pub fn topic_mut(&mut self, id: TopicId) -> Result<&mut DialogueTopic, GraphError> {
        self.topics.get_mut(id.0).ok_or(GraphError::UnknownTopic(id))
    }

    pub fn info(&self, topic: TopicId, index: usize) -> Result<&TopicInfo, GraphError> {
        self.topic(topic)?
            .infos
            .get(index)
            .ok_or(GraphError::UnknownInfo { topic, index })
    }

    pub fn info_mut(&mut self, topic: TopicId, index: usize) -> Result<&mut TopicInfo, GraphError> {
        self.topic_mut(topic)?
            .infos
            .get_mut(index)
            .ok_or(GraphError::UnknownInfo { topic, index })
    }

    pub fn shared_info(&self, id: SharedInfoId) -> Result<&SharedInfo, GraphError> {
        self.shared_infos
            .get(id.0)
            .ok_or(GraphError::UnknownSharedInfo(id))
    }

    pub fn shared_info_mut(&mut self, id: SharedInfoId) -> Result<&mut SharedInfo, GraphError> {
        self.shared_infos
            .get_mut(id.0)
            .ok_or(GraphError::UnknownSharedInfo(id))
    }

    /// Link `next` to be played after an info, joined by an invisible continue.
    ///
    /// The goodbye flag moves to the infos of `next`, so the conversation ends
    /// after the last line of the chain rather than in the middle of it. The
    /// info's existing links move onto every info of `next` and its own links
    /// become exactly `[next]`. Appending the same topic twice is a no-op.
    pub fn append(&mut self, topic: TopicId, index: usize, next: TopicId) -> Result<(), GraphError> {
        self.topic(next)?;
        let current = self.info(topic, index)?;
        if current.invisible_continue && current.links == [next] {
            return Ok(());
        }
        if next == topic || self.continues_into(next, topic) {
            return Err(GraphError::ContinuationCycle { topic, next });
        }

        let current = self.info_mut(topic, index)?;
        current.invisible_continue = true;
        let goodbye = std::mem::take(&mut current.goodbye);
        let carried = std::mem::replace(&mut current.links, vec![next]);

        for info in &mut self.topics[next.0].infos {
            if goodbye {
                info.goodbye = true;
            }
            for link in carried.iter().filter(|link| **link != next) {
                if !info.links.contains(link) {
                    info.links.push(*link);
                }
            }
        }

        Ok(())
    }

    /// Whether following invisible continues from `start` reaches `target`.
    pub fn continues_into(&self, start: TopicId, target: TopicId) -> bool {
        let mut visited = FxHashSet::default();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if !visited.insert(id) {
                continue;
            }
            let Some(topic) = self.topics.get(id.0) else {
                continue;
            };
            for info in topic.infos.iter().filter(|info| info.invisible_continue) {
                stack.extend(info.links.iter().copied());
            }
        }
        false
    }

    /// Every topic reachable from `roots` through links, each once, in
    /// depth-first pre-order starting with the roots.
    pub fn enumerate_links(&self, roots: &[TopicId]) -> Vec<TopicId> {
        let mut visited = FxHashSet::default();
        let mut order = Vec::new();
        let mut stack: Vec<TopicId> = roots.iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(topic) = self.topics.get(id.0) else {
                continue;
            };
            order.push(id);
            for info in topic.infos.iter().rev() {
                for link in info.links.iter().rev() {
                    if !visited.contains(link) {
                        stack.push(*link);
                    }
                }
            }
        }

        order
    }

    /// Links that point outside the arena, as `(topic, info index, link)`.
    pub fn dangling_links(&self) -> Vec<(TopicId, usize, TopicId)> {
        let mut dangling = Vec::new();
        for (t, topic) in self.topics.iter().enumerate() {
            for (i, info) in topic.infos.iter().enumerate() {
                for link in &info.links {
                    if link.0 >= self.topics.len() {
                        dangling.push((TopicId(t), i, *link));
                    }
                }
            }
        }
        dangling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> DialogueResponse {
        DialogueResponse::new(text)
    }

    fn single(text: &str) -> DialogueTopic {
        DialogueTopic::new(vec![TopicInfo::default().with_response(line(text))])
    }

    #[test]
    fn append_sets_invisible_continue_and_links() {
        let mut graph = DialogueGraph::new();
        let a = graph.add_topic(single("A"));
        let b = graph.add_topic(single("B"));

        graph.append(a, 0, b).unwrap();

        let info = graph.info(a, 0).unwrap();
        assert!(info.invisible_continue);
        assert_eq!(info.links, vec![b]);
    }

    #[test]
    fn append_moves_goodbye_to_next_topic() {
        let mut graph = DialogueGraph::new();
        let a = graph.add_topic(single("A"));
        let mut two = single("B1");
        two.infos.push(TopicInfo::default().with_response(line("B2")));
        let b = graph.add_topic(two);
        graph.info_mut(a, 0).unwrap().goodbye = true;

        graph.append(a, 0, b).unwrap();

        assert!(!graph.info(a, 0).unwrap().goodbye);
        assert!(graph.topic(b).unwrap().infos.iter().all(|info| info.goodbye));
    }

    #[test]
    fn append_transfers_existing_links() {
        let mut graph = DialogueGraph::new();
        let a = graph.add_topic(single("A"));
        let b = graph.add_topic(single("B"));
        let x = graph.add_topic(single("X"));
        let y = graph.add_topic(single("Y"));
        graph.info_mut(a, 0).unwrap().links = vec![x, y];

        graph.append(a, 0, b).unwrap();

        assert_eq!(graph.info(a, 0).unwrap().links, vec![b]);
        assert_eq!(graph.info(b, 0).unwrap().links, vec![x, y]);
    }

    #[test]
    fn append_twice_in_sequence() {
        let mut graph = DialogueGraph::new();
        let a = graph.add_topic(single("A"));
        let b = graph.add_topic(single("B"));
        let c = graph.add_topic(single("C"));

        graph.append(a, 0, b).unwrap();
        graph.append(b, 0, c).unwrap();

        assert_eq!(graph.info(a, 0).unwrap().links, vec![b]);
        assert_eq!(graph.info(b, 0).unwrap().links, vec![c]);
        assert!(graph.info(c, 0).unwrap().links.is_empty());
    }

    #[test]
    fn append_is_idempotent() {
        let mut graph = DialogueGraph::new();
        let a = graph.add_topic(single("A"));
        let b = graph.add_topic(single("B"));
        let x = graph.add_topic(single("X"));
        graph.info_mut(a, 0).unwrap().links = vec![x];

        graph.append(a, 0, b).unwrap();
        let snapshot = graph.clone();
        graph.append(a, 0, b).unwrap();

        assert_eq!(graph, snapshot);
    }

    #[test]
    fn append_refuses_continuation_cycles() {
        let mut graph = DialogueGraph::new();
        let a = graph.add_topic(single("A"));
        let b = graph.add_topic(single("B"));

        assert_eq!(
            graph.append(a, 0, a),
            Err(GraphError::ContinuationCycle { topic: a, next: a })
        );

        graph.append(a, 0, b).unwrap();
        assert_eq!(
            graph.append(b, 0, a),
            Err(GraphError::ContinuationCycle { topic: b, next: a })
        );
    }

    #[test]
    fn append_unknown_topic() {
        let mut graph = DialogueGraph::new();
        let a = graph.add_topic(single("A"));
        assert_eq!(
            graph.append(a, 0, TopicId(9)),
            Err(GraphError::UnknownTopic(TopicId(9)))
        );
        assert_eq!(
            graph.append(a, 3, a),
            Err(GraphError::UnknownInfo { topic: a, index: 3 })
        );
    }

    #[test]
    fn enumerate_links_visits_each_topic_once() {
        let mut graph = DialogueGraph::new();
        let hub = graph.add_topic(single("Hub"));
        let left = graph.add_topic(single("Left"));
        let right = graph.add_topic(single("Right"));
        graph.info_mut(hub, 0).unwrap().links = vec![left, right];
        graph.info_mut(left, 0).unwrap().links = vec![hub];
        graph.info_mut(right, 0).unwrap().links = vec![hub, left];

        assert_eq!(graph.enumerate_links(&[hub]), vec![hub, left, right]);
    }

    #[test]
    fn dangling_links_reported() {
        let mut graph = DialogueGraph::new();
        let a = graph.add_topic(single("A"));
        graph.info_mut(a, 0).unwrap().links = vec![TopicId(5)];
        assert_eq!(graph.dangling_links(), vec![(a, 0, TopicId(5))]);
    }
}
