use serde::{Deserialize, Serialize};

use super::graph::DialogueGraph;
use super::ids::TopicId;
use super::speaker::Speaker;

/// The closed set of conversation categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialogueType {
    Dialogue,
    Greeting,
    Farewell,
    Idle,
    GenericScene,
    QuestScene,
}

impl DialogueType {
    pub fn is_scene(&self) -> bool {
        matches!(self, Self::GenericScene | Self::QuestScene)
    }
}

/// What the author picked for one block of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueSelection {
    pub types: Vec<DialogueType>,
    /// Speaker of every info the document leaves unattributed.
    pub speaker: Speaker,
}

/// One category's worth of parsed topics, ready to compile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedDialogue {
    pub dialogue_type: DialogueType,
    pub graph: DialogueGraph,
    /// Entry topics; everything else is reached through links.
    pub roots: Vec<TopicId>,
    pub speaker: Speaker,
}

impl GeneratedDialogue {
    /// Roots are every topic of the graph.
    pub fn new(dialogue_type: DialogueType, graph: DialogueGraph, speaker: Speaker) -> Self {
        let roots = (0..graph.topics.len()).map(TopicId).collect();
        Self {
            dialogue_type,
            graph,
            roots,
            speaker,
        }
    }

    pub fn with_roots(mut self, roots: Vec<TopicId>) -> Self {
        self.roots = roots;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty() || self.graph.topics.is_empty()
    }
}

/// Ordered results of every selection in a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub dialogue: Vec<GeneratedDialogue>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, dialogue: GeneratedDialogue) {
        self.dialogue.push(dialogue);
    }

    pub fn len(&self) -> usize {
        self.dialogue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dialogue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::graph::DialogueTopic;

    #[test]
    fn generated_dialogue_roots_default_to_all_topics() {
        let mut graph = DialogueGraph::new();
        graph.add_topic(DialogueTopic::default());
        graph.add_topic(DialogueTopic::default());
        let generated = GeneratedDialogue::new(DialogueType::Dialogue, graph, Speaker::default());
        assert_eq!(generated.roots, vec![TopicId(0), TopicId(1)]);
        assert!(!generated.is_empty());
    }

    #[test]
    fn scene_categories() {
        assert!(DialogueType::QuestScene.is_scene());
        assert!(DialogueType::GenericScene.is_scene());
        assert!(!DialogueType::Greeting.is_scene());
    }
}
