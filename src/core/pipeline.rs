//! The compilation pipeline: Conversation → records.
//!
//! Wires together scene speaker resolution, the category compilers and
//! per-dialogue failure isolation.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::config::{CompilerConfig, ConfigError};
use crate::core::context::{DialogueContext, IssueList, ScriptRegistry};
use crate::core::factory::{CompileError, CompiledDialogue, DialogueFactory};
use crate::core::repository::{RecordRepository, SpeakerResolver};
use crate::core::scene::{self, SpeakerResolution};
use crate::schema::conversation::{Conversation, DialogueSelection, DialogueType, GeneratedDialogue};
use crate::schema::graph::DialogueGraph;
use crate::schema::ids::{RecordId, TopicId};
use crate::schema::record::Record;
use crate::schema::speaker::Speaker;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("quest not found: {0}")]
    QuestNotFound(RecordId),
}

/// A scene left uncompiled because some speakers are still unresolved.
/// Compile it again once the resolver can answer for them.
#[derive(Debug, Clone)]
pub struct PendingDialogue {
    /// Position in the conversation.
    pub index: usize,
    pub unresolved: Vec<String>,
    pub dialogue: GeneratedDialogue,
}

#[derive(Debug)]
pub struct FailedDialogue {
    pub index: usize,
    pub dialogue_type: DialogueType,
    pub error: CompileError,
}

/// Everything one `compile` call produced besides the records themselves.
#[derive(Debug, Default)]
pub struct CompileReport {
    pub scripts: ScriptRegistry,
    pub issues: IssueList,
    pub compiled: Vec<CompiledDialogue>,
    pub pending: Vec<PendingDialogue>,
    pub failed: Vec<FailedDialogue>,
}

impl CompileReport {
    /// Nothing failed and nothing is waiting on speaker input.
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty() && self.failed.is_empty()
    }
}

/// Supplies the topic graph of one block of a source document.
pub trait DocumentParser {
    /// The graph for `dialogue_type` in the block at `index`, and its entry
    /// topics.
    fn parse(&mut self, dialogue_type: DialogueType, index: usize) -> (DialogueGraph, Vec<TopicId>);
}

/// Parse every selected block into a conversation. Infos the document left
/// without a speaker get the selection's speaker.
pub fn prepare_conversation(parser: &mut dyn DocumentParser, selections: &[DialogueSelection]) -> Conversation {
    let mut conversation = Conversation::new();
    for (index, selection) in selections.iter().enumerate() {
        for &dialogue_type in &selection.types {
            let (mut graph, roots) = parser.parse(dialogue_type, index);
            for info in graph.topics.iter_mut().flat_map(|topic| topic.infos.iter_mut()) {
                if is_unattributed(&info.speaker) {
                    info.speaker = selection.speaker.clone();
                }
            }
            for shared in &mut graph.shared_infos {
                if is_unattributed(&shared.speaker) {
                    shared.speaker = selection.speaker.clone();
                }
            }
            conversation.push(GeneratedDialogue::new(dialogue_type, graph, selection.speaker.clone()).with_roots(roots));
        }
    }
    conversation
}

fn is_unattributed(speaker: &Speaker) -> bool {
    matches!(speaker, Speaker::Unresolved { name } if name.is_empty())
}

/// The top-level compiler. Built via `DialogueCompiler::builder()`.
#[derive(Debug, Clone)]
pub struct DialogueCompiler {
    config: CompilerConfig,
}

/// Builder for constructing a `DialogueCompiler`.
#[derive(Debug, Default)]
pub struct DialogueCompilerBuilder {
    config_file: Option<PathBuf>,
    /// Directly provided config (for testing without files).
    config: Option<CompilerConfig>,
    prefix: Option<String>,
    max_resolution_rounds: Option<u32>,
}

impl DialogueCompiler {
    pub fn builder() -> DialogueCompilerBuilder {
        DialogueCompilerBuilder::default()
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile a conversation into `quest`.
    ///
    /// A dialogue that fails is recorded in the report and the rest still
    /// compile. Speakers are checked before a non-scene dialogue writes
    /// anything, so a dialogue failing on them leaves no records behind.
    #[tracing::instrument(skip_all, fields(quest = %quest, dialogues = conversation.len()))]
    pub fn compile(
        &self,
        repository: &mut dyn RecordRepository,
        resolver: &mut dyn SpeakerResolver,
        conversation: Conversation,
        quest: RecordId,
    ) -> Result<CompileReport, PipelineError> {
        if repository.resolve(quest).and_then(Record::as_quest).is_none() {
            return Err(PipelineError::QuestNotFound(quest));
        }

        let mut report = CompileReport::default();
        for (index, generated) in conversation.dialogue.into_iter().enumerate() {
            let dialogue_type = generated.dialogue_type;
            let mut factory = DialogueFactory::new(dialogue_type);

            if dialogue_type.is_scene() {
                let turns = scene::parse_lines(&scene::collect_lines(&generated.graph, &generated.roots));
                let labels = scene::speaker_labels(&turns);
                match scene::resolve_speakers(&labels, resolver, self.config.max_resolution_rounds) {
                    SpeakerResolution::Resolved(roster) => factory = factory.with_roster(roster),
                    SpeakerResolution::NeedsInput(unresolved) => {
                        tracing::warn!(index, ?unresolved, "scene speakers unresolved; leaving scene pending");
                        report.pending.push(PendingDialogue {
                            index,
                            unresolved,
                            dialogue: generated,
                        });
                        continue;
                    }
                }
            }

            let mut ctx = DialogueContext::new(
                &mut *repository,
                quest,
                &self.config,
                &mut report.scripts,
                &mut report.issues,
            );
            match factory.create(generated, &mut ctx) {
                Ok(compiled) => {
                    tracing::debug!(index, kind = ?dialogue_type, topics = compiled.topics.len(), "compiled dialogue");
                    report.compiled.push(compiled);
                }
                Err(error) => {
                    tracing::warn!(index, kind = ?dialogue_type, %error, "dialogue failed to compile");
                    report.failed.push(FailedDialogue {
                        index,
                        dialogue_type,
                        error,
                    });
                }
            }
        }

        tracing::info!(
            compiled = report.compiled.len(),
            pending = report.pending.len(),
            failed = report.failed.len(),
            issues = report.issues.len(),
            scripts = report.scripts.len(),
            "conversation compiled"
        );
        Ok(report)
    }

    /// Compile several conversations one after another against the same
    /// repository. One conversation failing does not stop the others.
    pub fn compile_batch(
        &self,
        repository: &mut dyn RecordRepository,
        resolver: &mut dyn SpeakerResolver,
        batch: Vec<(Conversation, RecordId)>,
    ) -> Vec<Result<CompileReport, PipelineError>> {
        batch
            .into_iter()
            .map(|(conversation, quest)| self.compile(&mut *repository, &mut *resolver, conversation, quest))
            .collect()
    }
}

impl DialogueCompilerBuilder {
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Provide the config directly (for testing without files).
    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }

    pub fn max_resolution_rounds(mut self, rounds: u32) -> Self {
        self.max_resolution_rounds = Some(rounds);
        self
    }

    pub fn build(self) -> Result<DialogueCompiler, PipelineError> {
        let mut config = match (self.config, self.config_file) {
            (Some(config), _) => config,
            (None, Some(path)) => CompilerConfig::load_from_ron(&path)?,
            (None, None) => CompilerConfig::default(),
        };

        // Explicit builder settings override the file
        if let Some(prefix) = self.prefix {
            config.prefix = prefix;
        }
        if let Some(rounds) = self.max_resolution_rounds {
            config.max_resolution_rounds = rounds;
        }
        config.validate()?;

        Ok(DialogueCompiler { config })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::repository::{InMemoryRepository, StaticSpeakerResolver};
    use crate::schema::graph::{DialogueTopic, TopicInfo};
    use crate::schema::record::Quest;
    use crate::schema::response::DialogueResponse;

    struct FixedParser;

    impl DocumentParser for FixedParser {
        fn parse(&mut self, _dialogue_type: DialogueType, index: usize) -> (DialogueGraph, Vec<TopicId>) {
            let mut graph = DialogueGraph::new();
            let info = TopicInfo::default().with_response(DialogueResponse::new(format!("Block {index}")));
            let root = graph.add_topic(DialogueTopic::new(vec![info]));
            (graph, vec![root])
        }
    }

    #[test]
    fn builder_overrides_config() {
        let compiler = DialogueCompiler::builder()
            .with_config(CompilerConfig::default())
            .prefix("MQ")
            .max_resolution_rounds(2)
            .build()
            .unwrap();
        assert_eq!(compiler.config().prefix, "MQ");
        assert_eq!(compiler.config().max_resolution_rounds, 2);
    }

    #[test]
    fn builder_rejects_invalid_settings() {
        let result = DialogueCompiler::builder().max_resolution_rounds(0).build();
        assert!(matches!(
            result,
            Err(PipelineError::Config(ConfigError::NoResolutionRounds))
        ));
    }

    #[test]
    fn missing_config_file_is_io_error() {
        let result = DialogueCompiler::builder()
            .config_file("does/not/exist.ron")
            .build();
        assert!(matches!(
            result,
            Err(PipelineError::Config(ConfigError::Io(_)))
        ));
    }

    #[test]
    fn prepare_assigns_selection_speaker() {
        let anna = Speaker::Npc {
            name: "Anna".to_string(),
            id: RecordId(0x10),
        };
        let selections = vec![
            DialogueSelection {
                types: vec![DialogueType::Greeting, DialogueType::Farewell],
                speaker: anna.clone(),
            },
            DialogueSelection {
                types: vec![DialogueType::Dialogue],
                speaker: anna.clone(),
            },
        ];

        let conversation = prepare_conversation(&mut FixedParser, &selections);

        assert_eq!(conversation.len(), 3);
        assert_eq!(conversation.dialogue[1].dialogue_type, DialogueType::Farewell);
        let info = &conversation.dialogue[2].graph.topics[0].infos[0];
        assert_eq!(info.speaker, anna);
        assert_eq!(info.responses[0].text, "Block 1");
    }

    #[test]
    fn unknown_quest_is_rejected() {
        let compiler = DialogueCompiler::builder().build().unwrap();
        let mut repo = InMemoryRepository::new("Test.esp");
        let mut resolver = StaticSpeakerResolver::new();
        let result = compiler.compile(&mut repo, &mut resolver, Conversation::new(), RecordId(0x999));
        assert!(matches!(result, Err(PipelineError::QuestNotFound(_))));
    }

    #[test]
    fn empty_conversation_compiles_cleanly() {
        let compiler = DialogueCompiler::builder().build().unwrap();
        let mut repo = InMemoryRepository::new("Test.esp");
        repo.add(Record::Quest(Quest::new(RecordId(0x900), "MQ101")));
        let mut resolver = StaticSpeakerResolver::new();
        let report = compiler
            .compile(&mut repo, &mut resolver, Conversation::new(), RecordId(0x900))
            .unwrap();
        assert!(report.is_complete());
        assert!(report.compiled.is_empty());
    }
}
