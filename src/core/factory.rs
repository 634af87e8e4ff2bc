//! Record compiler.
//!
//! [`DialogueFactory`] picks the category-specific behavior for one
//! [`GeneratedDialogue`] and runs it in three steps: `pre_process` reshapes
//! the graph, `generate_dialogue` writes topics and response sets, and
//! `post_process` adds the records that hang off them (branches, scene
//! quests).

use rustc_hash::FxHashMap;
use serde::Serialize;
use thiserror::Error;

use crate::core::condition::{any_of_actors, conditions_for, identity_condition};
use crate::core::context::{DialogueContext, Issue, IssueKind};
use crate::core::fragment::build_fragment;
use crate::core::repository::{find_matching_topic, info_matches};
use crate::core::scene::{self, Roster, SequencedTurn};
use crate::core::text::{annotation_markers, display_text};
use crate::schema::condition::{Condition, ConditionData};
use crate::schema::conversation::{DialogueType, GeneratedDialogue};
use crate::schema::graph::{DialogueGraph, DialogueTopic, GraphError, TopicInfo};
use crate::schema::ids::{RecordId, SharedInfoId, TopicId};
use crate::schema::record::{
    BranchFlags, DialogBranch, DialogTopic, Quest, QuestAlias, Record, RecordKind, ResponseFlags, ResponseLine,
    ResponseSet, Scene, SceneFlags, TopicCategory, TopicSubtype,
};
use crate::schema::response::DialogueResponse;
use crate::schema::speaker::{AliasSpeaker, Speaker};

/// Story-manager event that fills generic scene aliases.
pub const SCENE_EVENT: &str = "ADIA";

pub const GENERIC_QUEST_PRIORITY: u8 = 30;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("speaker {name:?} is not resolved")]
    UnresolvedSpeaker { name: String },
    #[error("speaker {name:?} references {id} as {expected:?}, but it is a {found:?}")]
    SpeakerKindMismatch {
        name: String,
        id: RecordId,
        expected: RecordKind,
        found: RecordKind,
    },
    #[error("scene speaker {0:?} has no roster entry")]
    UnknownSceneSpeaker(String),
    #[error("topic {0} is missing from the repository")]
    MissingTopic(RecordId),
    #[error("quest {0} is missing from the repository")]
    MissingQuest(RecordId),
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),
}

/// What one [`DialogueFactory::create`] call wrote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledDialogue {
    pub dialogue_type: DialogueType,
    /// Quest the topics were compiled into.
    pub quest: RecordId,
    /// Topics written or extended by this run.
    pub topics: Vec<RecordId>,
    /// Existing topics with identical content that were linked to instead.
    pub reused_topics: Vec<RecordId>,
    /// Record ids of the root topics, in root order.
    pub roots: Vec<RecordId>,
    pub branches: Vec<RecordId>,
    pub scene: Option<RecordId>,
    pub scene_quest: Option<RecordId>,
}

impl CompiledDialogue {
    fn new(dialogue_type: DialogueType, quest: RecordId) -> Self {
        Self {
            dialogue_type,
            quest,
            topics: Vec::new(),
            reused_topics: Vec::new(),
            roots: Vec::new(),
            branches: Vec::new(),
            scene: None,
            scene_quest: None,
        }
    }
}

/// State of a scene compilation.
#[derive(Debug, Clone, Default)]
pub struct SceneFactory {
    roster: Roster,
    /// Quest owning a generic scene, added in post-processing.
    quest: Option<Quest>,
}

/// Category-specific compiler for one generated dialogue.
#[derive(Debug, Clone)]
pub enum DialogueFactory {
    Dialogue,
    Greeting,
    Farewell,
    Idle,
    GenericScene(SceneFactory),
    QuestScene(SceneFactory),
}

impl DialogueFactory {
    /// Scene factories start with an empty roster; see [`Self::with_roster`].
    pub fn new(dialogue_type: DialogueType) -> Self {
        match dialogue_type {
            DialogueType::Dialogue => Self::Dialogue,
            DialogueType::Greeting => Self::Greeting,
            DialogueType::Farewell => Self::Farewell,
            DialogueType::Idle => Self::Idle,
            DialogueType::GenericScene => Self::GenericScene(SceneFactory::default()),
            DialogueType::QuestScene => Self::QuestScene(SceneFactory::default()),
        }
    }

    /// Set the resolved scene speakers. Generic scenes own their quest, so
    /// their aliases are renumbered by roster position. No effect on
    /// non-scene factories.
    pub fn with_roster(mut self, roster: Roster) -> Self {
        match &mut self {
            Self::GenericScene(factory) => factory.roster = roster.with_positional_aliases(),
            Self::QuestScene(factory) => factory.roster = roster,
            _ => {}
        }
        self
    }

    pub fn dialogue_type(&self) -> DialogueType {
        match self {
            Self::Dialogue => DialogueType::Dialogue,
            Self::Greeting => DialogueType::Greeting,
            Self::Farewell => DialogueType::Farewell,
            Self::Idle => DialogueType::Idle,
            Self::GenericScene(_) => DialogueType::GenericScene,
            Self::QuestScene(_) => DialogueType::QuestScene,
        }
    }

    /// Run all three steps. Empty dialogue writes nothing.
    #[tracing::instrument(skip_all, fields(kind = ?self.dialogue_type()))]
    pub fn create(
        &mut self,
        mut generated: GeneratedDialogue,
        ctx: &mut DialogueContext<'_>,
    ) -> Result<CompiledDialogue, CompileError> {
        let mut output = CompiledDialogue::new(self.dialogue_type(), ctx.quest);
        if generated.is_empty() {
            tracing::debug!("skipping empty dialogue");
            return Ok(output);
        }

        if !self.dialogue_type().is_scene() {
            check_speakers(&generated, ctx)?;
        }

        let outer_quest = ctx.quest;
        if let Some(quest) = self.generic_voice_quest(&generated.speaker, ctx) {
            ctx.quest = quest;
            output.quest = quest;
        }

        let result = self
            .pre_process(&mut generated, ctx)
            .and_then(|()| self.generate_dialogue(&mut generated, ctx, &mut output))
            .and_then(|()| self.post_process(ctx, &mut output));
        ctx.quest = outer_quest;

        result.map(|()| output)
    }

    pub fn pre_process(
        &mut self,
        generated: &mut GeneratedDialogue,
        ctx: &mut DialogueContext<'_>,
    ) -> Result<(), CompileError> {
        match self {
            Self::Dialogue => assign_editor_ids(generated, ctx, false),
            Self::Greeting | Self::Farewell | Self::Idle => {
                flatten_roots(generated)?;
                assign_editor_ids(generated, ctx, true);
            }
            Self::GenericScene(factory) => factory.split_turns(generated)?,
            Self::QuestScene(factory) => {
                factory.bind_quest_aliases(ctx)?;
                factory.split_turns(generated)?;
            }
        }
        Ok(())
    }

    pub fn generate_dialogue(
        &mut self,
        generated: &mut GeneratedDialogue,
        ctx: &mut DialogueContext<'_>,
        output: &mut CompiledDialogue,
    ) -> Result<(), CompileError> {
        match self {
            Self::Dialogue => {
                let ids = compile_linked_topics(generated, &[], ctx, output)?;
                output.roots = generated.roots.iter().filter_map(|root| ids.get(root).copied()).collect();
                Ok(())
            }
            Self::Greeting => generate_misc(generated, TopicSubtype::Hello, "Hello", ctx, output),
            Self::Farewell => generate_misc(generated, TopicSubtype::Goodbye, "Goodbye", ctx, output),
            Self::Idle => generate_misc(generated, TopicSubtype::Idle, "Idle", ctx, output),
            Self::GenericScene(factory) => factory.generate(true, generated, ctx, output),
            Self::QuestScene(factory) => factory.generate(false, generated, ctx, output),
        }
    }

    pub fn post_process(
        &mut self,
        ctx: &mut DialogueContext<'_>,
        output: &mut CompiledDialogue,
    ) -> Result<(), CompileError> {
        match self {
            Self::Dialogue => {
                for &root in &output.roots {
                    let Some(editor_id) = ctx.repository.resolve(root).and_then(Record::editor_id) else {
                        tracing::debug!(%root, "root topic has no editor id; no branch added");
                        continue;
                    };
                    let branch_editor_id = format!("{editor_id}Branch");
                    let quest = ctx.quest;
                    let branch = ctx.get_or_add(&branch_editor_id, |id| {
                        Record::Branch(DialogBranch {
                            id,
                            editor_id: branch_editor_id.clone(),
                            quest,
                            flags: BranchFlags {
                                top_level: true,
                                ..Default::default()
                            },
                            starting_topic: root,
                        })
                    });
                    output.branches.push(branch);
                }
            }
            Self::GenericScene(factory) => {
                if let Some(quest) = factory.quest.take() {
                    output.scene_quest = Some(quest.id);
                    ctx.repository.add(Record::Quest(quest));
                }
            }
            Self::Greeting | Self::Farewell | Self::Idle | Self::QuestScene(_) => {}
        }
        Ok(())
    }

    /// The per-voice-type quest non-scene dialogue of a voice type speaker
    /// is routed into, when enabled.
    fn generic_voice_quest(&self, speaker: &Speaker, ctx: &mut DialogueContext<'_>) -> Option<RecordId> {
        if !ctx.config.generic_voice_quests || self.dialogue_type().is_scene() {
            return None;
        }
        let Speaker::VoiceType { name, id } = speaker else {
            return None;
        };

        let editor_id = ctx.prefixed(&format!("GenericDialogue{}", name_without(ctx.prefix(), speaker)));
        let keyword = ctx.config.commanded_voice_excluded_keyword;

        let mut conditions =
            vec![Condition::equal_to(ConditionData::IsCommandedActor, 0.0).or(keyword.is_some())];
        if let Some(keyword) = keyword {
            conditions.push(Condition::equal_to(ConditionData::HasKeyword { keyword }, 1.0));
        }
        conditions.push(Condition::equal_to(
            ConditionData::GetIsVoiceType {
                voice_type_or_list: *id,
            },
            1.0,
        ));

        let name = format!("Generic Dialogue for {name}");
        Some(ctx.get_or_add(&editor_id, |quest_id| {
            Record::Quest(Quest {
                name,
                priority: GENERIC_QUEST_PRIORITY,
                start_game_enabled: true,
                dialog_conditions: conditions,
                ..Quest::new(quest_id, editor_id.clone())
            })
        }))
    }
}

impl SceneFactory {
    /// Give every roster member an alias slot of the context quest.
    ///
    /// Members whose resolved index is not a slot of the quest are bound to
    /// the quest's alias for their actor, which is added when missing.
    fn bind_quest_aliases(&mut self, ctx: &mut DialogueContext<'_>) -> Result<(), CompileError> {
        let quest = ctx.quest;
        let slots = ctx
            .repository
            .resolve(quest)
            .and_then(Record::as_quest)
            .map(|quest| quest.aliases.len())
            .ok_or(CompileError::MissingQuest(quest))?;
        let unbound: Vec<AliasSpeaker> = self
            .roster
            .members()
            .iter()
            .filter(|member| !usize::try_from(member.alias_index).is_ok_and(|slot| slot < slots))
            .cloned()
            .collect();
        if unbound.is_empty() {
            return Ok(());
        }

        let bound = ctx
            .with_override(quest, |record| match record {
                Record::Quest(quest) => Some(
                    unbound
                        .iter()
                        .map(|member| (member.id, actor_alias(quest, member)))
                        .collect::<Vec<_>>(),
                ),
                _ => None,
            })
            .flatten()
            .ok_or(CompileError::MissingQuest(quest))?;
        for (id, alias_index) in bound {
            tracing::debug!(?id, alias_index, "bound scene speaker to quest alias");
            self.roster.rebind(id, alias_index);
        }
        Ok(())
    }

    /// Replace the graph with one topic per merged speaker turn.
    fn split_turns(&self, generated: &mut GeneratedDialogue) -> Result<(), CompileError> {
        let lines = scene::collect_lines(&generated.graph, &generated.roots);
        let turns = self
            .roster
            .merge_turns(scene::parse_lines(&lines))
            .map_err(CompileError::UnknownSceneSpeaker)?;

        let mut graph = DialogueGraph::new();
        for (speaker, responses) in turns {
            let speaker = Speaker::from(speaker);
            let info = TopicInfo {
                responses,
                ..TopicInfo::new(speaker.clone())
            };
            graph.add_topic(DialogueTopic {
                speaker: Some(speaker),
                ..DialogueTopic::new(vec![info])
            });
        }

        generated.roots = (0..graph.topics.len()).map(TopicId).collect();
        generated.graph = graph;
        Ok(())
    }

    fn generate(
        &mut self,
        generic: bool,
        generated: &mut GeneratedDialogue,
        ctx: &mut DialogueContext<'_>,
        output: &mut CompiledDialogue,
    ) -> Result<(), CompileError> {
        let base = if generic {
            let names: String = self.roster.members().iter().map(|m| Speaker::from(m.clone()).name_no_spaces()).collect();
            ctx.prefixed(&format!("{names}Scene"))
        } else {
            ctx.prefixed(&format!("{}Scene", ctx.quest_editor_id()))
        };
        let editor_id = ctx.free_editor_id(&base);

        let quest = if generic {
            let quest = self.scene_quest(format!("{editor_id}Quest"), ctx);
            let id = quest.id;
            self.quest = Some(quest);
            id
        } else {
            ctx.quest
        };

        let priority = ctx.config.topic_priority;
        let no_links = FxHashMap::default();
        let mut turns = Vec::with_capacity(generated.roots.len());
        for &root in &generated.roots {
            let topic = generated.graph.topic(root)?.clone();
            let alias = match &topic.speaker {
                Some(Speaker::Alias { alias_index, .. }) => *alias_index,
                other => {
                    let name = other.as_ref().map(|s| s.name().to_string()).unwrap_or_default();
                    return Err(CompileError::UnknownSceneSpeaker(name));
                }
            };

            let topic_id = ctx.next_id();
            let responses = compile_sets(&mut generated.graph, &topic.infos, None, &no_links, ctx)?;
            ctx.repository.add(Record::Topic(DialogTopic {
                id: topic_id,
                editor_id: None,
                name: None,
                quest,
                category: TopicCategory::Scene,
                subtype: TopicSubtype::Scene,
                priority,
                responses,
            }));
            output.topics.push(topic_id);
            turns.push(SequencedTurn { alias, topic: topic_id });
        }

        let aliases = self.roster.alias_indices();
        let mut record = Scene {
            id: ctx.next_id(),
            editor_id,
            quest,
            flags: SceneFlags {
                begin_on_quest_start: true,
                stop_on_quest_end: true,
                interruptable: true,
            },
            phases: Vec::new(),
            actions: Vec::new(),
            actors: scene::scene_actors(&aliases),
            last_action_index: 0,
        };
        scene::sequence(&mut record, &turns, &aliases);
        tracing::debug!(scene = %record.editor_id, phases = record.phases.len(), actions = record.actions.len(), "sequenced scene");

        output.scene = Some(record.id);
        output.roots = output.topics.first().copied().into_iter().collect();
        ctx.repository.add(Record::Scene(record));
        Ok(())
    }

    /// A quest that starts on the dialogue event and fills one alias per
    /// roster member with any of the roster's actors.
    fn scene_quest(&self, editor_id: String, ctx: &mut DialogueContext<'_>) -> Quest {
        let actors = self.roster.actor_ids();
        let aliases = self
            .roster
            .members()
            .iter()
            .map(|member| QuestAlias {
                name: member.name.clone(),
                unique_actor: None,
                from_event: Some(SCENE_EVENT.to_string()),
                conditions: any_of_actors(&actors),
                allow_reserved: true,
                allow_reuse: false,
            })
            .collect();

        Quest {
            event: Some(SCENE_EVENT.to_string()),
            aliases,
            ..Quest::new(ctx.next_id(), editor_id)
        }
    }
}

/// Slot of the quest alias filled by `member`'s actor, added as a reserved,
/// reusable unique-actor alias if the quest has none.
fn actor_alias(quest: &mut Quest, member: &AliasSpeaker) -> i32 {
    let existing = quest
        .aliases
        .iter()
        .position(|alias| alias.unique_actor.is_some() && alias.unique_actor == member.id);
    let slot = existing.unwrap_or_else(|| {
        quest.aliases.push(QuestAlias {
            name: member.name.clone(),
            unique_actor: member.id,
            from_event: None,
            conditions: Vec::new(),
            allow_reserved: true,
            allow_reuse: true,
        });
        quest.aliases.len() - 1
    });
    i32::try_from(slot).unwrap_or(i32::MAX)
}

fn name_without(prefix: &str, speaker: &Speaker) -> String {
    let name = speaker.name_no_spaces();
    name.strip_prefix(prefix).map(str::to_string).unwrap_or(name)
}

/// Give every reachable topic without one a `{prefix}{Speaker}TopicNN`
/// editor id that no layer uses yet.
fn assign_editor_ids(generated: &mut GeneratedDialogue, ctx: &DialogueContext<'_>, skip_roots: bool) {
    let base = ctx.prefixed(&format!("{}Topic", name_without(ctx.prefix(), &generated.speaker)));
    let mut taken: Vec<String> = Vec::new();

    for id in generated.graph.enumerate_links(&generated.roots) {
        if skip_roots && generated.roots.contains(&id) {
            continue;
        }
        let Some(topic) = generated.graph.topics.get_mut(id.0) else {
            continue;
        };
        if topic.editor_id.is_some() {
            continue;
        }
        let editor_id = (1..)
            .map(|n| format!("{base}{n:02}"))
            .find(|candidate| !taken.contains(candidate) && ctx.repository.resolve_by_editor_id(candidate).is_none())
            .unwrap_or_else(|| base.clone());
        taken.push(editor_id.clone());
        topic.editor_id = Some(editor_id);
    }
}

/// Fail before anything is written when a reachable info, or a shared body
/// it uses, has no identity condition.
fn check_speakers(generated: &GeneratedDialogue, ctx: &DialogueContext<'_>) -> Result<(), CompileError> {
    let graph = &generated.graph;
    for id in graph.enumerate_links(&generated.roots) {
        for info in &graph.topic(id)?.infos {
            conditions_for(info, &*ctx.repository)?;
            if let Some(shared) = info.shared_info {
                identity_condition(&graph.shared_info(shared)?.speaker, false)?;
            }
        }
    }
    Ok(())
}

/// Merge the infos of every root into one new root topic.
fn flatten_roots(generated: &mut GeneratedDialogue) -> Result<(), CompileError> {
    let mut infos = Vec::new();
    for &root in &generated.roots {
        infos.extend(generated.graph.topic(root)?.infos.iter().cloned());
    }
    let root = generated.graph.add_topic(DialogueTopic::new(infos));
    generated.roots = vec![root];
    Ok(())
}

/// Compile every topic reachable from the roots except `skip` as a custom
/// topic, reusing matching topics already in the repository. Returns the
/// record id of every reachable topic.
fn compile_linked_topics(
    generated: &mut GeneratedDialogue,
    skip: &[TopicId],
    ctx: &mut DialogueContext<'_>,
    output: &mut CompiledDialogue,
) -> Result<FxHashMap<TopicId, RecordId>, CompileError> {
    let mut ids = FxHashMap::default();
    let mut fresh = Vec::new();

    for topic in generated.graph.enumerate_links(&generated.roots) {
        if skip.contains(&topic) {
            continue;
        }
        match find_matching_topic(&*ctx.repository, ctx.quest, &generated.graph, topic) {
            Some(existing) => {
                tracing::debug!(%existing, "reusing matching topic");
                output.reused_topics.push(existing);
                ids.insert(topic, existing);
            }
            None => {
                let id = ctx.next_id();
                ids.insert(topic, id);
                fresh.push((topic, id));
            }
        }
    }

    let priority = ctx.config.topic_priority;
    for (topic, id) in fresh {
        let source = generated.graph.topic(topic)?.clone();
        let responses = compile_sets(&mut generated.graph, &source.infos, None, &ids, ctx)?;
        ctx.repository.add(Record::Topic(DialogTopic {
            id,
            editor_id: source.editor_id.clone(),
            name: display_text(source.player_text()),
            quest: ctx.quest,
            category: TopicCategory::Topic,
            subtype: TopicSubtype::Custom,
            priority,
            responses,
        }));
        output.topics.push(id);
    }

    Ok(ids)
}

/// Greetings, farewells and idles all go into one quest-wide topic. Infos
/// that topic already has are skipped.
fn generate_misc(
    generated: &mut GeneratedDialogue,
    subtype: TopicSubtype,
    suffix: &str,
    ctx: &mut DialogueContext<'_>,
    output: &mut CompiledDialogue,
) -> Result<(), CompileError> {
    let Some(&root) = generated.roots.first() else {
        return Ok(());
    };

    let editor_id = ctx.prefixed(&format!("{}{suffix}", ctx.quest_editor_id()));
    let quest = ctx.quest;
    let priority = ctx.config.topic_priority;
    let topic_id = ctx.get_or_add(&editor_id, |id| {
        Record::Topic(DialogTopic {
            id,
            editor_id: Some(editor_id.clone()),
            name: None,
            quest,
            category: TopicCategory::Misc,
            subtype,
            priority,
            responses: Vec::new(),
        })
    });

    let mut ids = compile_linked_topics(generated, &[root], ctx, output)?;
    ids.insert(root, topic_id);

    let existing = ctx
        .repository
        .resolve(topic_id)
        .and_then(Record::as_topic)
        .map(|topic| topic.responses.clone())
        .ok_or(CompileError::MissingTopic(topic_id))?;
    let infos: Vec<TopicInfo> = generated
        .graph
        .topic(root)?
        .infos
        .iter()
        .filter(|info| {
            !existing
                .iter()
                .any(|set| info_matches(info, set, false, &generated.graph, &*ctx.repository))
        })
        .cloned()
        .collect();
    tracing::debug!(topic = %editor_id, new = infos.len(), existing = existing.len(), "extending quest topic");

    let previous = existing.last().map(|set| set.id);
    let sets = compile_sets(&mut generated.graph, &infos, previous, &ids, ctx)?;
    append_sets(ctx, topic_id, sets)?;

    output.topics.push(topic_id);
    output.roots.push(topic_id);
    Ok(())
}

fn append_sets(ctx: &mut DialogueContext<'_>, topic: RecordId, sets: Vec<ResponseSet>) -> Result<(), CompileError> {
    if sets.is_empty() {
        return Ok(());
    }
    ctx.with_override(topic, |record| record.as_topic_mut().map(|t| t.responses.extend(sets)))
        .flatten()
        .ok_or(CompileError::MissingTopic(topic))
}

/// Compile infos into response sets chained by `previous`, starting after
/// `previous` if given.
fn compile_sets(
    graph: &mut DialogueGraph,
    infos: &[TopicInfo],
    mut previous: Option<RecordId>,
    ids: &FxHashMap<TopicId, RecordId>,
    ctx: &mut DialogueContext<'_>,
) -> Result<Vec<ResponseSet>, CompileError> {
    let mut sets = Vec::with_capacity(infos.len());
    for info in infos {
        let mut set = compile_info(graph, info, ids, ctx)?;
        set.previous = previous;
        previous = Some(set.id);
        sets.push(set);
    }
    Ok(sets)
}

fn compile_info(
    graph: &mut DialogueGraph,
    info: &TopicInfo,
    ids: &FxHashMap<TopicId, RecordId>,
    ctx: &mut DialogueContext<'_>,
) -> Result<ResponseSet, CompileError> {
    let conditions = conditions_for(info, &*ctx.repository)?;
    let mut set = ResponseSet::new(ctx.next_id());
    set.flags = response_flags(info);
    set.conditions = conditions;

    if let Some(shared) = info.shared_info {
        set.shared_data = Some(emit_shared(graph, shared, ctx)?);
        return Ok(set);
    }

    set.prompt = display_text(&info.prompt);
    set.responses = response_lines(&info.responses);
    report_dropped_lines(&info.speaker, info.responses.len(), ctx);
    set.link_to = link_targets(info, ids, ctx);
    set.script = build_fragment(&info.script, set.id, &ctx.config.prefix, ctx.scripts);
    report_notes(info, ctx);
    Ok(set)
}

fn response_flags(info: &TopicInfo) -> ResponseFlags {
    let reset_hours = if info.reset_hours > 0.0 && info.reset_hours <= 24.0 {
        Some(info.reset_hours)
    } else {
        if info.reset_hours != 0.0 {
            tracing::debug!(hours = info.reset_hours, "ignoring reset hours outside (0, 24]");
        }
        None
    };
    ResponseFlags {
        say_once: info.say_once,
        goodbye: info.goodbye,
        invisible_continue: info.invisible_continue,
        random: info.random,
        reset_hours,
    }
}

/// Lines numbered from one. A response set holds at most `u8::MAX` lines;
/// the rest are left out.
fn response_lines(responses: &[DialogueResponse]) -> Vec<ResponseLine> {
    responses
        .iter()
        .zip(1..=u8::MAX)
        .map(|(response, number)| ResponseLine {
            number,
            text: response.text.clone(),
            script_note: response.script_note.clone(),
            emotion: response.emotion,
            emotion_value: response.emotion_value,
            use_emotion_animation: true,
        })
        .collect()
}

fn report_dropped_lines(speaker: &Speaker, count: usize, ctx: &mut DialogueContext<'_>) {
    let limit = usize::from(u8::MAX);
    if count <= limit {
        return;
    }
    ctx.report(Issue {
        kind: IssueKind::TooManyLines,
        subject: speaker.name_no_spaces(),
        message: format!("{} of {count} lines dropped; a response set holds at most {limit}.", count - limit),
        notes: Vec::new(),
    });
}

fn link_targets(info: &TopicInfo, ids: &FxHashMap<TopicId, RecordId>, ctx: &mut DialogueContext<'_>) -> Vec<RecordId> {
    let mut targets = Vec::with_capacity(info.links.len());
    for link in &info.links {
        match ids.get(link) {
            Some(id) => targets.push(*id),
            None => ctx.report(Issue {
                kind: IssueKind::DanglingLink,
                subject: info.speaker.name_no_spaces(),
                message: format!("Link to unknown topic {} dropped.", link.0),
                notes: Vec::new(),
            }),
        }
    }
    targets
}

/// The response set holding a shared body, written on first use into the
/// quest's shared-info topic. A body with the same lines already there is
/// reused.
fn emit_shared(graph: &mut DialogueGraph, shared: SharedInfoId, ctx: &mut DialogueContext<'_>) -> Result<RecordId, CompileError> {
    let body = graph.shared_info(shared)?;
    if let Some(id) = body.emitted {
        return Ok(id);
    }
    let body = body.clone();

    let editor_id = ctx.prefixed("SharedInfos");
    let quest = ctx.quest;
    let priority = ctx.config.topic_priority;
    let topic_id = ctx.get_or_add(&editor_id, |id| {
        Record::Topic(DialogTopic {
            id,
            editor_id: Some(editor_id.clone()),
            name: None,
            quest,
            category: TopicCategory::Misc,
            subtype: TopicSubtype::SharedInfo,
            priority,
            responses: Vec::new(),
        })
    });

    let lines = response_lines(&body.responses);
    report_dropped_lines(&body.speaker, body.responses.len(), ctx);
    let existing = ctx
        .repository
        .resolve(topic_id)
        .and_then(Record::as_topic)
        .and_then(|topic| {
            topic.responses.iter().find(|set| {
                set.responses.len() == lines.len()
                    && set.responses.iter().zip(&lines).all(|(a, b)| a.text == b.text)
            })
        })
        .map(|set| set.id);

    let id = match existing {
        Some(id) => id,
        None => {
            let mut set = ResponseSet::new(ctx.next_id());
            set.conditions = vec![identity_condition(&body.speaker, false)?];
            set.responses = lines;
            let id = set.id;
            append_sets(ctx, topic_id, vec![set])?;
            id
        }
    };

    graph.shared_info_mut(shared)?.emitted = Some(id);
    Ok(id)
}

fn report_notes(info: &TopicInfo, ctx: &mut DialogueContext<'_>) {
    let subject = info.speaker.name_no_spaces();

    let prompt_notes = annotation_markers(&info.prompt);
    if !prompt_notes.is_empty() {
        ctx.report(Issue {
            kind: IssueKind::PromptNote,
            subject: subject.clone(),
            message: format!("Prompt \"{}\" has notes.", info.prompt),
            notes: prompt_notes.into_iter().map(str::to_string).collect(),
        });
    }

    for response in &info.responses {
        let notes = response.notes();
        if notes.is_empty() {
            continue;
        }
        ctx.report(Issue {
            kind: IssueKind::ResponseNote,
            subject: subject.clone(),
            message: format!("Response \"{}\" has notes.", response.text),
            notes: notes.into_iter().map(str::to_string).collect(),
        });
    }
}
