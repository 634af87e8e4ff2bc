//! Scene sequencing: speaker-labelled lines to phases and actions.
//!
//! Scene documents are flat lists of `Label: text` lines. Consecutive lines
//! of one label form a turn; each turn becomes a scene topic and a phase
//! in which the speaker talks and everyone else reacts.

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::core::repository::SpeakerResolver;
use crate::schema::graph::DialogueGraph;
use crate::schema::ids::{RecordId, TopicId};
use crate::schema::record::{Scene, SceneAction, SceneActionKind, SceneActor, ScenePhase};
use crate::schema::response::{DialogueResponse, Emotion};
use crate::schema::speaker::AliasSpeaker;

/// `Label: text`, split at the last colon that still has text after it.
static SCENE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([\s\S]*): *([\s\S]+)$").unwrap());

pub const PHASE_EDITOR_WIDTH: u32 = 200;
pub const LOOPING_MIN: u32 = 1;
pub const LOOPING_MAX: u32 = 10;

/// Consecutive lines of one speaker label.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneTurn {
    pub speaker: String,
    pub responses: Vec<DialogueResponse>,
}

/// Split labelled lines into turns. Lines without a label are dropped.
pub fn parse_lines(lines: &[DialogueResponse]) -> Vec<SceneTurn> {
    let mut turns: Vec<SceneTurn> = Vec::new();
    for line in lines {
        let Some(captures) = SCENE_LINE.captures(&line.text) else {
            tracing::debug!(line = %line.text, "dropping unlabelled scene line");
            continue;
        };
        let speaker = captures[1].trim().to_string();
        let response = DialogueResponse {
            text: captures[2].to_string(),
            ..line.clone()
        };
        match turns.last_mut() {
            Some(turn) if turn.speaker == speaker => turn.responses.push(response),
            _ => turns.push(SceneTurn {
                speaker,
                responses: vec![response],
            }),
        }
    }
    turns
}

/// Lines [`parse_lines`] would drop for lacking a `Label:` prefix.
pub fn unlabelled_lines(lines: &[DialogueResponse]) -> Vec<&DialogueResponse> {
    lines.iter().filter(|line| !SCENE_LINE.is_match(&line.text)).collect()
}

/// Every spoken line of the topics reachable from `roots`, in link order.
pub fn collect_lines(graph: &DialogueGraph, roots: &[TopicId]) -> Vec<DialogueResponse> {
    graph
        .enumerate_links(roots)
        .into_iter()
        .filter_map(|id| graph.topics.get(id.0))
        .flat_map(|topic| topic.infos.iter())
        .flat_map(|info| info.responses.iter().cloned())
        .collect()
}

/// Distinct labels in order of first appearance.
pub fn speaker_labels(turns: &[SceneTurn]) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for turn in turns {
        if !labels.contains(&turn.speaker) {
            labels.push(turn.speaker.clone());
        }
    }
    labels
}

/// Resolved scene speakers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Roster {
    by_label: FxHashMap<String, AliasSpeaker>,
    /// One entry per distinct identity, in order of first appearance.
    members: Vec<AliasSpeaker>,
}

impl Roster {
    /// Build from labels in first-appearance order. Labels missing from
    /// `resolved` are left out.
    pub fn new(labels: &[String], resolved: FxHashMap<String, AliasSpeaker>) -> Self {
        let mut members: Vec<AliasSpeaker> = Vec::new();
        for label in labels {
            let Some(speaker) = resolved.get(label) else {
                continue;
            };
            if !members.iter().any(|member| member.id == speaker.id) {
                members.push(speaker.clone());
            }
        }
        Self {
            by_label: resolved,
            members,
        }
    }

    pub fn get(&self, label: &str) -> Option<&AliasSpeaker> {
        self.by_label.get(label)
    }

    pub fn members(&self) -> &[AliasSpeaker] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn alias_indices(&self) -> Vec<i32> {
        self.members.iter().map(|member| member.alias_index).collect()
    }

    pub fn actor_ids(&self) -> Vec<RecordId> {
        self.members.iter().filter_map(|member| member.id).collect()
    }

    /// Renumber aliases by roster position, for scenes that own their quest.
    pub fn with_positional_aliases(mut self) -> Self {
        let ids: Vec<Option<RecordId>> = self.members.iter().map(|member| member.id).collect();
        for (position, id) in (0..).zip(ids) {
            self.rebind(id, position);
        }
        self
    }

    /// Move every label of identity `id` to another alias slot.
    pub fn rebind(&mut self, id: Option<RecordId>, alias_index: i32) {
        for speaker in self.members.iter_mut().chain(self.by_label.values_mut()) {
            if speaker.id == id {
                speaker.alias_index = alias_index;
            }
        }
    }

    /// Merge consecutive turns whose labels resolve to the same identity.
    /// Returns the first label missing from the roster as the error.
    pub fn merge_turns(&self, turns: Vec<SceneTurn>) -> Result<Vec<(AliasSpeaker, Vec<DialogueResponse>)>, String> {
        let mut merged: Vec<(AliasSpeaker, Vec<DialogueResponse>)> = Vec::new();
        for turn in turns {
            let speaker = self.get(&turn.speaker).ok_or_else(|| turn.speaker.clone())?;
            match merged.last_mut() {
                Some((last, responses)) if last.id == speaker.id => responses.extend(turn.responses),
                _ => merged.push((speaker.clone(), turn.responses)),
            }
        }
        Ok(merged)
    }
}

/// Outcome of asking a resolver for scene speakers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SpeakerResolution {
    Resolved(Roster),
    /// Labels still without an identity after the allowed rounds.
    NeedsInput(Vec<String>),
}

/// Ask `resolver` for the labels, re-asking only for the ones still
/// unresolved, at most `rounds` times.
#[tracing::instrument(skip(resolver))]
pub fn resolve_speakers(labels: &[String], resolver: &mut dyn SpeakerResolver, rounds: u32) -> SpeakerResolution {
    let mut resolved: FxHashMap<String, AliasSpeaker> = FxHashMap::default();
    let mut pending: Vec<String> = labels.to_vec();

    for round in 0..rounds {
        if pending.is_empty() {
            break;
        }
        let answers = resolver.resolve_speakers(&pending);
        for (label, answer) in pending.iter().zip(answers) {
            if answer.is_resolved() {
                resolved.insert(label.clone(), answer);
            }
        }
        pending.retain(|label| !resolved.contains_key(label));
        tracing::debug!(round, pending = pending.len(), "speaker resolution round");
    }

    if pending.is_empty() {
        SpeakerResolution::Resolved(Roster::new(labels, resolved))
    } else {
        SpeakerResolution::NeedsInput(pending)
    }
}

/// One scene turn ready to be placed: who speaks which topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencedTurn {
    pub alias: i32,
    pub topic: RecordId,
}

/// Scene actor entries for the roster's alias slots. Negative slots have no
/// alias to act and are skipped.
pub fn scene_actors(aliases: &[i32]) -> Vec<SceneActor> {
    aliases
        .iter()
        .filter_map(|alias| match u32::try_from(*alias) {
            Ok(alias_id) => Some(SceneActor {
                alias_id,
                death_end: true,
                combat_end: true,
                dialogue_pause: true,
            }),
            Err(_) => {
                tracing::warn!(alias, "skipping scene actor without an alias slot");
                None
            }
        })
        .collect()
}

/// Append one phase per turn to `scene`.
///
/// Each phase gets the speaker's dialog action and, for every other roster
/// member, a reaction that faces and head-tracks the speaker. With exactly
/// two members the speaker action head-tracks the listener instead and no
/// reaction is added. Phase indices continue from the scene's phase count;
/// action indices continue from `last_action_index`.
pub fn sequence(scene: &mut Scene, turns: &[SequencedTurn], roster: &[i32]) {
    for turn in turns {
        let phase = scene.phases.len() as u32;
        scene.phases.push(ScenePhase {
            name: String::new(),
            editor_width: PHASE_EDITOR_WIDTH,
        });

        let listeners: Vec<i32> = roster.iter().copied().filter(|alias| *alias != turn.alias).collect();
        let pair = roster.len() == 2;

        let index = next_action_index(scene);
        scene.actions.push(SceneAction {
            headtrack_alias: if pair { listeners.first().copied() } else { None },
            ..dialog_action(index, turn.alias, phase, Some(turn.topic))
        });

        if pair {
            continue;
        }
        for listener in listeners {
            let index = next_action_index(scene);
            scene.actions.push(SceneAction {
                face_target: true,
                headtrack_alias: Some(turn.alias),
                ..dialog_action(index, listener, phase, None)
            });
        }
    }
}

fn next_action_index(scene: &mut Scene) -> u32 {
    scene.last_action_index += 1;
    scene.last_action_index
}

fn dialog_action(index: u32, actor_alias: i32, phase: u32, topic: Option<RecordId>) -> SceneAction {
    SceneAction {
        index,
        kind: SceneActionKind::Dialog,
        actor_alias,
        start_phase: phase,
        end_phase: phase,
        topic,
        face_target: false,
        headtrack_alias: None,
        looping_min: LOOPING_MIN,
        looping_max: LOOPING_MAX,
        emotion: Emotion::Neutral,
        emotion_value: 0,
    }
}
