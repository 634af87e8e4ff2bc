//! Speaker identity conditions for compiled response sets.

use crate::core::factory::CompileError;
use crate::core::repository::RecordRepository;
use crate::schema::condition::{Condition, ConditionData};
use crate::schema::graph::TopicInfo;
use crate::schema::ids::RecordId;
use crate::schema::record::RecordKind;
use crate::schema::speaker::Speaker;

/// The single condition that restricts a line to its speaker, compared
/// equal to 1. `or` chains it with the next condition by OR.
pub fn identity_condition(speaker: &Speaker, or: bool) -> Result<Condition, CompileError> {
    let data = match speaker {
        Speaker::Alias { alias_index, .. } => ConditionData::GetIsAliasRef {
            alias_index: *alias_index,
        },
        Speaker::Npc { id, .. } => ConditionData::GetIsId { npc: *id },
        Speaker::Faction { id, .. } => ConditionData::GetInFaction { faction: *id },
        Speaker::VoiceType { id, .. } | Speaker::FormList { id, .. } => ConditionData::GetIsVoiceType {
            voice_type_or_list: *id,
        },
        Speaker::Unresolved { name } => {
            return Err(CompileError::UnresolvedSpeaker { name: name.clone() });
        }
    };
    Ok(Condition::equal_to(data, 1.0).or(or))
}

/// Conditions of a compiled info: the speaker identity first, then the
/// info's extra conditions in order.
pub fn conditions_for(info: &TopicInfo, repository: &dyn RecordRepository) -> Result<Vec<Condition>, CompileError> {
    check_speaker_kind(&info.speaker, repository)?;
    let mut conditions = Vec::with_capacity(1 + info.extra_conditions.len());
    conditions.push(identity_condition(&info.speaker, false)?);
    conditions.extend(info.extra_conditions.iter().cloned());
    Ok(conditions)
}

/// A `GetIsId` OR-chain matching any of the given actors.
pub fn any_of_actors(actors: &[RecordId]) -> Vec<Condition> {
    actors
        .iter()
        .map(|npc| Condition::equal_to(ConditionData::GetIsId { npc: *npc }, 1.0).or(true))
        .collect()
}

fn expected_kind(speaker: &Speaker) -> Option<RecordKind> {
    match speaker {
        Speaker::Npc { .. } => Some(RecordKind::Npc),
        Speaker::Faction { .. } => Some(RecordKind::Faction),
        Speaker::VoiceType { .. } => Some(RecordKind::VoiceType),
        Speaker::FormList { .. } => Some(RecordKind::FormList),
        Speaker::Alias { .. } | Speaker::Unresolved { .. } => None,
    }
}

/// Ids the repository doesn't know are trusted; they may live in a master
/// the repository was not given.
fn check_speaker_kind(speaker: &Speaker, repository: &dyn RecordRepository) -> Result<(), CompileError> {
    let (Some(expected), Some(id)) = (expected_kind(speaker), speaker.record_id()) else {
        return Ok(());
    };
    match repository.resolve(id) {
        Some(record) if record.kind() != expected => Err(CompileError::SpeakerKindMismatch {
            name: speaker.name().to_string(),
            id,
            expected,
            found: record.kind(),
        }),
        _ => Ok(()),
    }
}
