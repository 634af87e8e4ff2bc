//! Topic matching: recompiling unchanged content links to existing records.

use dialogue_compiler::core::pipeline::{CompileReport, DialogueCompiler};
use dialogue_compiler::core::repository::{find_matching_topic, InMemoryRepository, RecordRepository, StaticSpeakerResolver};
use dialogue_compiler::schema::conversation::{Conversation, DialogueType, GeneratedDialogue};
use dialogue_compiler::schema::graph::{DialogueGraph, DialogueTopic, SharedInfo, TopicInfo};
use dialogue_compiler::schema::ids::{RecordId, TopicId};
use dialogue_compiler::schema::record::{Quest, Record};
use dialogue_compiler::schema::response::{DialogueResponse, Emotion};
use dialogue_compiler::schema::speaker::Speaker;

const QUEST: RecordId = RecordId(0x100);
const OTHER_QUEST: RecordId = RecordId(0x101);

fn mira() -> Speaker {
    Speaker::Npc {
        name: "Mira".to_string(),
        id: RecordId(0x200),
    }
}

fn repository() -> InMemoryRepository {
    let mut repo = InMemoryRepository::new("Market.esp");
    repo.add(Record::Quest(Quest::new(QUEST, "MarketQuest")));
    repo.add(Record::Quest(Quest::new(OTHER_QUEST, "DocksQuest")));
    repo
}

fn prices(response: DialogueResponse) -> GeneratedDialogue {
    let mut graph = DialogueGraph::new();
    graph.add_topic(
        DialogueTopic::new(vec![TopicInfo::new(mira()).with_response(response)]).with_prompt("Prices today?"),
    );
    GeneratedDialogue::new(DialogueType::Dialogue, graph, mira())
}

/// A topic without player text whose only info has its own prompt.
fn prompted(prompt: &str, invisible_continue: bool) -> GeneratedDialogue {
    let mut info = TopicInfo::new(mira())
        .with_prompt(prompt)
        .with_response(DialogueResponse::new("Ask again tomorrow."));
    info.invisible_continue = invisible_continue;
    let mut graph = DialogueGraph::new();
    graph.add_topic(DialogueTopic::new(vec![info]));
    GeneratedDialogue::new(DialogueType::Dialogue, graph, mira())
}

/// "Prices today?" answered with a shared body of `lines`.
fn shared_prices(lines: &[&str]) -> GeneratedDialogue {
    let mut graph = DialogueGraph::new();
    let body = graph.add_shared_info(SharedInfo {
        speaker: mira(),
        responses: lines.iter().map(|line| DialogueResponse::new(*line)).collect(),
        emitted: None,
    });
    let mut info = TopicInfo::new(mira());
    info.shared_info = Some(body);
    graph.add_topic(DialogueTopic::new(vec![info]).with_prompt("Prices today?"));
    GeneratedDialogue::new(DialogueType::Dialogue, graph, mira())
}

fn compile(repo: &mut InMemoryRepository, dialogue: GeneratedDialogue, quest: RecordId) -> CompileReport {
    let compiler = DialogueCompiler::builder().prefix("MK").build().unwrap();
    let mut conversation = Conversation::new();
    conversation.push(dialogue);
    compiler
        .compile(repo, &mut StaticSpeakerResolver::new(), conversation, quest)
        .unwrap()
}

#[test]
fn unchanged_topic_is_reused() {
    let mut repo = repository();
    let first = compile(&mut repo, prices(DialogueResponse::new("Fish is cheap.")), QUEST);
    let second = compile(&mut repo, prices(DialogueResponse::new("Fish is cheap.")), QUEST);

    assert!(second.compiled[0].topics.is_empty());
    assert_eq!(second.compiled[0].reused_topics, first.compiled[0].topics);
    assert_eq!(second.compiled[0].roots, first.compiled[0].roots);
    // The existing branch is found again rather than duplicated.
    assert_eq!(second.compiled[0].branches, first.compiled[0].branches);
}

#[test]
fn emotion_does_not_break_a_match() {
    let mut repo = repository();
    compile(&mut repo, prices(DialogueResponse::new("Fish is cheap.")), QUEST);

    let angrier = prices(DialogueResponse::new("Fish is cheap.").with_emotion(Emotion::Anger, 90));
    let existing = find_matching_topic(&repo, QUEST, &angrier.graph, TopicId(0));
    assert!(existing.is_some());
}

#[test]
fn changed_text_breaks_a_match() {
    let mut repo = repository();
    compile(&mut repo, prices(DialogueResponse::new("Fish is cheap.")), QUEST);

    let changed = prices(DialogueResponse::new("Fish is dear today."));
    assert!(find_matching_topic(&repo, QUEST, &changed.graph, TopicId(0)).is_none());

    let report = compile(&mut repo, changed, QUEST);
    assert_eq!(report.compiled[0].topics.len(), 1);
    assert!(report.compiled[0].reused_topics.is_empty());
}

#[test]
fn changed_flags_break_a_match() {
    let mut repo = repository();
    compile(&mut repo, prices(DialogueResponse::new("Fish is cheap.")), QUEST);

    let mut once = prices(DialogueResponse::new("Fish is cheap."));
    once.graph.topics[0].infos[0].say_once = true;
    assert!(find_matching_topic(&repo, QUEST, &once.graph, TopicId(0)).is_none());
}

#[test]
fn topics_of_other_quests_are_not_matched() {
    let mut repo = repository();
    compile(&mut repo, prices(DialogueResponse::new("Fish is cheap.")), OTHER_QUEST);

    let same = prices(DialogueResponse::new("Fish is cheap."));
    assert!(find_matching_topic(&repo, QUEST, &same.graph, TopicId(0)).is_none());
    assert!(find_matching_topic(&repo, OTHER_QUEST, &same.graph, TopicId(0)).is_some());
}

#[test]
fn player_text_must_match_topic_name() {
    let mut repo = repository();
    compile(&mut repo, prices(DialogueResponse::new("Fish is cheap.")), QUEST);

    let mut renamed = prices(DialogueResponse::new("Fish is cheap."));
    renamed.graph.topics[0].prompt = Some("What's for sale?".to_string());
    assert!(find_matching_topic(&repo, QUEST, &renamed.graph, TopicId(0)).is_none());
    assert!(repo.winning_topics().len() == 1);
}

#[test]
fn continuation_prompts_are_not_compared() {
    let mut repo = repository();
    compile(&mut repo, prompted("Go on.", true), QUEST);

    let reworded = prompted("Continue.", true);
    assert!(find_matching_topic(&repo, QUEST, &reworded.graph, TopicId(0)).is_some());
}

#[test]
fn prompts_of_topics_without_player_text_are_compared() {
    let mut repo = repository();
    compile(&mut repo, prompted("Go on.", false), QUEST);

    let same = prompted("Go on.", false);
    assert!(find_matching_topic(&repo, QUEST, &same.graph, TopicId(0)).is_some());
    let reworded = prompted("Continue.", false);
    assert!(find_matching_topic(&repo, QUEST, &reworded.graph, TopicId(0)).is_none());
}

#[test]
fn shared_bodies_of_the_same_length_match() {
    let mut repo = repository();
    let lines = ["Fish is cheap.", "Bread is not.", "Salt never is."];
    let first = compile(&mut repo, shared_prices(&lines), QUEST);

    let again = shared_prices(&lines);
    let existing = find_matching_topic(&repo, QUEST, &again.graph, TopicId(0));
    assert_eq!(existing, first.compiled[0].roots.first().copied());
}

#[test]
fn shared_body_length_must_match() {
    let mut repo = repository();
    compile(
        &mut repo,
        shared_prices(&["Fish is cheap.", "Bread is not.", "Salt never is."]),
        QUEST,
    );

    let shorter = shared_prices(&["Fish is cheap."]);
    assert!(find_matching_topic(&repo, QUEST, &shorter.graph, TopicId(0)).is_none());

    let report = compile(&mut repo, shorter, QUEST);
    assert_eq!(report.compiled[0].topics.len(), 1);
    assert!(report.compiled[0].reused_topics.is_empty());
}

#[test]
fn shared_and_spoken_infos_do_not_match() {
    let mut repo = repository();
    compile(&mut repo, shared_prices(&["Fish is cheap."]), QUEST);

    let spoken = prices(DialogueResponse::new("Fish is cheap."));
    assert!(find_matching_topic(&repo, QUEST, &spoken.graph, TopicId(0)).is_none());

    let mut other = repository();
    compile(&mut other, prices(DialogueResponse::new("Fish is cheap.")), QUEST);
    let shared = shared_prices(&["Fish is cheap."]);
    assert!(find_matching_topic(&other, QUEST, &shared.graph, TopicId(0)).is_none());
}
