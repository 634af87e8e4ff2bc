/// Conversation Linter: checks conversation files before compiling them.
///
/// Usage: conversation_linter <conversation.ron | dir>

use dialogue_compiler::core::scene;
use dialogue_compiler::core::text::annotation_markers;
use dialogue_compiler::schema::conversation::{Conversation, GeneratedDialogue};
use dialogue_compiler::schema::ids::TopicId;
use dialogue_compiler::schema::speaker::Speaker;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: conversation_linter <conversation.ron | dir>");
        process::exit(0);
    }

    let path = Path::new(&args[1]);
    let mut conversations = Vec::new();

    if path.is_file() {
        match load_conversation(path) {
            Ok(conversation) => conversations.push((path.display().to_string(), conversation)),
            Err(e) => {
                eprintln!("ERROR: Failed to load conversation file: {}", e);
                process::exit(1);
            }
        }
    } else if path.is_dir() {
        load_conversations_recursive(path, &mut conversations);
    } else {
        eprintln!("ERROR: Path '{}' does not exist", args[1]);
        process::exit(1);
    }

    println!("Loaded {} conversations", conversations.len());

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    for (source, conversation) in &conversations {
        for (index, dialogue) in conversation.dialogue.iter().enumerate() {
            let location = format!("{} [{}:{:?}]", source, index, dialogue.dialogue_type);
            lint_dialogue(&location, dialogue, &mut errors, &mut warnings);
        }
    }

    println!("\n=== Conversation Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn load_conversation(path: &Path) -> Result<Conversation, String> {
    let contents = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    ron::from_str(&contents).map_err(|e| e.to_string())
}

fn load_conversations_recursive(dir: &Path, conversations: &mut Vec<(String, Conversation)>) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                load_conversations_recursive(&path, conversations);
            } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
                match load_conversation(&path) {
                    Ok(conversation) => {
                        println!("  Loaded: {}", path.display());
                        conversations.push((path.display().to_string(), conversation));
                    }
                    Err(e) => {
                        eprintln!("  ERROR loading {}: {}", path.display(), e);
                    }
                }
            }
        }
    }
}

fn lint_dialogue(location: &str, dialogue: &GeneratedDialogue, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
    let graph = &dialogue.graph;

    if dialogue.is_empty() {
        warnings.push(format!("{}: dialogue is empty and will be skipped", location));
        return;
    }

    for (topic, index, link) in graph.dangling_links() {
        errors.push(format!(
            "{}: topic {} info {} links to missing topic {}",
            location, topic.0, index, link.0
        ));
    }

    for root in &dialogue.roots {
        if graph.topic(*root).is_err() {
            errors.push(format!("{}: root {} is not a topic", location, root.0));
        }
    }

    if dialogue.dialogue_type.is_scene() {
        let lines = scene::collect_lines(graph, &dialogue.roots);
        for line in scene::unlabelled_lines(&lines) {
            warnings.push(format!(
                "{}: scene line \"{}\" has no speaker label and will be dropped",
                location, line.text
            ));
        }
        return;
    }

    for (t, topic) in graph.topics.iter().enumerate() {
        for (i, info) in topic.infos.iter().enumerate() {
            if let Speaker::Unresolved { name } = &info.speaker {
                errors.push(format!(
                    "{}: topic {} info {} has unresolved speaker '{}'",
                    location, t, i, name
                ));
            }

            if info.invisible_continue {
                for link in &info.links {
                    if link.0 == t || graph.continues_into(*link, TopicId(t)) {
                        errors.push(format!(
                            "{}: topic {} info {} continues into itself through topic {}",
                            location, t, i, link.0
                        ));
                    }
                }
            }

            let prompt_notes = annotation_markers(&info.prompt);
            if !prompt_notes.is_empty() {
                warnings.push(format!(
                    "{}: prompt \"{}\" has notes: {}",
                    location,
                    info.prompt,
                    prompt_notes.join(" ")
                ));
            }
            for response in &info.responses {
                let notes = response.notes();
                if !notes.is_empty() {
                    warnings.push(format!(
                        "{}: response \"{}\" has notes: {}",
                        location,
                        response.text,
                        notes.join(" ")
                    ));
                }
            }

            if info.responses.is_empty() && info.shared_info.is_none() {
                warnings.push(format!("{}: topic {} info {} has no lines", location, t, i));
            }
        }
    }
}
