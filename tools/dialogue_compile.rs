/// Dialogue Compile: compiles a conversation file into a record layer and
/// fragment scripts.
///
/// Usage: dialogue_compile <conversation.ron> --quest <editor_id>
///            [--config <file>] [--speakers <file>] [--master <layer.ron>]...
///            [--plugin <name>] [--out <dir>]
///
/// Set RUST_LOG to control log output (default: info).

use dialogue_compiler::core::pipeline::{CompileReport, DialogueCompiler};
use dialogue_compiler::core::repository::{InMemoryRepository, RecordLayer, RecordRepository, StaticSpeakerResolver};
use dialogue_compiler::schema::conversation::Conversation;
use dialogue_compiler::schema::ids::RecordId;
use dialogue_compiler::schema::record::{Quest, Record};
use dialogue_compiler::schema::speaker::AliasSpeaker;
use std::path::{Path, PathBuf};
use std::process;

struct Args {
    conversation: PathBuf,
    quest: String,
    config: Option<PathBuf>,
    speakers: Option<PathBuf>,
    masters: Vec<PathBuf>,
    plugin: String,
    out: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = parse_args();

    let mut builder = DialogueCompiler::builder();
    if let Some(ref path) = args.config {
        builder = builder.config_file(path);
    }
    let compiler = match builder.build() {
        Ok(compiler) => compiler,
        Err(e) => fail(&format!("Failed to load config: {}", e)),
    };

    let conversation: Conversation = match load_ron(&args.conversation) {
        Ok(conversation) => conversation,
        Err(e) => fail(&format!("Failed to load conversation: {}", e)),
    };

    let mut resolver = match args.speakers {
        Some(ref path) => match load_ron::<Vec<AliasSpeaker>>(path) {
            Ok(speakers) => StaticSpeakerResolver::from_speakers(speakers),
            Err(e) => fail(&format!("Failed to load speakers: {}", e)),
        },
        None => StaticSpeakerResolver::new(),
    };

    let mut repository = InMemoryRepository::new(args.plugin.clone());
    for path in &args.masters {
        match load_ron::<RecordLayer>(path) {
            Ok(mut layer) => {
                layer.reindex();
                println!("  Loaded master: {} ({} records)", path.display(), layer.len());
                repository = repository.with_master(layer);
            }
            Err(e) => fail(&format!("Failed to load master {}: {}", path.display(), e)),
        }
    }

    let quest = find_or_add_quest(&mut repository, &args.quest);

    let report = match compiler.compile(&mut repository, &mut resolver, conversation, quest) {
        Ok(report) => report,
        Err(e) => fail(&format!("Compilation failed: {}", e)),
    };

    print_report(&report);

    if let Err(e) = write_output(&args.out, &args.plugin, repository.target(), &report) {
        fail(&format!("Failed to write output: {}", e));
    }

    if report.failed.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        process::exit(0);
    }

    let mut parsed = Args {
        conversation: PathBuf::from(&args[1]),
        quest: String::new(),
        config: None,
        speakers: None,
        masters: Vec::new(),
        plugin: "Dialogue.esp".to_string(),
        out: PathBuf::from("out"),
    };

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--quest" if i + 1 < args.len() => {
                i += 1;
                parsed.quest = args[i].clone();
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                parsed.config = Some(PathBuf::from(&args[i]));
            }
            "--speakers" if i + 1 < args.len() => {
                i += 1;
                parsed.speakers = Some(PathBuf::from(&args[i]));
            }
            "--master" if i + 1 < args.len() => {
                i += 1;
                parsed.masters.push(PathBuf::from(&args[i]));
            }
            "--plugin" if i + 1 < args.len() => {
                i += 1;
                parsed.plugin = args[i].clone();
            }
            "--out" if i + 1 < args.len() => {
                i += 1;
                parsed.out = PathBuf::from(&args[i]);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    if parsed.quest.is_empty() {
        eprintln!("ERROR: --quest is required");
        print_usage();
        process::exit(1);
    }

    parsed
}

fn print_usage() {
    println!("Usage: dialogue_compile <conversation.ron> --quest <editor_id>");
    println!("           [--config <file>] [--speakers <file>] [--master <layer.ron>]...");
    println!("           [--plugin <name>] [--out <dir>]");
}

fn fail(message: &str) -> ! {
    eprintln!("ERROR: {}", message);
    process::exit(1);
}

fn load_ron<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, String> {
    let contents = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    ron::from_str(&contents).map_err(|e| e.to_string())
}

/// The quest with this editor id, added to the target layer if no master
/// has it.
fn find_or_add_quest(repository: &mut InMemoryRepository, editor_id: &str) -> RecordId {
    if let Some(Record::Quest(quest)) = repository.resolve_by_editor_id(editor_id) {
        return quest.id;
    }
    let id = repository.next_id();
    repository.add(Record::Quest(Quest::new(id, editor_id)));
    println!("  Created quest {} ({})", editor_id, id);
    id
}

fn print_report(report: &CompileReport) {
    println!("\n=== Compile Report ===\n");

    for compiled in &report.compiled {
        println!(
            "{:?}: {} topics ({} reused), {} branches{}",
            compiled.dialogue_type,
            compiled.topics.len(),
            compiled.reused_topics.len(),
            compiled.branches.len(),
            compiled
                .scene
                .map(|scene| format!(", scene {}", scene))
                .unwrap_or_default()
        );
    }

    for issue in &report.issues {
        println!("WARNING: {}", issue);
    }

    for pending in &report.pending {
        println!(
            "PENDING: dialogue {} needs speakers: {}",
            pending.index,
            pending.unresolved.join(", ")
        );
    }

    for failed in &report.failed {
        println!("ERROR: dialogue {} ({:?}): {}", failed.index, failed.dialogue_type, failed.error);
    }

    println!(
        "\nSummary: {} compiled, {} pending, {} failed, {} warnings, {} scripts",
        report.compiled.len(),
        report.pending.len(),
        report.failed.len(),
        report.issues.len(),
        report.scripts.len()
    );
}

fn write_output(out: &Path, plugin: &str, target: &RecordLayer, report: &CompileReport) -> Result<(), String> {
    let scripts_dir = out.join("scripts");
    std::fs::create_dir_all(&scripts_dir).map_err(|e| e.to_string())?;

    let layer = ron::ser::to_string_pretty(target, ron::ser::PrettyConfig::default()).map_err(|e| e.to_string())?;
    let layer_path = out.join(format!("{}.ron", plugin));
    std::fs::write(&layer_path, layer).map_err(|e| e.to_string())?;
    println!("Wrote {} records to {}", target.len(), layer_path.display());

    for (name, text) in report.scripts.iter() {
        let path = scripts_dir.join(format!("{}.psc", name));
        std::fs::write(&path, text).map_err(|e| e.to_string())?;
    }
    if !report.scripts.is_empty() {
        println!("Wrote {} scripts to {}", report.scripts.len(), scripts_dir.display());
    }

    Ok(())
}
