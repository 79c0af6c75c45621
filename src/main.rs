use std::{env, fs, io, path::{Path, PathBuf}, process::ExitCode, time::Instant};

use topic_workspace::{
    logging::{init_tracing, level_from_env},
    settings::SettingsFormat,
    Algorithm, Language, TopicRunner, Workspace,
};
use tracing::Level;

const TOP_TERMS: usize = 8;

fn print_usage() {
    eprintln!("Usage: topic-workspace <DIR> [TOPICS] [ALGORITHM] [SETTINGS]");
    eprintln!("  DIR        directory with *.txt documents");
    eprintln!("  TOPICS     topic count (default 10)");
    eprintln!("  ALGORITHM  lda | nmf | kmeans (default lda)");
    eprintln!("  SETTINGS   settings file to load if present, written on exit (.json or .cbor)");
    eprintln!("Log level is read from TOPIC_LOG (trace, debug, info, warn, error).");
}

// plain text files directly inside `dir`, sorted by name
fn read_documents(dir: &Path) -> io::Result<Vec<(String, String)>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().map_or(false, |e| e == "txt"))
        .collect();
    files.sort();
    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        let text = fs::read_to_string(&path)?;
        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();
        documents.push((title, text));
    }
    Ok(documents)
}

fn main() -> ExitCode {
    init_tracing(level_from_env(Level::INFO));
    let program_start = Instant::now();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_usage();
        return ExitCode::SUCCESS;
    }
    if args.is_empty() {
        print_usage();
        return ExitCode::FAILURE;
    }
    let dir = PathBuf::from(&args[0]);
    let topics = match args.get(1).map(|s| s.parse::<usize>()) {
        None => None,
        Some(Ok(n)) => Some(n),
        Some(Err(_)) => {
            eprintln!("[error] TOPICS must be a positive integer");
            return ExitCode::FAILURE;
        }
    };
    let algorithm = match args.get(2).map(|s| Algorithm::parse(s)) {
        None => None,
        Some(Some(a)) => Some(a),
        Some(None) => {
            eprintln!("[error] unknown algorithm {:?}", args[2]);
            return ExitCode::FAILURE;
        }
    };
    let settings_path = args.get(3).map(PathBuf::from);

    let mut workspace = Workspace::new(Language::English);
    if let Some(path) = settings_path.as_deref().filter(|p| p.exists()) {
        if let Err(err) = workspace.load_settings_from(path) {
            for problem in err.problems() {
                eprintln!("[error] {problem}");
            }
            return ExitCode::FAILURE;
        }
        eprintln!("[info] settings loaded, configuration {:?} selected", workspace.selected_name());
    }

    let documents = match read_documents(&dir) {
        Ok(docs) => docs,
        Err(err) => {
            eprintln!("[error] failed to read {}: {err}", dir.display());
            return ExitCode::FAILURE;
        }
    };
    if documents.is_empty() {
        eprintln!("[error] no .txt documents in {}", dir.display());
        return ExitCode::FAILURE;
    }
    let version = workspace.import_documents(documents);
    eprintln!("[info] imported {} documents (corpus version {version})", workspace.corpus().doc_num());

    let parameters = workspace.parameters();
    let edits = algorithm
        .map(|a| parameters.set_algorithm(a))
        .into_iter()
        .chain(topics.map(|n| parameters.set_topic_count(n)));
    for edit in edits {
        if let Err(problems) = edit {
            for problem in problems {
                eprintln!("[error] {problem}");
            }
            return ExitCode::FAILURE;
        }
    }

    let train_start = Instant::now();
    if let Err(err) = workspace.train() {
        eprintln!("[error] {err}");
        return ExitCode::FAILURE;
    }
    for outcome in workspace.wait_training() {
        if !outcome.is_installed() {
            eprintln!("[error] training of {:?} not installed: {:?}", outcome.config, outcome.status);
            return ExitCode::FAILURE;
        }
    }
    eprintln!("[time] train={:.2}ms", train_start.elapsed().as_secs_f64() * 1000.0);

    workspace.topic_runner().with_runner(|runner| {
        if let Some(runner) = runner {
            println!("# {} ({} topics)", runner.kind(), runner.topic_count());
            for topic in runner.all_topics_top_terms(TOP_TERMS) {
                println!("{}\t{}", topic.topic_id, topic.terms.join(" "));
            }
        }
    });
    println!("# views: {}", workspace.offered_visualizations().join(", "));

    if let Some(path) = settings_path {
        let format = SettingsFormat::from_path(&path);
        if let Err(err) = workspace.save_settings_to(&path) {
            eprintln!("[error] could not write settings: {err}");
            return ExitCode::FAILURE;
        }
        eprintln!("[info] settings written to {} ({format:?})", path.display());
    }

    eprintln!("[time] program_total={:.2}ms", program_start.elapsed().as_secs_f64() * 1000.0);
    ExitCode::SUCCESS
}
