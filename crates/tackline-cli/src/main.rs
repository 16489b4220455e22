//! tackline CLI: inspect and edit timeline projects from the command line

use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tackline_engine::{run_script, Board, Editor, EngineConfig, EventLog, ProjectStore};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Frame-based timeline editing engine
#[derive(Parser)]
#[command(name = "tackline")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Project file to operate on
    #[arg(long, global = true, default_value = DEFAULT_PROJECT)]
    project: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a project holding the starter board, and a default config
    Init,

    /// Print boards, tracks and tacks
    Show {
        /// Output the project file as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a command script against a board and save the result
    Apply {
        /// Script file, one command per line
        script: PathBuf,

        /// Index of the board to edit
        #[arg(long, default_value = "0")]
        board: usize,

        /// Do not write the project back
        #[arg(long)]
        dry_run: bool,

        /// Print every event emitted while the script ran
        #[arg(long)]
        events: bool,
    },

    /// Verify that no tacks overlap and every range is valid
    Check,
}

const DEFAULT_PROJECT: &str = "tackline-project.json";
const CONFIG_FILE: &str = "tackline.json";

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Init => cmd_init(&cli.project),
        Commands::Show { json } => cmd_show(&cli.project, json),
        Commands::Apply {
            script,
            board,
            dry_run,
            events,
        } => cmd_apply(&cli.project, &script, board, dry_run, events),
        Commands::Check => cmd_check(&cli.project),
    }
}

fn init_logging(verbosity: u8) {
    let filter = EnvFilter::builder()
        .with_default_directive(level_from_verbosity(verbosity).into())
        .with_env_var("TACKLINE_LOG")
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// `tackline.json` sits next to the project file.
fn config_path(project: &Path) -> PathBuf {
    project
        .parent()
        .map_or_else(|| PathBuf::from(CONFIG_FILE), |dir| dir.join(CONFIG_FILE))
}

fn load_config(project: &Path) -> EngineConfig {
    let path = config_path(project);
    match EngineConfig::load_or_default(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", path.display());
            std::process::exit(1);
        }
    }
}

fn load_boards(store: &ProjectStore) -> Vec<Board> {
    match store.load_boards() {
        Ok(Some(boards)) => boards,
        Ok(None) => {
            eprintln!(
                "Error: {} not found. Run `tackline init` first.",
                store.path().display()
            );
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Failed to load {}: {e}", store.path().display());
            std::process::exit(1);
        }
    }
}

fn cmd_init(project: &Path) {
    let config_path = config_path(project);
    let config = if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        load_config(project)
    } else {
        let config = EngineConfig::default();
        match config.save(&config_path) {
            Ok(()) => println!("Created {}", config_path.display()),
            Err(e) => {
                eprintln!("Failed to write config: {e}");
                std::process::exit(1);
            }
        }
        config
    };

    let store = ProjectStore::new(project);
    if project.exists() {
        println!("Project already exists at {}", project.display());
        return;
    }

    let board = Board::seeded(&config);
    match store.save(&[board]) {
        Ok(_) => println!("Created {}", project.display()),
        Err(e) => {
            eprintln!("Failed to write project: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_show(project: &Path, json: bool) {
    let store = ProjectStore::new(project);

    if json {
        let file = match store.load() {
            Ok(Some(file)) => file,
            Ok(None) => {
                eprintln!("Error: {} not found. Run `tackline init` first.", project.display());
                std::process::exit(1);
            }
            Err(e) => {
                eprintln!("Failed to load {}: {e}", project.display());
                std::process::exit(1);
            }
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&file).expect("failed to serialize")
        );
        return;
    }

    let boards = load_boards(&store);
    if boards.is_empty() {
        println!("No boards");
        return;
    }
    for (i, board) in boards.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print!("[{i}] {}", board.outline());
    }
}

fn cmd_apply(project: &Path, script: &Path, board: usize, dry_run: bool, events: bool) {
    let text = match std::fs::read_to_string(script) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Failed to read {}: {e}", script.display());
            std::process::exit(1);
        }
    };

    let config = load_config(project);
    let store = ProjectStore::new(project);
    let boards = load_boards(&store);

    let mut editor = Editor::with_boards(config, boards, EventLog::new());
    if let Err(e) = editor.set_active_board(board) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let result = run_script(&mut editor, &text);

    if events {
        for event in editor.sink().events() {
            println!("{event}");
        }
    }

    let count = match result {
        Ok(count) => count,
        Err(e) => {
            eprintln!("{}:{e}", script.display());
            std::process::exit(1);
        }
    };

    if let Ok(active) = editor.active_board() {
        print!("{}", active.outline());
    }

    if dry_run {
        println!("Ran {count} command(s) (dry run, nothing saved)");
        return;
    }

    let boards = editor.into_boards();
    match store.save(&boards) {
        Ok(_) => println!("Ran {count} command(s), saved {}", project.display()),
        Err(e) => {
            eprintln!("Failed to save project: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_check(project: &Path) {
    let store = ProjectStore::new(project);
    let boards = load_boards(&store);

    let mut total = 0;
    for board in &boards {
        for violation in board.violations() {
            println!("{}: {violation}", board.id());
            total += 1;
        }
    }

    if total > 0 {
        eprintln!("{total} violation(s) found");
        std::process::exit(1);
    }

    let tacks: usize = boards
        .iter()
        .flat_map(Board::live_tracks)
        .map(|t| t.live_tacks().count())
        .sum();
    println!("OK: {} board(s), {tacks} tack(s)", boards.len());
}
