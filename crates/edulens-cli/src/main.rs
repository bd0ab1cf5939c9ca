//! EduLens CLI - Turn lecture material into topics, practice questions and answers

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// EduLens - Study material ingestion and knowledge pipeline
#[derive(Parser)]
#[command(name = "edulens")]
#[command(version)]
#[command(about = "Turn lecture material into topics, practice questions and answers", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize EduLens (create config, database and upload store)
    Init,

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Upload study material and process it
    Upload {
        /// Files to upload (PDF, Markdown, text, audio or video)
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Expected kind (document, audio_video)
        #[arg(short, long)]
        kind: Option<String>,

        /// Register only; run 'edulens process' later
        #[arg(long)]
        no_wait: bool,
    },

    /// Process every pending artifact
    Process,

    /// List uploaded artifacts
    List {
        /// Filter by status (pending, processing, completed, failed)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show details of an artifact
    Show {
        /// Artifact ID or prefix
        id: String,
    },

    /// Reset a completed or failed artifact and process it again
    Retry {
        /// Artifact ID or prefix
        id: String,

        /// Reset only; run 'edulens process' later
        #[arg(long)]
        no_wait: bool,
    },

    /// Delete an artifact and everything derived from it
    Delete {
        /// Artifact ID or prefix
        id: String,
    },

    /// List the topics of an artifact
    Topics {
        /// Artifact ID or prefix
        artifact: String,
    },

    /// Generate or list practice questions
    #[command(subcommand)]
    Questions(QuestionCommands),

    /// Manage study sessions
    #[command(subcommand)]
    Session(SessionCommands),

    /// Ask a question about an artifact
    Ask {
        /// Artifact ID or prefix
        artifact: String,

        /// Your question
        question: String,

        /// Hide source references
        #[arg(long)]
        no_sources: bool,
    },

    /// Show statistics for one artifact or the whole store
    Stats {
        /// Artifact ID or prefix
        artifact: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., ollama.model)
        key: String,

        /// Value to set
        value: String,
    },
}

#[derive(Subcommand)]
enum QuestionCommands {
    /// Generate a new batch of questions for a topic
    Generate {
        /// Topic ID or prefix
        topic: String,

        /// Topic name to use in the prompt (default: the stored name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List the questions of a topic, newest first
    List {
        /// Topic ID or prefix
        topic: String,

        /// Show answers
        #[arg(short, long)]
        answers: bool,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Start a study session on an artifact
    Create {
        /// Artifact ID or prefix
        artifact: String,

        /// Session name
        name: String,
    },

    /// List the sessions of an artifact
    List {
        /// Artifact ID or prefix
        artifact: String,
    },

    /// Show or replace a session's progress
    Progress {
        /// Session ID
        session: String,

        /// New progress as a JSON object
        json: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("edulens=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("edulens=info,warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::show(),
            ConfigCommands::Set { key, value } => commands::config::set(&key, &value),
        },
        Commands::Upload {
            paths,
            kind,
            no_wait,
        } => commands::upload::run(&paths, kind, no_wait),
        Commands::Process => commands::upload::process(),
        Commands::List { status } => commands::list::run(status),
        Commands::Show { id } => commands::show::run(&id),
        Commands::Retry { id, no_wait } => commands::upload::retry(&id, no_wait),
        Commands::Delete { id } => commands::delete::run(&id),
        Commands::Topics { artifact } => commands::topics::run(&artifact),
        Commands::Questions(cmd) => match cmd {
            QuestionCommands::Generate { topic, name } => {
                commands::questions::generate(&topic, name)
            }
            QuestionCommands::List { topic, answers } => commands::questions::list(&topic, answers),
        },
        Commands::Session(cmd) => match cmd {
            SessionCommands::Create { artifact, name } => {
                commands::session::create(&artifact, &name)
            }
            SessionCommands::List { artifact } => commands::session::list(&artifact),
            SessionCommands::Progress { session, json } => {
                commands::session::progress(&session, json)
            }
        },
        Commands::Ask {
            artifact,
            question,
            no_sources,
        } => commands::ask::run(&artifact, &question, !no_sources),
        Commands::Stats { artifact } => commands::stats::run(artifact),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
