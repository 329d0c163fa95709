// PeopleSay CLI - ask the People Say interviews questions from the terminal

mod ai;
mod ask;
mod dataset;
mod exit_codes;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use peoplesay_config::{LlmProvider, Settings};
use peoplesay_engine::AnalysisType;

#[derive(Parser)]
#[command(name = "peoplesay")]
#[command(author, version, about = "Natural-language insight search over People Say interview excerpts")]
#[command(propagate_version = true)]
#[command(after_help = "\
Examples:
  peoplesay init-db --csv peoplesay.csv
  peoplesay ask \"What do older Asian adults say about access to care?\"
  peoplesay ask \"How do rural patients describe telehealth?\" --analysis policy --json
  peoplesay ai doctor --test")]
pub struct Cli {
    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask a question and get a cited summary of matching excerpts
    #[command(after_help = "\
Exit codes:
  0   Summary produced
  3   Query matched no excerpts
  10  AI disabled (provider = none)
  11  API key missing
  12  API key rejected
  20  Translation failed
  21  Retrieval failed (includes rejected queries)
  22  Synthesis failed (includes --strict-citations failures)
  30  Database missing")]
    Ask {
        /// The question, in plain language
        question: String,

        /// Analysis frame: thematic, narrative, demographic, policy
        #[arg(long, short = 'a')]
        analysis: Option<AnalysisType>,

        /// Database path (default: settings or <data_dir>/peoplesay/peoplesay.db)
        #[arg(long, env = "PEOPLESAY_DB")]
        db: Option<PathBuf>,

        #[command(flatten)]
        ai: AiArgs,

        /// Fail when the summary cites sources outside the result set
        #[arg(long)]
        strict_citations: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build the excerpt database from the People Say CSV export
    #[command(name = "init-db")]
    InitDb {
        /// People Say CSV export
        #[arg(long)]
        csv: PathBuf,

        /// Database path (default: settings or <data_dir>/peoplesay/peoplesay.db)
        #[arg(long, env = "PEOPLESAY_DB")]
        db: Option<PathBuf>,

        /// Rebuild even if the database already exists
        #[arg(long)]
        force: bool,
    },

    /// Distinct values and counts of every categorical column
    Profile {
        #[arg(long, env = "PEOPLESAY_DB")]
        db: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Print the schema description given to the model
    Schema,

    /// List analysis types
    #[command(name = "analysis-types")]
    AnalysisTypes {
        #[arg(long)]
        json: bool,
    },

    /// AI provider diagnostics
    Ai {
        #[command(subcommand)]
        command: AiCommands,
    },
}

#[derive(Subcommand)]
pub enum AiCommands {
    /// Show resolved AI configuration and check readiness
    Doctor {
        #[command(flatten)]
        ai: AiArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Check the key against the provider's model list
        #[arg(long)]
        test: bool,
    },
}

/// Provider overrides shared by every command that talks to a model.
#[derive(Args)]
pub struct AiArgs {
    /// Provider: gemini, openai, none
    #[arg(long)]
    provider: Option<LlmProvider>,

    /// Model identifier (default: provider default)
    #[arg(long)]
    model: Option<String>,

    /// API key for this run only (never stored)
    #[arg(long)]
    api_key: Option<String>,
}

impl AiArgs {
    /// Apply flag overrides on top of loaded settings.
    fn apply(&self, settings: &mut Settings) {
        if let Some(provider) = self.provider {
            settings.ai.provider = provider;
        }
        if let Some(model) = &self.model {
            settings.ai.model = model.clone();
        }
    }
}

/// CLI error with exit code, message and optional fix hint.
#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(exit_codes::EXIT_USAGE, message)
    }

    pub fn general(message: impl Into<String>) -> Self {
        Self::new(exit_codes::EXIT_ERROR, message)
    }
}

fn init_logger(verbose: bool) {
    let mut builder = env_logger::Builder::new();
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    } else {
        builder.filter_level(log::LevelFilter::Warn);
    }
    // RUST_LOG still wins when set
    builder.parse_env("RUST_LOG");
    builder.format_timestamp(None);
    builder.init();
}

/// Resolve the database path: flag, then settings, then the data dir default.
pub(crate) fn database_path(flag: Option<PathBuf>, settings: &Settings) -> PathBuf {
    flag.unwrap_or_else(|| settings.database.effective_path())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let result = match cli.command {
        Commands::Ask { question, analysis, db, ai, strict_citations, json } => {
            ask::cmd_ask(ask::AskArgs { question, analysis, db, ai, strict_citations, json })
        }
        Commands::InitDb { csv, db, force } => dataset::cmd_init_db(csv, db, force),
        Commands::Profile { db, json } => dataset::cmd_profile(db, json),
        Commands::Schema => dataset::cmd_schema(),
        Commands::AnalysisTypes { json } => dataset::cmd_analysis_types(json),
        Commands::Ai { command } => match command {
            AiCommands::Doctor { ai, json, test } => ai::cmd_ai_doctor(ai, json, test),
        },
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {}", e.message);
            if let Some(hint) = &e.hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(e.code)
        }
    }
}
