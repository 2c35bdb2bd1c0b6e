//! wordsieve — build frequency-ranked, stop-word-filtered word lists from a
//! corpus or a flash-card deck.
//!
//! `run` loads a document and applies a chain of steps, each one producing a
//! snapshot the next step reads:
//!
//! - **strip** — keep the word before the first tab (drops deck translations)
//! - **count-stats** — tag with the language's tagger, rank as `rank word occurrences`
//! - **count** — same ranking, words only
//! - **filter** — drop words listed in the language's filter file
//! - **undo** — step back to the previous snapshot
//!
//! Ctrl-C cancels the step in flight and stops the chain: history stays as it
//! was, and the remaining steps and the export are skipped.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use wordsieve::config::{Settings, DEFAULT_CONFIG_FILE};
use wordsieve::snapshot::DEFAULT_SNAPSHOT_DIR;
use wordsieve::{Language, Operation, Outcome, Session};

#[derive(Parser)]
#[command(
    name = "wordsieve",
    about = "Strip, count, rank and filter corpus word lists with undo"
)]
struct Cli {
    /// Settings file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Directory holding intermediate snapshots
    #[arg(long = "tmp-dir", global = true, default_value = DEFAULT_SNAPSHOT_DIR)]
    tmp_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply a chain of steps to a document
    Run {
        /// Input file
        #[arg(short = 'i')]
        input: PathBuf,

        /// Save the final document here
        #[arg(short = 'o')]
        output: Option<PathBuf>,

        /// Language to use (defaults to the last one used)
        #[arg(short = 'l', long)]
        language: Option<Language>,

        /// Print the first lines of the document after every step
        #[arg(long)]
        preview: bool,

        /// Steps to apply in order: strip, filter, count-stats, count, undo
        #[arg(required = true)]
        steps: Vec<Step>,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current settings
    Show,
    /// Set the default language
    Language { language: Language },
    /// Bind a filter word list to a language
    Filter { language: Language, path: PathBuf },
    /// Bind a tagger command to a language
    Tagger { language: Language, path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Apply(Operation),
    Undo,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Apply(op) => fmt::Display::fmt(op, f),
            Step::Undo => f.write_str("undo"),
        }
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "undo" => Ok(Step::Undo),
            _ => s.parse().map(Step::Apply).map_err(|_| {
                format!(
                    "unknown step '{}' (expected strip, filter, count-stats, count or undo)",
                    s
                )
            }),
        }
    }
}

/// Options for [`run`].
struct RunConfig<'a> {
    input: &'a Path,
    output: Option<&'a Path>,
    language: Option<Language>,
    preview: bool,
    steps: &'a [Step],
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(&cli.config)
        .with_context(|| format!("Failed to load settings from {}", cli.config.display()))?;

    match &cli.command {
        Command::Run {
            input,
            output,
            language,
            preview,
            steps,
        } => {
            let config = RunConfig {
                input,
                output: output.as_deref(),
                language: *language,
                preview: *preview,
                steps,
            };
            let mut session = Session::new(settings, &cli.tmp_dir);
            let result = run(&mut session, &config).await;
            let saved = save_settings(session.settings(), &cli.config);
            result.and(saved)
        }
        Command::Config { action } => configure(settings, action.as_ref(), &cli.config),
    }
}

/// Apply every step, then export. Stops quietly after a cancellation.
async fn run(session: &mut Session, config: &RunConfig<'_>) -> Result<()> {
    if let Some(language) = config.language {
        session.set_language(language);
    }
    session
        .load(config.input)
        .with_context(|| format!("Failed to read {}", config.input.display()))?;

    let canceller = session.canceller();
    let stop = CancellationToken::new();
    let interrupt = tokio::spawn({
        let stop = stop.clone();
        async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                stop.cancel();
                canceller.cancel();
            }
        }
    });
    let result = run_steps(session, config, &stop).await;
    interrupt.abort();
    result
}

/// Apply the steps in order. Once `stop` is set, nothing else is started.
async fn run_steps(
    session: &mut Session,
    config: &RunConfig<'_>,
    stop: &CancellationToken,
) -> Result<()> {
    if config.preview {
        print_preview(session, "loaded")?;
    }

    for step in config.steps {
        if stop.is_cancelled() {
            eprintln!("interrupted before {}; remaining steps skipped", step);
            return Ok(());
        }
        match step {
            Step::Apply(operation) => {
                let outcome = session
                    .apply(*operation)
                    .await
                    .with_context(|| format!("{} failed", operation))?;
                if outcome.is_cancelled() {
                    eprintln!("{} cancelled; remaining steps skipped", operation);
                    return Ok(());
                }
            }
            Step::Undo => {
                if !session.can_undo() {
                    tracing::warn!("nothing to undo");
                    continue;
                }
                session.undo();
            }
        }
        if config.preview {
            print_preview(session, &step.to_string())?;
        }
    }

    if let Some(output) = config.output {
        if stop.is_cancelled() {
            eprintln!("interrupted; {} not saved", output.display());
            return Ok(());
        }
        let outcome = session
            .export(output)
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;
        if let Outcome::Cancelled = outcome {
            eprintln!("save cancelled");
        }
    }
    Ok(())
}

fn print_preview(session: &Session, label: &str) -> Result<()> {
    let preview = session.preview().context("Failed to load preview")?;
    println!("== {}", label);
    print!("{}", preview);
    Ok(())
}

fn configure(
    mut settings: Settings,
    action: Option<&ConfigAction>,
    config_path: &Path,
) -> Result<()> {
    match action {
        None | Some(ConfigAction::Show) => {
            print!("{}", settings.render());
            return Ok(());
        }
        Some(ConfigAction::Language { language }) => settings.last_used_language = *language,
        Some(ConfigAction::Filter { language, path }) => {
            settings.filters.insert(*language, absolute(path)?);
        }
        Some(ConfigAction::Tagger { language, path }) => {
            settings.taggers.insert(*language, path.clone());
        }
    }
    save_settings(&settings, config_path)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Failed to resolve {}", path.display()))
}

fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    settings
        .save(path)
        .with_context(|| format!("Failed to save settings to {}", path.display()))
}
