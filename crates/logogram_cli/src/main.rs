//! Command-line front end for the logogram engine.
//!
//! # Responsibility
//! - Map flags and an optional JSON config onto `EngineConfig`.
//! - Run one generation or archive command, print the result, exit non-zero
//!   on failure.

use clap::{Args, Parser, Subcommand};
use log::error;
use logogram_core::{
    default_log_level, init_logging, render_grapheme, CompositionMode, EngineConfig,
    GenerateRequest, LogogramEngine, ParameterVector,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "logogram")]
#[command(version, about = "Render phrases as deterministic circular logograms")]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    engine: EngineArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct EngineArgs {
    /// JSON config file; flags below override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database for graphemes (in-memory when omitted)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Directory for standalone grapheme SVGs
    #[arg(long, global = true)]
    grapheme_archive_dir: Option<PathBuf>,

    /// Directory for composed logogram SVGs
    #[arg(long, global = true)]
    logogram_archive_dir: Option<PathBuf>,

    /// Absolute directory for rotated log files
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a logogram for a phrase
    Generate {
        /// Phrase text; composite mode splits clauses on newlines
        phrase: String,

        /// single|composite|blend
        #[arg(long, default_value = "single")]
        mode: CompositionMode,

        /// Second phrase for blend mode
        #[arg(long)]
        secondary: Option<String>,

        /// Share of the secondary phrase, within [0, 1]; 0 shows the primary only
        #[arg(long)]
        weight: Option<f64>,

        /// Pin layout jitter to this seed
        #[arg(long)]
        seed: Option<u32>,

        /// Parameter vector as JSON, e.g. '{"certainty":0.9}'
        #[arg(long)]
        params: Option<String>,

        /// Write the SVG here instead of stdout
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Print the stored grapheme SVG for a word
    Show {
        word: String,
    },

    /// Re-archive every stored grapheme
    ArchiveAll,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_run module=cli status=error error={message}");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let config = load_config(&cli.engine)?;
    if let Some(log_dir) = &config.log_dir {
        let level = config.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir)?;
    }
    let engine = LogogramEngine::open(&config).map_err(|err| err.to_string())?;

    match cli.command {
        Command::Generate {
            phrase,
            mode,
            secondary,
            weight,
            seed,
            params,
            out,
        } => {
            let parameters = match params {
                Some(json) => serde_json::from_str(&json)
                    .map_err(|err| format!("invalid --params JSON: {err}"))?,
                None => ParameterVector::default(),
            };
            let request = GenerateRequest {
                mode,
                secondary_phrase: secondary,
                blend_weight: weight,
                composition_seed: seed,
                ..GenerateRequest::single(phrase).with_parameters(parameters)
            };
            let response = engine.generate(&request).map_err(|err| err.to_string())?;
            match out {
                Some(path) => std::fs::write(&path, &response.svg_document)
                    .map_err(|err| format!("failed to write `{}`: {err}", path.display()))?,
                None => println!("{}", response.svg_document),
            }
            eprintln!(
                "logogram_id={} tokens={} archived={}",
                response.logogram_id,
                response.tokens.join(","),
                response.archived
            );
        }
        Command::Show { word } => {
            let grapheme = engine
                .store()
                .get(&word)
                .map_err(|err| err.to_string())?
                .ok_or_else(|| format!("no grapheme stored for `{}`", word.trim()))?;
            println!("{}", render_grapheme(&grapheme));
        }
        Command::ArchiveAll => {
            let report = engine
                .store()
                .archive_all()
                .map_err(|err| err.to_string())?;
            println!("archived={} failed={}", report.archived, report.failed);
        }
    }
    Ok(())
}

fn load_config(args: &EngineArgs) -> Result<EngineConfig, String> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path).map_err(|err| err.to_string())?,
        None => EngineConfig::default(),
    };
    if args.db.is_some() {
        config.database_path = args.db.clone();
    }
    if args.grapheme_archive_dir.is_some() {
        config.grapheme_archive_dir = args.grapheme_archive_dir.clone();
    }
    if args.logogram_archive_dir.is_some() {
        config.logogram_archive_dir = args.logogram_archive_dir.clone();
    }
    if args.log_dir.is_some() {
        config.log_dir = args.log_dir.clone();
    }
    if args.log_level.is_some() {
        config.log_level = args.log_level.clone();
    }
    config.validate().map_err(|err| err.to_string())?;
    Ok(config)
}
