use std::path::Path;

use clap::{Parser, Subcommand};

use phrasal_cli::commands::decode_ops::OutputMode;
use phrasal_cli::commands::{chart_ops, config_ops, decode_ops, feature_ops};

#[derive(Parser)]
#[command(name = "phrasal", about = "Phrase-based translation decoder")]
struct Cli {
    /// Write JSON-lines traces to this directory (requires --features trace)
    #[arg(long, global = true)]
    trace_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Translate sentences read from stdin, one per line
    Decode {
        /// Moses-format phrase table
        #[arg(long)]
        table: String,
        /// ARPA language model
        #[arg(long)]
        lm: String,
        /// TOML weight file (default: every weight 1.0)
        #[arg(long)]
        weights: Option<String>,
        /// Settings TOML overriding the built-in defaults
        #[arg(long)]
        config: Option<String>,
        /// Print the per-step score breakdown before each line
        #[arg(long, conflicts_with = "json")]
        verbose: bool,
        /// Output one JSON object per sentence
        #[arg(long)]
        json: bool,
    },
    /// Show the candidate phrases of every span of a sentence
    Chart {
        /// Moses-format phrase table
        #[arg(long)]
        table: String,
        /// ARPA language model
        #[arg(long)]
        lm: String,
        /// TOML weight file
        #[arg(long)]
        weights: Option<String>,
        /// Source sentence
        sentence: String,
        /// Output as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// List the dense feature dimensions and their weights
    Features {
        /// Moses-format phrase table
        #[arg(long)]
        table: String,
        /// ARPA language model
        #[arg(long)]
        lm: String,
        /// TOML weight file
        #[arg(long)]
        weights: Option<String>,
        /// Output as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Export default settings as TOML
    SettingsExport,
    /// Validate a custom settings TOML file
    SettingsValidate {
        /// Path to the TOML file
        file: String,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Some(dir) = &cli.trace_dir {
        phrasal::trace_init::init_tracing(Path::new(dir));
    }

    match cli.command {
        Command::Decode {
            table,
            lm,
            weights,
            config,
            verbose,
            json,
        } => {
            let mode = if json {
                OutputMode::Json
            } else if verbose {
                OutputMode::Verbose
            } else {
                OutputMode::Plain
            };
            decode_ops::decode_cmd(&table, &lm, weights.as_deref(), config.as_deref(), mode);
        }
        Command::Chart {
            table,
            lm,
            weights,
            sentence,
            json,
        } => chart_ops::chart_cmd(&table, &lm, weights.as_deref(), &sentence, json),
        Command::Features {
            table,
            lm,
            weights,
            json,
        } => feature_ops::features_cmd(&table, &lm, weights.as_deref(), json),
        Command::SettingsExport => config_ops::settings_export(),
        Command::SettingsValidate { file } => config_ops::settings_validate(&file),
    }
}
