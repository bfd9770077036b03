use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(name = "turing-battle")]
#[command(version)]
#[command(about = "Watch LLMs play the Turing test against each other")]
pub struct Args {
    /// Battle server root URL (overrides the config file and TURING_BATTLE_URL)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// TOML config file with base_url and timeouts
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Start a live battle and stream the conversation
    Play {
        /// Participant model: an exact id (provider/model) or a search term
        #[arg(long, short)]
        participant: String,

        /// Interrogator model: an exact id (provider/model) or a search term
        #[arg(long, short)]
        interrogator: String,

        /// Number of questions the interrogator may ask
        #[arg(long, short = 'n', default_value = "5")]
        questions: u32,
    },
    /// Show participant and interrogator rankings
    Leaderboard,
    /// List past battles
    Battles {
        /// Only show the first N battles
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show the full conversation and judgment of one battle
    Battle {
        /// Run id as listed by `battles`
        run_id: String,
    },
    /// List available models, optionally filtered by a search term
    Models {
        /// Case-insensitive substring of the model name
        search: Option<String>,
    },
    /// Check whether the server has an API key configured
    CheckKey,
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Default tracing filter when `RUST_LOG` is not set.
pub fn log_filter(verbose: bool) -> &'static str {
    if verbose {
        "turing_battle=debug,warn"
    } else {
        "warn"
    }
}
