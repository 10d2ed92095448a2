use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

#[derive(Parser)]
#[command(
    name = "chronopersona",
    about = "Per-user persona inference and system prompt composition",
    version,
    after_help = "Logs are written to: ~/.local/share/chronopersona/logs/chronopersona.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to chronopersona.yaml config file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the config file and template directories
    Init {
        /// Overwrite existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Chat as a user, one message per line on stdin (`!` lines are commands)
    Session {
        /// User id the messages come from
        #[arg(long, short)]
        user: String,
    },

    /// Run a single message through the pipeline
    Send {
        /// User id
        user: String,

        /// Message text
        #[arg(trailing_var_arg = true, required = true)]
        message: Vec<String>,
    },

    /// Print the composed system prompt for a user
    Prompt {
        /// User id
        user: String,
    },

    /// List persona templates
    Templates {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Select the template a user's prompt is built from
    Use {
        /// User id
        user: String,

        /// Template role
        template: String,
    },

    /// Show the traits learned for a user
    Traits {
        /// User id
        user: String,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Forget everything learned about a user
    Reset {
        /// User id
        user: String,
    },

    /// Extract trait tags and keywords from text without storing them
    Analyze {
        /// Text to analyze
        #[arg(trailing_var_arg = true, required = true)]
        text: Vec<String>,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Reset personas not updated for a while
    Prune {
        /// Maximum age in days (0-36500)
        #[arg(long, default_value = "30", value_parser = clap::value_parser!(u32).range(..=36500))]
        max_age_days: u32,

        /// Show what would be reset without changing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Print the resolved storage paths
    Paths,
}
