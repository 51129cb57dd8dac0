//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use table_domain::{AdjudicationKind, OutputFormat};

/// Output format for turn results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputArg {
    /// Colored summary of the turn
    Text,
    /// The full turn result as JSON
    Json,
}

impl From<OutputArg> for OutputFormat {
    fn from(arg: OutputArg) -> Self {
        match arg {
            OutputArg::Text => OutputFormat::Text,
            OutputArg::Json => OutputFormat::Json,
        }
    }
}

/// What kind of input the game master hands back at adjudication
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResumeKind {
    Ruling,
    DiceResult,
    /// Apply the ruling, finish the turn and end the session
    EndSession,
}

impl From<ResumeKind> for AdjudicationKind {
    fn from(kind: ResumeKind) -> Self {
        match kind {
            ResumeKind::Ruling => AdjudicationKind::Ruling,
            ResumeKind::DiceResult => AdjudicationKind::DiceResult,
            ResumeKind::EndSession => AdjudicationKind::EndSession,
        }
    }
}

/// CLI arguments for quorum-table
#[derive(Parser, Debug)]
#[command(name = "quorum-table")]
#[command(
    author,
    version,
    about = "Turn-based table sessions for paired strategic and role-play agents"
)]
#[command(long_about = r#"
quorum-table runs turns of a tabletop session played by agents.

Every participant is two agents: a strategic player who discusses plans
out of character, and a character who acts in the fiction. A turn runs
from the game master's narration through discussion, intent, action and
validation, then stops for the game master's ruling.

Configuration files are loaded from (in priority order):
1. --config <path>     Explicit config file
2. ./table.toml        Project-level config
3. ~/.config/quorum-table/config.toml   Global config
4. QUORUM_TABLE_* environment variables

Example:
  quorum-table start
  quorum-table turn -s 1 "A troll blocks the bridge."
  quorum-table resume -s 1 "The troll staggers back."
  quorum-table resume -s 1 --kind dice-result "d20: 17"
  quorum-table quit -s 1
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output format (overrides `[output] format`)
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputArg>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress lines
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a new session and print its number
    Start,
    /// Narrate and run a turn up to the game master's ruling
    Turn(TurnArgs),
    /// Hand the ruling back and finish the suspended turn
    Resume(ResumeArgs),
    /// End a session at its last committed phase
    Quit(SessionArg),
    /// Show where a session stands
    Status(SessionArg),
    /// Inspect the effective configuration
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct SessionArg {
    /// Session number
    #[arg(short, long, default_value_t = 1)]
    pub session: u64,
}

#[derive(Args, Debug)]
pub struct TurnArgs {
    #[command(flatten)]
    pub session: SessionArg,

    /// Turn number (defaults to the session's current turn)
    #[arg(short, long)]
    pub turn: Option<u64>,

    /// Narration opening the turn; `-` reads it from stdin
    pub narration: String,
}

#[derive(Args, Debug)]
pub struct ResumeArgs {
    #[command(flatten)]
    pub session: SessionArg,

    #[arg(short, long, value_enum, default_value = "ruling")]
    pub kind: ResumeKind,

    /// The ruling, dice result or closing words; `-` reads it from stdin
    pub data: String,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// List the configuration sources in priority order
    #[arg(long)]
    pub sources: bool,

    /// Check the configuration and exit non-zero on errors
    #[arg(long)]
    pub validate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_turn() {
        let cli =
            Cli::try_parse_from(["quorum-table", "-vv", "turn", "-s", "3", "A troll appears."])
                .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Turn(args) => {
                assert_eq!(args.session.session, 3);
                assert_eq!(args.turn, None);
                assert_eq!(args.narration, "A troll appears.");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_resume_kind() {
        let cli = Cli::try_parse_from([
            "quorum-table",
            "resume",
            "--kind",
            "end-session",
            "The troll flees.",
            "-o",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.output, Some(OutputArg::Json));
        match cli.command {
            Command::Resume(args) => {
                assert_eq!(args.session.session, 1);
                assert_eq!(AdjudicationKind::from(args.kind), AdjudicationKind::EndSession);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_start() {
        let cli = Cli::try_parse_from(["quorum-table", "start", "-o", "json"]).unwrap();
        assert!(matches!(cli.command, Command::Start));
    }

    #[test]
    fn test_turn_requires_narration() {
        assert!(Cli::try_parse_from(["quorum-table", "turn"]).is_err());
    }
}
