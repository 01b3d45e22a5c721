//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use council_domain::{CouncilMember, SynthesisStrategy, TicketStatus};
use std::path::PathBuf;

/// Output format for council results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable answer (or escalation notice)
    Text,
    /// JSON outcome, including every round
    Json,
}

/// CLI arguments for model-council
#[derive(Parser, Debug)]
#[command(name = "model-council")]
#[command(author, version, about = "Model council - independent models agree or escalate")]
#[command(long_about = r#"
Model Council sends a question to several independent models and only
answers when enough of them agree.

Each round, every member answers in parallel. Answers are compared
pairwise; if a large enough cluster agrees, the cluster's answer is
synthesized. Otherwise members see the disagreement and try again. When
the round budget runs out without agreement, the request is escalated to
a human reviewer as a ticket.

Configuration files are loaded from (in priority order):
1. --config <path>     Explicit config file
2. ./council.toml      Project-level config (or ./.council.toml)
3. ~/.config/model-council/config.toml   Global config
Environment variables MODEL_COUNCIL_<SECTION>__<KEY> override all files.

Example:
  model-council "Is this migration safe to run online?"
  model-council -m gpt=openai -m claude=anthropic:1.5 --strategy weighted "..."
  model-council tickets list --status pending
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// The question to ask the council
    pub question: Option<String>,

    /// Council members as id=backend[:weight] (replaces configured members)
    #[arg(short, long = "member", value_name = "ID=BACKEND[:WEIGHT]", value_parser = parse_member)]
    pub members: Vec<CouncilMember>,

    /// Synthesis strategy: majority, weighted or moderator
    #[arg(short, long, value_parser = parse_strategy)]
    pub strategy: Option<SynthesisStrategy>,

    /// Member composing the answer under the moderator strategy
    #[arg(long, value_name = "ID")]
    pub moderator: Option<String>,

    /// Maximum number of rounds before escalating
    #[arg(long, value_name = "N")]
    pub max_rounds: Option<u32>,

    /// Request id to use instead of a generated one
    #[arg(long, value_name = "ID")]
    pub request_id: Option<String>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Show every round in text output
    #[arg(long)]
    pub show_rounds: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory for daily-rotated log files
    #[arg(long, value_name = "DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect and resolve escalation tickets
    Tickets {
        #[command(subcommand)]
        action: TicketsCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum TicketsCommand {
    /// List tickets, newest last
    List {
        /// Only tickets with this status (pending, resolved, rate_limited)
        #[arg(long, value_parser = parse_status)]
        status: Option<TicketStatus>,

        /// Print tickets as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a reviewer's resolution for a pending ticket
    Resolve {
        /// Ticket id
        ticket_id: String,

        /// Who resolved the ticket
        #[arg(long)]
        reviewer: String,

        /// The reviewer's answer or decision
        #[arg(long)]
        resolution: String,
    },
}

fn parse_member(s: &str) -> Result<CouncilMember, String> {
    s.parse::<CouncilMember>().map_err(|e| e.to_string())
}

fn parse_strategy(s: &str) -> Result<SynthesisStrategy, String> {
    s.parse::<SynthesisStrategy>().map_err(|e| e.to_string())
}

fn parse_status(s: &str) -> Result<TicketStatus, String> {
    s.parse::<TicketStatus>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_question_with_members() {
        let cli = Cli::try_parse_from([
            "model-council",
            "-m",
            "gpt=openai",
            "--member",
            "claude=anthropic:1.5",
            "--strategy",
            "weighted",
            "-o",
            "json",
            "Is it safe?",
        ])
        .unwrap();

        assert_eq!(cli.question.as_deref(), Some("Is it safe?"));
        assert_eq!(cli.members.len(), 2);
        assert_eq!(cli.members[1].backend, "anthropic");
        assert_eq!(cli.members[1].weight, 1.5);
        assert_eq!(cli.strategy, Some(SynthesisStrategy::Weighted));
        assert_eq!(cli.output, Some(OutputFormat::Json));
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_invalid_member_is_rejected() {
        assert!(Cli::try_parse_from(["model-council", "-m", "no-backend", "q"]).is_err());
        assert!(Cli::try_parse_from(["model-council", "-m", "a=b:-1", "q"]).is_err());
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        assert!(Cli::try_parse_from(["model-council", "--strategy", "vote", "q"]).is_err());
    }

    #[test]
    fn test_tickets_list() {
        let cli =
            Cli::try_parse_from(["model-council", "tickets", "list", "--status", "pending"]).unwrap();
        match cli.command {
            Some(Command::Tickets {
                action: TicketsCommand::List { status, json },
            }) => {
                assert_eq!(status, Some(TicketStatus::Pending));
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_tickets_resolve_requires_reviewer() {
        assert!(Cli::try_parse_from(["model-council", "tickets", "resolve", "t-1"]).is_err());

        let cli = Cli::try_parse_from([
            "model-council",
            "tickets",
            "resolve",
            "t-1",
            "-v",
            "--reviewer",
            "ops",
            "--resolution",
            "use plan B",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(matches!(
            cli.command,
            Some(Command::Tickets {
                action: TicketsCommand::Resolve { .. }
            })
        ));
    }
}
