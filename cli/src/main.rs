//! CLI entrypoint for model-council
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod cli;
mod output;
mod progress;

use anyhow::{Context, Result, bail};
use clap::Parser;
use council_application::{
    Embedder, EscalationGate, MetricsSink, ProviderHealthPool, RunCouncilInput, RunCouncilUseCase,
    TicketRepository,
};
use council_domain::{CouncilOutcome, Question, RequestId, TicketId};
use council_infrastructure::config::FileMemberConfig;
use council_infrastructure::{
    CachingEmbedder, ConfigLoader, FileConfig, FileOutputFormat, HttpEmbeddingClient,
    InMemoryTicketRepository, JsonFileTicketRepository, JsonlRoundLogger, RoutingGateway,
    TracingMetricsSink, router_from_config,
};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::cli::{Cli, Command, OutputFormat, TicketsCommand};
use crate::output::ConsoleFormatter;
use crate::progress::ProgressReporter;

/// Exit status when the council escalated instead of answering
const EXIT_ESCALATED: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).context("Failed to load configuration")?
    };

    let log_dir = cli.log_dir.clone().or_else(|| config.logging.dir.clone());
    let _guard = init_logging(cli.verbose, log_dir.as_deref());

    info!("Starting model council");

    if !config.output.color {
        colored::control::set_override(false);
    }

    match &cli.command {
        Some(Command::Tickets { action }) => run_tickets(&config, action).await,
        None => {
            apply_overrides(&cli, &mut config);
            run_question(&cli, &config).await
        }
    }
}

/// Console logging filtered by verbosity (or `RUST_LOG`), plus a daily
/// rotated file when a log directory is configured.
fn init_logging(verbose: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter());

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "model-council.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter());
            tracing_subscriber::registry().with(console).with(file).init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(console).init();
            None
        }
    }
}

/// Command-line flags take precedence over every configuration source
fn apply_overrides(cli: &Cli, config: &mut FileConfig) {
    if !cli.members.is_empty() {
        config.council.members = cli
            .members
            .iter()
            .map(|m| FileMemberConfig {
                id: m.id.to_string(),
                backend: m.backend.clone(),
                weight: m.weight,
                enabled: m.enabled,
            })
            .collect();
    }
    if let Some(strategy) = cli.strategy {
        config.consensus.strategy = strategy.as_str().to_string();
    }
    if let Some(moderator) = &cli.moderator {
        config.council.moderator = Some(moderator.clone());
    }
    if let Some(max_rounds) = cli.max_rounds {
        config.consensus.max_rounds = max_rounds;
    }
}

async fn run_question(cli: &Cli, config: &FileConfig) -> Result<ExitCode> {
    let question = match &cli.question {
        Some(q) => Question::try_new_with_limit(q.as_str(), config.council.max_query_chars)?,
        None => bail!("Question is required. Use `model-council --help` for usage."),
    };

    for issue in config.check()? {
        warn!("{}", issue);
    }

    let metrics: Arc<dyn MetricsSink> = Arc::new(TracingMetricsSink);
    let params = config.council_params();
    let dispatch = config.dispatch_params();

    // === Dependency Injection ===
    let endpoints = config
        .providers
        .iter()
        .map(|(name, provider)| (name.clone(), provider.to_endpoint()));
    let gateway = Arc::new(RoutingGateway::new(
        endpoints,
        dispatch.call_timeout + dispatch.grace,
    )?);

    let pool = Arc::new(
        ProviderHealthPool::with_members(config.health_policy(), params.members.clone())
            .with_metrics(Arc::clone(&metrics)),
    );
    let gate = build_gate(config, Arc::clone(&metrics)).await?;

    let mut use_case = RunCouncilUseCase::new(gateway, pool, Arc::clone(&gate), params, dispatch)
        .with_metrics(Arc::clone(&metrics));

    if let Some(embedder) = build_embedder(config)? {
        use_case = use_case.with_embedder(embedder);
    }
    if let Some(path) = &config.logging.round_log {
        let logger = JsonlRoundLogger::open(path)
            .with_context(|| format!("Failed to open round log {}", path.display()))?;
        use_case = use_case.with_round_logger(Arc::new(logger));
    }

    let mut input = RunCouncilInput::new(question);
    if let Some(id) = &cli.request_id {
        input = input.with_request_id(RequestId::new(id.as_str()));
    }

    let format = cli.output.unwrap_or(match config.output.format {
        Some(FileOutputFormat::Json) => OutputFormat::Json,
        _ => OutputFormat::Text,
    });

    let outcome = if !cli.quiet && format == OutputFormat::Text {
        use_case
            .execute_with_progress(input, &ProgressReporter::new())
            .await?
    } else {
        use_case.execute(input).await?
    };

    if let CouncilOutcome::Escalated(escalation) = &outcome
        && !escalation.persisted
    {
        let stored = gate.retry_unpersisted().await;
        if stored > 0 {
            info!(stored, "Stored tickets on retry");
        } else {
            warn!(ticket = %escalation.ticket.id, "Ticket is held in memory only and will be lost on exit");
        }
    }

    match format {
        OutputFormat::Json => println!("{}", ConsoleFormatter::format_json(&outcome)),
        OutputFormat::Text => {
            let show_rounds = cli.show_rounds || config.output.show_rounds;
            print!("{}", ConsoleFormatter::format(&outcome, show_rounds));
        }
    }

    // Returning drops the runtime, which would cancel deliveries still running
    gate.drain_notifications(config.escalation_params().notify_drain_timeout)
        .await;

    Ok(if outcome.is_synthesized() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_ESCALATED)
    })
}

async fn run_tickets(config: &FileConfig, action: &TicketsCommand) -> Result<ExitCode> {
    let gate = build_gate(config, Arc::new(TracingMetricsSink)).await?;

    match action {
        TicketsCommand::List { status, json } => {
            let tickets = gate.tickets(*status).await?;
            if *json {
                println!("{}", ConsoleFormatter::format_tickets_json(&tickets));
            } else {
                print!("{}", ConsoleFormatter::format_tickets(&tickets));
            }
        }
        TicketsCommand::Resolve {
            ticket_id,
            reviewer,
            resolution,
        } => {
            let ticket = gate
                .resolve(&TicketId::new(ticket_id.as_str()), reviewer, resolution)
                .await?;
            print!("{}", ConsoleFormatter::ticket(&ticket));
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn build_gate(config: &FileConfig, metrics: Arc<dyn MetricsSink>) -> Result<Arc<EscalationGate>> {
    let repository: Arc<dyn TicketRepository> = match config.escalation.resolved_tickets_path() {
        Some(path) => {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            Arc::new(
                JsonFileTicketRepository::open(path.clone())
                    .await
                    .with_context(|| format!("Failed to open ticket store {}", path.display()))?,
            )
        }
        None => Arc::new(InMemoryTicketRepository::new()),
    };

    let router = router_from_config(&config.escalation.channels)?;
    let gate = EscalationGate::new(repository, Arc::new(router), config.escalation_params())
        .with_metrics(metrics);
    let pending = gate.hydrate().await?;
    if pending > 0 {
        info!(pending, "Loaded pending escalation tickets");
    }
    Ok(Arc::new(gate))
}

fn build_embedder(config: &FileConfig) -> Result<Option<Arc<dyn Embedder>>> {
    let settings = &config.embedding;
    if !settings.enabled {
        return Ok(None);
    }
    let client: Arc<dyn Embedder> = Arc::new(HttpEmbeddingClient::new(
        &settings.base_url,
        settings.model.clone(),
        settings.resolve_api_key(),
        Duration::from_secs(settings.timeout_secs),
    )?);
    Ok(Some(if settings.cache {
        Arc::new(CachingEmbedder::new(client))
    } else {
        client
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_domain::SynthesisStrategy;

    #[test]
    fn test_overrides_replace_members_and_policy() {
        let cli = Cli::try_parse_from([
            "model-council",
            "-m",
            "gpt=openai",
            "-m",
            "claude=anthropic:2",
            "--strategy",
            "moderator",
            "--moderator",
            "claude",
            "--max-rounds",
            "5",
            "q",
        ])
        .unwrap();

        let mut config = FileConfig::default();
        config.council.members.push(FileMemberConfig {
            id: "old".to_string(),
            backend: "local".to_string(),
            weight: 1.0,
            enabled: true,
        });
        apply_overrides(&cli, &mut config);

        let params = config.council_params();
        let ids: Vec<&str> = params.members.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["gpt", "claude"]);
        assert_eq!(params.members[1].weight, 2.0);
        assert_eq!(params.strategy, SynthesisStrategy::Moderator);
        assert_eq!(params.moderator.as_ref().map(|m| m.as_str()), Some("claude"));
        assert_eq!(params.consensus.max_rounds, 5);
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let cli = Cli::try_parse_from(["model-council", "q"]).unwrap();
        let mut config = FileConfig::default();
        config.consensus.max_rounds = 4;
        let before = config.clone();
        apply_overrides(&cli, &mut config);
        assert_eq!(config, before);
    }

    #[test]
    fn test_embedder_disabled_by_default() {
        assert!(build_embedder(&FileConfig::default()).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_gate_lists_nothing() {
        let mut config = FileConfig::default();
        config.escalation.in_memory = true;
        let gate = build_gate(&config, Arc::new(TracingMetricsSink)).await.unwrap();
        assert!(gate.tickets(None).await.unwrap().is_empty());
        assert_eq!(gate.pending_count(), 0);
        assert!(gate.drain_notifications(Duration::from_millis(10)).await);
    }
}
