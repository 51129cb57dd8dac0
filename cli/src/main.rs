//! CLI entrypoint for quorum-table
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod commands;
mod output;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use colored::Colorize;
use commands::{Cli, Command, ConfigArgs, ResumeArgs, TurnArgs};
use output::{ConsoleFormatter, SimpleProgress};
use std::path::Path;
use std::sync::Arc;
use table_application::{
    NoProgress, RunTurnUseCase, SessionRepository, TurnCycleInput, TurnProgressNotifier,
};
use table_domain::{AdjudicationInput, OutputFormat, Severity, TurnResult};
use table_infrastructure::{
    ConfigLoader, FileConfig, FileLoggingConfig, JsonFileMemoryStore, JsonFileSessionRepository,
    JsonlConversationLogger, ProcessAgentGateway,
};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_logging(cli.verbose, &config.logging)?;
    if !config.output.color {
        colored::control::set_override(false);
    }

    let format = config
        .output
        .effective_format(cli.output.map(OutputFormat::from));

    match cli.command {
        Command::Config(args) => run_config(&config, cli.config.as_deref(), &args),
        Command::Start => {
            let table = Table::assemble(&config, None).await?;
            let session = table.use_case.start_session().await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::json!({ "session": session })),
                OutputFormat::Text => println!("{} session {}", "started".green(), session),
            }
            Ok(())
        }
        Command::Turn(args) => {
            let table = Table::assemble(&config, Some(args.session.session)).await?;
            let progress = progress_for(cli.quiet, format);
            let result = table.turn(args, progress.as_ref()).await?;
            print_result(&result, format);
            Ok(())
        }
        Command::Resume(args) => {
            let table = Table::assemble(&config, Some(args.session.session)).await?;
            let progress = progress_for(cli.quiet, format);
            let result = table.resume(args, progress.as_ref()).await?;
            print_result(&result, format);
            Ok(())
        }
        Command::Quit(args) => {
            let table = Table::assemble(&config, Some(args.session)).await?;
            let result = table.use_case.teardown(args.session).await?;
            print_result(&result, format);
            Ok(())
        }
        Command::Status(args) => {
            let table = Table::assemble(&config, Some(args.session)).await?;
            let state = table.use_case.status(args.session).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&state)?),
                OutputFormat::Text => print!("{}", ConsoleFormatter::format_status(&state)),
            }
            Ok(())
        }
    }
}

/// Initialize tracing: `-v` count wins, then `logging.level`, then `RUST_LOG`.
fn init_logging(verbose: u8, logging: &FileLoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => match &logging.level {
            Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn")),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        },
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let (file_layer, stderr_layer, guard) = match &logging.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "quorum-table.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), None, Some(guard))
        }
        None => {
            let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
            (None, Some(layer), None)
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Ok(guard)
}

fn progress_for(quiet: bool, format: OutputFormat) -> Box<dyn TurnProgressNotifier> {
    if quiet || format == OutputFormat::Json {
        Box::new(NoProgress)
    } else {
        Box::new(SimpleProgress)
    }
}

fn print_result(result: &TurnResult, format: OutputFormat) {
    let output = match format {
        OutputFormat::Text => ConsoleFormatter::format(result),
        OutputFormat::Json => ConsoleFormatter::format_json(result),
    };
    println!("{}", output);
}

/// Read `text`, or stdin when it is `-`
async fn read_text(text: String) -> Result<String> {
    if text != "-" {
        return Ok(text);
    }
    let mut buffer = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buffer)
        .await
        .context("Failed to read from stdin")?;
    Ok(buffer.trim().to_string())
}

fn run_config(config: &FileConfig, path: Option<&Path>, args: &ConfigArgs) -> Result<()> {
    if args.sources {
        println!("Configuration sources (highest priority first):");
        for line in ConfigLoader::describe_sources(path) {
            println!("  {}", line);
        }
        return Ok(());
    }

    if args.validate {
        let issues = config.validate();
        if issues.is_empty() {
            println!("{} configuration is valid", "v".green());
            return Ok(());
        }
        for issue in &issues {
            match issue.severity {
                Severity::Error => println!("{} {}", "error:".red().bold(), issue),
                Severity::Warning => println!("{} {}", "warning:".yellow().bold(), issue),
            }
        }
        if issues.iter().any(|i| i.is_error()) {
            bail!("Configuration has errors");
        }
        return Ok(());
    }

    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Wired-up engine for one session
struct Table {
    use_case: RunTurnUseCase<ProcessAgentGateway>,
    sessions: Arc<JsonFileSessionRepository>,
    config: FileConfig,
}

impl Table {
    /// Wire the engine; `session` selects the transcript file, if any.
    async fn assemble(config: &FileConfig, session: Option<u64>) -> Result<Self> {
        let issues = config.validate();
        for issue in &issues {
            warn!("Config: {}", issue);
        }
        let errors: Vec<String> = issues
            .iter()
            .filter(|i| i.is_error())
            .map(|i| i.to_string())
            .collect();
        if !errors.is_empty() {
            bail!("Invalid configuration:\n  {}", errors.join("\n  "));
        }

        // Issues were reported above
        let (engine, _) = config.to_engine_config();

        // === Dependency Injection ===
        let dir = config.storage.session_dir();
        let sessions = Arc::new(JsonFileSessionRepository::new(&dir));
        let mut memory = JsonFileMemoryStore::in_dir(&dir)
            .await
            .context("Failed to open the memory store")?
            .with_summary_len(engine.summary_len);
        for participant in &config.participants {
            let agent = participant.to_participant().character.id;
            memory = memory.with_facts(agent, participant.facts.clone());
        }
        let memory = Arc::new(memory);
        let gateway = Arc::new(ProcessAgentGateway::from_participants(&config.participants));

        // Ctrl-C tears the session down at the next phase boundary
        let token = CancellationToken::new();
        let on_interrupt = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });

        let mut use_case = RunTurnUseCase::new(gateway, memory, sessions.clone())
            .with_config(engine)
            .with_cancellation(token);

        if config.logging.transcript
            && let Some(session) = session
        {
            let dir = config.logging.transcript_dir(&config.storage);
            if let Some(logger) = JsonlConversationLogger::for_session(&dir, session) {
                info!("Transcript: {}", logger.path().display());
                use_case = use_case.with_logger(Arc::new(logger));
            }
        }

        Ok(Self {
            use_case,
            sessions,
            config: config.clone(),
        })
    }

    async fn turn(
        &self,
        args: TurnArgs,
        progress: &dyn TurnProgressNotifier,
    ) -> Result<TurnResult> {
        let session = args.session.session;
        let turn = match args.turn {
            Some(turn) => turn,
            None => self
                .sessions
                .load(session)
                .await?
                .map(|state| state.turn)
                .unwrap_or(1),
        };
        let narration = read_text(args.narration).await?;
        if narration.is_empty() {
            bail!("Narration must not be empty");
        }

        let input = TurnCycleInput::new(session, turn, narration)
            .with_participants(self.config.participants());
        Ok(self
            .use_case
            .execute_turn_cycle_with_progress(input, progress)
            .await?)
    }

    async fn resume(
        &self,
        args: ResumeArgs,
        progress: &dyn TurnProgressNotifier,
    ) -> Result<TurnResult> {
        let data = read_text(args.data).await?;
        let input = AdjudicationInput::new(args.kind.into(), data);
        Ok(self
            .use_case
            .resume_turn_with_input_with_progress(args.session.session, input, progress)
            .await?)
    }
}
