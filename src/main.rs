//! ipv6-sentry - IPv6 health daemon
//!
//! # Usage
//!
//! ```bash
//! # Run the daemon (periodic + path-change checks, HTTP status API)
//! ipv6-sentry
//!
//! # One-shot check, repairing if needed
//! ipv6-sentry check --fix
//!
//! # Explicit config, observe only
//! ipv6-sentry --config /etc/ipv6_sentry.toml --no-auto-fix
//! ```
//!
//! # Environment Variables
//!
//! - `IPV6_SENTRY_CONFIG`: Path to the TOML config file
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use ipv6_sentry::acquisition::HttpsProbe;
use ipv6_sentry::api::{create_app, ApiState};
use ipv6_sentry::background::{run_path_trigger, PathMonitor, PeriodicChecker};
use ipv6_sentry::pipeline::{ActivityLog, CheckCoordinator, CoordinatorSettings, Trigger};
use ipv6_sentry::platform::{self, SystemOps};
use ipv6_sentry::storage::{MemoryPreferences, PreferenceStore, ProcessLock, SledPreferences};
use ipv6_sentry::SentryConfig;

/// Time allowed for in-flight checks (and any repair) to finish on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "ipv6-sentry")]
#[command(about = "IPv6 health monitor and router-advertisement loss repair")]
#[command(version)]
struct CliArgs {
    /// Path to the TOML config (overrides IPV6_SENTRY_CONFIG and ./ipv6_sentry.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the HTTP status API address (default: "127.0.0.1:8787")
    #[arg(short, long)]
    addr: Option<String>,

    /// Observe and report only; never reconfigure the interface
    #[arg(long)]
    no_auto_fix: bool,

    /// Keep preferences in memory instead of the sled database
    #[arg(long)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Run the daemon (default)
    Run,
    /// Run a single check, print the verdict and exit
    Check {
        /// Repair if the check recommends it
        #[arg(long)]
        fix: bool,
    },
}

// ============================================================================
// Task Supervision
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
    StartupCheck,
    PeriodicChecks,
    PathMonitor,
    PathTrigger,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::HttpServer => write!(f, "HttpServer"),
            TaskName::StartupCheck => write!(f, "StartupCheck"),
            TaskName::PeriodicChecks => write!(f, "PeriodicChecks"),
            TaskName::PathMonitor => write!(f, "PathMonitor"),
            TaskName::PathTrigger => write!(f, "PathTrigger"),
        }
    }
}

/// Everything the daemon and the one-shot check share.
struct Engine {
    config: SentryConfig,
    system: Arc<dyn SystemOps>,
    prefs: Arc<dyn PreferenceStore>,
    coordinator: Arc<CheckCoordinator>,
    _lock: ProcessLock,
}

fn load_config(args: &CliArgs) -> Result<SentryConfig> {
    let mut config = match &args.config {
        Some(path) => SentryConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SentryConfig::load(),
    };
    if let Some(addr) = &args.addr {
        config.server.addr = addr.clone();
    }
    if args.no_auto_fix {
        config.repair.auto_fix = false;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn init_engine(config: SentryConfig, ephemeral: bool) -> Result<Engine> {
    let lock = ProcessLock::acquire(&config.storage.data_dir)?;

    let prefs: Arc<dyn PreferenceStore> = if ephemeral {
        info!("Preferences: in-memory (not persisted)");
        Arc::new(MemoryPreferences::new())
    } else {
        let path = config.storage.preferences_path();
        Arc::new(
            SledPreferences::open(&path)
                .with_context(|| format!("Failed to open preference store at {}", path.display()))?,
        )
    };

    let system = platform::detect();
    info!(backend = system.backend_name(), prefs = prefs.backend_name(), "Platform initialized");

    let probe = HttpsProbe::new(
        config.probe.targets.clone(),
        Arc::clone(&system),
        config.probe.echo_host.clone(),
        config.probe.echo_count,
    )
    .context("Failed to build HTTPS client")?;

    let log = Arc::new(ActivityLog::new(config.log.max_entries));
    let coordinator = Arc::new(CheckCoordinator::new(
        CoordinatorSettings::from_config(&config),
        Arc::clone(&system),
        Arc::new(probe),
        Arc::clone(&prefs),
        log,
    ));

    info!(
        primary = %coordinator.settings().primary,
        secondary = %coordinator.settings().secondary,
        auto_fix = coordinator.auto_fix_enabled(),
        "Engine ready"
    );

    Ok(Engine {
        config,
        system,
        prefs,
        coordinator,
        _lock: lock,
    })
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    let no_auto_fix = args.no_auto_fix;
    let engine = init_engine(config, args.ephemeral)?;

    if no_auto_fix {
        engine.coordinator.override_auto_fix(false);
    }

    let result = match args.command {
        Some(SubCommand::Check { fix }) => run_once(&engine, fix && !no_auto_fix).await,
        Some(SubCommand::Run) | None => run_daemon(&engine).await,
    };

    if let Err(e) = engine.prefs.flush() {
        warn!(error = %e, "Failed to flush preferences");
    }
    result
}

/// One-shot check for the `check` subcommand.
async fn run_once(engine: &Engine, fix: bool) -> Result<()> {
    if fix {
        engine.coordinator.override_auto_fix(true);
    }
    let outcome = engine.coordinator.check(Trigger::Manual, fix).await;
    let status = engine.coordinator.status();

    println!("{}", status.verdict);
    if let Some(repair) = &status.last_repair_outcome {
        println!("last repair: {repair}");
    }
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn run_daemon(engine: &Engine) -> Result<()> {
    info!("ipv6-sentry {} starting", env!("CARGO_PKG_VERSION"));

    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();
    let schedule = &engine.config.schedule;

    if engine.config.server.enabled {
        let addr = engine.config.server.addr.clone();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind to {addr}"))?;
        info!("HTTP status API listening on http://{addr}");
        let app = create_app(ApiState::new(
            Arc::clone(&engine.coordinator),
            Arc::clone(&engine.prefs),
        ));
        spawn_http_server(&mut task_set, listener, app, cancel_token.clone());
    } else {
        info!("HTTP status API disabled");
    }

    let coordinator = Arc::clone(&engine.coordinator);
    task_set.spawn(async move {
        let outcome = coordinator.check(Trigger::Startup, true).await;
        info!(?outcome, "Startup check finished");
        Ok(TaskName::StartupCheck)
    });

    let periodic = PeriodicChecker::new(
        Arc::clone(&engine.coordinator),
        Arc::clone(&engine.prefs),
        Duration::from_secs(schedule.interval_secs),
    );
    let token = cancel_token.clone();
    task_set.spawn(async move {
        periodic.run(token).await;
        Ok(TaskName::PeriodicChecks)
    });

    let (path_tx, path_rx) = mpsc::channel(16);
    let settings = engine.coordinator.settings();
    let monitor = PathMonitor::new(
        Arc::clone(&engine.system),
        vec![settings.primary.clone(), settings.secondary.clone()],
        Duration::from_secs(schedule.path_poll_secs),
    );
    let token = cancel_token.clone();
    task_set.spawn(async move {
        monitor.run(path_tx, token).await;
        Ok(TaskName::PathMonitor)
    });

    let coordinator = Arc::clone(&engine.coordinator);
    let delay = Duration::from_secs(schedule.path_change_delay_secs);
    let token = cancel_token.clone();
    task_set.spawn(async move {
        run_path_trigger(coordinator, path_rx, delay, token).await;
        Ok(TaskName::PathTrigger)
    });

    let result = run_supervisor(&mut task_set, cancel_token).await;
    drain_tasks(&mut task_set).await;
    info!("ipv6-sentry shutdown complete");
    result
}

fn spawn_http_server(
    task_set: &mut JoinSet<Result<TaskName>>,
    listener: tokio::net::TcpListener,
    app: axum::Router,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!("[HttpServer] Received shutdown signal");
            })
            .await
            .context("HTTP server error")?;
        Ok(TaskName::HttpServer)
    });
}

/// Monitor tasks, cancel everything on the first failure.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("Supervisor: shutdown signal received");
                return Ok(());
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(task_name))) => {
                        info!("Supervisor: task {} completed", task_name);
                    }
                    Some(Ok(Err(e))) => {
                        error!("Supervisor: task failed: {:#}", e);
                        cancel_token.cancel();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        error!("Supervisor: task panicked: {}", e);
                        cancel_token.cancel();
                        return Err(anyhow::anyhow!("Task panicked: {}", e));
                    }
                    None => {
                        info!("Supervisor: all tasks completed");
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Let checks already running finish; a repair must not be cut short.
async fn drain_tasks(task_set: &mut JoinSet<Result<TaskName>>) {
    let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
        while task_set.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        warn!(grace_secs = SHUTDOWN_GRACE.as_secs(), "Tasks still running at shutdown, aborting");
        task_set.abort_all();
    }
}
