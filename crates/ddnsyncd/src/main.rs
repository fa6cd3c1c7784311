// # ddnsyncd - DNS Sync Daemon
//
// Thin integration layer over ddnsync-core. All reconciliation logic lives
// in the core crate; this binary only:
// 1. Parses flags and loads the configuration file
// 2. Initializes logging and the runtime
// 3. Registers providers and builds the address lookups
// 4. Runs the engine once or on its schedule
//
// ## Flags
//
// Every flag except `--once` can also be set through the environment:
//
// - `--config` / `CONFIG`: Path to the TOML configuration file (required)
// - `--schedule` / `SCHEDULE`: Cron expression, overrides the file
// - `--timezone` / `TZ`: IANA timezone for the schedule and log timestamps
// - `--log-level` / `LOG_LEVEL`: Default filter (`RUST_LOG` takes precedence)
// - `--log-json` / `LOG_JSON`: Emit JSON log lines
// - `--dry-run` / `DRY_RUN`: Read and plan, but never write records
// - `--once`: Single pass even if a schedule is configured
//
// ## Example
//
// ```toml
// schedule = "*/5 * * * *"
// timezone = "Europe/Berlin"
//
// [provider]
// type = "cloudflare"
// api_token_file = "/run/secrets/cloudflare_token"
//
// [[domains]]
// name = "home.example.com"
// record_type = "A"
// ttl = 300
// ```
//
// ```bash
// ddnsyncd --config /etc/ddnsync/config.toml
// ```

use anyhow::{Context, Result};
use chrono_tz::Tz;
use clap::Parser;
use ddnsync_core::{Error, ProviderRegistry, RunMode, RunResult, SyncConfig, SyncEngine};
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown or fully successful single run
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
/// - 3: Single run finished with at least one failed domain
#[derive(Debug, Clone, Copy)]
enum SyncExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
    Degraded = 3,
}

impl From<SyncExitCode> for ExitCode {
    fn from(code: SyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "ddnsyncd",
    version,
    about = "Keep DNS records pointed at this machine's public address"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, env = "CONFIG")]
    config: PathBuf,

    /// Cron expression (5, 6 or 7 fields), overrides the file
    #[arg(long, env = "SCHEDULE")]
    schedule: Option<String>,

    /// IANA timezone for schedule evaluation, overrides the file
    #[arg(long, env = "TZ")]
    timezone: Option<String>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    /// Log intended changes instead of applying them
    #[arg(long, env = "DRY_RUN")]
    dry_run: bool,

    /// Run a single pass and exit
    #[arg(long)]
    once: bool,
}

/// Log timestamps rendered in the configured timezone
struct ZonedTimer(Tz);

impl FormatTime for ZonedTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now().with_timezone(&self.0);
        write!(
            w,
            "{}",
            now.to_rfc3339_opts(chrono::SecondsFormat::Millis, false)
        )
    }
}

/// Load the file, apply flag overrides and pick the run mode
fn load_config(cli: &Cli) -> ddnsync_core::Result<(SyncConfig, Tz, RunMode)> {
    let mut config = SyncConfig::from_file(&cli.config)?;

    if let Some(ref schedule) = cli.schedule {
        config.schedule = Some(schedule.clone());
    }
    if let Some(ref timezone) = cli.timezone {
        config.timezone = timezone.clone();
    }
    if cli.dry_run {
        config.engine.dry_run = true;
    }

    config.validate()?;

    let tz = config.timezone()?;
    let mode = RunMode::select(config.schedule.as_deref(), tz, cli.once)?;
    Ok((config, tz, mode))
}

fn init_tracing(level: &str, json: bool, tz: Tz) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level '{}'", level))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ZonedTimer(tz));

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (config, tz, mode) = match load_config(&cli) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}", e);
            return SyncExitCode::ConfigError.into();
        }
    };

    if let Err(e) = init_tracing(&cli.log_level, cli.log_json, tz) {
        eprintln!("{:#}", e);
        return SyncExitCode::ConfigError.into();
    }

    info!("Starting ddnsyncd {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded from {}: {} domain(s), provider {}",
        cli.config.display(),
        config.domains.len(),
        config.provider.type_name()
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SyncExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run_daemon(config, mode).await {
            Ok(Some(result)) if result.is_degraded() => {
                warn!(
                    "{} of {} domain(s) failed",
                    result.failures().count(),
                    result.outcomes.len()
                );
                SyncExitCode::Degraded
            }
            Ok(_) => SyncExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                match e.downcast_ref::<Error>() {
                    Some(Error::Config(_)) => SyncExitCode::ConfigError,
                    _ => SyncExitCode::RuntimeError,
                }
            }
        }
    });

    code.into()
}

/// Run the daemon
///
/// Returns the run result in single-shot mode, `None` after a clean
/// shutdown in recurring mode.
async fn run_daemon(config: SyncConfig, mode: RunMode) -> Result<Option<RunResult>> {
    let registry = ProviderRegistry::new();

    #[cfg(feature = "cloudflare")]
    {
        info!("Registering Cloudflare provider");
        ddnsync_provider_cloudflare::register(&registry);
    }

    let provider = registry.create_provider(&config.provider)?;
    let resolver = ddnsync_ip_http::resolver_from_config(&config.lookup);
    let engine = SyncEngine::new(resolver, provider, &config)?;

    for domain in engine.domains() {
        info!(
            "Managing record: {} ({}, ttl {})",
            domain.name, domain.record_type, domain.ttl
        );
    }
    if config.engine.dry_run {
        warn!("DRY-RUN mode: records will not be changed");
    }

    match &mode {
        RunMode::Once => info!("Running a single pass"),
        RunMode::Forever(schedule) => info!("Running on schedule {}", schedule),
    }

    let shutdown = shutdown_signal()?;
    let result = engine.run(&mode, shutdown).await?;

    info!("Shutting down daemon");
    Ok(result)
}

/// Future resolving on SIGTERM or SIGINT
///
/// Handlers are installed before returning so a signal that arrives while
/// the first run is in progress is not lost.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    Ok(async move {
        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        info!("Received shutdown signal: {}", name);
    })
}

/// Future resolving on CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal: CTRL-C"),
            Err(e) => {
                error!("Failed to wait for CTRL-C: {}", e);
                std::future::pending::<()>().await
            }
        }
    })
}
