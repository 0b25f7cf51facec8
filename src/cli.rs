//! Command-line surface: argument parsing, configuration overrides and
//! command dispatch.
//!
//! Exit codes: `0` when the probe passed, `1` when it observed a divergence
//! or could not reach the service, `2` on a setup error (bad configuration,
//! invalid URL).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use twinprobe_core::{
    Channel, InterruptContext, ProbeConfig, Service, ServiceClient, interrupt_on_ctrl_c,
};
use twinprobe_harness::{Catalog, EndpointSweep, WorkflowSettings, WorkflowValidator, print_header};
use twinprobe_observe::{ObserverSettings, StreamObserver, WebSocketSource};

/// twinprobe - contract probes for the alert analytics and digital twin services
#[derive(Debug, Parser)]
#[command(name = "twinprobe")]
#[command(about = "Contract probes for the alert analytics and digital twin services")]
#[command(version)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Probe to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available probes.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Validate the replay session lifecycle end to end
    Replay {
        /// Entity whose recorded data is replayed
        #[arg(long)]
        entity: Option<String>,

        /// Alert analytics base URL
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Observe one push channel for a bounded time
    Observe {
        /// Channel to observe
        #[arg(value_enum)]
        channel: ChannelArg,

        /// Observation window in seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Full WebSocket URL, overriding the configured endpoint
        #[arg(long)]
        url: Option<String>,
    },

    /// Call every catalogued endpoint of one service
    Sweep {
        /// Service to sweep
        #[arg(value_enum)]
        service: ServiceArg,

        /// Service base URL
        #[arg(long)]
        base_url: Option<String>,
    },
}

/// Channel selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChannelArg {
    /// `/ws/alert-updates`
    Alert,
    /// `/ws/replay-updates`
    Replay,
    /// `/ws/machine-updates`
    Machine,
}

impl From<ChannelArg> for Channel {
    fn from(arg: ChannelArg) -> Self {
        match arg {
            ChannelArg::Alert => Self::AlertUpdates,
            ChannelArg::Replay => Self::ReplayUpdates,
            ChannelArg::Machine => Self::MachineUpdates,
        }
    }
}

/// Service selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServiceArg {
    /// Alert analytics service
    AlertAnalytics,
    /// Digital twin service
    DigitalTwin,
}

impl From<ServiceArg> for Service {
    fn from(arg: ServiceArg) -> Self {
        match arg {
            ServiceArg::AlertAnalytics => Self::AlertAnalytics,
            ServiceArg::DigitalTwin => Self::DigitalTwin,
        }
    }
}

/// Result of a probe that ran to a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The service behaved as expected.
    Pass,
    /// The service diverged or was unreachable.
    Fail,
}

impl Verdict {
    /// Exit code for setup errors.
    pub const SETUP_ERROR: u8 = 2;

    /// Returns the process exit code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Pass => 0,
            Self::Fail => 1,
        }
    }
}

impl From<bool> for Verdict {
    fn from(passed: bool) -> Self {
        if passed { Self::Pass } else { Self::Fail }
    }
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over `verbose`. Logs go to stderr so reports on stdout
/// stay readable.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "twinprobe=debug" } else { "twinprobe=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the configuration file (or defaults) and applies command-line
/// overrides.
///
/// # Errors
/// Returns an error if the file cannot be loaded or the merged
/// configuration is invalid.
pub fn load_config(cli: &Cli) -> anyhow::Result<ProbeConfig> {
    let mut config = match &cli.config {
        Some(path) => ProbeConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => ProbeConfig::default(),
    };
    apply_overrides(&mut config, &cli.command);
    config.validate().context("validating configuration")?;
    Ok(config)
}

/// Applies command-line overrides to a configuration.
pub fn apply_overrides(config: &mut ProbeConfig, command: &Command) {
    match command {
        Command::Replay { entity, base_url } => {
            if let Some(entity) = entity {
                config.replay.entity.clone_from(entity);
            }
            if let Some(url) = base_url {
                config.alert_analytics.base_url = url.trim_end_matches('/').to_string();
            }
        }
        Command::Sweep { service, base_url } => {
            if let Some(url) = base_url {
                config.endpoint_mut((*service).into()).base_url =
                    url.trim_end_matches('/').to_string();
            }
        }
        Command::Observe { .. } => {}
    }
}

/// Runs the selected probe until it reaches a verdict.
///
/// # Errors
/// Returns an error on setup failures only; probe divergences are reported
/// as [`Verdict::Fail`].
pub async fn execute(cli: Cli) -> anyhow::Result<Verdict> {
    let config = load_config(&cli)?;

    let (interrupt, handle) = InterruptContext::new();
    let _ctrl_c = interrupt_on_ctrl_c(handle);

    match cli.command {
        Command::Replay { .. } => run_replay(&config, interrupt).await,
        Command::Observe {
            channel,
            duration,
            url,
        } => {
            let duration = duration.map(Duration::from_secs);
            run_observe(&config, channel.into(), duration, url, interrupt).await
        }
        Command::Sweep { service, .. } => run_sweep(&config, service.into()).await,
    }
}

async fn run_replay(config: &ProbeConfig, interrupt: InterruptContext) -> anyhow::Result<Verdict> {
    let client = ServiceClient::new(config.alert_analytics.clone(), config.http.request_timeout)
        .context("building alert analytics client")?;
    let mut validator = WorkflowValidator::new(client, WorkflowSettings::from(&config.replay))
        .with_interrupt(interrupt);
    let report = validator.run().await;
    Ok(report.passed().into())
}

async fn run_observe(
    config: &ProbeConfig,
    channel: Channel,
    duration: Option<Duration>,
    url: Option<String>,
    interrupt: InterruptContext,
) -> anyhow::Result<Verdict> {
    let url = url.unwrap_or_else(|| config.channel_url(channel));
    let duration = duration.unwrap_or_else(|| config.observe.default_duration(channel));

    print_header(&format!(
        "{} WEBSOCKET TEST - {}",
        channel.label().to_uppercase(),
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));

    let observer = StreamObserver::new(WebSocketSource::new(), channel, url)
        .with_settings(ObserverSettings::from(&config.observe))
        .with_replay_endpoint(&config.alert_analytics, &config.replay.entity);

    match observer.run(duration, interrupt).await {
        Ok(summary) => {
            summary.print();
            Ok(summary.end_reason.is_clean().into())
        }
        Err(e) if e.is_unreachable() => {
            println!("[ERROR] Could not connect to {}: {e}", observer.url());
            tracing::warn!(channel = %channel, error = %e, "connection failed");
            Ok(Verdict::Fail)
        }
        Err(e) => Err(e).context("observing channel"),
    }
}

async fn run_sweep(config: &ProbeConfig, service: Service) -> anyhow::Result<Verdict> {
    let sweep = EndpointSweep::connect(
        config.endpoint(service).clone(),
        config.http.request_timeout,
        Catalog::for_service(service, Utc::now()),
    )
    .with_context(|| format!("building {} client", service.name()))?;

    match sweep.run().await {
        Ok(report) => {
            report.print_summary();
            Ok(report.reachable().into())
        }
        Err(e) if e.is_unreachable() => {
            println!("[ERROR] {} service unreachable: {e}", service.name());
            Ok(Verdict::Fail)
        }
        Err(e) => Err(e).context("sweeping endpoints"),
    }
}
