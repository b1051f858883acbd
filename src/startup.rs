use anyhow::{Context, Result, anyhow};
use toolbelt_config::{ConfigManager, ConfigSource, DebugConfig, ToolbeltConfig};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::cli::Cli;

/// Everything resolved before a subcommand runs.
#[derive(Debug, Clone)]
pub struct StartupContext {
    pub config: ToolbeltConfig,
    pub source: ConfigSource,
}

impl StartupContext {
    pub fn from_cli_args(args: &Cli) -> Result<Self> {
        let manager = ConfigManager::load(args.config.as_deref()).with_context(|| {
            match &args.config {
                Some(path) => format!("Failed to load configuration from {}", path.display()),
                None => "Failed to load workspace configuration".to_string(),
            }
        })?;
        Ok(Self {
            source: manager.source().clone(),
            config: manager.into_config(),
        })
    }
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` takes precedence over the `[debug]` section. Without either,
/// no subscriber is installed and the tools stay silent.
pub fn initialize_tracing(debug_cfg: &DebugConfig) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if debug_cfg.enable_tracing {
        EnvFilter::try_new(debug_cfg.filter_directives())
            .context("Invalid tracing configuration in [debug]")?
    } else {
        return Ok(());
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow!("Failed to install tracing subscriber: {error}"))?;

    tracing::info!(
        level = %debug_cfg.trace_level,
        targets = ?debug_cfg.trace_targets,
        "tracing enabled"
    );
    Ok(())
}
