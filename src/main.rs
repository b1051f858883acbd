//! toolbelt binary entry point.

use std::io::Write;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use toolbelt::cli::{Cli, Command};
use toolbelt::runtime::{ToolRuntime, one_shot_options};
use toolbelt::startup::{StartupContext, initialize_tracing};
use toolbelt_config::ConfigSource;
use tracing::info;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Cli::parse();
    let startup = StartupContext::from_cli_args(&args)?;
    initialize_tracing(&startup.config.debug)?;

    match args.command {
        Command::Serve => serve(&startup).await,
        Command::Exec { command } => exec(&startup, &command.join(" ")).await,
        Command::Config => print_config(&startup),
    }
}

async fn serve(startup: &StartupContext) -> Result<ExitCode> {
    let mut runtime = ToolRuntime::initialize(&startup.config);
    let reader = BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();

    let outcome = tokio::select! {
        served = toolbelt::serve(&runtime, reader, writer) => served.map(|_| ()),
        signal = tokio::signal::ctrl_c() => {
            info!("interrupted; shutting down");
            signal.context("Failed to listen for ctrl-c")
        }
    };

    runtime.shutdown().await;
    outcome.map(|()| ExitCode::SUCCESS)
}

async fn exec(startup: &StartupContext, command: &str) -> Result<ExitCode> {
    let options = one_shot_options(&startup.config);
    let output = toolbelt_bash_runner::run_once(command, &options)
        .await
        .with_context(|| format!("Failed to run `{command}`"))?;

    std::io::stdout()
        .write_all(output.stdout.as_bytes())
        .context("Failed to write stdout")?;
    std::io::stderr()
        .write_all(output.stderr.as_bytes())
        .context("Failed to write stderr")?;

    let code = output
        .exit_code
        .and_then(|code| u8::try_from(code).ok())
        .unwrap_or(1);
    Ok(ExitCode::from(code))
}

fn print_config(startup: &StartupContext) -> Result<ExitCode> {
    let rendered = startup.config.to_toml_string()?;
    match &startup.source {
        ConfigSource::File(path) => println!("# loaded from {}", path.display()),
        ConfigSource::Defaults => println!("# built-in defaults"),
    }
    print!("{rendered}");
    Ok(ExitCode::SUCCESS)
}
