//! Tessera CLI - inspect the capability registry and mount UI modules.
//!
//! Builds one [`tessera_host::Host`] per invocation over a module directory
//! (see [`tessera_core::DirectoryBridge`]) and prints what the host sees.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tessera_config::{LoadOptions, ResolvedConfig};
use tessera_core::{CapabilityBridge, CapabilityId, DirectoryBridge};
use tessera_host::{Host, HostSettings};
use tessera_telemetry::{LogConfig, LogFormat, LogTarget};

mod commands;
mod theme;

use commands::{config, mount, registry, tabs};
use theme::Theme;

/// Tessera - capability module host
#[derive(Parser)]
#[command(name = "tessera")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file merged over the user and workspace layers
    #[arg(long, global = true, env = "TESSERA_CONFIG")]
    config: Option<PathBuf>,

    /// Module directory served as the execution boundary
    #[arg(long, global = true)]
    modules: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// How command results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable, colored output.
    Pretty,
    /// One JSON document on stdout.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved capability registry
    Registry,

    /// Print core tabs followed by discovered tabs
    Tabs,

    /// Mount a capability's module, print its view, then unmount
    Mount {
        /// Capability identifier
        id: u32,

        /// Initial data handed to the module, as JSON
        #[arg(long)]
        data: Option<String>,
    },

    /// Print the effective configuration
    Config,
}

fn load_config(explicit: Option<PathBuf>) -> Result<ResolvedConfig> {
    let mut options = LoadOptions::default();
    if let Ok(cwd) = std::env::current_dir() {
        options = options.with_workspace(cwd);
    }
    if let Some(path) = explicit {
        options = options.with_explicit_file(path);
    }
    tessera_config::loader::load(&options).context("failed to load configuration")
}

fn setup_logging(resolved: &ResolvedConfig, verbose: bool) {
    // Logs go to stderr so that JSON output on stdout stays parseable.
    let mut log_config = LogConfig::try_from(&resolved.config.logging).unwrap_or_else(|e| {
        eprintln!("Invalid logging configuration: {e}");
        LogConfig::new("warn").with_format(LogFormat::Compact)
    });
    log_config = log_config.with_target(LogTarget::Stderr);
    if verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = tessera_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }
}

fn build_host(resolved: &ResolvedConfig, modules: Option<PathBuf>) -> Host {
    let settings = HostSettings::from(&resolved.config);
    let bridge = modules
        .or_else(|| resolved.config.bridge.directory.clone())
        .map(|dir| {
            let bridge =
                DirectoryBridge::new(dir).with_system_capability(settings.system_capability);
            Arc::new(bridge) as Arc<dyn CapabilityBridge>
        });
    Host::new(bridge, settings)
}

async fn run(cli: Cli) -> Result<()> {
    let resolved = load_config(cli.config)?;
    setup_logging(&resolved, cli.verbose);

    match cli.command {
        Commands::Config => config::show(&resolved, cli.format)?,
        Commands::Registry => {
            let host = build_host(&resolved, cli.modules);
            registry::show(&host, cli.format).await?;
        },
        Commands::Tabs => {
            let host = build_host(&resolved, cli.modules);
            tabs::show(&host, cli.format).await?;
        },
        Commands::Mount { id, data } => {
            let initial_data = data
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .context("--data is not valid JSON")?;
            let host = build_host(&resolved, cli.modules);
            mount::run(&host, CapabilityId::new(id), initial_data, cli.format).await?;
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{}", Theme::error(&format!("{e:#}")));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tessera", "mount", "7", "--data", "{\"a\":1}", "--format", "json", "-v",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.verbose);
        match cli.command {
            Commands::Mount { id, data } => {
                assert_eq!(id, 7);
                assert_eq!(data.as_deref(), Some("{\"a\":1}"));
            },
            _ => panic!("expected mount"),
        }
    }

    #[test]
    fn test_build_host_without_directory_has_no_bridge() {
        let resolved = ResolvedConfig {
            config: tessera_config::Config::default(),
            layers: Vec::new(),
        };
        let host = build_host(&resolved, None);
        assert!(host.loader().bridge().is_none());
    }
}
