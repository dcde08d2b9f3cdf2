//! droidwatch - flags USB phones that adb does not see
//!
//! Without `--listen` a single check runs and the exit status reports the
//! outcome (0 all listed, 1 missing devices, 2 setup error). With `--listen`
//! the check result is served as JSON over HTTP.

mod api;
mod bridge;
mod check;
mod command;
mod config;
mod error;
mod memo;
mod registry_fetch;
mod server;

use anyhow::Result;
use clap::Parser;
use droidwatch_core::CheckResult;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::bridge::AdbBridge;
use crate::check::{Checker, SystemSources};
use crate::error::CheckError;
use crate::registry_fetch::RegistryFetcher;

#[derive(Parser, Debug)]
#[command(name = "droidwatch")]
#[command(about = "Report USB-connected Android devices that adb does not list")]
#[command(version)]
struct Args {
    /// Serve results over HTTP on this port (all interfaces)
    #[arg(long, value_name = "PORT")]
    listen: Option<u16>,

    /// Path to adb (default: $ANDROID_HOME/platform-tools/adb)
    #[arg(long, alias = "adb", value_name = "PATH")]
    bridge_tool_path: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, default_value = "droidwatch.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("droidwatch: failed to initialize logging: {}", e);
        return ExitCode::from(2);
    }

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            if let Some(check_error) = e.downcast_ref::<CheckError>() {
                eprintln!("droidwatch: {}", check_error);
                if check_error.is_registry_corrupt() {
                    eprintln!(
                        "droidwatch: the cached registry was removed, run again to download it"
                    );
                }
                return ExitCode::from(check_error.exit_code());
            }
            eprintln!("droidwatch: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn init_logging(log_level: &str) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

async fn run(args: Args) -> Result<ExitCode> {
    info!("droidwatch v{}", env!("CARGO_PKG_VERSION"));

    let config = config::load_config(&args.config)?;

    let adb_path = bridge::locate(args.bridge_tool_path.as_deref(), &config.bridge)
        .map_err(CheckError::from)?;
    let bridge = AdbBridge::new(adb_path, config.check.command_timeout());

    let registry = RegistryFetcher::new(
        config.registry.url.clone(),
        config.registry.local_path(),
        config.registry.download_timeout(),
    )?;

    info!(
        adb = %bridge.path().display(),
        registry = %registry.path().display(),
        topology = %config.topology.program,
        "Configuration loaded"
    );

    let sources = SystemSources::new(
        config.topology.clone(),
        config.check.command_timeout(),
        bridge,
        registry,
    );
    let checker = Arc::new(Checker::new(sources, config.check.cache_timeout()));

    if let Some(port) = args.listen {
        server::run(checker, &config.daemon.host, port).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let result = checker.do_check().await?;
    Ok(ExitCode::from(report(&result)?))
}

/// Print a one-shot result and return the exit status: 0 when adb lists
/// every USB device, 1 otherwise.
fn report(result: &CheckResult) -> Result<u8> {
    println!("{}", serde_json::to_string_pretty(result)?);

    if !result.has_missing() {
        return Ok(0);
    }

    eprintln!("{} device(s) not listed by adb:", result.missing.len());
    for device in &result.missing {
        eprintln!(
            "  {} {} ({}:{}) {}",
            device.serial,
            device.name.as_deref().unwrap_or("-"),
            device.vendor_id,
            device.product_id,
            device.description
        );
    }
    Ok(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::tests::FakeSources;
    use std::time::Duration;

    #[test]
    fn test_args() {
        let args = Args::parse_from(["droidwatch", "--listen", "8080", "--adb", "/opt/sdk/adb"]);
        assert_eq!(args.listen, Some(8080));
        assert_eq!(args.bridge_tool_path, Some(PathBuf::from("/opt/sdk/adb")));
        assert_eq!(args.config, PathBuf::from("droidwatch.toml"));

        let args = Args::parse_from(["droidwatch", "--bridge-tool-path", "adb"]);
        assert!(args.listen.is_none());
    }

    async fn one_shot(devices: &str) -> u8 {
        let checker = Checker::new(FakeSources::new(devices), Duration::from_secs(5));
        let result = checker.do_check().await.unwrap();
        report(&result).unwrap()
    }

    #[tokio::test]
    async fn test_exit_status_all_listed() {
        assert_eq!(one_shot("List of devices attached\nABC123\tdevice\n").await, 0);
    }

    #[tokio::test]
    async fn test_exit_status_missing_device() {
        assert_eq!(one_shot("List of devices attached\n").await, 1);
    }

    #[tokio::test]
    async fn test_exit_status_unauthorized_device() {
        assert_eq!(one_shot("List of devices attached\nABC123\tunauthorized\n").await, 1);
    }

    #[test]
    fn test_port_range() {
        assert!(Args::try_parse_from(["droidwatch", "--listen", "65536"]).is_err());
        assert!(Args::try_parse_from(["droidwatch", "--listen", "0"]).is_ok());
    }
}
