use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use dbridge_engine::config::DEFAULT_LOG_FILTER;
use dbridge_engine::{Bridge, BridgeConfig, LogFormat, telemetry};
use dbridge_ext_sqlx::SqlxDriver;
use tokio::io::BufReader;

#[derive(Debug, Parser)]
#[command(
    name = "dbridge",
    version,
    about = "Editor to database bridge speaking JSON lines on stdio",
    disable_help_subcommand = true
)]
struct Cli {
    /// Directory holding the connection store
    #[arg(long = "data-dir", value_name = "DIR", env = "DBRIDGE_DATA_DIR")]
    data_dir: PathBuf,

    /// Log filter in tracing EnvFilter syntax
    #[arg(long = "log-filter", value_name = "FILTER", default_value = DEFAULT_LOG_FILTER)]
    log_filter: String,

    /// Log line format: compact or json
    #[arg(long = "log-format", value_name = "FORMAT", default_value_t = LogFormat::Compact)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = BridgeConfig::default()
        .set_data_dir(&cli.data_dir)
        .set_log_filter(cli.log_filter)
        .set_log_format(cli.log_format);

    if let Err(error) = telemetry::initialise(&config) {
        eprintln!("dbridge: {error}");
        return ExitCode::from(2);
    }

    let bridge = Bridge::new(config, SqlxDriver::new());
    match bridge
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
    {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "bridge failed");
            ExitCode::FAILURE
        }
    }
}
