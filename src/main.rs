use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use resilience_tester::probe::TokioPause;
use resilience_tester::runner::{ConsoleEventListener, EventEmitter};
use resilience_tester::{exit_code, run_suite, utils, HarnessConfig};

#[derive(Parser)]
#[command(name = "resilience-tester")]
#[command(version = "0.1.0")]
#[command(about = "Network resilience test harness for HTTP services", long_about = None)]
struct Cli {
    /// Target server (default: auto-detected, falling back to http://localhost:3000)
    #[arg(long)]
    base_url: Option<String>,

    /// JSON report path
    #[arg(short, long, default_value = utils::config::DEFAULT_REPORT_FILE)]
    output: PathBuf,

    /// Also write a JUnit XML report
    #[arg(long)]
    junit: Option<PathBuf>,

    /// Attempts per probe
    #[arg(long, default_value = "1")]
    attempts: u32,

    /// Seconds between attempts of one probe
    #[arg(long, default_value = "2")]
    retry_delay: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "10")]
    timeout: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let base_url = match cli.base_url {
        Some(url) => url,
        None => utils::network::detect_base_url().await,
    };

    let config = HarnessConfig {
        max_attempts: cli.attempts,
        retry_delay: Duration::from_secs(cli.retry_delay),
        request_timeout: Duration::from_secs(cli.timeout),
        report_path: cli.output,
        junit_path: cli.junit,
        ..HarnessConfig::with_base_url(&base_url)
    };

    let (emitter, receiver) = EventEmitter::new();
    let listener = tokio::spawn(ConsoleEventListener::listen(receiver));

    let result = run_suite(config, Arc::new(TokioPause), emitter).await;

    // The emitter is gone once run_suite returns, so the listener drains and exits
    let _ = listener.await;

    match result {
        Ok(report) => ExitCode::from(exit_code(&report)),
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("{} {:#}", "✗".red().bold(), e);
            ExitCode::from(1)
        }
    }
}
