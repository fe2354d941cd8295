use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use autoverify::{
    init_logging, load_config, AutoVerifyError, ConfigError, CycleMode, HttpVerifier, ImapClient,
    Poller, ProcessedSet, Result,
};

#[derive(Parser, Debug)]
#[clap(
    name = "autoverify",
    version,
    about = "Watches a mailbox for device verification emails and opens each verification link once"
)]
struct Cli {
    /// Path to the JSON configuration file.
    #[clap(
        short,
        long,
        env = "AUTOVERIFY_CONFIG",
        default_value = "imap_config.json"
    )]
    config: PathBuf,

    /// Seconds between poll cycles; overrides `check_interval_secs`.
    #[clap(short, long)]
    interval: Option<u64>,

    /// Log level (error, warn, info, debug, trace). `RUST_LOG` wins when set.
    #[clap(long, env = "AUTOVERIFY_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Command {
    /// Poll continuously until interrupted.
    #[default]
    Daemon,
    /// Run a single cycle, falling back to already-read mail from the sender.
    Check,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(&cli.config)?;
    if let Some(interval) = cli.interval {
        if interval == 0 {
            return Err(ConfigError::Validation {
                message: "--interval must be at least 1 second".to_string(),
            }
            .into());
        }
        config.check_interval_secs = interval;
    }

    let _log_guard = init_logging(&config.log_file, &cli.log_level)?;

    info!("Loaded configuration from {}", cli.config.display());
    info!(
        "Watching {} on {}:{} for mail from '{}'",
        config.folder, config.imap_host, config.imap_port, config.sender
    );

    let processed = ProcessedSet::load(&config.processed_file)?;

    let mailbox = ImapClient::from_config(&config)?;
    let verifier = HttpVerifier::new(config.http_timeout())?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let signal_flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        signal_flag.store(true, Ordering::Relaxed);
    })?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(AutoVerifyError::Runtime)?;

    let mut poller = Poller::new(&config, mailbox, verifier, processed, shutdown);

    match cli.command.unwrap_or_default() {
        Command::Daemon => runtime.block_on(poller.run()),
        Command::Check => {
            let report = runtime
                .block_on(poller.run_cycle(CycleMode::Manual))
                .inspect_err(|e| error!("Check failed: {}", e))?;
            info!(
                found = report.found,
                already_processed = report.already_processed,
                verified = report.verified,
                failed = report.failed,
                codes_only = report.codes_only,
                "Check complete"
            );
        }
    }

    Ok(())
}
