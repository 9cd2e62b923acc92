//! Burnbox operator binary.
//!
//! # Usage
//!
//! ```bash
//! # Store a secret, prints its identifier
//! echo "hello world" | burnbox create
//!
//! # Print the secret and burn it
//! burnbox read <IDENTIFIER>
//!
//! # Remove secrets older than a week, once or every hour until Ctrl-C
//! burnbox sweep --ttl-days 7
//! burnbox sweep --ttl-days 7 --interval-secs 3600
//! ```

use std::{
    error::Error,
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
    process::ExitCode,
    time::Duration,
};

use burnbox_server::{SecretService, SweeperConfig, spawn_sweeper};
use burnbox_store::RedbSecretStore;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use zeroize::Zeroizing;

/// Burn-after-reading secret store
#[derive(Parser, Debug)]
#[command(name = "burnbox")]
#[command(about = "Store secrets that can be read exactly once")]
#[command(version)]
struct Args {
    /// Path to the secrets database
    #[arg(long, env = "BURNBOX_DB_PATH", default_value = "db/secrets.redb", global = true)]
    db_path: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Read a secret from stdin and print its identifier
    Create,

    /// Print a secret and burn it
    Read {
        /// Identifier returned by `create`
        id: String,
    },

    /// Remove expired secrets
    Sweep {
        /// Secrets older than this many days are removed
        #[arg(long)]
        ttl_days: u32,

        /// Keep sweeping at this interval until interrupted
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval_secs: Option<u64>,
    },

    /// Print the number of stored secrets
    Stats,
}

/// Exit code when a secret is absent, burned or not decryptable
const EXIT_NOT_FOUND: u8 = 1;

/// Exit code when the caller's input is unusable
const EXIT_BAD_INPUT: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let service = open_service(&args.db_path)?;
    tracing::debug!(db_path = %args.db_path.display(), "database ready");

    match args.command {
        Command::Create => {
            let mut plaintext = Zeroizing::new(String::new());
            io::stdin().read_to_string(&mut plaintext)?;
            strip_trailing_newline(&mut plaintext);

            match tokio::task::spawn_blocking(move || service.create(&plaintext)).await? {
                Ok(identifier) => {
                    writeln!(io::stdout().lock(), "{}", identifier.as_str())?;
                    Ok(ExitCode::SUCCESS)
                },
                Err(err) if err.is_client_error() => {
                    writeln!(io::stderr().lock(), "error: {err}")?;
                    Ok(ExitCode::from(EXIT_BAD_INPUT))
                },
                Err(err) => Err(err.into()),
            }
        },

        Command::Read { id } => {
            let id = Zeroizing::new(id);
            match tokio::task::spawn_blocking(move || service.read(&id)).await? {
                Ok(Some(plaintext)) => {
                    writeln!(io::stdout().lock(), "{}", plaintext.as_str())?;
                    Ok(ExitCode::SUCCESS)
                },
                Ok(None) => {
                    writeln!(io::stderr().lock(), "secret not found")?;
                    Ok(ExitCode::from(EXIT_NOT_FOUND))
                },
                Err(err) if err.is_client_error() => {
                    writeln!(io::stderr().lock(), "error: {err}")?;
                    Ok(ExitCode::from(EXIT_BAD_INPUT))
                },
                Err(err) => Err(err.into()),
            }
        },

        Command::Sweep { ttl_days, interval_secs: None } => {
            let removed = tokio::task::spawn_blocking(move || service.sweep(ttl_days)).await??;
            writeln!(io::stdout().lock(), "{removed}")?;
            Ok(ExitCode::SUCCESS)
        },

        Command::Sweep { ttl_days, interval_secs: Some(secs) } => {
            let config = SweeperConfig { interval: Duration::from_secs(secs), ttl_days };
            tracing::info!(interval_secs = secs, ttl_days, "sweeper running, Ctrl-C to stop");

            let handle = spawn_sweeper(service, config);
            tokio::signal::ctrl_c().await?;

            let total = handle.shutdown().await;
            tracing::info!(total, "sweeper stopped");
            Ok(ExitCode::SUCCESS)
        },

        Command::Stats => {
            let count = tokio::task::spawn_blocking(move || service.stats()).await??;
            writeln!(io::stdout().lock(), "{count}")?;
            Ok(ExitCode::SUCCESS)
        },
    }
}

/// Open the database, creating its directory and the secrets bucket if needed.
fn open_service(db_path: &Path) -> Result<SecretService<RedbSecretStore>, Box<dyn Error>> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let service = SecretService::new(RedbSecretStore::open(db_path)?);
    service.init()?;
    Ok(service)
}

fn strip_trailing_newline(text: &mut String) {
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
}
