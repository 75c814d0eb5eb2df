//! Keygate command-line front end
//!
//! Verifies a card against the configured activation server and manages
//! the locally stored license.
//!
//! Usage:
//!   keygate --config keygate.json verify --card CARD-0001
//!   keygate --config keygate.json announcement
//!   keygate status
//!   keygate clear

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use keygate_license::{
    verify_and_store, BsphpClient, CardCredentials, FileLicenseStore, HostDevice, HttpTransport,
    LicenseSink, ServerConfig, VerificationOutcome,
};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

const APP_NAME: &str = "keygate";

#[derive(Parser, Debug)]
#[command(name = "keygate")]
#[command(about = "Card-key activation client")]
struct Args {
    /// Path to the server configuration (JSON)
    #[arg(short, long, default_value = "keygate.json")]
    config: PathBuf,

    /// License file; defaults to the platform data directory
    #[arg(long)]
    store: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify a card and store the resulting license
    Verify {
        /// Card number
        #[arg(long)]
        card: String,

        /// Card password, if the card has one
        #[arg(long, default_value = "")]
        password: String,
    },
    /// Print the application announcement
    Announcement,
    /// Show the stored license
    Status,
    /// Remove the stored license
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let store = match &args.store {
        Some(path) => FileLicenseStore::new(path),
        None => FileLicenseStore::default_for(APP_NAME)
            .context("Failed to locate the license directory")?,
    };
    debug!(path = %store.path().display(), "License store");

    match args.command {
        Command::Verify { card, password } => {
            let client = connect(&args.config)?;
            let credentials = CardCredentials::new(card).with_password(password);
            let device = HostDevice::detect_for(APP_NAME);
            debug!(source = ?device.source(), "Device key resolved");
            let outcome = verify_and_store(&client, &credentials, &device, &store).await;

            match outcome {
                VerificationOutcome::Verified(license) => {
                    info!("License stored at {}", store.path().display());
                    println!("Verified until {}", license.expire_date_formatted());
                    println!("Remaining days: {}", license.remaining_days());
                }
                VerificationOutcome::Rejected {
                    kind,
                    code,
                    message,
                } => {
                    debug!(?kind, ?code, "Verification rejected");
                    bail!("{message}");
                }
            }
        }
        Command::Announcement => {
            let client = connect(&args.config)?;
            let session = client
                .session()
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))
                .context("Failed to open a session")?;
            let text = client
                .announcement(&session)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            println!("{text}");
        }
        Command::Status => match store.load().context("Failed to read the license")? {
            Some(license) => {
                debug!(verified_at = %license.verified_at(), "Stored license");
                println!("{}", license.summary());
                if license.is_expired() {
                    println!("状态: 已过期");
                }
            }
            None => println!("No license stored"),
        },
        Command::Clear => {
            store.clear().context("Failed to remove the license")?;
            info!("License cleared");
        }
    }

    Ok(())
}

fn connect(config_path: &Path) -> Result<BsphpClient<HttpTransport>> {
    let config = ServerConfig::from_file(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    info!(server = %config.server_url, version = %config.app_version, "Using activation server");
    let transport = HttpTransport::new(&config).context("Failed to create HTTP transport")?;
    BsphpClient::new(config, transport).context("Invalid configuration")
}
