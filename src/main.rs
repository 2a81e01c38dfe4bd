use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};
use vk2disk::config::{Config, DEFAULT_FOLDER, DEFAULT_PHOTO_COUNT};
use vk2disk::manifest::DEFAULT_MANIFEST_FILE;
use vk2disk::orchestrator::{Orchestrator, RunOutcome};

#[derive(Parser, Debug)]
#[command(
    name = "vk2disk",
    version,
    about = "Back up VK profile photos to Yandex Disk",
    long_about = "Uploads the largest version of a VK user's profile photos to Yandex Disk, \
                  naming each file by its like count, and records what was uploaded"
)]
struct Cli {
    /// VK user ID, screen name or profile URL (asked for interactively when omitted)
    user: Option<String>,

    /// VK API access token
    #[arg(long, env = "VK_TOKEN", hide_env_values = true)]
    vk_token: Option<String>,

    /// Yandex Disk OAuth token
    #[arg(long, env = "YANDEX_DISK_TOKEN", hide_env_values = true)]
    disk_token: Option<String>,

    /// Number of profile photos to back up
    #[arg(short, long, default_value_t = DEFAULT_PHOTO_COUNT)]
    count: u32,

    /// Yandex Disk folder to upload into
    #[arg(short, long, default_value = DEFAULT_FOLDER)]
    folder: String,

    /// Where to write the list of uploaded photos
    #[arg(short, long, default_value = DEFAULT_MANIFEST_FILE)]
    manifest: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Ask for the user handle or ID on stdin
fn prompt_for_user() -> Result<String> {
    print!("Enter VK user ID or screen name: ");
    io::stdout().flush().context("Failed to flush prompt")?;

    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .context("Failed to read user ID from stdin")?;

    Ok(input.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let args = Cli::parse();

    // Initialize logging
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let vk_token = args.vk_token.context(
        "VK token not specified. Please set --vk-token or VK_TOKEN environment variable",
    )?;
    let disk_token = args.disk_token.context(
        "Yandex Disk token not specified. Please set --disk-token or YANDEX_DISK_TOKEN environment variable",
    )?;

    let mut config = Config::new(&vk_token, &disk_token).with_api_overrides_from_env();
    config.photo_count = args.count;
    config.folder = args.folder;
    config.manifest_path = args.manifest;
    debug!(?config, "Loaded configuration");

    let user_input = match args.user {
        Some(user) => user,
        None => prompt_for_user()?,
    };

    let orchestrator = Orchestrator::from_config(config)?;

    match orchestrator.run(&user_input).await? {
        RunOutcome::Completed {
            manifest_path,
            records,
            photo_count,
        } => {
            println!(
                "Uploaded {uploaded} of {photo_count} photos. Information about uploaded photos saved to {path}.",
                uploaded = records.len(),
                path = manifest_path.display()
            );
        }
        RunOutcome::PhotosUnavailable { .. } => {
            println!(
                "Could not get photos. Check the privacy settings or the correctness of the token/user ID."
            );
        }
        RunOutcome::UserNotFound { .. } => {
            println!("Could not get the user ID. Check the input or the token.");
        }
    }

    Ok(())
}
