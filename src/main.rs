//! tunepress - Convert local audio to MP3 and download YouTube audio

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use cli::commands::ToolOverrides;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "tunepress=debug"
    } else {
        "tunepress=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let overrides = ToolOverrides {
        ffmpeg: cli.ffmpeg,
        yt_dlp: cli.yt_dlp,
    };

    match cli.command {
        Commands::Scan { source, dest } => {
            cli::commands::scan(source, dest).await?;
        }
        Commands::Convert { source, dest, yes } => {
            cli::commands::convert(&overrides, source, dest, yes).await?;
        }
        Commands::Info { url } => {
            cli::commands::info(&overrides, url).await?;
        }
        Commands::Download { urls, dest, yes } => {
            cli::commands::download(&overrides, urls, dest, yes).await?;
        }
        Commands::Config {
            download_folder,
            bitrate,
        } => {
            cli::commands::config(&overrides, download_folder, bitrate)?;
        }
        Commands::Completion { shell } => {
            cli::commands::completion(shell);
        }
    }

    Ok(())
}
