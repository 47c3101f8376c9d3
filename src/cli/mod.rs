//! CLI module for tunepress

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "tunepress",
    about = "Convert local audio to MP3 and queue YouTube audio downloads"
)]
#[command(version, author)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// ffmpeg executable to use instead of the configured one
    #[arg(long, global = true, env = "TUNEPRESS_FFMPEG", value_name = "PATH")]
    pub ffmpeg: Option<PathBuf>,

    /// yt-dlp executable to use instead of the configured one
    #[arg(long, global = true, env = "TUNEPRESS_YTDLP", value_name = "PATH")]
    pub yt_dlp: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List convertible audio files and their MP3 targets
    Scan {
        /// Folder to search recursively
        source: PathBuf,

        /// Folder the MP3 files go to
        dest: PathBuf,
    },

    /// Convert every supported file under SOURCE to MP3 in DEST
    Convert {
        /// Folder to search recursively
        source: PathBuf,

        /// Folder the MP3 files go to
        dest: PathBuf,

        /// Start without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Show metadata for a YouTube URL
    Info {
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Queue YouTube URLs and download them as MP3
    Download {
        #[arg(value_name = "URL", required = true)]
        urls: Vec<String>,

        /// Destination folder (defaults to the configured download folder)
        #[arg(short, long, env = "TUNEPRESS_DEST")]
        dest: Option<PathBuf>,

        /// Download again even if the file exists and start without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the effective settings, optionally updating them
    Config {
        /// Save a default download folder
        #[arg(long, value_name = "DIR")]
        download_folder: Option<PathBuf>,

        /// Save a target MP3 bitrate in kbit/s
        #[arg(long, value_name = "KBPS")]
        bitrate: Option<u32>,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
