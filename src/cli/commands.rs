//! CLI command handlers

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::generate;
use colored::Colorize;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

use tunepress::config::Settings;
use tunepress::convert::{scan as scan_source, supported_extensions, BatchConverter, ScanItem};
use tunepress::engine::{AudioEngine, FfmpegEngine};
use tunepress::progress::{ConvertProgress, QueueEvent, Reporter};
use tunepress::queue::{EnqueueOutcome, QueueItem, QueueManager, QueueStatus, QueueWorker};
use tunepress::remote::{Fetcher, Resolver, YtDlpClient};
use tunepress::utils::{format_duration, format_file_size};

/// Tool paths given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ToolOverrides {
    pub ffmpeg: Option<PathBuf>,
    pub yt_dlp: Option<PathBuf>,
}

impl ToolOverrides {
    fn apply(&self, settings: &mut Settings) {
        if let Some(ffmpeg) = &self.ffmpeg {
            settings.ffmpeg_path = ffmpeg.clone();
        }
        if let Some(yt_dlp) = &self.yt_dlp {
            settings.ytdlp_path = yt_dlp.clone();
        }
    }

    /// Stored settings with these overrides applied
    fn load_settings(&self) -> Result<Settings> {
        let mut settings = Settings::load()?;
        self.apply(&mut settings);
        Ok(settings)
    }
}

fn bar_style(template: &str) -> Result<ProgressStyle> {
    Ok(ProgressStyle::default_bar()
        .template(template)
        .context("Invalid progress template")?
        .progress_chars("#>-"))
}

fn build_engine(settings: &Settings) -> Arc<dyn AudioEngine> {
    Arc::new(FfmpegEngine::new(&settings.ffmpeg_path))
}

fn build_resolver(settings: &Settings) -> Result<Resolver> {
    let client = YtDlpClient::new(&settings.ytdlp_path).context("Failed to create HTTP client")?;
    Ok(Resolver::new(Arc::new(client), settings.resolve_timeout()))
}

/// Walk the source folder off the async runtime
async fn scan_folder(source: PathBuf, dest: PathBuf) -> Result<Vec<ScanItem>> {
    tokio::task::spawn_blocking(move || scan_source(&source, &dest))
        .await
        .context("Scan task failed")
}

fn print_nothing_found(source: &std::path::Path) {
    if !source.exists() {
        println!(
            "{}",
            format!("Source folder {} does not exist.", source.display()).yellow()
        );
    } else {
        println!("{}", "No supported audio files found.".yellow());
        println!("Supported formats: {}", supported_extensions().join(", "));
    }
}

/// Handle the `scan` command
pub async fn scan(source: PathBuf, dest: PathBuf) -> Result<()> {
    println!("{}", "Scanning for audio files...".cyan());
    println!();

    let items = scan_folder(source.clone(), dest).await?;
    if items.is_empty() {
        print_nothing_found(&source);
        return Ok(());
    }

    for item in &items {
        let marker = if item.already_exists {
            "exists".yellow()
        } else {
            "new".green()
        };
        println!(
            "  [{}] {} -> {} ({})",
            marker,
            item.display_name,
            item.output_name,
            format_file_size(item.byte_size)
        );
    }

    let existing = items.iter().filter(|i| i.already_exists).count();
    let total_bytes: u64 = items.iter().map(|i| i.byte_size).sum();

    println!();
    println!(
        "{} file(s), {} total, {} already converted.",
        items.len(),
        format_file_size(total_bytes),
        existing
    );

    Ok(())
}

/// Handle the `convert` command
pub async fn convert(
    overrides: &ToolOverrides,
    source: PathBuf,
    dest: PathBuf,
    yes: bool,
) -> Result<()> {
    let settings = overrides.load_settings()?;

    println!("{}", "Scanning for audio files...".cyan());
    let items = scan_folder(source.clone(), dest.clone()).await?;
    if items.is_empty() {
        print_nothing_found(&source);
        return Ok(());
    }

    let existing = items.iter().filter(|i| i.already_exists).count();
    let pending = items.len() - existing;
    println!(
        "Found {} file(s), {} already converted.",
        items.len(),
        existing
    );

    if pending == 0 {
        println!("{}", "Nothing to convert.".green());
        return Ok(());
    }

    if !yes
        && !Confirm::new()
            .with_prompt(format!(
                "Convert {} file(s) to MP3 in {}?",
                pending,
                dest.display()
            ))
            .default(true)
            .interact()?
    {
        println!("Cancelled.");
        return Ok(());
    }

    let stop = Arc::new(AtomicBool::new(false));
    let converter = BatchConverter::new(build_engine(&settings), settings.encode_settings())
        .with_stop_flag(stop.clone());

    let total = items.len();
    let (tx, mut rx) = mpsc::channel::<ConvertProgress>(32);
    let task = tokio::spawn(async move { converter.convert(&items, &Reporter::new(tx)).await });

    let progress = ProgressBar::new(total as u64);
    progress.set_style(bar_style(
        "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    )?);

    let mut stopping = false;
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => {
                    let position = if event.is_in_flight() {
                        event.processed - 1
                    } else {
                        event.processed
                    };
                    progress.set_position(position as u64);
                    progress.set_message(event.label);
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c(), if !stopping => {
                stopping = true;
                stop.store(true, Ordering::SeqCst);
                progress.println("Stopping after the current file...");
            }
        }
    }
    progress.finish_and_clear();

    let outcome = task.await.context("Conversion task failed")?;

    println!();
    if outcome.stopped {
        println!("{}", "Conversion stopped.".yellow().bold());
    } else {
        println!("{}", "Conversion complete!".green().bold());
    }
    println!("  Converted: {}", outcome.succeeded);
    println!("  Skipped: {}", outcome.skipped);
    println!("  Failed: {}", outcome.failed);

    if !outcome.errors.is_empty() {
        println!();
        println!("{}", "Errors:".red().bold());
        for error in &outcome.errors {
            println!("  - {}", error);
        }
    }

    Ok(())
}

/// Handle the `info` command
pub async fn info(overrides: &ToolOverrides, url: String) -> Result<()> {
    let settings = overrides.load_settings()?;
    let resolver = build_resolver(&settings)?;

    println!("{}", "Fetching track info...".cyan());
    let info = resolver
        .resolve(&url)
        .await
        .context("Could not fetch track info")?;

    println!();
    println!("{}", info.title.green().bold());
    println!("  Channel:  {}", info.author);
    println!("  Duration: {}", format_duration(info.duration_seconds));
    println!("  Views:    {}", info.view_count);
    println!("  ID:       {}", info.video_id);
    if let Some(thumbnail) = &info.thumbnail_url {
        println!("  Thumbnail: {}", thumbnail);
    }
    if let Some(folder) = &settings.download_folder
        && QueueManager::would_collide(&info, folder)
    {
        println!(
            "  {}",
            format!("Already downloaded in {}", folder.display()).yellow()
        );
    }
    if !info.description_excerpt.is_empty() {
        println!();
        println!("{}", info.description_excerpt);
    }

    Ok(())
}

/// Handle the `download` command
pub async fn download(
    overrides: &ToolOverrides,
    urls: Vec<String>,
    dest: Option<PathBuf>,
    yes: bool,
) -> Result<()> {
    let settings = overrides.load_settings()?;
    let dest = dest
        .or_else(|| settings.download_folder.clone())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No destination folder. Pass --dest or run 'tunepress config --download-folder <DIR>'."
            )
        })?;

    let resolver = build_resolver(&settings)?;
    let fetcher = Fetcher::new(
        resolver.clone(),
        build_engine(&settings),
        settings.encode_settings(),
        settings.fetch_timeout(),
    );

    let (tx, rx) = mpsc::channel::<QueueEvent>(64);
    let (queue, worker) =
        QueueWorker::spawn(QueueManager::new(resolver, fetcher), Reporter::new(tx));

    println!("{}", format!("Resolving {} URL(s)...", urls.len()).cyan());
    for url in &urls {
        match queue.enqueue(url.as_str(), &dest, yes).await {
            Ok(EnqueueOutcome::Accepted {
                index,
                overwrites_existing,
            }) => {
                let note = if overwrites_existing {
                    " (already downloaded, fetching again)"
                } else {
                    ""
                };
                println!("  {} #{}: {}{}", "Queued".green(), index + 1, url, note);
            }
            Ok(EnqueueOutcome::WouldOverwrite { title, path }) => {
                let again = Confirm::new()
                    .with_prompt(format!(
                        "'{}' already exists at {}. Download it again?",
                        title,
                        path.display()
                    ))
                    .default(false)
                    .interact()?;

                if !again {
                    println!("  {} {}", "Skipped".yellow(), title);
                    continue;
                }
                match queue.enqueue(url.as_str(), &dest, true).await {
                    Ok(_) => println!("  {} {}", "Queued".green(), title),
                    Err(e) => println!("  {} {}: {}", "Rejected".red(), url, e),
                }
            }
            Err(e) => println!("  {} {}: {}", "Rejected".red(), url, e),
        }
    }

    let summary = queue.summary().await?;
    println!();
    if summary.total == 0 {
        println!("{}", "Nothing queued.".yellow());
        return Ok(());
    }
    println!(
        "Queue: {} new, {} to retry, {} already downloaded.",
        summary.new_downloads, summary.retries, summary.existing
    );

    if !yes
        && !Confirm::new()
            .with_prompt(format!(
                "Download {} track(s) to {}?",
                summary.to_process(),
                dest.display()
            ))
            .default(true)
            .interact()?
    {
        println!("Cancelled.");
        return Ok(());
    }

    let progress = ProgressBar::new(100);
    progress.set_style(bar_style(
        "{spinner:.green} {prefix} [{bar:40.cyan/blue}] {pos}% {msg}",
    )?);
    let render = tokio::spawn(render_queue_events(rx, progress, summary.total));

    let runner = queue.clone();
    let mut run = tokio::spawn(async move { runner.run().await });

    let mut stopping = false;
    let report = loop {
        tokio::select! {
            result = &mut run => break result.context("Queue task failed")??,
            _ = tokio::signal::ctrl_c(), if !stopping => {
                stopping = true;
                println!("Stopping after the current download...");
                queue.stop().await?;
            }
        }
    };

    let items = queue.snapshot().await?;
    drop(queue);
    worker.await.context("Queue worker failed")?;
    render.await.context("Progress display failed")?;

    println!();
    if report.successful == report.total {
        println!("{}", "Downloads complete!".green().bold());
    } else {
        println!("{}", "Downloads finished with errors.".yellow().bold());
    }
    println!("  Downloaded: {}/{}", report.successful, report.total);
    print_failures(&items);

    Ok(())
}

async fn render_queue_events(
    mut rx: mpsc::Receiver<QueueEvent>,
    progress: ProgressBar,
    total: usize,
) {
    while let Some(event) = rx.recv().await {
        match event {
            QueueEvent::ItemStarted { index, title } => {
                progress.set_position(0);
                progress.set_prefix(format!("[{}/{}]", index + 1, total));
                progress.set_message(title);
            }
            QueueEvent::ItemProgress {
                message, percent, ..
            } => {
                progress.set_position(percent as u64);
                progress.set_message(message);
            }
            QueueEvent::ItemCompleted { path, .. } => {
                progress.println(format!("  {} {}", "Downloaded".green(), path.display()));
            }
            QueueEvent::ItemFailed { index, message } => {
                progress.println(format!("  {} #{}: {}", "Failed".red(), index + 1, message));
            }
            QueueEvent::ItemSkipped { title, .. } => {
                progress.println(format!("  {} {} (already downloaded)", "Skipped".yellow(), title));
            }
            QueueEvent::Complete { successful, total } => {
                debug!("Queue reported {}/{} successful", successful, total);
                progress.finish_and_clear();
            }
        }
    }
}

fn print_failures(items: &[QueueItem]) {
    let failed: Vec<_> = items
        .iter()
        .filter(|i| i.status == QueueStatus::Failed)
        .collect();
    if failed.is_empty() {
        return;
    }

    println!();
    println!("{}", "Failed:".red().bold());
    for item in failed {
        println!(
            "  - {} ({}): {}",
            item.title,
            item.url,
            item.last_message.as_deref().unwrap_or("unknown error")
        );
    }
}

/// Handle the `config` command
pub fn config(
    overrides: &ToolOverrides,
    download_folder: Option<PathBuf>,
    bitrate: Option<u32>,
) -> Result<()> {
    let path = Settings::config_path()?;
    let mut settings = Settings::load_from(&path)?;

    if download_folder.is_some() || bitrate.is_some() {
        if let Some(folder) = download_folder {
            settings.download_folder = Some(folder);
        }
        if let Some(bitrate) = bitrate {
            settings.bitrate_kbps = bitrate;
        }
        settings.save_to(&path)?;
        println!("{}", "Settings saved.".green());
        println!();
    }

    overrides.apply(&mut settings);

    println!("{} {}", "Config file:".bold(), path.display());
    println!(
        "{}",
        serde_json::to_string_pretty(&settings).context("Failed to serialize settings")?
    );

    Ok(())
}

/// Handle the `completion` command
pub fn completion(shell: clap_complete::Shell) {
    let mut cmd = super::Cli::command();
    generate(shell, &mut cmd, "tunepress", &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_tool_paths() {
        let overrides = ToolOverrides {
            ffmpeg: Some(PathBuf::from("/opt/ffmpeg")),
            yt_dlp: None,
        };
        let mut settings = Settings::default();
        overrides.apply(&mut settings);

        assert_eq!(settings.ffmpeg_path, PathBuf::from("/opt/ffmpeg"));
        assert_eq!(settings.ytdlp_path, PathBuf::from("yt-dlp"));
    }

    #[test]
    fn test_bar_styles_parse() {
        assert!(bar_style("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}").is_ok());
        assert!(bar_style("{spinner:.green} {prefix} [{bar:40.cyan/blue}] {pos}% {msg}").is_ok());
    }
}
