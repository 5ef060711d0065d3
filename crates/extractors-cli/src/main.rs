use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use media_extractors::{Data, ExtractorError, Options, default_registry};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Page URLs or bare Bilibili ids (av…, BV…, ep…) to resolve
    #[arg(required = true)]
    urls: Vec<String>,

    /// Extract every item of a playlist
    #[arg(short, long)]
    playlist: bool,

    /// Playlist items to extract, e.g. "1,5,6,8-10"
    #[arg(long, default_value = "")]
    items: String,

    /// First playlist item to extract
    #[arg(long, default_value_t = 1)]
    item_start: usize,

    /// Last playlist item to extract (0 means the last one)
    #[arg(long, default_value_t = 0)]
    item_end: usize,

    /// Number of playlist items extracted concurrently
    #[arg(short = 'n', long, default_value_t = 10)]
    thread_number: usize,

    /// Cookie header value sent with page requests
    #[arg(short, long, env = "EXTRACTORS_COOKIE")]
    cookie: Option<String>,

    /// Output the result in JSON format
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(Duration::from_millis(120));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_strings(&[
            "▹▹▹▹▹", "▸▹▹▹▹", "▹▸▹▹▹", "▹▹▸▹▹", "▹▹▹▸▹", "▹▹▹▹▸", "▪▪▪▪▪",
        ]));
    }
    pb.set_message(message.to_string());
    pb
}

fn print_data(data: &Data) {
    if let Some(err) = &data.err {
        println!("{} {} {}", "Error:".red().bold(), data.url, err.to_string().red());
        return;
    }

    println!("\n{} {}", "Site:".green(), data.site.cyan());
    println!("{} {}", "Title:".green(), data.title.cyan());
    println!("{} {}", "Type:".green(), data.data_type.to_string().cyan());
    println!("{}", "Streams:".green().bold());
    for stream in data.sorted_streams() {
        println!(
            "  [{}] {} {}",
            stream.id.yellow(),
            stream.quality,
            format!("{} bytes, {}", stream.size, stream.ext).cyan()
        );
        if stream.need_mux {
            println!("    {}", "needs merging".yellow());
        }
        for part in &stream.parts {
            println!("    {}", part.url.as_str().blue());
        }
    }
    if let Some(caption) = &data.caption {
        println!("{} {}", "Caption:".green(), caption.url.as_str().blue());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cancellation = CancellationToken::new();
    let options = Options {
        playlist: args.playlist,
        items: args.items,
        item_start: args.item_start,
        item_end: args.item_end,
        thread_number: args.thread_number,
        cookie: args.cookie,
        extras: None,
        cancellation: cancellation.clone(),
    };

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling pending extractions");
            cancellation.cancel();
        }
    });

    let registry = default_registry().context("Failed to build extractor registry")?;

    let mut all = Vec::new();
    for url in &args.urls {
        if options.cancellation.is_cancelled() {
            break;
        }
        let pb = spinner(&format!("Extracting {url}..."));
        let result = registry.extract(url, &options).await;
        pb.finish_and_clear();

        if matches!(result, Err(ExtractorError::Cancelled)) {
            break;
        }
        let data = result.with_context(|| format!("Failed to extract {url}"))?;
        if args.json {
            all.extend(data);
        } else {
            data.iter().for_each(print_data);
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&all)?);
    }

    Ok(())
}
