//! Interactive batch entry point.

use std::io::{self, Write};

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lofi_pipeline::{AlbumBuilder, PipelineConfig, Services};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("lofi=info".parse().expect("static directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    // FFmpeg is needed long before the first assembly stage runs.
    lofi_media::check_ffmpeg().context("ffmpeg not found on PATH")?;
    lofi_media::check_ffprobe().context("ffprobe not found on PATH")?;

    let mut config = PipelineConfig::from_env();
    config.music_prompt = prompt_line("Music description", &config.music_prompt)?;
    config.cover_prompt = prompt_line("Cover description", &config.cover_prompt)?;
    config.songs_per_album = prompt_number("Song generations per album", config.songs_per_album)?;
    config.albums = prompt_number("Albums to produce", config.albums)?;

    let services =
        Services::from_env(config.fetch_attempts).context("failed to build service clients")?;
    let builder = AlbumBuilder::new(config.clone(), services);

    info!(albums = config.albums, "starting batch");
    let published = builder.run().await;
    info!(published, of = config.albums, "batch complete");

    Ok(())
}

/// Read one line; blank input keeps the default.
fn prompt_line(label: &str, default: &str) -> anyhow::Result<String> {
    print!("{label} [{default}]: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let trimmed = line.trim();
    Ok(if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    })
}

fn prompt_number(label: &str, default: usize) -> anyhow::Result<usize> {
    let answer = prompt_line(label, &default.to_string())?;
    answer
        .parse()
        .with_context(|| format!("'{answer}' is not a number"))
}
