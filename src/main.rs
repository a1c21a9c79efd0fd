//! Command-line tool for SAA1099 song documents.
//!
//! `info` prints what a song document holds; `render` plays it once through
//! the emulated chip into a WAV file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use saa1099::export::{export_to_wav_with_config, ExportConfig};
use saa1099::{load_document, Player, PlayerConfig, Song, SongDocument};

#[derive(Parser)]
#[command(name = "saa1099")]
#[command(about = "Inspect and render SAA1099 tracker songs")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print title, author, arrangement and duration
    Info {
        /// Song document (JSON)
        song: PathBuf,
    },
    /// Render the song once to a 16-bit stereo WAV file
    Render {
        /// Song document (JSON)
        song: PathBuf,

        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,

        /// Sample rate in Hz
        #[arg(long, default_value_t = saa1099::config::DEFAULT_SAMPLE_RATE)]
        rate: u32,

        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<f64>,

        /// Fade out over the last N seconds
        #[arg(long, default_value_t = 0.0)]
        fade: f32,

        /// Keep the raw mix level instead of normalizing
        #[arg(long)]
        no_normalize: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match args.command {
        Command::Info { song } => print_info(&song),
        Command::Render {
            song,
            output,
            rate,
            seconds,
            fade,
            no_normalize,
        } => {
            let mut export = ExportConfig::default()
                .normalize(!no_normalize)
                .fade_out(fade);
            if let Some(seconds) = seconds {
                export = export.max_seconds(seconds);
            }
            render(&song, &output, rate, export)
        }
    }
}

fn load(path: &Path) -> Result<(SongDocument, Song)> {
    let doc = load_document(path).with_context(|| format!("Failed to load {}", path.display()))?;
    let song = Song::from_document(&doc);
    Ok((doc, song))
}

fn print_info(path: &Path) -> Result<()> {
    let (doc, song) = load(path)?;
    let mut config = PlayerConfig::default();
    config.apply_document(&doc.config);

    let ticks = song.total_ticks();
    let seconds = ticks as f64 / f64::from(config.interrupt_hz);
    let samples = song.samples.iter().skip(1).filter(|s| s.end > 0).count();
    let ornaments = song.ornaments.iter().skip(1).filter(|o| o.end > 0).count();

    println!("Title:     {}", song.title);
    println!("Author:    {}", song.author);
    println!(
        "Positions: {} (repeat at {})",
        song.positions.len(),
        song.repeat_position
    );
    println!("Patterns:  {}", song.patterns.len().saturating_sub(1));
    println!("Samples:   {}", samples);
    println!("Ornaments: {}", ornaments);
    println!("Interrupt: {} Hz", config.interrupt_hz);
    println!(
        "Duration:  {} ticks ({}:{:05.2})",
        ticks,
        (seconds / 60.0) as u64,
        seconds % 60.0
    );
    Ok(())
}

fn render(path: &Path, output: &Path, rate: u32, export: ExportConfig) -> Result<()> {
    let (doc, song) = load(path)?;
    let mut config = PlayerConfig::with_sample_rate(rate);
    config.apply_document(&doc.config);

    info!(title = %song.title, rate, "rendering");
    let mut player = Player::new(song, config).context("Invalid player configuration")?;
    let summary = export_to_wav_with_config(&mut player, output, export)
        .with_context(|| format!("Failed to render {}", output.display()))?;

    println!(
        "Wrote {} ({:.1}s, {} ticks)",
        output.display(),
        summary.seconds(),
        summary.ticks
    );
    Ok(())
}
