//! tickshred - play or render the demo patch
//!
//! Run with: cargo run -- play
//!       or: cargo run -- render out.wav --seconds 8

mod app;
mod patch;
mod render;
mod ui;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result as EyreResult, WrapErr};
use tickshred::engine::config::DEFAULT_COMMAND_CAPACITY;
use tickshred::ServerConfig;
use tracing_subscriber::EnvFilter;

use app::Player;

#[derive(Parser)]
#[command(name = "tickshred")]
#[command(about = "Sample-accurate shred scheduler driving a pull-based signal graph", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play the demo patch on the default output device
    Play {
        /// Stop after this many seconds (default: run until [Q])
        #[arg(short, long)]
        seconds: Option<f64>,

        /// Write logs to this file (the terminal belongs to the UI)
        #[arg(long)]
        log: Option<PathBuf>,

        /// Slots in the UI command queue
        #[arg(long, default_value_t = DEFAULT_COMMAND_CAPACITY)]
        command_capacity: usize,
    },
    /// Render the demo patch to a 16-bit WAV file
    Render {
        /// Output WAV file path
        output: PathBuf,

        /// Duration in seconds
        #[arg(short, long, default_value = "8.0")]
        seconds: f64,

        /// Sample rate in Hz
        #[arg(short = 'r', long, default_value = "44100")]
        sample_rate: u32,

        /// Output channels
        #[arg(short, long, default_value = "2")]
        channels: usize,
    },
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            seconds,
            log,
            command_capacity,
        } => {
            if let Some(path) = log {
                let file = File::create(&path)
                    .wrap_err_with(|| format!("failed to create log file {}", path.display()))?;
                tracing_subscriber::fmt()
                    .with_env_filter(env_filter())
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .init();
            }
            Player::new()
                .seconds(seconds)
                .command_capacity(command_capacity)
                .run()
        }
        Commands::Render {
            output,
            seconds,
            sample_rate,
            channels,
        } => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(std::io::stderr)
                .init();
            let config = ServerConfig::new()
                .sample_rate(sample_rate)
                .input_channels(0)
                .output_channels(channels);
            render::render(&output, config, seconds)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_accepts_command_capacity() {
        let cli = Cli::try_parse_from(["tickshred", "play", "--command-capacity", "64"]).unwrap();
        match cli.command {
            Commands::Play {
                command_capacity, ..
            } => assert_eq!(command_capacity, 64),
            Commands::Render { .. } => panic!("parsed as render"),
        }

        let cli = Cli::try_parse_from(["tickshred", "play"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Play {
                command_capacity: DEFAULT_COMMAND_CAPACITY,
                ..
            }
        ));
    }
}
