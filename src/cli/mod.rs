//! CLI Module
//!
//! Command-line interface for the Sermo emotion classifier.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sermo - speech emotion recognition for short voice clips
#[derive(Parser, Debug)]
#[command(name = "sermo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON config file (otherwise read from SERMO_* environment variables)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify one audio file
    #[command(name = "predict")]
    Predict {
        /// Audio file (wav, mp3, flac, ogg, ...)
        file: PathBuf,

        /// Model variant: normal or mini
        #[arg(short, long)]
        model: Option<String>,

        /// Skip recording the prediction to the store
        #[arg(long)]
        no_store: bool,
    },

    /// Classify every audio file under a directory, one JSON line each
    #[command(name = "batch")]
    Batch {
        /// Directory to walk
        dir: PathBuf,

        /// Model variant: normal or mini
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Record a clip from the capture device and classify it
    #[command(name = "capture")]
    Capture {
        /// Model variant: normal or mini
        #[arg(short, long)]
        model: Option<String>,

        /// Seconds to record
        #[arg(short, long)]
        duration: Option<u32>,

        /// Archive the captured clip as WAV
        #[arg(long)]
        keep: bool,
    },

    /// List model variants and their feature configs
    #[command(name = "models")]
    Models,
}
