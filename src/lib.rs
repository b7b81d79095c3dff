//! Sermo - Speech Emotion Recognition
//!
//! Classifies a short voice clip as happy, neutral or sad. Audio of any
//! supported format is normalized to a 3 second mono clip, turned into an
//! MFCC tensor shaped for the chosen model variant, and run through a
//! pre-trained classifier.
//!
//! # Architecture
//!
//! - `engine`: decoding and normalization to the canonical waveform
//! - `dsp` / `features`: MFCC extraction per variant config
//! - `neural`: classifier seam and the lazily-populated model registry
//! - `inference`: the end-to-end service
//! - `store` / `capture`: persistence and device-capture collaborators

pub mod capture;
pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod features;
pub mod inference;
pub mod neural;
pub mod store;

pub use error::{Result, SermoError};
