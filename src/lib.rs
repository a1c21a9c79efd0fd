//! SAA1099 PSG emulator and pattern sequencer
//!
//! A cycle-accurate emulation of the Philips SAA1099 six-channel sound
//! generator, together with the song model and sequencer of a pattern-based
//! chiptune tracker built around it.
//!
//! # Features
//! - Six square-wave oscillators with octave/offset pitch and latched updates
//! - Two noise generators with fixed or oscillator-driven clocking
//! - Two envelope generators with the eight hardware waveforms
//! - Stereo amplitude mixing normalised to `[-1, 1]`
//! - Samples, ornaments, patterns and positions with dense text tokens
//! - JSON song documents (version 1.2)
//! - A tick-based sequencer with effect commands, sample preview and
//!   mid-song starts
//! - WAV rendering of whole songs
//!
//! # Crate feature flags
//! - `export-wav` (default): WAV rendering through `hound` (`export`) and the
//!   `saa1099` command-line tool
//!
//! # Quick start
//! ## Chip only
//! ```
//! use saa1099::Saa1099;
//!
//! let mut chip = Saa1099::new(44_100);
//! chip.write(0x00, 0x0F); // channel 0 amplitude, left full
//! chip.write(0x08, 0x21); // channel 0 offset
//! chip.write(0x10, 0x03); // channels 0/1 octave
//! chip.write(0x14, 0x01); // channel 0 tone on
//! chip.write(0x1C, 0x01); // sound enable
//!
//! let mut left = vec![0.0f32; 441];
//! let mut right = vec![0.0f32; 441];
//! chip.render(&mut left, &mut right, 441, 0);
//! ```
//!
//! ## Song playback
//! ```no_run
//! use saa1099::{load_document, Player, PlayerConfig, Song};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let doc = load_document("song.json")?;
//! let mut config = PlayerConfig::default();
//! config.apply_document(&doc.config);
//!
//! let mut player = Player::new(Song::from_document(&doc), config)?;
//! player.play_position_from_line(true, true, true);
//!
//! let mut buffer = vec![0.0f32; 2 * 1024];
//! player.fill_interleaved(&mut buffer);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod chip; // SAA1099 emulation (core)
pub mod config; // Player Settings
pub mod export; // Offline Rendering
pub mod player; // Sequencer
pub mod tracker; // Song Model & Documents

use tracker::DocumentError;

/// Error types for emulator and sequencer operations
#[derive(thiserror::Error, Debug)]
pub enum Saa1099Error {
    /// IO error from filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Song document could not be read
    #[error("Song document error: {0}")]
    Document(#[from] DocumentError),

    /// Error writing audio file
    #[error("Export error: {0}")]
    Export(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for Saa1099Error {
    /// Converts a String into `Saa1099Error::Other`.
    fn from(msg: String) -> Self {
        Saa1099Error::Other(msg)
    }
}

/// Result type for emulator and sequencer operations
pub type Result<T> = std::result::Result<T, Saa1099Error>;

// Public API exports
pub use chip::{RegisterImage, Saa1099, Saa1099Backend, NUM_CHANNELS};
pub use config::PlayerConfig;
pub use player::{shared, Player, PlayerState, SharedPlayer};
pub use tracker::{
    load_document, save_document, Ornament, Pattern, PatternRow, Position, Sample, Song,
    SongDocument,
};
