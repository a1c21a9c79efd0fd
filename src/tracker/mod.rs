//! Song data model
//!
//! Samples, ornaments, patterns and positions, their dense token forms, and
//! the JSON song document.

pub mod document;
pub mod ornament;
pub mod pattern;
pub mod position;
pub mod sample;
pub mod song;
pub mod tokens;
pub mod tones;

pub use document::{load_document, save_document, DocumentError, SongDocument};
pub use ornament::{Ornament, OrnamentStep};
pub use pattern::{Pattern, PatternRow};
pub use position::{Position, PositionChannel};
pub use sample::{Sample, SampleStep};
pub use song::Song;
pub use tokens::Token;
pub use tones::{tone_table, Tone};
