//! Song document (JSON)
//!
//! The persisted form of a song:
//!
//! ```json
//! {
//!   "title": "...", "author": "...",
//!   "samples": [...], "ornaments": [...], "patterns": [...], "positions": [...],
//!   "repeatPos": 0, "current": {...}, "ctrl": {...}, "config": {...},
//!   "version": "1.2"
//! }
//! ```
//!
//! Array slot N holds entity N+1; entry 0 of each pool is implicit. Loading
//! is all-or-nothing: a document is fully validated and converted into a new
//! [`Song`] before anything else sees it.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::ornament::{Ornament, MAX_ORNAMENTS};
use super::pattern::Pattern;
use super::position::{Position, PositionChannel};
use super::sample::{Sample, MAX_SAMPLES};
use super::song::Song;

/// The only accepted document version
pub const DOCUMENT_VERSION: &str = "1.2";

/// Result type for document operations
pub type DocumentResult<T> = std::result::Result<T, DocumentError>;

/// Errors raised while reading or writing a song document
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Malformed JSON or a field of the wrong shape
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Top-level value is not an object
    #[error("Song document must be a JSON object")]
    NotAnObject,

    /// Version other than "1.2"
    #[error("Unsupported document version: {0}")]
    UnsupportedVersion(String),

    /// Invalid value for a field
    #[error("Invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Invalid value
        value: String,
        /// Expected format
        expected: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persisted sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleDocument {
    /// Display name
    pub name: String,
    /// Loop start step
    #[serde(rename = "loop")]
    pub loop_start: usize,
    /// End step
    pub end: usize,
    /// Releasable flag
    pub releasable: bool,
    /// Packed step tokens
    pub data: Vec<String>,
}

/// Persisted ornament
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrnamentDocument {
    /// Display name
    pub name: String,
    /// Loop start step
    #[serde(rename = "loop")]
    pub loop_start: usize,
    /// End step
    pub end: usize,
    /// Packed step tokens
    pub data: Vec<String>,
}

/// Persisted pattern
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternDocument {
    /// Row count
    pub end: usize,
    /// Packed row tokens
    pub data: Vec<String>,
}

/// Persisted channel binding of a position
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionChannelDocument {
    /// Pattern index
    pub pattern: usize,
    /// Transpose in semitones
    pub pitch: i8,
}

/// Persisted position
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionDocument {
    /// Rows
    pub length: usize,
    /// Base speed
    pub speed: u8,
    /// Channel bindings
    pub ch: Vec<PositionChannelDocument>,
}

/// Editor cursor state stored with the song
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CurrentDocument {
    /// Selected sample
    pub sample: usize,
    /// Selected ornament
    pub ornament: usize,
    /// Selected pattern
    pub pattern: usize,
    /// Cursor position
    pub position: usize,
    /// Cursor line
    pub line: usize,
}

/// Editor control state stored with the song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CtrlDocument {
    /// Base octave for note entry
    pub octave: u8,
    /// Sample used for note entry
    pub sample: usize,
    /// Ornament used for note entry
    pub ornament: usize,
    /// Cursor advance after note entry
    pub row_step: usize,
}

impl Default for CtrlDocument {
    fn default() -> Self {
        Self {
            octave: 2,
            sample: 1,
            ornament: 0,
            row_step: 1,
        }
    }
}

/// Playback settings stored with the song
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigDocument {
    /// Interrupt rate in Hz
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupt: Option<u32>,
    /// Loop back to the repeat position at song end
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loop_mode: Option<bool>,
}

/// A complete song document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SongDocument {
    /// Song title
    pub title: String,
    /// Song author
    pub author: String,
    /// Samples 1..
    pub samples: Vec<SampleDocument>,
    /// Ornaments 1..
    pub ornaments: Vec<OrnamentDocument>,
    /// Patterns 1..
    pub patterns: Vec<PatternDocument>,
    /// Arrangement
    pub positions: Vec<PositionDocument>,
    /// Repeat position
    pub repeat_pos: usize,
    /// Editor cursor state
    pub current: CurrentDocument,
    /// Editor control state
    pub ctrl: CtrlDocument,
    /// Playback settings
    pub config: ConfigDocument,
    /// Document version
    pub version: String,
}

impl Default for SongDocument {
    fn default() -> Self {
        Self {
            title: String::new(),
            author: String::new(),
            samples: Vec::new(),
            ornaments: Vec::new(),
            patterns: Vec::new(),
            positions: Vec::new(),
            repeat_pos: 0,
            current: CurrentDocument::default(),
            ctrl: CtrlDocument::default(),
            config: ConfigDocument::default(),
            version: DOCUMENT_VERSION.to_string(),
        }
    }
}

impl SongDocument {
    /// Parse a JSON document, rejecting non-objects and foreign versions
    pub fn from_json(text: &str) -> DocumentResult<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let object = value.as_object().ok_or(DocumentError::NotAnObject)?;
        match object.get("version") {
            Some(serde_json::Value::String(version)) if version == DOCUMENT_VERSION => {}
            Some(serde_json::Value::String(version)) => {
                return Err(DocumentError::UnsupportedVersion(version.clone()));
            }
            Some(other) => {
                return Err(DocumentError::InvalidValue {
                    field: "version".to_string(),
                    value: other.to_string(),
                    expected: format!("the string \"{DOCUMENT_VERSION}\""),
                });
            }
            None => {
                return Err(DocumentError::InvalidValue {
                    field: "version".to_string(),
                    value: "<missing>".to_string(),
                    expected: format!("the string \"{DOCUMENT_VERSION}\""),
                });
            }
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Serialise as pretty-printed JSON
    pub fn to_json(&self) -> DocumentResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Read and validate a song document from disk
pub fn load_document<P: AsRef<Path>>(path: P) -> DocumentResult<SongDocument> {
    let text = fs::read_to_string(path.as_ref())?;
    let document = SongDocument::from_json(&text)?;
    debug!(path = %path.as_ref().display(), title = %document.title, "song document loaded");
    Ok(document)
}

/// Write a song document to disk
pub fn save_document<P: AsRef<Path>>(path: P, document: &SongDocument) -> DocumentResult<()> {
    fs::write(path.as_ref(), document.to_json()?)?;
    debug!(path = %path.as_ref().display(), "song document saved");
    Ok(())
}

impl Song {
    /// Build a song from a validated document.
    ///
    /// Excess pool entries are dropped and out-of-range indices fall back to
    /// entry 0; both are logged.
    pub fn from_document(document: &SongDocument) -> Song {
        let mut song = Song::new();
        song.title = document.title.clone();
        song.author = document.author.clone();
        song.current = document.current.clone();
        song.ctrl = document.ctrl.clone();
        song.config = document.config.clone();

        if document.samples.len() >= MAX_SAMPLES {
            warn!(count = document.samples.len(), "excess samples dropped");
        }
        for (slot, doc) in song.samples.iter_mut().skip(1).zip(&document.samples) {
            let mut sample = Sample {
                name: doc.name.clone(),
                loop_start: doc.loop_start,
                end: doc.end,
                releasable: doc.releasable,
                ..Sample::default()
            };
            sample.parse(&doc.data, 0, None);
            sample.normalize();
            *slot = sample;
        }

        if document.ornaments.len() >= MAX_ORNAMENTS {
            warn!(count = document.ornaments.len(), "excess ornaments dropped");
        }
        for (slot, doc) in song.ornaments.iter_mut().skip(1).zip(&document.ornaments) {
            let mut ornament = Ornament {
                name: doc.name.clone(),
                loop_start: doc.loop_start,
                end: doc.end,
                ..Ornament::default()
            };
            ornament.parse(&doc.data, 0, None);
            ornament.normalize();
            *slot = ornament;
        }

        for doc in &document.patterns {
            let mut pattern = Pattern {
                end: doc.end,
                ..Pattern::default()
            };
            pattern.parse(&doc.data, 0, None);
            pattern.normalize();
            song.patterns.push(pattern);
        }

        let pattern_count = song.patterns.len();
        for (index, doc) in document.positions.iter().enumerate() {
            let mut position = Position::new(doc.length, doc.speed);
            for (channel, binding) in position.channels.iter_mut().zip(&doc.ch) {
                let pattern = if binding.pattern < pattern_count {
                    binding.pattern
                } else {
                    warn!(position = index, pattern = binding.pattern, "unknown pattern replaced by 0");
                    0
                };
                *channel = PositionChannel {
                    pattern,
                    transpose: binding.pitch,
                };
            }
            song.positions.push(position);
        }

        song.repeat_position = if document.repeat_pos < song.positions.len() {
            document.repeat_pos
        } else {
            if document.repeat_pos > 0 {
                warn!(repeat = document.repeat_pos, "repeat position out of range");
            }
            0
        };
        song.recompute_row_timings(None);
        song
    }

    /// Convert to a document (packed tokens, version "1.2")
    pub fn to_document(&self) -> SongDocument {
        SongDocument {
            title: self.title.clone(),
            author: self.author.clone(),
            samples: self
                .samples
                .iter()
                .skip(1)
                .map(|s| SampleDocument {
                    name: s.name.clone(),
                    loop_start: s.loop_start,
                    end: s.end,
                    releasable: s.releasable,
                    data: s.export(0, None, true),
                })
                .collect(),
            ornaments: self
                .ornaments
                .iter()
                .skip(1)
                .map(|o| OrnamentDocument {
                    name: o.name.clone(),
                    loop_start: o.loop_start,
                    end: o.end,
                    data: o.export(0, None, true),
                })
                .collect(),
            patterns: self
                .patterns
                .iter()
                .skip(1)
                .map(|p| PatternDocument {
                    end: p.end,
                    data: p.export(0, None, true),
                })
                .collect(),
            positions: self
                .positions
                .iter()
                .map(|p| PositionDocument {
                    length: p.length,
                    speed: p.speed,
                    ch: p
                        .channels
                        .iter()
                        .map(|c| PositionChannelDocument {
                            pattern: c.pattern,
                            pitch: c.transpose,
                        })
                        .collect(),
                })
                .collect(),
            repeat_pos: self.repeat_position,
            current: self.current.clone(),
            ctrl: self.ctrl.clone(),
            config: self.config.clone(),
            version: DOCUMENT_VERSION.to_string(),
        }
    }

    /// Parse a JSON song; the caller's song is untouched on error
    pub fn from_json(text: &str) -> DocumentResult<Song> {
        SongDocument::from_json(text).map(|doc| Song::from_document(&doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_object() {
        assert!(matches!(
            SongDocument::from_json("[1, 2, 3]"),
            Err(DocumentError::NotAnObject)
        ));
        assert!(matches!(
            SongDocument::from_json("\"song\""),
            Err(DocumentError::NotAnObject)
        ));
    }

    #[test]
    fn test_rejects_other_versions() {
        let err = SongDocument::from_json(r#"{"version": "1.1"}"#).unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedVersion(ref v) if v == "1.1"));

        let err = SongDocument::from_json(r#"{"version": 1.2}"#).unwrap_err();
        assert!(matches!(err, DocumentError::InvalidValue { .. }));

        let err = SongDocument::from_json(r#"{"title": "x"}"#).unwrap_err();
        assert!(matches!(err, DocumentError::InvalidValue { .. }));
    }

    #[test]
    fn test_syntax_error() {
        assert!(matches!(
            SongDocument::from_json("{\"version\": "),
            Err(DocumentError::Json(_))
        ));
    }

    #[test]
    fn test_minimal_document() {
        let doc = SongDocument::from_json(r#"{"version": "1.2", "title": "Tiny"}"#).unwrap();
        let song = Song::from_document(&doc);
        assert_eq!(song.title, "Tiny");
        assert_eq!(song.samples.len(), MAX_SAMPLES);
        assert_eq!(song.patterns.len(), 1);
        assert!(song.positions.is_empty());
    }

    #[test]
    fn test_settings_survive_conversion() {
        let json = r#"{
            "version": "1.2",
            "current": {"sample": 3, "position": 1, "line": 12},
            "ctrl": {"octave": 4, "rowStep": 2},
            "config": {"interrupt": 60, "loopMode": false}
        }"#;
        let doc = SongDocument::from_json(json).unwrap();
        let song = Song::from_document(&doc);
        assert_eq!(song.config.interrupt, Some(60));
        assert_eq!(song.ctrl.row_step, 2);

        let back = song.to_document();
        assert_eq!(back.current, doc.current);
        assert_eq!(back.ctrl, doc.ctrl);
        assert_eq!(back.config, doc.config);
        assert_eq!(back.version, DOCUMENT_VERSION);
    }

    #[test]
    fn test_slot_mapping_and_clamping() {
        let json = r#"{
            "version": "1.2",
            "samples": [{"name": "lead", "loop": 9, "end": 4, "data": ["f01000"]}],
            "patterns": [{"end": 16, "data": ["25100f000"]}],
            "positions": [{"length": 16, "speed": 4, "ch": [{"pattern": 1, "pitch": -2}, {"pattern": 7}]}],
            "repeatPos": 5
        }"#;
        let song = Song::from_json(json).unwrap();
        assert_eq!(song.samples[1].name, "lead");
        assert_eq!(song.samples[1].loop_start, 4);
        assert_eq!(song.samples[1].data[0].volume_left, 15);
        assert_eq!(song.patterns[1].data[0].tone, 0x25);
        assert_eq!(song.positions[0].channels[0].transpose, -2);
        assert_eq!(song.positions[0].channels[1].pattern, 0);
        assert_eq!(song.repeat_position, 0);
        assert_eq!(song.positions[0].total_ticks(), 64);
    }
}
