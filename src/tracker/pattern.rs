//! Patterns
//!
//! Token layout (9 chars): `TT S O VV C PP`
//! - `TT`: tone | release << 7 (hex)
//! - `S`: sample (radix 32)
//! - `O`: ornament | ornament release << 4 (radix 32)
//! - `VV`: stereo volume, low nibble left (hex, 0 = none)
//! - `C`: effect command (hex)
//! - `PP`: effect parameter (hex)

use super::tokens::{encode_digits, export_tokens, field, parse_tokens, Token};

/// Rows per pattern
pub const MAX_PATTERN_LENGTH: usize = 128;
/// Length of a newly created pattern
pub const DEFAULT_PATTERN_LENGTH: usize = 64;

/// Effect command nibbles
pub mod command {
    /// Portamento up
    pub const PORTAMENTO_UP: u8 = 0x1;
    /// Portamento down
    pub const PORTAMENTO_DOWN: u8 = 0x2;
    /// Glissando to the row's tone
    pub const GLISSANDO: u8 = 0x3;
    /// Vibrato
    pub const VIBRATO: u8 = 0x4;
    /// Tremolo
    pub const TREMOLO: u8 = 0x5;
    /// Ornament delay
    pub const ORNAMENT_DELAY: u8 = 0x6;
    /// Ornament offset
    pub const ORNAMENT_OFFSET: u8 = 0x7;
    /// Sample delay
    pub const SAMPLE_DELAY: u8 = 0x8;
    /// Sample offset
    pub const SAMPLE_OFFSET: u8 = 0x9;
    /// Volume slide
    pub const VOLUME_SLIDE: u8 = 0xA;
    /// Break pattern (not played back)
    pub const BREAK: u8 = 0xB;
    /// Height / stereo swap
    pub const SPECIAL: u8 = 0xC;
    /// Noise source / envelope control
    pub const SOUNDCHIP: u8 = 0xE;
    /// Speed change
    pub const SPEED: u8 = 0xF;
}

/// One pattern row for a single channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PatternRow {
    /// Tone index (0 = none)
    pub tone: u8,
    /// Note release
    pub release: bool,
    /// Sample index (0 = keep)
    pub sample: u8,
    /// Ornament index (0 = keep)
    pub ornament: u8,
    /// Detach the ornament
    pub ornament_release: bool,
    /// Stereo volume override, low nibble left (0 = none)
    pub volume: u8,
    /// Effect command (0 = none)
    pub command: u8,
    /// Effect parameter
    pub param: u8,
}

impl PatternRow {
    /// Speed set by this row, if any
    pub fn speed_change(&self) -> Option<u8> {
        (self.command == command::SPEED && self.param > 0).then_some(self.param)
    }
}

impl Token for PatternRow {
    fn encode(&self) -> String {
        let tone = u32::from(self.tone & 0x7F) | (u32::from(self.release) << 7);
        let ornament = u32::from(self.ornament & 0x0F) | (u32::from(self.ornament_release) << 4);
        format!(
            "{}{}{}{}{}{}",
            encode_digits(tone, 16, 2),
            encode_digits(u32::from(self.sample & 0x1F), 32, 1),
            encode_digits(ornament, 32, 1),
            encode_digits(u32::from(self.volume), 16, 2),
            encode_digits(u32::from(self.command & 0x0F), 16, 1),
            encode_digits(u32::from(self.param), 16, 2),
        )
    }

    fn decode(token: &str) -> Self {
        let tone = field(token, 0, 2, 16, 0);
        let ornament = field(token, 3, 1, 32, 0);
        PatternRow {
            tone: (tone & 0x7F) as u8,
            release: tone & 0x80 != 0,
            sample: field(token, 2, 1, 32, 0) as u8,
            ornament: (ornament & 0x0F) as u8,
            ornament_release: ornament & 0x10 != 0,
            volume: field(token, 4, 2, 16, 0) as u8,
            command: field(token, 6, 1, 16, 0) as u8,
            param: field(token, 7, 2, 16, 0) as u8,
        }
    }
}

/// A single-channel pattern
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    /// Rows
    pub data: Vec<PatternRow>,
    /// Rows at or past `end` are never played
    pub end: usize,
}

impl Default for Pattern {
    fn default() -> Self {
        Self {
            data: vec![PatternRow::default(); MAX_PATTERN_LENGTH],
            end: DEFAULT_PATTERN_LENGTH,
        }
    }
}

impl Pattern {
    /// Create an empty pattern
    pub fn new() -> Self {
        Self::default()
    }

    /// Row as the sequencer sees it (empty past `end`)
    #[inline]
    pub fn row(&self, line: usize) -> PatternRow {
        if line < self.end {
            self.data.get(line).copied().unwrap_or_default()
        } else {
            PatternRow::default()
        }
    }

    /// Enforce `end <= 128`
    pub fn normalize(&mut self) {
        self.data.resize(MAX_PATTERN_LENGTH, PatternRow::default());
        self.end = self.end.min(MAX_PATTERN_LENGTH);
    }

    /// Export rows as tokens
    pub fn export(&self, start: usize, length: Option<usize>, pack: bool) -> Vec<String> {
        export_tokens(&self.data, start, length, pack)
    }

    /// Parse tokens into rows
    pub fn parse<S: AsRef<str>>(&mut self, tokens: &[S], start: usize, length: Option<usize>) {
        parse_tokens(&mut self.data, tokens, start, length);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_token() {
        let row = PatternRow {
            tone: 37,
            release: false,
            sample: 31,
            ornament: 15,
            ornament_release: true,
            volume: 0xF8,
            command: 0x3,
            param: 0x21,
        };
        assert_eq!(row.encode(), "25vvf8321");
        assert_eq!(PatternRow::decode("25vvf8321"), row);
        assert_eq!(PatternRow::default().encode(), "000000000");
    }

    #[test]
    fn test_release_and_short_tokens() {
        let row = PatternRow::decode("80");
        assert!(row.release);
        assert_eq!(row.tone, 0);
        assert_eq!(row.sample, 0);
        assert_eq!(PatternRow::decode("zz1"), PatternRow {
            sample: 1,
            ..PatternRow::default()
        });
    }

    #[test]
    fn test_rows_past_end_are_empty() {
        let mut pattern = Pattern::new();
        pattern.data[10].tone = 1;
        pattern.end = 10;
        assert_eq!(pattern.row(10), PatternRow::default());
        pattern.end = 11;
        assert_eq!(pattern.row(10).tone, 1);
    }

    #[test]
    fn test_packed_round_trip() {
        let mut pattern = Pattern::new();
        pattern.data[0] = PatternRow::decode("25100f600");
        pattern.data[5] = PatternRow::decode("80");
        let tokens = pattern.export(0, None, true);
        assert_eq!(tokens.len(), 6);

        let mut parsed = Pattern::new();
        parsed.parse(&tokens, 0, None);
        assert_eq!(parsed.data, pattern.data);
        assert_eq!(parsed.row(0).speed_change(), None);
        assert_eq!(PatternRow::decode("00000f006").speed_change(), Some(6));
    }
}
