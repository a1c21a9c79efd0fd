//! Ornaments: per-tick signed semitone offsets added to the note
//!
//! Token layout (2 chars): 8-bit two's complement offset (hex).

use super::sample::SAMPLE_LENGTH;
use super::tokens::{encode_digits, export_tokens, field, parse_tokens, sign_extend, Token};

/// Steps per ornament
pub const ORNAMENT_LENGTH: usize = SAMPLE_LENGTH;
/// Ornament pool size (index 0 is the neutral ornament)
pub const MAX_ORNAMENTS: usize = 16;

/// One ornament step (semitones)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrnamentStep(pub i8);

impl Token for OrnamentStep {
    fn encode(&self) -> String {
        encode_digits(u32::from(self.0 as u8), 16, 2)
    }

    fn decode(token: &str) -> Self {
        OrnamentStep(sign_extend(field(token, 0, 2, 16, 0), 8) as i8)
    }
}

/// An ornament program
#[derive(Debug, Clone, PartialEq)]
pub struct Ornament {
    /// Display name
    pub name: String,
    /// Steps
    pub data: Vec<OrnamentStep>,
    /// Loop start step
    pub loop_start: usize,
    /// End step (exclusive)
    pub end: usize,
}

impl Default for Ornament {
    fn default() -> Self {
        Self {
            name: String::new(),
            data: vec![OrnamentStep::default(); ORNAMENT_LENGTH],
            loop_start: 0,
            end: 0,
        }
    }
}

impl Ornament {
    /// Create a neutral ornament
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset at `cursor`; zero past `end`
    #[inline]
    pub fn offset(&self, cursor: usize) -> i8 {
        if cursor < self.end {
            self.data.get(cursor).map_or(0, |step| step.0)
        } else {
            0
        }
    }

    /// Cursor after `cursor`: loops at `end` when a loop exists, otherwise
    /// runs off the end (offset 0 from then on)
    #[inline]
    pub fn next_step(&self, cursor: usize) -> usize {
        let next = cursor + 1;
        if next >= self.end && self.loop_start < self.end {
            self.loop_start
        } else {
            next.min(ORNAMENT_LENGTH)
        }
    }

    /// Enforce `loop <= end <= 256`
    pub fn normalize(&mut self) {
        self.data.resize(ORNAMENT_LENGTH, OrnamentStep::default());
        self.end = self.end.min(ORNAMENT_LENGTH);
        self.loop_start = self.loop_start.min(self.end);
    }

    /// Export steps as tokens
    pub fn export(&self, start: usize, length: Option<usize>, pack: bool) -> Vec<String> {
        export_tokens(&self.data, start, length, pack)
    }

    /// Parse tokens into steps
    pub fn parse<S: AsRef<str>>(&mut self, tokens: &[S], start: usize, length: Option<usize>) {
        parse_tokens(&mut self.data, tokens, start, length);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_token() {
        assert_eq!(OrnamentStep(-1).encode(), "ff");
        assert_eq!(OrnamentStep(12).encode(), "0c");
        assert_eq!(OrnamentStep::decode("f4"), OrnamentStep(-12));
        assert_eq!(OrnamentStep::decode("?"), OrnamentStep(0));
    }

    #[test]
    fn test_looping_arpeggio() {
        let mut orn = Ornament::new();
        orn.parse(&["00", "04", "07"], 0, None);
        orn.end = 3;
        let mut cursor = 0;
        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(orn.offset(cursor));
            cursor = orn.next_step(cursor);
        }
        assert_eq!(seen, vec![0, 4, 7, 0, 4, 7]);
    }

    #[test]
    fn test_one_shot_runs_out() {
        let mut orn = Ornament::new();
        orn.parse(&["0c", "07"], 0, None);
        orn.end = 2;
        orn.loop_start = 2;
        assert_eq!(orn.offset(0), 12);
        let cursor = orn.next_step(orn.next_step(0));
        assert_eq!(orn.offset(cursor), 0);
        assert_eq!(orn.export(0, None, true), vec!["0c", "07"]);
    }
}
