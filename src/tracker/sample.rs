//! Samples
//!
//! A sample is a 256-step program read once per tick while a note sounds.
//! Each step carries stereo volume, tone/noise enables, the noise source and
//! a signed pitch shift added to the note's pitch word.
//!
//! Token layout (6 chars): `L R F SSS`
//! - `L`, `R`: volume nibbles (hex)
//! - `F`: bit 0 tone, bit 1 noise, bits 2-3 noise source (hex)
//! - `SSS`: 12-bit two's complement pitch shift (hex)

use super::tokens::{encode_digits, export_tokens, field, parse_tokens, sign_extend, Token};

/// Steps per sample
pub const SAMPLE_LENGTH: usize = 256;
/// Sample pool size (index 0 is the silent sample)
pub const MAX_SAMPLES: usize = 32;

/// One sample step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleStep {
    /// Left volume (0-15)
    pub volume_left: u8,
    /// Right volume (0-15)
    pub volume_right: u8,
    /// Tone enabled
    pub enable_freq: bool,
    /// Noise enabled
    pub enable_noise: bool,
    /// Noise source (0-3)
    pub noise_value: u8,
    /// Pitch shift in pitch-word units (-2048..=2047)
    pub shift: i16,
}

impl Token for SampleStep {
    fn encode(&self) -> String {
        let flags = u32::from(self.enable_freq)
            | (u32::from(self.enable_noise) << 1)
            | (u32::from(self.noise_value & 3) << 2);
        format!(
            "{}{}{}{}",
            encode_digits(u32::from(self.volume_left & 0x0F), 16, 1),
            encode_digits(u32::from(self.volume_right & 0x0F), 16, 1),
            encode_digits(flags, 16, 1),
            encode_digits((self.shift as u32) & 0xFFF, 16, 3),
        )
    }

    fn decode(token: &str) -> Self {
        let flags = field(token, 2, 1, 16, 0);
        SampleStep {
            volume_left: field(token, 0, 1, 16, 0) as u8,
            volume_right: field(token, 1, 1, 16, 0) as u8,
            enable_freq: flags & 1 != 0,
            enable_noise: flags & 2 != 0,
            noise_value: ((flags >> 2) & 3) as u8,
            shift: sign_extend(field(token, 3, 3, 16, 0), 12) as i16,
        }
    }
}

/// A sample program
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Display name
    pub name: String,
    /// Steps
    pub data: Vec<SampleStep>,
    /// Loop start step
    pub loop_start: usize,
    /// End step (exclusive)
    pub end: usize,
    /// Keeps looping while held, plays the tail after release
    pub releasable: bool,
}

impl Default for Sample {
    fn default() -> Self {
        Self {
            name: String::new(),
            data: vec![SampleStep::default(); SAMPLE_LENGTH],
            loop_start: 0,
            end: 0,
            releasable: false,
        }
    }
}

impl Sample {
    /// Create an empty sample
    pub fn new() -> Self {
        Self::default()
    }

    /// Step at `index` (default step past the buffer)
    #[inline]
    pub fn step(&self, index: usize) -> SampleStep {
        self.data.get(index).copied().unwrap_or_default()
    }

    /// Enforce `loop <= end <= 256`
    pub fn normalize(&mut self) {
        self.data.resize(SAMPLE_LENGTH, SampleStep::default());
        self.end = self.end.min(SAMPLE_LENGTH);
        self.loop_start = self.loop_start.min(self.end);
    }

    /// Cursor after `cursor`, or `None` once the note must stop
    ///
    /// Non-releasable samples jump to the loop at `end` and stop when the
    /// loop is empty. Releasable samples loop (or hold the last step) until
    /// released, then run through the tail to the last step.
    pub fn next_step(&self, cursor: usize, released: bool) -> Option<usize> {
        let next = cursor + 1;
        if self.releasable {
            if released {
                return (next < SAMPLE_LENGTH).then_some(next);
            }
            if next >= self.end {
                return Some(if self.loop_start < self.end {
                    self.loop_start
                } else {
                    self.end.saturating_sub(1)
                });
            }
            return Some(next);
        }
        if next >= self.end {
            return (self.loop_start < self.end).then_some(self.loop_start);
        }
        Some(next)
    }

    /// Whether an offset command may jump to `step`
    pub fn accepts_offset(&self, step: usize) -> bool {
        step < self.end || (self.releasable && step < SAMPLE_LENGTH)
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
