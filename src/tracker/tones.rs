//! Tone and vibrato lookup tables
//!
//! Tones map a scale index (1-96, C-1 .. B-8) to an 11-bit chip pitch word:
//! octave in bits 8-10, frequency offset in bits 0-7. The chip's octave
//! doubles the frequency but `511 - offset` is not a power of two, so every B
//! lives at the bottom of the next chip octave. That wraparound is the reason
//! the table is built rather than computed per lookup.

use std::fmt;
use std::sync::OnceLock;

/// Tone table size (index 0 is "no tone")
pub const TONE_COUNT: usize = 97;
/// Highest playable tone
pub const MAX_TONE: usize = 96;
/// Tones per octave
pub const TONES_PER_OCTAVE: usize = 12;
/// Pitch word domain (11 bits)
pub const PITCH_MASK: u16 = 0x7FF;

/// Vibrato/tremolo table: 32 depths × 64 phases
pub const VIBRATO_DEPTHS: usize = 32;
/// Phases per waveform cycle
pub const VIBRATO_PHASES: usize = 64;
/// Total vibrato table size
pub const VIBRATO_TABLE_SIZE: usize = VIBRATO_DEPTHS * VIBRATO_PHASES;

/// Frequency offsets for C .. A# within one chip octave
const BASE_OFFSETS: [u8; 11] = [33, 60, 85, 109, 132, 153, 173, 192, 210, 227, 243];
/// B sits at this offset in the following chip octave
const B_OFFSET: u8 = 5;

const NOTE_NAMES: [&str; TONES_PER_OCTAVE] = [
    "C-", "C#", "D-", "D#", "E-", "F-", "F#", "G-", "G#", "A-", "A#", "B-",
];

/// One tone table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tone {
    /// Chip pitch word (octave << 8 | offset)
    pub word: u16,
    /// Note within the octave (0 = C)
    pub note: u8,
    /// Musical octave (1-8), 0 for the empty entry
    pub octave: u8,
}

impl Tone {
    /// Chip octave (register value)
    pub fn chip_octave(&self) -> u8 {
        ((self.word >> 8) & 7) as u8
    }

    /// Chip frequency offset
    pub fn chip_offset(&self) -> u8 {
        (self.word & 0xFF) as u8
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.octave == 0 {
            return write!(f, "---");
        }
        write!(f, "{}{}", NOTE_NAMES[self.note as usize], self.octave)
    }
}

static TONE_TABLE: OnceLock<[Tone; TONE_COUNT]> = OnceLock::new();
static VIBRATO_TABLE: OnceLock<Box<[i16; VIBRATO_TABLE_SIZE]>> = OnceLock::new();

fn build_tone_table() -> [Tone; TONE_COUNT] {
    let mut table = [Tone::default(); TONE_COUNT];
    for (index, tone) in table.iter_mut().enumerate().skip(1) {
        let step = index - 1;
        let octave = step / TONES_PER_OCTAVE;
        let note = step % TONES_PER_OCTAVE;
        let (chip_octave, offset) = match BASE_OFFSETS.get(note) {
            Some(&offset) => (octave, offset),
            None => (octave + 1, B_OFFSET),
        };
        *tone = Tone {
            word: (((chip_octave & 7) as u16) << 8) | u16::from(offset),
            note: note as u8,
            octave: (octave + 1) as u8,
        };
    }
    table
}

/// Shared tone table
pub fn tone_table() -> &'static [Tone; TONE_COUNT] {
    TONE_TABLE.get_or_init(build_tone_table)
}

/// Wrap any tone arithmetic result into 1..=96
#[inline]
pub fn wrap_tone(tone: i32) -> usize {
    ((tone - 1).rem_euclid(MAX_TONE as i32) + 1) as usize
}

/// Pitch word of a (wrapped) tone
#[inline]
pub fn tone_word(tone: i32) -> u16 {
    tone_table()[wrap_tone(tone)].word
}

/// Shared vibrato/tremolo waveform: `round(depth * sin(2π * phase / 64))`
pub fn vibrato_table() -> &'static [i16; VIBRATO_TABLE_SIZE] {
    VIBRATO_TABLE.get_or_init(|| {
        let mut table = Box::new([0i16; VIBRATO_TABLE_SIZE]);
        for depth in 0..VIBRATO_DEPTHS {
            for phase in 0..VIBRATO_PHASES {
                let angle = 2.0 * std::f64::consts::PI * phase as f64 / VIBRATO_PHASES as f64;
                table[depth * VIBRATO_PHASES + phase] = (depth as f64 * angle.sin()).round() as i16;
            }
        }
        table
    })
}

/// Waveform value for a depth (clamped to 31) and phase (mod 64)
#[inline]
pub fn vibrato(depth: u8, phase: u8) -> i16 {
    let depth = (depth as usize).min(VIBRATO_DEPTHS - 1);
    vibrato_table()[depth * VIBRATO_PHASES + (phase as usize % VIBRATO_PHASES)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::tables::tone_frequency;

    #[test]
    fn test_tone_labels() {
        let table = tone_table();
        assert_eq!(table[0].to_string(), "---");
        assert_eq!(table[1].to_string(), "C-1");
        assert_eq!(table[38].to_string(), "C#4");
        assert_eq!(table[96].to_string(), "B-8");
    }

    #[test]
    fn test_b_wraps_into_next_octave() {
        let table = tone_table();
        assert_eq!(table[12].word, 0x105);
        assert_eq!(table[13].word, 0x121);
        // top B lands on chip octave 8, which the 3-bit field wraps to 0
        assert_eq!(table[96].word, 0x005);
    }

    #[test]
    fn test_tones_are_in_tune() {
        let table = tone_table();
        // A-4 at 440 Hz
        let a4 = table[46];
        let freq = tone_frequency(a4.chip_octave(), a4.chip_offset());
        assert!((freq - 440.0).abs() < 2.0, "A-4 = {freq}");

        for pair in table[1..96].windows(2) {
            let lo = tone_frequency(pair[0].chip_octave(), pair[0].chip_offset());
            let hi = tone_frequency(pair[1].chip_octave(), pair[1].chip_offset());
            assert!(hi > lo);
        }
    }

    #[test]
    fn test_wrap_tone() {
        assert_eq!(wrap_tone(1), 1);
        assert_eq!(wrap_tone(96), 96);
        assert_eq!(wrap_tone(97), 1);
        assert_eq!(wrap_tone(0), 96);
        assert_eq!(wrap_tone(-11), 85);
    }

    #[test]
    fn test_vibrato_shape() {
        assert_eq!(vibrato(0, 16), 0);
        assert_eq!(vibrato(10, 0), 0);
        assert_eq!(vibrato(10, 16), 10);
        assert_eq!(vibrato(10, 48), -10);
        assert_eq!(vibrato(31, 16), 31);
        assert_eq!(vibrato(200, 16), 31);
        assert_eq!(vibrato(8, 64 + 16), 8);
    }
}
