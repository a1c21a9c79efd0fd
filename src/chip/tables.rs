//! SAA1099 Hardware Constants
//!
//! Shared constants and lookup tables used across the generator components.
//! Computed tables are built on first use and shared by read-only reference.

use std::sync::OnceLock;

/// SAA1099 master clock (SAM Coupé, Creative Music System)
pub const CHIP_CLOCK: u32 = 8_000_000;

/// Fixed-point scale of the phase counters (12 fractional bits)
pub const COUNTER_SHIFT: u32 = 12;

/// Number of frequency octaves (3-bit octave field)
pub const OCTAVES: usize = 8;

/// Number of offsets per octave (8-bit offset register)
pub const OFFSETS: usize = 256;

/// Noise clock for source mode 0 (clock / 256), in counter units
///
/// Modes 1 and 2 halve it once and twice. Mode 3 is clocked by a
/// paired oscillator instead.
pub const NOISE_BASE_ADD: u32 = (CHIP_CLOCK / 256) << COUNTER_SHIFT;

/// Size of the output level lookup
pub const LEVEL_TABLE_SIZE: usize = 512;

/// Divisor normalising raw amplitudes: six saturated channels sum to 1.0
pub const LEVEL_DIVISOR: f32 = (15 * 32 * 6) as f32;

/// Phase-counter increments indexed by `[octave][offset]`
pub type FrequencyTable = [[u32; OFFSETS]; OCTAVES];

static FREQUENCY_TABLE: OnceLock<Box<FrequencyTable>> = OnceLock::new();
static LEVEL_TABLE: OnceLock<[f32; LEVEL_TABLE_SIZE]> = OnceLock::new();

/// Tone frequency in Hz produced by an octave/offset pair
///
/// `f = (clock / 512) * 2^octave / (511 - offset)`
pub fn tone_frequency(octave: u8, offset: u8) -> f64 {
    let base = f64::from(CHIP_CLOCK) / 512.0;
    base * f64::from(1u32 << (octave & 7)) / (511.0 - f64::from(offset))
}

fn build_frequency_table() -> Box<FrequencyTable> {
    let mut table = Box::new([[0u32; OFFSETS]; OCTAVES]);
    for (octave, row) in table.iter_mut().enumerate() {
        for (offset, slot) in row.iter_mut().enumerate() {
            // Two level flips per tone period
            let flips_per_second = 2.0 * tone_frequency(octave as u8, offset as u8);
            *slot = (flips_per_second * f64::from(1u32 << COUNTER_SHIFT)).round() as u32;
        }
    }
    table
}

/// Shared oscillator increment table
pub fn frequency_table() -> &'static FrequencyTable {
    FREQUENCY_TABLE.get_or_init(build_frequency_table)
}

/// Shared normalised output level table (`raw / (15 * 32 * 6)`)
pub fn level_table() -> &'static [f32; LEVEL_TABLE_SIZE] {
    LEVEL_TABLE.get_or_init(|| {
        let mut table = [0.0f32; LEVEL_TABLE_SIZE];
        for (raw, slot) in table.iter_mut().enumerate() {
            *slot = raw as f32 / LEVEL_DIVISOR;
        }
        table
    })
}
