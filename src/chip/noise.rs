//! Noise generator
//!
//! Two instances exist, one per channel triplet. Each is a 31-bit feedback
//! shift register stepped by one of three internal clocks, or by the paired
//! oscillator when the source mode is 3.

use super::tables::{COUNTER_SHIFT, NOISE_BASE_ADD};

/// Seed of the generator shared by channels 0-2
pub const NOISE_SEED_0: u32 = 0x1111_1111;
/// Seed of the generator shared by channels 3-5
pub const NOISE_SEED_1: u32 = 0x2222_2222;

/// Feedback taps (bits 30 and 2)
const TAPS: u32 = 0x4000_0004;

/// Source mode clocked by the paired oscillator
pub const SOURCE_EXTERNAL: u8 = 3;

/// Shift-register noise generator
#[derive(Clone, Debug)]
pub struct NoiseGenerator {
    counter: u32,
    add: u32,
    threshold: u32,
    source: u8,
    rand: u32,
    seed: u32,
    sync: bool,
}

impl NoiseGenerator {
    /// Create a generator with the given seed (must be non-zero)
    pub fn new(seed: u32, sample_rate: u32) -> Self {
        let seed = if seed == 0 { NOISE_SEED_0 } else { seed };
        Self {
            counter: 0,
            add: NOISE_BASE_ADD,
            threshold: sample_rate.max(1) << COUNTER_SHIFT,
            source: 0,
            rand: seed,
            seed,
            sync: false,
        }
    }

    /// Select the clock source (0-2 internal divisors, 3 external)
    pub fn set_source(&mut self, mode: u8) {
        self.source = mode & 3;
        self.add = NOISE_BASE_ADD >> self.source;
    }

    /// Current source mode
    pub fn source(&self) -> u8 {
        self.source
    }

    #[inline]
    fn shift(&mut self) {
        let taps = self.rand & TAPS;
        if taps != 0 && taps != TAPS {
            self.rand = (self.rand << 1) | 1;
        } else {
            self.rand <<= 1;
        }
    }

    /// Advance one host sample on the internal clock
    #[inline]
    pub fn tick(&mut self) -> u8 {
        if !self.sync && self.source != SOURCE_EXTERNAL {
            self.counter += self.add;
            while self.counter >= self.threshold {
                self.counter -= self.threshold;
                self.shift();
            }
        }
        self.level()
    }

    /// Step once from the paired oscillator (source mode 3 only)
    #[inline]
    pub fn trigger(&mut self) {
        if self.source == SOURCE_EXTERNAL {
            self.shift();
        }
    }

    /// Output bit (0 or 1)
    #[inline]
    pub fn level(&self) -> u8 {
        (self.rand & 1) as u8
    }

    /// Halt (or resume) the internal clock
    pub fn set_sync(&mut self, sync: bool) {
        self.sync = sync;
        if sync {
            self.counter = 0;
        }
    }

    /// Restore the power-on register contents
    pub fn reset(&mut self) {
        self.rand = self.seed;
        self.counter = 0;
    }

    /// Raw shift register (diagnostics)
    pub fn register(&self) -> u32 {
        self.rand
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(seed: u32, mode: u8, count: usize) -> Vec<u8> {
        let mut noise = NoiseGenerator::new(seed, 44_100);
        noise.set_source(mode);
        (0..count).map(|_| noise.tick()).collect()
    }

    #[test]
    fn test_sequence_is_reproducible() {
        assert_eq!(sequence(NOISE_SEED_0, 0, 500), sequence(NOISE_SEED_0, 0, 500));
        assert_ne!(sequence(NOISE_SEED_0, 0, 500), sequence(NOISE_SEED_1, 0, 500));
    }

    #[test]
    fn test_sequence_varies() {
        let out = sequence(NOISE_SEED_0, 0, 200);
        assert!(out.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_external_mode_only_moves_on_trigger() {
        let mut noise = NoiseGenerator::new(NOISE_SEED_1, 44_100);
        noise.set_source(SOURCE_EXTERNAL);
        let before = noise.register();
        for _ in 0..10_000 {
            noise.tick();
        }
        assert_eq!(noise.register(), before);

        noise.trigger();
        assert_ne!(noise.register(), before);
    }

    #[test]
    fn test_trigger_ignored_on_internal_clock() {
        let mut noise = NoiseGenerator::new(NOISE_SEED_0, 44_100);
        noise.set_source(1);
        let before = noise.register();
        noise.trigger();
        assert_eq!(noise.register(), before);
    }

    #[test]
    fn test_feedback_taps() {
        let mut noise = NoiseGenerator::new(0x0000_0004, 44_100);
        noise.set_source(SOURCE_EXTERNAL);
        noise.trigger();
        assert_eq!(noise.register(), 0x0000_0009);

        let mut noise = NoiseGenerator::new(0x4000_0004, 44_100);
        noise.set_source(SOURCE_EXTERNAL);
        noise.trigger();
        assert_eq!(noise.register(), 0x8000_0008);
    }
}
