//! Frequency oscillator
//!
//! Each of the six channels owns a square-wave generator. A 12-bit
//! fixed-point phase counter advances once per host sample; every overflow
//! flips the output between 0 and 2 and may clock a paired envelope or
//! noise generator (wiring is resolved by the chip facade).
//!
//! Octave and offset writes are buffered and committed on the next flip.
//! An octave write holds back the offset: the flip after it commits only
//! the octave, and the offset lands one flip later. An offset write clears
//! that hold only while no octave change is buffered.

use super::tables::{frequency_table, COUNTER_SHIFT};

/// Square-wave frequency generator for a single channel
#[derive(Clone, Debug)]
pub struct Oscillator {
    counter: u32,
    add: u32,
    threshold: u32,
    level: u8,
    current_octave: u8,
    current_offset: u8,
    next_octave: u8,
    next_offset: u8,
    new_data: bool,
    ignore_offset: bool,
    sync: bool,
}

impl Oscillator {
    /// Create an oscillator rendering at the given host sample rate
    pub fn new(sample_rate: u32) -> Self {
        let mut osc = Self {
            counter: 0,
            add: 0,
            threshold: sample_rate.max(1) << COUNTER_SHIFT,
            level: 0,
            current_octave: 0,
            current_offset: 0,
            next_octave: 0,
            next_offset: 0,
            new_data: false,
            ignore_offset: false,
            sync: false,
        };
        osc.add = osc.lookup();
        osc
    }

    fn lookup(&self) -> u32 {
        frequency_table()[(self.current_octave & 7) as usize][self.current_offset as usize]
    }

    /// Buffer a new offset (register 8-13)
    pub fn set_offset(&mut self, offset: u8) {
        if self.sync {
            self.current_offset = offset;
            self.next_offset = offset;
            self.current_octave = self.next_octave;
            self.new_data = false;
            self.add = self.lookup();
            return;
        }
        self.next_offset = offset;
        self.new_data = true;
        if self.next_octave == self.current_octave {
            self.ignore_offset = false;
        }
    }

    /// Buffer a new octave (registers 16-18)
    pub fn set_octave(&mut self, octave: u8) {
        let octave = octave & 7;
        if self.sync {
            self.current_octave = octave;
            self.next_octave = octave;
            self.current_offset = self.next_offset;
            self.new_data = false;
            self.add = self.lookup();
            return;
        }
        self.next_octave = octave;
        self.new_data = true;
        self.ignore_offset = true;
    }

    /// Commit buffered data at a half-cycle boundary
    fn apply_pending(&mut self) {
        if !self.new_data {
            return;
        }
        self.current_octave = self.next_octave;
        if self.ignore_offset {
            // offset stays flagged as new for the following flip
            self.ignore_offset = false;
        } else {
            self.current_offset = self.next_offset;
            self.new_data = false;
        }
        self.add = self.lookup();
    }

    /// Advance one host sample.
    ///
    /// Returns the number of level flips that happened during this sample so
    /// the caller can clock whatever is wired to this oscillator.
    #[inline]
    pub fn tick(&mut self) -> u32 {
        if self.sync {
            return 0;
        }
        let mut flips = 0;
        self.counter += self.add;
        while self.counter >= self.threshold {
            self.counter -= self.threshold;
            self.level = 2 - self.level;
            flips += 1;
            self.apply_pending();
        }
        flips
    }

    /// Current output level (0 or 2)
    #[inline]
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Force a known state and halt (or resume) ticking
    pub fn set_sync(&mut self, sync: bool) {
        self.sync = sync;
        if sync {
            self.counter = 0;
            self.level = 0;
            self.current_octave = self.next_octave;
            self.current_offset = self.next_offset;
            self.new_data = false;
            self.ignore_offset = false;
            self.add = self.lookup();
        }
    }

    /// Committed (octave, offset)
    pub fn applied(&self) -> (u8, u8) {
        (self.current_octave, self.current_offset)
    }

    /// Buffered (octave, offset) as last written
    pub fn pending(&self) -> (u8, u8) {
        (self.next_octave, self.next_offset)
    }

    /// Whether a buffered write is still waiting for a flip
    pub fn has_pending(&self) -> bool {
        self.new_data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::tables::tone_frequency;

    fn run_until_flip(osc: &mut Oscillator) {
        for _ in 0..1_000_000 {
            if osc.tick() > 0 {
                return;
            }
        }
        panic!("oscillator never flipped");
    }

    #[test]
    fn test_flip_rate_matches_frequency() {
        let rate = 44_100;
        let mut osc = Oscillator::new(rate);
        osc.set_sync(true);
        osc.set_offset(100);
        osc.set_octave(4);
        osc.set_sync(false);

        let flips: u32 = (0..rate).map(|_| osc.tick()).sum();
        let expected = 2.0 * tone_frequency(4, 100);
        assert!(
            (f64::from(flips) - expected).abs() <= 1.0,
            "flips={flips} expected={expected}"
        );
    }

    #[test]
    fn test_octave_then_offset_defers_offset_one_flip() {
        let mut osc = Oscillator::new(44_100);
        osc.set_sync(true);
        osc.set_offset(10);
        osc.set_octave(5);
        osc.set_sync(false);
        assert_eq!(osc.applied(), (5, 10));

        osc.set_octave(6);
        osc.set_offset(200);

        run_until_flip(&mut osc);
        assert_eq!(osc.applied(), (6, 10));
        assert_eq!(osc.pending(), (6, 200));
        assert!(osc.has_pending());

        run_until_flip(&mut osc);
        assert_eq!(osc.applied(), (6, 200));
        assert!(!osc.has_pending());
    }

    #[test]
    fn test_offset_then_octave_defers_offset_one_flip() {
        let mut osc = Oscillator::new(44_100);
        osc.set_sync(true);
        osc.set_offset(10);
        osc.set_octave(5);
        osc.set_sync(false);
        assert_eq!(osc.applied(), (5, 10));

        osc.set_offset(50);
        osc.set_octave(3);

        run_until_flip(&mut osc);
        assert_eq!(osc.applied(), (3, 10));
        assert_eq!(osc.pending(), (3, 50));
        assert!(osc.has_pending());

        run_until_flip(&mut osc);
        assert_eq!(osc.applied(), (3, 50));
        assert!(!osc.has_pending());
    }

    #[test]
    fn test_offset_alone_applies_on_next_flip() {
        let mut osc = Oscillator::new(44_100);
        osc.set_sync(true);
        osc.set_offset(10);
        osc.set_octave(5);
        osc.set_sync(false);

        osc.set_offset(80);
        run_until_flip(&mut osc);
        assert_eq!(osc.applied(), (5, 80));
        assert!(!osc.has_pending());
    }

    #[test]
    fn test_sync_halts_at_low_level() {
        let mut osc = Oscillator::new(44_100);
        osc.set_octave(7);
        osc.set_offset(255);
        for _ in 0..100 {
            osc.tick();
        }
        osc.set_sync(true);
        assert_eq!(osc.level(), 0);
        assert_eq!(osc.tick(), 0);
        assert_eq!(osc.level(), 0);
    }
}
