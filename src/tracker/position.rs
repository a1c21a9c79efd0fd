//! Positions: one arrangement slot
//!
//! A position binds a pattern and a transpose to each of the six channels,
//! and carries its length, base speed and a cached per-row tick table
//! (`frames`) used for time display and song duration.

use super::pattern::{Pattern, MAX_PATTERN_LENGTH};
use crate::chip::NUM_CHANNELS;

/// Default position length (rows)
pub const DEFAULT_POSITION_LENGTH: usize = 64;
/// Default speed (ticks per row)
pub const DEFAULT_SPEED: u8 = 6;
/// Speeds at or above this value are swing speeds
pub const SWING_THRESHOLD: u8 = 0x20;

/// Pattern binding of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PositionChannel {
    /// Pattern index
    pub pattern: usize,
    /// Transpose in semitones
    pub transpose: i8,
}

/// One arrangement slot
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    /// Per-channel pattern bindings
    pub channels: [PositionChannel; NUM_CHANNELS],
    /// Rows in this position
    pub length: usize,
    /// Base speed (1-31, or a swing pair >= 0x20)
    pub speed: u8,
    /// Tick at which each row starts; `frames[length]` is the total
    pub frames: Vec<u32>,
}

impl Default for Position {
    fn default() -> Self {
        Self::new(DEFAULT_POSITION_LENGTH, DEFAULT_SPEED)
    }
}

/// Ticks spent on `line` at `speed`
///
/// Swing speeds alternate the high nibble (even rows) and the low nibble (odd
/// rows); a zero low nibble collapses to the high one.
#[inline]
pub fn row_ticks(speed: u8, line: usize) -> u8 {
    if speed >= SWING_THRESHOLD {
        let hi = speed >> 4;
        let lo = speed & 0x0F;
        if lo == 0 || line % 2 == 0 {
            hi
        } else {
            lo
        }
    } else {
        speed.max(1)
    }
}

impl Position {
    /// Create a position bound to pattern 0 on every channel
    pub fn new(length: usize, speed: u8) -> Self {
        let length = length.clamp(1, MAX_PATTERN_LENGTH);
        let speed = if speed == 0 { DEFAULT_SPEED } else { speed };
        let mut position = Self {
            channels: [PositionChannel::default(); NUM_CHANNELS],
            length,
            speed,
            frames: Vec::new(),
        };
        position.recompute_frames(&[]);
        position
    }

    /// Speed in force on each row after applying speed commands
    pub fn row_speeds(&self, patterns: &[Pattern]) -> Vec<u8> {
        let mut speed = self.speed;
        (0..self.length)
            .map(|line| {
                for binding in &self.channels {
                    if let Some(new_speed) = patterns
                        .get(binding.pattern)
                        .and_then(|p| p.row(line).speed_change())
                    {
                        speed = new_speed;
                    }
                }
                speed
            })
            .collect()
    }

    /// Rebuild the `frames` cache
    pub fn recompute_frames(&mut self, patterns: &[Pattern]) {
        let speeds = self.row_speeds(patterns);
        let mut frames = Vec::with_capacity(self.length + 1);
        let mut total = 0u32;
        frames.push(0);
        for (line, speed) in speeds.into_iter().enumerate() {
            total += u32::from(row_ticks(speed, line));
            frames.push(total);
        }
        self.frames = frames;
    }

    /// Total ticks of this position (from the cache)
    pub fn total_ticks(&self) -> u32 {
        self.frames.last().copied().unwrap_or(0)
    }

    /// Whether any channel plays `pattern`
    pub fn uses_pattern(&self, pattern: usize) -> bool {
        self.channels.iter().any(|c| c.pattern == pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::pattern::PatternRow;

    #[test]
    fn test_row_ticks() {
        assert_eq!(row_ticks(6, 0), 6);
        assert_eq!(row_ticks(0, 3), 1);
        assert_eq!(row_ticks(0x64, 0), 6);
        assert_eq!(row_ticks(0x64, 1), 4);
        assert_eq!(row_ticks(0x30, 1), 3);
    }

    #[test]
    fn test_frames_follow_speed_changes() {
        let mut patterns = vec![Pattern::new(), Pattern::new()];
        patterns[1].data[2] = PatternRow {
            command: 0xF,
            param: 3,
            ..PatternRow::default()
        };
        let mut pos = Position::new(4, 6);
        pos.channels[4].pattern = 1;
        pos.recompute_frames(&patterns);
        assert_eq!(pos.frames, vec![0, 6, 12, 15, 18]);
        assert_eq!(pos.total_ticks(), 18);

        patterns[1].data[2].param = 0x42;
        pos.recompute_frames(&patterns);
        // row 2 is even (4 ticks), row 3 odd (2 ticks)
        assert_eq!(pos.frames, vec![0, 6, 12, 16, 18]);
    }

    #[test]
    fn test_swing_base_speed() {
        let mut pos = Position::new(4, 0x53);
        pos.recompute_frames(&[Pattern::new()]);
        assert_eq!(pos.frames, vec![0, 5, 8, 13, 16]);
    }
}
