//! Song container
//!
//! Holds the sample/ornament pools, the pattern list and the position list.
//! Entry 0 of every pool is the permanent silent/neutral entry, and lookups
//! with out-of-range indices fall back to it.

use tracing::debug;

use super::document::{ConfigDocument, CtrlDocument, CurrentDocument};
use super::ornament::{Ornament, MAX_ORNAMENTS};
use super::pattern::Pattern;
use super::position::{Position, DEFAULT_POSITION_LENGTH, DEFAULT_SPEED};
use super::sample::{Sample, MAX_SAMPLES};

/// A complete song
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    /// Song title
    pub title: String,
    /// Song author
    pub author: String,
    /// Sample pool (index 0 silent)
    pub samples: Vec<Sample>,
    /// Ornament pool (index 0 neutral)
    pub ornaments: Vec<Ornament>,
    /// Pattern list (index 0 empty)
    pub patterns: Vec<Pattern>,
    /// Arrangement
    pub positions: Vec<Position>,
    /// Position the song loops back to
    pub repeat_position: usize,
    /// Editor cursor state carried through documents
    pub current: CurrentDocument,
    /// Editor control state carried through documents
    pub ctrl: CtrlDocument,
    /// Playback settings stored with the song
    pub config: ConfigDocument,
    null_position: Position,
}

impl Default for Song {
    fn default() -> Self {
        Self::new()
    }
}

impl Song {
    /// Create an empty song
    pub fn new() -> Self {
        Self {
            title: String::new(),
            author: String::new(),
            samples: vec![Sample::default(); MAX_SAMPLES],
            ornaments: vec![Ornament::default(); MAX_ORNAMENTS],
            patterns: vec![Pattern::default()],
            positions: Vec::new(),
            repeat_position: 0,
            current: CurrentDocument::default(),
            ctrl: CtrlDocument::default(),
            config: ConfigDocument::default(),
            null_position: Position::new(DEFAULT_POSITION_LENGTH, DEFAULT_SPEED),
        }
    }

    /// Reset to an empty song
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Sample by index (silent sample when out of range)
    #[inline]
    pub fn sample(&self, index: usize) -> &Sample {
        self.samples.get(index).unwrap_or(&self.samples[0])
    }

    /// Ornament by index (neutral ornament when out of range)
    #[inline]
    pub fn ornament(&self, index: usize) -> &Ornament {
        self.ornaments.get(index).unwrap_or(&self.ornaments[0])
    }

    /// Pattern by index (empty pattern when out of range)
    #[inline]
    pub fn pattern(&self, index: usize) -> &Pattern {
        self.patterns.get(index).unwrap_or(&self.patterns[0])
    }

    /// Position by index (the null position when out of range)
    #[inline]
    pub fn position(&self, index: usize) -> &Position {
        self.positions.get(index).unwrap_or(&self.null_position)
    }

    /// The implicit pre-song position (length 64, speed 6)
    pub fn null_position(&self) -> &Position {
        &self.null_position
    }

    /// Append an empty pattern and return its index
    pub fn add_pattern(&mut self) -> usize {
        self.patterns.push(Pattern::new());
        let index = self.patterns.len() - 1;
        debug!(index, "pattern added");
        index
    }

    /// Create a position; `insert_at` places it in the arrangement, `None`
    /// appends. Returns its index.
    pub fn add_position(&mut self, length: usize, speed: u8, insert_at: Option<usize>) -> usize {
        let position = Position::new(length, speed);
        let index = match insert_at {
            Some(at) if at < self.positions.len() => {
                self.positions.insert(at, position);
                if self.repeat_position >= at && self.positions.len() > 1 {
                    self.repeat_position += 1;
                }
                at
            }
            _ => {
                self.positions.push(position);
                self.positions.len() - 1
            }
        };
        debug!(index, length, speed, "position added");
        index
    }

    /// Remove a position, keeping the repeat position valid
    pub fn remove_position(&mut self, index: usize) -> Option<Position> {
        if index >= self.positions.len() {
            return None;
        }
        let removed = self.positions.remove(index);
        if self.repeat_position > index {
            self.repeat_position -= 1;
        }
        self.repeat_position = self
            .repeat_position
            .min(self.positions.len().saturating_sub(1));
        Some(removed)
    }

    /// Number of channel slots across all positions playing `pattern`
    pub fn count_pattern_usage(&self, pattern: usize) -> usize {
        self.positions
            .iter()
            .flat_map(|p| p.channels.iter())
            .filter(|c| c.pattern == pattern)
            .count()
    }

    /// Rebuild `frames` for one position, or all positions when `None`
    pub fn recompute_row_timings(&mut self, position: Option<usize>) {
        let patterns = &self.patterns;
        match position {
            Some(index) => {
                if let Some(pos) = self.positions.get_mut(index) {
                    pos.recompute_frames(patterns);
                }
            }
            None => {
                for pos in &mut self.positions {
                    pos.recompute_frames(patterns);
                }
            }
        }
    }

    /// Rebuild `frames` of every position that plays `pattern`
    pub fn recompute_pattern_timings(&mut self, pattern: usize) {
        let patterns = &self.patterns;
        for pos in self.positions.iter_mut().filter(|p| p.uses_pattern(pattern)) {
            pos.recompute_frames(patterns);
        }
    }

    /// Song length in ticks (single pass, no repeat)
    pub fn total_ticks(&self) -> u64 {
        self.positions
            .iter()
            .map(|p| u64::from(p.total_ticks()))
            .sum()
    }

    /// Tick at which `position`/`line` starts
    pub fn tick_at(&self, position: usize, line: usize) -> u64 {
        let before: u64 = self
            .positions
            .iter()
            .take(position)
            .map(|p| u64::from(p.total_ticks()))
            .sum();
        let within = self
            .positions
            .get(position)
            .and_then(|p| p.frames.get(line).copied())
            .unwrap_or(0);
        before + u64::from(within)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::pattern::PatternRow;

    #[test]
    fn test_fallback_lookups() {
        let song = Song::new();
        assert_eq!(song.sample(200), &song.samples[0]);
        assert_eq!(song.ornament(99), &song.ornaments[0]);
        assert_eq!(song.pattern(5), &song.patterns[0]);
        assert_eq!(song.position(0).length, 64);
        assert_eq!(song.position(0).speed, 6);
    }

    #[test]
    fn test_pattern_usage() {
        let mut song = Song::new();
        let pat = song.add_pattern();
        assert_eq!(pat, 1);
        song.add_position(16, 6, None);
        song.add_position(16, 6, None);
        song.positions[0].channels[0].pattern = pat;
        song.positions[1].channels[3].pattern = pat;
        song.positions[1].channels[4].pattern = pat;
        assert_eq!(song.count_pattern_usage(pat), 3);
        assert_eq!(song.count_pattern_usage(0), 9);
    }

    #[test]
    fn test_insert_position_shifts_repeat() {
        let mut song = Song::new();
        song.add_position(8, 6, None);
        song.add_position(8, 6, None);
        song.repeat_position = 1;
        let index = song.add_position(4, 3, Some(0));
        assert_eq!(index, 0);
        assert_eq!(song.positions[0].length, 4);
        assert_eq!(song.repeat_position, 2);

        song.remove_position(0);
        assert_eq!(song.repeat_position, 1);
    }

    #[test]
    fn test_timings_and_duration() {
        let mut song = Song::new();
        let pat = song.add_pattern();
        song.add_position(4, 6, None);
        song.add_position(2, 3, None);
        song.positions[0].channels[1].pattern = pat;
        assert_eq!(song.total_ticks(), 24 + 6);

        song.patterns[pat].data[1] = PatternRow {
            command: 0xF,
            param: 2,
            ..PatternRow::default()
        };
        song.recompute_pattern_timings(pat);
        assert_eq!(song.positions[0].frames, vec![0, 6, 8, 10, 12]);
        assert_eq!(song.total_ticks(), 12 + 6);
        assert_eq!(song.tick_at(1, 1), 15);
    }
}
