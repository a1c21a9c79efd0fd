//! Player configuration

use serde::{Deserialize, Serialize};

use crate::tracker::document::ConfigDocument;
use crate::{Result, Saa1099Error};

/// Default host sample rate (44.1 kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
/// Default interrupt rate (PAL frame)
pub const DEFAULT_INTERRUPT_HZ: u32 = 50;

/// Accepted host sample rates
pub const SAMPLE_RATE_RANGE: std::ops::RangeInclusive<u32> = 8_000..=192_000;
/// Accepted interrupt rates
pub const INTERRUPT_RANGE: std::ops::RangeInclusive<u32> = 25..=200;

/// Sequencer and renderer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerConfig {
    /// Host sample rate in Hz
    pub sample_rate: u32,
    /// Sequencer ticks per second
    pub interrupt_hz: u32,
    /// Loop back to the repeat position at song end
    pub loop_mode: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            interrupt_hz: DEFAULT_INTERRUPT_HZ,
            loop_mode: true,
        }
    }
}

impl PlayerConfig {
    /// Configuration for a given sample rate with default timing
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !SAMPLE_RATE_RANGE.contains(&self.sample_rate) {
            return Err(Saa1099Error::Config(format!(
                "sample rate {} Hz outside {}..={} Hz",
                self.sample_rate,
                SAMPLE_RATE_RANGE.start(),
                SAMPLE_RATE_RANGE.end()
            )));
        }
        if !INTERRUPT_RANGE.contains(&self.interrupt_hz) {
            return Err(Saa1099Error::Config(format!(
                "interrupt rate {} Hz outside {}..={} Hz",
                self.interrupt_hz,
                INTERRUPT_RANGE.start(),
                INTERRUPT_RANGE.end()
            )));
        }
        Ok(())
    }

    /// Take interrupt rate and loop mode from a song document when present
    pub fn apply_document(&mut self, config: &ConfigDocument) {
        if let Some(hz) = config.interrupt {
            self.interrupt_hz = hz.clamp(*INTERRUPT_RANGE.start(), *INTERRUPT_RANGE.end());
        }
        if let Some(loop_mode) = config.loop_mode {
            self.loop_mode = loop_mode;
        }
    }

    /// Whole samples per tick (the remainder is carried by the pump)
    pub fn samples_per_tick(&self) -> u32 {
        self.sample_rate / self.interrupt_hz.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = PlayerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.samples_per_tick(), 882);
    }

    #[test]
    fn test_out_of_range() {
        let config = PlayerConfig {
            interrupt_hz: 1000,
            ..PlayerConfig::default()
        };
        assert!(matches!(config.validate(), Err(Saa1099Error::Config(_))));
        assert!(PlayerConfig::with_sample_rate(4000).validate().is_err());
    }

    #[test]
    fn test_document_overrides() {
        let mut config = PlayerConfig::default();
        config.apply_document(&ConfigDocument {
            interrupt: Some(60),
            loop_mode: Some(false),
        });
        assert_eq!(config.interrupt_hz, 60);
        assert!(!config.loop_mode);

        config.apply_document(&ConfigDocument::default());
        assert_eq!(config.interrupt_hz, 60);
    }
}
