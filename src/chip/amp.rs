//! Amplitude mixer
//!
//! One mixer per channel combines its oscillator, the triplet's noise
//! generator and (for channels 2 and 5) the triplet's envelope into a raw
//! stereo level, which the chip turns into floats through the shared level
//! table.

use bitflags::bitflags;

use super::envelope::Envelope;

bitflags! {
    /// Per-channel mix select, built from registers 20 and 21
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MixSelect: u8 {
        /// Frequency (tone) enabled
        const TONE = 0x01;
        /// Noise enabled
        const NOISE = 0x02;
    }
}

/// Raw stereo level before normalisation (each side 0..512)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawLevel {
    /// Left raw level
    pub left: u16,
    /// Right raw level
    pub right: u16,
}

/// Amplitude mixer for one channel
#[derive(Debug, Clone, Default)]
pub struct AmpMixer {
    level_byte: u8,
    left_x16: u16,
    right_x16: u16,
    left_env_x2: u16,
    right_env_x2: u16,
    mix: MixSelect,
    muted: bool,
}

impl AmpMixer {
    /// Create a silent mixer
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch the amplitude register (low nibble left, high nibble right)
    pub fn set_level(&mut self, level: u8) {
        if level == self.level_byte {
            return;
        }
        self.level_byte = level;
        let left = u16::from(level & 0x0F);
        let right = u16::from(level >> 4);
        self.left_x16 = left * 16;
        self.right_x16 = right * 16;
        // envelope mode ignores the amplitude LSB
        self.left_env_x2 = left & 0x0E;
        self.right_env_x2 = right & 0x0E;
    }

    /// Raw amplitude register value
    pub fn level(&self) -> u8 {
        self.level_byte
    }

    /// Enable or disable the tone input
    pub fn set_tone_enabled(&mut self, enabled: bool) {
        self.mix.set(MixSelect::TONE, enabled);
    }

    /// Enable or disable the noise input
    pub fn set_noise_enabled(&mut self, enabled: bool) {
        self.mix.set(MixSelect::NOISE, enabled);
    }

    /// Current mix select
    pub fn mix(&self) -> MixSelect {
        self.mix
    }

    /// Mute this channel's output (generators keep running)
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Whether the channel is muted
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Combine tone and noise into the 0..2 intermediate level
    #[inline]
    pub fn intermediate(&self, tone: u8, noise: u8) -> u16 {
        let tone_on = self.mix.contains(MixSelect::TONE);
        let noise_on = self.mix.contains(MixSelect::NOISE);
        match (tone_on, noise_on) {
            (false, false) => 0,
            (true, false) => u16::from(tone),
            (false, true) => u16::from(noise) * 2,
            (true, true) => {
                if tone == 2 && noise == 1 {
                    1
                } else {
                    u16::from(tone)
                }
            }
        }
    }

    /// Compute this sample's raw stereo level
    #[inline]
    pub fn output(&self, tone: u8, noise: u8, envelope: Option<&Envelope>) -> RawLevel {
        if self.muted {
            return RawLevel::default();
        }
        let intermediate = self.intermediate(tone, noise);
        match envelope {
            Some(env) if env.is_enabled() => RawLevel {
                left: u16::from(env.left()) * self.left_env_x2 * intermediate,
                right: u16::from(env.right()) * self.right_env_x2 * intermediate,
            },
            _ => RawLevel {
                left: self.left_x16 * intermediate,
                right: self.right_x16 * intermediate,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_only_scaling() {
        let mut amp = AmpMixer::new();
        amp.set_level(0xA5);
        amp.set_tone_enabled(true);

        assert_eq!(amp.output(0, 1, None), RawLevel { left: 0, right: 0 });
        assert_eq!(
            amp.output(2, 1, None),
            RawLevel {
                left: 5 * 32,
                right: 10 * 32
            }
        );
    }

    #[test]
    fn test_mixed_downgrades_with_noise() {
        let mut amp = AmpMixer::new();
        amp.set_level(0xFF);
        amp.set_tone_enabled(true);
        amp.set_noise_enabled(true);

        assert_eq!(amp.intermediate(2, 1), 1);
        assert_eq!(amp.intermediate(2, 0), 2);
        assert_eq!(amp.intermediate(0, 1), 0);
        assert_eq!(amp.output(2, 1, None).left, 15 * 16);
    }

    #[test]
    fn test_silence_and_noise_only() {
        let mut amp = AmpMixer::new();
        amp.set_level(0x33);
        assert_eq!(amp.output(2, 1, None), RawLevel::default());

        amp.set_noise_enabled(true);
        assert_eq!(amp.output(0, 1, None).left, 3 * 32);
        assert_eq!(amp.output(2, 0, None).left, 0);
    }

    #[test]
    fn test_envelope_drives_level() {
        let mut env = Envelope::new();
        env.set_control(0x82); // enabled, maximum amplitude
        let mut amp = AmpMixer::new();
        amp.set_level(0xFF);
        amp.set_tone_enabled(true);

        let out = amp.output(2, 0, Some(&env));
        assert_eq!(out.left, 15 * 14 * 2);
        assert!(out.left < 512);
    }

    #[test]
    fn test_muted_outputs_zero() {
        let mut amp = AmpMixer::new();
        amp.set_level(0xFF);
        amp.set_tone_enabled(true);
        amp.set_muted(true);
        assert_eq!(amp.output(2, 0, None), RawLevel::default());
    }
}
