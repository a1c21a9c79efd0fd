//! SAA1099 Register Definitions
//!
//! The chip exposes a 5-bit address space. Unused addresses are accepted
//! and ignored.

use std::fmt;

use bitflags::bitflags;

/// Number of addressable registers
pub const REGISTER_COUNT: usize = 32;

/// First amplitude register (channels 0-5 at 0x00-0x05)
pub const AMPLITUDE_BASE: u8 = 0x00;
/// First frequency offset register (channels 0-5 at 0x08-0x0D)
pub const OFFSET_BASE: u8 = 0x08;
/// First octave register (channel pairs at 0x10-0x12)
pub const OCTAVE_BASE: u8 = 0x10;
/// Frequency enable bitmask
pub const FREQUENCY_ENABLE: u8 = 0x14;
/// Noise enable bitmask
pub const NOISE_ENABLE: u8 = 0x15;
/// Noise source modes (bits 0-1 generator 0, bits 4-5 generator 1)
pub const NOISE_SOURCE: u8 = 0x16;
/// Envelope 0 control (controls channel 2)
pub const ENVELOPE_0: u8 = 0x18;
/// Envelope 1 control (controls channel 5)
pub const ENVELOPE_1: u8 = 0x19;
/// Sound enable / sync+reset
pub const MASTER_CONTROL: u8 = 0x1C;

bitflags! {
    /// Master control register (28) bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MasterControl: u8 {
        /// Outputs enabled
        const SOUND_ENABLE = 0x01;
        /// Generators held in sync/reset
        const SYNC_RESET = 0x02;
    }
}

/// Decoded register address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Amplitude of a channel (0-5)
    Amplitude(usize),
    /// Frequency offset of a channel (0-5)
    Offset(usize),
    /// Octave nibbles of a channel pair (0-2)
    Octave(usize),
    /// Frequency enable bitmask
    FrequencyEnable,
    /// Noise enable bitmask
    NoiseEnable,
    /// Noise source modes
    NoiseSource,
    /// Envelope control (0-1)
    EnvelopeControl(usize),
    /// Sound enable and sync/reset
    Master,
}

impl Register {
    /// Decode a raw 5-bit address
    pub fn from_addr(addr: u8) -> Option<Self> {
        match addr & 0x1F {
            a @ 0x00..=0x05 => Some(Register::Amplitude(a as usize)),
            a @ 0x08..=0x0D => Some(Register::Offset((a - OFFSET_BASE) as usize)),
            a @ 0x10..=0x12 => Some(Register::Octave((a - OCTAVE_BASE) as usize)),
            FREQUENCY_ENABLE => Some(Register::FrequencyEnable),
            NOISE_ENABLE => Some(Register::NoiseEnable),
            NOISE_SOURCE => Some(Register::NoiseSource),
            a @ (ENVELOPE_0 | ENVELOPE_1) => {
                Some(Register::EnvelopeControl((a - ENVELOPE_0) as usize))
            }
            MASTER_CONTROL => Some(Register::Master),
            _ => None,
        }
    }

    /// Register address
    pub fn addr(&self) -> u8 {
        match *self {
            Register::Amplitude(ch) => AMPLITUDE_BASE + ch as u8,
            Register::Offset(ch) => OFFSET_BASE + ch as u8,
            Register::Octave(pair) => OCTAVE_BASE + pair as u8,
            Register::FrequencyEnable => FREQUENCY_ENABLE,
            Register::NoiseEnable => NOISE_ENABLE,
            Register::NoiseSource => NOISE_SOURCE,
            Register::EnvelopeControl(n) => ENVELOPE_0 + n as u8,
            Register::Master => MASTER_CONTROL,
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::Amplitude(ch) => write!(f, "R{} (Amplitude {ch})", self.addr()),
            Register::Offset(ch) => write!(f, "R{} (Frequency Offset {ch})", self.addr()),
            Register::Octave(pair) => write!(
                f,
                "R{} (Octave {}/{})",
                self.addr(),
                pair * 2,
                pair * 2 + 1
            ),
            Register::FrequencyEnable => write!(f, "R20 (Frequency Enable)"),
            Register::NoiseEnable => write!(f, "R21 (Noise Enable)"),
            Register::NoiseSource => write!(f, "R22 (Noise Generator Control)"),
            Register::EnvelopeControl(n) => write!(f, "R{} (Envelope {n})", self.addr()),
            Register::Master => write!(f, "R28 (Sound Enable / Sync)"),
        }
    }
}

/// Complete register image of the chip at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterImage {
    /// Register values indexed by address
    pub registers: [u8; REGISTER_COUNT],
}

impl RegisterImage {
    /// All registers zero (outputs disabled, silent)
    pub fn new() -> Self {
        RegisterImage {
            registers: [0; REGISTER_COUNT],
        }
    }

    /// Silent image with outputs disabled and envelopes off
    pub fn silence() -> Self {
        Self::new()
    }

    /// Read a register value
    pub fn read(&self, addr: u8) -> u8 {
        self.registers[(addr & 0x1F) as usize]
    }

    /// Write a register value
    pub fn write(&mut self, addr: u8, value: u8) {
        self.registers[(addr & 0x1F) as usize] = value;
    }

    /// Stereo amplitude of a channel (low nibble left)
    pub fn set_amplitude(&mut self, channel: usize, left: u8, right: u8) {
        if channel < 6 {
            self.write(AMPLITUDE_BASE + channel as u8, (left & 0x0F) | (right << 4));
        }
    }

    /// 11-bit pitch word of a channel (octave in bits 8-10, offset in bits 0-7)
    pub fn set_pitch(&mut self, channel: usize, word: u16) {
        if channel >= 6 {
            return;
        }
        self.write(OFFSET_BASE + channel as u8, (word & 0xFF) as u8);
        let octave = ((word >> 8) & 7) as u8;
        let addr = OCTAVE_BASE + (channel / 2) as u8;
        let current = self.read(addr);
        let value = if channel % 2 == 0 {
            (current & 0xF0) | octave
        } else {
            (current & 0x0F) | (octave << 4)
        };
        self.write(addr, value);
    }

    /// Pitch word currently held for a channel
    pub fn pitch(&self, channel: usize) -> u16 {
        let offset = u16::from(self.read(OFFSET_BASE + channel as u8));
        let pair = self.read(OCTAVE_BASE + (channel / 2) as u8);
        let octave = if channel % 2 == 0 { pair & 7 } else { (pair >> 4) & 7 };
        (u16::from(octave) << 8) | offset
    }

    /// Set one channel's bit in a bitmask register
    pub fn set_channel_bit(&mut self, addr: u8, channel: usize, on: bool) {
        if channel >= 6 {
            return;
        }
        let bit = 1u8 << channel;
        let value = self.read(addr);
        self.write(addr, if on { value | bit } else { value & !bit });
    }

    /// Noise source mode for a triplet (0 or 1)
    pub fn set_noise_source(&mut self, generator: usize, mode: u8) {
        let value = self.read(NOISE_SOURCE);
        let value = if generator == 0 {
            (value & 0xF0) | (mode & 3)
        } else {
            (value & 0x0F) | ((mode & 3) << 4)
        };
        self.write(NOISE_SOURCE, value);
    }

    /// Noise source mode of a triplet
    pub fn noise_source(&self, generator: usize) -> u8 {
        let value = self.read(NOISE_SOURCE);
        if generator == 0 {
            value & 3
        } else {
            (value >> 4) & 3
        }
    }

    /// Get all registers as a slice
    pub fn as_slice(&self) -> &[u8; REGISTER_COUNT] {
        &self.registers
    }
}

impl Default for RegisterImage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_decoding() {
        assert_eq!(Register::from_addr(0x03), Some(Register::Amplitude(3)));
        assert_eq!(Register::from_addr(0x0D), Some(Register::Offset(5)));
        assert_eq!(Register::from_addr(0x11), Some(Register::Octave(1)));
        assert_eq!(Register::from_addr(0x19), Some(Register::EnvelopeControl(1)));
        assert_eq!(Register::from_addr(0x1C), Some(Register::Master));
        assert_eq!(Register::from_addr(0x06), None);
        assert_eq!(Register::from_addr(0x3C), Some(Register::Master)); // 5-bit wrap
    }

    #[test]
    fn test_address_round_trip() {
        for addr in 0..32u8 {
            if let Some(reg) = Register::from_addr(addr) {
                assert_eq!(reg.addr(), addr);
            }
        }
    }

    #[test]
    fn test_pitch_packing() {
        let mut image = RegisterImage::new();
        image.set_pitch(2, 0x5A3);
        image.set_pitch(3, 0x2FF);
        assert_eq!(image.read(0x0A), 0xA3);
        assert_eq!(image.read(0x11), 0x25);
        assert_eq!(image.pitch(2), 0x5A3);
        assert_eq!(image.pitch(3), 0x2FF);
    }

    #[test]
    fn test_noise_source_nibbles() {
        let mut image = RegisterImage::new();
        image.set_noise_source(0, 2);
        image.set_noise_source(1, 3);
        assert_eq!(image.read(NOISE_SOURCE), 0x32);
        assert_eq!(image.noise_source(1), 3);
    }
}
