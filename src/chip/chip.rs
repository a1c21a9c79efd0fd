//! SAA1099 facade
//!
//! Owns the six oscillators, two noise generators, two envelopes and six
//! amplitude mixers, decodes register writes, and renders stereo samples at
//! the host rate.
//!
//! Wiring:
//! - oscillator 0 → noise 0 (source mode 3), oscillator 1 → envelope 0
//! - oscillator 3 → noise 1 (source mode 3), oscillator 4 → envelope 1
//! - envelope 0 shapes channel 2, envelope 1 shapes channel 5

use super::amp::AmpMixer;
use super::backend::Saa1099Backend;
use super::envelope::Envelope;
use super::noise::{NoiseGenerator, NOISE_SEED_0, NOISE_SEED_1};
use super::oscillator::Oscillator;
use super::registers::{MasterControl, Register, RegisterImage, REGISTER_COUNT};
use super::tables::level_table;

/// Number of tone channels
pub const NUM_CHANNELS: usize = 6;

const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// What an oscillator's flips drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wiring {
    None,
    Noise(usize),
    Envelope(usize),
}

const OSCILLATOR_WIRING: [Wiring; NUM_CHANNELS] = [
    Wiring::Noise(0),
    Wiring::Envelope(0),
    Wiring::None,
    Wiring::Noise(1),
    Wiring::Envelope(1),
    Wiring::None,
];

/// Envelope shaping each channel, if any
const CHANNEL_ENVELOPE: [Option<usize>; NUM_CHANNELS] =
    [None, None, Some(0), None, None, Some(1)];

/// SAA1099 sound chip emulator
#[derive(Clone, Debug)]
pub struct Saa1099 {
    sample_rate: u32,
    selected: u8,
    regs: [u8; REGISTER_COUNT],
    oscillators: [Oscillator; NUM_CHANNELS],
    noise: [NoiseGenerator; 2],
    envelopes: [Envelope; 2],
    amps: [AmpMixer; NUM_CHANNELS],
    sound_enabled: bool,
    sync: bool,
}

impl Saa1099 {
    /// Create a chip rendering at the given host sample rate
    pub fn new(sample_rate: u32) -> Self {
        let sample_rate = sample_rate.max(1);
        Self {
            sample_rate,
            selected: 0,
            regs: [0; REGISTER_COUNT],
            oscillators: std::array::from_fn(|_| Oscillator::new(sample_rate)),
            noise: [
                NoiseGenerator::new(NOISE_SEED_0, sample_rate),
                NoiseGenerator::new(NOISE_SEED_1, sample_rate),
            ],
            envelopes: [Envelope::new(), Envelope::new()],
            amps: std::array::from_fn(|_| AmpMixer::new()),
            sound_enabled: false,
            sync: false,
        }
    }

    /// Reset to power-on state (user mutes are kept)
    pub fn reset(&mut self) {
        let muted: [bool; NUM_CHANNELS] = std::array::from_fn(|ch| self.amps[ch].is_muted());
        *self = Self::new(self.sample_rate);
        for (amp, muted) in self.amps.iter_mut().zip(muted) {
            amp.set_muted(muted);
        }
    }

    /// Select a register
    pub fn write_address(&mut self, addr: u8) {
        self.selected = addr & 0x1F;
    }

    /// Write data to the selected register.
    ///
    /// A write to an envelope control register also clocks that envelope
    /// when it runs on the external clock.
    pub fn write_data(&mut self, value: u8) {
        let addr = self.selected;
        self.regs[addr as usize] = value;

        let Some(register) = Register::from_addr(addr) else {
            return;
        };
        match register {
            Register::Amplitude(ch) => self.amps[ch].set_level(value),
            Register::Offset(ch) => self.oscillators[ch].set_offset(value),
            Register::Octave(pair) => {
                self.oscillators[pair * 2].set_octave(value & 7);
                self.oscillators[pair * 2 + 1].set_octave((value >> 4) & 7);
            }
            Register::FrequencyEnable => {
                for (ch, amp) in self.amps.iter_mut().enumerate() {
                    amp.set_tone_enabled(value & (1 << ch) != 0);
                }
            }
            Register::NoiseEnable => {
                for (ch, amp) in self.amps.iter_mut().enumerate() {
                    amp.set_noise_enabled(value & (1 << ch) != 0);
                }
            }
            Register::NoiseSource => {
                self.noise[0].set_source(value & 3);
                self.noise[1].set_source((value >> 4) & 3);
            }
            Register::EnvelopeControl(n) => {
                self.envelopes[n].set_control(value);
                self.envelopes[n].external_clock();
            }
            Register::Master => {
                let control = MasterControl::from_bits_truncate(value);
                self.sound_enabled = control.contains(MasterControl::SOUND_ENABLE);
                self.set_sync(control.contains(MasterControl::SYNC_RESET));
            }
        }
    }

    /// Select and write a register
    pub fn write(&mut self, addr: u8, value: u8) {
        self.write_address(addr);
        self.write_data(value);
    }

    fn set_sync(&mut self, sync: bool) {
        if sync && !self.sync {
            for env in &mut self.envelopes {
                env.reset();
            }
        }
        self.sync = sync;
        for osc in &mut self.oscillators {
            osc.set_sync(sync);
        }
        for noise in &mut self.noise {
            noise.set_sync(sync);
        }
    }

    /// Render one stereo sample
    #[inline]
    fn next_sample(&mut self) -> (f32, f32) {
        let levels = level_table();
        for noise in &mut self.noise {
            noise.tick();
        }

        let mut left = 0.0f32;
        let mut right = 0.0f32;
        for ch in 0..NUM_CHANNELS {
            // muted channels still clock their dependents
            let flips = self.oscillators[ch].tick();
            for _ in 0..flips {
                match OSCILLATOR_WIRING[ch] {
                    Wiring::Noise(n) => self.noise[n].trigger(),
                    Wiring::Envelope(e) => self.envelopes[e].internal_clock(),
                    Wiring::None => {}
                }
            }

            let tone = self.oscillators[ch].level();
            let noise = self.noise[ch / 3].level();
            let envelope = CHANNEL_ENVELOPE[ch].map(|e| &self.envelopes[e]);
            let raw = self.amps[ch].output(tone, noise, envelope);
            left += levels[raw.left as usize & 0x1FF];
            right += levels[raw.right as usize & 0x1FF];
        }
        (left, right)
    }

    /// Render `count` samples into `left`/`right` starting at `offset`
    ///
    /// Samples beyond the end of either buffer are not produced.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32], count: usize, offset: usize) {
        let end = offset
            .saturating_add(count)
            .min(left.len())
            .min(right.len());
        if offset >= end {
            return;
        }
        if !self.sound_enabled {
            left[offset..end].fill(0.0);
            right[offset..end].fill(0.0);
            return;
        }
        for i in offset..end {
            let (l, r) = self.next_sample();
            left[i] = l;
            right[i] = r;
        }
    }

    /// Mute or unmute a channel (0-5)
    pub fn mute(&mut self, channel: usize, muted: bool) {
        if let Some(amp) = self.amps.get_mut(channel) {
            amp.set_muted(muted);
        }
    }

    /// Check if a channel is muted
    pub fn is_muted(&self, channel: usize) -> bool {
        self.amps.get(channel).is_some_and(AmpMixer::is_muted)
    }

    /// Current register image
    pub fn snapshot(&self) -> RegisterImage {
        RegisterImage {
            registers: self.regs,
        }
    }

    /// Apply a complete register image, writing registers that differ in
    /// ascending address order (offsets before octaves, master control last).
    pub fn replace(&mut self, image: &RegisterImage) {
        for addr in 0..REGISTER_COUNT as u8 {
            if Register::from_addr(addr).is_none() {
                continue;
            }
            let value = image.read(addr);
            if value != self.regs[addr as usize] {
                self.write(addr, value);
            }
        }
    }

    /// Host sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Envelope generator state (0 or 1)
    pub fn envelope(&self, index: usize) -> Option<&Envelope> {
        self.envelopes.get(index)
    }

    /// Oscillator state of a channel
    pub fn oscillator(&self, channel: usize) -> Option<&Oscillator> {
        self.oscillators.get(channel)
    }

    /// Noise generator state (0 or 1)
    pub fn noise(&self, index: usize) -> Option<&NoiseGenerator> {
        self.noise.get(index)
    }

    /// Whether outputs are enabled (register 28 bit 0)
    pub fn is_sound_enabled(&self) -> bool {
        self.sound_enabled
    }
}

impl Default for Saa1099 {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl Saa1099Backend for Saa1099 {
    fn reset(&mut self) {
        Saa1099::reset(self)
    }

    fn write_address(&mut self, addr: u8) {
        Saa1099::write_address(self, addr)
    }

    fn write_data(&mut self, value: u8) {
        Saa1099::write_data(self, value)
    }

    fn write(&mut self, addr: u8, value: u8) {
        Saa1099::write(self, addr, value)
    }

    fn render(&mut self, left: &mut [f32], right: &mut [f32], count: usize, offset: usize) {
        Saa1099::render(self, left, right, count, offset)
    }

    fn mute(&mut self, channel: usize, muted: bool) {
        Saa1099::mute(self, channel, muted)
    }

    fn is_muted(&self, channel: usize) -> bool {
        Saa1099::is_muted(self, channel)
    }

    fn snapshot(&self) -> RegisterImage {
        Saa1099::snapshot(self)
    }

    fn replace(&mut self, image: &RegisterImage) {
        Saa1099::replace(self, image)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::registers::{
        ENVELOPE_0, ENVELOPE_1, FREQUENCY_ENABLE, MASTER_CONTROL, NOISE_ENABLE, NOISE_SOURCE,
    };
    use approx::assert_abs_diff_eq;

    fn tone_chip() -> Saa1099 {
        let mut chip = Saa1099::new(44_100);
        chip.write(MASTER_CONTROL, 0x01);
        chip.write(FREQUENCY_ENABLE, 0x01);
        chip.write(0x08, 0x80);
        chip.write(0x10, 0x03);
        chip.write(0x00, 0xFF);
        chip
    }

    #[test]
    fn test_disabled_output_is_silent() {
        let mut chip = Saa1099::new(44_100);
        chip.write(0x00, 0xFF);
        chip.write(FREQUENCY_ENABLE, 0x3F);
        let mut left = [1.0f32; 32];
        let mut right = [1.0f32; 32];
        chip.render(&mut left, &mut right, 32, 0);
        assert!(left.iter().chain(right.iter()).all(|&s| s == 0.0));
    }

    #[test]
    fn test_tone_levels_are_normalised() {
        let mut chip = tone_chip();
        let mut left = vec![0.0f32; 4096];
        let mut right = vec![0.0f32; 4096];
        chip.render(&mut left, &mut right, 4096, 0);

        let high = 15.0 * 32.0 / (15.0 * 32.0 * 6.0);
        assert!(left.iter().any(|&s| s > 0.0));
        for &s in &left {
            assert!(s == 0.0 || (s - high).abs() < 1e-6, "unexpected level {s}");
        }
        assert_abs_diff_eq!(left[..].iter().sum::<f32>(), right[..].iter().sum::<f32>());
    }

    #[test]
    fn test_six_saturated_channels_stay_in_range() {
        let mut chip = Saa1099::new(44_100);
        chip.write(MASTER_CONTROL, 0x01);
        chip.write(NOISE_ENABLE, 0x00);
        chip.write(FREQUENCY_ENABLE, 0x3F);
        for ch in 0..6u8 {
            chip.write(ch, 0xFF);
        }
        let mut left = vec![0.0f32; 2048];
        let mut right = vec![0.0f32; 2048];
        chip.render(&mut left, &mut right, 2048, 0);
        assert!(left.iter().all(|&s| (0.0..=1.0 + 1e-6).contains(&s)));
    }

    #[test]
    fn test_render_respects_offset() {
        let mut chip = tone_chip();
        let mut left = vec![-1.0f32; 16];
        let mut right = vec![-1.0f32; 16];
        chip.render(&mut left, &mut right, 8, 4);
        assert!(left[..4].iter().all(|&s| s == -1.0));
        assert!(left[4..12].iter().all(|&s| s >= 0.0));
        assert!(left[12..].iter().all(|&s| s == -1.0));
    }

    #[test]
    fn test_mute_keeps_generators_running() {
        let mut chip = tone_chip();
        chip.mute(0, true);
        chip.write(0x08, 0x90);
        let mut left = vec![0.0f32; 2000];
        let mut right = vec![0.0f32; 2000];
        chip.render(&mut left, &mut right, 2000, 0);
        assert!(left.iter().all(|&s| s == 0.0));
        assert!(chip.is_muted(0));
        // the buffered offset was committed by a flip while muted
        assert_eq!(chip.oscillator(0).map(Oscillator::applied), Some((3, 0x90)));

        chip.mute(0, false);
        chip.render(&mut left, &mut right, 2000, 0);
        assert!(left.iter().any(|&s| s > 0.0));
    }

    #[test]
    fn test_replace_writes_only_differences() {
        let mut chip = tone_chip();
        let mut image = chip.snapshot();
        image.write(NOISE_SOURCE, 0x21);
        chip.replace(&image);
        assert_eq!(chip.snapshot(), image);
        assert_eq!(chip.noise(0).map(NoiseGenerator::source), Some(1));
        assert_eq!(chip.noise(1).map(NoiseGenerator::source), Some(2));
    }

    #[test]
    fn test_external_envelope_clocks_on_control_write() {
        let mut chip = Saa1099::new(44_100);
        let control = 0x80 | 0x20 | (7 << 1);
        chip.write(ENVELOPE_0, control);
        assert_eq!(chip.envelope(0).map(Envelope::left), Some(1));

        chip.write(0x00, 0x00);
        chip.write(ENVELOPE_0, control);
        chip.write(0x00, 0x00);
        chip.write(ENVELOPE_0, control);
        assert_eq!(chip.envelope(0).map(Envelope::left), Some(3));

        chip.write_address(ENVELOPE_0);
        chip.write_address(0x00);
        assert_eq!(chip.envelope(0).map(Envelope::left), Some(3));
    }

    #[test]
    fn test_internal_envelope_ignores_control_writes() {
        let mut chip = Saa1099::new(44_100);
        chip.write(ENVELOPE_1, 0x80 | (7 << 1));
        chip.write(ENVELOPE_1, 0x80 | (7 << 1));
        assert_eq!(chip.envelope(1).map(Envelope::left), Some(0));
    }

    #[test]
    fn test_sync_holds_oscillators_low() {
        let mut chip = tone_chip();
        chip.write(MASTER_CONTROL, 0x03);
        let mut left = vec![0.0f32; 512];
        let mut right = vec![0.0f32; 512];
        chip.render(&mut left, &mut right, 512, 0);
        assert!(left.iter().all(|&s| s == 0.0));
    }
}
