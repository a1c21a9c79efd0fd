//! Runtime channel state
//!
//! One [`Channel`] per chip channel, in two independent sets (song playback
//! and free preview). A channel holds the sounding tone, the bound sample
//! and ornament with their cursors, the accumulated attenuation and pitch
//! slide, and the active effect command.

use super::effects::{ActiveEffect, Modulation};
use crate::chip::registers::RegisterImage;
use crate::tracker::pattern::{command, PatternRow};
use crate::tracker::song::Song;
use crate::tracker::tones::{tone_word, PITCH_MASK};

/// Maximum attenuation (silence)
pub const MAX_ATTENUATION: u8 = 15;

/// Stereo attenuation subtracted from sample volumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Attenuation {
    /// Left attenuation (0-15)
    pub left: u8,
    /// Right attenuation (0-15)
    pub right: u8,
}

impl Attenuation {
    /// Attenuation for a row volume byte (low nibble left)
    pub fn from_volume(volume: u8) -> Self {
        Self {
            left: MAX_ATTENUATION - (volume & 0x0F),
            right: MAX_ATTENUATION - (volume >> 4),
        }
    }

    /// Add a signed delta to both sides, clamped to 0..=15
    pub fn shift(&mut self, delta: i32) {
        self.left = (i32::from(self.left) + delta).clamp(0, 15) as u8;
        self.right = (i32::from(self.right) + delta).clamp(0, 15) as u8;
    }
}

/// What a channel contributes to the register image on one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelOutput {
    /// Left amplitude (0-15)
    pub left: u8,
    /// Right amplitude (0-15)
    pub right: u8,
    /// Chip pitch word
    pub pitch: u16,
    /// Tone enabled
    pub tone: bool,
    /// Noise enabled
    pub noise: bool,
    /// Noise source requested by this channel
    pub noise_value: u8,
}

/// Runtime state of one channel
#[derive(Debug, Clone, Default)]
pub struct Channel {
    /// Sounding tone (0 = none)
    pub tone: u8,
    /// Note active
    pub playing: bool,
    /// Note released
    pub released: bool,
    /// Bound sample
    pub sample: usize,
    /// Bound ornament
    pub ornament: usize,
    /// Sample step to play this tick
    pub sample_cursor: usize,
    /// Ornament step to play this tick
    pub ornament_cursor: usize,
    /// Accumulated attenuation
    pub attenuation: Attenuation,
    /// Pitch slide in pitch-word units
    pub slide: i32,
    /// Height offset in semitones (special command)
    pub height: i8,
    /// Transpose of the current position
    pub transpose: i8,
    /// Left/right volumes exchanged
    pub swap_stereo: bool,
    /// Tone forced off by the soundchip command
    pub tone_muted: bool,
    /// Noise source forced by the soundchip command
    pub noise_override: Option<u8>,
    /// Active effect command
    pub effect: Option<ActiveEffect>,
    /// Last computed output
    pub output: ChannelOutput,
}

impl Channel {
    /// Zero all state
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Start a note
    pub fn trigger(&mut self, tone: u8) {
        self.tone = tone;
        self.playing = true;
        self.released = false;
        self.sample_cursor = 0;
        self.ornament_cursor = 0;
        self.slide = 0;
        self.height = 0;
        self.tone_muted = false;
        self.noise_override = None;
        self.attenuation = Attenuation::default();
    }

    /// Apply one pattern row
    ///
    /// A tone with glissando on a sounding channel becomes the glide target
    /// instead of a new note; the slide keeps its current value so the pitch
    /// continues from where it is.
    pub fn apply_row(&mut self, row: &PatternRow, transpose: i8) {
        self.transpose = transpose;
        if row.release {
            self.released = true;
        }

        let gliding = row.tone > 0 && row.command == command::GLISSANDO && self.playing && self.tone > 0;
        let new_note = row.tone > 0 && !gliding;
        if new_note {
            self.trigger(row.tone);
        }

        if row.sample > 0 {
            self.sample = usize::from(row.sample);
        }
        if row.ornament_release {
            self.ornament = 0;
            self.ornament_cursor = 0;
        } else if row.ornament > 0 {
            self.ornament = usize::from(row.ornament);
            self.ornament_cursor = 0;
        }
        if row.volume > 0 {
            self.attenuation = Attenuation::from_volume(row.volume);
        }

        if row.command > 0 {
            let glide_target = if gliding { Some(row.tone) } else { None };
            self.effect = ActiveEffect::start(row.command, row.param, glide_target, self);
        } else if new_note {
            self.effect = None;
        }
    }

    /// Advance one tick and compute this tick's output
    pub fn tick(&mut self, song: &Song, image: &mut RegisterImage, index: usize) -> ChannelOutput {
        if !self.playing {
            self.output = ChannelOutput {
                pitch: self.output.pitch,
                ..ChannelOutput::default()
            };
            return self.output;
        }

        let modulation = self.run_effect(song, image, index);
        if modulation.hold_sample {
            self.sample_cursor = 0;
        }
        if modulation.hold_ornament {
            self.ornament_cursor = 0;
        }

        let sample = song.sample(self.sample);
        let ornament = song.ornament(self.ornament);
        let step = sample.step(self.sample_cursor);
        let offset = ornament.offset(self.ornament_cursor);

        let tone = i32::from(self.tone)
            + i32::from(self.transpose)
            + i32::from(offset)
            + i32::from(self.height);
        let pitch = i32::from(tone_word(tone)) + i32::from(step.shift) + self.slide + modulation.pitch;

        let mut attenuation = self.attenuation;
        attenuation.shift(modulation.attenuation);
        let mut left = step.volume_left.saturating_sub(attenuation.left);
        let mut right = step.volume_right.saturating_sub(attenuation.right);
        if self.swap_stereo {
            std::mem::swap(&mut left, &mut right);
        }

        self.output = ChannelOutput {
            left,
            right,
            pitch: (pitch as u16) & PITCH_MASK,
            tone: step.enable_freq && !self.tone_muted,
            noise: step.enable_noise,
            noise_value: self.noise_override.unwrap_or(step.noise_value),
        };

        if !modulation.hold_sample {
            match sample.next_step(self.sample_cursor, self.released) {
                Some(next) => self.sample_cursor = next,
                None => self.playing = false,
            }
        }
        if !modulation.hold_ornament {
            self.ornament_cursor = ornament.next_step(self.ornament_cursor);
        }
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::sample::{Sample, SampleStep};

    fn song_with_tone_sample() -> Song {
        let mut song = Song::new();
        let mut sample = Sample {
            end: 2,
            loop_start: 0,
            ..Sample::default()
        };
        sample.data[0] = SampleStep {
            volume_left: 15,
            volume_right: 12,
            enable_freq: true,
            ..SampleStep::default()
        };
        sample.data[1] = sample.data[0];
        song.samples[1] = sample;
        song
    }

    fn note(tone: u8, sample: u8) -> PatternRow {
        PatternRow {
            tone,
            sample,
            ..PatternRow::default()
        }
    }

    #[test]
    fn test_attenuation_from_volume() {
        assert_eq!(Attenuation::from_volume(0xF8), Attenuation { left: 7, right: 0 });
        let mut att = Attenuation { left: 14, right: 1 };
        att.shift(3);
        assert_eq!(att, Attenuation { left: 15, right: 4 });
        att.shift(-5);
        assert_eq!(att, Attenuation { left: 10, right: 0 });
    }

    #[test]
    fn test_note_output() {
        let song = song_with_tone_sample();
        let mut image = RegisterImage::new();
        let mut ch = Channel::default();
        ch.apply_row(&note(37, 1), 0);
        let out = ch.tick(&song, &mut image, 0);
        assert_eq!(out.left, 15);
        assert_eq!(out.right, 12);
        assert!(out.tone);
        assert_eq!(out.pitch, 0x321);
    }

    #[test]
    fn test_transpose_and_volume() {
        let song = song_with_tone_sample();
        let mut image = RegisterImage::new();
        let mut ch = Channel::default();
        let row = PatternRow {
            volume: 0x4C,
            ..note(37, 1)
        };
        ch.apply_row(&row, 12);
        let out = ch.tick(&song, &mut image, 0);
        assert_eq!(out.pitch, 0x421);
        assert_eq!(out.left, 12);
        assert_eq!(out.right, 1);
    }

    #[test]
    fn test_silent_sample_stops_channel() {
        let song = Song::new();
        let mut image = RegisterImage::new();
        let mut ch = Channel::default();
        ch.apply_row(&note(10, 0), 0);
        assert!(ch.playing);
        ch.tick(&song, &mut image, 0);
        assert!(!ch.playing);
        assert_eq!(ch.tick(&song, &mut image, 0).left, 0);
    }

    #[test]
    fn test_ornament_release_detaches() {
        let mut song = song_with_tone_sample();
        song.ornaments[2].parse(&["0c"], 0, None);
        song.ornaments[2].end = 1;
        let mut image = RegisterImage::new();
        let mut ch = Channel::default();
        ch.apply_row(&PatternRow { ornament: 2, ..note(37, 1) }, 0);
        assert_eq!(ch.tick(&song, &mut image, 0).pitch, 0x421);

        ch.apply_row(&PatternRow { ornament_release: true, ..PatternRow::default() }, 0);
        assert_eq!(ch.ornament, 0);
        assert_eq!(ch.tick(&song, &mut image, 0).pitch, 0x321);
    }
}
