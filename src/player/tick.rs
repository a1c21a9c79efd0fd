//! Tick processing and song advancement.
//!
//! This module handles the core playback timing:
//! - Processing one tick per virtual interrupt
//! - Advancing through lines and positions
//! - Speed commands and swing timing
//! - Song end (loop or halt)
//! - Composing the register image from channel outputs

use tracing::{debug, trace};

use super::channel::{Channel, ChannelOutput};
use super::{Player, PlayerState};
use crate::chip::registers::{MasterControl, RegisterImage, FREQUENCY_ENABLE, MASTER_CONTROL, NOISE_ENABLE};
use crate::chip::{Saa1099Backend, NUM_CHANNELS};
use crate::tracker::position::row_ticks;
use crate::tracker::Song;

/// Channels sharing one noise generator
const TRIPLET: usize = 3;

/// Tick processing context for one channel set.
pub(crate) struct TickContext<'a> {
    pub song: &'a Song,
    pub channels: &'a mut [Channel; NUM_CHANNELS],
    pub image: &'a mut RegisterImage,
}

impl TickContext<'_> {
    /// Tick every channel and fold the outputs into the register image.
    ///
    /// Returns whether any channel is still playing.
    pub fn process_tick(&mut self) -> bool {
        let mut outputs = [ChannelOutput::default(); NUM_CHANNELS];
        for (index, channel) in self.channels.iter_mut().enumerate() {
            outputs[index] = channel.tick(self.song, self.image, index);
        }
        compose_image(self.image, &outputs);
        self.channels.iter().any(|c| c.playing)
    }
}

/// Write amplitudes, pitches, enables and noise sources for one tick
///
/// The lowest channel of a triplet with noise enabled picks that triplet's
/// noise source.
pub(crate) fn compose_image(image: &mut RegisterImage, outputs: &[ChannelOutput; NUM_CHANNELS]) {
    for (index, out) in outputs.iter().enumerate() {
        image.set_amplitude(index, out.left, out.right);
        image.set_pitch(index, out.pitch);
        image.set_channel_bit(FREQUENCY_ENABLE, index, out.tone);
        image.set_channel_bit(NOISE_ENABLE, index, out.noise);
    }
    for (generator, triplet) in outputs.chunks(TRIPLET).enumerate() {
        if let Some(out) = triplet.iter().find(|o| o.noise) {
            image.set_noise_source(generator, out.noise_value);
        }
    }
    image.write(MASTER_CONTROL, MasterControl::SOUND_ENABLE.bits());
}

impl<B: Saa1099Backend> Player<B> {
    /// Process one virtual interrupt
    ///
    /// Steps to the next line when the current one is used up, ticks the
    /// active channel set and hands the composed image to the chip (not while
    /// simulating). Preview and row auditions stop by themselves once every
    /// channel falls silent.
    pub fn advance_frame(&mut self) {
        match self.state {
            PlayerState::Stopped => return,
            PlayerState::PreviewSample => {
                let playing = self.tick_channels();
                if !playing {
                    self.stop(None);
                }
                return;
            }
            _ => {}
        }

        if self.cursor.ticks_left == 0 && !self.advance_line() {
            return;
        }
        self.cursor.ticks_left = self.cursor.ticks_left.saturating_sub(1);
        self.tick_channels();
    }

    /// Move to the next line and parse it
    ///
    /// Returns `false` when playback ended instead (row audition finished or
    /// song end with looping off).
    pub fn advance_line(&mut self) -> bool {
        if !self.cursor.line_pending {
            if self.state == PlayerState::Row {
                self.stop(None);
                return false;
            }
            self.cursor.line += 1;
            let length = self.song.position(self.cursor.position).length;
            if self.cursor.line >= length && !self.next_position() {
                return false;
            }
        }
        self.parse_line();
        true
    }

    /// Step past the end of the current position
    fn next_position(&mut self) -> bool {
        if !self.follow {
            self.cursor.line = 0;
            self.cursor.speed = self.song.position(self.cursor.position).speed;
            return true;
        }

        let next = self.cursor.position + 1;
        let simulating = self.state == PlayerState::Simulating;
        if next < self.song.positions.len() {
            self.cursor.position = next;
        } else if self.config.loop_mode || simulating {
            self.cursor.position = self.song.repeat_position.min(self.song.positions.len().saturating_sub(1));
            debug!(position = self.cursor.position, "song loop");
        } else {
            let last = self.song.position(self.cursor.position).length;
            self.cursor.line = last.saturating_sub(1);
            self.cursor.line_pending = false;
            debug!(position = self.cursor.position, "song end");
            self.stop(None);
            return false;
        }
        self.cursor.line = 0;
        self.cursor.speed = self.song.position(self.cursor.position).speed;
        true
    }

    /// Parse the cursor line into the song channels and arm its tick count
    pub(crate) fn parse_line(&mut self) {
        let line = self.cursor.line;
        let position = self.song.position(self.cursor.position);
        for (binding, channel) in position.channels.iter().zip(self.song_channels.iter_mut()) {
            let row = self.song.pattern(binding.pattern).row(line);
            channel.apply_row(&row, binding.transpose);
            if let Some(speed) = row.speed_change() {
                self.cursor.speed = speed;
            }
        }
        let ticks = row_ticks(self.cursor.speed, line);
        self.cursor.ticks_left = ticks;
        self.cursor.line_ticks = ticks;
        self.cursor.line_pending = false;
        trace!(position = self.cursor.position, line, speed = self.cursor.speed, "line");
    }

    /// Tick the active channel set and push the image
    fn tick_channels(&mut self) -> bool {
        let channels = if self.state == PlayerState::PreviewSample {
            &mut self.preview_channels
        } else {
            &mut self.song_channels
        };
        let playing = TickContext {
            song: &self.song,
            channels,
            image: &mut self.image,
        }
        .process_tick();
        self.ticks += 1;
        if self.state != PlayerState::Simulating {
            self.chip.replace(&self.image);
        }
        playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::registers::{AMPLITUDE_BASE, NOISE_SOURCE};
    use crate::config::PlayerConfig;
    use crate::tracker::pattern::{command, PatternRow};
    use crate::tracker::sample::{Sample, SampleStep};

    fn looping_sample() -> Sample {
        let mut sample = Sample {
            end: 1,
            loop_start: 0,
            ..Sample::default()
        };
        sample.data[0] = SampleStep {
            volume_left: 15,
            volume_right: 15,
            enable_freq: true,
            ..SampleStep::default()
        };
        sample
    }

    fn song_with_note(length: usize, speed: u8) -> Song {
        let mut song = Song::new();
        song.samples[1] = looping_sample();
        let pattern = song.add_pattern();
        song.patterns[pattern].data[0] = PatternRow {
            tone: 37,
            sample: 1,
            ..PatternRow::default()
        };
        let position = song.add_position(length, speed, None);
        song.positions[position].channels[0].pattern = pattern;
        song.recompute_row_timings(None);
        song
    }

    fn player(song: Song, loop_mode: bool) -> Player {
        let config = PlayerConfig {
            loop_mode,
            ..PlayerConfig::default()
        };
        match Player::new(song, config) {
            Ok(player) => player,
            Err(e) => panic!("player: {e}"),
        }
    }

    #[test]
    fn test_compose_image_noise_priority() {
        let mut image = RegisterImage::new();
        let mut outputs = [ChannelOutput::default(); NUM_CHANNELS];
        outputs[1] = ChannelOutput {
            noise: true,
            noise_value: 2,
            ..ChannelOutput::default()
        };
        outputs[2] = ChannelOutput {
            noise: true,
            noise_value: 1,
            ..ChannelOutput::default()
        };
        outputs[5] = ChannelOutput {
            left: 9,
            right: 3,
            tone: true,
            noise: true,
            noise_value: 3,
            pitch: 0x321,
        };
        compose_image(&mut image, &outputs);
        assert_eq!(image.noise_source(0), 2);
        assert_eq!(image.noise_source(1), 3);
        assert_eq!(image.read(NOISE_SOURCE), 0x32);
        assert_eq!(image.read(AMPLITUDE_BASE + 5), 0x39);
        assert_eq!(image.read(FREQUENCY_ENABLE), 0x20);
        assert_eq!(image.read(NOISE_ENABLE), 0x26);
        assert_eq!(image.pitch(5), 0x321);
        assert_eq!(image.read(MASTER_CONTROL), 1);
    }

    #[test]
    fn test_stopped_does_nothing() {
        let mut p = player(song_with_note(4, 2), true);
        p.advance_frame();
        assert_eq!(p.elapsed_ticks(), 0);
        assert_eq!(p.image().read(MASTER_CONTROL), 0);
    }

    #[test]
    fn test_line_stepping() {
        let mut p = player(song_with_note(4, 2), true);
        p.play_position_from_line(true, true, true);
        p.advance_frame();
        assert_eq!((p.line(), p.tick()), (0, 1));
        assert!(p.channels()[0].playing);
        assert_eq!(p.image().pitch(0), 0x321);
        p.advance_frame();
        assert_eq!((p.line(), p.tick()), (0, 2));
        p.advance_frame();
        assert_eq!((p.line(), p.tick()), (1, 1));
    }

    #[test]
    fn test_speed_command_applies_same_line() {
        let mut song = song_with_note(4, 6);
        song.patterns[1].data[1] = PatternRow {
            command: command::SPEED,
            param: 2,
            ..PatternRow::default()
        };
        song.recompute_row_timings(None);
        let mut p = player(song, true);
        p.play_position_from_line(true, true, true);
        for _ in 0..7 {
            p.advance_frame();
        }
        assert_eq!(p.line(), 1);
        assert_eq!(p.speed(), 2);
        p.advance_frame();
        p.advance_frame();
        assert_eq!(p.line(), 2);
    }

    #[test]
    fn test_position_mode_loops_position() {
        let mut song = song_with_note(2, 1);
        song.add_position(2, 1, None);
        let mut p = player(song, false);
        p.play_position_from_line(true, false, true);
        for _ in 0..5 {
            p.advance_frame();
        }
        assert_eq!(p.position(), 0);
        assert_eq!(p.line(), 0);
        assert!(p.is_playing());
    }

    #[test]
    fn test_song_end_halts_without_loop() {
        let mut p = player(song_with_note(2, 1), false);
        p.play_position_from_line(true, true, true);
        p.advance_frame();
        p.advance_frame();
        assert!(p.is_playing());
        p.advance_frame();
        assert_eq!(p.state(), PlayerState::Stopped);
        assert_eq!((p.position(), p.line()), (0, 1));
        assert_eq!(p.image(), &RegisterImage::silence());
        assert!(!p.chip().is_sound_enabled());
    }

    #[test]
    fn test_row_audition_stops() {
        let mut p = player(song_with_note(4, 3), true);
        p.play_row();
        assert_eq!(p.state(), PlayerState::Row);
        for _ in 0..3 {
            p.advance_frame();
            assert!(p.is_playing());
        }
        p.advance_frame();
        assert_eq!(p.state(), PlayerState::Stopped);
    }

    #[test]
    fn test_silent_row_audition_runs_its_ticks() {
        let mut song = Song::new();
        song.add_position(4, 3, None);
        song.recompute_row_timings(None);
        let mut p = player(song, true);
        p.play_row();
        for _ in 0..3 {
            p.advance_frame();
            assert_eq!(p.state(), PlayerState::Row);
        }
        p.advance_frame();
        assert_eq!(p.state(), PlayerState::Stopped);
    }

    #[test]
    fn test_stop_single_channel() {
        let mut p = player(song_with_note(4, 3), true);
        p.play_position_from_line(true, true, true);
        p.advance_frame();
        assert_eq!(p.image().read(AMPLITUDE_BASE), 0xFF);
        p.stop(Some(0));
        assert!(!p.channels()[0].playing);
        assert_eq!(p.image().read(AMPLITUDE_BASE), 0);
        assert!(p.is_playing());
    }
}
