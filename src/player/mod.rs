//! Pattern sequencer
//!
//! Drives a [`Saa1099Backend`] from a [`Song`], one tick per virtual
//! interrupt:
//! - line stepping across rows and positions (song, position and row modes)
//! - per-tick channel processing and effect commands
//! - free sample preview on a separate channel set
//! - silent simulation to rebuild channel state for mid-song starts
//! - the audio pump mapping ticks onto sample buffers
//!
//! # Module Organization
//!
//! - [`channel`] - runtime channel state and row parsing
//! - [`effects`] - effect command processor
//! - [`tick`] - frame and line stepping, register image composition
//! - [`simulation`] - silent fast-forward
//! - [`pump`] - sample-buffer rendering and the shared player handle
//!
//! # Example
//!
//! ```
//! use saa1099::{Player, PlayerConfig, Song};
//!
//! let mut song = Song::new();
//! song.add_position(16, 6, None);
//! let mut player = Player::new(song, PlayerConfig::default())?;
//! player.play_position_from_line(true, true, true);
//!
//! let mut buffer = vec![0.0f32; 2 * 882];
//! player.fill_interleaved(&mut buffer);
//! # Ok::<(), saa1099::Saa1099Error>(())
//! ```

pub mod channel;
pub mod effects;
pub mod pump;
pub mod simulation;
pub mod tick;

use std::fmt;

use tracing::debug;

use crate::chip::{RegisterImage, Saa1099, Saa1099Backend, NUM_CHANNELS};
use crate::config::PlayerConfig;
use crate::tracker::Song;
use crate::Result;

pub use channel::{Attenuation, Channel, ChannelOutput};
pub use effects::{ActiveEffect, EffectState};
pub use pump::{shared, SharedPlayer};

use pump::Pump;

/// Transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerState {
    /// Nothing playing
    #[default]
    Stopped,
    /// Playing the song, following positions
    Song,
    /// Looping the current position
    Position,
    /// Auditioning a single row
    Row,
    /// Previewing a sample on the free channel set
    PreviewSample,
    /// Silent fast-forward
    Simulating,
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayerState::Stopped => "stopped",
            PlayerState::Song => "playing song",
            PlayerState::Position => "playing position",
            PlayerState::Row => "playing row",
            PlayerState::PreviewSample => "previewing sample",
            PlayerState::Simulating => "simulating",
        };
        f.write_str(name)
    }
}

/// Sequencer cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Cursor {
    pub position: usize,
    pub line: usize,
    /// Ticks left on the current line
    pub ticks_left: u8,
    /// Ticks the current line lasts
    pub line_ticks: u8,
    /// Ticks per line in force
    pub speed: u8,
    /// The current line has not been parsed yet
    pub line_pending: bool,
}

/// Pattern sequencer driving an SAA1099 backend
pub struct Player<B: Saa1099Backend = Saa1099> {
    pub(crate) song: Song,
    pub(crate) chip: B,
    pub(crate) config: PlayerConfig,
    pub(crate) state: PlayerState,
    /// Follow into the next position at the end of the current one
    pub(crate) follow: bool,
    pub(crate) cursor: Cursor,
    pub(crate) song_channels: [Channel; NUM_CHANNELS],
    pub(crate) preview_channels: [Channel; NUM_CHANNELS],
    pub(crate) image: RegisterImage,
    pub(crate) pump: Pump,
    /// Ticks processed since the last start
    pub(crate) ticks: u64,
}

impl Player<Saa1099> {
    /// Create a player with an emulated chip at the configured sample rate
    pub fn new(song: Song, config: PlayerConfig) -> Result<Self> {
        config.validate()?;
        Self::with_backend(song, config, Saa1099::new(config.sample_rate))
    }
}

impl<B: Saa1099Backend> Player<B> {
    /// Create a player driving an existing backend
    pub fn with_backend(song: Song, config: PlayerConfig, chip: B) -> Result<Self> {
        config.validate()?;
        let mut player = Self {
            song,
            chip,
            config,
            state: PlayerState::Stopped,
            follow: false,
            cursor: Cursor::default(),
            song_channels: Default::default(),
            preview_channels: Default::default(),
            image: RegisterImage::silence(),
            pump: Pump::new(config.sample_rate, config.interrupt_hz),
            ticks: 0,
        };
        player.cursor.speed = player.song.position(0).speed;
        player.chip.replace(&player.image);
        Ok(player)
    }

    /// Replace the song; stops playback and rewinds the cursor
    pub fn load_song(&mut self, song: Song) {
        self.stop(None);
        self.song = song;
        self.cursor = Cursor {
            speed: self.song.position(0).speed,
            ..Cursor::default()
        };
        debug!(title = %self.song.title, positions = self.song.positions.len(), "song loaded");
    }

    /// Song being played
    pub fn song(&self) -> &Song {
        &self.song
    }

    /// Song for editing; call [`Song::recompute_row_timings`] after speed edits
    pub fn song_mut(&mut self) -> &mut Song {
        &mut self.song
    }

    /// Current configuration
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Change interrupt rate and loop mode (the sample rate is fixed by the
    /// backend)
    pub fn set_config(&mut self, config: PlayerConfig) -> Result<()> {
        config.validate()?;
        self.config = PlayerConfig {
            sample_rate: self.chip.sample_rate(),
            ..config
        };
        self.pump = Pump::new(self.config.sample_rate, self.config.interrupt_hz);
        Ok(())
    }

    /// Loop back to the repeat position at song end
    pub fn set_loop_mode(&mut self, loop_mode: bool) {
        self.config.loop_mode = loop_mode;
    }

    /// Transport state
    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Whether anything is playing
    pub fn is_playing(&self) -> bool {
        !matches!(self.state, PlayerState::Stopped)
    }

    /// Current position index
    pub fn position(&self) -> usize {
        self.cursor.position
    }

    /// Current line
    pub fn line(&self) -> usize {
        self.cursor.line
    }

    /// Ticks already spent on the current line
    pub fn tick(&self) -> u8 {
        self.cursor.line_ticks.saturating_sub(self.cursor.ticks_left)
    }

    /// Ticks per line in force
    pub fn speed(&self) -> u8 {
        self.cursor.speed
    }

    /// Ticks processed since playback started
    pub fn elapsed_ticks(&self) -> u64 {
        self.ticks
    }

    /// Move the editor cursor (only while stopped)
    pub fn set_cursor(&mut self, position: usize, line: usize) {
        if self.is_playing() {
            return;
        }
        self.cursor.position = position;
        self.cursor.line = line.min(self.song.position(position).length.saturating_sub(1));
    }

    /// Song channel runtime state
    pub fn channels(&self) -> &[Channel; NUM_CHANNELS] {
        &self.song_channels
    }

    /// Preview channel runtime state
    pub fn preview_channels(&self) -> &[Channel; NUM_CHANNELS] {
        &self.preview_channels
    }

    /// Register image composed on the last tick
    pub fn image(&self) -> &RegisterImage {
        &self.image
    }

    /// The chip backend
    pub fn chip(&self) -> &B {
        &self.chip
    }

    /// Mute or unmute a chip channel
    pub fn mute(&mut self, channel: usize, muted: bool) {
        self.chip.mute(channel, muted);
    }

    /// Speed in force on `line` of `position` after speed commands
    pub(crate) fn speed_at(&self, position: usize, line: usize) -> u8 {
        let pos = self.song.position(position);
        pos.row_speeds(&self.song.patterns)
            .get(line)
            .copied()
            .unwrap_or(pos.speed)
    }

    /// Start playback at the cursor
    ///
    /// - `from_start`: rewind to the first line of the first position
    /// - `follow`: continue into following positions (song mode) instead of
    ///   looping the current one (position mode)
    /// - `reset_line`: start from line 0 of the current position
    ///
    /// Starting anywhere but the song start rebuilds channel state by
    /// simulating everything before the cursor.
    pub fn play_position_from_line(&mut self, from_start: bool, follow: bool, reset_line: bool) {
        self.stop(None);
        if from_start {
            self.cursor.position = 0;
            self.cursor.line = 0;
        } else if reset_line {
            self.cursor.line = 0;
        }
        let position = self.cursor.position;
        let length = self.song.position(position).length;
        let line = self.cursor.line.min(length.saturating_sub(1));

        if position > 0 || line > 0 {
            self.simulate_to(position, line);
        }

        self.cursor = Cursor {
            position,
            line,
            ticks_left: 0,
            line_ticks: 0,
            speed: self.speed_at(position, line),
            line_pending: true,
        };
        self.follow = follow;
        self.ticks = 0;
        self.state = if follow {
            PlayerState::Song
        } else {
            PlayerState::Position
        };
        debug!(position, line, state = %self.state, "playback started");
    }

    /// Play the row under the cursor once
    ///
    /// Song channel state carries over between consecutive row auditions.
    pub fn play_row(&mut self) {
        if self.state != PlayerState::Row {
            self.stop(None);
        }
        let position = self.cursor.position;
        let line = self
            .cursor
            .line
            .min(self.song.position(position).length.saturating_sub(1));
        self.cursor.line = line;
        self.cursor.speed = self.speed_at(position, line);
        self.follow = false;
        self.state = PlayerState::Row;
        self.parse_line();
        debug!(position, line, "row audition");
    }

    /// Audition a sample/ornament/tone on the preview channel set
    ///
    /// Uses `channel` when given, otherwise the first idle preview channel
    /// (channel 0 when all are busy). Returns the channel used.
    pub fn preview_sample(
        &mut self,
        sample: usize,
        ornament: usize,
        tone: u8,
        channel: Option<usize>,
    ) -> Option<usize> {
        if tone == 0 {
            return None;
        }
        if self.state != PlayerState::PreviewSample {
            self.stop(None);
            self.state = PlayerState::PreviewSample;
        }
        let index = match channel {
            Some(ch) if ch < NUM_CHANNELS => ch,
            Some(_) => return None,
            None => self
                .preview_channels
                .iter()
                .position(|c| !c.playing)
                .unwrap_or(0),
        };
        let ch = &mut self.preview_channels[index];
        ch.reset();
        ch.sample = sample;
        ch.ornament = ornament;
        ch.trigger(tone);
        debug!(channel = index, sample, ornament, tone, "sample preview");
        Some(index)
    }

    /// Release a preview note so a releasable sample plays its tail
    pub fn release_preview(&mut self, channel: usize) {
        if let Some(ch) = self.preview_channels.get_mut(channel) {
            ch.released = true;
        }
    }

    /// Stop everything (`None`) or silence one channel of the active set
    ///
    /// A full stop zeroes both channel sets and forces a silence image onto
    /// the chip immediately.
    pub fn stop(&mut self, channel: Option<usize>) {
        match channel {
            None => {
                let was = self.state;
                self.state = PlayerState::Stopped;
                for ch in self.song_channels.iter_mut().chain(self.preview_channels.iter_mut()) {
                    ch.reset();
                }
                self.image = RegisterImage::silence();
                self.chip.replace(&self.image);
                if was != PlayerState::Stopped {
                    debug!(from = %was, "stopped");
                }
            }
            Some(index) if index < NUM_CHANNELS => {
                let set = if self.state == PlayerState::PreviewSample {
                    &mut self.preview_channels
                } else {
                    &mut self.song_channels
                };
                set[index].reset();
                self.image.set_amplitude(index, 0, 0);
                if !matches!(self.state, PlayerState::Simulating) {
                    self.chip.replace(&self.image);
                }
            }
            Some(_) => {}
        }
    }
}
