//! Effect command processor
//!
//! A row's command nibble and parameter byte start an [`ActiveEffect`] on
//! the channel. The effect runs once per tick until a later row replaces it,
//! a new note arrives without a command, or the effect finishes by itself.
//! Finishing clears the command, parameter and scratch state together.
//!
//! Parameters are read as `xy`: `x` is the period (or speed), `y` the amount.

use super::channel::Channel;
use crate::chip::registers::ENVELOPE_0;
use crate::chip::registers::RegisterImage;
use crate::tracker::pattern::command;
use crate::tracker::song::Song;
use crate::tracker::tones::{tone_word, vibrato};

/// Per-command scratch state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectState {
    /// No scratch needed
    Idle,
    /// Ticks left until the next periodic step
    Counter(u8),
    /// Glide towards `target`, `delta` pitch words away from the base tone
    Glissando {
        /// Target tone
        target: u8,
        /// Slide value at which the target is reached
        delta: i32,
        /// Ticks left until the next step
        counter: u8,
    },
    /// Waveform phase (0-63)
    Phase(u8),
    /// Ticks left to hold a cursor at step 0
    Delay(u8),
    /// Ticks already spent on a two-tick special command
    Special(u8),
}

/// Effect running on a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveEffect {
    /// Command nibble
    pub command: u8,
    /// Parameter byte
    pub param: u8,
    /// Scratch state
    pub state: EffectState,
}

/// Per-tick output of an effect that does not persist in the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modulation {
    /// Pitch-word delta (vibrato)
    pub pitch: i32,
    /// Attenuation delta (tremolo)
    pub attenuation: i32,
    /// Keep the sample cursor at step 0
    pub hold_sample: bool,
    /// Keep the ornament cursor at step 0
    pub hold_ornament: bool,
}

/// Whether a periodic effect fires on this tick (period 0 acts as 1)
#[inline]
fn period_elapsed(counter: &mut u8, period: u8) -> bool {
    if *counter == 0 {
        *counter = period.max(1);
    }
    *counter -= 1;
    *counter == 0
}

impl ActiveEffect {
    /// Start `command` on `channel`
    ///
    /// `glide_target` is the row's tone when the row glides instead of
    /// triggering a note. Returns `None` for commands with nothing to do.
    pub fn start(
        command: u8,
        param: u8,
        glide_target: Option<u8>,
        channel: &Channel,
    ) -> Option<Self> {
        let state = match command {
            command::PORTAMENTO_UP | command::PORTAMENTO_DOWN | command::VOLUME_SLIDE => {
                EffectState::Counter(0)
            }
            command::GLISSANDO => {
                let target = glide_target?;
                let transpose = i32::from(channel.transpose);
                let delta = i32::from(tone_word(i32::from(target) + transpose))
                    - i32::from(tone_word(i32::from(channel.tone) + transpose));
                EffectState::Glissando {
                    target,
                    delta,
                    counter: 0,
                }
            }
            command::VIBRATO | command::TREMOLO => EffectState::Phase(0),
            command::ORNAMENT_DELAY | command::SAMPLE_DELAY => EffectState::Delay(param),
            command::SPECIAL => EffectState::Special(0),
            command::BREAK
            | command::ORNAMENT_OFFSET
            | command::SAMPLE_OFFSET
            | command::SOUNDCHIP => EffectState::Idle,
            _ => return None,
        };
        Some(Self {
            command,
            param,
            state,
        })
    }

    /// Period nibble
    #[inline]
    pub fn period(&self) -> u8 {
        self.param >> 4
    }

    /// Amount nibble
    #[inline]
    pub fn amount(&self) -> u8 {
        self.param & 0x0F
    }
}

impl Channel {
    /// Run the active effect for one tick
    pub(crate) fn run_effect(
        &mut self,
        song: &Song,
        image: &mut RegisterImage,
        index: usize,
    ) -> Modulation {
        let mut modulation = Modulation::default();
        let Some(mut effect) = self.effect else {
            return modulation;
        };
        let period = effect.period();
        let amount = effect.amount();
        let mut finished = false;

        match (effect.command, &mut effect.state) {
            (command::PORTAMENTO_UP, EffectState::Counter(counter)) => {
                if period_elapsed(counter, period) {
                    self.slide += i32::from(amount);
                }
            }
            (command::PORTAMENTO_DOWN, EffectState::Counter(counter)) => {
                if period_elapsed(counter, period) {
                    self.slide -= i32::from(amount);
                }
            }
            (command::GLISSANDO, EffectState::Glissando { target, delta, counter }) => {
                if period_elapsed(counter, period) {
                    let step = i32::from(amount.max(1));
                    self.slide += if *delta < 0 { -step } else { step };
                }
                let reached = if *delta < 0 {
                    self.slide <= *delta
                } else {
                    self.slide >= *delta
                };
                if reached {
                    self.tone = *target;
                    self.slide = 0;
                    finished = true;
                }
            }
            (command::VIBRATO, EffectState::Phase(phase)) => {
                if effect.param == 0 {
                    finished = true;
                } else {
                    *phase = (*phase + period) & 0x3F;
                    modulation.pitch = i32::from(vibrato(amount * 2, *phase));
                }
            }
            (command::TREMOLO, EffectState::Phase(phase)) => {
                if effect.param == 0 {
                    finished = true;
                } else {
                    *phase = (*phase + period) & 0x3F;
                    modulation.attenuation = i32::from(vibrato(amount, *phase));
                }
            }
            (command::ORNAMENT_DELAY, EffectState::Delay(left))
            | (command::SAMPLE_DELAY, EffectState::Delay(left)) => {
                if *left == 0 {
                    finished = true;
                } else {
                    if effect.command == command::ORNAMENT_DELAY {
                        modulation.hold_ornament = true;
                    } else {
                        modulation.hold_sample = true;
                    }
                    *left -= 1;
                    finished = *left == 0;
                }
            }
            (command::ORNAMENT_OFFSET, _) => {
                let step = usize::from(effect.param);
                if step < song.ornament(self.ornament).end {
                    self.ornament_cursor = step;
                }
                finished = true;
            }
            (command::SAMPLE_OFFSET, _) => {
                let step = usize::from(effect.param);
                if song.sample(self.sample).accepts_offset(step) {
                    self.sample_cursor = step;
                }
                finished = true;
            }
            (command::VOLUME_SLIDE, EffectState::Counter(counter)) => {
                if period_elapsed(counter, period) {
                    let delta = i32::from(amount & 7);
                    // bit 3 set lowers the volume
                    self.attenuation
                        .shift(if amount & 8 != 0 { delta } else { -delta });
                }
            }
            (command::SPECIAL, EffectState::Special(ticks)) => {
                if period == 0x0F {
                    self.swap_stereo = amount & 1 != 0;
                    finished = true;
                } else if *ticks == 0 {
                    self.height = period as i8;
                    *ticks = 1;
                } else {
                    self.height = self.height.wrapping_add(amount as i8);
                    finished = true;
                }
            }
            (command::SOUNDCHIP, _) => {
                let triplet = index / 3;
                if period == 0 {
                    let source = amount & 3;
                    self.noise_override = Some(source);
                    image.set_noise_source(triplet, source);
                } else {
                    image.write(ENVELOPE_0 + triplet as u8, envelope_control(period, amount));
                    if period & 8 != 0 {
                        self.tone_muted = true;
                    }
                }
                finished = true;
            }
            (command::BREAK, _) => {}
            _ => finished = true,
        }

        self.effect = if finished { None } else { Some(effect) };
        modulation
    }
}

/// Envelope control byte for a soundchip command `Exy` (x != 0)
///
/// x bit 0 enables, bit 1 selects the 3-bit resolution, bit 2 the external
/// clock; y bits 0-2 pick the waveform and bit 3 inverts the right side.
pub fn envelope_control(x: u8, y: u8) -> u8 {
    ((x & 1) << 7) | ((x & 4) << 3) | ((x & 2) << 3) | ((y & 7) << 1) | (y >> 3)
}
