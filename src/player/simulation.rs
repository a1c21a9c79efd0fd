//! Silent fast-forward
//!
//! Starting playback mid-song needs the channel state (sounding notes,
//! effects, envelope registers, speed) that the skipped lines would have
//! built. The simulation replays the song from its start without touching
//! the chip until the target line is next.

use tracing::{debug, warn};

use super::{Cursor, Player, PlayerState};
use crate::chip::Saa1099Backend;
use crate::tracker::pattern::MAX_PATTERN_LENGTH;

/// Upper bound on ticks per line (largest plain speed)
const MAX_LINE_TICKS: usize = 0x1F;

/// Transport context saved around a simulation
#[derive(Debug, Clone, Copy)]
struct SavedContext {
    state: PlayerState,
    follow: bool,
    cursor: Cursor,
    ticks: u64,
}

impl<B: Saa1099Backend> Player<B> {
    /// Run `f` in simulation mode, restoring transport state afterwards
    ///
    /// Channel state and the register image built inside `f` are kept; the
    /// state, cursor and follow flag are restored on every exit path.
    pub(crate) fn with_simulation<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = SavedContext {
            state: self.state,
            follow: self.follow,
            cursor: self.cursor,
            ticks: self.ticks,
        };
        self.state = PlayerState::Simulating;
        self.follow = true;
        let result = f(self);
        self.state = saved.state;
        self.follow = saved.follow;
        self.cursor = saved.cursor;
        self.ticks = saved.ticks;
        result
    }

    /// Rebuild song channel state as it stands right before `line` of
    /// `position` is parsed
    ///
    /// Returns the speed in force at that point.
    pub fn simulate_to(&mut self, position: usize, line: usize) -> u8 {
        for channel in self.song_channels.iter_mut() {
            channel.reset();
        }
        let limit = self.simulation_limit();
        let (speed, ticks, reached) = self.with_simulation(|player| {
            player.cursor = Cursor {
                speed: player.song.position(0).speed,
                line_pending: true,
                ..Cursor::default()
            };
            let mut ticks = 0usize;
            let mut reached = false;
            while ticks < limit {
                if player.cursor.ticks_left == 0 && player.upcoming_line() == (position, line) {
                    reached = true;
                    break;
                }
                player.advance_frame();
                ticks += 1;
            }
            (player.cursor.speed, ticks, reached)
        });
        if reached {
            debug!(position, line, ticks, "simulation reached target");
        } else {
            warn!(position, line, ticks, "simulation did not reach target");
        }
        speed
    }

    /// Rebuild song channel state at the entry of `position`
    pub fn rebuild_position_entry_state(&mut self, position: usize) {
        self.simulate_to(position, 0);
    }

    /// Line the next call to `advance_line` would parse
    fn upcoming_line(&self) -> (usize, usize) {
        let cursor = &self.cursor;
        if cursor.line_pending {
            return (cursor.position, cursor.line);
        }
        if cursor.line + 1 < self.song.position(cursor.position).length {
            return (cursor.position, cursor.line + 1);
        }
        if cursor.position + 1 < self.song.positions.len() {
            (cursor.position + 1, 0)
        } else {
            (self.song.repeat_position, 0)
        }
    }

    fn simulation_limit(&self) -> usize {
        (self.song.positions.len() + 1) * MAX_PATTERN_LENGTH * MAX_LINE_TICKS
    }
}
