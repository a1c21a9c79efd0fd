//! Audio pump
//!
//! Maps sequencer ticks onto host sample buffers: one tick every
//! `sample_rate / interrupt_hz` samples, with the integer remainder carried
//! so that the long-run tick rate is exact.

use std::sync::Arc;

use parking_lot::Mutex;

use super::Player;
use crate::chip::{Saa1099, Saa1099Backend};

/// Player shared between a control thread and an audio callback
pub type SharedPlayer<B = Saa1099> = Arc<Mutex<Player<B>>>;

/// Wrap a player for sharing across threads
pub fn shared<B: Saa1099Backend>(player: Player<B>) -> SharedPlayer<B> {
    Arc::new(Mutex::new(player))
}

/// Tick scheduler over the sample stream
#[derive(Debug, Clone, Default)]
pub(crate) struct Pump {
    interrupt_hz: u32,
    period: usize,
    remainder: u32,
    carry: u32,
    /// Samples left before the next tick
    pending: usize,
    scratch_left: Vec<f32>,
    scratch_right: Vec<f32>,
}

impl Pump {
    pub fn new(sample_rate: u32, interrupt_hz: u32) -> Self {
        let interrupt_hz = interrupt_hz.max(1);
        Self {
            interrupt_hz,
            period: (sample_rate / interrupt_hz) as usize,
            remainder: sample_rate % interrupt_hz,
            ..Self::default()
        }
    }

    /// Length of the next tick in samples
    pub fn next_period(&mut self) -> usize {
        let mut period = self.period;
        self.carry += self.remainder;
        if self.carry >= self.interrupt_hz {
            self.carry -= self.interrupt_hz;
            period += 1;
        }
        period
    }
}

impl<B: Saa1099Backend> Player<B> {
    /// Render planar stereo, running a tick at every period boundary
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        let count = left.len().min(right.len());
        let mut offset = 0;
        while offset < count {
            if self.pump.pending == 0 {
                self.advance_frame();
                self.pump.pending = self.pump.next_period().max(1);
            }
            let chunk = self.pump.pending.min(count - offset);
            self.chip.render(left, right, chunk, offset);
            offset += chunk;
            self.pump.pending -= chunk;
        }
    }

    /// Render interleaved stereo (`L R L R ...`)
    pub fn fill_interleaved(&mut self, out: &mut [f32]) {
        let frames = out.len() / 2;
        let mut left = std::mem::take(&mut self.pump.scratch_left);
        let mut right = std::mem::take(&mut self.pump.scratch_right);
        left.resize(frames, 0.0);
        right.resize(frames, 0.0);

        self.render(&mut left, &mut right);
        for (frame, (l, r)) in out.chunks_exact_mut(2).zip(left.iter().zip(right.iter())) {
            frame[0] = *l;
            frame[1] = *r;
        }

        self.pump.scratch_left = left;
        self.pump.scratch_right = right;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayerConfig;
    use crate::tracker::Song;

    #[test]
    fn test_period_without_remainder() {
        let mut pump = Pump::new(44_100, 50);
        assert!((0..10).all(|_| pump.next_period() == 882));
    }

    #[test]
    fn test_remainder_carry() {
        let mut pump = Pump::new(44_100, 65);
        let periods: Vec<usize> = (0..65).map(|_| pump.next_period()).collect();
        assert!(periods.iter().all(|&p| p == 678 || p == 679));
        assert_eq!(periods.iter().sum::<usize>(), 44_100);
        assert_eq!(periods[0], 678);
        assert_eq!(periods[2], 679);
    }

    #[test]
    fn test_render_runs_ticks() {
        let mut song = Song::new();
        song.add_position(8, 6, None);
        let mut player = match Player::new(song, PlayerConfig::default()) {
            Ok(p) => p,
            Err(e) => panic!("player: {e}"),
        };
        player.play_position_from_line(true, true, true);

        let mut out = vec![1.0f32; 2 * 882 * 3];
        player.fill_interleaved(&mut out);
        assert_eq!(player.elapsed_ticks(), 3);
        assert_eq!((player.line(), player.tick()), (0, 3));
        assert!(out.iter().all(|s| s.abs() < 1e-6));
    }

    #[test]
    fn test_shared_player() {
        let player = match Player::new(Song::new(), PlayerConfig::default()) {
            Ok(p) => p,
            Err(e) => panic!("player: {e}"),
        };
        let handle = shared(player);
        let worker = Arc::clone(&handle);
        let join = std::thread::spawn(move || {
            let mut buffer = vec![0.0f32; 256];
            worker.lock().fill_interleaved(&mut buffer);
        });
        assert!(join.join().is_ok());
        assert!(!handle.lock().is_playing());
    }
}
