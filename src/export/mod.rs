//! Offline rendering of songs to audio files
//!
//! # Example
//!
//! ```no_run
//! use saa1099::export::{export_to_wav_with_config, ExportConfig};
//! use saa1099::{load_document, Player, PlayerConfig, Song};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let doc = load_document("song.json")?;
//! let song = Song::from_document(&doc);
//! let mut player = Player::new(song, PlayerConfig::default())?;
//!
//! let config = ExportConfig::default().max_seconds(90.0).fade_out(2.0);
//! export_to_wav_with_config(&mut player, "song.wav", config)?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "export-wav")]
mod wav;
#[cfg(feature = "export-wav")]
pub use wav::*;

/// Export configuration options
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    /// Scale the render down when it would clip
    pub normalize: bool,
    /// Fade out duration in seconds (0 = no fade)
    pub fade_out_duration: f32,
    /// Stop after this many seconds even if the song has not ended
    pub max_seconds: Option<f64>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            normalize: true,
            fade_out_duration: 0.0,
            max_seconds: None,
        }
    }
}

impl ExportConfig {
    /// Enable normalization to prevent clipping
    pub fn normalize(mut self, enable: bool) -> Self {
        self.normalize = enable;
        self
    }

    /// Add fade out at the end
    pub fn fade_out(mut self, duration_seconds: f32) -> Self {
        self.fade_out_duration = duration_seconds;
        self
    }

    /// Cap the render length
    pub fn max_seconds(mut self, seconds: f64) -> Self {
        self.max_seconds = Some(seconds);
        self
    }
}

/// What an export produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportSummary {
    /// Stereo frames written
    pub frames: usize,
    /// Sequencer ticks rendered
    pub ticks: u64,
    /// Host sample rate
    pub sample_rate: u32,
}

impl ExportSummary {
    /// Rendered length in seconds
    pub fn seconds(&self) -> f64 {
        self.frames as f64 / f64::from(self.sample_rate.max(1))
    }
}

/// Scale interleaved samples so the peak stays below 0.95
#[cfg_attr(not(feature = "export-wav"), allow(dead_code))]
fn normalize_samples(samples: &mut [f32]) {
    let peak = samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()));
    if peak > 0.95 {
        let scale = 0.95 / peak;
        for sample in samples.iter_mut() {
            *sample *= scale;
        }
    }
}

/// Linear fade over the last `fade_duration` seconds of interleaved stereo
#[cfg_attr(not(feature = "export-wav"), allow(dead_code))]
fn apply_fade_out(samples: &mut [f32], fade_duration: f32, sample_rate: u32) {
    if fade_duration <= 0.0 || samples.is_empty() {
        return;
    }

    let fade_frames = ((fade_duration * sample_rate as f32) as usize).max(1);
    let frames = samples.len() / 2;
    let start_fade = frames.saturating_sub(fade_frames);

    for (i, frame) in samples.chunks_exact_mut(2).enumerate().skip(start_fade) {
        let factor = 1.0 - (i - start_fade) as f32 / fade_frames as f32;
        frame[0] *= factor;
        frame[1] *= factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize_samples() {
        let mut samples = vec![0.5, 1.5, -1.9, 0.8];
        normalize_samples(&mut samples);
        let peak = samples.iter().fold(0.0f32, |p, s| p.max(s.abs()));
        assert_relative_eq!(peak, 0.95, epsilon = 1e-6);

        let mut quiet = vec![0.1, -0.2];
        normalize_samples(&mut quiet);
        assert_eq!(quiet, vec![0.1, -0.2]);
    }

    #[test]
    fn test_fade_out_keeps_channels_paired() {
        let mut samples = vec![1.0; 2000];
        apply_fade_out(&mut samples, 0.01, 44_100);
        assert_eq!(samples[0], 1.0);
        assert_eq!(samples[1998], samples[1999]);
        assert!(samples[1999] < 0.01);
    }

    #[test]
    fn test_export_config_builder() {
        let config = ExportConfig::default()
            .normalize(false)
            .fade_out(2.0)
            .max_seconds(30.0);
        assert!(!config.normalize);
        assert_eq!(config.fade_out_duration, 2.0);
        assert_eq!(config.max_seconds, Some(30.0));
    }
}
