//! WAV file export

use std::path::Path;

use tracing::{debug, info};

use super::{apply_fade_out, normalize_samples, ExportConfig, ExportSummary};
use crate::chip::Saa1099Backend;
use crate::player::Player;
use crate::{Result, Saa1099Error};

/// Ticks rendered past the song length before giving up on a song end
const END_MARGIN_TICKS: u64 = 64;

/// Render a song to a 16-bit stereo WAV file
///
/// Plays from the start with looping off until the song ends.
pub fn export_to_wav<B, P>(player: &mut Player<B>, output_path: P) -> Result<ExportSummary>
where
    B: Saa1099Backend,
    P: AsRef<Path>,
{
    export_to_wav_with_config(player, output_path, ExportConfig::default())
}

/// Render a song to a 16-bit stereo WAV file with custom options
pub fn export_to_wav_with_config<B, P>(
    player: &mut Player<B>,
    output_path: P,
    config: ExportConfig,
) -> Result<ExportSummary>
where
    B: Saa1099Backend,
    P: AsRef<Path>,
{
    let mut samples = render_song(player, &config);
    let sample_rate = player.config().sample_rate;
    let summary = ExportSummary {
        frames: samples.len() / 2,
        ticks: player.elapsed_ticks(),
        sample_rate,
    };

    if config.normalize {
        normalize_samples(&mut samples);
    }
    if config.fade_out_duration > 0.0 {
        apply_fade_out(&mut samples, config.fade_out_duration, sample_rate);
    }

    info!(
        path = %output_path.as_ref().display(),
        seconds = summary.seconds(),
        "writing WAV"
    );
    write_wav_file(output_path.as_ref(), &samples, sample_rate)?;
    Ok(summary)
}

/// Play the song once from the start and collect interleaved stereo
///
/// The player's loop mode is restored afterwards; playback is left stopped.
pub fn render_song<B: Saa1099Backend>(player: &mut Player<B>, config: &ExportConfig) -> Vec<f32> {
    let sample_rate = player.config().sample_rate;
    let chunk = player.config().samples_per_tick().max(1) as usize;
    let song_ticks = player.song().total_ticks() + END_MARGIN_TICKS;
    let cap_frames = match config.max_seconds {
        Some(seconds) => (seconds.max(0.0) * f64::from(sample_rate)) as usize,
        None => (song_ticks as usize + 1) * (chunk + 1),
    };

    let loop_mode = player.config().loop_mode;
    player.set_loop_mode(false);
    player.play_position_from_line(true, true, true);

    let mut samples = Vec::with_capacity(cap_frames.min(sample_rate as usize * 600) * 2);
    let mut buffer = vec![0.0f32; chunk * 2];
    let mut frames = 0usize;
    while player.is_playing() && frames < cap_frames {
        let take = chunk.min(cap_frames - frames);
        let out = &mut buffer[..take * 2];
        player.fill_interleaved(out);
        samples.extend_from_slice(out);
        frames += take;
    }
    debug!(frames, ticks = player.elapsed_ticks(), "render finished");

    player.stop(None);
    player.set_loop_mode(loop_mode);
    samples
}

/// Write interleaved stereo samples as 16-bit PCM
fn write_wav_file(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| Saa1099Error::Export(format!("Failed to create WAV file: {}", e)))?;

    for &sample in samples {
        let sample_i16 = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(sample_i16)
            .map_err(|e| Saa1099Error::Export(format!("Failed to write sample: {}", e)))?;
    }

    writer
        .finalize()
        .map_err(|e| Saa1099Error::Export(format!("Failed to finalize WAV file: {}", e)))?;

    Ok(())
}
