//! Channel mixing utilities (multi-channel to mono conversion)

use crate::error::AnalysisError;

/// Channel mixing mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChannelMixMode {
    /// Average of all channels
    #[default]
    Average,
    /// Keep the channel with the highest RMS (a close mic on one side of a stereo take)
    Dominant,
}

/// Convert interleaved multi-channel samples to mono
///
/// # Arguments
///
/// * `interleaved` - Samples ordered frame by frame (`c0 c1 .. c0 c1 ..`)
/// * `channels` - Channel count
/// * `mode` - Mixing mode
///
/// # Returns
///
/// One sample per frame. A trailing partial frame is dropped.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if `channels` is zero.
pub fn downmix_interleaved(
    interleaved: &[f32],
    channels: usize,
    mode: ChannelMixMode,
) -> Result<Vec<f32>, AnalysisError> {
    if channels == 0 {
        return Err(AnalysisError::InvalidInput("Channel count must be > 0".to_string()));
    }
    if channels == 1 {
        return Ok(interleaved.to_vec());
    }
    log::debug!(
        "Down-mixing {} frames of {} channels using {:?}",
        interleaved.len() / channels,
        channels,
        mode
    );

    let frames = interleaved.chunks_exact(channels);
    let mono = match mode {
        ChannelMixMode::Average => frames
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect(),
        ChannelMixMode::Dominant => {
            let mut energy = vec![0.0f64; channels];
            for frame in interleaved.chunks_exact(channels) {
                for (e, &s) in energy.iter_mut().zip(frame) {
                    *e += (s as f64) * (s as f64);
                }
            }
            let loudest = energy
                .iter()
                .enumerate()
                .fold(0, |best, (ch, &e)| if e > energy[best] { ch } else { best });
            frames.map(|frame| frame[loudest]).collect()
        }
    };
    Ok(mono)
}
