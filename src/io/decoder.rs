//! Audio decoding using Symphonia
//!
//! Offline tools decode reference takes and recordings into mono f32 PCM.
//! There is no resampler: files must already be at the rate the analysis
//! expects, and [`decode_audio_at`] rejects anything else.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::AnalysisError;
use crate::preprocessing::channel_mixer::{downmix_interleaved, ChannelMixMode};

/// Decoded mono audio
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono samples in [-1, 1]
    pub samples: Vec<f32>,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Channel count of the source before down-mixing
    pub channels: usize,
}

impl DecodedAudio {
    /// Duration in seconds
    pub fn duration(&self) -> f32 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.samples.len() as f32 / self.sample_rate as f32
        }
    }
}

/// Decode an audio file to mono PCM
///
/// # Arguments
///
/// * `path` - Path to audio file (format guessed from content and extension)
/// * `mode` - How to fold multiple channels into one
///
/// # Errors
///
/// Returns `AnalysisError::DecodingError` if the file cannot be opened, has no
/// decodable audio track or reports no sample rate.
pub fn decode_audio(path: impl AsRef<Path>, mode: ChannelMixMode) -> Result<DecodedAudio, AnalysisError> {
    let path = path.as_ref();
    log::debug!("Decoding audio file: {}", path.display());

    let src = File::open(path)
        .map_err(|e| AnalysisError::DecodingError(format!("{}: {}", path.display(), e)))?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| {
            AnalysisError::DecodingError(format!("{}: no supported audio track", path.display()))
        })?;
    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.ok_or_else(|| {
        AnalysisError::DecodingError(format!("{}: unknown sample rate", path.display()))
    })?;
    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut channels = track.codec_params.channels.map_or(0, |c| c.count());
    let mut buffer: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                channels = spec.channels.count();
                let needed = decoded.capacity() * channels;
                if buffer.as_ref().map_or(true, |buf| buf.capacity() < needed) {
                    buffer = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                }
                if let Some(buf) = buffer.as_mut() {
                    buf.copy_interleaved_ref(decoded);
                    interleaved.extend_from_slice(buf.samples());
                }
            }
            Err(SymphoniaError::DecodeError(msg)) => {
                log::warn!("{}: skipping corrupt packet ({})", path.display(), msg);
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let channels = channels.max(1);
    let samples = downmix_interleaved(&interleaved, channels, mode)?;
    log::debug!(
        "Decoded {}: {} samples at {} Hz from {} channel(s)",
        path.display(),
        samples.len(),
        sample_rate,
        channels
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

/// Decode an audio file and require a specific sample rate
///
/// # Errors
///
/// Everything [`decode_audio`] reports, plus `AnalysisError::InvalidInput`
/// when the file's rate differs from `target_sample_rate`.
pub fn decode_audio_at(path: impl AsRef<Path>, target_sample_rate: u32) -> Result<DecodedAudio, AnalysisError> {
    let path = path.as_ref();
    let audio = decode_audio(path, ChannelMixMode::Average)?;
    if audio.sample_rate != target_sample_rate {
        return Err(AnalysisError::InvalidInput(format!(
            "{} is sampled at {} Hz, expected {} Hz (resample it first)",
            path.display(),
            audio.sample_rate,
            target_sample_rate
        )));
    }
    Ok(audio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_decoding_error() {
        let err = decode_audio("/nonexistent/take.wav", ChannelMixMode::Average).unwrap_err();
        assert!(matches!(err, AnalysisError::DecodingError(_)), "{:?}", err);
    }

    #[test]
    fn test_duration() {
        let audio = DecodedAudio {
            samples: vec![0.0; 8000],
            sample_rate: 16000,
            channels: 1,
        };
        assert_eq!(audio.duration(), 0.5);
    }
}
