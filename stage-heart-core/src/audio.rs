//! # Audio Capture Module
//!
//! This module handles real-time audio capture using CPAL (Cross-Platform Audio Library).
//! It opens the default input device, converts whatever it delivers to mono `f32`
//! and streams the samples, chunk by chunk, to the analysis pipeline.
//!
//! Failing to open the device is the one condition in this crate that is
//! reported as an error: the caller cannot start detection without it.

use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;
use tracing::{info, warn};

use crate::error::CaptureError;

/// Sample rate requested from the device when its range allows it.
pub const PREFERRED_SAMPLE_RATE: u32 = 48000;

/// An open, playing input stream.
///
/// Dropping the handle releases the device.
pub struct CaptureHandle {
    stream: cpal::Stream,
    pub sample_rate: u32,
}

impl CaptureHandle {
    /// Pauses the stream before it is dropped.
    pub fn stop(self) {
        if let Err(e) = self.stream.pause() {
            warn!("Error pausing input stream: {}", e);
        }
        drop(self.stream);
        info!("Audio capture stopped");
    }
}

/// Starts audio capture from the default input device.
///
/// # Arguments
/// * `sender` - Channel sender for mono sample chunks. Chunks are dropped
///   when the channel is full rather than blocking the audio callback.
///
/// # Returns
/// * `Ok(handle)` - The playing stream and its sample rate
/// * `Err(e)` - The device could not be opened
pub fn start_audio_capture(sender: Sender<Vec<f32>>) -> Result<CaptureHandle, CaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(CaptureError::NoInputDevice)?;

    info!("Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, PREFERRED_SAMPLE_RATE)
        .ok_or(CaptureError::NoSupportedFormat)?;

    let sample_rate = PREFERRED_SAMPLE_RATE.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(sample_rate));
    let channels = config.channels();
    let config: cpal::StreamConfig = config.into();

    info!("Selected sample rate: {} Hz, {} channel(s)", sample_rate, channels);

    let err_fn = |err| warn!("An error occurred on the audio stream: {}", err);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            // Send the chunk, ignoring errors if the channel is full.
            let _ = sender.try_send(downmix(data, channels));
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok(CaptureHandle {
        stream,
        sample_rate,
    })
}

/// Averages interleaved frames down to one channel.
pub fn downmix(data: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return data.to_vec();
    }
    data.chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Finds the best supported audio configuration for the target sample rate.
///
/// Only `f32` configurations are considered. Mono is preferred, then the
/// configuration whose rate range lies closest to `target_rate`.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let rate_distance = if target_rate < c.min_sample_rate().0 {
                c.min_sample_rate().0 - target_rate
            } else {
                target_rate.saturating_sub(c.max_sample_rate().0)
            };
            (c.channels() != 1, rate_distance)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_passes_through() {
        assert_eq!(downmix(&[0.1, 0.2, 0.3], 1), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn stereo_is_averaged() {
        assert_eq!(downmix(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2), vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn trailing_partial_frame_is_dropped() {
        assert_eq!(downmix(&[1.0, 1.0, 1.0], 2), vec![1.0]);
    }

    #[test]
    fn prefers_mono_then_closest_rate() {
        let range = |channels, min, max| {
            SupportedStreamConfigRange::new(
                channels,
                cpal::SampleRate(min),
                cpal::SampleRate(max),
                cpal::SupportedBufferSize::Unknown,
                cpal::SampleFormat::F32,
            )
        };
        let configs = vec![range(2, 48000, 48000), range(1, 8000, 16000), range(1, 44100, 44100)];
        let chosen = find_supported_config(configs, 48000).unwrap();
        assert_eq!(chosen.channels(), 1);
        assert_eq!(chosen.min_sample_rate().0, 44100);
    }

    #[test]
    fn integer_formats_are_skipped() {
        let configs = vec![SupportedStreamConfigRange::new(
            1,
            cpal::SampleRate(48000),
            cpal::SampleRate(48000),
            cpal::SupportedBufferSize::Unknown,
            cpal::SampleFormat::I16,
        )];
        assert!(find_supported_config(configs, 48000).is_none());
    }
}
