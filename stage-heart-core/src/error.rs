//! Error types for the library boundary.
//!
//! Only failures the caller has to act on live here. A frame without a
//! detectable pitch is not an error; the estimator reports it as `None`.

use std::path::PathBuf;

use thiserror::Error;

/// Reasons live capture cannot start.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The host has no default input device
    #[error("No input device available")]
    NoInputDevice,

    /// The device offers no mono/multi-channel f32 input configuration
    #[error("No suitable f32 input format found")]
    NoSupportedFormat,

    #[error("Failed to query input device: {0}")]
    DeviceName(#[from] cpal::DeviceNameError),

    #[error("Failed to query input configurations: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    /// Covers permission denial on platforms that report it when the stream is built
    #[error("Failed to open input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Failed to start input stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    /// The capture thread exited before reporting whether capture started
    #[error("Capture thread terminated during startup")]
    WorkerLost,
}

/// Errors raised while loading, saving or validating a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unknown detection range preset: {0}")]
    UnknownPreset(String),
}
