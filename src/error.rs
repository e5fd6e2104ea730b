//! Error types shared by the detector, the capture pipeline and the face link.

use thiserror::Error;

use crate::landmarks::HandLandmark;

/// Problems found while reading landmarks out of a [`crate::landmarks::HandObservation`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LandmarkError {
    #[error("hand has {found} landmarks, expected {expected}")]
    Incomplete { found: usize, expected: usize },
    #[error("landmark {0:?} has a non-finite coordinate")]
    NonFinite(HandLandmark),
}

/// Failures reported by a [`crate::pipeline::VideoSource`].
///
/// `Unavailable` ends the session; `Read` is transient and the capture loop
/// backs off briefly before trying again.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("video source unavailable: {0}")]
    Unavailable(String),
    #[error("frame read failed: {0}")]
    Read(String),
}

/// Failures reported by a [`crate::pipeline::HandPoseEstimator`].
#[derive(Debug, Error)]
#[error("hand pose estimation failed: {0}")]
pub struct EstimatorError(pub String);

/// Failures talking to the face controller over serial.
#[derive(Debug, Error)]
pub enum FaceError {
    #[error("failed to open serial port {path}")]
    Open {
        path: String,
        #[source]
        source: serialport::Error,
    },
    #[error("failed to write to face controller")]
    Write(#[from] std::io::Error),
}
