//! Frame Capture
//!
//! Video frame type and the `FrameSource` seam the detection loop pulls
//! frames from. Cameras are external collaborators behind the trait; an
//! image-directory source is provided for offline and recorded runs.

pub mod frame;
pub mod source;

pub use frame::VideoFrame;
pub use source::{FrameSource, ImageDirSource};

use thiserror::Error;

/// Capture error types
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Device gone; fatal to the capture loop
    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// No more frames; the session terminates cleanly
    #[error("Frame stream ended")]
    StreamEnded,

    /// A single frame failed to decode; the loop skips it
    #[error("Frame decode failed: {0}")]
    Decode(String),
}

impl CaptureError {
    /// Whether the error terminates the capture loop
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CaptureError::DeviceUnavailable(_) | CaptureError::StreamEnded
        )
    }
}
