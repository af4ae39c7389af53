//! Frame sources

use crate::frame::VideoFrame;
use crate::CaptureError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Anything the detection loop can pull frames from.
///
/// A live camera sits behind this trait as an external collaborator;
/// `next_frame` blocks until a frame is available or the stream is over.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<VideoFrame, CaptureError>;
}

/// Ordered directory of still images, decoded one per call.
///
/// Used for offline analysis of recorded sessions. Frame timestamps are
/// synthesized from the configured frame rate; the stream ends with
/// `StreamEnded` after the last file.
#[derive(Debug)]
pub struct ImageDirSource {
    files: Vec<PathBuf>,
    next_index: usize,
    frame_interval_ns: u64,
}

impl ImageDirSource {
    pub fn new(dir: &Path, fps: u32) -> Result<Self, CaptureError> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| CaptureError::DeviceUnavailable(format!("{}: {e}", dir.display())))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(CaptureError::DeviceUnavailable(format!(
                "no frames in {}",
                dir.display()
            )));
        }

        info!(dir = %dir.display(), frames = files.len(), "opened image directory source");
        Ok(Self {
            files,
            next_index: 0,
            frame_interval_ns: 1_000_000_000 / fps.max(1) as u64,
        })
    }
}

impl FrameSource for ImageDirSource {
    fn next_frame(&mut self) -> Result<VideoFrame, CaptureError> {
        let Some(path) = self.files.get(self.next_index) else {
            return Err(CaptureError::StreamEnded);
        };
        let sequence = self.next_index as u32;
        self.next_index += 1;

        let img = image::open(path)
            .map_err(|e| CaptureError::Decode(format!("{}: {e}", path.display())))?
            .to_rgb8();

        debug!(path = %path.display(), sequence, "decoded frame");
        Ok(VideoFrame::from_rgb_image(
            img,
            sequence as u64 * self.frame_interval_ns,
            sequence,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_directory_is_unavailable() {
        let err = ImageDirSource::new(Path::new("/nonexistent/frames"), 30).unwrap_err();
        assert!(matches!(err, CaptureError::DeviceUnavailable(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_stream_ends_after_last_file() {
        let dir = std::env::temp_dir().join("capture-src-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("frame-000.png");
        image::RgbImage::new(4, 4).save(&path).unwrap();

        let mut source = ImageDirSource::new(&dir, 30).unwrap();
        let frame = source.next_frame().unwrap();
        assert_eq!(frame.width, 4);
        assert_eq!(frame.sequence, 0);

        assert!(matches!(
            source.next_frame().unwrap_err(),
            CaptureError::StreamEnded
        ));

        std::fs::remove_file(&path).ok();
    }
}
