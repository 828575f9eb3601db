//! Frame sources the capture loop can attach to.

use std::path::{Path, PathBuf};
use std::time::Instant;

use super::types::{CameraError, Frame, FrameFormat};

/// A live source of video frames.
///
/// Real camera drivers live outside this crate; anything that can report its
/// current dimensions and hand over the latest frame can drive the loop.
pub trait FrameSource: Send {
    /// Current frame dimensions. A zero dimension means "not ready yet".
    fn dimensions(&self) -> (u32, u32);

    /// The latest decodable frame, or `None` if there is nothing new to show.
    fn read_frame(&mut self) -> Option<Frame>;

    /// Release the underlying device. Called once when the loop stops.
    fn release(&mut self) {}
}

/// Serves a single decoded image as if it were a live camera feed.
#[derive(Debug)]
pub struct StillImageSource {
    path: PathBuf,
    frame: Option<Frame>,
}

impl StillImageSource {
    /// Decode `path` into an RGB frame.
    ///
    /// # Errors
    /// * `CameraError::SourceUnavailable` - If the file cannot be read or decoded
    pub fn open(path: &Path) -> Result<Self, CameraError> {
        let image = image::open(path)
            .map_err(|e| CameraError::SourceUnavailable(format!("{}: {}", path.display(), e)))?
            .to_rgb8();
        let (width, height) = image.dimensions();

        log::info!("Opened still image source {} ({}x{})", path.display(), width, height);

        Ok(Self {
            path: path.to_path_buf(),
            frame: Some(Frame::rgb(image.into_raw(), width, height)),
        })
    }

    /// Wrap an already decoded frame.
    pub fn from_frame(frame: Frame) -> Self {
        Self {
            path: PathBuf::new(),
            frame: Some(frame),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSource for StillImageSource {
    fn dimensions(&self) -> (u32, u32) {
        self.frame.as_ref().map_or((0, 0), |f| (f.width, f.height))
    }

    fn read_frame(&mut self) -> Option<Frame> {
        let mut frame = self.frame.clone()?;
        frame.timestamp = Instant::now();
        Some(frame)
    }

    fn release(&mut self) {
        self.frame = None;
    }
}

/// Deterministic diagonal gradient, useful for demos and tests.
#[derive(Debug, Clone)]
pub struct TestPatternSource {
    width: u32,
    height: u32,
    released: bool,
}

impl TestPatternSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            released: false,
        }
    }

    /// Whether the loop has released this source.
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Default for TestPatternSource {
    fn default() -> Self {
        Self::new(640, 480)
    }
}

impl FrameSource for TestPatternSource {
    fn dimensions(&self) -> (u32, u32) {
        if self.released {
            (0, 0)
        } else {
            (self.width, self.height)
        }
    }

    fn read_frame(&mut self) -> Option<Frame> {
        let (width, height) = self.dimensions();
        if width == 0 || height == 0 {
            return None;
        }

        let span = (width + height).saturating_sub(2).max(1);
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                let v = ((x + y) * 255 / span) as u8;
                data.extend_from_slice(&[v, v, v]);
            }
        }

        Some(Frame {
            data,
            width,
            height,
            format: FrameFormat::Rgb,
            timestamp: Instant::now(),
        })
    }

    fn release(&mut self) {
        self.released = true;
    }
}
