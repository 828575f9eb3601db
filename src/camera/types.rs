//! Camera types and data structures.

use std::fmt;
use std::time::Instant;

use crate::palette::PaletteMode;
use crate::store::StoreError;

/// Width of the processed frame, in pixels.
pub const TARGET_WIDTH: u32 = 128;

/// Height of the processed frame, in pixels.
pub const TARGET_HEIGHT: u32 = 112;

/// Pixel format of a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    /// RGB format (3 bytes per pixel)
    Rgb,
    /// RGBA format (4 bytes per pixel, alpha last)
    Rgba,
}

/// A captured camera frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw pixel data, row-major
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel format
    pub format: FrameFormat,
    /// Timestamp when frame was captured
    pub timestamp: Instant,
}

impl Frame {
    /// Create an RGB frame from raw pixel data.
    pub fn rgb(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            format: FrameFormat::Rgb,
            timestamp: Instant::now(),
        }
    }

    /// Get the number of bytes per pixel.
    pub fn bytes_per_pixel(&self) -> usize {
        match self.format {
            FrameFormat::Rgb => 3,
            FrameFormat::Rgba => 4,
        }
    }

    /// A frame with a zero dimension carries no pixels and must be skipped.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A frame that has been cropped, resampled and quantized.
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    /// Always `TARGET_WIDTH` x `TARGET_HEIGHT`
    pub frame: Frame,
    /// Palette the frame was quantized with
    pub mode: PaletteMode,
}

/// Lifecycle state of the capture loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// No source attached
    Idle,
    /// A source is attached and frames are being processed
    Active,
}

/// Settings for the capture loop.
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    /// Palette applied to each processed frame
    pub mode: PaletteMode,
    /// Mirror horizontally (selfie mode)
    pub mirror: bool,
    /// Display refresh rate driving the loop
    pub refresh_hz: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            mode: PaletteMode::TwoBit,
            mirror: false,
            refresh_hz: 60,
        }
    }
}

/// Errors that can occur during camera operations.
#[derive(Debug)]
pub enum CameraError {
    /// No usable frame source
    SourceUnavailable(String),
    /// Capture loop is already running
    AlreadyRunning,
    /// Capture requested before any frame was processed
    NoFrame,
    /// Failed to encode the current frame
    Encode(String),
    /// Persisting the captured photo failed
    Store(StoreError),
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::SourceUnavailable(msg) => write!(f, "Frame source unavailable: {}", msg),
            CameraError::AlreadyRunning => write!(f, "Capture loop is already running"),
            CameraError::NoFrame => write!(f, "No processed frame available yet"),
            CameraError::Encode(msg) => write!(f, "Failed to encode frame: {}", msg),
            CameraError::Store(e) => write!(f, "Failed to save photo: {}", e),
        }
    }
}

impl std::error::Error for CameraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CameraError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for CameraError {
    fn from(err: StoreError) -> Self {
        CameraError::Store(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_dimensions() {
        assert_eq!(TARGET_WIDTH, 128);
        assert_eq!(TARGET_HEIGHT, 112);
    }

    #[test]
    fn test_capture_settings_default() {
        let settings = CaptureSettings::default();
        assert_eq!(settings.mode, PaletteMode::TwoBit);
        assert!(!settings.mirror);
        assert_eq!(settings.refresh_hz, 60);
    }

    #[test]
    fn test_camera_error_display() {
        assert_eq!(
            format!("{}", CameraError::SourceUnavailable("test".to_string())),
            "Frame source unavailable: test"
        );
        assert_eq!(
            format!("{}", CameraError::AlreadyRunning),
            "Capture loop is already running"
        );
        assert_eq!(
            format!("{}", CameraError::NoFrame),
            "No processed frame available yet"
        );
        assert!(format!("{}", CameraError::Store(StoreError::DuplicateId(7))).contains("7"));
    }

    #[test]
    fn test_frame_bytes_per_pixel() {
        let frame = Frame::rgb(vec![0; 6], 2, 1);
        assert_eq!(frame.bytes_per_pixel(), 3);

        let rgba = Frame {
            format: FrameFormat::Rgba,
            ..Frame::rgb(vec![0; 8], 2, 1)
        };
        assert_eq!(rgba.bytes_per_pixel(), 4);
    }

    #[test]
    fn test_frame_is_empty() {
        assert!(Frame::rgb(Vec::new(), 0, 480).is_empty());
        assert!(Frame::rgb(Vec::new(), 640, 0).is_empty());
        assert!(!Frame::rgb(vec![0; 3], 1, 1).is_empty());
    }
}
