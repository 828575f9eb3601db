//! Camera capture module: frame sources, cropping, and the capture loop.
//!
//! - Frame sources via [`FrameSource`] ([`StillImageSource`], [`TestPatternSource`])
//! - Center-crop and resampling via [`crop_rect`] and [`center_crop`]
//! - The per-refresh processing loop via [`CaptureLoop`]

mod capture;
mod capture_loop;
mod frame_utils;
mod source;
mod types;

pub use capture::CaptureLoop;
pub use capture_loop::{process_frame, refresh_interval};
pub use frame_utils::{center_crop, crop_rect, encode_png, mirror_horizontal, resample, CropRect};
pub use source::{FrameSource, StillImageSource, TestPatternSource};
pub use types::{
    CameraError, CaptureSettings, Frame, FrameFormat, LoopState, ProcessedFrame, TARGET_HEIGHT,
    TARGET_WIDTH,
};
