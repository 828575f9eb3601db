//! Per-frame processing task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::frame_utils::{center_crop, mirror_horizontal};
use super::source::FrameSource;
use super::types::{CaptureSettings, ProcessedFrame, TARGET_HEIGHT, TARGET_WIDTH};
use crate::palette::{quantize_frame, PaletteMode};

/// Interval between loop iterations for a display refresh rate.
pub fn refresh_interval(refresh_hz: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(refresh_hz.max(1)))
}

/// Pull one frame from `source` and run it through crop and quantize.
///
/// Returns `None` when the source is not ready (zero dimensions) or has no
/// decodable frame; the caller skips the cycle.
pub fn process_frame(
    source: &mut dyn FrameSource,
    mode: PaletteMode,
    mirror: bool,
) -> Option<ProcessedFrame> {
    let (width, height) = source.dimensions();
    if width == 0 || height == 0 {
        return None;
    }

    let frame = source.read_frame()?;
    let mut frame = center_crop(&frame, TARGET_WIDTH, TARGET_HEIGHT)?;

    if mirror {
        mirror_horizontal(&mut frame);
    }
    quantize_frame(&mut frame, mode);

    Some(ProcessedFrame { frame, mode })
}

/// Run the capture loop until `stop` is set.
///
/// One iteration per display refresh. Each processed frame replaces the
/// previous one in `buffer`; nothing is queued. The stop flag is checked at
/// the top of every iteration, and the source is released on exit.
pub async fn run_capture_loop(
    mut source: Box<dyn FrameSource>,
    settings: CaptureSettings,
    buffer: Arc<Mutex<Option<ProcessedFrame>>>,
    mode: Arc<Mutex<PaletteMode>>,
    stop: Arc<AtomicBool>,
) {
    let mut ticker = tokio::time::interval(refresh_interval(settings.refresh_hz));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        if stop.load(Ordering::Relaxed) {
            break;
        }

        let current_mode = match mode.lock() {
            Ok(m) => *m,
            Err(_) => settings.mode,
        };

        if let Some(processed) = process_frame(source.as_mut(), current_mode, settings.mirror) {
            if let Ok(mut buf) = buffer.lock() {
                *buf = Some(processed);
            }
        }
    }

    source.release();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::source::{StillImageSource, TestPatternSource};
    use crate::camera::Frame;
    use crate::palette::TWO_BIT_PALETTE;

    #[test]
    fn test_refresh_interval() {
        assert_eq!(refresh_interval(60), Duration::from_micros(16_666));
        assert_eq!(refresh_interval(1), Duration::from_secs(1));
        // Zero is clamped rather than dividing by zero
        assert_eq!(refresh_interval(0), Duration::from_secs(1));
    }

    #[test]
    fn test_process_frame_output_shape() {
        let mut source = TestPatternSource::new(640, 480);
        let processed = process_frame(&mut source, PaletteMode::TwoBit, false).unwrap();
        assert_eq!(processed.frame.width, TARGET_WIDTH);
        assert_eq!(processed.frame.height, TARGET_HEIGHT);
        assert_eq!(processed.mode, PaletteMode::TwoBit);
        for px in processed.frame.data.chunks_exact(3) {
            assert!(TWO_BIT_PALETTE.iter().any(|c| c[..] == *px));
        }
    }

    #[test]
    fn test_process_frame_skips_unready_source() {
        let mut source = TestPatternSource::new(0, 480);
        assert!(process_frame(&mut source, PaletteMode::TwoBit, false).is_none());
    }

    #[test]
    fn test_process_frame_none_keeps_colors() {
        let frame = Frame::rgb([10u8, 200, 30].repeat(256 * 224), 256, 224);
        let mut source = StillImageSource::from_frame(frame);
        let processed = process_frame(&mut source, PaletteMode::None, false).unwrap();
        assert!(processed.frame.data.chunks_exact(3).all(|p| p == [10, 200, 30]));
    }

    #[test]
    fn test_process_frame_mirror() {
        let mut source = TestPatternSource::new(256, 224);
        let plain = process_frame(&mut source, PaletteMode::None, false).unwrap();
        let mirrored = process_frame(&mut source, PaletteMode::None, true).unwrap();
        let row = (TARGET_WIDTH * 3) as usize;
        // First pixel of the mirrored row is the last pixel of the plain row
        assert_eq!(mirrored.frame.data[..3], plain.frame.data[row - 3..row]);
    }
}
