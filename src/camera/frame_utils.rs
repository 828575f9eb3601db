//! Frame cropping, resampling and transformation utilities.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageResult};

use super::types::{Frame, FrameFormat};

/// Source region selected by [`crop_rect`], in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Compute the largest centered region of a `src_w` x `src_h` frame that has
/// the aspect ratio of `target_w` x `target_h`.
///
/// A source that is relatively wider than the target keeps its full height and
/// is cropped left and right; otherwise it keeps its full width and is cropped
/// top and bottom.
///
/// Returns `None` when any dimension is zero; the caller should skip the frame.
pub fn crop_rect(src_w: u32, src_h: u32, target_w: u32, target_h: u32) -> Option<CropRect> {
    if src_w == 0 || src_h == 0 || target_w == 0 || target_h == 0 {
        return None;
    }

    let (src_w, src_h) = (src_w as f64, src_h as f64);
    let source_aspect = src_w / src_h;
    let target_aspect = target_w as f64 / target_h as f64;

    if source_aspect > target_aspect {
        let w = src_h * target_aspect;
        Some(CropRect {
            x: (src_w - w) / 2.0,
            y: 0.0,
            w,
            h: src_h,
        })
    } else {
        let h = src_w / target_aspect;
        Some(CropRect {
            x: 0.0,
            y: (src_h - h) / 2.0,
            w: src_w,
            h,
        })
    }
}

/// Resample the `rect` region of `frame` into a new `target_w` x `target_h`
/// frame of the same pixel format.
///
/// Each output pixel is the average of the source pixels its cell covers.
/// When upscaling a cell can cover less than one source pixel; the nearest
/// source pixel is used instead.
pub fn resample(frame: &Frame, rect: CropRect, target_w: u32, target_h: u32) -> Frame {
    let bpp = frame.bytes_per_pixel();
    let mut data = Vec::with_capacity(target_w as usize * target_h as usize * bpp);

    let cell_w = rect.w / target_w as f64;
    let cell_h = rect.h / target_h as f64;
    let max_x = frame.width.saturating_sub(1);
    let max_y = frame.height.saturating_sub(1);

    let mut sums = vec![0u32; bpp];

    for ty in 0..target_h {
        let start_y = ((rect.y + ty as f64 * cell_h) as u32).min(max_y);
        let end_y = ((rect.y + (ty + 1) as f64 * cell_h) as u32)
            .max(start_y + 1)
            .min(frame.height);

        for tx in 0..target_w {
            let start_x = ((rect.x + tx as f64 * cell_w) as u32).min(max_x);
            let end_x = ((rect.x + (tx + 1) as f64 * cell_w) as u32)
                .max(start_x + 1)
                .min(frame.width);

            sums.iter_mut().for_each(|s| *s = 0);
            let mut count = 0u32;

            for py in start_y..end_y {
                for px in start_x..end_x {
                    let idx = (py as usize * frame.width as usize + px as usize) * bpp;
                    if idx + bpp <= frame.data.len() {
                        for (c, sum) in sums.iter_mut().enumerate() {
                            *sum += frame.data[idx + c] as u32;
                        }
                        count += 1;
                    }
                }
            }

            for sum in &sums {
                data.push(if count > 0 { (sum / count) as u8 } else { 0 });
            }
        }
    }

    Frame {
        data,
        width: target_w,
        height: target_h,
        format: frame.format,
        timestamp: frame.timestamp,
    }
}

/// Center-crop `frame` to the target aspect ratio and resample it to
/// `target_w` x `target_h`.
///
/// Returns `None` for degenerate (zero-dimension) input.
pub fn center_crop(frame: &Frame, target_w: u32, target_h: u32) -> Option<Frame> {
    let rect = crop_rect(frame.width, frame.height, target_w, target_h)?;
    Some(resample(frame, rect, target_w, target_h))
}

/// Mirror a frame horizontally (flip left-right) for selfie mode.
pub fn mirror_horizontal(frame: &mut Frame) {
    let width = frame.width as usize;
    let height = frame.height as usize;
    let bpp = frame.bytes_per_pixel();

    for y in 0..height {
        let row_start = y * width * bpp;
        let row = &mut frame.data[row_start..row_start + width * bpp];

        for x in 0..width / 2 {
            let left = x * bpp;
            let right = (width - 1 - x) * bpp;
            for i in 0..bpp {
                row.swap(left + i, right + i);
            }
        }
    }
}

/// Encode a frame as PNG.
pub fn encode_png(frame: &Frame) -> ImageResult<Vec<u8>> {
    let color = match frame.format {
        FrameFormat::Rgb => ExtendedColorType::Rgb8,
        FrameFormat::Rgba => ExtendedColorType::Rgba8,
    };

    let mut out = Vec::new();
    PngEncoder::new(&mut out).write_image(&frame.data, frame.width, frame.height, color)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_crop_rect_wide_source_is_horizontally_centered() {
        let rect = crop_rect(640, 480, 128, 112).unwrap();
        assert!((rect.w / rect.h - 128.0 / 112.0).abs() < EPS);
        assert!((rect.x - (640.0 - rect.w) / 2.0).abs() < EPS);
        assert_eq!(rect.y, 0.0);
        assert_eq!(rect.h, 480.0);
    }

    #[test]
    fn test_crop_rect_tall_source_is_vertically_centered() {
        // Portrait phone camera
        let rect = crop_rect(480, 640, 128, 112).unwrap();
        assert_eq!(rect.x, 0.0);
        assert_eq!(rect.w, 480.0);
        assert!((rect.h - 420.0).abs() < EPS);
        assert!((rect.y - 110.0).abs() < EPS);
    }

    #[test]
    fn test_crop_rect_matching_aspect_is_full_frame() {
        let rect = crop_rect(256, 224, 128, 112).unwrap();
        assert_eq!(rect, CropRect { x: 0.0, y: 0.0, w: 256.0, h: 224.0 });
    }

    #[test]
    fn test_crop_rect_degenerate() {
        assert!(crop_rect(0, 480, 128, 112).is_none());
        assert!(crop_rect(640, 0, 128, 112).is_none());
        assert!(crop_rect(640, 480, 0, 112).is_none());
    }

    #[test]
    fn test_resample_averages_cells() {
        // 4x2 frame, left half black, right half white
        let mut data = Vec::new();
        for _ in 0..2 {
            data.extend_from_slice(&[0, 0, 0, 0, 0, 0, 255, 255, 255, 255, 255, 255]);
        }
        let frame = Frame::rgb(data, 4, 2);
        let rect = CropRect { x: 0.0, y: 0.0, w: 4.0, h: 2.0 };
        let out = resample(&frame, rect, 2, 1);
        assert_eq!(out.width, 2);
        assert_eq!(out.height, 1);
        assert_eq!(out.data, vec![0, 0, 0, 255, 255, 255]);
    }

    #[test]
    fn test_resample_upscales_with_nearest_pixel() {
        let frame = Frame::rgb(vec![10, 20, 30], 1, 1);
        let rect = CropRect { x: 0.0, y: 0.0, w: 1.0, h: 1.0 };
        let out = resample(&frame, rect, 3, 2);
        assert_eq!(out.data.len(), 3 * 2 * 3);
        assert!(out.data.chunks_exact(3).all(|p| p == [10, 20, 30]));
    }

    #[test]
    fn test_center_crop_output_size() {
        let frame = Frame::rgb(vec![128; 640 * 480 * 3], 640, 480);
        let out = center_crop(&frame, 128, 112).unwrap();
        assert_eq!((out.width, out.height), (128, 112));
        assert_eq!(out.data.len(), 128 * 112 * 3);
        assert!(out.data.iter().all(|&v| v == 128));
    }

    #[test]
    fn test_center_crop_discards_side_bands() {
        // 8x2 source: outer columns red, inner 2 columns (after crop) green.
        // Crop to 1x1 averages the middle 2 columns.
        let mut data = Vec::new();
        for _ in 0..2 {
            for x in 0..8 {
                if x == 3 || x == 4 {
                    data.extend_from_slice(&[0, 255, 0]);
                } else {
                    data.extend_from_slice(&[255, 0, 0]);
                }
            }
        }
        let frame = Frame::rgb(data, 8, 2);
        let out = center_crop(&frame, 1, 1).unwrap();
        assert_eq!(out.data, vec![0, 255, 0]);
    }

    #[test]
    fn test_mirror_horizontal_2x1() {
        let mut frame = Frame::rgb(vec![1, 2, 3, 4, 5, 6], 2, 1);
        mirror_horizontal(&mut frame);
        assert_eq!(frame.data, vec![4, 5, 6, 1, 2, 3]);
    }

    #[test]
    fn test_mirror_horizontal_3x2() {
        let mut frame = Frame::rgb(
            vec![
                1, 1, 1, 2, 2, 2, 3, 3, 3, // Row 0: A, B, C
                4, 4, 4, 5, 5, 5, 6, 6, 6, // Row 1: D, E, F
            ],
            3,
            2,
        );
        mirror_horizontal(&mut frame);
        assert_eq!(
            frame.data,
            vec![
                3, 3, 3, 2, 2, 2, 1, 1, 1, // Row 0: C, B, A
                6, 6, 6, 5, 5, 5, 4, 4, 4, // Row 1: F, E, D
            ]
        );
    }

    #[test]
    fn test_encode_png_decodes_back() {
        let frame = Frame::rgb(vec![0, 0, 0, 255, 255, 255], 2, 1);
        let png = encode_png(&frame).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (2, 1));
        assert_eq!(decoded.into_raw(), frame.data);
    }
}
