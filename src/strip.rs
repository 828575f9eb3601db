//! Photostrip composition.
//!
//! A strip stacks 1 to 4 photos vertically on a white background, each in a
//! fixed-size slot separated by a fixed spacing. Photos are decoded by
//! independent tasks; the strip is only encoded and stored once every slot
//! has been drawn.

use std::sync::Arc;

use futures_util::future::join_all;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, ImageError, Rgb, RgbImage};
use thiserror::Error;

use crate::camera::crop_rect;
use crate::store::{now_millis, EntityStore, Photo, Strip, StoreError, MAX_STRIP_PHOTOS};

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Debug, Error)]
pub enum StripError {
    #[error("A strip needs 1 to {max} photos, got {0}", max = MAX_STRIP_PHOTOS)]
    InvalidSelection(usize),

    #[error("Strip layout needs a non-zero width and slot height, got {width}x{slot_height}")]
    InvalidLayout { width: u32, slot_height: u32 },

    #[error("Photo {0} not found")]
    PhotoNotFound(u64),

    #[error("Failed to decode photo {id}: {source}")]
    Decode {
        id: u64,
        #[source]
        source: ImageError,
    },

    #[error("Failed to encode strip: {0}")]
    Encode(#[source] ImageError),

    #[error("Decode task failed: {0}")]
    TaskFailed(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Strip geometry in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripLayout {
    pub width: u32,
    pub slot_height: u32,
    pub spacing: u32,
}

impl Default for StripLayout {
    fn default() -> Self {
        Self {
            width: 200,
            slot_height: 150,
            spacing: 10,
        }
    }
}

impl StripLayout {
    /// Total height for `photo_count` slots: `n * slot_height + (n + 1) * spacing`.
    pub fn height(&self, photo_count: usize) -> u32 {
        let n = photo_count as u32;
        n * self.slot_height + (n + 1) * self.spacing
    }

    /// Top-left corner of slot `index`.
    pub fn slot_origin(&self, index: usize) -> (u32, u32) {
        let index = index as u32;
        (0, self.spacing + index * (self.slot_height + self.spacing))
    }
}

/// Turns a stored photo back into pixels.
///
/// Called on the blocking thread pool, one call per photo, possibly several
/// at once.
pub trait PhotoDecoder: Send + Sync + 'static {
    fn decode(&self, photo: &Photo) -> Result<RgbImage, ImageError>;
}

/// Decodes the photo's PNG bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngDecoder;

impl PhotoDecoder for PngDecoder {
    fn decode(&self, photo: &Photo) -> Result<RgbImage, ImageError> {
        Ok(image::load_from_memory(&photo.pixels)?.to_rgb8())
    }
}

/// Crop `image` to the slot's aspect ratio, centered, and scale the crop to
/// exactly `slot_w` x `slot_h`.
///
/// A source wider than the slot loses its left and right edges; a taller one
/// loses its top and bottom. Only the cropped region is ever resampled.
pub fn render_slot(image: &RgbImage, slot_w: u32, slot_h: u32) -> RgbImage {
    let (src_w, src_h) = image.dimensions();
    let Some(rect) = crop_rect(src_w, src_h, slot_w, slot_h) else {
        return RgbImage::from_pixel(slot_w, slot_h, BACKGROUND);
    };

    let x = (rect.x.round() as u32).min(src_w - 1);
    let y = (rect.y.round() as u32).min(src_h - 1);
    let w = (rect.w.round() as u32).clamp(1, src_w - x);
    let h = (rect.h.round() as u32).clamp(1, src_h - y);

    let cropped = imageops::crop_imm(image, x, y, w, h).to_image();
    // Nearest keeps the palette colors intact
    imageops::resize(&cropped, slot_w, slot_h, FilterType::Nearest)
}

/// Composes photos into strips and stores them.
pub struct StripComposer<'a, D = PngDecoder> {
    store: &'a EntityStore,
    layout: StripLayout,
    decoder: Arc<D>,
}

impl<'a> StripComposer<'a, PngDecoder> {
    pub fn new(store: &'a EntityStore, layout: StripLayout) -> Self {
        Self::with_decoder(store, layout, PngDecoder)
    }
}

impl<'a, D: PhotoDecoder> StripComposer<'a, D> {
    pub fn with_decoder(store: &'a EntityStore, layout: StripLayout, decoder: D) -> Self {
        Self {
            store,
            layout,
            decoder: Arc::new(decoder),
        }
    }

    pub fn layout(&self) -> &StripLayout {
        &self.layout
    }

    /// Compose `photos` (in selection order) into a strip and store it.
    ///
    /// Each photo is decoded and scaled by its own blocking task. Slot `i`
    /// always shows `photos[i]`, whatever order the decodes finish in, and
    /// the strip's `source_photo_ids` keep the selection order.
    ///
    /// # Errors
    /// * `StripError::InvalidSelection` - If `photos` is empty or holds more than 4
    /// * `StripError::InvalidLayout` - If the layout has a zero width or slot height
    /// * `StripError::Decode` - If a photo's image cannot be decoded
    /// * `StripError::Store` - If the strip cannot be stored
    pub async fn compose(&self, photos: &[Photo]) -> Result<Strip, StripError> {
        let count = photos.len();
        if count == 0 || count > MAX_STRIP_PHOTOS {
            return Err(StripError::InvalidSelection(count));
        }

        let layout = self.layout;
        if layout.width == 0 || layout.slot_height == 0 {
            return Err(StripError::InvalidLayout {
                width: layout.width,
                slot_height: layout.slot_height,
            });
        }

        // Decoding and scaling are CPU-bound; each photo gets a blocking task
        let tasks = photos.iter().cloned().map(|photo| {
            let decoder = Arc::clone(&self.decoder);
            tokio::task::spawn_blocking(move || {
                let image = decoder.decode(&photo).map_err(|source| StripError::Decode {
                    id: photo.id,
                    source,
                })?;
                log::debug!("Decoded photo {} for strip", photo.id);
                Ok::<_, StripError>(render_slot(&image, layout.width, layout.slot_height))
            })
        });

        // Results come back in spawn order, one per slot
        let tiles = join_all(tasks).await;

        let mut canvas = RgbImage::from_pixel(layout.width, layout.height(count), BACKGROUND);
        for (index, tile) in tiles.into_iter().enumerate() {
            let tile = tile.map_err(|e| StripError::TaskFailed(e.to_string()))??;
            let (x, y) = layout.slot_origin(index);
            imageops::replace(&mut canvas, &tile, x as i64, y as i64);
        }

        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(
                canvas.as_raw(),
                canvas.width(),
                canvas.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(StripError::Encode)?;

        let ids = photos.iter().map(|p| p.id).collect();
        let strip = Strip::new(self.store.next_id(), png, now_millis(), ids)?;
        let strip = self.store.strips().put(strip).await?;

        log::info!(
            "Composed strip {} from {} photos ({}x{})",
            strip.id,
            count,
            canvas.width(),
            canvas.height()
        );
        Ok(strip)
    }

    /// Look up photos by id, in the given order, and compose them.
    ///
    /// # Errors
    /// * `StripError::PhotoNotFound` - If any id is not in the store
    pub async fn compose_ids(&self, ids: &[u64]) -> Result<Strip, StripError> {
        if ids.is_empty() || ids.len() > MAX_STRIP_PHOTOS {
            return Err(StripError::InvalidSelection(ids.len()));
        }

        let stored = self.store.photos().get_all().await?;
        let photos = ids
            .iter()
            .map(|id| {
                stored
                    .iter()
                    .find(|p| p.id == *id)
                    .cloned()
                    .ok_or(StripError::PhotoNotFound(*id))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.compose(&photos).await
    }
}
