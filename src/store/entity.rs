//! Persisted entity shapes.
//!
//! Field names on the wire match the export files written by the browser
//! version of the camera, so those files can be imported unchanged.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::StoreError;
use crate::palette::PaletteMode;

/// Most photos a strip can hold.
pub const MAX_STRIP_PHOTOS: usize = 4;

/// A kind of entity the store can persist.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Primary-engine table name.
    const TABLE: &'static str;
    /// Fallback storage key.
    const FALLBACK_KEY: &'static str;

    fn id(&self) -> u64;

    /// Milliseconds since the Unix epoch; newest sorts first.
    fn timestamp(&self) -> i64;
}

/// A captured, quantized frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub id: u64,
    /// PNG-encoded image
    #[serde(rename = "dataURL", with = "data_url")]
    pub pixels: Vec<u8>,
    #[serde(rename = "timestamp")]
    pub captured_at: i64,
    pub filter: PaletteMode,
}

impl Photo {
    pub fn new(id: u64, pixels: Vec<u8>, captured_at: i64, filter: PaletteMode) -> Self {
        Self {
            id,
            pixels,
            captured_at,
            filter,
        }
    }
}

impl Entity for Photo {
    const TABLE: &'static str = "photos";
    const FALLBACK_KEY: &'static str = "gameboy-photos";

    fn id(&self) -> u64 {
        self.id
    }

    fn timestamp(&self) -> i64 {
        self.captured_at
    }
}

/// Several photos composed into one vertical image.
///
/// `source_photo_ids` records which photos were used, in selection order. It
/// is provenance only: deleting a photo leaves strips that used it intact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StripRecord", into = "StripRecord")]
pub struct Strip {
    pub id: u64,
    /// PNG-encoded image
    pub pixels: Vec<u8>,
    pub composed_at: i64,
    source_photo_ids: Vec<u64>,
}

impl Strip {
    /// # Errors
    /// * `StoreError::InvalidEntity` - If `source_photo_ids` does not hold 1 to 4 ids
    pub fn new(
        id: u64,
        pixels: Vec<u8>,
        composed_at: i64,
        source_photo_ids: Vec<u64>,
    ) -> Result<Self, StoreError> {
        if source_photo_ids.is_empty() || source_photo_ids.len() > MAX_STRIP_PHOTOS {
            return Err(StoreError::InvalidEntity(format!(
                "strip must reference 1 to {} photos, got {}",
                MAX_STRIP_PHOTOS,
                source_photo_ids.len()
            )));
        }

        Ok(Self {
            id,
            pixels,
            composed_at,
            source_photo_ids,
        })
    }

    pub fn source_photo_ids(&self) -> &[u64] {
        &self.source_photo_ids
    }

    pub fn photo_count(&self) -> usize {
        self.source_photo_ids.len()
    }
}

impl Entity for Strip {
    const TABLE: &'static str = "photostrips";
    const FALLBACK_KEY: &'static str = "gameboy-photostrips";

    fn id(&self) -> u64 {
        self.id
    }

    fn timestamp(&self) -> i64 {
        self.composed_at
    }
}

/// Serialized form of [`Strip`], carrying the redundant photo count.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StripRecord {
    id: u64,
    #[serde(rename = "dataURL", with = "data_url")]
    pixels: Vec<u8>,
    timestamp: i64,
    photo_ids: Vec<u64>,
    photo_count: usize,
}

impl TryFrom<StripRecord> for Strip {
    type Error = StoreError;

    fn try_from(record: StripRecord) -> Result<Self, Self::Error> {
        if record.photo_count != record.photo_ids.len() {
            return Err(StoreError::InvalidEntity(format!(
                "strip {} has photoCount {} but {} photo ids",
                record.id,
                record.photo_count,
                record.photo_ids.len()
            )));
        }
        Strip::new(record.id, record.pixels, record.timestamp, record.photo_ids)
    }
}

impl From<Strip> for StripRecord {
    fn from(strip: Strip) -> Self {
        Self {
            id: strip.id,
            photo_count: strip.source_photo_ids.len(),
            pixels: strip.pixels,
            timestamp: strip.composed_at,
            photo_ids: strip.source_photo_ids,
        }
    }
}

/// `data:image/png;base64,...` encoding for image bytes.
mod data_url {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    const PNG_PREFIX: &str = "data:image/png;base64,";

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        let mut url = String::with_capacity(PNG_PREFIX.len() + bytes.len() * 4 / 3 + 4);
        url.push_str(PNG_PREFIX);
        STANDARD.encode_string(bytes, &mut url);
        serializer.serialize_str(&url)
    }

    /// Accepts any `data:` media type, or bare base64.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let url = String::deserialize(deserializer)?;
        let payload = match url.strip_prefix("data:") {
            Some(rest) => rest
                .split_once(',')
                .map(|(_, data)| data)
                .ok_or_else(|| serde::de::Error::custom("data URL has no payload"))?,
            None => url.as_str(),
        };
        STANDARD.decode(payload).map_err(serde::de::Error::custom)
    }
}
