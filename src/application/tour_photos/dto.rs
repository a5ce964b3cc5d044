use bytes::Bytes;
use serde_json::{Map, Value};

/// Files and text fields that passed the upload gate for one tour.
#[derive(Debug, Default, Clone)]
pub struct TourPhotoUpload {
    pub image_cover: Option<Bytes>,
    pub images: Vec<Bytes>,
    /// Non-file multipart fields, applied alongside the new file names
    pub fields: Map<String, Value>,
}

impl TourPhotoUpload {
    pub fn has_files(&self) -> bool {
        self.image_cover.is_some() || !self.images.is_empty()
    }
}

/// Stored file name for the cover photo of `tour_id`.
pub fn cover_name(tour_id: &str, stamp: i64, extension: &str) -> String {
    format!("tour-{tour_id}-{stamp}-cover.{extension}")
}

/// Stored file name for gallery photo number `n` (1-based).
pub fn gallery_name(tour_id: &str, stamp: i64, n: usize, extension: &str) -> String {
    format!("tour-{tour_id}-{stamp}-{n}.{extension}")
}
