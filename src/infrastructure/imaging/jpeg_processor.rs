use super::traits::PhotoProcessor;
use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageError, codecs::jpeg::JpegEncoder, imageops::FilterType};
use tracing::{debug, instrument};

pub const TOUR_PHOTO_WIDTH: u32 = 2000;
pub const TOUR_PHOTO_HEIGHT: u32 = 1333;
pub const TOUR_PHOTO_QUALITY: u8 = 90;

/// Crops to fill a fixed frame and re-encodes as JPEG.
///
/// Encoding is CPU-bound and runs on the blocking pool.
#[derive(Debug, Clone, Copy)]
pub struct JpegPhotoProcessor {
    width: u32,
    height: u32,
    quality: u8,
}

impl JpegPhotoProcessor {
    pub fn new(width: u32, height: u32, quality: u8) -> Self {
        Self {
            width,
            height,
            quality,
        }
    }

    /// 2000×1333 at quality 90.
    pub fn tour_photos() -> Self {
        Self::new(TOUR_PHOTO_WIDTH, TOUR_PHOTO_HEIGHT, TOUR_PHOTO_QUALITY)
    }

    fn encode(self, data: &[u8]) -> Result<Vec<u8>, ImageError> {
        let img = image::load_from_memory(data)?;
        debug!(
            "Resizing {}x{} photo to {}x{}",
            img.width(),
            img.height(),
            self.width,
            self.height
        );
        let resized = img.resize_to_fill(self.width, self.height, FilterType::Triangle);

        let mut buf = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buf, self.quality);
        DynamicImage::ImageRgb8(resized.to_rgb8()).write_with_encoder(encoder)?;
        Ok(buf)
    }
}

#[async_trait]
impl PhotoProcessor for JpegPhotoProcessor {
    #[instrument(skip(self, data), fields(input_bytes = data.len()))]
    async fn process(&self, data: Bytes) -> Result<Vec<u8>, ImageError> {
        let processor = *self;
        let out = tokio::task::spawn_blocking(move || processor.encode(&data))
            .await
            .map_err(|e| ImageError::IoError(std::io::Error::other(e)))??;
        debug!("JPEG encoding complete, output size: {} bytes", out.len());
        Ok(out)
    }

    fn extension(&self) -> &'static str {
        "jpeg"
    }

    fn content_type(&self) -> &'static str {
        "image/jpeg"
    }
}
