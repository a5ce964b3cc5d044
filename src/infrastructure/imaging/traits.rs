use async_trait::async_trait;
use bytes::Bytes;

#[async_trait]
pub trait PhotoProcessor: Send + Sync {
    /// Decodes an uploaded image and re-encodes it in the stored format.
    async fn process(&self, data: Bytes) -> Result<Vec<u8>, image::ImageError>;

    /// Extension of the files `process` produces, without the dot.
    fn extension(&self) -> &'static str;

    fn content_type(&self) -> &'static str;
}
