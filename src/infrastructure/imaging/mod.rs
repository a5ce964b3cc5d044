pub mod jpeg_processor;
pub mod traits;
