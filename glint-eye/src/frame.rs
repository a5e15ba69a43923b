//! Owned video frames

use chrono::{DateTime, Utc};
use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbImage};

use crate::error::StreamError;

/// A decoded RGB frame with exactly one owner.
///
/// Not `Clone`: handing a frame to the processing cycle moves it, and the
/// pixel buffer is released when the last owner drops it.
#[derive(Debug)]
pub struct Frame {
    sequence: u64,
    captured_at: DateTime<Utc>,
    image: RgbImage,
}

impl Frame {
    pub fn new(sequence: u64, image: RgbImage) -> Self {
        Self {
            sequence,
            captured_at: Utc::now(),
            image,
        }
    }

    /// Position in the producer's output order
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Decode a JPEG segment and bring it to the processing resolution.
pub fn decode_jpeg(data: &[u8], resolution: (u32, u32)) -> Result<RgbImage, StreamError> {
    let decoded = image::load_from_memory_with_format(data, ImageFormat::Jpeg)?;
    Ok(fit_to(decoded.into_rgb8(), resolution))
}

/// Resize `image` to `resolution` unless it already matches.
pub fn fit_to(image: RgbImage, resolution: (u32, u32)) -> RgbImage {
    let (width, height) = resolution;
    if image.dimensions() == (width, height) || width == 0 || height == 0 {
        image
    } else {
        imageops::resize(&image, width, height, FilterType::Triangle)
    }
}
