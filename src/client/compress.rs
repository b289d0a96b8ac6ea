//! Shrinks a picked photo before upload: fit within a bounding square, then
//! re-encode as JPEG and wrap it in a data URL.

use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, ImageError};
use thiserror::Error;
use tracing::debug;

use crate::photos::to_data_url;

#[derive(Debug, Clone, Copy)]
pub struct CompressOptions {
    /// Longest allowed side, in pixels.
    pub max_dimension: u32,
    /// JPEG quality in `0.0..=1.0`.
    pub quality: f32,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            max_dimension: 1024,
            quality: 0.7,
        }
    }
}

#[derive(Debug, Error)]
pub enum CompressError {
    #[error("could not read image: {0}")]
    Decode(#[source] ImageError),

    #[error("could not encode jpeg: {0}")]
    Encode(#[source] ImageError),

    #[error("encoder produced no data")]
    Empty,
}

/// Scales `(width, height)` so the longest side is at most `max`, keeping
/// the aspect ratio. Images already within bounds are returned unchanged.
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }
    let ratio = width as f64 / height as f64;
    let (w, h) = if ratio > 1.0 {
        (max as f64, (max as f64 / ratio).round())
    } else {
        ((max as f64 * ratio).round(), max as f64)
    };
    ((w as u32).max(1), (h as u32).max(1))
}

pub fn compress_photo(bytes: &[u8], opts: &CompressOptions) -> Result<String, CompressError> {
    let img = image::load_from_memory(bytes).map_err(CompressError::Decode)?;
    let (width, height) = fit_within(img.width(), img.height(), opts.max_dimension);
    let img = if (width, height) == (img.width(), img.height()) {
        img
    } else {
        img.resize_exact(width, height, FilterType::Triangle)
    };

    let quality = (opts.quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8;
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode_image(&img.to_rgb8())
        .map_err(CompressError::Encode)?;
    debug!(width, height, quality, in_bytes = bytes.len(), out_bytes = out.len(), "photo compressed");

    to_data_url(&out, Some("image/jpeg")).ok_or(CompressError::Empty)
}
