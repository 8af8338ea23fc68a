//! Image decoding and height clamping for screenshot items.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;

use crate::error::NormalizeError;

/// Result of decoding an image item.
#[derive(Debug)]
pub struct DecodedImage {
    /// The decoded image data
    pub image: DynamicImage,
    /// Detected image format
    pub format: ImageFormat,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

/// Synchronous decode from bytes (runs in spawn_blocking).
///
/// The format is detected from the content; the file name's extension is only
/// consulted when the content is ambiguous.
pub fn decode_bytes(bytes: &[u8], name: &str) -> Result<DecodedImage, NormalizeError> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| NormalizeError::Decode {
            name: name.to_string(),
            message: format!("Cannot detect image format: {e}"),
        })?;
    let format = match reader.format() {
        Some(f) => f,
        None => ImageFormat::from_path(name).map_err(|_| NormalizeError::Decode {
            name: name.to_string(),
            message: "Unrecognized image format".to_string(),
        })?,
    };
    let image = reader.decode().map_err(|e| NormalizeError::Decode {
        name: name.to_string(),
        message: e.to_string(),
    })?;

    let (width, height) = image.dimensions();
    Ok(DecodedImage {
        image,
        format,
        width,
        height,
    })
}

/// Target dimensions for an image clamped to `max_height`.
///
/// Returns `None` when the image already fits. Width keeps the aspect ratio
/// and never drops below one pixel.
pub fn clamped_dimensions(width: u32, height: u32, max_height: u32) -> Option<(u32, u32)> {
    if height <= max_height {
        return None;
    }
    let scaled = (u64::from(width) * u64::from(max_height) + u64::from(height) / 2)
        / u64::from(height);
    let new_width = u32::try_from(scaled).unwrap_or(u32::MAX).max(1);
    Some((new_width, max_height))
}

/// Redraw an image at the clamped size and re-encode it in its own format.
pub fn downscale(
    decoded: &DecodedImage,
    max_height: u32,
    name: &str,
) -> Result<Option<Vec<u8>>, NormalizeError> {
    let Some((width, height)) = clamped_dimensions(decoded.width, decoded.height, max_height)
    else {
        return Ok(None);
    };

    let resized = decoded.image.resize_exact(width, height, FilterType::Triangle);
    // JPEG has no alpha channel
    let resized = match decoded.format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(resized.to_rgb8()),
        _ => resized,
    };

    let mut buffer = Cursor::new(Vec::new());
    resized
        .write_to(&mut buffer, decoded.format)
        .map_err(|e| NormalizeError::Encode {
            name: name.to_string(),
            message: e.to_string(),
        })?;
    Ok(Some(buffer.into_inner()))
}
