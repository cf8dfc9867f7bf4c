//! Downscaling and JPEG re-encoding before upload.

use image::GenericImageView;
use image::imageops::FilterType;
use tracing::debug;

use super::pdf::encode_jpeg;
use crate::error::FileError;
use crate::models::config::ImageConfig;

/// Decode `data`, fit it inside `max_dimension` square and re-encode as JPEG.
///
/// Images already inside the box keep their size.
pub fn optimize_image(data: &[u8], config: &ImageConfig) -> Result<Vec<u8>, FileError> {
    let image = image::load_from_memory(data)?;
    let (width, height) = image.dimensions();
    let (new_width, new_height) = fit_within(width, height, config.max_dimension);

    let image = if (new_width, new_height) != (width, height) {
        debug!(
            "Resizing {}x{} to {}x{}",
            width, height, new_width, new_height
        );
        image.resize_exact(new_width, new_height, FilterType::Lanczos3)
    } else {
        image
    };

    let jpeg = encode_jpeg(&image, config.jpeg_quality)?;
    debug!("Optimised image: {} -> {} bytes", data.len(), jpeg.len());
    Ok(jpeg)
}

/// Largest size with the same aspect ratio that fits in `max` x `max`.
fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max {
        return (width, height);
    }

    let scale = max as f64 / longest as f64;
    let new_width = (width as f64 * scale).round() as u32;
    let new_height = (height as f64 * scale).round() as u32;

    (new_width.clamp(1, max), new_height.clamp(1, max))
}
