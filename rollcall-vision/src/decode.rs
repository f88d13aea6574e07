use image::DynamicImage;

use crate::error::ExtractError;

/// Decode raw uploaded bytes (PNG, JPEG, ...) into an RGB image.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ExtractError> {
    let img = image::load_from_memory(bytes)?;
    log::debug!(
        "decoded image: {}x{} ({} bytes)",
        img.width(),
        img.height(),
        bytes.len()
    );
    Ok(DynamicImage::ImageRgb8(img.to_rgb8()))
}
