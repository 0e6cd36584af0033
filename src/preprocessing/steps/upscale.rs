use image::{imageops, imageops::FilterType, GrayImage};

/// Images whose longest side is below this are upscaled
pub const SMALL_IMAGE_LIMIT: u32 = 1000;
/// Scale factor applied to small images
pub const UPSCALE_FACTOR: f32 = 1.5;

/// Upscale low-resolution images, which otherwise recognize poorly.
///
/// Images with `max(width, height) < SMALL_IMAGE_LIMIT` are scaled by
/// `UPSCALE_FACTOR` with linear interpolation; anything larger is returned
/// untouched.
pub fn apply(image: GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || width.max(height) >= SMALL_IMAGE_LIMIT {
        return image;
    }

    let new_width = scaled(width);
    let new_height = scaled(height);
    imageops::resize(&image, new_width, new_height, FilterType::Triangle)
}

fn scaled(dimension: u32) -> u32 {
    ((dimension as f32 * UPSCALE_FACTOR).round() as u32).max(1)
}
