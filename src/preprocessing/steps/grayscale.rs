use image::{DynamicImage, GrayImage};

/// Collapse a photo or scan to one luminance channel
pub fn apply(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    #[test]
    fn test_luminance_weights_channels() {
        let img = RgbImage::from_fn(3, 1, |x, _| match x {
            0 => Rgb([255, 0, 0]),
            1 => Rgb([0, 255, 0]),
            _ => Rgb([0, 0, 255]),
        });

        let gray = apply(&DynamicImage::ImageRgb8(img));
        let (red, green, blue) = (gray[(0, 0)].0[0], gray[(1, 0)].0[0], gray[(2, 0)].0[0]);

        assert!(green > red && red > blue, "{} {} {}", red, green, blue);
    }

    #[test]
    fn test_dark_ink_on_colored_paper_stays_darker() {
        // Blue ink on a yellow invoice background
        let img = RgbaImage::from_fn(40, 20, |x, _| {
            if x < 10 {
                Rgba([20, 30, 120, 255])
            } else {
                Rgba([250, 240, 180, 255])
            }
        });

        let gray = apply(&DynamicImage::ImageRgba8(img));

        assert_eq!(gray.dimensions(), (40, 20));
        assert!(gray[(0, 0)].0[0] < gray[(39, 19)].0[0]);
    }
}
