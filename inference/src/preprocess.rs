//! Turns the images posted to the service into model inputs.

use std::io::Cursor;

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{
    DynamicImage, ImageFormat, Rgb, RgbImage,
    imageops::{self, FilterType},
};
use ndarray::{Array4, ArrayD};

use crate::{Result, ServiceErr};

/// The sharpening kernel, applied scaled by `SHARPEN_SCALE`.
pub const SHARPEN_KERNEL: [[f32; 3]; 3] = [[-1., -1., -1.], [-1., 9., -1.], [-1., -1., -1.]];
pub const SHARPEN_SCALE: f32 = 1. / 3.;

/// Decodes a base64 encoded image as RGB.
///
/// # Errors
/// `EmptyPayload` for a blank payload and `InvalidImage` if it isn't base64 or isn't an image
/// in a supported format.
pub fn decode(payload: &str) -> Result<RgbImage> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(ServiceErr::EmptyPayload);
    }

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| ServiceErr::InvalidImage(e.to_string()))?;
    let image =
        image::load_from_memory(&bytes).map_err(|e| ServiceErr::InvalidImage(e.to_string()))?;

    Ok(image.to_rgb8())
}

/// Convolves every channel with the sharpening kernel, reflecting the borders and saturating
/// the result.
pub fn sharpen(image: &RgbImage) -> RgbImage {
    let (width, height) = image.dimensions();

    RgbImage::from_fn(width, height, |x, y| {
        let mut acc = [0f32; 3];

        for (dy, row) in SHARPEN_KERNEL.iter().enumerate() {
            let sy = reflect(i64::from(y) + dy as i64 - 1, height);
            for (dx, weight) in row.iter().enumerate() {
                let sx = reflect(i64::from(x) + dx as i64 - 1, width);
                let pixel = image.get_pixel(sx, sy);

                for (acc, &value) in acc.iter_mut().zip(&pixel.0) {
                    *acc += weight * f32::from(value);
                }
            }
        }

        Rgb(acc.map(|v| (v * SHARPEN_SCALE).round().clamp(0., 255.) as u8))
    })
}

/// Mirrors an out of range coordinate back into `0..len` without repeating the edge.
fn reflect(i: i64, len: u32) -> u32 {
    let len = i64::from(len);
    if len == 1 {
        return 0;
    }

    let i = if i < 0 {
        -i
    } else if i >= len {
        2 * (len - 1) - i
    } else {
        i
    };

    i.clamp(0, len - 1) as u32
}

/// Resizes `image` to the model's input and lays it out as a single sample batch, with the
/// raw `0..=255` pixel values.
///
/// # Arguments
/// * `image` - The (sharpened) image.
/// * `width` - The input width of the model.
/// * `height` - The input height of the model.
/// * `depth` - The input channels of the model, 1 (grayscale) or 3 (RGB).
pub fn to_input(image: &RgbImage, width: usize, height: usize, depth: usize) -> Result<ArrayD<f32>> {
    let resized = imageops::resize(image, width as u32, height as u32, FilterType::Triangle);

    let pixels = match depth {
        3 => resized.into_raw(),
        1 => DynamicImage::ImageRgb8(resized).to_luma8().into_raw(),
        depth => return Err(ServiceErr::UnsupportedDepth { depth }),
    };

    let values = pixels.into_iter().map(f32::from).collect();
    let input = Array4::from_shape_vec((1, height, width, depth), values)
        .map_err(machine_learning::MlErr::from)?;

    Ok(input.into_dyn())
}

/// Encodes `image` as a base64 PNG.
pub fn encode_png(image: &RgbImage) -> Result<String> {
    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(STANDARD.encode(png))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_payload_is_empty() {
        assert!(matches!(decode(""), Err(ServiceErr::EmptyPayload)));
        assert!(matches!(decode("  \n"), Err(ServiceErr::EmptyPayload)));
    }

    #[test]
    fn garbage_is_an_invalid_image() {
        assert!(matches!(decode("not base64!"), Err(ServiceErr::InvalidImage(_))));

        let text = STANDARD.encode("definitely not a png");
        assert!(matches!(decode(&text), Err(ServiceErr::InvalidImage(_))));
    }

    #[test]
    fn png_payload_roundtrip() {
        let image = RgbImage::from_fn(5, 3, |x, y| Rgb([x as u8 * 40, y as u8 * 80, 7]));

        let decoded = decode(&encode_png(&image).unwrap()).unwrap();

        assert_eq!(decoded, image);
    }

    #[test]
    fn flat_images_are_scaled_by_a_third() {
        let image = RgbImage::from_pixel(4, 4, Rgb([90, 30, 255]));

        let sharpened = sharpen(&image);

        assert!(sharpened.pixels().all(|p| p.0 == [30, 10, 85]));
    }

    #[test]
    fn sharpening_saturates() {
        let mut image = RgbImage::new(3, 3);
        image.put_pixel(1, 1, Rgb([200, 200, 200]));

        let sharpened = sharpen(&image);

        // 9 * 200 / 3
        assert_eq!(sharpened.get_pixel(1, 1).0, [255, 255, 255]);
        // -200 / 3
        assert_eq!(sharpened.get_pixel(0, 1).0, [0, 0, 0]);
    }

    #[test]
    fn borders_are_reflected() {
        assert_eq!(reflect(-1, 4), 1);
        assert_eq!(reflect(4, 4), 2);
        assert_eq!(reflect(2, 4), 2);
        assert_eq!(reflect(-1, 1), 0);
    }

    #[test]
    fn input_has_the_model_shape() {
        let image = RgbImage::from_pixel(10, 6, Rgb([10, 20, 30]));

        let rgb = to_input(&image, 4, 8, 3).unwrap();
        assert_eq!(rgb.shape(), &[1, 8, 4, 3]);
        assert_eq!(rgb[[0, 3, 2, 1]], 20.);

        let gray = to_input(&image, 4, 8, 1).unwrap();
        assert_eq!(gray.shape(), &[1, 8, 4, 1]);

        assert!(matches!(
            to_input(&image, 4, 8, 2),
            Err(ServiceErr::UnsupportedDepth { depth: 2 })
        ));
    }
}
