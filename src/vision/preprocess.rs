//! Pixel-level preprocessing shared by the detectors.

use image::{GrayImage, ImageBuffer, Luma, Rgba};

/// Converts to 8-bit luma using the ITU-R BT.601 weights.
pub fn to_grayscale(img: &ImageBuffer<Rgba<u8>, Vec<u8>>) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut output = ImageBuffer::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        let r = pixel[0] as f32;
        let g = pixel[1] as f32;
        let b = pixel[2] as f32;
        let luma = 0.299 * r + 0.587 * g + 0.114 * b;
        output.put_pixel(x, y, Luma([luma.round().clamp(0.0, 255.0) as u8]));
    }

    output
}

/// Separable Gaussian blur with an odd `ksize` and replicated borders.
pub fn gaussian_blur(img: &GrayImage, ksize: usize, sigma: f64) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 || ksize < 2 {
        return img.clone();
    }

    let kernel = gaussian_kernel(ksize, sigma);
    let radius = (kernel.len() / 2) as i64;
    let w = width as i64;
    let h = height as i64;

    let mut horizontal = vec![0f64; (width * height) as usize];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = (x + k as i64 - radius).clamp(0, w - 1);
                acc += weight * img.get_pixel(sx as u32, y as u32)[0] as f64;
            }
            horizontal[(y * w + x) as usize] = acc;
        }
    }

    let mut output = ImageBuffer::new(width, height);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = (y + k as i64 - radius).clamp(0, h - 1);
                acc += weight * horizontal[(sy * w + x) as usize];
            }
            output.put_pixel(x as u32, y as u32, Luma([acc.round().clamp(0.0, 255.0) as u8]));
        }
    }

    output
}

fn gaussian_kernel(ksize: usize, sigma: f64) -> Vec<f64> {
    let ksize = if ksize % 2 == 0 { ksize + 1 } else { ksize };
    let radius = (ksize / 2) as f64;
    let weights: Vec<f64> = (0..ksize)
        .map(|i| {
            let d = i as f64 - radius;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Binary threshold: pixels above `thresh` become `maxval`, the rest 0.
pub fn threshold_binary(img: &GrayImage, thresh: u8, maxval: u8) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut output = ImageBuffer::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        let value = if pixel[0] > thresh { maxval } else { 0 };
        output.put_pixel(x, y, Luma([value]));
    }

    output
}

/// Crops the top `1/divisor` of a frame, where the indicator hexagons live.
pub fn crop_top_band(
    img: &ImageBuffer<Rgba<u8>, Vec<u8>>,
    divisor: u32,
) -> ImageBuffer<Rgba<u8>, Vec<u8>> {
    let (w, h) = img.dimensions();
    let band = h / divisor.max(1);
    image::imageops::crop_imm(img, 0, 0, w, band).to_image()
}

/// RGB to HSV on the 8-bit scale used by the hexagon colour logic:
/// hue 0-179 (degrees halved), saturation and value 0-255.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let rf = r as f64;
    let gf = g as f64;
    let bf = b as f64;
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let s = if max > 0.0 { delta * 255.0 / max } else { 0.0 };
    let h = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    [
        ((h / 2.0).round() as u32 % 180) as u8,
        s.round().clamp(0.0, 255.0) as u8,
        max as u8,
    ]
}

/// HSV value channel of a pixel.
#[inline]
pub fn value_channel(pixel: &Rgba<u8>) -> u8 {
    pixel[0].max(pixel[1]).max(pixel[2])
}
