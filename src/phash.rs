use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma};
use std::fmt;
use std::path::Path;

use crate::error::Error;

const HASH_SIDE: u32 = 8;

/// 64-bit average hash. Bit 63 is the top-left pixel, bit 0 the bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AverageHash(u64);

impl AverageHash {
    pub fn from_image(img: &DynamicImage) -> Self {
        let gray = DynamicImage::ImageLuma8(luma_601(img));
        let small = gray
            .resize_exact(HASH_SIDE, HASH_SIDE, FilterType::Lanczos3)
            .to_luma8();

        let pixels: Vec<f64> = small.pixels().map(|p| p.0[0] as f64).collect();
        let mean = pixels.iter().sum::<f64>() / pixels.len() as f64;

        let bits = pixels
            .iter()
            .fold(0u64, |acc, &px| (acc << 1) | u64::from(px > mean));
        Self(bits)
    }
}

/// ITU-R 601-2 luma (L = 0.299 R + 0.587 G + 0.114 B) in 16-bit fixed point.
fn luma_601(img: &DynamicImage) -> GrayImage {
    let rgb = img.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let l = (u32::from(r) * 19595 + u32::from(g) * 38470 + u32::from(b) * 7471 + 0x8000) >> 16;
        Luma([l as u8])
    })
}

impl fmt::Display for AverageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Open an image from disk and return its canonical average-hash string.
pub fn average_hash(path: &Path) -> Result<String, Error> {
    let img = image::open(path)?;
    Ok(AverageHash::from_image(&img).to_string())
}
