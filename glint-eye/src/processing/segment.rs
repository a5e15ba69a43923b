//! HSV threshold segmentation

use image::{GrayImage, Luma, RgbImage};

use crate::config::HsvThresholds;

pub const MASK_ON: u8 = 255;
pub const MASK_OFF: u8 = 0;

/// Convert one 8-bit RGB pixel to HSV with hue on the 0..=179 half-degree
/// scale and saturation/value on 0..=255.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let value = max;
    let saturation = if max > 0.0 { delta * 255.0 / max } else { 0.0 };

    let hue_deg = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    let hue_deg = if hue_deg < 0.0 { hue_deg + 360.0 } else { hue_deg };

    // 360 degrees rounds onto 180, which is hue 0 again.
    let hue = ((hue_deg / 2.0).round() as u32 % 180) as u8;
    (hue, saturation.round() as u8, value as u8)
}

/// Binary mask of the pixels whose hue, saturation and value all fall inside
/// `thresholds`.
pub fn segment(image: &RgbImage, thresholds: &HsvThresholds) -> GrayImage {
    let mut mask = GrayImage::new(image.width(), image.height());
    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let (h, s, v) = rgb_to_hsv(r, g, b);
        let on = thresholds.hue.contains(h)
            && thresholds.saturation.contains(s)
            && thresholds.value.contains(v);
        mask.put_pixel(x, y, Luma([if on { MASK_ON } else { MASK_OFF }]));
    }
    mask
}
