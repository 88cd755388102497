use super::grid::{PixelGrid, Rgb};

const RED_WEIGHT: f64 = 0.2126;
const GREEN_WEIGHT: f64 = 0.7152;
const BLUE_WEIGHT: f64 = 0.0722;
const MAX_CHANNEL: f64 = 255.0;

/// Rec. 709 relative luminance in `[0, 255]`.
pub fn luminance(sample: Rgb) -> f64 {
    f64::from(sample.r) * RED_WEIGHT
        + f64::from(sample.g) * GREEN_WEIGHT
        + f64::from(sample.b) * BLUE_WEIGHT
}

/// Mean luminance of the `size`×`size` square with its top-left corner at
/// `(top, left)`, normalized to `[0, 1]`.
pub fn square_brightness(grid: &PixelGrid, top: u32, left: u32, size: u32) -> f64 {
    let mut total = 0.0;
    for row in top..top + size {
        for col in left..left + size {
            total += luminance(grid.sample_at(row, col));
        }
    }

    let pixels = f64::from(size) * f64::from(size);
    (total / (MAX_CHANNEL * pixels)).clamp(0.0, 1.0)
}
