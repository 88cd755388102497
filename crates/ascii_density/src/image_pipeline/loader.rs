use std::path::Path;

use image::{DynamicImage, GenericImageView};
use log::debug;

use super::grid::{PixelGrid, Rgb};
use crate::AsciiError;

/// Decode the image at `path` into a [`PixelGrid`].
///
/// Alpha is discarded; only the color channels take part in brightness sampling.
pub fn load_grid<P: AsRef<Path>>(path: P) -> Result<PixelGrid, AsciiError> {
    let path = path.as_ref();
    let image = image::open(path)?;
    let grid = grid_from_image(&image)?;
    debug!("loaded image {}x{} from {}", grid.width(), grid.height(), path.display());
    Ok(grid)
}

pub fn grid_from_image(image: &DynamicImage) -> Result<PixelGrid, AsciiError> {
    let (width, height) = image.dimensions();
    let rgb = image.to_rgb8();
    let samples = rgb.pixels().map(|pixel| Rgb::from(pixel.0)).collect();
    PixelGrid::new(width, height, samples)
}

impl TryFrom<&DynamicImage> for PixelGrid {
    type Error = AsciiError;

    fn try_from(image: &DynamicImage) -> Result<Self, Self::Error> {
        grid_from_image(image)
    }
}
