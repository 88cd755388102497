use log::debug;

use crate::ascii::charset::ActiveCharset;
use crate::ascii::grid::CharGrid;
use crate::ascii::matcher::BrightnessMatcher;
use crate::image_pipeline::grid::PixelGrid;
use crate::image_pipeline::tiler::{padded_dimensions, Tiler};
use crate::AsciiError;

/// Fewest active characters a conversion will run with.
pub const MIN_CHARS_TO_CONVERT: usize = 2;

/// Factor applied by a single resolution step.
pub const RESOLUTION_STEP: u32 = 2;

/// Range of tiles-per-row a grid can be converted at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolutionBounds {
    pub min: u32,
    pub max: u32,
}

impl ResolutionBounds {
    /// At least one tile per row and at most one tile per pixel column.
    pub fn for_grid(grid: &PixelGrid) -> Self {
        let min = (grid.width() / grid.height()).max(1);
        Self { min, max: grid.width() }
    }

    pub fn contains(&self, resolution: u32) -> bool {
        (self.min..=self.max).contains(&resolution)
    }

    /// `resolution` doubled, if that stays within bounds.
    pub fn increase(&self, resolution: u32) -> Result<u32, AsciiError> {
        let next = resolution.saturating_mul(RESOLUTION_STEP);
        self.check(next)
    }

    /// `resolution` halved, if that stays within bounds.
    pub fn decrease(&self, resolution: u32) -> Result<u32, AsciiError> {
        self.check(resolution / RESOLUTION_STEP)
    }

    fn check(&self, resolution: u32) -> Result<u32, AsciiError> {
        if self.contains(resolution) {
            Ok(resolution)
        } else {
            Err(AsciiError::ResolutionOutOfBounds { resolution, min: self.min, max: self.max })
        }
    }
}

/// Runs tiling and matching over whole images.
///
/// The pipeline keeps its [`Tiler`] between calls, so converting the same
/// image at the same resolution again only repeats the character lookups.
#[derive(Debug, Default)]
pub struct ConversionPipeline {
    tiler: Tiler,
}

impl ConversionPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert `grid` into `resolution` characters per row.
    ///
    /// Padded dimensions are only logged; brightness is
    /// sampled from the original grid.
    pub fn convert(
        &mut self,
        grid: &PixelGrid,
        resolution: u32,
        matcher: &BrightnessMatcher,
    ) -> Result<CharGrid, AsciiError> {
        let (padded_width, padded_height) = padded_dimensions(grid.width(), grid.height());
        debug!(
            "converting {}x{} image (padded {padded_width}x{padded_height}) at resolution \
             {resolution}",
            grid.width(),
            grid.height(),
        );

        let brightness = self.tiler.sample_brightness(grid, resolution)?;
        let cells = brightness
            .values()
            .iter()
            .map(|&value| matcher.lookup_nearest(value))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CharGrid::new(brightness.columns(), brightness.rows(), cells))
    }

    /// [`convert`](Self::convert) with the session's active characters.
    ///
    /// Refuses to run with fewer than [`MIN_CHARS_TO_CONVERT`] characters.
    pub fn convert_active(
        &mut self,
        grid: &PixelGrid,
        resolution: u32,
        charset: &ActiveCharset,
    ) -> Result<CharGrid, AsciiError> {
        let active = charset.len();
        if active < MIN_CHARS_TO_CONVERT {
            return Err(AsciiError::CharsetTooSmall { active, required: MIN_CHARS_TO_CONVERT });
        }
        self.convert(grid, resolution, charset.matcher())
    }

    pub fn tiler(&self) -> &Tiler {
        &self.tiler
    }
}
