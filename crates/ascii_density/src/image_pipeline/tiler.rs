use std::sync::Arc;

use log::{debug, trace};

use super::grid::{GridIdentity, PixelGrid, Rgb};
use super::luminance::square_brightness;
use crate::AsciiError;

/// Row-major matrix of normalized tile brightness values in `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct BrightnessMatrix {
    rows: usize,
    columns: usize,
    values: Vec<f64>,
}

impl BrightnessMatrix {
    fn new(rows: usize, columns: usize, values: Vec<f64>) -> Self {
        debug_assert_eq!(rows * columns, values.len());
        Self { rows, columns, values }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        if row >= self.rows || column >= self.columns {
            return None;
        }
        self.values.get(row * self.columns + column).copied()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Result of the most recent sampling call.
#[derive(Debug)]
struct BrightnessCacheEntry {
    identity: GridIdentity,
    resolution: u32,
    matrix: Arc<BrightnessMatrix>,
}

/// Pads grids to power-of-two dimensions and samples per-tile brightness.
///
/// The last `(grid identity, resolution)` result is cached; sampling the same
/// content at the same resolution again returns the shared matrix untouched.
#[derive(Debug)]
pub struct Tiler {
    fill: Rgb,
    cache: Option<BrightnessCacheEntry>,
    computations: usize,
}

impl Default for Tiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Tiler {
    pub fn new() -> Self {
        Self::with_fill(Rgb::WHITE)
    }

    /// Tiler padding with `fill` instead of white.
    pub fn with_fill(fill: Rgb) -> Self {
        Self { fill, cache: None, computations: 0 }
    }

    /// Copy of `grid` centered on a canvas whose sides are the next powers of two.
    ///
    /// When the extra space is odd the remainder goes to the bottom/right edge.
    pub fn pad(&self, grid: &PixelGrid) -> PixelGrid {
        let (width, height) = padded_dimensions(grid.width(), grid.height());
        let top = (height - grid.height()) / 2;
        let left = (width - grid.width()) / 2;

        let mut samples = vec![self.fill; width as usize * height as usize];
        for (row, source) in grid.rows().enumerate() {
            let start = (row + top as usize) * width as usize + left as usize;
            samples[start..start + source.len()].copy_from_slice(source);
        }

        PixelGrid::from_valid_parts(width, height, samples)
    }

    /// Average brightness of each `tile × tile` square, `resolution` tiles per row.
    ///
    /// `resolution` must divide the grid width evenly. Rows of pixels below the
    /// last whole row of tiles are not sampled.
    pub fn sample_brightness(
        &mut self,
        grid: &PixelGrid,
        resolution: u32,
    ) -> Result<Arc<BrightnessMatrix>, AsciiError> {
        let identity = grid.identity();
        if let Some(entry) = &self.cache {
            if entry.identity == identity && entry.resolution == resolution {
                trace!("brightness cache hit at resolution {resolution}");
                return Ok(Arc::clone(&entry.matrix));
            }
        }

        let tile_size = tile_size(grid, resolution)?;
        let tile_rows = grid.height() / tile_size;

        let mut values = Vec::with_capacity(tile_rows as usize * resolution as usize);
        for tile_row in 0..tile_rows {
            for tile_col in 0..resolution {
                values.push(square_brightness(
                    grid,
                    tile_row * tile_size,
                    tile_col * tile_size,
                    tile_size,
                ));
            }
        }

        self.computations += 1;
        debug!(
            "sampled {}x{} tiles of {tile_size}px from {}x{} grid",
            resolution,
            tile_rows,
            grid.width(),
            grid.height()
        );

        let matrix = Arc::new(BrightnessMatrix::new(
            tile_rows as usize,
            resolution as usize,
            values,
        ));
        self.cache =
            Some(BrightnessCacheEntry { identity, resolution, matrix: Arc::clone(&matrix) });
        Ok(matrix)
    }

    /// Number of samplings that missed the cache.
    pub fn computations(&self) -> usize {
        self.computations
    }
}

/// Smallest power-of-two `(width, height)` that contains the given dimensions.
pub fn padded_dimensions(width: u32, height: u32) -> (u32, u32) {
    (width.next_power_of_two(), height.next_power_of_two())
}

fn tile_size(grid: &PixelGrid, resolution: u32) -> Result<u32, AsciiError> {
    let width = grid.width();
    if resolution == 0 || resolution > width || width % resolution != 0 {
        return Err(AsciiError::ResolutionNotDivisible { resolution, width });
    }

    let tile_size = width / resolution;
    if tile_size > grid.height() {
        return Err(AsciiError::TileExceedsHeight { tile_size, height: grid.height() });
    }
    Ok(tile_size)
}
