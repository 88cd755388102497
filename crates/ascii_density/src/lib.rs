//! Brightness-matched ASCII art.
//!
//! A [`PixelGrid`] is cut into square tiles by the [`Tiler`], each tile's
//! average luminance is looked up in a [`BrightnessMatcher`] holding the ink
//! density of every active character, and the [`ConversionPipeline`] collects
//! the answers into a [`CharGrid`].

mod ascii;
mod image_pipeline;
mod pipeline;

pub use ascii::{
    charset::{ActiveCharset, DEFAULT_CHARSET},
    font::{Font8x8, GlyphBitmap, GlyphRasterizer, FIRST_PRINTABLE, LAST_PRINTABLE},
    grid::CharGrid,
    matcher::{BrightnessEntry, BrightnessMatcher, RoundingPolicy},
};
pub use image_pipeline::{
    grid::{GridIdentity, PixelGrid, Rgb},
    loader::{grid_from_image, load_grid},
    luminance::luminance,
    tiler::{padded_dimensions, BrightnessMatrix, Tiler},
};
pub use pipeline::{ConversionPipeline, ResolutionBounds, MIN_CHARS_TO_CONVERT, RESOLUTION_STEP};

/// Broad category of an [`AsciiError`], for callers choosing a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller passed a value outside the accepted domain.
    InvalidArgument,
    /// The operation cannot run in the current state; nothing was changed.
    PreconditionViolated,
    /// An external resource could not be read or decoded.
    ResourceUnavailable,
}

#[derive(Debug, thiserror::Error)]
pub enum AsciiError {
    #[error("brightness must be in the range [0, 1], got {0}")]
    BrightnessOutOfRange(f64),
    #[error("character must be in the range [32, 126], got code {0}")]
    CharacterOutOfRange(u32),
    #[error("unknown rounding method {0:?}, expected one of: abs, up, down")]
    UnknownRoundingPolicy(String),
    #[error("{samples} samples do not fill a {width}x{height} grid")]
    InvalidDimensions { width: u32, height: u32, samples: usize },

    #[error("charset must contain at least one character")]
    EmptyCharset,
    #[error("no active characters to match against")]
    EmptyMatcher,
    #[error("resolution {resolution} does not evenly divide image width {width}")]
    ResolutionNotDivisible { resolution: u32, width: u32 },
    #[error("tile size {tile_size} exceeds image height {height}")]
    TileExceedsHeight { tile_size: u32, height: u32 },
    #[error("resolution {resolution} outside [{min}, {max}]")]
    ResolutionOutOfBounds { resolution: u32, min: u32, max: u32 },
    #[error("{active} active characters, at least {required} required")]
    CharsetTooSmall { active: usize, required: usize },

    #[error("failed to load image: {0}")]
    Image(#[from] image::ImageError),
}

impl AsciiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AsciiError::BrightnessOutOfRange(_)
            | AsciiError::CharacterOutOfRange(_)
            | AsciiError::UnknownRoundingPolicy(_)
            | AsciiError::InvalidDimensions { .. } => ErrorKind::InvalidArgument,
            AsciiError::EmptyCharset
            | AsciiError::EmptyMatcher
            | AsciiError::ResolutionNotDivisible { .. }
            | AsciiError::TileExceedsHeight { .. }
            | AsciiError::ResolutionOutOfBounds { .. }
            | AsciiError::CharsetTooSmall { .. } => ErrorKind::PreconditionViolated,
            AsciiError::Image(_) => ErrorKind::ResourceUnavailable,
        }
    }
}
