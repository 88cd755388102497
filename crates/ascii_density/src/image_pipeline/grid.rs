use std::fmt;
use std::hash::{BuildHasher, Hasher};

use ahash::RandomState;

use crate::AsciiError;

/// Fixed seeds so two grids with the same content always share a fingerprint.
const FINGERPRINT_SEEDS: [u64; 4] =
    [0x243f_6a88_85a3_08d3, 0x1319_8a2e_0370_7344, 0xa409_3822_299f_31d0, 0x082e_fa98_ec4e_6c89];

/// A single sample encoded as RGB bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

/// Content identity of a [`PixelGrid`], usable as a cache key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridIdentity {
    pub width: u32,
    pub height: u32,
    pub fingerprint: u64,
}

/// Immutable row-major grid of RGB samples.
///
/// The content fingerprint is computed once at construction, so comparing the
/// identity of two grids is O(1).
#[derive(Clone)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    samples: Vec<Rgb>,
    fingerprint: u64,
}

impl PixelGrid {
    /// Build a grid from row-major samples.
    ///
    /// Fails unless both dimensions are positive and `samples` fills them exactly.
    pub fn new(width: u32, height: u32, samples: Vec<Rgb>) -> Result<Self, AsciiError> {
        let expected = (width as usize).checked_mul(height as usize);
        if width == 0 || height == 0 || expected != Some(samples.len()) {
            return Err(AsciiError::InvalidDimensions { width, height, samples: samples.len() });
        }

        let fingerprint = fingerprint(width, height, &samples);
        Ok(Self { width, height, samples, fingerprint })
    }

    /// Grid whose dimensions the caller has already established.
    pub(crate) fn from_valid_parts(width: u32, height: u32, samples: Vec<Rgb>) -> Self {
        debug_assert!(width > 0 && height > 0);
        debug_assert_eq!(width as usize * height as usize, samples.len());
        let fingerprint = fingerprint(width, height, &samples);
        Self { width, height, samples, fingerprint }
    }

    /// Build a grid from packed `RGBRGB...` bytes.
    pub fn from_rgb_bytes(width: u32, height: u32, bytes: &[u8]) -> Result<Self, AsciiError> {
        if bytes.len() % 3 != 0 {
            return Err(AsciiError::InvalidDimensions {
                width,
                height,
                samples: bytes.len() / 3,
            });
        }
        let samples = bytes.chunks_exact(3).map(|px| Rgb::new(px[0], px[1], px[2])).collect();
        Self::new(width, height, samples)
    }

    /// A grid where every sample has the same color.
    pub fn filled(width: u32, height: u32, color: Rgb) -> Result<Self, AsciiError> {
        let len = (width as usize).saturating_mul(height as usize);
        Self::new(width, height, vec![color; len])
    }

    /// A grid whose sample at `(row, col)` is `f(row, col)`.
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Result<Self, AsciiError>
    where
        F: FnMut(u32, u32) -> Rgb,
    {
        let mut samples = Vec::with_capacity((width as usize).saturating_mul(height as usize));
        for row in 0..height {
            for col in 0..width {
                samples.push(f(row, col));
            }
        }
        Self::new(width, height, samples)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sample at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if `row >= height` or `col >= width`.
    pub fn sample_at(&self, row: u32, col: u32) -> Rgb {
        assert!(
            row < self.height && col < self.width,
            "sample ({row}, {col}) outside {}x{} grid",
            self.width,
            self.height
        );
        self.samples[row as usize * self.width as usize + col as usize]
    }

    pub fn identity(&self) -> GridIdentity {
        GridIdentity { width: self.width, height: self.height, fingerprint: self.fingerprint }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Rgb]> + '_ {
        self.samples.chunks(self.width as usize)
    }

    pub fn samples(&self) -> &[Rgb] {
        &self.samples
    }
}

impl PartialEq for PixelGrid {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity() && self.samples == other.samples
    }
}

impl Eq for PixelGrid {}

impl fmt::Debug for PixelGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelGrid")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("fingerprint", &format_args!("{:016x}", self.fingerprint))
            .finish()
    }
}

fn fingerprint(width: u32, height: u32, samples: &[Rgb]) -> u64 {
    let [k0, k1, k2, k3] = FINGERPRINT_SEEDS;
    let mut hasher = RandomState::with_seeds(k0, k1, k2, k3).build_hasher();
    hasher.write_u32(width);
    hasher.write_u32(height);
    for sample in samples {
        hasher.write(&[sample.r, sample.g, sample.b]);
    }
    hasher.finish()
}
