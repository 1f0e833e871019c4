//! Media normalization
//!
//! Stateless helpers that turn exotic image formats into common raster files
//! and measure pixel dimensions. None of these functions fail loudly: a
//! conversion that cannot be performed leaves no output file behind, and a
//! probe that cannot decode returns `None`. Callers branch on existence.
//!
//! Everything here is CPU-bound and blocking; async callers should run it on
//! the blocking pool.

mod convert;
mod probe;

pub use convert::{convert_svg_to_raster, convert_to_raster, DEFAULT_SVG_HEIGHT, DEFAULT_SVG_WIDTH};
pub use probe::{probe_dimensions, probe_dimensions_from_bytes};

/// Pixel dimensions of a decoded image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// Minimum accepted image size; both dimensions must be met
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinSize {
    pub width: u32,
    pub height: u32,
}

impl MinSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Builds a minimum size from optional config values
    ///
    /// Returns None unless both dimensions are present.
    pub fn from_parts(width: Option<u32>, height: Option<u32>) -> Option<Self> {
        match (width, height) {
            (Some(width), Some(height)) => Some(Self { width, height }),
            _ => None,
        }
    }

    /// Returns true if the image is at least this large in both dimensions
    pub fn admits(&self, dims: Dimensions) -> bool {
        dims.width >= self.width && dims.height >= self.height
    }
}

/// Applies an optional minimum-size filter to an optional probe result
///
/// No filter admits everything, including images that could not be probed.
/// With a filter, an unprobeable image is rejected.
pub fn passes_size_filter(dims: Option<Dimensions>, min_size: Option<MinSize>) -> bool {
    match min_size {
        None => true,
        Some(min) => dims.map(|d| min.admits(d)).unwrap_or(false),
    }
}
