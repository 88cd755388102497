pub mod grid;
pub mod loader;
pub mod luminance;
pub mod tiler;
