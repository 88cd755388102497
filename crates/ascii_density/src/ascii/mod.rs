pub mod charset;
pub mod font;
pub mod grid;
pub mod matcher;
