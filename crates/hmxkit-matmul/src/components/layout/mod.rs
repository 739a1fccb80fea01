//! Conversions between flat matrices and hardware tile images.

mod image;
mod matrix;
mod tile;

pub use image::*;
pub use matrix::*;
pub use tile::*;
