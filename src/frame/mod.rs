mod image;
mod sink;

pub use image::*;
pub use sink::*;
