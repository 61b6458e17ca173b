//! Straight-alpha RGBA8 raster operations used to style token images.

pub mod buffer;
pub mod convolve;
pub mod effects;
pub mod kernel;
pub mod ops;
pub(crate) mod sample;

pub use buffer::{PixelBuffer, Rgba8, TRANSPARENT};
pub use convolve::Channel;
pub use kernel::{Kernel, make_gaussian_kernel};
pub use ops::PixelRect;
