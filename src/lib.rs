//! Fit an SVG into a bounding box and rasterize it to a packed RGBA8 buffer.
//!
//! The geometry is pure and `no_std` compatible; parsing and rendering are
//! delegated to `usvg` and `resvg`. The C ABI for host processes lives in
//! the `svgfit-capi` crate.
//!
//! # Modules
//!
//! - [`fit`] — Fit scale, truncated output size, measure rules
//! - [`pixels`] — Channel order, owned pixel buffers, red/blue swap
//! - [`raster`] — Parse, fit, and rasterize service (`render` feature)

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

#[cfg(all(feature = "alloc", not(feature = "std")))]
extern crate alloc;

pub mod fit;
#[cfg(feature = "alloc")]
pub mod pixels;
#[cfg(feature = "render")]
pub mod raster;

// Re-exports: core types from fit module
pub use fit::{FitError, FitPlan, NativeSize, Size};
#[cfg(feature = "alloc")]
pub use pixels::{AllocError, ChannelOrder, PixelBuffer};
#[cfg(feature = "render")]
pub use raster::{ErrorKind, FitRequest, RasterError, RasterOptions, Rasterizer, SvgDocument};
