//! Fit-and-rasterize service.
//!
//! Parses SVG source text with `usvg`, fits it into a target box with
//! [`crate::fit`], and renders it with `resvg` into a packed,
//! non-premultiplied RGBA8 (or BGRA8) buffer.
//!
//! # Example
//!
//! ```
//! use svgfit::{ChannelOrder, FitRequest, Rasterizer, Size};
//!
//! let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="300" height="150">
//!     <rect width="300" height="150" fill="red"/>
//! </svg>"#;
//!
//! let rasterizer = Rasterizer::new();
//! let image = rasterizer
//!     .rasterize_fit(&FitRequest::new(svg, 100.0, 100.0).channel_order(ChannelOrder::Bgra))
//!     .unwrap();
//!
//! assert_eq!(image.size(), Size::new(100, 50));
//! assert_eq!(image.data().len(), 100 * 50 * 4);
//! assert_eq!(image.pixel(50, 25), Some([0, 0, 255, 255]));
//! ```

use core::fmt;

use resvg::{tiny_skia, usvg};

use crate::fit::{self, FitError, FitPlan, NativeSize, Size};
use crate::pixels::{AllocError, ChannelOrder, PixelBuffer, swap_red_blue};

/// Resolution assumed for absolute units in the source (`in`, `cm`, `pt`…).
pub const DEFAULT_DPI: f32 = 96.0;

/// Rasterization error.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    /// Source text did not yield a vector image.
    #[error("failed to parse SVG: {0}")]
    Parse(#[from] usvg::Error),
    /// Source bytes were not valid UTF-8.
    #[error("SVG source is not valid UTF-8")]
    InvalidUtf8,
    /// Fit geometry rejected the native size or the target box.
    #[error(transparent)]
    Fit(#[from] FitError),
    /// Fitted size truncates to zero pixels on at least one axis.
    #[error("fitted size {}x{} has no pixels", .0.width, .0.height)]
    EmptyOutput(Size),
    /// Caller-provided buffer does not match the planned size.
    #[error("pixel buffer is {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
    /// Output buffer could not be obtained.
    #[error(transparent)]
    Allocation(#[from] AllocError),
}

/// Coarse classification of a [`RasterError`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input text.
    Parse,
    /// Unusable geometry: bad target box, empty output, wrong buffer size.
    Geometry,
    /// Resource exhaustion.
    Allocation,
}

impl RasterError {
    /// Tell "bad input" apart from "resource exhaustion".
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse(_) | Self::InvalidUtf8 => ErrorKind::Parse,
            Self::Fit(FitError::ZeroSourceDimension) => ErrorKind::Parse,
            Self::Fit(FitError::InvalidTarget)
            | Self::EmptyOutput(_)
            | Self::BufferSize { .. } => ErrorKind::Geometry,
            Self::Allocation(_) => ErrorKind::Allocation,
        }
    }
}

/// Engine configuration for a [`Rasterizer`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RasterOptions {
    /// Resolution for absolute units. Unitless lengths are always px.
    pub dpi: f32,
    /// Anti-alias shapes that do not set `shape-rendering` themselves.
    pub anti_alias: bool,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            anti_alias: true,
        }
    }
}

impl RasterOptions {
    /// Set the resolution for absolute units.
    pub fn dpi(mut self, dpi: f32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Enable or disable default anti-aliasing.
    pub fn anti_alias(mut self, anti_alias: bool) -> Self {
        self.anti_alias = anti_alias;
        self
    }

    fn to_usvg(self) -> usvg::Options<'static> {
        #[allow(unused_mut)]
        let mut options = usvg::Options {
            dpi: self.dpi,
            shape_rendering: if self.anti_alias {
                usvg::ShapeRendering::GeometricPrecision
            } else {
                usvg::ShapeRendering::CrispEdges
            },
            ..usvg::Options::default()
        };
        #[cfg(feature = "text")]
        options.fontdb_mut().load_system_fonts();
        options
    }
}

/// One fit-and-rasterize call.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FitRequest<'a> {
    /// SVG source text.
    pub source: &'a str,
    /// Target box width in pixels.
    pub target_width: f32,
    /// Target box height in pixels.
    pub target_height: f32,
    /// Byte order of the returned pixels.
    pub channel_order: ChannelOrder,
}

impl<'a> FitRequest<'a> {
    /// Fit `source` into `target_width × target_height`, RGBA output.
    pub fn new(source: &'a str, target_width: f32, target_height: f32) -> Self {
        Self {
            source,
            target_width,
            target_height,
            channel_order: ChannelOrder::Rgba,
        }
    }

    /// Set the output byte order.
    pub fn channel_order(mut self, order: ChannelOrder) -> Self {
        self.channel_order = order;
        self
    }
}

/// A parsed vector image.
///
/// Lives only as long as the caller keeps it; never exposed across the
/// C boundary.
pub struct SvgDocument {
    tree: usvg::Tree,
}

impl SvgDocument {
    /// Unscaled size in px.
    pub fn native_size(&self) -> NativeSize {
        let size = self.tree.size();
        NativeSize::new(size.width(), size.height())
    }
}

impl fmt::Debug for SvgDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SvgDocument")
            .field("native_size", &self.native_size())
            .finish()
    }
}

/// Fit-and-rasterize service.
///
/// Owns the engine configuration. Holds no per-call state, so a single
/// instance can be shared by reference between threads.
pub struct Rasterizer {
    options: usvg::Options<'static>,
    config: RasterOptions,
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Rasterizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rasterizer")
            .field("options", &self.config)
            .finish_non_exhaustive()
    }
}

impl Rasterizer {
    /// Rasterizer with default options (96 DPI, anti-aliased).
    pub fn new() -> Self {
        Self::with_options(RasterOptions::default())
    }

    /// Rasterizer with explicit options.
    pub fn with_options(config: RasterOptions) -> Self {
        Self {
            options: config.to_usvg(),
            config,
        }
    }

    /// Options this rasterizer was built with.
    pub fn options(&self) -> &RasterOptions {
        &self.config
    }

    /// Parse SVG source text.
    pub fn parse(&self, source: &str) -> Result<SvgDocument, RasterError> {
        let tree = usvg::Tree::from_str(source, &self.options)?;
        let doc = SvgDocument { tree };
        log::debug!("parsed SVG, native size {:?}", doc.native_size());
        Ok(doc)
    }

    /// Parse raw SVG bytes. Must be UTF-8.
    pub fn parse_bytes(&self, source: &[u8]) -> Result<SvgDocument, RasterError> {
        let source = core::str::from_utf8(source).map_err(|_| RasterError::InvalidUtf8)?;
        self.parse(source)
    }

    /// Fit the image into the request's box and rasterize it.
    ///
    /// The returned buffer is `trunc(native * scale)` pixels on each axis,
    /// where `scale` is the largest uniform scale that fits the box. When
    /// an axis truncates to zero the buffer is empty and nothing is rendered;
    /// the size still matches [`measure_fit`](Self::measure_fit).
    pub fn rasterize_fit(&self, request: &FitRequest<'_>) -> Result<PixelBuffer, RasterError> {
        let doc = self.parse(request.source)?;
        let plan = fit::plan_fit(doc.native_size(), request.target_width, request.target_height)?;

        let mut buffer = PixelBuffer::zeroed(plan.size, request.channel_order)
            .inspect_err(|e| log::warn!("{e}"))?;
        if plan.size.is_empty() {
            log::debug!("fitted size {:?} has no pixels, skipping render", plan.size);
            return Ok(buffer);
        }
        self.render_into(&doc, &plan, buffer.data_mut(), request.channel_order)?;
        Ok(buffer)
    }

    /// Fit plan for a parsed document, rejecting plans with no pixels.
    pub fn plan(
        &self,
        doc: &SvgDocument,
        target_width: f32,
        target_height: f32,
    ) -> Result<FitPlan, RasterError> {
        let plan = fit::plan_fit(doc.native_size(), target_width, target_height)?;
        log::debug!(
            "fit {:?} into {}x{}: scale {}, output {}x{}",
            doc.native_size(),
            target_width,
            target_height,
            plan.scale,
            plan.size.width,
            plan.size.height
        );
        if plan.size.is_empty() {
            return Err(RasterError::EmptyOutput(plan.size));
        }
        Ok(plan)
    }

    /// Render `doc` at `plan.scale` into a caller-provided buffer.
    ///
    /// `buffer` must be exactly `plan.size.byte_len()` bytes and zeroed.
    /// Output is non-premultiplied, in `order`, origin at (0, 0).
    pub fn render_into(
        &self,
        doc: &SvgDocument,
        plan: &FitPlan,
        buffer: &mut [u8],
        order: ChannelOrder,
    ) -> Result<(), RasterError> {
        let expected = plan.size.byte_len();
        if buffer.len() != expected {
            return Err(RasterError::BufferSize {
                expected,
                actual: buffer.len(),
            });
        }

        {
            let mut pixmap =
                tiny_skia::PixmapMut::from_bytes(buffer, plan.size.width, plan.size.height)
                    .ok_or(RasterError::EmptyOutput(plan.size))?;
            resvg::render(
                &doc.tree,
                tiny_skia::Transform::from_scale(plan.scale, plan.scale),
                &mut pixmap,
            );
        }

        demultiply(buffer);
        if order == ChannelOrder::Bgra {
            swap_red_blue(buffer);
        }
        Ok(())
    }

    /// Size-only fit query. A bound `<= 0` leaves that axis unconstrained.
    pub fn measure_fit(&self, source: &str, max_w: f32, max_h: f32) -> Result<Size, RasterError> {
        let doc = self.parse(source)?;
        Ok(fit::measure_fit(doc.native_size(), max_w, max_h)?)
    }

    /// Unscaled size, rounded to nearest.
    pub fn measure_native(&self, source: &str) -> Result<Size, RasterError> {
        let doc = self.parse(source)?;
        Ok(fit::native_rounded(doc.native_size()))
    }
}

/// Convert premultiplied RGBA8 to straight alpha in place.
fn demultiply(buffer: &mut [u8]) {
    for px in buffer.chunks_exact_mut(4) {
        let alpha = px[3];
        if alpha == 0 || alpha == u8::MAX {
            continue;
        }
        if let Some(c) = tiny_skia::PremultipliedColorU8::from_rgba(px[0], px[1], px[2], alpha) {
            let c = c.demultiply();
            px[0] = c.red();
            px[1] = c.green();
            px[2] = c.blue();
        }
    }
}
