//! Fit geometry: map a vector image's native size into a target box.
//!
//! Pure arithmetic — no parsing, no pixel operations, no allocations,
//! `no_std` compatible. All math is single precision so output pixel
//! counts match what a `float`-based engine would produce.
//!
//! Two sizing rules live here and are deliberately not unified:
//!
//! - Fitted sizes are **truncated** toward zero ([`plan_fit`], and the
//!   bounded paths of [`measure_fit`]).
//! - Native sizes are **rounded** to nearest ([`native_rounded`], and the
//!   unbounded path of [`measure_fit`]).
//!
//! # Example
//!
//! ```
//! use svgfit::fit::{NativeSize, Size, plan_fit};
//!
//! let plan = plan_fit(NativeSize::new(300.0, 150.0), 100.0, 100.0).unwrap();
//! assert_eq!(plan.size, Size::new(100, 50));
//! assert_eq!(plan.size.byte_len(), 20_000);
//! ```

use num_traits::Float;

/// Bytes per packed RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Width × height dimensions in pixels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Create a new size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either axis is zero.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Row stride of a packed RGBA8 buffer of this size.
    pub const fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Length in bytes of a packed RGBA8 buffer of this size.
    ///
    /// Saturates instead of overflowing; a saturated length can never be
    /// allocated, so the caller sees an allocation failure.
    pub const fn byte_len(&self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(BYTES_PER_PIXEL)
    }
}

/// Unscaled size of a parsed vector image, in px at the parse DPI.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NativeSize {
    /// Width in px.
    pub width: f32,
    /// Height in px.
    pub height: f32,
}

impl NativeSize {
    /// Create a new native size.
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    fn validate(self) -> Result<Self, FitError> {
        if is_positive(self.width) && is_positive(self.height) {
            Ok(self)
        } else {
            Err(FitError::ZeroSourceDimension)
        }
    }
}

/// Uniform scale and the truncated output size it produces.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FitPlan {
    /// Uniform scale applied to both axes.
    pub scale: f32,
    /// Output pixel dimensions, `trunc(native * scale)` per axis.
    pub size: Size,
}

/// Fit geometry error.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FitError {
    /// Native width or height is zero, negative, or not finite.
    #[error("source image has no usable width or height")]
    ZeroSourceDimension,
    /// Target width or height is zero, negative, or not finite.
    #[error("target width and height must be finite and positive")]
    InvalidTarget,
}

/// Largest uniform scale at which `native` fits inside `target_w × target_h`.
///
/// Neither axis is allowed to exceed its target; the other may fall short.
pub fn fit_scale(native: NativeSize, target_w: f32, target_h: f32) -> Result<f32, FitError> {
    let native = native.validate()?;
    if !is_positive(target_w) || !is_positive(target_h) {
        return Err(FitError::InvalidTarget);
    }
    let scale_x = target_w / native.width;
    let scale_y = target_h / native.height;
    Ok(if scale_x < scale_y { scale_x } else { scale_y })
}

/// Fit scale plus the truncated output size.
///
/// The size may be empty on one axis for extreme aspect ratios
/// (e.g. 1000×1 into 100×100); callers that allocate must check.
pub fn plan_fit(native: NativeSize, target_w: f32, target_h: f32) -> Result<FitPlan, FitError> {
    let scale = fit_scale(native, target_w, target_h)?;
    Ok(FitPlan {
        scale,
        size: Size::new(
            truncate(native.width * scale),
            truncate(native.height * scale),
        ),
    })
}

/// Size-only fit query with optional unbounded axes.
///
/// - Both bounds `<= 0`: native size, rounded to nearest.
/// - One bound `<= 0`: that axis is derived from the other through the
///   native aspect ratio, then fitted (truncated).
/// - Both bounds positive: fitted (truncated), same as [`plan_fit`].
pub fn measure_fit(native: NativeSize, max_w: f32, max_h: f32) -> Result<Size, FitError> {
    let native = native.validate()?;
    if max_w.is_nan() || max_h.is_nan() {
        return Err(FitError::InvalidTarget);
    }

    if max_w <= 0.0 && max_h <= 0.0 {
        return Ok(native_rounded(native));
    }

    let mut max_w = max_w;
    let mut max_h = max_h;
    if max_w <= 0.0 {
        max_w = max_h * (native.width / native.height);
    }
    if max_h <= 0.0 {
        max_h = max_w * (native.height / native.width);
    }

    Ok(plan_fit(native, max_w, max_h)?.size)
}

/// Native size rounded half away from zero.
pub fn native_rounded(native: NativeSize) -> Size {
    Size::new(
        truncate(Float::round(native.width)),
        truncate(Float::round(native.height)),
    )
}

// ============================================================================
// Internal arithmetic
// ============================================================================

fn is_positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

/// Truncate toward zero. Saturating: negatives and NaN become 0,
/// values past `u32::MAX` clamp.
fn truncate(v: f32) -> u32 {
    Float::trunc(v) as u32
}
