//! C bindings for `svgfit`.
//!
//! Flat `extern "C"` entry points for a host process. Every function
//! reports failure with a sentinel (null pointer or `0`) and leaves its
//! out-parameters untouched; panics never unwind into the caller.
//!
//! A single [`Rasterizer`] with default options (96 DPI) is created on
//! first use and shared by all calls. Initialization is synchronized, so
//! concurrent calls from several threads are allowed.

use std::ffi::{CStr, c_char, c_int};
use std::panic::{self, AssertUnwindSafe};
use std::ptr::{self, NonNull};
use std::sync::OnceLock;

use svgfit::{AllocError, ChannelOrder, RasterError, Rasterizer, Size};

static RASTERIZER: OnceLock<Rasterizer> = OnceLock::new();

fn rasterizer() -> &'static Rasterizer {
    RASTERIZER.get_or_init(Rasterizer::new)
}

/// Fits an SVG into `target_w × target_h` and rasterizes it.
///
/// Returns a `width * height * 4` byte buffer, row stride `width * 4`,
/// straight (non-premultiplied) alpha. Channel order is RGBA, or BGRA
/// when `convert_to_bgra` is non-zero. The buffer must be released with
/// [`free_image`].
///
/// On success `*out_w` and `*out_h` receive the pixel size. On failure
/// (null or non-UTF-8 text, unparseable SVG, non-positive target, empty
/// output, allocation failure) returns NULL and writes nothing.
///
/// # Safety
///
/// `svg_text` must be NULL or a NUL-terminated string. `out_w` and `out_h`
/// must be NULL or valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rasterize_svg_fit(
    svg_text: *const c_char,
    target_w: f32,
    target_h: f32,
    out_w: *mut c_int,
    out_h: *mut c_int,
    convert_to_bgra: c_int,
) -> *mut u8 {
    if out_w.is_null() || out_h.is_null() {
        return ptr::null_mut();
    }
    let Some(source) = (unsafe { source_text(svg_text) }) else {
        return ptr::null_mut();
    };
    let order = ChannelOrder::from_flag(convert_to_bgra);

    let exported = guarded("rasterize_svg_fit", || {
        export_fit(source, target_w, target_h, order)
    });
    match exported {
        Some((buffer, (w, h))) => {
            unsafe {
                out_w.write(w);
                out_h.write(h);
            }
            buffer.into_raw()
        }
        None => ptr::null_mut(),
    }
}

/// Releases a buffer returned by [`rasterize_svg_fit`]. NULL is ignored.
///
/// # Safety
///
/// `ptr` must be NULL or a pointer returned by [`rasterize_svg_fit`] that
/// has not been released yet. Releasing twice, or releasing a pointer from
/// anywhere else, is undefined behavior.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_image(ptr: *mut u8) {
    if !ptr.is_null() {
        unsafe { libc::free(ptr.cast()) };
    }
}

/// Computes the size [`rasterize_svg_fit`] would produce, without
/// rendering.
///
/// A bound `<= 0` leaves that axis unconstrained (derived from the aspect
/// ratio). With both bounds `<= 0` the native size is returned, rounded
/// to nearest rather than truncated.
///
/// Returns 1 on success, 0 on failure (out-parameters untouched).
///
/// # Safety
///
/// Same contract as [`rasterize_svg_fit`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn get_svg_fit_size(
    svg_text: *const c_char,
    max_w: f32,
    max_h: f32,
    out_w: *mut c_int,
    out_h: *mut c_int,
) -> c_int {
    let Some(source) = (unsafe { source_text(svg_text) }) else {
        return 0;
    };
    let size = guarded("get_svg_fit_size", || {
        rasterizer().measure_fit(source, max_w, max_h)
    });
    unsafe { write_size(size, out_w, out_h) }
}

/// Reports the unscaled size of an SVG, rounded to nearest.
///
/// Returns 1 on success, 0 on failure (out-parameters untouched).
///
/// # Safety
///
/// Same contract as [`rasterize_svg_fit`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn get_svg_nativesize(
    svg_text: *const c_char,
    out_w: *mut c_int,
    out_h: *mut c_int,
) -> c_int {
    let Some(source) = (unsafe { source_text(svg_text) }) else {
        return 0;
    };
    let size = guarded("get_svg_nativesize", || rasterizer().measure_native(source));
    unsafe { write_size(size, out_w, out_h) }
}

/// Installs a logger that prints warnings and errors to stderr.
///
/// Does nothing if a logger is already installed.
#[unsafe(no_mangle)]
pub extern "C" fn svgfit_init_log() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Warn);
    }
}

// ============================================================================
// Marshaling
// ============================================================================

/// Zeroed `malloc`-family block, freed on drop unless handed to the caller.
struct CBuffer {
    ptr: NonNull<u8>,
    len: usize,
}

impl CBuffer {
    fn calloc(len: usize) -> Result<Self, AllocError> {
        // calloc(0) may legally return NULL or a unique pointer; never ask.
        if len == 0 {
            return Err(AllocError { len });
        }
        let raw = unsafe { libc::calloc(len, 1) }.cast::<u8>();
        NonNull::new(raw)
            .map(|ptr| Self { ptr, len })
            .ok_or(AllocError { len })
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    fn into_raw(self) -> *mut u8 {
        let ptr = self.ptr.as_ptr();
        std::mem::forget(self);
        ptr
    }
}

impl Drop for CBuffer {
    fn drop(&mut self) {
        unsafe { libc::free(self.ptr.as_ptr().cast()) };
    }
}

/// Parse, plan, allocate, render. The buffer exists before any pixel is
/// written and is freed if anything after allocation fails.
fn export_fit(
    source: &str,
    target_w: f32,
    target_h: f32,
    order: ChannelOrder,
) -> Result<(CBuffer, (c_int, c_int)), RasterError> {
    let rasterizer = rasterizer();
    let doc = rasterizer.parse(source)?;
    let plan = rasterizer.plan(&doc, target_w, target_h)?;
    let dims = c_dims(plan.size).ok_or(RasterError::EmptyOutput(plan.size))?;

    let mut buffer = CBuffer::calloc(plan.size.byte_len()).inspect_err(|e| log::warn!("{e}"))?;
    rasterizer.render_into(&doc, &plan, buffer.as_mut_slice(), order)?;
    Ok((buffer, dims))
}

/// Run `f`, converting errors and panics into `None`.
fn guarded<T>(entry: &str, f: impl FnOnce() -> Result<T, RasterError>) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            log::debug!("{entry}: {e}");
            None
        }
        Err(_) => {
            log::warn!("{entry}: rasterizer panicked");
            None
        }
    }
}

/// Borrow a C string as UTF-8. NULL and invalid UTF-8 give `None`.
///
/// # Safety
///
/// `text` must be NULL or point to a NUL-terminated string that outlives
/// the returned borrow.
unsafe fn source_text<'a>(text: *const c_char) -> Option<&'a str> {
    if text.is_null() {
        log::debug!("SVG text is NULL");
        return None;
    }
    let text = unsafe { CStr::from_ptr(text) };
    match text.to_str() {
        Ok(s) => Some(s),
        Err(_) => {
            log::debug!("{}", RasterError::InvalidUtf8);
            None
        }
    }
}

fn c_dims(size: Size) -> Option<(c_int, c_int)> {
    Some((
        c_int::try_from(size.width).ok()?,
        c_int::try_from(size.height).ok()?,
    ))
}

/// Write a measured size through the out-parameters. Returns the C status.
///
/// # Safety
///
/// `out_w` and `out_h` must be NULL or valid for writes.
unsafe fn write_size(size: Option<Size>, out_w: *mut c_int, out_h: *mut c_int) -> c_int {
    if out_w.is_null() || out_h.is_null() {
        return 0;
    }
    let Some((w, h)) = size.and_then(c_dims) else {
        return 0;
    };
    unsafe {
        out_w.write(w);
        out_h.write(h);
    }
    1
}

static LOGGER: StderrLogger = StderrLogger;

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::LevelFilter::Warn
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let target = if record.target().is_empty() {
            record.module_path().unwrap_or_default()
        } else {
            record.target()
        };
        eprintln!(
            "{} (in {}:{}): {}",
            record.level(),
            target,
            record.line().unwrap_or(0),
            record.args()
        );
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    const WIDE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="300" height="150">
        <rect width="300" height="150" fill="#ff0000"/>
    </svg>"##;

    #[test]
    fn calloc_zero_is_refused() {
        assert!(CBuffer::calloc(0).is_err());
    }

    #[test]
    fn calloc_is_zeroed() {
        let mut buf = CBuffer::calloc(64).unwrap();
        assert!(buf.as_mut_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn dims_reject_overflow() {
        assert_eq!(c_dims(Size::new(3, 4)), Some((3, 4)));
        assert_eq!(c_dims(Size::new(u32::MAX, 4)), None);
    }

    #[test]
    fn guarded_swallows_panics() {
        let r: Option<()> = guarded("test", || panic!("boom"));
        assert!(r.is_none());
    }

    #[test]
    fn null_out_params_fail() {
        let text = CString::new(WIDE).unwrap();
        let mut w = -1;
        unsafe {
            assert!(
                rasterize_svg_fit(text.as_ptr(), 10.0, 10.0, &mut w, ptr::null_mut(), 0)
                    .is_null()
            );
            assert_eq!(
                get_svg_nativesize(text.as_ptr(), ptr::null_mut(), &mut w),
                0
            );
        }
        assert_eq!(w, -1);
    }

    #[test]
    fn invalid_utf8_fails() {
        let text = CString::new(vec![0xffu8, 0xfe, b'<']).unwrap();
        let (mut w, mut h) = (-1, -1);
        let ok = unsafe { get_svg_nativesize(text.as_ptr(), &mut w, &mut h) };
        assert_eq!(ok, 0);
        assert_eq!((w, h), (-1, -1));
    }
}
