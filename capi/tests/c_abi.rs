//! The exported C entry points, called the way a host process would.

use std::ffi::{CString, c_int};
use std::ptr;
use std::slice;

use svgfit_capi::{free_image, get_svg_fit_size, get_svg_nativesize, rasterize_svg_fit};

const WIDE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="300" height="150">
    <rect width="300" height="150" fill="#ff0000"/>
    <rect x="150" width="150" height="150" fill="#00ff00" fill-opacity="0.5"/>
</svg>"##;

const HALF: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="50"/>"#;

/// Rasterize through the C ABI and copy the pixels out.
fn rasterize(src: &str, tw: f32, th: f32, bgra: bool) -> Option<(Vec<u8>, c_int, c_int)> {
    let text = CString::new(src).unwrap();
    let (mut w, mut h) = (-1, -1);
    let ptr = unsafe {
        rasterize_svg_fit(text.as_ptr(), tw, th, &mut w, &mut h, c_int::from(bgra))
    };
    if ptr.is_null() {
        assert_eq!((w, h), (-1, -1), "out-parameters written on failure");
        return None;
    }
    let len = w as usize * h as usize * 4;
    let pixels = unsafe { slice::from_raw_parts(ptr, len) }.to_vec();
    unsafe { free_image(ptr) };
    Some((pixels, w, h))
}

fn fit_size(src: &str, max_w: f32, max_h: f32) -> Option<(c_int, c_int)> {
    let text = CString::new(src).unwrap();
    let (mut w, mut h) = (-1, -1);
    match unsafe { get_svg_fit_size(text.as_ptr(), max_w, max_h, &mut w, &mut h) } {
        1 => Some((w, h)),
        status => {
            assert_eq!(status, 0);
            assert_eq!((w, h), (-1, -1), "out-parameters written on failure");
            None
        }
    }
}

fn native_size(src: &str) -> Option<(c_int, c_int)> {
    let text = CString::new(src).unwrap();
    let (mut w, mut h) = (-1, -1);
    match unsafe { get_svg_nativesize(text.as_ptr(), &mut w, &mut h) } {
        1 => Some((w, h)),
        status => {
            assert_eq!(status, 0);
            assert_eq!((w, h), (-1, -1), "out-parameters written on failure");
            None
        }
    }
}

#[test]
fn rasterize_reports_size_and_length() {
    let (pixels, w, h) = rasterize(WIDE, 100.0, 100.0, false).unwrap();
    assert_eq!((w, h), (100, 50));
    assert_eq!(pixels.len(), 20_000);
    // Left half solid red.
    let i = (25 * w as usize + 10) * 4;
    assert_eq!(&pixels[i..i + 4], &[255, 0, 0, 255]);
}

#[test]
fn bgra_flag_is_inverse_of_swap() {
    let (rgba, ..) = rasterize(WIDE, 100.0, 100.0, false).unwrap();
    let (mut bgra, ..) = rasterize(WIDE, 100.0, 100.0, true).unwrap();
    assert_ne!(rgba, bgra);
    for px in bgra.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
    assert_eq!(rgba, bgra);
}

#[test]
fn fit_size_matches_rasterize() {
    let (_, w, h) = rasterize(WIDE, 77.0, 200.0, false).unwrap();
    assert_eq!(fit_size(WIDE, 77.0, 200.0), Some((w, h)));
}

#[test]
fn fit_size_unbounded_is_native() {
    assert_eq!(fit_size(WIDE, 0.0, 0.0), native_size(WIDE));
    assert_eq!(native_size(WIDE), Some((300, 150)));
}

#[test]
fn fit_size_derives_missing_axis() {
    assert_eq!(fit_size(HALF, 40.0, 0.0), Some((40, 20)));
    assert_eq!(fit_size(HALF, 0.0, 40.0), Some((80, 40)));
}

#[test]
fn malformed_text_fails_all_entry_points() {
    for bad in ["", "plain text", "<svg width=\"10\""] {
        assert!(rasterize(bad, 10.0, 10.0, false).is_none(), "{bad:?}");
        assert!(rasterize(bad, 10.0, 10.0, true).is_none(), "{bad:?}");
        assert_eq!(fit_size(bad, 10.0, 10.0), None, "{bad:?}");
        assert_eq!(native_size(bad), None, "{bad:?}");
    }
}

#[test]
fn null_text_fails() {
    let (mut w, mut h) = (-1, -1);
    unsafe {
        assert!(rasterize_svg_fit(ptr::null(), 10.0, 10.0, &mut w, &mut h, 0).is_null());
        assert_eq!(get_svg_fit_size(ptr::null(), 10.0, 10.0, &mut w, &mut h), 0);
        assert_eq!(get_svg_nativesize(ptr::null(), &mut w, &mut h), 0);
    }
    assert_eq!((w, h), (-1, -1));
}

#[test]
fn zero_target_fails() {
    assert!(rasterize(WIDE, 0.0, 100.0, false).is_none());
    assert!(rasterize(WIDE, 100.0, -5.0, false).is_none());
}

#[test]
fn zero_area_is_null_but_measurable() {
    let thin = r#"<svg xmlns="http://www.w3.org/2000/svg" width="1000" height="6"/>"#;
    assert!(rasterize(thin, 100.0, 100.0, false).is_none());
    assert_eq!(fit_size(thin, 100.0, 100.0), Some((100, 0)));
}

#[test]
fn free_null_is_noop() {
    unsafe { free_image(ptr::null_mut()) };
}

#[test]
fn concurrent_first_use() {
    let handles: Vec<_> = (0..8)
        .map(|i| {
            std::thread::spawn(move || {
                let (pixels, w, h) = rasterize(WIDE, 50.0 + i as f32, 100.0, i % 2 == 1).unwrap();
                assert_eq!(pixels.len(), w as usize * h as usize * 4);
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
}
