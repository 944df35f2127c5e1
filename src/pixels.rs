//! Packed RGBA8 pixel buffers and channel reordering.
//!
//! Buffers are row-major, four bytes per pixel, stride `width * 4`,
//! non-premultiplied alpha.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::fit::{BYTES_PER_PIXEL, Size};

/// Byte order of the four components of one pixel.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChannelOrder {
    /// `[R, G, B, A]`.
    #[default]
    Rgba,
    /// `[B, G, R, A]`, the layout most Windows bitmap APIs expect.
    Bgra,
}

impl ChannelOrder {
    /// Map a C-style boolean flag: zero is RGBA, anything else BGRA.
    pub const fn from_flag(convert_to_bgra: i32) -> Self {
        if convert_to_bgra != 0 { Self::Bgra } else { Self::Rgba }
    }
}

/// Swap bytes 0 and 2 of every pixel in place.
///
/// Green and alpha are untouched. Each pixel is independent of every
/// other, and applying the swap twice restores the input. Trailing bytes
/// that do not form a whole pixel are left alone.
pub fn swap_red_blue(data: &mut [u8]) {
    for px in data.chunks_exact_mut(BYTES_PER_PIXEL) {
        px.swap(0, 2);
    }
}

/// Zeroed buffer could not be allocated.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("could not allocate {len} bytes for pixel buffer")]
pub struct AllocError {
    /// Requested length in bytes.
    pub len: usize,
}

/// Owned packed RGBA8 (or BGRA8) pixel buffer.
///
/// `data().len() == width * height * 4` always holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    data: Vec<u8>,
    size: Size,
    order: ChannelOrder,
}

impl PixelBuffer {
    /// Allocate a zero-filled buffer (transparent black).
    ///
    /// Allocation is fallible: an oversized request reports [`AllocError`]
    /// instead of aborting the process.
    pub fn zeroed(size: Size, order: ChannelOrder) -> Result<Self, AllocError> {
        let len = size.byte_len();
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|_| AllocError { len })?;
        data.resize(len, 0);
        Ok(Self { data, size, order })
    }

    /// Pixel dimensions.
    pub fn size(&self) -> Size {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.size.stride()
    }

    /// Current byte order of each pixel.
    pub fn channel_order(&self) -> ChannelOrder {
        self.order
    }

    /// Raw bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Raw bytes, mutable. Byte order stays as reported by
    /// [`channel_order`](Self::channel_order).
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Give up ownership of the bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// The four bytes of pixel `(x, y)` in the buffer's channel order.
    ///
    /// Returns `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let i = y as usize * self.stride() + x as usize * BYTES_PER_PIXEL;
        let px = self.data.get(i..i + BYTES_PER_PIXEL)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Reorder channels in place to `order`. No-op when already there.
    pub fn convert_to(&mut self, order: ChannelOrder) {
        if self.order != order {
            swap_red_blue(&mut self.data);
            self.order = order;
        }
    }
}
