//! Raster Buffers - RGBA pixel data and the rasterizer seam
//!
//! A `RasterBuffer` always holds exactly `width * height * 4` bytes of
//! straight (non-premultiplied) RGBA.

use thiserror::Error;

pub const BYTES_PER_PIXEL: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RasterError {
    #[error("Buffer is {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    LengthMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Buffer dimensions must be non-zero, got {0}x{1}")]
    ZeroSized(u32, u32),

    #[error("Cannot place {src_width}x{src_height} at ({x}, {y}) inside {dst_width}x{dst_height}")]
    OutOfBounds {
        x: u32,
        y: u32,
        src_width: u32,
        src_height: u32,
        dst_width: u32,
        dst_height: u32,
    },

    #[error("Icon size {size} at {pixel_ratio}x overflows the output size")]
    SizeOverflow { size: u32, pixel_ratio: u32 },

    #[error("Rasterization failed: {0}")]
    Rasterization(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RasterBuffer {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::ZeroSized(width, height));
        }
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if data.len() != expected {
            return Err(RasterError::LengthMismatch {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    /// Fully transparent buffer. Zero dimensions are bumped to 1.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0, 0, 0, 0])
    }

    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let data = rgba.repeat(width as usize * height as usize);
        Self { width, height, data }
    }

    /// Black buffer whose alpha channel is `alphas`, one byte per pixel.
    ///
    /// Callers pass dimensions taken from an existing buffer, so they are
    /// already non-zero and `alphas` has one entry per pixel.
    pub(crate) fn from_alphas(width: u32, height: u32, alphas: impl IntoIterator<Item = u8>) -> Self {
        let data: Vec<u8> = alphas.into_iter().flat_map(|a| [0, 0, 0, a]).collect();
        debug_assert_eq!(data.len(), width as usize * height as usize * BYTES_PER_PIXEL);
        Self { width, height, data }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = y as usize * self.stride() + x as usize * BYTES_PER_PIXEL;
        Some([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    pub fn alpha(&self, x: u32, y: u32) -> Option<u8> {
        self.pixel(x, y).map(|p| p[3])
    }

    /// Iterate alpha values in row-major order.
    pub fn alphas(&self) -> impl Iterator<Item = u8> + '_ {
        self.data.chunks_exact(BYTES_PER_PIXEL).map(|p| p[3])
    }

    /// Copy `src` verbatim into this buffer with its top-left corner at (x, y).
    ///
    /// Destination pixels are overwritten, never blended.
    pub fn blit(&mut self, src: &RasterBuffer, x: u32, y: u32) -> Result<(), RasterError> {
        let fits_x = x.checked_add(src.width).map_or(false, |r| r <= self.width);
        let fits_y = y.checked_add(src.height).map_or(false, |b| b <= self.height);
        if !fits_x || !fits_y {
            return Err(RasterError::OutOfBounds {
                x,
                y,
                src_width: src.width,
                src_height: src.height,
                dst_width: self.width,
                dst_height: self.height,
            });
        }

        let dst_stride = self.stride();
        let src_stride = src.stride();
        let col = x as usize * BYTES_PER_PIXEL;
        for row in 0..src.height as usize {
            let dst_start = (y as usize + row) * dst_stride + col;
            let src_start = row * src_stride;
            self.data[dst_start..dst_start + src_stride]
                .copy_from_slice(&src.data[src_start..src_start + src_stride]);
        }
        Ok(())
    }
}

/// Converts a vector source into pixels at a requested square size.
///
/// Implementations must be shareable across worker threads.
pub trait Rasterizer: Sync {
    fn rasterize(&self, source: &str, output_size: u32) -> Result<RasterBuffer, RasterError>;
}

impl<F> Rasterizer for F
where
    F: Fn(&str, u32) -> Result<RasterBuffer, RasterError> + Sync,
{
    fn rasterize(&self, source: &str, output_size: u32) -> Result<RasterBuffer, RasterError> {
        self(source, output_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_bad_length() {
        let err = RasterBuffer::new(2, 2, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            RasterError::LengthMismatch { width: 2, height: 2, expected: 16, actual: 15 }
        );
    }

    #[test]
    fn test_new_rejects_zero_dims() {
        assert_eq!(
            RasterBuffer::new(0, 3, vec![]).unwrap_err(),
            RasterError::ZeroSized(0, 3)
        );
    }

    #[test]
    fn test_blit_copies_verbatim() {
        let mut canvas = RasterBuffer::transparent(4, 3);
        let tile = RasterBuffer::filled(2, 2, [10, 20, 30, 128]);
        canvas.blit(&tile, 1, 1).unwrap();

        assert_eq!(canvas.pixel(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(canvas.pixel(1, 1), Some([10, 20, 30, 128]));
        assert_eq!(canvas.pixel(2, 2), Some([10, 20, 30, 128]));
        assert_eq!(canvas.pixel(3, 2), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_blit_out_of_bounds() {
        let mut canvas = RasterBuffer::transparent(3, 3);
        let tile = RasterBuffer::filled(2, 2, [255; 4]);
        assert!(matches!(
            canvas.blit(&tile, 2, 0),
            Err(RasterError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_from_alphas_layout() {
        let buf = RasterBuffer::from_alphas(2, 1, [7, 200]);
        assert_eq!(buf.data(), &[0, 0, 0, 7, 0, 0, 0, 200]);
        assert_eq!(buf.alphas().collect::<Vec<_>>(), [7, 200]);
    }

    #[test]
    fn test_closure_rasterizer() {
        let raster = |_: &str, size: u32| -> Result<RasterBuffer, RasterError> {
            Ok(RasterBuffer::filled(size, size, [0, 0, 0, 255]))
        };
        let buf = raster.rasterize("<svg/>", 3).unwrap();
        assert_eq!((buf.width(), buf.height()), (3, 3));
    }
}
