// Core types: the BGRA frame the caller owns, the rectangles a detector hands
// us, and the clamped pixel regions the compositor actually works on.

use crate::error::{Error, Result};

/// Bytes per pixel of the only supported format (BGRA, 8 bits per channel).
pub const BYTES_PER_PIXEL: usize = 4;

/// A BGRA frame in row-major order.
///
/// `stride` is the number of bytes per row and may be larger than
/// `width * 4` (camera buffers are often padded). Frames produced by the
/// compositor are always tightly packed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    stride: usize,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap an existing buffer. The last row only needs `width * 4` bytes,
    /// so a buffer without trailing padding is accepted.
    pub fn new(width: usize, height: usize, stride: usize, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidFrame(format!("zero-sized frame {width}x{height}")));
        }
        let row_bytes = width
            .checked_mul(BYTES_PER_PIXEL)
            .ok_or_else(|| Error::InvalidFrame(format!("width {width} overflows")))?;
        if stride < row_bytes {
            return Err(Error::InvalidFrame(format!(
                "stride {stride} is shorter than a {width}-pixel row ({row_bytes} bytes)"
            )));
        }
        let needed = stride
            .checked_mul(height - 1)
            .and_then(|n| n.checked_add(row_bytes))
            .ok_or_else(|| Error::InvalidFrame(format!("{width}x{height} overflows")))?;
        if data.len() < needed {
            return Err(Error::InvalidFrame(format!(
                "{} bytes is too small for {width}x{height} with stride {stride} (need {needed})",
                data.len()
            )));
        }
        Ok(Self { width, height, stride, data })
    }

    /// Tightly packed BGRA buffer (`stride == width * 4`).
    pub fn from_bgra(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        Self::new(width, height, width * BYTES_PER_PIXEL, data)
    }

    /// A frame where every pixel is `bgra`.
    pub fn filled(width: usize, height: usize, bgra: [u8; 4]) -> Result<Self> {
        let data = bgra.repeat(width * height);
        Self::from_bgra(width, height, data)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Raw bytes, including any row padding.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// The whole frame as a region.
    pub fn bounds(&self) -> Region {
        Region::new(0, 0, self.width, self.height)
    }

    /// Pixel bytes of row `y`, without padding.
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.data[start..start + self.width * BYTES_PER_PIXEL]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let start = y * self.stride;
        let len = self.width * BYTES_PER_PIXEL;
        &mut self.data[start..start + len]
    }

    /// BGRA value at (x, y). Panics when out of bounds, like slice indexing.
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let i = x * BYTES_PER_PIXEL;
        let row = self.row(y);
        [row[i], row[i + 1], row[i + 2], row[i + 3]]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, bgra: [u8; 4]) {
        let i = x * BYTES_PER_PIXEL;
        self.row_mut(y)[i..i + BYTES_PER_PIXEL].copy_from_slice(&bgra);
    }

    /// Pixel-wise equality, ignoring stride padding.
    pub fn same_pixels(&self, other: &Frame) -> bool {
        self.width == other.width
            && self.height == other.height
            && (0..self.height).all(|y| self.row(y) == other.row(y))
    }
}

/// An axis-aligned rectangle in source pixel coordinates, as a detector
/// reports it. It may be empty, negative, or partly/fully off-frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Float rectangle to pixels: origin is floored (the pixel containing
    /// the corner), size is truncated. NaN becomes 0 and ends up skipped.
    pub fn from_f32(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x: x.floor() as i32,
            y: y.floor() as i32,
            width: width.trunc() as i32,
            height: height.trunc() as i32,
        }
    }

    /// Detector boxes come normalised to [0, 1] with the origin at the
    /// bottom-left; flip to top-left pixel coordinates.
    pub fn from_normalized(
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        frame_width: usize,
        frame_height: usize,
    ) -> Self {
        let fw = frame_width as f32;
        let fh = frame_height as f32;
        let w = width * fw;
        let h = height * fh;
        let top = fh - y * fh - h;
        Self::from_f32(x * fw, top, w, h)
    }

    /// Clamp both corners against `[0, width) x [0, height)`.
    /// `None` when nothing is left.
    pub fn clamp_to(&self, width: usize, height: usize) -> Option<Region> {
        let x0 = i64::from(self.x).max(0);
        let y0 = i64::from(self.y).max(0);
        let x1 = (i64::from(self.x) + i64::from(self.width)).min(width as i64);
        let y1 = (i64::from(self.y) + i64::from(self.height)).min(height as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Region::new(
            x0 as usize,
            y0 as usize,
            (x1 - x0) as usize,
            (y1 - y0) as usize,
        ))
    }
}

/// A non-negative pixel region, already known to be inside some texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Region {
    pub const fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// One past the last column.
    pub fn right(&self) -> usize {
        self.x + self.width
    }

    /// One past the last row.
    pub fn bottom(&self) -> usize {
        self.y + self.height
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// True when the region lies inside a `width x height` texture.
    pub fn fits(&self, width: usize, height: usize) -> bool {
        self.right() <= width && self.bottom() <= height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rejects_short_stride_and_buffer() {
        assert!(Frame::new(4, 2, 8, vec![0; 32]).is_err());
        assert!(Frame::new(4, 2, 16, vec![0; 20]).is_err());
        assert!(Frame::new(0, 2, 0, vec![]).is_err());
        // last row needs no padding
        assert!(Frame::new(4, 2, 20, vec![0; 36]).is_ok());
    }

    #[test]
    fn padded_rows_are_skipped() {
        let mut data = vec![0xAA; 2 * 12];
        data[..8].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let frame = Frame::new(2, 2, 12, data).unwrap();
        assert_eq!(frame.row(0), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(frame.pixel(1, 0), [5, 6, 7, 8]);
        assert_eq!(frame.row(1).len(), 8);
    }

    #[test]
    fn same_pixels_ignores_padding() {
        let packed = Frame::filled(2, 2, [9, 9, 9, 9]).unwrap();
        let mut padded = vec![0u8; 12 * 2];
        for y in 0..2 {
            padded[y * 12..y * 12 + 8].fill(9);
        }
        let padded = Frame::new(2, 2, 12, padded).unwrap();
        assert!(packed.same_pixels(&padded));
        assert_ne!(packed, padded);
    }

    #[test]
    fn clamp_is_symmetric() {
        // partially off the top-left corner
        assert_eq!(
            Rect::new(-10, -10, 30, 30).clamp_to(50, 50),
            Some(Region::new(0, 0, 20, 20))
        );
        // partially off the bottom-right corner
        assert_eq!(
            Rect::new(40, 45, 30, 30).clamp_to(50, 50),
            Some(Region::new(40, 45, 10, 5))
        );
        // covers the whole frame and more
        assert_eq!(
            Rect::new(-5, -5, 100, 100).clamp_to(50, 50),
            Some(Region::new(0, 0, 50, 50))
        );
    }

    #[test]
    fn degenerate_rects_clamp_to_none() {
        assert_eq!(Rect::new(10, 10, 0, 20).clamp_to(50, 50), None);
        assert_eq!(Rect::new(10, 10, -5, 20).clamp_to(50, 50), None);
        assert_eq!(Rect::new(60, 10, 5, 5).clamp_to(50, 50), None);
        assert_eq!(Rect::new(-20, 10, 10, 5).clamp_to(50, 50), None);
        assert_eq!(Rect::new(i32::MAX, 0, i32::MAX, 1).clamp_to(50, 50), None);
    }

    #[test]
    fn float_rects_floor_origin_and_truncate_size() {
        assert_eq!(Rect::from_f32(1.7, -0.5, 10.9, 3.2), Rect::new(1, -1, 10, 3));
        assert_eq!(Rect::from_f32(f32::NAN, 0.0, 1.0, 1.0).x, 0);
    }

    #[test]
    fn normalized_rects_flip_vertically() {
        // bottom-left quarter in detector space is the bottom-left quarter on screen
        let r = Rect::from_normalized(0.0, 0.0, 0.5, 0.5, 200, 100);
        assert_eq!(r, Rect::new(0, 50, 100, 50));
        // a box touching the top edge
        let r = Rect::from_normalized(0.25, 0.75, 0.5, 0.25, 200, 100);
        assert_eq!(r, Rect::new(50, 0, 100, 25));
    }
}
