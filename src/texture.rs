// Backend-resident 2D image for the CPU backend.
//
// Always tightly packed BGRA. Region copies follow blit semantics: the
// caller names a source region and a destination origin and both must be
// in bounds, otherwise nothing is written.

use crate::error::{Error, Result};
use crate::types::{Frame, Region, BYTES_PER_PIXEL};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Texture {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Texture {
    /// Zeroed texture. Allocation failure is reported, not aborted on.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        let bytes = texture_bytes(width, height)?;
        let mut data = Vec::new();
        data.try_reserve_exact(bytes)
            .map_err(|_| Error::Allocation { width, height, bytes })?;
        data.resize(bytes, 0);
        Ok(Self { width, height, data })
    }

    /// Copy a caller frame in, dropping any stride padding.
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        let mut texture = Self::new(frame.width(), frame.height())?;
        let row_bytes = texture.row_bytes();
        for (y, dst) in texture.data.chunks_exact_mut(row_bytes).enumerate() {
            dst.copy_from_slice(frame.row(y));
        }
        Ok(texture)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn bounds(&self) -> Region {
        Region::new(0, 0, self.width, self.height)
    }

    pub fn row_bytes(&self) -> usize {
        self.width * BYTES_PER_PIXEL
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Blit `region` of `src` into `self` with its top-left at (dst_x, dst_y).
    pub fn copy_region(
        &mut self,
        dst_x: usize,
        dst_y: usize,
        src: &Texture,
        region: Region,
    ) -> Result<()> {
        if !region.fits(src.width, src.height) {
            return Err(Error::RegionOutOfBounds {
                region,
                width: src.width,
                height: src.height,
            });
        }
        let target = Region::new(dst_x, dst_y, region.width, region.height);
        if !target.fits(self.width, self.height) {
            return Err(Error::RegionOutOfBounds {
                region: target,
                width: self.width,
                height: self.height,
            });
        }
        if region.is_empty() {
            return Ok(());
        }

        let len = region.width * BYTES_PER_PIXEL;
        let src_row_bytes = src.row_bytes();
        let dst_row_bytes = self.row_bytes();
        for row in 0..region.height {
            let s = (region.y + row) * src_row_bytes + region.x * BYTES_PER_PIXEL;
            let d = (dst_y + row) * dst_row_bytes + dst_x * BYTES_PER_PIXEL;
            self.data[d..d + len].copy_from_slice(&src.data[s..s + len]);
        }
        Ok(())
    }

    /// Read one BGRA pixel back.
    pub fn read_pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * BYTES_PER_PIXEL;
        Some([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    /// Read a region back as a packed BGRA byte vector.
    pub fn read_region(&self, region: Region) -> Result<Vec<u8>> {
        if !region.fits(self.width, self.height) {
            return Err(Error::RegionOutOfBounds {
                region,
                width: self.width,
                height: self.height,
            });
        }
        let len = region.width * BYTES_PER_PIXEL;
        let mut out = Vec::with_capacity(len * region.height);
        for row in region.y..region.bottom() {
            let s = row * self.row_bytes() + region.x * BYTES_PER_PIXEL;
            out.extend_from_slice(&self.data[s..s + len]);
        }
        Ok(out)
    }

    /// Hand the pixels over as a packed frame.
    pub fn into_frame(self) -> Result<Frame> {
        Frame::from_bgra(self.width, self.height, self.data)
    }
}

/// Byte size of a packed BGRA texture; zero-sized or overflowing sizes are errors.
pub fn texture_bytes(width: usize, height: usize) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidFrame(format!("zero-sized texture {width}x{height}")));
    }
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(BYTES_PER_PIXEL))
        .ok_or(Error::Allocation {
            width,
            height,
            bytes: usize::MAX,
        })
}
