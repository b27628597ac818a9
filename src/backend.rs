// Compute backend seam.
//
// The compositors only talk to textures through this trait: allocate,
// upload, region copy, blur dispatch, readback. A GPU implementation maps
// these onto its own texture and command objects; `CpuBackend` runs them
// in place on packed BGRA buffers, spreading blur rows over rayon.
//
// Every call returns only once its work is done, so a sequence of calls is
// an ordered command stream that is fully resolved when the last returns.

use tracing::debug;

use crate::error::{Error, Result};
use crate::gaussian::{self, BlurParams, GaussianKernel};
use crate::texture::{texture_bytes, Texture};
use crate::types::{Frame, Region};

pub trait Backend: Send + Sync {
    type Texture: Send + Sync;

    fn name(&self) -> &'static str;

    /// New texture of the given size. Contents are unspecified.
    fn create_texture(&self, width: usize, height: usize) -> Result<Self::Texture>;

    fn upload(&self, frame: &Frame) -> Result<Self::Texture>;

    /// Blit `region` of `src` into `dst` at (dst_x, dst_y).
    fn copy_region(
        &self,
        src: &Self::Texture,
        region: Region,
        dst: &mut Self::Texture,
        dst_x: usize,
        dst_y: usize,
    ) -> Result<()>;

    /// Blur `src` into a same-sized `dst`, clamp-to-edge.
    fn blur(&self, kernel: &GaussianKernel, src: &Self::Texture, dst: &mut Self::Texture)
        -> Result<()>;

    fn readback(&self, texture: &Self::Texture) -> Result<Frame>;

    /// Readback that may reuse the texture's storage for the frame.
    fn finish(&self, texture: Self::Texture) -> Result<Frame> {
        self.readback(&texture)
    }

    /// Push a 1x1 frame through every operation once. Run at start-up so a
    /// broken device shows up before the first real frame.
    fn probe(&self) -> Result<()> {
        let frame = Frame::filled(1, 1, [0, 0, 0, 255])?;
        let src = self.upload(&frame)?;
        let mut dst = self.create_texture(1, 1)?;
        let kernel = GaussianKernel::new(&BlurParams::new(1.0)?);
        self.blur(&kernel, &src, &mut dst)?;
        let mut out = self.create_texture(1, 1)?;
        self.copy_region(&dst, Region::new(0, 0, 1, 1), &mut out, 0, 0)?;
        let back = self.readback(&out)?;
        if back.width() != 1 || back.height() != 1 {
            return Err(Error::Backend(format!(
                "{} probe returned a {}x{} frame",
                self.name(),
                back.width(),
                back.height()
            )));
        }
        debug!(backend = self.name(), "backend probe ok");
        Ok(())
    }
}

/// CPU implementation on [`Texture`].
#[derive(Clone, Debug)]
pub struct CpuBackend {
    max_texture_bytes: Option<usize>,
    parallel_rows: bool,
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuBackend {
    pub fn new() -> Self {
        Self {
            max_texture_bytes: None,
            parallel_rows: true,
        }
    }

    /// Refuse textures above `bytes`, the way a device refuses oversized
    /// allocations. The `f32` scratch a blur holds between passes is
    /// charged against the same limit.
    pub fn with_max_texture_bytes(mut self, bytes: usize) -> Self {
        self.max_texture_bytes = Some(bytes);
        self
    }

    /// Whether blur passes split rows across the rayon pool.
    pub fn with_parallel_rows(mut self, parallel: bool) -> Self {
        self.parallel_rows = parallel;
        self
    }

    pub fn max_texture_bytes(&self) -> Option<usize> {
        self.max_texture_bytes
    }

    fn check_budget(&self, width: usize, height: usize) -> Result<()> {
        self.check_bytes(width, height, texture_bytes(width, height)?)
    }

    fn check_bytes(&self, width: usize, height: usize, bytes: usize) -> Result<()> {
        match self.max_texture_bytes {
            Some(limit) if bytes > limit => Err(Error::Allocation { width, height, bytes }),
            _ => Ok(()),
        }
    }
}

impl Backend for CpuBackend {
    type Texture = Texture;

    fn name(&self) -> &'static str {
        "cpu"
    }

    fn create_texture(&self, width: usize, height: usize) -> Result<Texture> {
        self.check_budget(width, height)?;
        Texture::new(width, height)
    }

    fn upload(&self, frame: &Frame) -> Result<Texture> {
        self.check_budget(frame.width(), frame.height())?;
        Texture::from_frame(frame)
    }

    fn copy_region(
        &self,
        src: &Texture,
        region: Region,
        dst: &mut Texture,
        dst_x: usize,
        dst_y: usize,
    ) -> Result<()> {
        dst.copy_region(dst_x, dst_y, src, region)
    }

    fn blur(&self, kernel: &GaussianKernel, src: &Texture, dst: &mut Texture) -> Result<()> {
        let (width, height) = (src.width(), src.height());
        self.check_bytes(width, height, gaussian::scratch_bytes(width, height)?)?;
        gaussian::blur_texture(src, dst, kernel, self.parallel_rows)
    }

    fn readback(&self, texture: &Texture) -> Result<Frame> {
        texture.clone().into_frame()
    }

    fn finish(&self, texture: Texture) -> Result<Frame> {
        texture.into_frame()
    }
}
