// Separable Gaussian blur over packed BGRA buffers.
//
// Horizontal pass into an `f32` scratch row buffer, vertical pass back to
// `u8`. Samples past the buffer edge repeat the nearest edge pixel, so a
// blurred sub-region never picks up dark or transparent fringes from
// outside its own pixels.

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::texture::{texture_bytes, Texture};
use crate::types::{Frame, BYTES_PER_PIXEL};

/// Largest accepted sigma. Keeps the kernel radius (and tile halo) far
/// below anything that could overflow index arithmetic.
pub const MAX_SIGMA: f32 = 4096.0;

/// Blur strength. Only finite sigmas in `(0, MAX_SIGMA]` are representable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlurParams {
    sigma: f32,
}

impl BlurParams {
    pub fn new(sigma: f32) -> Result<Self> {
        if !sigma.is_finite() || sigma <= 0.0 || sigma > MAX_SIGMA {
            return Err(Error::InvalidSigma(sigma));
        }
        Ok(Self { sigma })
    }

    pub fn sigma(&self) -> f32 {
        self.sigma
    }

    /// ceil(3 * sigma): beyond this the kernel carries no meaningful weight.
    /// Also the tile overlap and the kernel radius.
    pub fn halo(&self) -> usize {
        (3.0 * f64::from(self.sigma)).ceil() as usize
    }
}

/// Normalised 1D Gaussian weights, `2 * radius + 1` taps.
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianKernel {
    sigma: f32,
    radius: usize,
    weights: Vec<f32>,
}

impl GaussianKernel {
    pub fn new(params: &BlurParams) -> Self {
        let sigma = f64::from(params.sigma());
        let radius = params.halo();
        let denom = 2.0 * sigma * sigma;
        // radius <= ceil(3 * MAX_SIGMA), so this cannot saturate
        let taps = radius.saturating_mul(2);
        let raw: Vec<f64> = (0..=taps)
            .map(|i| {
                let x = i as f64 - radius as f64;
                (-x * x / denom).exp()
            })
            .collect();
        let sum: f64 = raw.iter().sum();
        let weights = raw.iter().map(|w| (w / sum) as f32).collect();
        Self {
            sigma: params.sigma(),
            radius,
            weights,
        }
    }

    pub fn sigma(&self) -> f32 {
        self.sigma
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }
}

/// Blur `src` into `dst`. Both are packed BGRA `width x height`.
///
/// `parallel` spreads rows across the rayon pool; the arithmetic is the same
/// either way, so results are bit-identical.
pub fn blur(
    src: &[u8],
    dst: &mut [u8],
    width: usize,
    height: usize,
    kernel: &GaussianKernel,
    parallel: bool,
) -> Result<()> {
    let row_bytes = width * BYTES_PER_PIXEL;
    let len = row_bytes * height;
    if width == 0 || height == 0 {
        return Err(Error::InvalidFrame(format!("cannot blur {width}x{height}")));
    }
    if src.len() != len || dst.len() != len {
        return Err(Error::InvalidFrame(format!(
            "blur buffers are {} and {} bytes, expected {len} for {width}x{height}",
            src.len(),
            dst.len()
        )));
    }

    let mut temp = Vec::new();
    temp.try_reserve_exact(len).map_err(|_| Error::Allocation {
        width,
        height,
        bytes: len.saturating_mul(size_of::<f32>()),
    })?;
    temp.resize(len, 0.0f32);

    // Pass 1: horizontal, src -> temp
    let horizontal = |(y, out): (usize, &mut [f32])| {
        let row = &src[y * row_bytes..(y + 1) * row_bytes];
        horizontal_row(row, out, width, kernel);
    };
    if parallel {
        temp.par_chunks_mut(row_bytes).enumerate().for_each(horizontal);
    } else {
        temp.chunks_mut(row_bytes).enumerate().for_each(horizontal);
    }

    // Pass 2: vertical, temp -> dst, one accumulator row per worker
    let vertical = |acc: &mut Vec<f32>, (y, out): (usize, &mut [u8])| {
        vertical_row(&temp, acc, out, y, row_bytes, height, kernel);
    };
    if parallel {
        dst.par_chunks_mut(row_bytes)
            .enumerate()
            .for_each_init(|| vec![0.0f32; row_bytes], vertical);
    } else {
        let mut acc = vec![0.0f32; row_bytes];
        dst.chunks_mut(row_bytes)
            .enumerate()
            .for_each(|item| vertical(&mut acc, item));
    }

    Ok(())
}

fn horizontal_row(row: &[u8], out: &mut [f32], width: usize, kernel: &GaussianKernel) {
    let r = kernel.radius as isize;
    let last = width as isize - 1;
    for x in 0..width {
        let mut acc = [0.0f32; BYTES_PER_PIXEL];
        for (k, &w) in kernel.weights.iter().enumerate() {
            let sx = (x as isize + k as isize - r).clamp(0, last) as usize;
            let px = &row[sx * BYTES_PER_PIXEL..(sx + 1) * BYTES_PER_PIXEL];
            for (a, &v) in acc.iter_mut().zip(px) {
                *a += f32::from(v) * w;
            }
        }
        out[x * BYTES_PER_PIXEL..(x + 1) * BYTES_PER_PIXEL].copy_from_slice(&acc);
    }
}

fn vertical_row(
    temp: &[f32],
    acc: &mut [f32],
    out: &mut [u8],
    y: usize,
    row_bytes: usize,
    height: usize,
    kernel: &GaussianKernel,
) {
    let r = kernel.radius as isize;
    let last = height as isize - 1;
    acc.fill(0.0);
    for (k, &w) in kernel.weights.iter().enumerate() {
        let sy = (y as isize + k as isize - r).clamp(0, last) as usize;
        let src = &temp[sy * row_bytes..(sy + 1) * row_bytes];
        for (a, &v) in acc.iter_mut().zip(src) {
            *a += v * w;
        }
    }
    for (o, a) in out.iter_mut().zip(acc.iter()) {
        *o = a.round().clamp(0.0, 255.0) as u8;
    }
}

/// Bytes of `f32` scratch a `width x height` blur holds between its passes.
pub fn scratch_bytes(width: usize, height: usize) -> Result<usize> {
    let bytes = texture_bytes(width, height)?;
    bytes
        .checked_mul(size_of::<f32>())
        .ok_or(Error::Allocation {
            width,
            height,
            bytes: usize::MAX,
        })
}

/// Blur a texture into a same-sized texture.
pub fn blur_texture(
    src: &Texture,
    dst: &mut Texture,
    kernel: &GaussianKernel,
    parallel: bool,
) -> Result<()> {
    if src.width() != dst.width() || src.height() != dst.height() {
        return Err(Error::DimensionMismatch {
            expected_width: src.width(),
            expected_height: src.height(),
            width: dst.width(),
            height: dst.height(),
        });
    }
    let (width, height) = (src.width(), src.height());
    blur(src.as_bytes(), dst.as_bytes_mut(), width, height, kernel, parallel)
}

/// Whole-frame blur in one pass, no tiling. The reference the tiled
/// compositor has to match.
pub fn blur_frame(source: &Frame, params: &BlurParams) -> Result<Frame> {
    let kernel = GaussianKernel::new(params);
    let src = Texture::from_frame(source)?;
    let mut dst = Texture::new(src.width(), src.height())?;
    blur_texture(&src, &mut dst, &kernel, true)?;
    dst.into_frame()
}
