// Region-of-interest compositor.
//
// The whole source is copied to the output first, then every rectangle is
// cut from the *source*, blurred on its own and written back over the copy.
// Rectangles never see each other's blur: where two overlap, the one later
// in the list wins.

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::backend::Backend;
use crate::error::Result;
use crate::gaussian::{BlurParams, GaussianKernel};
use crate::types::{Frame, Rect, Region};

/// Blur the clamped rectangles of `source` into a new frame.
///
/// With `parallel`, extraction and blur of different rectangles run on the
/// rayon pool; write-back is always in list order.
pub fn composite_roi<B: Backend>(
    backend: &B,
    source: &Frame,
    rects: &[Rect],
    params: &BlurParams,
    parallel: bool,
) -> Result<Frame> {
    let (width, height) = (source.width(), source.height());
    let src = backend.upload(source)?;
    let mut out = backend.create_texture(width, height)?;
    backend.copy_region(&src, source.bounds(), &mut out, 0, 0)?;

    let regions: Vec<Region> = rects
        .iter()
        .filter_map(|rect| {
            let clamped = rect.clamp_to(width, height);
            if clamped.is_none() {
                trace!(?rect, "empty after clamping, skipped");
            }
            clamped
        })
        .collect();

    debug!(
        width,
        height,
        rects = rects.len(),
        regions = regions.len(),
        sigma = params.sigma(),
        "roi composite"
    );

    if regions.is_empty() {
        return backend.finish(out);
    }

    let kernel = GaussianKernel::new(params);
    let blurred: Vec<B::Texture> = if parallel && regions.len() > 1 {
        regions
            .par_iter()
            .map(|region| blur_extract(backend, &src, *region, &kernel))
            .collect::<Result<_>>()?
    } else {
        regions
            .iter()
            .map(|region| blur_extract(backend, &src, *region, &kernel))
            .collect::<Result<_>>()?
    };

    for (region, scratch) in regions.iter().zip(&blurred) {
        let whole = Region::new(0, 0, region.width, region.height);
        backend.copy_region(scratch, whole, &mut out, region.x, region.y)?;
    }

    backend.finish(out)
}

/// Copy `region` of `src` into scratch and blur it in isolation.
/// The returned texture is `region.width x region.height`.
pub(crate) fn blur_extract<B: Backend>(
    backend: &B,
    src: &B::Texture,
    region: Region,
    kernel: &GaussianKernel,
) -> Result<B::Texture> {
    let mut scratch = backend.create_texture(region.width, region.height)?;
    backend.copy_region(src, region, &mut scratch, 0, 0)?;
    let mut blurred = backend.create_texture(region.width, region.height)?;
    backend.blur(kernel, &scratch, &mut blurred)?;
    Ok(blurred)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuBackend;
    use crate::error::Error;
    use crate::gaussian::blur_frame;

    fn noise(width: usize, height: usize) -> Frame {
        let mut data = Vec::with_capacity(width * height * 4);
        let mut state = 0x2545_f491u32;
        for _ in 0..width * height {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let b = state.to_le_bytes();
            data.extend_from_slice(&[b[0], b[1], b[2], 255]);
        }
        Frame::from_bgra(width, height, data).unwrap()
    }

    fn crop(frame: &Frame, region: Region) -> Frame {
        let mut data = Vec::with_capacity(region.width * region.height * 4);
        for y in region.y..region.bottom() {
            data.extend_from_slice(&frame.row(y)[region.x * 4..region.right() * 4]);
        }
        Frame::from_bgra(region.width, region.height, data).unwrap()
    }

    fn sigma(s: f32) -> BlurParams {
        BlurParams::new(s).unwrap()
    }

    #[test]
    fn no_rects_is_an_exact_copy() {
        let src = noise(40, 30);
        let out = composite_roi(&CpuBackend::new(), &src, &[], &sigma(3.0), true).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn only_the_rect_changes() {
        let src = noise(60, 50);
        let rect = Rect::new(10, 5, 20, 15);
        let out = composite_roi(&CpuBackend::new(), &src, &[rect], &sigma(2.0), false).unwrap();
        let region = rect.clamp_to(60, 50).unwrap();

        for y in 0..50 {
            for x in 0..60 {
                if !region.contains(x, y) {
                    assert_eq!(out.pixel(x, y), src.pixel(x, y), "({x},{y}) changed");
                }
            }
        }
        let expected = blur_frame(&crop(&src, region), &sigma(2.0)).unwrap();
        assert_eq!(crop(&out, region), expected);
    }

    #[test]
    fn out_of_bounds_and_degenerate_rects_are_skipped() {
        let src = noise(32, 32);
        let rects = [
            Rect::new(40, 40, 10, 10),
            Rect::new(-20, 0, 10, 10),
            Rect::new(5, 5, 0, 10),
            Rect::new(5, 5, 10, -3),
        ];
        let out = composite_roi(&CpuBackend::new(), &src, &rects, &sigma(4.0), true).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn partially_off_frame_rect_blurs_only_the_overlap() {
        let src = noise(50, 50);
        let out = composite_roi(
            &CpuBackend::new(),
            &src,
            &[Rect::new(-10, -10, 30, 30)],
            &sigma(2.0),
            false,
        )
        .unwrap();
        let region = Region::new(0, 0, 20, 20);
        for y in 0..50 {
            for x in 0..50 {
                if !region.contains(x, y) {
                    assert_eq!(out.pixel(x, y), src.pixel(x, y));
                }
            }
        }
        let expected = blur_frame(&crop(&src, region), &sigma(2.0)).unwrap();
        assert_eq!(crop(&out, region), expected);
    }

    #[test]
    fn later_rect_wins_overlap() {
        let src = noise(80, 80);
        let r1 = Rect::new(10, 10, 30, 30);
        let r2 = Rect::new(25, 25, 30, 30);
        let params = sigma(3.0);
        let out = composite_roi(&CpuBackend::new(), &src, &[r1, r2], &params, true).unwrap();

        let g1 = r1.clamp_to(80, 80).unwrap();
        let g2 = r2.clamp_to(80, 80).unwrap();
        let b1 = blur_frame(&crop(&src, g1), &params).unwrap();
        let b2 = blur_frame(&crop(&src, g2), &params).unwrap();

        for y in 0..80 {
            for x in 0..80 {
                let got = out.pixel(x, y);
                if g2.contains(x, y) {
                    assert_eq!(got, b2.pixel(x - g2.x, y - g2.y), "overlap/r2 at ({x},{y})");
                } else if g1.contains(x, y) {
                    assert_eq!(got, b1.pixel(x - g1.x, y - g1.y), "r1 at ({x},{y})");
                }
            }
        }
    }

    #[test]
    fn list_order_decides_overlap() {
        let src = noise(64, 64);
        let a = Rect::new(0, 0, 40, 40);
        let b = Rect::new(20, 20, 40, 40);
        let backend = CpuBackend::new();
        let ab = composite_roi(&backend, &src, &[a, b], &sigma(3.0), true).unwrap();
        let ba = composite_roi(&backend, &src, &[b, a], &sigma(3.0), true).unwrap();
        // near b's top-left edge, deep inside a: the clamped edges differ
        assert_ne!(ab.pixel(21, 21), ba.pixel(21, 21));
        assert_eq!(ab.pixel(5, 5), ba.pixel(5, 5));
        assert_eq!(ab.pixel(55, 55), ba.pixel(55, 55));
    }

    #[test]
    fn source_is_not_mutated() {
        let src = noise(20, 20);
        let before = src.clone();
        let rects = vec![Rect::new(2, 2, 10, 10)];
        let _ = composite_roi(&CpuBackend::new(), &src, &rects, &sigma(2.0), false).unwrap();
        assert_eq!(src, before);
        assert_eq!(rects, vec![Rect::new(2, 2, 10, 10)]);
    }

    #[test]
    fn allocation_failure_fails_the_call() {
        // the device refuses anything as large as the frame itself
        let backend = CpuBackend::new().with_max_texture_bytes(16 * 16 * 4 - 1);
        let src = noise(16, 16);
        let err = composite_roi(&backend, &src, &[Rect::new(0, 0, 4, 4)], &sigma(1.0), false)
            .unwrap_err();
        assert!(matches!(err, Error::Allocation { .. }));
    }

    #[test]
    fn padded_source_stride_is_honoured() {
        let packed = noise(10, 8);
        let stride = 10 * 4 + 12;
        let mut data = vec![0xFFu8; stride * 8];
        for y in 0..8 {
            data[y * stride..y * stride + 40].copy_from_slice(packed.row(y));
        }
        let padded = Frame::new(10, 8, stride, data).unwrap();
        let rects = [Rect::new(2, 2, 5, 5)];
        let backend = CpuBackend::new();
        let a = composite_roi(&backend, &packed, &rects, &sigma(1.5), false).unwrap();
        let b = composite_roi(&backend, &padded, &rects, &sigma(1.5), false).unwrap();
        assert_eq!(a, b);
        assert_eq!(b.stride(), 40);
    }
}
