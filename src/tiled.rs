// Whole-frame blur in bounded-memory tiles.
//
// Each core cell is blurred from a halo-padded cut of the *source* (never
// from a neighbour's blurred output) and only the core is written back, so
// tile seams vanish: within the kernel's support the result is the same as
// one whole-frame pass.

use std::sync::Mutex;

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::gaussian::{BlurParams, GaussianKernel};
use crate::roi::blur_extract;
use crate::types::{Frame, Region};

/// One grid cell: the core it owns in the output and the padded source
/// region it is blurred from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tile {
    pub core: Region,
    pub padded: Region,
}

impl Tile {
    /// The core, in the padded scratch texture's coordinates.
    pub fn core_in_padded(&self) -> Region {
        Region::new(
            self.core.x - self.padded.x,
            self.core.y - self.padded.y,
            self.core.width,
            self.core.height,
        )
    }
}

/// Grid geometry for a frame. Tiles are computed on demand, not stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileGrid {
    width: usize,
    height: usize,
    tile_width: usize,
    tile_height: usize,
    halo: usize,
}

impl TileGrid {
    /// `tile_size <= 0` means one tile covering the frame.
    pub fn new(width: usize, height: usize, tile_size: i32, halo: usize) -> Self {
        let (tile_width, tile_height) = match usize::try_from(tile_size) {
            Ok(size) if size > 0 => (size, size),
            _ => (width.max(1), height.max(1)),
        };
        Self {
            width,
            height,
            tile_width,
            tile_height,
            halo,
        }
    }

    pub fn cols(&self) -> usize {
        self.width.div_ceil(self.tile_width)
    }

    pub fn rows(&self) -> usize {
        self.height.div_ceil(self.tile_height)
    }

    pub fn len(&self) -> usize {
        self.cols() * self.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn halo(&self) -> usize {
        self.halo
    }

    /// Tile `index` in row-major order. Last row/column are clipped.
    pub fn tile(&self, index: usize) -> Tile {
        let cols = self.cols();
        let (col, row) = (index % cols, index / cols);

        let x = col * self.tile_width;
        let y = row * self.tile_height;
        let core = Region::new(
            x,
            y,
            self.tile_width.min(self.width - x),
            self.tile_height.min(self.height - y),
        );

        let px = x.saturating_sub(self.halo);
        let py = y.saturating_sub(self.halo);
        let px_end = (core.right() + self.halo).min(self.width);
        let py_end = (core.bottom() + self.halo).min(self.height);
        let padded = Region::new(px, py, px_end - px, py_end - py);

        Tile { core, padded }
    }

    pub fn iter(&self) -> impl Iterator<Item = Tile> + '_ {
        (0..self.len()).map(|i| self.tile(i))
    }
}

/// Blur all of `source`, `tile_size x tile_size` cores at a time.
///
/// With `parallel`, tiles are blurred on the rayon pool; each worker writes
/// its core as soon as it is done, so at most one padded tile per worker is
/// alive at a time.
pub fn composite_tiled<B: Backend>(
    backend: &B,
    source: &Frame,
    params: &BlurParams,
    tile_size: i32,
    parallel: bool,
) -> Result<Frame> {
    let (width, height) = (source.width(), source.height());
    let grid = TileGrid::new(width, height, tile_size, params.halo());
    debug!(
        width,
        height,
        tile_size,
        cols = grid.cols(),
        rows = grid.rows(),
        halo = grid.halo(),
        sigma = params.sigma(),
        "tiled composite"
    );

    let src = backend.upload(source)?;
    let out = Mutex::new(backend.create_texture(width, height)?);
    let kernel = GaussianKernel::new(params);

    let run = |index: usize| -> Result<()> {
        let tile = grid.tile(index);
        trace!(index, core = ?tile.core, padded = ?tile.padded, "tile");
        let blurred = blur_extract(backend, &src, tile.padded, &kernel)?;
        let mut guard = out.lock().map_err(|_| poisoned())?;
        backend.copy_region(
            &blurred,
            tile.core_in_padded(),
            &mut *guard,
            tile.core.x,
            tile.core.y,
        )
    };

    if parallel && grid.len() > 1 {
        (0..grid.len()).into_par_iter().try_for_each(run)?;
    } else {
        (0..grid.len()).try_for_each(run)?;
    }

    let out = out.into_inner().map_err(|_| poisoned())?;
    backend.finish(out)
}

fn poisoned() -> Error {
    Error::Backend("output texture lock poisoned by a panicking tile".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuBackend;
    use crate::gaussian::blur_frame;

    fn gradient(width: usize, height: usize) -> Frame {
        let mut frame = Frame::filled(width, height, [0, 0, 0, 255]).unwrap();
        for y in 0..height {
            for x in 0..width {
                let v = ((x * 7 + y * 13) % 256) as u8;
                let checker = if (x / 8 + y / 8) % 2 == 0 { 255 } else { 0 };
                frame.set_pixel(x, y, [v, checker, (x % 256) as u8, 255]);
            }
        }
        frame
    }

    fn max_diff(a: &Frame, b: &Frame) -> u8 {
        a.data()
            .iter()
            .zip(b.data())
            .map(|(x, y)| x.abs_diff(*y))
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn grid_clips_last_row_and_column() {
        let grid = TileGrid::new(1000, 600, 512, 0);
        assert_eq!((grid.cols(), grid.rows()), (2, 2));
        let tiles: Vec<Tile> = grid.iter().collect();
        assert_eq!(tiles[0].core, Region::new(0, 0, 512, 512));
        assert_eq!(tiles[1].core, Region::new(512, 0, 488, 512));
        assert_eq!(tiles[2].core, Region::new(0, 512, 512, 88));
        assert_eq!(tiles[3].core, Region::new(512, 512, 488, 88));
    }

    #[test]
    fn grid_cores_cover_frame_exactly_once() {
        let (w, h) = (130, 70);
        let grid = TileGrid::new(w, h, 32, 6);
        let mut hits = vec![0u8; w * h];
        for tile in grid.iter() {
            for y in tile.core.y..tile.core.bottom() {
                for x in tile.core.x..tile.core.right() {
                    hits[y * w + x] += 1;
                }
            }
        }
        assert!(hits.iter().all(|&n| n == 1));
    }

    #[test]
    fn padding_is_halo_clamped_to_frame() {
        let grid = TileGrid::new(100, 100, 40, 15);
        let first = grid.tile(0);
        assert_eq!(first.padded, Region::new(0, 0, 55, 55));
        assert_eq!(first.core_in_padded(), Region::new(0, 0, 40, 40));

        let middle = grid.tile(4);
        assert_eq!(middle.core, Region::new(40, 40, 40, 40));
        assert_eq!(middle.padded, Region::new(25, 25, 70, 70));
        assert_eq!(middle.core_in_padded(), Region::new(15, 15, 40, 40));

        let last = grid.tile(8);
        assert_eq!(last.core, Region::new(80, 80, 20, 20));
        assert_eq!(last.padded, Region::new(65, 65, 35, 35));
    }

    #[test]
    fn non_positive_tile_size_is_one_tile() {
        for size in [0, -1, i32::MIN] {
            let grid = TileGrid::new(300, 200, size, 4);
            assert_eq!(grid.len(), 1);
            assert_eq!(grid.tile(0).core, Region::new(0, 0, 300, 200));
            assert_eq!(grid.tile(0).padded, Region::new(0, 0, 300, 200));
        }
    }

    #[test]
    fn small_frame_collapses_to_single_tile() {
        let grid = TileGrid::new(50, 40, 1024, 30);
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.tile(0).core, Region::new(0, 0, 50, 40));
    }

    #[test]
    fn tiles_match_whole_frame_blur() {
        let src = gradient(200, 150);
        let params = BlurParams::new(5.0).unwrap();
        let reference = blur_frame(&src, &params).unwrap();
        let tiled = composite_tiled(&CpuBackend::new(), &src, &params, 64, true).unwrap();
        assert!(max_diff(&tiled, &reference) <= 1);
    }

    #[test]
    fn serial_and_parallel_tiles_agree() {
        let src = gradient(90, 70);
        let params = BlurParams::new(2.0).unwrap();
        let backend = CpuBackend::new();
        let a = composite_tiled(&backend, &src, &params, 16, false).unwrap();
        let b = composite_tiled(&backend, &src, &params, 16, true).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn tile_smaller_than_halo_still_seamless() {
        let src = gradient(60, 45);
        let params = BlurParams::new(4.0).unwrap();
        let reference = blur_frame(&src, &params).unwrap();
        let tiled = composite_tiled(&CpuBackend::new(), &src, &params, 5, true).unwrap();
        assert!(max_diff(&tiled, &reference) <= 1);
    }

    #[test]
    fn uniform_frame_stays_uniform() {
        let src = Frame::filled(70, 33, [255, 0, 0, 255]).unwrap();
        let params = BlurParams::new(10.0).unwrap();
        let out = composite_tiled(&CpuBackend::new(), &src, &params, 16, true).unwrap();
        assert_eq!(out, src);
    }
}
