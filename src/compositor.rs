// Front door: a validated configuration plus a backend, and the routing
// between the ROI path (rectangles given) and the tiled path (none given).

use tracing::{info, warn};

use crate::backend::Backend;
use crate::error::Result;
use crate::gaussian::BlurParams;
use crate::roi::composite_roi;
use crate::tiled::composite_tiled;
use crate::types::{Frame, Rect};

pub const DEFAULT_SIGMA: f32 = 10.0;
pub const DEFAULT_TILE_SIZE: i32 = 1024;

/// Caller-owned knobs. Defaults: sigma 10, 1024-pixel tiles, parallel on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompositorConfig {
    pub sigma: f32,
    /// Tile edge for the whole-frame path; `<= 0` means one tile.
    pub tile_size: i32,
    /// Spread rectangles/tiles over the rayon pool.
    pub parallel: bool,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            sigma: DEFAULT_SIGMA,
            tile_size: DEFAULT_TILE_SIZE,
            parallel: true,
        }
    }
}

impl CompositorConfig {
    pub fn with_sigma(mut self, sigma: f32) -> Self {
        self.sigma = sigma;
        self
    }

    pub fn with_tile_size(mut self, tile_size: i32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// ```no_run
/// use roi_blur::{Compositor, CompositorConfig, CpuBackend, Frame, Rect};
///
/// let compositor = Compositor::new(CpuBackend::new(), CompositorConfig::default())?;
/// let frame = Frame::filled(640, 480, [0, 0, 255, 255])?;
/// let out = compositor.composite_frame(&frame, &[Rect::new(100, 80, 120, 160)])?;
/// assert_eq!(out.width(), 640);
/// # Ok::<(), roi_blur::Error>(())
/// ```
pub struct Compositor<B: Backend> {
    backend: B,
    config: CompositorConfig,
    params: BlurParams,
}

impl<B: Backend> Compositor<B> {
    /// Validate the configuration and probe the backend once, so device
    /// problems surface here rather than on the first frame.
    pub fn new(backend: B, config: CompositorConfig) -> Result<Self> {
        let params = BlurParams::new(config.sigma)?;
        backend.probe()?;
        info!(
            backend = backend.name(),
            sigma = config.sigma,
            tile_size = config.tile_size,
            parallel = config.parallel,
            "compositor ready"
        );
        Ok(Self {
            backend,
            config,
            params,
        })
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Blur `rects` of `source`, or the whole frame (tiled) when `rects`
    /// is empty. The output always has the source's dimensions.
    pub fn composite_frame(&self, source: &Frame, rects: &[Rect]) -> Result<Frame> {
        self.route(source, rects, &self.params)
    }

    /// As [`Self::composite_frame`] with a one-off sigma.
    pub fn composite_frame_with_sigma(
        &self,
        source: &Frame,
        rects: &[Rect],
        sigma: f32,
    ) -> Result<Frame> {
        let params = BlurParams::new(sigma)?;
        self.route(source, rects, &params)
    }

    /// ROI path only; an empty list gives back an exact copy.
    pub fn composite_roi(&self, source: &Frame, rects: &[Rect]) -> Result<Frame> {
        composite_roi(&self.backend, source, rects, &self.params, self.config.parallel)
    }

    /// Tiled whole-frame path only.
    pub fn composite_tiled(&self, source: &Frame) -> Result<Frame> {
        composite_tiled(
            &self.backend,
            source,
            &self.params,
            self.config.tile_size,
            self.config.parallel,
        )
    }

    /// Like [`Self::composite_frame`], but a failed call hands back the
    /// untouched source instead of an error.
    pub fn composite_or_passthrough(&self, source: &Frame, rects: &[Rect]) -> Frame {
        match self.composite_frame(source, rects) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "composite failed, passing frame through");
                source.clone()
            }
        }
    }

    fn route(&self, source: &Frame, rects: &[Rect], params: &BlurParams) -> Result<Frame> {
        if rects.is_empty() {
            composite_tiled(
                &self.backend,
                source,
                params,
                self.config.tile_size,
                self.config.parallel,
            )
        } else {
            composite_roi(&self.backend, source, rects, params, self.config.parallel)
        }
    }
}
