//! Selective Gaussian blur for live BGRA video frames.
//!
//! A detector hands over a list of rectangles per frame; [`Compositor`]
//! returns a same-sized frame where only those rectangles are blurred, or,
//! when the list is empty, the whole frame blurred in halo-padded tiles.
//!
//! ```text
//! FrameSource ──> Compositor ──┬─ rects ──> roi::composite_roi
//!                              └─ none ───> tiled::composite_tiled
//!                                   │
//!                               Backend (CpuBackend: Texture + gaussian)
//!                                   │
//!                              readback ──> window / image file
//! ```

pub mod backend;
#[cfg(feature = "camera")]
pub mod camera;
pub mod compositor;
pub mod draw;
pub mod error;
pub mod gaussian;
pub mod readback;
pub mod roi;
pub mod source;
pub mod texture;
pub mod tiled;
pub mod types;

pub use backend::{Backend, CpuBackend};
pub use compositor::{Compositor, CompositorConfig, DEFAULT_SIGMA, DEFAULT_TILE_SIZE};
pub use error::{Error, Result};
pub use gaussian::{BlurParams, GaussianKernel, MAX_SIGMA};
pub use source::{FrameSource, StillImageSource};
pub use texture::Texture;
pub use tiled::{Tile, TileGrid};
pub use types::{Frame, Rect, Region};
