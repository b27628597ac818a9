// One error type for the whole crate.
// Every variant states *where* things went wrong: frame/texture geometry,
// allocation, the compute backend, or one of the capture/display adapters.

use crate::types::Region;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A frame was built with zero size, a short stride, or too little data.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Sigma must be finite, strictly positive and at most `MAX_SIGMA`.
    #[error("invalid blur sigma {0}: must be finite, > 0 and <= 4096")]
    InvalidSigma(f32),

    #[error("dimension mismatch: expected {expected_width}x{expected_height}, got {width}x{height}")]
    DimensionMismatch {
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },

    #[error("region {region:?} does not fit a {width}x{height} texture")]
    RegionOutOfBounds {
        region: Region,
        width: usize,
        height: usize,
    },

    /// Scratch or output texture could not be allocated. Fatal to the call.
    #[error("cannot allocate {width}x{height} texture ({bytes} bytes)")]
    Allocation {
        width: usize,
        height: usize,
        bytes: usize,
    },

    /// Device-level failure; reported once when the compositor is built.
    #[error("backend error: {0}")]
    Backend(String),

    #[error("camera init error: {0}")]
    CameraInit(String),

    #[error("camera frame error: {0}")]
    CameraFrame(String),

    #[error("window init error: {0}")]
    WindowInit(String),

    #[error("window update error: {0}")]
    WindowUpdate(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
