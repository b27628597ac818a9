// Opens a camera and converts frames into BGRA frames for the compositor.
// When the live loop calls `next_frame()`, you get one opaque BGRA frame at
// whatever resolution the device actually settled on.

use crate::error::{Error, Result};
use crate::readback::from_rgb_image;
use crate::source::FrameSource;
use crate::types::Frame;

use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    },
};
use tracing::info;

// A small wrapper around nokhwa::Camera so the live loop stays clean.
pub struct CameraSource {
    cam: Camera,
    width: u32,
    height: u32,
}

impl CameraSource {
    /// Open camera `index` near the requested resolution (falls back if not exact).
    pub fn new(index: u32, width: u32, height: u32) -> Result<Self> {
        let idx = CameraIndex::Index(index);

        let fmt = CameraFormat::new(
            Resolution::new(width, height),
            FrameFormat::YUYV, // uncompressed; cheap to convert to RGB
            30,
        );
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

        let mut cam = Camera::new(idx, req)
            .map_err(|e| Error::CameraInit(format!("create camera {index}: {e}")))?;
        cam.open_stream()
            .map_err(|e| Error::CameraInit(format!("open stream: {e}")))?;

        // The stream might choose a slightly different resolution.
        let actual = cam.resolution();
        info!(index, width = actual.width(), height = actual.height(), "camera streaming");

        Ok(Self {
            cam,
            width: actual.width(),
            height: actual.height(),
        })
    }
}

impl FrameSource for CameraSource {
    /// Blocks until the device delivers the next frame.
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let frame = self
            .cam
            .frame()
            .map_err(|e| Error::CameraFrame(format!("fetch frame: {e}")))?;
        let rgb = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::CameraFrame(format!("decode RGB: {e}")))?;
        from_rgb_image(&rgb).map(Some)
    }

    fn resolution(&self) -> (usize, usize) {
        (self.width as usize, self.height as usize)
    }
}
