// Readback / encode: turn composited BGRA frames into something that can be
// shown or saved, and decoded images into frames.
// - `load_frame` / `save_frame` for files (image crate, RGBA order)
// - `to_0rgb` for the preview window (one u32 per pixel, 0x00RRGGBB)

use std::path::Path;

use image::{DynamicImage, ImageBuffer, Rgb, RgbaImage};

use crate::error::{Error, Result};
use crate::types::{Frame, BYTES_PER_PIXEL};

/// BGRA frame to an RGBA image (channel swizzle, padding dropped).
pub fn to_rgba_image(frame: &Frame) -> Result<RgbaImage> {
    let mut rgba = Vec::with_capacity(frame.width() * frame.height() * BYTES_PER_PIXEL);
    for y in 0..frame.height() {
        for px in frame.row(y).chunks_exact(BYTES_PER_PIXEL) {
            rgba.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
        }
    }
    let (w, h) = dims_u32(frame)?;
    RgbaImage::from_raw(w, h, rgba)
        .ok_or_else(|| Error::InvalidFrame("rgba buffer does not match frame size".into()))
}

/// RGBA image to a packed BGRA frame.
pub fn from_rgba_image(image: &RgbaImage) -> Result<Frame> {
    let (w, h) = image.dimensions();
    let mut bgra = Vec::with_capacity(image.as_raw().len());
    for px in image.pixels() {
        let [r, g, b, a] = px.0;
        bgra.extend_from_slice(&[b, g, r, a]);
    }
    Frame::from_bgra(w as usize, h as usize, bgra)
}

/// RGB image (camera frames) to a packed BGRA frame with opaque alpha.
pub fn from_rgb_image(image: &ImageBuffer<Rgb<u8>, Vec<u8>>) -> Result<Frame> {
    let (w, h) = image.dimensions();
    let mut bgra = Vec::with_capacity(w as usize * h as usize * BYTES_PER_PIXEL);
    for px in image.pixels() {
        let [r, g, b] = px.0;
        bgra.extend_from_slice(&[b, g, r, 255]);
    }
    Frame::from_bgra(w as usize, h as usize, bgra)
}

pub fn from_dynamic_image(image: &DynamicImage) -> Result<Frame> {
    from_rgba_image(&image.to_rgba8())
}

/// Decode any format the image crate knows into a frame.
pub fn load_frame(path: &Path) -> Result<Frame> {
    let image = image::open(path)?;
    from_dynamic_image(&image)
}

/// Encode a frame to a file; format follows the extension.
pub fn save_frame(frame: &Frame, path: &Path) -> Result<()> {
    to_rgba_image(frame)?.save(path)?;
    Ok(())
}

/// Pack pixels as 0x00RRGGBB for the preview window. Alpha is dropped.
pub fn to_0rgb(frame: &Frame) -> Vec<u32> {
    let mut out = Vec::with_capacity(frame.width() * frame.height());
    for y in 0..frame.height() {
        for px in frame.row(y).chunks_exact(BYTES_PER_PIXEL) {
            let (b, g, r) = (px[0] as u32, px[1] as u32, px[2] as u32);
            out.push((r << 16) | (g << 8) | b);
        }
    }
    out
}

fn dims_u32(frame: &Frame) -> Result<(u32, u32)> {
    let w = u32::try_from(frame.width())
        .map_err(|_| Error::InvalidFrame(format!("width {} too large", frame.width())))?;
    let h = u32::try_from(frame.height())
        .map_err(|_| Error::InvalidFrame(format!("height {} too large", frame.height())))?;
    Ok((w, h))
}
