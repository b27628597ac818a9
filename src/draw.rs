// Preview window + software overlay drawing.
// 1) `outline_rect` traces a 1-pixel box on a frame, so you can see which
//    regions a detector asked to blur.
// 2) `Viewer` (feature `window`) shows composited frames live.

use crate::types::{Frame, Rect};

/// Put a pixel on the frame if (x,y) is inside bounds.
#[inline]
fn put_pixel(frame: &mut Frame, x: i64, y: i64, bgra: [u8; 4]) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= frame.width() || y >= frame.height() {
        return;
    }
    frame.set_pixel(x, y, bgra);
}

/// Draw a 1-pixel outline just inside the clamped rectangle.
/// Rectangles that clamp to nothing draw nothing.
pub fn outline_rect(frame: &mut Frame, rect: &Rect, bgra: [u8; 4]) {
    let Some(r) = rect.clamp_to(frame.width(), frame.height()) else {
        return;
    };
    let (x0, y0) = (r.x as i64, r.y as i64);
    let (x1, y1) = (r.right() as i64 - 1, r.bottom() as i64 - 1);
    for x in x0..=x1 {
        put_pixel(frame, x, y0, bgra);
        put_pixel(frame, x, y1, bgra);
    }
    for y in y0..=y1 {
        put_pixel(frame, x0, y, bgra);
        put_pixel(frame, x1, y, bgra);
    }
}

#[cfg(feature = "window")]
pub use viewer::Viewer;

#[cfg(feature = "window")]
mod viewer {
    use minifb::{Key, Window, WindowOptions};

    use crate::error::{Error, Result};
    use crate::readback::to_0rgb;
    use crate::types::Frame;

    pub struct Viewer {
        window: Window,
    }

    impl Viewer {
        /// Create a window sized to the frames it will show.
        pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
            let window = Window::new(title, width, height, WindowOptions::default())
                .map_err(|e| Error::WindowInit(e.to_string()))?;
            Ok(Self { window })
        }

        /// Push one composited frame to the screen.
        pub fn present(&mut self, frame: &Frame) -> Result<()> {
            let pixels = to_0rgb(frame);
            self.window
                .update_with_buffer(&pixels, frame.width(), frame.height())
                .map_err(|e| Error::WindowUpdate(e.to_string()))
        }

        /// False once the user closes the window or holds ESC.
        pub fn is_open(&self) -> bool {
            self.window.is_open() && !self.window.is_key_down(Key::Escape)
        }
    }
}
