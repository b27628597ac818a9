// Frame sources: whatever feeds the compositor one BGRA frame at a time.
// The live loop pulls from a `FrameSource` at its own pace; a source that
// runs dry returns `Ok(None)`.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::readback::load_frame;
use crate::types::Frame;

pub trait FrameSource {
    /// Next frame, blocking until one is ready. `None` once exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// (width, height) of the frames this source produces.
    fn resolution(&self) -> (usize, usize);
}

/// A decoded image file played back as a sequence of identical frames.
pub struct StillImageSource {
    path: PathBuf,
    frame: Frame,
    remaining: Option<usize>,
}

impl StillImageSource {
    /// Decode `path` once. `repeat` of `None` yields forever.
    pub fn open(path: &Path, repeat: Option<usize>) -> Result<Self> {
        let frame = load_frame(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            frame,
            remaining: repeat,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSource for StillImageSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        match self.remaining.as_mut() {
            Some(0) => Ok(None),
            Some(n) => {
                *n -= 1;
                Ok(Some(self.frame.clone()))
            }
            None => Ok(Some(self.frame.clone())),
        }
    }

    fn resolution(&self) -> (usize, usize) {
        (self.frame.width(), self.frame.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readback::save_frame;

    #[test]
    fn still_source_repeats_then_ends() {
        let frame = Frame::filled(3, 2, [5, 6, 7, 255]).unwrap();
        let path = std::env::temp_dir().join(format!("roi-blur-source-{}.png", std::process::id()));
        save_frame(&frame, &path).unwrap();

        let mut source = StillImageSource::open(&path, Some(2)).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(source.resolution(), (3, 2));
        assert_eq!(source.next_frame().unwrap(), Some(frame.clone()));
        assert_eq!(source.next_frame().unwrap(), Some(frame));
        assert_eq!(source.next_frame().unwrap(), None);
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = std::env::temp_dir().join("roi-blur-definitely-missing.png");
        assert!(StillImageSource::open(&path, None).is_err());
    }
}
