use std::path::{Path, PathBuf};

use image::RgbImage;
use kz_core::{EncoderFactory, Image, VideoEncoder, VideoError};

/// Encodes videos as numbered PNG frames.
///
/// A stream opened at `videos/3.mp4` writes `videos/3/frame_000000.png`,
/// `videos/3/frame_000001.png` and so on.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngSequenceEncoder;

impl EncoderFactory for PngSequenceEncoder {
    fn open(
        &self,
        path: &Path,
        fps: u32,
        size: (u32, u32),
    ) -> Result<Box<dyn VideoEncoder>, VideoError> {
        let dir = path.with_extension("");
        std::fs::create_dir_all(&dir).map_err(|e| VideoError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        log::debug!("Writing {fps} fps PNG sequence to {}", dir.display());
        Ok(Box::new(PngSequence {
            dir,
            size,
            next: 0,
            released: false,
        }))
    }
}

/// An open PNG frame sequence.
#[derive(Debug)]
pub struct PngSequence {
    dir: PathBuf,
    size: (u32, u32),
    next: u64,
    released: bool,
}

impl PngSequence {
    /// Directory receiving the frames.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("frame_{index:06}.png"))
    }
}

impl VideoEncoder for PngSequence {
    fn write_frame(&mut self, frame: &Image) -> Result<(), VideoError> {
        if self.released {
            return Err(VideoError::Released);
        }
        if frame.size() != self.size {
            return Err(VideoError::FrameSize {
                width: self.size.0,
                height: self.size.1,
                got_width: frame.width(),
                got_height: frame.height(),
            });
        }
        let buffer = RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or_else(|| VideoError::Write("frame buffer has the wrong length".into()))?;
        buffer
            .save(self.frame_path(self.next))
            .map_err(|e| VideoError::Write(e.to_string()))?;
        self.next += 1;
        Ok(())
    }

    fn release(&mut self) -> Result<(), VideoError> {
        self.released = true;
        Ok(())
    }
}
