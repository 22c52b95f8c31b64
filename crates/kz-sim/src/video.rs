use std::path::{Path, PathBuf};

use kz_core::{EncoderFactory, Image, RecordSettings, VideoEncoder, VideoError};

use crate::cadence::Cadence;

/// Writes frames into one scene's video at the recording cadence.
///
/// The stream is released exactly once: by [`release`](Self::release) or,
/// failing that, on drop.
pub struct VideoRecorder {
    encoder: Box<dyn VideoEncoder>,
    path: PathBuf,
    size: (u32, u32),
    cadence: Cadence,
    frames: u64,
    released: bool,
}

impl std::fmt::Debug for VideoRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoRecorder")
            .field("path", &self.path)
            .field("size", &self.size)
            .field("frames", &self.frames)
            .field("released", &self.released)
            .finish()
    }
}

impl VideoRecorder {
    /// Open `<video_directory>/<scene_id>.mp4` for frames of `size`.
    ///
    /// The cadence starts anchored at t = 0, so the first frame is written
    /// one video step into the run.
    pub fn open(
        factory: &dyn EncoderFactory,
        settings: &RecordSettings,
        scene_id: usize,
        size: (u32, u32),
    ) -> Result<Self, VideoError> {
        if settings.fps == 0 {
            return Err(VideoError::Open {
                path: settings.video_path(scene_id),
                reason: "fps must be at least 1".into(),
            });
        }
        let path = settings.video_path(scene_id);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let encoder = factory.open(&path, settings.fps, size)?;
        log::debug!(
            "Recording {}x{} at {} fps to {}",
            size.0,
            size.1,
            settings.fps,
            path.display()
        );
        let mut cadence = Cadence::new(settings.video_step());
        cadence.mark(0.0);
        Ok(Self {
            encoder,
            path,
            size,
            cadence,
            frames: 0,
            released: false,
        })
    }

    /// Whether a tick starting at `t` owes a frame.
    pub fn is_due(&self, t: f64) -> bool {
        self.cadence.is_due(t)
    }

    /// Anchor the video cadence at `t`.
    pub fn mark(&mut self, t: f64) {
        self.cadence.mark(t);
    }

    /// Append a framebuffer read-back (bottom-up BGR) to the stream.
    pub fn write(&mut self, frame: &Image) -> Result<(), VideoError> {
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
        self.encoder.write_frame(&frame.flipped_for_encoding())?;
        self.frames += 1;
        Ok(())
    }

    /// Finalize the stream. Later calls do nothing.
    pub fn release(&mut self) -> Result<(), VideoError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        log::debug!("Releasing {} after {} frames", self.path.display(), self.frames);
        self.encoder.release()
    }

    /// Frames written so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Output path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frame size.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }
}

impl Drop for VideoRecorder {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::warn!("failed to release video {}: {e}", self.path.display());
        }
    }
}
