use std::path::Path;

use crate::error::VideoError;
use crate::state::Image;

/// An open video stream accepting frames in top-down RGB layout.
pub trait VideoEncoder {
    /// Append one frame.
    fn write_frame(&mut self, frame: &Image) -> Result<(), VideoError>;

    /// Finalize the stream and release the output.
    fn release(&mut self) -> Result<(), VideoError>;
}

/// Opens video streams. Shared across batch workers, hence `Send + Sync`.
pub trait EncoderFactory: Send + Sync {
    /// Open a stream at `path` with the given frame rate and `(width, height)`.
    fn open(
        &self,
        path: &Path,
        fps: u32,
        size: (u32, u32),
    ) -> Result<Box<dyn VideoEncoder>, VideoError>;
}
