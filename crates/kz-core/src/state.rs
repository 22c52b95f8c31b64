use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::render::CameraId;

/// Position and orientation of a body in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// World position `[x, y, z]`.
    pub position: [f64; 3],
    /// Unit quaternion `[w, x, y, z]`.
    pub orientation: [f64; 4],
}

impl Pose {
    /// Identity orientation at the given position.
    pub fn at(position: [f64; 3]) -> Self {
        Self {
            position,
            orientation: [1.0, 0.0, 0.0, 0.0],
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::at([0.0; 3])
    }
}

/// An 8-bit, three-channel image stored row-major.
///
/// Buffers read back from viewers and cameras follow the framebuffer
/// convention: the first row is the *bottom* of the picture and channels
/// are in reverse (BGR) order. [`Image::flipped_for_encoding`] converts such
/// a buffer to top-to-bottom RGB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Image {
    /// Bytes per pixel.
    pub const CHANNELS: usize = 3;

    /// Wrap a raw buffer. Returns `None` unless `data.len() == width * height * 3`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(Self::CHANNELS)?;
        (data.len() == expected).then_some(Self {
            width,
            height,
            data,
        })
    }

    /// An all-black image.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * Self::CHANNELS],
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The raw bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the image, returning its bytes.
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// The three channel values at `(x, y)` in buffer order, or `None` if out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * Self::CHANNELS;
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    /// Overwrite the pixel at `(x, y)`. Out-of-bounds writes are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, value: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * Self::CHANNELS;
        self.data[i..i + Self::CHANNELS].copy_from_slice(&value);
    }

    /// Reverse the row order and the channel order in one pass.
    ///
    /// Turns a bottom-up BGR framebuffer read-back into the top-down RGB
    /// layout video encoders take.
    pub fn flipped_for_encoding(&self) -> Self {
        let row_len = self.width as usize * Self::CHANNELS;
        let mut data = Vec::with_capacity(self.data.len());
        if row_len > 0 {
            for row in self.data.chunks_exact(row_len).rev() {
                for px in row.chunks_exact(Self::CHANNELS) {
                    data.extend_from_slice(&[px[2], px[1], px[0]]);
                }
            }
        }
        Self {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

/// Immutable snapshot of the physics state and camera images at one instant.
///
/// Produced by the engine's sampler; never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    time: f64,
    bodies: Vec<Pose>,
    joint_positions: Vec<f64>,
    camera_views: BTreeMap<CameraId, Image>,
}

impl SimulationState {
    /// Assemble a snapshot.
    pub fn new(
        time: f64,
        bodies: Vec<Pose>,
        joint_positions: Vec<f64>,
        camera_views: BTreeMap<CameraId, Image>,
    ) -> Self {
        Self {
            time,
            bodies,
            joint_positions,
            camera_views,
        }
    }

    /// Simulated time of the snapshot in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Poses of every body, in backend order.
    pub fn bodies(&self) -> &[Pose] {
        &self.bodies
    }

    /// Pose of one body.
    pub fn body_pose(&self, index: usize) -> Option<&Pose> {
        self.bodies.get(index)
    }

    /// Hinge joint positions (radians), in backend order.
    pub fn joint_positions(&self) -> &[f64] {
        &self.joint_positions
    }

    /// Position of one hinge joint.
    pub fn joint_position(&self, index: usize) -> Option<f64> {
        self.joint_positions.get(index).copied()
    }

    /// Image last produced by a camera sensor.
    pub fn camera_view(&self, camera: CameraId) -> Option<&Image> {
        self.camera_views.get(&camera)
    }

    /// All camera images keyed by camera.
    pub fn camera_views(&self) -> &BTreeMap<CameraId, Image> {
        &self.camera_views
    }
}
