//! Projection and model-view composition for the full-screen quad.
//!
//! Matrices follow the GL conventions: column-major, clip-space depth in
//! `-1..1`. The vertex shader flattens depth before wgpu clips it.

use cgmath::{Deg, Matrix4, SquareMatrix, Vector3};
use serde::Deserialize;

use crate::processing::crop::CropRect;

/// Rotation applied to the whole frame to match the physical display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "u16")]
pub enum PreRotation {
    #[default]
    None,
    Quarter,
    Half,
    ThreeQuarter,
}

impl PreRotation {
    #[must_use]
    pub const fn degrees(self) -> u16 {
        match self {
            Self::None => 0,
            Self::Quarter => 90,
            Self::Half => 180,
            Self::ThreeQuarter => 270,
        }
    }

    #[must_use]
    pub const fn swaps_axes(self) -> bool {
        matches!(self, Self::Quarter | Self::ThreeQuarter)
    }
}

impl TryFrom<u16> for PreRotation {
    type Error = String;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Self::None),
            90 => Ok(Self::Quarter),
            180 => Ok(Self::Half),
            270 => Ok(Self::ThreeQuarter),
            other => Err(format!("pre-rotation must be 0, 90, 180 or 270, got {other}")),
        }
    }
}

/// Orthographic projection over the crop window, rotated for the display.
#[must_use]
pub fn projection(crop: &CropRect, pre_rotation: PreRotation) -> Matrix4<f32> {
    let ortho = if pre_rotation.swaps_axes() {
        cgmath::ortho(crop.top, crop.bottom, crop.right, crop.left, 0.0, 1.0)
    } else {
        cgmath::ortho(crop.left, crop.right, crop.bottom, crop.top, 0.0, 1.0)
    };
    match pre_rotation {
        PreRotation::None => ortho,
        other => Matrix4::from_angle_z(Deg(-f32::from(other.degrees()))) * ortho,
    }
}

/// Rotation of the unit quad about its centre.
#[must_use]
pub fn model_view(rotation_degrees: f32) -> Matrix4<f32> {
    if rotation_degrees == 0.0 {
        return Matrix4::identity();
    }
    Matrix4::from_translation(Vector3::new(0.5, 0.5, 0.0))
        * Matrix4::from_angle_z(Deg(rotation_degrees))
        * Matrix4::from_translation(Vector3::new(-0.5, -0.5, 0.0))
}

/// Final matrix handed to the vertex shader.
#[must_use]
pub fn compose(crop: &CropRect, pre_rotation: PreRotation, rotation_degrees: f32) -> Matrix4<f32> {
    projection(crop, pre_rotation) * model_view(rotation_degrees)
}

/// Matrix for passes that copy a whole texture onto a whole target.
#[must_use]
pub fn identity_blit() -> Matrix4<f32> {
    projection(&CropRect::FULL, PreRotation::None)
}
