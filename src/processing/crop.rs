use tracing::warn;

/// Visible region of a texture in normalized (0..1) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl CropRect {
    pub const FULL: Self = Self {
        left: 0.0,
        top: 0.0,
        right: 1.0,
        bottom: 1.0,
    };

    /// Fill crop for a `width x height` bitmap shown at `dest_aspect`.
    #[must_use]
    pub fn fill_for(width: u32, height: u32, dest_aspect: f32) -> Self {
        fill_crop(width as f32 / height.max(1) as f32, dest_aspect)
    }
}

impl Default for CropRect {
    fn default() -> Self {
        Self::FULL
    }
}

/// Crop that covers the destination edge to edge instead of letterboxing.
///
/// Wider sources lose equal slices on the left and right. Taller sources lose
/// rows from top and bottom, but the window is shifted up by half of the
/// per-side trim, so more is cut from the bottom than from the top.
#[must_use]
pub fn fill_crop(source_aspect: f32, dest_aspect: f32) -> CropRect {
    let usable = |a: f32| a.is_finite() && a > 0.0;
    if !usable(source_aspect) || !usable(dest_aspect) {
        warn!(source_aspect, dest_aspect, "unusable aspect ratio; showing full image");
        return CropRect::FULL;
    }

    // Every length below is relative to the source; with height 1 the width
    // is the aspect ratio itself.
    if source_aspect > dest_aspect {
        let (width, height) = (source_aspect, 1.0);
        let new_width = height * dest_aspect;
        let width_diff = (width - new_width) / 2.0;
        let delta = width_diff / width;
        CropRect {
            left: delta,
            top: 0.0,
            right: 1.0 - delta,
            bottom: 1.0,
        }
    } else {
        let (width, height) = (source_aspect, 1.0);
        let new_height = width / dest_aspect;
        let height_diff = (height - new_height) / 2.0;
        let delta = height_diff / height;
        let offset = delta * 0.5;
        CropRect {
            left: 0.0,
            top: delta - offset,
            right: 1.0,
            bottom: 1.0 - delta - offset,
        }
    }
}
