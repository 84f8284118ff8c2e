//! EXIF orientation codes and the `imageops` turns that correct them.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::{GenericImage, ImageResult, RgbaImage, imageops};
use tracing::debug;

/// Orientation tag (0x0112) values; discriminants match the EXIF codes 1-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Normal = 1,
    FlipHorizontal = 2,
    Rotate180 = 3,
    FlipVertical = 4,
    Transpose = 5,
    Rotate90 = 6,
    Transverse = 7,
    Rotate270 = 8,
}

impl Orientation {
    pub const ALL: [Self; 8] = [
        Self::Normal,
        Self::FlipHorizontal,
        Self::Rotate180,
        Self::FlipVertical,
        Self::Transpose,
        Self::Rotate90,
        Self::Transverse,
        Self::Rotate270,
    ];

    #[must_use]
    pub fn from_exif(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|o| *o as u32 == code)
    }

    /// Read the orientation of `path`; anything missing or unreadable is `Normal`.
    #[must_use]
    pub fn read(path: &Path) -> Self {
        let Some(code) = read_exif_orientation(path) else {
            return Self::Normal;
        };
        let orientation = Self::from_exif(code).unwrap_or_default();
        debug!(path = %path.display(), code, ?orientation, "exif orientation");
        orientation
    }

    /// Rotations by a quarter turn exchange the width and height axes.
    #[must_use]
    pub const fn swaps_axes(self) -> bool {
        matches!(
            self,
            Self::Transpose | Self::Rotate90 | Self::Transverse | Self::Rotate270
        )
    }

    /// Displayed dimensions of a `width x height` image stored with this orientation.
    #[must_use]
    pub const fn display_size(self, width: u32, height: u32) -> (u32, u32) {
        if self.swaps_axes() {
            (height, width)
        } else {
            (width, height)
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::FlipHorizontal => "flip-horizontal",
            Self::Rotate180 => "rotate-180",
            Self::FlipVertical => "flip-vertical",
            Self::Transpose => "transpose",
            Self::Rotate90 => "rotate-90",
            Self::Transverse => "transverse",
            Self::Rotate270 => "rotate-270",
        }
    }

    /// Turn a stored RGBA8 image upright.
    ///
    /// Returns `None` when the output buffer cannot be allocated.
    #[must_use]
    pub fn apply(self, stored: RgbaImage) -> Option<RgbaImage> {
        if self == Self::Normal {
            return Some(stored);
        }
        let (width, height) = self.display_size(stored.width(), stored.height());
        let mut upright = RgbaImage::from_raw(width, height, try_alloc_rgba8(width, height)?)?;
        // output dimensions come from display_size, so the ops cannot mismatch
        self.place(&stored, &mut upright).ok()?;
        Some(upright)
    }

    fn place(self, stored: &RgbaImage, upright: &mut RgbaImage) -> ImageResult<()> {
        match self {
            Self::Normal => upright.copy_from(stored, 0, 0),
            Self::FlipHorizontal => imageops::flip_horizontal_in(stored, upright),
            Self::Rotate180 => imageops::rotate180_in(stored, upright),
            Self::FlipVertical => imageops::flip_vertical_in(stored, upright),
            Self::Transpose => {
                imageops::rotate90_in(stored, upright)?;
                imageops::flip_horizontal_in_place(upright);
                Ok(())
            }
            Self::Rotate90 => imageops::rotate90_in(stored, upright),
            Self::Transverse => {
                imageops::rotate270_in(stored, upright)?;
                imageops::flip_horizontal_in_place(upright);
                Ok(())
            }
            Self::Rotate270 => imageops::rotate270_in(stored, upright),
        }
    }
}

/// Zeroed RGBA8 buffer for `width x height`, or `None` if it cannot be allocated.
pub(crate) fn try_alloc_rgba8(width: u32, height: u32) -> Option<Vec<u8>> {
    let len = (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(4)?;
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len).ok()?;
    buffer.resize(len, 0);
    Some(buffer)
}

fn read_exif_orientation(path: &Path) -> Option<u32> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    field.value.get_uint(0)
}
