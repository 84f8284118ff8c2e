use std::path::Path;

use fast_image_resize as fir;
use image::{ImageReader, RgbaImage};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::media::ImageRef;
use crate::orientation::{Orientation, try_alloc_rgba8};

/// Decoded, oriented and scaled RGBA8 pixels ready for texture upload.
#[derive(Debug, Clone)]
pub struct ScaledBitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Per-axis scale factors, expressed in the output (upright) frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub x: f32,
    pub y: f32,
}

impl ScaleFactors {
    /// Quarter-turn orientations measure the desired width against the stored
    /// height and the desired height against the stored width.
    #[must_use]
    pub fn for_orientation(
        orientation: Orientation,
        source_w: u32,
        source_h: u32,
        desired_w: u32,
        desired_h: u32,
    ) -> Self {
        let (against_w, against_h) = orientation.display_size(source_w.max(1), source_h.max(1));
        Self {
            x: desired_w as f32 / against_w as f32,
            y: desired_h as f32 / against_h as f32,
        }
    }

    /// Size to resample the stored image to before the orientation remap.
    #[must_use]
    pub fn presample_size(&self, orientation: Orientation, source_w: u32, source_h: u32) -> (u32, u32) {
        let round = |v: f32| (v.round() as u32).max(1);
        if orientation.swaps_axes() {
            // output x runs along the stored y axis
            (round(source_w as f32 * self.y), round(source_h as f32 * self.x))
        } else {
            (round(source_w as f32 * self.x), round(source_h as f32 * self.y))
        }
    }
}

/// Decode `image`, correct its EXIF orientation and scale it to
/// `desired_w x desired_h` in a single resampling pass.
///
/// Resampling is a bilinear convolution, which widens its support when
/// shrinking so every source pixel contributes. The orientation remap that
/// follows moves whole pixels and never resamples.
///
/// Returns `Ok(None)` when the output buffers cannot be allocated.
///
/// # Errors
/// [`Error::Decode`] if the file is missing, unreadable or not a supported image;
/// [`Error::Resample`] if the resizer rejects the buffers.
pub fn scale(image: &ImageRef, desired_w: u32, desired_h: u32) -> Result<Option<ScaledBitmap>> {
    let path = image.path();
    let decoded = ImageReader::open(path)
        .map_err(|err| Error::decode_io(path, err))?
        .with_guessed_format()
        .map_err(|err| Error::decode_io(path, err))?
        .decode()
        .map_err(|err| Error::decode(path, err))?
        .to_rgba8();
    let (source_w, source_h) = decoded.dimensions();
    let orientation = Orientation::read(path);

    let factors =
        ScaleFactors::for_orientation(orientation, source_w, source_h, desired_w, desired_h);
    let (pre_w, pre_h) = factors.presample_size(orientation, source_w, source_h);
    debug!(
        path = %path.display(),
        source_w,
        source_h,
        orientation = orientation.label(),
        sx = factors.x,
        sy = factors.y,
        pre_w,
        pre_h,
        "scaling bitmap"
    );

    let (out_w, out_h) = orientation.display_size(pre_w, pre_h);
    let exhausted = || {
        warn!(
            path = %path.display(),
            "{}",
            Error::ResourceExhausted { width: out_w, height: out_h }
        );
        None
    };

    let resampled = if (pre_w, pre_h) == (source_w, source_h) {
        decoded
    } else {
        match resample_rgba8(path, &decoded, pre_w, pre_h)? {
            Some(resampled) => resampled,
            None => return Ok(exhausted()),
        }
    };

    let Some(upright) = orientation.apply(resampled) else {
        return Ok(exhausted());
    };
    Ok(Some(ScaledBitmap {
        width: upright.width(),
        height: upright.height(),
        pixels: upright.into_raw(),
    }))
}

/// Size to request from [`scale`] so the bitmap fits the viewport.
///
/// `display_w`/`display_h` are the upright dimensions of the image. The
/// longest image side is compared with the longest viewport side and the
/// image is shrunk by their ratio when it is larger; it is never enlarged.
#[must_use]
pub fn desired_size_for_viewport(
    display_w: u32,
    display_h: u32,
    view_w: u32,
    view_h: u32,
) -> (u32, u32) {
    let largest_view = view_w.max(view_h);
    let largest_image = display_w.max(display_h);
    let ratio = if largest_image > largest_view {
        largest_view as f32 / largest_image as f32
    } else {
        1.0
    };
    let truncate = |v: u32| ((v as f32 * ratio) as u32).max(1);
    (truncate(display_w), truncate(display_h))
}

/// `Ok(None)` means the target buffer could not be allocated.
fn resample_rgba8(
    path: &Path,
    source: &RgbaImage,
    target_w: u32,
    target_h: u32,
) -> Result<Option<RgbaImage>> {
    let Some(buffer) = try_alloc_rgba8(target_w, target_h) else {
        return Ok(None);
    };
    let src = fir::images::ImageRef::new(
        source.width(),
        source.height(),
        source.as_raw(),
        fir::PixelType::U8x4,
    )
    .map_err(|err| Error::resample(path, err))?;
    let mut dst = fir::images::Image::from_vec_u8(target_w, target_h, buffer, fir::PixelType::U8x4)
        .map_err(|err| Error::resample(path, err))?;
    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Bilinear));
    fir::Resizer::new()
        .resize(&src, &mut dst, Some(&options))
        .map_err(|err| Error::resample(path, err))?;
    RgbaImage::from_raw(target_w, target_h, dst.into_vec())
        .map(Some)
        .ok_or_else(|| Error::resample(path, "resized buffer does not match its dimensions"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upright_factors_compare_like_axes() {
        let f = ScaleFactors::for_orientation(Orientation::Normal, 400, 200, 200, 100);
        assert_eq!(f, ScaleFactors { x: 0.5, y: 0.5 });
        assert_eq!(f.presample_size(Orientation::Normal, 400, 200), (200, 100));
    }

    #[test]
    fn quarter_turn_factors_use_swapped_source_dimensions() {
        // stored 400x200, shown 200x400
        let f = ScaleFactors::for_orientation(Orientation::Rotate90, 400, 200, 100, 200);
        assert_eq!(f, ScaleFactors { x: 0.5, y: 0.5 });
        // resample the stored frame, then the remap turns it upright
        assert_eq!(f.presample_size(Orientation::Rotate90, 400, 200), (200, 100));
        assert_eq!(Orientation::Rotate90.display_size(200, 100), (100, 200));
    }

    #[test]
    fn flips_keep_direct_factors() {
        for o in [Orientation::FlipHorizontal, Orientation::FlipVertical, Orientation::Rotate180] {
            let f = ScaleFactors::for_orientation(o, 300, 100, 150, 50);
            assert_eq!(f, ScaleFactors { x: 0.5, y: 0.5 });
        }
    }

    #[test]
    fn viewport_fit_never_upscales() {
        assert_eq!(desired_size_for_viewport(800, 600, 1920, 1080), (800, 600));
    }

    #[test]
    fn viewport_fit_matches_longest_sides() {
        assert_eq!(desired_size_for_viewport(4032, 3024, 1920, 1080), (1920, 1440));
        assert_eq!(desired_size_for_viewport(3024, 4032, 1080, 1920), (1440, 1920));
    }

    #[test]
    fn viewport_fit_keeps_at_least_one_pixel() {
        assert_eq!(desired_size_for_viewport(10_000, 1, 100, 100), (100, 1));
    }

    #[test]
    fn resample_produces_requested_buffer() {
        let source = RgbaImage::from_pixel(8, 4, image::Rgba([200, 200, 200, 200]));
        let out = resample_rgba8(Path::new("flat.png"), &source, 4, 2)
            .unwrap()
            .unwrap();
        assert_eq!(out.dimensions(), (4, 2));
        assert!(out.as_raw().iter().all(|&v| v == 200));
    }

    #[test]
    fn unallocatable_resample_target_is_not_an_error() {
        let source = RgbaImage::new(2, 2);
        let out = resample_rgba8(Path::new("tiny.png"), &source, u32::MAX, u32::MAX).unwrap();
        assert!(out.is_none());
    }
}
