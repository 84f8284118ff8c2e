pub mod crop;
pub mod scale;

use image::ImageReader;
use tracing::debug;

use crate::error::{Error, Result};
use crate::host::SurfaceSize;
use crate::media::ImageRef;
use crate::orientation::Orientation;

use self::crop::CropRect;
use self::scale::ScaledBitmap;

/// A scaled bitmap plus the crop that fills the viewport with it.
#[derive(Debug, Clone)]
pub struct PreparedFrame {
    pub image: ImageRef,
    pub bitmap: ScaledBitmap,
    pub crop: CropRect,
}

/// Decode, orient and scale `image` for `viewport`, then fill-crop it.
///
/// `Ok(None)` means the bitmap could not be allocated; the caller keeps
/// whatever it is showing.
///
/// # Errors
/// [`Error::Decode`] when the file header or body cannot be read.
pub fn prepare_for_viewport(image: &ImageRef, viewport: SurfaceSize) -> Result<Option<PreparedFrame>> {
    let path = image.path();
    let (stored_w, stored_h) = ImageReader::open(path)
        .map_err(|err| Error::decode_io(path, err))?
        .with_guessed_format()
        .map_err(|err| Error::decode_io(path, err))?
        .into_dimensions()
        .map_err(|err| Error::decode(path, err))?;

    let (display_w, display_h) = Orientation::read(path).display_size(stored_w, stored_h);
    let (desired_w, desired_h) =
        scale::desired_size_for_viewport(display_w, display_h, viewport.width, viewport.height);
    debug!(
        path = %path.display(),
        display_w,
        display_h,
        desired_w,
        desired_h,
        "preparing frame"
    );

    let Some(bitmap) = scale::scale(image, desired_w, desired_h)? else {
        return Ok(None);
    };
    let crop = CropRect::fill_for(bitmap.width, bitmap.height, viewport.aspect_ratio());
    Ok(Some(PreparedFrame {
        image: image.clone(),
        bitmap,
        crop,
    }))
}
