use base64::Engine;
use image::{ImageBuffer, Rgba};
use live_photo_painter::Error;
use live_photo_painter::host::SurfaceSize;
use live_photo_painter::media::ImageRef;
use live_photo_painter::processing::prepare_for_viewport;
use live_photo_painter::processing::scale::scale;
use std::path::Path;

// 2x1 JPEG stored with EXIF orientation 6 (rotate 90 clockwise to view).
const ORIENT6_JPEG: &str = concat!(
    "/9j/4AAQSkZJRgABAQAAAQABAAD/4QAiRXhpZgAATU0AKgAAAAgAAQESAAMAAAABAAYAAAAAAAD/2wBDAAgGBgcGBQgHBwcJCQgKDBQNDAsLDBkSEw8UHRofHh0aHBwgJC4nICIsIxwcKDcpLDAxNDQ0Hyc5PTgyPC4zNDL/",
    "2wBDAQkJCQwLDBgNDRgyIRwhMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjL/wAARCAABAAIDASIAAhEBAxEB/8QAHwAAAQUBAQEBAQEAAAAAAAAAAAECAwQFBgcICQoL/8QAtRAAAgEDAwIEAwUFBAQAAAF9AQIDAAQRBRIhMUEGE1FhByJxFDKBkaEII0KxwRVS0fAkM2JyggkKFhcYGRolJicoKSo0NTY3ODk6Q0RFRkdISUpTVFVWV1hZWmNkZWZnaGlqc3R1dnd4eXqDhIWGh4iJipKTlJWWl5iZmqKjpKWmp6ipqrKztLW2t7i5usLDxMXGx8jJytLT1NXW19jZ2uHi4+Tl5ufo6erx8vP09fb3+Pn6/8QAHwEAAwEBAQEBAQEBAQAAAAAAAAECAwQFBgcICQoL/8QAtREAAgECBAQDBAcFBAQAAQJ3AAECAxEEBSExBhJBUQdhcRMiMoEIFEKRobHBCSMzUvAVYnLRChYkNOEl8RcYGRomJygpKjU2Nzg5OkNERUZHSElKU1RVVldYWVpjZGVmZ2hpanN0dXZ3eHl6goOEhYaHiImKkpOUlZaXmJmaoqOkpaanqKmqsrO0tba3uLm6wsPExcbHyMnK0tPU1dbX2Nna4uPk5ebn6Onq8vP09fb3+Pn6/9oADAMBAAIRAxEAPwDi6KKK+ZP3E//Z"
);

fn write_png(dir: &Path, name: &str, w: u32, h: u32) -> ImageRef {
    let img = ImageBuffer::from_fn(w, h, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255]));
    let path = dir.join(name);
    img.save(&path).unwrap();
    ImageRef::new(path)
}

fn write_orient6(dir: &Path) -> ImageRef {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(ORIENT6_JPEG)
        .unwrap();
    let path = dir.join("orient6.jpg");
    std::fs::write(&path, bytes).unwrap();
    ImageRef::new(path)
}

#[test]
fn scales_to_the_requested_size() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_png(dir.path(), "wide.png", 400, 200);
    let bitmap = scale(&image, 200, 100).unwrap().unwrap();
    assert_eq!((bitmap.width, bitmap.height), (200, 100));
    assert_eq!(bitmap.pixels.len(), 200 * 100 * 4);
}

#[test]
fn identity_scale_keeps_pixels() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_png(dir.path(), "small.png", 3, 2);
    let bitmap = scale(&image, 3, 2).unwrap().unwrap();
    // pixel (2, 1)
    let at = (1 * 3 + 2) * 4;
    assert_eq!(&bitmap.pixels[at..at + 4], &[2, 1, 128, 255]);
}

#[test]
fn orientation_six_is_turned_upright() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_orient6(dir.path());
    let bitmap = scale(&image, 1, 2).unwrap().unwrap();
    assert_eq!((bitmap.width, bitmap.height), (1, 2));
}

#[test]
fn missing_file_is_a_decode_error() {
    let err = scale(&ImageRef::new("/no/such/photo.jpg"), 10, 10).unwrap_err();
    assert!(matches!(err, Error::Decode { .. }), "{err:?}");
    assert!(err.is_recoverable());
}

#[test]
fn garbage_file_is_a_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.jpg");
    std::fs::write(&path, b"definitely not a jpeg").unwrap();
    let err = scale(&ImageRef::new(&path), 10, 10).unwrap_err();
    assert!(matches!(err, Error::Decode { .. }), "{err:?}");
}

#[test]
fn prepare_fits_and_fill_crops_a_landscape_photo() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_png(dir.path(), "landscape.png", 400, 300);
    let frame = prepare_for_viewport(&image, SurfaceSize::new(200, 200))
        .unwrap()
        .unwrap();
    assert_eq!((frame.bitmap.width, frame.bitmap.height), (200, 150));
    // 4:3 onto a square drops an eighth from each side
    assert!((frame.crop.left - 0.125).abs() < 1e-6);
    assert!((frame.crop.right - 0.875).abs() < 1e-6);
    assert_eq!((frame.crop.top, frame.crop.bottom), (0.0, 1.0));
    assert_eq!(frame.image, image);
}

#[test]
fn prepare_transposes_the_bounding_box_for_rotated_photos() {
    let dir = tempfile::tempdir().unwrap();
    let upright = write_png(dir.path(), "upright.png", 2, 1);
    let rotated = write_orient6(dir.path());
    let viewport = SurfaceSize::new(100, 100);

    let a = prepare_for_viewport(&upright, viewport).unwrap().unwrap();
    let b = prepare_for_viewport(&rotated, viewport).unwrap().unwrap();
    assert_eq!((a.bitmap.width, a.bitmap.height), (2, 1));
    assert_eq!((b.bitmap.width, b.bitmap.height), (1, 2));

    // portrait bitmap on a square viewport: rows trimmed with an upward bias
    assert!((b.crop.top - 0.125).abs() < 1e-6, "{:?}", b.crop);
    assert!((b.crop.bottom - 0.625).abs() < 1e-6, "{:?}", b.crop);
}

#[test]
fn unallocatable_sizes_skip_the_photo_without_failing() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_png(dir.path(), "tiny.png", 4, 4);
    assert!(scale(&image, u32::MAX, u32::MAX).unwrap().is_none());

    let rotated = write_orient6(dir.path());
    assert!(scale(&rotated, u32::MAX, u32::MAX).unwrap().is_none());
}
