use image::{ImageBuffer, Rgba};
use live_photo_painter::config::Configuration;
use live_photo_painter::host::{SurfaceSize, TouchEvent, TouchPhase, WallpaperEngine};
use live_photo_painter::media::{ImageRef, MediaEntry, MediaIndex};
use live_photo_painter::render::renderer::FrameRenderer;
use live_photo_painter::{Error, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::cell::RefCell;
use std::path::PathBuf;
use std::time::{Instant, SystemTime};

/// Index whose contents tests can swap between reloads.
#[derive(Default)]
struct SwappableIndex {
    paths: RefCell<Option<Vec<PathBuf>>>,
}

impl SwappableIndex {
    fn set(&self, paths: Option<Vec<PathBuf>>) {
        *self.paths.borrow_mut() = paths;
    }
}

impl MediaIndex for &SwappableIndex {
    fn query_images(&self) -> Result<Vec<MediaEntry>> {
        match self.paths.borrow().as_ref() {
            None => Err(Error::MediaAccess("index offline".into())),
            Some(paths) => Ok(paths
                .iter()
                .map(|p| MediaEntry {
                    image: ImageRef::new(p),
                    captured_at: SystemTime::UNIX_EPOCH,
                })
                .collect()),
        }
    }
}

fn renderer(index: &SwappableIndex) -> FrameRenderer<&SwappableIndex> {
    let cfg = Configuration {
        photo_library_paths: vec![PathBuf::from("/unused")],
        ..Configuration::default()
    };
    let mut r = FrameRenderer::new(&cfg, index, StdRng::seed_from_u64(5));
    r.on_resize(SurfaceSize::new(200, 100)).unwrap();
    r
}

#[test]
fn failed_loads_keep_the_previous_photo_and_still_stamp_the_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.png");
    ImageBuffer::from_pixel(40, 40, Rgba([10u8, 20, 30, 255]))
        .save(&good)
        .unwrap();

    let index = SwappableIndex::default();
    index.set(Some(vec![good.clone()]));
    let mut r = renderer(&index);

    let t0 = Instant::now();
    assert!(r.reload(t0).unwrap());
    assert_eq!(r.session().image().map(ImageRef::path), Some(good.as_path()));
    assert!(r.session().filter().is_some());
    // square photo on a 2:1 viewport trims rows
    assert!(r.session().crop().top > 0.0);

    // offline index
    index.set(None);
    assert!(!r.reload(t0).unwrap());
    assert_eq!(r.session().image().map(ImageRef::path), Some(good.as_path()));

    // undecodable file
    let broken = dir.path().join("broken.jpg");
    std::fs::write(&broken, b"nope").unwrap();
    index.set(Some(vec![broken]));
    let t1 = Instant::now();
    assert!(!r.reload(t1).unwrap());
    assert_eq!(r.session().last_load(), Some(t1));
    assert_eq!(r.session().image().map(ImageRef::path), Some(good.as_path()));

    // empty library
    index.set(Some(vec![]));
    assert!(!r.reload(Instant::now()).unwrap());
    assert_eq!(r.session().image().map(ImageRef::path), Some(good.as_path()));
}

#[test]
fn taps_request_a_new_photo() {
    let index = SwappableIndex::default();
    index.set(Some(vec![]));
    let mut r = renderer(&index);
    let now = Instant::now();
    r.reload(now).unwrap();
    assert!(!r.session().reload_due(now));

    r.on_touch(TouchEvent {
        phase: TouchPhase::Moved,
        x: 1.0,
        y: 1.0,
    });
    assert!(!r.session().reload_due(now));
    r.on_touch(TouchEvent {
        phase: TouchPhase::Down,
        x: 1.0,
        y: 1.0,
    });
    assert!(r.session().reload_due(now));
}
