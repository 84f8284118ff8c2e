use live_photo_painter::Error;
use live_photo_painter::media::{LibraryIndex, MediaIndex, select_random};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

fn touch(path: &PathBuf, age: Duration) {
    fs::write(path, b"x").unwrap();
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
}

#[test]
fn lists_still_images_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir(root.join("trip")).unwrap();
    touch(&root.join("old.jpg"), Duration::from_secs(3600));
    touch(&root.join("trip/new.PNG"), Duration::from_secs(10));
    touch(&root.join("notes.txt"), Duration::from_secs(1));
    touch(&root.join("clip.mov"), Duration::from_secs(1));

    let index = LibraryIndex::new(vec![root.to_path_buf()]);
    let entries = index.query_images().unwrap();
    let names: Vec<_> = entries
        .iter()
        .map(|e| e.image.path().file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["new.PNG", "old.jpg"]);
}

#[test]
fn skips_hidden_directories() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir(root.join(".thumbnails")).unwrap();
    touch(&root.join(".thumbnails/t.jpg"), Duration::ZERO);
    touch(&root.join("keep.jpg"), Duration::ZERO);

    let index = LibraryIndex::new(vec![root.to_path_buf()]);
    let entries = index.query_images().unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].image.path().ends_with("keep.jpg"));
}

#[test]
fn missing_root_is_a_media_access_error() {
    let index = LibraryIndex::new(vec![PathBuf::from("/definitely/not/a/library")]);
    let err = index.query_images().unwrap_err();
    assert!(matches!(err, Error::MediaAccess(_)), "{err:?}");
}

#[test]
fn empty_library_selects_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let index = LibraryIndex::new(vec![dir.path().to_path_buf()]);
    let mut rng = StdRng::seed_from_u64(9);
    assert!(select_random(&index, &mut rng).unwrap().is_none());
}

#[test]
fn selection_comes_from_the_library() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    for name in ["a.jpg", "b.webp", "c.gif"] {
        touch(&root.join(name), Duration::ZERO);
    }
    let index = LibraryIndex::new(vec![root.to_path_buf()]);
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..20 {
        let pick = select_random(&index, &mut rng).unwrap().unwrap();
        assert!(pick.path().starts_with(root));
    }
}

#[test]
fn listing_is_cached_until_invalidated() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    touch(&root.join("first.jpg"), Duration::ZERO);

    let index = LibraryIndex::new(vec![root.to_path_buf()]);
    assert_eq!(index.query_images().unwrap().len(), 1);

    touch(&root.join("second.jpg"), Duration::ZERO);
    assert_eq!(index.query_images().unwrap().len(), 1);

    index.invalidate();
    assert_eq!(index.query_images().unwrap().len(), 2);
}

#[test]
fn failed_scan_is_retried_on_the_next_query() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("late");
    let index = LibraryIndex::new(vec![root.clone()]);
    assert!(index.query_images().is_err());

    fs::create_dir(&root).unwrap();
    touch(&root.join("a.png"), Duration::ZERO);
    assert_eq!(index.query_images().unwrap().len(), 1);
}

#[test]
fn watcher_picks_up_new_photos() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let mut index = LibraryIndex::new(vec![root.to_path_buf()]);
    index.watch().unwrap();
    assert!(index.query_images().unwrap().is_empty());

    touch(&root.join("arrived.jpg"), Duration::ZERO);
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    loop {
        if index.query_images().unwrap().len() == 1 {
            break;
        }
        assert!(std::time::Instant::now() < deadline, "watcher never saw the new photo");
        std::thread::sleep(Duration::from_millis(50));
    }
}
