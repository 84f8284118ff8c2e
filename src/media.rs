//! Media index and random image selection.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use chrono::{Local, NaiveDateTime, TimeZone};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use rand::Rng;
use tracing::{debug, info, instrument, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::{Error, Result};

const STILL_IMAGE_EXTS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "tif", "tiff"];

/// Opaque handle to a selected source image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef(PathBuf);

impl ImageRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.display().fmt(f)
    }
}

/// One still image known to the index.
#[derive(Debug, Clone)]
pub struct MediaEntry {
    pub image: ImageRef,
    pub captured_at: SystemTime,
}

/// Read-only source of still images, newest capture first.
pub trait MediaIndex {
    /// # Errors
    /// [`Error::MediaAccess`] when the index cannot be opened or read.
    fn query_images(&self) -> Result<Vec<MediaEntry>>;
}

/// Pick one image uniformly at random from everything the index returns.
///
/// `Ok(None)` means the index is readable but holds no images.
///
/// # Errors
/// Propagates [`Error::MediaAccess`] from the index.
pub fn select_random<I, R>(index: &I, rng: &mut R) -> Result<Option<ImageRef>>
where
    I: MediaIndex + ?Sized,
    R: Rng + ?Sized,
{
    let mut entries = index.query_images()?;
    if entries.is_empty() {
        return Ok(None);
    }
    let pick = rng.random_range(0..entries.len());
    Ok(Some(entries.swap_remove(pick).image))
}

/// Media index backed by a set of photo directories.
///
/// The directory walk runs on the first query and again only after the
/// listing goes stale, either through [`LibraryIndex::invalidate`] or a change
/// reported by the watcher started with [`LibraryIndex::watch`].
pub struct LibraryIndex {
    roots: Vec<PathBuf>,
    listing: Mutex<Vec<MediaEntry>>,
    stale: Arc<AtomicBool>,
    watcher: Option<RecommendedWatcher>,
}

impl fmt::Debug for LibraryIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryIndex")
            .field("roots", &self.roots)
            .field("stale", &self.stale.load(Ordering::Acquire))
            .field("watching", &self.watcher.is_some())
            .finish_non_exhaustive()
    }
}

impl LibraryIndex {
    #[must_use]
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            listing: Mutex::new(Vec::new()),
            stale: Arc::new(AtomicBool::new(true)),
            watcher: None,
        }
    }

    /// Rescan on the next query.
    pub fn invalidate(&self) {
        self.stale.store(true, Ordering::Release);
    }

    /// Watch every root recursively; additions, removals and renames mark
    /// the listing stale.
    ///
    /// # Errors
    /// [`Error::MediaAccess`] if the platform watcher cannot be created or a
    /// root cannot be watched.
    pub fn watch(&mut self) -> Result<()> {
        let stale = Arc::clone(&self.stale);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if changes_listing(&event.kind) => {
                debug!(paths = ?event.paths, "photo library changed");
                stale.store(true, Ordering::Release);
            }
            Ok(_) => {}
            Err(err) => warn!("photo library watch error: {err}"),
        })
        .map_err(|err| Error::MediaAccess(format!("cannot watch photo library: {err}")))?;
        for root in &self.roots {
            watcher
                .watch(root, RecursiveMode::Recursive)
                .map_err(|err| {
                    Error::MediaAccess(format!("cannot watch {}: {err}", root.display()))
                })?;
        }
        info!(roots = self.roots.len(), "watching photo library");
        self.watcher = Some(watcher);
        Ok(())
    }

    #[instrument(skip(self), fields(roots = self.roots.len()))]
    fn scan(&self) -> Result<Vec<MediaEntry>> {
        let bad: Vec<_> = self
            .roots
            .iter()
            .filter(|root| !root.is_dir())
            .map(|root| root.to_string_lossy())
            .collect();
        if !bad.is_empty() {
            return Err(Error::MediaAccess(format!(
                "photo library is not a readable directory: {}",
                bad.join(", ")
            )));
        }

        let mut entries = Vec::new();
        for root in &self.roots {
            for entry in WalkDir::new(root)
                .follow_links(true)
                .into_iter()
                .filter_entry(|e| !is_hidden_dir(e))
                .filter_map(|res| match res {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        debug!("skipping unreadable entry: {err}");
                        None
                    }
                })
                .filter(|e| e.file_type().is_file())
            {
                let path = entry.path();
                if !is_still_image(path) {
                    continue;
                }
                // vanished between listing and stat
                let Ok(meta) = entry.metadata() else { continue };
                let captured_at = read_capture_time(path)
                    .or_else(|| meta.modified().ok())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                entries.push(MediaEntry {
                    image: ImageRef::new(path),
                    captured_at,
                });
            }
        }

        entries.sort_by(|a, b| b.captured_at.cmp(&a.captured_at));
        info!(count = entries.len(), "photo library scanned");
        Ok(entries)
    }
}

impl MediaIndex for LibraryIndex {
    fn query_images(&self) -> Result<Vec<MediaEntry>> {
        let mut listing = self.listing.lock().unwrap_or_else(PoisonError::into_inner);
        if self.stale.swap(false, Ordering::AcqRel) {
            match self.scan() {
                Ok(entries) => *listing = entries,
                Err(err) => {
                    self.invalidate();
                    return Err(err);
                }
            }
        }
        Ok(listing.clone())
    }
}

fn changes_listing(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Name(_) | ModifyKind::Data(_))
    )
}

/// Return `true` if `path` has a still-image extension.
#[must_use]
pub fn is_still_image(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            STILL_IMAGE_EXTS.contains(&ext.as_str())
        })
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    // Never skip the root; tempfile roots can be dot-dirs.
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|n| n.starts_with('.'))
}

fn read_capture_time(path: &Path) -> Option<SystemTime> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)?;
    let raw = match &field.value {
        exif::Value::Ascii(parts) => parts.first()?,
        _ => return None,
    };
    let text = std::str::from_utf8(raw).ok()?.trim_end_matches('\0').trim();
    let naive = NaiveDateTime::parse_from_str(text, "%Y:%m:%d %H:%M:%S").ok()?;
    let local = Local.from_local_datetime(&naive).earliest()?;
    Some(local.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::time::Duration;

    struct FixedIndex(Vec<&'static str>);

    impl MediaIndex for FixedIndex {
        fn query_images(&self) -> Result<Vec<MediaEntry>> {
            Ok(self
                .0
                .iter()
                .map(|p| MediaEntry {
                    image: ImageRef::new(p),
                    captured_at: SystemTime::UNIX_EPOCH + Duration::from_secs(1),
                })
                .collect())
        }
    }

    struct BrokenIndex;

    impl MediaIndex for BrokenIndex {
        fn query_images(&self) -> Result<Vec<MediaEntry>> {
            Err(Error::MediaAccess("offline".into()))
        }
    }

    #[test]
    fn empty_index_selects_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(select_random(&FixedIndex(vec![]), &mut rng).unwrap().is_none());
    }

    #[test]
    fn broken_index_surfaces_media_access() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = select_random(&BrokenIndex, &mut rng).unwrap_err();
        assert!(matches!(err, Error::MediaAccess(_)));
    }

    #[test]
    fn selection_covers_every_entry() {
        let index = FixedIndex(vec!["/a.jpg", "/b.jpg", "/c.jpg"]);
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            let pick = select_random(&index, &mut rng).unwrap().unwrap();
            seen.insert(pick.path().to_path_buf());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn listing_changes_come_from_create_remove_and_rename() {
        use notify::event::{AccessKind, CreateKind, MetadataKind, RemoveKind, RenameMode};
        assert!(changes_listing(&EventKind::Create(CreateKind::File)));
        assert!(changes_listing(&EventKind::Remove(RemoveKind::Any)));
        assert!(changes_listing(&EventKind::Modify(ModifyKind::Name(RenameMode::To))));
        assert!(!changes_listing(&EventKind::Access(AccessKind::Any)));
        assert!(!changes_listing(&EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::Permissions
        ))));
    }

    #[test]
    fn extension_filter_is_case_insensitive() {
        assert!(is_still_image(Path::new("/p/IMG_0001.JPG")));
        assert!(is_still_image(Path::new("/p/a.webp")));
        assert!(!is_still_image(Path::new("/p/clip.mp4")));
        assert!(!is_still_image(Path::new("/p/README")));
    }
}
