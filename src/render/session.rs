use std::time::{Duration, Instant};

use cgmath::Matrix4;

use crate::config::Configuration;
use crate::host::SurfaceSize;
use crate::media::ImageRef;
use crate::processing::crop::CropRect;
use crate::render::filters::FilterKind;
use crate::render::transform::{self, PreRotation};

/// Render-thread state for the photo currently on screen.
#[derive(Debug, Clone)]
pub struct RenderSession {
    viewport: SurfaceSize,
    image: Option<ImageRef>,
    bitmap_size: Option<(u32, u32)>,
    crop: CropRect,
    filters: Vec<FilterKind>,
    filter_index: Option<usize>,
    rotation: f32,
    pre_rotation: PreRotation,
    reload_interval: Option<Duration>,
    last_load: Option<Instant>,
    reload_pending: bool,
}

impl RenderSession {
    #[must_use]
    pub fn new(cfg: &Configuration) -> Self {
        Self {
            viewport: SurfaceSize::default(),
            image: None,
            bitmap_size: None,
            crop: CropRect::FULL,
            filters: cfg.filters.clone(),
            filter_index: None,
            rotation: cfg.rotation,
            pre_rotation: cfg.pre_rotation,
            reload_interval: cfg.reload_interval,
            last_load: None,
            reload_pending: true,
        }
    }

    #[must_use]
    pub fn viewport(&self) -> SurfaceSize {
        self.viewport
    }

    /// Record a new viewport; the crop follows the new aspect ratio.
    pub fn set_viewport(&mut self, viewport: SurfaceSize) {
        if viewport == self.viewport {
            return;
        }
        self.viewport = viewport;
        if let Some((w, h)) = self.bitmap_size {
            self.crop = CropRect::fill_for(w, h, viewport.aspect_ratio());
        }
    }

    pub fn request_reload(&mut self) {
        self.reload_pending = true;
    }

    /// A reload is due when one was requested or the interval has elapsed
    /// since the last attempt. Nothing loads until the viewport is known.
    #[must_use]
    pub fn reload_due(&self, now: Instant) -> bool {
        if self.viewport.is_empty() {
            return false;
        }
        if self.reload_pending {
            return true;
        }
        match (self.reload_interval, self.last_load) {
            (Some(interval), Some(last)) => now.saturating_duration_since(last) >= interval,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// Stamp a load attempt, successful or not, and clear the pending request.
    pub fn mark_load_attempt(&mut self, now: Instant) {
        self.last_load = Some(now);
        self.reload_pending = false;
    }

    /// Switch to a successfully loaded photo.
    pub fn commit(&mut self, image: ImageRef, bitmap_size: (u32, u32), crop: CropRect, filter: Option<usize>) {
        self.image = Some(image);
        self.bitmap_size = Some(bitmap_size);
        self.crop = crop;
        self.filter_index = filter;
    }

    #[must_use]
    pub fn image(&self) -> Option<&ImageRef> {
        self.image.as_ref()
    }

    #[must_use]
    pub fn crop(&self) -> CropRect {
        self.crop
    }

    #[must_use]
    pub fn filters(&self) -> &[FilterKind] {
        &self.filters
    }

    #[must_use]
    pub fn filter(&self) -> Option<FilterKind> {
        self.filter_index.and_then(|i| self.filters.get(i).copied())
    }

    #[must_use]
    pub fn last_load(&self) -> Option<Instant> {
        self.last_load
    }

    /// Photo-to-target matrix for the current crop and rotations.
    #[must_use]
    pub fn transform(&self) -> Matrix4<f32> {
        transform::compose(&self.crop, self.pre_rotation, self.rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(interval: Option<Duration>) -> RenderSession {
        let cfg = Configuration {
            reload_interval: interval,
            ..Configuration::default()
        };
        let mut s = RenderSession::new(&cfg);
        s.set_viewport(SurfaceSize::new(200, 100));
        s
    }

    #[test]
    fn nothing_loads_before_the_surface_exists() {
        let cfg = Configuration::default();
        let s = RenderSession::new(&cfg);
        assert!(!s.reload_due(Instant::now()));
    }

    #[test]
    fn first_frame_and_requests_trigger_exactly_one_attempt() {
        let mut s = session(None);
        let now = Instant::now();
        assert!(s.reload_due(now));
        s.mark_load_attempt(now);
        assert!(!s.reload_due(now + Duration::from_secs(3600)));
        s.request_reload();
        assert!(s.reload_due(now));
    }

    #[test]
    fn interval_elapses_from_the_last_attempt() {
        let mut s = session(Some(Duration::from_secs(10)));
        let start = Instant::now();
        s.mark_load_attempt(start);
        assert!(!s.reload_due(start + Duration::from_secs(9)));
        assert!(s.reload_due(start + Duration::from_secs(10)));
        // a failed attempt still counts
        s.mark_load_attempt(start + Duration::from_secs(10));
        assert!(!s.reload_due(start + Duration::from_secs(11)));
    }

    #[test]
    fn resize_recomputes_crop_for_the_current_bitmap() {
        let mut s = session(None);
        s.commit(ImageRef::new("/p/a.jpg"), (100, 100), CropRect::fill_for(100, 100, 2.0), Some(0));
        s.set_viewport(SurfaceSize::new(100, 100));
        assert_eq!(s.crop(), CropRect::FULL);
        assert_eq!(s.filter(), Some(FilterKind::ALL[0]));
    }

    #[test]
    fn out_of_range_filter_index_reads_as_none() {
        let mut s = session(None);
        s.commit(ImageRef::new("/p/a.jpg"), (1, 1), CropRect::FULL, Some(99));
        assert_eq!(s.filter(), None);
    }
}
