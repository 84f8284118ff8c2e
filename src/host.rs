//! Capabilities a wallpaper host offers the renderer, and the callbacks it
//! drives.

use crate::error::Result;

/// Pixel size of the drawable surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

impl std::str::FromStr for SurfaceSize {
    type Err = String;

    /// Parse `WIDTHxHEIGHT`, e.g. `1920x1080`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| format!("invalid dimension {v:?} in {s:?}"))
        };
        Ok(Self::new(parse(w)?, parse(h)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Down,
    Up,
    Moved,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    pub x: f32,
    pub y: f32,
}

/// GPU objects the host hands over once its surface exists.
#[derive(Debug, Clone)]
pub struct GpuHandles {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub target_format: wgpu::TextureFormat,
}

/// Lifecycle callbacks a wallpaper host drives, all on one thread.
pub trait WallpaperEngine {
    /// # Errors
    /// [`crate::Error::GraphicsSetup`] when programs or render targets cannot be built.
    fn on_surface_ready(&mut self, gpu: GpuHandles, size: SurfaceSize) -> Result<()>;

    /// # Errors
    /// [`crate::Error::GraphicsSetup`] when the offscreen surface cannot be rebuilt.
    fn on_resize(&mut self, size: SurfaceSize) -> Result<()>;

    /// Draw one frame into `target`, reloading the photo first when due.
    ///
    /// # Errors
    /// Only unrecoverable graphics failures; load failures keep the previous photo.
    fn on_frame(&mut self, target: &wgpu::TextureView) -> Result<()>;

    fn on_touch(&mut self, event: TouchEvent);

    /// Whether the host should schedule a frame now.
    fn wants_frame(&self) -> bool;

    fn on_teardown(&mut self);
}
