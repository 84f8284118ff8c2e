//! Offscreen colour + depth render target.

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Outcome of a framebuffer completeness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramebufferStatus {
    Complete,
    Incomplete(String),
}

/// Graphics operations the surface manager needs from a GPU backend.
pub trait SurfaceBackend {
    type Texture;
    type Renderbuffer;
    type Framebuffer;

    fn set_viewport(&mut self, width: u32, height: u32);

    /// Colour texture with linear filtering and edge clamping.
    fn create_color_texture(&mut self, width: u32, height: u32) -> Result<Self::Texture>;

    /// 16-bit depth renderbuffer.
    fn create_depth_renderbuffer(&mut self, width: u32, height: u32) -> Result<Self::Renderbuffer>;

    fn create_framebuffer(
        &mut self,
        color: &Self::Texture,
        depth: &Self::Renderbuffer,
    ) -> Result<Self::Framebuffer>;

    fn check_framebuffer_status(&mut self, framebuffer: &Self::Framebuffer) -> FramebufferStatus;

    fn delete_texture(&mut self, texture: Self::Texture);
    fn delete_framebuffer(&mut self, framebuffer: Self::Framebuffer);
    fn delete_renderbuffer(&mut self, renderbuffer: Self::Renderbuffer);
}

/// Render target for multi-pass filters. Its handles are all held or all
/// released; call [`OffscreenSurface::release`] before dropping it.
pub struct OffscreenSurface<B: SurfaceBackend> {
    width: u32,
    height: u32,
    color: Option<B::Texture>,
    depth: Option<B::Renderbuffer>,
    framebuffer: Option<B::Framebuffer>,
}

impl<B: SurfaceBackend> OffscreenSurface<B> {
    /// Create a `width x height` colour texture, depth renderbuffer and the
    /// framebuffer joining them. With `set_viewport` the viewport is set
    /// before anything is created.
    ///
    /// # Errors
    /// [`Error::GraphicsSetup`] when any object fails or the framebuffer is
    /// incomplete. Objects created before the failure are released.
    pub fn allocate(backend: &mut B, width: u32, height: u32, set_viewport: bool) -> Result<Self> {
        if set_viewport {
            backend.set_viewport(width, height);
        }
        let mut surface = Self {
            width,
            height,
            color: None,
            depth: None,
            framebuffer: None,
        };
        match surface.build(backend) {
            Ok(()) => {
                debug!(width, height, "offscreen surface allocated");
                Ok(surface)
            }
            Err(err) => {
                surface.release(backend);
                Err(err)
            }
        }
    }

    fn build(&mut self, backend: &mut B) -> Result<()> {
        let color = self.color.insert(backend.create_color_texture(self.width, self.height)?);
        let depth = self.depth.insert(backend.create_depth_renderbuffer(self.width, self.height)?);
        let framebuffer = self.framebuffer.insert(backend.create_framebuffer(color, depth)?);
        match backend.check_framebuffer_status(framebuffer) {
            FramebufferStatus::Complete => Ok(()),
            FramebufferStatus::Incomplete(reason) => Err(Error::GraphicsSetup(format!(
                "offscreen framebuffer {}x{} incomplete: {reason}",
                self.width, self.height
            ))),
        }
    }

    /// Free every held object. Calling it again does nothing.
    pub fn release(&mut self, backend: &mut B) {
        if let Some(framebuffer) = self.framebuffer.take() {
            backend.delete_framebuffer(framebuffer);
        }
        if let Some(color) = self.color.take() {
            backend.delete_texture(color);
        }
        if let Some(depth) = self.depth.take() {
            backend.delete_renderbuffer(depth);
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.color.is_some() && self.depth.is_some() && self.framebuffer.is_some()
    }

    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn color(&self) -> Option<&B::Texture> {
        self.color.as_ref()
    }

    #[must_use]
    pub fn framebuffer(&self) -> Option<&B::Framebuffer> {
        self.framebuffer.as_ref()
    }
}

impl<B: SurfaceBackend> Drop for OffscreenSurface<B> {
    fn drop(&mut self) {
        if self.color.is_some() || self.depth.is_some() || self.framebuffer.is_some() {
            warn!(
                width = self.width,
                height = self.height,
                "offscreen surface dropped without release; GPU objects leaked"
            );
        }
    }
}
