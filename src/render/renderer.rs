use std::time::Instant;

use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::config::{Configuration, FilterSettings};
use crate::error::{Error, Result};
use crate::gpu::programs::{FrameUniforms, Programs};
use crate::gpu::surface::OffscreenSurface;
use crate::gpu::texture::PhotoTexture;
use crate::gpu::wgpu_backend::WgpuBackend;
use crate::host::{GpuHandles, SurfaceSize, TouchEvent, TouchPhase, WallpaperEngine};
use crate::media::{self, MediaIndex};
use crate::processing::{self, PreparedFrame};
use crate::render::filters::{self, DrawCommand, FilterKind, PassTarget, TextureSlot};
use crate::render::session::RenderSession;

struct GpuState {
    device: wgpu::Device,
    queue: wgpu::Queue,
    backend: WgpuBackend,
    programs: Programs,
    photo: Option<PhotoTexture>,
    offscreen: Option<OffscreenSurface<WgpuBackend>>,
}

impl GpuState {
    fn release_offscreen(&mut self) {
        if let Some(mut surface) = self.offscreen.take() {
            surface.release(&mut self.backend);
        }
    }

    fn ensure_offscreen(&mut self, size: SurfaceSize) -> Result<()> {
        let wanted = (size.width, size.height);
        if self
            .offscreen
            .as_ref()
            .is_some_and(|s| s.is_valid() && s.size() == wanted)
        {
            return Ok(());
        }
        self.release_offscreen();
        self.offscreen = Some(OffscreenSurface::allocate(
            &mut self.backend,
            size.width,
            size.height,
            true,
        )?);
        Ok(())
    }
}

/// Draws a random photo from `I` through one of the configured filters.
pub struct FrameRenderer<I> {
    index: I,
    rng: StdRng,
    settings: FilterSettings,
    offscreen_mode: bool,
    session: RenderSession,
    gpu: Option<GpuState>,
    dirty: bool,
}

impl<I: MediaIndex> FrameRenderer<I> {
    #[must_use]
    pub fn new(cfg: &Configuration, index: I, rng: StdRng) -> Self {
        Self {
            index,
            rng,
            settings: cfg.filter_settings,
            offscreen_mode: cfg.offscreen,
            session: RenderSession::new(cfg),
            gpu: None,
            dirty: true,
        }
    }

    #[must_use]
    pub fn session(&self) -> &RenderSession {
        &self.session
    }

    fn needs_offscreen(&self) -> bool {
        self.offscreen_mode || self.session.filters().contains(&FilterKind::SmoothToon)
    }

    /// Try to switch to a new random photo. Recoverable failures are logged
    /// and leave the current photo in place.
    ///
    /// Returns whether a new photo was committed.
    ///
    /// # Errors
    /// Only unrecoverable graphics failures.
    pub fn reload(&mut self, now: Instant) -> Result<bool> {
        self.session.mark_load_attempt(now);
        let frame = match self.load_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(false),
            Err(err) if err.is_recoverable() => {
                warn!(error = %err, "photo load failed; keeping the current photo");
                return Ok(false);
            }
            Err(err) => return Err(err),
        };

        let filter = filters::pick(self.session.filters(), &mut self.rng);
        let PreparedFrame {
            image,
            bitmap,
            crop,
        } = frame;
        if let Some(gpu) = self.gpu.as_mut() {
            let previous = gpu.photo.take();
            gpu.photo = Some(PhotoTexture::upload(&gpu.device, &gpu.queue, previous, &bitmap));
        }
        info!(
            path = %image,
            width = bitmap.width,
            height = bitmap.height,
            filter = filter.and_then(|i| self.session.filters().get(i)).map(|f| f.as_str()),
            "photo loaded"
        );
        self.session
            .commit(image, (bitmap.width, bitmap.height), crop, filter);
        self.dirty = true;
        Ok(true)
    }

    fn load_frame(&mut self) -> Result<Option<PreparedFrame>> {
        let Some(image) = media::select_random(&self.index, &mut self.rng)? else {
            info!("no photos available");
            return Ok(None);
        };
        processing::prepare_for_viewport(&image, self.session.viewport())
    }

    fn draw(&mut self, target: &wgpu::TextureView) -> Result<()> {
        let Some(gpu) = self.gpu.as_mut() else {
            return Ok(());
        };
        let viewport = self.session.viewport();
        let transform = self.session.transform();
        let command = match (gpu.photo.is_some(), self.session.filter()) {
            (false, _) => None,
            (true, Some(filter)) => Some(filter.apply(transform, self.offscreen_mode)),
            (true, None) => Some(DrawCommand::passthrough(transform)),
        };

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });

        let Some(command) = command else {
            // nothing loaded yet
            encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("clear"),
                color_attachments: &[Some(color_attachment(target))],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            gpu.queue.submit(std::iter::once(encoder.finish()));
            return Ok(());
        };

        if command.needs_offscreen() {
            gpu.ensure_offscreen(viewport)?;
        }

        for (i, pass) in command.passes().iter().enumerate() {
            let (input_view, sampler, input_size) = match pass.input {
                TextureSlot::Photo => {
                    let photo = gpu
                        .photo
                        .as_ref()
                        .ok_or_else(|| Error::GraphicsSetup("photo texture missing".into()))?;
                    (photo.view(), photo.sampler(), photo.size())
                }
                TextureSlot::Offscreen => {
                    let surface = gpu
                        .offscreen
                        .as_ref()
                        .ok_or_else(|| Error::GraphicsSetup("offscreen surface missing".into()))?;
                    let color = surface
                        .color()
                        .ok_or_else(|| Error::GraphicsSetup("offscreen surface released".into()))?;
                    (&color.view, &color.sampler, surface.size())
                }
            };

            let uniforms = gpu
                .programs
                .uniform_buffer(i)
                .ok_or_else(|| Error::GraphicsSetup(format!("no uniform buffer for pass {i}")))?;
            let block = FrameUniforms::new(pass.transform, input_size, &self.settings);
            gpu.queue.write_buffer(uniforms, 0, bytemuck::bytes_of(&block));
            let bind_group = gpu
                .programs
                .bind_group(&gpu.device, uniforms, input_view, sampler);
            let pipeline = gpu
                .programs
                .pipeline(pass.program, pass.output)
                .ok_or_else(|| Error::GraphicsSetup(format!("no pipeline for {:?}", pass.program)))?;

            let mut rpass = match pass.output {
                PassTarget::Screen => encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("screen-pass"),
                    color_attachments: &[Some(color_attachment(target))],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                }),
                PassTarget::Offscreen => {
                    let framebuffer = gpu
                        .offscreen
                        .as_ref()
                        .and_then(OffscreenSurface::framebuffer)
                        .ok_or_else(|| Error::GraphicsSetup("offscreen surface released".into()))?;
                    let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("offscreen-pass"),
                        color_attachments: &[Some(color_attachment(&framebuffer.color))],
                        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                            view: &framebuffer.depth,
                            depth_ops: Some(wgpu::Operations {
                                load: wgpu::LoadOp::Clear(1.0),
                                store: wgpu::StoreOp::Discard,
                            }),
                            stencil_ops: None,
                        }),
                        timestamp_writes: None,
                        occlusion_query_set: None,
                    });
                    if let Some((w, h)) = gpu.backend.viewport() {
                        rpass.set_viewport(0.0, 0.0, w as f32, h as f32, 0.0, 1.0);
                    }
                    rpass
                }
            };
            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, &bind_group, &[]);
            rpass.set_vertex_buffer(0, gpu.programs.quad().slice(..));
            rpass.draw(0..4, 0..1);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        debug!(passes = command.passes().len(), "frame submitted");
        Ok(())
    }
}

fn color_attachment(view: &wgpu::TextureView) -> wgpu::RenderPassColorAttachment<'_> {
    wgpu::RenderPassColorAttachment {
        view,
        depth_slice: None,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            store: wgpu::StoreOp::Store,
        },
    }
}

impl<I: MediaIndex> WallpaperEngine for FrameRenderer<I> {
    fn on_surface_ready(&mut self, gpu: GpuHandles, size: SurfaceSize) -> Result<()> {
        let programs = Programs::new(&gpu.device, gpu.target_format)?;
        let mut state = GpuState {
            backend: WgpuBackend::new(gpu.device.clone()),
            device: gpu.device,
            queue: gpu.queue,
            programs,
            photo: None,
            offscreen: None,
        };
        if self.needs_offscreen() && !size.is_empty() {
            state.ensure_offscreen(size)?;
        }
        self.gpu = Some(state);
        self.session.set_viewport(size);
        self.session.request_reload();
        self.dirty = true;
        info!(width = size.width, height = size.height, "renderer surface ready");
        Ok(())
    }

    fn on_resize(&mut self, size: SurfaceSize) -> Result<()> {
        if size.is_empty() || size == self.session.viewport() {
            return Ok(());
        }
        self.session.set_viewport(size);
        self.session.request_reload();
        self.dirty = true;
        let needs_offscreen = self.needs_offscreen();
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.release_offscreen();
            if needs_offscreen {
                gpu.ensure_offscreen(size)?;
            }
        }
        debug!(width = size.width, height = size.height, "renderer resized");
        Ok(())
    }

    fn on_frame(&mut self, target: &wgpu::TextureView) -> Result<()> {
        let now = Instant::now();
        if self.session.reload_due(now) {
            self.reload(now)?;
        }
        self.draw(target)?;
        self.dirty = false;
        Ok(())
    }

    fn on_touch(&mut self, event: TouchEvent) {
        if event.phase == TouchPhase::Down {
            debug!(x = event.x, y = event.y, "tap; requesting a new photo");
            self.session.request_reload();
        }
    }

    fn wants_frame(&self) -> bool {
        self.dirty || self.session.reload_due(Instant::now())
    }

    fn on_teardown(&mut self) {
        if let Some(mut gpu) = self.gpu.take() {
            gpu.release_offscreen();
            if let Some(photo) = gpu.photo.take() {
                photo.destroy();
            }
            info!("renderer torn down");
        }
    }
}
