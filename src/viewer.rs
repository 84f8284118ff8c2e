//! Desktop wallpaper host: a winit window driving a wgpu surface.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wgpu::SurfaceError;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowAttributes, WindowId},
};

use crate::host::{GpuHandles, SurfaceSize, TouchEvent, TouchPhase, WallpaperEngine};

const IDLE_POLL: Duration = Duration::from_millis(250);

#[derive(Debug)]
enum ViewerEvent {
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
pub struct WindowOptions {
    pub fullscreen: bool,
}

struct ViewerApp<E> {
    engine: E,
    options: WindowOptions,
    cancel: CancellationToken,
    window: Option<Arc<Window>>,
    surface: Option<wgpu::Surface<'static>>,
    surface_config: Option<wgpu::SurfaceConfiguration>,
    device: Option<wgpu::Device>,
    cursor: (f32, f32),
    failure: Option<anyhow::Error>,
}

impl<E: WallpaperEngine> ViewerApp<E> {
    fn new(engine: E, options: WindowOptions, cancel: CancellationToken) -> Self {
        Self {
            engine,
            options,
            cancel,
            window: None,
            surface: None,
            surface_config: None,
            device: None,
            cursor: (0.0, 0.0),
            failure: None,
        }
    }

    fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Option<Arc<Window>> {
        if let Some(window) = self.window.as_ref() {
            return Some(window.clone());
        }

        let attrs = WindowAttributes::default().with_title("Live Photo Painter");
        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                if self.options.fullscreen {
                    window.set_fullscreen(Some(Fullscreen::Borderless(window.current_monitor())));
                    window.set_cursor_visible(false);
                }
                self.window = Some(window.clone());
                Some(window)
            }
            Err(err) => {
                error!(error = %err, "failed to create viewer window");
                None
            }
        }
    }

    fn init_gpu(&mut self, window: Arc<Window>) -> Result<()> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to acquire GPU adapter")?;

        // filters work on display values, so prefer a non-sRGB target
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|fmt| !fmt.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("surface reports no texture formats")?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("painter-device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
            ..Default::default()
        }))
        .context("failed to acquire GPU device")?;

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        info!(
            width = config.width,
            height = config.height,
            format = ?config.format,
            "viewer surface configured",
        );

        self.engine
            .on_surface_ready(
                GpuHandles {
                    device: device.clone(),
                    queue,
                    target_format: format,
                },
                SurfaceSize::new(config.width, config.height),
            )
            .context("renderer setup failed")?;

        self.surface = Some(surface);
        self.surface_config = Some(config);
        self.device = Some(device);
        Ok(())
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) -> Result<()> {
        let (Some(surface), Some(device), Some(config)) = (
            self.surface.as_ref(),
            self.device.as_ref(),
            self.surface_config.as_mut(),
        ) else {
            return Ok(());
        };
        if new_size.width == 0 || new_size.height == 0 {
            return Ok(());
        }

        config.width = new_size.width;
        config.height = new_size.height;
        surface.configure(device, config);
        debug!(width = config.width, height = config.height, "viewer surface resized");

        self.engine
            .on_resize(SurfaceSize::new(new_size.width, new_size.height))
            .context("renderer resize failed")?;
        self.request_redraw();
        Ok(())
    }

    fn draw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(surface) = self.surface.as_ref() else {
            return;
        };
        let frame = match surface.get_current_texture() {
            Ok(frame) => frame,
            Err(SurfaceError::Outdated | SurfaceError::Lost) => {
                info!("viewer surface lost; reconfiguring");
                if let Some(window) = self.window.as_ref() {
                    let size = window.inner_size();
                    self.fail_on_error(event_loop, |app| app.handle_resize(size));
                }
                return;
            }
            Err(SurfaceError::OutOfMemory) => {
                error!("viewer surface out of memory; exiting event loop");
                event_loop.exit();
                return;
            }
            Err(SurfaceError::Timeout) => {
                warn!("viewer surface acquisition timed out");
                return;
            }
            Err(err) => {
                warn!(error = %err, "viewer surface error; retrying next frame");
                return;
            }
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        if let Err(err) = self.engine.on_frame(&view) {
            error!(error = %err, "rendering failed; exiting event loop");
            self.failure = Some(anyhow::Error::new(err).context("renderer failed"));
            event_loop.exit();
            return;
        }
        frame.present();
    }

    fn fail_on_error(&mut self, event_loop: &ActiveEventLoop, f: impl FnOnce(&mut Self) -> Result<()>) {
        if let Err(err) = f(self) {
            error!(error = ?err, "viewer failure; exiting event loop");
            self.failure = Some(err);
            event_loop.exit();
        }
    }

    fn request_redraw(&self) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn touch(&mut self, phase: TouchPhase) {
        let (x, y) = self.cursor;
        self.engine.on_touch(TouchEvent { phase, x, y });
        self.request_redraw();
    }
}

impl<E: WallpaperEngine> ApplicationHandler<ViewerEvent> for ViewerApp<E> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.cancel.is_cancelled() {
            event_loop.exit();
            return;
        }

        let Some(window) = self.ensure_window(event_loop) else {
            event_loop.exit();
            return;
        };

        if self.device.is_none() {
            self.fail_on_error(event_loop, |app| app.init_gpu(window));
        }
        self.request_redraw();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("viewer window close requested");
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Released
                    && let PhysicalKey::Code(KeyCode::Escape | KeyCode::KeyQ) = event.physical_key
                {
                    event_loop.exit();
                }
            }
            WindowEvent::Resized(new_size) => {
                self.fail_on_error(event_loop, |app| app.handle_resize(new_size));
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let phase = match state {
                    ElementState::Pressed => TouchPhase::Down,
                    ElementState::Released => TouchPhase::Up,
                };
                self.touch(phase);
            }
            WindowEvent::Touch(touch) => {
                self.cursor = (touch.location.x as f32, touch.location.y as f32);
                let phase = match touch.phase {
                    winit::event::TouchPhase::Started => TouchPhase::Down,
                    winit::event::TouchPhase::Moved => TouchPhase::Moved,
                    winit::event::TouchPhase::Ended => TouchPhase::Up,
                    winit::event::TouchPhase::Cancelled => TouchPhase::Cancelled,
                };
                self.touch(phase);
            }
            WindowEvent::RedrawRequested => {
                self.draw(event_loop);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.engine.wants_frame() {
            self.request_redraw();
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + IDLE_POLL));
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Cancelled => {
                info!("viewer received cancellation event");
                event_loop.exit();
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.engine.on_teardown();
        self.surface = None;
    }
}

/// Run `engine` in a window until it closes, `cancel` fires or rendering fails.
///
/// Must be called from within a tokio runtime; cancellation is forwarded into
/// the event loop from a spawned task.
pub fn run_windowed<E: WallpaperEngine>(
    engine: E,
    options: WindowOptions,
    cancel: CancellationToken,
) -> Result<()> {
    let event_loop = EventLoop::<ViewerEvent>::with_user_event()
        .build()
        .context("failed to build viewer event loop")?;
    let proxy = event_loop.create_proxy();

    let cancel_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            cancel.cancelled().await;
            let _ = proxy.send_event(ViewerEvent::Cancelled);
        })
    };

    let mut app = ViewerApp::new(engine, options, cancel);
    let run_result = event_loop.run_app(&mut app);
    cancel_task.abort();

    run_result.context("viewer event loop failed")?;
    match app.failure.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
