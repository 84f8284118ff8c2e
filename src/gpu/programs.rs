//! Compiled filter programs, their shared quad and per-pass uniforms.

use std::collections::HashMap;

use wgpu::util::DeviceExt;

use crate::config::FilterSettings;
use crate::error::{Error, Result};
use crate::gpu::wgpu_backend::{OFFSCREEN_COLOR_FORMAT, OFFSCREEN_DEPTH_FORMAT};
use crate::render::filters::{DrawCommand, PassTarget, ProgramId};

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    pos: [f32; 2],
}

// Unit quad; texture coordinates equal positions.
const QUAD: [Vertex; 4] = [
    Vertex { pos: [0.0, 0.0] },
    Vertex { pos: [1.0, 0.0] },
    Vertex { pos: [0.0, 1.0] },
    Vertex { pos: [1.0, 1.0] },
];

/// Uniform block shared by every program (96 bytes, matches `Uniforms` in WGSL).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    pub mvp: [[f32; 4]; 4],
    /// `[1/width, 1/height, kuwahara radius, unused]` of the input texture.
    pub texel: [f32; 4],
    /// `[toon threshold, quantization levels, blur radius, sketch strength]`.
    pub params: [f32; 4],
}

impl FrameUniforms {
    #[must_use]
    pub fn new(mvp: cgmath::Matrix4<f32>, input_size: (u32, u32), settings: &FilterSettings) -> Self {
        let (w, h) = input_size;
        Self {
            mvp: mvp.into(),
            texel: [
                1.0 / w.max(1) as f32,
                1.0 / h.max(1) as f32,
                settings.kuwahara_radius as f32,
                0.0,
            ],
            params: [
                settings.toon_threshold,
                settings.toon_quantization_levels,
                settings.smooth_toon_blur_radius,
                settings.sketch_edge_strength,
            ],
        }
    }
}

pub struct Programs {
    bind_layout: wgpu::BindGroupLayout,
    screen: HashMap<ProgramId, wgpu::RenderPipeline>,
    offscreen: HashMap<ProgramId, wgpu::RenderPipeline>,
    quad: wgpu::Buffer,
    uniforms: Vec<wgpu::Buffer>,
}

impl Programs {
    /// Compile every program for both the screen and the offscreen target.
    ///
    /// # Errors
    /// [`Error::GraphicsSetup`] on shader or pipeline validation failure.
    pub fn new(device: &wgpu::Device, screen_format: wgpu::TextureFormat) -> Result<Self> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("filters"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../render/shaders/filters.wgsl").into()),
        });

        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("filter-bind-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipe_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("filter-pipe-layout"),
            bind_group_layouts: &[&bind_layout],
            push_constant_ranges: &[],
        });

        let build = |program: ProgramId, format: wgpu::TextureFormat, depth: bool| {
            let vlayout = wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![0 => Float32x2],
            };
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(program.entry_point()),
                layout: Some(&pipe_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[vlayout],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(program.entry_point()),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    strip_index_format: None,
                    ..Default::default()
                },
                depth_stencil: depth.then(|| wgpu::DepthStencilState {
                    format: OFFSCREEN_DEPTH_FORMAT,
                    depth_write_enabled: false,
                    depth_compare: wgpu::CompareFunction::Always,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let screen = ProgramId::ALL
            .into_iter()
            .map(|p| (p, build(p, screen_format, false)))
            .collect();
        let offscreen = ProgramId::ALL
            .into_iter()
            .map(|p| (p, build(p, OFFSCREEN_COLOR_FORMAT, true)))
            .collect();

        let quad = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad"),
            contents: bytemuck::cast_slice(&QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });

        // one buffer per pass so queued writes don't overwrite each other
        let uniforms = (0..DrawCommand::MAX_PASSES)
            .map(|i| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(if i == 0 { "uniforms-0" } else { "uniforms-1" }),
                    size: std::mem::size_of::<FrameUniforms>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(Error::GraphicsSetup(format!("filter programs: {err}")));
        }

        Ok(Self {
            bind_layout,
            screen,
            offscreen,
            quad,
            uniforms,
        })
    }

    #[must_use]
    pub fn pipeline(&self, program: ProgramId, target: PassTarget) -> Option<&wgpu::RenderPipeline> {
        match target {
            PassTarget::Screen => self.screen.get(&program),
            PassTarget::Offscreen => self.offscreen.get(&program),
        }
    }

    #[must_use]
    pub fn quad(&self) -> &wgpu::Buffer {
        &self.quad
    }

    #[must_use]
    pub fn uniform_buffer(&self, pass: usize) -> Option<&wgpu::Buffer> {
        self.uniforms.get(pass)
    }

    #[must_use]
    pub fn bind_group(
        &self,
        device: &wgpu::Device,
        uniforms: &wgpu::Buffer,
        input: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("filter-bind-group"),
            layout: &self.bind_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(input),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }
}
