//! Renderer: wgpu device, depth buffer and the lit entity pipeline.
//! wgpu = 26.x, winit = 0.30.x
//!
//! [`GpuState`] implements [`GraphicsDevice`]: bind/draw calls made
//! between [`GpuState::begin_frame`] and [`GpuState::present`] are recorded
//! and encoded into a single render pass when the frame is presented.

pub mod draw_list;
pub mod uniforms;

use std::num::NonZeroU64;
use std::sync::Arc;

use asset::texture::TextureData;
use asset::{ObjVertex, VertexLayout};
use corelib::{GpuMeshId, GraphicsDevice, Mat4, RenderView, TextureId, Vec3};
use thiserror::Error;
use wgpu::{
    util::DeviceExt, BindGroup, BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry,
    BindingType, BlendState, Buffer, BufferBindingType, BufferUsages, ColorTargetState,
    ColorWrites, CommandEncoderDescriptor, DepthBiasState, DepthStencilState, Device,
    DeviceDescriptor, Extent3d, Features, FragmentState, Instance, InstanceDescriptor, Limits,
    LoadOp, Operations, PipelineLayoutDescriptor, PowerPreference, PresentMode, Queue,
    RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor,
    Sampler, ShaderModuleDescriptor, ShaderSource, ShaderStages, StoreOp, Surface,
    SurfaceConfiguration, SurfaceError, TextureDescriptor, TextureDimension, TextureFormat,
    TextureUsages, TextureView, TextureViewDescriptor, VertexBufferLayout, VertexState,
    VertexStepMode,
};
use winit::{dpi::PhysicalSize, window::Window};

use draw_list::DrawList;
use uniforms::{DRAW_UNIFORM_STRIDE, DrawUniform, GlobalsUniform, align_to, vertex_attributes};

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.2,
    g: 0.3,
    b: 0.3,
    a: 1.0,
};

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to open GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}

struct GpuMesh {
    buffer: Buffer,
    vertex_count: u32,
}

pub struct GpuState {
    // Surface
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,

    // Pipeline
    pipeline: RenderPipeline,
    globals_buf: Buffer,
    globals_bg: BindGroup,
    draw_bgl: BindGroupLayout,
    draw_buf: Buffer,
    draw_bg: BindGroup,
    draw_capacity: u64,
    texture_bgl: BindGroupLayout,
    sampler: Sampler,

    // Resources handed out through GraphicsDevice
    meshes: Vec<GpuMesh>,
    textures: Vec<BindGroup>,
    white_texture: BindGroup,

    // Frame
    draws: DrawList,
    view: Option<RenderView>,

    // Depth
    depth_view: TextureView,

    // Size cache
    width: u32,
    height: u32,
}

impl GpuState {
    /// Create GPU state bound to an Arc<Window>.
    pub async fn new(window: Arc<Window>, backends: wgpu::Backends) -> Result<Self, RendererError> {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);

        // Instance & surface
        let instance = Instance::new(&InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        let info = adapter.get_info();
        log::info!("Using adapter '{}' ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("Ogt3D Device"),
                required_features: Features::empty(),
                required_limits: Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits()),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(caps.formats[0]);

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let depth_view = create_depth_view(&device, &surface_config);

        // ==== Shaders ====
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Entity WGSL"),
            source: ShaderSource::Wgsl(include_str!("shaders/entity.wgsl").into()),
        });

        // ==== Group 0: per-frame globals ====
        let globals_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Globals BGL"),
            entries: &[uniform_entry(
                ShaderStages::VERTEX_FRAGMENT,
                false,
                size_of::<GlobalsUniform>() as u64,
            )],
        });
        let globals_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Globals UBO"),
            size: size_of::<GlobalsUniform>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Globals BG"),
            layout: &globals_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buf.as_entire_binding(),
            }],
        });

        // ==== Group 1: per-draw block, dynamic offset ====
        let draw_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Draw BGL"),
            entries: &[uniform_entry(
                ShaderStages::VERTEX_FRAGMENT,
                true,
                size_of::<DrawUniform>() as u64,
            )],
        });
        let draw_capacity = 64;
        let (draw_buf, draw_bg) = create_draw_buffer(&device, &draw_bgl, draw_capacity);

        // ==== Group 2: base texture ====
        let texture_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Texture BGL"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Base Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let white_texture = create_texture_bind_group(
            &device,
            &queue,
            &texture_bgl,
            &sampler,
            "White",
            &TextureData::white(),
        );

        // ==== Pipeline ====
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Entity PipelineLayout"),
            bind_group_layouts: &[&globals_bgl, &draw_bgl, &texture_bgl],
            push_constant_ranges: &[],
        });
        let attributes = vertex_attributes(&ObjVertex::LAYOUT);
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Entity Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[VertexBufferLayout {
                    array_stride: ObjVertex::LAYOUT.stride as u64,
                    step_mode: VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(ColorTargetState {
                    format: surface_format,
                    blend: Some(BlendState::ALPHA_BLENDING),
                    write_mask: ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            // OBJ winding is not reliable across exporters, so no culling.
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: Some(DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            surface,
            surface_config,
            device,
            queue,
            pipeline,
            globals_buf,
            globals_bg,
            draw_bgl,
            draw_buf,
            draw_bg,
            draw_capacity,
            texture_bgl,
            sampler,
            meshes: Vec::new(),
            textures: Vec::new(),
            white_texture,
            draws: DrawList::new(),
            view: None,
            depth_view,
            width,
            height,
        })
    }

    /// Resize: reconfigure surface & recreate depth view.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, &self.surface_config);
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Start recording a frame seen through `view`. A zero aspect ratio is
    /// taken from the surface.
    pub fn begin_frame(&mut self, view: &RenderView) {
        let mut view = *view;
        if view.aspect == 0.0 {
            view.aspect = self.aspect();
        }
        self.view = Some(view);
        self.draws.reset();
    }

    /// Encode everything recorded since `begin_frame` and present it.
    pub fn present(&mut self) -> Result<(), SurfaceError> {
        let Some(view) = self.view.take() else {
            log::warn!("present() without begin_frame(); skipping");
            return Ok(());
        };

        self.queue
            .write_buffer(&self.globals_buf, 0, bytemuck::bytes_of(&GlobalsUniform::new(&view)));
        self.upload_draw_uniforms();

        let frame = self.surface.get_current_texture()?;
        let target = frame.texture.create_view(&Default::default());

        let mut encoder = self.device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("MainEncoder"),
        });

        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("MainPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &target,
                    depth_slice: None,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(CLEAR_COLOR),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, &self.globals_bg, &[]);

            for (i, call) in self.draws.calls().iter().enumerate() {
                let Some(mesh) = self.meshes.get(call.mesh.0 as usize) else {
                    continue;
                };
                let end = call.first_vertex.saturating_add(call.vertex_count);
                if end > mesh.vertex_count {
                    log::warn!(
                        "Draw range {}..{} exceeds mesh of {} vertices",
                        call.first_vertex,
                        end,
                        mesh.vertex_count
                    );
                    continue;
                }
                let texture = call
                    .texture
                    .and_then(|t| self.textures.get(t.0 as usize))
                    .unwrap_or(&self.white_texture);

                let offset = (i as u64 * DRAW_UNIFORM_STRIDE) as u32;
                rpass.set_bind_group(1, &self.draw_bg, &[offset]);
                rpass.set_bind_group(2, texture, &[]);
                rpass.set_vertex_buffer(0, mesh.buffer.slice(..));
                rpass.draw(call.first_vertex..end, 0..1);
            }
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.width, self.height);
    }

    /// Write one stride-aligned block per recorded draw, growing the
    /// buffer when the frame has more draws than it holds.
    fn upload_draw_uniforms(&mut self) {
        let count = self.draws.len() as u64;
        if count == 0 {
            return;
        }
        if count > self.draw_capacity {
            let capacity = count.next_power_of_two();
            let (buf, bg) = create_draw_buffer(&self.device, &self.draw_bgl, capacity);
            self.draw_buf = buf;
            self.draw_bg = bg;
            self.draw_capacity = capacity;
            log::debug!("Grew draw uniform buffer to {} slots", capacity);
        }

        let stride = DRAW_UNIFORM_STRIDE as usize;
        let mut bytes = vec![0u8; count as usize * stride];
        for (slot, call) in bytes.chunks_exact_mut(stride).zip(self.draws.calls()) {
            let block = DrawUniform::new(call.model, call.color, call.alpha);
            slot[..size_of::<DrawUniform>()].copy_from_slice(bytemuck::bytes_of(&block));
        }
        self.queue.write_buffer(&self.draw_buf, 0, &bytes);
    }
}

impl GraphicsDevice for GpuState {
    fn upload_vertices(&mut self, label: &str, vertices: &[f32], layout: &VertexLayout) -> GpuMeshId {
        if layout.stride != ObjVertex::LAYOUT.stride {
            log::warn!(
                "Mesh '{}' has stride {} but the pipeline expects {}",
                label,
                layout.stride,
                ObjVertex::LAYOUT.stride
            );
        }
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytes,
            usage: BufferUsages::VERTEX,
        });
        let id = GpuMeshId(self.meshes.len() as u32);
        self.meshes.push(GpuMesh {
            buffer,
            vertex_count: (bytes.len() / layout.stride.max(1)) as u32,
        });
        id
    }

    fn create_texture(&mut self, label: &str, texture: &TextureData) -> TextureId {
        let fallback;
        let texture = if texture.is_valid() {
            texture
        } else {
            log::warn!("Texture '{}' has inconsistent size; using white", label);
            fallback = TextureData::white();
            &fallback
        };
        let bg = create_texture_bind_group(
            &self.device,
            &self.queue,
            &self.texture_bgl,
            &self.sampler,
            label,
            texture,
        );
        let id = TextureId(self.textures.len() as u32);
        self.textures.push(bg);
        id
    }

    fn bind_mesh(&mut self, mesh: GpuMeshId) {
        self.draws.bind_mesh(mesh);
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        self.draws.bind_texture(texture);
    }

    fn set_transform(&mut self, model: Mat4) {
        self.draws.set_transform(model);
    }

    fn set_material(&mut self, color: Vec3, alpha: f32) {
        self.draws.set_material(color, alpha);
    }

    fn draw_triangles(&mut self, first_vertex: u32, vertex_count: u32) {
        self.draws.draw(first_vertex, vertex_count);
    }
}

fn uniform_entry(visibility: ShaderStages, dynamic: bool, size: u64) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding: 0,
        visibility,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: NonZeroU64::new(size),
        },
        count: None,
    }
}

fn create_draw_buffer(device: &Device, layout: &BindGroupLayout, slots: u64) -> (Buffer, BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Draw UBO"),
        size: align_to(slots * DRAW_UNIFORM_STRIDE, DRAW_UNIFORM_STRIDE),
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Draw BG"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: NonZeroU64::new(size_of::<DrawUniform>() as u64),
            }),
        }],
    });
    (buffer, bind_group)
}

fn create_texture_bind_group(
    device: &Device,
    queue: &Queue,
    layout: &BindGroupLayout,
    sampler: &Sampler,
    label: &str,
    data: &TextureData,
) -> BindGroup {
    let size = Extent3d {
        width: data.width.max(1),
        height: data.height.max(1),
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: TextureFormat::Rgba8UnormSrgb,
        usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &data.data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(data.row_bytes()),
            rows_per_image: Some(data.height),
        },
        size,
    );
    let view = texture.create_view(&TextureViewDescriptor::default());

    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

/// Create a depth texture view matching the surface config.
fn create_depth_view(device: &Device, sc: &SurfaceConfiguration) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some("DepthTex"),
        size: Extent3d {
            width: sc.width.max(1),
            height: sc.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}
