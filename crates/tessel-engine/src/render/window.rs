//! Windowed renderer: software rasterization presented through wgpu.
//!
//! Every draw call lands in a [`SoftwareRenderer`]. On `present` the
//! framebuffer is uploaded into a texture and drawn as a quad, so the window
//! shows exactly what screenshots capture. When the surface and the frame
//! disagree in size (a pending resize, a fullscreen switch) the quad is
//! letterboxed to keep the frame's aspect ratio.
//!
//! # GPU Initialization
//!
//! [`WindowRenderer::new`] is async because adapter and device selection
//! are. Call it through `pollster::block_on`. If no suitable GPU is
//! available the error is returned and the caller can fall back to a
//! headless run.

use std::sync::Arc;

use image::RgbaImage;
use tessel_scene::color::Color;
use tessel_scene::render::{Font, ImageHandle, Placement, Renderer};
use wgpu::util::DeviceExt;
use winit::window::{Fullscreen, Window};

use super::software::SoftwareRenderer;

// ---------------------------------------------------------------------------
// Vertex
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck_derive::Pod, bytemuck_derive::Zeroable)]
struct Vertex {
    position: [f32; 2],
    uv: [f32; 2],
}

impl Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Two triangles covering the largest centred area of a `surface` sized
/// target that keeps the aspect ratio of `frame`.
fn quad_vertices(frame: (u32, u32), surface: (u32, u32)) -> [Vertex; 6] {
    let (fw, fh) = (frame.0.max(1) as f32, frame.1.max(1) as f32);
    let (sw, sh) = (surface.0.max(1) as f32, surface.1.max(1) as f32);
    let fit = (sw / fw).min(sh / fh);
    let hx = fw * fit / sw;
    let hy = fh * fit / sh;
    let v = |x: f32, y: f32, u: f32, w: f32| Vertex {
        position: [x, y],
        uv: [u, w],
    };
    [
        v(-hx, hy, 0.0, 0.0),
        v(-hx, -hy, 0.0, 1.0),
        v(hx, -hy, 1.0, 1.0),
        v(-hx, hy, 0.0, 0.0),
        v(hx, -hy, 1.0, 1.0),
        v(hx, hy, 1.0, 0.0),
    ]
}

/// Texture plus the bind group that samples it.
struct FrameTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    size: (u32, u32),
}

impl FrameTexture {
    fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        (width, height): (u32, u32),
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tessel_frame_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tessel_frame_bind_group"),
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
        });
        Self {
            texture,
            bind_group,
            size: (width.max(1), height.max(1)),
        }
    }
}

/// A window-backed [`Renderer`].
pub struct WindowRenderer {
    software: SoftwareRenderer,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    frame_texture: FrameTexture,
    vertex_buffer: wgpu::Buffer,
    quad: [Vertex; 6],
    window: Arc<Window>,
}

impl WindowRenderer {
    /// Create the surface, device and present pipeline for `window`.
    ///
    /// # Errors
    ///
    /// Returns an error if no suitable GPU adapter or device is available.
    pub async fn new(window: Arc<Window>) -> Result<Self, anyhow::Error> {
        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("no suitable GPU adapter found"))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("tessel_window_renderer"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or_else(|| anyhow::anyhow!("surface reports no supported formats"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("tessel_present_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("present.wgsl").into()),
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tessel_frame_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("tessel_frame_sampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tessel_present_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("tessel_present_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let frame_texture = FrameTexture::new(&device, &bind_group_layout, &sampler, (width, height));
        let quad = quad_vertices((width, height), (width, height));
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tessel_quad_vertices"),
            contents: bytemuck::cast_slice(&quad),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        tracing::info!(width, height, ?format, "window renderer initialized");

        Ok(Self {
            software: SoftwareRenderer::new(width, height),
            surface,
            device,
            queue,
            config,
            pipeline,
            bind_group_layout,
            sampler,
            frame_texture,
            vertex_buffer,
            quad,
            window,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    fn upload(&mut self) {
        let frame = self.software.frame();
        let size = frame.dimensions();
        if size != self.frame_texture.size {
            self.frame_texture = FrameTexture::new(&self.device, &self.bind_group_layout, &self.sampler, size);
        }
        let quad = quad_vertices(size, (self.config.width, self.config.height));
        if quad != self.quad {
            self.queue
                .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&quad));
            self.quad = quad;
        }
        let (width, height) = self.frame_texture.size;
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.frame_texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            frame.as_raw(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn draw(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("tessel_present_encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tessel_present_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.frame_texture.bind_group, &[]);
            pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            pass.draw(0..self.quad.len() as u32, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

impl Renderer for WindowRenderer {
    fn begin_frame(&mut self) {
        self.software.begin_frame();
    }

    fn clear(&mut self, color: Color, alpha: u8) {
        self.software.clear(color, alpha);
    }

    fn draw_rect(&mut self, placement: &Placement, color: Color, alpha: u8) {
        self.software.draw_rect(placement, color, alpha);
    }

    fn draw_image(&mut self, placement: &Placement, image: &ImageHandle, alpha: u8) {
        self.software.draw_image(placement, image, alpha);
    }

    fn draw_text(&mut self, placement: &Placement, text: &str, font: &Font, color: Color, alpha: u8) {
        self.software.draw_text(placement, text, font, color, alpha);
    }

    fn present(&mut self) {
        self.software.present();
        self.upload();
        match self.draw() {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => self.reconfigure(),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                tracing::error!("GPU out of memory, frame dropped");
            }
            Err(e) => tracing::warn!(error = %e, "surface error during present"),
        }
    }

    fn capture_frame(&mut self) -> Option<RgbaImage> {
        self.software.capture_frame()
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.software.resize(width, height);
        self.config.width = width;
        self.config.height = height;
        self.reconfigure();
        let _ = self
            .window
            .request_inner_size(winit::dpi::PhysicalSize::new(width, height));
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.window
            .set_fullscreen(fullscreen.then_some(Fullscreen::Borderless(None)));
    }

    fn size(&self) -> (u32, u32) {
        self.software.size()
    }
}
