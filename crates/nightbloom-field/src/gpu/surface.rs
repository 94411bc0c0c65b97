use std::collections::HashMap;

use wgpu::util::DeviceExt;

use nightbloom_engine::render::RenderTarget;

use crate::error::SurfaceError;
use crate::points::PointSet;
use crate::program::{Blend, ProgramKind, ProgramPrototype, Shading};
use crate::sprite::SpriteImage;
use crate::surface::{
    BufferHandle, FrameDraw, ProgramHandle, RenderSurface, Resource, SurfaceSize, TextureHandle,
};

use super::types::{
    blend_state, FrameUniform, PointBlock, PointInstance, QuadVertex, TrailBlock, TrailVertex, QUAD_INDICES,
    QUAD_VERTICES,
};

enum Geometry {
    Points { vbo: Option<wgpu::Buffer>, count: u32 },
    Quad { vbo: wgpu::Buffer },
}

enum Block {
    Points(PointBlock),
    Trail(TrailBlock),
}

struct Program {
    kind: ProgramKind,
    blend: Blend,
    block: Block,
    ubo: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

struct Texture {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

/// One recorded draw, resolved at encode time.
#[derive(Copy, Clone)]
struct Recorded {
    geometry: BufferHandle,
    program: ProgramHandle,
    texture: Option<TextureHandle>,
}

/// [`RenderSurface`] backed by wgpu.
///
/// `draw` uploads uniforms and records the frame; [`encode`](Self::encode)
/// replays it into the engine's render target. Pipelines are built lazily per
/// program kind and blend mode.
pub struct GpuSurface {
    device: wgpu::Device,
    queue: wgpu::Queue,
    format: wgpu::TextureFormat,

    attached: bool,
    size: SurfaceSize,
    next_id: u64,

    geometries: HashMap<BufferHandle, Geometry>,
    programs: HashMap<ProgramHandle, Program>,
    textures: HashMap<TextureHandle, Texture>,

    frame_layout: wgpu::BindGroupLayout,
    program_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    frame_ubo: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,
    quad_vbo: wgpu::Buffer,
    quad_ibo: wgpu::Buffer,
    fallback_texture: Option<Texture>,

    pipelines: HashMap<(ProgramKind, Blend), wgpu::RenderPipeline>,
    recorded: Vec<Recorded>,
}

impl GpuSurface {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let frame_layout = uniform_layout(device, "nightbloom frame bgl", wgpu::ShaderStages::VERTEX);
        let program_layout = uniform_layout(device, "nightbloom program bgl", wgpu::ShaderStages::VERTEX_FRAGMENT);

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("nightbloom sprite bgl"),
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

        let frame_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("nightbloom frame ubo"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("nightbloom frame bind group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_ubo.as_entire_binding(),
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("nightbloom sprite sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let quad_vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("nightbloom quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let quad_ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("nightbloom quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let mut surface = Self {
            device: device.clone(),
            queue: queue.clone(),
            format,
            attached: false,
            size: SurfaceSize::default(),
            next_id: 0,
            geometries: HashMap::new(),
            programs: HashMap::new(),
            textures: HashMap::new(),
            frame_layout,
            program_layout,
            texture_layout,
            frame_ubo,
            frame_bind_group,
            sampler,
            quad_vbo,
            quad_ibo,
            fallback_texture: None,
            pipelines: HashMap::new(),
            recorded: Vec::new(),
        };
        // Point programs drawn without a sprite sample a plain white pixel.
        surface.fallback_texture = Some(surface.upload_texture("nightbloom white", &SpriteImage {
            width: 1,
            height: 1,
            pixels: vec![255; 4],
        }));
        surface
    }

    /// Replays the last recorded frame into `target`, on top of what is there.
    pub fn encode(&mut self, target: &mut RenderTarget<'_>) {
        if !self.attached || self.recorded.is_empty() {
            return;
        }
        let recorded = std::mem::take(&mut self.recorded);
        let needed: Vec<_> = recorded
            .iter()
            .filter_map(|r| self.programs.get(&r.program).map(|p| (p.kind, p.blend)))
            .collect();
        for (kind, blend) in needed {
            self.ensure_pipeline(kind, blend);
        }

        let mut rpass = target.begin_pass("nightbloom field pass", None);
        rpass.set_bind_group(0, &self.frame_bind_group, &[]);

        for r in &recorded {
            let (Some(program), Some(geometry)) = (self.programs.get(&r.program), self.geometries.get(&r.geometry))
            else {
                continue;
            };
            let Some(pipeline) = self.pipelines.get(&(program.kind, program.blend)) else { continue };

            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(1, &program.bind_group, &[]);

            match geometry {
                Geometry::Points { vbo: Some(vbo), count } => {
                    let texture = r
                        .texture
                        .and_then(|t| self.textures.get(&t))
                        .or(self.fallback_texture.as_ref());
                    let Some(texture) = texture else { continue };
                    rpass.set_bind_group(2, &texture.bind_group, &[]);
                    rpass.set_vertex_buffer(0, self.quad_vbo.slice(..));
                    rpass.set_vertex_buffer(1, vbo.slice(..));
                    rpass.set_index_buffer(self.quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
                    rpass.draw_indexed(0..6, 0, 0..*count);
                }
                Geometry::Points { vbo: None, .. } => {}
                Geometry::Quad { vbo } => {
                    rpass.set_vertex_buffer(0, vbo.slice(..));
                    rpass.draw(0..6, 0..1);
                }
            }
        }
    }

    pub fn live_count(&self) -> usize {
        self.geometries.len() + self.programs.len() + self.textures.len()
    }

    // ── private helpers ────────────────────────────────────────────────────

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn upload_texture(&self, label: &str, image: &SpriteImage) -> Texture {
        let extent = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(image.width * 4),
                rows_per_image: Some(image.height),
            },
            extent,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        Texture { _texture: texture, bind_group }
    }

    fn ensure_pipeline(&mut self, kind: ProgramKind, blend: Blend) {
        if self.pipelines.contains_key(&(kind, blend)) {
            return;
        }

        let (label, source) = match kind {
            ProgramKind::Points => ("nightbloom points", include_str!("shaders/points.wgsl")),
            ProgramKind::Trail => ("nightbloom trail", include_str!("shaders/trail.wgsl")),
        };
        let shader = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let points_layouts = [&self.frame_layout, &self.program_layout, &self.texture_layout];
        let trail_layouts = [&self.frame_layout, &self.program_layout];
        let bind_group_layouts: &[&wgpu::BindGroupLayout] = match kind {
            ProgramKind::Points => &points_layouts,
            ProgramKind::Trail => &trail_layouts,
        };
        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts,
            immediate_size: 0,
        });

        let points_buffers = [QuadVertex::layout(), PointInstance::layout()];
        let trail_buffers = [TrailVertex::layout()];
        let buffers: &[wgpu::VertexBufferLayout<'_>] = match kind {
            ProgramKind::Points => &points_buffers,
            ProgramKind::Trail => &trail_buffers,
        };

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers,
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.format,
                    blend: Some(blend_state(blend)),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("built {label} pipeline ({blend:?})");
        self.pipelines.insert((kind, blend), pipeline);
    }
}

impl RenderSurface for GpuSurface {
    fn attach(&mut self, size: SurfaceSize) -> Result<(), SurfaceError> {
        self.attached = true;
        self.size = size;
        Ok(())
    }

    fn detach(&mut self) {
        self.attached = false;
        self.recorded.clear();
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn set_output_size(&mut self, size: SurfaceSize) {
        self.size = size;
    }

    fn output_size(&self) -> SurfaceSize {
        self.size
    }

    fn create_point_buffer(&mut self, label: &str, points: &PointSet) -> Result<BufferHandle, SurfaceError> {
        let count = u32::try_from(points.len())
            .map_err(|_| SurfaceError::Allocation(format!("`{label}`: {} points exceed u32", points.len())))?;

        let instances: Vec<PointInstance> = (0..points.len())
            .map(|i| PointInstance {
                position: points.positions()[i].to_array(),
                phase: points.phases()[i],
                size: points.sizes()[i],
                color: points.color(i),
            })
            .collect();

        let vbo = (count > 0).then(|| {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&instances),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });

        let handle = BufferHandle::from_raw(self.next());
        self.geometries.insert(handle, Geometry::Points { vbo, count });
        Ok(handle)
    }

    fn create_quad_buffer(&mut self, label: &str, length: f32, height: f32) -> Result<BufferHandle, SurfaceError> {
        let vbo = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&TrailVertex::quad(length, height)),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let handle = BufferHandle::from_raw(self.next());
        self.geometries.insert(handle, Geometry::Quad { vbo });
        Ok(handle)
    }

    fn create_texture(&mut self, label: &str, image: &SpriteImage) -> Result<TextureHandle, SurfaceError> {
        let expected = image.width as usize * image.height as usize * 4;
        if image.width == 0 || image.height == 0 || image.pixels.len() != expected {
            return Err(SurfaceError::Allocation(format!(
                "`{label}`: {}x{} sprite with {} bytes",
                image.width,
                image.height,
                image.pixels.len()
            )));
        }
        let texture = self.upload_texture(label, image);
        let handle = TextureHandle::from_raw(self.next());
        self.textures.insert(handle, texture);
        Ok(handle)
    }

    fn instantiate_program(&mut self, prototype: &ProgramPrototype) -> Result<ProgramHandle, SurfaceError> {
        let (block, bytes) = match &prototype.shading {
            Shading::Points(look) => {
                let b = PointBlock::from_look(look);
                (Block::Points(b), bytemuck::bytes_of(&b).to_vec())
            }
            Shading::Trail(look) => {
                let b = TrailBlock::from_look(look);
                (Block::Trail(b), bytemuck::bytes_of(&b).to_vec())
            }
        };

        let ubo = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&prototype.label),
            contents: &bytes,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&prototype.label),
            layout: &self.program_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.as_entire_binding(),
            }],
        });

        let handle = ProgramHandle::from_raw(self.next());
        self.programs.insert(
            handle,
            Program {
                kind: prototype.kind(),
                blend: prototype.blend,
                block,
                ubo,
                bind_group,
            },
        );
        Ok(handle)
    }

    fn release(&mut self, resource: Resource) -> Result<(), SurfaceError> {
        let found = match resource {
            Resource::Buffer(h) => self.geometries.remove(&h).is_some(),
            Resource::Program(h) => self.programs.remove(&h).is_some(),
            Resource::Texture(h) => self.textures.remove(&h).is_some(),
        };
        if found { Ok(()) } else { Err(SurfaceError::UnknownResource(resource)) }
    }

    fn draw(&mut self, frame: &FrameDraw) -> Result<(), SurfaceError> {
        if !self.attached {
            return Err(SurfaceError::Detached);
        }

        let uniform = FrameUniform::new(&frame.camera, self.size.width, self.size.height);
        self.queue.write_buffer(&self.frame_ubo, 0, bytemuck::bytes_of(&uniform));

        self.recorded.clear();
        for item in &frame.items {
            if !self.geometries.contains_key(&item.geometry) {
                return Err(SurfaceError::UnknownResource(item.geometry.into()));
            }
            let Some(program) = self.programs.get_mut(&item.program) else {
                return Err(SurfaceError::UnknownResource(item.program.into()));
            };

            match &mut program.block {
                Block::Points(b) => {
                    b.update(item.model, &item.uniforms);
                    self.queue.write_buffer(&program.ubo, 0, bytemuck::bytes_of(b));
                }
                Block::Trail(b) => {
                    b.update(item.model, &item.uniforms);
                    self.queue.write_buffer(&program.ubo, 0, bytemuck::bytes_of(b));
                }
            }

            self.recorded.push(Recorded {
                geometry: item.geometry,
                program: item.program,
                texture: item.texture,
            });
        }
        Ok(())
    }
}

fn uniform_layout(device: &wgpu::Device, label: &str, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}
