//! Mesh renderer: OBJ geometry uploaded once into static vertex buffers and
//! drawn every frame with camera-supplied transforms.
//!
//! A [`Mesh`] starts unloaded. A successful [`Mesh::load`] creates the
//! position/normal buffers, the uniform buffers and a pipeline built against
//! the program's resolved slots; from then on [`Mesh::draw`] can be called
//! any number of times. Dropping the mesh releases every GPU resource it owns.

use std::{path::Path, sync::Arc};

use asset::{
    mesh::MeshAttributes,
    obj::{ObjError, load_obj_from_path},
};
use bytemuck::{Pod, Zeroable};
use corelib::{Mat4, camera::CameraMatrices, transform::Transform};
use thiserror::Error;
use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingType, BlendState, Buffer, BufferAddress, BufferBindingType,
    BufferSize, BufferUsages, ColorTargetState, ColorWrites, CompareFunction, DepthBiasState,
    DepthStencilState, Device, FragmentState, MultisampleState, PipelineCompilationOptions,
    PipelineLayoutDescriptor, PrimitiveState, PrimitiveTopology, RenderPipeline,
    RenderPipelineDescriptor, ShaderStages, StencilState, TextureFormat, VertexAttribute,
    VertexBufferLayout, VertexFormat, VertexState, VertexStepMode,
    util::{BufferInitDescriptor, DeviceExt},
};

use crate::{
    draw::DrawTarget,
    shader::{ShaderInterface, ShaderProgram, UNIFORM_GROUP},
};

/// Vertex buffer slot fed by the position sequence.
pub const POSITION_SLOT: u32 = 0;
/// Vertex buffer slot fed by the normal sequence.
pub const NORMAL_SLOT: u32 = 1;

/// Uniform shrink applied to OBJ models by default.
pub const DEFAULT_MODEL_SCALE: f32 = 0.012;

const VEC3_STRIDE: BufferAddress = std::mem::size_of::<[f32; 3]>() as BufferAddress;

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("mesh is not loaded")]
    NotLoaded,
    #[error(transparent)]
    Obj(#[from] ObjError),
    #[error("mesh has {0} vertices, more than a single draw can address")]
    TooManyVertices(usize),
    #[error(
        "mesh attributes are not whole aligned triangles \
         ({positions} positions, {uvs} uvs, {normals} normals)"
    )]
    InvalidAttributes {
        positions: usize,
        uvs: usize,
        normals: usize,
    },
}

/// Per-mesh settings fixed at load time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshConfig {
    pub model_scale: f32,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            model_scale: DEFAULT_MODEL_SCALE,
        }
    }
}

/// Formats of the attachments a mesh pipeline renders into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshTargets {
    pub color_format: TextureFormat,
    pub depth_format: Option<TextureFormat>,
}

/// One `mat4x4<f32>` uniform (64 bytes, column-major).
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct MatrixUniform {
    m: [[f32; 4]; 4],
}

impl From<Mat4> for MatrixUniform {
    fn from(m: Mat4) -> Self {
        Self {
            m: m.to_cols_array_2d(),
        }
    }
}

const MATRIX_SIZE: u64 = std::mem::size_of::<MatrixUniform>() as u64;

struct Uniforms {
    projection: Buffer,
    view: Buffer,
    model: Buffer,
    bind_group: BindGroup,
}

/// GPU state of a loaded mesh.
struct GpuMesh {
    program: Arc<ShaderProgram>,
    pipeline: RenderPipeline,
    uniforms: Uniforms,
    positions: Buffer,
    normals: Buffer,
    vertex_count: u32,
    model: Mat4,
}

/// A drawable OBJ mesh.
pub struct Mesh {
    config: MeshConfig,
    gpu: Option<GpuMesh>,
}

impl Mesh {
    /// Create an unloaded mesh.
    pub fn new(config: MeshConfig) -> Self {
        Self { config, gpu: None }
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.gpu.is_some()
    }

    /// Number of vertices the draw covers, 0 when unloaded.
    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.gpu.as_ref().map_or(0, |gpu| gpu.vertex_count)
    }

    #[inline]
    pub fn model_matrix(&self) -> Option<Mat4> {
        self.gpu.as_ref().map(|gpu| gpu.model)
    }

    /// Program the mesh was uploaded with.
    #[inline]
    pub fn program(&self) -> Option<&Arc<ShaderProgram>> {
        self.gpu.as_ref().map(|gpu| &gpu.program)
    }

    /// Parse the OBJ file at `path` and upload it for drawing with `program`.
    ///
    /// On error nothing is uploaded and the mesh keeps its previous state.
    pub fn load(
        &mut self,
        device: &Device,
        targets: &MeshTargets,
        path: impl AsRef<Path>,
        program: Arc<ShaderProgram>,
    ) -> Result<(), MeshError> {
        let attributes = load_obj_from_path(path)?;
        self.upload(device, targets, &attributes, program)
    }

    /// Upload already parsed attributes.
    ///
    /// Attributes that do not form whole triangles with one position, uv and
    /// normal per corner are rejected before any buffer is created.
    pub fn upload(
        &mut self,
        device: &Device,
        targets: &MeshTargets,
        attributes: &MeshAttributes,
        program: Arc<ShaderProgram>,
    ) -> Result<(), MeshError> {
        let vertex_count = checked_vertex_count(attributes)?;

        let positions = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("Mesh positions"),
            contents: bytemuck::cast_slice(&attributes.positions),
            usage: BufferUsages::VERTEX,
        });
        let normals = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("Mesh normals"),
            contents: bytemuck::cast_slice(&attributes.normals),
            usage: BufferUsages::VERTEX,
        });

        let iface = program.interface();
        let layout = create_uniform_layout(device, iface);
        let model = Transform::uniform_scale(self.config.model_scale).matrix();
        let uniforms = create_uniforms(device, &layout, iface, model);
        let pipeline = create_pipeline(device, targets, &program, &layout);

        log::info!(
            "Mesh uploaded: {} triangles with shader '{}'",
            vertex_count / 3,
            program.label()
        );

        self.gpu = Some(GpuMesh {
            program,
            pipeline,
            uniforms,
            positions,
            normals,
            vertex_count,
            model,
        });
        Ok(())
    }

    /// Record this mesh into `target` using the camera's current matrices.
    ///
    /// Every call re-specifies the pipeline, the bind group, both vertex
    /// buffers and all three uniforms.
    ///
    /// Uniforms are written through the queue, so they land before the pass
    /// executes. Drawing the same mesh twice in one pass with different
    /// cameras renders both copies with the last camera.
    pub fn draw<T: DrawTarget + ?Sized>(
        &self,
        target: &mut T,
        camera: &dyn CameraMatrices,
    ) -> Result<(), MeshError> {
        let gpu = self.gpu.as_ref().ok_or(MeshError::NotLoaded)?;
        if gpu.vertex_count == 0 {
            return Ok(());
        }

        let u = &gpu.uniforms;
        let projection = MatrixUniform::from(camera.projection_matrix());
        let view = MatrixUniform::from(camera.view_matrix());
        let model = MatrixUniform::from(gpu.model);
        target.write_buffer(&u.projection, bytemuck::bytes_of(&projection));
        target.write_buffer(&u.view, bytemuck::bytes_of(&view));
        target.write_buffer(&u.model, bytemuck::bytes_of(&model));

        target.set_pipeline(&gpu.pipeline);
        target.set_bind_group(UNIFORM_GROUP, &u.bind_group);
        target.set_vertex_buffer(POSITION_SLOT, &gpu.positions);
        target.set_vertex_buffer(NORMAL_SLOT, &gpu.normals);
        target.draw(0..gpu.vertex_count);
        Ok(())
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new(MeshConfig::default())
    }
}

/// Vertex count of well-formed attributes as a draw range bound.
fn checked_vertex_count(attributes: &MeshAttributes) -> Result<u32, MeshError> {
    if !attributes.is_valid() {
        return Err(MeshError::InvalidAttributes {
            positions: attributes.positions.len(),
            uvs: attributes.uvs.len(),
            normals: attributes.normals.len(),
        });
    }
    let count = attributes.vertex_count();
    u32::try_from(count).map_err(|_| MeshError::TooManyVertices(count))
}

fn create_uniform_layout(device: &Device, iface: &ShaderInterface) -> BindGroupLayout {
    let entry = |binding| BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: BufferSize::new(MATRIX_SIZE),
        },
        count: None,
    };
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("Mesh uniforms BGL"),
        entries: &[
            entry(iface.projection.binding),
            entry(iface.view.binding),
            entry(iface.model.binding),
        ],
    })
}

fn create_uniforms(
    device: &Device,
    layout: &BindGroupLayout,
    iface: &ShaderInterface,
    model: Mat4,
) -> Uniforms {
    let buffer = |label, value: Mat4| {
        device.create_buffer_init(&BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::bytes_of(&MatrixUniform::from(value)),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        })
    };
    let projection = buffer("Mesh projection UBO", Mat4::IDENTITY);
    let view = buffer("Mesh view UBO", Mat4::IDENTITY);
    let model = buffer("Mesh model UBO", model);

    let bind_group = device.create_bind_group(&BindGroupDescriptor {
        label: Some("Mesh uniforms BG"),
        layout,
        entries: &[
            BindGroupEntry {
                binding: iface.projection.binding,
                resource: projection.as_entire_binding(),
            },
            BindGroupEntry {
                binding: iface.view.binding,
                resource: view.as_entire_binding(),
            },
            BindGroupEntry {
                binding: iface.model.binding,
                resource: model.as_entire_binding(),
            },
        ],
    });

    Uniforms {
        projection,
        view,
        model,
        bind_group,
    }
}

fn create_pipeline(
    device: &Device,
    targets: &MeshTargets,
    program: &ShaderProgram,
    uniform_layout: &BindGroupLayout,
) -> RenderPipeline {
    let iface = program.interface();
    let position_attr = [VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: 0,
        shader_location: iface.position_location,
    }];
    let normal_attr = [VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: 0,
        shader_location: iface.normal_location,
    }];
    // Slot order must match POSITION_SLOT / NORMAL_SLOT.
    let buffers = [
        VertexBufferLayout {
            array_stride: VEC3_STRIDE,
            step_mode: VertexStepMode::Vertex,
            attributes: &position_attr,
        },
        VertexBufferLayout {
            array_stride: VEC3_STRIDE,
            step_mode: VertexStepMode::Vertex,
            attributes: &normal_attr,
        },
    ];

    let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("Mesh PipelineLayout"),
        bind_group_layouts: &[uniform_layout],
        push_constant_ranges: &[],
    });

    let color_targets = [Some(ColorTargetState {
        format: targets.color_format,
        blend: Some(BlendState::REPLACE),
        write_mask: ColorWrites::ALL,
    })];

    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("Mesh Pipeline"),
        layout: Some(&layout),
        vertex: VertexState {
            module: program.module(),
            entry_point: Some(iface.vertex_entry.as_str()),
            buffers: &buffers,
            compilation_options: PipelineCompilationOptions::default(),
        },
        fragment: Some(FragmentState {
            module: program.module(),
            entry_point: Some(iface.fragment_entry.as_str()),
            targets: &color_targets,
            compilation_options: PipelineCompilationOptions::default(),
        }),
        primitive: PrimitiveState {
            topology: PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: targets.depth_format.map(|format| DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: CompareFunction::Less,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
