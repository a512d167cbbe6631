//! Shader programs and name-based slot resolution.
//!
//! A mesh shader must expose two `vec3<f32>` vertex inputs named
//! [`POSITION_ATTRIBUTE`] and [`NORMAL_ATTRIBUTE`], and three `mat4x4<f32>`
//! uniforms named [`PROJECTION_UNIFORM`], [`VIEW_UNIFORM`] and
//! [`MODEL_UNIFORM`] in `@group(0)`, plus a fragment stage for the color
//! target. Locations are looked up by name with naga once, when the program
//! is created.

use std::path::{Path, PathBuf};

use naga::{
    AddressSpace, Binding, Module, ScalarKind, ShaderStage, TypeInner, VectorSize,
    valid::{Capabilities, ValidationFlags, Validator},
};
use thiserror::Error;
use wgpu::{Device, ShaderModule, ShaderModuleDescriptor, ShaderSource};

pub const POSITION_ATTRIBUTE: &str = "in_vertex";
pub const NORMAL_ATTRIBUTE: &str = "in_normal";
pub const PROJECTION_UNIFORM: &str = "projection";
pub const VIEW_UNIFORM: &str = "view";
pub const MODEL_UNIFORM: &str = "model";

/// Bind group holding the transform uniforms.
pub const UNIFORM_GROUP: u32 = 0;

/// Built-in WGSL program used when no shader file is given.
pub const MESH_SHADER: &str = include_str!("shaders/mesh.wgsl");

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("failed to read shader {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("WGSL parse error:\n{0}")]
    Parse(String),
    #[error("shader validation failed: {0}")]
    Validation(String),
    #[error("shader has no {0} entry point")]
    MissingEntryPoint(&'static str),
    #[error("vertex input '{0}' not found")]
    MissingAttribute(&'static str),
    #[error("vertex input '{0}' must be vec3<f32>")]
    AttributeType(&'static str),
    #[error("uniform '{0}' not found")]
    MissingUniform(&'static str),
    #[error("uniform '{0}' must be mat4x4<f32>")]
    UniformType(&'static str),
    #[error("uniform '{name}' is in @group({group}), expected @group(0)")]
    UniformGroup { name: &'static str, group: u32 },
}

/// Resolved `@group/@binding` of one uniform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformSlot {
    pub group: u32,
    pub binding: u32,
}

/// Slot locations resolved from a shader by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderInterface {
    pub vertex_entry: String,
    pub fragment_entry: String,
    pub position_location: u32,
    pub normal_location: u32,
    pub projection: UniformSlot,
    pub view: UniformSlot,
    pub model: UniformSlot,
}

impl ShaderInterface {
    /// Parse, validate and reflect a WGSL source.
    pub fn reflect(source: &str) -> Result<Self, ShaderError> {
        let module = naga::front::wgsl::parse_str(source)
            .map_err(|e| ShaderError::Parse(e.emit_to_string(source)))?;
        Validator::new(ValidationFlags::all(), Capabilities::empty())
            .validate(&module)
            .map_err(|e| ShaderError::Validation(e.into_inner().to_string()))?;
        Self::from_module(&module)
    }

    fn from_module(module: &Module) -> Result<Self, ShaderError> {
        let vertex = module
            .entry_points
            .iter()
            .find(|ep| ep.stage == ShaderStage::Vertex)
            .ok_or(ShaderError::MissingEntryPoint("vertex"))?;
        let position_location = vertex_input(module, &vertex.function, POSITION_ATTRIBUTE)?;
        let normal_location = vertex_input(module, &vertex.function, NORMAL_ATTRIBUTE)?;
        let projection = uniform(module, PROJECTION_UNIFORM)?;
        let view = uniform(module, VIEW_UNIFORM)?;
        let model = uniform(module, MODEL_UNIFORM)?;

        // Meshes always render into a color attachment.
        let fragment = module
            .entry_points
            .iter()
            .find(|ep| ep.stage == ShaderStage::Fragment)
            .ok_or(ShaderError::MissingEntryPoint("fragment"))?;

        Ok(Self {
            vertex_entry: vertex.name.clone(),
            fragment_entry: fragment.name.clone(),
            position_location,
            normal_location,
            projection,
            view,
            model,
        })
    }
}

/// Find a `vec3<f32>` vertex input by name, either as a direct argument or
/// as a member of a struct argument.
fn vertex_input(
    module: &Module,
    function: &naga::Function,
    name: &'static str,
) -> Result<u32, ShaderError> {
    let mut found = None;
    for arg in &function.arguments {
        match (&arg.binding, &module.types[arg.ty].inner) {
            (Some(Binding::Location { location, .. }), _) if arg.name.as_deref() == Some(name) => {
                found = Some((*location, arg.ty));
            }
            (None, TypeInner::Struct { members, .. }) => {
                for member in members {
                    if let Some(Binding::Location { location, .. }) = member.binding {
                        if member.name.as_deref() == Some(name) {
                            found = Some((location, member.ty));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    let (location, ty) = found.ok_or(ShaderError::MissingAttribute(name))?;
    match module.types[ty].inner {
        TypeInner::Vector {
            size: VectorSize::Tri,
            scalar,
        } if scalar.kind == ScalarKind::Float && scalar.width == 4 => Ok(location),
        _ => Err(ShaderError::AttributeType(name)),
    }
}

fn uniform(module: &Module, name: &'static str) -> Result<UniformSlot, ShaderError> {
    let var = module
        .global_variables
        .iter()
        .map(|(_, var)| var)
        .find(|var| var.space == AddressSpace::Uniform && var.name.as_deref() == Some(name))
        .ok_or(ShaderError::MissingUniform(name))?;
    let binding = var
        .binding
        .as_ref()
        .ok_or(ShaderError::MissingUniform(name))?;

    match module.types[var.ty].inner {
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            scalar,
        } if scalar.kind == ScalarKind::Float && scalar.width == 4 => {}
        _ => return Err(ShaderError::UniformType(name)),
    }
    if binding.group != UNIFORM_GROUP {
        return Err(ShaderError::UniformGroup {
            name,
            group: binding.group,
        });
    }

    Ok(UniformSlot {
        group: binding.group,
        binding: binding.binding,
    })
}

/// Compiled GPU shader module plus its resolved slot interface.
/// Meshes share a program through `Arc`, so it outlives all of them.
pub struct ShaderProgram {
    label: String,
    module: ShaderModule,
    interface: ShaderInterface,
}

impl ShaderProgram {
    /// Compile WGSL source. Reflection runs first so a shader without the
    /// required slots is rejected before it reaches the device.
    pub fn from_wgsl(device: &Device, label: &str, source: &str) -> Result<Self, ShaderError> {
        let interface = ShaderInterface::reflect(source)?;
        let module = device.create_shader_module(ShaderModuleDescriptor {
            label: Some(label),
            source: ShaderSource::Wgsl(source.into()),
        });
        log::info!(
            "Shader '{}' ready: {}@{} / {}@{}",
            label,
            POSITION_ATTRIBUTE,
            interface.position_location,
            NORMAL_ATTRIBUTE,
            interface.normal_location
        );
        Ok(Self {
            label: label.to_owned(),
            module,
            interface,
        })
    }

    /// Read and compile a WGSL file.
    pub fn load(device: &Device, path: impl AsRef<Path>) -> Result<Self, ShaderError> {
        let path = path.as_ref();
        log::info!("Loading shader {}", path.display());
        let source = std::fs::read_to_string(path).map_err(|source| ShaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_wgsl(device, &path.display().to_string(), &source)
    }

    /// The built-in mesh shader.
    pub fn builtin(device: &Device) -> Result<Self, ShaderError> {
        Self::from_wgsl(device, "mesh.wgsl", MESH_SHADER)
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn module(&self) -> &ShaderModule {
        &self.module
    }

    #[inline]
    pub fn interface(&self) -> &ShaderInterface {
        &self.interface
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_shader_resolves_all_slots() {
        let iface = ShaderInterface::reflect(MESH_SHADER).expect("reflect builtin");
        assert_eq!(iface.vertex_entry, "vs_main");
        assert_eq!(iface.fragment_entry, "fs_main");
        assert_eq!(iface.position_location, 0);
        assert_eq!(iface.normal_location, 1);
        assert_eq!(iface.projection, UniformSlot { group: 0, binding: 0 });
        assert_eq!(iface.view, UniformSlot { group: 0, binding: 1 });
        assert_eq!(iface.model, UniformSlot { group: 0, binding: 2 });
    }

    #[test]
    fn struct_vertex_inputs_are_found_by_name() {
        let src = r#"
            @group(0) @binding(3) var<uniform> projection: mat4x4<f32>;
            @group(0) @binding(4) var<uniform> view: mat4x4<f32>;
            @group(0) @binding(5) var<uniform> model: mat4x4<f32>;

            struct VsIn {
                @location(2) in_normal: vec3<f32>,
                @location(5) in_vertex: vec3<f32>,
            };

            @vertex
            fn main(v: VsIn) -> @builtin(position) vec4<f32> {
                return projection * view * model * vec4<f32>(v.in_vertex + v.in_normal * 0.0, 1.0);
            }

            @fragment
            fn shade() -> @location(0) vec4<f32> {
                return vec4<f32>(1.0);
            }
        "#;
        let iface = ShaderInterface::reflect(src).expect("reflect");
        assert_eq!(iface.vertex_entry, "main");
        assert_eq!(iface.fragment_entry, "shade");
        assert_eq!(iface.position_location, 5);
        assert_eq!(iface.normal_location, 2);
        assert_eq!(iface.model.binding, 5);
    }

    #[test]
    fn vertex_only_shader_is_rejected() {
        let src = r#"
            @group(0) @binding(0) var<uniform> projection: mat4x4<f32>;
            @group(0) @binding(1) var<uniform> view: mat4x4<f32>;
            @group(0) @binding(2) var<uniform> model: mat4x4<f32>;

            @vertex
            fn vs_main(
                @location(0) in_vertex: vec3<f32>,
                @location(1) in_normal: vec3<f32>,
            ) -> @builtin(position) vec4<f32> {
                return projection * view * model * vec4<f32>(in_vertex + in_normal * 0.0, 1.0);
            }
        "#;
        let err = ShaderInterface::reflect(src).unwrap_err();
        assert!(matches!(err, ShaderError::MissingEntryPoint("fragment")));
    }

    #[test]
    fn missing_normal_input_is_reported() {
        let src = r#"
            @group(0) @binding(0) var<uniform> projection: mat4x4<f32>;
            @group(0) @binding(1) var<uniform> view: mat4x4<f32>;
            @group(0) @binding(2) var<uniform> model: mat4x4<f32>;

            @vertex
            fn vs_main(@location(0) in_vertex: vec3<f32>) -> @builtin(position) vec4<f32> {
                return projection * view * model * vec4<f32>(in_vertex, 1.0);
            }
        "#;
        let err = ShaderInterface::reflect(src).unwrap_err();
        assert!(matches!(err, ShaderError::MissingAttribute(NORMAL_ATTRIBUTE)));
    }

    #[test]
    fn wrong_attribute_type_is_reported() {
        let src = r#"
            @group(0) @binding(0) var<uniform> projection: mat4x4<f32>;
            @group(0) @binding(1) var<uniform> view: mat4x4<f32>;
            @group(0) @binding(2) var<uniform> model: mat4x4<f32>;

            @vertex
            fn vs_main(
                @location(0) in_vertex: vec4<f32>,
                @location(1) in_normal: vec3<f32>,
            ) -> @builtin(position) vec4<f32> {
                return projection * view * model * (in_vertex + vec4<f32>(in_normal, 0.0));
            }
        "#;
        let err = ShaderInterface::reflect(src).unwrap_err();
        assert!(matches!(err, ShaderError::AttributeType(POSITION_ATTRIBUTE)));
    }

    #[test]
    fn missing_uniform_is_reported() {
        let src = r#"
            @group(0) @binding(0) var<uniform> projection: mat4x4<f32>;
            @group(0) @binding(2) var<uniform> model: mat4x4<f32>;

            @vertex
            fn vs_main(
                @location(0) in_vertex: vec3<f32>,
                @location(1) in_normal: vec3<f32>,
            ) -> @builtin(position) vec4<f32> {
                return projection * model * vec4<f32>(in_vertex + in_normal, 1.0);
            }
        "#;
        let err = ShaderInterface::reflect(src).unwrap_err();
        assert!(matches!(err, ShaderError::MissingUniform(VIEW_UNIFORM)));
    }

    #[test]
    fn uniform_outside_group_zero_is_rejected() {
        let src = r#"
            @group(0) @binding(0) var<uniform> projection: mat4x4<f32>;
            @group(0) @binding(1) var<uniform> view: mat4x4<f32>;
            @group(1) @binding(0) var<uniform> model: mat4x4<f32>;

            @vertex
            fn vs_main(
                @location(0) in_vertex: vec3<f32>,
                @location(1) in_normal: vec3<f32>,
            ) -> @builtin(position) vec4<f32> {
                return projection * view * model * vec4<f32>(in_vertex + in_normal, 1.0);
            }
        "#;
        let err = ShaderInterface::reflect(src).unwrap_err();
        assert!(matches!(
            err,
            ShaderError::UniformGroup {
                name: MODEL_UNIFORM,
                group: 1
            }
        ));
    }

    #[test]
    fn parse_errors_are_reported() {
        let err = ShaderInterface::reflect("this is not wgsl").unwrap_err();
        assert!(matches!(err, ShaderError::Parse(_)));
    }
}
