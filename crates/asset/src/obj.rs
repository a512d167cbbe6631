//! Minimal OBJ parser for fully triangulated meshes with positions,
//! texture coordinates and normals on every face corner.

use std::{
    fmt,
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::mesh::MeshAttributes;

/// Errors produced while loading an OBJ file.
#[derive(Debug, Error)]
pub enum ObjError {
    #[error("failed to open OBJ file {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read OBJ line {line}")]
    Read {
        line: usize,
        #[source]
        source: io::Error,
    },
    #[error("malformed OBJ line {line}: {kind}")]
    Format { line: usize, kind: FormatErrorKind },
}

impl ObjError {
    /// `true` for malformed content, `false` for I/O problems.
    pub fn is_format(&self) -> bool {
        matches!(self, ObjError::Format { .. })
    }
}

/// What exactly was wrong with a malformed record.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FormatErrorKind {
    #[error("missing {0}")]
    MissingComponent(&'static str),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("face has {0} vertices, only triangles are supported")]
    FaceArity(usize),
    #[error("face vertex '{0}' must have the form v/vt/vn")]
    MalformedFaceVertex(String),
    #[error("invalid index '{0}'")]
    InvalidIndex(String),
    #[error("{0} index is 0, OBJ indices are 1-based")]
    ZeroIndex(Channel),
    #[error("{channel} index {index} out of range (1..={len})")]
    IndexOutOfRange {
        channel: Channel,
        index: usize,
        len: usize,
    },
}

/// Attribute pool a face index points into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Position,
    TexCoord,
    Normal,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Channel::Position => "position",
            Channel::TexCoord => "texture coordinate",
            Channel::Normal => "normal",
        })
    }
}

/// Load an OBJ mesh from a file path.
pub fn load_obj_from_path(path: impl AsRef<Path>) -> Result<MeshAttributes, ObjError> {
    let path = path.as_ref();
    log::info!("Loading OBJ file {}", path.display());
    let file = File::open(path).map_err(|source| ObjError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    load_obj_from_reader(BufReader::new(file))
}

/// Load an OBJ mesh from a [`BufRead`] implementation.
pub fn load_obj_from_reader<R: BufRead>(reader: R) -> Result<MeshAttributes, ObjError> {
    let mesh = parse_obj(reader)?;
    log::debug!(
        "OBJ parsed: {} triangles, {} vertices",
        mesh.triangle_count(),
        mesh.vertex_count()
    );
    Ok(mesh)
}

/// Convenience helper to parse an OBJ string literal.
pub fn load_obj_from_str(contents: &str) -> Result<MeshAttributes, ObjError> {
    load_obj_from_reader(io::Cursor::new(contents))
}

/// Zero-based indices of one face corner.
#[derive(Clone, Copy, Debug)]
struct Corner {
    position: usize,
    uv: usize,
    normal: usize,
}

#[derive(Debug)]
struct Face {
    line: usize,
    corners: [Corner; 3],
}

#[derive(Default)]
struct Pools {
    positions: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
}

fn parse_obj<R: BufRead>(reader: R) -> Result<MeshAttributes, ObjError> {
    let mut pools = Pools::default();
    let mut faces: Vec<Face> = Vec::new();

    for (line_idx, line) in reader.lines().enumerate() {
        let line_no = line_idx + 1;
        let line = line.map_err(|source| ObjError::Read {
            line: line_no,
            source,
        })?;
        let format_err = |kind| ObjError::Format {
            line: line_no,
            kind,
        };

        let mut parts = line.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };

        match tag {
            "v" => {
                let x = parse_f32(parts.next(), "x coordinate").map_err(format_err)?;
                let y = parse_f32(parts.next(), "y coordinate").map_err(format_err)?;
                let z = parse_f32(parts.next(), "z coordinate").map_err(format_err)?;
                pools.positions.push([x, y, z]);
            }
            "vt" => {
                let u = parse_f32(parts.next(), "u coordinate").map_err(format_err)?;
                let v = parse_f32(parts.next(), "v coordinate").map_err(format_err)?;
                // V is flipped for top-left origin textures.
                pools.uvs.push([u, -v]);
            }
            "vn" => {
                let x = parse_f32(parts.next(), "nx coordinate").map_err(format_err)?;
                let y = parse_f32(parts.next(), "ny coordinate").map_err(format_err)?;
                let z = parse_f32(parts.next(), "nz coordinate").map_err(format_err)?;
                pools.normals.push([x, y, z]);
            }
            "f" => {
                let corners = parse_face(parts).map_err(format_err)?;
                faces.push(Face {
                    line: line_no,
                    corners,
                });
            }
            _ => {
                // Comments and unsupported directives (o/g/s/usemtl/etc.)
            }
        }
    }

    expand(&faces, &pools)
}

/// Dereference every face corner into flat per-corner sequences.
fn expand(faces: &[Face], pools: &Pools) -> Result<MeshAttributes, ObjError> {
    let mut mesh = MeshAttributes::with_capacity(faces.len() * 3);
    for face in faces {
        let format_err = |kind| ObjError::Format {
            line: face.line,
            kind,
        };
        for corner in &face.corners {
            let position =
                lookup(&pools.positions, corner.position, Channel::Position).map_err(format_err)?;
            let uv = lookup(&pools.uvs, corner.uv, Channel::TexCoord).map_err(format_err)?;
            let normal =
                lookup(&pools.normals, corner.normal, Channel::Normal).map_err(format_err)?;
            mesh.push_corner(position, uv, normal);
        }
    }
    Ok(mesh)
}

fn lookup<T: Copy>(pool: &[T], index: usize, channel: Channel) -> Result<T, FormatErrorKind> {
    pool.get(index)
        .copied()
        .ok_or(FormatErrorKind::IndexOutOfRange {
            channel,
            index: index + 1,
            len: pool.len(),
        })
}

fn parse_f32(value: Option<&str>, what: &'static str) -> Result<f32, FormatErrorKind> {
    let token = value.ok_or(FormatErrorKind::MissingComponent(what))?;
    token
        .parse::<f32>()
        .map_err(|_| FormatErrorKind::InvalidNumber(token.to_owned()))
}

fn parse_face<'a>(parts: impl Iterator<Item = &'a str>) -> Result<[Corner; 3], FormatErrorKind> {
    let tokens: Vec<&str> = parts.collect();
    let [a, b, c] = tokens.as_slice() else {
        return Err(FormatErrorKind::FaceArity(tokens.len()));
    };
    Ok([
        parse_face_vertex(a)?,
        parse_face_vertex(b)?,
        parse_face_vertex(c)?,
    ])
}

fn parse_face_vertex(token: &str) -> Result<Corner, FormatErrorKind> {
    let mut split = token.split('/');
    let (Some(v), Some(vt), Some(vn), None) = (split.next(), split.next(), split.next(), split.next())
    else {
        return Err(FormatErrorKind::MalformedFaceVertex(token.to_owned()));
    };
    if v.is_empty() || vt.is_empty() || vn.is_empty() {
        return Err(FormatErrorKind::MalformedFaceVertex(token.to_owned()));
    }

    Ok(Corner {
        position: resolve_index(v, Channel::Position)?,
        uv: resolve_index(vt, Channel::TexCoord)?,
        normal: resolve_index(vn, Channel::Normal)?,
    })
}

/// Convert a 1-based OBJ index into a 0-based pool index.
/// Upper bounds are checked once all pools are known.
fn resolve_index(token: &str, channel: Channel) -> Result<usize, FormatErrorKind> {
    let raw = token
        .parse::<usize>()
        .map_err(|_| FormatErrorKind::InvalidIndex(token.to_owned()))?;
    raw.checked_sub(1).ok_or(FormatErrorKind::ZeroIndex(channel))
}
