//! CPU-side mesh representation used by loaders.

/// Flat, non-indexed triangle-list attributes. Entry `i` of every sequence
/// belongs to the same triangle corner.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshAttributes {
    pub positions: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub normals: Vec<[f32; 3]>,
}

impl MeshAttributes {
    pub fn with_capacity(corners: usize) -> Self {
        Self {
            positions: Vec::with_capacity(corners),
            uvs: Vec::with_capacity(corners),
            normals: Vec::with_capacity(corners),
        }
    }

    /// Append one triangle corner to all three sequences.
    #[inline]
    pub fn push_corner(&mut self, position: [f32; 3], uv: [f32; 2], normal: [f32; 3]) {
        self.positions.push(position);
        self.uvs.push(uv);
        self.normals.push(normal);
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Returns `true` if the sequences are parallel and hold whole triangles.
    pub fn is_valid(&self) -> bool {
        self.positions.len() == self.uvs.len()
            && self.positions.len() == self.normals.len()
            && self.positions.len() % 3 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_attributes_are_valid() {
        let data = MeshAttributes::default();
        assert!(data.is_valid());
        assert!(data.is_empty());
        assert_eq!(data.triangle_count(), 0);
    }

    #[test]
    fn partial_triangle_is_invalid() {
        let mut data = MeshAttributes::with_capacity(3);
        data.push_corner([0.0; 3], [0.0; 2], [0.0, 0.0, 1.0]);
        data.push_corner([1.0, 0.0, 0.0], [0.0; 2], [0.0, 0.0, 1.0]);
        assert!(!data.is_valid());

        data.push_corner([0.0, 1.0, 0.0], [0.0; 2], [0.0, 0.0, 1.0]);
        assert!(data.is_valid());
        assert_eq!(data.vertex_count(), 3);
        assert_eq!(data.triangle_count(), 1);
    }

    #[test]
    fn mismatched_sequences_are_invalid() {
        let data = MeshAttributes {
            positions: vec![[0.0; 3]; 3],
            uvs: vec![[0.0; 2]; 2],
            normals: vec![[0.0; 3]; 3],
        };
        assert!(!data.is_valid());
    }
}
