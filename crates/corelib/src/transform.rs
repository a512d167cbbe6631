use crate::{Mat4, Vec3};

/// Model placement: translation plus per-axis scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    #[inline]
    pub const fn identity() -> Self {
        Self {
            translation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    /// Scale-only transform, the same factor on every axis.
    #[inline]
    pub fn uniform_scale(factor: f32) -> Self {
        Self {
            scale: Vec3::splat(factor),
            ..Self::identity()
        }
    }

    /// Build matrix = T * S (column-major Mat4 per glam).
    #[inline]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(self.translation) * Mat4::from_scale(self.scale)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
