use crate::{Mat4, Quat, Vec3};

/// Source of the per-frame view and projection matrices.
/// Queried every frame; implementations must be side-effect free.
pub trait CameraMatrices {
    fn projection_matrix(&self) -> Mat4;
    fn view_matrix(&self) -> Mat4;
}

/// Simple perspective camera (right-handed).
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_rad: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub aspect: f32,
}

impl Camera {
    #[allow(clippy::too_many_arguments)]
    pub fn new_perspective(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y_rad: f32,
        z_near: f32,
        z_far: f32,
        aspect: f32,
    ) -> Self {
        Self {
            eye,
            target,
            up,
            fov_y_rad,
            z_near,
            z_far,
            aspect,
        }
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Depth range is z in [0,1], matching wgpu clip space.
    #[inline]
    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_rad,
            self.aspect.max(1e-6),
            self.z_near,
            self.z_far,
        )
    }

    #[inline]
    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }

    /// Turn the view direction around `axis` (through the eye) by `angle_deg`.
    pub fn rotate(&mut self, angle_deg: f32, axis: Vec3) {
        let Some(axis) = axis.try_normalize() else {
            return;
        };
        let q = Quat::from_axis_angle(axis, angle_deg.to_radians());
        let offset = self.target - self.eye;
        self.target = self.eye + q * offset;
    }

    /// Move eye and target together along the view direction.
    /// Negative distances move backwards.
    pub fn move_forward(&mut self, distance: f32) {
        let Some(dir) = (self.target - self.eye).try_normalize() else {
            return;
        };
        let delta = dir * distance;
        self.eye += delta;
        self.target += delta;
    }
}

impl CameraMatrices for Camera {
    #[inline]
    fn projection_matrix(&self) -> Mat4 {
        self.proj()
    }

    #[inline]
    fn view_matrix(&self) -> Mat4 {
        self.view()
    }
}
