//! Core types: math re-exports, Transform, Camera.

pub use glam::{Mat4, Quat, Vec3, vec3};

pub mod camera;
pub mod transform;

#[cfg(test)]
mod tests {
    use super::*;
    use camera::{Camera, CameraMatrices};

    fn test_camera() -> Camera {
        Camera::new_perspective(
            vec3(0.0, 0.0, 4.0),
            vec3(0.0, 0.0, 0.0),
            Vec3::Y,
            60f32.to_radians(),
            0.1,
            100.0,
            16.0 / 9.0,
        )
    }

    #[test]
    fn identity_transform_is_identity_matrix() {
        let t = transform::Transform::default();
        assert_eq!(t, transform::Transform::identity());
        assert_eq!(t.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn uniform_scale_matrix_is_diagonal() {
        let m = transform::Transform::uniform_scale(0.012).matrix();
        assert_eq!(m, Mat4::from_scale(Vec3::splat(0.012)));
    }

    #[test]
    fn translated_scale_matrix() {
        let t = transform::Transform {
            translation: vec3(1.0, 2.0, 3.0),
            ..transform::Transform::uniform_scale(2.0)
        };
        // Last column holds translation, diagonal holds scale.
        let m = t.matrix().to_cols_array();
        assert!((m[12] - 1.0).abs() < 1e-6);
        assert!((m[13] - 2.0).abs() < 1e-6);
        assert!((m[14] - 3.0).abs() < 1e-6);
        assert!((m[0] - 2.0).abs() < 1e-6);
        assert!((m[5] - 2.0).abs() < 1e-6);
        assert!((m[10] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn camera_matrices_are_finite() {
        let cam = test_camera();
        let pv = cam.projection_matrix() * cam.view_matrix();
        assert!(pv.to_cols_array().iter().all(|f| f.is_finite()));
    }

    #[test]
    fn camera_matrices_match_inherent_methods() {
        let cam = test_camera();
        assert_eq!(cam.projection_matrix(), cam.proj());
        assert_eq!(cam.view_matrix(), cam.view());
    }

    #[test]
    fn move_forward_translates_eye_and_target() {
        let mut cam = test_camera();
        cam.move_forward(1.0);
        assert!((cam.eye - vec3(0.0, 0.0, 3.0)).length() < 1e-6);
        assert!((cam.target - vec3(0.0, 0.0, -1.0)).length() < 1e-6);

        cam.move_forward(-1.0);
        assert!((cam.eye - vec3(0.0, 0.0, 4.0)).length() < 1e-6);
    }

    #[test]
    fn rotate_keeps_eye_and_turns_target() {
        let mut cam = test_camera();
        cam.rotate(90.0, Vec3::Y);
        assert_eq!(cam.eye, vec3(0.0, 0.0, 4.0));
        // Looking down -Z, a +90 degree yaw about +Y looks down -X.
        assert!((cam.target - vec3(-4.0, 0.0, 4.0)).length() < 1e-4);
    }
}
