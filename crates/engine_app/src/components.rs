//! Demo scene components.

use engine_entity::Component;
use glam::{Mat4, Quat, Vec3};

/// Position, rotation and scale in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// The identity transform: origin, no rotation, unit scale.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Model matrix of this transform.
    #[must_use]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Look from the current position towards `target`, Y up.
    #[must_use]
    pub fn looking_at(mut self, target: Vec3) -> Self {
        let view = Mat4::look_at_rh(self.position, target, Vec3::Y);
        let (_, rotation, _) = view.inverse().to_scale_rotation_translation();
        self.rotation = rotation;
        self
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Component for Transform {
    fn type_name() -> &'static str {
        "Transform"
    }
}

/// Linear velocity in world units per second.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity {
    pub linear: Vec3,
}

impl Component for Velocity {
    fn type_name() -> &'static str {
        "Velocity"
    }
}

/// Perspective camera parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov_y: std::f32::consts::FRAC_PI_3,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    #[must_use]
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    /// Combined projection and view matrix for a camera placed at `transform`.
    #[must_use]
    pub fn view_projection(&self, transform: &Transform) -> Mat4 {
        self.projection() * transform.to_matrix().inverse()
    }
}

impl Component for Camera {
    fn type_name() -> &'static str {
        "Camera"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_transform() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.to_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_looking_at_faces_target() {
        let t = Transform::from_position(Vec3::new(0.0, 0.0, 5.0)).looking_at(Vec3::ZERO);
        // Cameras look down their local -Z axis.
        let forward = t.rotation * Vec3::NEG_Z;
        assert!(forward.abs_diff_eq(Vec3::NEG_Z, 1e-5));
    }

    #[test]
    fn test_view_projection_at_origin_is_projection() {
        let camera = Camera::default();
        let vp = camera.view_projection(&Transform::IDENTITY);
        assert!(vp.abs_diff_eq(camera.projection(), 1e-6));
    }

    #[test]
    fn test_component_names_are_distinct() {
        assert_ne!(Transform::component_type_id(), Velocity::component_type_id());
        assert_ne!(Camera::component_type_id(), Transform::component_type_id());
    }
}
