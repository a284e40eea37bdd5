//! Math utilities and types
//!
//! Provides the vector, matrix and transform types shared by the scene graph,
//! the serializer and gameplay code.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix3, Matrix4,
    Quaternion,
    Unit,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform from position, Euler rotation (degrees, XYZ) and scale
    pub fn from_euler_degrees(position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::from_euler_angles(
                utils::deg_to_rad(rotation.x),
                utils::deg_to_rad(rotation.y),
                utils::deg_to_rad(rotation.z),
            ),
            scale,
        }
    }

    /// Convert to a transformation matrix (TRS order)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Create a transform from a transformation matrix
    ///
    /// Assumes the matrix carries no shear.
    pub fn from_matrix(matrix: Mat4) -> Self {
        let position = Vec3::new(matrix.m14, matrix.m24, matrix.m34);

        let scale_x = Vec3::new(matrix.m11, matrix.m21, matrix.m31).magnitude();
        let scale_y = Vec3::new(matrix.m12, matrix.m22, matrix.m32).magnitude();
        let scale_z = Vec3::new(matrix.m13, matrix.m23, matrix.m33).magnitude();
        let scale = Vec3::new(scale_x, scale_y, scale_z);

        let rotation_matrix = Matrix3::new(
            matrix.m11 / scale_x, matrix.m12 / scale_y, matrix.m13 / scale_z,
            matrix.m21 / scale_x, matrix.m22 / scale_y, matrix.m23 / scale_z,
            matrix.m31 / scale_x, matrix.m32 / scale_y, matrix.m33 / scale_z,
        );
        let rotation = Quat::from_matrix(&rotation_matrix);

        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Combine this transform with another (`self` is the parent)
    pub fn combine(&self, other: &Transform) -> Transform {
        Transform {
            position: self.position + self.rotation * (self.scale.component_mul(&other.position)),
            rotation: self.rotation * other.rotation,
            scale: self.scale.component_mul(&other.scale),
        }
    }

    /// Get the inverse transform
    pub fn inverse(&self) -> Transform {
        let inv_scale = Vec3::new(1.0 / self.scale.x, 1.0 / self.scale.y, 1.0 / self.scale.z);
        let inv_rotation = self.rotation.inverse();
        let inv_position = inv_rotation * (-self.position.component_mul(&inv_scale));

        Transform {
            position: inv_position,
            rotation: inv_rotation,
            scale: inv_scale,
        }
    }

    /// Express a world matrix relative to a parent's world matrix.
    ///
    /// Returns `None` when the parent matrix is singular (zero scale).
    pub fn relative_to(parent_world: &Mat4, child_world: &Mat4) -> Option<Transform> {
        parent_world
            .try_inverse()
            .map(|inverse| Self::from_matrix(inverse * child_world))
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Mat4, Vec3};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Translation column of an affine matrix
    pub fn translation_of(matrix: &Mat4) -> Vec3 {
        Vec3::new(matrix.m14, matrix.m24, matrix.m34)
    }

    /// Overwrite the translation column of an affine matrix
    pub fn set_translation(matrix: &mut Mat4, position: &Vec3) {
        matrix.m14 = position.x;
        matrix.m24 = position.y;
        matrix.m34 = position.z;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_matrix_roundtrip_consistency() {
        let original = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_axis_angle(&Unit::new_normalize(Vec3::new(1.0, 1.0, 1.0)), 0.5),
            scale: Vec3::new(2.0, 1.5, 0.8),
        };

        let reconstructed = Transform::from_matrix(original.to_matrix());

        assert_relative_eq!(reconstructed.position, original.position, epsilon = 1e-5);
        assert_relative_eq!(reconstructed.scale, original.scale, epsilon = 1e-5);

        // Quaternions might flip sign but represent same rotation
        let dot = original.rotation.coords.dot(&reconstructed.rotation.coords);
        assert!(dot.abs() > 0.999, "Quaternion rotation mismatch: dot product = {}", dot);
    }

    #[test]
    fn test_inverse_transform_validation() {
        let original = Transform {
            position: Vec3::new(2.0, 3.0, 1.0),
            rotation: Quat::from_axis_angle(&Vec3::y_axis(), 0.785),
            scale: Vec3::new(2.0, 2.0, 2.0),
        };

        let should_be_identity = original.combine(&original.inverse());

        assert_relative_eq!(should_be_identity.position, Vec3::zeros(), epsilon = 1e-5);
        assert_relative_eq!(should_be_identity.scale, Vec3::new(1.0, 1.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_relative_to_recovers_world() {
        let parent = Transform {
            position: Vec3::new(4.0, 0.0, -2.0),
            rotation: Quat::from_axis_angle(&Vec3::y_axis(), constants::PI / 2.0),
            scale: Vec3::new(2.0, 2.0, 2.0),
        }
        .to_matrix();
        let child = Transform::from_position(Vec3::new(1.0, 5.0, 1.0)).to_matrix();

        let local = Transform::relative_to(&parent, &child).expect("parent is invertible");
        let rebuilt = parent * local.to_matrix();

        assert_relative_eq!(rebuilt, child, epsilon = 1e-4);
    }

    #[test]
    fn test_singular_parent_has_no_relative_transform() {
        let parent = Transform {
            scale: Vec3::zeros(),
            ..Transform::default()
        }
        .to_matrix();
        assert!(Transform::relative_to(&parent, &Mat4::identity()).is_none());
    }
}
