//! Rotation constructors and setters
//!
//! `rot_x`, `rot_y`, `rot_z` and `set_euler` replace the whole matrix with a
//! pure rotation. The `set_rotation_*` family only swaps the rotational part
//! and keeps scale and translation.

use nalgebra::{Matrix3, Matrix4, Rotation3, Unit, UnitQuaternion, Vector3};

use crate::transform::Transform3D;

/// Axis-angle rotation matrix; a degenerate axis yields the identity
fn axis_angle_matrix(axis: &Vector3<f64>, angle: f64) -> Matrix3<f64> {
    match Unit::try_new(*axis, f64::EPSILON) {
        Some(axis) => Rotation3::from_axis_angle(&axis, angle).into_inner(),
        None => Matrix3::identity(),
    }
}

impl Transform3D {
    /// Rotation `q`, then uniform `scale`, then `translation`
    pub fn from_quaternion(q: &UnitQuaternion<f64>, translation: &Vector3<f64>, scale: f64) -> Self {
        Self::from_matrix3(q.to_rotation_matrix().matrix(), translation, scale)
    }

    /// Rotation by `angle` radians about `axis`, then uniform `scale`, then
    /// `translation`
    ///
    /// A zero-length axis gives no rotation.
    pub fn from_axis_angle(
        axis: &Vector3<f64>,
        angle: f64,
        translation: &Vector3<f64>,
        scale: f64,
    ) -> Self {
        Self::from_matrix3(&axis_angle_matrix(axis, angle), translation, scale)
    }

    /// Replace the matrix by a pure rotation
    fn set_pure_rotation(&mut self, rotation: Matrix3<f64>) {
        let mut matrix = Matrix4::identity();
        matrix.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation);
        self.set_matrix4(&matrix);
        if !self.auto_normalize() {
            self.update_cache(|cache| {
                cache.rotation = Some(rotation);
                cache.scale = Some(Vector3::new(1.0, 1.0, 1.0));
            });
        }
    }

    /// Rotation by `angle` radians about the x axis
    pub fn rot_x(&mut self, angle: f64) {
        let (sin, cos) = angle.sin_cos();
        self.set_pure_rotation(Matrix3::new(
            1.0, 0.0, 0.0, //
            0.0, cos, -sin, //
            0.0, sin, cos,
        ));
    }

    /// Rotation by `angle` radians about the y axis
    pub fn rot_y(&mut self, angle: f64) {
        let (sin, cos) = angle.sin_cos();
        self.set_pure_rotation(Matrix3::new(
            cos, 0.0, sin, //
            0.0, 1.0, 0.0, //
            -sin, 0.0, cos,
        ));
    }

    /// Rotation by `angle` radians about the z axis
    pub fn rot_z(&mut self, angle: f64) {
        let (sin, cos) = angle.sin_cos();
        self.set_pure_rotation(Matrix3::new(
            cos, -sin, 0.0, //
            sin, cos, 0.0, //
            0.0, 0.0, 1.0,
        ));
    }

    /// Rotation from Euler angles `(x, y, z)` in radians, applied about the
    /// fixed x, then y, then z axes
    pub fn set_euler(&mut self, angles: &Vector3<f64>) {
        let rotation = Rotation3::from_euler_angles(angles.x, angles.y, angles.z);
        self.set_pure_rotation(rotation.into_inner());
    }

    /// Replace the rotation by `q`, keeping scale and translation
    pub fn set_rotation_quaternion(&mut self, q: &UnitQuaternion<f64>) {
        self.apply_rotation(q.to_rotation_matrix().matrix());
    }

    /// Replace the rotation by `angle` radians about `axis`, keeping scale
    /// and translation
    pub fn set_rotation_axis_angle(&mut self, axis: &Vector3<f64>, angle: f64) {
        self.apply_rotation(&axis_angle_matrix(axis, angle));
    }
}
