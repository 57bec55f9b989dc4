//! Rotation / scale / translation extraction
//!
//! The upper 3x3 block is split as `rotation · diag(scale)`. Rigid, congruent
//! and column-orthogonal blocks take closed-form paths; anything with shear,
//! or an explicit renormalization, goes through the 3x3 SVD.

use log::trace;
use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};

use crate::svd::polar_decompose;
use crate::transform::Transform3D;

impl Transform3D {
    /// Closed-form decomposition, `None` when only the SVD can answer
    fn fast_scale_rotation(&self) -> Option<(Matrix3<f64>, Vector3<f64>)> {
        if !self.is_affine() {
            return None;
        }
        let upper = self.rotation_scale();

        if self.is_rigid() {
            return Some((upper, Vector3::new(1.0, 1.0, 1.0)));
        }

        if self.is_congruent() {
            let s = upper.column(0).norm();
            if s == 0.0 {
                return None;
            }
            return Some((upper / s, Vector3::new(s, s, s)));
        }

        if self.is_ortho() {
            let norms = Vector3::from_fn(|c, _| upper.column(c).norm());
            if norms.iter().any(|norm| *norm == 0.0) {
                return None;
            }
            let mut rotation = upper;
            for (c, norm) in norms.iter().enumerate() {
                rotation.column_mut(c).unscale_mut(*norm);
            }
            return Some((rotation, norms));
        }

        None
    }

    /// Rotation and per-axis scale of the upper 3x3 block
    ///
    /// With `force_svd` the closed-form paths are skipped unless the cached
    /// result already came out of an SVD.
    pub(crate) fn scale_rotation(&self, force_svd: bool) -> (Matrix3<f64>, Vector3<f64>) {
        let cache = self.cached();
        if let (Some(rotation), Some(scale)) = (cache.rotation, cache.scale) {
            if !force_svd || cache.svd_fresh {
                return (rotation, scale);
            }
        }

        let fast = if force_svd {
            None
        } else {
            self.fast_scale_rotation()
        };
        let (rotation, scale, svd_fresh) = match fast {
            Some((rotation, scale)) => (rotation, scale, false),
            None => {
                trace!("decomposing transform through the 3x3 SVD");
                let (rotation, scale) = polar_decompose(&self.rotation_scale());
                (rotation, scale, true)
            }
        };

        self.update_cache(|cache| {
            cache.rotation = Some(rotation);
            cache.scale = Some(scale);
            cache.svd_fresh = svd_fresh;
        });
        (rotation, scale)
    }

    /// Normalized rotation of the upper 3x3 block
    pub fn rotation(&self) -> Matrix3<f64> {
        self.scale_rotation(false).0
    }

    /// Normalized rotation as a unit quaternion
    pub fn rotation_quaternion(&self) -> UnitQuaternion<f64> {
        let rotation = Rotation3::from_matrix_unchecked(self.rotation());
        UnitQuaternion::from_rotation_matrix(&rotation)
    }

    /// Per-axis scale factors
    pub fn scale_vector(&self) -> Vector3<f64> {
        self.scale_rotation(false).1
    }

    /// Largest per-axis scale factor
    pub fn scale(&self) -> f64 {
        self.scale_vector().max()
    }

    /// `(rotation, translation, scale)`
    pub fn rotation_translation(&self) -> (Matrix3<f64>, Vector3<f64>, f64) {
        (self.rotation(), self.translation(), self.scale())
    }

    /// `(rotation, translation, scale)` with the rotation as a quaternion
    pub fn quaternion_translation(&self) -> (UnitQuaternion<f64>, Vector3<f64>, f64) {
        (self.rotation_quaternion(), self.translation(), self.scale())
    }

    /// Replace the rotation, keeping scale and translation
    ///
    /// `rotation` is normalized first, so a scaled or slightly skewed matrix
    /// contributes only its rotational part.
    pub fn set_rotation(&mut self, rotation: &Matrix3<f64>) {
        let normalized = Transform3D::from_rotation_scale(rotation).rotation();
        self.apply_rotation(&normalized);
    }

    /// Rebuild the upper 3x3 block from an orthonormal `rotation` and the
    /// current scale
    pub(crate) fn apply_rotation(&mut self, rotation: &Matrix3<f64>) {
        let scale = self.scale_vector();
        self.write_upper(&(rotation * Matrix3::from_diagonal(&scale)));
        self.changed();
        if !self.auto_normalize() {
            let rotation = *rotation;
            self.update_cache(|cache| {
                cache.rotation = Some(rotation);
                cache.scale = Some(scale);
            });
        }
    }

    /// Set a uniform scale, keeping rotation and translation
    pub fn set_scale(&mut self, scale: f64) {
        self.set_scale_vector(&Vector3::new(scale, scale, scale));
    }

    /// Set per-axis scale factors, keeping rotation and translation
    pub fn set_scale_vector(&mut self, scale: &Vector3<f64>) {
        let rotation = self.rotation();
        self.write_upper(&(rotation * Matrix3::from_diagonal(scale)));
        self.changed();
        if !self.auto_normalize() {
            let scale = *scale;
            self.update_cache(|cache| {
                cache.rotation = Some(rotation);
                cache.scale = Some(scale);
            });
        }
    }

    /// Replace the upper 3x3 block with its nearest rotation (SVD based),
    /// dropping scale and shear; translation is kept
    pub fn normalize(&mut self) {
        let (rotation, _) = self.scale_rotation(true);
        self.write_upper(&rotation);
        self.invalidate();
        self.update_cache(|cache| {
            cache.rotation = Some(rotation);
            cache.scale = Some(Vector3::new(1.0, 1.0, 1.0));
            cache.svd_fresh = true;
        });
    }

    /// Orthonormalize the upper 3x3 block with cross products
    ///
    /// Column 0 keeps its direction, column 2 becomes perpendicular to
    /// columns 0 and 1, and column 1 is rebuilt from the other two.
    pub fn normalize_cp(&mut self) {
        let upper = self.rotation_scale();
        let x = upper.column(0).normalize();
        let z = x.cross(&upper.column(1)).normalize();
        let y = z.cross(&x);
        self.write_upper(&Matrix3::from_columns(&[x, y, z]));
        self.changed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform_type::TransformType;
    use approx::assert_relative_eq;

    fn sheared(shear: f64) -> Transform3D {
        Transform3D::from_rotation_scale(&Matrix3::new(
            2.0, shear, 0.0, //
            0.0, 5.0, 0.0, //
            0.0, 0.0, 3.0,
        ))
    }

    #[test]
    fn test_rigid_fast_path() {
        let rotation = Rotation3::from_euler_angles(0.4, -0.2, 1.3).into_inner();
        let mut t = Transform3D::from_rotation_scale(&rotation);
        t.set_translation(&Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(t.rotation(), rotation);
        assert_eq!(t.scale_vector(), Vector3::new(1.0, 1.0, 1.0));
        assert!(!t.cached().svd_fresh);
    }

    #[test]
    fn test_congruent_fast_path() {
        let rotation = Rotation3::from_euler_angles(0.1, 0.2, 0.3).into_inner();
        let t = Transform3D::from_rotation_scale(&(rotation * 2.5));
        assert_relative_eq!(t.rotation(), rotation, epsilon = 1e-12);
        assert_relative_eq!(t.scale_vector(), Vector3::new(2.5, 2.5, 2.5), epsilon = 1e-12);
        assert_relative_eq!(t.scale(), 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_fast_path_and_svd_agree_on_axes() {
        let diagonal = sheared(0.0);
        assert_eq!(diagonal.scale_vector(), Vector3::new(2.0, 5.0, 3.0));
        assert!(!diagonal.cached().svd_fresh);

        let skewed = sheared(0.001);
        let scale = skewed.scale_vector();
        assert!(skewed.cached().svd_fresh);
        assert_relative_eq!(scale, Vector3::new(2.0, 5.0, 3.0), epsilon = 1e-3);
    }

    #[test]
    fn test_decomposition_round_trip() {
        let q = UnitQuaternion::from_euler_angles(0.7, -0.3, 2.1);
        let mut t = Transform3D::from_quaternion(&q, &Vector3::zeros(), 1.0);
        t.set_scale_vector(&Vector3::new(1.5, 4.0, 0.5));
        t.set_translation(&Vector3::new(-3.0, 2.0, 9.0));

        // Drop every cache so the decomposition is rebuilt from the matrix
        let t = Transform3D::from_matrix4(t.matrix());
        let (rotation, translation, scale) = t.quaternion_translation();
        assert!(rotation.angle_to(&q) < 1e-6);
        assert_relative_eq!(translation, Vector3::new(-3.0, 2.0, 9.0), epsilon = 1e-6);
        assert_relative_eq!(scale, 4.0, epsilon = 1e-6);
    }

    #[test]
    fn test_set_scale_on_identity_is_scale() {
        let mut t = Transform3D::identity();
        t.set_scale_vector(&Vector3::new(2.0, 2.0, 2.0));
        assert_eq!(t.best_type(), TransformType::SCALE);
        assert!(!t.transform_type().contains(TransformType::IDENTITY));
    }

    #[test]
    fn test_set_scale_keeps_rotation() {
        let mut t = Transform3D::identity();
        t.rot_z(0.5);
        t.set_translation(&Vector3::new(1.0, 1.0, 1.0));
        t.set_scale_vector(&Vector3::new(1.0, 2.0, 3.0));

        let fresh = Transform3D::from_matrix4(t.matrix());
        assert_relative_eq!(
            fresh.rotation(),
            Rotation3::from_axis_angle(&Vector3::z_axis(), 0.5).into_inner(),
            epsilon = 1e-12
        );
        assert_relative_eq!(fresh.scale_vector(), Vector3::new(1.0, 2.0, 3.0), epsilon = 1e-12);
        assert_eq!(t.translation(), Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_set_rotation_keeps_scale() {
        let mut t = Transform3D::from_nonuniform_scale(&Vector3::new(2.0, 5.0, 3.0));
        let rotation = Rotation3::from_axis_angle(&Vector3::x_axis(), 0.3).into_inner();
        // A scaled input contributes only its rotation
        t.set_rotation(&(rotation * 7.0));

        let fresh = Transform3D::from_matrix4(t.matrix());
        assert_relative_eq!(fresh.rotation(), rotation, epsilon = 1e-12);
        assert_relative_eq!(fresh.scale_vector(), Vector3::new(2.0, 5.0, 3.0), epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_strips_scale() {
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), 30f64.to_radians()).into_inner();
        let mut t = Transform3D::from_rotation_scale(
            &(rotation * Matrix3::from_diagonal(&Vector3::new(2.0, 5.0, 3.0))),
        );
        t.set_translation(&Vector3::new(4.0, 0.0, 0.0));
        t.normalize();

        assert_relative_eq!(t.rotation_scale(), rotation, epsilon = 1e-10);
        assert_eq!(t.translation(), Vector3::new(4.0, 0.0, 0.0));
        assert!(t.is_rigid());
    }

    #[test]
    fn test_normalize_reuses_svd_result() {
        let mut t = sheared(0.2);
        let _ = t.scale_rotation(true);
        assert!(t.cached().svd_fresh);
        let rotation = t.cached().rotation;
        t.normalize();
        assert_eq!(t.cached().rotation, rotation);
    }

    #[test]
    fn test_normalize_cp() {
        let mut t = Transform3D::from_rotation_scale(&Matrix3::new(
            2.0, 1.0, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, 0.0, 4.0,
        ));
        t.normalize_cp();
        assert_relative_eq!(t.rotation_scale(), Matrix3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_auto_normalize_after_mutation() {
        let mut t = Transform3D::identity();
        t.set_auto_normalize(true);
        t.set_rotation_scale(&Matrix3::new(
            3.0, 0.0, 0.0, //
            0.0, 3.0, 0.0, //
            0.0, 0.0, 3.0,
        ));
        assert_relative_eq!(t.rotation_scale(), Matrix3::identity(), epsilon = 1e-12);
        assert!(t.is_rigid());
    }

    #[test]
    fn test_rank_one_shear_keeps_dominant_scale() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(3);
        let mut rows = vec![(1.0422287859091468, 1.4519933244619778)];
        rows.extend((0..200).map(|_| (rng.gen_range(0.1..2.0), rng.gen_range(0.1..2.0))));
        for (x, y) in rows {
            let t = Transform3D::from_rotation_scale(&Matrix3::new(
                0.0, 0.0, 0.0, //
                x, -y, 0.0, //
                0.0, 0.0, 0.0,
            ));
            let scale = t.scale_vector();
            assert!(t.cached().svd_fresh);
            assert_relative_eq!(scale.max(), x.hypot(y), max_relative = 1e-12);
            assert!(scale.iter().all(|s| !s.is_sign_negative()));
        }
    }

    #[test]
    fn test_non_finite_block_decomposes_conservatively() {
        let t = Transform3D::from_rotation_scale(&Matrix3::new(
            f64::NAN, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, 0.0, 1.0,
        ));
        let (rotation, scale) = t.scale_rotation(false);
        assert_eq!(rotation, Matrix3::identity());
        assert_eq!(scale[1], 1.0);
    }
}
