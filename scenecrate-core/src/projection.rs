//! Viewing and projection matrices
//!
//! Conventions follow OpenGL: the eye looks down `-z`, and the clip volume
//! maps to the `[-1, 1]` cube. `near` and `far` are positive distances.

use nalgebra::{Matrix4, Point3, Vector3};

use crate::error::{Error, Result};
use crate::transform::Transform3D;

fn check_extent(name: &str, low: f64, high: f64) -> Result<()> {
    if low == high || !(high - low).is_finite() {
        return Err(Error::InvalidData(format!(
            "degenerate {} extent: [{}, {}]",
            name, low, high
        )));
    }
    Ok(())
}

impl Transform3D {
    /// Perspective projection for the viewing frustum with the given near
    /// plane rectangle and clipping distances
    pub fn frustum(
        &mut self,
        left: f64,
        right: f64,
        bottom: f64,
        top: f64,
        near: f64,
        far: f64,
    ) -> Result<()> {
        check_extent("horizontal", left, right)?;
        check_extent("vertical", bottom, top)?;
        check_extent("depth", near, far)?;

        let mut m = Matrix4::zeros();
        m[(0, 0)] = 2.0 * near / (right - left);
        m[(0, 2)] = (right + left) / (right - left);
        m[(1, 1)] = 2.0 * near / (top - bottom);
        m[(1, 2)] = (top + bottom) / (top - bottom);
        m[(2, 2)] = -(far + near) / (far - near);
        m[(2, 3)] = -2.0 * far * near / (far - near);
        m[(3, 2)] = -1.0;
        self.set_matrix4(&m);
        Ok(())
    }

    /// Symmetric perspective projection with horizontal field of view `fovx`
    /// (radians) and `aspect = width / height`
    pub fn perspective(&mut self, fovx: f64, aspect: f64, near: f64, far: f64) -> Result<()> {
        if aspect == 0.0 || !aspect.is_finite() {
            return Err(Error::InvalidData(format!("invalid aspect ratio {}", aspect)));
        }
        let right = near * (fovx * 0.5).tan();
        let top = right / aspect;
        self.frustum(-right, right, -top, top, near, far)
    }

    /// Parallel projection of the given box onto the clip cube
    pub fn ortho(
        &mut self,
        left: f64,
        right: f64,
        bottom: f64,
        top: f64,
        near: f64,
        far: f64,
    ) -> Result<()> {
        check_extent("horizontal", left, right)?;
        check_extent("vertical", bottom, top)?;
        check_extent("depth", near, far)?;

        let mut m = Matrix4::identity();
        m[(0, 0)] = 2.0 / (right - left);
        m[(0, 3)] = -(right + left) / (right - left);
        m[(1, 1)] = 2.0 / (top - bottom);
        m[(1, 3)] = -(top + bottom) / (top - bottom);
        m[(2, 2)] = -2.0 / (far - near);
        m[(2, 3)] = -(far + near) / (far - near);
        self.set_matrix4(&m);
        Ok(())
    }

    /// Viewing transform placing the eye at `eye`, looking at `center`, with
    /// `up` pointing up
    ///
    /// Fails when `eye == center` or `up` is parallel to the view direction.
    pub fn look_at(&mut self, eye: &Point3<f64>, center: &Point3<f64>, up: &Vector3<f64>) -> Result<()> {
        let forward = (eye - center)
            .try_normalize(f64::EPSILON)
            .ok_or_else(|| Error::InvalidData("eye and center coincide".to_string()))?;
        let side = up
            .cross(&forward)
            .try_normalize(f64::EPSILON)
            .ok_or_else(|| Error::InvalidData("up is parallel to the view direction".to_string()))?;
        let up = forward.cross(&side);

        let mut m = Matrix4::identity();
        for (r, axis) in [side, up, forward].iter().enumerate() {
            m[(r, 0)] = axis.x;
            m[(r, 1)] = axis.y;
            m[(r, 2)] = axis.z;
            m[(r, 3)] = -axis.dot(&eye.coords);
        }
        self.set_matrix4(&m);
        Ok(())
    }
}
