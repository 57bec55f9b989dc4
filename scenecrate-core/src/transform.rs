//! 4x4 homogeneous transform with lazily derived classification and decomposition
//!
//! [`Transform3D`] owns a double precision matrix and caches everything derived
//! from it (category bits, normalized rotation, per-axis scale). Every mutator
//! drops exactly the cached state it could have invalidated; the getters
//! recompute on demand.

use std::cell::Cell;
use std::fmt;

use log::{debug, trace};
use nalgebra::{Isometry3, Matrix3, Matrix4, Point3, Vector3, Vector4};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lu;
use crate::tolerance::EPS;
use crate::transform_type::TransformType;

/// Lazily derived state. `None` marks a stale entry.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Cache {
    pub(crate) affine: Option<bool>,
    /// `(congruent, rigid)`, resolved together
    pub(crate) congruence: Option<(bool, bool)>,
    /// Upper 3x3 columns pairwise orthogonal, last row ignored. Internal only.
    pub(crate) ortho: Option<bool>,
    pub(crate) kind: Option<TransformType>,
    pub(crate) rotation: Option<Matrix3<f64>>,
    pub(crate) scale: Option<Vector3<f64>>,
    /// Cached rotation/scale came out of a full SVD
    pub(crate) svd_fresh: bool,
    #[cfg(test)]
    pub(crate) classify_runs: u32,
}

/// A 4x4 homogeneous transformation matrix
///
/// Elements are addressed as `(row, column)`; points are column vectors, so
/// the translation lives in the last column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transform3D {
    matrix: Matrix4<f64>,
    #[serde(default)]
    auto_normalize: bool,
    #[serde(skip)]
    cache: Cell<Cache>,
}

impl Transform3D {
    pub(crate) fn with_matrix(matrix: Matrix4<f64>) -> Self {
        Self {
            matrix,
            auto_normalize: false,
            cache: Cell::new(Cache::default()),
        }
    }

    /// Create an identity transformation
    pub fn identity() -> Self {
        Self::with_matrix(Matrix4::identity())
    }

    /// Create a transformation with every element set to zero
    pub fn zero() -> Self {
        Self::with_matrix(Matrix4::zeros())
    }

    /// Create a transformation from 16 row-major elements
    pub fn from_row_array(elements: [f64; 16]) -> Self {
        Self::with_matrix(Matrix4::from_row_slice(&elements))
    }

    /// Create a transformation from 16 row-major single precision elements
    pub fn from_row_array_f32(elements: [f32; 16]) -> Self {
        Self::with_matrix(Matrix4::from_row_slice(&elements).cast::<f64>())
    }

    /// Create a transformation from a row-major slice of exactly 16 elements
    pub fn from_row_slice(elements: &[f64]) -> Result<Self> {
        if elements.len() != 16 {
            return Err(Error::InvalidData(format!(
                "expected 16 matrix elements, got {}",
                elements.len()
            )));
        }
        Ok(Self::with_matrix(Matrix4::from_row_slice(elements)))
    }

    /// Create a transformation from a 4x4 matrix
    pub fn from_matrix4(matrix: Matrix4<f64>) -> Self {
        Self::with_matrix(matrix)
    }

    /// Upper 3x3 is `rotation_scale * scale`, translation is `translation`
    ///
    /// The matrix is used as given; it is not normalized.
    pub fn from_matrix3(rotation_scale: &Matrix3<f64>, translation: &Vector3<f64>, scale: f64) -> Self {
        let mut matrix = Matrix4::identity();
        matrix
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&(rotation_scale * scale));
        matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
        Self::with_matrix(matrix)
    }

    /// Upper 3x3 from the given matrix, the rest identity
    pub fn from_rotation_scale(rotation_scale: &Matrix3<f64>) -> Self {
        Self::from_matrix3(rotation_scale, &Vector3::zeros(), 1.0)
    }

    /// Create a translation transformation
    pub fn from_translation(translation: &Vector3<f64>) -> Self {
        let mut transform = Self::identity();
        transform.set_translation(translation);
        transform
    }

    /// Create a uniform scaling transformation
    pub fn from_scale(scale: f64) -> Self {
        Self::from_scale_translation(scale, &Vector3::zeros())
    }

    /// Create a uniform scaling transformation followed by a translation
    pub fn from_scale_translation(scale: f64, translation: &Vector3<f64>) -> Self {
        Self::from_matrix3(&Matrix3::identity(), translation, scale)
    }

    /// Create a per-axis scaling transformation
    pub fn from_nonuniform_scale(scale: &Vector3<f64>) -> Self {
        Self::with_matrix(Matrix4::new_nonuniform_scaling(scale))
    }

    pub(crate) fn cached(&self) -> Cache {
        self.cache.get()
    }

    pub(crate) fn update_cache(&self, update: impl FnOnce(&mut Cache)) {
        let mut cache = self.cache.get();
        update(&mut cache);
        self.cache.set(cache);
    }

    /// Drop every piece of derived state
    pub(crate) fn invalidate(&mut self) {
        *self.cache.get_mut() = Cache::default();
    }

    /// Drop derived state after a mutation of the upper 3x3 or last row, then
    /// re-orthonormalize if requested
    pub(crate) fn changed(&mut self) {
        self.invalidate();
        if self.auto_normalize {
            self.normalize();
        }
    }

    /// Replace the matrix with precomputed derived state
    fn replace(&mut self, matrix: Matrix4<f64>, cache: Cache) {
        self.matrix = matrix;
        *self.cache.get_mut() = cache;
        if self.auto_normalize {
            self.normalize();
        }
    }

    pub(crate) fn raw(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    /// Overwrite the upper 3x3 block without touching the caches
    pub(crate) fn write_upper(&mut self, upper: &Matrix3<f64>) {
        self.matrix.fixed_view_mut::<3, 3>(0, 0).copy_from(upper);
    }

    /// Whether every mutator re-orthonormalizes the rotational part
    pub fn auto_normalize(&self) -> bool {
        self.auto_normalize
    }

    /// Enable or disable re-orthonormalization after every mutation
    pub fn set_auto_normalize(&mut self, auto_normalize: bool) {
        self.auto_normalize = auto_normalize;
        if auto_normalize {
            self.normalize();
        }
    }

    /// The full 4x4 matrix
    pub fn matrix(&self) -> Matrix4<f64> {
        self.matrix
    }

    /// A single element
    ///
    /// # Panics
    ///
    /// Panics if `row` or `col` is not in `0..4`.
    pub fn element(&self, row: usize, col: usize) -> f64 {
        self.matrix[(row, col)]
    }

    /// The 16 elements in row-major order
    pub fn to_row_array(&self) -> [f64; 16] {
        let mut elements = [0.0; 16];
        for (i, element) in elements.iter_mut().enumerate() {
            *element = self.matrix[(i / 4, i % 4)];
        }
        elements
    }

    /// The 16 elements in row-major order, narrowed to single precision
    pub fn to_row_array_f32(&self) -> [f32; 16] {
        self.to_row_array().map(|element| element as f32)
    }

    /// The raw upper 3x3 block, neither normalized nor decomposed
    pub fn rotation_scale(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// The translation column
    pub fn translation(&self) -> Vector3<f64> {
        self.matrix.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Copy another transform into this one
    pub fn set(&mut self, other: &Transform3D) {
        self.matrix = other.matrix;
        *self.cache.get_mut() = other.cached();
        if self.auto_normalize && !other.auto_normalize {
            self.normalize();
        }
    }

    /// Reset to the identity matrix
    pub fn set_identity(&mut self) {
        self.matrix = Matrix4::identity();
        self.changed();
    }

    /// Set every element to zero
    pub fn set_zero(&mut self) {
        self.matrix = Matrix4::zeros();
        self.changed();
    }

    /// Replace all sixteen elements with `matrix`
    pub fn set_matrix4(&mut self, matrix: &Matrix4<f64>) {
        self.matrix = *matrix;
        self.changed();
    }

    /// Replace all sixteen elements from a row-major array
    pub fn set_row_array(&mut self, elements: &[f64; 16]) {
        self.matrix = Matrix4::from_row_slice(elements);
        self.changed();
    }

    /// Upper 3x3 from `rotation_scale`; translation cleared, last row `[0, 0, 0, 1]`
    pub fn set_matrix3(&mut self, rotation_scale: &Matrix3<f64>) {
        self.matrix = Matrix4::identity();
        self.write_upper(rotation_scale);
        self.changed();
    }

    /// Replace the raw upper 3x3 block, keeping translation and last row
    pub fn set_rotation_scale(&mut self, rotation_scale: &Matrix3<f64>) {
        self.write_upper(rotation_scale);
        self.changed();
    }

    /// Replace the translation column, keeping rotation and scale
    pub fn set_translation(&mut self, translation: &Vector3<f64>) {
        self.matrix
            .fixed_view_mut::<3, 1>(0, 3)
            .copy_from(translation);
        // Affine/congruent/rigid and the rotation/scale caches only read the
        // upper 3x3 and the last row.
        self.cache.get_mut().kind = None;
    }

    /// Element-wise sum with `other`
    pub fn add(&mut self, other: &Transform3D) {
        self.matrix += other.matrix;
        self.changed();
    }

    /// Add `scalar` to every element
    pub fn add_scalar(&mut self, scalar: f64) {
        self.matrix.add_scalar_mut(scalar);
        self.changed();
    }

    /// Element-wise difference with `other`
    pub fn sub(&mut self, other: &Transform3D) {
        self.matrix -= other.matrix;
        self.changed();
    }

    /// Multiply every element by `scalar`
    pub fn mul_scalar(&mut self, scalar: f64) {
        self.matrix *= scalar;
        self.changed();
    }

    /// `self = scalar * self + other`
    pub fn scale_add(&mut self, scalar: f64, other: &Transform3D) {
        self.matrix = self.matrix * scalar + other.matrix;
        self.changed();
    }

    /// `self = self * other`
    pub fn multiply(&mut self, other: &Transform3D) {
        let (matrix, cache) = compose(self, other);
        self.replace(matrix, cache);
    }

    /// `self = a * b`
    pub fn set_product(&mut self, a: &Transform3D, b: &Transform3D) {
        let (matrix, cache) = compose(a, b);
        self.replace(matrix, cache);
    }

    /// `self = self * other⁻¹`
    pub fn mul_inverse(&mut self, other: &Transform3D) -> Result<()> {
        let inverse = other.inverse()?;
        self.multiply(&inverse);
        Ok(())
    }

    /// `self = aᵀ * b`
    pub fn mul_transpose_left(&mut self, a: &Transform3D, b: &Transform3D) {
        self.matrix = a.matrix.transpose() * b.matrix;
        self.changed();
    }

    /// `self = a * bᵀ`
    pub fn mul_transpose_right(&mut self, a: &Transform3D, b: &Transform3D) {
        self.matrix = a.matrix * b.matrix.transpose();
        self.changed();
    }

    /// `self = aᵀ * bᵀ`
    pub fn mul_transpose_both(&mut self, a: &Transform3D, b: &Transform3D) {
        self.matrix = (b.matrix * a.matrix).transpose();
        self.changed();
    }

    /// Transpose in place
    pub fn transpose(&mut self) {
        self.matrix.transpose_mut();
        self.changed();
    }

    /// A transposed copy
    pub fn transposed(&self) -> Self {
        let mut transposed = self.clone();
        transposed.transpose();
        transposed
    }

    /// Invert in place
    ///
    /// Affine matrices use the closed-form block inverse unless it would be
    /// numerically unstable; everything else goes through LU decomposition.
    /// On error the matrix is left untouched.
    pub fn invert(&mut self) -> Result<()> {
        let inverse = if self.is_affine() {
            self.affine_inverse()?
        } else {
            self.general_inverse()?
        };
        self.matrix = inverse;
        self.changed();
        Ok(())
    }

    /// An inverted copy
    pub fn inverse(&self) -> Result<Self> {
        let mut inverse = self.clone();
        inverse.invert()?;
        Ok(inverse)
    }

    fn affine_inverse(&self) -> Result<Matrix4<f64>> {
        let m = &self.matrix;
        let det = self.affine_determinant();
        if det == 0.0 {
            debug!("affine inverse of a matrix with zero determinant");
            return Err(Error::SingularMatrix);
        }

        let norms: f64 = (0..3)
            .map(|c| m.fixed_view::<3, 1>(0, c).norm_squared())
            .product();
        if det * det < EPS * norms {
            trace!("affine inverse is ill-conditioned, falling back to LU");
            return self.general_inverse();
        }

        let s = 1.0 / det;
        let mut inv = Matrix4::identity();
        inv[(0, 0)] = (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)]) * s;
        inv[(0, 1)] = -(m[(0, 1)] * m[(2, 2)] - m[(0, 2)] * m[(2, 1)]) * s;
        inv[(0, 2)] = (m[(0, 1)] * m[(1, 2)] - m[(0, 2)] * m[(1, 1)]) * s;
        inv[(1, 0)] = -(m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)]) * s;
        inv[(1, 1)] = (m[(0, 0)] * m[(2, 2)] - m[(0, 2)] * m[(2, 0)]) * s;
        inv[(1, 2)] = -(m[(0, 0)] * m[(1, 2)] - m[(0, 2)] * m[(1, 0)]) * s;
        inv[(2, 0)] = (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)]) * s;
        inv[(2, 1)] = -(m[(0, 0)] * m[(2, 1)] - m[(0, 1)] * m[(2, 0)]) * s;
        inv[(2, 2)] = (m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)]) * s;

        for r in 0..3 {
            inv[(r, 3)] = -(inv[(r, 0)] * m[(0, 3)]
                + inv[(r, 1)] * m[(1, 3)]
                + inv[(r, 2)] * m[(2, 3)]);
        }
        Ok(inv)
    }

    fn general_inverse(&self) -> Result<Matrix4<f64>> {
        let mut lu = self.to_row_array();
        let permutation = lu::decompose(&mut lu).map_err(|err| {
            debug!("LU decomposition found a degenerate pivot");
            err
        })?;

        let mut inverse = Matrix4::zeros();
        for c in 0..4 {
            let mut column = [0.0; 4];
            column[c] = 1.0;
            lu::back_substitute(&lu, &permutation, &mut column);
            for (r, value) in column.iter().enumerate() {
                inverse[(r, c)] = *value;
            }
        }
        Ok(inverse)
    }

    pub(crate) fn affine_determinant(&self) -> f64 {
        let m = &self.matrix;
        m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
            - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
            + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)])
    }

    /// Determinant of the full 4x4 matrix
    pub fn determinant(&self) -> f64 {
        if self.is_affine() {
            return self.affine_determinant();
        }
        let m = &self.matrix;
        // Laplace expansion over the 2x2 minors of rows 0-1 and rows 2-3
        let s0 = m[(0, 0)] * m[(1, 1)] - m[(1, 0)] * m[(0, 1)];
        let s1 = m[(0, 0)] * m[(1, 2)] - m[(1, 0)] * m[(0, 2)];
        let s2 = m[(0, 0)] * m[(1, 3)] - m[(1, 0)] * m[(0, 3)];
        let s3 = m[(0, 1)] * m[(1, 2)] - m[(1, 1)] * m[(0, 2)];
        let s4 = m[(0, 1)] * m[(1, 3)] - m[(1, 1)] * m[(0, 3)];
        let s5 = m[(0, 2)] * m[(1, 3)] - m[(1, 2)] * m[(0, 3)];

        let c5 = m[(2, 2)] * m[(3, 3)] - m[(3, 2)] * m[(2, 3)];
        let c4 = m[(2, 1)] * m[(3, 3)] - m[(3, 1)] * m[(2, 3)];
        let c3 = m[(2, 1)] * m[(3, 2)] - m[(3, 1)] * m[(2, 2)];
        let c2 = m[(2, 0)] * m[(3, 3)] - m[(3, 0)] * m[(2, 3)];
        let c1 = m[(2, 0)] * m[(3, 2)] - m[(3, 0)] * m[(2, 2)];
        let c0 = m[(2, 0)] * m[(3, 1)] - m[(3, 0)] * m[(2, 1)];

        s0 * c5 - s1 * c4 + s2 * c3 + s3 * c2 - s4 * c1 + s5 * c0
    }

    /// Apply the transformation to a point (implicit `w = 1`)
    ///
    /// For non-affine matrices the result is divided by the transformed `w`
    /// unless it is zero.
    pub fn transform_point(&self, point: &Point3<f64>) -> Point3<f64> {
        let m = &self.matrix;
        let x = m[(0, 0)] * point.x + m[(0, 1)] * point.y + m[(0, 2)] * point.z + m[(0, 3)];
        let y = m[(1, 0)] * point.x + m[(1, 1)] * point.y + m[(1, 2)] * point.z + m[(1, 3)];
        let z = m[(2, 0)] * point.x + m[(2, 1)] * point.y + m[(2, 2)] * point.z + m[(2, 3)];
        if self.is_affine() {
            return Point3::new(x, y, z);
        }

        let w = m[(3, 0)] * point.x + m[(3, 1)] * point.y + m[(3, 2)] * point.z + m[(3, 3)];
        if w == 0.0 || w == 1.0 {
            Point3::new(x, y, z)
        } else {
            Point3::new(x / w, y / w, z / w)
        }
    }

    /// Apply the transformation to a vector (implicit `w = 0`, no translation)
    pub fn transform_vector(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0) * vector
    }

    /// Apply the transformation to a surface normal (implicit `w = 0`)
    pub fn transform_normal(&self, normal: &Vector3<f64>) -> Vector3<f64> {
        self.transform_vector(normal)
    }

    /// Apply the full 4x4 matrix to a homogeneous vector
    pub fn transform_vector4(&self, vector: &Vector4<f64>) -> Vector4<f64> {
        self.matrix * vector
    }

    /// [`transform_point`](Self::transform_point), overwriting `point`
    pub fn transform_point_in_place(&self, point: &mut Point3<f64>) {
        *point = self.transform_point(point);
    }

    /// [`transform_vector`](Self::transform_vector), overwriting `vector`
    pub fn transform_vector_in_place(&self, vector: &mut Vector3<f64>) {
        *vector = self.transform_vector(vector);
    }

    /// [`transform_normal`](Self::transform_normal), overwriting `normal`
    pub fn transform_normal_in_place(&self, normal: &mut Vector3<f64>) {
        *normal = self.transform_normal(normal);
    }

    /// [`transform_vector4`](Self::transform_vector4), overwriting `vector`
    pub fn transform_vector4_in_place(&self, vector: &mut Vector4<f64>) {
        *vector = self.transform_vector4(vector);
    }

    /// True when no element differs by more than `epsilon` (L-infinity)
    pub fn epsilon_equals(&self, other: &Transform3D, epsilon: f64) -> bool {
        self.matrix
            .iter()
            .zip(other.matrix.iter())
            .all(|(a, b)| (a - b).abs() <= epsilon)
    }
}

/// `a * b`, skipping the known zeros of whichever operand is affine
fn compose(a: &Transform3D, b: &Transform3D) -> (Matrix4<f64>, Cache) {
    let (a_affine, b_affine) = (a.is_affine(), b.is_affine());
    if !(a_affine || b_affine) {
        return (a.matrix * b.matrix, Cache::default());
    }

    let (ma, mb) = (&a.matrix, &b.matrix);
    let mut product = Matrix4::identity();
    // An affine `a` has last row [0, 0, 0, 1], which copies b's last row
    let rows = if a_affine { 3 } else { 4 };
    for r in 0..rows {
        for c in 0..4 {
            let mut sum = ma[(r, 0)] * mb[(0, c)] + ma[(r, 1)] * mb[(1, c)] + ma[(r, 2)] * mb[(2, c)];
            if !b_affine {
                sum += ma[(r, 3)] * mb[(3, c)];
            } else if c == 3 {
                sum += ma[(r, 3)];
            }
            product[(r, c)] = sum;
        }
    }
    if a_affine && !b_affine {
        product.set_row(3, &mb.row(3));
    }
    if !(a_affine && b_affine) {
        return (product, Cache::default());
    }

    let congruence = match (a.cached().congruence, b.cached().congruence) {
        (Some((true, rigid_a)), Some((true, rigid_b))) => Some((true, rigid_a && rigid_b)),
        _ => None,
    };
    let cache = Cache {
        affine: Some(true),
        congruence,
        ..Cache::default()
    };
    (product, cache)
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::identity()
    }
}

impl PartialEq for Transform3D {
    fn eq(&self, other: &Self) -> bool {
        self.matrix == other.matrix
    }
}

impl fmt::Display for Transform3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..4 {
            writeln!(
                f,
                "{}, {}, {}, {}",
                self.matrix[(r, 0)],
                self.matrix[(r, 1)],
                self.matrix[(r, 2)],
                self.matrix[(r, 3)]
            )?;
        }
        Ok(())
    }
}

impl std::ops::Mul<&Transform3D> for &Transform3D {
    type Output = Transform3D;

    fn mul(self, rhs: &Transform3D) -> Self::Output {
        let mut product = self.clone();
        product.multiply(rhs);
        product
    }
}

impl std::ops::Mul for Transform3D {
    type Output = Self;

    fn mul(mut self, rhs: Self) -> Self::Output {
        self.multiply(&rhs);
        self
    }
}

impl std::ops::MulAssign<&Transform3D> for Transform3D {
    fn mul_assign(&mut self, rhs: &Transform3D) {
        self.multiply(rhs);
    }
}

impl std::ops::Add<&Transform3D> for &Transform3D {
    type Output = Transform3D;

    fn add(self, rhs: &Transform3D) -> Self::Output {
        let mut sum = self.clone();
        Transform3D::add(&mut sum, rhs);
        sum
    }
}

impl std::ops::Sub<&Transform3D> for &Transform3D {
    type Output = Transform3D;

    fn sub(self, rhs: &Transform3D) -> Self::Output {
        let mut difference = self.clone();
        Transform3D::sub(&mut difference, rhs);
        difference
    }
}

impl From<Matrix4<f64>> for Transform3D {
    fn from(matrix: Matrix4<f64>) -> Self {
        Self::with_matrix(matrix)
    }
}

impl From<Matrix4<f32>> for Transform3D {
    fn from(matrix: Matrix4<f32>) -> Self {
        Self::with_matrix(matrix.cast::<f64>())
    }
}

impl From<Isometry3<f64>> for Transform3D {
    fn from(isometry: Isometry3<f64>) -> Self {
        Self::with_matrix(isometry.to_homogeneous())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> Transform3D {
        Transform3D::from_row_array([
            2.0, 1.0, 0.0, 3.0, //
            0.0, 1.0, 4.0, -1.0, //
            1.0, 0.0, 1.0, 2.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    #[test]
    fn test_row_array_round_trip() {
        let t = sample();
        assert_eq!(t.element(0, 3), 3.0);
        assert_eq!(t.element(1, 2), 4.0);
        assert_eq!(Transform3D::from_row_array(t.to_row_array()), t);
    }

    #[test]
    fn test_from_row_slice_rejects_wrong_length() {
        assert!(matches!(
            Transform3D::from_row_slice(&[1.0; 9]),
            Err(Error::InvalidData(_))
        ));
        assert!(Transform3D::from_row_slice(&[0.0; 16]).is_ok());
    }

    #[test]
    fn test_affine_inverse() {
        let t = sample();
        let inverse = t.inverse().unwrap();
        let product = &t * &inverse;
        assert!(product.epsilon_equals(&Transform3D::identity(), 1e-12));
    }

    #[test]
    fn test_general_inverse_of_projective_matrix() {
        let t = Transform3D::from_row_array([
            1.0, 0.0, 0.0, 0.0, //
            0.0, 2.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 1.0, //
            0.0, 0.0, 1.0, 0.0,
        ]);
        assert!(!t.is_affine());
        let inverse = t.inverse().unwrap();
        let product = &inverse * &t;
        assert!(product.epsilon_equals(&Transform3D::identity(), 1e-12));
    }

    #[test]
    fn test_invert_zero_row_is_singular() {
        let mut t = Transform3D::from_row_array([
            1.0, 2.0, 3.0, 4.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]);
        let before = t.clone();
        assert_eq!(t.invert(), Err(Error::SingularMatrix));
        assert_eq!(t, before);
    }

    #[test]
    fn test_invert_non_affine_zero_row_is_singular() {
        let t = Transform3D::from_row_array([
            1.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 1.0, 0.0,
        ]);
        assert_eq!(t.inverse(), Err(Error::SingularMatrix));
    }

    #[test]
    fn test_determinant_general_matches_nalgebra() {
        let t = Transform3D::from_row_array([
            1.0, 2.0, 0.0, 1.0, //
            0.0, 1.0, 3.0, 0.0, //
            2.0, 0.0, 1.0, 4.0, //
            1.0, 1.0, 0.0, 2.0,
        ]);
        assert_relative_eq!(t.determinant(), t.matrix().determinant(), epsilon = 1e-9);
    }

    #[test]
    fn test_affine_product_fixes_last_row() {
        let a = sample();
        let b = Transform3D::from_translation(&Vector3::new(1.0, 2.0, 3.0));
        let product = &a * &b;
        assert_relative_eq!(product.matrix(), a.matrix() * b.matrix(), epsilon = 1e-12);
        assert_eq!(product.cached().affine, Some(true));
    }

    #[test]
    fn test_rigid_product_keeps_congruence() {
        let a = Transform3D::from_translation(&Vector3::new(1.0, 0.0, 0.0));
        let b = Transform3D::from_translation(&Vector3::new(0.0, 1.0, 0.0));
        assert!(a.is_rigid() && b.is_rigid());
        let product = &a * &b;
        assert_eq!(product.cached().congruence, Some((true, true)));
    }

    #[test]
    fn test_set_translation_keeps_rotation_cache() {
        let mut t = Transform3D::from_scale(2.0);
        let _ = t.rotation();
        assert!(t.cached().rotation.is_some());
        t.set_translation(&Vector3::new(1.0, 2.0, 3.0));
        assert!(t.cached().rotation.is_some());
        assert!(t.cached().kind.is_none());
        assert_eq!(t.translation(), Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_mutation_drops_cache() {
        let mut t = sample();
        let _ = t.transform_type();
        assert!(t.cached().kind.is_some());
        t.add_scalar(1.0);
        assert!(t.cached().kind.is_none());
        assert!(t.cached().affine.is_none());
    }

    #[test]
    fn test_transform_point_and_vector() {
        let t = sample();
        let p = t.transform_point(&Point3::new(1.0, 1.0, 1.0));
        assert_eq!(p, Point3::new(6.0, 4.0, 4.0));
        let v = t.transform_vector(&Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(v, Vector3::new(3.0, 5.0, 2.0));
        let h = t.transform_vector4(&Vector4::new(1.0, 1.0, 1.0, 1.0));
        assert_eq!(h, Vector4::new(6.0, 4.0, 4.0, 1.0));
    }

    #[test]
    fn test_transform_point_divides_by_w() {
        let t = Transform3D::from_row_array([
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 2.0,
        ]);
        let p = t.transform_point(&Point3::new(2.0, 4.0, 6.0));
        assert_relative_eq!(p, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_transpose_twice_is_identity_operation() {
        let t = sample();
        let mut u = t.transposed();
        assert_eq!(u.element(3, 0), 3.0);
        u.transpose();
        assert_eq!(u, t);
    }

    #[test]
    fn test_mul_transpose_variants() {
        let a = sample();
        let b = Transform3D::from_row_array([
            1.0, 2.0, 3.0, 4.0, //
            5.0, 6.0, 7.0, 8.0, //
            9.0, 1.0, 2.0, 3.0, //
            4.0, 5.0, 6.0, 7.0,
        ]);
        let mut t = Transform3D::identity();

        t.mul_transpose_left(&a, &b);
        assert_relative_eq!(t.matrix(), a.matrix().transpose() * b.matrix());
        t.mul_transpose_right(&a, &b);
        assert_relative_eq!(t.matrix(), a.matrix() * b.matrix().transpose());
        t.mul_transpose_both(&a, &b);
        assert_relative_eq!(t.matrix(), a.matrix().transpose() * b.matrix().transpose());
    }

    #[test]
    fn test_mul_inverse() {
        let a = sample();
        let mut t = a.clone();
        t.mul_inverse(&a).unwrap();
        assert!(t.epsilon_equals(&Transform3D::identity(), 1e-12));
    }

    #[test]
    fn test_scalar_arithmetic() {
        let mut t = Transform3D::identity();
        t.mul_scalar(3.0);
        assert_eq!(t.element(0, 0), 3.0);
        t.add_scalar(1.0);
        assert_eq!(t.element(0, 1), 1.0);
        assert_eq!(t.element(3, 3), 4.0);

        let mut s = Transform3D::identity();
        s.scale_add(2.0, &Transform3D::identity());
        assert_eq!(s.element(1, 1), 3.0);
        assert_eq!(s.element(1, 0), 0.0);
    }

    #[test]
    fn test_add_sub_operators() {
        let a = sample();
        let b = Transform3D::identity();
        let sum = &a + &b;
        assert_eq!(sum.element(0, 0), 3.0);
        let back = &sum - &b;
        assert_eq!(back, a);
    }

    #[test]
    fn test_epsilon_equals() {
        let a = Transform3D::identity();
        let mut b = Transform3D::identity();
        b.set_translation(&Vector3::new(0.0, 1e-7, 0.0));
        assert!(a.epsilon_equals(&b, 1e-6));
        assert!(!a.epsilon_equals(&b, 1e-8));
        assert_ne!(a, b);
    }

    #[test]
    fn test_product_with_one_affine_operand() {
        let affine = sample();
        let projective = Transform3D::from_row_array([
            1.0, 0.5, 0.0, 2.0, //
            0.0, 2.0, 1.0, 0.0, //
            0.3, 0.0, 1.0, -1.0, //
            0.1, 0.2, -0.4, 1.5,
        ]);
        assert!(affine.is_affine());
        assert!(!projective.is_affine());

        let left = &affine * &projective;
        assert_relative_eq!(left.matrix(), affine.matrix() * projective.matrix(), epsilon = 1e-12);
        assert!(!left.is_affine());

        let right = &projective * &affine;
        assert_relative_eq!(right.matrix(), projective.matrix() * affine.matrix(), epsilon = 1e-12);
        assert!(!right.is_affine());

        let mut both = projective.clone();
        both.set_product(&projective, &projective);
        assert_relative_eq!(both.matrix(), projective.matrix() * projective.matrix(), epsilon = 1e-12);
    }

    #[test]
    fn test_display_prints_four_rows() {
        let text = Transform3D::identity().to_string();
        assert_eq!(text.lines().count(), 4);
        assert_eq!(text.lines().next(), Some("1, 0, 0, 0"));
    }

    #[test]
    fn test_f32_conversions() {
        let t = Transform3D::from_row_array_f32([
            1.0, 0.0, 0.0, 0.5, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]);
        assert_eq!(t.translation(), Vector3::new(0.5, 0.0, 0.0));
        assert_eq!(t.to_row_array_f32()[3], 0.5);
        let from_f32: Transform3D = Matrix4::<f32>::identity().into();
        assert_eq!(from_f32, Transform3D::identity());
    }
}
