//! Core traits for scenecrate

use nalgebra::{Point3, Vector3, Vector4};

use crate::transform::Transform3D;

/// Trait for objects that can be transformed
pub trait Transformable {
    /// Apply a transformation to the object
    fn transform(&mut self, transform: &Transform3D);
}

/// Points get the full transform, including translation and the
/// perspective divide
impl Transformable for Point3<f64> {
    fn transform(&mut self, transform: &Transform3D) {
        transform.transform_point_in_place(self);
    }
}

/// Vectors are directions: no translation
impl Transformable for Vector3<f64> {
    fn transform(&mut self, transform: &Transform3D) {
        transform.transform_vector_in_place(self);
    }
}

impl Transformable for Vector4<f64> {
    fn transform(&mut self, transform: &Transform3D) {
        transform.transform_vector4_in_place(self);
    }
}

impl Transformable for Point3<f32> {
    fn transform(&mut self, transform: &Transform3D) {
        *self = transform.transform_point(&self.cast::<f64>()).cast::<f32>();
    }
}

impl Transformable for Vector3<f32> {
    fn transform(&mut self, transform: &Transform3D) {
        *self = transform.transform_vector(&self.cast::<f64>()).cast::<f32>();
    }
}

impl Transformable for Vector4<f32> {
    fn transform(&mut self, transform: &Transform3D) {
        *self = transform.transform_vector4(&self.cast::<f64>()).cast::<f32>();
    }
}

impl<T: Transformable> Transformable for [T] {
    fn transform(&mut self, transform: &Transform3D) {
        for item in self.iter_mut() {
            item.transform(transform);
        }
    }
}

impl<T: Transformable> Transformable for Vec<T> {
    fn transform(&mut self, transform: &Transform3D) {
        self.as_mut_slice().transform(transform);
    }
}

impl Transformable for Transform3D {
    /// Pre-multiply: `self = transform * self`
    fn transform(&mut self, transform: &Transform3D) {
        let mut product = Transform3D::identity();
        product.set_product(transform, self);
        self.set(&product);
    }
}
