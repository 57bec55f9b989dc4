//! Type aliases for the nalgebra types used throughout the transform API

use nalgebra::{Matrix3, Matrix4, Point3, UnitQuaternion, Vector3, Vector4};

/// A 3D point with double precision coordinates
pub type Point3d = Point3<f64>;

/// A 3D point with single precision coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// A 3D vector with single precision components
pub type Vector3f = Vector3<f32>;

/// A homogeneous 4-vector with double precision components
pub type Vector4d = Vector4<f64>;

/// A homogeneous 4-vector with single precision components
pub type Vector4f = Vector4<f32>;

/// A 3x3 double precision matrix (rotation, scale or raw upper block)
pub type Matrix3d = Matrix3<f64>;

/// A 4x4 double precision homogeneous matrix
pub type Matrix4d = Matrix4<f64>;

/// A double precision unit quaternion
pub type UnitQuaterniond = UnitQuaternion<f64>;
