//! Core transform type for scenecrate
//!
//! [`Transform3D`] is a 4x4 homogeneous matrix that classifies itself lazily
//! (identity, scale, translation, rigid, congruent, affine, ...) and splits
//! into rotation, per-axis scale and translation on demand, falling back to a
//! specialized 3x3 SVD when the matrix carries shear.

pub mod error;
pub mod tolerance;
pub mod transform_type;
pub mod transform;
pub mod svd;
pub mod lu;
pub mod shared;
pub mod traits;
pub mod types;

mod classify;
mod decompose;
mod projection;
mod rotation;

pub use error::*;
pub use shared::*;
pub use traits::*;
pub use transform::*;
pub use transform_type::*;
pub use types::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Isometry3, Matrix3, Matrix4, Point3, UnitQuaternion, Vector3, Vector4};
