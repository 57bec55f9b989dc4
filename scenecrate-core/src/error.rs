//! Error types for scenecrate

use thiserror::Error;

/// Main error type for scenecrate operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The matrix has no inverse (zero determinant or a degenerate LU pivot)
    #[error("singular matrix")]
    SingularMatrix,

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for scenecrate operations
pub type Result<T> = std::result::Result<T, Error>;
