//! Algebraic categories a transform can belong to

use bitflags::bitflags;

bitflags! {
    /// Category lattice of a 4x4 transform.
    ///
    /// The categories are not mutually exclusive: the identity matrix belongs
    /// to every category except `ZERO` and `NEGATIVE_DETERMINANT`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TransformType: u32 {
        /// Every element is zero
        const ZERO = 0x0001;
        /// The identity matrix
        const IDENTITY = 0x0002;
        /// Uniform scale with no rotation or translation
        const SCALE = 0x0004;
        /// Translation with no rotation or scale
        const TRANSLATION = 0x0008;
        /// Pure rotation about the origin
        const ORTHOGONAL = 0x0010;
        /// Rotation and translation only
        const RIGID = 0x0020;
        /// Angle-preserving: rotation, uniform scale and translation
        const CONGRUENT = 0x0040;
        /// Last row is `[0, 0, 0, 1]`
        const AFFINE = 0x0080;
        /// Determinant is negative
        const NEGATIVE_DETERMINANT = 0x0100;
    }
}

/// Most specific first
const PRECEDENCE: [TransformType; 9] = [
    TransformType::ZERO,
    TransformType::IDENTITY,
    TransformType::SCALE,
    TransformType::TRANSLATION,
    TransformType::ORTHOGONAL,
    TransformType::RIGID,
    TransformType::CONGRUENT,
    TransformType::AFFINE,
    TransformType::NEGATIVE_DETERMINANT,
];

impl TransformType {
    /// The single most specific category in this set, or the empty set if
    /// none is present
    pub fn best(self) -> TransformType {
        PRECEDENCE
            .iter()
            .copied()
            .find(|category| self.contains(*category))
            .unwrap_or_else(TransformType::empty)
    }
}
