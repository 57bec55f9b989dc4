//! Lazy classification of a transform into the [`TransformType`] lattice
//!
//! Each level is cached separately and resolved in dependency order:
//! affine, then congruent/rigid and the internal column-orthogonality flag,
//! then the top-level categories, then the determinant sign. Classification
//! is an optimization hint and never fails; doubtful cases simply leave a
//! category unset.

use nalgebra::Vector3;

use crate::tolerance::{almost_equal, almost_one, almost_zero};
use crate::transform::Transform3D;
use crate::transform_type::TransformType;

impl Transform3D {
    /// Last row is `[0, 0, 0, 1]` within tolerance and no element is NaN or infinite
    pub fn is_affine(&self) -> bool {
        if let Some(affine) = self.cached().affine {
            return affine;
        }
        let m = self.raw();
        let affine = m.iter().all(|element| element.is_finite())
            && almost_zero(m[(3, 0)])
            && almost_zero(m[(3, 1)])
            && almost_zero(m[(3, 2)])
            && almost_one(m[(3, 3)]);
        self.update_cache(|cache| cache.affine = Some(affine));
        affine
    }

    /// `(congruent, rigid)`
    fn congruence(&self) -> (bool, bool) {
        if let Some(congruence) = self.cached().congruence {
            return congruence;
        }
        let congruence = if self.is_affine() {
            let m = self.raw();
            let rows: [Vector3<f64>; 3] = std::array::from_fn(|r| {
                Vector3::new(m[(r, 0)], m[(r, 1)], m[(r, 2)])
            });
            let orthogonal = almost_zero(rows[0].dot(&rows[1]))
                && almost_zero(rows[0].dot(&rows[2]))
                && almost_zero(rows[1].dot(&rows[2]));
            if orthogonal {
                // Orthogonal rows of equal length make the block a scaled rotation
                let lengths = rows.map(|row| row.norm_squared());
                let congruent =
                    almost_equal(lengths[0], lengths[1]) && almost_equal(lengths[1], lengths[2]);
                (congruent, congruent && almost_one(lengths[0]))
            } else {
                (false, false)
            }
        } else {
            (false, false)
        };
        self.update_cache(|cache| cache.congruence = Some(congruence));
        congruence
    }

    /// Rotation, uniform scale and translation only
    pub fn is_congruent(&self) -> bool {
        self.congruence().0
    }

    /// Rotation and translation only
    pub fn is_rigid(&self) -> bool {
        self.congruence().1
    }

    /// Upper 3x3 columns pairwise perpendicular, ignoring their lengths and
    /// the last row
    pub(crate) fn is_ortho(&self) -> bool {
        if let Some(ortho) = self.cached().ortho {
            return ortho;
        }
        let upper = self.rotation_scale();
        let (c0, c1, c2) = (upper.column(0), upper.column(1), upper.column(2));
        let ortho = almost_zero(c0.dot(&c1)) && almost_zero(c0.dot(&c2)) && almost_zero(c1.dot(&c2));
        self.update_cache(|cache| cache.ortho = Some(ortho));
        ortho
    }

    fn zero_translation(&self) -> bool {
        let m = self.raw();
        almost_zero(m[(0, 3)]) && almost_zero(m[(1, 3)]) && almost_zero(m[(2, 3)])
    }

    /// Every off-diagonal element of the upper 3x3 is zero
    fn zero_off_diagonal(&self) -> bool {
        let m = self.raw();
        (0..3).all(|r| (0..3).all(|c| r == c || almost_zero(m[(r, c)])))
    }

    fn positive_diagonal(&self) -> bool {
        let m = self.raw();
        m[(0, 0)] > 0.0 && m[(1, 1)] > 0.0 && m[(2, 2)] > 0.0
    }

    fn classify(&self) -> TransformType {
        let mut kind = TransformType::empty();
        let (congruent, rigid) = self.congruence();

        if self.is_affine() {
            kind |= TransformType::AFFINE;
            if congruent {
                kind |= TransformType::CONGRUENT;
                if rigid {
                    kind |= TransformType::RIGID;
                    // Diagonal of a rigid block with zero off-diagonal is +-1
                    let axis_aligned = self.zero_off_diagonal() && self.positive_diagonal();
                    if self.zero_translation() {
                        kind |= TransformType::ORTHOGONAL;
                        if axis_aligned {
                            kind |= TransformType::IDENTITY
                                | TransformType::SCALE
                                | TransformType::TRANSLATION;
                        }
                    } else if axis_aligned {
                        kind |= TransformType::TRANSLATION;
                    }
                } else if self.zero_translation() && self.zero_off_diagonal() {
                    kind |= TransformType::SCALE;
                }
            }
        } else if self.raw().iter().all(|element| almost_zero(*element)) {
            return TransformType::ZERO;
        }

        if !self.determinant_sign() {
            kind |= TransformType::NEGATIVE_DETERMINANT;
        }
        kind
    }

    /// Every category this transform currently belongs to
    pub fn transform_type(&self) -> TransformType {
        if let Some(kind) = self.cached().kind {
            return kind;
        }
        let kind = self.classify();
        self.update_cache(|cache| {
            cache.kind = Some(kind);
            #[cfg(test)]
            {
                cache.classify_runs += 1;
            }
        });
        kind
    }

    /// The single most specific category, see [`TransformType::best`]
    pub fn best_type(&self) -> TransformType {
        self.transform_type().best()
    }

    /// `true` when the determinant is non-negative
    ///
    /// A NaN determinant reports `true`.
    pub fn determinant_sign(&self) -> bool {
        let det = self.determinant();
        det.is_nan() || det >= 0.0
    }
}
