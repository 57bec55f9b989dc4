//! Singular value decomposition specialized for 3x3 matrices
//!
//! The input is reduced to upper bidiagonal form with four Givens rotations,
//! then driven towards diagonal form with implicit-shift QR sweeps
//! (Golub-Kahan). Once one super-diagonal element is negligible the remaining
//! 2x2 block is diagonalized in closed form. Left rotations accumulate into
//! `U` and right rotations into `V`, so `A = U · B · Vᵀ` holds after every
//! step.
//!
//! [`polar_decompose`] recombines the factors into a rotation and a per-axis
//! scale for the transform decomposition.

use log::debug;
use nalgebra::{Matrix3, Vector3};

use crate::tolerance::{almost_equal, almost_one, EPS};

/// Upper bound on implicit-shift QR sweeps
pub const MAX_SWEEPS: usize = 10;

/// A super-diagonal element below this (relative to its neighbours) is zero
pub const CONVERGE_TOL: f64 = 4.89e-15;

/// Safe-scaling bounds for the hypotenuse in [`compute_rot`]
pub const SAFMIN2: f64 = 2.002_083_095_183_101e-146;
pub const SAFMAX2: f64 = 4.994_797_680_505_588e145;

/// Row-major 3x3 matrix
pub type Mat3 = [[f64; 3]; 3];

const IDENTITY: Mat3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// `A = U · diag(sigma) · Vᵀ`; `U` and `V` are proper rotations, `sigma` may
/// carry signs
#[derive(Debug, Clone, Copy)]
pub struct Svd3 {
    pub u: Mat3,
    pub sigma: [f64; 3],
    pub v: Mat3,
    pub converged: bool,
}

/// Plane rotation `(c, s, r)` with `c·f + s·g = r` and `-s·f + c·g = 0`
///
/// The hypotenuse is computed on rescaled operands when they are close to
/// overflow or underflow.
pub fn compute_rot(f: f64, g: f64) -> (f64, f64, f64) {
    if g == 0.0 {
        return (1.0, 0.0, f);
    }
    if f == 0.0 {
        return (0.0, 1.0, g);
    }

    let (mut f1, mut g1) = (f, g);
    let mut scale = f1.abs().max(g1.abs());
    let mut count = 0;
    if scale >= SAFMAX2 {
        while scale >= SAFMAX2 && count < 20 {
            f1 *= SAFMIN2;
            g1 *= SAFMIN2;
            scale = f1.abs().max(g1.abs());
            count += 1;
        }
        let r = (f1 * f1 + g1 * g1).sqrt();
        (f1 / r, g1 / r, r * SAFMAX2.powi(count))
    } else if scale <= SAFMIN2 {
        while scale <= SAFMIN2 && count < 20 {
            f1 *= SAFMAX2;
            g1 *= SAFMAX2;
            scale = f1.abs().max(g1.abs());
            count += 1;
        }
        let r = (f1 * f1 + g1 * g1).sqrt();
        (f1 / r, g1 / r, r * SAFMIN2.powi(count))
    } else {
        let r = (f * f + g * g).sqrt();
        (f / r, g / r, r)
    }
}

/// Smaller singular value of the upper triangular `[[f, g], [0, h]]`
pub fn compute_shift(f: f64, g: f64, h: f64) -> f64 {
    let (fa, ga, ha) = (f.abs(), g.abs(), h.abs());
    let fhmn = fa.min(ha);
    let fhmx = fa.max(ha);
    if fhmn == 0.0 {
        return 0.0;
    }

    if ga < fhmx {
        let as_ = 1.0 + fhmn / fhmx;
        let at = (fhmx - fhmn) / fhmx;
        let au = (ga / fhmx).powi(2);
        let c = 2.0 / ((as_ * as_ + au).sqrt() + (at * at + au).sqrt());
        fhmn * c
    } else {
        let au = fhmx / ga;
        if au == 0.0 {
            // g dwarfs f and h
            (fhmn * fhmx) / ga
        } else {
            let as_ = 1.0 + fhmn / fhmx;
            let at = (fhmx - fhmn) / fhmx;
            let c = 1.0
                / ((1.0 + (as_ * au).powi(2)).sqrt() + (1.0 + (at * au).powi(2)).sqrt());
            2.0 * (fhmn * c) * au
        }
    }
}

fn rotate_rows(m: &mut Mat3, i: usize, j: usize, c: f64, s: f64) {
    for k in 0..3 {
        let (a, b) = (m[i][k], m[j][k]);
        m[i][k] = c * a + s * b;
        m[j][k] = -s * a + c * b;
    }
}

fn rotate_cols(m: &mut Mat3, i: usize, j: usize, c: f64, s: f64) {
    for row in m.iter_mut() {
        let (a, b) = (row[i], row[j]);
        row[i] = c * a + s * b;
        row[j] = -s * a + c * b;
    }
}

/// `A = U · B · Vᵀ` while `B` is reduced
struct Factorization {
    b: Mat3,
    u: Mat3,
    v: Mat3,
}

impl Factorization {
    fn left(&mut self, i: usize, j: usize, c: f64, s: f64) {
        rotate_rows(&mut self.b, i, j, c, s);
        rotate_cols(&mut self.u, i, j, c, s);
    }

    fn right(&mut self, i: usize, j: usize, c: f64, s: f64) {
        rotate_cols(&mut self.b, i, j, c, s);
        rotate_cols(&mut self.v, i, j, c, s);
    }

    /// Zero `b[j][k]` against `b[i][k]` by mixing rows `i` and `j`
    fn zero_below(&mut self, i: usize, j: usize, k: usize) {
        let (c, s, _) = compute_rot(self.b[i][k], self.b[j][k]);
        if s != 0.0 {
            self.left(i, j, c, s);
            self.b[j][k] = 0.0;
        }
    }

    /// Zero `b[k][j]` against `b[k][i]` by mixing columns `i` and `j`
    fn zero_right(&mut self, k: usize, i: usize, j: usize) {
        let (c, s, _) = compute_rot(self.b[k][i], self.b[k][j]);
        if s != 0.0 {
            self.right(i, j, c, s);
            self.b[k][j] = 0.0;
        }
    }

    fn bidiagonalize(&mut self) {
        self.zero_below(0, 1, 0);
        self.zero_below(0, 2, 0);
        self.zero_right(0, 1, 2);
        self.zero_below(1, 2, 1);
    }

    /// Super-diagonal element `b[i][i + 1]` is negligible
    fn split_at(&self, i: usize) -> bool {
        let e = self.b[i][i + 1].abs();
        e == 0.0 || e <= CONVERGE_TOL * (self.b[i][i].abs() + self.b[i + 1][i + 1].abs())
    }

    /// One implicit-shift QR sweep chasing the bulge down the bidiagonal
    fn qr_sweep(&mut self) {
        let d0 = self.b[0][0];
        let e0 = self.b[0][1];
        let mut shift = compute_shift(self.b[1][1], self.b[1][2], self.b[2][2]);
        if d0 != 0.0 && (shift / d0).powi(2) < EPS {
            shift = 0.0;
        }

        // First column of BᵀB - shift², scaled by 1/d0
        let f = if d0 == 0.0 {
            0.0
        } else {
            (d0.abs() - shift) * (d0.signum() + shift / d0)
        };
        let (c, s, _) = compute_rot(f, e0);
        self.right(0, 1, c, s);

        self.zero_below(0, 1, 0);
        self.zero_right(0, 1, 2);
        self.zero_below(1, 2, 1);
    }

    /// Diagonalize the 2x2 block at rows/columns `i`, `i + 1` in closed form
    ///
    /// The block is upper triangular and every element coupling it to the
    /// rest of `B` is zero.
    fn solve_block(&mut self, i: usize) {
        let j = i + 1;
        let (f, g, h) = (self.b[i][i], self.b[i][j], self.b[j][j]);
        if g == 0.0 {
            return;
        }

        let block = svd2x2(f, g, h);
        self.left(i, j, block.cos_left, block.sin_left);
        self.right(i, j, block.cos_right, block.sin_right);
        self.b[i][i] = block.sigma_max;
        self.b[j][j] = block.sigma_min;
        self.b[i][j] = 0.0;
        self.b[j][i] = 0.0;
    }
}

/// Closed-form SVD of `[[f, g], [0, h]]`
///
/// `[[cl, sl], [-sl, cl]] · [[f, g], [0, h]] · [[cr, -sr], [sr, cr]]`
/// equals `diag(sigma_max, sigma_min)`, with `|sigma_max| >= |sigma_min|`.
#[derive(Debug, Clone, Copy)]
struct Block2 {
    sigma_max: f64,
    sigma_min: f64,
    cos_left: f64,
    sin_left: f64,
    cos_right: f64,
    sin_right: f64,
}

/// `|a|` carrying the sign of `b`
fn with_sign(a: f64, b: f64) -> f64 {
    if b >= 0.0 {
        a.abs()
    } else {
        -a.abs()
    }
}

fn svd2x2(f: f64, g: f64, h: f64) -> Block2 {
    let (mut ft, mut ht) = (f, h);
    let (mut fa, mut ha) = (f.abs(), h.abs());

    // `pivot` marks the largest entry: 1 for f, 2 for g, 3 for h
    let mut pivot = 1;
    let swap = ha > fa;
    if swap {
        pivot = 3;
        std::mem::swap(&mut ft, &mut ht);
        std::mem::swap(&mut fa, &mut ha);
    }

    let (gt, ga) = (g, g.abs());
    let (mut sigma_max, mut sigma_min) = (fa, ha);
    let (mut clt, mut slt, mut crt, mut srt) = (1.0, 0.0, 1.0, 0.0);
    if ga != 0.0 {
        let mut g_small = true;
        if ga > fa {
            pivot = 2;
            if fa / ga < EPS {
                // g dwarfs f and h
                g_small = false;
                sigma_max = ga;
                sigma_min = if ha > 1.0 {
                    fa / (ga / ha)
                } else {
                    (fa / ga) * ha
                };
                clt = 1.0;
                slt = ht / gt;
                srt = 1.0;
                crt = ft / gt;
            }
        }
        if g_small {
            let d = fa - ha;
            let l = if d == fa { 1.0 } else { d / fa };
            let m = gt / ft;
            let mut t = 2.0 - l;
            let mm = m * m;
            let tt = t * t;
            let s = (tt + mm).sqrt();
            let r = if l == 0.0 { m.abs() } else { (l * l + mm).sqrt() };
            let a = 0.5 * (s + r);
            sigma_min = ha / a;
            sigma_max = fa * a;

            t = if mm == 0.0 {
                if l == 0.0 {
                    with_sign(2.0, ft) * with_sign(1.0, gt)
                } else {
                    gt / with_sign(d, ft) + m / t
                }
            } else {
                (m / (s + t) + m / (r + l)) * (1.0 + a)
            };
            let l = (t * t + 4.0).sqrt();
            crt = 2.0 / l;
            srt = t / l;
            clt = (crt + srt * m) / a;
            slt = (ht / ft) * srt / a;
        }
    }

    let (cos_left, sin_left, cos_right, sin_right) = if swap {
        (srt, crt, slt, clt)
    } else {
        (clt, slt, crt, srt)
    };

    let sign = match pivot {
        1 => with_sign(1.0, cos_right) * with_sign(1.0, cos_left) * with_sign(1.0, f),
        2 => with_sign(1.0, sin_right) * with_sign(1.0, cos_left) * with_sign(1.0, g),
        _ => with_sign(1.0, sin_right) * with_sign(1.0, sin_left) * with_sign(1.0, h),
    };
    Block2 {
        sigma_max: with_sign(sigma_max, sign),
        sigma_min: with_sign(sigma_min, sign * with_sign(1.0, f) * with_sign(1.0, h)),
        cos_left,
        sin_left,
        cos_right,
        sin_right,
    }
}

/// Singular value decomposition of a row-major 3x3 matrix
pub fn svd3(a: &Mat3) -> Svd3 {
    let mut work = Factorization {
        b: *a,
        u: IDENTITY,
        v: IDENTITY,
    };
    work.bidiagonalize();

    let mut sweeps = 0;
    while sweeps < MAX_SWEEPS && !work.split_at(0) && !work.split_at(1) {
        work.qr_sweep();
        sweeps += 1;
    }

    let converged = work.split_at(0) || work.split_at(1);
    if !converged {
        debug!(
            "3x3 SVD did not converge after {} sweeps (e0 = {:e}, e1 = {:e})",
            MAX_SWEEPS, work.b[0][1], work.b[1][2]
        );
    }

    // Drop the smaller super-diagonal element and finish the other block
    // analytically
    let drop_lower = if work.split_at(0) {
        false
    } else {
        work.split_at(1) || work.b[1][2].abs() <= work.b[0][1].abs()
    };
    let (split, block) = if drop_lower { (1, 0) } else { (0, 1) };
    work.b[split][split + 1] = 0.0;
    if !work.split_at(block) {
        work.solve_block(block);
    }
    work.b[block][block + 1] = 0.0;

    Svd3 {
        u: work.u,
        sigma: [work.b[0][0], work.b[1][1], work.b[2][2]],
        v: work.v,
        converged,
    }
}

/// Indices ordered by descending value; ties keep the lower index first
fn rank_descending(values: &[f64; 3]) -> [usize; 3] {
    let mut order = [0, 1, 2];
    order.sort_by(|&a, &b| {
        values[b]
            .partial_cmp(&values[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order
}

/// Split `a` into a rotation and per-axis non-negative scale with
/// `a ≈ rotation · diag(scale)`
///
/// The rotation is the orthogonal polar factor `U · Vᵀ` (signs of negative
/// singular values folded into `V`). Scale components are assigned to axes
/// by rank: the column of `a` with the largest magnitude receives the largest
/// singular value, and so on.
pub fn polar_decompose(a: &Matrix3<f64>) -> (Matrix3<f64>, Vector3<f64>) {
    if a.iter().any(|element| !element.is_finite()) {
        debug!("polar decomposition of a non-finite matrix");
        let scale = Vector3::from_fn(|c, _| a.column(c).norm());
        return (Matrix3::identity(), scale);
    }

    let rows: Mat3 = std::array::from_fn(|r| std::array::from_fn(|c| a[(r, c)]));
    let svd = svd3(&rows);

    let u = Matrix3::from_fn(|r, c| svd.u[r][c]);
    let mut v = Matrix3::from_fn(|r, c| svd.v[r][c]);
    let mut sigma = svd.sigma;
    let mut negatives = 0;
    for (k, value) in sigma.iter_mut().enumerate() {
        if *value < 0.0 {
            v.column_mut(k).neg_mut();
            negatives += 1;
        }
        // Also clears the sign of -0.0
        *value = value.abs();
    }
    let rotation = u * v.transpose();

    if negatives % 2 == 0 && sigma.iter().all(|value| almost_one(*value)) {
        return (rotation, Vector3::new(1.0, 1.0, 1.0));
    }
    if almost_equal(sigma[0], sigma[1]) && almost_equal(sigma[1], sigma[2]) {
        return (rotation, Vector3::from(sigma));
    }

    let by_value = rank_descending(&sigma);
    let magnitudes: [f64; 3] = std::array::from_fn(|c| a.column(c).norm_squared());
    let by_axis = rank_descending(&magnitudes);
    let mut scale = Vector3::zeros();
    for rank in 0..3 {
        scale[by_axis[rank]] = sigma[by_value[rank]];
    }
    (rotation, scale)
}
