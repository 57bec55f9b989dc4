//! 4x4 LU decomposition (Crout's method with implicit row scaling and partial pivoting)
//!
//! Matrices are row-major `[f64; 16]`. The decomposition overwrites its input
//! with `L` (unit diagonal, below) and `U` (on and above the diagonal).

use crate::error::{Error, Result};

const N: usize = 4;

#[inline]
fn at(i: usize, j: usize) -> usize {
    i * N + j
}

/// Decompose `matrix` in place, returning the row permutation
///
/// Fails with [`Error::SingularMatrix`] when a row is entirely zero or a
/// pivot vanishes.
pub fn decompose(matrix: &mut [f64; 16]) -> Result<[usize; 4]> {
    let mut row_scale = [0.0; N];
    for (i, scale) in row_scale.iter_mut().enumerate() {
        let big = (0..N).map(|j| matrix[at(i, j)].abs()).fold(0.0, f64::max);
        if big == 0.0 {
            return Err(Error::SingularMatrix);
        }
        *scale = 1.0 / big;
    }

    let mut permutation = [0usize; N];
    for j in 0..N {
        for i in 0..j {
            let mut sum = matrix[at(i, j)];
            for k in 0..i {
                sum -= matrix[at(i, k)] * matrix[at(k, j)];
            }
            matrix[at(i, j)] = sum;
        }

        let mut big = 0.0;
        let mut pivot = j;
        for i in j..N {
            let mut sum = matrix[at(i, j)];
            for k in 0..j {
                sum -= matrix[at(i, k)] * matrix[at(k, j)];
            }
            matrix[at(i, j)] = sum;

            let figure = row_scale[i] * sum.abs();
            if figure >= big {
                big = figure;
                pivot = i;
            }
        }

        if pivot != j {
            for k in 0..N {
                matrix.swap(at(pivot, k), at(j, k));
            }
            row_scale[pivot] = row_scale[j];
        }
        permutation[j] = pivot;

        if matrix[at(j, j)] == 0.0 {
            return Err(Error::SingularMatrix);
        }

        if j != N - 1 {
            let inverse_pivot = 1.0 / matrix[at(j, j)];
            for i in (j + 1)..N {
                matrix[at(i, j)] *= inverse_pivot;
            }
        }
    }
    Ok(permutation)
}

/// Solve `A x = b` in place given the output of [`decompose`]
pub fn back_substitute(lu: &[f64; 16], permutation: &[usize; 4], b: &mut [f64; 4]) {
    // Forward substitution, skipping leading zeros of b
    let mut first_nonzero: Option<usize> = None;
    for i in 0..N {
        let row = permutation[i];
        let mut sum = b[row];
        b[row] = b[i];
        if let Some(start) = first_nonzero {
            for j in start..i {
                sum -= lu[at(i, j)] * b[j];
            }
        } else if sum != 0.0 {
            first_nonzero = Some(i);
        }
        b[i] = sum;
    }

    for i in (0..N).rev() {
        let mut sum = b[i];
        for j in (i + 1)..N {
            sum -= lu[at(i, j)] * b[j];
        }
        b[i] = sum / lu[at(i, i)];
    }
}
