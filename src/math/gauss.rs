//! In-place Gaussian elimination for the LM normal equations.
//!
//! The system is tiny (one row per model parameter) and is rebuilt every
//! iteration, so we solve it directly over the Hessian and gradient buffers:
//!
//! - forward elimination without pivoting
//! - back substitution, writing the solution into the right-hand side
//!
//! A zero pivot does not abort the solve. Its row is skipped during
//! elimination and its unknown is set to `0`, so that direction is simply
//! not updated. The LM damping term usually keeps the diagonal away from zero.

use nalgebra::{DMatrix, DVector};

/// Solve `a * x = b`, overwriting `b` with `x`. `a` is destroyed.
///
/// Returns the number of zero pivots encountered.
///
/// # Panics
/// Panics if `a` is not square or its size differs from `b`.
pub fn solve_in_place(a: &mut DMatrix<f64>, b: &mut DVector<f64>) -> usize {
    let n = b.len();
    assert!(
        a.nrows() == n && a.ncols() == n,
        "solve_in_place: {}x{} matrix vs rhs of {}",
        a.nrows(),
        a.ncols(),
        n
    );

    for k in 0..n {
        let pivot = a[(k, k)];
        if pivot == 0.0 {
            continue;
        }
        for row in (k + 1)..n {
            let factor = a[(row, k)] / pivot;
            if factor == 0.0 {
                continue;
            }
            for col in k..n {
                let upper = a[(k, col)];
                a[(row, col)] -= factor * upper;
            }
            let rhs = b[k];
            b[row] -= factor * rhs;
        }
    }

    let mut zero_pivots = 0;
    for k in (0..n).rev() {
        let pivot = a[(k, k)];
        if pivot == 0.0 {
            b[k] = 0.0;
            zero_pivots += 1;
            continue;
        }
        let mut acc = b[k];
        for col in (k + 1)..n {
            acc -= a[(k, col)] * b[col];
        }
        b[k] = acc / pivot;
    }
    zero_pivots
}
