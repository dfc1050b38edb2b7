//! Numeric Primitive Layer
//!
//! The factorization kernel drives the elimination through five dense
//! block operations: pivot factorization, the paired triangular solve, a
//! triangle-restricted symmetric update, and general multiply with and
//! without a transposed first operand. [`DenseKernel`] is the capability
//! interface for those operations; any backend exposing these shapes can
//! be substituted without touching the kernel. [`NativeKernel`] is the
//! always-available pure-Rust implementation.
//!
//! All operations are pure functions over the value buffer and the block
//! descriptors passed in: no hidden state, no retries. The only failure
//! mode is a pivot block that is not positive definite within tolerance,
//! surfaced as [`PivotFailure`] and propagated by the kernel. Destination
//! tiles must not overlap source tiles (block descriptors produced by the
//! assembly helpers never do); `a` and `b` may be the same tile.
//!
//! Orientation conventions (fixed across the crate):
//! - pivot blocks store the upper-triangular factor `R` with `Rᵀ·R = A`;
//!   the strict lower triangle of a pivot tile is never referenced,
//! - coupling panels are stored in block-row orientation `n_p × n_i`, so
//!   every propagation product has the transposed-first-operand shape.

use crate::block::Block;

/// Reduced diagonal entry below this is treated as a failed pivot.
const PIVOT_TOL: f64 = 1e-14;

/// A pivot block failed factorization at the given local column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PivotFailure {
    /// Column within the pivot block whose reduced diagonal was not
    /// positive within tolerance
    pub column: usize,
}

/// Capability interface over the dense block operations the kernel needs.
///
/// Implementations are injected into the kernel (see
/// [`crate::factorize::factorize_with`]); the shipped backend is
/// [`NativeKernel`]. A BLAS/LAPACK-backed implementation would map
/// `factorize_pivot` to `dpotrf`, `solve_pivot` to `dtrsm`, and the
/// updates to `gemmt`/`gemm`.
pub trait DenseKernel {
    /// In-place Cholesky factorization of the symmetric pivot tile `r`:
    /// on success the upper triangle holds `R` with `Rᵀ·R` equal to the
    /// original tile. Fails if a reduced diagonal entry is not positive
    /// within tolerance.
    fn factorize_pivot(&self, vals: &mut [f64], r: Block) -> Result<(), PivotFailure>;

    /// Triangular solve with an already-factorized pivot:
    /// `X := R⁻ᵀ · X`. Calling this before `factorize_pivot` on `r` is a
    /// contract violation; the kernel enforces the ordering.
    fn solve_pivot(&self, vals: &mut [f64], x: Block, r: Block);

    /// Symmetric update restricted to the upper triangle:
    /// `C := alpha · Aᵀ·B + beta · C`, touching only entries `(i, j)`
    /// with `i <= j`. Destinations must not yet be finalized pivots.
    fn symmetric_update(&self, vals: &mut [f64], c: Block, alpha: f64, a: Block, b: Block, beta: f64);

    /// General update with transposed first operand:
    /// `C := alpha · Aᵀ·B + beta · C`.
    fn gemm_t(&self, vals: &mut [f64], c: Block, alpha: f64, a: Block, b: Block, beta: f64);

    /// General update: `C := alpha · A·B + beta · C`.
    fn gemm(&self, vals: &mut [f64], c: Block, alpha: f64, a: Block, b: Block, beta: f64);
}

/// Pure-Rust dense backend. Straightforward triple loops over the tiles;
/// block sizes in this engine are small enough that this is competitive,
/// and it is always available without linking an external BLAS.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeKernel;

impl NativeKernel {
    pub fn new() -> Self {
        Self
    }
}

impl DenseKernel for NativeKernel {
    fn factorize_pivot(&self, vals: &mut [f64], r: Block) -> Result<(), PivotFailure> {
        debug_assert!(r.is_square());
        let n = r.nrows;

        for k in 0..n {
            let mut d = vals[r.at(k, k)];
            for m in 0..k {
                let v = vals[r.at(m, k)];
                d -= v * v;
            }
            if d <= PIVOT_TOL {
                return Err(PivotFailure { column: k });
            }
            let d = d.sqrt();
            vals[r.at(k, k)] = d;

            for j in (k + 1)..n {
                let mut s = vals[r.at(k, j)];
                for m in 0..k {
                    s -= vals[r.at(m, k)] * vals[r.at(m, j)];
                }
                vals[r.at(k, j)] = s / d;
            }
        }

        Ok(())
    }

    fn solve_pivot(&self, vals: &mut [f64], x: Block, r: Block) {
        debug_assert!(r.is_square());
        debug_assert_eq!(x.nrows, r.nrows);
        let n = r.nrows;
        let m = x.ncols;

        // Forward substitution with Rᵀ (lower triangular), one column of
        // X at a time.
        for k in 0..n {
            let diag = vals[r.at(k, k)];
            for c in 0..m {
                let mut s = vals[x.at(k, c)];
                for i in 0..k {
                    s -= vals[r.at(i, k)] * vals[x.at(i, c)];
                }
                vals[x.at(k, c)] = s / diag;
            }
        }
    }

    fn symmetric_update(&self, vals: &mut [f64], c: Block, alpha: f64, a: Block, b: Block, beta: f64) {
        debug_assert!(c.is_square());
        debug_assert_eq!(a.nrows, b.nrows);
        debug_assert_eq!(a.ncols, c.nrows);
        debug_assert_eq!(b.ncols, c.ncols);
        let n = c.nrows;
        let p = a.nrows;

        for i in 0..n {
            for j in i..n {
                let mut s = 0.0;
                for m in 0..p {
                    s += vals[a.at(m, i)] * vals[b.at(m, j)];
                }
                let idx = c.at(i, j);
                vals[idx] = alpha * s + beta * vals[idx];
            }
        }
    }

    fn gemm_t(&self, vals: &mut [f64], c: Block, alpha: f64, a: Block, b: Block, beta: f64) {
        debug_assert_eq!(a.nrows, b.nrows);
        debug_assert_eq!(a.ncols, c.nrows);
        debug_assert_eq!(b.ncols, c.ncols);
        let p = a.nrows;

        for i in 0..c.nrows {
            for j in 0..c.ncols {
                let mut s = 0.0;
                for m in 0..p {
                    s += vals[a.at(m, i)] * vals[b.at(m, j)];
                }
                let idx = c.at(i, j);
                vals[idx] = alpha * s + beta * vals[idx];
            }
        }
    }

    fn gemm(&self, vals: &mut [f64], c: Block, alpha: f64, a: Block, b: Block, beta: f64) {
        debug_assert_eq!(a.ncols, b.nrows);
        debug_assert_eq!(a.nrows, c.nrows);
        debug_assert_eq!(b.ncols, c.ncols);
        let p = a.ncols;

        for i in 0..c.nrows {
            for j in 0..c.ncols {
                let mut s = 0.0;
                for m in 0..p {
                    s += vals[a.at(i, m)] * vals[b.at(m, j)];
                }
                let idx = c.at(i, j);
                vals[idx] = alpha * s + beta * vals[idx];
            }
        }
    }
}
