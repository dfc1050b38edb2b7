//! Factorization Entry Point
//!
//! Binds the concrete collaborator structures — pivot blocks, coupling
//! blocks, separator blocks, index sets, reordering, value buffer — and
//! forwards them into the kernel. Pure orchestration: all algorithmic
//! behavior lives in [`crate::kernel`], all numerics in
//! [`crate::numerics`].
//!
//! Validation happens here, once, up front. The kernel assumes internally
//! consistent inputs; everything a caller can get wrong (descriptors
//! outside the buffer, dimension mismatches, unsorted index sets, missing
//! coupling blocks) is rejected with a descriptive
//! [`FactorError::InvalidStructure`] before any tile is touched, so a
//! failed call never leaves a half-mutated buffer behind for structural
//! reasons. Numerical failure can of course still abort mid-run; no
//! partial result is valid in that case.

use crate::block::{DiagBlocks, SchurBlocks, UpdateBlocks};
use crate::error::FactorError;
use crate::kernel::{FactorStats, FactorizationKernel};
use crate::numerics::{DenseKernel, NativeKernel};
use crate::reorder::Reordering;
use crate::sparsity::IndexSets;

/// Factorize the block matrix in place with the native dense backend.
///
/// On success the value buffer holds the factor (and, for a partial
/// reordering, the accumulated Schur complement in the separator blocks).
/// On failure the buffer contents are unspecified and must not be used as
/// a factorization.
pub fn factorize(
    d_blocks: &DiagBlocks,
    u_blocks: &UpdateBlocks,
    s_blocks: &SchurBlocks,
    ind_sets: &IndexSets,
    reordering: &Reordering,
    vals: &mut [f64],
) -> Result<(), FactorError> {
    let backend = NativeKernel::new();
    factorize_with(&backend, d_blocks, u_blocks, s_blocks, ind_sets, reordering, vals)
        .map(|_| ())
}

/// Factorize with an injected dense backend, returning the run counters.
pub fn factorize_with<K: DenseKernel>(
    backend: &K,
    d_blocks: &DiagBlocks,
    u_blocks: &UpdateBlocks,
    s_blocks: &SchurBlocks,
    ind_sets: &IndexSets,
    reordering: &Reordering,
    vals: &mut [f64],
) -> Result<FactorStats, FactorError> {
    validate(d_blocks, u_blocks, s_blocks, ind_sets, reordering, vals.len())?;
    FactorizationKernel::new(backend).run(d_blocks, u_blocks, s_blocks, ind_sets, reordering, vals)
}

/// Cross-structure consistency checks. Cheap relative to the numeric
/// work: linear in the number of blocks and index-set entries.
fn validate(
    d_blocks: &DiagBlocks,
    u_blocks: &UpdateBlocks,
    s_blocks: &SchurBlocks,
    ind_sets: &IndexSets,
    reordering: &Reordering,
    buf_len: usize,
) -> Result<(), FactorError> {
    let n_blocks = reordering.n_blocks();

    if d_blocks.len() != n_blocks {
        return Err(invalid(format!(
            "{} diagonal blocks for {} block positions",
            d_blocks.len(),
            n_blocks
        )));
    }
    if ind_sets.n_rows() != n_blocks {
        return Err(invalid(format!(
            "{} index sets for {} block positions",
            ind_sets.n_rows(),
            n_blocks
        )));
    }
    if u_blocks.n_rows() != n_blocks {
        return Err(invalid(format!(
            "{} coupling rows for {} block positions",
            u_blocks.n_rows(),
            n_blocks
        )));
    }

    for (b, blk) in d_blocks.iter() {
        if !blk.is_square() || blk.is_empty() {
            return Err(invalid(format!(
                "diagonal block {} is {}x{}; blocks must be square and non-empty",
                b, blk.nrows, blk.ncols
            )));
        }
        if !blk.fits(buf_len) {
            return Err(invalid(format!(
                "diagonal block {} ends at {} but the value buffer has {} entries",
                b,
                blk.end(),
                buf_len
            )));
        }
    }

    if let Err(p) = ind_sets.check_sorted(reordering) {
        return Err(invalid(format!(
            "index set of block row {} is not ascending in elimination rank",
            p
        )));
    }

    // Every index-set entry of a scheduled row must have its coupling
    // block, with dimensions matching the two diagonal blocks.
    for step in 0..reordering.num_steps() {
        let p = reordering.pivot_at(step);
        let np = d_blocks.dim(p).unwrap_or(0);
        for &i in ind_sets.set(p) {
            let blk = u_blocks
                .get(p, i)
                .ok_or_else(|| invalid(format!("missing coupling block ({}, {})", p, i)))?;
            let ni = d_blocks.dim(i).unwrap_or(0);
            if blk.nrows != np || blk.ncols != ni {
                return Err(invalid(format!(
                    "coupling block ({}, {}) is {}x{}, expected {}x{}",
                    p, i, blk.nrows, blk.ncols, np, ni
                )));
            }
            if !blk.fits(buf_len) {
                return Err(invalid(format!(
                    "coupling block ({}, {}) ends at {} but the value buffer has {} entries",
                    p,
                    i,
                    blk.end(),
                    buf_len
                )));
            }
        }
    }

    // Separator blocks, where present, must agree with the diagonal
    // dimensions and lie inside the buffer.
    for (b, blk) in s_blocks.iter_diag() {
        if reordering.is_scheduled(b) {
            return Err(invalid(format!(
                "separator diagonal registered for scheduled position {}",
                b
            )));
        }
        let nb = d_blocks.dim(b).unwrap_or(0);
        if blk.nrows != nb || blk.ncols != nb {
            return Err(invalid(format!(
                "separator diagonal {} is {}x{}, expected {}x{}",
                b, blk.nrows, blk.ncols, nb, nb
            )));
        }
        if !blk.fits(buf_len) {
            return Err(invalid(format!(
                "separator diagonal {} ends past the value buffer",
                b
            )));
        }
    }
    for ((i, j), blk) in s_blocks.iter_offdiag() {
        if reordering.is_scheduled(i) || reordering.is_scheduled(j) {
            return Err(invalid(format!(
                "separator block ({}, {}) references a scheduled position",
                i, j
            )));
        }
        let (ni, nj) = (d_blocks.dim(i).unwrap_or(0), d_blocks.dim(j).unwrap_or(0));
        if blk.nrows != ni || blk.ncols != nj {
            return Err(invalid(format!(
                "separator block ({}, {}) is {}x{}, expected {}x{}",
                i, j, blk.nrows, blk.ncols, ni, nj
            )));
        }
        if !blk.fits(buf_len) {
            return Err(invalid(format!(
                "separator block ({}, {}) ends past the value buffer",
                i, j
            )));
        }
    }

    Ok(())
}

fn invalid(reason: String) -> FactorError {
    FactorError::InvalidStructure { reason }
}
