//! Applying a Completed Factorization
//!
//! Forward/backward block substitution: given the in-place factor left by
//! a successful full factorization (`A = Rᵀ·R` in block form), solve
//! `A·x = b` by `Rᵀ·y = b` in elimination order, then `R·x = y` in
//! reverse. The right-hand side is indexed in the original scalar
//! numbering, grouped by block position; the result overwrites it.
//!
//! Only valid after [`crate::factorize::factorize`] succeeded on these
//! structures with a complete reordering. A partial reordering leaves a
//! Schur complement instead of a factorization, so solving is refused.

use crate::block::{DiagBlocks, UpdateBlocks};
use crate::error::FactorError;
use crate::reorder::Reordering;

/// Solve `A·x = b` in place using the factor stored in `vals`.
pub fn solve_in_place(
    d_blocks: &DiagBlocks,
    u_blocks: &UpdateBlocks,
    reordering: &Reordering,
    vals: &[f64],
    rhs: &mut [f64],
) -> Result<(), FactorError> {
    if !reordering.is_complete() {
        return Err(FactorError::InvalidStructure {
            reason: "cannot solve with a partial factorization; separator blocks remain"
                .to_string(),
        });
    }

    let nb = d_blocks.len();
    let mut offsets = Vec::with_capacity(nb);
    let mut n = 0;
    for b in 0..nb {
        offsets.push(n);
        n += d_blocks.dim(b).unwrap_or(0);
    }
    if rhs.len() != n {
        return Err(FactorError::InvalidStructure {
            reason: format!("right-hand side has {} entries, matrix has {}", rhs.len(), n),
        });
    }

    // Forward pass: Rᵀ·y = b, block rows in elimination order. After a
    // row is solved, its contribution is pushed into every coupled later
    // row, mirroring how the kernel propagates updates.
    for &p in reordering.order() {
        let rpp = d_blocks.get(p).ok_or_else(|| missing_diag(p))?;
        let np = rpp.nrows;
        let off_p = offsets[p];

        for k in 0..np {
            let mut s = rhs[off_p + k];
            for m in 0..k {
                s -= vals[rpp.at(m, k)] * rhs[off_p + m];
            }
            rhs[off_p + k] = s / vals[rpp.at(k, k)];
        }

        for &(i, u) in u_blocks.row(p) {
            let off_i = offsets[i];
            for c in 0..u.ncols {
                let mut s = 0.0;
                for m in 0..np {
                    s += vals[u.at(m, c)] * rhs[off_p + m];
                }
                rhs[off_i + c] -= s;
            }
        }
    }

    // Backward pass: R·x = y, reverse elimination order. Contributions
    // from later (already solved) rows are gathered first, then the
    // pivot's upper triangle is back-substituted.
    for &p in reordering.order().iter().rev() {
        let rpp = d_blocks.get(p).ok_or_else(|| missing_diag(p))?;
        let np = rpp.nrows;
        let off_p = offsets[p];

        for &(i, u) in u_blocks.row(p) {
            let off_i = offsets[i];
            for r in 0..np {
                let mut s = 0.0;
                for c in 0..u.ncols {
                    s += vals[u.at(r, c)] * rhs[off_i + c];
                }
                rhs[off_p + r] -= s;
            }
        }

        for k in (0..np).rev() {
            let mut s = rhs[off_p + k];
            for m in (k + 1)..np {
                s -= vals[rpp.at(k, m)] * rhs[off_p + m];
            }
            rhs[off_p + k] = s / vals[rpp.at(k, k)];
        }
    }

    Ok(())
}

fn missing_diag(b: usize) -> FactorError {
    FactorError::InvalidStructure {
        reason: format!("no diagonal block at position {}", b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::{assemble_dense, BlockPartition};
    use crate::factorize::factorize;

    #[test]
    fn test_solve_tridiagonal() {
        // A = [4, 1, 0; 1, 5, 2; 0, 2, 6], b = A·[1, 2, 3]ᵀ = [6, 17, 22]
        #[rustfmt::skip]
        let a = vec![
            4.0, 1.0, 0.0,
            1.0, 5.0, 2.0,
            0.0, 2.0, 6.0,
        ];
        let part = BlockPartition::new(vec![1, 1, 1]).unwrap();
        let r = Reordering::natural(3);
        let mut asm = assemble_dense(&a, 3, &part, &r).unwrap();
        factorize(&asm.diag, &asm.upd, &asm.schur, &asm.ind_sets, &r, &mut asm.vals).unwrap();

        let mut rhs = vec![6.0, 17.0, 22.0];
        solve_in_place(&asm.diag, &asm.upd, &r, &asm.vals, &mut rhs).unwrap();

        let expected = [1.0, 2.0, 3.0];
        for (i, &x) in rhs.iter().enumerate() {
            assert!(
                (x - expected[i]).abs() < 1e-10,
                "x[{}] = {}, expected {}",
                i,
                x,
                expected[i]
            );
        }
    }

    #[test]
    fn test_solve_with_multi_size_blocks() {
        // 2+1 block partition, SPD by diagonal dominance.
        #[rustfmt::skip]
        let a = vec![
            6.0, 1.0, 2.0,
            1.0, 7.0, 1.0,
            2.0, 1.0, 8.0,
        ];
        let part = BlockPartition::new(vec![2, 1]).unwrap();
        let r = Reordering::natural(2);
        let mut asm = assemble_dense(&a, 3, &part, &r).unwrap();
        factorize(&asm.diag, &asm.upd, &asm.schur, &asm.ind_sets, &r, &mut asm.vals).unwrap();

        // b = A·[1, -1, 2]ᵀ
        let x_true = [1.0, -1.0, 2.0];
        let mut rhs = [0.0; 3];
        for i in 0..3 {
            for j in 0..3 {
                rhs[i] += a[i * 3 + j] * x_true[j];
            }
        }

        let mut rhs = rhs.to_vec();
        solve_in_place(&asm.diag, &asm.upd, &r, &asm.vals, &mut rhs).unwrap();
        for i in 0..3 {
            assert!(
                (rhs[i] - x_true[i]).abs() < 1e-10,
                "x[{}] = {}, expected {}",
                i,
                rhs[i],
                x_true[i]
            );
        }
    }

    #[test]
    fn test_solve_with_permuted_elimination_order() {
        // Same tridiagonal system, eliminated in order 2, 0, 1. Block
        // positions and elimination ranks disagree here, so both sweeps
        // must follow the schedule, not the position numbering.
        #[rustfmt::skip]
        let a = vec![
            4.0, 1.0, 0.0,
            1.0, 5.0, 2.0,
            0.0, 2.0, 6.0,
        ];
        let part = BlockPartition::new(vec![1, 1, 1]).unwrap();
        let r = Reordering::new(vec![2, 0, 1], 3).unwrap();
        let mut asm = assemble_dense(&a, 3, &part, &r).unwrap();
        factorize(&asm.diag, &asm.upd, &asm.schur, &asm.ind_sets, &r, &mut asm.vals).unwrap();

        // b = A·[1, 2, 3]ᵀ = [6, 17, 22]
        let mut rhs = vec![6.0, 17.0, 22.0];
        solve_in_place(&asm.diag, &asm.upd, &r, &asm.vals, &mut rhs).unwrap();

        let expected = [1.0, 2.0, 3.0];
        for (i, &x) in rhs.iter().enumerate() {
            assert!(
                (x - expected[i]).abs() < 1e-10,
                "x[{}] = {}, expected {}",
                i,
                x,
                expected[i]
            );
        }
    }

    #[test]
    fn test_solve_rejects_partial_factorization() {
        #[rustfmt::skip]
        let a = vec![
            4.0, 1.0,
            1.0, 5.0,
        ];
        let part = BlockPartition::new(vec![1, 1]).unwrap();
        let r = Reordering::new(vec![0], 2).unwrap();
        let mut asm = assemble_dense(&a, 2, &part, &r).unwrap();
        factorize(&asm.diag, &asm.upd, &asm.schur, &asm.ind_sets, &r, &mut asm.vals).unwrap();

        let mut rhs = vec![1.0, 1.0];
        let err = solve_in_place(&asm.diag, &asm.upd, &r, &asm.vals, &mut rhs).unwrap_err();
        assert!(err.to_string().contains("partial"), "got: {}", err);
    }

    #[test]
    fn test_solve_rejects_wrong_rhs_length() {
        #[rustfmt::skip]
        let a = vec![
            4.0, 1.0,
            1.0, 5.0,
        ];
        let part = BlockPartition::new(vec![1, 1]).unwrap();
        let r = Reordering::natural(2);
        let mut asm = assemble_dense(&a, 2, &part, &r).unwrap();
        factorize(&asm.diag, &asm.upd, &asm.schur, &asm.ind_sets, &r, &mut asm.vals).unwrap();

        let mut rhs = vec![1.0];
        assert!(solve_in_place(&asm.diag, &asm.upd, &r, &asm.vals, &mut rhs).is_err());
    }
}
