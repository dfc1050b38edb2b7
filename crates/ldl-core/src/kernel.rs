//! Block Factorization Kernel
//!
//! The elimination engine. One step per entry of the reordering:
//!
//! 1. **Factorize** the pivot's diagonal block in place. Failure is fatal
//!    to the run — a non-factorizable pivot means the decomposition does
//!    not exist under the current ordering, so there is no local recovery.
//! 2. **Solve**: every coupling block of the pivot row (per its index
//!    set) is turned into the factor's off-diagonal panel with the
//!    just-factorized pivot.
//! 3. **Propagate**: for every pair `(i, j)` of index-set entries with
//!    `i` ranked at or before `j`, subtract the pivot's contribution
//!    `U(p,i)ᵀ·U(p,j)` from the destination block — a pending diagonal
//!    (later pivot or separator) for `i == j`, a pending coupling or
//!    separator off-diagonal otherwise. Only pairs present in the index
//!    set are visited; that is the entire sparsity exploitation.
//!
//! Steps have a strict data dependency (a block must have received all
//! contributions before it pivots), so the kernel runs them sequentially
//! in reordering order. Within a step the update destinations are
//! pairwise disjoint and the traversal is a fixed ascending-rank sweep,
//! so results are reproducible and the per-destination work could be
//! fanned out to workers without changing them.
//!
//! The kernel owns no buffers and keeps no state across runs: it reads
//! descriptors, mutates tiles inside the caller's value buffer, and
//! returns per-run counters.

use serde::Serialize;

use crate::block::{Block, DiagBlocks, SchurBlocks, UpdateBlocks};
use crate::error::FactorError;
use crate::numerics::DenseKernel;
use crate::reorder::Reordering;
use crate::sparsity::IndexSets;

/// Counters from one factorization run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FactorStats {
    /// Elimination steps executed (pivot blocks factorized)
    pub num_steps: usize,
    /// Coupling panels transformed by the pivot solve
    pub num_panels_solved: usize,
    /// Update products applied to pending pivot/coupling destinations
    pub num_updates: usize,
    /// Update products applied to separator (Schur) destinations
    pub num_schur_updates: usize,
}

/// The elimination engine, generic over the dense backend.
///
/// Construct with a backend reference and call [`run`](Self::run); the
/// kernel itself is stateless, so one instance can serve any number of
/// factorizations.
pub struct FactorizationKernel<'a, K: DenseKernel> {
    backend: &'a K,
}

impl<'a, K: DenseKernel> FactorizationKernel<'a, K> {
    pub fn new(backend: &'a K) -> Self {
        Self { backend }
    }

    /// Run the elimination over all scheduled steps, mutating `vals` in
    /// place. On success the diagonal and coupling blocks of eliminated
    /// positions hold the factor, and separator blocks hold the fully
    /// accumulated Schur complement.
    ///
    /// Inputs are assumed validated (see [`crate::factorize`]); the
    /// kernel still refuses structurally impossible requests — a missing
    /// destination block or a revisited pivot — with
    /// [`FactorError::InvalidStructure`].
    pub fn run(
        &self,
        d_blocks: &DiagBlocks,
        u_blocks: &UpdateBlocks,
        s_blocks: &SchurBlocks,
        ind_sets: &IndexSets,
        reordering: &Reordering,
        vals: &mut [f64],
    ) -> Result<FactorStats, FactorError> {
        let mut stats = FactorStats::default();
        let mut resolved = vec![false; reordering.n_blocks()];

        for step in 0..reordering.num_steps() {
            let p = reordering.pivot_at(step);
            // Duplicate schedule entries are already rejected by
            // Reordering::new; the kernel re-checks because it takes the
            // schedule as-is and a resolved tile must never be rewritten.
            if resolved[p] {
                return Err(FactorError::InvalidStructure {
                    reason: format!("pivot block {} revisited at step {}", p, step),
                });
            }

            let pivot = d_blocks.get(p).ok_or_else(|| missing_diag(p))?;

            // 1. Factorize the pivot in place.
            self.backend
                .factorize_pivot(vals, pivot)
                .map_err(|failure| FactorError::NotPositiveDefinite {
                    step,
                    block: p,
                    column: failure.column,
                })?;
            resolved[p] = true;
            stats.num_steps += 1;

            // 2. Solve every coupling panel of this pivot row.
            let set = ind_sets.set(p);
            for &i in set {
                let panel = u_blocks.get(p, i).ok_or_else(|| missing_coupling(p, i))?;
                self.backend.solve_pivot(vals, panel, pivot);
                stats.num_panels_solved += 1;
            }

            // 3. Propagate into every structurally coupled pair, in the
            // fixed ascending-rank order of the index set.
            for (a, &i) in set.iter().enumerate() {
                let panel_i = u_blocks.get(p, i).ok_or_else(|| missing_coupling(p, i))?;

                for &j in &set[a..] {
                    if i == j {
                        let dest = self
                            .pending_diag(d_blocks, s_blocks, reordering, i)
                            .ok_or_else(|| missing_diag(i))?;
                        self.backend
                            .symmetric_update(vals, dest, -1.0, panel_i, panel_i, 1.0);
                    } else {
                        let panel_j =
                            u_blocks.get(p, j).ok_or_else(|| missing_coupling(p, j))?;
                        let dest = self
                            .pending_offdiag(u_blocks, s_blocks, reordering, i, j)
                            .ok_or_else(|| {
                                FactorError::InvalidStructure {
                                    reason: format!(
                                        "no destination block ({}, {}) for update from pivot {}",
                                        i, j, p
                                    ),
                                }
                            })?;
                        self.backend.gemm_t(vals, dest, -1.0, panel_i, panel_j, 1.0);
                    }
                    if reordering.is_separator(i) {
                        stats.num_schur_updates += 1;
                    } else {
                        stats.num_updates += 1;
                    }
                }
            }
        }

        Ok(stats)
    }

    /// Pending diagonal destination: a later pivot's diagonal block, or a
    /// separator diagonal. The split is by final role; a pending diagonal
    /// is trailing Schur data either way.
    fn pending_diag(
        &self,
        d_blocks: &DiagBlocks,
        s_blocks: &SchurBlocks,
        reordering: &Reordering,
        i: usize,
    ) -> Option<Block> {
        if reordering.is_scheduled(i) {
            d_blocks.get(i)
        } else {
            s_blocks.diag(i)
        }
    }

    /// Pending off-diagonal destination for the pair `(i, j)`, `i` ranked
    /// before `j`: a coupling block of row `i` if `i` will be eliminated,
    /// a separator block otherwise (then `j` is separator too).
    fn pending_offdiag(
        &self,
        u_blocks: &UpdateBlocks,
        s_blocks: &SchurBlocks,
        reordering: &Reordering,
        i: usize,
        j: usize,
    ) -> Option<Block> {
        if reordering.is_scheduled(i) {
            u_blocks.get(i, j)
        } else {
            s_blocks.offdiag(i, j)
        }
    }
}

fn missing_diag(b: usize) -> FactorError {
    FactorError::InvalidStructure {
        reason: format!("no diagonal block at position {}", b),
    }
}

fn missing_coupling(p: usize, i: usize) -> FactorError {
    FactorError::InvalidStructure {
        reason: format!("no coupling block ({}, {})", p, i),
    }
}
