//! Nonzero Index Sets
//!
//! One set per block row: the positions of later blocks structurally
//! coupled to that row. The kernel visits exactly the pairs these sets
//! describe, which is what keeps the elimination from paying dense-fill
//! cost — a pair absent from every set is never read or written.
//!
//! Sets must be sorted ascending by elimination rank (the deterministic
//! traversal order that makes runs reproducible) and must be closed under
//! elimination fill: if `i` and `j` both appear in `set(p)` with `i`
//! ranked before `j`, the destination block `(i, j)` must exist — either
//! as a coupling of row `i` or as a separator block. The assembly helpers
//! in [`crate::assemble`] produce closed, sorted sets; hand-built sets are
//! validated by the factorization entry point.

use crate::reorder::Reordering;

/// Per-block-row sets of structurally coupled later positions.
#[derive(Debug, Clone)]
pub struct IndexSets {
    sets: Vec<Vec<usize>>,
}

impl IndexSets {
    /// Wrap per-row sets. `sets[p]` lists the positions coupled to block
    /// row `p`, sorted ascending by elimination rank.
    pub fn new(sets: Vec<Vec<usize>>) -> Self {
        Self { sets }
    }

    /// Empty sets for `n_blocks` rows.
    pub fn empty(n_blocks: usize) -> Self {
        Self {
            sets: vec![Vec::new(); n_blocks],
        }
    }

    /// Number of block rows.
    pub fn n_rows(&self) -> usize {
        self.sets.len()
    }

    /// Coupled positions of block row `p`.
    pub fn set(&self, p: usize) -> &[usize] {
        &self.sets[p]
    }

    /// Check that every set is strictly ascending in elimination rank and
    /// only references positions ranked after its own row. Returns the
    /// offending row on failure.
    pub fn check_sorted(&self, reordering: &Reordering) -> Result<(), usize> {
        for (p, set) in self.sets.iter().enumerate() {
            let mut prev = reordering.rank(p);
            for &i in set {
                if i >= reordering.n_blocks() || reordering.rank(i) <= prev {
                    return Err(p);
                }
                prev = reordering.rank(i);
            }
        }
        Ok(())
    }
}
