//! Elimination Schedule
//!
//! The reordering fixes the order in which pivot blocks are eliminated.
//! Computing a good ordering (minimum degree, nested dissection, ...) is a
//! separate concern; this module only represents the result and answers
//! the two questions the kernel asks: which position is the pivot of a
//! given step, and how do two positions compare in elimination order.
//!
//! Positions absent from the schedule are *separator* positions: they are
//! never eliminated in this run and rank after every scheduled position,
//! among themselves in ascending position order. Their blocks accumulate
//! the Schur complement (see [`crate::block::SchurBlocks`]).

use crate::error::FactorError;

/// Elimination sequence plus position-to-rank mapping. Read-only input to
/// the kernel; all ordering decisions are made before factorization.
#[derive(Debug, Clone)]
pub struct Reordering {
    /// order[step] = block position eliminated at that step
    order: Vec<usize>,
    /// rank[position] = place in the global elimination order; scheduled
    /// positions get their step number, separator positions follow
    rank: Vec<usize>,
    scheduled: Vec<bool>,
}

impl Reordering {
    /// Schedule that eliminates all `n_blocks` positions in natural order.
    pub fn natural(n_blocks: usize) -> Self {
        Self::new((0..n_blocks).collect(), n_blocks)
            .expect("natural ordering is always valid")
    }

    /// Build a schedule eliminating `order` (in sequence) out of
    /// `n_blocks` block positions. Positions not listed become separator
    /// positions.
    pub fn new(order: Vec<usize>, n_blocks: usize) -> Result<Self, FactorError> {
        let mut scheduled = vec![false; n_blocks];
        let mut rank = vec![usize::MAX; n_blocks];

        for (step, &p) in order.iter().enumerate() {
            if p >= n_blocks {
                return Err(FactorError::InvalidStructure {
                    reason: format!(
                        "reordering entry {} out of range (n_blocks = {})",
                        p, n_blocks
                    ),
                });
            }
            if scheduled[p] {
                return Err(FactorError::InvalidStructure {
                    reason: format!("block position {} scheduled twice", p),
                });
            }
            scheduled[p] = true;
            rank[p] = step;
        }

        // Separator positions rank after all scheduled ones, in ascending
        // position order, so "later in elimination order" is total.
        let mut next = order.len();
        for b in 0..n_blocks {
            if !scheduled[b] {
                rank[b] = next;
                next += 1;
            }
        }

        Ok(Self {
            order,
            rank,
            scheduled,
        })
    }

    /// Number of elimination steps.
    pub fn num_steps(&self) -> usize {
        self.order.len()
    }

    /// Total number of block positions (scheduled + separator).
    pub fn n_blocks(&self) -> usize {
        self.rank.len()
    }

    /// Pivot position of elimination step `step`.
    pub fn pivot_at(&self, step: usize) -> usize {
        self.order[step]
    }

    /// The elimination sequence.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Global elimination rank of position `b`; smaller ranks are
    /// eliminated first, separator positions rank last.
    pub fn rank(&self, b: usize) -> usize {
        self.rank[b]
    }

    /// Whether position `b` is scheduled for elimination.
    pub fn is_scheduled(&self, b: usize) -> bool {
        self.scheduled[b]
    }

    /// Whether position `b` belongs to the separator.
    pub fn is_separator(&self, b: usize) -> bool {
        !self.scheduled[b]
    }

    /// Whether every position is eliminated (no separator remains).
    pub fn is_complete(&self) -> bool {
        self.order.len() == self.rank.len()
    }
}
