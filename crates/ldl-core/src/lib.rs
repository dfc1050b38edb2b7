//! Block symmetric factorization engine.
//!
//! Decomposes a symmetric matrix, organized into dense blocks following an
//! elimination ordering, into a block Cholesky/LDLT-type factorization in
//! place: pivot blocks, off-diagonal coupling panels, and — for partial
//! orderings — trailing Schur-complement blocks. The elimination loop
//! lives in [`kernel`], the dense block primitives behind the pluggable
//! [`numerics::DenseKernel`] trait, and [`factorize`] ties the collaborator
//! structures together for external callers.

pub mod assemble;
pub mod block;
pub mod error;
pub mod factorize;
pub mod kernel;
pub mod numerics;
pub mod reorder;
pub mod solve;
pub mod sparsity;

pub use assemble::{assemble_dense, reconstruct, Assembled, BlockPartition};
pub use block::{Block, DiagBlocks, SchurBlocks, UpdateBlocks};
pub use error::FactorError;
pub use factorize::{factorize, factorize_with};
pub use kernel::{FactorStats, FactorizationKernel};
pub use numerics::{DenseKernel, NativeKernel, PivotFailure};
pub use reorder::Reordering;
pub use solve::solve_in_place;
pub use sparsity::IndexSets;
