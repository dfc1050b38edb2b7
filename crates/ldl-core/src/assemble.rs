//! Caller-Side Assembly Helpers
//!
//! The kernel consumes pre-built block collections, index sets, and a
//! value buffer; producing them is the caller's job. This module covers
//! the common case: packing a dense symmetric matrix into block form
//! given a contiguous block partition and an elimination schedule.
//!
//! Two pieces of real work happen here:
//!
//! - **Structure detection**: a block pair is coupled iff its tile has
//!   any nonzero entry (exact zeros are structural). Uncoupled pairs get
//!   no storage and are never visited by the kernel.
//! - **Fill closure**: eliminating a pivot couples every pair of its
//!   coupled successors, so the index sets must be closed under that
//!   rule or the kernel would have nowhere to put an update. The closure
//!   walks pivots in elimination order and marks the induced pairs,
//!   allocating zero-initialized tiles for fill blocks — the same
//!   simulate-the-elimination approach a symbolic analysis phase uses.
//!
//! [`reconstruct`] is the verification companion: it multiplies the
//! factors back together, which is how the round-trip tests check a
//! factorization against its input.

use crate::block::{Block, DiagBlocks, SchurBlocks, UpdateBlocks};
use crate::error::FactorError;
use crate::reorder::Reordering;
use crate::sparsity::IndexSets;

/// Contiguous partition of an `n × n` matrix into block rows/columns.
#[derive(Debug, Clone)]
pub struct BlockPartition {
    sizes: Vec<usize>,
    /// offsets[b] = first scalar row of block b; offsets[n_blocks] = n
    offsets: Vec<usize>,
}

impl BlockPartition {
    pub fn new(sizes: Vec<usize>) -> Result<Self, FactorError> {
        if sizes.iter().any(|&s| s == 0) {
            return Err(FactorError::InvalidStructure {
                reason: "block partition contains an empty block".to_string(),
            });
        }
        let mut offsets = Vec::with_capacity(sizes.len() + 1);
        let mut acc = 0;
        for &s in &sizes {
            offsets.push(acc);
            acc += s;
        }
        offsets.push(acc);
        Ok(Self { sizes, offsets })
    }

    pub fn n_blocks(&self) -> usize {
        self.sizes.len()
    }

    /// Scalar dimension of block `b`.
    pub fn size(&self, b: usize) -> usize {
        self.sizes[b]
    }

    /// First scalar row/column of block `b`.
    pub fn offset(&self, b: usize) -> usize {
        self.offsets[b]
    }

    /// Total scalar dimension.
    pub fn total(&self) -> usize {
        *self.offsets.last().unwrap_or(&0)
    }
}

/// Everything `factorize` needs, produced from one dense matrix.
#[derive(Debug, Clone)]
pub struct Assembled {
    pub diag: DiagBlocks,
    pub upd: UpdateBlocks,
    pub schur: SchurBlocks,
    pub ind_sets: IndexSets,
    pub vals: Vec<f64>,
}

/// Pack a dense symmetric matrix (row-major, `n × n`, upper and lower
/// triangles both populated) into block collections plus a value buffer.
///
/// Tiles are laid out diagonal blocks first, then coupling panels in
/// elimination order, then separator off-diagonals. Separator diagonal
/// descriptors alias the corresponding `DiagBlocks` entries — promotion
/// from Schur data to pivot is a change of role, not a copy.
pub fn assemble_dense(
    a: &[f64],
    n: usize,
    partition: &BlockPartition,
    reordering: &Reordering,
) -> Result<Assembled, FactorError> {
    if a.len() != n * n {
        return Err(FactorError::InvalidStructure {
            reason: format!("dense matrix has {} entries, expected {}", a.len(), n * n),
        });
    }
    if partition.total() != n {
        return Err(FactorError::InvalidStructure {
            reason: format!(
                "partition covers {} rows, matrix has {}",
                partition.total(),
                n
            ),
        });
    }
    let nb = partition.n_blocks();
    if reordering.n_blocks() != nb {
        return Err(FactorError::InvalidStructure {
            reason: format!(
                "reordering over {} positions, partition has {} blocks",
                reordering.n_blocks(),
                nb
            ),
        });
    }

    // Structural coupling between block pairs: any nonzero entry in the
    // tile (checked in both triangles, so a lopsidedly-filled input
    // still couples symmetrically).
    let mut coupled = vec![vec![false; nb]; nb];
    for bi in 0..nb {
        for bj in (bi + 1)..nb {
            'scan: for r in 0..partition.size(bi) {
                for c in 0..partition.size(bj) {
                    let gr = partition.offset(bi) + r;
                    let gc = partition.offset(bj) + c;
                    if a[gr * n + gc] != 0.0 || a[gc * n + gr] != 0.0 {
                        coupled[bi][bj] = true;
                        coupled[bj][bi] = true;
                        break 'scan;
                    }
                }
            }
        }
    }

    // Fill closure: each pivot couples every pair of its later-ranked
    // neighbors. Walking pivots in elimination order means a row's set
    // is final before that row is visited.
    let mut sets: Vec<Vec<usize>> = vec![Vec::new(); nb];
    for &p in reordering.order() {
        let mut set: Vec<usize> = (0..nb)
            .filter(|&b| coupled[p][b] && reordering.rank(b) > reordering.rank(p))
            .collect();
        set.sort_unstable_by_key(|&b| reordering.rank(b));

        for (x, &i) in set.iter().enumerate() {
            for &j in &set[(x + 1)..] {
                coupled[i][j] = true;
                coupled[j][i] = true;
            }
        }
        sets[p] = set;
    }

    // Lay out tiles and copy values. Fill-only tiles copy structurally
    // zero regions of `a`, which initializes them to zero.
    let mut vals = Vec::new();
    let mut diag_descr = Vec::with_capacity(nb);
    for b in 0..nb {
        diag_descr.push(copy_tile(a, n, partition, b, b, &mut vals));
    }
    let diag = DiagBlocks::new(diag_descr);

    let mut upd = UpdateBlocks::new(nb);
    for &p in reordering.order() {
        for &i in &sets[p] {
            let blk = copy_tile(a, n, partition, p, i, &mut vals);
            upd.push(p, i, blk);
        }
    }

    let mut schur = SchurBlocks::new();
    for b in 0..nb {
        if reordering.is_separator(b) {
            schur.insert_diag(b, diag.get(b).expect("diagonal exists for every position"));
        }
    }
    for i in 0..nb {
        if !reordering.is_separator(i) {
            continue;
        }
        for j in (i + 1)..nb {
            if reordering.is_separator(j) && coupled[i][j] {
                let blk = copy_tile(a, n, partition, i, j, &mut vals);
                schur.insert_offdiag(i, j, blk);
            }
        }
    }

    Ok(Assembled {
        diag,
        upd,
        schur,
        ind_sets: IndexSets::new(sets),
        vals,
    })
}

/// Append tile `(bi, bj)` of the dense matrix to the buffer and return
/// its descriptor.
fn copy_tile(
    a: &[f64],
    n: usize,
    partition: &BlockPartition,
    bi: usize,
    bj: usize,
    vals: &mut Vec<f64>,
) -> Block {
    let blk = Block::new(vals.len(), partition.size(bi), partition.size(bj));
    for r in 0..blk.nrows {
        let gr = partition.offset(bi) + r;
        for c in 0..blk.ncols {
            let gc = partition.offset(bj) + c;
            vals.push(a[gr * n + gc]);
        }
    }
    blk
}

/// Multiply the factors of a completed full factorization back together
/// into a dense `n × n` matrix. Only the upper triangle of each pivot
/// tile is referenced, matching what `factorize_pivot` produces.
pub fn reconstruct(
    d_blocks: &DiagBlocks,
    u_blocks: &UpdateBlocks,
    ind_sets: &IndexSets,
    reordering: &Reordering,
    vals: &[f64],
) -> Result<Vec<f64>, FactorError> {
    if !reordering.is_complete() {
        return Err(FactorError::InvalidStructure {
            reason: "cannot reconstruct from a partial factorization".to_string(),
        });
    }

    let nb = d_blocks.len();
    let mut offsets = Vec::with_capacity(nb);
    let mut n = 0;
    for b in 0..nb {
        offsets.push(n);
        n += d_blocks.dim(b).unwrap_or(0);
    }

    let mut out = vec![0.0; n * n];

    for &p in reordering.order() {
        let rpp = d_blocks.get(p).ok_or_else(|| FactorError::InvalidStructure {
            reason: format!("no diagonal block at position {}", p),
        })?;
        let np = rpp.nrows;

        // Rppᵀ·Rpp into tile (p, p).
        for i in 0..np {
            for j in 0..np {
                let mut s = 0.0;
                for m in 0..=i.min(j) {
                    s += vals[rpp.at(m, i)] * vals[rpp.at(m, j)];
                }
                out[(offsets[p] + i) * n + offsets[p] + j] += s;
            }
        }

        let set = ind_sets.set(p);
        for &i in set {
            let u = u_blocks.get(p, i).ok_or_else(|| FactorError::InvalidStructure {
                reason: format!("no coupling block ({}, {})", p, i),
            })?;

            // Rppᵀ·U(p,i) into tiles (p, i) and (i, p).
            for r in 0..np {
                for c in 0..u.ncols {
                    let mut s = 0.0;
                    for m in 0..=r {
                        s += vals[rpp.at(m, r)] * vals[u.at(m, c)];
                    }
                    out[(offsets[p] + r) * n + offsets[i] + c] += s;
                    out[(offsets[i] + c) * n + offsets[p] + r] += s;
                }
            }
        }

        // U(p,i)ᵀ·U(p,j) into tiles (i, j) and, for i != j, (j, i).
        for (x, &i) in set.iter().enumerate() {
            let ui = u_blocks.get(p, i).expect("checked above");
            for &j in &set[x..] {
                let uj = u_blocks.get(p, j).expect("checked above");
                for r in 0..ui.ncols {
                    for c in 0..uj.ncols {
                        let mut s = 0.0;
                        for m in 0..ui.nrows {
                            s += vals[ui.at(m, r)] * vals[uj.at(m, c)];
                        }
                        out[(offsets[i] + r) * n + offsets[j] + c] += s;
                        if i != j {
                            out[(offsets[j] + c) * n + offsets[i] + r] += s;
                        }
                    }
                }
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_offsets() {
        let part = BlockPartition::new(vec![2, 3, 1]).unwrap();
        assert_eq!(part.n_blocks(), 3);
        assert_eq!(part.total(), 6);
        assert_eq!(part.offset(0), 0);
        assert_eq!(part.offset(1), 2);
        assert_eq!(part.offset(2), 5);
        assert_eq!(part.size(1), 3);
    }

    #[test]
    fn test_partition_rejects_empty_block() {
        assert!(BlockPartition::new(vec![2, 0, 1]).is_err());
    }

    #[test]
    fn test_assemble_detects_structure() {
        // Block tridiagonal 3-block matrix: (0,2) is structurally absent.
        #[rustfmt::skip]
        let a = vec![
            4.0, 1.0, 0.0,
            1.0, 5.0, 2.0,
            0.0, 2.0, 6.0,
        ];
        let part = BlockPartition::new(vec![1, 1, 1]).unwrap();
        let r = Reordering::natural(3);
        let asm = assemble_dense(&a, 3, &part, &r).unwrap();

        assert_eq!(asm.ind_sets.set(0), &[1]);
        assert_eq!(asm.ind_sets.set(1), &[2]);
        assert!(asm.upd.get(0, 2).is_none());
        assert!(asm.schur.is_empty());
    }

    #[test]
    fn test_assemble_adds_fill() {
        // Arrow matrix: eliminating 0 couples 1 and 2 even though the
        // (1,2) tile is zero in the input.
        #[rustfmt::skip]
        let a = vec![
            4.0, 1.0, 1.0,
            1.0, 5.0, 0.0,
            1.0, 0.0, 6.0,
        ];
        let part = BlockPartition::new(vec![1, 1, 1]).unwrap();
        let r = Reordering::natural(3);
        let asm = assemble_dense(&a, 3, &part, &r).unwrap();

        assert_eq!(asm.ind_sets.set(0), &[1, 2]);
        assert_eq!(asm.ind_sets.set(1), &[2], "fill block (1,2) expected");
        let fill = asm.upd.get(1, 2).expect("fill block allocated");
        assert_eq!(asm.vals[fill.at(0, 0)], 0.0);
    }

    #[test]
    fn test_assemble_partial_builds_schur_blocks() {
        #[rustfmt::skip]
        let a = vec![
            4.0, 1.0, 1.0,
            1.0, 5.0, 0.0,
            1.0, 0.0, 6.0,
        ];
        let part = BlockPartition::new(vec![1, 1, 1]).unwrap();
        let r = Reordering::new(vec![0], 3).unwrap();
        let asm = assemble_dense(&a, 3, &part, &r).unwrap();

        assert!(asm.schur.diag(1).is_some());
        assert!(asm.schur.diag(2).is_some());
        // (1,2) coupled through fill from pivot 0
        assert!(asm.schur.offdiag(1, 2).is_some());
        // Separator diagonals alias the DiagBlocks descriptors
        assert_eq!(asm.schur.diag(1), asm.diag.get(1));
    }

    #[test]
    fn test_reconstruct_rejects_partial() {
        let d = DiagBlocks::new(vec![Block::new(0, 1, 1), Block::new(1, 1, 1)]);
        let u = UpdateBlocks::new(2);
        let sets = IndexSets::empty(2);
        let r = Reordering::new(vec![0], 2).unwrap();
        let vals = vec![2.0, 2.0];
        assert!(reconstruct(&d, &u, &sets, &r, &vals).is_err());
    }

    #[test]
    fn test_assemble_respects_permuted_order() {
        // Elimination order 1, 0: coupling (1,0) is stored as a panel of
        // block-row 1 because 1 ranks first.
        #[rustfmt::skip]
        let a = vec![
            4.0, 1.0,
            1.0, 5.0,
        ];
        let part = BlockPartition::new(vec![1, 1]).unwrap();
        let r = Reordering::new(vec![1, 0], 2).unwrap();
        let asm = assemble_dense(&a, 2, &part, &r).unwrap();

        assert_eq!(asm.ind_sets.set(1), &[0]);
        assert!(asm.ind_sets.set(0).is_empty());
        assert!(asm.upd.get(1, 0).is_some());
        assert!(asm.upd.get(0, 1).is_none());
    }
}
