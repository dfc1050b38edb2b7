//! Block Descriptors and Collections
//!
//! All dense tiles of the block matrix live in one contiguous value buffer
//! owned by the caller. A [`Block`] is a plain `(offset, nrows, ncols)`
//! descriptor into that buffer, row-major within the tile; the collections
//! below hold descriptors, never values, so the factorization kernel can
//! mutate tiles in place without allocating or relocating anything.
//!
//! Three collections split the tiles by their role in the elimination:
//!
//! ```text
//! ┌──────┬──────┬──────┬────────┐
//! │ D₀   │ U₀₁  │ U₀₂  │ U₀ₛ   │   D_p  : pivot (diagonal) blocks
//! ├──────┼──────┼──────┼────────┤   U_pi : coupling of pivot p to a
//! │      │ D₁   │ U₁₂  │ U₁ₛ   │          later position i
//! ├──────┼──────┼──────┼────────┤   S    : blocks among separator
//! │      │      │ D₂   │ U₂ₛ   │          positions, accumulating the
//! ├──────┼──────┼──────┼────────┤          Schur complement
//! │      │      │      │  S    │
//! └──────┴──────┴──────┴────────┘
//! ```
//!
//! A diagonal block holds trailing (pending) data until its elimination
//! step and the in-place triangular factor afterwards; a coupling block
//! holds raw matrix data (plus accumulated updates) until its row pivot is
//! eliminated and the solved panel afterwards. Separator blocks are only
//! ever update destinations.

/// Descriptor of one dense tile inside the shared value buffer.
///
/// Row-major: entry `(r, c)` of the tile lives at `offset + r * ncols + c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Start of the tile in the value buffer
    pub offset: usize,
    /// Number of rows
    pub nrows: usize,
    /// Number of columns
    pub ncols: usize,
}

impl Block {
    pub fn new(offset: usize, nrows: usize, ncols: usize) -> Self {
        Self {
            offset,
            nrows,
            ncols,
        }
    }

    /// Number of buffer entries covered by this tile.
    pub fn len(&self) -> usize {
        self.nrows * self.ncols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Absolute buffer index of tile entry `(r, c)`.
    #[inline]
    pub fn at(&self, r: usize, c: usize) -> usize {
        debug_assert!(r < self.nrows && c < self.ncols);
        self.offset + r * self.ncols + c
    }

    /// One past the last buffer index covered by this tile.
    pub fn end(&self) -> usize {
        self.offset + self.len()
    }

    /// Whether the tile lies entirely inside a buffer of `buf_len` entries.
    pub fn fits(&self, buf_len: usize) -> bool {
        self.end() <= buf_len
    }

    /// Whether the tile is square.
    pub fn is_square(&self) -> bool {
        self.nrows == self.ncols
    }
}

/// Pivot (diagonal) blocks, one per block position.
///
/// Before a position's elimination step its entry holds trailing Schur
/// data; after the step it holds the upper-triangular factor of the pivot.
/// A resolved entry is never written again.
#[derive(Debug, Clone)]
pub struct DiagBlocks {
    blocks: Vec<Block>,
}

impl DiagBlocks {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Number of block positions.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Diagonal block at position `b`, if the position exists.
    pub fn get(&self, b: usize) -> Option<Block> {
        self.blocks.get(b).copied()
    }

    /// Block dimension (row count) at position `b`.
    pub fn dim(&self, b: usize) -> Option<usize> {
        self.get(b).map(|blk| blk.nrows)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Block)> + '_ {
        self.blocks.iter().copied().enumerate()
    }
}

/// Off-diagonal coupling blocks.
///
/// Entry `(p, i)` couples block position `p` to a position `i` eliminated
/// later (or to a separator position), stored `n_p × n_i` in block-row
/// orientation. The entry is a pending update destination until `p` is
/// eliminated; the solve step of `p` turns it into the factor's
/// off-diagonal panel, which is afterwards only read.
#[derive(Debug, Clone)]
pub struct UpdateBlocks {
    /// rows[p] = couplings of block-row p, in index-set order
    rows: Vec<Vec<(usize, Block)>>,
}

impl UpdateBlocks {
    /// Create an empty collection for `n_blocks` block rows.
    pub fn new(n_blocks: usize) -> Self {
        Self {
            rows: vec![Vec::new(); n_blocks],
        }
    }

    /// Number of block rows.
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Total number of coupling blocks.
    pub fn n_blocks(&self) -> usize {
        self.rows.iter().map(|r| r.len()).sum()
    }

    /// Append the coupling block `(p, i)`. Callers insert couplings in the
    /// same order as the row's index set.
    pub fn push(&mut self, p: usize, i: usize, block: Block) {
        self.rows[p].push((i, block));
    }

    /// Coupling block `(p, i)`, if present. Rows are short, so a linear
    /// scan beats maintaining a lookup structure.
    pub fn get(&self, p: usize, i: usize) -> Option<Block> {
        self.rows
            .get(p)?
            .iter()
            .find(|&&(col, _)| col == i)
            .map(|&(_, blk)| blk)
    }

    /// Couplings of block-row `p` in insertion order.
    pub fn row(&self, p: usize) -> &[(usize, Block)] {
        &self.rows[p]
    }
}

/// Blocks among separator positions — the trailing submatrix the
/// reordering does not schedule for elimination.
///
/// These tiles only accumulate negative contributions; after a run they
/// hold the Schur complement of the eliminated positions. A reordering
/// that eliminates every position leaves this collection empty.
#[derive(Debug, Clone, Default)]
pub struct SchurBlocks {
    /// (position, block), sorted by position
    diag: Vec<(usize, Block)>,
    /// ((row, col), block), sorted by key; row eliminated-first orientation
    offdiag: Vec<((usize, usize), Block)>,
}

impl SchurBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the diagonal block of separator position `b`.
    pub fn insert_diag(&mut self, b: usize, block: Block) {
        match self.diag.binary_search_by_key(&b, |&(pos, _)| pos) {
            Ok(idx) => self.diag[idx] = (b, block),
            Err(idx) => self.diag.insert(idx, (b, block)),
        }
    }

    /// Register the off-diagonal block for separator pair `(i, j)`,
    /// stored `n_i × n_j`.
    pub fn insert_offdiag(&mut self, i: usize, j: usize, block: Block) {
        match self.offdiag.binary_search_by_key(&(i, j), |&(key, _)| key) {
            Ok(idx) => self.offdiag[idx] = ((i, j), block),
            Err(idx) => self.offdiag.insert(idx, ((i, j), block)),
        }
    }

    pub fn diag(&self, b: usize) -> Option<Block> {
        self.diag
            .binary_search_by_key(&b, |&(pos, _)| pos)
            .ok()
            .map(|idx| self.diag[idx].1)
    }

    pub fn offdiag(&self, i: usize, j: usize) -> Option<Block> {
        self.offdiag
            .binary_search_by_key(&(i, j), |&(key, _)| key)
            .ok()
            .map(|idx| self.offdiag[idx].1)
    }

    pub fn is_empty(&self) -> bool {
        self.diag.is_empty() && self.offdiag.is_empty()
    }

    /// Number of registered tiles (diagonal plus off-diagonal).
    pub fn len(&self) -> usize {
        self.diag.len() + self.offdiag.len()
    }

    pub fn iter_diag(&self) -> impl Iterator<Item = (usize, Block)> + '_ {
        self.diag.iter().copied()
    }

    pub fn iter_offdiag(&self) -> impl Iterator<Item = ((usize, usize), Block)> + '_ {
        self.offdiag.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_indexing() {
        let blk = Block::new(10, 2, 3);
        assert_eq!(blk.len(), 6);
        assert_eq!(blk.at(0, 0), 10);
        assert_eq!(blk.at(0, 2), 12);
        assert_eq!(blk.at(1, 0), 13);
        assert_eq!(blk.end(), 16);
        assert!(blk.fits(16));
        assert!(!blk.fits(15));
        assert!(!blk.is_square());
    }

    #[test]
    fn test_update_blocks_lookup() {
        let mut u = UpdateBlocks::new(3);
        u.push(0, 1, Block::new(0, 2, 2));
        u.push(0, 2, Block::new(4, 2, 1));
        u.push(1, 2, Block::new(6, 2, 1));

        assert_eq!(u.n_blocks(), 3);
        assert_eq!(u.get(0, 2), Some(Block::new(4, 2, 1)));
        assert_eq!(u.get(1, 2), Some(Block::new(6, 2, 1)));
        assert_eq!(u.get(2, 0), None);
        assert_eq!(u.get(0, 0), None);
        assert_eq!(u.row(0).len(), 2);
    }

    #[test]
    fn test_schur_blocks_sorted_lookup() {
        let mut s = SchurBlocks::new();
        s.insert_diag(5, Block::new(0, 2, 2));
        s.insert_diag(3, Block::new(4, 1, 1));
        s.insert_offdiag(3, 5, Block::new(5, 1, 2));

        assert_eq!(s.len(), 3);
        assert_eq!(s.diag(3), Some(Block::new(4, 1, 1)));
        assert_eq!(s.diag(4), None);
        assert_eq!(s.offdiag(3, 5), Some(Block::new(5, 1, 2)));
        assert_eq!(s.offdiag(5, 3), None);

        // diag iteration comes back sorted by position
        let positions: Vec<usize> = s.iter_diag().map(|(b, _)| b).collect();
        assert_eq!(positions, vec![3, 5]);
    }

    #[test]
    fn test_schur_blocks_empty() {
        let s = SchurBlocks::new();
        assert!(s.is_empty());
        assert_eq!(s.len(), 0);
    }
}
