//! Block interleaver.
//!
//! Spreads burst errors across the frame so the convolutional decoder sees
//! them as isolated bit flips. Bits fill a rows-by-columns matrix row by
//! row and are read out column by column; deinterleaving reads the other
//! way around. Bits beyond the last full block pass through unchanged.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BlockInterleaver {
    pub rows: usize,
    pub columns: usize,
}

impl BlockInterleaver {
    pub fn new(rows: usize, columns: usize) -> Self {
        BlockInterleaver { rows, columns }
    }

    fn block_size(&self) -> usize {
        self.rows * self.columns
    }

    /// Permute full blocks write-row/read-column; the remainder is copied
    /// verbatim.
    pub fn interleave(&self, bits: &[bool]) -> Vec<bool> {
        // Output position c*rows + r takes the bit at matrix cell (r, c)
        self.permute(bits, |p| (p % self.rows) * self.columns + p / self.rows)
    }

    /// Exact inverse of [`interleave`](Self::interleave).
    pub fn deinterleave(&self, bits: &[bool]) -> Vec<bool> {
        self.permute(bits, |p| (p % self.columns) * self.rows + p / self.columns)
    }

    // `source` maps an output position within a block to the input position
    // it is read from.
    fn permute(&self, bits: &[bool], source: impl Fn(usize) -> usize) -> Vec<bool> {
        let block = self.block_size();
        if block <= 1 {
            return bits.to_vec();
        }
        let mut output = Vec::with_capacity(bits.len());
        let mut chunks = bits.chunks_exact(block);
        for chunk in &mut chunks {
            for position in 0..block {
                output.push(chunk[source(position)]);
            }
        }
        output.extend_from_slice(chunks.remainder());
        output
    }
}
