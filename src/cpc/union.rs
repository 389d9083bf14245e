// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! The union (merge) operation for CPC sketches.
//!
//! A union lives in one of two states. While every input is still sparse it
//! keeps an ordinary sketch as an accumulator and replays the inputs' surprise
//! tables into it. The first denser input (or the accumulator itself
//! graduating past sparse) switches the union over to a plain OR-able bit
//! matrix, which is mathematically a sketch without any of the auxiliary
//! fields.
//!
//! Sources fold into the matrix according to their flavor:
//!
//! - sparse: OR each surprise pair in as a single bit;
//! - hybrid / pinned: OR the sliding window bytes in at the window offset,
//!   then the surprise pairs;
//! - sliding: expand the source to its own full bit matrix first. The
//!   sliding flavor stores some coupons as the *absence* of a pair (the
//!   inverted "early zone"), so its window and table cannot be walked
//!   directly.
//!
//! When an input was built with a smaller lg_k, the union first reduces its
//! own precision to match; row indices of finer inputs are folded with the
//! coarser row mask. [`CpcUnion::to_sketch`] rebuilds a real sketch from the
//! matrix with the merge flag raised, so the result answers through the
//! order-independent ICON estimator.
//!
//! Inputs must share the union's hash seed; like deserialization, the check
//! is made through the 16-bit seed hash and a mismatch surfaces as an
//! [`InvalidData`](crate::error::ErrorKind::InvalidData) error.

use crate::cpc::CpcSketch;
use crate::cpc::DEFAULT_LG_K;
use crate::cpc::Flavor;
use crate::cpc::count_bits_set_in_matrix;
use crate::cpc::determine_correct_offset;
use crate::cpc::pair_table::PairTable;
use crate::error::Error;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::hash::compute_seed_hash;

/// The union (merge) operation for the CPC sketches.
#[derive(Debug, Clone)]
pub struct CpcUnion {
    // immutable config variables
    lg_k: u8,
    seed: u64,
    seed_hash: u16,

    // union state
    state: UnionState,
}

/// At most one representation is live at a time: the sparse accumulator until
/// some input graduates past sparse, the bit matrix afterwards.
#[derive(Debug, Clone)]
enum UnionState {
    Sparse(CpcSketch),
    Dense(BitMatrix),
}

impl Default for CpcUnion {
    fn default() -> Self {
        Self::new(DEFAULT_LG_K)
    }
}

impl CpcUnion {
    /// Creates a new `CpcUnion` with the given `lg_k` and default seed.
    ///
    /// # Panics
    ///
    /// Panics if `lg_k` is not in the range `[4, 26]`.
    pub fn new(lg_k: u8) -> Self {
        Self::with_seed(lg_k, DEFAULT_UPDATE_SEED)
    }

    /// Creates a new `CpcUnion` with the given `lg_k` and `seed`.
    ///
    /// # Panics
    ///
    /// Panics if `lg_k` is not in the range `[4, 26]`, or the computed seed hash is zero.
    pub fn with_seed(lg_k: u8, seed: u64) -> Self {
        let accumulator = CpcSketch::with_seed(lg_k, seed);
        Self {
            lg_k,
            seed,
            seed_hash: compute_seed_hash(seed),
            state: UnionState::Sparse(accumulator),
        }
    }

    /// Return the parameter lg_k.
    ///
    /// Note that due to merging with source sketches that may have a lower value of lg_k, this
    /// value can be less than what the union object was configured with.
    pub fn lg_k(&self) -> u8 {
        self.lg_k
    }

    /// Merge a sketch into this union.
    ///
    /// Fails with an [`InvalidData`](crate::error::ErrorKind::InvalidData)
    /// error when the sketch was built with a different hash seed, detected
    /// through the seed hash exactly as deserialization does.
    pub fn update(&mut self, sketch: &CpcSketch) -> Result<(), Error> {
        if sketch.seed_hash() != self.seed_hash {
            return Err(Error::seed_hash_mismatch(self.seed_hash, sketch.seed_hash()));
        }

        let flavor = sketch.flavor();
        if flavor == Flavor::Empty {
            return Ok(());
        }

        if sketch.lg_k() < self.lg_k {
            self.reduce_k(sketch.lg_k());
        }

        if flavor == Flavor::Sparse {
            self.fold_sparse(sketch);
        } else {
            self.fold_dense(sketch, flavor);
        }
        Ok(())
    }

    /// Replay a sparse source; the accumulator may graduate to a matrix.
    fn fold_sparse(&mut self, sketch: &CpcSketch) {
        match &mut self.state {
            UnionState::Sparse(accumulator) => {
                if accumulator.is_empty() && self.lg_k == sketch.lg_k() {
                    // Adopting the first input avoids replaying its table,
                    // which partially sidesteps the snowplow problem.
                    *accumulator = sketch.clone();
                    return;
                }

                debug_assert!(accumulator.flavor() <= Flavor::Sparse);
                replay_surprise_table(accumulator, sketch.surprising_value_table());
                if accumulator.flavor() > Flavor::Sparse {
                    self.state = UnionState::Dense(BitMatrix::from_sketch(accumulator));
                }
            }
            UnionState::Dense(matrix) => {
                matrix.or_pairs(sketch.surprising_value_table());
            }
        }
    }

    /// Fold a hybrid, pinned or sliding source into the bit matrix,
    /// converting the accumulator first if necessary.
    fn fold_dense(&mut self, sketch: &CpcSketch, flavor: Flavor) {
        if let UnionState::Sparse(accumulator) = &self.state {
            self.state = UnionState::Dense(BitMatrix::from_sketch(accumulator));
        }
        let UnionState::Dense(matrix) = &mut self.state else {
            unreachable!("union must hold a bit matrix for a dense source");
        };

        if flavor == Flavor::Sliding {
            // inverted early-zone logic: expand the source instead of walking it
            matrix.or_matrix(&sketch.build_bit_matrix());
        } else {
            matrix.or_window(sketch);
            matrix.or_pairs(sketch.surprising_value_table());
        }
    }

    /// Reduce the union's precision to match a coarser input.
    fn reduce_k(&mut self, new_lg_k: u8) {
        debug_assert!(new_lg_k < self.lg_k);

        match &mut self.state {
            UnionState::Sparse(accumulator) if accumulator.is_empty() => {
                self.state = UnionState::Sparse(CpcSketch::with_seed(new_lg_k, self.seed));
            }
            UnionState::Sparse(accumulator) => {
                // Replaying into a fresh coarser sketch densifies the coupon
                // set, so the result may land beyond sparse.
                let mut shrunk = CpcSketch::with_seed(new_lg_k, self.seed);
                replay_surprise_table(&mut shrunk, accumulator.surprising_value_table());
                debug_assert!(!shrunk.is_empty());

                self.state = if shrunk.flavor() > Flavor::Sparse {
                    UnionState::Dense(BitMatrix::from_sketch(&shrunk))
                } else {
                    UnionState::Sparse(shrunk)
                };
            }
            UnionState::Dense(matrix) => {
                self.state = UnionState::Dense(matrix.downsampled(new_lg_k));
            }
        }
        self.lg_k = new_lg_k;
    }

    /// Get the union result as a new sketch.
    ///
    /// The result always carries the merge flag, so its estimate comes from
    /// the order-independent ICON estimator.
    ///
    /// # Examples
    ///
    /// ```
    /// # use streamsketch::cpc::CpcUnion;
    /// # use streamsketch::cpc::CpcSketch;
    ///
    /// let mut s1 = CpcSketch::new(12);
    /// s1.update("apple");
    ///
    /// let mut s2 = CpcSketch::new(12);
    /// s2.update("apple");
    /// s2.update("banana");
    ///
    /// let mut union = CpcUnion::new(12);
    /// union.update(&s1).unwrap();
    /// union.update(&s2).unwrap();
    ///
    /// let result = union.to_sketch();
    /// assert_eq!(result.estimate().trunc(), 2.0);
    /// ```
    pub fn to_sketch(&self) -> CpcSketch {
        match &self.state {
            UnionState::Sparse(accumulator) if accumulator.is_empty() => {
                CpcSketch::with_seed(self.lg_k, self.seed)
            }
            UnionState::Sparse(accumulator) => {
                debug_assert_eq!(accumulator.flavor(), Flavor::Sparse);
                let mut sketch = accumulator.clone();
                sketch.merge_flag = true;
                sketch
            }
            UnionState::Dense(matrix) => matrix.to_sketch(self.seed),
        }
    }
}

// testing methods
impl CpcUnion {
    /// Returns the number of coupons in the union.
    ///
    /// This is primarily for testing and validation purposes.
    pub fn num_coupons(&self) -> u32 {
        match &self.state {
            UnionState::Sparse(accumulator) => accumulator.num_coupons,
            UnionState::Dense(matrix) => matrix.num_coupons(),
        }
    }
}

/// One OR-able row of 64 column bits per sketch row.
#[derive(Debug, Clone)]
struct BitMatrix {
    lg_k: u8,
    rows: Vec<u64>,
}

impl BitMatrix {
    fn empty(lg_k: u8) -> Self {
        Self {
            lg_k,
            rows: vec![0; 1 << lg_k],
        }
    }

    fn from_sketch(sketch: &CpcSketch) -> Self {
        Self {
            lg_k: sketch.lg_k(),
            rows: sketch.build_bit_matrix(),
        }
    }

    /// Rows of finer sources fold onto coarser matrices with this mask.
    fn row_mask(&self) -> usize {
        (1usize << self.lg_k) - 1
    }

    fn num_coupons(&self) -> u32 {
        count_bits_set_in_matrix(&self.rows)
    }

    /// OR a sliding window in, placing each byte at the source's offset.
    fn or_window(&mut self, source: &CpcSketch) {
        debug_assert!(self.lg_k <= source.lg_k());
        let mask = self.row_mask();
        let offset = source.window_offset;
        for (row, &byte) in source.sliding_window.iter().enumerate() {
            self.rows[row & mask] |= (byte as u64) << offset;
        }
    }

    /// OR every surprise pair in as a single bit.
    fn or_pairs(&mut self, table: &PairTable) {
        let mask = self.row_mask();
        for &row_col in table.slots() {
            if row_col != u32::MAX {
                let row = (row_col >> 6) as usize;
                self.rows[row & mask] |= 1u64 << (row_col & 63);
            }
        }
    }

    /// OR a full matrix in; the source may be finer than this matrix.
    fn or_matrix(&mut self, source_rows: &[u64]) {
        debug_assert!(source_rows.len() >= self.rows.len());
        let mask = self.row_mask();
        for (row, &bits) in source_rows.iter().enumerate() {
            self.rows[row & mask] |= bits;
        }
    }

    /// A coarser copy of this matrix with rows folded together.
    fn downsampled(&self, new_lg_k: u8) -> BitMatrix {
        debug_assert!(new_lg_k < self.lg_k);
        let mut smaller = BitMatrix::empty(new_lg_k);
        smaller.or_matrix(&self.rows);
        smaller
    }

    /// Rebuild a real sketch from the accumulated matrix.
    ///
    /// The coupon count, window offset, window bytes, surprise table and
    /// first interesting column are all derived from the matrix; the HIP
    /// fields stay at their defaults because the merge flag forces the ICON
    /// estimator anyway.
    fn to_sketch(&self, seed: u64) -> CpcSketch {
        let mut sketch = CpcSketch::with_seed(self.lg_k, seed);
        let num_coupons = self.num_coupons();
        sketch.num_coupons = num_coupons;
        sketch.window_offset = determine_correct_offset(self.lg_k, num_coupons);
        sketch.sliding_window = vec![0u8; self.rows.len()];

        // lg_size = K/16; in some cases this will end up being oversized, but
        // the relative waste is small and it avoids the snowplow effect while
        // the scatter inserts nearly sorted pairs
        let table_lg_size = (self.lg_k - 4).max(2);
        sketch.surprising_value_table = Some(PairTable::new(table_lg_size, 6 + self.lg_k));

        sketch.scatter_bit_matrix(&self.rows);
        sketch.merge_flag = true;
        sketch
    }
}

/// Replays every pair of a surprise table into a sketch.
///
/// Walking the slots of a linear-probing table in order would feed the target
/// runs of adjacent keys (the snowplow effect), so the walk strides through
/// the slots by an odd step near the golden ratio of the table size. Row
/// indices are reduced modulo the target's k, which downsamples finer
/// sources.
fn replay_surprise_table(sketch: &mut CpcSketch, table: &PairTable) {
    let slots = table.slots();
    let num_slots = slots.len() as u32;

    // keeps all 6 column bits, reduces the row to the target's k
    let row_col_mask = (((1u64 << sketch.lg_k()) << 6) - 1) as u32;

    let stride = golden_stride(num_slots);
    let mut probe = 0u32;
    for _ in 0..num_slots {
        probe &= num_slots - 1;
        let row_col = slots[probe as usize];
        if row_col != u32::MAX {
            sketch.row_col_update(row_col & row_col_mask);
        }
        probe += stride;
    }
}

/// An odd stride near the golden ratio of the slot count; odd guarantees the
/// walk visits every slot of the power-of-two table.
fn golden_stride(num_slots: u32) -> u32 {
    let stride = ((0.6180339887498949 * num_slots as f64) as u32) | 1;
    debug_assert!((3..num_slots).contains(&stride));
    stride
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_golden_stride_covers_every_slot() {
        for lg_size in 2..12u32 {
            let num_slots = 1u32 << lg_size;
            let stride = golden_stride(num_slots);
            let mut seen = vec![false; num_slots as usize];
            let mut probe = 0u32;
            for _ in 0..num_slots {
                probe &= num_slots - 1;
                seen[probe as usize] = true;
                probe += stride;
            }
            assert!(seen.iter().all(|&v| v), "stride {stride} missed a slot");
        }
    }

    #[test]
    fn test_downsampled_matrix_folds_rows() {
        let mut matrix = BitMatrix::empty(5);
        matrix.rows[3] = 0b0001;
        matrix.rows[3 + 16] = 0b1000;
        let smaller = matrix.downsampled(4);
        assert_eq!(smaller.rows[3], 0b1001);
        assert_eq!(smaller.num_coupons(), 2);
    }
}
