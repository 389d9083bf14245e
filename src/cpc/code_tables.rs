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

//! Process-global code tables for CPC compression.
//!
//! The compressor uses two kinds of prefix codes, both limited to 12-bit
//! codewords so the decoder can work from a single 12-bit peek:
//!
//! - one byte code per pseudo-phase (22 tables) for the sliding-window stream,
//!   built over a phase-dependent model of window-byte frequencies;
//! - one 65-symbol length-limited unary code for the column deltas of the
//!   surprising-value pairs.
//!
//! Codewords are emitted least-significant-bit first, matching the bit buffer
//! in the compressor. Encode entries are `(len << 12) | code`; decode entries
//! are `(len << 8) | symbol`, one per possible 12-bit peek value.
//!
//! The sliding flavor additionally permutes the 56 canonical column positions
//! with a per-phase rotation before delta coding; the inverse permutations are
//! built alongside.
//!
//! All tables are constructed exactly once, on first use, behind a `LazyLock`.
//! Construction uses integer weights and plain arithmetic only, so the tables
//! are identical on every IEEE-754 platform.

use std::collections::VecDeque;
use std::sync::LazyLock;

/// Codeword length limit; the decoder peeks this many bits at a time.
pub(super) const MAX_CODE_BITS: u8 = 12;

/// Number of window-byte code tables: 16 steady-state phases plus 6 mid-range
/// tables used before the sliding window reaches its steady state.
pub(super) const NUM_PHASE_TABLES: usize = 22;

/// Number of column permutations, one per steady-state phase.
pub(super) const NUM_COLUMN_PERMUTATIONS: usize = 16;

/// Number of canonical column positions in the sliding flavor.
pub(super) const NUM_CANONICAL_COLUMNS: usize = 56;

/// A canonical, length-limited prefix code over a small alphabet.
pub(super) struct PrefixCode {
    /// Per symbol: `(len << 12) | code`, code stored LSB-first.
    encode: Box<[u16]>,
    /// Per 12-bit peek: `(len << 8) | symbol`.
    decode: Box<[u16]>,
}

impl PrefixCode {
    /// Returns the `(len << 12) | code` entry for a symbol.
    #[inline]
    pub fn encode_entry(&self, symbol: usize) -> u16 {
        self.encode[symbol]
    }

    /// Returns the `(len << 8) | symbol` entry for a 12-bit peek.
    #[inline]
    pub fn decode_entry(&self, peek12: usize) -> u16 {
        self.decode[peek12]
    }

    /// Builds the canonical code for the given positive symbol weights.
    fn from_weights(weights: &[u64]) -> Self {
        let n = weights.len();
        debug_assert!(n >= 2 && n <= (1 << MAX_CODE_BITS));

        let lens = limited_code_lengths(weights, MAX_CODE_BITS);

        // canonical assignment: symbols ordered by (length, symbol index)
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by_key(|&sym| (lens[sym], sym));

        let mut encode = vec![0u16; n].into_boxed_slice();
        let mut decode = vec![0u16; 1 << MAX_CODE_BITS].into_boxed_slice();

        let mut code: u32 = 0;
        let mut prev_len: u8 = 0;
        for &sym in &order {
            let len = lens[sym];
            code <<= len - prev_len;
            prev_len = len;

            let lsb_first = code.reverse_bits() >> (32 - len);
            encode[sym] = ((len as u16) << 12) | (lsb_first as u16);

            // every peek whose low `len` bits equal the codeword decodes to sym
            let step = 1usize << len;
            let mut peek = lsb_first as usize;
            while peek < decode.len() {
                decode[peek] = ((len as u16) << 8) | (sym as u16);
                peek += step;
            }

            code += 1;
        }

        Self { encode, decode }
    }
}

/// Optimal code lengths for the weights, then restricted to `max_len` bits.
///
/// Clamping over-long codes makes the Kraft sum exceed unity; the standard
/// fix-up walks codes from shallower levels down until the sum is exactly one
/// again, so the resulting code is complete and the decode table has no holes.
fn limited_code_lengths(weights: &[u64], max_len: u8) -> Vec<u8> {
    let n = weights.len();
    let max = max_len as usize;

    let mut counts = vec![0u32; max + 1];
    for len in huffman_lengths(weights) {
        counts[(len as usize).min(max)] += 1;
    }

    let cap = 1u64 << max;
    let mut total: u64 = 0;
    for len in 1..=max {
        total += (counts[len] as u64) << (max - len);
    }
    while total > cap {
        debug_assert!(counts[max] > 0);
        counts[max] -= 1;
        for len in (1..max).rev() {
            if counts[len] > 0 {
                counts[len] -= 1;
                counts[len + 1] += 2;
                break;
            }
        }
        total -= 1;
    }

    // hand the shortest lengths to the heaviest symbols
    let mut by_weight: Vec<usize> = (0..n).collect();
    by_weight.sort_by(|&a, &b| weights[b].cmp(&weights[a]).then(a.cmp(&b)));

    let mut lens = vec![0u8; n];
    let mut len = 1usize;
    for &sym in &by_weight {
        while counts[len] == 0 {
            len += 1;
        }
        counts[len] -= 1;
        lens[sym] = len as u8;
    }
    lens
}

/// Unrestricted Huffman code lengths via the two-queue method.
fn huffman_lengths(weights: &[u64]) -> Vec<u8> {
    let n = weights.len();
    debug_assert!(n >= 2);

    const NO_PARENT: usize = usize::MAX;
    let mut node_weights: Vec<u64> = weights.to_vec();
    let mut parents: Vec<usize> = vec![NO_PARENT; n];

    let mut leaves: Vec<usize> = (0..n).collect();
    leaves.sort_by(|&a, &b| weights[a].cmp(&weights[b]).then(a.cmp(&b)));
    let mut leaves: VecDeque<usize> = leaves.into();

    // internal nodes are created with non-decreasing weights
    let mut internals: VecDeque<usize> = VecDeque::new();

    fn pop_min(
        node_weights: &[u64],
        leaves: &mut VecDeque<usize>,
        internals: &mut VecDeque<usize>,
    ) -> usize {
        match (leaves.front(), internals.front()) {
            (Some(&leaf), Some(&internal)) => {
                if node_weights[leaf] <= node_weights[internal] {
                    leaves.pop_front().unwrap()
                } else {
                    internals.pop_front().unwrap()
                }
            }
            (Some(_), None) => leaves.pop_front().unwrap(),
            (None, Some(_)) => internals.pop_front().unwrap(),
            (None, None) => unreachable!("both queues exhausted before the tree was complete"),
        }
    }

    for _ in 0..n - 1 {
        let a = pop_min(&node_weights, &mut leaves, &mut internals);
        let b = pop_min(&node_weights, &mut leaves, &mut internals);
        let merged = node_weights.len();
        node_weights.push(node_weights[a] + node_weights[b]);
        parents.push(NO_PARENT);
        parents[a] = merged;
        parents[b] = merged;
        internals.push_back(merged);
    }

    (0..n)
        .map(|leaf| {
            let mut depth = 0u8;
            let mut node = leaf;
            while parents[node] != NO_PARENT {
                node = parents[node];
                depth += 1;
            }
            depth
        })
        .collect()
}

/// Window occupancy (C/K position) modeled by each phase table.
///
/// Steady-state phases 0..16 span one doubling of C/K; the six mid-range
/// tables cover the approach from the hybrid threshold up to steady state.
fn phase_occupancy(phase: usize) -> f64 {
    const MID_RANGE_OCCUPANCY: [f64; 6] = [0.09375, 0.375, 0.75, 1.1, 1.5, 1.966];
    if phase < 16 {
        1.0 + (phase as f64) / 16.0
    } else {
        MID_RANGE_OCCUPANCY[phase - 16]
    }
}

/// Integer frequency model for window bytes at the given phase.
///
/// Bit j of a window byte is set when a coupon reached column offset+j; its
/// occupancy decays roughly geometrically with j. The per-bit probability is
/// the rational function f/(f + 2^j), avoiding any libm calls so the weights
/// are bit-identical everywhere.
fn window_byte_weights(phase: usize) -> Vec<u64> {
    let f = phase_occupancy(phase);
    let mut bit_prob = [0.0f64; 8];
    for (j, p) in bit_prob.iter_mut().enumerate() {
        *p = f / (f + (1u64 << j) as f64);
    }

    (0usize..256)
        .map(|byte| {
            let mut p = 1.0f64;
            for (j, &q) in bit_prob.iter().enumerate() {
                p *= if byte & (1 << j) != 0 { q } else { 1.0 - q };
            }
            (p * (1u64 << 24) as f64) as u64 + 1
        })
        .collect()
}

/// Geometric weights for the 65 column deltas of the pair coder.
///
/// Huffman over strictly halving weights degenerates to a unary code, which
/// the 12-bit restriction then truncates: the classic length-limited unary
/// code.
fn x_delta_weights() -> Vec<u64> {
    (0u32..65)
        .map(|x| if x < 40 { 1u64 << (40 - x) } else { 1 })
        .collect()
}

/// The lazily-built process-global table set.
pub(super) struct CodeTables {
    byte_codes: Vec<PrefixCode>,
    pair_code: PrefixCode,
    perm_encode: [[u8; NUM_CANONICAL_COLUMNS]; NUM_COLUMN_PERMUTATIONS],
    perm_decode: [[u8; NUM_CANONICAL_COLUMNS]; NUM_COLUMN_PERMUTATIONS],
}

impl CodeTables {
    /// Returns the global tables, constructing them on first use.
    pub fn get() -> &'static CodeTables {
        static TABLES: LazyLock<CodeTables> = LazyLock::new(CodeTables::build);
        &TABLES
    }

    fn build() -> Self {
        let byte_codes = (0..NUM_PHASE_TABLES)
            .map(|phase| PrefixCode::from_weights(&window_byte_weights(phase)))
            .collect();
        let pair_code = PrefixCode::from_weights(&x_delta_weights());

        let mut perm_encode = [[0u8; NUM_CANONICAL_COLUMNS]; NUM_COLUMN_PERMUTATIONS];
        let mut perm_decode = [[0u8; NUM_CANONICAL_COLUMNS]; NUM_COLUMN_PERMUTATIONS];
        for phase in 0..NUM_COLUMN_PERMUTATIONS {
            let shift = (7 * phase) % NUM_CANONICAL_COLUMNS;
            for col in 0..NUM_CANONICAL_COLUMNS {
                let mapped = (col + shift) % NUM_CANONICAL_COLUMNS;
                perm_encode[phase][col] = mapped as u8;
                perm_decode[phase][mapped] = col as u8;
            }
        }

        Self {
            byte_codes,
            pair_code,
            perm_encode,
            perm_decode,
        }
    }

    /// The window-byte code for a pseudo-phase in `0..NUM_PHASE_TABLES`.
    pub fn byte_code(&self, pseudo_phase: u8) -> &PrefixCode {
        &self.byte_codes[pseudo_phase as usize]
    }

    /// The 65-symbol length-limited unary code for pair column deltas.
    pub fn pair_code(&self) -> &PrefixCode {
        &self.pair_code
    }

    /// The encoding column permutation for a steady-state phase in `0..16`.
    pub fn column_permutation(&self, phase: u8) -> &[u8; NUM_CANONICAL_COLUMNS] {
        &self.perm_encode[phase as usize]
    }

    /// The inverse of [`Self::column_permutation`].
    pub fn inverse_column_permutation(&self, phase: u8) -> &[u8; NUM_CANONICAL_COLUMNS] {
        &self.perm_decode[phase as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_complete_prefix_code(code: &PrefixCode, num_symbols: usize) {
        // Kraft sum must be exactly one
        let mut kraft: u64 = 0;
        for sym in 0..num_symbols {
            let entry = code.encode_entry(sym);
            let len = (entry >> 12) as u32;
            assert!((1..=MAX_CODE_BITS as u32).contains(&len), "bad length {len}");
            kraft += 1u64 << (MAX_CODE_BITS as u32 - len);
        }
        assert_eq!(kraft, 1 << MAX_CODE_BITS);

        // every peek decodes to the symbol that encoded it
        for sym in 0..num_symbols {
            let entry = code.encode_entry(sym);
            let len = (entry >> 12) as usize;
            let codeword = (entry & 0xFFF) as usize;
            for high in 0..(1usize << (MAX_CODE_BITS as usize - len)) {
                let peek = (high << len) | codeword;
                let decoded = code.decode_entry(peek);
                assert_eq!((decoded >> 8) as usize, len);
                assert_eq!((decoded & 0xFF) as usize, sym);
            }
        }
    }

    #[test]
    fn test_pair_code_round_trips() {
        check_complete_prefix_code(CodeTables::get().pair_code(), 65);
    }

    #[test]
    fn test_all_byte_codes_round_trip() {
        for phase in 0..NUM_PHASE_TABLES {
            check_complete_prefix_code(CodeTables::get().byte_code(phase as u8), 256);
        }
    }

    #[test]
    fn test_pair_code_is_unary_for_small_deltas() {
        let code = CodeTables::get().pair_code();
        for x in 0..6usize {
            let len = (code.encode_entry(x) >> 12) as usize;
            assert_eq!(len, x + 1, "delta {x} is not unary coded");
        }
    }

    #[test]
    fn test_zero_byte_gets_a_short_code() {
        // at low occupancy the all-zeros window byte dominates
        let code = CodeTables::get().byte_code(16);
        let len = (code.encode_entry(0) >> 12) as u16;
        assert!(len <= 2, "all-zeros byte code length is {len}");
    }

    #[test]
    fn test_permutations_invert() {
        let tables = CodeTables::get();
        for phase in 0..NUM_COLUMN_PERMUTATIONS as u8 {
            let enc = tables.column_permutation(phase);
            let dec = tables.inverse_column_permutation(phase);
            for col in 0..NUM_CANONICAL_COLUMNS {
                assert_eq!(dec[enc[col] as usize] as usize, col);
            }
        }
    }
}
