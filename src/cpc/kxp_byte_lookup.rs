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

//! Per-byte partial sums for recomputing the KXP register from a bit matrix.
//!
//! `KXP_BYTE_TABLE[b]` is the sum of `2^-(col+1)` over the ZERO bits of `b`
//! (note the inverted logic): a row whose 64 bits are all zero contributes
//! almost exactly 1.0, matching the initial value `kxp = k`.

/// `KXP_BYTE_TABLE[b] = Σ 2^-(col+1)` over columns `col` where bit `col` of `b` is 0.
pub(super) static KXP_BYTE_TABLE: [f64; 256] = {
    let mut table = [0.0f64; 256];
    let mut byte = 0usize;
    while byte < 256 {
        let mut sum = 0.0;
        let mut col = 0u64;
        while col < 8 {
            if byte & (1 << col) == 0 {
                // 2^-(col+1) from its exact bit pattern
                sum += f64::from_bits((1023 - (col + 1)) << 52);
            }
            col += 1;
        }
        table[byte] = sum;
        byte += 1;
    }
    table
};

#[cfg(test)]
mod tests {
    use super::KXP_BYTE_TABLE;

    #[test]
    fn test_empty_byte_is_nearly_one() {
        // all eight bits unset: 1/2 + 1/4 + ... + 1/256
        assert_eq!(KXP_BYTE_TABLE[0], 1.0 - 1.0 / 256.0);
    }

    #[test]
    fn test_full_byte_is_zero() {
        assert_eq!(KXP_BYTE_TABLE[0xFF], 0.0);
    }

    #[test]
    fn test_single_bit() {
        // bit 0 set removes the 1/2 contribution
        assert_eq!(KXP_BYTE_TABLE[1], KXP_BYTE_TABLE[0] - 0.5);
    }
}
