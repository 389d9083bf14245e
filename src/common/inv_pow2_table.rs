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

//! Exact negative powers of two.
//!
//! `2^-e` is exactly representable as an f64 for every exponent used by the
//! sketches (e <= 64), so the table is built from raw IEEE-754 bit patterns
//! at compile time rather than carrying 65 decimal literals.

/// `INVERSE_POWERS_OF_2[e] == 2^-e` for `e` in `0..=64`.
pub(crate) static INVERSE_POWERS_OF_2: [f64; 65] = {
    let mut table = [0.0f64; 65];
    let mut e = 0u64;
    while e < 65 {
        // biased exponent of 2^-e, zero mantissa
        table[e as usize] = f64::from_bits((1023 - e) << 52);
        e += 1;
    }
    table
};

#[cfg(test)]
mod tests {
    use super::INVERSE_POWERS_OF_2;

    #[test]
    fn test_table_values() {
        assert_eq!(INVERSE_POWERS_OF_2[0], 1.0);
        assert_eq!(INVERSE_POWERS_OF_2[1], 0.5);
        assert_eq!(INVERSE_POWERS_OF_2[10], 1.0 / 1024.0);
        assert_eq!(INVERSE_POWERS_OF_2[63], 1.0 / (1u64 << 63) as f64);
        assert_eq!(INVERSE_POWERS_OF_2[64], INVERSE_POWERS_OF_2[63] / 2.0);
    }
}
