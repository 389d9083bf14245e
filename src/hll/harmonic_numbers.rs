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

//! Harmonic number calculations for the linear counting estimator.

const NUM_EXACT: usize = 25;
const EULER_MASCHERONI: f64 = 0.577_215_664_901_532_9;

/// Exact harmonic numbers H(n) for n = 0..24
static EXACT_HARMONIC: [f64; NUM_EXACT] = [
    0.0,                        // H(0)
    1.0,                        // H(1)
    1.5,                        // H(2)
    11.0 / 6.0,                 // H(3)
    25.0 / 12.0,                // H(4)
    137.0 / 60.0,               // H(5)
    49.0 / 20.0,                // H(6)
    363.0 / 140.0,              // H(7)
    761.0 / 280.0,              // H(8)
    7129.0 / 2520.0,            // H(9)
    7381.0 / 2520.0,            // H(10)
    83711.0 / 27720.0,          // H(11)
    86021.0 / 27720.0,          // H(12)
    1145993.0 / 360360.0,       // H(13)
    1171733.0 / 360360.0,       // H(14)
    1195757.0 / 360360.0,       // H(15)
    2436559.0 / 720720.0,       // H(16)
    42142223.0 / 12252240.0,    // H(17)
    14274301.0 / 4084080.0,     // H(18)
    275295799.0 / 77597520.0,   // H(19)
    55835135.0 / 15519504.0,    // H(20)
    18858053.0 / 5173168.0,     // H(21)
    19093197.0 / 5173168.0,     // H(22)
    444316699.0 / 118982864.0,  // H(23)
    1347822955.0 / 356948592.0, // H(24)
];

/// Compute the n-th harmonic number H(n) = 1 + 1/2 + 1/3 + ... + 1/n
///
/// Uses the exact table for small n, asymptotic expansion for large n.
fn harmonic_number(n: usize) -> f64 {
    if n < NUM_EXACT {
        return EXACT_HARMONIC[n];
    }

    let x = n as f64;
    let inv_sq = 1.0 / (x * x);
    let mut sum = x.ln() + EULER_MASCHERONI + (1.0 / (2.0 * x));

    // asymptotic expansion (appropriate for n >= 25)
    let mut pow = inv_sq; // n^-2
    sum -= pow * (1.0 / 12.0);

    pow *= inv_sq; // n^-4
    sum += pow * (1.0 / 120.0);

    pow *= inv_sq; // n^-6
    sum -= pow * (1.0 / 252.0);

    pow *= inv_sq; // n^-8
    sum += pow * (1.0 / 240.0);

    sum
}

/// Bitmap estimator for flat random-access bit vectors.
///
/// This is the coupon-collector estimate used for linear counting in the HLL
/// composite estimator: with `num_bits_set` of `bit_vector_length` buckets
/// hit, the expected number of balls thrown is `k * (H(k) - H(k - hits))`.
pub(super) fn bitmap_estimate(bit_vector_length: u32, num_bits_set: u32) -> f64 {
    let k = bit_vector_length;
    let num_set = num_bits_set;

    let h_k = harmonic_number(k as usize);
    let h_diff = harmonic_number((k - num_set) as usize);

    (k as f64) * (h_k - h_diff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_harmonic_numbers() {
        assert!((harmonic_number(1) - 1.0).abs() < 1e-10);
        assert!((harmonic_number(2) - 1.5).abs() < 1e-10);
        assert!((harmonic_number(3) - 11.0 / 6.0).abs() < 1e-10);

        let expected: f64 = (1..=10).map(|i| 1.0 / i as f64).sum();
        assert!((harmonic_number(10) - expected).abs() < 1e-10);
    }

    #[test]
    fn test_asymptotic_continues_exact_table() {
        // H(25) from the expansion vs direct summation
        let direct: f64 = (1..=25).map(|i| 1.0 / i as f64).sum();
        assert!((harmonic_number(25) - direct).abs() < 1e-9);
    }

    #[test]
    fn test_bitmap_estimate_empty() {
        assert!(bitmap_estimate(1024, 0).abs() < 1e-6);
    }

    #[test]
    fn test_bitmap_estimate_grows_with_hits() {
        let k = 1024;
        let mut prev = 0.0;
        for hits in [1, 16, 256, 512, 1000, 1024] {
            let est = bitmap_estimate(k, hits);
            assert!(est > prev, "estimate not increasing at {hits} hits");
            prev = est;
        }
    }
}
