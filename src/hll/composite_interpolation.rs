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

//! Per-lg_k x-arrays for the composite estimator.
//!
//! The composite estimator maps a raw HLL estimate back to a cardinality by
//! interpolating against a table of expected raw estimates: entry i is the
//! expected value of `alpha * k^2 / sum(2^-register)` when the true
//! cardinality is `i * y_stride`. The register value distribution has a
//! closed form, so each table is computed on first use for its lg_k and
//! cached for the process lifetime.

use std::sync::OnceLock;

use crate::common::inv_pow2_table::INVERSE_POWERS_OF_2;
use crate::hll::MAX_LG_K;
use crate::hll::MIN_LG_K;

/// Number of interpolation points per table.
pub(super) const X_ARR_LEN: usize = 40;

/// Cardinality step between successive interpolation points.
pub(super) fn y_stride(lg_k: u8) -> u64 {
    ((1u64 << lg_k) / 8).max(2)
}

/// The x-array for the given lg_k, built on first use.
pub(super) fn x_arr(lg_k: u8) -> &'static [f64] {
    const NUM_TABLES: usize = (MAX_LG_K - MIN_LG_K + 1) as usize;
    static TABLES: [OnceLock<Box<[f64]>>; NUM_TABLES] = [const { OnceLock::new() }; NUM_TABLES];

    TABLES[(lg_k - MIN_LG_K) as usize].get_or_init(|| compute_x_arr(lg_k))
}

/// HLL bias correction factor for the raw estimate.
pub(super) fn correction_factor(lg_k: u8) -> f64 {
    let k = (1u64 << lg_k) as f64;
    match lg_k {
        4 => 0.673,
        5 => 0.697,
        6 => 0.709,
        _ => 0.7213 / (1.0 + 1.079 / k),
    }
}

fn compute_x_arr(lg_k: u8) -> Box<[f64]> {
    let k = (1u64 << lg_k) as f64;
    let alpha = correction_factor(lg_k);
    let stride = y_stride(lg_k);

    (0..X_ARR_LEN)
        .map(|i| {
            let n = (i as u64 * stride) as f64;
            // expected raw estimate at cardinality n
            alpha * k / expected_inverse_register(k, n)
        })
        .collect()
}

/// Expected value of `2^-V` for one register after n distinct updates.
///
/// An update deposits value w >= 1 into a given register with probability
/// `2^-(w-1) / k`, so `P(V <= v) = (1 - 2^-v / k)^n`, with the register value
/// capped at 63.
fn expected_inverse_register(k: f64, n: f64) -> f64 {
    if n == 0.0 {
        return 1.0;
    }

    // cdf(v) = P(V <= v)
    let cdf = |v: usize| (n * (-INVERSE_POWERS_OF_2[v] / k).ln_1p()).exp();

    let mut mean = cdf(0); // P(V = 0) contributes 2^0
    let mut below = cdf(0);
    for v in 1..63 {
        let at_most = cdf(v);
        mean += INVERSE_POWERS_OF_2[v] * (at_most - below);
        below = at_most;
    }
    mean += INVERSE_POWERS_OF_2[63] * (1.0 - below);
    mean
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_x_arr_starts_at_alpha_k() {
        for lg_k in [4u8, 10, 12, 21] {
            let k = (1u64 << lg_k) as f64;
            let x = x_arr(lg_k);
            assert_eq!(x.len(), X_ARR_LEN);
            assert!((x[0] - correction_factor(lg_k) * k).abs() < 1e-9);
        }
    }

    #[test]
    fn test_x_arr_strictly_increasing() {
        for lg_k in [4u8, 8, 12] {
            let x = x_arr(lg_k);
            for window in x.windows(2) {
                assert!(window[0] < window[1], "x-array not increasing for {lg_k}");
            }
        }
    }

    #[test]
    fn test_expected_inverse_register_decreases_with_n() {
        let k = 4096.0;
        let mut prev = expected_inverse_register(k, 0.0);
        for n in [100.0, 1000.0, 10000.0, 100000.0] {
            let mean = expected_inverse_register(k, n);
            assert!(mean < prev);
            prev = mean;
        }
    }
}
