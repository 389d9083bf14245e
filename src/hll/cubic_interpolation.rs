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

//! Cubic interpolation utilities for cardinality estimation
//!
//! Implements Lagrange cubic interpolation over lookup tables to provide
//! smooth, accurate cardinality estimates from discrete observations. Also
//! hosts the X/Y coupon-count mapping used by the small-range containers.

/// X values (coupon counts) for the coupon interpolation table
pub(super) static COUPON_X_ARR: [f64; 40] = [
    0.0, 1.0, 20.0, 400.0, 8000.0, 160000.0, 300000.0, 600000.0, 900000.0, 1200000.0, 1500000.0,
    1800000.0, 2100000.0, 2400000.0, 2700000.0, 3000000.0, 3300000.0, 3600000.0, 3900000.0,
    4200000.0, 4500000.0, 4800000.0, 5100000.0, 5400000.0, 5700000.0, 6000000.0, 6300000.0,
    6600000.0, 6900000.0, 7200000.0, 7500000.0, 7800000.0, 8100000.0, 8400000.0, 8700000.0,
    9000000.0, 9300000.0, 9600000.0, 9900000.0, 10200000.0,
];

/// Y values (estimated cardinalities) for the coupon interpolation table
pub(super) static COUPON_Y_ARR: [f64; 40] = [
    0.0000000000000000,
    1.0000000000000000,
    20.000_000_943_740_26,
    400.000_396_371_338_4,
    8_000.158_929_460_209,
    160_063.606_776_375_96,
    300_223.707_159_766_35,
    600_895.593_385_617,
    902_016.806_512_095_5,
    1_203_588.498_319_951,
    1_505_611.824_552_474_3,
    1_808_087.944_931_906_6,
    2_111_018.023_175_935_3,
    2_414_403.227_014_25,
    2_718_244.728_205_189,
    3_022_543.702_552_454,
    3_327_301.329_921_909,
    3_632_518.794_258_454,
    3_938_197.283_602_969,
    4_244_337.990_109_356,
    4_550_942.110_061_649,
    4_858_010.843_891_189,
    5_165_545.396_193_897,
    5_473_546.975_747_645,
    5_782_016.795_529_650_5,
    6_090_956.072_734_016,
    6_400_366.028_789_296,
    6_710_247.889_376_201,
    7_020_602.884_445_314,
    7_331_432.248_234_972,
    7_642_737.219_289_148,
    7_954_519.040_475_476_5,
    8_266_778.959_003_342,
    8_579_518.226_442_046,
    8_892_738.098_739_047,
    9_206_439.836_238_328,
    9_520_624.703_698_829,
    9_835_293.970_312_92,
    10_150_448.909_725_029,
    10_466_090.800_050_326,
];

/// Interpolate Y value from X using pre-computed X/Y tables
pub(super) fn using_x_and_y_tables(x_arr: &[f64], y_arr: &[f64], x: f64) -> f64 {
    debug_assert!(x_arr.len() >= 4 && x_arr.len() == y_arr.len());

    let last_idx = x_arr.len() - 1;
    debug_assert!(x >= x_arr[0] && x <= x_arr[last_idx]);

    if x == x_arr[last_idx] {
        return y_arr[last_idx]; // corner case
    }

    let offset = find_straddle(x_arr, x);
    debug_assert!(offset < last_idx);

    // Select 4-point window based on position in array
    if offset == 0 {
        return interpolate_using_x_and_y_tables(x_arr, y_arr, offset, x);
    }

    if offset == last_idx - 1 {
        return interpolate_using_x_and_y_tables(x_arr, y_arr, offset - 2, x);
    }

    interpolate_using_x_and_y_tables(x_arr, y_arr, offset - 1, x)
}

/// Helper to perform cubic interpolation at offset using X/Y tables
fn interpolate_using_x_and_y_tables(x_arr: &[f64], y_arr: &[f64], offset: usize, x: f64) -> f64 {
    cubic_interpolate(
        x_arr[offset],
        y_arr[offset],
        x_arr[offset + 1],
        y_arr[offset + 1],
        x_arr[offset + 2],
        y_arr[offset + 2],
        x_arr[offset + 3],
        y_arr[offset + 3],
        x,
    )
}

/// Interpolate Y value from X using an X array and uniform Y stride
pub(super) fn using_x_arr_and_y_stride(x_arr: &[f64], y_stride: f64, x: f64) -> f64 {
    let len = x_arr.len();
    debug_assert!(len >= 4);

    let last_idx = len - 1;
    debug_assert!(x >= x_arr[0] && x <= x_arr[last_idx]);

    if x == x_arr[last_idx] {
        // corner case
        return y_stride * (last_idx as f64);
    }

    let offset = find_straddle(x_arr, x);
    let len_m2 = len - 2;
    debug_assert!(offset <= len_m2);

    if offset == 0 {
        // corner case
        return interpolate_using_x_arr_and_y_stride(x_arr, y_stride, offset, x);
    } else if offset == len_m2 {
        // corner case: offset - 2
        return interpolate_using_x_arr_and_y_stride(x_arr, y_stride, offset - 2, x);
    }

    // main case: offset - 1
    interpolate_using_x_arr_and_y_stride(x_arr, y_stride, offset - 1, x)
}

fn interpolate_using_x_arr_and_y_stride(
    x_arr: &[f64],
    y_stride: f64,
    offset: usize,
    x: f64,
) -> f64 {
    cubic_interpolate(
        x_arr[offset],
        y_stride * offset as f64,
        x_arr[offset + 1],
        y_stride * (offset + 1) as f64,
        x_arr[offset + 2],
        y_stride * (offset + 2) as f64,
        x_arr[offset + 3],
        y_stride * (offset + 3) as f64,
        x,
    )
}

/// Cubic interpolation using the Lagrange interpolation formula.
#[allow(clippy::too_many_arguments)]
fn cubic_interpolate(
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    x3: f64,
    y3: f64,
    x: f64,
) -> f64 {
    let l0_numerator = (x - x1) * (x - x2) * (x - x3);
    let l1_numerator = (x - x0) * (x - x2) * (x - x3);
    let l2_numerator = (x - x0) * (x - x1) * (x - x3);
    let l3_numerator = (x - x0) * (x - x1) * (x - x2);

    let l0_denominator = (x0 - x1) * (x0 - x2) * (x0 - x3);
    let l1_denominator = (x1 - x0) * (x1 - x2) * (x1 - x3);
    let l2_denominator = (x2 - x0) * (x2 - x1) * (x2 - x3);
    let l3_denominator = (x3 - x0) * (x3 - x1) * (x3 - x2);

    let term0 = y0 * l0_numerator / l0_denominator;
    let term1 = y1 * l1_numerator / l1_denominator;
    let term2 = y2 * l2_numerator / l2_denominator;
    let term3 = y3 * l3_numerator / l3_denominator;

    term0 + term1 + term2 + term3
}

/// Find index `i` such that x_arr[i] <= x < x_arr[i+1].
fn find_straddle(x_arr: &[f64], x: f64) -> usize {
    debug_assert!(x_arr.len() >= 2);
    let last_idx = x_arr.len() - 1;
    debug_assert!(x >= x_arr[0] && x <= x_arr[last_idx]);

    recursive_find_straddle(x_arr, 0, last_idx, x)
}

/// Recursive helper for `find_straddle`.
fn recursive_find_straddle(x_arr: &[f64], left: usize, right: usize, x: f64) -> usize {
    debug_assert!(left < right);
    debug_assert!(x_arr[left] <= x && x < x_arr[right]); // invariant

    if left + 1 == right {
        return left;
    }

    let middle = left + (right - left) / 2;

    if x_arr[middle] <= x {
        recursive_find_straddle(x_arr, middle, right, x)
    } else {
        recursive_find_straddle(x_arr, left, middle, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolation_hits_table_points() {
        for (i, &x) in COUPON_X_ARR.iter().enumerate() {
            let y = using_x_and_y_tables(&COUPON_X_ARR, &COUPON_Y_ARR, x);
            assert!(
                (y - COUPON_Y_ARR[i]).abs() < 1e-6,
                "table point {i} not reproduced: {y} vs {}",
                COUPON_Y_ARR[i]
            );
        }
    }

    #[test]
    fn test_interpolation_is_monotone_between_points() {
        let mut prev = -1.0;
        for i in 0..2000 {
            let x = i as f64;
            let y = using_x_and_y_tables(&COUPON_X_ARR, &COUPON_Y_ARR, x);
            assert!(y >= prev, "interpolation dipped at x = {x}");
            prev = y;
        }
    }
}
