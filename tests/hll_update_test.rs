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

use googletest::assert_that;
use googletest::prelude::ge;
use googletest::prelude::le;
use googletest::prelude::near;
use streamsketch::common::NumStdDev;
use streamsketch::hll::HllSketch;
use streamsketch::hll::HllType;

#[test]
fn test_empty() {
    let sketch = HllSketch::new(12, HllType::Hll8);
    assert!(sketch.is_empty());
    assert_eq!(sketch.estimate(), 0.0);
}

#[test]
fn test_basic_update() {
    let mut sketch = HllSketch::new(12, HllType::Hll8);

    for i in 0..100 {
        sketch.update(i);
    }

    let estimate = sketch.estimate();
    assert_that!(estimate, near(100.0, 10.0));
    assert_that!(estimate, ge(sketch.lower_bound(NumStdDev::Two)));
    assert_that!(estimate, le(sketch.upper_bound(NumStdDev::Two)));
}

#[test]
fn test_duplicate_handling() {
    let mut sketch = HllSketch::new(12, HllType::Hll8);

    for _ in 0..10 {
        for i in 0..100 {
            sketch.update(i);
        }
    }

    // ~100 unique values, not 1000
    assert_that!(sketch.estimate(), near(100.0, 20.0));
}

#[test]
fn test_estimate_growth_large_stream() {
    // a million distinct values at lg_k = 12 must land within 3 RSE
    let mut sketch = HllSketch::new(12, HllType::Hll8);
    let n = 1_000_000u64;
    for i in 0..n {
        sketch.update(i);
    }

    let estimate = sketch.estimate();
    let hip_rse = 0.8325546 / (4096.0f64).sqrt();
    let tolerance = 3.0 * hip_rse * n as f64;
    assert_that!(estimate, near(n as f64, tolerance));

    assert_that!(estimate, ge(sketch.lower_bound(NumStdDev::Three)));
    assert_that!(estimate, le(sketch.upper_bound(NumStdDev::Three)));
}

#[test]
fn test_estimate_is_monotone_under_updates() {
    let mut sketch = HllSketch::new(10, HllType::Hll8);
    let mut prev = 0.0;
    for i in 0..100_000u64 {
        sketch.update(i);
        if i % 997 == 0 {
            let est = sketch.estimate();
            assert!(est >= prev, "estimate decreased after update {i}");
            prev = est;
        }
    }
}

#[test]
fn test_mode_promotion_sequence() {
    // 100 unique values at lg_config_k = 10 walk the sketch through
    // LIST (up to 8 coupons), SET, and finally the register array
    // the serialized mode byte records the current representation
    fn cur_mode(sketch: &HllSketch) -> u8 {
        sketch.serialize()[7] & 0x3
    }

    let mut sketch4 = HllSketch::new(10, HllType::Hll4);
    let mut sketch8 = HllSketch::new(10, HllType::Hll8);

    let mut observed = Vec::new();
    for i in 1..=100 {
        sketch4.update(i);
        sketch8.update(i);
        let mode = cur_mode(&sketch4);
        if observed.last() != Some(&mode) {
            observed.push(mode);
        }
    }

    assert_eq!(observed, vec![0, 1, 2], "expected LIST -> SET -> HLL");
    assert_eq!(sketch4.target_type(), HllType::Hll4);
    assert_eq!(sketch8.target_type(), HllType::Hll8);

    // the 4-bit array must answer exactly like the 8-bit one: no register
    // can have escaped the nibble range at this cardinality
    assert_eq!(sketch4.estimate().to_bits(), sketch8.estimate().to_bits());
}

#[test]
fn test_all_types_agree_in_hip_mode() {
    let mut sketch4 = HllSketch::new(11, HllType::Hll4);
    let mut sketch6 = HllSketch::new(11, HllType::Hll6);
    let mut sketch8 = HllSketch::new(11, HllType::Hll8);

    for i in 0..50_000u64 {
        sketch4.update(i);
        sketch6.update(i);
        sketch8.update(i);
    }

    // identical update sequences drive identical estimator transitions
    assert_eq!(sketch6.estimate().to_bits(), sketch8.estimate().to_bits());
    assert_eq!(sketch4.estimate().to_bits(), sketch8.estimate().to_bits());
}

#[test]
fn test_small_lg_k_promotes_straight_to_array() {
    // below lg_config_k = 8 the list promotes directly to the array
    let mut sketch = HllSketch::new(6, HllType::Hll8);
    for i in 0..100 {
        sketch.update(i);
    }
    assert_eq!(sketch.target_type(), HllType::Hll8);
    assert!(sketch.estimate() > 50.0);
}

#[test]
fn test_bounds_straddle_estimate_across_lg_k() {
    for lg_k in [4u8, 8, 12, 14] {
        let mut sketch = HllSketch::new(lg_k, HllType::Hll8);
        for i in 0..10_000 {
            sketch.update(i);
        }
        let est = sketch.estimate();
        assert!(sketch.lower_bound(NumStdDev::One) <= est, "lg_k = {lg_k}");
        assert!(sketch.upper_bound(NumStdDev::One) >= est, "lg_k = {lg_k}");
    }
}

#[test]
#[should_panic(expected = "lg_config_k must be in")]
fn test_lg_k_out_of_range() {
    let _ = HllSketch::new(22, HllType::Hll8);
}
