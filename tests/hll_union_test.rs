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
use googletest::prelude::near;
use streamsketch::hll::HllSketch;
use streamsketch::hll::HllType;
use streamsketch::hll::HllUnion;

#[test]
fn test_empty_union() {
    let union = HllUnion::new(12);
    assert!(union.is_empty());
    assert_eq!(union.estimate(), 0.0);

    let result = union.get_result(HllType::Hll8);
    assert!(result.is_empty());
}

#[test]
fn test_union_of_two_small_sketches() {
    let mut left = HllSketch::new(10, HllType::Hll8);
    let mut right = HllSketch::new(10, HllType::Hll8);
    left.update("apple");
    right.update("banana");

    let mut union = HllUnion::new(10);
    union.update(&left);
    union.update(&right);

    let result = union.get_result(HllType::Hll8);
    assert!(result.estimate() >= 2.0);
}

#[test]
fn test_union_of_overlapping_streams() {
    let mut a = HllSketch::new(12, HllType::Hll8);
    let mut b = HllSketch::new(12, HllType::Hll8);
    for i in 0..60_000u64 {
        a.update(i);
        b.update(i + 30_000);
    }

    let mut union = HllUnion::new(12);
    union.update(&a);
    union.update(&b);

    // 90k distinct values across the two streams
    assert_that!(union.estimate(), near(90_000.0, 0.05 * 90_000.0));

    // the union can never fall below either input
    let floor = a.estimate().max(b.estimate()) * 0.95;
    assert!(union.estimate() >= floor);
}

#[test]
fn test_union_mixed_modes_and_types() {
    let mut list_sketch = HllSketch::new(11, HllType::Hll4);
    for i in 0..5u64 {
        list_sketch.update(i);
    }

    let mut set_sketch = HllSketch::new(11, HllType::Hll6);
    for i in 5..200u64 {
        set_sketch.update(i);
    }

    let mut array_sketch = HllSketch::new(11, HllType::Hll8);
    for i in 200..50_000u64 {
        array_sketch.update(i);
    }

    let mut union = HllUnion::new(11);
    union.update(&list_sketch);
    union.update(&set_sketch);
    union.update(&array_sketch);

    assert_that!(union.estimate(), near(50_000.0, 0.08 * 50_000.0));
}

#[test]
fn test_union_downsamples_mismatched_lg_k() {
    let mut fine = HllSketch::new(14, HllType::Hll8);
    let mut coarse = HllSketch::new(10, HllType::Hll8);
    for i in 0..40_000u64 {
        fine.update(i);
        coarse.update(i + 20_000);
    }

    let mut union = HllUnion::new(14);
    union.update(&fine);
    union.update(&coarse);

    // the union adopts the coarser precision
    assert_eq!(union.lg_config_k(), 10);
    assert_that!(union.estimate(), near(60_000.0, 0.15 * 60_000.0));
}

#[test]
fn test_result_type_conversion() {
    let mut sketch = HllSketch::new(11, HllType::Hll8);
    for i in 0..30_000u64 {
        sketch.update(i);
    }

    let mut union = HllUnion::new(11);
    union.update(&sketch);

    let result8 = union.get_result(HllType::Hll8);
    let result6 = union.get_result(HllType::Hll6);
    let result4 = union.get_result(HllType::Hll4);

    assert_eq!(result8.target_type(), HllType::Hll8);
    assert_eq!(result6.target_type(), HllType::Hll6);
    assert_eq!(result4.target_type(), HllType::Hll4);

    // the converted sketches answer from the same registers through the
    // composite estimator, so they agree with each other exactly and with
    // the HIP answer up to estimator variance
    assert_eq!(
        result6.estimate().to_bits(),
        result4.estimate().to_bits()
    );
    let est = result8.estimate();
    assert_that!(result6.estimate(), near(est, 0.08 * est));
}

#[test]
fn test_union_is_commutative() {
    let mut a = HllSketch::new(12, HllType::Hll8);
    let mut b = HllSketch::new(12, HllType::Hll8);
    for i in 0..50_000u64 {
        a.update(i);
        b.update(i + 25_000);
    }

    let mut ab = HllUnion::new(12);
    ab.update(&a);
    ab.update(&b);

    let mut ba = HllUnion::new(12);
    ba.update(&b);
    ba.update(&a);

    // the merged register arrays are identical, so the composite estimates are too
    assert_eq!(ab.estimate().to_bits(), ba.estimate().to_bits());
}

#[test]
fn test_update_value_directly() {
    let mut union = HllUnion::new(12);
    for i in 0..1000u64 {
        union.update_value(i);
    }
    assert_that!(union.estimate(), near(1000.0, 50.0));
}

#[test]
fn test_reset() {
    let mut union = HllUnion::new(12);
    union.update_value("something");
    assert!(!union.is_empty());
    union.reset();
    assert!(union.is_empty());
    assert_eq!(union.estimate(), 0.0);
}
