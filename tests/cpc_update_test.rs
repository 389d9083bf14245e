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
use streamsketch::cpc::CpcSketch;

const RELATIVE_ERROR_FOR_LG_K_11: f64 = 0.02;

#[test]
fn test_empty() {
    let sketch = CpcSketch::new(11);
    assert!(sketch.is_empty());
    assert_eq!(sketch.estimate(), 0.0);
    assert_eq!(sketch.lower_bound(NumStdDev::One), 0.0);
    assert_eq!(sketch.upper_bound(NumStdDev::One), 0.0);
    assert!(sketch.validate());
}

#[test]
fn test_one_value() {
    let mut sketch = CpcSketch::new(11);
    sketch.update(1);
    assert!(!sketch.is_empty());
    assert_eq!(sketch.estimate(), 1.0);
    assert_that!(sketch.estimate(), ge(sketch.lower_bound(NumStdDev::One)));
    assert_that!(sketch.estimate(), le(sketch.upper_bound(NumStdDev::One)));
    assert!(sketch.validate());
}

#[test]
fn test_many_values() {
    let mut sketch = CpcSketch::new(11);
    for i in 0..10000 {
        sketch.update(i);
    }
    assert!(!sketch.is_empty());
    assert_that!(
        sketch.estimate(),
        near(10000.0, RELATIVE_ERROR_FOR_LG_K_11 * 10000.0)
    );
    assert_that!(sketch.estimate(), ge(sketch.lower_bound(NumStdDev::One)));
    assert_that!(sketch.estimate(), le(sketch.upper_bound(NumStdDev::One)));
    assert!(sketch.validate());
}

#[test]
fn test_duplicates_do_not_inflate() {
    let mut sketch = CpcSketch::new(11);
    for _ in 0..50 {
        for i in 0..1000 {
            sketch.update(i);
        }
    }
    assert_that!(
        sketch.estimate(),
        near(1000.0, RELATIVE_ERROR_FOR_LG_K_11 * 1000.0 * 2.0)
    );
    assert!(sketch.validate());
}

#[test]
fn test_estimate_is_monotone_under_updates() {
    let mut sketch = CpcSketch::new(10);
    let mut prev = 0.0;
    for i in 0..100_000u64 {
        sketch.update(i);
        if i % 997 == 0 {
            let est = sketch.estimate();
            assert!(est >= prev, "estimate decreased after update {i}");
            prev = est;
        }
    }
    assert!(sketch.validate());
}

#[test]
fn test_validator_through_all_flavors() {
    // crosses sparse, hybrid, pinned and sliding at lg_k = 10
    let mut sketch = CpcSketch::new(10);
    for i in 0..50_000u64 {
        sketch.update(i);
        if i.is_power_of_two() {
            assert!(sketch.validate(), "validator failed at n = {i}");
        }
    }
    assert!(sketch.validate());
}

#[test]
fn test_floating_point_updates_canonicalize() {
    let mut sketch = CpcSketch::new(11);
    sketch.update_f64(0.0);
    sketch.update_f64(-0.0);
    assert_eq!(sketch.estimate(), 1.0);

    sketch.update_f64(f64::NAN);
    sketch.update_f64(-f64::NAN);
    assert_eq!(sketch.estimate().trunc(), 2.0);
}

#[test]
fn test_bounds_widen_with_kappa() {
    let mut sketch = CpcSketch::new(11);
    for i in 0..50_000 {
        sketch.update(i);
    }
    let lb3 = sketch.lower_bound(NumStdDev::Three);
    let lb1 = sketch.lower_bound(NumStdDev::One);
    let ub1 = sketch.upper_bound(NumStdDev::One);
    let ub3 = sketch.upper_bound(NumStdDev::Three);
    assert!(lb3 <= lb1 && lb1 <= ub1 && ub1 <= ub3);
}

#[test]
#[should_panic(expected = "lg_k out of range")]
fn test_lg_k_too_small() {
    let _ = CpcSketch::new(3);
}

#[test]
#[should_panic(expected = "lg_k out of range")]
fn test_lg_k_too_large() {
    let _ = CpcSketch::new(27);
}
