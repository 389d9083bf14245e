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
use streamsketch::kll::DEFAULT_K;
use streamsketch::kll::KllSketch;

#[test]
fn test_empty() {
    let sketch = KllSketch::<f64>::new(DEFAULT_K);
    assert!(sketch.is_empty());
    assert_eq!(sketch.n(), 0);
    assert_eq!(sketch.num_retained(), 0);
    assert!(!sketch.is_estimation_mode());
    assert!(sketch.min_item().is_none());
    assert!(sketch.max_item().is_none());
    assert!(sketch.quantile(0.5, true).is_none());
    assert!(sketch.rank(&1.0, true).is_none());
}

#[test]
fn test_one_item() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    sketch.update(42.0);
    assert_eq!(sketch.n(), 1);
    assert_eq!(sketch.num_retained(), 1);
    assert_eq!(*sketch.min_item().unwrap(), 42.0);
    assert_eq!(*sketch.max_item().unwrap(), 42.0);
    assert_eq!(sketch.quantile(0.5, true).unwrap(), 42.0);
}

#[test]
fn test_nan_ignored() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    sketch.update(f64::NAN);
    assert!(sketch.is_empty());
    sketch.update(1.0);
    sketch.update(f64::NAN);
    assert_eq!(sketch.n(), 1);
}

#[test]
fn test_exact_mode() {
    // 200 items fit within k = 200, so every answer is exact
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    for i in 0..200 {
        sketch.update(i as f64);
    }

    assert!(!sketch.is_estimation_mode());
    assert_eq!(sketch.n(), 200);
    assert_eq!(*sketch.min_item().unwrap(), 0.0);
    assert_eq!(*sketch.max_item().unwrap(), 199.0);
    assert_eq!(sketch.quantile(0.0, true).unwrap(), 0.0);
    assert_eq!(sketch.quantile(1.0, true).unwrap(), 199.0);

    let median = sketch.quantile(0.5, true).unwrap();
    assert!(
        (median - 100.0).abs() <= 1.0,
        "exact-mode median was {median}"
    );
}

#[test]
fn test_estimation_mode_rank_error() {
    let n = 1_000_000u64;
    let mut sketch = KllSketch::<f64>::with_random_seed(DEFAULT_K, 7);
    for i in 0..n {
        sketch.update(i as f64);
    }

    assert!(sketch.is_estimation_mode());
    assert_eq!(sketch.n(), n);
    assert_eq!(*sketch.min_item().unwrap(), 0.0);
    assert_eq!(*sketch.max_item().unwrap(), (n - 1) as f64);

    // eps = 2.296 / 200^0.9723 ~= 0.0133 at the default k
    let eps = sketch.normalized_rank_error(false);
    assert_that!(eps, near(0.0133, 0.0005));

    let mut max_err: f64 = 0.0;
    let mut total_err = 0.0;
    let mut checks = 0;
    for i in (0..n).step_by(10_000) {
        let true_rank = i as f64 / n as f64;
        let est_rank = sketch.rank(&(i as f64), false).unwrap();
        let err = (est_rank - true_rank).abs();
        max_err = max_err.max(err);
        total_err += err;
        checks += 1;
    }

    assert!(
        max_err <= 2.0 * eps,
        "worst rank error {max_err} far exceeds eps {eps}"
    );
    assert!(
        total_err / checks as f64 <= eps,
        "mean rank error exceeds eps {eps}"
    );
}

#[test]
fn test_quantiles_are_monotone() {
    let mut sketch = KllSketch::<f64>::with_random_seed(DEFAULT_K, 11);
    for i in 0..100_000 {
        sketch.update((i * 7919 % 100_000) as f64);
    }

    let mut prev = f64::NEG_INFINITY;
    for step in 0..=100 {
        let phi = step as f64 / 100.0;
        let q = sketch.quantile(phi, true).unwrap();
        assert!(q >= prev, "quantile({phi}) = {q} below previous {prev}");
        prev = q;
    }
}

#[test]
fn test_cdf_matches_rank() {
    let mut sketch = KllSketch::<f64>::with_random_seed(DEFAULT_K, 3);
    for i in 0..50_000 {
        sketch.update(i as f64);
    }

    let splits = [1000.0, 10_000.0, 25_000.0, 49_000.0];
    let cdf = sketch.cdf(&splits, true).unwrap();
    for (i, split) in splits.iter().enumerate() {
        let rank = sketch.rank(split, true).unwrap();
        assert!(
            (cdf[i] - rank).abs() <= 1e-6,
            "cdf[{i}] = {} but rank = {rank}",
            cdf[i]
        );
    }
    assert_eq!(*cdf.last().unwrap(), 1.0);
}

#[test]
fn test_pmf_telescopes_to_cdf() {
    let mut sketch = KllSketch::<f64>::with_random_seed(DEFAULT_K, 5);
    for i in 0..50_000 {
        sketch.update(i as f64);
    }

    let splits = [5_000.0, 20_000.0, 35_000.0];
    let cdf = sketch.cdf(&splits, true).unwrap();
    let pmf = sketch.pmf(&splits, true).unwrap();

    let mut acc = 0.0;
    for (i, mass) in pmf.iter().enumerate() {
        acc += mass;
        assert!(
            (acc - cdf[i]).abs() <= 1e-9,
            "pmf prefix sum diverged from cdf at {i}"
        );
    }
}

#[test]
#[should_panic(expected = "must be unique and monotonically increasing")]
fn test_unordered_splits_rejected() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    sketch.update(1.0);
    let _ = sketch.cdf(&[2.0, 1.0], true);
}

#[test]
#[should_panic(expected = "NaN")]
fn test_nan_splits_rejected() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    sketch.update(1.0);
    let _ = sketch.pmf(&[f64::NAN], true);
}

#[test]
#[should_panic(expected = "rank must be in")]
fn test_quantile_rank_out_of_range() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    sketch.update(1.0);
    let _ = sketch.quantile(1.5, true);
}

#[test]
fn test_merge_disjoint_reversed_streams() {
    let mut left = KllSketch::<f64>::with_random_seed(DEFAULT_K, 17);
    let mut right = KllSketch::<f64>::with_random_seed(DEFAULT_K, 19);
    for i in 0..10_000 {
        left.update(i as f64);
    }
    for i in (10_000..20_000).rev() {
        right.update(i as f64);
    }

    left.merge(&right);

    assert_eq!(left.n(), 20_000);
    assert_eq!(*left.min_item().unwrap(), 0.0);
    assert_eq!(*left.max_item().unwrap(), 19_999.0);

    let median = left.quantile(0.5, true).unwrap();
    let eps = left.normalized_rank_error(false);
    assert!(
        (median - 10_000.0).abs() <= eps * 20_000.0,
        "merged median was {median}"
    );
}

#[test]
fn test_merge_takes_min_k() {
    let mut coarse = KllSketch::<f64>::with_random_seed(100, 23);
    let mut fine = KllSketch::<f64>::with_random_seed(400, 29);
    for i in 0..10_000 {
        coarse.update(i as f64);
        fine.update((i + 10_000) as f64);
    }

    fine.merge(&coarse);
    assert_eq!(fine.k(), 400);
    assert_eq!(fine.min_k(), 100);
    // the advertised error now reflects the coarser input
    assert!(fine.normalized_rank_error(false) > KllSketch::<f64>::new(400).normalized_rank_error(false));
}

#[test]
fn test_merge_empty_cases() {
    let mut a = KllSketch::<i64>::new(DEFAULT_K);
    let b = KllSketch::<i64>::new(DEFAULT_K);
    a.merge(&b);
    assert!(a.is_empty());

    let mut c = KllSketch::<i64>::new(DEFAULT_K);
    c.update(5);
    c.merge(&b);
    assert_eq!(c.n(), 1);

    let mut d = KllSketch::<i64>::new(DEFAULT_K);
    d.merge(&c);
    assert_eq!(d.n(), 1);
    assert_eq!(*d.min_item().unwrap(), 5);
}

#[test]
fn test_generic_items() {
    let mut sketch = KllSketch::<String>::new(DEFAULT_K);
    for word in ["delta", "alpha", "echo", "bravo", "charlie"] {
        sketch.update(word.to_string());
    }
    assert_eq!(sketch.min_item().unwrap(), "alpha");
    assert_eq!(sketch.max_item().unwrap(), "echo");
    assert_eq!(sketch.quantile(0.5, true).unwrap(), "charlie");
}

#[test]
fn test_i64_items() {
    let mut sketch = KllSketch::<i64>::with_random_seed(DEFAULT_K, 31);
    for i in -50_000i64..50_000 {
        sketch.update(i);
    }
    assert_eq!(*sketch.min_item().unwrap(), -50_000);
    assert_eq!(*sketch.max_item().unwrap(), 49_999);

    let eps = sketch.normalized_rank_error(false);
    let median = sketch.quantile(0.5, true).unwrap();
    assert!((median as f64).abs() <= eps * 100_000.0);
}

#[test]
#[should_panic(expected = "k must be in")]
fn test_k_too_small() {
    let _ = KllSketch::<f64>::new(7);
}
