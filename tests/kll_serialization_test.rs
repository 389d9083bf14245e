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

use streamsketch::error::ErrorKind;
use streamsketch::kll::DEFAULT_K;
use streamsketch::kll::KllSketch;

fn round_trip_f64(n: u64) {
    let mut sketch = KllSketch::<f64>::with_random_seed(DEFAULT_K, 13);
    for i in 0..n {
        sketch.update(i as f64);
    }

    let bytes = sketch.serialize();
    let restored = KllSketch::<f64>::deserialize(&bytes).expect("deserialization failed");

    assert_eq!(restored, sketch, "state not preserved at n = {n}");
    assert_eq!(restored.n(), sketch.n());
    assert_eq!(restored.min_item(), sketch.min_item());
    assert_eq!(restored.max_item(), sketch.max_item());
    assert_eq!(restored.num_retained(), sketch.num_retained());
    assert_eq!(
        restored.serialize(),
        bytes,
        "re-serialization differs at n = {n}"
    );
}

#[test]
fn test_round_trip_empty() {
    round_trip_f64(0);
}

#[test]
fn test_round_trip_single_item() {
    round_trip_f64(1);
}

#[test]
fn test_round_trip_exact_mode() {
    round_trip_f64(150);
}

#[test]
fn test_round_trip_estimation_mode() {
    round_trip_f64(100_000);
}

#[test]
fn test_round_trip_preserves_query_answers() {
    let mut sketch = KllSketch::<f64>::with_random_seed(DEFAULT_K, 37);
    for i in 0..200_000 {
        sketch.update(i as f64);
    }

    let restored = KllSketch::<f64>::deserialize(&sketch.serialize()).unwrap();
    for step in 0..=20 {
        let phi = step as f64 / 20.0;
        assert_eq!(
            restored.quantile(phi, true).unwrap(),
            sketch.quantile(phi, true).unwrap(),
            "quantile({phi}) changed across the round trip"
        );
    }
}

#[test]
fn test_round_trip_strings() {
    let mut sketch = KllSketch::<String>::with_random_seed(DEFAULT_K, 41);
    for i in 0..5_000 {
        sketch.update(format!("item-{i:06}"));
    }

    let bytes = sketch.serialize();
    let restored = KllSketch::<String>::deserialize(&bytes).unwrap();
    assert_eq!(restored, sketch);
    assert_eq!(restored.serialize(), bytes);
}

#[test]
fn test_round_trip_i64() {
    let mut sketch = KllSketch::<i64>::with_random_seed(DEFAULT_K, 43);
    for i in -10_000i64..10_000 {
        sketch.update(i);
    }

    let bytes = sketch.serialize();
    let restored = KllSketch::<i64>::deserialize(&bytes).unwrap();
    assert_eq!(restored, sketch);
}

#[test]
fn test_corrupted_family_rejected() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    sketch.update(1.0);
    let mut bytes = sketch.serialize();
    bytes[2] = 16; // CPC family id
    let err = KllSketch::<f64>::deserialize(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);
}

#[test]
fn test_corrupted_serial_version_rejected() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    sketch.update(1.0);
    let mut bytes = sketch.serialize();
    bytes[1] = 77;
    assert!(KllSketch::<f64>::deserialize(&bytes).is_err());
}

#[test]
fn test_corrupted_preamble_ints_rejected() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    for i in 0..10_000 {
        sketch.update(i as f64);
    }
    let mut bytes = sketch.serialize();
    bytes[0] = 2; // full sketches must carry the full preamble
    let err = KllSketch::<f64>::deserialize(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);
}

#[test]
fn test_corrupted_m_rejected() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    sketch.update(1.0);
    let mut bytes = sketch.serialize();
    bytes[6] = 4; // m byte
    assert!(KllSketch::<f64>::deserialize(&bytes).is_err());
}

#[test]
fn test_truncated_input_rejected() {
    let mut sketch = KllSketch::<f64>::new(DEFAULT_K);
    for i in 0..10_000 {
        sketch.update(i as f64);
    }
    let bytes = sketch.serialize();
    for len in [0, 3, 7, 12, bytes.len() - 1] {
        assert!(
            KllSketch::<f64>::deserialize(&bytes[..len]).is_err(),
            "truncation to {len} bytes was accepted"
        );
    }
}

#[test]
fn test_updates_continue_after_round_trip() {
    let mut sketch = KllSketch::<f64>::with_random_seed(DEFAULT_K, 47);
    for i in 0..5_000 {
        sketch.update(i as f64);
    }

    let mut restored = KllSketch::<f64>::deserialize(&sketch.serialize()).unwrap();
    for i in 5_000..10_000 {
        restored.update(i as f64);
    }

    assert_eq!(restored.n(), 10_000);
    assert_eq!(*restored.min_item().unwrap(), 0.0);
    assert_eq!(*restored.max_item().unwrap(), 9_999.0);
}
