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

use streamsketch::cpc::CpcSketch;
use streamsketch::error::ErrorKind;

/// Serialize, deserialize and re-serialize a sketch fed n values, checking
/// that the result is indistinguishable from the original.
fn round_trip(lg_k: u8, n: u64) {
    let mut sketch = CpcSketch::new(lg_k);
    for i in 0..n {
        sketch.update(i);
    }

    let bytes = sketch.serialize();
    let restored = CpcSketch::deserialize(&bytes).expect("deserialization failed");

    assert!(restored.validate(), "restored sketch failed validation");
    assert_eq!(restored.lg_k(), sketch.lg_k());
    assert_eq!(restored.num_coupons(), sketch.num_coupons());
    assert_eq!(
        restored.estimate().to_bits(),
        sketch.estimate().to_bits(),
        "estimate not preserved bitwise at n = {n}"
    );
    assert_eq!(
        restored.serialize(),
        bytes,
        "re-serialization differs at n = {n}"
    );
}

#[test]
fn test_round_trip_empty() {
    round_trip(11, 0);
}

#[test]
fn test_round_trip_sparse() {
    // C < 3K/32
    round_trip(10, 50);
}

#[test]
fn test_round_trip_hybrid() {
    // 3K/32 <= C < K/2
    round_trip(10, 300);
}

#[test]
fn test_round_trip_pinned() {
    // K/2 <= C < 27K/8
    round_trip(10, 2500);
}

#[test]
fn test_round_trip_sliding() {
    // 27K/8 <= C
    round_trip(10, 50_000);
}

#[test]
fn test_round_trip_large() {
    round_trip(11, 100_000);
}

#[test]
fn test_round_trip_merged_sketch() {
    use streamsketch::cpc::CpcUnion;

    let mut a = CpcSketch::new(11);
    let mut b = CpcSketch::new(11);
    for i in 0..30_000 {
        a.update(i);
        b.update(i + 15_000);
    }
    let mut union = CpcUnion::new(11);
    union.update(&a).unwrap();
    union.update(&b).unwrap();
    let merged = union.to_sketch();

    let bytes = merged.serialize();
    let restored = CpcSketch::deserialize(&bytes).unwrap();
    assert!(restored.validate());
    assert_eq!(restored.num_coupons(), merged.num_coupons());
    assert_eq!(restored.estimate().to_bits(), merged.estimate().to_bits());
    assert_eq!(restored.serialize(), bytes);
}

#[test]
fn test_corrupted_preamble_ints_rejected() {
    let mut sketch = CpcSketch::new(11);
    for i in 0..1000 {
        sketch.update(i);
    }
    let mut bytes = sketch.serialize();
    bytes[0] ^= 0x01;
    let err = CpcSketch::deserialize(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);
}

#[test]
fn test_corrupted_serial_version_rejected() {
    let mut sketch = CpcSketch::new(11);
    sketch.update(1);
    let mut bytes = sketch.serialize();
    bytes[1] = 99;
    let err = CpcSketch::deserialize(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);
}

#[test]
fn test_corrupted_family_rejected() {
    let mut sketch = CpcSketch::new(11);
    sketch.update(1);
    let mut bytes = sketch.serialize();
    bytes[2] = 7; // HLL family id
    let err = CpcSketch::deserialize(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);
}

#[test]
fn test_corrupted_seed_hash_rejected() {
    let mut sketch = CpcSketch::new(11);
    sketch.update(1);
    let mut bytes = sketch.serialize();
    bytes[6] ^= 0xFF; // low byte of the seed hash
    let err = CpcSketch::deserialize(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);
}

#[test]
fn test_big_endian_flag_rejected() {
    let mut sketch = CpcSketch::new(11);
    sketch.update(1);
    let mut bytes = sketch.serialize();
    bytes[5] |= 0x01; // big-endian bit
    let err = CpcSketch::deserialize(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);
}

#[test]
fn test_seed_mismatch_rejected() {
    let mut sketch = CpcSketch::with_seed(11, 123);
    sketch.update(1);
    let bytes = sketch.serialize();
    assert!(CpcSketch::deserialize(&bytes).is_err());
    assert!(CpcSketch::deserialize_with_seed(&bytes, 123).is_ok());
}

#[test]
fn test_truncated_input_rejected() {
    let mut sketch = CpcSketch::new(11);
    for i in 0..1000 {
        sketch.update(i);
    }
    let bytes = sketch.serialize();
    for len in [0, 1, 4, 7, bytes.len() / 2] {
        assert!(
            CpcSketch::deserialize(&bytes[..len]).is_err(),
            "truncation to {len} bytes was accepted"
        );
    }
}
