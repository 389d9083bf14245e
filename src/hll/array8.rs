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

//! HyperLogLog Array8 mode - one byte per slot
//!
//! Array8 is the simplest register array, storing one byte per slot with no
//! bit packing. It is also the working representation of the union gadget.

use crate::codec::family::Family;
use crate::common::NumStdDev;
use crate::error::Error;
use crate::hll::estimator::HipEstimator;
use crate::hll::get_slot;
use crate::hll::get_value;
use crate::hll::serialization::*;

/// Core Array8 data structure - one byte per slot, no packing
#[derive(Debug, Clone, PartialEq)]
pub struct Array8 {
    lg_config_k: u8,
    /// Direct byte array: bytes[slot] = value
    bytes: Box<[u8]>,
    /// Count of slots with value 0
    num_zeros: u32,
    /// HIP estimator for cardinality estimation
    estimator: HipEstimator,
}

impl Array8 {
    pub fn new(lg_config_k: u8) -> Self {
        let k = 1u32 << lg_config_k;

        Self {
            lg_config_k,
            bytes: vec![0u8; k as usize].into_boxed_slice(),
            num_zeros: k,
            estimator: HipEstimator::new(lg_config_k),
        }
    }

    /// Get value from a slot
    #[inline]
    pub fn get(&self, slot: u32) -> u8 {
        self.bytes[slot as usize]
    }

    /// Set value in a slot
    #[inline]
    fn put(&mut self, slot: u32, value: u8) {
        self.bytes[slot as usize] = value;
    }

    /// Update with a coupon
    pub fn update(&mut self, coupon: u32) {
        let mask = (1 << self.lg_config_k) - 1;
        let slot = get_slot(coupon) & mask;
        let new_value = get_value(coupon);

        let old_value = self.get(slot);

        if new_value > old_value {
            // the estimator must see the transition before the register changes
            self.estimator.update(self.lg_config_k, old_value, new_value);
            self.put(slot, new_value);
            if old_value == 0 {
                self.num_zeros -= 1;
            }
        }
    }

    /// Get the current cardinality estimate
    pub fn estimate(&self) -> f64 {
        // cur_min is always 0 for Array8, so num_at_cur_min = num_zeros
        self.estimator.estimate(self.lg_config_k, 0, self.num_zeros)
    }

    /// Get upper bound for the cardinality estimate
    pub fn upper_bound(&self, num_std_dev: NumStdDev) -> f64 {
        self.estimator
            .upper_bound(self.lg_config_k, 0, self.num_zeros, num_std_dev)
    }

    /// Get lower bound for the cardinality estimate
    pub fn lower_bound(&self, num_std_dev: NumStdDev) -> f64 {
        self.estimator
            .lower_bound(self.lg_config_k, 0, self.num_zeros, num_std_dev)
    }

    /// Set the HIP accumulator value
    ///
    /// Used when promoting from coupon modes to carry the estimate forward.
    pub fn set_hip_accum(&mut self, value: f64) {
        self.estimator.set_hip_accum(value);
    }

    /// Check if the sketch is empty (all slots are zero)
    pub fn is_empty(&self) -> bool {
        self.num_zeros == (1 << self.lg_config_k)
    }

    /// Read access to register values (one byte per register)
    pub(super) fn values(&self) -> &[u8] {
        &self.bytes
    }

    /// The number of registers (K = 2^lg_config_k)
    pub(super) fn num_registers(&self) -> usize {
        1 << self.lg_config_k
    }

    /// Directly set a register value.
    ///
    /// This bypasses the normal update path; the caller must call
    /// [`Self::rebuild_estimator_from_registers`] after all modifications.
    pub(super) fn set_register(&mut self, slot: usize, value: u8) {
        self.bytes[slot] = value;
    }

    /// Rebuild estimator state from the current register values.
    ///
    /// Recomputes num_zeros, kxq0, kxq1, and marks the estimator as
    /// out-of-order. Required after bulk register modifications.
    pub(super) fn rebuild_estimator_from_registers(&mut self) {
        self.rebuild_cached_values();
        self.estimator.set_out_of_order(true);
    }

    /// Recompute num_zeros and the kxq registers from the register values.
    fn rebuild_cached_values(&mut self) {
        self.num_zeros = self.bytes.iter().filter(|&&v| v == 0).count() as u32;

        let mut kxq0_sum = 0.0;
        let mut kxq1_sum = 0.0;

        for &val in self.bytes.iter() {
            if val < 32 {
                kxq0_sum += 1.0 / (1u64 << val) as f64;
            } else {
                kxq1_sum += 1.0 / (1u64 << val) as f64;
            }
        }

        self.estimator.set_kxq0(kxq0_sum);
        self.estimator.set_kxq1(kxq1_sum);
    }

    /// Deserialize Array8 from HLL mode bytes
    ///
    /// Expects the full HLL preamble (40 bytes) followed by k register bytes.
    pub fn deserialize(
        bytes: &[u8],
        lg_config_k: u8,
        compact: bool,
        ooo: bool,
    ) -> Result<Self, Error> {
        let k = 1usize << lg_config_k;
        let expected_len = if compact {
            HLL_PREAMBLE_SIZE // just the preamble for a compact empty sketch
        } else {
            HLL_PREAMBLE_SIZE + k
        };

        if bytes.len() < expected_len {
            return Err(Error::insufficient_data(format!(
                "expected {expected_len}, got {}",
                bytes.len()
            )));
        }

        let hip_accum = read_f64_le(bytes, HIP_ACCUM_DOUBLE);
        let kxq0 = read_f64_le(bytes, KXQ0_DOUBLE);
        let kxq1 = read_f64_le(bytes, KXQ1_DOUBLE);

        // for Array8 num_at_cur_min is num_zeros, since cur_min = 0
        let num_zeros = read_u32_le(bytes, CUR_MIN_COUNT_INT);

        let mut data = vec![0u8; k];
        if !compact {
            data.copy_from_slice(&bytes[HLL_BYTE_ARR_START..HLL_BYTE_ARR_START + k]);
        }

        let mut estimator = HipEstimator::new(lg_config_k);
        estimator.set_out_of_order(ooo);
        estimator.set_hip_accum(hip_accum);
        estimator.set_kxq0(kxq0);
        estimator.set_kxq1(kxq1);

        Ok(Self {
            lg_config_k,
            bytes: data.into_boxed_slice(),
            num_zeros,
            estimator,
        })
    }

    /// Serialize Array8 to bytes
    ///
    /// Produces the full HLL preamble (40 bytes) followed by k register bytes.
    pub fn serialize(&self, lg_config_k: u8) -> Vec<u8> {
        let k = 1usize << lg_config_k;
        let total_size = HLL_PREAMBLE_SIZE + k;
        let mut bytes = vec![0u8; total_size];

        bytes[PREAMBLE_INTS_BYTE] = HLL_PREINTS;
        bytes[SER_VER_BYTE] = SER_VER;
        bytes[FAMILY_BYTE] = Family::HLL.id;
        bytes[LG_K_BYTE] = lg_config_k;
        bytes[LG_ARR_BYTE] = 0; // no aux map in Array8

        let mut flags = 0u8;
        if self.estimator.is_out_of_order() {
            flags |= OUT_OF_ORDER_FLAG_MASK;
        }
        bytes[FLAGS_BYTE] = flags;

        // cur_min is always 0 for Array8
        bytes[HLL_CUR_MIN_BYTE] = 0;
        bytes[MODE_BYTE] = encode_mode_byte(CUR_MODE_HLL, TGT_HLL8);

        write_f64_le(&mut bytes, HIP_ACCUM_DOUBLE, self.estimator.hip_accum());
        write_f64_le(&mut bytes, KXQ0_DOUBLE, self.estimator.kxq0());
        write_f64_le(&mut bytes, KXQ1_DOUBLE, self.estimator.kxq1());
        write_u32_le(&mut bytes, CUR_MIN_COUNT_INT, self.num_zeros);
        write_u32_le(&mut bytes, AUX_COUNT_INT, 0);

        bytes[HLL_BYTE_ARR_START..].copy_from_slice(&self.bytes);

        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hll::coupon;
    use crate::hll::pack_coupon;

    #[test]
    fn test_update_keeps_max() {
        let mut arr = Array8::new(4);

        arr.update(pack_coupon(0, 5));
        assert_eq!(arr.get(0), 5);

        arr.update(pack_coupon(0, 3)); // smaller, ignored
        assert_eq!(arr.get(0), 5);

        arr.update(pack_coupon(0, 42));
        assert_eq!(arr.get(0), 42);
    }

    #[test]
    fn test_hip_estimator_tracks_updates() {
        let mut arr = Array8::new(10); // 1024 buckets

        assert_eq!(arr.estimate(), 0.0);

        for i in 0..10_000u32 {
            arr.update(coupon(i));
        }

        let estimate = arr.estimate();
        assert!(estimate.is_finite());
        assert!(estimate > 1_000.0, "estimate seems too low: {estimate}");
        assert!(estimate < 100_000.0, "estimate seems too high: {estimate}");
    }

    #[test]
    fn test_set_register_and_rebuild() {
        let mut arr = Array8::new(4);

        arr.set_register(0, 10);
        arr.set_register(1, 20);
        arr.set_register(2, 35);
        arr.rebuild_estimator_from_registers();

        assert_eq!(arr.num_zeros, 13);
        assert!(arr.estimator.is_out_of_order());
        // kxq0 reflects the three raised registers plus 13 zeros
        let expected = 13.0 + 1.0 / 1024.0 + 1.0 / (1u64 << 20) as f64 + 1.0 / (1u64 << 35) as f64;
        assert!((arr.estimator.kxq0() + arr.estimator.kxq1() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut arr = Array8::new(6);
        for i in 0..500u32 {
            arr.update(coupon(i));
        }
        let bytes = arr.serialize(6);
        let restored = Array8::deserialize(&bytes, 6, false, false).unwrap();
        assert_eq!(arr, restored);
        assert_eq!(arr.estimate(), restored.estimate());
    }
}
