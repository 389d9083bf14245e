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

//! HyperLogLog Array6 mode - 6-bit packed representation
//!
//! Array6 stores register values using 6 bits per slot, a range of 0-63.
//! That covers every possible coupon value, so unlike Array4 it needs no
//! exception handling or cur_min offset.

use crate::codec::family::Family;
use crate::common::NumStdDev;
use crate::error::Error;
use crate::hll::estimator::HipEstimator;
use crate::hll::get_slot;
use crate::hll::get_value;
use crate::hll::serialization::*;

const VAL_MASK_6: u16 = 0x3F;

/// Number of data bytes needed for k 6-bit slots, plus one spare byte so the
/// 16-bit window access of the last slot stays in bounds.
fn num_bytes_for_k(k: usize) -> usize {
    (k * 6).div_ceil(8) + 1
}

/// Core Array6 data structure - 6-bit values with cross-byte packing
#[derive(Debug, Clone, PartialEq)]
pub struct Array6 {
    lg_config_k: u8,
    /// Packed 6-bit values, may cross byte boundaries
    bytes: Box<[u8]>,
    /// Count of slots with value 0
    num_zeros: u32,
    /// HIP estimator for cardinality estimation
    estimator: HipEstimator,
}

impl Array6 {
    pub fn new(lg_config_k: u8) -> Self {
        let k = 1usize << lg_config_k;

        Self {
            lg_config_k,
            bytes: vec![0u8; num_bytes_for_k(k)].into_boxed_slice(),
            num_zeros: k as u32,
            estimator: HipEstimator::new(lg_config_k),
        }
    }

    /// Get the 6-bit value at a slot.
    ///
    /// Uses a 16-bit window read to handle values crossing byte boundaries.
    #[inline]
    pub(super) fn get(&self, slot: u32) -> u8 {
        let start_bit = slot * 6;
        let byte_idx = (start_bit >> 3) as usize;
        let shift = (start_bit & 7) as u8;

        let two_bytes = u16::from_le_bytes([self.bytes[byte_idx], self.bytes[byte_idx + 1]]);
        ((two_bytes >> shift) & VAL_MASK_6) as u8
    }

    /// Set the 6-bit value at a slot.
    ///
    /// Read-modify-write on a 16-bit window to preserve surrounding bits.
    #[inline]
    fn put(&mut self, slot: u32, value: u8) {
        debug_assert!(value <= 63, "6-bit value must be 0-63");

        let start_bit = slot * 6;
        let byte_idx = (start_bit >> 3) as usize;
        let shift = (start_bit & 0x7) as u8;

        let mut two_bytes = u16::from_le_bytes([self.bytes[byte_idx], self.bytes[byte_idx + 1]]);
        two_bytes &= !(VAL_MASK_6 << shift);
        two_bytes |= ((value as u16) & VAL_MASK_6) << shift;

        let bytes_out = two_bytes.to_le_bytes();
        self.bytes[byte_idx] = bytes_out[0];
        self.bytes[byte_idx + 1] = bytes_out[1];
    }

    /// Update with a coupon
    pub fn update(&mut self, coupon: u32) {
        let mask = (1 << self.lg_config_k) - 1;
        let slot = get_slot(coupon) & mask;
        let new_value = get_value(coupon);

        let old_value = self.get(slot);

        if new_value > old_value {
            self.estimator.update(self.lg_config_k, old_value, new_value);
            self.put(slot, new_value);
            if old_value == 0 {
                self.num_zeros -= 1;
            }
        }
    }

    /// Get the current cardinality estimate
    pub fn estimate(&self) -> f64 {
        // cur_min is always 0 for Array6, so num_at_cur_min = num_zeros
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

    /// Mark this array as out of order (its HIP accumulator is invalid)
    pub fn set_out_of_order(&mut self, ooo: bool) {
        self.estimator.set_out_of_order(ooo);
    }

    /// Check if the sketch is empty (all slots are zero)
    pub fn is_empty(&self) -> bool {
        self.num_zeros == (1 << self.lg_config_k)
    }

    /// The number of registers (K = 2^lg_config_k)
    pub(super) fn num_registers(&self) -> usize {
        1 << self.lg_config_k
    }

    /// Deserialize Array6 from HLL mode bytes
    ///
    /// Expects the full HLL preamble (40 bytes) followed by packed 6-bit data.
    pub fn deserialize(
        bytes: &[u8],
        lg_config_k: u8,
        compact: bool,
        ooo: bool,
    ) -> Result<Self, Error> {
        let k = 1usize << lg_config_k;
        let num_bytes = num_bytes_for_k(k);
        let expected_len = if compact {
            HLL_PREAMBLE_SIZE
        } else {
            HLL_PREAMBLE_SIZE + num_bytes
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
        let num_zeros = read_u32_le(bytes, CUR_MIN_COUNT_INT);

        let mut data = vec![0u8; num_bytes];
        if !compact {
            data.copy_from_slice(&bytes[HLL_BYTE_ARR_START..HLL_BYTE_ARR_START + num_bytes]);
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

    /// Serialize Array6 to bytes
    ///
    /// Produces the full HLL preamble (40 bytes) followed by packed 6-bit data.
    pub fn serialize(&self, lg_config_k: u8) -> Vec<u8> {
        let k = 1usize << lg_config_k;
        let num_bytes = num_bytes_for_k(k);
        let total_size = HLL_PREAMBLE_SIZE + num_bytes;
        let mut bytes = vec![0u8; total_size];

        bytes[PREAMBLE_INTS_BYTE] = HLL_PREINTS;
        bytes[SER_VER_BYTE] = SER_VER;
        bytes[FAMILY_BYTE] = Family::HLL.id;
        bytes[LG_K_BYTE] = lg_config_k;
        bytes[LG_ARR_BYTE] = 0; // no aux map in Array6

        let mut flags = 0u8;
        if self.estimator.is_out_of_order() {
            flags |= OUT_OF_ORDER_FLAG_MASK;
        }
        bytes[FLAGS_BYTE] = flags;

        // cur_min is always 0 for Array6
        bytes[HLL_CUR_MIN_BYTE] = 0;
        bytes[MODE_BYTE] = encode_mode_byte(CUR_MODE_HLL, TGT_HLL6);

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
    fn test_packing_across_byte_boundaries() {
        let mut arr = Array6::new(4); // 16 slots

        for slot in 0..16u32 {
            arr.put(slot, (slot * 4 % 64) as u8);
        }
        for slot in 0..16u32 {
            assert_eq!(arr.get(slot), (slot * 4 % 64) as u8, "slot {slot}");
        }
    }

    #[test]
    fn test_update_keeps_max() {
        let mut arr = Array6::new(5);
        arr.update(pack_coupon(3, 12));
        arr.update(pack_coupon(3, 7));
        assert_eq!(arr.get(3), 12);
        arr.update(pack_coupon(3, 63));
        assert_eq!(arr.get(3), 63);
    }

    #[test]
    fn test_estimate_tracks_updates() {
        let mut arr = Array6::new(10);
        for i in 0..10_000u32 {
            arr.update(coupon(i));
        }
        let estimate = arr.estimate();
        assert!(estimate > 1_000.0 && estimate < 100_000.0, "{estimate}");
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut arr = Array6::new(6);
        for i in 0..500u32 {
            arr.update(coupon(i));
        }
        let bytes = arr.serialize(6);
        let restored = Array6::deserialize(&bytes, 6, false, false).unwrap();
        assert_eq!(arr, restored);
        assert_eq!(arr.estimate(), restored.estimate());
    }
}
