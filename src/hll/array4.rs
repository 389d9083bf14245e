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

//! HyperLogLog Array4 mode - 4-bit packed representation with exceptions
//!
//! Array4 stores register values as nibbles relative to a running minimum
//! `cur_min`. Values that do not fit the 4-bit window after the offset are
//! redirected to an auxiliary hash map keyed by slot index.

use crate::codec::family::Family;
use crate::common::NumStdDev;
use crate::error::Error;
use crate::hll::aux_map::AuxMap;
use crate::hll::estimator::HipEstimator;
use crate::hll::get_slot;
use crate::hll::get_value;
use crate::hll::pack_coupon;
use crate::hll::serialization::*;

const AUX_TOKEN: u8 = 15;

/// Core Array4 data structure - nibble-packed values plus exception map
#[derive(Debug, Clone, PartialEq)]
pub struct Array4 {
    lg_config_k: u8,
    /// Packed 4-bit values: 2 values per byte.
    /// Even slots use the low nibble, odd slots the high nibble.
    bytes: Box<[u8]>,
    /// Current minimum value offset (delays aux map creation)
    cur_min: u8,
    /// Count of slots at exactly cur_min (when 0, increment cur_min)
    num_at_cur_min: u32,
    /// Exception table for values >= cur_min + 15
    aux_map: Option<AuxMap>,
    /// HIP estimator for cardinality estimation
    estimator: HipEstimator,
}

impl Array4 {
    pub fn new(lg_config_k: u8) -> Self {
        let num_bytes = 1usize << (lg_config_k - 1);
        let num_at_cur_min = 1u32 << lg_config_k;
        Self {
            lg_config_k,
            bytes: vec![0u8; num_bytes].into_boxed_slice(),
            cur_min: 0,
            num_at_cur_min,
            aux_map: None,
            estimator: HipEstimator::new(lg_config_k),
        }
    }

    /// Get the raw 4-bit nibble for a slot (not adjusted for cur_min)
    #[inline]
    fn get_raw(&self, slot: u32) -> u8 {
        debug_assert!(((slot >> 1) as usize) < self.bytes.len());

        let byte = self.bytes[(slot >> 1) as usize];
        if slot & 1 == 0 {
            byte & 15 // low nibble for even slots
        } else {
            byte >> 4 // high nibble for odd slots
        }
    }

    /// Set the raw 4-bit nibble for a slot
    #[inline]
    fn put_raw(&mut self, slot: u32, value: u8) {
        debug_assert!(value <= AUX_TOKEN);
        debug_assert!(((slot >> 1) as usize) < self.bytes.len());

        let byte_idx = (slot >> 1) as usize;
        let old_byte = self.bytes[byte_idx];
        self.bytes[byte_idx] = if slot & 1 == 0 {
            (old_byte & 0xF0) | (value & 0x0F)
        } else {
            (old_byte & 0x0F) | (value << 4)
        };
    }

    /// Get the true register value at a slot.
    ///
    /// - If the nibble is below the token: value = cur_min + nibble
    /// - If the nibble is the token: the value lives in the aux map
    pub(super) fn get(&self, slot: u32) -> u8 {
        let raw = self.get_raw(slot);

        if raw < AUX_TOKEN {
            self.cur_min + raw
        } else {
            self.aux_map
                .as_ref()
                .and_then(|map| map.get(slot))
                .expect("AUX_TOKEN nibble without an aux map entry")
        }
    }

    /// The number of registers (K = 2^lg_config_k)
    pub(super) fn num_registers(&self) -> usize {
        1 << self.lg_config_k
    }

    pub fn update(&mut self, coupon: u32) {
        let mask = (1 << self.lg_config_k) - 1;
        let slot = get_slot(coupon) & mask;
        let new_value = get_value(coupon);

        // quick rejection: nothing at or below cur_min can change a register
        if new_value <= self.cur_min {
            return;
        }

        let raw_stored = self.get_raw(slot);
        let lower_bound = raw_stored + self.cur_min;

        if new_value <= lower_bound {
            return;
        }

        // the true old value might be an exception
        let old_value = if raw_stored < AUX_TOKEN {
            lower_bound
        } else {
            self.aux_map
                .as_ref()
                .expect("aux_map must exist while an AUX_TOKEN nibble is stored")
                .get(slot)
                .expect("slot must be in aux_map while its nibble is AUX_TOKEN")
        };

        if new_value <= old_value {
            return;
        }

        // the estimator must see the transition before the register changes
        self.estimator.update(self.lg_config_k, old_value, new_value);

        let shifted_new = new_value - self.cur_min;

        // four cases based on old/new exception status
        match (raw_stored, shifted_new) {
            // both old and new are exceptions
            (AUX_TOKEN, shifted) if shifted >= AUX_TOKEN => {
                self.aux_map
                    .as_mut()
                    .expect("aux_map must exist while an AUX_TOKEN nibble is stored")
                    .replace(slot, new_value);
            }
            // old is an exception, new is not: cannot happen without a cur_min change
            (AUX_TOKEN, _) => {
                unreachable!("AUX_TOKEN present with non-exception new value");
            }
            // old is not an exception, new is
            (_, shifted) if shifted >= AUX_TOKEN => {
                self.put_raw(slot, AUX_TOKEN);
                let aux = self
                    .aux_map
                    .get_or_insert_with(|| AuxMap::new(self.lg_config_k));
                aux.insert(slot, new_value);
            }
            // neither is an exception
            _ => {
                self.put_raw(slot, shifted_new);
            }
        }

        if old_value == self.cur_min {
            self.num_at_cur_min -= 1;
            while self.num_at_cur_min == 0 {
                self.shift_to_bigger_cur_min();
            }
        }
    }

    /// Increment cur_min and renormalize all stored nibbles.
    ///
    /// Called when no slots remain at cur_min. Every nibble is decremented,
    /// and aux entries that fall back into the 4-bit range move into the
    /// main array.
    fn shift_to_bigger_cur_min(&mut self) {
        let new_cur_min = self.cur_min + 1;
        let k = 1u32 << self.lg_config_k;
        let mut num_at_new = 0;

        for slot in 0..k {
            let raw = self.get_raw(slot);
            debug_assert_ne!(raw, 0, "no slot can sit at cur_min when shifting");
            if raw < AUX_TOKEN {
                let decremented = raw - 1;
                self.put_raw(slot, decremented);
                if decremented == 0 {
                    num_at_new += 1;
                }
            }
        }

        // rebuild the aux map: some exceptions may no longer be exceptions
        if let Some(old_aux) = self.aux_map.take() {
            let mut new_aux = None;

            for (slot, old_actual_val) in old_aux.into_iter() {
                debug_assert_eq!(
                    self.get_raw(slot),
                    AUX_TOKEN,
                    "aux map contains a slot without AUX_TOKEN"
                );

                let new_shifted = old_actual_val - new_cur_min;

                if new_shifted < AUX_TOKEN {
                    self.put_raw(slot, new_shifted);
                } else {
                    // still an exception
                    let aux = new_aux.get_or_insert_with(|| AuxMap::new(self.lg_config_k));
                    aux.insert(slot, old_actual_val);
                }
            }
            self.aux_map = new_aux;
        }

        self.cur_min = new_cur_min;
        self.num_at_cur_min = num_at_new;
    }

    /// Get the current cardinality estimate
    pub fn estimate(&self) -> f64 {
        self.estimator
            .estimate(self.lg_config_k, self.cur_min, self.num_at_cur_min)
    }

    /// Get upper bound for the cardinality estimate
    pub fn upper_bound(&self, num_std_dev: NumStdDev) -> f64 {
        self.estimator.upper_bound(
            self.lg_config_k,
            self.cur_min,
            self.num_at_cur_min,
            num_std_dev,
        )
    }

    /// Get lower bound for the cardinality estimate
    pub fn lower_bound(&self, num_std_dev: NumStdDev) -> f64 {
        self.estimator.lower_bound(
            self.lg_config_k,
            self.cur_min,
            self.num_at_cur_min,
            num_std_dev,
        )
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
        self.num_at_cur_min == (1 << self.lg_config_k) && self.cur_min == 0
    }

    /// Deserialize Array4 from HLL mode bytes
    ///
    /// Expects the full HLL preamble (40 bytes) followed by packed nibble
    /// data and the aux map entries.
    pub fn deserialize(
        bytes: &[u8],
        lg_config_k: u8,
        compact: bool,
        ooo: bool,
    ) -> Result<Self, Error> {
        let num_bytes = 1usize << (lg_config_k - 1); // k/2 bytes of nibbles

        if bytes.len() < HLL_PREAMBLE_SIZE {
            return Err(Error::insufficient_data(format!(
                "expected at least {HLL_PREAMBLE_SIZE}, got {}",
                bytes.len()
            )));
        }

        let cur_min = bytes[HLL_CUR_MIN_BYTE];
        let hip_accum = read_f64_le(bytes, HIP_ACCUM_DOUBLE);
        let kxq0 = read_f64_le(bytes, KXQ0_DOUBLE);
        let kxq1 = read_f64_le(bytes, KXQ1_DOUBLE);
        let num_at_cur_min = read_u32_le(bytes, CUR_MIN_COUNT_INT);
        let aux_count = read_u32_le(bytes, AUX_COUNT_INT);

        let expected_len = if compact {
            HLL_PREAMBLE_SIZE
        } else {
            HLL_PREAMBLE_SIZE + num_bytes + (aux_count as usize * COUPON_SIZE_BYTES)
        };

        if bytes.len() < expected_len {
            return Err(Error::insufficient_data(format!(
                "expected {expected_len}, got {}",
                bytes.len()
            )));
        }

        let mut data = vec![0u8; num_bytes];
        if !compact {
            data.copy_from_slice(&bytes[HLL_BYTE_ARR_START..HLL_BYTE_ARR_START + num_bytes]);
        }

        let mut aux_map = None;
        if aux_count > 0 && !compact {
            let mut aux = AuxMap::new(lg_config_k);
            let aux_start = HLL_BYTE_ARR_START + num_bytes;

            for i in 0..aux_count {
                let offset = aux_start + (i as usize * COUPON_SIZE_BYTES);
                let pair = read_u32_le(bytes, offset);
                let slot = get_slot(pair) & ((1 << lg_config_k) - 1);
                let value = get_value(pair);
                aux.insert(slot, value);
            }
            aux_map = Some(aux);
        }

        let mut estimator = HipEstimator::new(lg_config_k);
        estimator.set_out_of_order(ooo);
        estimator.set_hip_accum(hip_accum);
        estimator.set_kxq0(kxq0);
        estimator.set_kxq1(kxq1);

        Ok(Self {
            lg_config_k,
            bytes: data.into_boxed_slice(),
            cur_min,
            num_at_cur_min,
            aux_map,
            estimator,
        })
    }

    /// Serialize Array4 to bytes
    ///
    /// Produces the full HLL preamble (40 bytes) followed by packed nibble
    /// data and the aux map as compact valid pairs.
    pub fn serialize(&self, lg_config_k: u8) -> Vec<u8> {
        let num_bytes = 1usize << (lg_config_k - 1);

        // sort by slot so the serialized form is independent of probe layout
        let mut aux_entries: Vec<(u32, u8)> = match &self.aux_map {
            Some(aux) => aux.iter().collect(),
            None => vec![],
        };
        aux_entries.sort_unstable();

        let aux_count = aux_entries.len() as u32;
        debug_assert_eq!(aux_count, self.aux_map.as_ref().map_or(0, |a| a.count()));
        let total_size = HLL_PREAMBLE_SIZE + num_bytes + (aux_count as usize * COUPON_SIZE_BYTES);
        let mut bytes = vec![0u8; total_size];

        bytes[PREAMBLE_INTS_BYTE] = HLL_PREINTS;
        bytes[SER_VER_BYTE] = SER_VER;
        bytes[FAMILY_BYTE] = Family::HLL.id;
        bytes[LG_K_BYTE] = lg_config_k;
        bytes[LG_ARR_BYTE] = match &self.aux_map {
            Some(aux) => aux.lg_size(),
            None => 0,
        };

        let mut flags = 0u8;
        if self.estimator.is_out_of_order() {
            flags |= OUT_OF_ORDER_FLAG_MASK;
        }
        bytes[FLAGS_BYTE] = flags;

        bytes[HLL_CUR_MIN_BYTE] = self.cur_min;
        bytes[MODE_BYTE] = encode_mode_byte(CUR_MODE_HLL, TGT_HLL4);

        write_f64_le(&mut bytes, HIP_ACCUM_DOUBLE, self.estimator.hip_accum());
        write_f64_le(&mut bytes, KXQ0_DOUBLE, self.estimator.kxq0());
        write_f64_le(&mut bytes, KXQ1_DOUBLE, self.estimator.kxq1());
        write_u32_le(&mut bytes, CUR_MIN_COUNT_INT, self.num_at_cur_min);
        write_u32_le(&mut bytes, AUX_COUNT_INT, aux_count);

        bytes[HLL_BYTE_ARR_START..HLL_BYTE_ARR_START + num_bytes].copy_from_slice(&self.bytes);

        let aux_start = HLL_BYTE_ARR_START + num_bytes;
        for (i, (slot, value)) in aux_entries.iter().enumerate() {
            let offset = aux_start + (i * COUPON_SIZE_BYTES);
            write_u32_le(&mut bytes, offset, pack_coupon(*slot, *value));
        }

        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hll::coupon;

    #[test]
    fn test_get_set_raw() {
        let mut data = Array4::new(4); // 16 buckets

        data.put_raw(0, 5);
        assert_eq!(data.get_raw(0), 5);

        data.put_raw(1, 7);
        assert_eq!(data.get_raw(1), 7);

        // both nibbles live in the same byte
        assert_eq!(data.bytes[0], 0x75);

        data.put_raw(2, 15);
        data.put_raw(3, 3);
        assert_eq!(data.get_raw(2), 15);
        assert_eq!(data.get_raw(3), 3);
    }

    #[test]
    fn test_exception_values_round_trip() {
        let mut arr = Array4::new(7); // 128 buckets

        // a value beyond cur_min + 14 must land in the aux map
        arr.update(pack_coupon(5, 40));
        assert_eq!(arr.get(5), 40);

        // growing it further replaces the aux entry
        arr.update(pack_coupon(5, 50));
        assert_eq!(arr.get(5), 50);

        // small values on other slots stay in the nibble array
        arr.update(pack_coupon(6, 3));
        assert_eq!(arr.get(6), 3);
    }

    #[test]
    fn test_estimate_tracks_updates() {
        let mut arr = Array4::new(10);
        for i in 0..10_000u32 {
            arr.update(coupon(i));
        }
        let estimate = arr.estimate();
        assert!(estimate > 1_000.0 && estimate < 100_000.0, "{estimate}");
    }

    #[test]
    fn test_cur_min_shift() {
        let mut arr = Array4::new(4); // 16 buckets

        // fill every slot with at least 2, emptying the cur_min = 0 floor
        for slot in 0..16u32 {
            arr.update(pack_coupon(slot, 2));
        }
        assert_eq!(arr.cur_min, 2);

        for slot in 0..16u32 {
            assert_eq!(arr.get(slot), 2);
        }
    }

    #[test]
    fn test_serialization_round_trip_with_aux() {
        let mut arr = Array4::new(6);
        for i in 0..5000u32 {
            arr.update(coupon(i));
        }
        // force a couple of exceptions
        arr.update(pack_coupon(1, 45));
        arr.update(pack_coupon(2, 50));

        let bytes = arr.serialize(6);
        let restored = Array4::deserialize(&bytes, 6, false, false).unwrap();
        assert_eq!(arr, restored);
        assert_eq!(arr.estimate(), restored.estimate());
    }
}
