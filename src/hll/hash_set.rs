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

//! Hash set for storing unique coupons with stride probing
//!
//! Uses open addressing with a coupon-derived odd stride to handle
//! collisions. Takes over from the list once it fills, and hands off to a
//! register array when it reaches its own promotion size.

use crate::codec::SketchBytes;
use crate::codec::family::Family;
use crate::error::Error;
use crate::hll::HllType;
use crate::hll::KEY_MASK_26;
use crate::hll::container::COUPON_EMPTY;
use crate::hll::container::Container;
use crate::hll::serialization::*;

const LG_INIT_SET_SIZE: usize = 5;

/// Hash set for efficient coupon storage with collision handling
#[derive(Debug, Clone, PartialEq)]
pub struct HashSet {
    container: Container,
}

impl Default for HashSet {
    fn default() -> Self {
        Self::new(LG_INIT_SET_SIZE)
    }
}

impl HashSet {
    pub fn new(lg_size: usize) -> Self {
        Self {
            container: Container::new(lg_size),
        }
    }

    /// Insert coupon into the hash set, ignoring duplicates
    pub fn update(&mut self, coupon: u32) {
        let mask = (1 << self.container.lg_size()) - 1;

        // initial probe position from the low bits of the coupon
        let mut probe = coupon & mask;
        let starting_position = probe;

        loop {
            let value = &mut self.container.coupons[probe as usize];
            if value == &COUPON_EMPTY {
                *value = coupon;
                self.container.len += 1;
                break;
            } else if value == &coupon {
                break;
            }

            // collision: odd stride ensures all slots are visited
            let stride = ((coupon & KEY_MASK_26) >> self.container.lg_size()) | 1;
            probe = (probe + stride) & mask;
            if probe == starting_position {
                // Invariant: the owning sketch grows or promotes the set
                // before it can fill up.
                unreachable!("HashSet full; no empty slots");
            }
        }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Deserialize a HashSet body from the full sketch bytes
    pub fn deserialize(bytes: &[u8], compact: bool) -> Result<Self, Error> {
        let lg_arr = (bytes[LG_ARR_BYTE] as usize).max(LG_INIT_SET_SIZE);

        if bytes.len() < HASH_SET_INT_ARR_START {
            return Err(Error::insufficient_data("set preamble"));
        }
        let coupon_count = read_u32_le(bytes, HASH_SET_COUNT_INT) as usize;
        if coupon_count >= (1 << lg_arr) {
            return Err(Error::deserial(format!(
                "set coupon count {coupon_count} does not fit a table of lg size {lg_arr}"
            )));
        }

        let stored = if compact { coupon_count } else { 1 << lg_arr };
        let needed = HASH_SET_INT_ARR_START + stored * COUPON_SIZE_BYTES;
        if bytes.len() < needed {
            return Err(Error::insufficient_data(format!(
                "expected {needed} bytes of set data, got {}",
                bytes.len()
            )));
        }

        let mut set = HashSet::new(lg_arr);
        for i in 0..stored {
            let coupon = read_u32_le(bytes, HASH_SET_INT_ARR_START + i * COUPON_SIZE_BYTES);
            if coupon != COUPON_EMPTY {
                set.update(coupon);
            }
        }

        if set.container.len() != coupon_count {
            return Err(Error::deserial(format!(
                "set coupon count mismatch: header says {coupon_count}, read {}",
                set.container.len()
            )));
        }

        Ok(set)
    }

    /// Serialize this HashSet, always in compact form
    pub fn serialize(&self, lg_config_k: u8, hll_type: HllType) -> Vec<u8> {
        let coupon_count = self.container.len();
        let lg_arr = self.container.lg_size();

        let total_size = HASH_SET_INT_ARR_START + coupon_count * COUPON_SIZE_BYTES;
        let mut bytes = SketchBytes::with_capacity(total_size);

        bytes.write_u8(HASH_SET_PREINTS);
        bytes.write_u8(SER_VER);
        bytes.write_u8(Family::HLL.id);
        bytes.write_u8(lg_config_k);
        bytes.write_u8(lg_arr as u8);
        bytes.write_u8(COMPACT_FLAG_MASK);
        bytes.write_u8(0); // unused
        bytes.write_u8(encode_mode_byte(CUR_MODE_SET, hll_type as u8));

        bytes.write_u32_le(coupon_count as u32);

        // sort the occupied slots for deterministic output
        let mut coupons: Vec<u32> = self.container.iter().collect();
        coupons.sort_unstable();
        for coupon in coupons {
            bytes.write_u32_le(coupon);
        }

        bytes.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_dedups_and_grows_nowhere_near_full() {
        let mut set = HashSet::new(8);
        for coupon in 1..=100u32 {
            set.update(coupon);
            set.update(coupon);
        }
        assert_eq!(set.container().len(), 100);
    }

    #[test]
    fn test_set_serialization_round_trip() {
        let mut set = HashSet::new(6);
        for coupon in [71u32, 92, 3300, 40001, 123456] {
            set.update(coupon);
        }
        let bytes = set.serialize(12, HllType::Hll8);
        let restored = HashSet::deserialize(&bytes, true).unwrap();
        assert_eq!(set.container().len(), restored.container().len());
    }
}
