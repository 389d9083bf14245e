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

//! Simple list for storing unique coupons in arrival order
//!
//! Provides sequential storage with linear search for duplicates.
//! Efficient for the first handful of coupons before transitioning to
//! the hash set or a register array.

use crate::codec::SketchBytes;
use crate::codec::family::Family;
use crate::error::Error;
use crate::hll::HllType;
use crate::hll::container::COUPON_EMPTY;
use crate::hll::container::Container;
use crate::hll::serialization::*;

const LG_INIT_LIST_SIZE: usize = 3;

/// List for sequential coupon storage with duplicate detection
#[derive(Debug, Clone, PartialEq)]
pub struct List {
    container: Container,
}

impl Default for List {
    fn default() -> Self {
        Self::new(LG_INIT_LIST_SIZE)
    }
}

impl List {
    pub fn new(lg_size: usize) -> Self {
        Self {
            container: Container::new(lg_size),
        }
    }

    /// Insert coupon into the list, ignoring duplicates
    pub fn update(&mut self, coupon: u32) {
        for value in self.container.coupons.iter_mut() {
            if value == &COUPON_EMPTY {
                // found empty slot, insert new coupon
                *value = coupon;
                self.container.len += 1;
                break;
            } else if value == &coupon {
                // duplicate, nothing to do
                break;
            }
        }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Deserialize a List body from the full sketch bytes
    pub fn deserialize(bytes: &[u8], empty: bool, compact: bool) -> Result<Self, Error> {
        let lg_arr = (bytes[LG_ARR_BYTE] as usize).max(LG_INIT_LIST_SIZE);
        let coupon_count = bytes[LIST_COUNT_BYTE] as usize;

        if coupon_count > (1 << lg_arr) {
            return Err(Error::deserial(format!(
                "list coupon count {coupon_count} exceeds capacity {}",
                1usize << lg_arr
            )));
        }

        let mut list = List::new(lg_arr);
        if empty || coupon_count == 0 {
            return Ok(list);
        }

        // a compact image stores only the occupied slots
        let stored = if compact { coupon_count } else { 1 << lg_arr };
        let needed = LIST_INT_ARR_START + stored * COUPON_SIZE_BYTES;
        if bytes.len() < needed {
            return Err(Error::insufficient_data(format!(
                "expected {needed} bytes of list data, got {}",
                bytes.len()
            )));
        }

        for i in 0..stored {
            let coupon = read_u32_le(bytes, LIST_INT_ARR_START + i * COUPON_SIZE_BYTES);
            if coupon != COUPON_EMPTY {
                list.update(coupon);
            }
        }

        if list.container.len() != coupon_count {
            return Err(Error::deserial(format!(
                "list coupon count mismatch: header says {coupon_count}, read {}",
                list.container.len()
            )));
        }

        Ok(list)
    }

    /// Serialize this List, always in compact form
    pub fn serialize(&self, lg_config_k: u8, hll_type: HllType) -> Vec<u8> {
        let empty = self.container.is_empty();
        let coupon_count = self.container.len();
        let lg_arr = self.container.lg_size();

        let total_size = LIST_INT_ARR_START + coupon_count * COUPON_SIZE_BYTES;
        let mut bytes = SketchBytes::with_capacity(total_size);

        bytes.write_u8(LIST_PREINTS);
        bytes.write_u8(SER_VER);
        bytes.write_u8(Family::HLL.id);
        bytes.write_u8(lg_config_k);
        bytes.write_u8(lg_arr as u8);

        let mut flags = COMPACT_FLAG_MASK;
        if empty {
            flags |= EMPTY_FLAG_MASK;
        }
        bytes.write_u8(flags);

        bytes.write_u8(coupon_count as u8);
        bytes.write_u8(encode_mode_byte(CUR_MODE_LIST, hll_type as u8));

        if !empty {
            for coupon in self.container.iter() {
                bytes.write_u32_le(coupon);
            }
        }

        bytes.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_dedups() {
        let mut list = List::default();
        list.update(7);
        list.update(7);
        list.update(9);
        assert_eq!(list.container().len(), 2);
    }

    #[test]
    fn test_list_serialization_round_trip() {
        let mut list = List::default();
        for coupon in [71u32, 92, 3300] {
            list.update(coupon);
        }
        let bytes = list.serialize(10, HllType::Hll4);
        let restored = List::deserialize(&bytes, false, true).unwrap();
        assert_eq!(list, restored);
    }
}
