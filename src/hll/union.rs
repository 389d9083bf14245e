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

//! HyperLogLog union for combining multiple HLL sketches
//!
//! The union keeps an internal "gadget" sketch that always targets Hll8. Two
//! folding paths cover every input:
//!
//! - coupon-mode sources (List or Set) replay their coupons into the gadget,
//!   which promotes itself as usual — or, when the gadget is still empty at a
//!   matching precision, the source is adopted outright so its HIP estimator
//!   stays live;
//! - register-mode sources fold register by register into an Hll8 array,
//!   taking the maximum per slot. Rows of a finer source fold onto a coarser
//!   array with a row mask, and the gadget itself is rebuilt at the coarser
//!   precision first when an input forces it down.
//!
//! Any register fold leaves the gadget out of order, so a merged union
//! answers through the composite estimator.

use std::hash::Hash;

use crate::common::NumStdDev;
use crate::hll::HllSketch;
use crate::hll::HllType;
use crate::hll::MAX_LG_K;
use crate::hll::MIN_LG_K;
use crate::hll::array4::Array4;
use crate::hll::array6::Array6;
use crate::hll::array8::Array8;
use crate::hll::container::Container;
use crate::hll::mode::Mode;
use crate::hll::pack_coupon;

/// An HLL union for combining multiple HLL sketches.
///
/// See the [hll module level documentation](crate::hll) for more.
#[derive(Debug, Clone)]
pub struct HllUnion {
    /// Maximum lg_k that this union can handle
    lg_max_k: u8,
    /// Internal sketch that accumulates the union
    gadget: HllSketch,
}

impl HllUnion {
    /// Create a new HLL union.
    ///
    /// # Arguments
    ///
    /// * `lg_max_k` - Maximum log2 of the number of buckets. Must be in [4, 21]. This determines
    ///   the maximum precision the union can handle. Input sketches with larger lg_k will be
    ///   down-sampled.
    ///
    /// # Panics
    ///
    /// Panics if `lg_max_k` is not in the range [4, 21].
    pub fn new(lg_max_k: u8) -> Self {
        assert!(
            (MIN_LG_K..=MAX_LG_K).contains(&lg_max_k),
            "lg_max_k must be in [{MIN_LG_K}, {MAX_LG_K}], got {lg_max_k}"
        );

        Self {
            lg_max_k,
            gadget: HllSketch::new(lg_max_k, HllType::Hll8),
        }
    }

    /// Update the union's gadget with a single value.
    pub fn update_value<T: Hash>(&mut self, value: T) {
        self.gadget.update(value);
    }

    /// Update the union with another sketch.
    pub fn update(&mut self, sketch: &HllSketch) {
        if sketch.is_empty() {
            return;
        }

        match sketch.mode() {
            Mode::List { .. } | Mode::Set { .. } => self.fold_coupons(sketch),
            Mode::Array4(_) | Mode::Array6(_) | Mode::Array8(_) => self.fold_registers(sketch),
        }
    }

    /// Replay a coupon-mode source into the gadget.
    fn fold_coupons(&mut self, sketch: &HllSketch) {
        if self.gadget.is_empty() && sketch.lg_config_k() == self.gadget.lg_config_k() {
            // adopt the first input outright; nothing needs replaying and a
            // later single-stream result keeps its HIP estimator
            self.gadget = if sketch.target_type() == HllType::Hll8 {
                sketch.clone()
            } else {
                retarget_coupons_to_hll8(sketch)
            };
            return;
        }

        for coupon in coupon_container(sketch.mode()).iter() {
            self.gadget.update_with_coupon(coupon);
        }
    }

    /// Fold a register-mode source into the gadget's Hll8 array.
    fn fold_registers(&mut self, sketch: &HllSketch) {
        // the gadget can never stay finer than any input, nor exceed lg_max_k
        let target_lg_k = match self.gadget.mode() {
            Mode::Array8(_) => sketch.lg_config_k().min(self.gadget.lg_config_k()),
            _ => sketch.lg_config_k().min(self.lg_max_k),
        };

        let mut array = self.take_gadget_as_array8(target_lg_k);
        max_fold_registers(&mut array, sketch.mode());
        self.gadget = HllSketch::from_mode(target_lg_k, Mode::Array8(array));
    }

    /// Convert the current gadget into an Hll8 array at the requested
    /// precision, replaying coupons or folding registers as needed.
    fn take_gadget_as_array8(&mut self, lg_k: u8) -> Array8 {
        let placeholder = HllSketch::new(self.lg_max_k, HllType::Hll8);
        let old = std::mem::replace(&mut self.gadget, placeholder);

        match old.into_mode() {
            Mode::Array8(array) if array.num_registers() == 1usize << lg_k => array,
            mode @ (Mode::Array4(_) | Mode::Array6(_) | Mode::Array8(_)) => {
                let mut array = Array8::new(lg_k);
                max_fold_registers(&mut array, &mode);
                array
            }
            mode => {
                let mut array = Array8::new(lg_k);
                for coupon in coupon_container(&mode).iter() {
                    array.update(coupon);
                }
                array
            }
        }
    }

    /// Get the union result as a new sketch with the requested target type.
    pub fn get_result(&self, hll_type: HllType) -> HllSketch {
        if hll_type == self.gadget.target_type() {
            return self.gadget.clone();
        }

        let lg_k = self.gadget.lg_config_k();
        let mode = match self.gadget.mode() {
            Mode::List { list, .. } => Mode::List {
                list: list.clone(),
                hll_type,
            },
            Mode::Set { set, .. } => Mode::Set {
                set: set.clone(),
                hll_type,
            },
            Mode::Array8(array) => repack_registers(array, lg_k, hll_type),
            Mode::Array4(_) | Mode::Array6(_) => {
                unreachable!("the gadget array always targets Hll8")
            }
        };
        HllSketch::from_mode(lg_k, mode)
    }

    /// Get the current lg_config_k of the internal gadget
    pub fn lg_config_k(&self) -> u8 {
        self.gadget.lg_config_k()
    }

    /// Get the maximum lg_k this union can handle
    pub fn lg_max_k(&self) -> u8 {
        self.lg_max_k
    }

    /// Check if the union is empty
    pub fn is_empty(&self) -> bool {
        self.gadget.is_empty()
    }

    /// Reset the union to its initial empty state
    pub fn reset(&mut self) {
        self.gadget = HllSketch::new(self.lg_max_k, HllType::Hll8);
    }

    /// Get the current cardinality estimate of the union
    pub fn estimate(&self) -> f64 {
        self.gadget.estimate()
    }

    /// Get the upper confidence bound for the union's estimate.
    pub fn upper_bound(&self, num_std_dev: NumStdDev) -> f64 {
        self.gadget.upper_bound(num_std_dev)
    }

    /// Get the lower confidence bound for the union's estimate.
    pub fn lower_bound(&self, num_std_dev: NumStdDev) -> f64 {
        self.gadget.lower_bound(num_std_dev)
    }
}

/// The coupon container of a List or Set mode.
fn coupon_container(mode: &Mode) -> &Container {
    match mode {
        Mode::List { list, .. } => list.container(),
        Mode::Set { set, .. } => set.container(),
        Mode::Array4(_) | Mode::Array6(_) | Mode::Array8(_) => {
            unreachable!("register modes have no coupon container")
        }
    }
}

/// Clone a coupon-mode sketch with its target type switched to Hll8.
fn retarget_coupons_to_hll8(sketch: &HllSketch) -> HllSketch {
    let mode = match sketch.mode() {
        Mode::List { list, .. } => Mode::List {
            list: list.clone(),
            hll_type: HllType::Hll8,
        },
        Mode::Set { set, .. } => Mode::Set {
            set: set.clone(),
            hll_type: HllType::Hll8,
        },
        _ => unreachable!("retarget_coupons_to_hll8 called with a register mode"),
    };
    HllSketch::from_mode(sketch.lg_config_k(), mode)
}

/// Fold every non-zero register of an array mode into an Hll8 array, taking
/// the per-slot maximum. Rows of a finer source fold together under the
/// destination's row mask; a same-size source is the degenerate fold.
///
/// The destination is rebuilt afterwards, which recomputes its cached counts
/// and marks it out of order.
fn max_fold_registers(dst: &mut Array8, src_mode: &Mode) {
    let dst_mask = dst.num_registers() - 1;

    {
        let mut fold_one = |slot: usize, value: u8| {
            if value > 0 {
                let folded = slot & dst_mask;
                if value > dst.values()[folded] {
                    dst.set_register(folded, value);
                }
            }
        };

        match src_mode {
            Mode::Array8(src) => {
                for (slot, &value) in src.values().iter().enumerate() {
                    fold_one(slot, value);
                }
            }
            Mode::Array6(src) => {
                for slot in 0..src.num_registers() {
                    fold_one(slot, src.get(slot as u32));
                }
            }
            Mode::Array4(src) => {
                for slot in 0..src.num_registers() {
                    fold_one(slot, src.get(slot as u32));
                }
            }
            Mode::List { .. } | Mode::Set { .. } => {
                unreachable!("coupon modes fold through the gadget's update path")
            }
        }
    }

    dst.rebuild_estimator_from_registers();
}

/// Repack an Hll8 register array into a 4- or 6-bit array mode.
///
/// Every non-zero register is replayed as a coupon; the result shares the
/// source's register contents and answers through the composite estimator.
fn repack_registers(src: &Array8, lg_config_k: u8, hll_type: HllType) -> Mode {
    match hll_type {
        HllType::Hll8 => Mode::Array8(src.clone()),
        HllType::Hll6 => {
            let mut array = Array6::new(lg_config_k);
            for (slot, &value) in src.values().iter().enumerate() {
                if value > 0 {
                    array.update(pack_coupon(slot as u32, value));
                }
            }
            array.set_out_of_order(true);
            Mode::Array6(array)
        }
        HllType::Hll4 => {
            let mut array = Array4::new(lg_config_k);
            for (slot, &value) in src.values().iter().enumerate() {
                if value > 0 {
                    array.update(pack_coupon(slot as u32, value));
                }
            }
            array.set_out_of_order(true);
            Mode::Array4(array)
        }
    }
}
