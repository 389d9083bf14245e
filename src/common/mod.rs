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

//! Data structures and functions that may be used across all the sketch families.

// public common components for the streamsketch crate
mod num_std_dev;
pub use self::num_std_dev::NumStdDev;

// private to the streamsketch crate
pub(crate) mod inv_pow2_table;
pub(crate) mod random;

/// Canonicalize double value so that equal values hash equally.
pub(crate) fn canonical_double(value: f64) -> u64 {
    if value.is_nan() {
        // the canonical quiet NaN bit pattern
        0x7ff8000000000000u64
    } else {
        // -0.0 + 0.0 == +0.0 under IEEE754 roundTiesToEven rounding mode,
        // which Rust guarantees. Thus, by adding a positive zero we
        // canonicalize signed zero without any branches in one instruction.
        (value + 0.0).to_bits()
    }
}
