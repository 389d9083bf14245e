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

//! Binary serialization format constants for HLL sketches.
//!
//! Every serialized HLL sketch starts with the same 8-byte header; the mode
//! byte selects one of three body layouts (LIST, SET, HLL).

/// Current serialization version
pub const SER_VER: u8 = 1;

/// Flag indicating sketch is empty (no values inserted)
pub const EMPTY_FLAG_MASK: u8 = 4;

/// Flag indicating compact serialization (no empty slots stored)
pub const COMPACT_FLAG_MASK: u8 = 8;

/// Flag indicating out-of-order mode (HIP estimator invalid)
pub const OUT_OF_ORDER_FLAG_MASK: u8 = 16;

/// Offset of preamble size field (in 4-byte ints)
pub const PREAMBLE_INTS_BYTE: usize = 0;

/// Offset of serialization version byte
pub const SER_VER_BYTE: usize = 1;

/// Offset of family ID byte
pub const FAMILY_BYTE: usize = 2;

/// Offset of lg_config_k byte
pub const LG_K_BYTE: usize = 3;

/// Offset of lg_arr (coupon array or aux map size) byte
pub const LG_ARR_BYTE: usize = 4;

/// Offset of flags byte
pub const FLAGS_BYTE: usize = 5;

/// Offset of mode byte (current mode in low 2 bits, target type in bits 2-3)
pub const MODE_BYTE: usize = 7;

/// Preamble size for LIST mode (8 bytes = 2 ints)
pub const LIST_PREINTS: u8 = 2;

/// Preamble size for SET mode (12 bytes = 3 ints)
pub const HASH_SET_PREINTS: u8 = 3;

/// Preamble size for HLL mode (40 bytes = 10 ints)
pub const HLL_PREINTS: u8 = 10;

/// Offset of coupon count byte in LIST mode
pub const LIST_COUNT_BYTE: usize = 6;

/// Offset where coupon array starts in LIST mode
pub const LIST_INT_ARR_START: usize = 8;

/// Offset of coupon count in SET mode (4-byte int)
pub const HASH_SET_COUNT_INT: usize = 8;

/// Offset where coupon array starts in SET mode
pub const HASH_SET_INT_ARR_START: usize = 12;

/// Offset of cur_min byte in HLL mode header
pub const HLL_CUR_MIN_BYTE: usize = 6;

/// Offset of HIP accumulator (8-byte double) in HLL preamble
pub const HIP_ACCUM_DOUBLE: usize = 8;

/// Offset of KxQ0 register (8-byte double) in HLL preamble
pub const KXQ0_DOUBLE: usize = 16;

/// Offset of KxQ1 register (8-byte double) in HLL preamble
pub const KXQ1_DOUBLE: usize = 24;

/// Offset of num_at_cur_min (4-byte int) in HLL preamble
pub const CUR_MIN_COUNT_INT: usize = 32;

/// Offset of aux_count (4-byte int) in HLL preamble
pub const AUX_COUNT_INT: usize = 36;

/// Offset where HLL register bytes start
pub const HLL_BYTE_ARR_START: usize = 40;

/// Total size of HLL preamble in bytes
pub const HLL_PREAMBLE_SIZE: usize = 40;

/// Size of a single coupon in bytes (u32)
pub const COUPON_SIZE_BYTES: usize = 4;

/// Current mode: LIST
pub const CUR_MODE_LIST: u8 = 0;

/// Current mode: SET
pub const CUR_MODE_SET: u8 = 1;

/// Current mode: HLL
pub const CUR_MODE_HLL: u8 = 2;

/// Target type: HLL4 (4-bit packed)
pub const TGT_HLL4: u8 = 0;

/// Target type: HLL6 (6-bit packed)
pub const TGT_HLL6: u8 = 1;

/// Target type: HLL8 (8-bit unpacked)
pub const TGT_HLL8: u8 = 2;

/// Extract current mode from mode byte (low 2 bits)
///
/// Returns: 0 = LIST, 1 = SET, 2 = HLL
#[inline]
pub fn extract_cur_mode(mode_byte: u8) -> u8 {
    mode_byte & 0x3
}

/// Extract target HLL type from mode byte (bits 2-3)
///
/// Returns: 0 = HLL4, 1 = HLL6, 2 = HLL8
#[inline]
pub fn extract_tgt_hll_type(mode_byte: u8) -> u8 {
    (mode_byte >> 2) & 0x3
}

/// Encode mode byte from current mode and target type
#[inline]
pub fn encode_mode_byte(cur_mode: u8, tgt_type: u8) -> u8 {
    (cur_mode & 0x3) | ((tgt_type & 0x3) << 2)
}

/// Read an u32 value from bytes at the given offset (little-endian)
#[inline]
pub fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Read a f64 value from bytes at the given offset (little-endian)
#[inline]
pub fn read_f64_le(bytes: &[u8], offset: usize) -> f64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    f64::from_le_bytes(buf)
}

/// Write an u32 value to bytes at the given offset (little-endian)
#[inline]
pub fn write_u32_le(bytes: &mut [u8], offset: usize, value: u32) {
    bytes[offset..offset + COUPON_SIZE_BYTES].copy_from_slice(&value.to_le_bytes());
}

/// Write a f64 value to bytes at the given offset (little-endian)
#[inline]
pub fn write_f64_le(bytes: &mut [u8], offset: usize, value: f64) {
    bytes[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}
