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

use std::io;
use std::io::Cursor;
use std::io::Read;

/// A wrapper around a byte slice that provides methods for reading the
/// primitive types used by the sketch deserializers, always little-endian.
pub struct SketchSlice<'a> {
    slice: Cursor<&'a [u8]>,
}

macro_rules! read_le {
    ($name:ident, $ty:ty, $len:literal) => {
        /// Reads a little-endian primitive from the slice.
        pub fn $name(&mut self) -> io::Result<$ty> {
            let mut buf = [0u8; $len];
            self.read_exact(&mut buf)?;
            Ok(<$ty>::from_le_bytes(buf))
        }
    };
}

impl SketchSlice<'_> {
    /// Creates a new `SketchSlice` from the given byte slice.
    pub fn new(slice: &[u8]) -> SketchSlice<'_> {
        SketchSlice {
            slice: Cursor::new(slice),
        }
    }

    /// Reads exactly `buf.len()` bytes from the slice into `buf`.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.slice.read_exact(buf)
    }

    /// Reads a single byte from the slice.
    pub fn read_u8(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    read_le!(read_u16_le, u16, 2);
    read_le!(read_u32_le, u32, 4);
    read_le!(read_u64_le, u64, 8);
    read_le!(read_i64_le, i64, 8);
    read_le!(read_f32_le, f32, 4);
    read_le!(read_f64_le, f64, 8);
}
