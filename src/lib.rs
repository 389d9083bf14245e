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

//! # streamsketch
//!
//! Probabilistic data-sketch engines that summarize very large streams in
//! sublinear memory while answering approximate queries with quantified error.
//!
//! Three independent sketch families are provided:
//!
//! - [`cpc`]: Compressed Probabilistic Counting (FM85) distinct-count sketch
//!   with an extremely space-efficient serialized form.
//! - [`hll`]: HyperLogLog distinct-count sketch with 4/6/8-bit register
//!   packing and a HIP estimator.
//! - [`kll`]: KLL streaming quantile sketch with near-optimal rank accuracy
//!   per retained item.
//!
//! All sketches are single-writer structures: updates are cheap and
//! synchronous, merging is supported across sketches built with the same hash
//! seed, and each family has a compact little-endian binary form.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]

mod codec;
pub mod common;
pub mod cpc;
pub mod error;
mod hash;
pub mod hll;
pub mod kll;
