// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire format primitives.
//!
//! A stream is a sequence of fields. Each field is:
//!
//! ```text
//! header byte | [delta varint] | [type tag] | payload
//! ```
//!
//! | Wire type       | Payload                                        |
//! |-----------------|------------------------------------------------|
//! | VarInt          | LEB128 varint (signed values zig-zag mapped)    |
//! | TagDelimited    | nested fields, then the end marker `0xE0`       |
//! | LengthPrefixed  | varint length, then that many bytes             |
//! | Fixed32/64/128  | 4/8/16 bytes little-endian                      |
//! | Reference       | varint reference id (0 = null)                  |
//!
//! Everything except TagDelimited can be skipped in O(1) from the header
//! alone; TagDelimited is skipped by counting nested begin/end markers.
//! [`dump`] walks a stream with nothing but these rules.

pub mod dump;
mod header;
pub mod varint;

pub use header::{
    extended_kind, split_delta, ExtendedKind, FieldHeader, HeaderByte, SchemaType, TypeTag,
    WireType, END_OBJECT, EXTENDED_DELTA, MAX_INLINE_DELTA, NULL_REFERENCE,
};
