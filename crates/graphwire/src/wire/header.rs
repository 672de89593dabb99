// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field header layout.
//!
//! ```text
//!   7   6   5   4   3   2   1   0
//! +-----------+-------+---+-------+
//! |   wire    |schema |trk| delta |
//! +-----------+-------+---+-------+
//! ```
//!
//! - `wire`: [`WireType`]; 7 is the extended marker space.
//! - `schema`: [`SchemaType`], selects the optional type tag that follows.
//! - `trk`: the payload defines the next sequential reference id.
//! - `delta`: field id delta 0..=2 inline, 3 means a varint delta follows.
//!
//! For the extended wire type the low five bits carry the marker kind
//! instead; kind 0 is the end of a tag-delimited object, so the end marker
//! is always the single byte `0xE0`.

use std::sync::Arc;

/// Payload framing of a field, independent of its logical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    VarInt = 0,
    TagDelimited = 1,
    LengthPrefixed = 2,
    Fixed32 = 3,
    Fixed64 = 4,
    Fixed128 = 5,
    Reference = 6,
    /// Marker space (end of object); never a payload framing.
    Extended = 7,
}

impl WireType {
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => WireType::VarInt,
            1 => WireType::TagDelimited,
            2 => WireType::LengthPrefixed,
            3 => WireType::Fixed32,
            4 => WireType::Fixed64,
            5 => WireType::Fixed128,
            6 => WireType::Reference,
            _ => WireType::Extended,
        }
    }

    /// Fixed payload size in bytes, if the wire type has one.
    #[inline]
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            WireType::Fixed32 => Some(4),
            WireType::Fixed64 => Some(8),
            WireType::Fixed128 => Some(16),
            _ => None,
        }
    }
}

/// How the field's concrete type is conveyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SchemaType {
    /// Type known from the schema; no tag.
    Expected = 0,
    /// Registry-assigned numeric id follows.
    WellKnown = 1,
    /// Length-prefixed type name follows, cached by the session.
    Encoded = 2,
    /// Index into the session's type name cache follows.
    Referenced = 3,
}

impl SchemaType {
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => SchemaType::Expected,
            1 => SchemaType::WellKnown,
            2 => SchemaType::Encoded,
            _ => SchemaType::Referenced,
        }
    }
}

/// Extended marker kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExtendedKind {
    EndObject = 0,
}

pub const END_OBJECT: u8 = ((WireType::Extended as u8) << 5) | ExtendedKind::EndObject as u8;

/// Largest delta stored inside the header byte.
pub const MAX_INLINE_DELTA: u32 = 2;
/// Inline delta value announcing a trailing varint delta.
pub const EXTENDED_DELTA: u8 = 3;

const TRACKED_BIT: u8 = 0x04;

/// Reference id standing for "no object".
pub const NULL_REFERENCE: u32 = 0;

/// Concrete type named by a header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    WellKnown(u32),
    Named(Arc<str>),
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeTag::WellKnown(id) => write!(f, "#{}", id),
            TypeTag::Named(name) => f.write_str(name),
        }
    }
}

/// Decoded field header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldHeader {
    /// Delta from the previous field id in the enclosing object.
    pub field_id_delta: u32,
    pub wire_type: WireType,
    pub schema_type: SchemaType,
    /// Concrete type, present when `schema_type` is not `Expected`.
    pub type_tag: Option<TypeTag>,
    /// Reference id defined by this field's payload (tracked headers only).
    pub tracked_id: Option<u32>,
    /// Target id of a `Reference` field; `Some(0)` is null.
    pub reference: Option<u32>,
    /// End of the enclosing tag-delimited object.
    pub is_end_marker: bool,
}

impl FieldHeader {
    pub fn end_marker() -> Self {
        Self {
            field_id_delta: 0,
            wire_type: WireType::Extended,
            schema_type: SchemaType::Expected,
            type_tag: None,
            tracked_id: None,
            reference: None,
            is_end_marker: true,
        }
    }

    #[inline]
    pub fn is_tracked(&self) -> bool {
        self.tracked_id.is_some()
    }

    /// Absent value: a null reference on an untracked header.
    ///
    /// A tracked header with a null payload defines an identity node whose
    /// contents are `None`.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.tracked_id.is_none() && self.reference == Some(NULL_REFERENCE)
    }
}

/// First byte of a header as laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderByte {
    pub wire_type: WireType,
    pub schema_type: SchemaType,
    pub tracked: bool,
    /// 0..=2, or [`EXTENDED_DELTA`].
    pub inline_delta: u8,
}

impl HeaderByte {
    pub fn pack(self) -> u8 {
        let tracked = if self.tracked { TRACKED_BIT } else { 0 };
        ((self.wire_type as u8) << 5)
            | ((self.schema_type as u8) << 3)
            | tracked
            | (self.inline_delta & 0x03)
    }

    /// Split a non-extended header byte.
    pub fn unpack(byte: u8) -> Self {
        Self {
            wire_type: WireType::from_bits(byte >> 5),
            schema_type: SchemaType::from_bits(byte >> 3),
            tracked: byte & TRACKED_BIT != 0,
            inline_delta: byte & 0x03,
        }
    }
}

/// Split a field id delta into its inline part and optional trailing varint.
#[inline]
pub fn split_delta(delta: u32) -> (u8, Option<u32>) {
    if delta <= MAX_INLINE_DELTA {
        (delta as u8, None)
    } else {
        (EXTENDED_DELTA, Some(delta))
    }
}

/// Decode an extended marker byte.
#[inline]
pub fn extended_kind(byte: u8) -> Option<ExtendedKind> {
    match byte & 0x1F {
        0 => Some(ExtendedKind::EndObject),
        _ => None,
    }
}
