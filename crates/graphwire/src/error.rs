// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type shared by every codec, cursor and registry operation.
//!
//! All variants are scoped to the operation that produced them: a failed
//! decode never leaves a partially built value behind and never mutates the
//! process-wide registry.

use crate::wire::WireType;
use std::fmt;

/// Codec error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input ended before a complete token could be read.
    UnexpectedEof { offset: usize },
    /// Variable-length integer is longer than its width allows or overflows.
    MalformedVarint { offset: usize },
    /// Header byte does not describe a valid field or marker.
    InvalidHeader { offset: usize, byte: u8 },
    /// Codec was handed a wire type it cannot interpret.
    UnsupportedWireType {
        codec: &'static str,
        wire_type: WireType,
    },
    /// Type tag names a type the registry cannot resolve.
    UnknownType { name: String },
    /// Runtime type has no codec registered.
    UnregisteredType { type_name: &'static str },
    /// Resolved codec does not produce the requested type.
    TypeMismatch {
        expected: &'static str,
        actual: String,
    },
    /// Reference id was never assigned in this session.
    UnknownReference { id: u32 },
    /// Reference id was assigned but its object was never materialized.
    UnresolvedReference { id: u32 },
    /// Length prefix or element count exceeds the configured limit.
    LengthLimitExceeded { length: usize, limit: usize },
    /// Object nesting exceeds the configured limit.
    DepthLimitExceeded { limit: usize },
    /// Session recorded more references than the configured limit.
    ReferenceLimitExceeded { limit: usize },
    /// Payload is well framed but semantically invalid (bad UTF-8, ...).
    InvalidData { reason: String },
    /// A different type already claims this name or well-known id.
    DuplicateRegistration { key: String, existing: String },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::UnexpectedEof { offset } => {
                write!(f, "unexpected end of input at offset {}", offset)
            }
            CodecError::MalformedVarint { offset } => {
                write!(f, "malformed varint at offset {}", offset)
            }
            CodecError::InvalidHeader { offset, byte } => {
                write!(f, "invalid field header 0x{:02x} at offset {}", byte, offset)
            }
            CodecError::UnsupportedWireType { codec, wire_type } => {
                write!(f, "{} cannot read wire type {:?}", codec, wire_type)
            }
            CodecError::UnknownType { name } => write!(f, "unknown type '{}'", name),
            CodecError::UnregisteredType { type_name } => {
                write!(f, "no codec registered for '{}'", type_name)
            }
            CodecError::TypeMismatch { expected, actual } => {
                write!(f, "type mismatch: expected '{}', found '{}'", expected, actual)
            }
            CodecError::UnknownReference { id } => write!(f, "unknown reference id {}", id),
            CodecError::UnresolvedReference { id } => {
                write!(f, "reference id {} points to an object that was never materialized", id)
            }
            CodecError::LengthLimitExceeded { length, limit } => {
                write!(f, "length {} exceeds limit {}", length, limit)
            }
            CodecError::DepthLimitExceeded { limit } => {
                write!(f, "nesting depth exceeds limit {}", limit)
            }
            CodecError::ReferenceLimitExceeded { limit } => {
                write!(f, "reference count exceeds limit {}", limit)
            }
            CodecError::InvalidData { reason } => write!(f, "invalid data: {}", reason),
            CodecError::DuplicateRegistration { key, existing } => {
                write!(f, "'{}' is already registered to '{}'", key, existing)
            }
        }
    }
}

impl std::error::Error for CodecError {}

pub type Result<T> = core::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_error_display_variants() {
        let err = CodecError::UnexpectedEof { offset: 12 };
        assert_eq!(err.to_string(), "unexpected end of input at offset 12");

        let err = CodecError::InvalidHeader {
            offset: 3,
            byte: 0xE5,
        };
        assert_eq!(err.to_string(), "invalid field header 0xe5 at offset 3");

        let err = CodecError::UnsupportedWireType {
            codec: "StringCodec",
            wire_type: WireType::VarInt,
        };
        assert_eq!(err.to_string(), "StringCodec cannot read wire type VarInt");

        let err = CodecError::UnresolvedReference { id: 7 };
        assert_eq!(
            err.to_string(),
            "reference id 7 points to an object that was never materialized"
        );
    }

    #[test]
    fn test_codec_error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(CodecError::DepthLimitExceeded { limit: 4 });
        assert_eq!(err.to_string(), "nesting depth exceeds limit 4");
    }
}
