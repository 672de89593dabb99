// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema-less stream walker.
//!
//! Decodes a stream into a flat token list using nothing but the framing
//! rules: no registry, no codecs. Used by the `graphwire-dump` tool and by
//! tests that assert on exact wire layouts.

use super::{FieldHeader, TypeTag, WireType};
use crate::config::CodecConfig;
use crate::cursor::Reader;
use crate::error::{CodecError, Result};
use crate::registry::CodecRegistry;
use crate::session::Session;
use bytes::{Buf, Bytes};
use std::fmt;
use std::sync::Arc;

/// Payload of one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenPayload {
    VarInt(u64),
    Bytes(Bytes),
    Fixed32(u32),
    Fixed64(u64),
    Fixed128(u128),
    Reference(u32),
    BeginObject,
    EndObject,
}

/// One field (or end marker) of a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireToken {
    /// Tag-delimited objects enclosing this token.
    pub depth: usize,
    /// Absolute field id within the enclosing object.
    pub field_id: u32,
    pub header: FieldHeader,
    pub payload: TokenPayload,
}

impl WireToken {
    pub fn type_tag(&self) -> Option<&TypeTag> {
        self.header.type_tag.as_ref()
    }
}

impl fmt::Display for WireToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = "  ".repeat(self.depth);
        if self.payload == TokenPayload::EndObject {
            return write!(f, "{}}}", indent);
        }
        write!(f, "{}[{}] {:?}", indent, self.field_id, self.header.wire_type)?;
        if let Some(tag) = &self.header.type_tag {
            write!(f, " <{}>", tag)?;
        }
        if let Some(id) = self.header.tracked_id {
            write!(f, " &{}", id)?;
        }
        match &self.payload {
            TokenPayload::VarInt(value) => write!(f, " = {}", value),
            TokenPayload::Bytes(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => write!(f, " = {:?}", text),
                Err(_) => {
                    write!(f, " = 0x")?;
                    bytes.iter().try_for_each(|b| write!(f, "{:02x}", b))
                }
            },
            TokenPayload::Fixed32(value) => write!(f, " = 0x{:08x}", value),
            TokenPayload::Fixed64(value) => write!(f, " = 0x{:016x}", value),
            TokenPayload::Fixed128(value) => write!(f, " = 0x{:032x}", value),
            TokenPayload::Reference(0) => write!(f, " = null"),
            TokenPayload::Reference(id) => write!(f, " -> &{}", id),
            TokenPayload::BeginObject => write!(f, " {{"),
            TokenPayload::EndObject => Ok(()),
        }
    }
}

/// Walk every top-level field of `input`.
pub fn dump(input: &[u8]) -> Result<Vec<WireToken>> {
    let mut buf = input;
    dump_buf(&mut buf, CodecConfig::default())
}

/// Walk `input` until it is exhausted, bounded by `config`.
pub fn dump_buf(input: &mut dyn Buf, config: CodecConfig) -> Result<Vec<WireToken>> {
    let mut session = Session::new(Arc::new(CodecRegistry::empty()), config);
    let mut reader = Reader::new(input, &mut session);
    let mut tokens = Vec::new();
    // Last field id of each open object, outermost first.
    let mut field_ids = vec![0u32];

    while reader.remaining() > 0 || field_ids.len() > 1 {
        let header = reader.read_field_header()?;
        let depth = field_ids.len() - 1;

        if header.is_end_marker {
            if depth == 0 {
                return Err(CodecError::InvalidData {
                    reason: format!("unbalanced end marker at offset {}", reader.position() - 1),
                });
            }
            field_ids.pop();
            tokens.push(WireToken {
                depth: depth - 1,
                field_id: 0,
                header,
                payload: TokenPayload::EndObject,
            });
            continue;
        }

        let current = field_ids.last_mut().ok_or_else(|| CodecError::InvalidData {
            reason: "object stack underflow".into(),
        })?;
        let field_id = current.checked_add(header.field_id_delta).ok_or_else(|| {
            CodecError::InvalidData {
                reason: "field id overflow".into(),
            }
        })?;
        *current = field_id;

        let payload = match header.wire_type {
            WireType::VarInt => TokenPayload::VarInt(reader.read_varint64()?),
            WireType::LengthPrefixed => TokenPayload::Bytes(reader.read_length_prefixed()?),
            WireType::Fixed32 => TokenPayload::Fixed32(reader.read_fixed32()?),
            WireType::Fixed64 => TokenPayload::Fixed64(reader.read_fixed64()?),
            WireType::Fixed128 => TokenPayload::Fixed128(reader.read_fixed128()?),
            WireType::Reference => TokenPayload::Reference(header.reference.unwrap_or(0)),
            WireType::TagDelimited => {
                if field_ids.len() >= config.max_depth {
                    return Err(CodecError::DepthLimitExceeded {
                        limit: config.max_depth,
                    });
                }
                field_ids.push(0);
                TokenPayload::BeginObject
            }
            WireType::Extended => {
                return Err(CodecError::InvalidData {
                    reason: format!("stray marker before offset {}", reader.position()),
                })
            }
        };
        tokens.push(WireToken {
            depth,
            field_id,
            header,
            payload,
        });
    }
    Ok(tokens)
}

/// Render tokens one per line.
pub fn render(tokens: &[WireToken]) -> String {
    tokens
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
