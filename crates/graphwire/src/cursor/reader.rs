// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reader over any `bytes::Buf`, contiguous or segmented.

use crate::codec::{FieldCodec, Serializable};
use crate::error::{CodecError, Result};
use crate::session::Session;
use crate::wire::varint::{get_varint32, get_varint64, VarintError};
use crate::wire::{
    extended_kind, ExtendedKind, FieldHeader, HeaderByte, SchemaType, TypeTag, WireType,
    EXTENDED_DELTA,
};
use bytes::{Buf, Bytes};
use std::sync::Arc;

/// Generate little-endian fixed-width readers.
macro_rules! impl_read_fixed {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> Result<$type> {
            let mut bytes = [0u8; $size];
            self.read_exact(&mut bytes)?;
            Ok(<$type>::from_le_bytes(bytes))
        }
    };
}

pub struct Reader<'a> {
    input: &'a mut dyn Buf,
    session: &'a mut Session,
    position: usize,
    depth: usize,
}

impl<'a> Reader<'a> {
    pub fn new(input: &'a mut dyn Buf, session: &'a mut Session) -> Self {
        Self {
            input,
            session,
            position: 0,
            depth: 0,
        }
    }

    pub fn session(&self) -> &Session {
        &*self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut *self.session
    }

    /// Bytes consumed so far; used as the offset in errors.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.input.remaining()
    }

    /// Tag-delimited objects currently open.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        if !self.input.has_remaining() {
            return Err(CodecError::UnexpectedEof {
                offset: self.position,
            });
        }
        self.position += 1;
        Ok(self.input.get_u8())
    }

    pub fn read_exact(&mut self, out: &mut [u8]) -> Result<()> {
        self.ensure(out.len())?;
        self.input.copy_to_slice(out);
        self.position += out.len();
        Ok(())
    }

    pub fn read_varint32(&mut self) -> Result<u32> {
        let start = self.position;
        let (value, used) = get_varint32(&mut *self.input).map_err(|e| varint_error(e, start))?;
        self.position += used;
        Ok(value)
    }

    pub fn read_varint64(&mut self) -> Result<u64> {
        let start = self.position;
        let (value, used) = get_varint64(&mut *self.input).map_err(|e| varint_error(e, start))?;
        self.position += used;
        Ok(value)
    }

    impl_read_fixed!(read_fixed32, u32, 4);
    impl_read_fixed!(read_fixed64, u64, 8);
    impl_read_fixed!(read_fixed128, u128, 16);

    /// Varint length prefix, checked against the configured maximum.
    pub fn read_length(&mut self) -> Result<usize> {
        let limit = self.session.config().max_length;
        let length = self.read_varint64()?;
        match usize::try_from(length) {
            Ok(length) if length <= limit => Ok(length),
            _ => Err(CodecError::LengthLimitExceeded {
                length: usize::try_from(length).unwrap_or(usize::MAX),
                limit,
            }),
        }
    }

    /// Length-prefixed payload, copied out of the (possibly segmented) input.
    pub fn read_length_prefixed(&mut self) -> Result<Bytes> {
        let length = self.read_length()?;
        self.ensure(length)?;
        self.position += length;
        Ok(self.input.copy_to_bytes(length))
    }

    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_length_prefixed()?;
        String::from_utf8(bytes.to_vec()).map_err(|e| CodecError::InvalidData {
            reason: format!("invalid UTF-8: {}", e),
        })
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.ensure(count)?;
        self.input.advance(count);
        self.position += count;
        Ok(())
    }

    /// Read the next header, its type tag, and (for references) the target id.
    ///
    /// A tracked header reserves its reference id right away, whether the
    /// field is then decoded or skipped, so ids stay in step with the writer.
    pub fn read_field_header(&mut self) -> Result<FieldHeader> {
        let offset = self.position;
        let byte = self.read_u8()?;
        if WireType::from_bits(byte >> 5) == WireType::Extended {
            return match extended_kind(byte) {
                Some(ExtendedKind::EndObject) => Ok(FieldHeader::end_marker()),
                None => Err(CodecError::InvalidHeader { offset, byte }),
            };
        }

        let raw = HeaderByte::unpack(byte);
        let field_id_delta = if raw.inline_delta == EXTENDED_DELTA {
            self.read_varint32()?
        } else {
            u32::from(raw.inline_delta)
        };
        let type_tag = self.read_type_tag(raw.schema_type)?;
        let tracked_id = if raw.tracked {
            Some(self.session.references_mut().reserve()?)
        } else {
            None
        };
        let reference = if raw.wire_type == WireType::Reference {
            Some(self.read_varint32()?)
        } else {
            None
        };

        Ok(FieldHeader {
            field_id_delta,
            wire_type: raw.wire_type,
            schema_type: raw.schema_type,
            type_tag,
            tracked_id,
            reference,
            is_end_marker: false,
        })
    }

    fn read_type_tag(&mut self, schema_type: SchemaType) -> Result<Option<TypeTag>> {
        match schema_type {
            SchemaType::Expected => Ok(None),
            SchemaType::WellKnown => Ok(Some(TypeTag::WellKnown(self.read_varint32()?))),
            SchemaType::Encoded => {
                let name: Arc<str> = Arc::from(self.read_string()?);
                self.session.types_mut().record_read(Arc::clone(&name));
                Ok(Some(TypeTag::Named(name)))
            }
            SchemaType::Referenced => {
                let index = self.read_varint32()?;
                let name = self.session.types().name_at(index).cloned().ok_or_else(|| {
                    CodecError::InvalidData {
                        reason: format!("type cache index {} out of range", index),
                    }
                })?;
                Ok(Some(TypeTag::Named(name)))
            }
        }
    }

    /// Skip the payload of a field this reader does not understand.
    ///
    /// Works from the wire type alone. Nested objects are skipped with an
    /// explicit depth counter bounded by the configured maximum depth.
    pub fn consume_unknown_field(&mut self, header: &FieldHeader) -> Result<()> {
        if header.is_end_marker {
            return Ok(());
        }
        log::trace!(
            "[reader] skipping {:?} field at offset {}",
            header.wire_type,
            self.position
        );
        match header.wire_type {
            WireType::VarInt => {
                self.read_varint64()?;
            }
            // The target id was consumed with the header.
            WireType::Reference | WireType::Extended => {}
            WireType::Fixed32 | WireType::Fixed64 | WireType::Fixed128 => {
                let size = header.wire_type.fixed_size().unwrap_or(0);
                self.skip(size)?;
            }
            WireType::LengthPrefixed => {
                let length = self.read_length()?;
                self.skip(length)?;
            }
            WireType::TagDelimited => self.skip_object()?,
        }
        Ok(())
    }

    fn skip_object(&mut self) -> Result<()> {
        let limit = self.session.config().max_depth;
        let mut open = 1usize;
        if self.depth + open > limit {
            return Err(CodecError::DepthLimitExceeded { limit });
        }
        while open > 0 {
            let header = self.read_field_header()?;
            if header.is_end_marker {
                open -= 1;
            } else if header.wire_type == WireType::TagDelimited {
                open += 1;
                if self.depth + open > limit {
                    return Err(CodecError::DepthLimitExceeded { limit });
                }
            } else {
                self.consume_unknown_field(&header)?;
            }
        }
        Ok(())
    }

    /// Walk the fields of a tag-delimited object up to its end marker.
    ///
    /// `visit` receives each field with its absolute id (deltas already
    /// accumulated) and must either decode or skip it.
    pub fn read_object<F>(&mut self, mut visit: F) -> Result<()>
    where
        F: FnMut(&mut Self, u32, &FieldHeader) -> Result<()>,
    {
        let limit = self.session.config().max_depth;
        if self.depth >= limit {
            return Err(CodecError::DepthLimitExceeded { limit });
        }
        self.depth += 1;
        let result = self.read_fields(&mut visit);
        self.depth -= 1;
        result
    }

    fn read_fields<F>(&mut self, visit: &mut F) -> Result<()>
    where
        F: FnMut(&mut Self, u32, &FieldHeader) -> Result<()>,
    {
        let mut field_id = 0u32;
        loop {
            let header = self.read_field_header()?;
            if header.is_end_marker {
                return Ok(());
            }
            field_id = field_id
                .checked_add(header.field_id_delta)
                .ok_or_else(|| CodecError::InvalidData {
                    reason: "field id overflow".into(),
                })?;
            visit(self, field_id, &header)?;
        }
    }

    /// Decode the field announced by `header` through `T`'s default codec.
    pub fn read_value<T: Serializable>(&mut self, header: &FieldHeader) -> Result<T> {
        T::Codec::default().read_value(self, header)
    }

    fn ensure(&self, count: usize) -> Result<()> {
        if self.input.remaining() < count {
            return Err(CodecError::UnexpectedEof {
                offset: self.position + self.input.remaining(),
            });
        }
        Ok(())
    }
}

fn varint_error(error: VarintError, offset: usize) -> CodecError {
    match error {
        VarintError::Eof => CodecError::UnexpectedEof { offset },
        VarintError::Malformed => CodecError::MalformedVarint { offset },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodecConfig;
    use crate::registry::CodecRegistry;
    use crate::wire::END_OBJECT;

    fn session() -> Session {
        Session::new(Arc::new(CodecRegistry::new()), CodecConfig::default())
    }

    #[test]
    fn test_read_header_with_extended_delta() {
        let mut session = session();
        let mut input: &[u8] = &[0b000_00_0_11, 0xAC, 0x02, 0x07];
        let mut reader = Reader::new(&mut input, &mut session);
        let header = reader.read_field_header().expect("header");
        assert_eq!(header.field_id_delta, 300);
        assert_eq!(header.wire_type, WireType::VarInt);
        assert_eq!(reader.read_varint32().expect("payload"), 7);
        assert_eq!(reader.position(), 4);
    }

    #[test]
    fn test_invalid_extended_kind() {
        let mut session = session();
        let mut input: &[u8] = &[0x00, 0x05, 0xE3];
        let mut reader = Reader::new(&mut input, &mut session);
        reader.read_field_header().expect("first header");
        reader.read_varint32().expect("payload");
        assert_eq!(
            reader.read_field_header(),
            Err(CodecError::InvalidHeader {
                offset: 2,
                byte: 0xE3
            })
        );
    }

    #[test]
    fn test_truncated_input_reports_offset() {
        let mut session = session();
        let mut input: &[u8] = &[0b011_00_0_01, 0x01, 0x02];
        let mut reader = Reader::new(&mut input, &mut session);
        reader.read_field_header().expect("header");
        assert_eq!(
            reader.read_fixed32(),
            Err(CodecError::UnexpectedEof { offset: 3 })
        );
    }

    #[test]
    fn test_length_limit() {
        let mut session = Session::new(
            Arc::new(CodecRegistry::new()),
            CodecConfig::default().with_max_length(4),
        );
        let mut input: &[u8] = &[0x05, b'h', b'e', b'l', b'l', b'o'];
        let mut reader = Reader::new(&mut input, &mut session);
        assert_eq!(
            reader.read_length_prefixed(),
            Err(CodecError::LengthLimitExceeded {
                length: 5,
                limit: 4
            })
        );
    }

    #[test]
    fn test_skip_nested_object() {
        // { 1: { 1: 9, 2: "ab" }, 2: 0x01020304 } then 7
        let bytes = [
            0b001_00_0_01,
            0b001_00_0_01,
            0b000_00_0_01,
            9,
            0b010_00_0_01,
            2,
            b'a',
            b'b',
            END_OBJECT,
            0b011_00_0_01,
            4,
            3,
            2,
            1,
            END_OBJECT,
            7,
        ];
        let mut session = session();
        let mut input: &[u8] = &bytes;
        let mut reader = Reader::new(&mut input, &mut session);
        let header = reader.read_field_header().expect("outer header");
        reader.consume_unknown_field(&header).expect("skip");
        assert_eq!(reader.read_u8().expect("trailer"), 7);
    }

    #[test]
    fn test_skip_depth_limit() {
        let mut bytes = vec![0b001_00_0_00; 5];
        bytes.extend_from_slice(&[END_OBJECT; 5]);
        let mut session = Session::new(
            Arc::new(CodecRegistry::new()),
            CodecConfig::default().with_max_depth(3),
        );
        let mut input: &[u8] = &bytes;
        let mut reader = Reader::new(&mut input, &mut session);
        let header = reader.read_field_header().expect("header");
        assert_eq!(
            reader.consume_unknown_field(&header),
            Err(CodecError::DepthLimitExceeded { limit: 3 })
        );
    }

    #[test]
    fn test_read_object_accumulates_field_ids() {
        // fields with deltas 1, 2, 3 -> ids 1, 3, 6
        let bytes = [
            0b000_00_0_01,
            10,
            0b000_00_0_10,
            20,
            0b000_00_0_11,
            3,
            30,
            END_OBJECT,
        ];
        let mut session = session();
        let mut input: &[u8] = &bytes;
        let mut reader = Reader::new(&mut input, &mut session);
        let mut seen = Vec::new();
        reader
            .read_object(|reader, id, _| {
                seen.push((id, reader.read_varint32()?));
                Ok(())
            })
            .expect("object");
        assert_eq!(seen, vec![(1, 10), (3, 20), (6, 30)]);
        assert_eq!(reader.depth(), 0);
    }

    #[test]
    fn test_tracked_header_reserves_id_even_when_skipped() {
        let bytes = [0b001_00_1_01, END_OBJECT, 0b001_00_1_01, END_OBJECT];
        let mut session = session();
        let mut input: &[u8] = &bytes;
        let mut reader = Reader::new(&mut input, &mut session);
        let first = reader.read_field_header().expect("first");
        assert_eq!(first.tracked_id, Some(1));
        reader.consume_unknown_field(&first).expect("skip");
        let second = reader.read_field_header().expect("second");
        assert_eq!(second.tracked_id, Some(2));
    }

    #[test]
    fn test_segmented_input() {
        let mut session = session();
        let mut input = (&[0b010_00_0_00, 0x05, b'h'][..]).chain(&b"ello"[..]);
        let mut reader = Reader::new(&mut input, &mut session);
        let header = reader.read_field_header().expect("header");
        assert_eq!(header.wire_type, WireType::LengthPrefixed);
        assert_eq!(reader.read_string().expect("string"), "hello");
    }
}
