// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Append-only writer over a caller-supplied sink.

use crate::codec::{FieldCodec, Serializable, TypeKey};
use crate::error::{CodecError, Result};
use crate::session::Session;
use crate::wire::varint::{put_varint32, put_varint64};
use crate::wire::{split_delta, HeaderByte, SchemaType, WireType, END_OBJECT, NULL_REFERENCE};
use bytes::BufMut;
use std::sync::Arc;

/// Generate little-endian fixed-width writers.
macro_rules! impl_write_fixed {
    ($name:ident, $type:ty) => {
        pub fn $name(&mut self, value: $type) {
            self.write_bytes(&value.to_le_bytes());
        }
    };
}

/// Type tag chosen for a header, before it is written.
enum EncodedTag {
    WellKnown(u32),
    Encoded(Arc<str>),
    Referenced(u32),
}

impl EncodedTag {
    fn schema_type(&self) -> SchemaType {
        match self {
            EncodedTag::WellKnown(_) => SchemaType::WellKnown,
            EncodedTag::Encoded(_) => SchemaType::Encoded,
            EncodedTag::Referenced(_) => SchemaType::Referenced,
        }
    }
}

pub struct Writer<'a> {
    output: &'a mut dyn BufMut,
    session: &'a mut Session,
    written: usize,
    pending_type: Option<TypeKey>,
    pending_tracked: bool,
}

impl<'a> Writer<'a> {
    pub fn new(output: &'a mut dyn BufMut, session: &'a mut Session) -> Self {
        Self {
            output,
            session,
            written: 0,
            pending_type: None,
            pending_tracked: false,
        }
    }

    pub fn session(&self) -> &Session {
        &*self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut *self.session
    }

    /// Bytes written through this writer.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn write_u8(&mut self, value: u8) {
        self.output.put_u8(value);
        self.written += 1;
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.output.put_slice(bytes);
        self.written += bytes.len();
    }

    pub fn write_varint32(&mut self, value: u32) {
        self.written += put_varint32(&mut *self.output, value);
    }

    pub fn write_varint64(&mut self, value: u64) {
        self.written += put_varint64(&mut *self.output, value);
    }

    impl_write_fixed!(write_fixed32, u32);
    impl_write_fixed!(write_fixed64, u64);
    impl_write_fixed!(write_fixed128, u128);

    /// Varint length followed by the bytes themselves.
    pub fn write_length_prefixed(&mut self, bytes: &[u8]) {
        self.write_varint64(bytes.len() as u64);
        self.write_bytes(bytes);
    }

    /// Force the next header to tag `actual` as its concrete type.
    ///
    /// Wrapper codecs call this before delegating to the codec of the value
    /// they wrap, so the tag names the wrapper rather than its contents.
    pub fn annotate_type(&mut self, actual: TypeKey) {
        self.pending_type = Some(actual);
    }

    /// Mark the next header as defining a new reference id.
    pub fn mark_tracked(&mut self) {
        self.pending_tracked = true;
    }

    /// Write a field header.
    ///
    /// The concrete type is tagged when `expected` and `actual` differ (or
    /// a wrapper annotated one); otherwise the schema already knows it.
    pub fn write_field_header(
        &mut self,
        field_id_delta: u32,
        expected: TypeKey,
        actual: TypeKey,
        wire_type: WireType,
    ) -> Result<()> {
        let tag = match self.pending_type.take() {
            Some(annotated) => Some(self.encode_type(annotated)?),
            None if expected != actual => Some(self.encode_type(actual)?),
            None => None,
        };
        let tracked = std::mem::take(&mut self.pending_tracked);
        self.emit_header(field_id_delta, wire_type, tag, tracked);
        Ok(())
    }

    /// Write a back-reference to an object already written under `id`.
    pub fn write_reference(&mut self, field_id_delta: u32, id: u32) {
        self.pending_type = None;
        self.pending_tracked = false;
        self.emit_header(field_id_delta, WireType::Reference, None, false);
        self.write_varint32(id);
    }

    /// Write the null reference, tagged like any other field of `actual`.
    ///
    /// A pending tracked mark is kept: an identity wrapper around `None`
    /// still defines its reference id.
    pub fn write_null_reference(
        &mut self,
        field_id_delta: u32,
        expected: TypeKey,
        actual: TypeKey,
    ) -> Result<()> {
        self.write_field_header(field_id_delta, expected, actual, WireType::Reference)?;
        self.write_varint32(NULL_REFERENCE);
        Ok(())
    }

    pub fn write_end_object(&mut self) {
        self.write_u8(END_OBJECT);
    }

    /// Write `value` through its default codec, tagged only if polymorphic.
    pub fn write_value<T: Serializable>(&mut self, field_id_delta: u32, value: &T) -> Result<()> {
        T::Codec::default().write_field(self, field_id_delta, TypeKey::of::<T>(), value)
    }

    fn encode_type(&mut self, key: TypeKey) -> Result<EncodedTag> {
        let entry = self
            .session
            .registry()
            .lookup_type(key)
            .ok_or(CodecError::UnregisteredType {
                type_name: key.name,
            })?;
        if let Some(id) = entry.well_known_id() {
            return Ok(EncodedTag::WellKnown(id));
        }
        if let Some(index) = self.session.types().written_index(key.id) {
            return Ok(EncodedTag::Referenced(index));
        }
        self.session.types_mut().record_written(key.id);
        Ok(EncodedTag::Encoded(Arc::clone(entry.name())))
    }

    fn emit_header(
        &mut self,
        field_id_delta: u32,
        wire_type: WireType,
        tag: Option<EncodedTag>,
        tracked: bool,
    ) {
        let (inline_delta, extended_delta) = split_delta(field_id_delta);
        let header = HeaderByte {
            wire_type,
            schema_type: tag
                .as_ref()
                .map_or(SchemaType::Expected, EncodedTag::schema_type),
            tracked,
            inline_delta,
        };
        self.write_u8(header.pack());
        if let Some(delta) = extended_delta {
            self.write_varint32(delta);
        }
        match tag {
            Some(EncodedTag::WellKnown(id)) | Some(EncodedTag::Referenced(id)) => {
                self.write_varint32(id)
            }
            Some(EncodedTag::Encoded(name)) => self.write_length_prefixed(name.as_bytes()),
            None => {}
        }
    }
}
