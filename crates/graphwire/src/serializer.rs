// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Top-level entry points.
//!
//! A [`Serializer`] owns a registry handle and a session pool. Each call
//! borrows one session for its whole duration, so a single `Serializer`
//! can be shared across threads (`Arc<Serializer>`) with no locking on the
//! encode/decode path.
//!
//! The root value is written as field 0 (delta 0) with its own type as the
//! expected type, so a non-polymorphic root carries no type tag.

use crate::codec::{FieldCodec, Serializable, TypeKey};
use crate::config::CodecConfig;
use crate::copy::CopyContext;
use crate::cursor::{Reader, Writer};
use crate::error::{CodecError, Result};
use crate::registry::CodecRegistry;
use crate::session::SessionPool;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::sync::Arc;

const ROOT_DELTA: u32 = 0;

pub struct Serializer {
    pool: SessionPool,
}

impl Serializer {
    pub fn new(registry: Arc<CodecRegistry>) -> Self {
        Self::with_config(registry, CodecConfig::default())
    }

    pub fn with_config(registry: Arc<CodecRegistry>, config: CodecConfig) -> Self {
        Self {
            pool: SessionPool::new(registry, config),
        }
    }

    /// Serializer over [`CodecRegistry::global`] with limits from the
    /// environment.
    pub fn global() -> Self {
        Self::with_config(CodecRegistry::global(), CodecConfig::from_env())
    }

    pub fn registry(&self) -> &Arc<CodecRegistry> {
        self.pool.registry()
    }

    pub fn config(&self) -> CodecConfig {
        self.pool.config()
    }

    /// Encode `value` into a fresh buffer.
    pub fn serialize<T: Serializable>(&self, value: &T) -> Result<Bytes> {
        let mut out = BytesMut::new();
        self.serialize_into(value, &mut out)?;
        Ok(out.freeze())
    }

    /// Encode `value` into `output`.
    ///
    /// On error, `output` may hold a partial encoding.
    pub fn serialize_into<T: Serializable>(
        &self,
        value: &T,
        output: &mut dyn BufMut,
    ) -> Result<()> {
        let mut session = self.pool.acquire();
        let mut writer = Writer::new(output, &mut session);
        writer.write_value(ROOT_DELTA, value)?;
        log::trace!(
            "[serializer] wrote {} ({} bytes)",
            std::any::type_name::<T>(),
            writer.written()
        );
        Ok(())
    }

    /// Decode one root value of type `T` from `input`.
    ///
    /// Bytes after the root field are left in `input`.
    pub fn deserialize<T: Serializable>(&self, input: &mut dyn Buf) -> Result<T> {
        let mut session = self.pool.acquire();
        let mut reader = Reader::new(input, &mut session);
        let header = read_root_header(&mut reader)?;
        reader.read_value::<T>(&header)
    }

    pub fn deserialize_bytes<T: Serializable>(&self, bytes: &[u8]) -> Result<T> {
        let mut input = bytes;
        self.deserialize(&mut input)
    }

    /// Encode through the registry, honouring installed codec overrides.
    pub fn serialize_resolved<T: Serializable>(&self, value: &T) -> Result<Bytes> {
        let codec = self.registry().resolve_codec::<T>()?;
        let mut out = BytesMut::new();
        let mut session = self.pool.acquire();
        let mut writer = Writer::new(&mut out, &mut session);
        codec.write_field(&mut writer, ROOT_DELTA, TypeKey::of::<T>(), value)?;
        Ok(out.freeze())
    }

    /// Decode through the registry, honouring installed codec overrides.
    pub fn deserialize_resolved<T: Serializable>(&self, input: &mut dyn Buf) -> Result<T> {
        let codec = self.registry().resolve_codec::<T>()?;
        let mut session = self.pool.acquire();
        let mut reader = Reader::new(input, &mut session);
        let header = read_root_header(&mut reader)?;
        codec.read_value(&mut reader, &header)
    }

    /// Clone `value` in memory, preserving shared identity and cycles.
    pub fn deep_copy<T: Serializable>(&self, value: &T) -> Result<T> {
        let mut context = CopyContext::new(Arc::clone(self.registry()), self.config());
        context.copy_resolved(value)
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::global()
    }
}

impl std::fmt::Debug for Serializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Serializer")
            .field("config", &self.config())
            .field("idle_sessions", &self.pool.idle())
            .finish()
    }
}

fn read_root_header(reader: &mut Reader<'_>) -> Result<crate::wire::FieldHeader> {
    let header = reader.read_field_header()?;
    if header.is_end_marker {
        return Err(CodecError::InvalidData {
            reason: "end marker in place of a root value".into(),
        });
    }
    Ok(header)
}
