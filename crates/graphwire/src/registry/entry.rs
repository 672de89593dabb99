// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type-erased registry entries used for polymorphic dispatch.

use crate::codec::{DeepCopier, FieldCodec, Serializable, TypeKey};
use crate::copy::CopyContext;
use crate::cursor::{Reader, Writer};
use crate::error::{CodecError, Result};
use crate::wire::FieldHeader;
use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;

/// Erased value handle passed through polymorphic dispatch.
pub type AnyValue = Arc<dyn Any + Send + Sync>;

/// Codec/copier pair operating on erased values.
pub trait ErasedCodec: Send + Sync {
    fn write_erased(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: TypeKey,
        value: &(dyn Any + Send + Sync),
    ) -> Result<()>;

    fn read_erased(&self, reader: &mut Reader<'_>, header: &FieldHeader) -> Result<AnyValue>;

    fn copy_erased(
        &self,
        value: &(dyn Any + Send + Sync),
        context: &mut CopyContext,
    ) -> Result<AnyValue>;
}

/// Erased handler for a [`Serializable`] type.
///
/// Codecs are resolved through the session's registry at call time, so
/// overrides installed after registration are honoured.
pub struct TypedEntry<T>(PhantomData<fn() -> T>);

impl<T> TypedEntry<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for TypedEntry<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn downcast<T: 'static>(value: &(dyn Any + Send + Sync)) -> Result<&T> {
    value
        .downcast_ref::<T>()
        .ok_or_else(|| CodecError::TypeMismatch {
            expected: std::any::type_name::<T>(),
            actual: "erased value of another type".to_string(),
        })
}

impl<T: Serializable> ErasedCodec for TypedEntry<T> {
    fn write_erased(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: TypeKey,
        value: &(dyn Any + Send + Sync),
    ) -> Result<()> {
        let value = downcast::<T>(value)?;
        let codec = writer.session().registry().resolve_codec::<T>()?;
        codec.write_field(writer, field_id_delta, expected, value)
    }

    fn read_erased(&self, reader: &mut Reader<'_>, header: &FieldHeader) -> Result<AnyValue> {
        let codec = reader.session().registry().resolve_codec::<T>()?;
        Ok(Arc::new(codec.read_value(reader, header)?))
    }

    fn copy_erased(
        &self,
        value: &(dyn Any + Send + Sync),
        context: &mut CopyContext,
    ) -> Result<AnyValue> {
        let value = downcast::<T>(value)?;
        let copier = context.registry().resolve_copier::<T>()?;
        Ok(Arc::new(copier.deep_copy(value, context)?))
    }
}

/// One registered type.
pub struct TypeEntry {
    type_id: TypeId,
    rust_name: &'static str,
    name: Arc<str>,
    well_known_id: Option<u32>,
    handler: Arc<dyn ErasedCodec>,
}

impl TypeEntry {
    /// Entry for a [`Serializable`] type, using its declared name and id.
    pub fn of<T: Serializable>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            rust_name: std::any::type_name::<T>(),
            name: Arc::from(T::type_name().as_ref()),
            well_known_id: T::WELL_KNOWN_ID,
            handler: Arc::new(TypedEntry::<T>::new()),
        }
    }

    /// Entry with a hand-written handler, for fallback resolvers.
    pub fn new(
        key: TypeKey,
        name: Arc<str>,
        well_known_id: Option<u32>,
        handler: Arc<dyn ErasedCodec>,
    ) -> Self {
        Self {
            type_id: key.id,
            rust_name: key.name,
            name,
            well_known_id,
            handler,
        }
    }

    /// `TypeId` of the registered type (not of the entry).
    pub fn rust_type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn rust_name(&self) -> &'static str {
        self.rust_name
    }

    /// Name written in `Encoded` type tags.
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub fn well_known_id(&self) -> Option<u32> {
        self.well_known_id
    }

    pub fn handler(&self) -> &Arc<dyn ErasedCodec> {
        &self.handler
    }
}

impl std::fmt::Debug for TypeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeEntry")
            .field("name", &self.name)
            .field("rust_name", &self.rust_name)
            .field("well_known_id", &self.well_known_id)
            .finish()
    }
}
