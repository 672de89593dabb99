// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Codec and copier capability contract.
//!
//! Every type that crosses the wire supplies one codec/copier pair:
//!
//! - [`FieldCodec::write_field`] writes one field (header + payload).
//! - [`FieldCodec::read_value`] reads the payload announced by a header.
//! - [`DeepCopier::deep_copy`] clones a value graph without touching the wire.
//!
//! [`Serializable`] is the registration marker tying a type to its default
//! pair. `#[derive(Serializable)]` generates it for structs; the built-in
//! implementations live in the submodules.
//!
//! # Static and resolved dispatch
//!
//! Schema-typed fields go through `T::Codec` directly (monomorphized, no
//! lookup). The registry path ([`CodecRegistry::resolve_codec`]) returns
//! `Arc<dyn FieldCodec<T>>` and honours hand-installed overrides; composite
//! codecs built there receive their component codecs by injection.

mod collections;
mod dynamic;
mod primitives;
mod shared;
mod tuple;

pub use collections::{BTreeMapCodec, BoxCodec, HashMapCodec, OptionCodec, VecCodec};
pub use dynamic::{Dynamic, DynamicCodec};
pub use primitives::{
    BoolCodec, BytesCodec, CharCodec, F32Codec, F64Codec, I128Codec, I16Codec, I32Codec,
    I64Codec, I8Codec, IsizeCodec, StringCodec, U128Codec, U16Codec, U32Codec, U64Codec, U8Codec,
    UsizeCodec,
};
pub use shared::{ArcCodec, Shared, SharedCodec};
pub use tuple::{
    TupleCodec0, TupleCodec1, TupleCodec2, TupleCodec3, TupleCodec4, TupleCodec5, TupleCodec6,
    TupleCodec7, TupleCodec8,
};

use crate::copy::CopyContext;
use crate::cursor::{Reader, Writer};
use crate::error::{CodecError, Result};
use crate::registry::CodecRegistry;
use crate::wire::{FieldHeader, WireType};
use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Runtime identity of a static type, with its name for diagnostics.
#[derive(Clone, Copy)]
pub struct TypeKey {
    pub id: TypeId,
    pub name: &'static str,
}

impl TypeKey {
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Writes and reads one logical type.
pub trait FieldCodec<T>: Send + Sync {
    /// Write `value` as a field `field_id_delta` ids after the previous one.
    ///
    /// `expected` is the type the enclosing schema declares for the field.
    /// When it differs from the value's own type the concrete type is tagged
    /// in the header so a reader can pick the right codec.
    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: TypeKey,
        value: &T,
    ) -> Result<()>;

    /// Read the payload announced by `header`.
    fn read_value(&self, reader: &mut Reader<'_>, header: &FieldHeader) -> Result<T>;

    /// Codec this one merely forwards to, if any.
    fn inner_codec(&self) -> Option<Arc<dyn FieldCodec<T>>> {
        None
    }
}

/// Clones one logical type, preserving shared identity through the context.
pub trait DeepCopier<T>: Send + Sync {
    fn deep_copy(&self, value: &T, context: &mut CopyContext) -> Result<T>;

    /// Copier this one merely forwards to, if any.
    fn inner_copier(&self) -> Option<Arc<dyn DeepCopier<T>>> {
        None
    }
}

impl<T: 'static> FieldCodec<T> for Arc<dyn FieldCodec<T>> {
    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: TypeKey,
        value: &T,
    ) -> Result<()> {
        (**self).write_field(writer, field_id_delta, expected, value)
    }

    fn read_value(&self, reader: &mut Reader<'_>, header: &FieldHeader) -> Result<T> {
        (**self).read_value(reader, header)
    }

    fn inner_codec(&self) -> Option<Arc<dyn FieldCodec<T>>> {
        Some(Arc::clone(self))
    }
}

impl<T: 'static> DeepCopier<T> for Arc<dyn DeepCopier<T>> {
    fn deep_copy(&self, value: &T, context: &mut CopyContext) -> Result<T> {
        (**self).deep_copy(value, context)
    }

    fn inner_copier(&self) -> Option<Arc<dyn DeepCopier<T>>> {
        Some(Arc::clone(self))
    }
}

/// Strip forwarding wrappers so callers hold the codec that does the work.
pub fn unwrap_codec<T: 'static>(mut codec: Arc<dyn FieldCodec<T>>) -> Arc<dyn FieldCodec<T>> {
    // Dispatch on the pointee: `Arc<dyn FieldCodec<T>>` is itself a forwarder.
    while let Some(inner) = FieldCodec::inner_codec(&*codec) {
        codec = inner;
    }
    codec
}

pub fn unwrap_copier<T: 'static>(mut copier: Arc<dyn DeepCopier<T>>) -> Arc<dyn DeepCopier<T>> {
    while let Some(inner) = DeepCopier::inner_copier(&*copier) {
        copier = inner;
    }
    copier
}

/// Registration marker: associates a type with its default codec/copier.
pub trait Serializable: Sized + Send + Sync + 'static {
    type Codec: FieldCodec<Self> + DeepCopier<Self> + Default + 'static;

    /// Compact numeric type tag; types without one are tagged by name.
    const WELL_KNOWN_ID: Option<u32> = None;

    /// Stable name used to tag the type on the wire.
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }

    /// Codec instance used on the registry path.
    fn build_codec(registry: &CodecRegistry) -> Result<Arc<dyn FieldCodec<Self>>> {
        let _ = registry;
        Ok(Arc::new(Self::Codec::default()))
    }

    /// Copier instance used on the registry path.
    fn build_copier(registry: &CodecRegistry) -> Result<Arc<dyn DeepCopier<Self>>> {
        let _ = registry;
        Ok(Arc::new(Self::Codec::default()))
    }
}

/// Fail unless `header` carries `wire_type`.
#[inline]
pub fn expect_wire_type(
    header: &FieldHeader,
    wire_type: WireType,
    codec: &'static str,
) -> Result<()> {
    if header.wire_type == wire_type {
        Ok(())
    } else {
        Err(CodecError::UnsupportedWireType {
            codec,
            wire_type: header.wire_type,
        })
    }
}
