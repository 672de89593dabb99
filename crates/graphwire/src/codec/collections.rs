// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Standard library wrappers and collections.
//!
//! Sequences and maps are tag-delimited objects:
//!
//! ```text
//! { 0: count (VarInt), 1: element, 1: element, ... } END
//! ```
//!
//! The first element has delta 1 and the rest delta 0. Map entries are
//! 2-tuples laid out like [`TupleCodec2`](super::TupleCodec2) values.
//! `Option<T>` writes `None` as the null reference and `Some(v)` as `v`.

use super::{expect_wire_type, DeepCopier, FieldCodec, Serializable, TypeKey};
use crate::copy::CopyContext;
use crate::cursor::{Reader, Writer};
use crate::error::{CodecError, Result};
use crate::registry::CodecRegistry;
use crate::wire::{FieldHeader, WireType};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::Arc;

const COUNT_FIELD: u32 = 0;
const ELEMENT_FIELD: u32 = 1;
const KEY_FIELD: u32 = 1;
const VALUE_FIELD: u32 = 2;

/// Cap for capacity hints taken from the wire.
const MAX_PREALLOCATION: usize = 4096;

fn write_count(writer: &mut Writer<'_>, count: usize) -> Result<()> {
    let key = TypeKey::of::<u64>();
    writer.write_field_header(COUNT_FIELD, key, key, WireType::VarInt)?;
    writer.write_varint64(count as u64);
    Ok(())
}

fn read_count(reader: &mut Reader<'_>, header: &FieldHeader) -> Result<usize> {
    expect_wire_type(header, WireType::VarInt, "collection count")?;
    let limit = reader.session().config().max_length;
    let count = reader.read_varint64()?;
    match usize::try_from(count) {
        Ok(count) if count <= limit => Ok(count.min(MAX_PREALLOCATION)),
        _ => Err(CodecError::LengthLimitExceeded {
            length: usize::try_from(count).unwrap_or(usize::MAX),
            limit,
        }),
    }
}

fn element_delta(index: usize) -> u32 {
    if index == 0 {
        ELEMENT_FIELD
    } else {
        0
    }
}

fn composite_name(outer: &str, inner: &[Cow<'static, str>]) -> Cow<'static, str> {
    Cow::Owned(format!("{}<{}>", outer, inner.join(",")))
}

// ---------------------------------------------------------------------------
// Option<T>
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
pub struct OptionCodec<C> {
    pub inner: C,
}

impl<T, C> FieldCodec<Option<T>> for OptionCodec<C>
where
    T: Send + Sync + 'static,
    C: FieldCodec<T>,
{
    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: TypeKey,
        value: &Option<T>,
    ) -> Result<()> {
        let own = TypeKey::of::<Option<T>>();
        match value {
            None => writer.write_null_reference(field_id_delta, expected, own),
            Some(inner) => {
                if expected != own {
                    writer.annotate_type(own);
                }
                self.inner
                    .write_field(writer, field_id_delta, TypeKey::of::<T>(), inner)
            }
        }
    }

    fn read_value(&self, reader: &mut Reader<'_>, header: &FieldHeader) -> Result<Option<T>> {
        if header.is_null() {
            return Ok(None);
        }
        Ok(Some(self.inner.read_value(reader, header)?))
    }
}

impl<T, C> DeepCopier<Option<T>> for OptionCodec<C>
where
    T: Send + Sync + 'static,
    C: DeepCopier<T>,
{
    fn deep_copy(&self, value: &Option<T>, context: &mut CopyContext) -> Result<Option<T>> {
        match value {
            None => Ok(None),
            Some(inner) => Ok(Some(self.inner.deep_copy(inner, context)?)),
        }
    }
}

impl<T: Serializable> Serializable for Option<T> {
    type Codec = OptionCodec<T::Codec>;

    fn type_name() -> Cow<'static, str> {
        composite_name("Option", &[T::type_name()])
    }

    fn build_codec(registry: &CodecRegistry) -> Result<Arc<dyn FieldCodec<Self>>> {
        Ok(Arc::new(OptionCodec {
            inner: registry.resolve_codec::<T>()?,
        }))
    }

    fn build_copier(registry: &CodecRegistry) -> Result<Arc<dyn DeepCopier<Self>>> {
        Ok(Arc::new(OptionCodec {
            inner: registry.resolve_copier::<T>()?,
        }))
    }
}

// ---------------------------------------------------------------------------
// Box<T>
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
pub struct BoxCodec<C> {
    pub inner: C,
}

impl<T, C> FieldCodec<Box<T>> for BoxCodec<C>
where
    T: Send + Sync + 'static,
    C: FieldCodec<T>,
{
    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: TypeKey,
        value: &Box<T>,
    ) -> Result<()> {
        let own = TypeKey::of::<Box<T>>();
        if expected != own {
            writer.annotate_type(own);
        }
        self.inner
            .write_field(writer, field_id_delta, TypeKey::of::<T>(), value)
    }

    fn read_value(&self, reader: &mut Reader<'_>, header: &FieldHeader) -> Result<Box<T>> {
        Ok(Box::new(self.inner.read_value(reader, header)?))
    }
}

impl<T, C> DeepCopier<Box<T>> for BoxCodec<C>
where
    T: Send + Sync + 'static,
    C: DeepCopier<T>,
{
    fn deep_copy(&self, value: &Box<T>, context: &mut CopyContext) -> Result<Box<T>> {
        Ok(Box::new(self.inner.deep_copy(value, context)?))
    }
}

impl<T: Serializable> Serializable for Box<T> {
    type Codec = BoxCodec<T::Codec>;

    fn type_name() -> Cow<'static, str> {
        composite_name("Box", &[T::type_name()])
    }
}

// ---------------------------------------------------------------------------
// Vec<T>
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
pub struct VecCodec<C> {
    pub element: C,
}

impl<T, C> FieldCodec<Vec<T>> for VecCodec<C>
where
    T: Send + Sync + 'static,
    C: FieldCodec<T>,
{
    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: TypeKey,
        value: &Vec<T>,
    ) -> Result<()> {
        writer.session_mut().mark_value_field();
        writer.write_field_header(
            field_id_delta,
            expected,
            TypeKey::of::<Vec<T>>(),
            WireType::TagDelimited,
        )?;
        write_count(writer, value.len())?;
        for (index, element) in value.iter().enumerate() {
            self.element
                .write_field(writer, element_delta(index), TypeKey::of::<T>(), element)?;
        }
        writer.write_end_object();
        Ok(())
    }

    fn read_value(&self, reader: &mut Reader<'_>, header: &FieldHeader) -> Result<Vec<T>> {
        expect_wire_type(header, WireType::TagDelimited, "VecCodec")?;
        reader.session_mut().mark_value_field();
        let mut elements = Vec::new();
        reader.read_object(|reader, field_id, field| {
            match field_id {
                COUNT_FIELD => elements.reserve(read_count(reader, field)?),
                ELEMENT_FIELD => elements.push(self.element.read_value(reader, field)?),
                _ => reader.consume_unknown_field(field)?,
            }
            Ok(())
        })?;
        Ok(elements)
    }
}

impl<T, C> DeepCopier<Vec<T>> for VecCodec<C>
where
    T: Send + Sync + 'static,
    C: DeepCopier<T>,
{
    fn deep_copy(&self, value: &Vec<T>, context: &mut CopyContext) -> Result<Vec<T>> {
        value
            .iter()
            .map(|element| self.element.deep_copy(element, context))
            .collect()
    }
}

impl<T: Serializable> Serializable for Vec<T> {
    type Codec = VecCodec<T::Codec>;

    fn type_name() -> Cow<'static, str> {
        composite_name("Vec", &[T::type_name()])
    }

    fn build_codec(registry: &CodecRegistry) -> Result<Arc<dyn FieldCodec<Self>>> {
        Ok(Arc::new(VecCodec {
            element: registry.resolve_codec::<T>()?,
        }))
    }

    fn build_copier(registry: &CodecRegistry) -> Result<Arc<dyn DeepCopier<Self>>> {
        Ok(Arc::new(VecCodec {
            element: registry.resolve_copier::<T>()?,
        }))
    }
}

// ---------------------------------------------------------------------------
// Maps
// ---------------------------------------------------------------------------

fn write_entry<K, V, KC, VC>(
    writer: &mut Writer<'_>,
    field_id_delta: u32,
    key_codec: &KC,
    value_codec: &VC,
    key: &K,
    value: &V,
) -> Result<()>
where
    K: 'static,
    V: 'static,
    KC: FieldCodec<K>,
    VC: FieldCodec<V>,
{
    writer.session_mut().mark_value_field();
    let entry = TypeKey::of::<(K, V)>();
    writer.write_field_header(field_id_delta, entry, entry, WireType::TagDelimited)?;
    key_codec.write_field(writer, KEY_FIELD, TypeKey::of::<K>(), key)?;
    value_codec.write_field(writer, VALUE_FIELD - KEY_FIELD, TypeKey::of::<V>(), value)?;
    writer.write_end_object();
    Ok(())
}

fn read_entry<K, V, KC, VC>(
    reader: &mut Reader<'_>,
    header: &FieldHeader,
    key_codec: &KC,
    value_codec: &VC,
) -> Result<(K, V)>
where
    K: Default,
    V: Default,
    KC: FieldCodec<K>,
    VC: FieldCodec<V>,
{
    expect_wire_type(header, WireType::TagDelimited, "map entry")?;
    reader.session_mut().mark_value_field();
    let mut key = K::default();
    let mut value = V::default();
    reader.read_object(|reader, field_id, field| {
        match field_id {
            KEY_FIELD => key = key_codec.read_value(reader, field)?,
            VALUE_FIELD => value = value_codec.read_value(reader, field)?,
            _ => reader.consume_unknown_field(field)?,
        }
        Ok(())
    })?;
    Ok((key, value))
}

/// Generate a map codec over an iterable map type.
macro_rules! map_codec {
    ($codec:ident, $map:ident, $name:literal, [$($key_bound:tt)+]) => {
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $codec<KC, VC> {
            pub key: KC,
            pub value: VC,
        }

        impl<K, V, KC, VC> FieldCodec<$map<K, V>> for $codec<KC, VC>
        where
            K: $($key_bound)+ + Default + Send + Sync + 'static,
            V: Default + Send + Sync + 'static,
            KC: FieldCodec<K>,
            VC: FieldCodec<V>,
        {
            fn write_field(
                &self,
                writer: &mut Writer<'_>,
                field_id_delta: u32,
                expected: TypeKey,
                value: &$map<K, V>,
            ) -> Result<()> {
                writer.session_mut().mark_value_field();
                writer.write_field_header(
                    field_id_delta,
                    expected,
                    TypeKey::of::<$map<K, V>>(),
                    WireType::TagDelimited,
                )?;
                write_count(writer, value.len())?;
                for (index, (k, v)) in value.iter().enumerate() {
                    write_entry(writer, element_delta(index), &self.key, &self.value, k, v)?;
                }
                writer.write_end_object();
                Ok(())
            }

            fn read_value(
                &self,
                reader: &mut Reader<'_>,
                header: &FieldHeader,
            ) -> Result<$map<K, V>> {
                expect_wire_type(header, WireType::TagDelimited, stringify!($codec))?;
                reader.session_mut().mark_value_field();
                let mut map = $map::new();
                reader.read_object(|reader, field_id, field| {
                    match field_id {
                        COUNT_FIELD => {
                            read_count(reader, field)?;
                        }
                        ELEMENT_FIELD => {
                            let (k, v) = read_entry(reader, field, &self.key, &self.value)?;
                            map.insert(k, v);
                        }
                        _ => reader.consume_unknown_field(field)?,
                    }
                    Ok(())
                })?;
                Ok(map)
            }
        }

        impl<K, V, KC, VC> DeepCopier<$map<K, V>> for $codec<KC, VC>
        where
            K: $($key_bound)+ + Send + Sync + 'static,
            V: Send + Sync + 'static,
            KC: DeepCopier<K>,
            VC: DeepCopier<V>,
        {
            fn deep_copy(
                &self,
                value: &$map<K, V>,
                context: &mut CopyContext,
            ) -> Result<$map<K, V>> {
                let mut copy = $map::new();
                for (k, v) in value {
                    copy.insert(
                        self.key.deep_copy(k, context)?,
                        self.value.deep_copy(v, context)?,
                    );
                }
                Ok(copy)
            }
        }

        impl<K, V> Serializable for $map<K, V>
        where
            K: Serializable + $($key_bound)+ + Default,
            V: Serializable + Default,
        {
            type Codec = $codec<K::Codec, V::Codec>;

            fn type_name() -> Cow<'static, str> {
                composite_name($name, &[K::type_name(), V::type_name()])
            }

            fn build_codec(registry: &CodecRegistry) -> Result<Arc<dyn FieldCodec<Self>>> {
                Ok(Arc::new($codec {
                    key: registry.resolve_codec::<K>()?,
                    value: registry.resolve_codec::<V>()?,
                }))
            }

            fn build_copier(registry: &CodecRegistry) -> Result<Arc<dyn DeepCopier<Self>>> {
                Ok(Arc::new($codec {
                    key: registry.resolve_copier::<K>()?,
                    value: registry.resolve_copier::<V>()?,
                }))
            }
        }
    };
}

map_codec!(HashMapCodec, HashMap, "HashMap", [Eq + Hash]);
map_codec!(BTreeMapCodec, BTreeMap, "BTreeMap", [Ord]);
