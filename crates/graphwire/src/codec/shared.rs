// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Identity-tracked reference types.
//!
//! - [`Shared<T>`] (`Arc<RwLock<T>>`): mutable shared node. Supports aliasing
//!   and cycles: on read, a default placeholder is registered under the
//!   field's reference id before its contents are decoded, and filled in
//!   afterwards, so a reentrant reference resolves to the same handle.
//! - `Arc<T>`: immutable shared value. Aliasing is preserved; a cycle through
//!   an `Arc<T>` cannot be built in memory and fails on read with
//!   `UnresolvedReference`.
//!
//! The first occurrence of an object is written in full with the tracked
//! header bit set; later occurrences are a `Reference` field carrying its id.

use super::{DeepCopier, FieldCodec, Serializable, TypeKey};
use crate::copy::CopyContext;
use crate::cursor::{Reader, Writer};
use crate::error::{CodecError, Result};
use crate::registry::CodecRegistry;
use crate::session::Recorded;
use crate::wire::FieldHeader;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Shared, mutable, identity-carrying node.
pub struct Shared<T>(Arc<RwLock<T>>);

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write()
    }

    /// Replace the contents, returning the previous value.
    pub fn replace(&self, value: T) -> T {
        std::mem::replace(&mut *self.0.write(), value)
    }

    /// Same underlying node.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Identity key used by sessions and copy contexts.
    pub fn address(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: Default> Default for Shared<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

// Contents are not printed: a cyclic graph would never terminate.
impl<T> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shared({:#x})", self.address())
    }
}

fn arc_address<T>(value: &Arc<T>) -> usize {
    Arc::as_ptr(value) as *const () as usize
}

/// Target id of a back-reference field, `None` when the field holds the
/// object itself.
fn back_reference(header: &FieldHeader, type_name: &'static str) -> Result<Option<u32>> {
    if header.is_tracked() {
        return Ok(None);
    }
    if header.is_null() {
        return Err(CodecError::InvalidData {
            reason: format!("null reference for non-optional {}", type_name),
        });
    }
    Ok(header.reference)
}

/// Header passed to the wrapped codec; the reference id belongs to the wrapper.
fn contents_header(header: &FieldHeader) -> FieldHeader {
    FieldHeader {
        tracked_id: None,
        ..header.clone()
    }
}

// ---------------------------------------------------------------------------
// Shared<T>
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
pub struct SharedCodec<C> {
    pub inner: C,
}

impl<T, C> FieldCodec<Shared<T>> for SharedCodec<C>
where
    T: Default + Send + Sync + 'static,
    C: FieldCodec<T>,
{
    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: TypeKey,
        value: &Shared<T>,
    ) -> Result<()> {
        match writer
            .session_mut()
            .references_mut()
            .record_written(value.address())?
        {
            Recorded::Existing(id) => {
                writer.write_reference(field_id_delta, id);
                Ok(())
            }
            Recorded::New(_) => {
                let own = TypeKey::of::<Shared<T>>();
                if expected != own {
                    writer.annotate_type(own);
                }
                writer.mark_tracked();
                let contents = value.read();
                self.inner
                    .write_field(writer, field_id_delta, TypeKey::of::<T>(), &contents)
            }
        }
    }

    fn read_value(&self, reader: &mut Reader<'_>, header: &FieldHeader) -> Result<Shared<T>> {
        if let Some(id) = back_reference(header, std::any::type_name::<Shared<T>>())? {
            return reader.session().references().lookup_as::<Shared<T>>(id);
        }

        let node = Shared::new(T::default());
        if let Some(id) = header.tracked_id {
            reader
                .session_mut()
                .references_mut()
                .resolve(id, node.clone())?;
        }
        let contents = self.inner.read_value(reader, &contents_header(header))?;
        *node.write() = contents;
        Ok(node)
    }
}

impl<T, C> DeepCopier<Shared<T>> for SharedCodec<C>
where
    T: Default + Send + Sync + 'static,
    C: DeepCopier<T>,
{
    fn deep_copy(&self, value: &Shared<T>, context: &mut CopyContext) -> Result<Shared<T>> {
        if let Some(copy) = context.lookup::<Shared<T>>(value.address())? {
            return Ok(copy);
        }
        let target = Shared::new(T::default());
        context.record(value.address(), target.clone());
        let contents = self.inner.deep_copy(&value.read(), context)?;
        *target.write() = contents;
        Ok(target)
    }
}

impl<T: Serializable + Default> Serializable for Shared<T> {
    type Codec = SharedCodec<T::Codec>;

    fn type_name() -> Cow<'static, str> {
        Cow::Owned(format!("Shared<{}>", T::type_name()))
    }

    fn build_codec(registry: &CodecRegistry) -> Result<Arc<dyn FieldCodec<Self>>> {
        Ok(Arc::new(SharedCodec {
            inner: registry.resolve_codec::<T>()?,
        }))
    }

    fn build_copier(registry: &CodecRegistry) -> Result<Arc<dyn DeepCopier<Self>>> {
        Ok(Arc::new(SharedCodec {
            inner: registry.resolve_copier::<T>()?,
        }))
    }
}

// ---------------------------------------------------------------------------
// Arc<T>
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
pub struct ArcCodec<C> {
    pub inner: C,
}

impl<T, C> FieldCodec<Arc<T>> for ArcCodec<C>
where
    T: Send + Sync + 'static,
    C: FieldCodec<T>,
{
    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: TypeKey,
        value: &Arc<T>,
    ) -> Result<()> {
        match writer
            .session_mut()
            .references_mut()
            .record_written(arc_address(value))?
        {
            Recorded::Existing(id) => {
                writer.write_reference(field_id_delta, id);
                Ok(())
            }
            Recorded::New(_) => {
                let own = TypeKey::of::<Arc<T>>();
                if expected != own {
                    writer.annotate_type(own);
                }
                writer.mark_tracked();
                self.inner
                    .write_field(writer, field_id_delta, TypeKey::of::<T>(), value)
            }
        }
    }

    fn read_value(&self, reader: &mut Reader<'_>, header: &FieldHeader) -> Result<Arc<T>> {
        if let Some(id) = back_reference(header, std::any::type_name::<Arc<T>>())? {
            return reader.session().references().lookup_as::<Arc<T>>(id);
        }
        // The id stays reserved but unresolved while the contents are read.
        let value = Arc::new(self.inner.read_value(reader, &contents_header(header))?);
        if let Some(id) = header.tracked_id {
            reader
                .session_mut()
                .references_mut()
                .resolve(id, Arc::clone(&value))?;
        }
        Ok(value)
    }
}

impl<T, C> DeepCopier<Arc<T>> for ArcCodec<C>
where
    T: Send + Sync + 'static,
    C: DeepCopier<T>,
{
    fn deep_copy(&self, value: &Arc<T>, context: &mut CopyContext) -> Result<Arc<T>> {
        let address = arc_address(value);
        if let Some(copy) = context.lookup::<Arc<T>>(address)? {
            return Ok(copy);
        }
        let copy = Arc::new(self.inner.deep_copy(value, context)?);
        context.record(address, Arc::clone(&copy));
        Ok(copy)
    }
}

impl<T: Serializable> Serializable for Arc<T> {
    type Codec = ArcCodec<T::Codec>;

    fn type_name() -> Cow<'static, str> {
        Cow::Owned(format!("Arc<{}>", T::type_name()))
    }

    fn build_codec(registry: &CodecRegistry) -> Result<Arc<dyn FieldCodec<Self>>> {
        Ok(Arc::new(ArcCodec {
            inner: registry.resolve_codec::<T>()?,
        }))
    }

    fn build_copier(registry: &CodecRegistry) -> Result<Arc<dyn DeepCopier<Self>>> {
        Ok(Arc::new(ArcCodec {
            inner: registry.resolve_copier::<T>()?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodecConfig;
    use crate::session::Session;
    use crate::wire::WireType;

    fn registry() -> Arc<CodecRegistry> {
        Arc::new(CodecRegistry::new())
    }

    fn encode<T: Serializable>(value: &T) -> Vec<u8> {
        let mut session = Session::new(registry(), CodecConfig::default());
        let mut out: Vec<u8> = Vec::new();
        Writer::new(&mut out, &mut session)
            .write_value(0, value)
            .expect("encode");
        out
    }

    fn decode<T: Serializable>(bytes: &[u8]) -> Result<T> {
        let mut session = Session::new(registry(), CodecConfig::default());
        let mut input = bytes;
        let mut reader = Reader::new(&mut input, &mut session);
        let header = reader.read_field_header()?;
        reader.read_value::<T>(&header)
    }

    #[test]
    fn test_alias_written_once() {
        let node = Shared::new(String::from("shared"));
        let pair = (node.clone(), node.clone());
        let bytes = encode(&pair);
        // Second occurrence is a bare reference to id 1.
        let tail = &bytes[bytes.len() - 3..];
        assert_eq!(tail[0] >> 5, WireType::Reference as u8);
        assert_eq!(tail[1], 1);

        let (a, b) = decode::<(Shared<String>, Shared<String>)>(&bytes).expect("decode");
        assert!(Shared::ptr_eq(&a, &b));
        assert_eq!(*a.read(), "shared");
    }

    #[test]
    fn test_arc_alias_preserved() {
        let value = Arc::new(vec![1u32, 2, 3]);
        let pair = (Arc::clone(&value), value);
        let (a, b) = decode::<(Arc<Vec<u32>>, Arc<Vec<u32>>)>(&encode(&pair)).expect("decode");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*a, vec![1, 2, 3]);
    }

    #[test]
    fn test_self_cycle_roundtrip() {
        type Node = (u32, Option<Shared<NodeBox>>);
        #[derive(Default)]
        struct NodeBox(Node);
        impl Serializable for NodeBox {
            type Codec = NodeBoxCodec;
        }
        #[derive(Default)]
        struct NodeBoxCodec;
        impl FieldCodec<NodeBox> for NodeBoxCodec {
            fn write_field(
                &self,
                writer: &mut Writer<'_>,
                delta: u32,
                _: TypeKey,
                value: &NodeBox,
            ) -> Result<()> {
                writer.write_value(delta, &value.0)
            }
            fn read_value(&self, reader: &mut Reader<'_>, header: &FieldHeader) -> Result<NodeBox> {
                Ok(NodeBox(reader.read_value(header)?))
            }
        }
        impl DeepCopier<NodeBox> for NodeBoxCodec {
            fn deep_copy(&self, value: &NodeBox, context: &mut CopyContext) -> Result<NodeBox> {
                Ok(NodeBox(context.copy(&value.0)?))
            }
        }

        let node = Shared::new(NodeBox((7, None)));
        node.write().0 .1 = Some(node.clone());
        let bytes = encode(&node);
        node.write().0 .1 = None;

        let decoded = decode::<Shared<NodeBox>>(&bytes).expect("decode");
        let next = decoded.read().0 .1.clone().expect("cycle link");
        assert!(Shared::ptr_eq(&decoded, &next));
        assert_eq!(decoded.read().0 .0, 7);
        decoded.write().0 .1 = None;
    }

    #[test]
    fn test_null_rejected_for_required_reference() {
        let bytes = encode(&None::<Shared<u8>>);
        assert!(matches!(
            decode::<Shared<u8>>(&bytes),
            Err(CodecError::InvalidData { .. })
        ));
    }

    #[test]
    fn test_wrapper_around_none_keeps_its_id() {
        let bytes = encode(&Shared::new(None::<String>));
        // Tracked null reference: the node is defined, its contents absent.
        assert_eq!(bytes, vec![0b110_00_1_00, 0]);
        let decoded = decode::<Shared<Option<String>>>(&bytes).expect("decode");
        assert!(decoded.read().is_none());

        let bytes = encode(&Arc::new(None::<u32>));
        assert!(decode::<Arc<Option<u32>>>(&bytes).expect("arc").is_none());
    }

    #[test]
    fn test_ids_stay_in_step_after_wrapped_none() {
        let empty = Shared::new(None::<u8>);
        let full = Shared::new(Some(5u8));
        let value = vec![Some(empty), Some(full.clone()), Some(full)];
        let decoded = decode::<Vec<Option<Shared<Option<u8>>>>>(&encode(&value)).expect("decode");

        let nodes: Vec<_> = decoded.into_iter().map(|n| n.expect("present")).collect();
        assert!(nodes[0].read().is_none());
        assert_eq!(*nodes[1].read(), Some(5));
        assert!(Shared::ptr_eq(&nodes[1], &nodes[2]));
    }

    #[test]
    fn test_dangling_reference() {
        // Reference field pointing at id 4 with nothing defined.
        let bytes = [0b110_00_0_00, 4];
        assert_eq!(
            decode::<Shared<u8>>(&bytes).unwrap_err(),
            CodecError::UnknownReference { id: 4 }
        );
    }

    #[test]
    fn test_deep_copy_preserves_aliasing() {
        let node = Shared::new(5u64);
        let value = vec![node.clone(), node.clone(), Shared::new(5u64)];
        let mut context = CopyContext::new(registry(), CodecConfig::default());
        let copy = context.copy(&value).expect("copy");
        assert!(Shared::ptr_eq(&copy[0], &copy[1]));
        assert!(!Shared::ptr_eq(&copy[0], &copy[2]));
        assert!(!Shared::ptr_eq(&copy[0], &node));
        *copy[0].write() = 9;
        assert_eq!(*node.read(), 5);
    }
}
