// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Open-world polymorphic values.
//!
//! A [`Dynamic`] field accepts any type registered with the registry. The
//! writer always tags the concrete type (the schema only knows `Dynamic`),
//! and the reader picks the codec from the tag. Identity belongs to the
//! wrapped `Shared<T>` / `Arc<T>`, not to the `Dynamic` itself.

use super::{DeepCopier, FieldCodec, Serializable, TypeKey};
use crate::copy::CopyContext;
use crate::cursor::{Reader, Writer};
use crate::error::{CodecError, Result};
use crate::registry::AnyValue;
use crate::wire::FieldHeader;
use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Type-erased value of any registered type.
#[derive(Clone)]
pub struct Dynamic {
    value: AnyValue,
    type_name: &'static str,
}

impl Dynamic {
    pub fn new<T: Serializable>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub(crate) fn from_erased(value: AnyValue, type_name: &'static str) -> Self {
        Self { value, type_name }
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Runtime type of the wrapped value.
    pub fn value_type_id(&self) -> TypeId {
        // Through the pointee: `Arc<dyn Any>` is itself `Any`.
        (*self.value).type_id()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn as_any(&self) -> &(dyn Any + Send + Sync) {
        &*self.value
    }

    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.value, &b.value)
    }

    fn key(&self) -> TypeKey {
        TypeKey {
            id: self.value_type_id(),
            name: self.type_name,
        }
    }
}

impl Default for Dynamic {
    fn default() -> Self {
        Self::new(())
    }
}

impl fmt::Debug for Dynamic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dynamic({})", self.type_name)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DynamicCodec;

impl FieldCodec<Dynamic> for DynamicCodec {
    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: TypeKey,
        value: &Dynamic,
    ) -> Result<()> {
        let key = value.key();
        let entry = writer
            .session()
            .registry()
            .lookup_type(key)
            .ok_or(CodecError::UnregisteredType {
                type_name: value.type_name,
            })?;
        entry
            .handler()
            .write_erased(writer, field_id_delta, expected, value.as_any())
    }

    fn read_value(&self, reader: &mut Reader<'_>, header: &FieldHeader) -> Result<Dynamic> {
        let back_reference = header
            .reference
            .filter(|id| *id != crate::wire::NULL_REFERENCE && !header.is_tracked());
        if let Some(id) = back_reference {
            let handle = reader.session().references().lookup(id)?.clone();
            let type_name = handle.type_name();
            return Ok(Dynamic::from_erased(handle.into_value(), type_name));
        }
        let tag = header.type_tag.as_ref().ok_or_else(|| CodecError::InvalidData {
            reason: "polymorphic field without a type tag".into(),
        })?;
        let entry = reader.session().registry().lookup_tag(tag)?;
        let value = entry.handler().read_erased(reader, header)?;
        Ok(Dynamic::from_erased(value, entry.rust_name()))
    }
}

impl DeepCopier<Dynamic> for DynamicCodec {
    fn deep_copy(&self, value: &Dynamic, context: &mut CopyContext) -> Result<Dynamic> {
        let entry = context
            .registry()
            .lookup_type(value.key())
            .ok_or(CodecError::UnregisteredType {
                type_name: value.type_name,
            })?;
        let copy = entry.handler().copy_erased(value.as_any(), context)?;
        Ok(Dynamic::from_erased(copy, value.type_name))
    }
}

impl Serializable for Dynamic {
    type Codec = DynamicCodec;

    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("Dynamic")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Shared;
    use crate::config::CodecConfig;
    use crate::registry::CodecRegistry;
    use crate::session::Session;
    use crate::wire::SchemaType;

    fn registry() -> Arc<CodecRegistry> {
        let registry = Arc::new(CodecRegistry::new());
        registry.register::<Shared<String>>().expect("register");
        registry.register::<Vec<u16>>().expect("register");
        registry
    }

    fn roundtrip<T: Serializable>(registry: &Arc<CodecRegistry>, value: &T) -> (Vec<u8>, T) {
        let mut session = Session::new(Arc::clone(registry), CodecConfig::default());
        let mut out: Vec<u8> = Vec::new();
        Writer::new(&mut out, &mut session)
            .write_value(0, value)
            .expect("encode");

        let mut session = Session::new(Arc::clone(registry), CodecConfig::default());
        let mut input = &out[..];
        let mut reader = Reader::new(&mut input, &mut session);
        let header = reader.read_field_header().expect("header");
        let decoded = reader.read_value::<T>(&header).expect("decode");
        (out, decoded)
    }

    #[test]
    fn test_builtin_uses_well_known_tag() {
        let registry = registry();
        let (bytes, decoded) = roundtrip(&registry, &Dynamic::new(42u32));
        assert_eq!(bytes[0] >> 3 & 0x03, SchemaType::WellKnown as u8);
        assert_eq!(decoded.downcast_ref::<u32>(), Some(&42));
    }

    #[test]
    fn test_named_tag_is_cached_within_stream() {
        let registry = registry();
        let values = vec![Dynamic::new(vec![1u16]), Dynamic::new(vec![2u16, 3])];
        let (bytes, decoded) = roundtrip(&registry, &values);
        let name = b"Vec<u16>";
        let occurrences = bytes.windows(name.len()).filter(|w| *w == &name[..]).count();
        assert_eq!(occurrences, 1);
        assert_eq!(decoded[1].downcast_ref::<Vec<u16>>(), Some(&vec![2, 3]));
    }

    #[test]
    fn test_shared_identity_through_dynamic() {
        let registry = registry();
        let node = Shared::new(String::from("n"));
        let values = (Dynamic::new(node.clone()), Dynamic::new(node));
        let (_, (a, b)) = roundtrip(&registry, &values);
        let a = a.downcast_ref::<Shared<String>>().expect("first");
        let b = b.downcast_ref::<Shared<String>>().expect("second");
        assert!(Shared::ptr_eq(a, b));
    }

    #[test]
    fn test_unregistered_type_fails() {
        let registry = registry();
        let mut session = Session::new(registry, CodecConfig::default());
        let mut out: Vec<u8> = Vec::new();
        let err = Writer::new(&mut out, &mut session)
            .write_value(0, &Dynamic::new(vec![1i8]))
            .unwrap_err();
        assert!(matches!(err, CodecError::UnregisteredType { .. }));
    }

    #[test]
    fn test_deep_copy_dynamic() {
        let registry = registry();
        let mut context = CopyContext::new(registry, CodecConfig::default());
        let original = Dynamic::new(vec![4u16]);
        let copy = context.copy(&original).expect("copy");
        assert!(!Dynamic::ptr_eq(&copy, &original));
        assert_eq!(copy.downcast_ref::<Vec<u16>>(), Some(&vec![4]));
    }
}
