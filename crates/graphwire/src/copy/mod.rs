// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Deep-copy engine.
//!
//! A [`CopyContext`] clones a value graph in memory through the registered
//! copiers, never touching the wire. Identity-carrying nodes are recorded
//! by source address before their contents are copied, so aliased nodes map
//! to one copy and cycles terminate.

use crate::codec::{DeepCopier, Serializable};
use crate::config::CodecConfig;
use crate::error::{CodecError, Result};
use crate::registry::CodecRegistry;
use crate::session::ReferenceHandle;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

pub struct CopyContext {
    registry: Arc<CodecRegistry>,
    config: CodecConfig,
    depth: usize,
    copies: HashMap<usize, ReferenceHandle>,
}

impl CopyContext {
    pub fn new(registry: Arc<CodecRegistry>, config: CodecConfig) -> Self {
        Self {
            registry,
            config,
            depth: 0,
            copies: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<CodecRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Copy `value` through `T`'s default copier.
    ///
    /// Nesting is bounded by `max_depth`; an acyclic graph deeper than that
    /// fails with `DepthLimitExceeded` rather than exhausting the stack.
    pub fn copy<T: Serializable>(&mut self, value: &T) -> Result<T> {
        self.enter()?;
        let result = T::Codec::default().deep_copy(value, self);
        self.depth -= 1;
        result
    }

    /// Copy `value` through the registry, honouring installed overrides.
    pub fn copy_resolved<T: Serializable>(&mut self, value: &T) -> Result<T> {
        let copier = self.registry.resolve_copier::<T>()?;
        self.enter()?;
        let result = copier.deep_copy(value, self);
        self.depth -= 1;
        result
    }

    /// Copy already produced for the node at `address`, if any.
    pub fn lookup<H: Any + Clone>(&self, address: usize) -> Result<Option<H>> {
        self.copies
            .get(&address)
            .map(ReferenceHandle::get::<H>)
            .transpose()
    }

    /// Remember `copy` as the counterpart of the node at `address`.
    ///
    /// Must be called before the node's members are copied.
    pub fn record<H: Any + Send + Sync>(&mut self, address: usize, copy: H) {
        log::trace!("[copy] recorded node 0x{:x}", address);
        self.copies.insert(address, ReferenceHandle::new(copy));
    }

    /// Nodes copied so far.
    pub fn len(&self) -> usize {
        self.copies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.copies.is_empty()
    }

    pub fn reset(&mut self) {
        self.depth = 0;
        self.copies.clear();
    }

    fn enter(&mut self) -> Result<()> {
        if self.depth >= self.config.max_depth {
            return Err(CodecError::DepthLimitExceeded {
                limit: self.config.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }
}

impl std::fmt::Debug for CopyContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopyContext")
            .field("depth", &self.depth)
            .field("copies", &self.copies.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Shared, StringCodec};

    fn context() -> CopyContext {
        CopyContext::new(Arc::new(CodecRegistry::new()), CodecConfig::default())
    }

    #[test]
    fn test_values_are_cloned() {
        let mut context = context();
        let value = vec![Some(String::from("a")), None];
        assert_eq!(context.copy(&value).expect("copy"), value);
        assert!(context.is_empty());
    }

    #[test]
    fn test_lookup_and_record() {
        let mut context = context();
        assert!(context.lookup::<Shared<u8>>(0x10).expect("lookup").is_none());
        let node = Shared::new(1u8);
        context.record(0x10, node.clone());
        let found = context.lookup::<Shared<u8>>(0x10).expect("lookup").expect("present");
        assert!(Shared::ptr_eq(&found, &node));
        assert!(matches!(
            context.lookup::<Arc<String>>(0x10),
            Err(CodecError::TypeMismatch { .. })
        ));
        assert_eq!(context.len(), 1);
        context.reset();
        assert!(context.is_empty());
    }

    #[derive(Default, Debug, PartialEq)]
    struct Chain(Option<Box<Chain>>);

    #[derive(Default)]
    struct ChainCodec;

    impl crate::codec::FieldCodec<Chain> for ChainCodec {
        fn write_field(
            &self,
            writer: &mut crate::cursor::Writer<'_>,
            delta: u32,
            _: crate::codec::TypeKey,
            value: &Chain,
        ) -> Result<()> {
            writer.write_value(delta, &value.0)
        }

        fn read_value(
            &self,
            reader: &mut crate::cursor::Reader<'_>,
            header: &crate::wire::FieldHeader,
        ) -> Result<Chain> {
            Ok(Chain(reader.read_value(header)?))
        }
    }

    impl DeepCopier<Chain> for ChainCodec {
        fn deep_copy(&self, value: &Chain, context: &mut CopyContext) -> Result<Chain> {
            Ok(Chain(context.copy(&value.0)?))
        }
    }

    impl Serializable for Chain {
        type Codec = ChainCodec;
    }

    fn chain(length: usize) -> Chain {
        (0..length).fold(Chain(None), |next, _| Chain(Some(Box::new(next))))
    }

    #[test]
    fn test_depth_limit() {
        let registry = Arc::new(CodecRegistry::new());
        let mut context = CopyContext::new(registry, CodecConfig::default().with_max_depth(8));
        assert_eq!(context.copy(&chain(3)).expect("copy"), chain(3));
        assert_eq!(
            context.copy(&chain(20)),
            Err(CodecError::DepthLimitExceeded { limit: 8 })
        );
    }

    #[test]
    fn test_copy_resolved_uses_override() {
        struct Shout;
        impl DeepCopier<String> for Shout {
            fn deep_copy(&self, value: &String, _context: &mut CopyContext) -> Result<String> {
                Ok(value.to_uppercase())
            }
        }
        let registry = Arc::new(CodecRegistry::new());
        registry.register_copier::<String>(Arc::new(Shout));
        let mut context = CopyContext::new(registry, CodecConfig::default());
        let copy = context.copy_resolved(&String::from("hi")).expect("copy");
        assert_eq!(copy, "HI");
        // The static path keeps the default copier.
        let plain = StringCodec.deep_copy(&String::from("hi"), &mut context).expect("copy");
        assert_eq!(plain, "hi");
    }
}
