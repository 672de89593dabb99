// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-operation serialization context.
//!
//! A [`Session`] lives for exactly one top-level serialize or deserialize
//! call. It owns the identity table, the type name cache and a handle to
//! the process-wide registry; nothing in it is shared between concurrent
//! operations.

mod pool;
mod references;
mod type_cache;

pub use pool::{PooledSession, SessionPool};
pub use references::{Recorded, ReferenceHandle, ReferenceTable};
pub use type_cache::TypeCache;

use crate::config::CodecConfig;
use crate::registry::CodecRegistry;
use std::sync::Arc;

pub struct Session {
    registry: Arc<CodecRegistry>,
    config: CodecConfig,
    references: ReferenceTable,
    types: TypeCache,
    value_fields: u64,
}

impl Session {
    pub fn new(registry: Arc<CodecRegistry>, config: CodecConfig) -> Self {
        Self {
            registry,
            config,
            references: ReferenceTable::new(config.max_references),
            types: TypeCache::new(),
            value_fields: 0,
        }
    }

    /// Session over the global registry with default limits.
    pub fn with_global_registry() -> Self {
        Self::new(CodecRegistry::global(), CodecConfig::default())
    }

    pub fn registry(&self) -> &Arc<CodecRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: CodecConfig) {
        self.config = config;
        self.references.set_limit(config.max_references);
    }

    pub fn references(&self) -> &ReferenceTable {
        &self.references
    }

    pub fn references_mut(&mut self) -> &mut ReferenceTable {
        &mut self.references
    }

    pub fn types(&self) -> &TypeCache {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeCache {
        &mut self.types
    }

    /// Hook every value-type codec calls once per field it writes or reads.
    ///
    /// Value types carry no identity, so this never touches the reference
    /// table; it only feeds the diagnostic counter.
    #[inline]
    pub fn mark_value_field(&mut self) {
        self.value_fields += 1;
    }

    /// Value-type fields seen since the last reset.
    pub fn value_fields(&self) -> u64 {
        self.value_fields
    }

    /// Forget all per-operation state, keeping allocations.
    pub fn reset(&mut self) {
        self.references.clear();
        self.types.clear();
        self.value_fields = 0;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("references", &self.references.assigned())
            .field("types", &self.types.len())
            .field("value_fields", &self.value_fields)
            .finish()
    }
}
