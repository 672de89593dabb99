// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-session cache of encoded type names.
//!
//! The first time a named type is tagged in a stream its full name is
//! written (`SchemaType::Encoded`) and both ends append it to this cache;
//! later tags for the same type carry only the cache index
//! (`SchemaType::Referenced`).

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct TypeCache {
    written: HashMap<TypeId, u32>,
    read: Vec<Arc<str>>,
}

impl TypeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index assigned to `type_id` earlier in this stream.
    pub fn written_index(&self, type_id: TypeId) -> Option<u32> {
        self.written.get(&type_id).copied()
    }

    /// Record a name written in full; returns its index.
    pub fn record_written(&mut self, type_id: TypeId) -> u32 {
        let next = self.written.len() as u32;
        *self.written.entry(type_id).or_insert(next)
    }

    /// Record a name read in full; returns its index.
    pub fn record_read(&mut self, name: Arc<str>) -> u32 {
        self.read.push(name);
        (self.read.len() - 1) as u32
    }

    pub fn name_at(&self, index: u32) -> Option<&Arc<str>> {
        self.read.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.written.len().max(self.read.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.written.clear();
        self.read.clear();
    }
}
