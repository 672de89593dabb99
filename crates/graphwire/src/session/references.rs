// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-session identity table.
//!
//! Ids are assigned sequentially from 1 (0 is the null reference). The write
//! side maps an object address to its id; the read side maps an id back to
//! the materialized handle. A read slot is reserved as soon as a tracked
//! header is seen and filled once the codec owns a handle for the object,
//! which is before its members are decoded.

use crate::error::{CodecError, Result};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of recording an object on the write side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    /// Already written under this id; emit a reference.
    Existing(u32),
    /// First occurrence; the id is consumed by the next tracked header.
    New(u32),
}

/// Type-erased handle to a materialized object.
#[derive(Clone)]
pub struct ReferenceHandle {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl ReferenceHandle {
    pub fn new<H: Any + Send + Sync>(handle: H) -> Self {
        Self {
            value: Arc::new(handle),
            type_name: std::any::type_name::<H>(),
        }
    }

    /// Clone the handle out as `H`.
    pub fn get<H: Any + Clone>(&self) -> Result<H> {
        self.value
            .downcast_ref::<H>()
            .cloned()
            .ok_or_else(|| CodecError::TypeMismatch {
                expected: std::any::type_name::<H>(),
                actual: self.type_name.to_string(),
            })
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn as_any(&self) -> &(dyn Any + Send + Sync) {
        &*self.value
    }

    pub fn into_value(self) -> Arc<dyn Any + Send + Sync> {
        self.value
    }
}

impl std::fmt::Debug for ReferenceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReferenceHandle({})", self.type_name)
    }
}

#[derive(Debug)]
pub struct ReferenceTable {
    limit: usize,
    next_id: u32,
    written: HashMap<usize, u32>,
    slots: Vec<Option<ReferenceHandle>>,
}

impl ReferenceTable {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            next_id: 1,
            written: HashMap::new(),
            slots: Vec::new(),
        }
    }

    fn allocate(&mut self) -> Result<u32> {
        let id = self.next_id;
        if id as usize > self.limit {
            return Err(CodecError::ReferenceLimitExceeded { limit: self.limit });
        }
        self.next_id = id
            .checked_add(1)
            .ok_or(CodecError::ReferenceLimitExceeded { limit: self.limit })?;
        Ok(id)
    }

    /// Record an object address about to be written.
    pub fn record_written(&mut self, address: usize) -> Result<Recorded> {
        if let Some(&id) = self.written.get(&address) {
            return Ok(Recorded::Existing(id));
        }
        let id = self.allocate()?;
        self.written.insert(address, id);
        log::trace!("[session] assigned reference #{} to 0x{:x}", id, address);
        Ok(Recorded::New(id))
    }

    /// Reserve the next id on the read side (tracked header seen).
    pub fn reserve(&mut self) -> Result<u32> {
        let id = self.allocate()?;
        self.slots.push(None);
        Ok(id)
    }

    /// Attach the materialized handle to a reserved id.
    pub fn resolve<H: Any + Send + Sync>(&mut self, id: u32, handle: H) -> Result<()> {
        let slot = self
            .slot_index(id)
            .and_then(|index| self.slots.get_mut(index))
            .ok_or(CodecError::UnknownReference { id })?;
        *slot = Some(ReferenceHandle::new(handle));
        Ok(())
    }

    /// Handle for a previously read id.
    pub fn lookup(&self, id: u32) -> Result<&ReferenceHandle> {
        match self.slot_index(id).and_then(|index| self.slots.get(index)) {
            Some(Some(handle)) => Ok(handle),
            Some(None) => Err(CodecError::UnresolvedReference { id }),
            None => Err(CodecError::UnknownReference { id }),
        }
    }

    /// Typed variant of [`lookup`](Self::lookup).
    pub fn lookup_as<H: Any + Clone>(&self, id: u32) -> Result<H> {
        self.lookup(id)?.get::<H>()
    }

    /// Ids handed out so far, on either side.
    pub fn assigned(&self) -> u32 {
        self.next_id.saturating_sub(1)
    }

    pub fn clear(&mut self) {
        self.next_id = 1;
        self.written.clear();
        self.slots.clear();
    }

    pub(crate) fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
    }

    fn slot_index(&self, id: u32) -> Option<usize> {
        (id as usize).checked_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_side_reuses_ids() {
        let mut table = ReferenceTable::new(16);
        assert_eq!(table.record_written(0x1000), Ok(Recorded::New(1)));
        assert_eq!(table.record_written(0x2000), Ok(Recorded::New(2)));
        assert_eq!(table.record_written(0x1000), Ok(Recorded::Existing(1)));
        assert_eq!(table.assigned(), 2);
    }

    #[test]
    fn test_read_side_reserve_resolve_lookup() {
        let mut table = ReferenceTable::new(16);
        let id = table.reserve().expect("reserve");
        assert_eq!(id, 1);
        assert_eq!(
            table.lookup(id).map(|_| ()),
            Err(CodecError::UnresolvedReference { id: 1 })
        );

        table.resolve(id, Arc::new(42u32)).expect("resolve");
        let value: Arc<u32> = table.lookup_as(id).expect("lookup");
        assert_eq!(*value, 42);

        assert_eq!(
            table.lookup(7).map(|_| ()),
            Err(CodecError::UnknownReference { id: 7 })
        );
        assert_eq!(
            table.lookup(0).map(|_| ()),
            Err(CodecError::UnknownReference { id: 0 })
        );
    }

    #[test]
    fn test_lookup_as_wrong_type() {
        let mut table = ReferenceTable::new(16);
        let id = table.reserve().expect("reserve");
        table.resolve(id, Arc::new(1u8)).expect("resolve");
        let err = table.lookup_as::<Arc<String>>(id).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { .. }));
    }

    #[test]
    fn test_limit_enforced() {
        let mut table = ReferenceTable::new(2);
        table.reserve().expect("first");
        table.reserve().expect("second");
        assert_eq!(
            table.reserve(),
            Err(CodecError::ReferenceLimitExceeded { limit: 2 })
        );
    }

    #[test]
    fn test_clear_restarts_numbering() {
        let mut table = ReferenceTable::new(16);
        table.record_written(0x10).expect("record");
        table.reserve().expect("reserve");
        table.clear();
        assert_eq!(table.assigned(), 0);
        assert_eq!(table.record_written(0x10), Ok(Recorded::New(1)));
    }
}
