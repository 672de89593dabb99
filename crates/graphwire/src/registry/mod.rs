// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide codec registry.
//!
//! Read-mostly tables keyed by `TypeId`, wire name and well-known id:
//!
//! - **Lock-free reads**: `DashMap` shards, no global `RwLock`.
//! - **Lazy instantiation**: [`resolve_codec`](CodecRegistry::resolve_codec)
//!   builds a codec on first use, outside any shard lock, and keeps the
//!   first instance inserted; concurrent first users all receive it.
//! - **Fallback hook**: an optional [`FallbackResolver`] (held in an
//!   `ArcSwap`) is consulted for types that were never registered.
//!
//! A failed registration or resolution leaves the tables untouched.

mod entry;

pub use entry::{AnyValue, ErasedCodec, TypeEntry, TypedEntry};

use crate::codec::{unwrap_codec, unwrap_copier, DeepCopier, FieldCodec, Serializable, TypeKey};
use crate::error::{CodecError, Result};
use crate::wire::TypeTag;
use arc_swap::ArcSwap;
use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::sync::{Arc, OnceLock};

/// First well-known id free for application types; lower ids are reserved.
pub const FIRST_USER_WELL_KNOWN_ID: u32 = 64;

/// Extension point for types the registry does not know.
///
/// Returned entries are used for the current lookup only.
pub trait FallbackResolver: Send + Sync {
    fn resolve_type(&self, key: TypeKey) -> Option<Arc<TypeEntry>>;

    fn resolve_name(&self, name: &str) -> Option<Arc<TypeEntry>>;
}

type ErasedInstance = Arc<dyn Any + Send + Sync>;

pub struct CodecRegistry {
    by_type: DashMap<TypeId, Arc<TypeEntry>>,
    by_name: DashMap<Arc<str>, TypeId>,
    by_id: DashMap<u32, TypeId>,
    /// `TypeId` -> `Arc<dyn FieldCodec<T>>`, erased. Memoized resolutions.
    codecs: DashMap<TypeId, ErasedInstance>,
    /// `TypeId` -> `Arc<dyn DeepCopier<T>>`, erased. Memoized resolutions.
    copiers: DashMap<TypeId, ErasedInstance>,
    codec_overrides: DashMap<TypeId, ErasedInstance>,
    copier_overrides: DashMap<TypeId, ErasedInstance>,
    fallback: ArcSwap<Option<Arc<dyn FallbackResolver>>>,
}

static GLOBAL: OnceLock<Arc<CodecRegistry>> = OnceLock::new();

impl CodecRegistry {
    /// Registry with the built-in types registered.
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.register_builtins();
        registry
    }

    /// Registry with nothing registered, not even built-ins.
    pub fn empty() -> Self {
        Self {
            by_type: DashMap::new(),
            by_name: DashMap::new(),
            by_id: DashMap::new(),
            codecs: DashMap::new(),
            copiers: DashMap::new(),
            codec_overrides: DashMap::new(),
            copier_overrides: DashMap::new(),
            fallback: ArcSwap::new(Arc::new(None)),
        }
    }

    /// Shared process-wide instance.
    pub fn global() -> Arc<CodecRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(CodecRegistry::new())))
    }

    /// Register `T` for polymorphic dispatch under its name and well-known id.
    ///
    /// Idempotent for the same type; a different type already holding the
    /// name or id is rejected with `DuplicateRegistration`.
    pub fn register<T: Serializable>(&self) -> Result<()> {
        self.install(Arc::new(TypeEntry::of::<T>()))
    }

    /// Register a hand-built entry.
    pub fn install(&self, entry: Arc<TypeEntry>) -> Result<()> {
        let type_id = entry.rust_type_id();
        if self.by_type.contains_key(&type_id) {
            return Ok(());
        }

        let claimed_name = match self.by_name.entry(Arc::clone(entry.name())) {
            Entry::Occupied(occupied) if *occupied.get() != type_id => {
                let existing = *occupied.get();
                drop(occupied);
                return Err(CodecError::DuplicateRegistration {
                    key: entry.name().to_string(),
                    existing: self.rust_name_of(existing),
                });
            }
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(type_id);
                true
            }
        };

        if let Some(id) = entry.well_known_id() {
            let conflict = match self.by_id.entry(id) {
                Entry::Occupied(occupied) if *occupied.get() != type_id => Some(*occupied.get()),
                Entry::Occupied(_) => None,
                Entry::Vacant(vacant) => {
                    vacant.insert(type_id);
                    None
                }
            };
            if let Some(existing) = conflict {
                if claimed_name {
                    self.by_name
                        .remove_if(entry.name().as_ref(), |_, owner| *owner == type_id);
                }
                return Err(CodecError::DuplicateRegistration {
                    key: format!("#{}", id),
                    existing: self.rust_name_of(existing),
                });
            }
        }

        log::debug!(
            "[registry] registered '{}' ({}){}",
            entry.name(),
            entry.rust_name(),
            entry
                .well_known_id()
                .map(|id| format!(" as #{}", id))
                .unwrap_or_default()
        );
        self.by_type.insert(type_id, entry);
        Ok(())
    }

    /// Install a hand-written codec for `T`, replacing any resolved one.
    ///
    /// Memoized codecs are dropped, so composites resolved earlier (a
    /// `Vec<T>`, a tuple holding `T`) are rebuilt around the override on
    /// their next use. Codecs already handed out keep their components.
    pub fn register_codec<T: 'static>(&self, codec: Arc<dyn FieldCodec<T>>) {
        log::debug!(
            "[registry] codec override for {}",
            std::any::type_name::<T>()
        );
        let erased: ErasedInstance = Arc::new(unwrap_codec(codec));
        self.codec_overrides.insert(TypeId::of::<T>(), erased);
        self.codecs.clear();
    }

    /// Install a hand-written copier for `T`, replacing any resolved one.
    ///
    /// Memoized copiers are dropped as in [`register_codec`](Self::register_codec).
    pub fn register_copier<T: 'static>(&self, copier: Arc<dyn DeepCopier<T>>) {
        log::debug!(
            "[registry] copier override for {}",
            std::any::type_name::<T>()
        );
        let erased: ErasedInstance = Arc::new(unwrap_copier(copier));
        self.copier_overrides.insert(TypeId::of::<T>(), erased);
        self.copiers.clear();
    }

    /// Codec for `T`, built on first use and memoized.
    pub fn resolve_codec<T: Serializable>(&self) -> Result<Arc<dyn FieldCodec<T>>> {
        let type_id = TypeId::of::<T>();
        if let Some(cached) = self.codecs.get(&type_id) {
            return downcast_instance(cached.value());
        }
        // Built outside the shard lock: composite codecs resolve their
        // components through this registry.
        let overridden = self
            .codec_overrides
            .get(&type_id)
            .map(|entry| Arc::clone(entry.value()));
        let built: ErasedInstance = match overridden {
            Some(codec) => codec,
            None => Arc::new(unwrap_codec(T::build_codec(self)?)),
        };
        let stored = Arc::clone(self.codecs.entry(type_id).or_insert(built).value());
        log::trace!("[registry] resolved codec for {}", std::any::type_name::<T>());
        downcast_instance(&stored)
    }

    /// Copier for `T`, built on first use and memoized.
    pub fn resolve_copier<T: Serializable>(&self) -> Result<Arc<dyn DeepCopier<T>>> {
        let type_id = TypeId::of::<T>();
        if let Some(cached) = self.copiers.get(&type_id) {
            return downcast_instance(cached.value());
        }
        let overridden = self
            .copier_overrides
            .get(&type_id)
            .map(|entry| Arc::clone(entry.value()));
        let built: ErasedInstance = match overridden {
            Some(copier) => copier,
            None => Arc::new(unwrap_copier(T::build_copier(self)?)),
        };
        let stored = Arc::clone(self.copiers.entry(type_id).or_insert(built).value());
        downcast_instance(&stored)
    }

    /// Entry for a runtime type, consulting the fallback resolver.
    pub fn lookup_type(&self, key: TypeKey) -> Option<Arc<TypeEntry>> {
        if let Some(entry) = self.by_type.get(&key.id) {
            return Some(Arc::clone(entry.value()));
        }
        let resolved = self.fallback()?.resolve_type(key);
        if resolved.is_some() {
            log::debug!("[registry] fallback resolved type {}", key.name);
        }
        resolved
    }

    /// Entry for a type tag read from the wire.
    pub fn lookup_tag(&self, tag: &TypeTag) -> Result<Arc<TypeEntry>> {
        let type_id = match tag {
            TypeTag::WellKnown(id) => self.by_id.get(id).map(|r| *r.value()),
            TypeTag::Named(name) => self.by_name.get(name.as_ref()).map(|r| *r.value()),
        };
        if let Some(entry) = type_id.and_then(|id| self.by_type.get(&id)) {
            return Ok(Arc::clone(entry.value()));
        }
        if let TypeTag::Named(name) = tag {
            if let Some(entry) = self.fallback().and_then(|f| f.resolve_name(name)) {
                log::debug!("[registry] fallback resolved name '{}'", name);
                return Ok(entry);
            }
        }
        Err(CodecError::UnknownType {
            name: tag.to_string(),
        })
    }

    pub fn set_fallback(&self, resolver: Arc<dyn FallbackResolver>) {
        self.fallback.store(Arc::new(Some(resolver)));
    }

    pub fn clear_fallback(&self) {
        self.fallback.store(Arc::new(None));
    }

    pub fn is_registered<T: 'static>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<T>())
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    /// Wire names of every registered type, sorted.
    pub fn type_names(&self) -> Vec<Arc<str>> {
        let mut names: Vec<Arc<str>> = self
            .by_name
            .iter()
            .map(|entry| Arc::clone(entry.key()))
            .collect();
        names.sort();
        names
    }

    fn fallback(&self) -> Option<Arc<dyn FallbackResolver>> {
        (**self.fallback.load()).clone()
    }

    fn rust_name_of(&self, type_id: TypeId) -> String {
        self.by_type
            .get(&type_id)
            .map(|entry| entry.rust_name().to_string())
            .unwrap_or_else(|| "<unregistered>".to_string())
    }

    fn register_builtins(&self) {
        macro_rules! builtin {
            ($($ty:ty),+ $(,)?) => {
                $(
                    if let Err(e) = self.register::<$ty>() {
                        log::warn!("[registry] built-in {} not registered: {}", stringify!($ty), e);
                    }
                )+
            };
        }
        builtin!(
            bool, u8, u16, u32, u64, i8, i16, i32, i64, f32, f64, u128, i128, char, String,
            Bytes, usize, isize, (),
        );
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("types", &self.by_type.len())
            .field("codecs", &self.codecs.len())
            .field("copiers", &self.copiers.len())
            .field("overrides", &(self.codec_overrides.len() + self.copier_overrides.len()))
            .finish()
    }
}

fn downcast_instance<C: Clone + 'static>(instance: &ErasedInstance) -> Result<C> {
    instance
        .downcast_ref::<C>()
        .cloned()
        .ok_or_else(|| CodecError::TypeMismatch {
            expected: std::any::type_name::<C>(),
            actual: "instance of another type".to_string(),
        })
}
