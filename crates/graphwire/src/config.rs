// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Codec limits and pool sizing.
//!
//! Limits protect decoders from hostile input: every length prefix, element
//! count, nesting level and reference id is checked against them before any
//! allocation happens.
//!
//! Values can be overridden from the environment:
//!
//! - `GRAPHWIRE_MAX_DEPTH`: maximum object nesting (default: 256)
//! - `GRAPHWIRE_MAX_LENGTH`: maximum length prefix / element count (default: 64 MiB)
//! - `GRAPHWIRE_MAX_REFERENCES`: maximum reference ids per session (default: 1Mi)
//! - `GRAPHWIRE_POOL_CAPACITY`: pooled sessions kept by a serializer (default: 64)
//!
//! # Example
//!
//! ```bash
//! export GRAPHWIRE_MAX_DEPTH=64
//! export GRAPHWIRE_MAX_LENGTH=1048576
//! ```

use std::env;

pub const ENV_MAX_DEPTH: &str = "GRAPHWIRE_MAX_DEPTH";
pub const ENV_MAX_LENGTH: &str = "GRAPHWIRE_MAX_LENGTH";
pub const ENV_MAX_REFERENCES: &str = "GRAPHWIRE_MAX_REFERENCES";
pub const ENV_POOL_CAPACITY: &str = "GRAPHWIRE_POOL_CAPACITY";

pub const DEFAULT_MAX_DEPTH: usize = 256;
pub const DEFAULT_MAX_LENGTH: usize = 64 * 1024 * 1024;
pub const DEFAULT_MAX_REFERENCES: usize = 1 << 20;
pub const DEFAULT_POOL_CAPACITY: usize = 64;

/// Limits applied by sessions, cursors and copy contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Maximum nesting of tag-delimited objects (read, skip and copy).
    pub max_depth: usize,
    /// Maximum length prefix in bytes, also bounds collection counts.
    pub max_length: usize,
    /// Maximum reference ids assigned in one session.
    pub max_references: usize,
    /// Sessions kept warm by a `SessionPool`.
    pub pool_capacity: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_length: DEFAULT_MAX_LENGTH,
            max_references: DEFAULT_MAX_REFERENCES,
            pool_capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}

impl CodecConfig {
    /// Load limits from environment variables, falling back to defaults.
    ///
    /// Unparseable or zero values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_depth: env_usize(ENV_MAX_DEPTH).unwrap_or(defaults.max_depth),
            max_length: env_usize(ENV_MAX_LENGTH).unwrap_or(defaults.max_length),
            max_references: env_usize(ENV_MAX_REFERENCES).unwrap_or(defaults.max_references),
            pool_capacity: env_usize(ENV_POOL_CAPACITY).unwrap_or(defaults.pool_capacity),
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    #[must_use]
    pub fn with_max_references(mut self, max_references: usize) -> Self {
        self.max_references = max_references;
        self
    }

    #[must_use]
    pub fn with_pool_capacity(mut self, pool_capacity: usize) -> Self {
        self.pool_capacity = pool_capacity;
        self
    }
}

fn env_usize(name: &str) -> Option<usize> {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|v| *v > 0)
}
