// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounded pool of reusable sessions.
//!
//! Sessions keep their table allocations across operations; the pool hands
//! out reset sessions and takes them back when the guard drops. When the
//! pool is empty a fresh session is created, and when it is full the
//! returned session is simply dropped.

use super::Session;
use crate::config::CodecConfig;
use crate::registry::CodecRegistry;
use crossbeam::queue::ArrayQueue;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

pub struct SessionPool {
    registry: Arc<CodecRegistry>,
    config: CodecConfig,
    idle: ArrayQueue<Session>,
}

impl SessionPool {
    pub fn new(registry: Arc<CodecRegistry>, config: CodecConfig) -> Self {
        Self {
            registry,
            config,
            idle: ArrayQueue::new(config.pool_capacity.max(1)),
        }
    }

    /// Take a reset session, creating one if none is idle.
    pub fn acquire(&self) -> PooledSession<'_> {
        let session = self
            .idle
            .pop()
            .unwrap_or_else(|| Session::new(Arc::clone(&self.registry), self.config));
        PooledSession {
            pool: self,
            session,
        }
    }

    pub fn idle(&self) -> usize {
        self.idle.len()
    }

    pub fn registry(&self) -> &Arc<CodecRegistry> {
        &self.registry
    }

    pub fn config(&self) -> CodecConfig {
        self.config
    }

    fn release(&self, mut session: Session) {
        session.reset();
        if self.idle.push(session).is_err() {
            log::trace!("[session] pool full, dropping session");
        }
    }
}

/// Session on loan from a [`SessionPool`].
pub struct PooledSession<'p> {
    pool: &'p SessionPool,
    session: Session,
}

impl Deref for PooledSession<'_> {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.session
    }
}

impl DerefMut for PooledSession<'_> {
    fn deref_mut(&mut self) -> &mut Session {
        &mut self.session
    }
}

impl Drop for PooledSession<'_> {
    fn drop(&mut self) {
        // Empty tables do not allocate, so the swap is cheap.
        let blank = Session::new(Arc::clone(&self.pool.registry), self.pool.config);
        let session = std::mem::replace(&mut self.session, blank);
        self.pool.release(session);
    }
}
