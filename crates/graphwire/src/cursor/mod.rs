// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Read/write cursors.
//!
//! Both cursors borrow their buffer and the operation's [`Session`] for the
//! duration of one call; neither keeps anything once dropped, so the
//! underlying buffers can be pooled and reused by the caller.
//!
//! [`Session`]: crate::session::Session

mod reader;
mod writer;

pub use reader::Reader;
pub use writer::Writer;
