// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # graphwire
//!
//! Self-describing, version-tolerant binary serialization for object graphs.
//!
//! ## Quick Start
//!
//! ```rust
//! use graphwire::{Serializable, Serializer, CodecRegistry};
//! use std::sync::Arc;
//!
//! #[derive(Serializable, Default, Debug, PartialEq)]
//! struct Reading {
//!     sensor: String,
//!     value: f64,
//! }
//!
//! fn main() -> graphwire::Result<()> {
//!     let serializer = Serializer::new(Arc::new(CodecRegistry::new()));
//!     let bytes = serializer.serialize(&Reading { sensor: "t0".into(), value: 21.5 })?;
//!     let back: Reading = serializer.deserialize_bytes(&bytes)?;
//!     assert_eq!(back.sensor, "t0");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |  Serializer  (session pool, root field, static / resolved dispatch)  |
//! +---------------------------------------------------------------------+
//! |  Codecs      scalars | Option/Box/Vec/maps | tuples | Shared/Arc    |
//! |              Dynamic (tagged, registry dispatched) | derive structs |
//! +---------------------------------------------------------------------+
//! |  Session     reference table | type name cache     CopyContext      |
//! +---------------------------------------------------------------------+
//! |  Cursors     Writer (BufMut) | Reader (Buf, segmented input OK)      |
//! +---------------------------------------------------------------------+
//! |  Wire        header byte | varints | tags | end marker | dump       |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Serializer`] | Thread-safe entry point: serialize, deserialize, deep copy |
//! | [`CodecRegistry`] | Process-wide type and codec tables |
//! | [`Session`] | Per-operation identity and type caches |
//! | [`Shared`] | Mutable shared node; aliasing and cycles survive a round trip |
//! | [`Dynamic`] | Any registered type, tagged on the wire |
//!
//! ## Compatibility
//!
//! Struct fields are addressed by numeric id. Readers skip ids they do not
//! know and leave missing ids at their `Default`, so both older and newer
//! peers can read each other's streams.
//!
//! Well-known type ids below [`FIRST_USER_WELL_KNOWN_ID`] belong to the
//! built-in types and are rejected at compile time:
//!
//! ```compile_fail
//! use graphwire::Serializable;
//!
//! #[derive(Serializable, Default)]
//! #[wire(id = 12)]
//! struct Reserved {
//!     value: u8,
//! }
//! ```
//!
//! So are duplicate field ids:
//!
//! ```compile_fail
//! use graphwire::Serializable;
//!
//! #[derive(Serializable, Default)]
//! struct Clash {
//!     #[wire(id = 1)]
//!     first: u8,
//!     #[wire(id = 1)]
//!     second: u8,
//! }
//! ```

extern crate self as graphwire;

pub mod codec;
pub mod config;
pub mod copy;
pub mod cursor;
pub mod error;
pub mod registry;
pub mod serializer;
pub mod session;
pub mod wire;

pub use codec::{DeepCopier, Dynamic, FieldCodec, Serializable, Shared, TypeKey};
pub use config::CodecConfig;
pub use copy::CopyContext;
pub use cursor::{Reader, Writer};
pub use error::{CodecError, Result};
pub use registry::{CodecRegistry, FallbackResolver, TypeEntry, FIRST_USER_WELL_KNOWN_ID};
pub use serializer::Serializer;
pub use session::{Session, SessionPool};
pub use wire::{FieldHeader, TypeTag, WireType};

/// `#[derive(Serializable)]` for structs with named fields.
pub use graphwire_codegen::Serializable;
