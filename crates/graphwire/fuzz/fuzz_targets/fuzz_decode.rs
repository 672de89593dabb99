// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fuzz target for typed decoding
//!
//! Feeds arbitrary bytes to the decoder for a spread of target types.
//! Malformed input must fail with an error, never panic or hang.

#![no_main]

use graphwire::{CodecConfig, CodecRegistry, Dynamic, Serializer, Shared};
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

fn serializer() -> &'static Serializer {
    static SERIALIZER: OnceLock<Serializer> = OnceLock::new();
    SERIALIZER.get_or_init(|| {
        let registry = Arc::new(CodecRegistry::new());
        let _ = registry.register::<Vec<String>>();
        let _ = registry.register::<Shared<Vec<u32>>>();
        let config = CodecConfig::default()
            .with_max_depth(64)
            .with_max_length(1 << 16)
            .with_max_references(1 << 12);
        Serializer::with_config(registry, config)
    })
}

fuzz_target!(|data: &[u8]| {
    let serializer = serializer();

    // ----------------------------------------------------------------
    // 1. Scalars and strings
    // ----------------------------------------------------------------
    let _ = serializer.deserialize_bytes::<u64>(data);
    let _ = serializer.deserialize_bytes::<String>(data);

    // ----------------------------------------------------------------
    // 2. Containers and tuples
    // ----------------------------------------------------------------
    let _ = serializer.deserialize_bytes::<Vec<Option<i32>>>(data);
    let _ = serializer.deserialize_bytes::<BTreeMap<String, Vec<u8>>>(data);
    let _ = serializer.deserialize_bytes::<(u8, String, (f64, bool))>(data);

    // ----------------------------------------------------------------
    // 3. References and polymorphic fields
    // ----------------------------------------------------------------
    let _ = serializer.deserialize_bytes::<Vec<Shared<Vec<u32>>>>(data);
    let _ = serializer.deserialize_bytes::<Vec<Dynamic>>(data);
});
