// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fuzz target for the schema-less stream walker
//!
//! Every accepted stream must render, and rendering must not panic.

#![no_main]

use graphwire::wire::dump::{dump, render};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(tokens) = dump(data) {
        let _ = render(&tokens);
    }
});
