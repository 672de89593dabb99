// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability over pedantic

//! Malformed input and limit tests
//!
//! Every failure must surface as a `CodecError`, never as a panic or a
//! partially built value.

use graphwire::wire::WireType;
use graphwire::{CodecConfig, CodecError, CodecRegistry, Serializable, Serializer, Shared};
use std::sync::Arc;

#[derive(Serializable, Default, Debug, Clone, PartialEq)]
struct Reading {
    sensor: String,
    samples: Vec<u32>,
    unit: Option<String>,
}

/// Reuses field id 1 with an incompatible type.
#[derive(Serializable, Default, Debug)]
struct Renumbered {
    #[wire(id = 1)]
    sensor: u32,
}

fn serializer() -> Serializer {
    Serializer::new(Arc::new(CodecRegistry::new()))
}

fn limited(config: CodecConfig) -> Serializer {
    Serializer::with_config(Arc::new(CodecRegistry::new()), config)
}

fn reading() -> Reading {
    Reading {
        sensor: "thermo-1".into(),
        samples: vec![1, 200, 70_000],
        unit: Some("C".into()),
    }
}

#[test]
fn test_every_truncation_fails_cleanly() {
    let serializer = serializer();
    let bytes = serializer.serialize(&reading()).expect("encode");

    for cut in 0..bytes.len() {
        let result = serializer.deserialize_bytes::<Reading>(&bytes[..cut]);
        assert!(
            matches!(result, Err(CodecError::UnexpectedEof { .. })),
            "prefix of {} bytes gave {:?}",
            cut,
            result
        );
    }
    assert_eq!(
        serializer.deserialize_bytes::<Reading>(&bytes).expect("full input"),
        reading()
    );
}

#[test]
fn test_length_limit_on_read() {
    let bytes = serializer()
        .serialize(&String::from("0123456789"))
        .expect("encode");
    let strict = limited(CodecConfig::default().with_max_length(4));
    assert_eq!(
        strict.deserialize_bytes::<String>(&bytes),
        Err(CodecError::LengthLimitExceeded {
            length: 10,
            limit: 4
        })
    );
}

#[test]
fn test_collection_count_limit() {
    let bytes = serializer().serialize(&vec![0u8; 32]).expect("encode");
    let strict = limited(CodecConfig::default().with_max_length(16));
    assert!(matches!(
        strict.deserialize_bytes::<Vec<u8>>(&bytes),
        Err(CodecError::LengthLimitExceeded { limit: 16, .. })
    ));
}

#[test]
fn test_depth_limit_on_read() {
    let nested = vec![vec![vec![vec![1u8]]]];
    let bytes = serializer().serialize(&nested).expect("encode");

    let shallow = limited(CodecConfig::default().with_max_depth(2));
    assert_eq!(
        shallow.deserialize_bytes::<Vec<Vec<Vec<Vec<u8>>>>>(&bytes),
        Err(CodecError::DepthLimitExceeded { limit: 2 })
    );

    let deep_enough = limited(CodecConfig::default().with_max_depth(4));
    assert_eq!(
        deep_enough
            .deserialize_bytes::<Vec<Vec<Vec<Vec<u8>>>>>(&bytes)
            .expect("decode"),
        nested
    );
}

#[test]
fn test_reference_limit_on_write() {
    let strict = limited(CodecConfig::default().with_max_references(2));
    let nodes: Vec<Shared<u32>> = (0..3).map(Shared::new).collect();
    assert_eq!(
        strict.serialize(&nodes),
        Err(CodecError::ReferenceLimitExceeded { limit: 2 })
    );

    // Aliases of one node need a single id.
    let one = Shared::new(9u32);
    let aliases = vec![one.clone(), one.clone(), one];
    strict.serialize(&aliases).expect("aliases fit");
}

#[test]
fn test_incompatible_field_type() {
    let serializer = serializer();
    let bytes = serializer.serialize(&reading()).expect("encode");
    assert_eq!(
        serializer.deserialize_bytes::<Renumbered>(&bytes).unwrap_err(),
        CodecError::UnsupportedWireType {
            codec: "U32Codec",
            wire_type: WireType::LengthPrefixed,
        }
    );
}

#[test]
fn test_overlong_varint() {
    let mut bytes = vec![0x00];
    bytes.extend_from_slice(&[0xFF; 11]);
    assert_eq!(
        serializer().deserialize_bytes::<u64>(&bytes),
        Err(CodecError::MalformedVarint { offset: 1 })
    );
}

#[test]
fn test_reserved_marker_byte() {
    assert_eq!(
        serializer().deserialize_bytes::<u64>(&[0xE1]),
        Err(CodecError::InvalidHeader {
            offset: 0,
            byte: 0xE1
        })
    );
}

#[test]
fn test_failed_decode_does_not_poison_serializer() {
    let serializer = serializer();
    let bytes = serializer.serialize(&reading()).expect("encode");
    assert!(serializer
        .deserialize_bytes::<Reading>(&bytes[..bytes.len() / 2])
        .is_err());
    // The pooled session is reset before reuse.
    assert_eq!(
        serializer.deserialize_bytes::<Reading>(&bytes).expect("decode"),
        reading()
    );
}
