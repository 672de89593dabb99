// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability over pedantic
#![allow(clippy::cast_possible_truncation)] // Test parameters

//! Object graph tests
//!
//! Aliasing, cycles and polymorphic fields through serialization and
//! deep copy.

use graphwire::wire::dump::{dump, TokenPayload};
use graphwire::{CodecError, CodecRegistry, Dynamic, Serializable, Serializer, Shared};
use std::sync::Arc;

#[derive(Serializable, Default, Debug)]
struct Node {
    name: String,
    next: Option<Shared<Node>>,
}

/// Same layout as `Node`, but immutable links.
#[derive(Serializable, Default, Debug)]
struct FrozenNode {
    name: String,
    next: Option<Arc<FrozenNode>>,
}

#[derive(Serializable, Default, Debug)]
struct Tree {
    left: Option<Shared<Leaf>>,
    right: Option<Shared<Leaf>>,
    all: Vec<Shared<Leaf>>,
}

#[derive(Serializable, Default, Debug, Clone, PartialEq)]
struct Leaf {
    weight: u32,
}

#[derive(Serializable, Default, Debug, Clone, PartialEq)]
#[wire(name = "graph.Point", id = 100)]
struct Point {
    x: i32,
    y: i32,
}

fn serializer() -> Serializer {
    Serializer::new(Arc::new(CodecRegistry::new()))
}

fn ring(names: &[&str]) -> Vec<Shared<Node>> {
    let nodes: Vec<Shared<Node>> = names
        .iter()
        .map(|name| {
            Shared::new(Node {
                name: (*name).to_string(),
                next: None,
            })
        })
        .collect();
    for (i, node) in nodes.iter().enumerate() {
        node.write().next = Some(nodes[(i + 1) % nodes.len()].clone());
    }
    nodes
}

/// Break cycles so the test does not leak.
fn unlink(nodes: &[Shared<Node>]) {
    for node in nodes {
        node.write().next = None;
    }
}

fn next_of(node: &Shared<Node>) -> Shared<Node> {
    node.read().next.clone().expect("linked")
}

#[test]
fn test_diamond_aliasing_survives() {
    let serializer = serializer();
    let shared = Shared::new(Leaf { weight: 5 });
    let other = Shared::new(Leaf { weight: 5 });
    let tree = Tree {
        left: Some(shared.clone()),
        right: Some(shared.clone()),
        all: vec![shared, other],
    };

    let bytes = serializer.serialize(&tree).expect("encode");
    let decoded: Tree = serializer.deserialize_bytes(&bytes).expect("decode");
    let left = decoded.left.expect("left");
    let right = decoded.right.expect("right");
    assert!(Shared::ptr_eq(&left, &right));
    assert!(Shared::ptr_eq(&left, &decoded.all[0]));
    assert!(!Shared::ptr_eq(&left, &decoded.all[1]));
    assert_eq!(*decoded.all[1].read(), Leaf { weight: 5 });

    // One definition per distinct node, two back-references.
    let tokens = dump(&bytes).expect("dump");
    let tracked = tokens.iter().filter(|t| t.header.is_tracked()).count();
    let references = tokens
        .iter()
        .filter(|t| matches!(t.payload, TokenPayload::Reference(id) if id != 0))
        .count();
    assert_eq!((tracked, references), (2, 2));
}

#[test]
fn test_ring_roundtrip() {
    let serializer = serializer();
    let nodes = ring(&["a", "b", "c"]);
    let bytes = serializer.serialize(&nodes[0]).expect("encode");
    unlink(&nodes);

    let a: Shared<Node> = serializer.deserialize_bytes(&bytes).expect("decode");
    let b = next_of(&a);
    let c = next_of(&b);
    assert_eq!(
        (a.read().name.as_str(), b.read().name.as_str(), c.read().name.as_str()),
        ("a", "b", "c")
    );
    assert!(Shared::ptr_eq(&next_of(&c), &a));
    unlink(&[a, b, c]);
}

#[test]
fn test_self_loop() {
    let serializer = serializer();
    let node = Shared::new(Node {
        name: "self".into(),
        next: None,
    });
    node.write().next = Some(node.clone());
    let bytes = serializer.serialize(&node).expect("encode");
    unlink(&[node]);

    let decoded: Shared<Node> = serializer.deserialize_bytes(&bytes).expect("decode");
    assert!(Shared::ptr_eq(&next_of(&decoded), &decoded));
    unlink(&[decoded]);
}

#[test]
fn test_arc_cycle_is_unresolved() {
    let serializer = serializer();
    let node = Shared::new(Node {
        name: "loop".into(),
        next: None,
    });
    node.write().next = Some(node.clone());
    let bytes = serializer.serialize(&node).expect("encode");
    unlink(&[node]);

    assert_eq!(
        serializer
            .deserialize_bytes::<Arc<FrozenNode>>(&bytes)
            .unwrap_err(),
        CodecError::UnresolvedReference { id: 1 }
    );
}

#[test]
fn test_arc_chain_shares_tail() {
    let serializer = serializer();
    let tail = Arc::new(FrozenNode {
        name: "tail".into(),
        next: None,
    });
    let heads = vec![
        Arc::new(FrozenNode {
            name: "h1".into(),
            next: Some(Arc::clone(&tail)),
        }),
        Arc::new(FrozenNode {
            name: "h2".into(),
            next: Some(tail),
        }),
    ];
    let decoded: Vec<Arc<FrozenNode>> = serializer
        .deserialize_bytes(&serializer.serialize(&heads).expect("encode"))
        .expect("decode");
    let t1 = decoded[0].next.as_ref().expect("t1");
    let t2 = decoded[1].next.as_ref().expect("t2");
    assert!(Arc::ptr_eq(t1, t2));
    assert_eq!(t1.name, "tail");
}

#[derive(Serializable, Default, Debug)]
struct Slots {
    first: Option<Shared<Option<Leaf>>>,
    second: Option<Shared<Option<Leaf>>>,
    alias: Option<Shared<Option<Leaf>>>,
    frozen: Arc<Option<String>>,
}

#[test]
fn test_empty_shared_nodes_keep_ids_in_step() {
    let serializer = serializer();
    let filled = Shared::new(Some(Leaf { weight: 4 }));
    let slots = Slots {
        first: Some(Shared::new(None)),
        second: Some(filled.clone()),
        alias: Some(filled),
        frozen: Arc::new(None),
    };

    let bytes = serializer.serialize(&slots).expect("encode");
    let tokens = dump(&bytes).expect("dump");
    // The empty node still defines id 1, so the alias points at id 2.
    let empty = tokens.iter().find(|t| t.field_id == 1).expect("first");
    assert_eq!(empty.header.tracked_id, Some(1));
    assert_eq!(empty.payload, TokenPayload::Reference(0));
    assert!(tokens
        .iter()
        .any(|t| t.field_id == 3 && t.payload == TokenPayload::Reference(2)));

    let decoded: Slots = serializer.deserialize_bytes(&bytes).expect("decode");
    assert!(decoded.first.expect("first node").read().is_none());
    let second = decoded.second.expect("second node");
    let alias = decoded.alias.expect("alias node");
    assert!(Shared::ptr_eq(&second, &alias));
    assert_eq!(*second.read(), Some(Leaf { weight: 4 }));
    assert!(decoded.frozen.is_none());
}

#[test]
fn test_dynamic_fields_pick_codec_from_tag() {
    let registry = Arc::new(CodecRegistry::new());
    registry.register::<Point>().expect("register Point");
    registry.register::<Shared<Leaf>>().expect("register Shared<Leaf>");
    registry.register::<Leaf>().expect("register Leaf");
    registry.register::<Vec<String>>().expect("register Vec<String>");
    let serializer = Serializer::new(registry);

    let leaf = Shared::new(Leaf { weight: 1 });
    let values = vec![
        Dynamic::new(Point { x: 1, y: -1 }),
        Dynamic::new(String::from("text")),
        Dynamic::new(leaf.clone()),
        Dynamic::new(vec![String::from("a")]),
        Dynamic::new(leaf),
        Dynamic::new(Point { x: 2, y: -2 }),
    ];
    let bytes = serializer.serialize(&values).expect("encode");
    let decoded: Vec<Dynamic> = serializer.deserialize_bytes(&bytes).expect("decode");

    assert_eq!(decoded[0].downcast_ref::<Point>(), Some(&Point { x: 1, y: -1 }));
    assert_eq!(decoded[1].downcast_ref::<String>().map(String::as_str), Some("text"));
    let l1 = decoded[2].downcast_ref::<Shared<Leaf>>().expect("leaf");
    let l2 = decoded[4].downcast_ref::<Shared<Leaf>>().expect("leaf alias");
    assert!(Shared::ptr_eq(l1, l2));
    assert_eq!(
        decoded[3].downcast_ref::<Vec<String>>(),
        Some(&vec![String::from("a")])
    );
    assert_eq!(decoded[5].downcast_ref::<Point>(), Some(&Point { x: 2, y: -2 }));

    // Point has a well-known id, so its name never reaches the wire.
    assert!(!bytes.windows(11).any(|w| w == b"graph.Point"));
}

#[test]
fn test_dynamic_unknown_to_reader() {
    let writer_registry = Arc::new(CodecRegistry::new());
    writer_registry.register::<Leaf>().expect("register");
    let writer = Serializer::new(writer_registry);
    let reader = serializer();

    let bytes = writer
        .serialize(&Dynamic::new(Leaf { weight: 3 }))
        .expect("encode");
    assert!(matches!(
        reader.deserialize_bytes::<Dynamic>(&bytes),
        Err(CodecError::UnknownType { .. })
    ));
}

#[test]
fn test_deep_copy_ring() {
    let serializer = serializer();
    let nodes = ring(&["x", "y"]);
    let copy = serializer.deep_copy(&nodes).expect("copy");

    assert!(!Shared::ptr_eq(&copy[0], &nodes[0]));
    assert!(Shared::ptr_eq(&next_of(&copy[0]), &copy[1]));
    assert!(Shared::ptr_eq(&next_of(&copy[1]), &copy[0]));

    copy[0].write().name = "changed".into();
    assert_eq!(nodes[0].read().name, "x");
    unlink(&nodes);
    unlink(&copy);
}

#[test]
fn test_deep_copy_matches_serialization_roundtrip() {
    let serializer = serializer();
    let shared = Shared::new(Leaf { weight: 8 });
    let tree = Tree {
        left: Some(shared.clone()),
        right: None,
        all: vec![shared.clone(), shared],
    };
    let copied = serializer.deep_copy(&tree).expect("copy");
    let decoded: Tree = serializer
        .deserialize_bytes(&serializer.serialize(&tree).expect("encode"))
        .expect("decode");

    for candidate in [&copied, &decoded] {
        let left = candidate.left.as_ref().expect("left");
        assert!(candidate.right.is_none());
        assert!(candidate.all.iter().all(|leaf| Shared::ptr_eq(leaf, left)));
        assert_eq!(left.read().weight, 8);
    }
}
