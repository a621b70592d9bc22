mod common;

use algocore::connect;
use algoruntime::{flatten, improve, to_dot, write_dot};
use common::*;

#[test]
fn pure_chain_is_fused_serial_except_the_last_member() {
    let a = node(Noop, "a");
    let b = node(Noop, "b");
    let c = node(Noop, "c");
    let d = node(Noop, "d");
    let _ = a.clone() >> b.clone() >> c.clone() >> d.clone();
    assert!([&a, &b, &c, &d].iter().all(|n| n.parallel()));

    improve(&a);

    assert!(!a.parallel(), "the chain head must launch inline too");
    assert!(!b.parallel());
    assert!(!c.parallel());
    assert!(d.parallel(), "the terminal node keeps its own policy");
}

#[test]
fn improve_works_from_any_reachable_node() {
    let a = node(Noop, "a");
    let b = node(Noop, "b");
    let c = node(Noop, "c");
    let _ = a.clone() >> b.clone() >> c.clone();

    // Starting from the downstream end covers ancestors as well.
    improve(&c);

    assert!(!a.parallel());
    assert!(!b.parallel());
    assert!(c.parallel());
}

#[test]
fn fanout_edges_are_not_removable() {
    let a = node(Noop, "a");
    let b = node(Noop, "b");
    let c = node(Noop, "c");
    connect(&a, &b);
    connect(&a, &c);

    improve(&a);

    assert!(a.parallel());
    assert!(b.parallel());
    assert!(c.parallel());
}

#[test]
fn fusion_stops_where_the_chain_stops_being_one_to_one() {
    let a = node(Noop, "a");
    let b = node(Noop, "b");
    let c = node(Noop, "c");
    let d = node(Noop, "d");
    let e = node(Noop, "e");
    let _ = a.clone() >> b.clone() >> c.clone();
    connect(&c, &d);
    connect(&c, &e);

    improve(&a);

    // a->b->c is removable, c's fanout is not.
    assert!(!a.parallel());
    assert!(!b.parallel());
    assert!(c.parallel());
    assert!(d.parallel());
    assert!(e.parallel());
}

#[test]
fn flatten_covers_the_graph_from_any_node() {
    let src = node(Noop, "src");
    let left = node(Noop, "left");
    let right = node(Noop, "right");
    let sink = node(Noop, "sink");
    connect(&src, &left);
    connect(&src, &right);
    connect(&left, &sink);
    connect(&right, &sink);

    let flat = flatten(&left);
    assert_eq!(flat.len(), 4);
    assert_eq!(flat.descendants_of(src.id()).count(), 2);
    assert_eq!(flat.descendants_of(sink.id()).count(), 0);
    assert_eq!(flat.edge_pairs().count(), 4);
}

#[test]
fn flatten_terminates_on_a_structural_loop() {
    let a = node(Noop, "a");
    let b = node(Noop, "b");
    connect(&a, &b);
    connect(&b, &a); // unsupported cycle; traversal must still terminate

    let flat = flatten(&a);
    assert_eq!(flat.len(), 2);
}

#[test]
fn dot_export_lists_nodes_and_edges() {
    let a = node(Noop, "first");
    let b = node(Noop, "second");
    connect(&a, &b);

    let dot = to_dot(&a);
    assert!(dot.starts_with("digraph"));
    assert!(dot.contains("->"));
    assert!(dot.contains("first"));
    assert!(dot.contains("second"));
}

#[test]
fn dot_export_writes_to_disk() {
    let a = node(Noop, "a");
    let b = node(Noop, "b");
    connect(&a, &b);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.gv");
    write_dot(&a, &path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("->"));
}
