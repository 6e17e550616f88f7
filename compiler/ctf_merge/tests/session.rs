//! Concurrent merging through a shared session.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

mod common;

use common::{kitchen_sink, signature};
use ctf_ir::{Intrinsic, Item, ItemKind, SharedInterner, TypeGraph};
use ctf_merge::{merge_into, MergeError, MergeSession};
use pretty_assertions::assert_eq;
use rayon::prelude::*;

#[test]
fn parallel_units_deduplicate() {
    let interner = SharedInterner::new();
    let session = MergeSession::new(TypeGraph::with_source(interner.clone(), "master"));

    let sources: Vec<String> = (0..32).map(|i| format!("unit{i}.c")).collect();
    let results: Vec<_> = sources
        .par_iter()
        .map(|src| session.add(kitchen_sink(&interner, src)))
        .collect();
    assert!(results.iter().all(Result::is_ok));

    let master = session.finish();
    let mut serial = TypeGraph::with_source(interner.clone(), "master");
    merge_into(kitchen_sink(&interner, "unit0.c"), &mut serial).unwrap();

    // Same types as a single unit; per-owner descriptors once per unit.
    assert_eq!(master.len(), serial.len());
    assert_eq!(signature(&master).0, signature(&serial).0);
    let stats = master.item_stats();
    assert_eq!(stats.count(ItemKind::StructOrUnion), 32);
    assert_eq!(stats.count(ItemKind::GlobalFunction), 1);
}

#[test]
fn conflicting_unit_fails_alone() {
    let interner = SharedInterner::new();
    let session = MergeSession::new(TypeGraph::with_source(interner.clone(), "master"));

    let unit = |source: &str, bits: u16| {
        let mut g = TypeGraph::with_source(interner.clone(), source);
        let ty = g.add_intrinsic(Some("int"), u64::from(bits / 8), Intrinsic::int(bits, true));
        g.add_item(Item::new(ItemKind::GlobalVariable, interner.intern("errno"), ty));
        g
    };

    session.add(unit("a.c", 32)).unwrap();
    let err = session.add(unit("b.c", 64)).unwrap_err();
    assert!(matches!(err, MergeError::StructuralConflict { .. }));
    session.add(unit("c.c", 32)).unwrap();

    // The failed unit left nothing behind.
    let master = session.finish();
    assert_eq!(master.len(), 1);
    assert_eq!(master.items().len(), 1);
}

#[test]
fn final_label_covers_every_unit() {
    let interner = SharedInterner::new();
    let session = MergeSession::new(TypeGraph::with_source(interner.clone(), "master"));
    session.add(kitchen_sink(&interner, "a.c")).unwrap();
    session.add(kitchen_sink(&interner, "b.c")).unwrap();
    let mut master = session.finish();
    let label = master
        .label_add("release", ctf_ir::LabelIdx::Current)
        .unwrap();
    assert_eq!(label.idx, master.max_id());
}
