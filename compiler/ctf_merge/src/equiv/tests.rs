use super::*;
use ctf_ir::{ForwardKind, Intrinsic, SharedInterner};

fn pair() -> (TypeGraph, TypeGraph) {
    let interner = SharedInterner::new();
    (
        TypeGraph::with_source(interner.clone(), "a.c"),
        TypeGraph::with_source(interner, "b.c"),
    )
}

/// `struct list { int v; struct list *next; }`, built forward first.
fn list(g: &mut TypeGraph, next_offset: u32) -> TypeId {
    let int = g.add_intrinsic(Some("int"), 4, Intrinsic::int(32, true));
    let fwd = g.add_forward("list", ForwardKind::Struct);
    let ptr = g.add_pointer(fwd, 8);
    let members = vec![
        g.member(Some("v"), int, 0, 0),
        g.member(Some("next"), ptr, next_offset, 0),
    ];
    g.add_struct(Some("list"), 16, members)
}

/// Same struct, but the member points straight back at the definition.
fn list_direct(g: &mut TypeGraph) -> TypeId {
    let int = g.add_intrinsic(Some("int"), 4, Intrinsic::int(32, true));
    let def = g.next_id().next();
    let ptr = g.add_pointer(def, 8);
    let members = vec![g.member(Some("v"), int, 0, 0), g.member(Some("next"), ptr, 64, 0)];
    let id = g.add_struct(Some("list"), 16, members);
    assert_eq!(id, def);
    id
}

#[test]
fn intrinsics_compare_by_value() {
    let (mut a, mut b) = pair();
    let x = a.add_intrinsic(Some("int"), 4, Intrinsic::int(32, true));
    let y = b.add_intrinsic(Some("int"), 4, Intrinsic::int(32, true));
    let z = b.add_intrinsic(Some("int"), 4, Intrinsic::int(32, false));
    assert!(equivalent(&a, x, &b, y));
    assert!(!equivalent(&a, x, &b, z));
}

#[test]
fn typedef_names_matter() {
    let (mut a, mut b) = pair();
    let ia = a.add_intrinsic(Some("int"), 4, Intrinsic::int(32, true));
    let ib = b.add_intrinsic(Some("int"), 4, Intrinsic::int(32, true));
    let ta = a.add_typedef("pid_t", ia);
    let tb = b.add_typedef("uid_t", ib);
    assert!(!equivalent(&a, ta, &b, tb));
}

#[test]
fn cyclic_structs_terminate_and_match() {
    let (mut a, mut b) = pair();
    b.add_intrinsic(Some("char"), 1, Intrinsic::char(true));
    let la = list(&mut a, 64);
    let lb = list_direct(&mut b);
    assert!(equivalent(&a, la, &b, lb));
}

#[test]
fn cyclic_structs_with_different_layout_differ() {
    let (mut a, mut b) = pair();
    let la = list(&mut a, 64);
    let lb = list(&mut b, 32);
    assert!(!equivalent(&a, la, &b, lb));
}

#[test]
fn forward_matches_definition_of_same_tag_only() {
    let (mut a, mut b) = pair();
    let fwd = a.add_forward("list", ForwardKind::Struct);
    let ufwd = a.add_forward("list", ForwardKind::Union);
    let def = list(&mut b, 64);
    assert!(equivalent(&a, fwd, &b, def));
    assert!(!equivalent(&a, ufwd, &b, def));

    // And the other way around: a definition against a bare forward.
    let tfwd = b.add_forward("list", ForwardKind::Struct);
    let adef = list(&mut a, 64);
    assert!(equivalent(&a, adef, &b, tfwd));
}

#[test]
fn failed_attempt_does_not_poison_the_next() {
    let (mut a, mut b) = pair();
    let la = list(&mut a, 64);
    let bad = list(&mut b, 32);
    let good = list(&mut b, 64);
    assert!(!equivalent(&a, la, &b, bad));
    assert!(equivalent(&a, la, &b, good));
}

#[test]
fn matched_pairs_skip_definition_to_forward() {
    let (mut a, mut b) = pair();
    let ia = a.add_intrinsic(Some("int"), 4, Intrinsic::int(32, true));
    let def = a.add_struct(Some("s"), 4, vec![a.member(Some("x"), ia, 0, 0)]);
    let pa = a.add_pointer(def, 8);
    let fwd = b.add_forward("s", ForwardKind::Struct);
    let pb = b.add_pointer(fwd, 8);

    let pairs = Equiv::new(&a, &b).run(pa, pb).unwrap_or_default();
    assert_eq!(pairs.as_slice(), &[(pa, pb)]);
}

#[test]
fn functions_compare_arity_and_varargs() {
    let (mut a, mut b) = pair();
    let ia = a.add_intrinsic(Some("int"), 4, Intrinsic::int(32, true));
    let ib = b.add_intrinsic(Some("int"), 4, Intrinsic::int(32, true));
    let fa = a.add_function(ia, [ia], true);
    let fb = b.add_function(ib, [ib], true);
    let fc = b.add_function(ib, [ib], false);
    let fd = b.add_function(ib, [ib, ib], true);
    assert!(equivalent(&a, fa, &b, fb));
    assert!(!equivalent(&a, fa, &b, fc));
    assert!(!equivalent(&a, fa, &b, fd));
}
