use super::*;
use pretty_assertions::assert_eq;

fn graph() -> TypeGraph {
    TypeGraph::with_source(SharedInterner::new(), "unit.c")
}

#[test]
fn builders_allocate_monotonic_ids() {
    let mut g = graph();
    let int = g.add_intrinsic(Some("int"), 4, Intrinsic::int(32, true));
    let ptr = g.add_pointer(int, 8);
    let cst = g.add_const(ptr);
    assert_eq!(int, TypeId::FIRST);
    assert_eq!(ptr, TypeId::from_raw(2));
    assert_eq!(cst, TypeId::from_raw(3));
    assert_eq!(g.max_id(), cst);
    assert_eq!(g.next_id(), TypeId::from_raw(4));
    assert_eq!(g.len(), 3);
    assert_eq!(g.name_of(int), Some("int"));
    assert_eq!(g.get(cst).unwrap().payload(), &TypePayload::Ref(ptr));
}

#[test]
fn insert_keeps_foreign_ids_and_bumps_counter() {
    let mut g = graph();
    let node = TypeNode::new(
        TypeId::from_raw(40),
        None,
        TypeKind::Pointer,
        8,
        TypePayload::Ref(TypeId::VOID),
    )
    .unwrap();
    assert_eq!(g.insert(node.clone()), Ok(TypeId::from_raw(40)));
    assert_eq!(
        g.insert(node),
        Err(GraphError::DuplicateId(TypeId::from_raw(40)))
    );
    assert_eq!(g.next_id(), TypeId::from_raw(41));

    let next = g.add_pointer(TypeId::VOID, 8);
    assert_eq!(next, TypeId::from_raw(41));
}

#[test]
fn last_id_in_the_space_is_rejected() {
    let mut g = graph();
    let node = TypeNode::new(
        TypeId::from_raw(u32::MAX),
        None,
        TypeKind::Pointer,
        8,
        TypePayload::Ref(TypeId::VOID),
    )
    .unwrap();
    assert_eq!(
        g.insert(node),
        Err(GraphError::IdOverflow(TypeId::from_raw(u32::MAX)))
    );
    assert!(g.is_empty());
    assert_eq!(TypeId::from_raw(u32::MAX).checked_next(), None);
    assert_eq!(
        TypeId::from_raw(u32::MAX).next(),
        TypeId::from_raw(u32::MAX)
    );
}

#[test]
fn void_id_is_never_inserted() {
    let mut g = graph();
    let node = TypeNode::new(
        TypeId::VOID,
        None,
        TypeKind::Pointer,
        8,
        TypePayload::Ref(TypeId::VOID),
    )
    .unwrap();
    assert_eq!(g.insert(node), Err(GraphError::DuplicateId(TypeId::VOID)));
}

#[test]
fn layout_index_groups_equal_shapes() {
    let mut g = graph();
    let a = g.add_intrinsic(Some("int"), 4, Intrinsic::int(32, true));
    let b = g.add_intrinsic(Some("int"), 4, Intrinsic::int(32, true));
    let c = g.add_intrinsic(Some("long"), 8, Intrinsic::int(64, true));
    let hash = layout_hash(g.get(a).unwrap());
    assert_eq!(g.layout_candidates(hash), &[a, b]);
    assert!(!g.layout_candidates(hash).contains(&c));
}

#[test]
fn forward_redirect_resolves_and_keeps_id() {
    let mut g = graph();
    let fwd = g.add_forward("list", ForwardKind::Struct);
    let ptr = g.add_pointer(fwd, 8);
    let next = g.member(Some("next"), ptr, 0, 0);
    let def = g.add_struct(Some("list"), 8, vec![next]);

    let name = g.interner().intern("list");
    assert_eq!(
        g.open_forwards(ForwardKind::Struct, name)
            .collect::<Vec<_>>(),
        vec![fwd]
    );
    assert_eq!(g.find_definition(ForwardKind::Struct, name), Some(def));

    g.redirect_forward(fwd, def).unwrap();
    assert_eq!(g.resolve(fwd), def);
    assert_eq!(g.resolve(ptr), ptr);
    assert!(g.get(fwd).unwrap().flags().contains(NodeFlags::RESOLVED));
    assert_eq!(g.open_forwards(ForwardKind::Struct, name).count(), 0);
    // The pointer still names the forward; only `resolve` changes.
    assert_eq!(g.get(ptr).unwrap().payload(), &TypePayload::Ref(fwd));
}

#[test]
fn redirect_requires_forward() {
    let mut g = graph();
    let int = g.add_intrinsic(Some("int"), 4, Intrinsic::int(32, true));
    let other = g.add_intrinsic(Some("long"), 8, Intrinsic::int(64, true));
    assert_eq!(
        g.redirect_forward(int, other),
        Err(GraphError::WrongKind {
            id: int,
            found: TypeKind::Integer,
            expected: TypeKind::Forward,
        })
    );
    let fwd = g.add_forward("s", ForwardKind::Struct);
    assert_eq!(
        g.redirect_forward(fwd, TypeId::from_raw(99)),
        Err(GraphError::UnknownType(TypeId::from_raw(99)))
    );
}

#[test]
fn resolve_typedef_in_place_updates_layout_index() {
    let mut g = graph();
    let td = g.add_unresolved_typedef("size_t");
    let holder = g.add_pointer(td, 8);
    let ulong = g.add_intrinsic(Some("unsigned long"), 8, Intrinsic::int(64, false));
    let before = layout_hash(g.get(td).unwrap());

    g.resolve_typedef(td, ulong).unwrap();
    let node = g.get(td).unwrap();
    assert_eq!(node.kind(), TypeKind::Typedef);
    assert_eq!(node.payload(), &TypePayload::Ref(ulong));
    assert!(node.flags().contains(NodeFlags::RESOLVED));
    assert!(!g.layout_candidates(before).contains(&td));
    assert!(g.layout_candidates(layout_hash(node)).contains(&td));
    assert_eq!(g.get(holder).unwrap().payload(), &TypePayload::Ref(td));

    assert!(matches!(
        g.resolve_typedef(td, ulong),
        Err(GraphError::WrongKind { .. })
    ));
}

#[test]
fn typedefs_bind_by_unique_name() {
    let mut g = graph();
    let td = g.add_unresolved_typedef("node");
    let ambiguous = g.add_unresolved_typedef("pair");
    let missing = g.add_unresolved_typedef("nowhere");
    g.add_forward("node", ForwardKind::Struct);
    let def = g.add_struct(Some("node"), 0, Vec::new());
    g.add_struct(Some("pair"), 0, Vec::new());
    g.add_union(Some("pair"), 0, Vec::new());

    assert_eq!(g.resolve_typedefs_by_name(), 1);
    assert_eq!(g.get(td).unwrap().payload(), &TypePayload::Ref(def));
    assert_eq!(
        g.unresolved_typedefs().collect::<Vec<_>>(),
        vec![ambiguous, missing]
    );
}

#[test]
fn items_mark_roots_and_index_by_name() {
    let mut g = graph();
    let int = g.add_intrinsic(Some("int"), 4, Intrinsic::int(32, true));
    let counter = g.interner().intern("counter");
    let owner = g.interner().intern("a.c");

    g.add_item(Item::new(ItemKind::GlobalVariable, counter, int));
    g.add_item(Item::new(ItemKind::StaticVariable, counter, int).with_owner(owner));

    let flags = g.get(int).unwrap().flags();
    assert!(flags.contains(NodeFlags::ROOT | NodeFlags::GLOBAL));
    assert_eq!(g.items_named(counter).count(), 2);
    assert!(g
        .find_item(ItemKind::StaticVariable, counter, Some(owner))
        .is_some());
    assert!(g
        .find_item(ItemKind::StaticVariable, counter, None)
        .is_none());
    // Globals ignore the owner.
    assert!(g
        .find_item(ItemKind::GlobalVariable, counter, Some(owner))
        .is_some());

    let stats = g.item_stats();
    assert_eq!(stats.total(), 2);
    assert_eq!(stats.count(ItemKind::GlobalVariable), 1);
}

#[test]
fn set_item_used_clears_flag() {
    let mut g = graph();
    let int = g.add_intrinsic(Some("int"), 4, Intrinsic::int(32, true));
    let x = g.interner().intern("x");
    let idx = g.add_item(Item::new(ItemKind::GlobalVariable, x, int));
    g.set_item_used(idx, false);
    assert!(!g.items()[idx].is_used());
}

#[test]
fn parent_reserves_id_space() {
    let mut g = graph();
    let label = g.interner().intern("base");
    let name = g.interner().intern("genunix");
    g.set_parent(ParentRef {
        label,
        name,
        max_id: TypeId::from_raw(100),
    });
    assert!(g.is_parent_type(TypeId::from_raw(7)));
    assert!(!g.is_parent_type(TypeId::from_raw(101)));
    assert!(!g.is_parent_type(TypeId::VOID));
    assert_eq!(g.add_pointer(TypeId::from_raw(7), 8), TypeId::from_raw(101));
    // Parent types are valid redirect targets.
    let fwd = g.add_forward("proc", ForwardKind::Struct);
    assert_eq!(g.redirect_forward(fwd, TypeId::from_raw(7)), Ok(()));
}

#[test]
fn revision_moves_on_every_mutation() {
    let mut g = graph();
    let r0 = g.revision();
    let int = g.add_intrinsic(Some("int"), 4, Intrinsic::int(32, true));
    let r1 = g.revision();
    let x = g.interner().intern("x");
    g.add_item(Item::new(ItemKind::GlobalVariable, x, int));
    assert!(r0 < r1 && r1 < g.revision());
}

#[test]
fn generations_advance() {
    let g = graph();
    let a = g.next_emark();
    let b = g.next_emark();
    assert_ne!(a, b);
    assert_ne!(g.next_vgen(), 0);
}

#[test]
fn clone_keeps_contents() {
    let mut g = graph();
    let int = g.add_intrinsic(Some("int"), 4, Intrinsic::int(32, true));
    g.add_pointer(int, 8);
    let copy = g.clone();
    assert_eq!(copy.len(), 2);
    assert_eq!(copy.next_id(), g.next_id());
    assert_eq!(copy.source_str(), "unit.c");
    assert!(copy.interner().same(g.interner()));
}
