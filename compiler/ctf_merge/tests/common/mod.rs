//! Shared fixtures for merge tests.

#![allow(dead_code, reason = "each test binary uses a subset")]

use std::collections::{BTreeMap, HashSet};

use ctf_ir::{Intrinsic, Item, ItemKind, SharedInterner, TypeGraph, TypeId, TypePayload};

/// Render a type structurally, independent of IDs. Revisited nodes (cycles)
/// print as `^name`.
pub fn describe(g: &TypeGraph, id: TypeId) -> String {
    let mut seen = HashSet::new();
    render(g, id, &mut seen)
}

fn render(g: &TypeGraph, id: TypeId, seen: &mut HashSet<TypeId>) -> String {
    let id = g.resolve(id);
    if id.is_void() {
        return "void".to_owned();
    }
    let Some(node) = g.get(id) else {
        return format!("?{}", id.raw());
    };
    let name = g.name_of(id).unwrap_or("");
    if !seen.insert(id) {
        return format!("^{name}");
    }
    let body = match node.payload() {
        TypePayload::Intrinsic(i) => format!("{i:?}"),
        TypePayload::Ref(t) => render(g, *t, seen),
        TypePayload::PtrAuth(pa) => format!(
            "{}/{}/{}/{}",
            pa.key,
            pa.discriminator,
            pa.discriminated,
            render(g, pa.ty, seen)
        ),
        TypePayload::Array(ad) => format!(
            "{}[{}; {}]",
            render(g, ad.contents, seen),
            render(g, ad.index, seen),
            ad.nelems
        ),
        TypePayload::Function(fd) => {
            let args: Vec<String> = fd.args.iter().map(|&a| render(g, a, seen)).collect();
            format!("({}{}) -> {}", args.join(", "), if fd.variadic { ", ..." } else { "" }, render(g, fd.ret, seen))
        }
        TypePayload::Members(members) => {
            let parts: Vec<String> = members
                .iter()
                .map(|m| {
                    let mname = m.name.map_or("", |n| g.interner().lookup(n));
                    format!("{mname}@{}:{}={}", m.offset_bits, m.size_bits, render(g, m.ty, seen))
                })
                .collect();
            format!("{{{}}}", parts.join("; "))
        }
        TypePayload::Enumerators(values) => {
            let parts: Vec<String> = values
                .iter()
                .map(|e| format!("{}={}", g.interner().lookup(e.name), e.value))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        TypePayload::Forward(fk) => format!("{fk:?}"),
        TypePayload::Unresolved => "?".to_owned(),
    };
    seen.remove(&id);
    format!("{} {name} {} {body}", node.kind(), node.size())
}

/// How many times each canonical type and each descriptor appears in a
/// graph. A type held twice counts twice.
pub fn signature(g: &TypeGraph) -> (BTreeMap<String, usize>, BTreeMap<String, usize>) {
    let types = tally(
        g.nodes()
            .filter(|n| n.redirect().is_none())
            .map(|n| describe(g, n.id())),
    );
    let items = tally(g.items().iter().map(|item| {
        let args: Vec<String> = item.args.iter().map(|&a| describe(g, a)).collect();
        format!(
            "{} {} [{}] {} ({})",
            item.kind,
            g.interner().lookup(item.name),
            item.owner.map_or("", |o| g.interner().lookup(o)),
            describe(g, item.ty),
            args.join(", ")
        )
    }));
    (types, items)
}

fn tally(keys: impl Iterator<Item = String>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

/// A unit exercising every kind the merger handles, including a
/// self-referential struct reached through a forward declaration.
pub fn kitchen_sink(interner: &SharedInterner, source: &str) -> TypeGraph {
    let mut g = TypeGraph::with_source(interner.clone(), source);
    let int = g.add_intrinsic(Some("int"), 4, Intrinsic::int(32, true));
    let chr = g.add_intrinsic(Some("char"), 1, Intrinsic::char(true));
    let dbl = g.add_intrinsic(Some("double"), 8, Intrinsic::real(64, ctf_ir::real_format::DOUBLE));
    let fwd = g.add_forward("node", ctf_ir::ForwardKind::Struct);
    let pnode = g.add_pointer(fwd, 8);
    let cchr = g.add_const(chr);
    let str_ = g.add_pointer(cchr, 8);
    let arr = g.add_array(chr, int, 16, 16);
    let members = vec![
        g.member(Some("value"), dbl, 0, 0),
        g.member(Some("label"), arr, 64, 0),
        g.member(Some("next"), pnode, 192, 0),
    ];
    let node = g.add_struct(Some("node"), 32, members);
    let color = g.add_enum(Some("color"), 4, [("RED", 0), ("GREEN", 1)]);
    let td = g.add_typedef("node_t", node);
    let func = g.add_function(int, [str_, pnode], true);
    let auth = g.add_ptrauth(pnode, 2, 0x1234, true);

    let owner = interner.intern(source);
    let name = |s: &str| interner.intern(s);
    g.add_item(Item::new(ItemKind::StructOrUnion, name("node"), node).with_owner(owner));
    g.add_item(Item::new(ItemKind::Typedef, name("node_t"), td).with_owner(owner));
    g.add_item(Item::new(ItemKind::GlobalVariable, name("favorite"), color));
    g.add_item(Item::new(ItemKind::GlobalVariable, name("signed_head"), auth));
    g.add_item(
        Item::new(ItemKind::GlobalFunction, name("node_printf"), func)
            .with_args([str_, pnode], true),
    );
    g
}
