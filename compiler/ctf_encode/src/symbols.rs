//! Tying function and variable descriptors to symbol table entries.
//!
//! A descriptor is emitted once per symbol it binds to, carrying that
//! symbol's ordinal. Without a symbol table every used descriptor is emitted
//! with [`NO_SYMBOL`].

use ctf_ir::{Item, ItemKind, Name, TypeGraph};
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::format::NO_SYMBOL;
use crate::CtfFlags;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Function,
    Object,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Binding {
    Local,
    Global,
    Weak,
}

/// One symbol table entry. Its ordinal is its position in the table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub binding: Binding,
    /// Source file of a local symbol, when known.
    pub file: Option<String>,
    /// Present in the dynamic symbol table.
    pub dynamic: bool,
}

impl Symbol {
    pub fn global(name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            kind,
            binding: Binding::Global,
            file: None,
            dynamic: false,
        }
    }

    pub fn local(name: impl Into<String>, kind: SymbolKind, file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            binding: Binding::Local,
            file: Some(file.into()),
            dynamic: false,
        }
    }

    #[must_use]
    pub fn dynamic(mut self) -> Self {
        self.dynamic = true;
        self
    }

    fn item_kinds(&self) -> (ItemKind, ItemKind) {
        match self.kind {
            SymbolKind::Function => (ItemKind::GlobalFunction, ItemKind::StaticFunction),
            SymbolKind::Object => (ItemKind::GlobalVariable, ItemKind::StaticVariable),
        }
    }
}

/// A descriptor bound to a symbol ordinal.
#[derive(Clone, Debug)]
pub(crate) struct Bound {
    pub(crate) item: Item,
    pub(crate) symidx: u32,
}

#[derive(Debug, Default)]
pub(crate) struct Association {
    pub(crate) objects: Vec<Bound>,
    pub(crate) functions: Vec<Bound>,
    /// Indices of used function/variable descriptors no symbol bound.
    pub(crate) unmatched: Vec<usize>,
}

/// Bind `graph`'s descriptors to `symbols`, or keep every used one when
/// there is no table. Both lists come back sorted by name.
pub(crate) fn associate(
    graph: &TypeGraph,
    symbols: Option<&[Symbol]>,
    flags: CtfFlags,
) -> Association {
    let mut assoc = match symbols {
        None => keep_all(graph),
        Some(symbols) => bind(graph, symbols, flags),
    };
    let interner = graph.interner();
    let key = |b: &Bound| {
        (
            interner.lookup(b.item.name),
            b.item.owner.map_or("", |o| interner.lookup(o)),
            b.symidx,
        )
    };
    assoc.objects.sort_by_cached_key(key);
    assoc.functions.sort_by_cached_key(key);
    assoc
}

fn keep_all(graph: &TypeGraph) -> Association {
    let mut assoc = Association::default();
    for item in graph.items().iter().filter(|i| i.is_used()) {
        let bound = Bound {
            item: item.clone(),
            symidx: NO_SYMBOL,
        };
        if item.kind.is_function() {
            assoc.functions.push(bound);
        } else if item.kind.is_variable() {
            assoc.objects.push(bound);
        }
    }
    assoc
}

fn bind(graph: &TypeGraph, symbols: &[Symbol], flags: CtfFlags) -> Association {
    let interner = graph.interner();
    let items = graph.items();

    let mut by_name: FxHashMap<(ItemKind, Name), Vec<usize>> = FxHashMap::default();
    for (index, item) in items.iter().enumerate() {
        if item.is_used() && (item.kind.is_function() || item.kind.is_variable()) {
            by_name.entry((item.kind, item.name)).or_default().push(index);
        }
    }

    let mut assoc = Association::default();
    let mut matched = vec![false; items.len()];

    for (ordinal, sym) in symbols.iter().enumerate() {
        if flags.contains(CtfFlags::USE_DYNSYM) && !sym.dynamic {
            continue;
        }
        let Ok(symidx) = u32::try_from(ordinal) else {
            break;
        };
        let name = interner.intern(&sym.name);
        let (global_kind, static_kind) = sym.item_kinds();
        let candidates = |kind| by_name.get(&(kind, name)).map_or(&[][..], Vec::as_slice);

        let bound = match sym.binding {
            Binding::Global | Binding::Weak => candidates(global_kind)
                .first()
                .map(|&i| (i, items[i].clone())),
            Binding::Local => {
                let file = sym.file.as_deref().map(|f| interner.intern(f));
                let local = candidates(static_kind)
                    .iter()
                    .copied()
                    .find(|&i| file.is_none() || items[i].owner == file)
                    .map(|i| (i, items[i].clone()));
                local.or_else(|| {
                    if !flags.fuzzy() {
                        return None;
                    }
                    let &i = candidates(global_kind).first()?;
                    debug!(symbol = %sym.name, "local symbol bound to a global descriptor");
                    let mut renamed = items[i].dup_rename(name, file);
                    renamed.kind = static_kind;
                    Some((i, renamed))
                })
            }
        };

        let Some((index, item)) = bound else {
            continue;
        };
        matched[index] = true;
        let bound = Bound { item, symidx };
        match sym.kind {
            SymbolKind::Function => assoc.functions.push(bound),
            SymbolKind::Object => assoc.objects.push(bound),
        }
    }

    for (index, item) in items.iter().enumerate() {
        let candidate = item.is_used() && (item.kind.is_function() || item.kind.is_variable());
        if candidate && !matched[index] {
            debug!(
                descriptor = %item.display(interner),
                "no symbol for descriptor; not emitted"
            );
            assoc.unmatched.push(index);
        }
    }
    if !assoc.unmatched.is_empty() {
        info!(count = assoc.unmatched.len(), "descriptors without a symbol");
    }
    assoc
}

/// Clear the used flag of every function/variable descriptor that binds to
/// no symbol. Returns how many were cleared.
pub fn flag_unmatched(graph: &mut TypeGraph, symbols: &[Symbol], flags: CtfFlags) -> usize {
    let unmatched = bind(graph, symbols, flags).unmatched;
    for &index in &unmatched {
        graph.set_item_used(index, false);
    }
    unmatched.len()
}
