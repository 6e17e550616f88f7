//! Top-level descriptors ("items").
//!
//! An item marks a type node as interesting: a global or static function,
//! a global or static variable, a function parameter, a struct or union, or
//! a named typedef. Items are what the encoder emits; every type it writes is
//! reachable from one.

use std::fmt;

use bitflags::bitflags;

use crate::{FuncArgs, Name, StringInterner, TypeId};

/// What an item describes.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub enum ItemKind {
    GlobalFunction,
    StaticFunction,
    GlobalVariable,
    StaticVariable,
    /// Function parameter.
    Param,
    StructOrUnion,
    Typedef,
}

impl ItemKind {
    pub const ALL: [ItemKind; 7] = [
        ItemKind::GlobalFunction,
        ItemKind::StaticFunction,
        ItemKind::GlobalVariable,
        ItemKind::StaticVariable,
        ItemKind::Param,
        ItemKind::StructOrUnion,
        ItemKind::Typedef,
    ];

    #[inline]
    pub const fn is_function(self) -> bool {
        matches!(self, ItemKind::GlobalFunction | ItemKind::StaticFunction)
    }

    #[inline]
    pub const fn is_variable(self) -> bool {
        matches!(self, ItemKind::GlobalVariable | ItemKind::StaticVariable)
    }

    /// Visible program-wide, so its identity does not include the owner.
    #[inline]
    pub const fn is_global(self) -> bool {
        matches!(self, ItemKind::GlobalFunction | ItemKind::GlobalVariable)
    }

    #[inline]
    pub const fn is_type(self) -> bool {
        matches!(self, ItemKind::StructOrUnion | ItemKind::Typedef)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ItemKind::GlobalFunction => "global function",
            ItemKind::StaticFunction => "static function",
            ItemKind::GlobalVariable => "global variable",
            ItemKind::StaticVariable => "static variable",
            ItemKind::Param => "parameter",
            ItemKind::StructOrUnion => "struct/union",
            ItemKind::Typedef => "typedef",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct ItemFlags: u8 {
        /// Write this item out. Cleared items are kept but never emitted.
        const USED = 1 << 0;
    }
}

/// A top-level descriptor.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Item {
    pub kind: ItemKind,
    pub name: Name,
    /// The described type; for functions, the function's type node or its
    /// return type when the front end has no function node.
    pub ty: TypeId,
    /// Source file that defined the item.
    pub owner: Option<Name>,
    pub flags: ItemFlags,
    /// Parameter types, functions only.
    pub args: FuncArgs,
    pub variadic: bool,
}

impl Item {
    /// A used item with no owner and no arguments.
    pub fn new(kind: ItemKind, name: Name, ty: TypeId) -> Self {
        Self {
            kind,
            name,
            ty,
            owner: None,
            flags: ItemFlags::USED,
            args: FuncArgs::new(),
            variadic: false,
        }
    }

    #[must_use]
    pub fn with_owner(mut self, owner: Name) -> Self {
        self.owner = Some(owner);
        self
    }

    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = TypeId>, variadic: bool) -> Self {
        self.args = args.into_iter().collect();
        self.variadic = variadic;
        self
    }

    #[inline]
    pub fn is_used(&self) -> bool {
        self.flags.contains(ItemFlags::USED)
    }

    /// Copy of this item under another name and owner.
    #[must_use]
    pub fn dup_rename(&self, name: Name, owner: Option<Name>) -> Self {
        Self {
            name,
            owner,
            ..self.clone()
        }
    }

    /// Every type ID this item references: its type, then its arguments.
    pub fn type_refs(&self) -> impl Iterator<Item = TypeId> + '_ {
        std::iter::once(self.ty).chain(self.args.iter().copied())
    }

    /// Render for dumps and diagnostics.
    pub fn display<'a>(&'a self, interner: &'a StringInterner) -> ItemDisplay<'a> {
        ItemDisplay {
            item: self,
            interner,
        }
    }
}

/// [`Item`] rendered with its strings resolved.
pub struct ItemDisplay<'a> {
    item: &'a Item,
    interner: &'a StringInterner,
}

impl fmt::Display for ItemDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let item = self.item;
        write!(
            f,
            "{} {} -> {}",
            item.kind,
            self.interner.lookup(item.name),
            item.ty
        )?;
        if item.kind.is_function() {
            f.write_str(" (")?;
            for (i, arg) in item.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            if item.variadic {
                f.write_str(if item.args.is_empty() { "..." } else { ", ..." })?;
            }
            f.write_str(")")?;
        }
        if let Some(owner) = item.owner {
            write!(f, " [{}]", self.interner.lookup(owner))?;
        }
        if !item.is_used() {
            f.write_str(" (unused)")?;
        }
        Ok(())
    }
}

/// Item counts per kind.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct ItemStats {
    counts: [usize; ItemKind::ALL.len()],
}

impl ItemStats {
    pub fn record(&mut self, kind: ItemKind) {
        self.counts[kind.index()] += 1;
    }

    pub fn count(&self, kind: ItemKind) -> usize {
        self.counts[kind.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

impl<'a> FromIterator<&'a Item> for ItemStats {
    fn from_iter<I: IntoIterator<Item = &'a Item>>(iter: I) -> Self {
        let mut stats = ItemStats::default();
        for item in iter {
            stats.record(item.kind);
        }
        stats
    }
}

impl fmt::Display for ItemStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for kind in ItemKind::ALL {
            writeln!(f, "{:>16}: {}", kind.as_str(), self.count(kind))?;
        }
        write!(f, "{:>16}: {}", "total", self.total())
    }
}
