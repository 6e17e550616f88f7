//! Sharded string interner.
//!
//! Every type name, member name, symbol name, and owning file name in a
//! build goes through one interner, shared by all workers. Names handed out
//! by the same interner compare by handle, so the merge engine never compares
//! string contents.

// Arc is required: one interner is shared by every worker and every graph.
#![expect(
    clippy::disallowed_types,
    reason = "Arc required for SharedInterner thread-safety"
)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::Name;

/// Interning failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternError {
    /// A shard ran out of 28-bit slots.
    ShardOverflow { shard_idx: usize, count: usize },
}

impl std::fmt::Display for InternError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InternError::ShardOverflow { shard_idx, count } => write!(
                f,
                "interner shard {shard_idx} is full ({count} strings, limit {})",
                Name::MAX_LOCAL
            ),
        }
    }
}

impl std::error::Error for InternError {}

#[derive(Default)]
struct Shard {
    map: FxHashMap<&'static str, u32>,
    strings: Vec<&'static str>,
}

/// Thread-safe string interner.
///
/// Strings are leaked on first insertion and live for the rest of the
/// process, which is the lifetime of one build.
pub struct StringInterner {
    shards: [RwLock<Shard>; Name::NUM_SHARDS],
    total: AtomicUsize,
}

impl StringInterner {
    pub fn new() -> Self {
        let shards = std::array::from_fn(|i| {
            let mut shard = Shard::default();
            if i == 0 {
                shard.map.insert("", 0);
                shard.strings.push("");
            }
            RwLock::new(shard)
        });
        Self {
            shards,
            total: AtomicUsize::new(1),
        }
    }

    #[inline]
    fn shard_for(s: &str) -> usize {
        // The empty string must land in shard 0 to match Name::EMPTY.
        let mut hash = 0u32;
        for byte in s.bytes().take(16) {
            hash = hash.wrapping_mul(31).wrapping_add(u32::from(byte));
        }
        (hash as usize) % Name::NUM_SHARDS
    }

    fn insert<S>(&self, s: S) -> Result<Name, InternError>
    where
        S: AsRef<str> + Into<Box<str>>,
    {
        let shard_idx = Self::shard_for(s.as_ref());
        #[expect(
            clippy::cast_possible_truncation,
            reason = "shard_idx is bounded by NUM_SHARDS"
        )]
        let shard_u32 = shard_idx as u32;
        let shard = &self.shards[shard_idx];

        if let Some(&local) = shard.read().map.get(s.as_ref()) {
            return Ok(Name::new(shard_u32, local));
        }

        let mut guard = shard.write();
        if let Some(&local) = guard.map.get(s.as_ref()) {
            return Ok(Name::new(shard_u32, local));
        }

        let count = guard.strings.len();
        let local = u32::try_from(count)
            .ok()
            .filter(|&l| l <= Name::MAX_LOCAL)
            .ok_or(InternError::ShardOverflow { shard_idx, count })?;
        let leaked: &'static str = Box::leak(s.into());
        guard.strings.push(leaked);
        guard.map.insert(leaked, local);
        self.total.fetch_add(1, Ordering::Relaxed);

        Ok(Name::new(shard_u32, local))
    }

    /// Intern `s`, failing if its shard is full.
    pub fn try_intern(&self, s: &str) -> Result<Name, InternError> {
        self.insert(s)
    }

    /// Intern `s`.
    ///
    /// # Panics
    /// Panics if the shard is full (more than 268 million strings).
    pub fn intern(&self, s: &str) -> Name {
        self.try_intern(s).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Intern an owned string, reusing its allocation on a miss.
    pub fn intern_owned(&self, s: String) -> Name {
        self.insert(s).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Intern an optional string; `None` stays `None`.
    pub fn intern_opt(&self, s: Option<&str>) -> Option<Name> {
        s.map(|s| self.intern(s))
    }

    /// The string behind `name`.
    pub fn lookup(&self, name: Name) -> &'static str {
        self.shards[name.shard()].read().strings[name.local()]
    }

    /// Number of distinct strings, including the empty string.
    pub fn len(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// True when only the empty string is interned.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

/// Reference-counted handle to a [`StringInterner`].
///
/// This is the capability every `TypeGraph` is constructed with. Graphs can
/// only be merged when they were built against the same interner.
#[derive(Clone)]
pub struct SharedInterner(Arc<StringInterner>);

impl SharedInterner {
    pub fn new() -> Self {
        SharedInterner(Arc::new(StringInterner::new()))
    }

    /// True when both handles point at the same interner.
    pub fn same(&self, other: &SharedInterner) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for SharedInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for SharedInterner {
    type Target = StringInterner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Debug for SharedInterner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedInterner({} strings)", self.len())
    }
}
