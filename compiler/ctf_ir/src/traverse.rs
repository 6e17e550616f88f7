//! Depth-first walks over a type graph.
//!
//! Every walk takes a fresh visitation generation from the graph and stamps
//! each node it reaches. A node already carrying the current generation is
//! not entered again, so self-referential and mutually referential types
//! terminate without a visited set.
//!
//! Children are visited in payload order: referenced type; array contents
//! then index; function return then arguments; members in declaration order.
//! Forward declarations bound to a definition are walked as that definition.

use ctf_stack::ensure_sufficient_stack;

use crate::{TypeGraph, TypeId, TypeNode};

/// What a visitor wants after seeing a node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Visit {
    /// Walk this node's children.
    Descend,
    /// Leave the children alone.
    Skip,
}

/// Callback interface for [`TypeGraph::walk`].
///
/// # Example
///
/// ```
/// use ctf_ir::{TypeGraph, TypeNode, TypeVisitor, Visit, SharedInterner, Intrinsic};
///
/// struct Count(usize);
///
/// impl TypeVisitor for Count {
///     fn visit(&mut self, _graph: &TypeGraph, _node: &TypeNode) -> Visit {
///         self.0 += 1;
///         Visit::Descend
///     }
/// }
///
/// let mut g = TypeGraph::new(SharedInterner::new());
/// let int = g.add_intrinsic(Some("int"), 4, Intrinsic::int(32, true));
/// let ptr = g.add_pointer(int, 8);
/// let mut count = Count(0);
/// g.walk([ptr], &mut count);
/// assert_eq!(count.0, 2);
/// ```
pub trait TypeVisitor {
    /// Called once per reached node, before its children.
    fn visit(&mut self, graph: &TypeGraph, node: &TypeNode) -> Visit;

    /// Called for an ID the graph does not contain and its parent does not
    /// own. Default ignores it.
    fn missing(&mut self, _id: TypeId) {}
}

impl<F> TypeVisitor for F
where
    F: FnMut(&TypeNode) -> Visit,
{
    fn visit(&mut self, _graph: &TypeGraph, node: &TypeNode) -> Visit {
        self(node)
    }
}

impl TypeGraph {
    /// Walk everything reachable from `roots`, pre-order.
    pub fn walk<V: TypeVisitor + ?Sized>(
        &self,
        roots: impl IntoIterator<Item = TypeId>,
        visitor: &mut V,
    ) {
        let generation = self.next_vgen();
        for root in roots {
            self.walk_from(root, generation, visitor);
        }
    }

    fn walk_from<V: TypeVisitor + ?Sized>(&self, id: TypeId, generation: u32, visitor: &mut V) {
        ensure_sufficient_stack(|| {
            let id = self.resolve(id);
            if id.is_void() || self.is_parent_type(id) {
                return;
            }
            let Some(node) = self.get(id) else {
                visitor.missing(id);
                return;
            };
            if node.vgen() == generation {
                return;
            }
            node.set_vgen(generation);

            if visitor.visit(self, node) == Visit::Descend {
                for child in node.children() {
                    self.walk_from(child, generation, visitor);
                }
            }
        });
    }

    /// IDs reachable from `roots`, in walk order, canonical (redirects
    /// followed), each once.
    pub fn reachable(&self, roots: impl IntoIterator<Item = TypeId>) -> Vec<TypeId> {
        let mut out = Vec::new();
        self.walk(roots, &mut |node: &TypeNode| {
            out.push(node.id());
            Visit::Descend
        });
        out
    }
}
