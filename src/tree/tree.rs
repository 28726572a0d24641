use std::collections::VecDeque;

use super::{ChildrenState, Node, NodeId};

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    node: Option<Node<T>>,
}

/// Order in which [`Tree::walk`] visits nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalOrder {
    /// Parent before children, children in insertion order
    #[default]
    PreOrder,
    /// Level by level
    BreadthFirst,
}

/// Arena-backed n-ary tree with exactly one root.
///
/// Children are owned by their parent: a node is only ever released by
/// [`Tree::clear`] on one of its ancestors. Released slots are recycled with a
/// bumped generation, so outstanding handles to them stop resolving.
#[derive(Debug, Clone)]
pub struct Tree<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    root: NodeId,
    len: usize,
}

impl<T> Tree<T> {
    pub fn new(root_value: T) -> Self {
        let root = NodeId::new(0, 0);
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(Node::new(root_value, None)),
            }],
            free: Vec::new(),
            root,
            len: 1,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node<T>> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node<T>> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn value(&self, id: NodeId) -> Option<&T> {
        self.get(id).map(Node::value)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    /// Direct children of `id`; empty for unknown handles.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::children).unwrap_or(&[])
    }

    pub fn is_fetched(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_fetched)
    }

    pub fn mark_fetched(&mut self, id: NodeId) {
        if let Some(node) = self.get_mut(id) {
            node.set_state(ChildrenState::Fetched);
        }
    }

    /// Appends a new child to `parent` and returns its handle.
    ///
    /// Returns `None` when `parent` is not a live node of this tree.
    pub fn insert(&mut self, parent: NodeId, value: T) -> Option<NodeId> {
        if !self.contains(parent) {
            return None;
        }

        let node = Node::new(value, Some(parent));
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = Some(node);
                NodeId::new(index, slot.generation)
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId::new(self.slots.len() - 1, 0)
            }
        };
        self.len += 1;

        if let Some(parent_node) = self.get_mut(parent) {
            parent_node.push_child(id);
        }
        Some(id)
    }

    /// Discards every descendant of `id` and resets it to unfetched.
    ///
    /// The node itself stays attached to its parent. Returns the number of
    /// released nodes.
    pub fn clear(&mut self, id: NodeId) -> usize {
        let Some(node) = self.get_mut(id) else {
            return 0;
        };
        node.set_state(ChildrenState::Unfetched);
        let mut pending = node.take_children();

        let mut released = 0;
        while let Some(child) = pending.pop() {
            let Some(slot) = self.slots.get_mut(child.index()) else {
                continue;
            };
            if slot.generation != child.generation() {
                continue;
            }
            if let Some(mut node) = slot.node.take() {
                pending.append(&mut node.take_children());
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(child.index());
                released += 1;
            }
        }

        self.len -= released;
        released
    }

    /// Ancestors of `id`, closest first, root last.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&current| self.parent(current))
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).count()
    }

    pub fn is_ancestor_of(&self, ancestor: NodeId, descendant: NodeId) -> bool {
        self.ancestors(descendant).any(|id| id == ancestor)
    }

    /// First direct child of `parent` whose value satisfies `predicate`.
    pub fn find_child<P>(&self, parent: NodeId, mut predicate: P) -> Option<NodeId>
    where
        P: FnMut(&T) -> bool,
    {
        self.children(parent)
            .iter()
            .copied()
            .find(|&child| self.value(child).is_some_and(&mut predicate))
    }

    /// Iterates the subtree rooted at `start` without recursion.
    pub fn walk(&self, start: NodeId, order: TraversalOrder) -> Walk<'_, T> {
        let mut pending = VecDeque::new();
        if self.contains(start) {
            pending.push_back(start);
        }
        Walk {
            tree: self,
            order,
            pending,
        }
    }
}

impl<T: PartialEq> Tree<T> {
    /// Depth-first, pre-order search over the whole tree.
    pub fn search(&self, value: &T) -> Option<NodeId> {
        self.search_with(value, TraversalOrder::PreOrder)
    }

    pub fn search_breadth_first(&self, value: &T) -> Option<NodeId> {
        self.search_with(value, TraversalOrder::BreadthFirst)
    }

    fn search_with(&self, value: &T, order: TraversalOrder) -> Option<NodeId> {
        self.walk(self.root, order)
            .find(|&id| self.value(id).is_some_and(|candidate| candidate == value))
    }
}

/// Iterator returned by [`Tree::walk`]
pub struct Walk<'a, T> {
    tree: &'a Tree<T>,
    order: TraversalOrder,
    pending: VecDeque<NodeId>,
}

impl<T> Iterator for Walk<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        match self.order {
            TraversalOrder::PreOrder => {
                let current = self.pending.pop_back()?;
                // Reversed so the first child is popped next
                for &child in self.tree.children(current).iter().rev() {
                    self.pending.push_back(child);
                }
                Some(current)
            }
            TraversalOrder::BreadthFirst => {
                let current = self.pending.pop_front()?;
                self.pending
                    .extend(self.tree.children(current).iter().copied());
                Some(current)
            }
        }
    }
}
