use derive_more::Display;

/// Handle to a node inside a [`Tree`](super::Tree).
///
/// The generation is bumped every time a slot is released, which makes
/// handles to cleared nodes stale instead of dangling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("NodeId({index}v{generation})")]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl NodeId {
    pub(super) const fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }

    pub(super) const fn index(self) -> usize {
        self.index
    }

    pub(super) const fn generation(self) -> u32 {
        self.generation
    }
}

/// Whether a node's children have been materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChildrenState {
    #[default]
    Unfetched,
    Fetched,
}

#[derive(Debug, Clone)]
pub struct Node<T> {
    value: T,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    state: ChildrenState,
}

impl<T> Node<T> {
    pub(super) fn new(value: T, parent: Option<NodeId>) -> Self {
        Self {
            value,
            parent,
            children: Vec::new(),
            state: ChildrenState::Unfetched,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Parent handle, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn state(&self) -> ChildrenState {
        self.state
    }

    pub fn is_fetched(&self) -> bool {
        self.state == ChildrenState::Fetched
    }

    pub(super) fn push_child(&mut self, child: NodeId) {
        self.children.push(child);
    }

    pub(super) fn take_children(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.children)
    }

    pub(super) fn set_state(&mut self, state: ChildrenState) {
        self.state = state;
    }
}

// Identity is the payload's identity; position in the tree does not matter.
impl<T: PartialEq> PartialEq for Node<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}
