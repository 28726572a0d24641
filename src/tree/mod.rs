//! Generic n-ary tree used as the backing store of the directory cache.
//!
//! Nodes live in an arena and are addressed through generational [`NodeId`]
//! handles, so a handle to a discarded subtree can never alias a node that
//! was inserted later into the same slot.

mod node;
mod tree;

pub use node::{ChildrenState, Node, NodeId};
pub use tree::{TraversalOrder, Tree};
