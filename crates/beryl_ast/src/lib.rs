//! beryl_ast: The syntax-tree representation shared by every backend.
//!
//! The node set is the closed set of tagged records the bridge protocol
//! declares; both the in-process parser and the tree loader produce it.

pub mod node;
pub mod types;

pub use node::{Node, NodeKind};
pub use types::{ParseFlags, ScopeId};
