//! beryl_scope: Lexical scopes, depth/slot resolution, and parse-time
//! scope bookkeeping.
//!
//! Scopes for one parse live in a [`ScopeArena`] and reference each other
//! by index, so the enclosing-scope back-links carry no lifetime
//! machinery. Resolution translates identifier occurrences into packed
//! `(depth << 16) | slot` addresses.

mod resolver;
mod scope;
mod session;

pub use resolver::{pack_address, unpack_address, AssignTarget, ScopeError};
pub use scope::{dummy_scope, DummyScope, ModuleBinding, ScopeArena, ScopeKind, ScopeNode};
pub use session::{BitSet, BitStack, ParseSession};
