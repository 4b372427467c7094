//! beryl_core: Shared infrastructure for the front end.
//!
//! Interning, encodings, arena allocation, and the small collection
//! types the scope and bridge layers are built on.

pub mod arena;
pub mod collections;
pub mod intern;

pub use arena::CompilerArena;
pub use collections::OrderedMap;
pub use intern::{Encoding, InternedString, StringInterner};
