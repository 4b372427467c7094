//! beryl_bridge: The request/response protocol to an external parser.
//!
//! An external (native or out-of-process) parser turns source bytes into
//! a serialized syntax tree. This crate owns that boundary: the buffer
//! ownership contract, the binary eval-chain encoding that hands lexical
//! context across it, and the loader that decodes the serialized tree
//! back into arena-allocated nodes.

mod bridge;
mod buffer;
mod error;
mod evalchain;
mod loader;
pub mod wire;

pub use bridge::{BridgeRequest, EnclosingScope, ParserBridge};
pub use buffer::{copy_out, HeapBuffer, NativeParser, ParserBuffer};
pub use error::BridgeError;
pub use evalchain::{decode_eval_chain, encode_eval_chain};
pub use loader::{LoadedTree, TreeLoader};
