//! The parse entry point over an external parser.
//!
//! A bridge owns one [`NativeParser`] implementation and runs the full
//! request cycle: fold any enclosing-scope context into the metadata
//! blob, hand source and metadata to the parser, copy the serialized
//! buffer out, and decode it into arena-allocated nodes. The bridge
//! holds no parse state of its own, so one instance serves concurrent
//! parses.

use crate::buffer::{copy_out, NativeParser};
use crate::error::BridgeError;
use crate::evalchain::encode_eval_chain;
use crate::loader::{LoadedTree, TreeLoader};
use beryl_ast::types::ScopeId;
use beryl_core::arena::CompilerArena;
use beryl_core::intern::StringInterner;
use beryl_scope::ScopeArena;

/// The scope an eval fragment is being parsed against.
#[derive(Clone, Copy)]
pub struct EnclosingScope<'s> {
    pub arena: &'s ScopeArena,
    pub scope: ScopeId,
}

/// One parse request: source bytes, the file they came from, caller
/// metadata, and optionally the enclosing scope of an eval fragment.
pub struct BridgeRequest<'s> {
    pub source: &'s [u8],
    /// File name the parser attributes errors and diagnostics to.
    pub file: &'s str,
    /// Added to every line the parser reports.
    pub line_offset: u32,
    pub metadata: &'s [u8],
    pub enclosing: Option<EnclosingScope<'s>>,
}

impl<'s> BridgeRequest<'s> {
    pub fn new(source: &'s [u8], file: &'s str, metadata: &'s [u8]) -> Self {
        Self {
            source,
            file,
            line_offset: 0,
            metadata,
            enclosing: None,
        }
    }

    pub fn with_line_offset(mut self, offset: u32) -> Self {
        self.line_offset = offset;
        self
    }

    pub fn with_enclosing(mut self, enclosing: EnclosingScope<'s>) -> Self {
        self.enclosing = Some(enclosing);
        self
    }
}

/// Drives one external parser through the serialize/copy/decode cycle.
pub struct ParserBridge<N: NativeParser> {
    native: N,
}

impl<N: NativeParser> ParserBridge<N> {
    pub fn new(native: N) -> Self {
        Self { native }
    }

    pub fn native(&self) -> &N {
        &self.native
    }

    /// Parse one source unit through the external parser.
    ///
    /// The metadata handed to the parser is the caller's blob followed by
    /// a u32-length-prefixed eval-chain encoding (length zero when the
    /// request has no enclosing scope).
    pub fn parse<'a>(
        &self,
        arena: &'a CompilerArena,
        interner: &StringInterner,
        request: BridgeRequest<'_>,
    ) -> Result<LoadedTree<'a>, BridgeError> {
        let metadata = self.fold_metadata(interner, &request)?;
        let buffer =
            self.native
                .serialize(request.source, request.file, request.line_offset, &metadata)?;
        let bytes = copy_out(buffer)?;
        TreeLoader::new(arena, interner).load(&bytes)
    }

    fn fold_metadata(
        &self,
        interner: &StringInterner,
        request: &BridgeRequest<'_>,
    ) -> Result<Vec<u8>, BridgeError> {
        let mut metadata = request.metadata.to_vec();
        match request.enclosing {
            Some(enclosing) => {
                let chain = encode_eval_chain(enclosing.arena, interner, enclosing.scope)?;
                metadata.extend_from_slice(&(chain.len() as u32).to_le_bytes());
                metadata.extend_from_slice(&chain);
            }
            None => metadata.extend_from_slice(&0u32.to_le_bytes()),
        }
        Ok(metadata)
    }
}
