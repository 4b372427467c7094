//! Backend adapter over the external-parser bridge.
//!
//! Unlike the in-process parser, scope resolution here happens once
//! after decode: the result carries the decoded top-level name list and
//! materializes its root scope on first request.

use crate::backend::{ParseError, ParseRequest, ParseResult, ParserBackend, RootScope};
use beryl_ast::types::ParseFlags;
use beryl_bridge::{BridgeRequest, EnclosingScope, NativeParser, ParserBridge};
use beryl_core::arena::CompilerArena;
use beryl_core::intern::StringInterner;
use beryl_diagnostics::DiagnosticCollection;
use beryl_scope::ScopeArena;

/// A backend that parses by round-tripping through a [`NativeParser`].
pub struct NativeBackend<N: NativeParser> {
    bridge: ParserBridge<N>,
}

impl<N: NativeParser> NativeBackend<N> {
    pub fn new(native: N) -> Self {
        Self {
            bridge: ParserBridge::new(native),
        }
    }
}

impl<N: NativeParser> ParserBackend for NativeBackend<N> {
    fn parse<'a>(
        &self,
        arena: &'a CompilerArena,
        interner: &StringInterner,
        scopes: &mut ScopeArena,
        request: &ParseRequest<'_>,
    ) -> Result<ParseResult<'a>, ParseError> {
        let mut bridge_request = BridgeRequest::new(request.source, request.file, request.metadata)
            .with_line_offset(request.line_offset);
        if let Some(scope) = request.enclosing {
            bridge_request = bridge_request.with_enclosing(EnclosingScope {
                arena: scopes,
                scope,
            });
        }
        let tree = self.bridge.parse(arena, interner, bridge_request)?;
        Ok(ParseResult {
            root: tree.root,
            scope: RootScope::Pending {
                names: tree.top_locals,
                enclosing: request.enclosing,
                eval: request.flags.contains(ParseFlags::EVAL),
                main: request.flags.contains(ParseFlags::MAIN),
            },
            diagnostics: DiagnosticCollection::new(),
            encoding: tree.encoding,
        })
    }
}
