//! The backend contract: what every parser implementation accepts and
//! produces, independent of whether it runs in-process or behind the
//! bridge.

use beryl_ast::node::Node;
use beryl_ast::types::{ParseFlags, ScopeId};
use beryl_bridge::BridgeError;
use beryl_core::arena::CompilerArena;
use beryl_core::intern::{Encoding, InternedString, StringInterner};
use beryl_diagnostics::DiagnosticCollection;
use beryl_scope::{ModuleBinding, ScopeArena, ScopeError};
use thiserror::Error;

/// Failures a parse can surface. All abort only the current parse.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The source text does not conform to the grammar.
    #[error("{file}:{line}: {message}")]
    Syntax {
        message: String,
        file: String,
        line: u32,
    },
    /// Scope resolution failed (address overflow, builder bug).
    #[error(transparent)]
    Scope(#[from] ScopeError),
    /// The external-parser boundary failed.
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl ParseError {
    pub fn syntax(message: impl Into<String>, file: &str, line: u32) -> Self {
        ParseError::Syntax {
            message: message.into(),
            file: file.to_string(),
            line,
        }
    }
}

/// One parse request.
pub struct ParseRequest<'r> {
    pub source: &'r [u8],
    /// File name, for diagnostics and errors.
    pub file: &'r str,
    /// Added to every reported line (inline/eval fragments embedded
    /// partway into a host file).
    pub line_offset: u32,
    /// The scope an eval fragment is layered on, in the caller's arena.
    pub enclosing: Option<ScopeId>,
    pub flags: ParseFlags,
    /// Opaque blob handed through to a bridge-backed parser.
    pub metadata: &'r [u8],
}

impl<'r> ParseRequest<'r> {
    pub fn new(source: &'r [u8], file: &'r str) -> Self {
        Self {
            source,
            file,
            line_offset: 0,
            enclosing: None,
            flags: ParseFlags::NONE,
            metadata: b"",
        }
    }

    pub fn with_flags(mut self, flags: ParseFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_enclosing(mut self, scope: ScopeId) -> Self {
        self.enclosing = Some(scope);
        self
    }

    pub fn with_line_offset(mut self, offset: u32) -> Self {
        self.line_offset = offset;
        self
    }

    pub fn with_metadata(mut self, metadata: &'r [u8]) -> Self {
        self.metadata = metadata;
        self
    }
}

/// The root scope of a parse result.
///
/// The in-process parser builds its root scope up front; a bridge-backed
/// parse only carries the top-level name list until a consumer asks,
/// then materializes the scope exactly once.
#[derive(Debug)]
pub enum RootScope {
    Ready(ScopeId),
    Pending {
        names: Vec<InternedString>,
        enclosing: Option<ScopeId>,
        eval: bool,
        main: bool,
    },
}

/// The outcome of one successful parse.
pub struct ParseResult<'a> {
    pub root: &'a Node<'a>,
    pub scope: RootScope,
    pub diagnostics: DiagnosticCollection,
    pub encoding: Encoding,
}

impl<'a> ParseResult<'a> {
    /// The root scope, materializing it into `scopes` on first call.
    pub fn root_scope(&mut self, scopes: &mut ScopeArena) -> ScopeId {
        match self.scope {
            RootScope::Ready(id) => id,
            RootScope::Pending {
                ref names,
                enclosing,
                eval,
                main,
            } => {
                let id = match (eval, enclosing) {
                    (true, Some(outer)) => scopes.new_eval(outer, names),
                    _ => {
                        let id = scopes.new_local(enclosing, names);
                        // Only Local roots take the bootstrap binding; an
                        // eval root inherits its enclosing scope's.
                        if main {
                            scopes.bind_module(id, ModuleBinding::Root);
                        }
                        id
                    }
                };
                self.scope = RootScope::Ready(id);
                id
            }
        }
    }
}

/// A parser implementation. Exactly one is active per process; the
/// caller owns the node arena and the scope arena the parse works in.
pub trait ParserBackend {
    fn parse<'a>(
        &self,
        arena: &'a CompilerArena,
        interner: &StringInterner,
        scopes: &mut ScopeArena,
        request: &ParseRequest<'_>,
    ) -> Result<ParseResult<'a>, ParseError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_root_scope_materializes_once() {
        let interner = StringInterner::new();
        let arena = CompilerArena::new();
        let root = arena.alloc(Node::new(beryl_ast::node::NodeKind::Nil, 1));
        let mut result = ParseResult {
            root,
            scope: RootScope::Pending {
                names: vec![interner.intern("a"), interner.intern("b")],
                enclosing: None,
                eval: false,
                main: true,
            },
            diagnostics: DiagnosticCollection::new(),
            encoding: Encoding::Utf8,
        };

        let mut scopes = ScopeArena::new();
        let first = result.root_scope(&mut scopes);
        let second = result.root_scope(&mut scopes);
        assert_eq!(first, second, "scope must be cached after materialization");
        assert_eq!(scopes.len(), 1);

        let node = scopes.get(first);
        assert_eq!(node.var_count(), 2);
        assert_eq!(node.exists(interner.intern("b")), Some(1));
        assert_eq!(node.bound_module(), Some(ModuleBinding::Root));
    }

    #[test]
    fn test_pending_eval_root_scope_layers_on_enclosing() {
        let interner = StringInterner::new();
        let arena = CompilerArena::new();
        let root = arena.alloc(Node::new(beryl_ast::node::NodeKind::Nil, 1));

        let mut scopes = ScopeArena::new();
        let outer = scopes.new_local(None, &[interner.intern("z")]);

        let mut result = ParseResult {
            root,
            scope: RootScope::Pending {
                names: vec![interner.intern("fresh")],
                enclosing: Some(outer),
                eval: true,
                main: false,
            },
            diagnostics: DiagnosticCollection::new(),
            encoding: Encoding::Utf8,
        };
        let eval = result.root_scope(&mut scopes);
        assert!(scopes.get(eval).is_block_like());
        assert_eq!(scopes.get(eval).enclosing(), Some(outer));
        // The eval scope is its own local scope
        assert_eq!(scopes.local_scope(eval), eval);
    }

    #[test]
    fn test_pending_eval_root_takes_no_module_binding() {
        let arena = CompilerArena::new();
        let root = arena.alloc(Node::new(beryl_ast::node::NodeKind::Nil, 1));

        let mut scopes = ScopeArena::new();
        let outer = scopes.new_local(None, &[]);

        let mut result = ParseResult {
            root,
            scope: RootScope::Pending {
                names: Vec::new(),
                enclosing: Some(outer),
                eval: true,
                main: true,
            },
            diagnostics: DiagnosticCollection::new(),
            encoding: Encoding::Utf8,
        };
        let eval = result.root_scope(&mut scopes);
        assert_eq!(scopes.get(eval).bound_module(), None);
    }
}
