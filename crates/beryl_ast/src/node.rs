//! Arena-allocated syntax-tree nodes.
//!
//! Nodes borrow the `CompilerArena` of the parse that produced them and
//! are freed all at once when that arena is dropped. Scope structure is
//! carried separately (in the scope arena); nodes reference scopes by id.

use crate::types::ScopeId;
use beryl_core::intern::InternedString;

/// One syntax-tree node: a tagged record plus its source line.
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    pub kind: NodeKind<'a>,
    /// 1-based source line.
    pub line: u32,
}

impl<'a> Node<'a> {
    pub fn new(kind: NodeKind<'a>, line: u32) -> Self {
        Self { kind, line }
    }
}

/// The closed set of node records the bridge protocol declares.
///
/// Local variable references carry a packed `(depth << 16) | slot`
/// address assigned during scope resolution.
#[derive(Debug, Clone, Copy)]
pub enum NodeKind<'a> {
    /// Tree root. Top-level locals are recorded on the parse result's
    /// root scope; the body is the statement list.
    Program { body: &'a [&'a Node<'a>] },
    /// `name = value` against an already-resolved storage location.
    LocalAssign {
        name: InternedString,
        address: u32,
        value: &'a Node<'a>,
    },
    /// A read of a local variable by packed address.
    LocalRead { name: InternedString, address: u32 },
    /// An integer literal.
    Integer { value: i64 },
    /// A string literal.
    Str { value: InternedString },
    /// A method call. `receiver` is absent for bare calls.
    Call {
        receiver: Option<&'a Node<'a>>,
        name: InternedString,
        args: &'a [&'a Node<'a>],
    },
    /// A block literal `{ |params| body }` introducing a block scope.
    /// `scope` is `ScopeId::INVALID` until the consumer binds one (the
    /// in-process parser binds it immediately; the tree loader cannot).
    Block {
        scope: ScopeId,
        params: &'a [InternedString],
        body: &'a [&'a Node<'a>],
    },
    /// The `nil` literal.
    Nil,
}

impl<'a> NodeKind<'a> {
    /// Short tag name, used in debug output and tests.
    pub fn tag_name(&self) -> &'static str {
        match self {
            NodeKind::Program { .. } => "program",
            NodeKind::LocalAssign { .. } => "local-assign",
            NodeKind::LocalRead { .. } => "local-read",
            NodeKind::Integer { .. } => "integer",
            NodeKind::Str { .. } => "str",
            NodeKind::Call { .. } => "call",
            NodeKind::Block { .. } => "block",
            NodeKind::Nil => "nil",
        }
    }
}
