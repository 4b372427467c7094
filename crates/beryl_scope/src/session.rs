//! Per-scope parse-time bookkeeping.
//!
//! One [`ParseSession`] exists per scope while that scope's construct is
//! being parsed; sessions chain innermost-outward and are destroyed as
//! each construct closes. Nothing in here survives into the scope tree.

use beryl_core::collections::OrderedMap;
use beryl_core::intern::{InternedString, StringInterner};
use beryl_diagnostics::{messages, DiagnosticCollection};
use rustc_hash::FxHashSet;

/// A stack of bits packed into a word, one bit per nesting level.
///
/// Used to remember command-call and conditional nesting across grammar
/// productions; this layer only pushes, pops, and peeks.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct BitStack(u64);

impl BitStack {
    pub fn new() -> Self {
        BitStack(0)
    }

    /// Rebuild from a raw snapshot (e.g. a lexer state captured when a
    /// block construct opens).
    pub fn from_raw(raw: u64) -> Self {
        BitStack(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn push(&mut self, bit: bool) {
        self.0 = (self.0 << 1) | u64::from(bit);
    }

    pub fn pop(&mut self) -> bool {
        let bit = self.0 & 1 == 1;
        self.0 >>= 1;
        bit
    }

    pub fn peek(self) -> bool {
        self.0 & 1 == 1
    }
}

/// A growable bitset indexed by capture-group ordinal.
#[derive(Debug, Clone, Default)]
pub struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    pub fn new() -> Self {
        Self { words: Vec::new() }
    }

    pub fn set(&mut self, index: usize) {
        let word = index / 64;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1 << (index % 64);
    }

    pub fn get(&self, index: usize) -> bool {
        self.words
            .get(index / 64)
            .map_or(false, |w| w & (1 << (index % 64)) != 0)
    }

    pub fn any_set(&self) -> bool {
        self.words.iter().any(|&w| w != 0)
    }
}

/// Parse-time state for one scope.
///
/// Tracks defined and used variables for the unused-variable warning,
/// implicit regex capture locals, and the nesting bit-stacks captured
/// from the lexer when a nested construct opens.
#[derive(Debug, Default)]
pub struct ParseSession {
    parent: Option<Box<ParseSession>>,
    /// True for eval sessions: used-variable tracking stops here even
    /// when an enclosing session exists. Kept distinct from the
    /// missing-parent condition on purpose.
    boundary: bool,
    pub command_args: BitStack,
    pub cond_args: BitStack,
    pub named_captures: BitSet,
    defined_variables: OrderedMap<InternedString, u32>,
    used_variables: FxHashSet<InternedString>,
}

impl ParseSession {
    /// Open the session for an outermost (method/program) scope.
    pub fn open_root() -> Box<ParseSession> {
        Box::new(ParseSession::default())
    }

    /// Open the session for an eval scope. Eval sessions are tracking
    /// boundaries whether or not an enclosing session exists.
    pub fn open_eval(parent: Option<Box<ParseSession>>) -> Box<ParseSession> {
        Box::new(ParseSession {
            parent,
            boundary: true,
            ..ParseSession::default()
        })
    }

    /// Open a nested session, capturing the lexer's nesting stacks.
    pub fn open(
        parent: Box<ParseSession>,
        command_args: BitStack,
        cond_args: BitStack,
    ) -> Box<ParseSession> {
        Box::new(ParseSession {
            parent: Some(parent),
            boundary: false,
            command_args,
            cond_args,
            ..ParseSession::default()
        })
    }

    /// Close this session, handing back its parent (if any).
    pub fn close(self: Box<ParseSession>) -> Option<Box<ParseSession>> {
        self.parent
    }

    pub fn is_boundary(&self) -> bool {
        self.boundary
    }

    /// Record a declaration and its first-seen line. The first line wins
    /// so re-assignment does not move the diagnostic.
    pub fn add_defined(&mut self, name: InternedString, line: u32) {
        if !self.defined_variables.contains_key(&name) {
            self.defined_variables.insert(name, line);
        }
    }

    /// Record a read of `name` declared `depth` scopes out.
    ///
    /// Reads at depth > 0 are delegated to the enclosing session at
    /// depth-1. Delegation stops on either of two distinct conditions:
    /// the session is an eval boundary, or there is no enclosing session.
    pub fn mark_used(&mut self, name: InternedString, depth: u32) {
        if depth == 0 {
            self.used_variables.insert(name);
            return;
        }
        if self.boundary {
            return;
        }
        if let Some(parent) = self.parent.as_deref_mut() {
            parent.mark_used(name, depth - 1);
        }
    }

    pub fn is_used(&self, name: InternedString) -> bool {
        self.used_variables.contains(&name)
    }

    /// Emit one warning per defined-but-never-used variable, in
    /// declaration order. Names starting with `_` are considered
    /// intentionally unused and skipped.
    pub fn warn_unused(
        &self,
        interner: &StringInterner,
        file: &str,
        diagnostics: &mut DiagnosticCollection,
    ) {
        for (&name, &line) in self.defined_variables.iter() {
            if self.used_variables.contains(&name) {
                continue;
            }
            let text = interner.resolve(name);
            if text.starts_with('_') {
                continue;
            }
            diagnostics.warn(&messages::UNUSED_LOCAL_VARIABLE, file, line, &[text]);
        }
    }
}
