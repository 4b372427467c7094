//! The in-process recursive-descent backend.
//!
//! Scope resolution runs incrementally while parsing: assignments
//! declare into the scope being built, reads resolve to depth/slot
//! addresses on the spot, and block literals open Block scopes with
//! their own parse sessions. Diagnostics (unused-variable warnings)
//! accumulate on the result; they never abort a parse.

use crate::backend::{ParseError, ParseRequest, ParseResult, ParserBackend, RootScope};
use crate::lexer::{Lexer, Token, TokenKind};
use beryl_ast::node::{Node, NodeKind};
use beryl_ast::types::{ParseFlags, ScopeId};
use beryl_core::arena::CompilerArena;
use beryl_core::intern::{Encoding, InternedString, StringInterner};
use beryl_diagnostics::{format_message, messages, DiagnosticCollection};
use beryl_scope::{
    pack_address, AssignTarget, BitStack, ModuleBinding, ParseSession, ScopeArena,
};

/// The in-process parser backend. Stateless; per-parse state lives in
/// [`Parser`].
#[derive(Debug, Default)]
pub struct InProcessBackend;

impl InProcessBackend {
    pub fn new() -> Self {
        InProcessBackend
    }
}

impl ParserBackend for InProcessBackend {
    fn parse<'a>(
        &self,
        arena: &'a CompilerArena,
        interner: &StringInterner,
        scopes: &mut ScopeArena,
        request: &ParseRequest<'_>,
    ) -> Result<ParseResult<'a>, ParseError> {
        let source = std::str::from_utf8(request.source)
            .map_err(|_| ParseError::syntax("source is not valid UTF-8", request.file, 1))?;
        let tokens = Lexer::new(source, request.file, request.line_offset).tokenize()?;
        Parser::new(arena, interner, scopes, tokens, request).run()
    }
}

struct Parser<'a, 'i, 's, 'r> {
    arena: &'a CompilerArena,
    interner: &'i StringInterner,
    scopes: &'s mut ScopeArena,
    tokens: Vec<Token>,
    pos: usize,
    file: &'r str,
    flags: ParseFlags,
    /// The scope statements currently parse into.
    scope: ScopeId,
    /// Innermost parse session; `Some` for the whole parse.
    session: Option<Box<ParseSession>>,
    /// Lexer-level nesting state captured by sessions when a block opens.
    command_args: BitStack,
    cond_args: BitStack,
    diagnostics: DiagnosticCollection,
}

impl<'a, 'i, 's, 'r> Parser<'a, 'i, 's, 'r> {
    fn new(
        arena: &'a CompilerArena,
        interner: &'i StringInterner,
        scopes: &'s mut ScopeArena,
        tokens: Vec<Token>,
        request: &ParseRequest<'r>,
    ) -> Self {
        let eval = request.flags.contains(ParseFlags::EVAL) && request.enclosing.is_some();
        let scope = match (eval, request.enclosing) {
            (true, Some(outer)) => scopes.new_eval(outer, &[]),
            (_, enclosing) => scopes.new_local(enclosing, &[]),
        };
        // An eval root layered on an enclosing scope keeps that scope's
        // module binding; only a Local root takes the bootstrap binding.
        if request.flags.contains(ParseFlags::MAIN) && !eval {
            scopes.bind_module(scope, ModuleBinding::Root);
        }
        let session = if eval {
            ParseSession::open_eval(None)
        } else {
            ParseSession::open_root()
        };
        Self {
            arena,
            interner,
            scopes,
            tokens,
            pos: 0,
            file: request.file,
            flags: request.flags,
            scope,
            session: Some(session),
            command_args: BitStack::new(),
            cond_args: BitStack::new(),
            diagnostics: DiagnosticCollection::new(),
        }
    }

    fn run(mut self) -> Result<ParseResult<'a>, ParseError> {
        let line = self.peek().line;
        let body = self.parse_statements(TokenKind::Eof)?;
        self.expect(TokenKind::Eof)?;
        self.close_session();

        let root = self.alloc(NodeKind::Program { body }, line);
        let mut diagnostics = self.diagnostics;
        diagnostics.sort();
        Ok(ParseResult {
            root,
            scope: RootScope::Ready(self.scope),
            diagnostics,
            encoding: Encoding::Utf8,
        })
    }

    // ------------------------------------------------------------------
    // Token plumbing
    // ------------------------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind_at(&self, lookahead: usize) -> TokenKind {
        self.tokens
            .get(self.pos + lookahead)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.at(kind) {
            return Ok(self.advance());
        }
        let token = self.peek();
        Err(self.unexpected(token))
    }

    fn unexpected(&self, token: &Token) -> ParseError {
        let shown = match token.kind {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Terminator => "end of line".to_string(),
            _ if token.text.is_empty() => format!("{:?}", token.kind),
            _ => token.text.clone(),
        };
        ParseError::syntax(
            format_message(messages::UNEXPECTED_TOKEN.message, &[&shown]),
            self.file,
            token.line,
        )
    }

    fn skip_terminators(&mut self) {
        while self.at(TokenKind::Terminator) {
            self.advance();
        }
    }

    fn alloc(&self, kind: NodeKind<'a>, line: u32) -> &'a Node<'a> {
        self.arena.alloc(Node::new(kind, line))
    }

    // ------------------------------------------------------------------
    // Session stack
    // ------------------------------------------------------------------

    fn session_mut(&mut self) -> &mut ParseSession {
        // Invariant: the session stack is non-empty for the whole parse.
        self.session.as_deref_mut().expect("parse session missing")
    }

    fn open_session(&mut self) {
        let parent = self.session.take().expect("parse session missing");
        self.session = Some(ParseSession::open(parent, self.command_args, self.cond_args));
    }

    fn close_session(&mut self) {
        let session = self.session.take().expect("parse session missing");
        if self.flags.contains(ParseFlags::VERBOSE_WARNINGS) {
            session.warn_unused(self.interner, self.file, &mut self.diagnostics);
        }
        self.session = session.close();
    }

    // ------------------------------------------------------------------
    // Grammar
    // ------------------------------------------------------------------

    /// Parse statements up to (not consuming) `end`.
    fn parse_statements(&mut self, end: TokenKind) -> Result<&'a [&'a Node<'a>], ParseError> {
        let mut body = Vec::new();
        self.skip_terminators();
        while !self.at(end) && !self.at(TokenKind::Eof) {
            body.push(self.parse_expression()?);
            if !self.at(end) && !self.at(TokenKind::Eof) {
                self.expect(TokenKind::Terminator)?;
                self.skip_terminators();
            }
        }
        Ok(self.arena.alloc_slice_copy(&body))
    }

    fn parse_expression(&mut self) -> Result<&'a Node<'a>, ParseError> {
        if self.at(TokenKind::Ident) && self.peek_kind_at(1) == TokenKind::Assign {
            return self.parse_assignment();
        }
        let mut node = self.parse_primary()?;
        while self.at(TokenKind::Dot) {
            self.advance();
            let name_token = self.expect(TokenKind::Ident)?;
            let name = self.interner.intern(&name_token.text);
            node = self.parse_call_tail(Some(node), name, name_token.line)?;
        }
        Ok(node)
    }

    /// `name = expr`. Resolves to an existing slot anywhere in the chain;
    /// a miss declares the name in the scope being parsed.
    fn parse_assignment(&mut self) -> Result<&'a Node<'a>, ParseError> {
        let name_token = self.advance();
        let name = self.interner.intern(&name_token.text);
        let line = name_token.line;
        self.expect(TokenKind::Assign)?;
        let value = self.parse_expression()?;

        let (depth, slot) = match self.scopes.assign(self.scope, name, 0) {
            AssignTarget::Found { depth, slot } => {
                // Reassignment counts as a use of the original binding.
                self.session_mut().mark_used(name, depth);
                (depth, slot)
            }
            AssignTarget::Unresolved { .. } => {
                let slot = self.scopes.declare_local(self.scope, name);
                self.session_mut().add_defined(name, line);
                (0, slot)
            }
        };
        let address = pack_address(depth, slot, self.file, line)?;
        Ok(self.alloc(
            NodeKind::LocalAssign {
                name,
                address,
                value,
            },
            line,
        ))
    }

    fn parse_primary(&mut self) -> Result<&'a Node<'a>, ParseError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Int => {
                self.advance();
                let value = token.text.parse::<i64>().map_err(|_| {
                    ParseError::syntax("integer literal out of range", self.file, token.line)
                })?;
                Ok(self.alloc(NodeKind::Integer { value }, token.line))
            }
            TokenKind::Str => {
                self.advance();
                let value = self.interner.intern(&token.text);
                Ok(self.alloc(NodeKind::Str { value }, token.line))
            }
            TokenKind::Ident if token.text == "nil" => {
                self.advance();
                Ok(self.alloc(NodeKind::Nil, token.line))
            }
            TokenKind::Ident => {
                self.advance();
                let name = self.interner.intern(&token.text);
                // A declared name without call syntax is a local read;
                // everything else is a bare method call.
                let call_syntax = self.at(TokenKind::LParen) || self.at(TokenKind::LBrace);
                if !call_syntax && self.scopes.is_defined(self.scope, name) {
                    let (depth, slot) = self.scopes.resolve_required(
                        self.scope,
                        name,
                        self.interner,
                        self.file,
                        token.line,
                    )?;
                    self.session_mut().mark_used(name, depth);
                    let address = pack_address(depth, slot, self.file, token.line)?;
                    return Ok(self.alloc(NodeKind::LocalRead { name, address }, token.line));
                }
                self.parse_call_tail(None, name, token.line)
            }
            _ => Err(self.unexpected(&token)),
        }
    }

    /// Arguments and an optional trailing block literal for a call whose
    /// name has already been consumed.
    fn parse_call_tail(
        &mut self,
        receiver: Option<&'a Node<'a>>,
        name: InternedString,
        line: u32,
    ) -> Result<&'a Node<'a>, ParseError> {
        let mut args = Vec::new();
        if self.at(TokenKind::LParen) {
            self.advance();
            self.command_args.push(true);
            if !self.at(TokenKind::RParen) {
                loop {
                    args.push(self.parse_expression()?);
                    if self.at(TokenKind::Comma) {
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RParen)?;
            self.command_args.pop();
        }
        if self.at(TokenKind::LBrace) {
            args.push(self.parse_block()?);
        }
        Ok(self.alloc(
            NodeKind::Call {
                receiver,
                name,
                args: self.arena.alloc_slice_copy(&args),
            },
            line,
        ))
    }

    /// `{ |params| statements }`. Opens a Block scope and a nested
    /// session for the duration of the body.
    fn parse_block(&mut self) -> Result<&'a Node<'a>, ParseError> {
        let open = self.expect(TokenKind::LBrace)?;

        let mut params = Vec::new();
        if self.at(TokenKind::Pipe) {
            self.advance();
            while self.at(TokenKind::Ident) {
                let token = self.advance();
                params.push(self.interner.intern(&token.text));
                if self.at(TokenKind::Comma) {
                    self.advance();
                }
            }
            self.expect(TokenKind::Pipe)?;
        }

        let block_scope = self.scopes.new_block(self.scope, &params);
        if !params.is_empty() {
            self.scopes.set_argument_scope(block_scope, true);
        }
        let saved_scope = self.scope;
        self.scope = block_scope;
        self.open_session();

        let body = self.parse_statements(TokenKind::RBrace)?;
        if !self.at(TokenKind::RBrace) {
            return Err(ParseError::syntax(
                messages::UNTERMINATED_BLOCK.message,
                self.file,
                open.line,
            ));
        }
        self.advance();

        self.close_session();
        self.scope = saved_scope;
        Ok(self.alloc(
            NodeKind::Block {
                scope: block_scope,
                params: self.arena.alloc_slice_copy(&params),
                body,
            },
            open.line,
        ))
    }
}
