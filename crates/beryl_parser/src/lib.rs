//! beryl_parser: Parser backends and process-wide backend selection.
//!
//! Two backends implement the same [`ParserBackend`] contract: an
//! in-process recursive-descent parser that resolves scopes while it
//! parses, and an adapter that round-trips through the external-parser
//! bridge and resolves the root scope after decode. Exactly one backend
//! is active per process.

mod backend;
mod lexer;
mod native;
mod parser;
mod selector;

pub use backend::{ParseError, ParseRequest, ParseResult, ParserBackend, RootScope};
pub use lexer::{Lexer, Token, TokenKind};
pub use native::NativeBackend;
pub use parser::InProcessBackend;
pub use selector::{BackendChoice, ParserSelector};
