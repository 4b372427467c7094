//! Tokenizer for the in-process front end.

use crate::backend::ParseError;
use beryl_diagnostics::{format_message, messages};

/// The closed set of token kinds the grammar consumes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Int,
    Str,
    Assign,
    Dot,
    Comma,
    Pipe,
    LParen,
    RParen,
    LBrace,
    RBrace,
    /// Statement terminator: newline or `;`.
    Terminator,
    Eof,
}

/// One scanned token.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// Identifier name or literal text; empty for punctuation.
    pub text: String,
    /// 1-based source line (with the request's line offset applied).
    pub line: u32,
}

impl Token {
    fn new(kind: TokenKind, line: u32) -> Self {
        Self {
            kind,
            text: String::new(),
            line,
        }
    }

    fn with_text(mut self, text: String) -> Self {
        self.text = text;
        self
    }
}

/// Converts source text into the token stream the parser consumes.
pub struct Lexer<'s> {
    text: Vec<char>,
    pos: usize,
    line: u32,
    file: &'s str,
}

impl<'s> Lexer<'s> {
    pub fn new(source: &str, file: &'s str, line_offset: u32) -> Self {
        Self {
            text: source.chars().collect(),
            pos: 0,
            line: line_offset + 1,
            file,
        }
    }

    /// Scan the entire source. The final token is always `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.scan()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.text.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.pos += 1;
                }
                '#' => {
                    // Comment runs to end of line; the newline itself
                    // still produces a terminator token.
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.pos += 1;
                    }
                }
                _ => return,
            }
        }
    }

    fn scan(&mut self) -> Result<Token, ParseError> {
        self.skip_trivia();
        let line = self.line;
        let Some(c) = self.bump() else {
            return Ok(Token::new(TokenKind::Eof, line));
        };
        match c {
            '\n' => {
                self.line += 1;
                Ok(Token::new(TokenKind::Terminator, line))
            }
            ';' => Ok(Token::new(TokenKind::Terminator, line)),
            '=' => Ok(Token::new(TokenKind::Assign, line)),
            '.' => Ok(Token::new(TokenKind::Dot, line)),
            ',' => Ok(Token::new(TokenKind::Comma, line)),
            '|' => Ok(Token::new(TokenKind::Pipe, line)),
            '(' => Ok(Token::new(TokenKind::LParen, line)),
            ')' => Ok(Token::new(TokenKind::RParen, line)),
            '{' => Ok(Token::new(TokenKind::LBrace, line)),
            '}' => Ok(Token::new(TokenKind::RBrace, line)),
            '"' => self.scan_string(line),
            c if c.is_ascii_digit() => Ok(self.scan_number(c, line)),
            c if is_ident_start(c) => Ok(self.scan_ident(c, line)),
            other => Err(ParseError::syntax(
                format_message(messages::UNEXPECTED_TOKEN.message, &[&other.to_string()]),
                self.file,
                line,
            )),
        }
    }

    fn scan_string(&mut self, line: u32) -> Result<Token, ParseError> {
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(Token::new(TokenKind::Str, line).with_text(value)),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(c @ ('"' | '\\')) => value.push(c),
                    Some(other) => {
                        return Err(ParseError::syntax(
                            format!("unknown escape '\\{}'", other),
                            self.file,
                            line,
                        ))
                    }
                    None => break,
                },
                Some('\n') | None => break,
                Some(c) => value.push(c),
            }
        }
        Err(ParseError::syntax(
            messages::UNTERMINATED_STRING.message,
            self.file,
            line,
        ))
    }

    fn scan_number(&mut self, first: char, line: u32) -> Token {
        let mut text = String::from(first);
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            // Lexer guarantees the char exists; bump cannot fail here.
            text.push(self.text[self.pos]);
            self.pos += 1;
        }
        Token::new(TokenKind::Int, line).with_text(text)
    }

    fn scan_ident(&mut self, first: char, line: u32) -> Token {
        let mut text = String::from(first);
        while self.peek().is_some_and(is_ident_continue) {
            text.push(self.text[self.pos]);
            self.pos += 1;
        }
        Token::new(TokenKind::Ident, line).with_text(text)
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source, "t.rb", 0)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_assignment_tokens() {
        assert_eq!(
            kinds("x = 42"),
            vec![
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Int,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_lines_and_terminators() {
        let tokens = Lexer::new("a\nb # trailing\nc", "t.rb", 0).tokenize().unwrap();
        let lines: Vec<_> = tokens.iter().map(|t| (t.kind, t.line)).collect();
        assert_eq!(
            lines,
            vec![
                (TokenKind::Ident, 1),
                (TokenKind::Terminator, 1),
                (TokenKind::Ident, 2),
                (TokenKind::Terminator, 2),
                (TokenKind::Ident, 3),
                (TokenKind::Eof, 3),
            ]
        );
    }

    #[test]
    fn test_line_offset_applies() {
        let tokens = Lexer::new("x", "t.rb", 10).tokenize().unwrap();
        assert_eq!(tokens[0].line, 11);
    }

    #[test]
    fn test_string_escapes() {
        let tokens = Lexer::new(r#""a\n\"b\"""#, "t.rb", 0).tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(tokens[0].text, "a\n\"b\"");
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new("\"open", "t.rb", 0).tokenize().unwrap_err();
        match err {
            ParseError::Syntax { message, line, .. } => {
                assert_eq!(message, "unterminated string literal");
                assert_eq!(line, 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unexpected_character() {
        let err = Lexer::new("x = @", "t.rb", 0).tokenize().unwrap_err();
        match err {
            ParseError::Syntax { message, .. } => {
                assert_eq!(message, "unexpected token '@'")
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
