//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including error types, helper methods, and the main parse entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, and coordination
//! - `statements`: Parsing simple and compound statements, blocks and suites
//! - `expressions`: Parsing expressions with one method per precedence level
//!
//! # Implementation
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state.

use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer, Token, TokenKind};
use thiserror::Error;

/// Parser error type
#[derive(Debug, Clone, Error)]
#[error("Parse error at line {}, column {}: {message}", location.line, location.column)]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            location: err.location,
        }
    }
}

/// Recursive descent parser for the scripting subset
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Parse the entire program (a sequence of top-level statements)
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::new();

        self.skip_newlines();
        while !self.is_at_end() {
            if self.check(&TokenKind::Indent) {
                return Err(self.error_here("unexpected indent"));
            }
            let statements = self.parse_statement()?;
            program.body.extend(statements);
            self.skip_newlines();
        }

        Ok(program)
    }

    /// Parse a single expression that must make up the whole input.
    ///
    /// A trailing `:` is accepted so that the remainder of a compound
    /// statement header (`x > 0:`) parses as its condition.
    pub fn parse_standalone_expression(source: &str) -> Result<Expr, ParseError> {
        let mut parser = Parser::new(source.trim())?;
        let expr = parser.parse_expression()?;
        parser.match_token(&TokenKind::Colon);
        parser.skip_newlines();
        if !parser.is_at_end() {
            return Err(parser.error_here(&format!("unexpected {}", parser.peek().kind)));
        }
        Ok(expr)
    }

    // ===== Helper methods =====

    pub(crate) fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Compare by variant only; payloads of literals and identifiers are ignored
    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    pub(crate) fn check_ahead(&self, n: usize, kind: &TokenKind) -> bool {
        self.tokens
            .get(self.position + n)
            .is_some_and(|t| std::mem::discriminant(&t.kind) == std::mem::discriminant(kind))
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    pub(crate) fn peek(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.position.min(last)]
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek().location
    }

    /// End line of the last token consumed, ignoring layout tokens
    pub(crate) fn last_significant_line(&self) -> usize {
        self.tokens[..self.position]
            .iter()
            .rev()
            .find(|t| {
                !matches!(
                    t.kind,
                    TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent
                )
            })
            .map(|t| t.end_line)
            .unwrap_or(1)
    }

    pub(crate) fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    pub(crate) fn error_here(&self, message: &str) -> ParseError {
        ParseError {
            message: message.to_string(),
            location: self.current_location(),
        }
    }

    pub(crate) fn expect_token(
        &mut self,
        kind: &TokenKind,
        message: &str,
    ) -> Result<(), ParseError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError {
                message: format!("{}, found {}", message, self.peek().kind),
                location: self.current_location(),
            })
        }
    }

    pub(crate) fn expect_colon(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(&TokenKind::Colon, &format!("Expected ':' {ctx}"))
    }

    pub(crate) fn expect_rparen(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(&TokenKind::RParen, &format!("Expected ')' {ctx}"))
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<String, ParseError> {
        if let TokenKind::Ident(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(ParseError {
                message: format!("Expected identifier, found {}", self.peek().kind),
                location: self.current_location(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        Parser::new(source)
            .and_then(|mut p| p.parse_program())
            .expect("parse failed")
    }

    #[test]
    fn test_parse_simple_function() {
        let program = parse("def main(a, b=2, *rest):\n    return a + b\n");

        assert_eq!(program.body.len(), 1);
        match &program.body[0].kind {
            StmtKind::FunctionDef(def) => {
                assert_eq!(def.name, "main");
                assert_eq!(def.params.len(), 2);
                assert!(def.params[1].default.is_some());
                assert_eq!(def.vararg.as_deref(), Some("rest"));
                assert_eq!(def.body.len(), 1);
            }
            _ => panic!("Expected function definition"),
        }
        assert_eq!(program.body[0].line(), 1);
        assert_eq!(program.body[0].end_line, 2);
    }

    #[test]
    fn test_parse_class_with_base() {
        let program = parse("class Node(Base):\n    def __init__(self, v):\n        self.v = v\n");

        match &program.body[0].kind {
            StmtKind::ClassDef(class) => {
                assert_eq!(class.name, "Node");
                assert_eq!(class.bases.len(), 1);
                assert_eq!(class.body.len(), 1);
            }
            _ => panic!("Expected class definition"),
        }
        assert_eq!(program.body[0].end_line, 3);
    }

    #[test]
    fn test_semicolons_split_statements_on_one_line() {
        let program = parse("a = 1; b = 2\n");
        assert_eq!(program.body.len(), 2);
        assert_eq!(program.body[0].line(), 1);
        assert_eq!(program.body[1].line(), 1);
    }

    #[test]
    fn test_standalone_expression_accepts_trailing_colon() {
        let expr = Parser::parse_standalone_expression("x > 0 and y:").expect("parse failed");
        assert!(matches!(expr, Expr::BoolOp { op: BoolOp::And, .. }));
    }

    #[test]
    fn test_standalone_expression_rejects_trailing_tokens() {
        assert!(Parser::parse_standalone_expression("x = 1").is_err());
    }

    #[test]
    fn test_unexpected_indent_is_error() {
        assert!(Parser::new("x = 1\n    y = 2\n")
            .and_then(|mut p| p.parse_program())
            .is_err());
    }
}
