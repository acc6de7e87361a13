//! Statement parsing implementation
//!
//! This module handles parsing of all statement types:
//!
//! - Simple statements: assignments, expression statements, `pass`, `return`,
//!   `del`, `global`, `nonlocal`, `assert`, `raise`, imports
//! - Compound statements: `if/elif/else`, `while`, `for`, `def`, `class`,
//!   `try/except/else/finally`
//! - Suites: an indented block, or simple statements after the header colon
//!
//! # Grammar
//!
//! ```text
//! statement  ::= compound_stmt | simple_stmt (';' simple_stmt)* [';'] NEWLINE
//! suite      ::= simple_stmt_list NEWLINE | NEWLINE INDENT statement+ DEDENT
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};
use std::rc::Rc;

impl Parser {
    /// Parse one logical statement.
    ///
    /// Returns several statements when simple statements share a line via `;`.
    pub(crate) fn parse_statement(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let loc = self.current_location();

        let kind = match self.peek().kind {
            TokenKind::If => {
                self.advance();
                self.parse_if_statement()?
            }
            TokenKind::While => {
                self.advance();
                self.parse_while_statement()?
            }
            TokenKind::For => {
                self.advance();
                self.parse_for_statement()?
            }
            TokenKind::Def => {
                self.advance();
                StmtKind::FunctionDef(Rc::new(self.parse_function_def(loc)?))
            }
            TokenKind::Class => {
                self.advance();
                self.parse_class_def(loc)?
            }
            TokenKind::Try => {
                self.advance();
                self.parse_try_statement()?
            }
            _ => return self.parse_simple_statements(),
        };

        Ok(vec![Stmt {
            kind,
            location: loc,
            end_line: self.last_significant_line(),
        }])
    }

    /// Parse the body of a compound statement (after its colon)
    pub(crate) fn parse_suite(&mut self) -> Result<Vec<Stmt>, ParseError> {
        if !self.match_token(&TokenKind::Newline) {
            return self.parse_simple_statements();
        }

        self.skip_newlines();
        self.expect_token(&TokenKind::Indent, "Expected an indented block")?;

        let mut body = Vec::new();
        while !self.check(&TokenKind::Dedent) && !self.is_at_end() {
            body.extend(self.parse_statement()?);
            self.skip_newlines();
        }
        self.match_token(&TokenKind::Dedent);

        Ok(body)
    }

    /// `simple_stmt (';' simple_stmt)* [';'] NEWLINE`
    fn parse_simple_statements(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();

        loop {
            let loc = self.current_location();
            let kind = self.parse_simple_statement()?;
            statements.push(Stmt {
                kind,
                location: loc,
                end_line: self.last_significant_line(),
            });

            if !self.match_token(&TokenKind::Semicolon) {
                break;
            }
            if self.check(&TokenKind::Newline) || self.is_at_end() {
                break;
            }
        }

        if !self.is_at_end() {
            self.expect_token(&TokenKind::Newline, "Expected end of line")?;
        }

        Ok(statements)
    }

    fn parse_simple_statement(&mut self) -> Result<StmtKind, ParseError> {
        match self.peek().kind {
            TokenKind::Pass => {
                self.advance();
                Ok(StmtKind::Pass)
            }
            TokenKind::Break => {
                self.advance();
                Ok(StmtKind::Break)
            }
            TokenKind::Continue => {
                self.advance();
                Ok(StmtKind::Continue)
            }
            TokenKind::Return => {
                self.advance();
                if self.at_statement_end() {
                    Ok(StmtKind::Return(None))
                } else {
                    Ok(StmtKind::Return(Some(self.parse_expression_list()?)))
                }
            }
            TokenKind::Del => {
                self.advance();
                let mut targets = vec![self.parse_bitor()?];
                while self.match_token(&TokenKind::Comma) {
                    if self.at_statement_end() {
                        break;
                    }
                    targets.push(self.parse_bitor()?);
                }
                Ok(StmtKind::Delete(targets))
            }
            TokenKind::Global => {
                self.advance();
                Ok(StmtKind::Global(self.parse_name_list()?))
            }
            TokenKind::Nonlocal => {
                self.advance();
                Ok(StmtKind::Nonlocal(self.parse_name_list()?))
            }
            TokenKind::Assert => {
                self.advance();
                let test = self.parse_expression()?;
                let message = if self.match_token(&TokenKind::Comma) {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                Ok(StmtKind::Assert { test, message })
            }
            TokenKind::Raise => {
                self.advance();
                if self.at_statement_end() {
                    return Ok(StmtKind::Raise(None));
                }
                let exc = self.parse_expression()?;
                // `raise X from Y` keeps X; chaining is not modelled
                if self.match_token(&TokenKind::From) {
                    self.parse_expression()?;
                }
                Ok(StmtKind::Raise(Some(exc)))
            }
            TokenKind::Import => {
                self.advance();
                let mut names = vec![self.parse_import_alias(true)?];
                while self.match_token(&TokenKind::Comma) {
                    names.push(self.parse_import_alias(true)?);
                }
                Ok(StmtKind::Import(names))
            }
            TokenKind::From => {
                self.advance();
                self.parse_from_import()
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_expression_statement(&mut self) -> Result<StmtKind, ParseError> {
        let loc = self.current_location();
        let first = self.parse_expression_list()?;

        // Annotated assignment: `x: int = 5`
        if self.check(&TokenKind::Colon) {
            if !matches!(first, Expr::Name(_) | Expr::Attribute { .. } | Expr::Subscript { .. }) {
                return Err(self.error_here("illegal target for annotation"));
            }
            self.advance();
            self.parse_expression()?;
            if self.match_token(&TokenKind::Eq) {
                let value = self.parse_expression_list()?;
                return Ok(StmtKind::Assign {
                    targets: vec![first],
                    value,
                });
            }
            return Ok(StmtKind::Pass);
        }

        if let Some(op) = self.augmented_operator() {
            self.advance();
            if !matches!(first, Expr::Name(_) | Expr::Attribute { .. } | Expr::Subscript { .. }) {
                return Err(ParseError {
                    message: "illegal expression for augmented assignment".to_string(),
                    location: loc,
                });
            }
            let value = self.parse_expression_list()?;
            return Ok(StmtKind::AugAssign {
                target: first,
                op,
                value,
            });
        }

        if !self.check(&TokenKind::Eq) {
            return Ok(StmtKind::Expr(first));
        }

        // Chained assignment: every expression but the last is a target
        let mut exprs = vec![first];
        while self.match_token(&TokenKind::Eq) {
            exprs.push(self.parse_expression_list()?);
        }
        let value = exprs.pop().ok_or_else(|| self.error_here("Expected expression"))?;
        for target in &exprs {
            if !target.is_assign_target() {
                return Err(ParseError {
                    message: "cannot assign to expression".to_string(),
                    location: loc,
                });
            }
        }

        Ok(StmtKind::Assign {
            targets: exprs,
            value,
        })
    }

    fn augmented_operator(&self) -> Option<BinOp> {
        let op = match self.peek().kind {
            TokenKind::PlusEq => BinOp::Add,
            TokenKind::MinusEq => BinOp::Sub,
            TokenKind::StarEq => BinOp::Mul,
            TokenKind::SlashEq => BinOp::Div,
            TokenKind::DoubleSlashEq => BinOp::FloorDiv,
            TokenKind::PercentEq => BinOp::Mod,
            TokenKind::DoubleStarEq => BinOp::Pow,
            TokenKind::AmpEq => BinOp::BitAnd,
            TokenKind::PipeEq => BinOp::BitOr,
            TokenKind::CaretEq => BinOp::BitXor,
            TokenKind::LtLtEq => BinOp::Shl,
            TokenKind::GtGtEq => BinOp::Shr,
            _ => return None,
        };
        Some(op)
    }

    pub(crate) fn at_statement_end(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof
        )
    }

    fn parse_name_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut names = vec![self.expect_identifier()?];
        while self.match_token(&TokenKind::Comma) {
            names.push(self.expect_identifier()?);
        }
        Ok(names)
    }

    fn parse_dotted_name(&mut self) -> Result<String, ParseError> {
        let mut name = self.expect_identifier()?;
        while self.match_token(&TokenKind::Dot) {
            name.push('.');
            name.push_str(&self.expect_identifier()?);
        }
        Ok(name)
    }

    fn parse_import_alias(&mut self, dotted: bool) -> Result<ImportAlias, ParseError> {
        let name = if dotted {
            self.parse_dotted_name()?
        } else {
            self.expect_identifier()?
        };
        let alias = if self.match_token(&TokenKind::As) {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        Ok(ImportAlias { name, alias })
    }

    fn parse_from_import(&mut self) -> Result<StmtKind, ParseError> {
        let module = self.parse_dotted_name()?;
        self.expect_token(&TokenKind::Import, "Expected 'import' after module name")?;

        if self.match_token(&TokenKind::Star) {
            return Ok(StmtKind::ImportFrom {
                module,
                names: vec![ImportAlias {
                    name: "*".to_string(),
                    alias: None,
                }],
            });
        }

        let parenthesized = self.match_token(&TokenKind::LParen);
        let mut names = vec![self.parse_import_alias(false)?];
        while self.match_token(&TokenKind::Comma) {
            if parenthesized && self.check(&TokenKind::RParen) {
                break;
            }
            names.push(self.parse_import_alias(false)?);
        }
        if parenthesized {
            self.expect_rparen("after imported names")?;
        }

        Ok(StmtKind::ImportFrom { module, names })
    }

    /// Parse `if` / `elif` chains; an `elif` becomes a nested `If` in `orelse`
    fn parse_if_statement(&mut self) -> Result<StmtKind, ParseError> {
        let test = self.parse_expression()?;
        self.expect_colon("after if condition")?;
        let body = self.parse_suite()?;

        let orelse = if self.check(&TokenKind::Elif) {
            let elif_loc = self.current_location();
            self.advance();
            let kind = self.parse_if_statement()?;
            vec![Stmt {
                kind,
                location: elif_loc,
                end_line: self.last_significant_line(),
            }]
        } else if self.match_token(&TokenKind::Else) {
            self.expect_colon("after 'else'")?;
            self.parse_suite()?
        } else {
            Vec::new()
        };

        Ok(StmtKind::If { test, body, orelse })
    }

    fn parse_while_statement(&mut self) -> Result<StmtKind, ParseError> {
        let test = self.parse_expression()?;
        self.expect_colon("after while condition")?;
        let body = self.parse_suite()?;
        let orelse = self.parse_optional_else()?;
        Ok(StmtKind::While { test, body, orelse })
    }

    fn parse_for_statement(&mut self) -> Result<StmtKind, ParseError> {
        let target = self.parse_target_list()?;
        self.expect_token(&TokenKind::In, "Expected 'in' in for statement")?;
        let iter = self.parse_expression_list()?;
        self.expect_colon("after for clause")?;
        let body = self.parse_suite()?;
        let orelse = self.parse_optional_else()?;
        Ok(StmtKind::For {
            target,
            iter,
            body,
            orelse,
        })
    }

    fn parse_optional_else(&mut self) -> Result<Vec<Stmt>, ParseError> {
        if self.match_token(&TokenKind::Else) {
            self.expect_colon("after 'else'")?;
            self.parse_suite()
        } else {
            Ok(Vec::new())
        }
    }

    /// Parse `def name(params) [-> annotation]: suite`
    fn parse_function_def(&mut self, loc: SourceLocation) -> Result<FunctionDef, ParseError> {
        let name = self.expect_identifier()?;
        self.expect_token(&TokenKind::LParen, "Expected '(' after function name")?;
        let (params, vararg, kwarg) = self.parse_parameters(&TokenKind::RParen, true)?;
        self.expect_rparen("after parameters")?;

        if self.match_token(&TokenKind::Arrow) {
            self.parse_expression()?;
        }
        self.expect_colon("after function signature")?;
        let body = self.parse_suite()?;

        Ok(FunctionDef {
            name,
            params,
            vararg,
            kwarg,
            body,
            location: loc,
        })
    }

    /// Parameter list shared by `def` and `lambda`
    pub(crate) fn parse_parameters(
        &mut self,
        closing: &TokenKind,
        allow_annotations: bool,
    ) -> Result<(Vec<Param>, Option<String>, Option<String>), ParseError> {
        let mut params: Vec<Param> = Vec::new();
        let mut vararg = None;
        let mut kwarg = None;

        while !self.check(closing) {
            if self.match_token(&TokenKind::DoubleStar) {
                kwarg = Some(self.expect_identifier()?);
            } else if self.match_token(&TokenKind::Star) {
                // A bare `*` only separates keyword-only parameters
                if let TokenKind::Ident(_) = self.peek().kind {
                    vararg = Some(self.expect_identifier()?);
                }
            } else {
                let loc = self.current_location();
                let name = self.expect_identifier()?;
                if allow_annotations && self.match_token(&TokenKind::Colon) {
                    self.parse_expression()?;
                }
                let default = if self.match_token(&TokenKind::Eq) {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                if default.is_none()
                    && params.iter().any(|p| p.default.is_some())
                    && vararg.is_none()
                {
                    return Err(ParseError {
                        message: "non-default argument follows default argument".to_string(),
                        location: loc,
                    });
                }
                if params.iter().any(|p| p.name == name) {
                    return Err(ParseError {
                        message: format!("duplicate argument '{}' in function definition", name),
                        location: loc,
                    });
                }
                params.push(Param { name, default });
            }

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        Ok((params, vararg, kwarg))
    }

    fn parse_class_def(&mut self, loc: SourceLocation) -> Result<StmtKind, ParseError> {
        let name = self.expect_identifier()?;
        let mut bases = Vec::new();
        if self.match_token(&TokenKind::LParen) {
            while !self.check(&TokenKind::RParen) {
                bases.push(self.parse_expression()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect_rparen("after base classes")?;
        }
        self.expect_colon("after class name")?;
        let body = self.parse_suite()?;

        Ok(StmtKind::ClassDef(Rc::new(ClassDef {
            name,
            bases,
            body,
            location: loc,
        })))
    }

    fn parse_try_statement(&mut self) -> Result<StmtKind, ParseError> {
        self.expect_colon("after 'try'")?;
        let body = self.parse_suite()?;

        let mut handlers = Vec::new();
        while self.check(&TokenKind::Except) {
            let location = self.current_location();
            self.advance();
            let (class, binding) = if self.check(&TokenKind::Colon) {
                (None, None)
            } else {
                let class = self.parse_expression()?;
                let binding = if self.match_token(&TokenKind::As) {
                    Some(self.expect_identifier()?)
                } else {
                    None
                };
                (Some(class), binding)
            };
            self.expect_colon("after except clause")?;
            let body = self.parse_suite()?;
            handlers.push(ExceptHandler {
                class,
                binding,
                body,
                location,
            });
        }

        let orelse = if !handlers.is_empty() {
            self.parse_optional_else()?
        } else {
            Vec::new()
        };

        let finalbody = if self.match_token(&TokenKind::Finally) {
            self.expect_colon("after 'finally'")?;
            self.parse_suite()?
        } else {
            Vec::new()
        };

        if handlers.is_empty() && finalbody.is_empty() {
            return Err(self.error_here("Expected 'except' or 'finally' block"));
        }

        Ok(StmtKind::Try {
            body,
            handlers,
            orelse,
            finalbody,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::Parser;

    fn parse(source: &str) -> Program {
        Parser::new(source)
            .and_then(|mut p| p.parse_program())
            .expect("parse failed")
    }

    #[test]
    fn test_elif_becomes_nested_if_with_own_line() {
        let program = parse("if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n");
        let StmtKind::If { orelse, .. } = &program.body[0].kind else {
            panic!("Expected if statement");
        };
        assert_eq!(orelse.len(), 1);
        assert_eq!(orelse[0].line(), 3);
        let StmtKind::If { orelse: inner, .. } = &orelse[0].kind else {
            panic!("Expected nested if for elif");
        };
        assert_eq!(inner[0].line(), 6);
        assert_eq!(program.body[0].end_line, 6);
    }

    #[test]
    fn test_chained_and_tuple_assignment() {
        let program = parse("a = b = 1\nx, y = y, x\n");
        match &program.body[0].kind {
            StmtKind::Assign { targets, .. } => assert_eq!(targets.len(), 2),
            _ => panic!("Expected assignment"),
        }
        match &program.body[1].kind {
            StmtKind::Assign { targets, value } => {
                assert!(matches!(targets[0], Expr::Tuple(_)));
                assert!(matches!(value, Expr::Tuple(_)));
            }
            _ => panic!("Expected assignment"),
        }
    }

    #[test]
    fn test_augmented_assignment() {
        let program = parse("count += 2\n");
        assert!(matches!(
            program.body[0].kind,
            StmtKind::AugAssign { op: BinOp::Add, .. }
        ));
    }

    #[test]
    fn test_try_except_else_finally() {
        let source = "try:\n    x = 1\nexcept ValueError as e:\n    x = 2\nexcept:\n    pass\nelse:\n    x = 3\nfinally:\n    x = 4\n";
        let program = parse(source);
        match &program.body[0].kind {
            StmtKind::Try {
                handlers,
                orelse,
                finalbody,
                ..
            } => {
                assert_eq!(handlers.len(), 2);
                assert_eq!(handlers[0].binding.as_deref(), Some("e"));
                assert!(handlers[1].class.is_none());
                assert_eq!(orelse.len(), 1);
                assert_eq!(finalbody.len(), 1);
            }
            _ => panic!("Expected try statement"),
        }
    }

    #[test]
    fn test_imports() {
        let program = parse("import math as m\nfrom math import sqrt, pi\n");
        assert!(matches!(program.body[0].kind, StmtKind::Import(_)));
        match &program.body[1].kind {
            StmtKind::ImportFrom { module, names } => {
                assert_eq!(module, "math");
                assert_eq!(names.len(), 2);
            }
            _ => panic!("Expected from-import"),
        }
    }

    #[test]
    fn test_one_line_suite() {
        let program = parse("for i in range(3): total = i\nwhile False: pass\n");
        assert_eq!(program.body.len(), 2);
        match &program.body[0].kind {
            StmtKind::For { body, .. } => assert_eq!(body.len(), 1),
            _ => panic!("Expected for loop"),
        }
    }

    #[test]
    fn test_type_hints_are_accepted() {
        let program = parse("def f(n: int = 3) -> bool:\n    return n > 1\nx: int = 4\n");
        assert_eq!(program.body.len(), 2);
        assert!(matches!(program.body[1].kind, StmtKind::Assign { .. }));
    }

    #[test]
    fn test_assign_to_literal_is_rejected() {
        assert!(Parser::new("1 = x\n")
            .and_then(|mut p| p.parse_program())
            .is_err());
    }
}
