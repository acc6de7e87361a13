//! Expression parsing implementation
//!
//! One method per precedence level, lowest binding first:
//!
//! | Level | Operators |
//! |-------|-----------|
//! | 1 | `lambda` |
//! | 2 | `a if c else b` |
//! | 3 | `or` |
//! | 4 | `and` |
//! | 5 | `not` |
//! | 6 | comparisons, `in`, `not in`, `is`, `is not` (chained) |
//! | 7 | `\|` |
//! | 8 | `^` |
//! | 9 | `&` |
//! | 10 | `<<` `>>` |
//! | 11 | `+` `-` |
//! | 12 | `*` `/` `//` `%` |
//! | 13 | unary `-` `+` `~` |
//! | 14 | `**` (right-associative, binds tighter than a unary on its left) |
//! | 15 | calls, subscripts, attribute access |
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};
use std::rc::Rc;

impl Parser {
    /// Parse an expression (without bare tuples)
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        if self.check(&TokenKind::Lambda) {
            return self.parse_lambda();
        }

        let expr = self.parse_or()?;
        if self.match_token(&TokenKind::If) {
            let test = self.parse_or()?;
            self.expect_token(&TokenKind::Else, "Expected 'else' in conditional expression")?;
            let orelse = self.parse_expression()?;
            return Ok(Expr::IfExp {
                test: Box::new(test),
                body: Box::new(expr),
                orelse: Box::new(orelse),
            });
        }
        Ok(expr)
    }

    /// Parse `expr, expr, ...`; more than one element (or a trailing comma) makes a tuple
    pub(crate) fn parse_expression_list(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_expression()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }

        let mut items = vec![first];
        while self.match_token(&TokenKind::Comma) {
            if self.at_expression_list_end() {
                break;
            }
            items.push(self.parse_expression()?);
        }
        Ok(Expr::Tuple(items))
    }

    /// Targets of `for` loops and comprehensions stop before `in`
    pub(crate) fn parse_target_list(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        let first = self.parse_bitor()?;
        let target = if self.check(&TokenKind::Comma) {
            let mut items = vec![first];
            while self.match_token(&TokenKind::Comma) {
                if self.check(&TokenKind::In) {
                    break;
                }
                items.push(self.parse_bitor()?);
            }
            Expr::Tuple(items)
        } else {
            first
        };

        if !target.is_assign_target() {
            return Err(ParseError {
                message: "cannot assign to expression".to_string(),
                location: loc,
            });
        }
        Ok(target)
    }

    fn at_expression_list_end(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Newline
                | TokenKind::Semicolon
                | TokenKind::Eof
                | TokenKind::Eq
                | TokenKind::Colon
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
        ) || self.augmented_assignment_ahead()
    }

    fn augmented_assignment_ahead(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::PlusEq
                | TokenKind::MinusEq
                | TokenKind::StarEq
                | TokenKind::SlashEq
                | TokenKind::DoubleSlashEq
                | TokenKind::PercentEq
                | TokenKind::DoubleStarEq
                | TokenKind::AmpEq
                | TokenKind::PipeEq
                | TokenKind::CaretEq
                | TokenKind::LtLtEq
                | TokenKind::GtGtEq
        )
    }

    fn parse_lambda(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        self.advance();
        let (params, vararg, kwarg) = self.parse_parameters(&TokenKind::Colon, false)?;
        self.expect_colon("in lambda")?;
        let body = self.parse_expression()?;
        let end_line = self.last_significant_line();

        Ok(Expr::Lambda(Rc::new(FunctionDef {
            name: "<lambda>".to_string(),
            params,
            vararg,
            kwarg,
            body: vec![Stmt {
                kind: StmtKind::Return(Some(body)),
                location: loc,
                end_line,
            }],
            location: loc,
        })))
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.match_token(&TokenKind::Or) {
            let right = self.parse_and()?;
            left = Expr::BoolOp {
                op: BoolOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;
        while self.match_token(&TokenKind::And) {
            let right = self.parse_not()?;
            left = Expr::BoolOp {
                op: BoolOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.match_token(&TokenKind::Not) {
            let operand = self.parse_not()?;
            return Ok(Expr::Unary {
                op: UnOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_bitor()?;
        let mut comparisons = Vec::new();

        loop {
            let op = match self.peek().kind {
                TokenKind::EqEq => CmpOp::Eq,
                TokenKind::NotEq => CmpOp::Ne,
                TokenKind::Lt => CmpOp::Lt,
                TokenKind::Le => CmpOp::Le,
                TokenKind::Gt => CmpOp::Gt,
                TokenKind::Ge => CmpOp::Ge,
                TokenKind::In => CmpOp::In,
                TokenKind::Not if self.check_ahead(1, &TokenKind::In) => {
                    self.advance();
                    CmpOp::NotIn
                }
                TokenKind::Is if self.check_ahead(1, &TokenKind::Not) => {
                    self.advance();
                    CmpOp::IsNot
                }
                TokenKind::Is => CmpOp::Is,
                _ => break,
            };
            self.advance();
            comparisons.push((op, self.parse_bitor()?));
        }

        if comparisons.is_empty() {
            Ok(left)
        } else {
            Ok(Expr::Compare {
                left: Box::new(left),
                comparisons,
            })
        }
    }

    pub(crate) fn parse_bitor(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bitxor()?;
        while self.match_token(&TokenKind::Pipe) {
            let right = self.parse_bitxor()?;
            left = binary(BinOp::BitOr, left, right);
        }
        Ok(left)
    }

    fn parse_bitxor(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bitand()?;
        while self.match_token(&TokenKind::Caret) {
            let right = self.parse_bitand()?;
            left = binary(BinOp::BitXor, left, right);
        }
        Ok(left)
    }

    fn parse_bitand(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_shift()?;
        while self.match_token(&TokenKind::Amp) {
            let right = self.parse_shift()?;
            left = binary(BinOp::BitAnd, left, right);
        }
        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_arith()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::LtLt => BinOp::Shl,
                TokenKind::GtGt => BinOp::Shr,
                _ => break,
            };
            self.advance();
            let right = self.parse_arith()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_arith(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::DoubleSlash => BinOp::FloorDiv,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek().kind {
            TokenKind::Minus => UnOp::Neg,
            TokenKind::Plus => UnOp::Pos,
            TokenKind::Tilde => UnOp::Invert,
            _ => return self.parse_power(),
        };
        self.advance();
        let operand = self.parse_factor()?;

        // Fold negative literals so `-5` is a constant
        Ok(match (op, operand) {
            (UnOp::Neg, Expr::Int(n)) => Expr::Int(-n),
            (UnOp::Neg, Expr::Float(x)) => Expr::Float(-x),
            (op, operand) => Expr::Unary {
                op,
                operand: Box::new(operand),
            },
        })
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_primary()?;
        if self.match_token(&TokenKind::DoubleStar) {
            let exponent = self.parse_factor()?;
            return Ok(binary(BinOp::Pow, base, exponent));
        }
        Ok(base)
    }

    /// Atom followed by any number of `.name`, `(args)` and `[index]` trailers
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_atom()?;

        loop {
            if self.match_token(&TokenKind::Dot) {
                let name = self.expect_identifier()?;
                expr = Expr::Attribute {
                    object: Box::new(expr),
                    name,
                };
            } else if self.match_token(&TokenKind::LParen) {
                let args = self.parse_call_arguments()?;
                expr = Expr::Call {
                    func: Box::new(expr),
                    args,
                };
            } else if self.match_token(&TokenKind::LBracket) {
                let index = self.parse_subscript()?;
                self.expect_token(&TokenKind::RBracket, "Expected ']' after subscript")?;
                expr = Expr::Subscript {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn parse_call_arguments(&mut self) -> Result<Vec<Argument>, ParseError> {
        let mut args = Vec::new();

        while !self.check(&TokenKind::RParen) {
            if self.match_token(&TokenKind::Star) {
                args.push(Argument::Star(self.parse_expression()?));
            } else if self.check(&TokenKind::DoubleStar) {
                return Err(self.error_here("keyword argument unpacking is not supported"));
            } else if matches!(self.peek().kind, TokenKind::Ident(_))
                && self.check_ahead(1, &TokenKind::Eq)
            {
                let name = self.expect_identifier()?;
                self.advance();
                args.push(Argument::Keyword(name, self.parse_expression()?));
            } else {
                let value = self.parse_expression()?;
                if self.check(&TokenKind::For) {
                    // A bare generator argument is evaluated eagerly as a list
                    let generators = self.parse_comprehension_clauses()?;
                    args.push(Argument::Positional(Expr::ListComp {
                        element: Box::new(value),
                        generators,
                    }));
                } else {
                    args.push(Argument::Positional(value));
                }
            }

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        self.expect_rparen("after arguments")?;
        Ok(args)
    }

    fn parse_subscript(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_slice_item()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.match_token(&TokenKind::Comma) {
            if self.check(&TokenKind::RBracket) {
                break;
            }
            items.push(self.parse_slice_item()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn parse_slice_item(&mut self) -> Result<Expr, ParseError> {
        let lower = if self.check(&TokenKind::Colon) {
            None
        } else {
            Some(self.parse_expression()?)
        };

        if !self.match_token(&TokenKind::Colon) {
            return lower.ok_or_else(|| self.error_here("Expected subscript"));
        }

        let upper = self.parse_optional_slice_bound()?;
        let step = if self.match_token(&TokenKind::Colon) {
            self.parse_optional_slice_bound()?
        } else {
            None
        };

        Ok(Expr::Slice {
            lower: lower.map(Box::new),
            upper,
            step,
        })
    }

    fn parse_optional_slice_bound(&mut self) -> Result<Option<Box<Expr>>, ParseError> {
        if matches!(
            self.peek().kind,
            TokenKind::Colon | TokenKind::RBracket | TokenKind::Comma
        ) {
            Ok(None)
        } else {
            Ok(Some(Box::new(self.parse_expression()?)))
        }
    }

    fn parse_comprehension_clauses(&mut self) -> Result<Vec<Comprehension>, ParseError> {
        let mut generators = Vec::new();
        while self.match_token(&TokenKind::For) {
            let target = self.parse_target_list()?;
            self.expect_token(&TokenKind::In, "Expected 'in' in comprehension")?;
            let iter = self.parse_or()?;
            let mut conditions = Vec::new();
            while self.match_token(&TokenKind::If) {
                conditions.push(self.parse_or()?);
            }
            generators.push(Comprehension {
                target,
                iter,
                conditions,
            });
        }
        Ok(generators)
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let token = self.peek().clone();

        match token.kind {
            TokenKind::Int(n) => {
                self.advance();
                Ok(Expr::Int(n))
            }
            TokenKind::Float(x) => {
                self.advance();
                Ok(Expr::Float(x))
            }
            TokenKind::Str(_) | TokenKind::FString(_) => self.parse_string_literals(),
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            TokenKind::None => {
                self.advance();
                Ok(Expr::None)
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::Name(name))
            }
            TokenKind::LParen => {
                self.advance();
                self.parse_parenthesized()
            }
            TokenKind::LBracket => {
                self.advance();
                self.parse_list_display()
            }
            TokenKind::LBrace => {
                self.advance();
                self.parse_brace_display()
            }
            other => Err(ParseError {
                message: format!("invalid syntax: unexpected {}", other),
                location: token.location,
            }),
        }
    }

    fn parse_parenthesized(&mut self) -> Result<Expr, ParseError> {
        if self.match_token(&TokenKind::RParen) {
            return Ok(Expr::Tuple(Vec::new()));
        }

        let first = self.parse_expression()?;
        if self.check(&TokenKind::For) {
            let generators = self.parse_comprehension_clauses()?;
            self.expect_rparen("after generator expression")?;
            return Ok(Expr::ListComp {
                element: Box::new(first),
                generators,
            });
        }

        if !self.check(&TokenKind::Comma) {
            self.expect_rparen("after expression")?;
            return Ok(first);
        }

        let mut items = vec![first];
        while self.match_token(&TokenKind::Comma) {
            if self.check(&TokenKind::RParen) {
                break;
            }
            items.push(self.parse_expression()?);
        }
        self.expect_rparen("after tuple")?;
        Ok(Expr::Tuple(items))
    }

    fn parse_list_display(&mut self) -> Result<Expr, ParseError> {
        if self.match_token(&TokenKind::RBracket) {
            return Ok(Expr::List(Vec::new()));
        }

        let first = self.parse_expression()?;
        if self.check(&TokenKind::For) {
            let generators = self.parse_comprehension_clauses()?;
            self.expect_token(&TokenKind::RBracket, "Expected ']' after list comprehension")?;
            return Ok(Expr::ListComp {
                element: Box::new(first),
                generators,
            });
        }

        let mut items = vec![first];
        while self.match_token(&TokenKind::Comma) {
            if self.check(&TokenKind::RBracket) {
                break;
            }
            items.push(self.parse_expression()?);
        }
        self.expect_token(&TokenKind::RBracket, "Expected ']' after list")?;
        Ok(Expr::List(items))
    }

    fn parse_brace_display(&mut self) -> Result<Expr, ParseError> {
        if self.match_token(&TokenKind::RBrace) {
            return Ok(Expr::Dict(Vec::new()));
        }

        let first = self.parse_expression()?;

        if self.match_token(&TokenKind::Colon) {
            let value = self.parse_expression()?;
            if self.check(&TokenKind::For) {
                let generators = self.parse_comprehension_clauses()?;
                self.expect_token(&TokenKind::RBrace, "Expected '}' after dict comprehension")?;
                return Ok(Expr::DictComp {
                    key: Box::new(first),
                    value: Box::new(value),
                    generators,
                });
            }

            let mut pairs = vec![(first, value)];
            while self.match_token(&TokenKind::Comma) {
                if self.check(&TokenKind::RBrace) {
                    break;
                }
                let key = self.parse_expression()?;
                self.expect_colon("in dict literal")?;
                pairs.push((key, self.parse_expression()?));
            }
            self.expect_token(&TokenKind::RBrace, "Expected '}' after dict")?;
            return Ok(Expr::Dict(pairs));
        }

        if self.check(&TokenKind::For) {
            let generators = self.parse_comprehension_clauses()?;
            self.expect_token(&TokenKind::RBrace, "Expected '}' after set comprehension")?;
            return Ok(Expr::SetComp {
                element: Box::new(first),
                generators,
            });
        }

        let mut items = vec![first];
        while self.match_token(&TokenKind::Comma) {
            if self.check(&TokenKind::RBrace) {
                break;
            }
            items.push(self.parse_expression()?);
        }
        self.expect_token(&TokenKind::RBrace, "Expected '}' after set")?;
        Ok(Expr::Set(items))
    }

    /// Adjacent string literals concatenate; any f-string makes the result an f-string
    fn parse_string_literals(&mut self) -> Result<Expr, ParseError> {
        let mut parts: Vec<FStringPart> = Vec::new();
        let mut formatted = false;

        loop {
            let token = self.peek().clone();
            match token.kind {
                TokenKind::Str(s) => {
                    self.advance();
                    push_literal(&mut parts, &s);
                }
                TokenKind::FString(raw) => {
                    self.advance();
                    formatted = true;
                    for part in parse_fstring(&raw, token.location)? {
                        match part {
                            FStringPart::Literal(s) => push_literal(&mut parts, &s),
                            field => parts.push(field),
                        }
                    }
                }
                _ => break,
            }
        }

        if formatted {
            return Ok(Expr::FString(parts));
        }
        let text = parts
            .into_iter()
            .map(|part| match part {
                FStringPart::Literal(s) => s,
                FStringPart::Field { .. } => String::new(),
            })
            .collect();
        Ok(Expr::Str(text))
    }
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn push_literal(parts: &mut Vec<FStringPart>, text: &str) {
    if let Some(FStringPart::Literal(last)) = parts.last_mut() {
        last.push_str(text);
    } else {
        parts.push(FStringPart::Literal(text.to_string()));
    }
}

/// Split f-string content into literal text and `{expr[!conv][:spec]}` fields
fn parse_fstring(raw: &str, location: SourceLocation) -> Result<Vec<FStringPart>, ParseError> {
    let error = |message: &str| ParseError {
        message: format!("f-string: {}", message),
        location,
    };

    let chars: Vec<char> = raw.chars().collect();
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if ch == '{' && chars.get(i + 1) == Some(&'{') {
            literal.push('{');
            i += 2;
            continue;
        }
        if ch == '}' {
            if chars.get(i + 1) == Some(&'}') {
                literal.push('}');
                i += 2;
                continue;
            }
            return Err(error("single '}' is not allowed"));
        }
        if ch != '{' {
            literal.push(ch);
            i += 1;
            continue;
        }

        // Find the end of the replacement field, honoring nesting and quotes
        let start = i + 1;
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        let mut expr_end: Option<usize> = None;
        let mut conversion = None;
        let mut spec_start: Option<usize> = None;
        let mut j = start;
        loop {
            let Some(&c) = chars.get(j) else {
                return Err(error("expecting '}'"));
            };
            if let Some(q) = quote {
                if c == q {
                    quote = None;
                }
            } else if c == '\'' || c == '"' {
                quote = Some(c);
            } else if matches!(c, '(' | '[' | '{') {
                depth += 1;
            } else if matches!(c, ')' | ']') {
                depth = depth.saturating_sub(1);
            } else if c == '}' {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            } else if depth == 0 && expr_end.is_none() {
                if c == '!' && chars.get(j + 1) != Some(&'=') {
                    expr_end = Some(j);
                    conversion = chars.get(j + 1).copied();
                    j += 2;
                    if chars.get(j) == Some(&':') {
                        spec_start = Some(j + 1);
                    }
                    continue;
                }
                if c == ':' {
                    expr_end = Some(j);
                    spec_start = Some(j + 1);
                }
            }
            j += 1;
        }

        let expr_text: String = chars[start..expr_end.unwrap_or(j)].iter().collect();
        if expr_text.trim().is_empty() {
            return Err(error("empty expression not allowed"));
        }
        let expr = Parser::parse_standalone_expression(&expr_text).map_err(|e| ParseError {
            message: format!("f-string: {}", e.message),
            location,
        })?;
        let spec = spec_start.map(|s| chars[s..j].iter().collect::<String>());

        if !literal.is_empty() {
            parts.push(FStringPart::Literal(std::mem::take(&mut literal)));
        }
        parts.push(FStringPart::Field {
            expr,
            conversion,
            spec,
        });
        i = j + 1;
    }

    if !literal.is_empty() {
        parts.push(FStringPart::Literal(literal));
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::Parser;

    fn expr(source: &str) -> Expr {
        Parser::parse_standalone_expression(source).expect("parse failed")
    }

    #[test]
    fn test_precedence_mul_over_add() {
        match expr("1 + 2 * 3") {
            Expr::Binary {
                op: BinOp::Add,
                right,
                ..
            } => assert!(matches!(*right, Expr::Binary { op: BinOp::Mul, .. })),
            other => panic!("Expected addition, got {:?}", other),
        }
    }

    #[test]
    fn test_power_binds_tighter_than_unary_minus() {
        match expr("-2 ** 2") {
            Expr::Unary { op: UnOp::Neg, operand } => {
                assert!(matches!(*operand, Expr::Binary { op: BinOp::Pow, .. }))
            }
            other => panic!("Expected negation, got {:?}", other),
        }
    }

    #[test]
    fn test_chained_comparison() {
        match expr("0 <= i < n") {
            Expr::Compare { comparisons, .. } => {
                assert_eq!(comparisons.len(), 2);
                assert_eq!(comparisons[0].0, CmpOp::Le);
                assert_eq!(comparisons[1].0, CmpOp::Lt);
            }
            other => panic!("Expected comparison, got {:?}", other),
        }
    }

    #[test]
    fn test_not_in_and_is_not() {
        match expr("a not in b") {
            Expr::Compare { comparisons, .. } => assert_eq!(comparisons[0].0, CmpOp::NotIn),
            other => panic!("Expected comparison, got {:?}", other),
        }
        match expr("a is not None") {
            Expr::Compare { comparisons, .. } => assert_eq!(comparisons[0].0, CmpOp::IsNot),
            other => panic!("Expected comparison, got {:?}", other),
        }
    }

    #[test]
    fn test_comprehension_with_condition() {
        match expr("[x * x for x in range(10) if x % 2 == 0]") {
            Expr::ListComp { generators, .. } => {
                assert_eq!(generators.len(), 1);
                assert_eq!(generators[0].conditions.len(), 1);
            }
            other => panic!("Expected list comprehension, got {:?}", other),
        }
    }

    #[test]
    fn test_dict_and_set_displays() {
        assert!(matches!(expr("{}"), Expr::Dict(ref pairs) if pairs.is_empty()));
        assert!(matches!(expr("{'a': 1, 'b': 2}"), Expr::Dict(ref pairs) if pairs.len() == 2));
        assert!(matches!(expr("{1, 2}"), Expr::Set(ref items) if items.len() == 2));
        assert!(matches!(expr("{k: v for k, v in d.items()}"), Expr::DictComp { .. }));
    }

    #[test]
    fn test_slices() {
        match expr("xs[1:-1:2]") {
            Expr::Subscript { index, .. } => match *index {
                Expr::Slice { lower, upper, step } => {
                    assert!(lower.is_some() && upper.is_some() && step.is_some());
                }
                other => panic!("Expected slice, got {:?}", other),
            },
            other => panic!("Expected subscript, got {:?}", other),
        }
        assert!(matches!(expr("xs[::-1]"), Expr::Subscript { .. }));
    }

    #[test]
    fn test_call_arguments() {
        match expr("f(1, key=2, *rest)") {
            Expr::Call { args, .. } => {
                assert!(matches!(args[0], Argument::Positional(_)));
                assert!(matches!(args[1], Argument::Keyword(ref k, _) if k == "key"));
                assert!(matches!(args[2], Argument::Star(_)));
            }
            other => panic!("Expected call, got {:?}", other),
        }
        assert!(matches!(expr("sum(x for x in xs)"), Expr::Call { .. }));
    }

    #[test]
    fn test_conditional_expression_and_lambda() {
        assert!(matches!(expr("a if c else b"), Expr::IfExp { .. }));
        match expr("lambda x, y=1: x + y") {
            Expr::Lambda(def) => assert_eq!(def.params.len(), 2),
            other => panic!("Expected lambda, got {:?}", other),
        }
    }

    #[test]
    fn test_fstring_fields() {
        match expr("f'{name!r} is {age:>3} {{literal}}'") {
            Expr::FString(parts) => {
                let fields: Vec<_> = parts
                    .iter()
                    .filter_map(|p| match p {
                        FStringPart::Field { conversion, spec, .. } => {
                            Some((*conversion, spec.clone()))
                        }
                        FStringPart::Literal(_) => None,
                    })
                    .collect();
                assert_eq!(fields, vec![(Some('r'), None), (None, Some(">3".to_string()))]);
                assert!(matches!(parts.last(), Some(FStringPart::Literal(s)) if s == " {literal}"));
            }
            other => panic!("Expected f-string, got {:?}", other),
        }
    }

    #[test]
    fn test_adjacent_strings_concatenate() {
        assert!(matches!(expr("'ab' \"cd\""), Expr::Str(ref s) if s == "abcd"));
    }
}
