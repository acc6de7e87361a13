//! Lexer (tokenizer) for script source code
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the parser.
//! Block structure is made explicit: the lexer tracks an indentation stack and
//! emits [`TokenKind::Indent`] / [`TokenKind::Dedent`] around nested blocks and
//! [`TokenKind::Newline`] at the end of every logical line. Newlines inside
//! brackets and after a backslash continuation are not logical line ends.

use super::ast::SourceLocation;
use std::fmt;
use thiserror::Error;

/// All token variants produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Int(i64),
    Float(f64),
    Str(String),
    FString(String),

    // Identifiers
    Ident(String),

    // Keywords
    False,
    None,
    True,
    And,
    As,
    Assert,
    Break,
    Class,
    Continue,
    Def,
    Del,
    Elif,
    Else,
    Except,
    Finally,
    For,
    From,
    Global,
    If,
    Import,
    In,
    Is,
    Lambda,
    Nonlocal,
    Not,
    Or,
    Pass,
    Raise,
    Return,
    Try,
    While,

    // Arithmetic
    Plus,        // +
    Minus,       // -
    Star,        // *
    DoubleStar,  // **
    Slash,       // /
    DoubleSlash, // //
    Percent,     // %

    // Bitwise
    Amp,   // &
    Pipe,  // |
    Caret, // ^
    Tilde, // ~
    LtLt,  // <<
    GtGt,  // >>

    // Comparison
    EqEq,  // ==
    NotEq, // !=
    Lt,    // <
    Le,    // <=
    Gt,    // >
    Ge,    // >=

    // Assignment
    Eq,            // =
    PlusEq,        // +=
    MinusEq,       // -=
    StarEq,        // *=
    SlashEq,       // /=
    DoubleSlashEq, // //=
    PercentEq,     // %=
    DoubleStarEq,  // **=
    AmpEq,         // &=
    PipeEq,        // |=
    CaretEq,       // ^=
    LtLtEq,        // <<=
    GtGtEq,        // >>=

    // Punctuation
    LParen,    // (
    RParen,    // )
    LBracket,  // [
    RBracket,  // ]
    LBrace,    // {
    RBrace,    // }
    Comma,     // ,
    Colon,     // :
    Dot,       // .
    Semicolon, // ;
    Arrow,     // ->

    // Layout
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl TokenKind {
    fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "False" => TokenKind::False,
            "None" => TokenKind::None,
            "True" => TokenKind::True,
            "and" => TokenKind::And,
            "as" => TokenKind::As,
            "assert" => TokenKind::Assert,
            "break" => TokenKind::Break,
            "class" => TokenKind::Class,
            "continue" => TokenKind::Continue,
            "def" => TokenKind::Def,
            "del" => TokenKind::Del,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "except" => TokenKind::Except,
            "finally" => TokenKind::Finally,
            "for" => TokenKind::For,
            "from" => TokenKind::From,
            "global" => TokenKind::Global,
            "if" => TokenKind::If,
            "import" => TokenKind::Import,
            "in" => TokenKind::In,
            "is" => TokenKind::Is,
            "lambda" => TokenKind::Lambda,
            "nonlocal" => TokenKind::Nonlocal,
            "not" => TokenKind::Not,
            "or" => TokenKind::Or,
            "pass" => TokenKind::Pass,
            "raise" => TokenKind::Raise,
            "return" => TokenKind::Return,
            "try" => TokenKind::Try,
            "while" => TokenKind::While,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Int(n) => write!(f, "int literal {}", n),
            TokenKind::Float(x) => write!(f, "float literal {}", x),
            TokenKind::Str(s) => write!(f, "string literal {:?}", s),
            TokenKind::FString(s) => write!(f, "f-string {:?}", s),
            TokenKind::Ident(s) => write!(f, "identifier '{}'", s),
            TokenKind::Newline => write!(f, "end of line"),
            TokenKind::Indent => write!(f, "indent"),
            TokenKind::Dedent => write!(f, "dedent"),
            TokenKind::Eof => write!(f, "end of file"),
            other => write!(f, "'{}'", other.text()),
        }
    }
}

impl TokenKind {
    /// Source spelling of keywords and operators
    fn text(&self) -> &'static str {
        match self {
            TokenKind::False => "False",
            TokenKind::None => "None",
            TokenKind::True => "True",
            TokenKind::And => "and",
            TokenKind::As => "as",
            TokenKind::Assert => "assert",
            TokenKind::Break => "break",
            TokenKind::Class => "class",
            TokenKind::Continue => "continue",
            TokenKind::Def => "def",
            TokenKind::Del => "del",
            TokenKind::Elif => "elif",
            TokenKind::Else => "else",
            TokenKind::Except => "except",
            TokenKind::Finally => "finally",
            TokenKind::For => "for",
            TokenKind::From => "from",
            TokenKind::Global => "global",
            TokenKind::If => "if",
            TokenKind::Import => "import",
            TokenKind::In => "in",
            TokenKind::Is => "is",
            TokenKind::Lambda => "lambda",
            TokenKind::Nonlocal => "nonlocal",
            TokenKind::Not => "not",
            TokenKind::Or => "or",
            TokenKind::Pass => "pass",
            TokenKind::Raise => "raise",
            TokenKind::Return => "return",
            TokenKind::Try => "try",
            TokenKind::While => "while",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::DoubleStar => "**",
            TokenKind::Slash => "/",
            TokenKind::DoubleSlash => "//",
            TokenKind::Percent => "%",
            TokenKind::Amp => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::Tilde => "~",
            TokenKind::LtLt => "<<",
            TokenKind::GtGt => ">>",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::Le => "<=",
            TokenKind::Gt => ">",
            TokenKind::Ge => ">=",
            TokenKind::Eq => "=",
            TokenKind::PlusEq => "+=",
            TokenKind::MinusEq => "-=",
            TokenKind::StarEq => "*=",
            TokenKind::SlashEq => "/=",
            TokenKind::DoubleSlashEq => "//=",
            TokenKind::PercentEq => "%=",
            TokenKind::DoubleStarEq => "**=",
            TokenKind::AmpEq => "&=",
            TokenKind::PipeEq => "|=",
            TokenKind::CaretEq => "^=",
            TokenKind::LtLtEq => "<<=",
            TokenKind::GtGtEq => ">>=",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Dot => ".",
            TokenKind::Semicolon => ";",
            TokenKind::Arrow => "->",
            _ => "",
        }
    }
}

/// A token with the position it starts at and the line it ends on
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
    /// Differs from `location.line` only for multi-line string literals
    pub end_line: usize,
}

/// Lexer error type
#[derive(Debug, Clone, Error)]
#[error("Lexer error at line {}, column {}: {message}", location.line, location.column)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

/// Lexer for script source code
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    indent_stack: Vec<usize>,
    bracket_depth: usize,
    at_line_start: bool,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            indent_stack: vec![0],
            bracket_depth: 0,
            at_line_start: true,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens: Vec<Token> = Vec::new();

        loop {
            if self.at_line_start && self.bracket_depth == 0 {
                self.at_line_start = false;
                if !self.handle_indentation(&mut tokens)? {
                    continue;
                }
            }

            self.skip_inline_whitespace()?;

            let Some(ch) = self.peek() else {
                break;
            };

            if ch == '#' {
                self.skip_comment();
                continue;
            }

            if ch == '\n' {
                self.advance();
                if self.bracket_depth == 0 {
                    self.push_newline(&mut tokens);
                    self.at_line_start = true;
                }
                continue;
            }

            let token = self.next_token()?;
            tokens.push(token);
        }

        // Close the last logical line and any open blocks
        self.push_newline(&mut tokens);
        let loc = self.current_location();
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            tokens.push(self.token_at(TokenKind::Dedent, loc));
        }
        tokens.push(self.token_at(TokenKind::Eof, loc));

        Ok(tokens)
    }

    /// Measure the indentation of a new line and emit Indent/Dedent tokens.
    ///
    /// Returns `false` when the line is blank or comment-only and was skipped.
    fn handle_indentation(&mut self, tokens: &mut Vec<Token>) -> Result<bool, LexError> {
        let mut width = 0;
        while let Some(ch) = self.peek() {
            match ch {
                ' ' => width += 1,
                '\t' => width = (width / 8 + 1) * 8,
                '\x0c' => width = 0,
                _ => break,
            }
            self.advance();
        }

        match self.peek() {
            None => return Ok(true),
            Some('\n') => {
                self.advance();
                self.at_line_start = true;
                return Ok(false);
            }
            Some('\r') if self.peek_next() == Some('\n') => {
                self.advance();
                self.advance();
                self.at_line_start = true;
                return Ok(false);
            }
            Some('#') => {
                self.skip_comment();
                if self.peek() == Some('\n') {
                    self.advance();
                }
                self.at_line_start = true;
                return Ok(false);
            }
            _ => {}
        }

        let loc = self.current_location();
        let current = self.indent_stack.last().copied().unwrap_or(0);
        if width > current {
            self.indent_stack.push(width);
            tokens.push(self.token_at(TokenKind::Indent, loc));
        } else if width < current {
            while self.indent_stack.last().is_some_and(|&top| top > width) {
                self.indent_stack.pop();
                tokens.push(self.token_at(TokenKind::Dedent, loc));
            }
            if self.indent_stack.last() != Some(&width) {
                return Err(LexError {
                    message: "unindent does not match any outer indentation level".to_string(),
                    location: loc,
                });
            }
        }
        Ok(true)
    }

    fn push_newline(&self, tokens: &mut Vec<Token>) {
        let needs_newline = tokens.last().is_some_and(|t| {
            !matches!(t.kind, TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent)
        });
        if needs_newline {
            tokens.push(self.token_at(TokenKind::Newline, self.current_location()));
        }
    }

    fn token_at(&self, kind: TokenKind, location: SourceLocation) -> Token {
        Token {
            kind,
            location,
            end_line: location.line,
        }
    }

    /// Get next token
    fn next_token(&mut self) -> Result<Token, LexError> {
        let loc = self.current_location();
        let ch = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of file".to_string(),
            location: loc,
        })?;

        let kind = match ch {
            '"' | '\'' => self.string_literal(ch, false, false)?,
            '0'..='9' => self.number_literal(ch)?,
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.number_literal(ch)?,
            c if c.is_alphabetic() || c == '_' => return self.identifier_or_keyword(c, loc),

            '(' => self.open_bracket(TokenKind::LParen),
            '[' => self.open_bracket(TokenKind::LBracket),
            '{' => self.open_bracket(TokenKind::LBrace),
            ')' => self.close_bracket(TokenKind::RParen),
            ']' => self.close_bracket(TokenKind::RBracket),
            '}' => self.close_bracket(TokenKind::RBrace),
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Dot,
            '~' => TokenKind::Tilde,

            '+' => self.with_eq(TokenKind::Plus, TokenKind::PlusEq),
            '%' => self.with_eq(TokenKind::Percent, TokenKind::PercentEq),
            '&' => self.with_eq(TokenKind::Amp, TokenKind::AmpEq),
            '|' => self.with_eq(TokenKind::Pipe, TokenKind::PipeEq),
            '^' => self.with_eq(TokenKind::Caret, TokenKind::CaretEq),
            '=' => self.with_eq(TokenKind::Eq, TokenKind::EqEq),
            '-' => {
                if self.match_char('>') {
                    TokenKind::Arrow
                } else {
                    self.with_eq(TokenKind::Minus, TokenKind::MinusEq)
                }
            }
            '*' => {
                if self.match_char('*') {
                    self.with_eq(TokenKind::DoubleStar, TokenKind::DoubleStarEq)
                } else {
                    self.with_eq(TokenKind::Star, TokenKind::StarEq)
                }
            }
            '/' => {
                if self.match_char('/') {
                    self.with_eq(TokenKind::DoubleSlash, TokenKind::DoubleSlashEq)
                } else {
                    self.with_eq(TokenKind::Slash, TokenKind::SlashEq)
                }
            }
            '<' => {
                if self.match_char('<') {
                    self.with_eq(TokenKind::LtLt, TokenKind::LtLtEq)
                } else {
                    self.with_eq(TokenKind::Lt, TokenKind::Le)
                }
            }
            '>' => {
                if self.match_char('>') {
                    self.with_eq(TokenKind::GtGt, TokenKind::GtGtEq)
                } else {
                    self.with_eq(TokenKind::Gt, TokenKind::Ge)
                }
            }
            '!' => {
                if self.match_char('=') {
                    TokenKind::NotEq
                } else {
                    return Err(LexError {
                        message: "invalid syntax: '!'".to_string(),
                        location: loc,
                    });
                }
            }
            other => {
                return Err(LexError {
                    message: format!("invalid character '{}'", other),
                    location: loc,
                });
            }
        };

        Ok(Token {
            kind,
            location: loc,
            end_line: self.line,
        })
    }

    fn with_eq(&mut self, plain: TokenKind, with_eq: TokenKind) -> TokenKind {
        if self.match_char('=') {
            with_eq
        } else {
            plain
        }
    }

    fn open_bracket(&mut self, kind: TokenKind) -> TokenKind {
        self.bracket_depth += 1;
        kind
    }

    fn close_bracket(&mut self, kind: TokenKind) -> TokenKind {
        self.bracket_depth = self.bracket_depth.saturating_sub(1);
        kind
    }

    fn identifier_or_keyword(
        &mut self,
        first: char,
        loc: SourceLocation,
    ) -> Result<Token, LexError> {
        let mut ident = String::new();
        ident.push(first);
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // String prefixes: r"", f"", b"", u"" and combinations
        if let Some(quote @ ('"' | '\'')) = self.peek() {
            let lower = ident.to_ascii_lowercase();
            if matches!(lower.as_str(), "r" | "f" | "b" | "u" | "rf" | "fr" | "rb" | "br") {
                self.advance();
                let raw = lower.contains('r');
                let formatted = lower.contains('f');
                let kind = self.string_literal(quote, raw, formatted)?;
                return Ok(Token {
                    kind,
                    location: loc,
                    end_line: self.line,
                });
            }
        }

        let kind = TokenKind::keyword(&ident).unwrap_or(TokenKind::Ident(ident));
        Ok(Token {
            kind,
            location: loc,
            end_line: loc.line,
        })
    }

    fn number_literal(&mut self, first: char) -> Result<TokenKind, LexError> {
        let loc = self.current_location();
        let mut text = String::new();
        text.push(first);

        if first == '0' && matches!(self.peek(), Some('x' | 'X' | 'o' | 'O' | 'b' | 'B')) {
            let radix = match self.advance() {
                Some('x' | 'X') => 16,
                Some('o' | 'O') => 8,
                _ => 2,
            };
            let mut digits = String::new();
            while let Some(ch) = self.peek() {
                if ch == '_' {
                    self.advance();
                } else if ch.is_digit(radix) {
                    digits.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
            return i64::from_str_radix(&digits, radix)
                .map(TokenKind::Int)
                .map_err(|_| LexError {
                    message: format!("invalid integer literal '0{}'", digits),
                    location: loc,
                });
        }

        let mut is_float = first == '.';
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else if ch == '_' {
                self.advance();
            } else if ch == '.' && !is_float {
                is_float = true;
                text.push(ch);
                self.advance();
            } else if matches!(ch, 'e' | 'E') {
                let after = self.peek_next();
                let signed = matches!(after, Some('+' | '-'));
                let digit_follows = if signed {
                    self.input.get(self.position + 2).is_some_and(|c| c.is_ascii_digit())
                } else {
                    after.is_some_and(|c| c.is_ascii_digit())
                };
                if !digit_follows {
                    break;
                }
                is_float = true;
                text.push('e');
                self.advance();
                if signed {
                    if let Some(sign) = self.advance() {
                        text.push(sign);
                    }
                }
            } else {
                break;
            }
        }

        if is_float {
            text.parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|_| LexError {
                    message: format!("invalid float literal '{}'", text),
                    location: loc,
                })
        } else {
            text.parse::<i64>()
                .map(TokenKind::Int)
                .map_err(|_| LexError {
                    message: format!("integer literal '{}' is too large", text),
                    location: loc,
                })
        }
    }

    fn string_literal(
        &mut self,
        quote: char,
        raw: bool,
        formatted: bool,
    ) -> Result<TokenKind, LexError> {
        let loc = self.current_location();
        let triple = self.peek() == Some(quote) && self.peek_next() == Some(quote);
        if triple {
            self.advance();
            self.advance();
        }

        let mut value = String::new();
        loop {
            let ch = self.advance().ok_or_else(|| LexError {
                message: "unterminated string literal".to_string(),
                location: loc,
            })?;

            if ch == quote {
                if !triple {
                    break;
                }
                if self.peek() == Some(quote) && self.peek_next() == Some(quote) {
                    self.advance();
                    self.advance();
                    break;
                }
                value.push(ch);
                continue;
            }

            if ch == '\n' && !triple {
                return Err(LexError {
                    message: "unterminated string literal".to_string(),
                    location: loc,
                });
            }

            if ch == '\\' {
                let escaped = self.advance().ok_or_else(|| LexError {
                    message: "unterminated string literal".to_string(),
                    location: loc,
                })?;
                if raw {
                    value.push('\\');
                    value.push(escaped);
                    continue;
                }
                match escaped {
                    '\n' => {}
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '0' => value.push('\0'),
                    '\\' => value.push('\\'),
                    '\'' => value.push('\''),
                    '"' => value.push('"'),
                    'x' => value.push(self.hex_escape(2, loc)?),
                    'u' => value.push(self.hex_escape(4, loc)?),
                    other => {
                        value.push('\\');
                        value.push(other);
                    }
                }
                continue;
            }

            value.push(ch);
        }

        if formatted {
            Ok(TokenKind::FString(value))
        } else {
            Ok(TokenKind::Str(value))
        }
    }

    fn hex_escape(&mut self, digits: usize, loc: SourceLocation) -> Result<char, LexError> {
        let mut code = String::new();
        for _ in 0..digits {
            match self.advance() {
                Some(c) if c.is_ascii_hexdigit() => code.push(c),
                _ => {
                    return Err(LexError {
                        message: "truncated escape sequence".to_string(),
                        location: loc,
                    })
                }
            }
        }
        u32::from_str_radix(&code, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| LexError {
                message: format!("invalid escape sequence '{}'", code),
                location: loc,
            })
    }

    fn skip_inline_whitespace(&mut self) -> Result<(), LexError> {
        while let Some(ch) = self.peek() {
            match ch {
                ' ' | '\t' | '\r' | '\x0c' => {
                    self.advance();
                }
                '\n' if self.bracket_depth > 0 => {
                    self.advance();
                }
                '\\' => {
                    let loc = self.current_location();
                    self.advance();
                    if self.peek() == Some('\r') {
                        self.advance();
                    }
                    if self.advance() != Some('\n') {
                        return Err(LexError {
                            message: "unexpected character after line continuation character"
                                .to_string(),
                            location: loc,
                        });
                    }
                }
                '#' if self.bracket_depth > 0 => self.skip_comment(),
                _ => break,
            }
        }
        Ok(())
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.input.get(self.position).copied()?;
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .expect("tokenize failed")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_indentation_produces_block_tokens() {
        let tokens = kinds("if x:\n    y = 1\nz = 2\n");
        assert_eq!(
            tokens,
            vec![
                TokenKind::If,
                TokenKind::Ident("x".into()),
                TokenKind::Colon,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Ident("y".into()),
                TokenKind::Eq,
                TokenKind::Int(1),
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Ident("z".into()),
                TokenKind::Eq,
                TokenKind::Int(2),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_blank_and_comment_lines_are_skipped() {
        let tokens = kinds("# header\n\nx = 1  # trailing\n\n   # indented comment\ny = 2");
        assert_eq!(
            tokens.iter().filter(|k| **k == TokenKind::Newline).count(),
            2
        );
        assert!(!tokens.contains(&TokenKind::Indent));
    }

    #[test]
    fn test_newlines_inside_brackets_are_joined() {
        let tokens = kinds("xs = [1,\n      2]\n");
        assert_eq!(tokens.iter().filter(|k| **k == TokenKind::Newline).count(), 1);
    }

    #[test]
    fn test_triple_quoted_string_records_end_line() {
        let tokens = Lexer::new("\"\"\"doc\nstring\"\"\"\nx = 1\n")
            .tokenize()
            .expect("tokenize failed");
        assert_eq!(tokens[0].kind, TokenKind::Str("doc\nstring".into()));
        assert_eq!(tokens[0].location.line, 1);
        assert_eq!(tokens[0].end_line, 2);
    }

    #[test]
    fn test_numbers_and_operators() {
        let tokens = kinds("a //= 2 ** 0x10 + 1.5e3 - 1_000");
        assert!(tokens.contains(&TokenKind::DoubleSlashEq));
        assert!(tokens.contains(&TokenKind::DoubleStar));
        assert!(tokens.contains(&TokenKind::Int(16)));
        assert!(tokens.contains(&TokenKind::Float(1500.0)));
        assert!(tokens.contains(&TokenKind::Int(1000)));
    }

    #[test]
    fn test_fstring_prefix() {
        let tokens = kinds("f'{x}!'");
        assert_eq!(tokens[0], TokenKind::FString("{x}!".into()));
    }

    #[test]
    fn test_bad_dedent_is_an_error() {
        let result = Lexer::new("if x:\n    a = 1\n  b = 2\n").tokenize();
        assert!(result.is_err());
    }
}
