//! Script source code parser
//!
//! This module transforms source text into an Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → tokens, with INDENT/DEDENT layout)
//! - [`parse`]: Parser struct and entry points (tokens → AST)
//! - [`ast`]: AST node definitions
//!
//! # Supported Subset
//!
//! The parser supports the indentation-structured scripting subset used by
//! teaching programs:
//! - Statements: assignments (chained, tuple, augmented), `if/elif/else`,
//!   `while`, `for`, `def`, `class`, `try/except/else/finally`, `return`,
//!   `break`, `continue`, `pass`, `del`, `global`, `nonlocal`, `assert`,
//!   `raise`, `import`, `from ... import`
//! - Expressions: arithmetic, bitwise, chained comparisons, boolean logic,
//!   conditional expressions, lambdas, comprehensions, f-strings, slices
//! - No decorators, generators, `with`, `async`, or walrus assignments
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with one method per precedence level.
//! No external parser generator dependencies.

pub mod ast;
pub mod expressions;
pub mod lexer;
pub mod parse;
pub mod statements;
