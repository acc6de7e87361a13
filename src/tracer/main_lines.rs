//! Lines on which tracing may begin
//!
//! Every line spanned by a top-level statement counts, except for statements
//! that only set things up: `def`, `class`, imports and bare string literals
//! used as docstrings.

use crate::parser::ast::Program;
use crate::parser::parse::{ParseError, Parser};
use rustc_hash::FxHashSet;

/// Line numbers of top-level executable statements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MainLines {
    lines: FxHashSet<usize>,
}

impl MainLines {
    pub fn from_program(program: &Program) -> Self {
        MainLines {
            lines: executable_lines(program).into_iter().collect(),
        }
    }

    pub fn contains(&self, line: usize) -> bool {
        self.lines.contains(&line)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// First line tracing may start at; 1 when there is none
    pub fn start_at(&self) -> usize {
        self.lines.iter().copied().min().unwrap_or(1)
    }
}

/// Sorted lines covered by top-level statements that do observable work
pub fn executable_lines(program: &Program) -> Vec<usize> {
    let mut lines: Vec<usize> = program
        .body
        .iter()
        .filter(|stmt| !stmt.is_definition() && !stmt.is_docstring())
        .flat_map(|stmt| stmt.line()..=stmt.end_line.max(stmt.line()))
        .collect();
    lines.sort_unstable();
    lines.dedup();
    lines
}

/// Parse `code` and compute its executable lines
pub fn filter_code(code: &str) -> Result<Vec<usize>, ParseError> {
    let program = Parser::new(code)?.parse_program()?;
    Ok(executable_lines(&program))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_is_excluded() {
        let code = "\"\"\"Module docs.\"\"\"\nimport math\nfrom math import sqrt\n\ndef f(x):\n    return x\n\nclass A:\n    pass\n";
        assert_eq!(filter_code(code).expect("parses"), Vec::<usize>::new());
    }

    #[test]
    fn test_compound_statements_cover_their_bodies() {
        let code = "def f():\n    pass\n\nx = 1\nfor i in range(3):\n    x += i\n\nprint(x)\n";
        assert_eq!(filter_code(code).expect("parses"), vec![4, 5, 6, 8]);
    }

    #[test]
    fn test_start_at() {
        let program = Parser::new("def f():\n    pass\ny = f()\n")
            .and_then(|mut p| p.parse_program())
            .expect("parses");
        let main = MainLines::from_program(&program);
        assert_eq!(main.start_at(), 3);
        assert!(main.contains(3));
        assert!(!main.contains(1));

        assert_eq!(MainLines::default().start_at(), 1);
    }

    #[test]
    fn test_parse_error_is_reported() {
        assert!(filter_code("x = (1,\n").is_err());
    }
}
