//! Syntactic scope of a traced line
//!
//! Only the first word of the stripped source line is looked at, so a line
//! such as `if x: y = 1` is still conditional while `elsewhere = 1` is not.

use crate::interpreter::hook::TraceEvent;
use crate::snapshot::ScopeKind;

fn first_word(line: &str) -> &str {
    let line = line.trim();
    let end = line
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(line.len());
    &line[..end]
}

/// Scope of the event: loop and conditional headers win over `call`
pub fn scope_of(line: &str, event: TraceEvent) -> Option<ScopeKind> {
    match first_word(line) {
        "for" | "while" => Some(ScopeKind::Loop),
        "if" | "elif" | "else" => Some(ScopeKind::Conditional),
        _ if event == TraceEvent::Call => Some(ScopeKind::Function),
        _ => None,
    }
}

/// What deciding a conditional line requires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition<'s> {
    /// `else:` always runs its body when reached
    Else,
    /// Expression text after `if`/`elif` with the trailing colon removed
    Test(&'s str),
}

/// Split a conditional header into its condition
pub fn condition_of(line: &str) -> Option<Condition<'_>> {
    let line = line.trim();
    let keyword = first_word(line);
    match keyword {
        "else" => Some(Condition::Else),
        "if" | "elif" => {
            let rest = line[keyword.len()..].trim();
            let rest = rest.strip_suffix(':').unwrap_or(rest).trim_end();
            (!rest.is_empty()).then_some(Condition::Test(rest))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_and_conditional_headers() {
        assert_eq!(scope_of("  for i in range(3):", TraceEvent::Line), Some(ScopeKind::Loop));
        assert_eq!(scope_of("while n > 0:", TraceEvent::Line), Some(ScopeKind::Loop));
        assert_eq!(scope_of("if x:", TraceEvent::Line), Some(ScopeKind::Conditional));
        assert_eq!(scope_of("elif(x):", TraceEvent::Line), Some(ScopeKind::Conditional));
        assert_eq!(scope_of("else:", TraceEvent::Line), Some(ScopeKind::Conditional));
    }

    #[test]
    fn test_call_and_plain_lines() {
        assert_eq!(scope_of("def f(n):", TraceEvent::Call), Some(ScopeKind::Function));
        assert_eq!(scope_of("x = 1", TraceEvent::Line), None);
        assert_eq!(scope_of("elsewhere = 1", TraceEvent::Line), None);
        assert_eq!(scope_of("format = 2", TraceEvent::Line), None);
        assert_eq!(scope_of("", TraceEvent::Return), None);
    }

    #[test]
    fn test_conditions() {
        assert_eq!(condition_of("if x > 0:"), Some(Condition::Test("x > 0")));
        assert_eq!(condition_of("  elif not done :"), Some(Condition::Test("not done")));
        assert_eq!(condition_of("else:"), Some(Condition::Else));
        assert_eq!(condition_of("if:"), None);
        assert_eq!(condition_of("x = 1"), None);
    }
}
