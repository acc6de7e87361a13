//! Substring denylist over the submitted source
//!
//! The check is advisory. It rejects the obvious ways of reaching the host
//! system and is trivially bypassed by anyone who tries; real isolation has to
//! come from whatever runs the process.

use crate::interpreter::constants::DENYLIST;

/// `false` when the lowercased source contains a denylisted substring
pub fn is_safe(code: &str) -> bool {
    let lowered = code.to_lowercase();
    match DENYLIST.iter().find(|pattern| lowered.contains(*pattern)) {
        Some(pattern) => {
            tracing::debug!(pattern, "source rejected by denylist");
            false
        }
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_code_is_safe() {
        assert!(is_safe("x = 1\nprint(x)\n"));
        assert!(is_safe("import math\nprint(math.sqrt(4))\n"));
    }

    #[test]
    fn test_every_pattern_is_rejected() {
        for pattern in DENYLIST {
            assert!(!is_safe(&format!("x = 1\n{}\n", pattern)), "{}", pattern);
        }
    }

    #[test]
    fn test_check_ignores_case() {
        assert!(!is_safe("IMPORT OS\n"));
        assert!(!is_safe("data = Open('f')\n"));
    }

    #[test]
    fn test_substrings_match_anywhere() {
        // Inside a string literal still counts
        assert!(!is_safe("msg = 'use subprocess'\n"));
    }
}
