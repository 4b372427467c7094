//! Process-wide backend selection.
//!
//! The choice is resolved at most once: either an embedder configures it
//! before the first parse, or the first query freezes the default.

use std::sync::OnceLock;

static CHOICE: OnceLock<BackendChoice> = OnceLock::new();

/// Which parser implementation the process uses.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BackendChoice {
    InProcess,
    Native,
}

impl BackendChoice {
    /// Parse a configuration value. Unknown values are `None` so the
    /// embedder can report them instead of silently defaulting.
    pub fn from_name(name: &str) -> Option<BackendChoice> {
        match name {
            "in_process" => Some(BackendChoice::InProcess),
            "native" => Some(BackendChoice::Native),
            _ => None,
        }
    }
}

/// Resolves the process-wide backend choice.
pub struct ParserSelector;

impl ParserSelector {
    /// Configure the backend. Returns false if the choice was already
    /// frozen (by an earlier configure or the first `active` query).
    pub fn configure(choice: BackendChoice) -> bool {
        CHOICE.set(choice).is_ok()
    }

    /// The active backend; defaults to in-process and freezes on first use.
    pub fn active() -> BackendChoice {
        *CHOICE.get_or_init(|| BackendChoice::InProcess)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_resolves_once() {
        // Sole test touching the process-wide choice.
        assert!(ParserSelector::configure(BackendChoice::Native));
        assert_eq!(ParserSelector::active(), BackendChoice::Native);
        assert!(
            !ParserSelector::configure(BackendChoice::InProcess),
            "a second configure must not take effect"
        );
        assert_eq!(ParserSelector::active(), BackendChoice::Native);
    }

    #[test]
    fn test_choice_from_name() {
        assert_eq!(BackendChoice::from_name("in_process"), Some(BackendChoice::InProcess));
        assert_eq!(BackendChoice::from_name("native"), Some(BackendChoice::Native));
        assert_eq!(BackendChoice::from_name("remote"), None);
    }
}
