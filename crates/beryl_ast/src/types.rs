//! Id types and flag sets for the front end.

use std::fmt;

/// A lightweight handle to a scope stored in the scope arena.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ScopeId(pub u32);

impl ScopeId {
    /// Sentinel for "not yet bound to a scope". Block nodes decoded from
    /// an external parser carry this until the consumer builds their scopes.
    pub const INVALID: ScopeId = ScopeId(u32::MAX);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScopeId({})", self.0)
    }
}

bitflags::bitflags! {
    /// Passthrough flags a parse request carries to its backend.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ParseFlags: u32 {
        const NONE          = 0;
        /// Parsing the program entry file; the root scope binds the main module.
        const MAIN          = 1 << 0;
        /// Parsing an eval fragment layered on an existing binding.
        const EVAL          = 1 << 1;
        /// Source arrived inline (e.g. `-e`), not from a file.
        const INLINE_SOURCE = 1 << 2;
        /// Report unused-variable warnings while parsing.
        const VERBOSE_WARNINGS = 1 << 3;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_id_invalid() {
        assert!(!ScopeId::INVALID.is_valid());
        assert!(ScopeId(0).is_valid());
        assert_eq!(ScopeId(7).index(), 7);
    }

    #[test]
    fn test_parse_flags_combine() {
        let flags = ParseFlags::EVAL | ParseFlags::VERBOSE_WARNINGS;
        assert!(flags.contains(ParseFlags::EVAL));
        assert!(!flags.contains(ParseFlags::MAIN));
    }
}
