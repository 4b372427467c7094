//! Resolution algorithms over a scope chain.
//!
//! An identifier occurrence resolves to a `(depth, slot)` pair: how many
//! enclosing-scope hops away the declaring scope is, and the variable's
//! position within it. The pair travels through the pipeline packed into
//! one `u32`.

use crate::scope::ScopeArena;
use beryl_ast::types::ScopeId;
use beryl_core::intern::{InternedString, StringInterner};
use thiserror::Error;

/// Scope-resolution failures. Both abort only the current parse.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScopeError {
    /// Depth or slot exceeded the 16-bit packing range. Pathological
    /// source; never silently truncated.
    #[error("{file}:{line}: scope too deep: depth {depth} or slot {slot} exceeds the address range")]
    AddressOverflow {
        depth: u32,
        slot: u32,
        file: String,
        line: u32,
    },
    /// A resolution reached the outermost scope of a chain where the
    /// grammar-level contract required a declaring scope to exist.
    /// Indicates an upstream builder bug, not a user syntax error.
    #[error("{file}:{line}: variable '{name}' reached the outermost scope undeclared")]
    UnresolvedReference { name: String, file: String, line: u32 },
}

/// Pack a `(depth, slot)` pair into a single address.
///
/// Each component must fit 16 bits; anything larger is an
/// `AddressOverflow` reported against the offending reference.
pub fn pack_address(depth: u32, slot: u32, file: &str, line: u32) -> Result<u32, ScopeError> {
    if depth > 0xFFFF || slot > 0xFFFF {
        return Err(ScopeError::AddressOverflow {
            depth,
            slot,
            file: file.to_string(),
            line,
        });
    }
    Ok((depth << 16) | slot)
}

/// Recover the `(depth, slot)` pair from a packed address.
pub fn unpack_address(address: u32) -> (u32, u32) {
    (address >> 16, address & 0xFFFF)
}

/// Where an assignment should store, as reported by [`ScopeArena::assign`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AssignTarget {
    /// The name is declared somewhere in the chain.
    Found { depth: u32, slot: u32 },
    /// No scope in the chain declares the name. Declaration policy
    /// belongs to the caller; `outermost` is where the search ended.
    Unresolved { outermost: ScopeId },
}

impl ScopeArena {
    /// Declare a plain local in `scope`, returning its slot. Idempotent:
    /// re-declaring a name returns the existing slot.
    pub fn declare_local(&mut self, scope: ScopeId, name: InternedString) -> u32 {
        self.get_mut(scope).add_variable(name)
    }

    /// Search `scope` and its enclosing chain for `name`, returning the
    /// first match as `(depth, slot)` with depth counted from
    /// `start_depth`. Never declares anything.
    pub fn resolve_in_chain(
        &self,
        scope: ScopeId,
        name: InternedString,
        start_depth: u32,
    ) -> Option<(u32, u32)> {
        let mut current = scope;
        let mut depth = start_depth;
        loop {
            let node = self.get(current);
            if let Some(slot) = node.exists(name) {
                return Some((depth, slot));
            }
            current = node.enclosing()?;
            depth += 1;
        }
    }

    /// Whether `name` is declared anywhere in the chain starting at `scope`.
    pub fn is_defined(&self, scope: ScopeId, name: InternedString) -> bool {
        self.resolve_in_chain(scope, name, 0).is_some()
    }

    /// Resolve a reference whose grammar-level contract guarantees a
    /// declaring scope exists. A miss here is an upstream builder bug,
    /// reported as [`ScopeError::UnresolvedReference`].
    pub fn resolve_required(
        &self,
        scope: ScopeId,
        name: InternedString,
        interner: &StringInterner,
        file: &str,
        line: u32,
    ) -> Result<(u32, u32), ScopeError> {
        self.resolve_in_chain(scope, name, 0)
            .ok_or_else(|| ScopeError::UnresolvedReference {
                name: interner.resolve(name).to_string(),
                file: file.to_string(),
                line,
            })
    }

    /// Search semantics of [`resolve_in_chain`], producing an assignment
    /// target. A miss reports the outermost scope reached; this layer
    /// never declares on behalf of a miss.
    pub fn assign(&self, scope: ScopeId, name: InternedString, start_depth: u32) -> AssignTarget {
        let mut current = scope;
        let mut depth = start_depth;
        loop {
            let node = self.get(current);
            if let Some(slot) = node.exists(name) {
                return AssignTarget::Found { depth, slot };
            }
            match node.enclosing() {
                Some(enclosing) => {
                    current = enclosing;
                    depth += 1;
                }
                None => return AssignTarget::Unresolved { outermost: current },
            }
        }
    }

    /// Every name visible from `scope`: the enclosing scopes' names
    /// outermost-first, then `scope`'s own names. A zero-local block
    /// scope splices in zero entries.
    pub fn visible_names(&self, scope: ScopeId) -> Vec<InternedString> {
        let mut names = match self.get(scope).enclosing() {
            Some(enclosing) => self.visible_names(enclosing),
            None => Vec::new(),
        };
        names.extend(self.get(scope).names());
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beryl_core::intern::StringInterner;

    #[test]
    fn test_pack_unpack_round_trip() {
        for &(depth, slot) in &[(0u32, 0u32), (1, 2), (255, 255), (65535, 0), (0, 65535), (65535, 65535)] {
            let addr = pack_address(depth, slot, "t.rb", 1).unwrap();
            assert_eq!(unpack_address(addr), (depth, slot));
        }
    }

    #[test]
    fn test_pack_overflow() {
        let err = pack_address(65536, 0, "t.rb", 3).unwrap_err();
        assert!(matches!(err, ScopeError::AddressOverflow { depth: 65536, .. }));
        let err = pack_address(0, 65536, "t.rb", 3).unwrap_err();
        assert!(matches!(err, ScopeError::AddressOverflow { slot: 65536, .. }));
    }

    #[test]
    fn test_declare_is_idempotent() {
        let interner = StringInterner::new();
        let name = interner.intern("x");
        let mut arena = ScopeArena::new();
        let scope = arena.new_local(None, &[]);
        let first = arena.declare_local(scope, name);
        let second = arena.declare_local(scope, name);
        assert_eq!(first, second);
        assert_eq!(arena.get(scope).var_count(), 1);
    }

    #[test]
    fn test_resolve_depth_counts_hops() {
        let interner = StringInterner::new();
        let name = interner.intern("outer_only");
        let mut arena = ScopeArena::new();
        let mut scope = arena.new_local(None, &[name]);
        // Build chains of increasing depth and confirm the reported depth
        for d in 1..=5u32 {
            scope = arena.new_block(scope, &[]);
            assert_eq!(arena.resolve_in_chain(scope, name, 0), Some((d, 0)));
        }
    }

    #[test]
    fn test_resolve_honors_start_depth() {
        let interner = StringInterner::new();
        let name = interner.intern("v");
        let mut arena = ScopeArena::new();
        let scope = arena.new_local(None, &[name]);
        assert_eq!(arena.resolve_in_chain(scope, name, 4), Some((4, 0)));
    }

    #[test]
    fn test_resolve_miss() {
        let interner = StringInterner::new();
        let mut arena = ScopeArena::new();
        let scope = arena.new_local(None, &[]);
        assert_eq!(arena.resolve_in_chain(scope, interner.intern("nope"), 0), None);
    }

    #[test]
    fn test_resolve_required_reports_builder_bug() {
        let interner = StringInterner::new();
        let name = interner.intern("ghost");
        let mut arena = ScopeArena::new();
        let outer = arena.new_local(None, &[]);
        let inner = arena.new_block(outer, &[]);
        assert!(!arena.is_defined(inner, name));

        let err = arena
            .resolve_required(inner, name, &interner, "t.rb", 7)
            .unwrap_err();
        match err {
            ScopeError::UnresolvedReference { name, file, line } => {
                assert_eq!(name, "ghost");
                assert_eq!(file, "t.rb");
                assert_eq!(line, 7);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_assign_found_and_unresolved() {
        let interner = StringInterner::new();
        let name = interner.intern("x");
        let mut arena = ScopeArena::new();
        let outer = arena.new_local(None, &[name]);
        let inner = arena.new_block(outer, &[]);

        assert_eq!(arena.assign(inner, name, 0), AssignTarget::Found { depth: 1, slot: 0 });
        assert_eq!(
            arena.assign(inner, interner.intern("fresh"), 0),
            AssignTarget::Unresolved { outermost: outer }
        );
    }

    #[test]
    fn test_visible_names_outermost_first() {
        let interner = StringInterner::new();
        let (a, b, c, d) = (
            interner.intern("a"),
            interner.intern("b"),
            interner.intern("c"),
            interner.intern("d"),
        );
        let mut arena = ScopeArena::new();
        let outer = arena.new_local(None, &[a, b]);
        let middle = arena.new_block(outer, &[c]);
        let inner = arena.new_block(middle, &[d]);
        assert_eq!(arena.visible_names(inner), vec![a, b, c, d]);
    }

    #[test]
    fn test_visible_names_empty_block_splices_nothing() {
        let interner = StringInterner::new();
        let (a, b) = (interner.intern("a"), interner.intern("b"));
        let mut arena = ScopeArena::new();
        let outer = arena.new_local(None, &[a]);
        let empty = arena.new_block(outer, &[]);
        let inner = arena.new_block(empty, &[b]);
        assert_eq!(arena.visible_names(inner), vec![a, b]);
    }
}
