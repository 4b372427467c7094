//! The eval-chain encoding: the binary format that tells an external
//! parser which outer variable names are visible to an eval fragment.
//!
//! Layout: byte 0 is the chain depth count `N` (0-255), followed by
//! `N + 1` groups innermost-first. Each group is one count byte `k`
//! followed by `k` NUL-terminated name strings. Group 0 is the immediate
//! scope being parsed against; the final group is always the owning
//! local (method) scope.

use crate::error::BridgeError;
use crate::wire::Reader;
use beryl_ast::types::ScopeId;
use beryl_core::intern::StringInterner;
use beryl_scope::ScopeArena;

/// Encode the enclosing-scope chain of `scope`.
///
/// Traversal starts at `scope` and keeps descending while the current
/// scope is block-like; the first non-block-like scope (the owning local
/// scope) closes the chain.
pub fn encode_eval_chain(
    arena: &ScopeArena,
    interner: &StringInterner,
    scope: ScopeId,
) -> Result<Vec<u8>, BridgeError> {
    let mut groups = vec![scope];
    let mut current = scope;
    while arena.get(current).is_block_like() {
        // Invariant: block-like scopes always have an enclosing scope.
        let enclosing = arena.get(current).enclosing().ok_or_else(|| {
            BridgeError::Decode("block-like scope without an enclosing scope".into())
        })?;
        groups.push(enclosing);
        current = enclosing;
    }

    let depth = groups.len() - 1;
    if depth > u8::MAX as usize {
        return Err(BridgeError::Decode(format!(
            "eval scope chain of depth {} cannot be encoded",
            depth
        )));
    }

    let mut out = vec![depth as u8];
    for &id in &groups {
        let node = arena.get(id);
        if node.var_count() > u8::MAX as usize {
            return Err(BridgeError::Decode(format!(
                "scope with {} variables cannot be encoded",
                node.var_count()
            )));
        }
        out.push(node.var_count() as u8);
        for name in node.names() {
            let bytes = interner.resolve(name).as_bytes();
            if bytes.contains(&0) {
                return Err(BridgeError::Decode("variable name contains NUL".into()));
            }
            out.extend_from_slice(bytes);
            out.push(0);
        }
    }
    Ok(out)
}

/// Decode an eval-chain encoding back into its name groups,
/// innermost-first. Used by native-parser doubles and round-trip tests.
pub fn decode_eval_chain(bytes: &[u8]) -> Result<Vec<Vec<Vec<u8>>>, BridgeError> {
    let mut reader = Reader::new(bytes);
    let depth = reader.read_u8()? as usize;
    let mut groups = Vec::with_capacity(depth + 1);
    for _ in 0..=depth {
        let count = reader.read_u8()? as usize;
        let mut names = Vec::with_capacity(count);
        for _ in 0..count {
            names.push(reader.read_cstr()?.to_vec());
        }
        groups.push(names);
    }
    if !reader.at_end() {
        return Err(BridgeError::Decode(format!(
            "{} trailing bytes after eval chain",
            reader.remaining()
        )));
    }
    Ok(groups)
}
