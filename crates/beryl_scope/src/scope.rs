//! The scope node, the arena that owns it, and scope construction.

use beryl_ast::types::ScopeId;
use beryl_core::collections::OrderedMap;
use beryl_core::intern::InternedString;
use std::sync::OnceLock;

/// Which flavor of lexical scope a node is.
///
/// The set is closed; per-kind behavior is plain control flow over the
/// tag rather than dynamic dispatch.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ScopeKind {
    /// A method/module-body scope. New plain locals land here.
    Local,
    /// A closure scope; transparently extends its enclosing local scope.
    Block,
    /// A scope for dynamically evaluated fragments. Traverses like a
    /// block scope but terminates "local scope" queries at itself.
    Eval,
}

/// The namespace a Local scope executes against.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ModuleBinding {
    /// The top-level/bootstrap binding (sentinel).
    Root,
    /// A named module/namespace.
    Named(InternedString),
}

/// One lexical scope.
///
/// `variables` is insertion-ordered: a variable's slot is its insertion
/// index and is never renumbered. A name appears at most once per node.
#[derive(Debug)]
pub struct ScopeNode {
    kind: ScopeKind,
    variables: OrderedMap<InternedString, ()>,
    enclosing: Option<ScopeId>,
    bound_module: Option<ModuleBinding>,
    is_argument_scope: bool,
    keyword_arg_index: Option<u32>,
}

impl ScopeNode {
    fn new(kind: ScopeKind, enclosing: Option<ScopeId>) -> Self {
        Self {
            kind,
            variables: OrderedMap::new(),
            enclosing,
            bound_module: None,
            is_argument_scope: false,
            keyword_arg_index: None,
        }
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn enclosing(&self) -> Option<ScopeId> {
        self.enclosing
    }

    /// Block and Eval scopes splice into their enclosing scope for
    /// traversal purposes.
    pub fn is_block_like(&self) -> bool {
        matches!(self.kind, ScopeKind::Block | ScopeKind::Eval)
    }

    pub fn bound_module(&self) -> Option<ModuleBinding> {
        self.bound_module
    }

    pub fn is_argument_scope(&self) -> bool {
        self.is_argument_scope
    }

    /// Slot index at which keyword-argument variables begin, if any.
    pub fn keyword_arg_index(&self) -> Option<u32> {
        self.keyword_arg_index
    }

    /// Slot of `name` in this scope, if declared here.
    pub fn exists(&self, name: InternedString) -> Option<u32> {
        self.variables.get_index_of(&name).map(|i| i as u32)
    }

    /// Declared names in slot order.
    pub fn names(&self) -> impl Iterator<Item = InternedString> + '_ {
        self.variables.keys().copied()
    }

    pub fn var_count(&self) -> usize {
        self.variables.len()
    }

    pub(crate) fn add_variable(&mut self, name: InternedString) -> u32 {
        self.variables.insert_full(name, ()).0 as u32
    }
}

/// Owns every scope created by one parse (or, for eval layering, by one
/// long-lived binding that further parses extend).
///
/// Scopes reference their enclosing scope by `ScopeId` index into the
/// same arena; the arena is append-only, so ids stay valid for its whole
/// lifetime and already-built scopes are never edited by later parses.
#[derive(Debug, Default)]
pub struct ScopeArena {
    scopes: Vec<ScopeNode>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Look up a scope. Ids are only minted by this arena and the arena
    /// is append-only, so an out-of-range id is a caller bug.
    pub fn get(&self, id: ScopeId) -> &ScopeNode {
        &self.scopes[id.index()]
    }

    pub(crate) fn get_mut(&mut self, id: ScopeId) -> &mut ScopeNode {
        &mut self.scopes[id.index()]
    }

    fn alloc(&mut self, mut node: ScopeNode, names: &[InternedString]) -> ScopeId {
        for &name in names {
            node.add_variable(name);
        }
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(node);
        id
    }

    /// Create a Local scope. An empty `names` list means "grow
    /// incrementally during parsing"; a non-empty list pre-populates the
    /// scope from a deserialized name list.
    pub fn new_local(&mut self, enclosing: Option<ScopeId>, names: &[InternedString]) -> ScopeId {
        self.alloc(ScopeNode::new(ScopeKind::Local, enclosing), names)
    }

    /// Create a Block scope. Block scopes always have an enclosing scope.
    pub fn new_block(&mut self, enclosing: ScopeId, names: &[InternedString]) -> ScopeId {
        self.alloc(ScopeNode::new(ScopeKind::Block, Some(enclosing)), names)
    }

    /// Create an Eval scope: constructed like a Block scope, tagged Eval.
    pub fn new_eval(&mut self, enclosing: ScopeId, names: &[InternedString]) -> ScopeId {
        self.alloc(ScopeNode::new(ScopeKind::Eval, Some(enclosing)), names)
    }

    /// Mark a scope as created for a method/lambda parameter list.
    pub fn set_argument_scope(&mut self, id: ScopeId, value: bool) {
        self.get_mut(id).is_argument_scope = value;
    }

    /// Record where keyword-argument slots begin in a scope.
    pub fn set_keyword_arg_index(&mut self, id: ScopeId, slot: u32) {
        self.get_mut(id).keyword_arg_index = Some(slot);
    }

    /// Attach the namespace a Local scope executes against.
    pub fn bind_module(&mut self, id: ScopeId, binding: ModuleBinding) {
        debug_assert_eq!(self.get(id).kind, ScopeKind::Local, "only local scopes bind a module");
        self.get_mut(id).bound_module = Some(binding);
    }

    /// The nearest scope that answers "where do plain locals land".
    ///
    /// Local and Eval scopes return themselves; a Block scope delegates
    /// to its enclosing scope. Eval returning itself is intentional: it
    /// caps the query at the eval boundary even though the scope is
    /// block-like for traversal.
    pub fn local_scope(&self, id: ScopeId) -> ScopeId {
        let mut current = id;
        loop {
            let node = self.get(current);
            match node.kind {
                ScopeKind::Local | ScopeKind::Eval => return current,
                ScopeKind::Block => {
                    // Invariant: block scopes always have an enclosing scope.
                    current = node.enclosing.expect("block scope without enclosing scope");
                }
            }
        }
    }
}

/// The process-wide scope for contexts with no real lexical scope: a
/// Local scope with no enclosing scope and the sentinel module binding.
#[derive(Debug)]
pub struct DummyScope {
    arena: ScopeArena,
    root: ScopeId,
}

impl DummyScope {
    pub fn arena(&self) -> &ScopeArena {
        &self.arena
    }

    pub fn root(&self) -> ScopeId {
        self.root
    }
}

/// Shared read-only singleton; constructed at most once and never
/// mutated afterwards, so concurrent readers need no locking.
pub fn dummy_scope() -> &'static DummyScope {
    static DUMMY: OnceLock<DummyScope> = OnceLock::new();
    DUMMY.get_or_init(|| {
        let mut arena = ScopeArena::new();
        let root = arena.new_local(None, &[]);
        arena.bind_module(root, ModuleBinding::Root);
        DummyScope { arena, root }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use beryl_core::intern::StringInterner;

    #[test]
    fn test_local_scope_dispatch() {
        let interner = StringInterner::new();
        let mut arena = ScopeArena::new();
        let method = arena.new_local(None, &[interner.intern("a")]);
        let block = arena.new_block(method, &[]);
        let inner_block = arena.new_block(block, &[]);
        let eval = arena.new_eval(block, &[]);

        assert_eq!(arena.local_scope(method), method);
        assert_eq!(arena.local_scope(block), method);
        assert_eq!(arena.local_scope(inner_block), method);
        // Eval terminates the query at itself
        assert_eq!(arena.local_scope(eval), eval);
    }

    #[test]
    fn test_block_like() {
        let mut arena = ScopeArena::new();
        let local = arena.new_local(None, &[]);
        let block = arena.new_block(local, &[]);
        let eval = arena.new_eval(local, &[]);
        assert!(!arena.get(local).is_block_like());
        assert!(arena.get(block).is_block_like());
        assert!(arena.get(eval).is_block_like());
    }

    #[test]
    fn test_prepopulated_names_get_slots_in_order() {
        let interner = StringInterner::new();
        let (x, y) = (interner.intern("x"), interner.intern("y"));
        let mut arena = ScopeArena::new();
        let scope = arena.new_local(None, &[x, y]);
        assert_eq!(arena.get(scope).exists(x), Some(0));
        assert_eq!(arena.get(scope).exists(y), Some(1));
        assert_eq!(arena.get(scope).var_count(), 2);
    }

    #[test]
    fn test_argument_scope_metadata() {
        let interner = StringInterner::new();
        let names = [
            interner.intern("a"),
            interner.intern("b"),
            interner.intern("key"),
        ];
        let mut arena = ScopeArena::new();
        let method = arena.new_local(None, &names);
        arena.set_argument_scope(method, true);
        // Keyword arguments occupy a contiguous tail of the slot range
        arena.set_keyword_arg_index(method, 2);
        arena.bind_module(method, ModuleBinding::Named(interner.intern("Widget")));

        let node = arena.get(method);
        assert!(node.is_argument_scope());
        assert_eq!(node.keyword_arg_index(), Some(2));
        assert_eq!(
            node.bound_module(),
            Some(ModuleBinding::Named(interner.intern("Widget")))
        );
    }

    #[test]
    fn test_dummy_scope_is_singleton() {
        let a = dummy_scope();
        let b = dummy_scope();
        assert!(std::ptr::eq(a, b));
        let root = a.arena().get(a.root());
        assert_eq!(root.kind(), ScopeKind::Local);
        assert_eq!(root.enclosing(), None);
        assert_eq!(root.bound_module(), Some(ModuleBinding::Root));
        assert_eq!(root.var_count(), 0);
    }
}
