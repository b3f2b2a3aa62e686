//! Block scope arena.
//!
//! Every block in the AST gets exactly one scope, allocated during
//! the scope-linking pre-pass. Scopes form a chain through parent
//! handles; back references to the owning function and loop never
//! form cycles because declarations always exist before the nodes
//! that reference them.

use ifjc_par::ast::NodeId;
use rustc_hash::FxHashMap;

/// Handle of a scope in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

/// One block scope.
#[derive(Debug, Default)]
pub struct Scope {
    /// Enclosing scope, `None` at global scope.
    pub parent: Option<ScopeId>,
    /// Name → variable declaration id.
    pub variables: FxHashMap<String, NodeId>,
    /// Owning function declaration when this is a function body.
    pub function: Option<NodeId>,
    /// True when this is the body of a `while`/`for` loop.
    pub is_loop_body: bool,
    /// The owning loop's label id, filled in when the loop statement
    /// is analysed (before its body).
    pub loop_id: NodeId,
}

/// Arena of all scopes of one compilation.
#[derive(Debug, Default)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    /// Allocates a fresh scope chained to `parent`.
    pub fn alloc(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent,
            ..Scope::default()
        });
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }

    /// Resolves a variable name up the scope chain.
    pub fn lookup_variable(&self, name: &str, from: ScopeId) -> Option<NodeId> {
        let mut current = Some(from);

        while let Some(id) = current {
            let scope = self.get(id);
            if let Some(&decl) = scope.variables.get(name) {
                return Some(decl);
            }
            current = scope.parent;
        }

        None
    }

    /// Returns true when `name` is declared directly in `scope`.
    pub fn declares_locally(&self, name: &str, scope: ScopeId) -> bool {
        self.get(scope).variables.contains_key(name)
    }

    /// Finds the nearest enclosing function declaration, walking the
    /// whole chain.
    pub fn nearest_function(&self, from: ScopeId) -> Option<NodeId> {
        let mut current = Some(from);

        while let Some(id) = current {
            let scope = self.get(id);
            if let Some(function) = scope.function {
                return Some(function);
            }
            current = scope.parent;
        }

        None
    }

    /// Finds the nearest enclosing loop body scope.
    pub fn nearest_loop(&self, from: ScopeId) -> Option<ScopeId> {
        let mut current = Some(from);

        while let Some(id) = current {
            let scope = self.get(id);
            if scope.is_loop_body {
                return Some(id);
            }
            current = scope.parent;
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_chain() {
        let mut arena = ScopeArena::new();
        let global = arena.alloc(None);
        let inner = arena.alloc(Some(global));

        arena.get_mut(global).variables.insert("a".to_string(), 1);
        arena.get_mut(inner).variables.insert("b".to_string(), 2);

        assert_eq!(arena.lookup_variable("a", inner), Some(1));
        assert_eq!(arena.lookup_variable("b", inner), Some(2));
        assert_eq!(arena.lookup_variable("b", global), None);
        assert_eq!(arena.lookup_variable("c", inner), None);
    }

    #[test]
    fn test_shadowing_resolves_to_nearest() {
        let mut arena = ScopeArena::new();
        let global = arena.alloc(None);
        let inner = arena.alloc(Some(global));

        arena.get_mut(global).variables.insert("x".to_string(), 1);
        arena.get_mut(inner).variables.insert("x".to_string(), 9);

        assert_eq!(arena.lookup_variable("x", inner), Some(9));
        assert_eq!(arena.lookup_variable("x", global), Some(1));
    }

    #[test]
    fn test_nearest_function_and_loop() {
        let mut arena = ScopeArena::new();
        let global = arena.alloc(None);
        let body = arena.alloc(Some(global));
        let loop_body = arena.alloc(Some(body));

        arena.get_mut(body).function = Some(7);
        arena.get_mut(loop_body).is_loop_body = true;

        assert_eq!(arena.nearest_function(loop_body), Some(7));
        assert_eq!(arena.nearest_function(global), None);
        assert_eq!(arena.nearest_loop(loop_body), Some(loop_body));
        assert_eq!(arena.nearest_loop(body), None);
    }
}
