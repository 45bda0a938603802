//! Variables and scope chains.
use log::trace;
use smol_str::SmolStr;

use crate::{
    arena::{Arena, Handle},
    error::{StrandError, StrandResult},
    types::Type,
};

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: SmolStr,
    /// Not known yet when the variable is declared with `:=` and
    /// initialized by an expression. Fixed by the first value stored.
    pub ty: Option<Type>,
    /// Declared with `&`. Storage is still that of the pointee type.
    pub is_pointer: bool,
    /// Arena memory exclusively owned by this variable.
    pub storage: Option<Handle>,
}

/// Identifier of a scope in [`Scopes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeId(usize);

/// Location of a variable, its scope and declaration slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarRef {
    pub scope: ScopeId,
    pub slot: usize,
}

#[derive(Debug, Default)]
pub struct Scope {
    /// Variables in declaration order. Names are unique.
    variables: Vec<Variable>,
    /// Enclosing scope, searched when a name isn't found here.
    up: Option<ScopeId>,
}

impl Scope {
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn up(&self) -> Option<ScopeId> {
        self.up
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|var| var.name == name)
    }
}

/// Storage for all scopes created during a run.
///
/// Scopes are never removed. A scope that is no longer used, such
/// as the activation of a function that returned, simply stays behind
/// together with its arena memory.
pub struct Scopes {
    scopes: Vec<Scope>,
    max_variables: usize,
}

impl Scopes {
    pub fn new(max_variables: usize) -> Self {
        Self {
            scopes: vec![],
            max_variables,
        }
    }

    /// Create an empty scope chained to `up`.
    pub fn push(&mut self, up: Option<ScopeId>) -> ScopeId {
        self.scopes.push(Scope {
            variables: vec![],
            up,
        });
        ScopeId(self.scopes.len() - 1)
    }

    #[inline]
    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    /// All scopes, in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter()
    }

    #[inline]
    pub fn var(&self, var: VarRef) -> &Variable {
        &self.scopes[var.scope.0].variables[var.slot]
    }

    #[inline]
    pub fn var_mut(&mut self, var: VarRef) -> &mut Variable {
        &mut self.scopes[var.scope.0].variables[var.slot]
    }

    /// Add a variable to the scope.
    ///
    /// Storage is allocated from the arena when `size` is given. Otherwise
    /// it's left for [`Scopes::allocate`], once the type is known.
    ///
    /// # Errors
    ///
    /// Fails if the name is already declared in this scope, the
    /// scope is full, or the arena is exhausted.
    pub fn declare(
        &mut self,
        arena: &mut Arena,
        scope: ScopeId,
        name: &str,
        ty: Option<Type>,
        is_pointer: bool,
        size: Option<usize>,
    ) -> StrandResult<VarRef> {
        let max_variables = self.max_variables;
        let target = &mut self.scopes[scope.0];

        if target.find(name).is_some() {
            return Err(StrandError::type_error(format!(
                "variable '{name}' is already declared in this scope"
            )));
        }
        if target.variables.len() >= max_variables {
            return Err(StrandError::exhausted("variable slots in scope"));
        }

        let storage = match size {
            Some(size) => Some(arena.alloc(size)?),
            None => None,
        };

        trace!("declare {name}: {ty:?} {storage:?}");
        target.variables.push(Variable {
            name: SmolStr::from(name),
            ty,
            is_pointer,
            storage,
        });

        Ok(VarRef {
            scope,
            slot: target.variables.len() - 1,
        })
    }

    /// Fix the type of a variable and give it storage.
    pub fn allocate(
        &mut self,
        arena: &mut Arena,
        var: VarRef,
        ty: Type,
        size: usize,
    ) -> StrandResult<Handle> {
        let handle = arena.alloc(size)?;
        let variable = self.var_mut(var);
        variable.ty = Some(ty);
        variable.storage = Some(handle);
        Ok(handle)
    }

    /// Find a variable by name, starting at `scope` and
    /// walking outwards through the chain.
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Option<VarRef> {
        let mut current = Some(scope);

        while let Some(id) = current {
            let scope = self.get(id);
            if let Some(slot) = scope.find(name) {
                return Some(VarRef { scope: id, slot });
            }
            current = scope.up;
        }

        None
    }
}
