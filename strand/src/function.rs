//! Function table and call stack.
use std::io::Write;

use smol_str::SmolStr;

use crate::{
    error::{StrandError, StrandResult},
    lex::TokenIndex,
    scope::ScopeId,
    value::Value,
};

/// Built-in function implemented by the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    Print,
}

impl Syscall {
    /// All syscalls, in the order they are registered.
    pub const ALL: &'static [Syscall] = &[Syscall::Print];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Print => "print",
        }
    }

    /// Name of the single parameter each syscall takes.
    ///
    /// The parameter is untyped, arguments of any type are accepted.
    pub fn param_name(&self) -> &'static str {
        match self {
            Self::Print => "value",
        }
    }

    pub fn invoke(&self, args: &[Value], out: &mut dyn Write) -> StrandResult<()> {
        match self {
            Self::Print => {
                for arg in args {
                    arg.print(out)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug)]
pub struct Function {
    pub name: SmolStr,
    pub syscall: Option<Syscall>,
    pub param_count: usize,
    /// Parameter declarations made by the pre-scan, in order.
    ///
    /// Each call binds its arguments in a fresh scope built from
    /// these declarations.
    pub top_scope: ScopeId,
    /// Identifier token of the definition. Syscalls have none.
    pub token: Option<TokenIndex>,
}

/// Identifier of a function in the [`FunctionTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionId(usize);

/// Flat registry of all functions in declaration order.
pub struct FunctionTable {
    functions: Vec<Function>,
    max_functions: usize,
}

impl FunctionTable {
    pub fn new(max_functions: usize) -> Self {
        Self {
            functions: vec![],
            max_functions,
        }
    }

    pub fn add(&mut self, function: Function) -> StrandResult<FunctionId> {
        if self.find(&function.name).is_some() {
            return Err(StrandError::type_error(format!(
                "function '{}' is already defined",
                function.name
            )));
        }
        if self.functions.len() >= self.max_functions {
            return Err(StrandError::exhausted("function table slots"));
        }

        self.functions.push(function);
        Ok(FunctionId(self.functions.len() - 1))
    }

    pub fn find(&self, name: &str) -> Option<FunctionId> {
        self.functions
            .iter()
            .position(|function| function.name == name)
            .map(FunctionId)
    }

    #[inline]
    pub fn get(&self, id: FunctionId) -> &Function {
        &self.functions[id.0]
    }

    #[inline]
    pub fn get_mut(&mut self, id: FunctionId) -> &mut Function {
        &mut self.functions[id.0]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter()
    }
}

/// Executing function and the scope its names resolve in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub function: FunctionId,
    pub scope: ScopeId,
}

/// Saved caller state, restored when the callee returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Token after the call's closing parenthesis.
    pub resume: TokenIndex,
    /// Frame of the caller.
    pub frame: Frame,
}

/// Stack of return positions, one per active user function call.
pub struct CallStack {
    stack: Vec<Position>,
    max_depth: usize,
}

impl CallStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            stack: vec![],
            max_depth,
        }
    }

    pub fn push(&mut self, position: Position) -> StrandResult<()> {
        if self.stack.len() >= self.max_depth {
            return Err(StrandError::exhausted("call stack"));
        }
        self.stack.push(position);
        Ok(())
    }

    #[inline]
    pub fn pop(&mut self) -> Option<Position> {
        self.stack.pop()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scope::Scopes;

    fn user_function(name: &str, top_scope: ScopeId) -> Function {
        Function {
            name: SmolStr::from(name),
            syscall: None,
            param_count: 0,
            top_scope,
            token: Some(0),
        }
    }

    #[test]
    fn test_function_table() {
        let mut scopes = Scopes::new(4);
        let mut table = FunctionTable::new(2);

        let a = table.add(user_function("a", scopes.push(None))).unwrap();
        assert!(table.add(user_function("a", scopes.push(None))).is_err());
        let b = table.add(user_function("b", scopes.push(None))).unwrap();
        assert!(table.add(user_function("c", scopes.push(None))).is_err());

        assert_eq!(table.find("a"), Some(a));
        assert_eq!(table.find("b"), Some(b));
        assert_eq!(table.find("c"), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_call_stack_restores_positions() {
        let mut scopes = Scopes::new(4);
        let mut table = FunctionTable::new(4);
        let main = table.add(user_function("main", scopes.push(None))).unwrap();
        let f = table.add(user_function("f", scopes.push(None))).unwrap();

        let frame_main = Frame {
            function: main,
            scope: scopes.push(None),
        };
        let frame_f = Frame {
            function: f,
            scope: scopes.push(None),
        };

        let mut stack = CallStack::new(8);
        stack.push(Position { resume: 10, frame: frame_main }).unwrap();
        stack.push(Position { resume: 20, frame: frame_f }).unwrap();
        assert_eq!(stack.depth(), 2);

        assert_eq!(stack.pop(), Some(Position { resume: 20, frame: frame_f }));
        assert_eq!(stack.pop(), Some(Position { resume: 10, frame: frame_main }));
        assert!(stack.is_empty());
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn test_call_stack_overflow() {
        let mut scopes = Scopes::new(4);
        let frame = Frame {
            function: FunctionId(0),
            scope: scopes.push(None),
        };

        let mut stack = CallStack::new(1);
        stack.push(Position { resume: 0, frame }).unwrap();
        let err = stack.push(Position { resume: 0, frame }).unwrap_err();
        assert!(matches!(err.kind, crate::error::ErrorKind::Exhausted(_)));
    }

    #[test]
    fn test_print_syscall() {
        let mut out = Vec::new();
        Syscall::Print
            .invoke(&[Value::Str("n=".to_string()), Value::U64(3)], &mut out)
            .unwrap();
        assert_eq!(out, b"n=3\n");
    }
}
