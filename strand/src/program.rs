//! Program state.
use log::debug;
use smol_str::SmolStr;

use crate::{
    arena::Arena,
    constants::ENTRY_POINT,
    error::{ErrorKind, StrandError, StrandResult},
    function::{CallStack, Frame, Function, FunctionId, FunctionTable, Syscall},
    interp::InterpConf,
    lex::{Token, TokenIndex, TokenKind, TokenStream},
    scope::{Scopes, VarRef},
    types::{infer_type, Type},
    value::Value,
};

/// Core state of a single interpretation run.
pub struct Program {
    // ------------------------------------------------------------------------
    // Memory
    /// Backing memory for every variable.
    pub(crate) arena: Arena,
    /// Parameter scopes and call activations.
    pub(crate) scopes: Scopes,

    // ------------------------------------------------------------------------
    // Functions
    /// Syscalls first, then user functions in source order.
    pub(crate) functions: FunctionTable,
    /// Return positions of active calls.
    pub(crate) call_stack: CallStack,
}

impl Program {
    pub fn new(conf: &InterpConf) -> Self {
        Self {
            arena: Arena::new(conf.arena_size),
            scopes: Scopes::new(conf.max_variables),
            functions: FunctionTable::new(conf.max_functions),
            call_stack: CallStack::new(conf.max_call_depth),
        }
    }

    #[inline]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    #[inline]
    pub fn scopes(&self) -> &Scopes {
        &self.scopes
    }

    #[inline]
    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    #[inline]
    pub fn call_stack(&self) -> &CallStack {
        &self.call_stack
    }

    /// Fill the function table before execution starts.
    ///
    /// Registers the syscalls, then every function definition in the
    /// token stream together with its parameters. Returns the entry point.
    pub fn scan_functions(&mut self, tokens: &TokenStream) -> StrandResult<FunctionId> {
        for syscall in Syscall::ALL {
            let scope = self.scopes.push(None);
            self.scopes
                .declare(&mut self.arena, scope, syscall.param_name(), None, false, None)?;
            self.functions.add(Function {
                name: SmolStr::from(syscall.name()),
                syscall: Some(*syscall),
                param_count: 1,
                top_scope: scope,
                token: None,
            })?;
        }

        for (index, token) in tokens.function_defs() {
            let scope = self.scopes.push(None);
            let id = self
                .functions
                .add(Function {
                    name: token.text.clone(),
                    syscall: None,
                    param_count: 0,
                    top_scope: scope,
                    token: Some(index),
                })
                .map_err(|err| err.at(token.line))?;

            let param_count = self.scan_params(tokens, index, id)?;
            debug!("function {}: {param_count} parameter(s)", token.text);
        }

        self.functions.find(ENTRY_POINT).ok_or_else(|| {
            StrandError::new(ErrorKind::Startup(format!(
                "{ENTRY_POINT} function was not defined"
            )))
        })
    }

    /// Declare the parameters of a function definition `name :: (a : int, b : string) {`.
    fn scan_params(
        &mut self,
        tokens: &TokenStream,
        def: TokenIndex,
        function: FunctionId,
    ) -> StrandResult<usize> {
        // Skip over `name :: (`
        let mut index = def + 4;
        let scope = self.functions.get(function).top_scope;

        while !tokens.is_kind(index, TokenKind::RightParen) {
            let name = tokens.expect(index, TokenKind::Ident)?;
            tokens.expect(index + 1, TokenKind::Colon)?;
            index += 2;

            let is_pointer = tokens.is_kind(index, TokenKind::Ampersand);
            if is_pointer {
                index += 1;
            }

            let ty_token = match tokens.get(index) {
                Some(token) if token.is_ident() => token,
                _ if is_pointer => {
                    return Err(StrandError::type_error(format!(
                        "pointer parameter '{}' declared without explicit type",
                        name.text
                    ))
                    .at(name.line))
                }
                _ => tokens.expect(index, TokenKind::Ident)?,
            };
            let ty = Type::resolve_name(&ty_token.text).map_err(|err| err.at(ty_token.line))?;
            index += 1;

            // Parameter storage belongs to each call's activation.
            self.scopes
                .declare(&mut self.arena, scope, &name.text, Some(ty), is_pointer, None)
                .map_err(|err| err.at(name.line))?;
            self.functions.get_mut(function).param_count += 1;

            if tokens.is_kind(index, TokenKind::Comma) {
                index += 1;
                tokens.expect(index, TokenKind::Ident)?;
            } else {
                tokens.expect(index, TokenKind::RightParen)?;
            }
        }

        tokens.expect(index + 1, TokenKind::LeftBrace)?;

        Ok(self.functions.get(function).param_count)
    }
}

/// Variables and values.
impl Program {
    /// Find a variable visible in the frame.
    #[inline]
    pub fn resolve(&self, frame: Frame, name: &str) -> Option<VarRef> {
        self.scopes.resolve(frame.scope, name)
    }

    /// Infer the type of literal or identifier text, in the frame.
    pub fn infer_type(&self, frame: Frame, text: &str) -> StrandResult<Type> {
        infer_type(text, |name| {
            self.resolve(frame, name)
                .and_then(|var| self.scopes.var(var).ty)
        })
    }

    /// Read the current value of a variable.
    pub fn load(&self, var: VarRef) -> StrandResult<Value> {
        let variable = self.scopes.var(var);
        match (variable.ty, variable.storage) {
            (Some(ty), Some(handle)) => Ok(Value::decode(ty, self.arena.bytes(handle))),
            _ => Err(StrandError::type_error(format!(
                "variable '{}' is used before it has a value",
                variable.name
            ))),
        }
    }

    /// Write a value to a variable.
    ///
    /// A variable without a type takes on the value's type, and is
    /// given storage sized for the value.
    pub fn store(&mut self, var: VarRef, value: &Value) -> StrandResult<()> {
        let variable = self.scopes.var(var);

        let handle = match (variable.ty, variable.storage) {
            (Some(ty), _) if ty != value.ty() => {
                return Err(StrandError::type_error(format!(
                    "can't assign {} value to {ty} variable '{}'",
                    value.ty(),
                    variable.name
                )))
            }
            (_, Some(handle)) => handle,
            (_, None) => {
                self.scopes
                    .allocate(&mut self.arena, var, value.ty(), value.storage_size())?
            }
        };

        value
            .encode(self.arena.bytes_mut(handle))
            .map_err(|_| {
                StrandError::type_error(format!(
                    "value is too large for the storage of '{}'",
                    self.scopes.var(var).name
                ))
            })
    }

    /// Value of a literal or identifier operand.
    ///
    /// Literals are typed by inference.
    pub fn operand_value(&self, frame: Frame, token: &Token) -> StrandResult<Value> {
        if token.is_ident() {
            let var = self
                .resolve(frame, &token.text)
                .ok_or_else(|| StrandError::unresolved("variable", &token.text))?;
            self.load(var)
        } else {
            let ty = self.infer_type(frame, &token.text)?;
            Value::from_literal(&token.text, ty)
        }
    }

    /// Value of an operand that must have the given type.
    ///
    /// Literals are parsed as that type instead of being inferred.
    pub fn typed_operand_value(&self, frame: Frame, token: &Token, ty: Type) -> StrandResult<Value> {
        if token.is_literal() {
            return Value::from_literal(&token.text, ty);
        }

        let value = self.operand_value(frame, token)?;
        if value.ty() != ty {
            return Err(StrandError::type_error(format!(
                "expected {ty} value, '{}' is {}",
                token.text,
                value.ty()
            )));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn small_conf() -> InterpConf {
        InterpConf {
            arena_size: 1024,
            ..InterpConf::default()
        }
    }

    #[test]
    fn test_scan_functions() {
        let tokens =
            TokenStream::from_source("add :: (a : int, b : &int) { }\nmain :: () { add(1, 2); }")
                .unwrap();
        let mut program = Program::new(&small_conf());
        let main = program.scan_functions(&tokens).unwrap();

        let names = program
            .functions()
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["print", "add", "main"]);
        assert_eq!(program.functions().get(main).name, "main");

        let add = program.functions().get(program.functions().find("add").unwrap());
        assert_eq!(add.param_count, 2);
        let params = program.scopes().get(add.top_scope).variables();
        assert_eq!(params[0].name, "a");
        assert_eq!(params[0].ty, Some(Type::S64));
        assert!(!params[0].is_pointer);
        assert_eq!(params[1].name, "b");
        assert!(params[1].is_pointer);

        // Parameter declarations don't take arena memory.
        assert_eq!(program.arena().used(), 0);
    }

    #[test]
    fn test_missing_main() {
        let tokens = TokenStream::from_source("f :: () { }").unwrap();
        let err = Program::new(&small_conf()).scan_functions(&tokens).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Startup(_)));
    }

    #[test]
    fn test_bad_parameter_list() {
        for source in [
            "main :: (a int) { }",
            "main :: (a : ) { }",
            "main :: (a : int b : int) { }",
            "main :: (a : number) { }",
            "main :: (a : &) { }",
            "main :: (a : int, a : int) { }",
            "main :: (a : int,) { }",
        ] {
            let tokens = TokenStream::from_source(source).unwrap();
            let result = Program::new(&small_conf()).scan_functions(&tokens);
            assert!(result.is_err(), "{source}");
        }
    }

    #[test]
    fn test_store_and_load() {
        let mut program = Program::new(&small_conf());
        let scope = program.scopes.push(None);
        let x = program
            .scopes
            .declare(&mut program.arena, scope, "x", Some(Type::S64), false, Some(8))
            .unwrap();

        program.store(x, &Value::S64(5)).unwrap();
        assert_eq!(program.load(x).unwrap(), Value::S64(5));
        assert!(program.store(x, &Value::U64(5)).is_err());

        let handle = program.scopes().var(x).storage.unwrap();
        assert_eq!(program.arena().bytes(handle), 5i64.to_le_bytes());
    }

    #[test]
    fn test_store_fixes_type() {
        let mut program = Program::new(&small_conf());
        let scope = program.scopes.push(None);
        let s = program
            .scopes
            .declare(&mut program.arena, scope, "s", None, false, None)
            .unwrap();
        assert!(program.load(s).is_err());

        program.store(s, &Value::Str("hey".to_string())).unwrap();
        assert_eq!(program.scopes().var(s).ty, Some(Type::String));
        assert_eq!(program.arena().used(), 4);

        assert!(program.store(s, &Value::Str("hi".to_string())).is_ok());
        assert!(program.store(s, &Value::Str("hello".to_string())).is_err());
        assert_eq!(program.load(s).unwrap(), Value::Str("hi".to_string()));
    }
}
