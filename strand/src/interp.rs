//! Statement interpreter.
use std::{fmt, io::Write};

use log::{debug, trace};

#[cfg(feature = "serde")]
use serde::Deserialize;

use crate::{
    constants::*,
    error::{ErrorKind, StrandError, StrandResult},
    expr::{eval_binary, Binary},
    function::{Frame, FunctionId, Position},
    lex::{IdentKind, Token, TokenIndex, TokenKind, TokenStream},
    program::Program,
    scope::{ScopeId, VarRef},
    types::Type,
};

/// Interpreter Configuration Parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InterpConf {
    /// Bytes reserved for variable storage.
    pub arena_size: usize,
    pub max_functions: usize,
    /// Variables allowed in a single scope.
    pub max_variables: usize,
    pub max_call_depth: usize,
}

impl Default for InterpConf {
    fn default() -> Self {
        Self {
            arena_size: ARENA_SIZE,
            max_functions: MAX_FUNCTIONS,
            max_variables: MAX_VARIABLES,
            max_call_depth: STACK_SIZE,
        }
    }
}

/// Outcome of a single interpreter step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Ok,
    /// Execution jumped into a user function.
    Call,
    /// Execution jumped back to the caller.
    Return,
    /// The entry point returned, or the end of the source was reached.
    Exit,
}

/// Right hand side of a declaration or assignment.
#[derive(Debug, Clone, Copy)]
enum Rhs<'a> {
    Literal(&'a Token),
    Ident(&'a Token),
    Binary(Binary<'a>),
}

/// Token walking interpreter.
///
/// There is no syntax tree. Statements are recognised and executed
/// directly from the token stream, and calls jump around in it.
pub struct Interp {
    conf: InterpConf,
    file_name: String,
    tokens: TokenStream,
    program: Program,
    /// Token being executed. `None` once the run is over.
    cursor: Option<TokenIndex>,
    /// Function and scope currently executing.
    frame: Option<Frame>,
}

impl Interp {
    pub fn new(conf: InterpConf) -> Self {
        Interp {
            program: Program::new(&conf),
            tokens: TokenStream::default(),
            file_name: String::new(),
            cursor: None,
            frame: None,
            conf,
        }
    }

    /// Configuration that was used to instantiate the interpreter.
    pub fn config(&self) -> &InterpConf {
        &self.conf
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn tokens(&self) -> &TokenStream {
        &self.tokens
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Hex listing of the arena memory used so far.
    pub fn dump_arena(&self) -> Result<String, fmt::Error> {
        self.program.arena().dump()
    }

    /// Current function and scope, while the program runs.
    pub fn frame(&self) -> Option<Frame> {
        self.frame
    }

    /// Lex the source, register its functions and prepare to run `main`.
    ///
    /// Any previously loaded program is discarded.
    pub fn load_source(&mut self, file_name: &str, source_code: &str) -> StrandResult<()> {
        self.program = Program::new(&self.conf);
        self.file_name = file_name.to_owned();
        self.cursor = None;
        self.frame = None;

        self.tokens = TokenStream::from_source(source_code)?;
        let main = self.program.scan_functions(&self.tokens)?;
        debug!(
            "{}: {} tokens, {} functions",
            self.file_name,
            self.tokens.len(),
            self.program.functions.len()
        );

        let entry = self.program.functions.get(main);
        if entry.param_count != 0 {
            let line = entry.token.map(|index| self.tokens.line(index));
            return Err(StrandError {
                kind: ErrorKind::Startup(format!("{ENTRY_POINT} can't take parameters")),
                line,
            });
        }

        let scope = self.program.scopes.push(None);
        self.frame = Some(Frame {
            function: main,
            scope,
        });
        self.cursor = Some(self.body_start(main)?);

        Ok(())
    }

    /// Run the loaded program to completion.
    ///
    /// Output of `print` is written to `out`.
    pub fn execute(&mut self, out: &mut dyn Write) -> StrandResult<()> {
        loop {
            if self.step(out)? == Flow::Exit {
                break;
            }
        }
        out.flush()?;

        Ok(())
    }

    /// Execute the statement at the cursor.
    pub fn step(&mut self, out: &mut dyn Write) -> StrandResult<Flow> {
        let (index, frame) = match (self.cursor, self.frame) {
            (Some(index), Some(frame)) if index < self.tokens.len() => (index, frame),
            _ => return Ok(self.finish()),
        };

        let token = &self.tokens[index];
        let result = match (token.kind, token.ident) {
            (TokenKind::RightBrace, _) => Ok(self.exec_return()),
            (TokenKind::Ident, IdentKind::VarOrType) => self.exec_variable(index, frame),
            (TokenKind::Ident, IdentKind::FuncCall) => self.exec_call(index, frame, out),
            _ => {
                self.cursor = Some(index + 1);
                Ok(Flow::Ok)
            }
        };

        result.map_err(|err| err.at(self.tokens.line(index)))
    }

    fn finish(&mut self) -> Flow {
        self.cursor = None;
        self.frame = None;
        self.program.call_stack.clear();
        Flow::Exit
    }

    /// Token after the opening brace of a function's body.
    fn body_start(&self, function: FunctionId) -> StrandResult<TokenIndex> {
        let def = self.program.functions.get(function).token.unwrap_or_default();
        self.tokens
            .find_from(def, TokenKind::LeftBrace)
            .map(|brace| brace + 1)
            .ok_or_else(|| StrandError::lex("function has no body").at(self.tokens.line(def)))
    }
}

/// Variables.
impl Interp {
    /// Declaration `x : int = 1;` or assignment `x = 1;`.
    fn exec_variable(&mut self, index: TokenIndex, frame: Frame) -> StrandResult<Flow> {
        let next = match self.tokens.get(index + 1) {
            Some(token) => token.kind,
            None => return Err(unexpected(&self.tokens, index + 1, "':' or '='")),
        };

        let end = match next {
            TokenKind::Colon => self.exec_declaration(index, frame)?,
            TokenKind::Eq => self.exec_assignment(index, frame)?,
            _ => return Err(unexpected(&self.tokens, index + 1, "':' or '='")),
        };

        self.cursor = Some(end);
        Ok(Flow::Ok)
    }

    /// Returns the index after the statement's semicolon.
    fn exec_declaration(&mut self, index: TokenIndex, frame: Frame) -> StrandResult<TokenIndex> {
        let tokens = &self.tokens;
        let name = &tokens[index].text;
        let mut cursor = index + 2;

        let is_pointer = tokens.is_kind(cursor, TokenKind::Ampersand);
        if is_pointer {
            cursor += 1;
        }

        let declared = match tokens.get(cursor) {
            Some(token) if token.is_ident() => {
                cursor += 1;
                Some(Type::resolve_name(&token.text)?)
            }
            _ => None,
        };
        if is_pointer && declared.is_none() {
            return Err(StrandError::type_error(format!(
                "pointer '{name}' declared without explicit type"
            )));
        }

        if tokens.is_kind(cursor, TokenKind::Semicolon) {
            let ty = match declared {
                Some(Type::String) => {
                    return Err(StrandError::type_error(format!(
                        "string '{name}' declared without initializer"
                    )))
                }
                Some(ty) => ty,
                None => {
                    return Err(StrandError::type_error(format!(
                        "variable '{name}' declared without type or initializer"
                    )))
                }
            };
            self.program.scopes.declare(
                &mut self.program.arena,
                frame.scope,
                name,
                Some(ty),
                is_pointer,
                ty.byte_width(),
            )?;
            trace!("{name}: {ty}");
            return Ok(cursor + 1);
        }

        tokens.expect(cursor, TokenKind::Eq)?;
        let (rhs, end) = parse_rhs(&self.tokens, cursor + 1)?;

        let value = match (rhs, declared) {
            (Rhs::Binary(expr), Some(Type::String)) => {
                return Err(StrandError::type_error(format!(
                    "string '{name}' can't be initialized by '{}' expression",
                    expr.lhs.text
                )))
            }
            (Rhs::Binary(expr), declared) => {
                let size = declared.and_then(|ty| ty.byte_width());
                let var = self.program.scopes.declare(
                    &mut self.program.arena,
                    frame.scope,
                    name,
                    declared,
                    is_pointer,
                    size,
                )?;
                eval_binary(&mut self.program, frame, expr, var)?;
                trace!("{name} := {:?}", self.program.load(var).ok());
                return Ok(end);
            }
            (Rhs::Literal(token) | Rhs::Ident(token), Some(ty)) => {
                self.program.typed_operand_value(frame, token, ty)?
            }
            (Rhs::Literal(token) | Rhs::Ident(token), None) => {
                self.program.operand_value(frame, token)?
            }
        };

        let var = self.program.scopes.declare(
            &mut self.program.arena,
            frame.scope,
            name,
            Some(value.ty()),
            is_pointer,
            Some(value.storage_size()),
        )?;
        self.program.store(var, &value)?;
        trace!("{name} := {value:?}");

        Ok(end)
    }

    /// Returns the index after the statement's semicolon.
    fn exec_assignment(&mut self, index: TokenIndex, frame: Frame) -> StrandResult<TokenIndex> {
        let name = &self.tokens[index].text;
        let var = self
            .program
            .resolve(frame, name)
            .ok_or_else(|| StrandError::unresolved("variable", name))?;

        let (rhs, end) = parse_rhs(&self.tokens, index + 2)?;
        match rhs {
            Rhs::Binary(expr) => eval_binary(&mut self.program, frame, expr, var)?,
            Rhs::Literal(token) | Rhs::Ident(token) => {
                let value = match self.program.scopes.var(var).ty {
                    Some(ty) => self.program.typed_operand_value(frame, token, ty)?,
                    None => self.program.operand_value(frame, token)?,
                };
                self.program.store(var, &value)?;
            }
        }
        trace!("{name} = {:?}", self.program.load(var).ok());

        Ok(end)
    }
}

/// Calls and returns.
impl Interp {
    /// Call statement `name(a, b);`.
    fn exec_call(&mut self, index: TokenIndex, frame: Frame, out: &mut dyn Write) -> StrandResult<Flow> {
        let name = self.tokens[index].text.clone();
        let function = self
            .program
            .functions
            .find(&name)
            .ok_or_else(|| StrandError::unresolved("function", &name))?;

        let (args, close) = self.parse_args(index + 1)?;
        let resume = close + 1;

        let callee = self.program.functions.get(function);
        if args.len() != callee.param_count {
            return Err(StrandError::type_error(format!(
                "function '{name}' expects {} argument(s), got {}",
                callee.param_count,
                args.len()
            )));
        }

        if let Some(syscall) = callee.syscall {
            let values = args
                .iter()
                .map(|arg| self.program.operand_value(frame, &self.tokens[*arg]))
                .collect::<StrandResult<Vec<_>>>()?;

            trace!("syscall {} {values:?}", syscall.name());
            syscall.invoke(&values, out)?;
            self.cursor = Some(resume);
            return Ok(Flow::Ok);
        }

        let activation = self.bind_args(function, frame, &args)?;

        self.program.call_stack.push(Position { resume, frame })?;
        self.frame = Some(Frame {
            function,
            scope: activation,
        });
        self.cursor = Some(self.body_start(function)?);
        trace!("call {name}, depth {}", self.program.call_stack.depth());

        Ok(Flow::Call)
    }

    /// Parse `( a, b, ... )` starting at the opening parenthesis.
    ///
    /// Returns the argument token indices and the index of the
    /// closing parenthesis.
    fn parse_args(&self, open: TokenIndex) -> StrandResult<(Vec<TokenIndex>, TokenIndex)> {
        self.tokens.expect(open, TokenKind::LeftParen)?;

        let mut args = vec![];
        let mut cursor = open + 1;

        if self.tokens.is_kind(cursor, TokenKind::RightParen) {
            return Ok((args, cursor));
        }

        loop {
            match self.tokens.get(cursor) {
                Some(token) if token.is_operand() => args.push(cursor),
                _ => return Err(unexpected(&self.tokens, cursor, "argument")),
            }
            cursor += 1;

            if self.tokens.is_kind(cursor, TokenKind::Comma) {
                cursor += 1;
            } else {
                self.tokens.expect(cursor, TokenKind::RightParen)?;
                return Ok((args, cursor));
            }
        }
    }

    /// Create the callee's activation scope and bind the arguments
    /// to its parameters, left to right.
    ///
    /// Arguments are evaluated in the caller's frame.
    fn bind_args(
        &mut self,
        function: FunctionId,
        caller: Frame,
        args: &[TokenIndex],
    ) -> StrandResult<ScopeId> {
        let params = self.program.functions.get(function).top_scope;
        let activation = self.program.scopes.push(None);

        for (slot, arg) in args.iter().enumerate() {
            let param = self.program.scopes.var(VarRef {
                scope: params,
                slot,
            });
            let (name, ty, is_pointer) = (param.name.clone(), param.ty, param.is_pointer);

            let token = &self.tokens[*arg];
            let value = match ty {
                Some(ty) => self.program.typed_operand_value(caller, token, ty),
                None => self.program.operand_value(caller, token),
            }
            .map_err(|err| err.at(token.line))?;

            let var = self.program.scopes.declare(
                &mut self.program.arena,
                activation,
                &name,
                Some(value.ty()),
                is_pointer,
                Some(value.storage_size()),
            )?;
            self.program.store(var, &value)?;
        }

        Ok(activation)
    }

    /// Closing brace of a function body.
    fn exec_return(&mut self) -> Flow {
        match self.program.call_stack.pop() {
            Some(position) => {
                trace!("return, depth {}", self.program.call_stack.depth());
                self.cursor = Some(position.resume);
                self.frame = Some(position.frame);
                Flow::Return
            }
            // End of the entry point.
            None => self.finish(),
        }
    }
}

/// Parse the value of a statement, up to and including its semicolon.
///
/// Returns the value and the index after the semicolon.
fn parse_rhs(tokens: &TokenStream, start: TokenIndex) -> StrandResult<(Rhs<'_>, TokenIndex)> {
    let rest = tokens.tail(start);

    let (rhs, len) = match Binary::parse(rest) {
        Some(expr) => (Rhs::Binary(expr), 3),
        None => match rest.first() {
            Some(token) if token.is_literal() => (Rhs::Literal(token), 1),
            Some(token) if token.is_ident() => (Rhs::Ident(token), 1),
            _ => return Err(unexpected(tokens, start, "literal or identifier")),
        },
    };

    tokens.expect(start + len, TokenKind::Semicolon)?;
    Ok((rhs, start + len + 1))
}

#[inline(never)]
#[cold]
fn unexpected(tokens: &TokenStream, index: TokenIndex, expected: &str) -> StrandError {
    match tokens.get(index) {
        Some(token) => {
            StrandError::lex(format!("expected {expected}, found '{}'", token.text)).at(token.line)
        }
        None => StrandError::lex(format!("expected {expected}, found end of source"))
            .at(tokens.line(index)),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::value::Value;

    fn load(source_code: &str) -> Interp {
        let mut interp = Interp::new(InterpConf {
            arena_size: 4096,
            ..InterpConf::default()
        });
        interp.load_source("test.st", source_code).unwrap();
        interp
    }

    /// Run until `main` is about to return, so its scope can be inspected.
    fn run_to_end(interp: &mut Interp) -> Frame {
        let mut out = Vec::new();
        loop {
            let frame = interp.frame().unwrap();
            let at_end = interp.tokens().is_kind(interp.cursor.unwrap(), TokenKind::RightBrace)
                && interp.program().call_stack().is_empty();
            if at_end {
                return frame;
            }
            interp.step(&mut out).unwrap();
        }
    }

    fn value_of(interp: &Interp, frame: Frame, name: &str) -> Value {
        let var = interp.program().resolve(frame, name).unwrap();
        interp.program().load(var).unwrap()
    }

    #[test]
    fn test_declarations() {
        let mut interp = load(
            "main :: () { a : int; b : u8 = 7; c := 2.5; d : &uint = 3; e := b; f : double = 1; }",
        );
        let frame = run_to_end(&mut interp);

        assert_eq!(value_of(&interp, frame, "a"), Value::S64(0));
        assert_eq!(value_of(&interp, frame, "b"), Value::U8(7));
        assert_eq!(value_of(&interp, frame, "c"), Value::F64(2.5));
        assert_eq!(value_of(&interp, frame, "d"), Value::U64(3));
        assert_eq!(value_of(&interp, frame, "e"), Value::U8(7));
        assert_eq!(value_of(&interp, frame, "f"), Value::F64(1.0));

        let d = interp.program().resolve(frame, "d").unwrap();
        assert!(interp.program().scopes().var(d).is_pointer);
        // 8 + 1 + 8 + 8 + 1 + 8
        assert_eq!(interp.program().arena().used(), 34);
    }

    #[test]
    fn test_assignment_converts_result() {
        let mut interp = load("main :: () { x : float = 0.0; x = 3 * 4; y : int = 1; y = x; }");
        let mut out = Vec::new();
        let err = interp.execute(&mut out).unwrap_err();
        // `y = x` assigns a float variable to an int one.
        assert!(matches!(err.kind, ErrorKind::Type(_)));

        let mut interp = load("main :: () { x : float = 0.0; x = 3 * 4; }");
        let frame = run_to_end(&mut interp);
        assert_eq!(value_of(&interp, frame, "x"), Value::F64(12.0));
    }

    #[test]
    fn test_redeclaration() {
        let mut interp = load("main :: () {\n x := 1;\n x := 2;\n}");
        let err = interp.execute(&mut Vec::new()).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Type(_)));
        assert_eq!(err.line, Some(3));
    }

    #[test]
    fn test_malformed_statements() {
        for source in [
            "main :: () { x := 1 }",
            "main :: () { x : int = ; }",
            "main :: () { x ; }",
            "main :: () { x : number = 1; }",
            "main :: () { print(1; }",
            "main :: () { print(,); }",
        ] {
            let mut interp = Interp::new(InterpConf {
                arena_size: 256,
                ..InterpConf::default()
            });
            let result = interp
                .load_source("test.st", source)
                .and_then(|_| interp.execute(&mut Vec::new()));
            assert!(result.is_err(), "{source}");
        }
    }

    #[test]
    fn test_arena_exhausted() {
        let mut interp = Interp::new(InterpConf {
            arena_size: 12,
            ..InterpConf::default()
        });
        interp
            .load_source("test.st", "main :: () { a : int = 1; b : int = 2; }")
            .unwrap();
        let err = interp.execute(&mut Vec::new()).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Exhausted(_)));
        assert!(interp.program().arena().used() <= 12);
    }

    #[test]
    fn test_step_after_exit() {
        let mut interp = load("main :: () { print(1); }");
        let mut out = Vec::new();
        interp.execute(&mut out).unwrap();
        assert_eq!(out, b"1\n");
        assert_eq!(interp.step(&mut out).unwrap(), Flow::Exit);
        assert!(interp.frame().is_none());
    }

    #[test]
    fn test_print_any_type() {
        let mut interp = load("main :: () { print(1); print(\"a\"); print(-2.5); }");
        let mut out = Vec::new();
        interp.execute(&mut out).unwrap();
        assert_eq!(out, b"1\na-2.5\n");

        let print = interp.program().functions().find("print").unwrap();
        let params = interp.program().functions().get(print).top_scope;
        let param = &interp.program().scopes().get(params).variables()[0];
        assert_eq!(param.name, "value");
        assert_eq!(param.ty, None);
        assert_eq!(param.storage, None);
    }
}
