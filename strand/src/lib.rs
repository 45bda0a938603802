mod arena;
pub mod constants;
mod error;
mod expr;
mod function;
mod interp;
pub mod lex;
mod program;
mod scope;
mod types;
mod value;

pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        arena::{Arena, Handle},
        error::{ErrorKind, StrandError, StrandResult},
        function::{CallStack, Frame, Function, FunctionId, FunctionTable, Position, Syscall},
        interp::{Flow, Interp, InterpConf},
        lex::{Token, TokenKind, TokenStream},
        program::Program,
        scope::{Scope, ScopeId, Scopes, VarRef, Variable},
        types::Type,
        value::Value,
    };
}
