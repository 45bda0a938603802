//! Constant values and default limits of the interpreter.

/// Size of the single memory block that backs all variable storage.
///
/// The block is reserved once when the interpreter is created and
/// released as a whole when it is dropped.
pub const ARENA_SIZE: usize = 256 * MEGABYTE;

#[doc(hidden)]
pub const MEGABYTE: usize = 1024 * 1024;

/// Maximum number of functions, including syscalls, in the function table.
pub const MAX_FUNCTIONS: usize = 1024;

/// Maximum number of variables a single scope can hold.
pub const MAX_VARIABLES: usize = 1024;

/// Levels of nesting allowed in the call stack.
///
/// There is no loop construct in the language, so the only way to
/// run out of stack is unbounded recursion.
pub const STACK_SIZE: usize = 0xFF;

/// Longest identifier or literal the lexer accepts.
pub const MAX_TOKEN_LENGTH: usize = 256;

/// Byte width of the fixed size numeric types.
pub const WIDTH_U8: usize = 1;
pub const WIDTH_64: usize = 8;

/// Name of the function where execution starts.
pub const ENTRY_POINT: &str = "main";
