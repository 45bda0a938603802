//! Result and errors.
use std::{
    fmt::{self, Display, Formatter},
    io,
    string::FromUtf8Error,
};

pub type StrandResult<T> = std::result::Result<T, StrandError>;

/// Fatal interpreter error.
///
/// There is no recovery inside the interpreter. Every error unwinds
/// to the caller of [`Interp::execute`](crate::prelude::Interp::execute),
/// which is expected to report it and stop the run.
#[derive(Debug)]
pub struct StrandError {
    pub kind: ErrorKind,
    /// Source line of the token being processed when the error occurred.
    pub line: Option<usize>,
}

#[derive(Debug)]
pub enum ErrorKind {
    /// Unexpected character or token shape.
    Lex(String),
    /// Use of an undeclared variable or function.
    Unresolved { what: &'static str, name: String },
    /// Type mismatch, bad declaration or wrong argument count.
    Type(String),
    /// Arena, table or call stack capacity exceeded.
    Exhausted(&'static str),
    /// Arithmetic fault during evaluation.
    Runtime(String),
    /// Program can't be started.
    Startup(String),
    Io(io::Error),
}

impl StrandError {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, line: None }
    }

    pub fn lex(message: impl ToString) -> Self {
        Self::new(ErrorKind::Lex(message.to_string()))
    }

    pub fn unresolved(what: &'static str, name: impl ToString) -> Self {
        Self::new(ErrorKind::Unresolved {
            what,
            name: name.to_string(),
        })
    }

    pub fn type_error(message: impl ToString) -> Self {
        Self::new(ErrorKind::Type(message.to_string()))
    }

    pub fn exhausted(resource: &'static str) -> Self {
        Self::new(ErrorKind::Exhausted(resource))
    }

    pub fn runtime(message: impl ToString) -> Self {
        Self::new(ErrorKind::Runtime(message.to_string()))
    }

    /// Attach a source line, unless the error already carries one.
    ///
    /// The innermost line wins, so an error raised while lexing or
    /// binding arguments keeps the position where it was detected.
    pub fn at(mut self, line: usize) -> Self {
        if self.line.is_none() {
            self.line = Some(line);
        }
        self
    }

    /// Render the error as a diagnostic for the given source file.
    ///
    /// ```text
    /// test.st(3)
    ///   undeclared variable 'x'
    /// ```
    pub fn report(&self, file_name: &str) -> String {
        match self.line {
            Some(line) => format!("{file_name}({line})\n  {}\n", self.kind),
            None => format!("{file_name}\n  {}\n", self.kind),
        }
    }
}

impl Display for StrandError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lex(msg) => write!(f, "lexical error: {msg}"),
            Self::Unresolved { what, name } => write!(f, "undeclared {what} '{name}'"),
            Self::Type(msg) => write!(f, "type error: {msg}"),
            Self::Exhausted(resource) => write!(f, "out of {resource}"),
            Self::Runtime(msg) => write!(f, "runtime error: {msg}"),
            Self::Startup(msg) => write!(f, "{msg}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for StrandError {}

impl From<ErrorKind> for StrandError {
    fn from(kind: ErrorKind) -> Self {
        StrandError::new(kind)
    }
}

impl From<io::Error> for StrandError {
    fn from(err: io::Error) -> Self {
        StrandError::new(ErrorKind::Io(err))
    }
}

impl From<FromUtf8Error> for StrandError {
    fn from(err: FromUtf8Error) -> Self {
        StrandError::lex(format!("source is not valid UTF-8: {err}"))
    }
}
