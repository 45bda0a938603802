//! Primitive types.
use std::fmt;

use crate::{
    constants::{WIDTH_64, WIDTH_U8},
    error::{StrandError, StrandResult},
};

/// Closed set of value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    U8,
    U64,
    S64,
    F64,
    /// Width is the length of the content, not fixed.
    String,
}

/// Spellings accepted in type annotations.
#[rustfmt::skip]
const TYPE_NAMES: &[(&str, Type)] = &[
    ("char",   Type::U8),
    ("u8",     Type::U8),
    ("uint",   Type::U64),
    ("u64",    Type::U64),
    ("int",    Type::S64),
    ("i64",    Type::S64),
    ("s64",    Type::S64),
    ("float",  Type::F64),
    ("double", Type::F64),
    ("f64",    Type::F64),
    ("string", Type::String),
];

impl Type {
    /// Look up a type by its spelling in a type annotation.
    pub fn resolve_name(name: &str) -> StrandResult<Self> {
        TYPE_NAMES
            .iter()
            .find(|(spelling, _)| *spelling == name)
            .map(|(_, ty)| *ty)
            .ok_or_else(|| StrandError::type_error(format!("unknown type '{name}'")))
    }

    /// Number of bytes a value of this type occupies.
    ///
    /// Strings have no static width, their storage is sized
    /// from their content when they are created.
    #[inline]
    pub fn byte_width(&self) -> Option<usize> {
        match self {
            Self::U8 => Some(WIDTH_U8),
            Self::U64 | Self::S64 | Self::F64 => Some(WIDTH_64),
            Self::String => None,
        }
    }

    #[inline]
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::String)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::U8 => "u8",
            Self::U64 => "u64",
            Self::S64 => "s64",
            Self::F64 => "f64",
            Self::String => "string",
        };
        write!(f, "{name}")
    }
}

/// Determine the type of a literal or identifier from its text.
///
/// First match wins:
///
/// 1. leading quote is a string
/// 2. letters or spaces make it an identifier, typed by the declared
///    variable `lookup` finds for it
/// 3. a decimal point is a float
/// 4. a leading minus is signed
/// 5. anything else is unsigned
///
/// Nothing is cached, the text is inspected on every call.
pub fn infer_type(text: &str, lookup: impl FnOnce(&str) -> Option<Type>) -> StrandResult<Type> {
    if text.starts_with('"') {
        Ok(Type::String)
    } else if text.chars().any(|c| c.is_ascii_alphabetic() || c == '_' || c == ' ') {
        lookup(text).ok_or_else(|| StrandError::unresolved("variable", text))
    } else if text.contains('.') {
        Ok(Type::F64)
    } else if text.starts_with('-') {
        Ok(Type::S64)
    } else {
        Ok(Type::U64)
    }
}
