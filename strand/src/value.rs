//! Tagged runtime values.
use std::io::{self, Write};

use crate::{
    error::{StrandError, StrandResult},
    types::Type,
};

/// A value together with its type.
///
/// Variables store values in the arena as raw bytes. This is the
/// decoded form, used while a value is moved between variables,
/// evaluated or printed.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U8(u8),
    U64(u64),
    S64(i64),
    F64(f64),
    Str(String),
}

impl Value {
    pub fn ty(&self) -> Type {
        match self {
            Self::U8(_) => Type::U8,
            Self::U64(_) => Type::U64,
            Self::S64(_) => Type::S64,
            Self::F64(_) => Type::F64,
            Self::Str(_) => Type::String,
        }
    }

    /// Parse literal text as a value of the given type.
    ///
    /// String literals have their quotes removed and escape
    /// sequences processed.
    pub fn from_literal(text: &str, ty: Type) -> StrandResult<Self> {
        let is_string = text.starts_with('"');

        let value = match ty {
            Type::String if is_string => {
                let inner = text
                    .strip_prefix('"')
                    .and_then(|s| s.strip_suffix('"'))
                    .unwrap_or(&text[1..]);
                Some(Self::Str(unescape(inner)))
            }
            _ if is_string => None,
            Type::String => None,
            Type::U8 => text.parse().ok().map(Self::U8),
            Type::U64 => text.parse().ok().map(Self::U64),
            Type::S64 => text.parse().ok().map(Self::S64),
            Type::F64 => text.parse().ok().map(Self::F64),
        };

        value.ok_or_else(|| StrandError::type_error(format!("{text} is not a valid {ty} value")))
    }

    /// Number of arena bytes needed to store the value.
    ///
    /// Strings are terminated by a zero byte.
    pub fn storage_size(&self) -> usize {
        match self {
            Self::Str(s) => s.len() + 1,
            other => other.ty().byte_width().unwrap_or_default(),
        }
    }

    /// Write the value into variable storage.
    ///
    /// # Errors
    ///
    /// Returns a type error if the storage is too small. Strings may
    /// be shorter than the storage, but never longer.
    pub fn encode(&self, storage: &mut [u8]) -> StrandResult<()> {
        let size = self.storage_size();
        if size > storage.len() {
            return Err(StrandError::type_error(format!(
                "{} byte {} value doesn't fit in {} bytes of storage",
                size,
                self.ty(),
                storage.len()
            )));
        }

        match self {
            Self::U8(v) => storage[0] = *v,
            Self::U64(v) => storage[..8].copy_from_slice(&v.to_le_bytes()),
            Self::S64(v) => storage[..8].copy_from_slice(&v.to_le_bytes()),
            Self::F64(v) => storage[..8].copy_from_slice(&v.to_le_bytes()),
            Self::Str(s) => {
                storage[..s.len()].copy_from_slice(s.as_bytes());
                storage[s.len()] = 0;
            }
        }

        Ok(())
    }

    /// Read a value of the given type from variable storage.
    pub fn decode(ty: Type, storage: &[u8]) -> Self {
        match ty {
            Type::U8 => Self::U8(storage[0]),
            Type::U64 => Self::U64(u64::from_le_bytes(word(storage))),
            Type::S64 => Self::S64(i64::from_le_bytes(word(storage))),
            Type::F64 => Self::F64(f64::from_le_bytes(word(storage))),
            Type::String => {
                let end = storage.iter().position(|b| *b == 0).unwrap_or(storage.len());
                Self::Str(String::from_utf8_lossy(&storage[..end]).into_owned())
            }
        }
    }

    /// Output format of the `print` syscall.
    ///
    /// Numbers are followed by a newline. Strings and bytes
    /// are written as they are.
    pub fn print(&self, out: &mut dyn Write) -> io::Result<()> {
        match self {
            Self::U8(v) => out.write_all(&[*v]),
            Self::U64(v) => writeln!(out, "{v}"),
            Self::S64(v) => writeln!(out, "{v}"),
            Self::F64(v) => writeln!(out, "{v}"),
            Self::Str(s) => out.write_all(s.as_bytes()),
        }
    }
}

fn word(storage: &[u8]) -> [u8; 8] {
    let mut buf = [0; 8];
    buf.copy_from_slice(&storage[..8]);
    buf
}

/// Replace escape sequences with the characters they stand for.
///
/// Unknown escapes are kept as written.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_literal() {
        assert_eq!(Value::from_literal("5", Type::S64).unwrap(), Value::S64(5));
        assert_eq!(Value::from_literal("-5", Type::S64).unwrap(), Value::S64(-5));
        assert_eq!(Value::from_literal("5", Type::F64).unwrap(), Value::F64(5.0));
        assert_eq!(Value::from_literal("65", Type::U8).unwrap(), Value::U8(65));
        assert_eq!(
            Value::from_literal(r#""a\tb""#, Type::String).unwrap(),
            Value::Str("a\tb".to_string())
        );

        assert!(Value::from_literal("-5", Type::U64).is_err());
        assert!(Value::from_literal("300", Type::U8).is_err());
        assert!(Value::from_literal("\"5\"", Type::U64).is_err());
        assert!(Value::from_literal("5", Type::String).is_err());
    }

    #[test]
    fn test_s64_encoding() {
        let mut storage = [0; 8];
        Value::S64(5).encode(&mut storage).unwrap();
        assert_eq!(storage, 5i64.to_le_bytes());
        assert_eq!(Value::decode(Type::S64, &storage), Value::S64(5));
    }

    #[test]
    fn test_string_storage() {
        let value = Value::Str("abc".to_string());
        assert_eq!(value.storage_size(), 4);

        let mut storage = [0xFF; 6];
        value.encode(&mut storage).unwrap();
        assert_eq!(&storage[..4], b"abc\0");
        assert_eq!(Value::decode(Type::String, &storage), value);

        let shorter = Value::Str("z".to_string());
        shorter.encode(&mut storage).unwrap();
        assert_eq!(Value::decode(Type::String, &storage), shorter);

        let longer = Value::Str("abcdef".to_string());
        assert!(longer.encode(&mut storage).is_err());
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\nb\r\t\\"), "a\nb\r\t\\");
        assert_eq!(unescape(r#"say \"hi\""#), "say \"hi\"");
        assert_eq!(unescape(r"\q"), "\\q");
    }

    #[test]
    fn test_print() {
        let mut out = Vec::new();
        Value::U64(5).print(&mut out).unwrap();
        Value::S64(-2).print(&mut out).unwrap();
        Value::F64(2.5).print(&mut out).unwrap();
        Value::U8(b'A').print(&mut out).unwrap();
        Value::Str("hi".to_string()).print(&mut out).unwrap();
        assert_eq!(out, b"5\n-2\n2.5\nAhi");
    }
}
