//! Tokens

use std::fmt;

use smol_str::SmolStr;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Classification of identifier tokens, assigned after
    /// the whole token list has been built.
    pub ident: IdentKind,
    /// Literal text of the token.
    ///
    /// String literals keep their surrounding quotes, and escape
    /// sequences are left unprocessed.
    pub text: SmolStr,
    /// Line in source code file.
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<SmolStr>, line: usize) -> Self {
        Self {
            kind,
            ident: IdentKind::None,
            text: text.into(),
            line,
        }
    }

    #[inline]
    pub fn is_ident(&self) -> bool {
        self.kind == TokenKind::Ident
    }

    #[inline]
    pub fn is_literal(&self) -> bool {
        self.kind == TokenKind::Literal
    }

    /// Either a literal or an identifier, something that can
    /// be evaluated to a value.
    #[inline]
    pub fn is_operand(&self) -> bool {
        matches!(self.kind, TokenKind::Ident | TokenKind::Literal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[rustfmt::skip]
pub enum TokenKind {
    // Simple
    Colon,      // :
    Eq,         // =
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Ampersand,  // &
    Semicolon,  // ;
    LeftParen,  // (
    RightParen, // )
    LeftBrace,  // {
    RightBrace, // }
    Comma,      // ,

    // ------------------------------------------------------------------------
    // Complex
    Ident,
    /// Number or string literal
    Literal,
}

impl TokenKind {
    /// Punctuation kind for a delimiter character.
    #[rustfmt::skip]
    pub fn from_punct(c: char) -> Option<Self> {
        use TokenKind as TK;
        match c {
            ':' => Some(TK::Colon),
            '=' => Some(TK::Eq),
            '+' => Some(TK::Plus),
            '-' => Some(TK::Minus),
            '*' => Some(TK::Star),
            '/' => Some(TK::Slash),
            '&' => Some(TK::Ampersand),
            ';' => Some(TK::Semicolon),
            '(' => Some(TK::LeftParen),
            ')' => Some(TK::RightParen),
            '{' => Some(TK::LeftBrace),
            '}' => Some(TK::RightBrace),
            ',' => Some(TK::Comma),
            _   => None,
        }
    }
}

impl fmt::Display for TokenKind {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use TokenKind as TK;
        match self {
            TK::Colon      => write!(f, ":"),
            TK::Eq         => write!(f, "="),
            TK::Plus       => write!(f, "+"),
            TK::Minus      => write!(f, "-"),
            TK::Star       => write!(f, "*"),
            TK::Slash      => write!(f, "/"),
            TK::Ampersand  => write!(f, "&"),
            TK::Semicolon  => write!(f, ";"),
            TK::LeftParen  => write!(f, "("),
            TK::RightParen => write!(f, ")"),
            TK::LeftBrace  => write!(f, "{{"),
            TK::RightBrace => write!(f, "}}"),
            TK::Comma      => write!(f, ","),
            TK::Ident      => write!(f, "identifier"),
            TK::Literal    => write!(f, "literal"),
        }
    }
}

/// Role of an identifier, decided by its neighbouring tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentKind {
    /// Not an identifier, or not classified yet.
    None,
    /// Reserved word, eg: the `struct` in `Vector :: struct {`
    Keyword,
    /// eg: the `main` in `main :: () {`
    FuncDef,
    /// eg: the `print` in `print(x);`
    FuncCall,
    /// eg: the `Vector` in `Vector :: struct {`
    StructDef,
    VarOrType,
}

impl fmt::Display for IdentKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::None => "None",
            Self::Keyword => "Keyword",
            Self::FuncDef => "Function Def",
            Self::FuncCall => "Function Call",
            Self::StructDef => "Struct Def",
            Self::VarOrType => "Variable / Type",
        };
        write!(f, "{name}")
    }
}

/// Reserved words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Struct,
}

impl Keyword {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "struct" => Some(Self::Struct),
            _ => None,
        }
    }
}
