//! Tokenizer
mod lexer;
mod token_stream;
mod tokens;

pub use self::{
    lexer::{classify_identifiers, tokenize, Lexer},
    token_stream::{TokenIndex, TokenStream},
    tokens::{IdentKind, Keyword, Token, TokenKind},
};
