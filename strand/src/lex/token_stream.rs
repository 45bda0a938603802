//! Indexable token list.
use std::ops::Index;

use super::{
    lexer::tokenize,
    tokens::{IdentKind, Token, TokenKind},
};
use crate::error::{StrandError, StrandResult};

/// Position of a token in the [`TokenStream`].
///
/// Stands in for a pointer to a token. Jumping and advancing are
/// index moves, so a position can never dangle.
pub type TokenIndex = usize;

/// Owned sequence of classified tokens for a whole source file.
///
/// The stream is never modified after lexing. The interpreter walks
/// it with a [`TokenIndex`] and jumps around it for calls and returns.
#[derive(Debug, Default)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// Lex and classify source code.
    pub fn from_source(source_code: &str) -> StrandResult<Self> {
        tokenize(source_code).map(Self::new)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    #[inline]
    pub fn get(&self, index: TokenIndex) -> Option<&Token> {
        self.tokens.get(index)
    }

    /// Tokens from the index to the end of the stream.
    #[inline]
    pub fn tail(&self, start: TokenIndex) -> &[Token] {
        &self.tokens[start.min(self.tokens.len())..]
    }

    pub fn iter(&self) -> impl Iterator<Item = (TokenIndex, &Token)> {
        self.tokens.iter().enumerate()
    }

    /// Line of the token at the index, or of the last token when
    /// the index is past the end.
    pub fn line(&self, index: TokenIndex) -> usize {
        self.tokens
            .get(index)
            .or_else(|| self.tokens.last())
            .map(|token| token.line)
            .unwrap_or(1)
    }

    /// Return the token at the index if it matches the given kind.
    ///
    /// # Errors
    ///
    /// Returns a lexical error if the kind doesn't match, or the
    /// index is past the end of the stream.
    pub fn expect(&self, index: TokenIndex, token_kind: TokenKind) -> StrandResult<&Token> {
        match self.tokens.get(index) {
            Some(token) if token.kind == token_kind => Ok(token),
            Some(token) => Err(StrandError::lex(format!(
                "expected '{token_kind}', found '{}'",
                token.text
            ))
            .at(token.line)),
            None => Err(StrandError::lex(format!(
                "expected '{token_kind}', found end of source"
            ))
            .at(self.line(index))),
        }
    }

    /// Checks whether the token at the index is of the given kind.
    #[inline]
    pub fn is_kind(&self, index: TokenIndex, token_kind: TokenKind) -> bool {
        matches!(self.tokens.get(index), Some(token) if token.kind == token_kind)
    }

    /// Index of the first token of the given kind, at or after `start`.
    pub fn find_from(&self, start: TokenIndex, token_kind: TokenKind) -> Option<TokenIndex> {
        self.tokens
            .iter()
            .skip(start)
            .position(|token| token.kind == token_kind)
            .map(|offset| start + offset)
    }

    /// Iterate the identifiers that were classified as function definitions.
    pub fn function_defs(&self) -> impl Iterator<Item = (TokenIndex, &Token)> {
        self.iter()
            .filter(|(_, token)| token.ident == IdentKind::FuncDef)
    }

    /// Formatted listing of all tokens, one per line.
    pub fn dump(&self) -> String {
        let mut out = format!("Token Count: {}\n", self.tokens.len());
        for token in &self.tokens {
            let kind = match token.kind {
                TokenKind::Ident => "Identifier",
                TokenKind::Literal => "Literal",
                _ => "Punctuation",
            };
            if token.is_ident() {
                out.push_str(&format!(
                    "{:4} {kind: <12} {: <16} {}\n",
                    token.line,
                    format!("\"{}\"", token.text),
                    token.ident
                ));
            } else {
                out.push_str(&format!("{:4} {kind: <12} \"{}\"\n", token.line, token.text));
            }
        }
        out
    }
}

impl Index<TokenIndex> for TokenStream {
    type Output = Token;

    fn index(&self, index: TokenIndex) -> &Self::Output {
        &self.tokens[index]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_expect_and_find() {
        let stream = TokenStream::from_source("main :: () { x := 1; }").unwrap();
        assert!(stream.expect(1, TokenKind::Colon).is_ok());
        assert!(stream.expect(0, TokenKind::Colon).is_err());
        assert_eq!(stream.find_from(0, TokenKind::LeftBrace), Some(5));
        assert_eq!(stream.find_from(6, TokenKind::LeftBrace), None);

        let err = stream.expect(100, TokenKind::Semicolon).unwrap_err();
        assert_eq!(err.line, Some(1));

        assert_eq!(stream.tail(9).len(), 3);
        assert!(stream.tail(100).is_empty());
    }

    #[test]
    fn test_function_defs() {
        let stream = TokenStream::from_source("a :: () {}\nb :: (x : int) { a(); }").unwrap();
        let names = stream
            .function_defs()
            .map(|(_, token)| token.text.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_dump() {
        let stream = TokenStream::from_source("f(1);").unwrap();
        let dump = stream.dump();
        assert!(dump.starts_with("Token Count: 5\n"));
        assert!(dump.contains("Function Call"));
    }
}
