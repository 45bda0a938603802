//! Lexical analysis
use std::str::CharIndices;

use itertools::{multipeek, MultiPeek};
use log::trace;

use super::tokens::{IdentKind, Keyword, Token, TokenKind};
use crate::{
    constants::MAX_TOKEN_LENGTH,
    error::{StrandError, StrandResult},
};

/// Lexical analyzer.
///
/// Splits the source into identifiers, literals and single character
/// punctuation. Identifiers are not classified here, see
/// [`classify_identifiers`].
pub struct Lexer<'a> {
    source: SourceText<'a>,
    /// Start byte position of the current token.
    start_pos: usize,
    /// Line where the current token started.
    start_line: usize,
    /// Kind of the last emitted token, needed to tell
    /// a negative literal apart from a subtraction.
    last_kind: Option<TokenKind>,
}

impl<'a> Lexer<'a> {
    pub fn new(source_code: &'a str) -> Self {
        Self {
            source: SourceText::new(source_code),
            start_pos: 0,
            start_line: 1,
            last_kind: None,
        }
    }

    /// Original source code that was passed in during construction.
    pub fn source_code(&self) -> &'a str {
        self.source.original
    }

    /// Scan the source characters and construct the next token.
    ///
    /// Returns `None` at the end of the source.
    pub fn next_token(&mut self) -> Option<StrandResult<Token>> {
        while let Some((index, c)) = self.source.next_char() {
            self.start_pos = index;
            self.start_line = self.source.current_line;

            let result = match c {
                ' ' | '\t' | '\r' | '\n' => continue,
                '/' if self.source.peek_char() == Some('/') => {
                    self.erase_comment();
                    continue;
                }
                '"' => self.consume_string(),
                '-' if self.starts_negative_literal() => self.consume_number(),
                '0'..='9' => self.consume_number(),
                c if is_letter(c) => self.consume_ident(),
                c => match TokenKind::from_punct(c) {
                    Some(kind) => Ok(self.make_token(kind)),
                    None => Err(self.error(format!("unexpected character '{c}'"))),
                },
            };

            if let Ok(token) = &result {
                self.last_kind = Some(token.kind);
            }
            return Some(result);
        }

        None
    }

    /// Build a token from the start position up to and
    /// including the current character.
    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.fragment(), self.start_line)
    }

    fn fragment(&self) -> &'a str {
        let end = self.source.current.0 + self.source.current.1.len_utf8();
        &self.source.original[self.start_pos..end]
    }

    #[inline(never)]
    #[cold]
    fn error(&self, message: impl ToString) -> StrandError {
        StrandError::lex(message).at(self.start_line)
    }

    fn check_length(&self) -> StrandResult<()> {
        if self.fragment().chars().count() > MAX_TOKEN_LENGTH {
            Err(self.error(format!("token longer than {MAX_TOKEN_LENGTH} characters")))
        } else {
            Ok(())
        }
    }
}

/// Specialised tokens.
impl<'a> Lexer<'a> {
    /// Erase comment line up to, but not including, the trailing newline.
    fn erase_comment(&mut self) {
        while !matches!(self.source.peek_char(), Some('\n') | None) {
            self.source.next_char();
        }
    }

    /// A minus sign directly followed by a digit is part of a number,
    /// unless it comes after something that could be a left operand.
    fn starts_negative_literal(&mut self) -> bool {
        let after_operand = matches!(
            self.last_kind,
            Some(TokenKind::Ident | TokenKind::Literal | TokenKind::RightParen)
        );
        !after_operand && matches!(self.source.peek_char(), Some('0'..='9'))
    }

    fn consume_ident(&mut self) -> StrandResult<Token> {
        while let Some(c) = self.source.peek_char() {
            if is_letter(c) || is_digit(c) {
                self.source.next_char();
            } else {
                break;
            }
        }

        self.check_length()?;
        Ok(self.make_token(TokenKind::Ident))
    }

    /// Make a number literal token.
    ///
    /// A single decimal point is allowed between digits.
    fn consume_number(&mut self) -> StrandResult<Token> {
        let mut seen_dot = false;

        loop {
            match self.source.peek_char2() {
                (Some(c), _) if is_digit(c) => {
                    self.source.next_char();
                }
                (Some('.'), Some(c)) if !seen_dot && is_digit(c) => {
                    seen_dot = true;
                    self.source.next_char();
                }
                (Some(c), _) if is_letter(c) => {
                    self.source.next_char();
                    return Err(self.error(format!(
                        "literal '{}' can't be continued by an identifier",
                        self.fragment()
                    )));
                }
                _ => break,
            }
        }

        self.check_length()?;
        Ok(self.make_token(TokenKind::Literal))
    }

    /// Make a string literal token, quotes included.
    ///
    /// Escape sequences are skipped over but left as is. They are
    /// processed when a string value is created from the literal.
    fn consume_string(&mut self) -> StrandResult<Token> {
        let mut escaped = false;

        loop {
            match self.source.next_char() {
                Some((_, '\\')) if !escaped => escaped = true,
                Some((_, '"')) if !escaped => break,
                Some(_) => escaped = false,
                None => return Err(self.error("unterminated string literal")),
            }
        }

        self.check_length()?;
        Ok(self.make_token(TokenKind::Literal))
    }
}

/// Lex the whole source and classify its identifiers.
pub fn tokenize(source_code: &str) -> StrandResult<Vec<Token>> {
    let mut tokens = Lexer::new(source_code).collect::<StrandResult<Vec<_>>>()?;
    classify_identifiers(&mut tokens);
    trace!("lexed {} tokens", tokens.len());
    Ok(tokens)
}

/// Assign each identifier its role, by looking at the tokens that follow it.
///
/// Definitions are checked before calls, because a definition
/// `name :: (` would otherwise never be reached.
pub fn classify_identifiers(tokens: &mut [Token]) {
    for index in 0..tokens.len() {
        if !tokens[index].is_ident() {
            continue;
        }

        let ident = if Keyword::parse(tokens[index].text.as_str()).is_some() {
            IdentKind::Keyword
        } else if is_function_def(tokens, index) {
            IdentKind::FuncDef
        } else if is_struct_def(tokens, index) {
            IdentKind::StructDef
        } else if is_function_call(tokens, index) {
            IdentKind::FuncCall
        } else {
            IdentKind::VarOrType
        };

        tokens[index].ident = ident;
    }
}

/// `name :: (`
fn is_function_def(tokens: &[Token], index: usize) -> bool {
    matches!(
        tokens.get(index + 1..index + 4),
        Some([a, b, c]) if a.kind == TokenKind::Colon
            && b.kind == TokenKind::Colon
            && c.kind == TokenKind::LeftParen
    )
}

/// `name :: struct`
fn is_struct_def(tokens: &[Token], index: usize) -> bool {
    matches!(
        tokens.get(index + 1..index + 4),
        Some([a, b, c]) if a.kind == TokenKind::Colon
            && b.kind == TokenKind::Colon
            && c.is_ident()
            && Keyword::parse(c.text.as_str()) == Some(Keyword::Struct)
    )
}

/// `name (`
fn is_function_call(tokens: &[Token], index: usize) -> bool {
    matches!(tokens.get(index + 1), Some(t) if t.kind == TokenKind::LeftParen)
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn is_letter(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '_')
}

/// Implement `Lexer` as an interator for consuming
/// tokens lazily.
impl<'a> Iterator for Lexer<'a> {
    type Item = StrandResult<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// Wrapper for source code that keeps a cursor position.
///
/// Allows forward lookup via peeking.
struct SourceText<'a> {
    original: &'a str,

    /// The `MultiPeek` wrapper allows for arbitrary lookahead by consuming
    /// the iterator internally and buffering the result.
    ///
    /// Peeking advances the internal peek cursor by 1. The helpers below
    /// always reset it first, so every peek starts at the next character.
    source: MultiPeek<CharIndices<'a>>,

    /// Byte position and value of the current character.
    current: (usize, char),
    current_line: usize,
}

impl<'a> SourceText<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            original: source,
            source: multipeek(source.char_indices()),
            current: (0, '\0'),
            current_line: 1,
        }
    }

    /// Advance the cursor and return the next position and character.
    fn next_char(&mut self) -> Option<(usize, char)> {
        let (index, c) = self.source.next()?;
        // The line counter moves when stepping past a newline,
        // so the newline itself belongs to the line it ends.
        if self.current.1 == '\n' {
            self.current_line += 1;
        }
        self.current = (index, c);
        Some((index, c))
    }

    /// Character after the current one.
    fn peek_char(&mut self) -> Option<char> {
        self.source.reset_peek();
        let c = self.source.peek().map(|(_, c)| *c);
        self.source.reset_peek();
        c
    }

    /// Two character lookahead.
    fn peek_char2(&mut self) -> (Option<char>, Option<char>) {
        self.source.reset_peek();
        let pair = (
            self.source.peek().map(|(_, c)| *c),
            self.source.peek().map(|(_, c)| *c),
        );
        self.source.reset_peek();
        pair
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn texts(source: &str) -> Vec<String> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.text.to_string())
            .collect()
    }

    #[test]
    fn test_punctuation_delimits() {
        use TokenKind as TK;
        assert_eq!(
            kinds("x:int=2;"),
            vec![TK::Ident, TK::Colon, TK::Ident, TK::Eq, TK::Literal, TK::Semicolon]
        );
        assert_eq!(texts("a+b"), vec!["a", "+", "b"]);
    }

    #[test]
    fn test_string_literal_verbatim() {
        let tokens = tokenize(r#"s := "a; b\n\"q\"";"#).unwrap();
        assert_eq!(tokens[3].kind, TokenKind::Literal);
        assert_eq!(tokens[3].text, r#""a; b\n\"q\"""#);
        assert_eq!(tokens[4].kind, TokenKind::Semicolon);
    }

    #[test]
    fn test_empty_string_literal() {
        assert_eq!(texts(r#"print("")"#), vec!["print", "(", "\"\"", ")"]);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("s := \"abc").unwrap_err();
        assert!(matches!(err.kind, crate::error::ErrorKind::Lex(_)));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(texts("x := 2.5;"), vec!["x", ":", "=", "2.5", ";"]);
        assert_eq!(texts("x := -3;"), vec!["x", ":", "=", "-3", ";"]);
        assert_eq!(texts("x := a -3;"), vec!["x", ":", "=", "a", "-", "3", ";"]);
        assert_eq!(texts("x := 1 - -3;"), vec!["x", ":", "=", "1", "-", "-3", ";"]);
    }

    #[test]
    fn test_identifier_with_digits() {
        assert_eq!(texts("x2_y := 1;")[0], "x2_y");
    }

    #[test]
    fn test_literal_continued_by_letter() {
        let err = tokenize("x := 12ab;").unwrap_err();
        assert!(matches!(err.kind, crate::error::ErrorKind::Lex(_)));
    }

    #[test]
    fn test_unknown_character() {
        let err = tokenize("x := 1;\ny @ 2;").unwrap_err();
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn test_line_numbers() {
        let tokens = tokenize("main :: () {\n  x := 1;\n\n}").unwrap();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[6].text, "x");
        assert_eq!(tokens[6].line, 2);
        assert_eq!(tokens.last().unwrap().line, 4);
    }

    #[test]
    fn test_comments() {
        assert_eq!(texts("x := 1; // note: y = 2;\ny"), vec!["x", ":", "=", "1", ";", "y"]);
        assert_eq!(texts("a / b"), vec!["a", "/", "b"]);
    }

    #[test]
    fn test_classify_identifiers() {
        let source = "Vector :: struct { x : int; }\nmain :: () { v : Vector; f(1); }";
        let tokens = tokenize(source).unwrap();
        let find = |text: &str| {
            tokens
                .iter()
                .find(|t| t.text == text)
                .map(|t| t.ident)
                .unwrap()
        };

        assert_eq!(find("Vector"), IdentKind::StructDef);
        assert_eq!(find("struct"), IdentKind::Keyword);
        assert_eq!(find("main"), IdentKind::FuncDef);
        assert_eq!(find("f"), IdentKind::FuncCall);
        assert_eq!(find("v"), IdentKind::VarOrType);
        assert_eq!(find("int"), IdentKind::VarOrType);
    }

    #[test]
    fn test_classify_non_identifiers() {
        let tokens = tokenize("x := 1;").unwrap();
        assert_eq!(tokens[1].ident, IdentKind::None);
        assert_eq!(tokens[3].ident, IdentKind::None);
    }
}
