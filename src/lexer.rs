use std::collections::VecDeque;
use std::fmt;

use crate::grammar::{GrammarHandle, get_grammar};
use crate::token::{Span, Token, TokenKind, despliced, splice_len};

const BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Classifies a lexer error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexErrorKind {
    /// `/*` without a closing `*/` before end of input.
    UnterminatedComment,
    /// String literal without a closing quote on its line.
    UnterminatedString,
    /// Character literal without a closing quote on its line.
    UnterminatedChar,
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedComment => write!(f, "unterminated block comment"),
            Self::UnterminatedString => write!(f, "unterminated string literal"),
            Self::UnterminatedChar => write!(f, "unterminated character literal"),
        }
    }
}

/// How the lexer treats context-sensitive characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexMode {
    #[default]
    Normal,
    /// After `#include`: `<...>` is a single header-name token.
    HeaderName,
    /// After `#error` and friends: a quote with no closing partner on
    /// the line is an ordinary punctuator.
    Message,
    /// Inside an `#if`, `#elif` or `#eval` expression. Lexes like
    /// `Normal`, except that `<...>` right after `__has_include(` or
    /// `__has_include_next(` is a header-name token.
    Condition,
}

/// Progress through `__has_include (` in [`LexMode::Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum HasInclude {
    #[default]
    Outside,
    Name,
    Open,
}

/// Tokenize a whole buffer. The trailing `Eof` token is not included.
#[must_use]
pub fn tokenize(input: &[u8]) -> Vec<Token<'_>> {
    Lexer::new(input, get_grammar()).collect()
}

/// Pull-based lexer over a byte buffer.
///
/// Line continuations are invisible inside tokens; between tokens they
/// are lexed as whitespace. The mode falls back to
/// [`LexMode::Normal`] at every newline.
#[derive(Debug)]
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    mode: LexMode,
    has_include: HasInclude,
    at_line_start: bool,
    grammar: GrammarHandle,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(input: &'a [u8], grammar: GrammarHandle) -> Self {
        Self::starting_at(input, grammar, 0)
    }

    /// Start lexing at `offset`, which must be the start of a line.
    pub(crate) fn starting_at(input: &'a [u8], grammar: GrammarHandle, offset: usize) -> Self {
        Self {
            input,
            pos: offset,
            mode: LexMode::Normal,
            has_include: HasInclude::Outside,
            at_line_start: true,
            grammar,
        }
    }

    pub const fn set_mode(&mut self, mode: LexMode) {
        self.mode = mode;
        self.has_include = HasInclude::Outside;
    }

    #[must_use]
    pub const fn mode(&self) -> LexMode {
        self.mode
    }

    /// Byte offset of the next token.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Produce the next token; returns `Eof` forever once input runs out.
    pub fn next_token(&mut self) -> Token<'a> {
        let start = self.pos;
        let Some(&ch) = self.input.get(start) else {
            return self.make_token(TokenKind::Eof, start, None);
        };

        let (kind, error) = match ch {
            b'\n' => {
                self.pos += 1;
                (TokenKind::Newline, None)
            }
            b'\r' if self.input.get(start + 1) == Some(&b'\n') => {
                self.pos += 2;
                (TokenKind::Newline, None)
            }
            0xEF if start == 0 && self.input.starts_with(BOM) => {
                self.pos = BOM.len();
                (TokenKind::Whitespace, None)
            }
            b' ' | b'\t' | b'\r' | 0x0b | 0x0c => {
                self.read_whitespace();
                (TokenKind::Whitespace, None)
            }
            b'\\' if splice_len(self.input, start) > 0 => {
                self.read_whitespace();
                (TokenKind::Whitespace, None)
            }
            _ => self.read_significant(),
        };

        match kind {
            TokenKind::Newline => {
                self.at_line_start = true;
                self.set_mode(LexMode::Normal);
            }
            TokenKind::Whitespace | TokenKind::Comment => {}
            _ => {
                self.at_line_start = false;
                if self.mode == LexMode::Condition {
                    self.track_has_include(kind, start);
                }
            }
        }

        self.make_token(kind, start, error)
    }

    fn make_token(&self, kind: TokenKind, start: usize, error: Option<LexErrorKind>) -> Token<'a> {
        Token {
            kind,
            span: Span::new(start, self.pos),
            text: &self.input[start..self.pos],
            error,
        }
    }

    fn track_has_include(&mut self, kind: TokenKind, start: usize) {
        let text = despliced(&self.input[start..self.pos]);
        self.has_include = match (self.has_include, kind) {
            (_, TokenKind::Identifier)
                if matches!(&*text, b"__has_include" | b"__has_include_next") =>
            {
                HasInclude::Name
            }
            (HasInclude::Name, TokenKind::Punctuator) if *text == *b"(" => HasInclude::Open,
            _ => HasInclude::Outside,
        };
    }

    fn skip_splices(&self, mut pos: usize) -> usize {
        loop {
            let len = splice_len(self.input, pos);
            if len == 0 {
                return pos;
            }
            pos += len;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.peek_at(0)
    }

    /// The `n`-th character of the logical line from the cursor.
    fn peek_at(&self, n: usize) -> Option<u8> {
        let mut pos = self.skip_splices(self.pos);
        for _ in 0..n {
            pos = self.skip_splices(pos + 1);
        }
        self.input.get(pos).copied()
    }

    fn advance(&mut self) {
        let pos = self.skip_splices(self.pos);
        if pos < self.input.len() {
            self.pos = pos + 1;
        }
    }

    fn at_newline(&self) -> bool {
        let pos = self.skip_splices(self.pos);
        match self.input.get(pos) {
            Some(b'\n') => true,
            Some(b'\r') => self.input.get(pos + 1) == Some(&b'\n'),
            _ => false,
        }
    }

    fn matches_logical(&self, expected: &[u8]) -> bool {
        expected
            .iter()
            .enumerate()
            .all(|(i, &b)| self.peek_at(i) == Some(b))
    }

    fn read_whitespace(&mut self) {
        loop {
            let splice = splice_len(self.input, self.pos);
            if splice > 0 {
                self.pos += splice;
                continue;
            }
            match self.input.get(self.pos) {
                Some(b' ' | b'\t' | 0x0b | 0x0c) => self.pos += 1,
                Some(b'\r') if self.input.get(self.pos + 1) != Some(&b'\n') => self.pos += 1,
                _ => break,
            }
        }
    }

    fn read_significant(&mut self) -> (TokenKind, Option<LexErrorKind>) {
        let ch = self.input[self.pos];
        match ch {
            b'/' if self.peek_at(1) == Some(b'/') => self.read_line_comment(),
            b'/' if self.peek_at(1) == Some(b'*') => self.read_block_comment(),
            b'0'..=b'9' => self.read_number(),
            b'.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.read_number(),
            b'"' | b'\'' => self.read_quoted(self.pos),
            b'<' if self.mode == LexMode::HeaderName || self.has_include == HasInclude::Open => {
                self.read_header_name()
            }
            c if is_ident_start(c) => self.read_identifier(),
            _ => self.read_punctuator(),
        }
    }

    /// `//` comments stop at the physical newline.
    fn read_line_comment(&mut self) -> (TokenKind, Option<LexErrorKind>) {
        while let Some(&c) = self.input.get(self.pos) {
            if c == b'\n' || (c == b'\r' && self.input.get(self.pos + 1) == Some(&b'\n')) {
                break;
            }
            self.pos += 1;
        }
        (TokenKind::Comment, None)
    }

    fn read_block_comment(&mut self) -> (TokenKind, Option<LexErrorKind>) {
        self.advance(); // skip /
        self.advance(); // skip *
        loop {
            match self.peek() {
                None => {
                    self.pos = self.input.len();
                    return (TokenKind::Comment, Some(LexErrorKind::UnterminatedComment));
                }
                Some(b'*') if self.peek_at(1) == Some(b'/') => {
                    self.advance();
                    self.advance();
                    return (TokenKind::Comment, None);
                }
                Some(_) => self.advance(),
            }
        }
    }

    fn read_number(&mut self) -> (TokenKind, Option<LexErrorKind>) {
        self.advance();
        loop {
            match self.peek() {
                Some(b'e' | b'E' | b'p' | b'P') if matches!(self.peek_at(1), Some(b'+' | b'-')) => {
                    self.advance();
                    self.advance();
                }
                // digit separator
                Some(b'\'') if self.peek_at(1).is_some_and(|c| c.is_ascii_alphanumeric()) => {
                    self.advance();
                    self.advance();
                }
                Some(c) if c.is_ascii_alphanumeric() || c == b'_' || c == b'.' => self.advance(),
                _ => break,
            }
        }
        (TokenKind::Number, None)
    }

    fn read_identifier(&mut self) -> (TokenKind, Option<LexErrorKind>) {
        let start = self.pos;
        self.advance();
        while self.peek().is_some_and(is_ident_continue) {
            self.advance();
        }

        // encoding prefix of a literal: L"..", u8'..'
        if matches!(self.peek(), Some(b'"' | b'\''))
            && matches!(&*despliced(&self.input[start..self.pos]), b"L" | b"u" | b"U" | b"u8")
        {
            return self.read_quoted(start);
        }

        (TokenKind::Identifier, None)
    }

    fn read_quoted(&mut self, token_start: usize) -> (TokenKind, Option<LexErrorKind>) {
        let quote_pos = self.skip_splices(self.pos);
        let quote = self.input[quote_pos];
        let (kind, error) = if quote == b'"' {
            (TokenKind::StringLiteral, LexErrorKind::UnterminatedString)
        } else {
            (TokenKind::CharLiteral, LexErrorKind::UnterminatedChar)
        };
        self.advance(); // skip opening quote

        loop {
            if self.at_newline() {
                break;
            }
            match self.peek() {
                None => break,
                Some(b'\\') => {
                    self.advance();
                    if !self.at_newline() {
                        self.advance();
                    }
                }
                Some(c) if c == quote => {
                    self.advance();
                    return (kind, None);
                }
                Some(_) => self.advance(),
            }
        }

        if self.mode == LexMode::Message {
            if quote_pos > token_start {
                self.pos = quote_pos;
                return (TokenKind::Identifier, None);
            }
            self.pos = quote_pos + 1;
            return (TokenKind::Punctuator, None);
        }
        if self.peek().is_none() {
            self.pos = self.input.len();
        }
        (kind, Some(error))
    }

    /// `<...>` closed on the same line, otherwise a plain `<`.
    fn read_header_name(&mut self) -> (TokenKind, Option<LexErrorKind>) {
        let save = self.pos;
        self.advance(); // skip <
        loop {
            if self.at_newline() || self.peek().is_none() {
                self.pos = save;
                return self.read_punctuator();
            }
            if self.peek() == Some(b'>') {
                self.advance();
                return (TokenKind::HeaderName, None);
            }
            self.advance();
        }
    }

    fn read_punctuator(&mut self) -> (TokenKind, Option<LexErrorKind>) {
        let grammar = self.grammar.clone();
        let Some(punct) = grammar
            .punctuators()
            .iter()
            .find(|p| self.matches_logical(p.as_bytes()))
        else {
            // stray byte such as `@` or a lone backslash
            self.advance();
            return (TokenKind::Punctuator, None);
        };

        for _ in 0..punct.len() {
            self.advance();
        }

        if *punct == "#" && self.at_line_start {
            (TokenKind::DirectiveHash, None)
        } else {
            (TokenKind::Punctuator, None)
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let token = self.next_token();
        (token.kind != TokenKind::Eof).then_some(token)
    }
}

const fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'$' || c >= 0x80
}

const fn is_ident_continue(c: u8) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

/// Lexer with unbounded lookahead, used by the tree builder.
///
/// The mode may only change while nothing is buffered.
#[derive(Debug)]
pub(crate) struct TokenStream<'a> {
    lexer: Lexer<'a>,
    lookahead: VecDeque<Token<'a>>,
}

impl<'a> TokenStream<'a> {
    pub(crate) const fn new(lexer: Lexer<'a>) -> Self {
        Self {
            lexer,
            lookahead: VecDeque::new(),
        }
    }

    pub(crate) fn peek_nth(&mut self, n: usize) -> Token<'a> {
        while self.lookahead.len() <= n {
            let token = self.lexer.next_token();
            self.lookahead.push_back(token);
        }
        self.lookahead[n]
    }

    pub(crate) fn peek(&mut self) -> Token<'a> {
        self.peek_nth(0)
    }

    pub(crate) fn next(&mut self) -> Token<'a> {
        self.lookahead
            .pop_front()
            .unwrap_or_else(|| self.lexer.next_token())
    }

    pub(crate) fn set_mode(&mut self, mode: LexMode) {
        debug_assert!(self.lookahead.is_empty(), "mode change with buffered tokens");
        self.lexer.set_mode(mode);
    }

    pub(crate) fn at_eof(&mut self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    /// Whether the line at the cursor is a directive line.
    pub(crate) fn line_starts_directive(&mut self) -> bool {
        let mut n = 0;
        loop {
            let token = self.peek_nth(n);
            if !token.kind.is_trivia() {
                return token.kind == TokenKind::DirectiveHash;
            }
            n += 1;
        }
    }

    /// Consume tokens up to, not including, the next newline or EOF.
    pub(crate) fn rest_of_line(&mut self) -> Vec<Token<'a>> {
        let mut tokens = Vec::new();
        while !matches!(self.peek().kind, TokenKind::Newline | TokenKind::Eof) {
            tokens.push(self.next());
        }
        tokens
    }

    pub(crate) fn next_if_newline(&mut self) -> Option<Token<'a>> {
        (self.peek().kind == TokenKind::Newline).then(|| self.next())
    }
}
