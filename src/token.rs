use std::borrow::Cow;

use crate::lexer::LexErrorKind;

/// Half-open byte range `[start, end)` into the source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-width span at `offset`.
    #[must_use]
    pub const fn empty(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[must_use]
    pub const fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub(crate) const fn shifted(self, delta: isize) -> Self {
        Self {
            start: self.start.saturating_add_signed(delta),
            end: self.end.saturating_add_signed(delta),
        }
    }
}

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    /// Preprocessing number (`42`, `0x1Fu`, `1.5e+3f`, `1'000`).
    Number,
    /// String literal, optionally prefixed (`"a"`, `L"a"`, `u8"a"`).
    StringLiteral,
    /// Character literal, optionally prefixed (`'a'`, `U'a'`).
    CharLiteral,
    /// `<header.h>` in an `#include` line.
    HeaderName,
    Punctuator,
    /// `#` opening a directive line.
    DirectiveHash,
    Comment,
    Newline,
    /// Spaces, tabs and line continuations.
    Whitespace,
    Eof,
}

impl TokenKind {
    /// Whitespace and comments, which never carry grammar meaning.
    #[must_use]
    pub const fn is_trivia(self) -> bool {
        matches!(self, Self::Whitespace | Self::Comment)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::Number => "number_literal",
            Self::StringLiteral => "string_literal",
            Self::CharLiteral => "char_literal",
            Self::HeaderName => "system_lib_string",
            Self::Punctuator => "punctuator",
            Self::DirectiveHash => "directive_hash",
            Self::Comment => "comment",
            Self::Newline => "newline",
            Self::Whitespace => "whitespace",
            Self::Eof => "eof",
        }
    }
}

/// A single token borrowed from the source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub span: Span,
    /// Raw source bytes, line continuations included.
    pub text: &'a [u8],
    /// Set when the token is an unterminated literal or comment.
    pub error: Option<LexErrorKind>,
}

impl<'a> Token<'a> {
    /// Token text with every backslash-newline removed.
    #[must_use]
    pub fn spelling(&self) -> Cow<'a, [u8]> {
        despliced(self.text)
    }

    /// True for a punctuator spelled exactly `punct`.
    #[must_use]
    pub fn is_punct(&self, punct: &str) -> bool {
        self.kind == TokenKind::Punctuator && *self.spelling() == *punct.as_bytes()
    }

    #[must_use]
    pub fn is_identifier(&self, name: &str) -> bool {
        self.kind == TokenKind::Identifier && *self.spelling() == *name.as_bytes()
    }
}

/// `text` with every backslash-newline removed.
pub(crate) fn despliced(text: &[u8]) -> Cow<'_, [u8]> {
    if !text.contains(&b'\\') {
        return Cow::Borrowed(text);
    }
    let mut out = Vec::with_capacity(text.len());
    let mut i = 0;
    while i < text.len() {
        let splice = splice_len(text, i);
        if splice > 0 {
            i += splice;
        } else {
            out.push(text[i]);
            i += 1;
        }
    }
    if out.len() == text.len() {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(out)
    }
}

/// Length of a line continuation (`\` + newline) starting at `pos`, or 0.
pub(crate) fn splice_len(input: &[u8], pos: usize) -> usize {
    if input.get(pos) != Some(&b'\\') {
        return 0;
    }
    match (input.get(pos + 1), input.get(pos + 2)) {
        (Some(b'\n'), _) => 2,
        (Some(b'\r'), Some(b'\n')) => 3,
        _ => 0,
    }
}
