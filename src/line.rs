use std::sync::Arc;

use crate::token::{Token, TokenKind};
use crate::tree::Node;

/// Cursor over the tokens of one logical line, newline excluded.
///
/// `peek` looks past whitespace and comments; `take` hands those to
/// the caller's child list before returning the next real token, so
/// every byte of the line ends up in some node.
#[derive(Debug)]
pub(crate) struct LineCursor<'t, 'a> {
    tokens: &'t [Token<'a>],
    pos: usize,
    /// Offset just past the last token of the line.
    end: usize,
}

impl<'t, 'a> LineCursor<'t, 'a> {
    pub(crate) const fn new(tokens: &'t [Token<'a>], end: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end,
        }
    }

    pub(crate) fn peek(&self) -> Option<&'t Token<'a>> {
        let tokens = self.tokens;
        tokens[self.pos..].iter().find(|t| !t.kind.is_trivia())
    }

    pub(crate) fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    pub(crate) fn peek_is_punct(&self, punct: &str) -> bool {
        self.peek().is_some_and(|t| t.is_punct(punct))
    }

    /// Next token is `punct` with nothing in between.
    pub(crate) fn adjacent_punct(&self, punct: &str) -> bool {
        self.tokens.get(self.pos).is_some_and(|t| t.is_punct(punct))
    }

    pub(crate) fn is_done(&self) -> bool {
        self.peek().is_none()
    }

    /// Offset of the cursor, for zero-width error nodes.
    pub(crate) fn here(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |t| t.span.start)
    }

    pub(crate) fn trivia(&mut self) -> Vec<Arc<Node>> {
        let mut nodes = Vec::new();
        while let Some(token) = self.tokens.get(self.pos) {
            if !token.kind.is_trivia() {
                break;
            }
            nodes.push(Arc::new(Node::token(token)));
            self.pos += 1;
        }
        nodes
    }

    /// Move pending trivia into `children` and consume the next token.
    pub(crate) fn take(&mut self, children: &mut Vec<Arc<Node>>) -> Option<&'t Token<'a>> {
        children.extend(self.trivia());
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    /// Every remaining token, trivia included.
    pub(crate) fn rest(&mut self) -> Vec<Arc<Node>> {
        let tokens = &self.tokens[self.pos..];
        self.pos = self.tokens.len();
        tokens.iter().map(|t| Arc::new(Node::token(t))).collect()
    }

    /// Remaining tokens up to the last significant one; trailing
    /// trivia stays in the cursor.
    pub(crate) fn rest_trimmed_tokens(&mut self) -> &'t [Token<'a>] {
        let tokens = self.tokens;
        let last = tokens
            .iter()
            .rposition(|t| !t.kind.is_trivia())
            .map_or(self.pos, |i| (i + 1).max(self.pos));
        let slice = &tokens[self.pos..last];
        self.pos = last;
        slice
    }

    pub(crate) fn rest_trimmed(&mut self) -> Vec<Arc<Node>> {
        self.rest_trimmed_tokens()
            .iter()
            .map(|t| Arc::new(Node::token(t)))
            .collect()
    }
}
