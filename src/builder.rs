//! Assembles top-level items from the token stream.
//!
//! Conditional groups and `#eval` blocks are tracked with an explicit
//! stack of open frames, so nesting depth never touches the call stack. An item is
//! handed out only once the stack is empty again, which makes every
//! item boundary a point where parsing can restart from scratch.

use std::sync::Arc;

use log::trace;

use crate::config::ParseConfig;
use crate::directive::parse_directive;
use crate::error::DirectiveErrorKind;
use crate::grammar::{DirectiveKind, GrammarHandle};
use crate::lexer::{Lexer, TokenStream};
use crate::token::{Span, TokenKind};
use crate::tree::{Node, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    InsideIf,
    InsideElif,
    InsideElse,
    InsideEval,
}

impl FrameState {
    /// Node kind of the finished frame and the error for a frame left
    /// open at end of input.
    const fn closing(self) -> (NodeKind, DirectiveErrorKind) {
        match self {
            Self::InsideEval => (NodeKind::EvalBlock, DirectiveErrorKind::UnterminatedEval),
            _ => (
                NodeKind::ConditionalGroup,
                DirectiveErrorKind::UnterminatedConditional,
            ),
        }
    }
}

/// An open conditional group or `#eval` block.
#[derive(Debug)]
struct Frame {
    state: FrameState,
    children: Vec<Arc<Node>>,
}

#[derive(Debug)]
pub(crate) struct TreeBuilder<'a> {
    stream: TokenStream<'a>,
    grammar: GrammarHandle,
    config: ParseConfig,
    frames: Vec<Frame>,
}

impl<'a> TreeBuilder<'a> {
    /// Builder reading `source` from `offset`, which must be the start
    /// of a line outside any conditional group.
    pub(crate) fn new(
        source: &'a [u8],
        grammar: GrammarHandle,
        config: ParseConfig,
        offset: usize,
    ) -> Self {
        let lexer = Lexer::starting_at(source, grammar.clone(), offset);
        Self {
            stream: TokenStream::new(lexer),
            grammar,
            config,
            frames: Vec::new(),
        }
    }

    /// Next complete top-level item, or `None` at end of input.
    pub(crate) fn next_item(&mut self) -> Option<Arc<Node>> {
        loop {
            let item = if self.stream.at_eof() {
                let frame = self.frames.pop()?;
                trace!("closing unterminated group at end of input");
                let (kind, error) = frame.state.closing();
                let group = Arc::new(Node::branch(kind, frame.children));
                self.emit(Node::error(error, vec![group]))
            } else if self.stream.line_starts_directive() {
                let directive = parse_directive(&mut self.stream, &self.grammar, &self.config);
                self.place(directive)
            } else {
                let run = self.token_run();
                self.emit(run)
            };

            if item.is_some() {
                return item;
            }
        }
    }

    /// Hand `node` to the innermost open group, or out to the caller
    /// when none is open.
    fn emit(&mut self, node: Node) -> Option<Arc<Node>> {
        let node = Arc::new(node);
        match self.frames.last_mut() {
            Some(frame) => {
                frame.children.push(node);
                None
            }
            None => Some(node),
        }
    }

    fn place(&mut self, directive: Node) -> Option<Arc<Node>> {
        let Some(kind) = directive.directive_kind() else {
            return self.emit(directive);
        };

        if kind.opens_group() || kind == DirectiveKind::Eval {
            trace!("open #{kind} at depth {}", self.frames.len());
            let state = if kind == DirectiveKind::Eval {
                FrameState::InsideEval
            } else {
                FrameState::InsideIf
            };
            self.frames.push(Frame {
                state,
                children: vec![Arc::new(directive)],
            });
            return None;
        }

        let innermost = self.frames.last().map(|frame| frame.state);
        let in_group = innermost.is_some_and(|state| state != FrameState::InsideEval);
        let in_eval = innermost == Some(FrameState::InsideEval);

        if kind.continues_group() {
            let Some(frame) = self.frames.last_mut().filter(|_| in_group) else {
                return self.emit(Node::error(
                    DirectiveErrorKind::UnbalancedBranch(kind),
                    vec![Arc::new(directive)],
                ));
            };
            if frame.state == FrameState::InsideElse {
                frame.children.push(Arc::new(Node::error(
                    DirectiveErrorKind::BranchAfterElse(kind),
                    vec![Arc::new(directive)],
                )));
            } else {
                frame.children.push(Arc::new(directive));
                frame.state = if kind == DirectiveKind::Else {
                    FrameState::InsideElse
                } else {
                    FrameState::InsideElif
                };
            }
            return None;
        }

        let closes = match kind {
            DirectiveKind::Endif => Some((in_group, DirectiveErrorKind::UnbalancedEndif)),
            DirectiveKind::Endeval => Some((in_eval, DirectiveErrorKind::UnbalancedEndeval)),
            _ => None,
        };
        if let Some((matched, unbalanced)) = closes {
            // a closer that does not match the innermost frame leaves it open
            let frame = if matched { self.frames.pop() } else { None };
            return match frame {
                Some(mut frame) => {
                    trace!("close #{kind} frame at depth {}", self.frames.len());
                    frame.children.push(Arc::new(directive));
                    let (node_kind, _) = frame.state.closing();
                    self.emit(Node::branch(node_kind, frame.children))
                }
                None => self.emit(Node::error(unbalanced, vec![Arc::new(directive)])),
            };
        }

        self.emit(directive)
    }

    /// Whole non-directive lines up to the next directive or EOF.
    fn token_run(&mut self) -> Node {
        let mut children = Vec::new();
        loop {
            let token = self.stream.next();
            if token.kind == TokenKind::Eof {
                break;
            }
            children.push(Arc::new(Node::token(&token)));
            if token.kind == TokenKind::Newline
                && (self.stream.at_eof() || self.stream.line_starts_directive())
            {
                break;
            }
        }
        Node::branch(NodeKind::TokenRun, children)
    }
}

/// Root node over all of `source`.
pub(crate) fn build_root(source: &[u8], grammar: GrammarHandle, config: ParseConfig) -> Node {
    let mut builder = TreeBuilder::new(source, grammar, config, 0);
    let items = std::iter::from_fn(|| builder.next_item()).collect();
    translation_unit(items, source.len())
}

pub(crate) fn translation_unit(items: Vec<Arc<Node>>, len: usize) -> Node {
    Node::branch(NodeKind::TranslationUnit, items).with_span(Span::new(0, len))
}
