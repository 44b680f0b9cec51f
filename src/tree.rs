//! Syntax tree produced by the parser.
//!
//! Every byte of the source belongs to exactly one leaf, so the leaves
//! of a tree, read in order, spell the original buffer. Interior nodes
//! share their children through `Arc`, which lets an incremental
//! reparse hand untouched subtrees to the new tree while the old tree
//! stays valid.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::config::ParseConfig;
use crate::error::{ErrorKind, SyntaxError};
use crate::grammar::{BinaryOp, DirectiveKind, UnaryOp};
use crate::token::{Span, Token, TokenKind};

/// `#` and `##` inside a function-like macro body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacroOperator {
    Stringize,
    Paste,
}

/// Shape of an expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprKind {
    Identifier,
    Number,
    Char,
    /// `"a.h"`, only as a call argument.
    String,
    /// `<stdio.h>`, only as a call argument.
    HeaderName,
    /// `defined X` or `defined(X)`. Its truth value depends on the
    /// macro table and is left to the consumer.
    Defined,
    /// `NAME(args)`.
    Call,
    Unary(UnaryOp),
    Binary(BinaryOp),
    /// `c ? a : b`, with `a` optional.
    Conditional,
    Parenthesized,
}

impl ExprKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::Number => "number_literal",
            Self::Char => "char_literal",
            Self::String => "string_literal",
            Self::HeaderName => "system_lib_string",
            Self::Defined => "preproc_defined",
            Self::Call => "call_expression",
            Self::Unary(_) => "unary_expression",
            Self::Binary(_) => "binary_expression",
            Self::Conditional => "conditional_expression",
            Self::Parenthesized => "parenthesized_expression",
        }
    }

    /// Atoms wrap exactly one token.
    #[must_use]
    pub const fn is_atom(self) -> bool {
        matches!(
            self,
            Self::Identifier | Self::Number | Self::Char | Self::String | Self::HeaderName
        )
    }
}

/// Node discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Synthetic root covering the whole buffer.
    TranslationUnit,
    /// Leaf holding one token.
    Token(TokenKind),
    /// Sequence of tokens: plain text between directives, a macro
    /// body, or the opaque argument of a directive.
    TokenRun,
    /// One directive line.
    Directive(DirectiveKind),
    /// `#if`/`#ifdef`/`#ifndef` through the matching `#endif`.
    ConditionalGroup,
    /// `#eval` through the matching `#endeval`.
    EvalBlock,
    MacroDefinition {
        function_like: bool,
    },
    ParameterList,
    ArgumentList,
    MacroOperator(MacroOperator),
    Expression(ExprKind),
    Error(ErrorKind),
}

impl NodeKind {
    /// Name used in S-expression output.
    #[must_use]
    pub fn name(self) -> Cow<'static, str> {
        match self {
            Self::TranslationUnit => Cow::Borrowed("translation_unit"),
            Self::Token(kind) => Cow::Borrowed(kind.name()),
            Self::TokenRun => Cow::Borrowed("token_run"),
            Self::Directive(kind) => Cow::Owned(format!("preproc_{}", kind.name())),
            Self::ConditionalGroup => Cow::Borrowed("conditional_group"),
            Self::EvalBlock => Cow::Borrowed("eval_block"),
            Self::MacroDefinition {
                function_like: false,
            } => Cow::Borrowed("preproc_def"),
            Self::MacroDefinition {
                function_like: true,
            } => Cow::Borrowed("preproc_function_def"),
            Self::ParameterList => Cow::Borrowed("preproc_params"),
            Self::ArgumentList => Cow::Borrowed("argument_list"),
            Self::MacroOperator(MacroOperator::Stringize) => Cow::Borrowed("stringize"),
            Self::MacroOperator(MacroOperator::Paste) => Cow::Borrowed("paste"),
            Self::Expression(kind) => Cow::Borrowed(kind.name()),
            Self::Error(_) => Cow::Borrowed("ERROR"),
        }
    }
}

/// Role of a child within its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Directive name after `#`.
    Keyword,
    Name,
    Parameters,
    Parameter,
    Value,
    Condition,
    /// Expression of `#eval`.
    Expr,
    Path,
    /// Tokens after an `#include` path.
    Trailing,
    LineNumber,
    Filename,
    Flag,
    Message,
    Argument,
    Operator,
    Left,
    Right,
    Operand,
    Consequence,
    Alternative,
    Function,
    Arguments,
}

impl Field {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Name => "name",
            Self::Parameters => "parameters",
            Self::Parameter => "parameter",
            Self::Value => "value",
            Self::Condition => "condition",
            Self::Expr => "expr",
            Self::Path => "path",
            Self::Trailing => "trailing",
            Self::LineNumber => "line_number",
            Self::Filename => "filename",
            Self::Flag => "flag",
            Self::Message => "message",
            Self::Argument => "argument",
            Self::Operator => "operator",
            Self::Left => "left",
            Self::Right => "right",
            Self::Operand => "operand",
            Self::Consequence => "consequence",
            Self::Alternative => "alternative",
            Self::Function => "function",
            Self::Arguments => "arguments",
        }
    }
}

/// A node of the syntax tree.
///
/// Equality, `Debug` output, shifting and dropping all walk the tree
/// with an explicit stack, so they work at any nesting depth.
#[derive(Clone)]
pub struct Node {
    kind: NodeKind,
    span: Span,
    field: Option<Field>,
    children: Vec<Arc<Self>>,
}

impl Node {
    pub(crate) const fn leaf(kind: NodeKind, span: Span) -> Self {
        Self {
            kind,
            span,
            field: None,
            children: Vec::new(),
        }
    }

    /// Interior node spanning its children.
    pub(crate) fn branch(kind: NodeKind, children: Vec<Arc<Self>>) -> Self {
        let start = children.first().map_or(0, |c| c.span.start);
        let end = children.last().map_or(start, |c| c.span.end);
        Self {
            kind,
            span: Span::new(start, end),
            field: None,
            children,
        }
    }

    /// Zero-width error marking something missing at `offset`.
    pub(crate) fn missing(kind: ErrorKind, offset: usize) -> Self {
        Self::leaf(NodeKind::Error(kind), Span::empty(offset))
    }

    /// Leaf for `token`, wrapped in an error node when the lexer
    /// flagged it.
    pub(crate) fn token(token: &Token<'_>) -> Self {
        let leaf = Self::leaf(NodeKind::Token(token.kind), token.span);
        match token.error {
            Some(error) => Self::branch(NodeKind::Error(error.into()), vec![Arc::new(leaf)]),
            None => leaf,
        }
    }

    pub(crate) fn error(kind: impl Into<ErrorKind>, children: Vec<Arc<Self>>) -> Self {
        Self::branch(NodeKind::Error(kind.into()), children)
    }

    #[must_use]
    pub(crate) fn with_field(mut self, field: Field) -> Self {
        self.field = Some(field);
        self
    }

    pub(crate) fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Deep copy with every span moved by `delta` bytes.
    pub(crate) fn shifted(&self, delta: isize) -> Self {
        // post-order: a node is rebuilt once all its children are
        let mut stack: Vec<Shifting<'_>> = Vec::new();
        let mut current = Shifting::new(self);
        loop {
            let node = current.node;
            if let Some(child) = node.children.get(current.done.len()) {
                stack.push(std::mem::replace(&mut current, Shifting::new(child)));
                continue;
            }
            let built = current.finish(delta);
            match stack.pop() {
                Some(mut parent) => {
                    parent.done.push(Arc::new(built));
                    current = parent;
                }
                None => return built,
            }
        }
    }

    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    #[must_use]
    pub const fn span(&self) -> Span {
        self.span
    }

    #[must_use]
    pub const fn field(&self) -> Option<Field> {
        self.field
    }

    #[must_use]
    pub fn children(&self) -> &[Arc<Self>] {
        &self.children
    }

    #[must_use]
    pub fn child(&self, index: usize) -> Option<&Self> {
        self.children.get(index).map(|c| &**c)
    }

    #[must_use]
    pub fn child_by_field(&self, field: Field) -> Option<&Self> {
        self.children_by_field(field).next()
    }

    pub fn children_by_field(&self, field: Field) -> impl Iterator<Item = &Self> {
        self.children
            .iter()
            .map(|c| &**c)
            .filter(move |c| c.field == Some(field))
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.kind, NodeKind::Error(_))
    }

    #[must_use]
    pub const fn error_kind(&self) -> Option<ErrorKind> {
        match self.kind {
            NodeKind::Error(kind) => Some(kind),
            _ => None,
        }
    }

    #[must_use]
    pub const fn directive_kind(&self) -> Option<DirectiveKind> {
        match self.kind {
            NodeKind::Directive(kind) => Some(kind),
            _ => None,
        }
    }

    #[must_use]
    pub const fn expr_kind(&self) -> Option<ExprKind> {
        match self.kind {
            NodeKind::Expression(kind) => Some(kind),
            _ => None,
        }
    }

    /// True when this node or any descendant is an error node.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.descendants().any(Self::is_error)
    }

    /// Pre-order walk starting at (and including) this node.
    #[must_use]
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Token leaves in source order.
    pub fn leaves(&self) -> impl Iterator<Item = &Self> {
        self.descendants()
            .filter(|n| matches!(n.kind, NodeKind::Token(_) | NodeKind::MacroOperator(_)))
    }

    /// `name` field of a macro definition, `#undef`, `#ifdef` or
    /// `defined`.
    #[must_use]
    pub fn name(&self) -> Option<&Self> {
        self.child_by_field(Field::Name)
    }

    /// Parameter leaves of a function-like macro definition.
    pub fn parameters(&self) -> impl Iterator<Item = &Self> {
        self.child_by_field(Field::Parameters)
            .into_iter()
            .flat_map(|list| list.children_by_field(Field::Parameter))
    }

    /// Replacement list of a macro definition.
    #[must_use]
    pub fn body(&self) -> Option<&Self> {
        self.child_by_field(Field::Value)
    }

    #[must_use]
    pub fn condition(&self) -> Option<&Self> {
        self.child_by_field(Field::Condition)
    }
}

/// A node whose shifted copy is under construction.
struct Shifting<'n> {
    node: &'n Node,
    done: Vec<Arc<Node>>,
}

impl<'n> Shifting<'n> {
    fn new(node: &'n Node) -> Self {
        Self {
            node,
            done: Vec::with_capacity(node.children.len()),
        }
    }

    fn finish(self, delta: isize) -> Node {
        Node {
            kind: self.node.kind,
            span: self.node.span.shifted(delta),
            field: self.node.field,
            children: self.done,
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        // pre-order plus child counts pins down the whole shape
        let mut left = self.descendants();
        let mut right = other.descendants();
        loop {
            match (left.next(), right.next()) {
                (None, None) => return true,
                (Some(a), Some(b))
                    if a.kind == b.kind
                        && a.span == b.span
                        && a.field == b.field
                        && a.children.len() == b.children.len() => {}
                _ => return false,
            }
        }
    }
}

impl Eq for Node {}

/// One line per node in pre-order, prefixed with its depth.
impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![(self, 0_usize)];
        while let Some((node, depth)) = stack.pop() {
            write!(f, "{depth}: {:?} {:?}", node.kind, node.span)?;
            if let Some(field) = node.field {
                write!(f, " [{}]", field.name())?;
            }
            if !stack.is_empty() || !node.children.is_empty() {
                writeln!(f)?;
            }
            stack.extend(node.children.iter().rev().map(|c| (&**c, depth + 1)));
        }
        Ok(())
    }
}

// Deeply nested groups would overflow the stack with the derived,
// recursive drop.
impl Drop for Node {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(child) = stack.pop() {
            if let Some(mut node) = Arc::into_inner(child) {
                stack.append(&mut node.children);
            }
        }
    }
}

/// Iterator returned by [`Node::descendants`].
#[derive(Debug)]
pub struct Descendants<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev().map(|c| &**c));
        Some(node)
    }
}

/// 1-based line and byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// Result of a parse: the source buffer, the root node and the edit
/// generation.
///
/// Equality compares source, config and nodes; the generation is
/// bookkeeping and is ignored.
#[derive(Debug, Clone)]
pub struct ParseTree {
    source: Arc<[u8]>,
    root: Arc<Node>,
    generation: u64,
    config: ParseConfig,
}

impl PartialEq for ParseTree {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.config == other.config && self.root == other.root
    }
}

impl Eq for ParseTree {}

impl ParseTree {
    pub(crate) const fn new(
        source: Arc<[u8]>,
        root: Arc<Node>,
        generation: u64,
        config: ParseConfig,
    ) -> Self {
        Self {
            source,
            root,
            generation,
            config,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Node {
        &self.root
    }

    pub(crate) const fn root_arc(&self) -> &Arc<Node> {
        &self.root
    }

    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub(crate) const fn source_arc(&self) -> &Arc<[u8]> {
        &self.source
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.source.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Number of reparses since the initial parse. See
    /// [`Parser::reparse_since`](crate::Parser::reparse_since).
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn config(&self) -> ParseConfig {
        self.config
    }

    /// Source bytes covered by `node`.
    #[must_use]
    pub fn text(&self, node: &Node) -> &[u8] {
        self.source
            .get(node.span.start..node.span.end)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn text_lossy(&self, node: &Node) -> Cow<'_, str> {
        String::from_utf8_lossy(self.text(node))
    }

    /// Line and column of a byte offset.
    #[must_use]
    pub fn position(&self, offset: usize) -> Position {
        let before = &self.source[..offset.min(self.source.len())];
        let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
        let line_start = before
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        Position {
            line,
            column: offset - line_start + 1,
        }
    }

    /// One diagnostic per error node, in source order.
    #[must_use]
    pub fn errors(&self) -> Vec<SyntaxError> {
        self.root
            .descendants()
            .filter_map(|node| {
                let kind = node.error_kind()?;
                let Position { line, column } = self.position(node.span.start);
                Some(SyntaxError {
                    kind,
                    span: node.span,
                    line,
                    column,
                })
            })
            .collect()
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        self.root.has_error()
    }

    /// S-expression rendering of the named structure.
    #[must_use]
    pub fn to_sexp(&self) -> String {
        crate::sexp::render(&self.root, &self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DirectiveErrorKind;

    fn ident(start: usize, end: usize) -> Arc<Node> {
        Arc::new(Node::leaf(
            NodeKind::Token(TokenKind::Identifier),
            Span::new(start, end),
        ))
    }

    #[test]
    fn branch_spans_children() {
        let node = Node::branch(NodeKind::TokenRun, vec![ident(2, 4), ident(5, 9)]);
        assert_eq!(node.span(), Span::new(2, 9));
    }

    #[test]
    fn descendants_are_preorder() {
        let inner = Arc::new(Node::branch(NodeKind::TokenRun, vec![ident(0, 1), ident(1, 2)]));
        let root = Node::branch(NodeKind::TranslationUnit, vec![inner, ident(2, 3)]);
        let spans: Vec<_> = root.descendants().map(|n| n.span()).collect();
        assert_eq!(
            spans,
            vec![
                Span::new(0, 3),
                Span::new(0, 2),
                Span::new(0, 1),
                Span::new(1, 2),
                Span::new(2, 3)
            ]
        );
    }

    #[test]
    fn shifted_moves_every_span() {
        let node = Node::branch(NodeKind::TokenRun, vec![ident(2, 4), ident(5, 9)]);
        let moved = node.shifted(-2);
        assert_eq!(moved.span(), Span::new(0, 7));
        assert_eq!(moved.child(1).map(Node::span), Some(Span::new(3, 7)));
    }

    #[test]
    fn field_lookup() {
        let name = Node::leaf(NodeKind::Token(TokenKind::Identifier), Span::new(0, 3));
        let name = Arc::new(name.with_field(Field::Name));
        let node = Node::branch(NodeKind::Directive(DirectiveKind::Undef), vec![name]);
        assert_eq!(node.name().map(Node::span), Some(Span::new(0, 3)));
        assert!(node.body().is_none());
    }

    #[test]
    fn errors_report_positions() {
        let err = Arc::new(Node::missing(
            DirectiveErrorKind::ExpectedMacroName.into(),
            4,
        ));
        let root = Arc::new(Node::branch(NodeKind::TranslationUnit, vec![err]));
        let tree = ParseTree::new(Arc::from(&b"ab\ncdef"[..]), root, 0, ParseConfig::default());
        let errors = tree.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!((errors[0].line, errors[0].column), (2, 2));
        assert_eq!(
            errors[0].to_string(),
            "expected macro name after #define at line 2, column 2"
        );
    }
}
