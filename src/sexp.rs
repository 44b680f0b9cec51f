//! S-expression printer for syntax trees.
//!
//! Output follows the usual tree-sitter shape: named nodes in
//! parentheses, fields as `name:` prefixes. Whitespace, newlines and
//! unlabeled punctuation are left out; labeled punctuators print their
//! text.

use crate::grammar::DirectiveKind;
use crate::token::TokenKind;
use crate::tree::{Field, Node, NodeKind};

/// Render `node` (and everything under it) over `source`.
#[must_use]
pub fn render(node: &Node, source: &[u8]) -> String {
    let mut out = String::new();
    let mut steps = vec![Step::Visit(node, None)];
    while let Some(step) = steps.pop() {
        match step {
            Step::Visit(node, parent) => render_node(&mut out, &mut steps, node, source, parent),
            Step::Close => out.push(')'),
        }
    }
    out
}

/// Pending work; a branch pushes its close paren under its children.
enum Step<'n> {
    Visit(&'n Node, Option<NodeKind>),
    Close,
}

fn render_node<'n>(
    out: &mut String,
    steps: &mut Vec<Step<'n>>,
    node: &'n Node,
    source: &[u8],
    parent: Option<NodeKind>,
) {
    match node.kind() {
        NodeKind::Token(kind) => render_token(out, node, kind, source, parent),
        NodeKind::Expression(kind) if kind.is_atom() && !node.has_error() => {
            open(out, node.field());
            out.push_str(kind.name());
            out.push(')');
        }
        kind => {
            open(out, node.field());
            out.push_str(&kind.name());
            steps.push(Step::Close);
            steps.extend(
                node.children()
                    .iter()
                    .rev()
                    .map(|child| Step::Visit(&**child, Some(kind))),
            );
        }
    }
}

fn render_token(
    out: &mut String,
    node: &Node,
    kind: TokenKind,
    source: &[u8],
    parent: Option<NodeKind>,
) {
    match kind {
        TokenKind::Whitespace | TokenKind::Newline | TokenKind::DirectiveHash | TokenKind::Eof => {}
        TokenKind::Punctuator => {
            if let Some(field) = node.field() {
                separate(out);
                push_field(out, field);
                push_text(out, node, source);
            }
        }
        TokenKind::Identifier if node.field() == Some(Field::Keyword) => {
            if parent == Some(NodeKind::Directive(DirectiveKind::Unknown)) {
                separate(out);
                push_field(out, Field::Keyword);
                push_text(out, node, source);
            }
        }
        _ => {
            open(out, node.field());
            out.push_str(kind.name());
            out.push(')');
        }
    }
}

fn separate(out: &mut String) {
    if !out.is_empty() && !out.ends_with('(') {
        out.push(' ');
    }
}

fn push_field(out: &mut String, field: Field) {
    out.push_str(field.name());
    out.push_str(": ");
}

fn open(out: &mut String, field: Option<Field>) {
    separate(out);
    if let Some(field) = field {
        push_field(out, field);
    }
    out.push('(');
}

fn push_text(out: &mut String, node: &Node, source: &[u8]) {
    let span = node.span();
    let text = source.get(span.start..span.end).unwrap_or_default();
    out.push_str(&format!("{:?}", String::from_utf8_lossy(text)));
}
