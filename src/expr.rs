//! Precedence-climbing parser for `#if` / `#elif` expressions.
//!
//! Only syntax is recovered; nothing is evaluated. Malformed input
//! turns into error nodes in place and parsing carries on, so a bad
//! operand never hides its siblings.

use std::sync::Arc;

use crate::error::ExpressionErrorKind;
use crate::grammar::{BinaryOp, Grammar, prec};
use crate::line::LineCursor;
use crate::token::TokenKind;
use crate::tree::{ExprKind, Field, Node, NodeKind};

/// Parse one expression at the cursor. Callers consume leading trivia
/// first and only call this when a significant token remains.
pub(crate) fn parse_expression(
    cursor: &mut LineCursor<'_, '_>,
    grammar: &Grammar,
    max_depth: usize,
) -> Node {
    ExprParser::new(cursor, grammar, max_depth).expression(prec::COMMA)
}

/// Parse a primary or call expression, no binary operators.
pub(crate) fn parse_operand(
    cursor: &mut LineCursor<'_, '_>,
    grammar: &Grammar,
    max_depth: usize,
) -> Node {
    ExprParser::new(cursor, grammar, max_depth).expression(prec::CALL)
}

struct ExprParser<'c, 't, 'a> {
    cursor: &'c mut LineCursor<'t, 'a>,
    grammar: &'c Grammar,
    max_depth: usize,
    depth: usize,
}

impl<'c, 't, 'a> ExprParser<'c, 't, 'a> {
    const fn new(
        cursor: &'c mut LineCursor<'t, 'a>,
        grammar: &'c Grammar,
        max_depth: usize,
    ) -> Self {
        Self {
            cursor,
            grammar,
            max_depth,
            depth: 0,
        }
    }

    fn expression(&mut self, min: i8) -> Node {
        if self.depth >= self.max_depth {
            return self.too_deep();
        }
        self.depth += 1;

        let mut left = self.unary();
        while let Some(token) = self.cursor.peek() {
            if token.kind != TokenKind::Punctuator {
                break;
            }
            let spelling = token.spelling();
            if *spelling == *b"?" {
                if prec::CONDITIONAL < min {
                    break;
                }
                left = self.conditional(left);
            } else if let Some((op, precedence)) = self.grammar.binary_op(&spelling) {
                if precedence < min {
                    break;
                }
                left = self.binary(left, op, precedence);
            } else if self.grammar.is_assignment_op(&spelling) {
                if prec::ASSIGNMENT < min {
                    break;
                }
                left = self.assignment(left);
            } else {
                break;
            }
        }

        self.depth -= 1;
        left
    }

    /// Consume the next token as a leaf, trivia before it going to
    /// `children`.
    fn take_leaf(&mut self, children: &mut Vec<Arc<Node>>) -> Option<Node> {
        self.cursor.take(children).map(Node::token)
    }

    fn missing(&self, kind: ExpressionErrorKind) -> Node {
        Node::missing(kind.into(), self.cursor.here())
    }

    fn binary(&mut self, left: Node, op: BinaryOp, precedence: i8) -> Node {
        let mut children = vec![Arc::new(left.with_field(Field::Left))];
        if let Some(leaf) = self.take_leaf(&mut children) {
            children.push(Arc::new(leaf.with_field(Field::Operator)));
        }
        children.extend(self.cursor.trivia());
        let right = self.expression(precedence + 1);
        children.push(Arc::new(right.with_field(Field::Right)));
        Node::branch(NodeKind::Expression(ExprKind::Binary(op)), children)
    }

    fn assignment(&mut self, left: Node) -> Node {
        let mut children = vec![Arc::new(left.with_field(Field::Left))];
        if let Some(leaf) = self.take_leaf(&mut children) {
            children.push(Arc::new(leaf.with_field(Field::Operator)));
        }
        children.extend(self.cursor.trivia());
        let right = self.expression(prec::ASSIGNMENT);
        children.push(Arc::new(right.with_field(Field::Right)));
        Node::error(ExpressionErrorKind::AssignmentInExpression, children)
    }

    fn conditional(&mut self, condition: Node) -> Node {
        let mut children = vec![Arc::new(condition.with_field(Field::Condition))];
        if let Some(question) = self.take_leaf(&mut children) {
            children.push(Arc::new(question));
        }

        // GNU `a ?: b` leaves out the middle operand
        if !self.cursor.peek_is_punct(":") {
            children.extend(self.cursor.trivia());
            let consequence = self.expression(prec::COMMA);
            children.push(Arc::new(consequence.with_field(Field::Consequence)));
        }

        if self.cursor.peek_is_punct(":") {
            if let Some(colon) = self.take_leaf(&mut children) {
                children.push(Arc::new(colon));
            }
            children.extend(self.cursor.trivia());
            let alternative = self.expression(prec::CONDITIONAL);
            children.push(Arc::new(alternative.with_field(Field::Alternative)));
        } else {
            children.push(Arc::new(self.missing(ExpressionErrorKind::ExpectedColon)));
        }

        Node::branch(NodeKind::Expression(ExprKind::Conditional), children)
    }

    fn unary(&mut self) -> Node {
        let Some(token) = self.cursor.peek() else {
            return self.missing(ExpressionErrorKind::ExpectedExpression);
        };
        let op = if token.kind == TokenKind::Punctuator {
            self.grammar.unary_op(&token.spelling())
        } else {
            None
        };
        let Some(op) = op else {
            return self.primary();
        };

        if self.depth >= self.max_depth {
            return self.too_deep();
        }
        self.depth += 1;

        let mut children = Vec::new();
        if let Some(leaf) = self.take_leaf(&mut children) {
            children.push(Arc::new(leaf.with_field(Field::Operator)));
        }
        children.extend(self.cursor.trivia());
        let operand = self.unary();
        children.push(Arc::new(operand.with_field(Field::Operand)));

        self.depth -= 1;
        Node::branch(NodeKind::Expression(ExprKind::Unary(op)), children)
    }

    fn primary(&mut self) -> Node {
        let Some(token) = self.cursor.peek() else {
            return self.missing(ExpressionErrorKind::ExpectedExpression);
        };

        match token.kind {
            TokenKind::Identifier if token.is_identifier("defined") => self.defined(),
            TokenKind::Identifier => {
                let atom = self.atom(ExprKind::Identifier);
                if self.cursor.peek_is_punct("(") {
                    self.call(atom)
                } else {
                    atom
                }
            }
            TokenKind::Number => self.atom(ExprKind::Number),
            TokenKind::CharLiteral => self.atom(ExprKind::Char),
            TokenKind::Punctuator if token.is_punct("(") => self.parenthesized(),
            // closers belong to an enclosing construct
            TokenKind::Punctuator
                if token.is_punct(")") || token.is_punct(":") || token.is_punct(",") =>
            {
                self.missing(ExpressionErrorKind::ExpectedExpression)
            }
            _ => {
                let mut children = Vec::new();
                if let Some(leaf) = self.take_leaf(&mut children) {
                    children.push(Arc::new(leaf));
                }
                Node::error(ExpressionErrorKind::ExpectedExpression, children)
            }
        }
    }

    fn atom(&mut self, kind: ExprKind) -> Node {
        let mut children = Vec::new();
        if let Some(leaf) = self.take_leaf(&mut children) {
            children.push(Arc::new(leaf));
        }
        Node::branch(NodeKind::Expression(kind), children)
    }

    /// `defined NAME` or `defined ( NAME )`.
    fn defined(&mut self) -> Node {
        let mut children = Vec::new();
        if let Some(keyword) = self.take_leaf(&mut children) {
            children.push(Arc::new(keyword));
        }

        let parenthesized = self.cursor.peek_is_punct("(");
        if parenthesized {
            if let Some(open) = self.take_leaf(&mut children) {
                children.push(Arc::new(open));
            }
        }

        if self.cursor.peek_kind() == Some(TokenKind::Identifier) {
            if let Some(name) = self.take_leaf(&mut children) {
                children.push(Arc::new(name.with_field(Field::Name)));
            }
        } else {
            children.push(Arc::new(self.missing(ExpressionErrorKind::ExpectedDefinedName)));
        }

        if parenthesized {
            if self.cursor.peek_is_punct(")") {
                if let Some(close) = self.take_leaf(&mut children) {
                    children.push(Arc::new(close));
                }
            } else {
                children.push(Arc::new(self.missing(ExpressionErrorKind::UnclosedParenthesis)));
            }
        }

        Node::branch(NodeKind::Expression(ExprKind::Defined), children)
    }

    fn parenthesized(&mut self) -> Node {
        let mut children = Vec::new();
        if let Some(open) = self.take_leaf(&mut children) {
            children.push(Arc::new(open));
        }
        children.extend(self.cursor.trivia());
        let inner = self.expression(prec::COMMA);
        children.push(Arc::new(inner));

        if self.cursor.peek_is_punct(")") {
            if let Some(close) = self.take_leaf(&mut children) {
                children.push(Arc::new(close));
            }
            Node::branch(NodeKind::Expression(ExprKind::Parenthesized), children)
        } else {
            Node::error(ExpressionErrorKind::UnclosedParenthesis, children)
        }
    }

    fn call(&mut self, function: Node) -> Node {
        let mut children = vec![Arc::new(function.with_field(Field::Function))];
        children.extend(self.cursor.trivia());

        let mut list = Vec::new();
        if let Some(open) = self.take_leaf(&mut list) {
            list.push(Arc::new(open));
        }

        let mut closed = false;
        loop {
            if self.cursor.peek_is_punct(")") {
                if let Some(close) = self.take_leaf(&mut list) {
                    list.push(Arc::new(close));
                }
                closed = true;
                break;
            }
            if self.cursor.is_done() {
                break;
            }

            list.extend(self.cursor.trivia());
            let argument = self.argument();
            list.push(Arc::new(argument.with_field(Field::Argument)));

            if self.cursor.peek_is_punct(",") {
                if let Some(comma) = self.take_leaf(&mut list) {
                    list.push(Arc::new(comma));
                }
            } else if !self.cursor.peek_is_punct(")") {
                break;
            }
        }

        let list = if closed {
            Node::branch(NodeKind::ArgumentList, list)
        } else {
            Node::error(ExpressionErrorKind::UnclosedParenthesis, list)
        };
        children.push(Arc::new(list.with_field(Field::Arguments)));
        Node::branch(NodeKind::Expression(ExprKind::Call), children)
    }

    /// Besides expressions, arguments may be a string literal or a
    /// `<...>` name, as in `__has_include(<stdio.h>)`.
    fn argument(&mut self) -> Node {
        match self.cursor.peek_kind() {
            Some(TokenKind::StringLiteral) => self.atom(ExprKind::String),
            Some(TokenKind::HeaderName) => self.atom(ExprKind::HeaderName),
            _ => self.expression(prec::ASSIGNMENT),
        }
    }

    /// Give up on the rest of the line.
    fn too_deep(&mut self) -> Node {
        let rest = self.cursor.rest_trimmed();
        if rest.is_empty() {
            self.missing(ExpressionErrorKind::ExpressionTooDeep)
        } else {
            Node::error(ExpressionErrorKind::ExpressionTooDeep, rest)
        }
    }
}
