//! Recognition of a single directive line.
//!
//! The line is lexed up front (in the mode the keyword asks for) and
//! then parsed with a [`LineCursor`]. Every byte from the start of the
//! line through its newline becomes part of the returned node.

use std::sync::Arc;

use log::trace;

use crate::config::ParseConfig;
use crate::error::{DirectiveErrorKind, ExpressionErrorKind};
use crate::expr;
use crate::grammar::{DirectiveKind, Grammar};
use crate::lexer::{LexMode, TokenStream};
use crate::line::LineCursor;
use crate::token::{Token, TokenKind};
use crate::tree::{Field, MacroOperator, Node, NodeKind};

/// Parse the directive line at the front of `stream`.
///
/// The caller has checked [`TokenStream::line_starts_directive`].
pub(crate) fn parse_directive(
    stream: &mut TokenStream<'_>,
    grammar: &Grammar,
    config: &ParseConfig,
) -> Node {
    let mut children = Vec::new();

    loop {
        let token = stream.next();
        match token.kind {
            TokenKind::Eof => break,
            TokenKind::DirectiveHash => {
                children.push(leaf(&token));
                break;
            }
            _ => children.push(leaf(&token)),
        }
    }
    while stream.peek().kind.is_trivia() {
        children.push(leaf(&stream.next()));
    }

    let head = stream.peek();
    let kind = match head.kind {
        TokenKind::Identifier => {
            let kind = match grammar.directive(&head.spelling()) {
                DirectiveKind::Elifdef | DirectiveKind::Elifndef if !config.elifdef => {
                    DirectiveKind::Unknown
                }
                kind => kind,
            };
            let keyword = stream.next();
            children.push(Arc::new(Node::token(&keyword).with_field(Field::Keyword)));
            stream.set_mode(mode_for(kind));
            kind
        }
        TokenKind::Number if config.line_markers => DirectiveKind::LineMarker,
        TokenKind::Newline | TokenKind::Eof => DirectiveKind::Null,
        _ => DirectiveKind::Unknown,
    };
    trace!("#{kind} at byte {}", head.span.start);

    let line = stream.rest_of_line();
    let end = stream.peek().span.start;
    let mut cursor = LineCursor::new(&line, end);
    let mut operands = Operands {
        cursor: &mut cursor,
        grammar,
        config,
        children: &mut children,
    };

    match kind {
        DirectiveKind::Define => operands.define(),
        DirectiveKind::Undef
        | DirectiveKind::Ifdef
        | DirectiveKind::Ifndef
        | DirectiveKind::Elifdef
        | DirectiveKind::Elifndef => operands.identifier(kind),
        DirectiveKind::If | DirectiveKind::Elif => operands.expression(Field::Condition),
        DirectiveKind::Eval => operands.expression(Field::Expr),
        DirectiveKind::Include | DirectiveKind::IncludeNext => operands.include(),
        DirectiveKind::Line | DirectiveKind::LineMarker => operands.line(kind),
        DirectiveKind::Error | DirectiveKind::Warning => operands.opaque(Field::Message),
        DirectiveKind::Pragma | DirectiveKind::Unknown => operands.opaque(Field::Argument),
        DirectiveKind::Else
        | DirectiveKind::Endif
        | DirectiveKind::Endeval
        | DirectiveKind::Null => {}
    }
    operands.finish(kind);

    if let Some(newline) = stream.next_if_newline() {
        children.push(leaf(&newline));
    }
    Node::branch(NodeKind::Directive(kind), children)
}

const fn mode_for(kind: DirectiveKind) -> LexMode {
    match kind {
        DirectiveKind::Include | DirectiveKind::IncludeNext => LexMode::HeaderName,
        DirectiveKind::If | DirectiveKind::Elif | DirectiveKind::Eval => LexMode::Condition,
        DirectiveKind::Error
        | DirectiveKind::Warning
        | DirectiveKind::Pragma
        | DirectiveKind::Unknown => LexMode::Message,
        _ => LexMode::Normal,
    }
}

fn leaf(token: &Token<'_>) -> Arc<Node> {
    Arc::new(Node::token(token))
}

/// Operand parser for the tokens after the keyword.
struct Operands<'c, 't, 'a> {
    cursor: &'c mut LineCursor<'t, 'a>,
    grammar: &'c Grammar,
    config: &'c ParseConfig,
    children: &'c mut Vec<Arc<Node>>,
}

impl Operands<'_, '_, '_> {
    fn push(&mut self, node: Node) {
        self.children.push(Arc::new(node));
    }

    fn skip_trivia(&mut self) {
        let trivia = self.cursor.trivia();
        self.children.extend(trivia);
    }

    /// Error node holding the rest of the line, or a zero-width one
    /// when the line is empty.
    fn wrap_rest(&mut self, kind: DirectiveErrorKind) -> Node {
        if self.cursor.is_done() {
            Node::missing(kind.into(), self.cursor.here())
        } else {
            self.skip_trivia();
            Node::error(kind, self.cursor.rest_trimmed())
        }
    }

    /// Leftover significant tokens become an error; trailing trivia is
    /// kept at directive level.
    fn finish(&mut self, kind: DirectiveKind) {
        if !self.cursor.is_done() {
            self.skip_trivia();
            let extra = self.cursor.rest_trimmed();
            self.push(Node::error(DirectiveErrorKind::UnexpectedTokens(kind), extra));
        }
        let rest = self.cursor.rest();
        self.children.extend(rest);
    }

    fn identifier(&mut self, kind: DirectiveKind) {
        if self.cursor.peek_kind() == Some(TokenKind::Identifier) {
            if let Some(name) = self.cursor.take(self.children) {
                self.push(Node::token(name).with_field(Field::Name));
            }
        } else {
            self.push(Node::missing(
                DirectiveErrorKind::ExpectedIdentifier(kind).into(),
                self.cursor.here(),
            ));
        }
    }

    fn expression(&mut self, field: Field) {
        if self.cursor.is_done() {
            self.push(
                Node::missing(ExpressionErrorKind::ExpectedExpression.into(), self.cursor.here())
                    .with_field(field),
            );
            return;
        }
        self.skip_trivia();
        let expression =
            expr::parse_expression(self.cursor, self.grammar, self.config.max_expression_depth);
        self.push(expression.with_field(field));

        if !self.cursor.is_done() {
            self.skip_trivia();
            let extra = self.cursor.rest_trimmed();
            self.push(Node::error(ExpressionErrorKind::UnexpectedToken, extra));
        }
    }

    fn include(&mut self) {
        let path = match self.cursor.peek() {
            Some(token) if token.kind == TokenKind::Identifier => {
                self.skip_trivia();
                expr::parse_operand(self.cursor, self.grammar, self.config.max_expression_depth)
            }
            Some(token)
                if matches!(token.kind, TokenKind::StringLiteral | TokenKind::HeaderName) =>
            {
                match self.cursor.take(self.children) {
                    Some(token) => Node::token(token),
                    None => return,
                }
            }
            _ => {
                let error = self.wrap_rest(DirectiveErrorKind::ExpectedHeaderName);
                self.push(error);
                return;
            }
        };
        self.push(path.with_field(Field::Path));

        if !self.cursor.is_done() {
            self.skip_trivia();
            let trailing = self.cursor.rest_trimmed();
            self.push(Node::branch(NodeKind::TokenRun, trailing).with_field(Field::Trailing));
        }
    }

    /// `#line 42 "file"` and GNU `# 42 "file" 1 3`.
    fn line(&mut self, kind: DirectiveKind) {
        if self.cursor.peek_kind() != Some(TokenKind::Number) {
            let error = self.wrap_rest(DirectiveErrorKind::ExpectedLineNumber);
            self.push(error);
            return;
        }
        if let Some(number) = self.cursor.take(self.children) {
            self.push(Node::token(number).with_field(Field::LineNumber));
        }

        if self.cursor.peek_kind() == Some(TokenKind::StringLiteral) {
            if let Some(filename) = self.cursor.take(self.children) {
                self.push(Node::token(filename).with_field(Field::Filename));
            }
            // flags only follow a filename, and only in line markers
            while kind == DirectiveKind::LineMarker
                && self.cursor.peek_kind() == Some(TokenKind::Number)
            {
                if let Some(flag) = self.cursor.take(self.children) {
                    self.push(Node::token(flag).with_field(Field::Flag));
                }
            }
        }
    }

    fn opaque(&mut self, field: Field) {
        if self.cursor.is_done() {
            return;
        }
        self.skip_trivia();
        let run = self.cursor.rest_trimmed();
        self.push(Node::branch(NodeKind::TokenRun, run).with_field(field));
    }

    fn define(&mut self) {
        if self.cursor.peek_kind() != Some(TokenKind::Identifier) {
            let error = self.wrap_rest(DirectiveErrorKind::ExpectedMacroName);
            self.push(error);
            return;
        }
        self.skip_trivia();

        let mut definition = Vec::new();
        if let Some(name) = self.cursor.take(&mut definition) {
            definition.push(Arc::new(Node::token(name).with_field(Field::Name)));
        }

        let function_like = self.cursor.adjacent_punct("(");
        if function_like {
            let parameters = self.parameter_list();
            definition.push(Arc::new(parameters.with_field(Field::Parameters)));
        }

        if !self.cursor.is_done() {
            definition.extend(self.cursor.trivia());
            let body = replacement_list(self.cursor.rest_trimmed_tokens(), function_like);
            definition.push(Arc::new(body.with_field(Field::Value)));
        }

        trace!("macro definition, function-like: {function_like}");
        self.push(Node::branch(
            NodeKind::MacroDefinition { function_like },
            definition,
        ));
    }

    /// `( a, b, ... )`, including GNU `args...`.
    fn parameter_list(&mut self) -> Node {
        let mut list = Vec::new();
        if let Some(open) = self.cursor.take(&mut list) {
            list.push(Arc::new(Node::token(open)));
        }

        let mut expect_parameter = true;
        let mut after_comma = false;
        let mut closed = false;
        let mut malformed = false;

        while let Some(token) = self.cursor.peek() {
            if token.is_punct(")") {
                if after_comma {
                    malformed = true;
                    list.push(Arc::new(Node::missing(
                        DirectiveErrorKind::MalformedParameterList.into(),
                        self.cursor.here(),
                    )));
                }
                if let Some(close) = self.cursor.take(&mut list) {
                    list.push(Arc::new(Node::token(close)));
                }
                closed = true;
                break;
            }

            if expect_parameter && (token.kind == TokenKind::Identifier || token.is_punct("...")) {
                let variadic = token.is_punct("...");
                if let Some(parameter) = self.cursor.take(&mut list) {
                    list.push(Arc::new(Node::token(parameter).with_field(Field::Parameter)));
                }
                if !variadic && self.cursor.peek_is_punct("...") {
                    if let Some(ellipsis) = self.cursor.take(&mut list) {
                        list.push(Arc::new(Node::token(ellipsis)));
                    }
                }
                expect_parameter = false;
                after_comma = false;
            } else if !expect_parameter && token.is_punct(",") {
                if let Some(comma) = self.cursor.take(&mut list) {
                    list.push(Arc::new(Node::token(comma)));
                }
                expect_parameter = true;
                after_comma = true;
            } else {
                malformed = true;
                list.extend(self.cursor.trivia());
                let mut bad = Vec::new();
                while self.cursor.peek().is_some_and(|t| !t.is_punct(")")) {
                    if let Some(token) = self.cursor.take(&mut bad) {
                        bad.push(Arc::new(Node::token(token)));
                    }
                }
                list.push(Arc::new(Node::error(
                    DirectiveErrorKind::MalformedParameterList,
                    bad,
                )));
                after_comma = false;
            }
        }

        if closed {
            if malformed {
                trace!("malformed parameter list");
            }
            Node::branch(NodeKind::ParameterList, list)
        } else {
            Node::error(DirectiveErrorKind::MalformedParameterList, list)
        }
    }
}

/// Macro body as a token run; `#` and `##` become operator nodes in
/// function-like macros and errors elsewhere.
fn replacement_list(tokens: &[Token<'_>], function_like: bool) -> Node {
    let children = tokens
        .iter()
        .map(|token| {
            let operator = if token.is_punct("#") {
                Some(MacroOperator::Stringize)
            } else if token.is_punct("##") {
                Some(MacroOperator::Paste)
            } else {
                None
            };
            let node = match operator {
                Some(op) if function_like => Node::leaf(NodeKind::MacroOperator(op), token.span),
                Some(_) => Node::error(DirectiveErrorKind::MisplacedOperator, vec![leaf(token)]),
                None => Node::token(token),
            };
            Arc::new(node)
        })
        .collect();
    Node::branch(NodeKind::TokenRun, children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::get_grammar;
    use crate::lexer::Lexer;
    use crate::tree::ExprKind;
    use test_log::test;

    fn directive(input: &str) -> Node {
        directive_with(input, &ParseConfig::default())
    }

    fn directive_with(input: &str, config: &ParseConfig) -> Node {
        let grammar = get_grammar();
        let mut stream = TokenStream::new(Lexer::new(input.as_bytes(), grammar.clone()));
        assert!(stream.line_starts_directive());
        parse_directive(&mut stream, &grammar, config)
    }

    fn assert_covers(node: &Node, input: &str) {
        assert_eq!(node.span().start, 0);
        assert_eq!(node.span().end, input.len());
    }

    #[test]
    fn object_like_define() {
        let input = "#define FOO 1 + 2\n";
        let node = directive(input);
        assert_covers(&node, input);
        assert_eq!(node.directive_kind(), Some(DirectiveKind::Define));
        let def = node
            .children()
            .iter()
            .find(|c| matches!(c.kind(), NodeKind::MacroDefinition { .. }))
            .expect("definition");
        assert_eq!(
            def.kind(),
            NodeKind::MacroDefinition {
                function_like: false
            }
        );
        assert_eq!(def.name().map(Node::span), Some(crate::token::Span::new(8, 11)));
        let body = def.body().expect("body");
        assert_eq!(body.span(), crate::token::Span::new(12, 17));
        assert!(!node.has_error());
    }

    #[test]
    fn function_like_define() {
        let node = directive("#define MAX(a, b) ((a) > (b) ? (a) : (b))\n");
        let def = &node.children()[3];
        assert_eq!(
            def.kind(),
            NodeKind::MacroDefinition {
                function_like: true
            }
        );
        assert_eq!(def.parameters().count(), 2);
        assert!(!node.has_error());
    }

    #[test]
    fn space_before_paren_is_object_like() {
        let node = directive("#define F (x)\n");
        let def = &node.children()[3];
        assert_eq!(
            def.kind(),
            NodeKind::MacroDefinition {
                function_like: false
            }
        );
    }

    #[test]
    fn variadic_parameters() {
        for input in [
            "#define LOG(fmt, ...) f(fmt, __VA_ARGS__)\n",
            "#define LOG(args...) f(args)\n",
        ] {
            let node = directive(input);
            assert!(!node.has_error(), "{input}");
        }
    }

    #[test]
    fn malformed_parameter_list() {
        let node = directive("#define F(a, 1) a\n");
        assert!(node.has_error());
        let node = directive("#define F(a,) a\n");
        assert!(node.has_error());
        let node = directive("#define F(a b\n");
        assert!(node.has_error());
    }

    #[test]
    fn stringize_and_paste() {
        let node = directive("#define CAT(a, b) a ## b #a\n");
        assert!(!node.has_error());
        let operators = node
            .descendants()
            .filter(|n| matches!(n.kind(), NodeKind::MacroOperator(_)))
            .count();
        assert_eq!(operators, 2);

        let node = directive("#define BAD a ## b\n");
        assert!(node.has_error());
    }

    #[test]
    fn define_without_name() {
        let node = directive("#define\n");
        assert!(node.has_error());
        assert!(
            !node
                .children()
                .iter()
                .any(|c| matches!(c.kind(), NodeKind::MacroDefinition { .. }))
        );
    }

    #[test]
    fn if_condition() {
        let node = directive("#if defined(A) && B > 2 // note\n");
        let condition = node.condition().expect("condition");
        assert_eq!(
            condition.expr_kind(),
            Some(ExprKind::Binary(crate::grammar::BinaryOp::LogicalAnd))
        );
        assert!(!node.has_error());
    }

    #[test]
    fn has_include_condition() {
        for input in [
            "#if __has_include(<stdio.h>)\n",
            "#if __has_include(\"a.h\")\n",
            "#elif defined(X) && __has_include_next( <sys/x.h> )\n",
        ] {
            let node = directive(input);
            assert_covers(&node, input);
            assert!(!node.has_error(), "{input}");
        }

        let node = directive("#if __has_include(<stdio.h>)\n");
        let call = node.condition().expect("condition");
        let args = call.child_by_field(Field::Arguments).expect("arguments");
        let path = args.child_by_field(Field::Argument).expect("argument");
        assert_eq!(path.expr_kind(), Some(ExprKind::HeaderName));
    }

    #[test]
    fn eval_expression() {
        let node = directive("#eval 1 + 2\n");
        assert_eq!(node.directive_kind(), Some(DirectiveKind::Eval));
        let expr = node.child_by_field(Field::Expr).expect("expr");
        assert_eq!(
            expr.expr_kind(),
            Some(ExprKind::Binary(crate::grammar::BinaryOp::Add))
        );
        assert!(!node.has_error());

        let node = directive("#endeval extra\n");
        assert!(node.has_error());
    }

    #[test]
    fn if_without_expression() {
        let node = directive("#if\n");
        let condition = node.condition().expect("condition");
        assert!(condition.is_error());
        assert!(condition.span().is_empty());
    }

    #[test]
    fn ifdef_and_extra_tokens() {
        let node = directive("#ifdef FOO\n");
        assert!(node.name().is_some());
        assert!(!node.has_error());

        let node = directive("#ifdef FOO BAR\n");
        assert!(node.has_error());

        let node = directive("#ifdef\n");
        assert_eq!(
            node.children()
                .iter()
                .find_map(|c| c.error_kind()),
            Some(DirectiveErrorKind::ExpectedIdentifier(DirectiveKind::Ifdef).into())
        );
    }

    #[test]
    fn include_forms() {
        for input in [
            "#include <stdio.h>\n",
            "#include \"local.h\"\n",
            "#include HEADER\n",
            "#include FOO(bar)\n",
            "#include_next <limits.h>\n",
        ] {
            let node = directive(input);
            assert!(node.child_by_field(Field::Path).is_some(), "{input}");
            assert!(!node.has_error(), "{input}");
        }
    }

    #[test]
    fn include_without_path() {
        let node = directive("#include\n");
        assert!(node.has_error());
        let node = directive("#include 42\n");
        assert!(node.has_error());
    }

    #[test]
    fn line_marker() {
        let node = directive("# 42 \"file.c\" 1 3\n");
        assert_eq!(node.directive_kind(), Some(DirectiveKind::LineMarker));
        assert_eq!(node.children_by_field(Field::Flag).count(), 2);
        assert!(!node.has_error());

        let config = ParseConfig::default().line_markers(false);
        let node = directive_with("# 42 \"file.c\"\n", &config);
        assert_eq!(node.directive_kind(), Some(DirectiveKind::Unknown));
    }

    #[test]
    fn line_directive() {
        let node = directive("#line 10 \"a.c\"\n");
        assert!(node.child_by_field(Field::LineNumber).is_some());
        assert!(node.child_by_field(Field::Filename).is_some());
        assert!(!node.has_error());

        let node = directive("#line x\n");
        assert!(node.has_error());
    }

    #[test]
    fn error_message_keeps_lone_quote() {
        let node = directive("#error don't do this\n");
        let message = node.child_by_field(Field::Message).expect("message");
        assert_eq!(message.kind(), NodeKind::TokenRun);
        assert!(!node.has_error());
    }

    #[test]
    fn elifdef_disabled_is_unknown() {
        let config = ParseConfig::default().elifdef(false);
        let node = directive_with("#elifdef X\n", &config);
        assert_eq!(node.directive_kind(), Some(DirectiveKind::Unknown));
    }

    #[test]
    fn null_directive() {
        let node = directive("#   \n");
        assert_eq!(node.directive_kind(), Some(DirectiveKind::Null));
        assert!(!node.has_error());
    }

    #[test]
    fn directive_without_newline_at_eof() {
        let input = "  #  endif";
        let node = directive(input);
        assert_covers(&node, input);
        assert_eq!(node.directive_kind(), Some(DirectiveKind::Endif));
    }
}
