//! `#if` expression trees.

mod common;

use c_preproc::{
    BinaryOp, ErrorKind, ExprKind, ExpressionErrorKind, Field, Node, ParseConfig, Parser,
    UnaryOp,
};
use common::{assert_lossless, items, parse_str};

/// Parse `#if <expr>` and hand the condition to `check`.
fn with_condition(expr: &str, check: impl FnOnce(&Node)) {
    let tree = parse_str(&format!("#if {expr}\n#endif\n"));
    assert_lossless(&tree);
    let group = items(&tree)[0];
    let condition = group.children()[0].condition().expect("condition");
    check(condition);
}

fn op(node: &Node) -> Option<BinaryOp> {
    match node.expr_kind()? {
        ExprKind::Binary(op) => Some(op),
        _ => None,
    }
}

fn field<'n>(node: &'n Node, field: Field) -> &'n Node {
    node.child_by_field(field)
        .unwrap_or_else(|| panic!("no {} field on {:?}", field.name(), node.kind()))
}

#[test]
fn logical_or_is_loosest() {
    with_condition("A && B || C && D", |c| {
        assert_eq!(op(c), Some(BinaryOp::LogicalOr));
        assert_eq!(op(field(c, Field::Left)), Some(BinaryOp::LogicalAnd));
        assert_eq!(op(field(c, Field::Right)), Some(BinaryOp::LogicalAnd));
    });
}

#[test]
fn bitwise_ladder() {
    with_condition("A | B ^ C & D", |c| {
        assert_eq!(op(c), Some(BinaryOp::BitOr));
        let right = field(c, Field::Right);
        assert_eq!(op(right), Some(BinaryOp::BitXor));
        assert_eq!(op(field(right, Field::Right)), Some(BinaryOp::BitAnd));
    });
}

#[test]
fn equality_below_relational_below_shift() {
    with_condition("A == B < C << 1", |c| {
        assert_eq!(op(c), Some(BinaryOp::Equal));
        let right = field(c, Field::Right);
        assert_eq!(op(right), Some(BinaryOp::Less));
        assert_eq!(op(field(right, Field::Right)), Some(BinaryOp::ShiftLeft));
    });
}

#[test]
fn comma_operator() {
    with_condition("1, 2", |c| assert_eq!(op(c), Some(BinaryOp::Comma)));
}

#[test]
fn nested_unary() {
    with_condition("!~-X", |c| {
        assert_eq!(c.expr_kind(), Some(ExprKind::Unary(UnaryOp::Not)));
        let inner = field(c, Field::Operand);
        assert_eq!(inner.expr_kind(), Some(ExprKind::Unary(UnaryOp::Complement)));
    });
}

#[test]
fn parenthesized_overrides_precedence() {
    with_condition("(A + B) * C", |c| {
        assert_eq!(op(c), Some(BinaryOp::Multiply));
        assert_eq!(
            field(c, Field::Left).expr_kind(),
            Some(ExprKind::Parenthesized)
        );
    });
}

#[test]
fn char_literal_operand() {
    with_condition("'a' == 97", |c| {
        assert_eq!(field(c, Field::Left).expr_kind(), Some(ExprKind::Char));
    });
}

#[test]
fn feature_test_call() {
    with_condition("__has_attribute(noreturn) || X(1, 2)", |c| {
        assert_eq!(op(c), Some(BinaryOp::LogicalOr));
        let right = field(c, Field::Right);
        assert_eq!(right.expr_kind(), Some(ExprKind::Call));
        assert!(!c.has_error());
    });
}

#[test]
fn has_include_paths() {
    with_condition("__has_include(<stdio.h>)", |c| {
        assert!(!c.has_error());
        let args = field(c, Field::Arguments);
        assert_eq!(
            field(args, Field::Argument).expr_kind(),
            Some(ExprKind::HeaderName)
        );
    });
    with_condition("__has_include(\"a.h\") && __has_include_next(<a.h>)", |c| {
        assert!(!c.has_error());
        let left = field(field(c, Field::Left), Field::Arguments);
        assert_eq!(field(left, Field::Argument).expr_kind(), Some(ExprKind::String));
        let right = field(field(c, Field::Right), Field::Arguments);
        assert_eq!(
            field(right, Field::Argument).expr_kind(),
            Some(ExprKind::HeaderName)
        );
    });
}

#[test]
fn angle_brackets_outside_has_include_compare() {
    with_condition("A < B && C > D", |c| {
        assert_eq!(op(c), Some(BinaryOp::LogicalAnd));
        assert_eq!(op(field(c, Field::Left)), Some(BinaryOp::Less));
        assert!(!c.has_error());
    });
}

#[test]
fn comments_inside_expression() {
    with_condition("A /* x */ + // trailing\n", |c| {
        assert_eq!(op(c), Some(BinaryOp::Add));
    });
}

// -----------------------------------------------------------
// Recovery.
// -----------------------------------------------------------

fn first_error(expr: &str) -> ErrorKind {
    let tree = parse_str(&format!("#if {expr}\n#endif\n"));
    assert_lossless(&tree);
    tree.errors()
        .first()
        .map(|e| e.kind)
        .unwrap_or_else(|| panic!("no error in {expr:?}"))
}

#[test]
fn empty_condition() {
    assert_eq!(
        first_error(""),
        ErrorKind::Expression(ExpressionErrorKind::ExpectedExpression)
    );
}

#[test]
fn missing_close_paren() {
    assert_eq!(
        first_error("(A && B"),
        ErrorKind::Expression(ExpressionErrorKind::UnclosedParenthesis)
    );
}

#[test]
fn trailing_garbage() {
    assert_eq!(
        first_error("A B"),
        ErrorKind::Expression(ExpressionErrorKind::UnexpectedToken)
    );
}

#[test]
fn assignment() {
    assert_eq!(
        first_error("A += 1"),
        ErrorKind::Expression(ExpressionErrorKind::AssignmentInExpression)
    );
}

#[test]
fn conditional_without_colon() {
    assert_eq!(
        first_error("A ? B"),
        ErrorKind::Expression(ExpressionErrorKind::ExpectedColon)
    );
}

#[test]
fn string_is_not_an_operand() {
    assert_eq!(
        first_error("\"s\" == 1"),
        ErrorKind::Expression(ExpressionErrorKind::ExpectedExpression)
    );
}

#[test]
fn depth_limit_is_configurable() {
    let input = format!("#if {}1{}\n#endif\n", "(".repeat(40), ")".repeat(40));

    let tree = parse_str(&input);
    assert!(!tree.has_error());

    let parser = Parser::new().with_config(ParseConfig::default().max_expression_depth(16));
    let tree = parser.parse(input.as_bytes());
    assert!(
        tree.errors()
            .iter()
            .any(|e| e.kind == ErrorKind::Expression(ExpressionErrorKind::ExpressionTooDeep))
    );
    assert_lossless(&tree);
}

#[test]
fn deep_unary_chain_is_bounded() {
    let input = format!("#if {}1\n#endif\n", "!".repeat(100_000));
    let tree = parse_str(&input);
    assert!(tree.has_error());
    assert_lossless(&tree);
}
