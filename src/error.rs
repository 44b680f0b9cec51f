use std::fmt;

use crate::grammar::DirectiveKind;
pub use crate::lexer::LexErrorKind;
use crate::token::Span;

/// Taxonomy bucket of a syntax error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Lex,
    Directive,
    Expression,
}

/// Malformed directive syntax or unbalanced conditional nesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveErrorKind {
    /// `#define` without an identifier.
    ExpectedMacroName,
    /// `#ifdef`, `#ifndef`, `#elifdef`, `#elifndef` or `#undef` without
    /// an identifier.
    ExpectedIdentifier(DirectiveKind),
    /// `#include` without a quoted or `<...>` path.
    ExpectedHeaderName,
    /// `#line` without a line number.
    ExpectedLineNumber,
    /// Bad token inside a macro parameter list.
    MalformedParameterList,
    /// `#` or `##` in an object-like macro body.
    MisplacedOperator,
    /// Extra tokens at the end of a directive line.
    UnexpectedTokens(DirectiveKind),
    /// `#endif` with no open group.
    UnbalancedEndif,
    /// `#elif*` or `#else` with no open group.
    UnbalancedBranch(DirectiveKind),
    /// `#elif*` or `#else` after the group's `#else`.
    BranchAfterElse(DirectiveKind),
    /// Group still open at end of input.
    UnterminatedConditional,
    /// `#endeval` with no open `#eval`.
    UnbalancedEndeval,
    /// `#eval` without `#endeval` before end of input.
    UnterminatedEval,
}

impl fmt::Display for DirectiveErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExpectedMacroName => write!(f, "expected macro name after #define"),
            Self::ExpectedIdentifier(kind) => write!(f, "expected identifier after #{kind}"),
            Self::ExpectedHeaderName => write!(f, "expected \"file\" or <file> after #include"),
            Self::ExpectedLineNumber => write!(f, "expected line number"),
            Self::MalformedParameterList => write!(f, "malformed macro parameter list"),
            Self::MisplacedOperator => {
                write!(f, "'#' and '##' are only valid in function-like macro bodies")
            }
            Self::UnexpectedTokens(kind) => write!(f, "unexpected tokens after #{kind}"),
            Self::UnbalancedEndif => write!(f, "#endif without #if"),
            Self::UnbalancedBranch(kind) => write!(f, "#{kind} without #if"),
            Self::BranchAfterElse(kind) => write!(f, "#{kind} after #else"),
            Self::UnterminatedConditional => write!(f, "unterminated conditional directive"),
            Self::UnbalancedEndeval => write!(f, "#endeval without #eval"),
            Self::UnterminatedEval => write!(f, "#eval without #endeval"),
        }
    }
}

/// Malformed `#if`, `#elif` or `#eval` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionErrorKind {
    ExpectedExpression,
    /// `(` without a matching `)`.
    UnclosedParenthesis,
    /// Tokens left over after a complete expression.
    UnexpectedToken,
    /// `=`, `+=` and friends.
    AssignmentInExpression,
    /// `?` without `:`.
    ExpectedColon,
    /// `defined` without an identifier.
    ExpectedDefinedName,
    ExpressionTooDeep,
}

impl fmt::Display for ExpressionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExpectedExpression => write!(f, "expected expression"),
            Self::UnclosedParenthesis => write!(f, "expected ')'"),
            Self::UnexpectedToken => write!(f, "unexpected token in expression"),
            Self::AssignmentInExpression => {
                write!(f, "assignment is not allowed in a preprocessor expression")
            }
            Self::ExpectedColon => write!(f, "expected ':' in conditional expression"),
            Self::ExpectedDefinedName => write!(f, "expected identifier after 'defined'"),
            Self::ExpressionTooDeep => write!(f, "expression nested too deeply"),
        }
    }
}

/// What an error node recovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Lex(LexErrorKind),
    Directive(DirectiveErrorKind),
    Expression(ExpressionErrorKind),
}

impl ErrorKind {
    #[must_use]
    pub const fn category(self) -> ErrorCategory {
        match self {
            Self::Lex(_) => ErrorCategory::Lex,
            Self::Directive(_) => ErrorCategory::Directive,
            Self::Expression(_) => ErrorCategory::Expression,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lex(kind) => kind.fmt(f),
            Self::Directive(kind) => kind.fmt(f),
            Self::Expression(kind) => kind.fmt(f),
        }
    }
}

impl From<LexErrorKind> for ErrorKind {
    fn from(kind: LexErrorKind) -> Self {
        Self::Lex(kind)
    }
}

impl From<DirectiveErrorKind> for ErrorKind {
    fn from(kind: DirectiveErrorKind) -> Self {
        Self::Directive(kind)
    }
}

impl From<ExpressionErrorKind> for ErrorKind {
    fn from(kind: ExpressionErrorKind) -> Self {
        Self::Expression(kind)
    }
}

/// Diagnostic for one error node in a tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {line}, column {column}")]
pub struct SyntaxError {
    pub kind: ErrorKind,
    pub span: Span,
    pub line: usize,
    pub column: usize,
}

/// Edit list that does not fit the previous tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    /// Edit reaches past the end of the buffer it applies to.
    #[error("edit {index} covers bytes {start}..{end} of a {len}-byte buffer")]
    EditOutOfBounds {
        index: usize,
        start: usize,
        end: usize,
        len: usize,
    },
    /// New buffer length disagrees with the edits.
    #[error("edits produce a {expected}-byte buffer, got {actual} bytes")]
    LengthMismatch { expected: usize, actual: usize },
    /// Edits were recorded against a different generation of the tree.
    #[error("edits recorded against generation {recorded}, tree is at generation {current}")]
    StaleGeneration { recorded: u64, current: u64 },
}
