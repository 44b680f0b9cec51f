//! Process-wide grammar definition.
//!
//! The table is built once on first use and shared read-only by every
//! parser, so independent parses may run on separate threads.

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, LazyLock};

/// Name reported by [`GrammarHandle::name`].
pub const LANGUAGE_NAME: &str = "c_preproc";

/// Binding strength of expression operators. Higher binds tighter.
pub mod prec {
    pub const COMMA: i8 = -3;
    pub const ASSIGNMENT: i8 = -2;
    pub const CONDITIONAL: i8 = -1;
    pub const LOGICAL_OR: i8 = 1;
    pub const LOGICAL_AND: i8 = 2;
    pub const INCLUSIVE_OR: i8 = 3;
    pub const EXCLUSIVE_OR: i8 = 4;
    pub const BITWISE_AND: i8 = 5;
    pub const EQUAL: i8 = 6;
    pub const RELATIONAL: i8 = 7;
    pub const SHIFT: i8 = 9;
    pub const ADD: i8 = 10;
    pub const MULTIPLY: i8 = 11;
    pub const UNARY: i8 = 14;
    pub const CALL: i8 = 15;
}

/// Directive keyword following `#`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    If,
    Ifdef,
    Ifndef,
    Elif,
    Elifdef,
    Elifndef,
    Else,
    Endif,
    Include,
    IncludeNext,
    Define,
    Undef,
    Line,
    /// GNU line marker: `# 42 "file.c" 1`.
    LineMarker,
    Error,
    Warning,
    Pragma,
    /// `#eval EXPR`, closed by `#endeval`.
    Eval,
    Endeval,
    /// `#` alone on a line.
    Null,
    Unknown,
}

impl DirectiveKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::If => "if",
            Self::Ifdef => "ifdef",
            Self::Ifndef => "ifndef",
            Self::Elif => "elif",
            Self::Elifdef => "elifdef",
            Self::Elifndef => "elifndef",
            Self::Else => "else",
            Self::Endif => "endif",
            Self::Include => "include",
            Self::IncludeNext => "include_next",
            Self::Define => "define",
            Self::Undef => "undef",
            Self::Line => "line",
            Self::LineMarker => "line_marker",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Pragma => "pragma",
            Self::Eval => "eval",
            Self::Endeval => "endeval",
            Self::Null => "null",
            Self::Unknown => "unknown",
        }
    }

    /// `#if`, `#ifdef` and `#ifndef` open a conditional group.
    #[must_use]
    pub const fn opens_group(self) -> bool {
        matches!(self, Self::If | Self::Ifdef | Self::Ifndef)
    }

    /// `#elif*` and `#else` switch the branch of the innermost group.
    #[must_use]
    pub const fn continues_group(self) -> bool {
        matches!(
            self,
            Self::Elif | Self::Elifdef | Self::Elifndef | Self::Else
        )
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Complement,
    Negate,
    Plus,
}

impl UnaryOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Not => "!",
            Self::Complement => "~",
            Self::Negate => "-",
            Self::Plus => "+",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Comma,
    LogicalOr,
    LogicalAnd,
    BitOr,
    BitXor,
    BitAnd,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    ShiftLeft,
    ShiftRight,
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
}

impl BinaryOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Comma => ",",
            Self::LogicalOr => "||",
            Self::LogicalAnd => "&&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::BitAnd => "&",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::ShiftLeft => "<<",
            Self::ShiftRight => ">>",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Remainder => "%",
        }
    }
}

/// Immutable description of the C preprocessor language.
#[derive(Debug)]
pub struct Grammar {
    directives: Vec<(&'static str, DirectiveKind)>,
    binary_ops: Vec<(&'static str, BinaryOp, i8)>,
    unary_ops: Vec<(&'static str, UnaryOp)>,
    assignment_ops: Vec<&'static str>,
    /// Sorted longest first so the lexer takes the maximal munch.
    punctuators: Vec<&'static str>,
}

impl Grammar {
    fn new() -> Self {
        use DirectiveKind as D;

        let directives = vec![
            ("if", D::If),
            ("ifdef", D::Ifdef),
            ("ifndef", D::Ifndef),
            ("elif", D::Elif),
            ("elifdef", D::Elifdef),
            ("elifndef", D::Elifndef),
            ("else", D::Else),
            ("endif", D::Endif),
            ("include", D::Include),
            ("include_next", D::IncludeNext),
            ("define", D::Define),
            ("undef", D::Undef),
            ("line", D::Line),
            ("error", D::Error),
            ("warning", D::Warning),
            ("pragma", D::Pragma),
            ("eval", D::Eval),
            ("endeval", D::Endeval),
        ];

        let binary_ops = vec![
            (",", BinaryOp::Comma, prec::COMMA),
            ("||", BinaryOp::LogicalOr, prec::LOGICAL_OR),
            ("&&", BinaryOp::LogicalAnd, prec::LOGICAL_AND),
            ("|", BinaryOp::BitOr, prec::INCLUSIVE_OR),
            ("^", BinaryOp::BitXor, prec::EXCLUSIVE_OR),
            ("&", BinaryOp::BitAnd, prec::BITWISE_AND),
            ("==", BinaryOp::Equal, prec::EQUAL),
            ("!=", BinaryOp::NotEqual, prec::EQUAL),
            ("<", BinaryOp::Less, prec::RELATIONAL),
            ("<=", BinaryOp::LessEqual, prec::RELATIONAL),
            (">", BinaryOp::Greater, prec::RELATIONAL),
            (">=", BinaryOp::GreaterEqual, prec::RELATIONAL),
            ("<<", BinaryOp::ShiftLeft, prec::SHIFT),
            (">>", BinaryOp::ShiftRight, prec::SHIFT),
            ("+", BinaryOp::Add, prec::ADD),
            ("-", BinaryOp::Subtract, prec::ADD),
            ("*", BinaryOp::Multiply, prec::MULTIPLY),
            ("/", BinaryOp::Divide, prec::MULTIPLY),
            ("%", BinaryOp::Remainder, prec::MULTIPLY),
        ];

        let unary_ops = vec![
            ("!", UnaryOp::Not),
            ("~", UnaryOp::Complement),
            ("-", UnaryOp::Negate),
            ("+", UnaryOp::Plus),
        ];

        let assignment_ops = vec![
            "=", "*=", "/=", "%=", "+=", "-=", "<<=", ">>=", "&=", "^=", "|=",
        ];

        let mut punctuators = vec![
            "...", "<<=", ">>=", "->", "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||",
            "*=", "/=", "%=", "+=", "-=", "&=", "^=", "|=", "##", "::", "(", ")", "{", "}", "[",
            "]", ".", ",", ";", ":", "?", "!", "~", "-", "+", "*", "/", "%", "<", ">", "&", "^",
            "|", "=", "#",
        ];
        punctuators.sort_by_key(|p| std::cmp::Reverse(p.len()));

        Self {
            directives,
            binary_ops,
            unary_ops,
            assignment_ops,
            punctuators,
        }
    }

    /// Directive named by `keyword`, or [`DirectiveKind::Unknown`].
    #[must_use]
    pub fn directive(&self, keyword: &[u8]) -> DirectiveKind {
        self.directives
            .iter()
            .find(|(name, _)| name.as_bytes() == keyword)
            .map_or(DirectiveKind::Unknown, |&(_, kind)| kind)
    }

    #[must_use]
    pub fn binary_op(&self, spelling: &[u8]) -> Option<(BinaryOp, i8)> {
        self.binary_ops
            .iter()
            .find(|(sym, _, _)| sym.as_bytes() == spelling)
            .map(|&(_, op, prec)| (op, prec))
    }

    #[must_use]
    pub fn unary_op(&self, spelling: &[u8]) -> Option<UnaryOp> {
        self.unary_ops
            .iter()
            .find(|(sym, _)| sym.as_bytes() == spelling)
            .map(|&(_, op)| op)
    }

    #[must_use]
    pub fn is_assignment_op(&self, spelling: &[u8]) -> bool {
        self.assignment_ops.iter().any(|sym| sym.as_bytes() == spelling)
    }

    /// Punctuators, longest first.
    #[must_use]
    pub fn punctuators(&self) -> &[&'static str] {
        &self.punctuators
    }
}

static GRAMMAR: LazyLock<Arc<Grammar>> = LazyLock::new(|| {
    log::debug!("initializing {LANGUAGE_NAME} grammar");
    Arc::new(Grammar::new())
});

/// Shared, reference-counted handle to the grammar.
#[derive(Debug, Clone)]
pub struct GrammarHandle(Arc<Grammar>);

impl GrammarHandle {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        LANGUAGE_NAME
    }

    /// True when both handles point at the same table.
    #[must_use]
    pub fn same_grammar(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for GrammarHandle {
    type Target = Grammar;

    fn deref(&self) -> &Grammar {
        &self.0
    }
}

/// Returns the process-wide grammar, building it on first call.
#[must_use]
pub fn get_grammar() -> GrammarHandle {
    GrammarHandle(Arc::clone(&GRAMMAR))
}
