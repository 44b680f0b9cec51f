//! Incremental, error-tolerant parser for the C preprocessor language.
//!
//! Builds a concrete syntax tree over preprocessor directives and the
//! text between them. Every byte of the input belongs to exactly one
//! leaf, malformed input becomes error nodes instead of failures, and
//! edited buffers can be reparsed reusing the unchanged parts of the
//! previous tree.
//!
//! # Quick start
//!
//! ## Parse a buffer
//!
//! ```
//! use c_preproc::{DirectiveKind, parse};
//!
//! let tree = parse(b"#ifdef DEBUG\n#define LOG(x) puts(#x)\n#endif\n");
//! assert!(!tree.has_error());
//!
//! let group = &tree.root().children()[0];
//! assert_eq!(group.children()[0].directive_kind(), Some(DirectiveKind::Ifdef));
//! ```
//!
//! ## Reparse after an edit
//!
//! ```
//! use c_preproc::{EditRange, parse, reparse};
//!
//! let old = parse(b"#define A 1\n#define B 2\n");
//! // replace "1" with "10"
//! let edit = EditRange::new(10, 1, 2);
//! let new = reparse(&old, &[edit], b"#define A 10\n#define B 2\n").unwrap();
//! assert_eq!(new, parse(b"#define A 10\n#define B 2\n"));
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

mod builder;
pub mod config;
mod directive;
pub mod error;
mod expr;
pub mod grammar;
mod incremental;
pub mod lexer;
mod line;
pub mod parser;
pub mod sexp;
pub mod token;
pub mod tree;

pub use config::ParseConfig;
pub use error::{
    DirectiveErrorKind, ErrorCategory, ErrorKind, ExpressionErrorKind, LexErrorKind,
    StructuralError, SyntaxError,
};
pub use grammar::{BinaryOp, DirectiveKind, GrammarHandle, UnaryOp, get_grammar};
pub use incremental::EditRange;
pub use lexer::{LexMode, Lexer, tokenize};
pub use parser::{Parser, parse, reparse};
pub use token::{Span, Token, TokenKind};
pub use tree::{ExprKind, Field, MacroOperator, Node, NodeKind, ParseTree, Position};
