use std::sync::Arc;

use log::debug;

use crate::builder::build_root;
use crate::config::ParseConfig;
use crate::error::StructuralError;
use crate::grammar::{GrammarHandle, get_grammar};
use crate::incremental::{self, EditRange};
use crate::tree::ParseTree;

/// Parser instance bound to the shared grammar.
///
/// Cheap to create and to clone. Parsing never fails: malformed input
/// shows up as error nodes in the returned tree.
#[derive(Debug, Clone)]
pub struct Parser {
    grammar: GrammarHandle,
    config: ParseConfig,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    #[must_use]
    pub fn new() -> Self {
        get_grammar().parser()
    }

    #[must_use]
    pub const fn with_config(mut self, config: ParseConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub const fn config(&self) -> ParseConfig {
        self.config
    }

    #[must_use]
    pub const fn grammar(&self) -> &GrammarHandle {
        &self.grammar
    }

    /// Parse `source` from scratch.
    #[must_use]
    pub fn parse(&self, source: &[u8]) -> ParseTree {
        debug!("parsing {} bytes", source.len());
        let source: Arc<[u8]> = Arc::from(source);
        let root = build_root(&source, self.grammar.clone(), self.config);
        let tree = ParseTree::new(source, Arc::new(root), 0, self.config);
        debug!(
            "parsed {} top-level items, errors: {}",
            tree.root().children().len(),
            tree.has_error()
        );
        tree
    }

    /// Parse `new_source`, the result of applying `edits` to the source
    /// of `previous`, reusing unaffected parts of `previous`.
    ///
    /// The result equals `self.parse(new_source)` under the config that
    /// `previous` was built with. `previous` is left untouched.
    pub fn reparse(
        &self,
        previous: &ParseTree,
        edits: &[EditRange],
        new_source: &[u8],
    ) -> Result<ParseTree, StructuralError> {
        debug!(
            "reparsing generation {} with {} edit(s)",
            previous.generation(),
            edits.len()
        );
        incremental::reparse(previous, edits, new_source, self.grammar.clone())
    }

    /// Like [`Parser::reparse`], for edits recorded while `previous`
    /// was at generation `recorded`.
    ///
    /// Editors that queue edits should remember the generation they
    /// saw; edits queued against an older tree have offsets that no
    /// longer line up and are rejected.
    pub fn reparse_since(
        &self,
        previous: &ParseTree,
        recorded: u64,
        edits: &[EditRange],
        new_source: &[u8],
    ) -> Result<ParseTree, StructuralError> {
        if recorded != previous.generation() {
            return Err(StructuralError::StaleGeneration {
                recorded,
                current: previous.generation(),
            });
        }
        self.reparse(previous, edits, new_source)
    }
}

impl GrammarHandle {
    /// New parser with the default config.
    #[must_use]
    pub fn parser(&self) -> Parser {
        Parser {
            grammar: self.clone(),
            config: ParseConfig::default(),
        }
    }
}

/// Parse `source` with the default config.
#[must_use]
pub fn parse(source: &[u8]) -> ParseTree {
    Parser::new().parse(source)
}

/// Incrementally reparse with the default parser. See
/// [`Parser::reparse`].
pub fn reparse(
    previous: &ParseTree,
    edits: &[EditRange],
    new_source: &[u8],
) -> Result<ParseTree, StructuralError> {
    Parser::new().reparse(previous, edits, new_source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn parser_shares_grammar() {
        let a = Parser::new();
        let b = get_grammar().parser();
        assert!(a.grammar().same_grammar(b.grammar()));
    }

    #[test]
    fn reparse_keeps_config_of_previous_tree() {
        let config = ParseConfig::default().line_markers(false);
        let parser = Parser::new().with_config(config);
        let tree = parser.parse(b"# 1 \"a.c\"\n");
        let next = Parser::new()
            .reparse(&tree, &[EditRange::new(2, 1, 1)], b"# 2 \"a.c\"\n")
            .expect("reparse");
        assert_eq!(next.config(), config);
        assert_eq!(next, parser.parse(b"# 2 \"a.c\"\n"));
        assert_eq!(next.generation(), 1);
    }

    #[test]
    fn stale_generation_is_rejected() {
        let parser = Parser::new();
        let first = parser.parse(b"#define A 1\n");
        let second = parser
            .reparse_since(&first, 0, &[EditRange::new(10, 1, 1)], b"#define A 2\n")
            .expect("current generation");
        assert_eq!(second.generation(), 1);

        let err = parser
            .reparse_since(&second, 0, &[EditRange::new(10, 1, 1)], b"#define A 3\n")
            .expect_err("stale");
        assert_eq!(
            err,
            StructuralError::StaleGeneration {
                recorded: 0,
                current: 1
            }
        );
    }

    #[test]
    fn empty_edit_list_shares_root() {
        let tree = parse(b"#define A 1\n");
        let next = reparse(&tree, &[], b"#define A 1\n").expect("reparse");
        assert!(Arc::ptr_eq(tree.root_arc(), next.root_arc()));
        assert_eq!(next.generation(), 1);
    }
}
