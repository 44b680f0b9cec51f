/// Dialect switches for a parse.
///
/// A tree remembers the config it was built with so that `reparse`
/// produces the same result as a fresh parse of the edited buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseConfig {
    /// Accept GNU line markers (`# 42 "file.c"`).
    pub line_markers: bool,
    /// Accept C23 `#elifdef` / `#elifndef`.
    pub elifdef: bool,
    /// Deepest expression nesting before the rest of the line becomes
    /// an error node.
    pub max_expression_depth: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            line_markers: true,
            elifdef: true,
            max_expression_depth: 256,
        }
    }
}

impl ParseConfig {
    #[must_use]
    pub const fn line_markers(mut self, enabled: bool) -> Self {
        self.line_markers = enabled;
        self
    }

    #[must_use]
    pub const fn elifdef(mut self, enabled: bool) -> Self {
        self.elifdef = enabled;
        self
    }

    #[must_use]
    pub const fn max_expression_depth(mut self, depth: usize) -> Self {
        self.max_expression_depth = depth;
        self
    }
}
