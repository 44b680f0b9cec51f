//! Incremental reparsing.
//!
//! Edits are folded into one changed region. Top-level items before
//! that region are reused as they are; parsing restarts at the start
//! of the first affected item and stops as soon as a new item ends
//! exactly where an old, unaffected item begins. The remaining old
//! items are then reused, shifted by the size change.

use std::sync::Arc;

use log::debug;

use crate::builder::{TreeBuilder, build_root, translation_unit};
use crate::error::StructuralError;
use crate::grammar::GrammarHandle;
use crate::tree::{Node, NodeKind, ParseTree};

/// One replacement: `deleted` bytes at `start` were replaced by
/// `inserted` bytes.
///
/// Offsets are in the coordinates of the buffer as it was just before
/// this edit, so a list of edits applies in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EditRange {
    pub start: usize,
    pub deleted: usize,
    pub inserted: usize,
}

impl EditRange {
    #[must_use]
    pub const fn new(start: usize, deleted: usize, inserted: usize) -> Self {
        Self {
            start,
            deleted,
            inserted,
        }
    }

    #[must_use]
    pub const fn insertion(start: usize, inserted: usize) -> Self {
        Self::new(start, 0, inserted)
    }

    #[must_use]
    pub const fn deletion(start: usize, deleted: usize) -> Self {
        Self::new(start, deleted, 0)
    }
}

/// Changed region: `start..old_end` in the old buffer became
/// `start..new_end` in the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Envelope {
    start: usize,
    old_end: usize,
    new_end: usize,
}

impl Envelope {
    /// New-buffer offset of an old offset at or after `old_end`.
    const fn map(self, old: usize) -> usize {
        old - self.old_end + self.new_end
    }

    #[allow(clippy::cast_possible_wrap)]
    const fn delta(self) -> isize {
        self.new_end as isize - self.old_end as isize
    }
}

/// Fold `edits` over a buffer of `old_len` bytes. `None` for an empty
/// list.
fn envelope(
    old_len: usize,
    edits: &[EditRange],
    new_len: usize,
) -> Result<Option<Envelope>, StructuralError> {
    let mut len = old_len;
    let mut folded: Option<Envelope> = None;

    for (index, edit) in edits.iter().enumerate() {
        let end = edit
            .start
            .checked_add(edit.deleted)
            .filter(|&end| end <= len)
            .ok_or(StructuralError::EditOutOfBounds {
                index,
                start: edit.start,
                end: edit.start.saturating_add(edit.deleted),
                len,
            })?;

        folded = Some(match folded {
            None => Envelope {
                start: edit.start,
                old_end: end,
                new_end: edit.start + edit.inserted,
            },
            Some(env) => {
                // `env.new_end` is in the current buffer, before this edit
                let (old_end, current_end) = if end > env.new_end {
                    (env.old_end + (end - env.new_end), end)
                } else {
                    (env.old_end, env.new_end)
                };
                Envelope {
                    start: env.start.min(edit.start),
                    old_end,
                    new_end: current_end - edit.deleted + edit.inserted,
                }
            }
        });
        len = (len - edit.deleted).saturating_add(edit.inserted);
    }

    if len != new_len {
        return Err(StructuralError::LengthMismatch {
            expected: len,
            actual: new_len,
        });
    }
    Ok(folded)
}

pub(crate) fn reparse(
    previous: &ParseTree,
    edits: &[EditRange],
    new_source: &[u8],
    grammar: GrammarHandle,
) -> Result<ParseTree, StructuralError> {
    let config = previous.config();
    let generation = previous.generation() + 1;

    let Some(env) = envelope(previous.len(), edits, new_source.len())? else {
        if new_source == previous.source() {
            debug!("no edits, sharing previous tree");
            return Ok(ParseTree::new(
                Arc::clone(previous.source_arc()),
                Arc::clone(previous.root_arc()),
                generation,
                config,
            ));
        }
        debug!("buffer changed without edits, parsing from scratch");
        let source: Arc<[u8]> = Arc::from(new_source);
        let root = build_root(&source, grammar, config);
        return Ok(ParseTree::new(source, Arc::new(root), generation, config));
    };

    let source: Arc<[u8]> = Arc::from(new_source);
    let old_items = previous.root().children();

    let mut first = old_items.partition_point(|item| item.span().end < env.start);
    // a token run ends where the next directive begins
    if first > 0 && old_items[first - 1].kind() == NodeKind::TokenRun {
        first -= 1;
    }
    let restart = old_items.get(first).map_or(0, |item| item.span().start);

    let mut items: Vec<Arc<Node>> = old_items[..first].to_vec();
    let mut next_old = first;
    let mut reparsed = 0;
    let mut reused_tail = 0;

    let mut builder = TreeBuilder::new(&source, grammar, config, restart);
    while let Some(item) = builder.next_item() {
        let end = item.span().end;
        items.push(item);
        reparsed += 1;
        if end < env.new_end {
            continue;
        }

        while let Some(old) = old_items.get(next_old) {
            let start = old.span().start;
            if start >= env.old_end && env.map(start) >= end {
                break;
            }
            next_old += 1;
        }

        let resync = old_items
            .get(next_old)
            .is_some_and(|old| env.map(old.span().start) == end);
        if resync {
            let delta = env.delta();
            for old in &old_items[next_old..] {
                items.push(if delta == 0 {
                    Arc::clone(old)
                } else {
                    Arc::new(old.shifted(delta))
                });
            }
            reused_tail = old_items.len() - next_old;
            break;
        }
    }

    debug!(
        "reparse: reused {first} leading items, reparsed {reparsed}, reused {reused_tail} trailing"
    );
    let root = translation_unit(items, source.len());
    Ok(ParseTree::new(source, Arc::new(root), generation, config))
}
