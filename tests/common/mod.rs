#![allow(dead_code)]

use c_preproc::{EditRange, Node, NodeKind, ParseTree, parse};

pub fn parse_str(input: &str) -> ParseTree {
    parse(input.as_bytes())
}

/// Leaves in order reproduce the source byte for byte.
pub fn assert_lossless(tree: &ParseTree) {
    let mut offset = 0;
    let mut rebuilt = Vec::with_capacity(tree.len());
    for leaf in tree.root().leaves() {
        assert_eq!(
            leaf.span().start,
            offset,
            "gap or overlap before leaf {:?}",
            leaf.kind()
        );
        rebuilt.extend_from_slice(tree.text(leaf));
        offset = leaf.span().end;
    }
    assert_eq!(offset, tree.len(), "leaves stop short of end of input");
    assert_eq!(
        rebuilt,
        tree.source(),
        "round-trip mismatch:\n--- expected ---\n{}\n--- got ---\n{}",
        String::from_utf8_lossy(tree.source()),
        String::from_utf8_lossy(&rebuilt)
    );
}

/// Children lie inside their parent, in order, without overlap.
pub fn assert_span_invariants(tree: &ParseTree) {
    let root = tree.root();
    assert_eq!(root.span().start, 0);
    assert_eq!(root.span().end, tree.len());
    for node in root.descendants() {
        let mut previous_end = node.span().start;
        for child in node.children() {
            assert!(
                node.span().contains(&child.span()),
                "{:?} {:?} does not contain child {:?} {:?}",
                node.kind(),
                node.span(),
                child.kind(),
                child.span()
            );
            assert!(
                child.span().start >= previous_end,
                "child {:?} at {:?} overlaps its previous sibling",
                child.kind(),
                child.span()
            );
            previous_end = child.span().end;
        }
    }
}

/// Top-level items of a tree.
pub fn items(tree: &ParseTree) -> Vec<&Node> {
    tree.root().children().iter().map(|c| &**c).collect()
}

pub fn count_kind(tree: &ParseTree, kind: NodeKind) -> usize {
    tree.root().descendants().filter(|n| n.kind() == kind).count()
}

/// Apply a replacement to `source`, returning the new buffer and the
/// matching edit.
pub fn apply_edit(
    source: &[u8],
    start: usize,
    deleted: usize,
    inserted: &[u8],
) -> (Vec<u8>, EditRange) {
    let mut out = Vec::with_capacity(source.len() - deleted + inserted.len());
    out.extend_from_slice(&source[..start]);
    out.extend_from_slice(inserted);
    out.extend_from_slice(&source[start + deleted..]);
    (out, EditRange::new(start, deleted, inserted.len()))
}
