//! Incremental reparse must agree with a fresh parse.

mod common;

use std::sync::Arc;

use c_preproc::{EditRange, StructuralError, parse, reparse};
use common::{apply_edit, assert_lossless, assert_span_invariants};

const SOURCE: &str = "\
#include <stdio.h>

#define A 1
#define B(x) ((x) + A)

#if A
int a;
#else
int b;
#endif

int main(void) { return B(2); }
";

fn check_edit(source: &str, start: usize, deleted: usize, inserted: &str) {
    let old = parse(source.as_bytes());
    let (new_source, edit) = apply_edit(source.as_bytes(), start, deleted, inserted.as_bytes());
    let new = reparse(&old, &[edit], &new_source).expect("valid edit");
    let fresh = parse(&new_source);
    assert_eq!(
        new.root(),
        fresh.root(),
        "reparse differs after replacing {start}..{} with {inserted:?}",
        start + deleted
    );
    assert_eq!(new.generation(), old.generation() + 1);
    assert_lossless(&new);
    assert_span_invariants(&new);
}

#[test]
fn edit_inside_macro_body() {
    let at = SOURCE.find("A 1").expect("A 1") + 2;
    check_edit(SOURCE, at, 1, "42");
}

#[test]
fn insert_directive_into_token_run() {
    let at = SOURCE.find("int main").expect("main");
    check_edit(SOURCE, at, 0, "#undef A\n");
}

#[test]
fn turn_code_into_directive() {
    let at = SOURCE.find("int a;").expect("int a");
    check_edit(SOURCE, at, 0, "#");
}

#[test]
fn delete_endif() {
    let at = SOURCE.find("#endif").expect("endif");
    check_edit(SOURCE, at, 7, "");
}

#[test]
fn insert_if_before_everything() {
    check_edit(SOURCE, 0, 0, "#if 0\n");
}

#[test]
fn open_comment_swallows_rest() {
    let at = SOURCE.find("#define B").expect("define B");
    check_edit(SOURCE, at, 0, "/* ");
}

#[test]
fn add_line_continuation() {
    let at = SOURCE.find("A 1").expect("A 1") + 3;
    check_edit(SOURCE, at, 0, " \\");
}

#[test]
fn append_at_end() {
    check_edit(SOURCE, SOURCE.len(), 0, "#endif\n");
}

#[test]
fn delete_everything() {
    check_edit(SOURCE, 0, SOURCE.len(), "");
}

#[test]
fn edit_empty_buffer() {
    check_edit("", 0, 0, "#define X\n");
}

#[test]
fn unaffected_prefix_is_shared() {
    let old = parse(SOURCE.as_bytes());
    let at = SOURCE.find("int main").expect("main");
    let (new_source, edit) = apply_edit(SOURCE.as_bytes(), at, 3, b"long");
    let new = reparse(&old, &[edit], &new_source).expect("valid edit");

    let old_items = old.root().children();
    let new_items = new.root().children();
    assert!(Arc::ptr_eq(&old_items[0], &new_items[0]));
    assert!(Arc::ptr_eq(&old_items[1], &new_items[1]));
}

#[test]
fn suffix_is_reused_after_same_length_edit() {
    let old = parse(SOURCE.as_bytes());
    let at = SOURCE.find("A 1").expect("A 1") + 2;
    let (new_source, edit) = apply_edit(SOURCE.as_bytes(), at, 1, b"2");
    let new = reparse(&old, &[edit], &new_source).expect("valid edit");

    let last_old = old.root().children().last().expect("item");
    let last_new = new.root().children().last().expect("item");
    assert!(Arc::ptr_eq(last_old, last_new));
    assert_eq!(new, parse(&new_source));
}

#[test]
fn several_edits_in_sequence() {
    let old = parse(SOURCE.as_bytes());
    let first = SOURCE.find("int a;").expect("int a");
    let (step, e1) = apply_edit(SOURCE.as_bytes(), first, 3, b"long");
    let second = SOURCE.find("#define A").expect("define A");
    let (step, e2) = apply_edit(&step, second, 0, b"#pragma once\n");
    let last = step.len() - 2;
    let (new_source, e3) = apply_edit(&step, last, 1, b"");

    let new = reparse(&old, &[e1, e2, e3], &new_source).expect("valid edits");
    assert_eq!(new, parse(&new_source));
}

#[test]
fn chained_reparses() {
    let mut tree = parse(SOURCE.as_bytes());
    let mut source = SOURCE.as_bytes().to_vec();
    for round in 0..5 {
        let at = source.len() / 2;
        let (next, edit) = apply_edit(&source, at, 1, b"#x\n");
        tree = reparse(&tree, &[edit], &next).expect("valid edit");
        assert_eq!(tree, parse(&next), "round {round}");
        source = next;
    }
    assert_eq!(tree.generation(), 5);
}

#[test]
fn previous_tree_is_untouched() {
    let old = parse(SOURCE.as_bytes());
    let snapshot = old.clone();
    let (new_source, edit) = apply_edit(SOURCE.as_bytes(), 0, 9, b"");
    let _new = reparse(&old, &[edit], &new_source).expect("valid edit");
    assert_eq!(old, snapshot);
    assert_eq!(old.source(), SOURCE.as_bytes());
}

#[test]
fn out_of_bounds_edit() {
    let old = parse(b"#define A\n");
    let err = reparse(&old, &[EditRange::new(5, 10, 0)], b"").expect_err("out of bounds");
    assert!(matches!(err, StructuralError::EditOutOfBounds { index: 0, .. }));
}

#[test]
fn length_mismatch() {
    let old = parse(b"#define A\n");
    let err = reparse(&old, &[EditRange::insertion(0, 1)], b"#define A\n").expect_err("mismatch");
    assert_eq!(
        err,
        StructuralError::LengthMismatch {
            expected: 11,
            actual: 10
        }
    );
}

#[test]
fn unreported_change_falls_back_to_full_parse() {
    let old = parse(b"#define A\n");
    let new = reparse(&old, &[], b"#define B\n").expect("same length");
    assert_eq!(new, parse(b"#define B\n"));
}
