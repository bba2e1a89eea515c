/**
 * Chunk Diff Algebra
 *
 * This module implements the operation algebra the sync protocol is built
 * on: computing a chunk list between two texts, applying chunks to a text,
 * and transforming (rebasing) a chunk against a concurrently committed one.
 *
 * All positions and lengths count Unicode code points, never bytes. Clients
 * on every platform agree on code-point indices, so edits next to emoji,
 * combining marks or RTL runs converge byte-for-byte everywhere.
 */

use serde::{Deserialize, Serialize};

/// Kind of edit a [`Chunk`] describes. The wire encoding is the raw
/// discriminant: `-1` for a removal, `1` for an insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Operation {
    Remove = -1,
    Add = 1,
}

impl From<Operation> for i8 {
    fn from(op: Operation) -> Self {
        match op {
            Operation::Remove => -1,
            Operation::Add => 1,
        }
    }
}

impl TryFrom<i8> for Operation {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Operation::Remove),
            1 => Ok(Operation::Add),
            other => Err(format!("invalid chunk operation: {other}")),
        }
    }
}

/// One insert or delete on a text.
///
/// `position` is the code-point index the chunk applies at and `len` the
/// code-point length of `text`. The removed text is carried even for
/// `Remove` chunks so transforms against overlapping removes stay exact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    #[serde(rename = "type")]
    pub kind: Operation,
    pub position: i64,
    pub text: String,
    pub len: i64,
}

impl Chunk {
    pub fn add(position: i64, text: impl Into<String>) -> Self {
        let text = text.into();
        let len = text.chars().count() as i64;
        Chunk {
            kind: Operation::Add,
            position,
            text,
            len,
        }
    }

    pub fn remove(position: i64, text: impl Into<String>) -> Self {
        let text = text.into();
        let len = text.chars().count() as i64;
        Chunk {
            kind: Operation::Remove,
            position,
            text,
            len,
        }
    }
}

/// Compute the chunk list that turns `old_text` into `new_text`.
///
/// Chunks are emitted in the order they apply to `old_text`, tracked by a
/// cursor: inserts advance the cursor by the inserted length, deletes leave
/// it in place, equal runs advance it by the run length. The contract is
/// `apply_multiple(old_text, &compute(old_text, new_text)) == new_text`.
pub fn compute(old_text: &str, new_text: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut idx: i64 = 0;

    for segment in dissimilar::diff(old_text, new_text) {
        match segment {
            dissimilar::Chunk::Insert(text) => {
                let chunk = Chunk::add(idx, text);
                idx += chunk.len;
                chunks.push(chunk);
            }
            dissimilar::Chunk::Delete(text) => {
                chunks.push(Chunk::remove(idx, text));
            }
            dissimilar::Chunk::Equal(text) => {
                idx += text.chars().count() as i64;
            }
        }
    }

    chunks
}

/// Apply a single chunk to `text`.
///
/// Out-of-range edits are clamped rather than rejected: an `Add` past the
/// end appends, a `Remove` starting at or past the end is a no-op, and a
/// `Remove` running past the end stops at the end.
pub fn apply(text: &str, chunk: &Chunk) -> String {
    let runes: Vec<char> = text.chars().collect();
    let text_len = runes.len() as i64;

    match chunk.kind {
        Operation::Add => {
            if chunk.position > text_len {
                let mut out = text.to_string();
                out.push_str(&chunk.text);
                return out;
            }
            if chunk.position <= 0 {
                let mut out = chunk.text.clone();
                out.push_str(text);
                return out;
            }

            let at = chunk.position as usize;
            let mut out = String::with_capacity(text.len() + chunk.text.len());
            out.extend(&runes[..at]);
            out.push_str(&chunk.text);
            out.extend(&runes[at..]);
            out
        }
        Operation::Remove => {
            if runes.is_empty() || chunk.position >= text_len || chunk.position < 0 {
                return text.to_string();
            }

            let start = chunk.position as usize;
            let end = (chunk.position + chunk.len).min(text_len) as usize;
            let mut out = String::with_capacity(text.len());
            out.extend(&runes[..start]);
            out.extend(&runes[end..]);
            out
        }
    }
}

/// Apply a chunk list left to right.
pub fn apply_multiple(text: &str, chunks: &[Chunk]) -> String {
    let mut output = text.to_string();
    for chunk in chunks {
        output = apply(&output, chunk);
    }
    output
}

/// Rebase `op` so it can be applied after `last_op` on the same base text.
///
/// An `Add` at the same position as a previously committed `Add` shifts
/// right: the earlier insert keeps the left side.
pub fn transform(last_op: &Chunk, op: &Chunk) -> Chunk {
    let mut transformed = op.clone();

    match (last_op.kind, op.kind) {
        (Operation::Add, _) => {
            if last_op.position <= op.position {
                transformed.position += last_op.len;
            }
        }
        (Operation::Remove, Operation::Add) => {
            if last_op.position < op.position {
                transformed.position -= last_op.len.min(op.position - last_op.position);
            }
        }
        (Operation::Remove, Operation::Remove) => {
            let overlaps = last_op.position < op.position + op.len
                && last_op.position + last_op.len > op.position;

            if overlaps {
                // Both removes target an intersecting range. The part of
                // `op` that `last_op` already deleted must be stripped out,
                // otherwise it would delete surviving neighbors.
                let start = last_op.position.max(op.position);
                let end = (last_op.position + last_op.len).min(op.position + op.len);

                // clamp against the text a peer actually sent; `len` is not
                // trusted to match it
                let runes: Vec<char> = op.text.chars().collect();
                let strip_from = ((start - op.position) as usize).min(runes.len());
                let strip_to = ((end - op.position) as usize).min(runes.len());

                let mut kept = String::with_capacity(op.text.len());
                kept.extend(&runes[..strip_from]);
                kept.extend(&runes[strip_to..]);

                transformed.position = op.position.min(last_op.position);
                transformed.len -= end - start;
                transformed.text = kept;
            } else if last_op.position <= op.position {
                transformed.position -= last_op.len;
            }
        }
    }

    transformed
}

/// Rebase every incoming chunk across a committed chunk list, folding each
/// one through the history in order.
pub fn transform_multiple(last_ops: &[Chunk], ops: &[Chunk]) -> Vec<Chunk> {
    ops.iter()
        .map(|op| {
            let mut transformed = op.clone();
            for last_op in last_ops {
                transformed = transform(last_op, &transformed);
            }
            transformed
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_remove_chunk() {
        assert_eq!(
            compute("hello world!", "hello!"),
            vec![Chunk::remove(5, " world")]
        );
        assert_eq!(compute(" ", ""), vec![Chunk::remove(0, " ")]);
    }

    #[test]
    fn compute_add_chunk() {
        assert_eq!(
            compute("hello!", "hello world!"),
            vec![Chunk::add(5, " world")]
        );
        assert_eq!(compute("h", "he"), vec![Chunk::add(1, "e")]);
    }

    #[test]
    fn compute_on_empty_text() {
        assert_eq!(compute("", "hello"), vec![Chunk::add(0, "hello")]);
        assert_eq!(compute("hello", ""), vec![Chunk::remove(0, "hello")]);
        assert_eq!(compute("", ""), vec![]);
    }

    #[test]
    fn apply_add_positions() {
        let text = "Hello";
        assert_eq!(apply(text, &Chunk::add(0, "Hi ")), "Hi Hello");
        assert_eq!(apply(text, &Chunk::add(3, " there")), "Hel therelo");
        assert_eq!(apply(text, &Chunk::add(5, " World")), "Hello World");
        // past the end appends
        assert_eq!(apply(text, &Chunk::add(42, "!")), "Hello!");
    }

    #[test]
    fn apply_remove_positions() {
        let text = "Hello World";
        assert_eq!(apply(text, &Chunk::remove(5, " World")), "Hello");
        assert_eq!(apply(text, &Chunk::remove(0, "Hello ")), "World");
    }

    #[test]
    fn apply_remove_is_noop_out_of_range() {
        assert_eq!(apply("", &Chunk::remove(0, "x")), "");
        assert_eq!(apply("abc", &Chunk::remove(3, "d")), "abc");
        assert_eq!(apply("abc", &Chunk::remove(10, "d")), "abc");
        let zero = Chunk {
            kind: Operation::Remove,
            position: 1,
            text: String::new(),
            len: 0,
        };
        assert_eq!(apply("abc", &zero), "abc");
    }

    #[test]
    fn apply_remove_clamps_to_end() {
        assert_eq!(apply("abc", &Chunk::remove(1, "bcdef")), "a");
    }

    #[test]
    fn apply_counts_code_points() {
        let text = "Hello world";
        let chunk = Chunk::add(6, "👋 ");
        assert_eq!(chunk.len, 2);
        let updated = apply(text, &chunk);
        assert_eq!(updated, "Hello 👋 world");
        // the diff between the two strings recovers exactly that chunk
        assert_eq!(compute(text, &updated), vec![chunk]);
    }

    #[test]
    fn apply_remove_through_emoji() {
        let text = "a👩‍👩‍👦b";
        // the ZWJ family is 5 code points: 3 people + 2 joiners
        assert_eq!(apply(text, &Chunk::remove(1, "👩\u{200d}👩\u{200d}👦")), "ab");
    }

    #[test]
    fn transform_add_add_shifts_right() {
        let last = Chunk::add(0, "Hello!");
        let op = Chunk::add(0, "foo");
        let transformed = transform(&last, &op);
        assert_eq!(transformed.position, 6);
    }

    #[test]
    fn transform_add_before_remove_shifts() {
        let last = Chunk::add(0, "Hello!");
        let op = Chunk::remove(0, "foo");
        let transformed = transform(&last, &op);
        assert_eq!(transformed, Chunk::remove(6, "foo"));
    }

    #[test]
    fn transform_remove_before_add_shifts_left() {
        let last = Chunk::remove(0, "ab");
        let op = Chunk::add(4, "xy");
        let transformed = transform(&last, &op);
        assert_eq!(transformed.position, 2);
    }

    #[test]
    fn transform_remove_overlapping_remove_strips() {
        // base "abcdef": history removed "def" at 3, incoming removes
        // "cdef" at 2; only "c" is still there to remove.
        let last = Chunk::remove(3, "def");
        let op = Chunk::remove(2, "cdef");
        let transformed = transform(&last, &op);
        assert_eq!(transformed, Chunk::remove(2, "c"));
        assert_eq!(apply(&apply("abcdef", &last), &transformed), "ab");
    }

    #[test]
    fn transform_remove_disjoint_remove_shifts() {
        let last = Chunk::remove(0, "ab");
        let op = Chunk::remove(4, "ef");
        let transformed = transform(&last, &op);
        assert_eq!(transformed, Chunk::remove(2, "ef"));
    }

    #[test]
    fn transform_leaves_untouched_ops_alone() {
        // history strictly after the op's range
        let last = Chunk::remove(10, "zz");
        let op = Chunk::add(2, "x");
        assert_eq!(transform(&last, &op), op);

        let last = Chunk::add(10, "zz");
        let op = Chunk::remove(2, "xy");
        assert_eq!(transform(&last, &op), op);
    }

    #[test]
    fn transform_multiple_folds_history_in_order() {
        let history = vec![Chunk::add(0, "aa"), Chunk::remove(4, "bb")];
        let incoming = vec![Chunk::add(6, "x")];
        let transformed = transform_multiple(&history, &incoming);
        // +2 from the add, -2 from the remove before position 8
        assert_eq!(transformed, vec![Chunk::add(6, "x")]);
    }

    #[test]
    fn concurrent_edits_converge() {
        // Client A inserts at the front, client B removes the base text.
        let base = "foo";
        let op_a = Chunk::add(0, "Hello!");
        let op_b = Chunk::remove(0, "foo");

        let after_a = apply(base, &op_a);
        let b_rebased = transform(&op_a, &op_b);
        assert_eq!(b_rebased, Chunk::remove(6, "foo"));
        assert_eq!(apply(&after_a, &b_rebased), "Hello!");
    }

    #[test]
    fn round_trips_through_serde() {
        let chunk = Chunk::remove(3, "def");
        let json = serde_json::to_string(&chunk).unwrap();
        assert_eq!(json, r#"{"type":-1,"position":3,"text":"def","len":3}"#);
        assert_eq!(serde_json::from_str::<Chunk>(&json).unwrap(), chunk);

        assert!(serde_json::from_str::<Chunk>(
            r#"{"type":2,"position":0,"text":"","len":0}"#
        )
        .is_err());
    }

    #[test]
    fn compute_then_apply_round_trips() {
        let cases = [
            ("hello world!", "hello!"),
            ("", "created from scratch"),
            ("line one\nline two\n", "line one\nline 2\nline three\n"),
            ("héllo wörld", "héllo world 🌍"),
            ("שלום עולם", "שלום כולם"),
        ];
        for (old_text, new_text) in cases {
            assert_eq!(apply_multiple(old_text, &compute(old_text, new_text)), new_text);
        }
    }
}
