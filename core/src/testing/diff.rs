//! Line-level alignment of a program's output against the expected output.
//!
//! The alignment is a longest common subsequence over whole lines computed
//! with the classic `(n+1) x (m+1)` table. Memory is `O(n·m)`, which is fine
//! for sample outputs but not for huge ones.

use std::{fmt, ops::Deref};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum EditOp {
    /// Line present on both sides.
    Keep,
    /// Line present only in the actual output.
    Insert,
    /// Line present only in the expected output.
    Delete,
}

impl EditOp {
    pub fn sign(self) -> char {
        match self {
            EditOp::Keep => ' ',
            EditOp::Insert => '+',
            EditOp::Delete => '-',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub op: EditOp,
    pub line: String,
}

impl Edit {
    pub fn new(op: EditOp, line: impl Into<String>) -> Self {
        Self {
            op,
            line: line.into(),
        }
    }
}

impl fmt::Display for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op.sign(), self.line)
    }
}

/// Ordered edit operations that turn the expected lines into the actual
/// lines. Every line of both sides appears exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditScript(Vec<Edit>);

impl EditScript {
    /// Script that shows `lines` unchanged. Used for output that has nothing
    /// to be compared against.
    pub fn as_is<S: AsRef<str>>(lines: &[S]) -> Self {
        Self(
            lines
                .iter()
                .map(|l| Edit::new(EditOp::Keep, l.as_ref()))
                .collect(),
        )
    }

    pub fn count(&self, op: EditOp) -> usize {
        self.0.iter().filter(|e| e.op == op).count()
    }

    /// True iff both sides have the same number of lines and every line is
    /// paired with an equal one, in order.
    pub fn is_exact_match(&self) -> bool {
        let expected_len = self.0.iter().filter(|e| e.op != EditOp::Insert).count();
        let actual_len = self.0.iter().filter(|e| e.op != EditOp::Delete).count();
        expected_len == actual_len && self.0.iter().all(|e| e.op == EditOp::Keep)
    }
}

impl Deref for EditScript {
    type Target = [Edit];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'a> IntoIterator for &'a EditScript {
    type Item = &'a Edit;
    type IntoIter = std::slice::Iter<'a, Edit>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for EditScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for edit in &self.0 {
            writeln!(f, "{}", edit)?;
        }
        Ok(())
    }
}

/// Splits program output into lines without their terminators (`\n` or
/// `\r\n`). Other whitespace is significant.
pub fn split_lines(s: &str) -> Vec<&str> {
    s.lines().collect()
}

/// LCS score table, row-major over `expected` (rows) and `actual` (columns).
struct Table {
    cols: usize,
    score: Vec<u32>,
}

impl Table {
    #[inline]
    fn at(&self, i: usize, j: usize) -> u32 {
        self.score[i * self.cols + j]
    }
}

/// Aligns `actual` against `expected`.
///
/// When several moves reach the same score the reconstruction prefers, in
/// this order: consuming an expected-only line ([`EditOp::Delete`]),
/// consuming an actual-only line ([`EditOp::Insert`]), then pairing equal
/// lines ([`EditOp::Keep`]). The verdict never depends on this order, only
/// the rendered diff does.
pub fn align<E, A>(expected: &[E], actual: &[A]) -> EditScript
where
    E: AsRef<str>,
    A: AsRef<str>,
{
    let n = expected.len();
    let m = actual.len();
    let eq = |i: usize, j: usize| expected[i].as_ref() == actual[j].as_ref();

    let cols = m + 1;
    let mut table = Table {
        cols,
        score: vec![0; (n + 1) * cols],
    };
    for i in 1..=n {
        for j in 1..=m {
            let mut best = table.at(i - 1, j).max(table.at(i, j - 1));
            if eq(i - 1, j - 1) {
                best = best.max(table.at(i - 1, j - 1) + 1);
            }
            table.score[i * cols + j] = best;
        }
    }

    let choose = |i: usize, j: usize| -> EditOp {
        if j == 0 {
            return EditOp::Delete;
        }
        if i == 0 {
            return EditOp::Insert;
        }
        let mut res = table.at(i - 1, j);
        let mut op = EditOp::Delete;
        if res < table.at(i, j - 1) {
            res = table.at(i, j - 1);
            op = EditOp::Insert;
        }
        if eq(i - 1, j - 1) && res < table.at(i - 1, j - 1) + 1 {
            op = EditOp::Keep;
        }
        op
    };

    let mut edits = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (n, m);
    while i != 0 || j != 0 {
        match choose(i, j) {
            EditOp::Keep => {
                i -= 1;
                j -= 1;
                edits.push(Edit::new(EditOp::Keep, actual[j].as_ref()));
            }
            EditOp::Delete => {
                i -= 1;
                edits.push(Edit::new(EditOp::Delete, expected[i].as_ref()));
            }
            EditOp::Insert => {
                j -= 1;
                edits.push(Edit::new(EditOp::Insert, actual[j].as_ref()));
            }
        }
    }
    edits.reverse();
    EditScript(edits)
}
