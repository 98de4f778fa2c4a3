use std::cmp::Ordering;

use lazy_regex::regex;

/// Sort key that compares digit runs by numeric value and everything else
/// case-insensitively, so that `"2" < "10"` and `"Case" == "case"`.
///
/// The key always alternates text and number chunks and always starts with a
/// (possibly empty) text chunk, so two keys never compare a number against a
/// text at the same position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NaturalKey(Vec<Chunk>);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Chunk {
    Text(String),
    Num(Digits),
}

/// Arbitrary-length unsigned integer kept as its decimal digits.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Digits(String);

impl Digits {
    fn new(s: &str) -> Self {
        let trimmed = s.trim_start_matches('0');
        Self(trimmed.to_owned())
    }
}

impl Ord for Digits {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Digits {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl NaturalKey {
    pub fn new(s: &str) -> Self {
        let mut chunks = Vec::new();
        let mut last = 0;
        for m in regex!(r"[0-9]+").find_iter(s) {
            chunks.push(Chunk::Text(s[last..m.start()].to_lowercase()));
            chunks.push(Chunk::Num(Digits::new(m.as_str())));
            last = m.end();
        }
        chunks.push(Chunk::Text(s[last..].to_lowercase()));
        Self(chunks)
    }
}

/// Natural ordering of two names. Names with equal keys (`"01"` and `"1"`)
/// fall back to plain byte order so the result is total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    NaturalKey::new(a)
        .cmp(&NaturalKey::new(b))
        .then_with(|| a.cmp(b))
}
