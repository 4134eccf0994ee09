use std::{
    collections::HashMap,
    ops::{Index, IndexMut, Range},
};

use tracing::trace;

use crate::{
    hunk::{Hunk, HunkKind},
    token::Token,
};

/// Working set mapping each canonical form to a small integer.
///
/// Tokens are interned as they are fetched, so the comparison phase only
/// deals with `u32` identifiers and never touches the streams again.
#[derive(Default)]
struct Interner {
    ids: HashMap<Box<str>, u32>,
}

impl Interner {
    fn intern(&mut self, canonical: &str) -> u32 {
        if let Some(&id) = self.ids.get(canonical) {
            return id;
        }
        let id = self.ids.len() as u32;
        self.ids.insert(canonical.into(), id);
        id
    }

    fn fetch<I>(&mut self, stream: I) -> Vec<u32>
    where
        I: IntoIterator,
        I::Item: Token,
    {
        stream
            .into_iter()
            .map(|token| self.intern(token.canonical()))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal,
    Delete,
    Insert,
}

/// Computes the hunks turning `original` into `modified`.
///
/// Each stream is consumed once, front to back. Common prefixes and
/// suffixes are matched greedily, then the remaining middle is aligned with
/// a shortest edit script found in linear space. Identical inputs always
/// produce identical hunks.
///
/// ```
/// use plsdiff::{diff, Hunk};
///
/// assert_eq!(diff(Vec::<&str>::new(), ["a", "b"]), [Hunk::edit(0, 0, 0, 2).unwrap()]);
/// assert!(diff(Vec::<&str>::new(), Vec::<&str>::new()).is_empty());
/// ```
pub fn diff<I, J>(original: I, modified: J) -> Vec<Hunk>
where
    I: IntoIterator,
    I::Item: Token,
    J: IntoIterator,
    J::Item: Token,
{
    let mut interner = Interner::default();
    let a = interner.fetch(original);
    let b = interner.fetch(modified);

    let mut builder = HunkBuilder::default();
    Aligner::new(&a, &b).align(0..a.len(), 0..b.len(), &mut builder);
    let hunks = builder.finish();

    trace!(
        original = a.len(),
        modified = b.len(),
        distinct = interner.ids.len(),
        hunks = hunks.len(),
        "diff computed"
    );
    hunks
}

/// Slice convenience wrapper around [`diff`].
pub fn diff_tokens<T: Token>(original: &[T], modified: &[T]) -> Vec<Hunk> {
    diff(original, modified)
}

/// Furthest reach per diagonal `k = x - y`, for `k` in `-max..=max`.
struct Frontier {
    offset: isize,
    reach: Vec<usize>,
}

impl Frontier {
    fn new(max: usize) -> Self {
        Self {
            offset: max as isize,
            reach: vec![0; 2 * max + 2],
        }
    }
}

impl Index<isize> for Frontier {
    type Output = usize;

    fn index(&self, k: isize) -> &usize {
        &self.reach[(k + self.offset) as usize]
    }
}

impl IndexMut<isize> for Frontier {
    fn index_mut(&mut self, k: isize) -> &mut usize {
        &mut self.reach[(k + self.offset) as usize]
    }
}

/// Myers' divide and conquer variant: the forward and backward searches
/// meet on a middle snake, both halves are aligned recursively. Only two
/// frontiers are kept, so memory stays O(N + M) whatever the edit distance.
struct Aligner<'a> {
    a: &'a [u32],
    b: &'a [u32],
    forward: Frontier,
    backward: Frontier,
}

impl<'a> Aligner<'a> {
    fn new(a: &'a [u32], b: &'a [u32]) -> Self {
        let max = rounds(a.len(), b.len());
        Self {
            a,
            b,
            forward: Frontier::new(max),
            backward: Frontier::new(max),
        }
    }

    fn align(&mut self, mut a: Range<usize>, mut b: Range<usize>, out: &mut HunkBuilder) {
        let prefix = common_prefix(&self.a[a.clone()], &self.b[b.clone()]);
        out.push(Op::Equal, prefix);
        a.start += prefix;
        b.start += prefix;

        let suffix = common_suffix(&self.a[a.clone()], &self.b[b.clone()]);
        a.end -= suffix;
        b.end -= suffix;

        let split = if a.is_empty() || b.is_empty() {
            None
        } else {
            self.middle_snake(a.clone(), b.clone())
        };
        match split {
            Some((x, y)) => {
                self.align(a.start..x, b.start..y, out);
                self.align(x..a.end, y..b.end, out);
            }
            None => {
                out.push(Op::Delete, a.len());
                out.push(Op::Insert, b.len());
            }
        }

        out.push(Op::Equal, suffix);
    }

    /// Returns a split point lying on a shortest edit path of the two
    /// ranges. Both ranges are non-empty and differ on their first and last
    /// items.
    fn middle_snake(&mut self, a: Range<usize>, b: Range<usize>) -> Option<(usize, usize)> {
        let (source, target) = (self.a, self.b);
        let old = &source[a.clone()];
        let new = &target[b.clone()];
        let n = old.len();
        let m = new.len();
        let delta = n as isize - m as isize;
        let odd = delta & 1 == 1;

        let forward = &mut self.forward;
        let backward = &mut self.backward;
        forward[1] = 0;
        backward[1] = 0;

        for d in 0..rounds(n, m) as isize {
            for k in (-d..=d).rev().step_by(2) {
                let mut x = if k == -d || (k != d && forward[k - 1] < forward[k + 1]) {
                    forward[k + 1]
                } else {
                    forward[k - 1] + 1
                };
                let y = (x as isize - k) as usize;
                let start = (x, y);
                if x < n && y < m {
                    x += common_prefix(&old[x..], &new[y..]);
                }
                forward[k] = x;

                if odd && (k - delta).abs() < d && forward[k] + backward[delta - k] >= n {
                    return Some((a.start + start.0, b.start + start.1));
                }
            }

            for k in (-d..=d).rev().step_by(2) {
                let mut x = if k == -d || (k != d && backward[k - 1] < backward[k + 1]) {
                    backward[k + 1]
                } else {
                    backward[k - 1] + 1
                };
                let mut y = (x as isize - k) as usize;
                if x < n && y < m {
                    let run = common_suffix(&old[..n - x], &new[..m - y]);
                    x += run;
                    y += run;
                }
                backward[k] = x;

                if !odd && (k - delta).abs() <= d && backward[k] + forward[delta - k] >= n {
                    return Some((a.start + n - x, b.start + m - y));
                }
            }
        }
        None
    }
}

/// Search rounds needed before both directions overlap.
fn rounds(n: usize, m: usize) -> usize {
    (n + m + 1) / 2 + 1
}

fn common_prefix(a: &[u32], b: &[u32]) -> usize {
    let mut len = 0;
    while len < a.len() && len < b.len() && a[len] == b[len] {
        len += 1;
    }
    len
}

fn common_suffix(a: &[u32], b: &[u32]) -> usize {
    let mut len = 0;
    while len < a.len() && len < b.len() && a[a.len() - 1 - len] == b[b.len() - 1 - len] {
        len += 1;
    }
    len
}

/// Groups runs of operations into hunks. Consecutive deletes and inserts
/// between two copies collapse into a single edit hunk.
#[derive(Default)]
struct HunkBuilder {
    hunks: Vec<Hunk>,
    original: usize,
    modified: usize,
    copying: bool,
    run_original: usize,
    run_modified: usize,
}

impl HunkBuilder {
    fn push(&mut self, op: Op, count: usize) {
        if count == 0 {
            return;
        }
        let copying = op == Op::Equal;
        if copying != self.copying {
            self.flush();
            self.copying = copying;
        }
        match op {
            Op::Equal => {
                self.run_original += count;
                self.run_modified += count;
            }
            Op::Delete => self.run_original += count,
            Op::Insert => self.run_modified += count,
        }
    }

    fn flush(&mut self) {
        let hunk = if self.copying {
            (self.run_original > 0).then(|| Hunk::copy(self.original, self.modified, self.run_original))
        } else {
            Hunk::edit(self.original, self.run_original, self.modified, self.run_modified)
        };
        if let Some(hunk) = hunk {
            debug_assert!(hunk.kind != HunkKind::Copy || hunk.original_length == hunk.modified_length);
            self.hunks.push(hunk);
        }
        self.original += self.run_original;
        self.modified += self.run_modified;
        self.run_original = 0;
        self.run_modified = 0;
    }

    fn finish(mut self) -> Vec<Hunk> {
        self.flush();
        self.hunks
    }
}
