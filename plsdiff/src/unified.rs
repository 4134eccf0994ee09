use std::fmt::Write;

use crate::{hunk::Hunk, token::Token};

/// Rendering options for [`unified`]
#[derive(Debug, Clone)]
pub struct UnifiedOptions {
    /// Unchanged tokens shown around each change
    pub context: usize,
    pub original_label: String,
    pub modified_label: String,
}

impl Default for UnifiedOptions {
    fn default() -> Self {
        Self {
            context: 3,
            original_label: "playlist".to_string(),
            modified_label: "tracks".to_string(),
        }
    }
}

/// Renders hunks in `diff -u` format, one token per line.
///
/// Returns an empty string when the hunks contain no change.
pub fn unified<T: Token>(
    hunks: &[Hunk],
    original: &[T],
    modified: &[T],
    options: &UnifiedOptions,
) -> String {
    let edits: Vec<usize> = hunks
        .iter()
        .enumerate()
        .filter(|(_, h)| !h.is_copy())
        .map(|(i, _)| i)
        .collect();
    if edits.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    let _ = writeln!(out, "--- {}", options.original_label);
    let _ = writeln!(out, "+++ {}", options.modified_label);

    // Regroupe les changements séparés par moins de 2 * context copies
    let mut groups: Vec<(usize, usize)> = Vec::new();
    for &i in &edits {
        match groups.last_mut() {
            Some((_, last)) if hunks[*last + 1..i].iter().all(|h| h.original_length <= 2 * options.context) => {
                *last = i;
            }
            _ => groups.push((i, i)),
        }
    }

    for (first, last) in groups {
        render_group(&mut out, &hunks[first..=last], hunks, original, modified, options.context);
    }
    out
}

fn render_group<T: Token>(
    out: &mut String,
    group: &[Hunk],
    hunks: &[Hunk],
    original: &[T],
    modified: &[T],
    context: usize,
) {
    let (head, tail) = match (group.first(), group.last()) {
        (Some(head), Some(tail)) => (*head, *tail),
        _ => return,
    };
    let leading = context.min(head.original_start);
    let trailing = context.min(original.len().saturating_sub(tail.original_end()));

    let o_start = head.original_start - leading;
    let o_end = tail.original_end() + trailing;
    let m_start = head.modified_start - leading;
    let m_end = tail.modified_end() + trailing;

    let _ = writeln!(
        out,
        "@@ -{} +{} @@",
        range_header(o_start, o_end - o_start),
        range_header(m_start, m_end - m_start)
    );

    for hunk in hunks {
        if hunk.original_end() < o_start || hunk.original_start > o_end {
            continue;
        }
        if hunk.is_copy() {
            let from = hunk.original_start.max(o_start);
            let to = hunk.original_end().min(o_end);
            for token in original.get(from..to).unwrap_or_default() {
                let _ = writeln!(out, " {}", token.canonical());
            }
        } else if group.contains(hunk) {
            for token in original.get(hunk.original_start..hunk.original_end()).unwrap_or_default() {
                let _ = writeln!(out, "-{}", token.canonical());
            }
            for token in modified.get(hunk.modified_start..hunk.modified_end()).unwrap_or_default() {
                let _ = writeln!(out, "+{}", token.canonical());
            }
        }
    }
}

fn range_header(start: usize, length: usize) -> String {
    match length {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{}", start + 1, length),
    }
}
