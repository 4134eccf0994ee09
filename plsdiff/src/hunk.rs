use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HunkKind {
    Copy,
    Insert,
    Delete,
    Replace,
}

/// A contiguous span mapping `original[original_start..][..original_length]`
/// onto `modified[modified_start..][..modified_length]`.
///
/// Hunks returned by [`diff`](crate::diff) are ordered and partition both
/// sequences: each one starts where the previous one ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hunk {
    pub kind: HunkKind,
    pub original_start: usize,
    pub original_length: usize,
    pub modified_start: usize,
    pub modified_length: usize,
}

impl Hunk {
    pub fn copy(original_start: usize, modified_start: usize, length: usize) -> Self {
        Self {
            kind: HunkKind::Copy,
            original_start,
            original_length: length,
            modified_start,
            modified_length: length,
        }
    }

    /// Builds a non-copy hunk, picking its kind from the two lengths.
    ///
    /// Returns `None` when both lengths are zero.
    pub fn edit(
        original_start: usize,
        original_length: usize,
        modified_start: usize,
        modified_length: usize,
    ) -> Option<Self> {
        let kind = match (original_length, modified_length) {
            (0, 0) => return None,
            (0, _) => HunkKind::Insert,
            (_, 0) => HunkKind::Delete,
            _ => HunkKind::Replace,
        };
        Some(Self {
            kind,
            original_start,
            original_length,
            modified_start,
            modified_length,
        })
    }

    pub fn original_end(&self) -> usize {
        self.original_start + self.original_length
    }

    pub fn modified_end(&self) -> usize {
        self.modified_start + self.modified_length
    }

    pub fn is_copy(&self) -> bool {
        self.kind == HunkKind::Copy
    }
}

impl fmt::Display for HunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HunkKind::Copy => "copy",
            HunkKind::Insert => "insert",
            HunkKind::Delete => "delete",
            HunkKind::Replace => "replace",
        };
        f.write_str(name)
    }
}

/// Compact form `kind(os,ol/ms,ml)`, used in logs and test failures.
impl fmt::Display for Hunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({},{}/{},{})",
            self.kind,
            self.original_start,
            self.original_length,
            self.modified_start,
            self.modified_length
        )
    }
}
