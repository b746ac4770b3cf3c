//! Glob pattern matching for `projects`/`ignores` (§3, §4.3), built once
//! per workspace open and reused for every candidate path.

use globset::{Glob, GlobSet, GlobSetBuilder};

use super::error::WorkspaceResult;

/// A compiled set of glob patterns (`**` as multi-segment wildcard)
/// matched against forward-slashed, workspace-relative paths.
pub struct PatternSet {
    set: GlobSet,
    empty: bool,
}

impl PatternSet {
    pub fn compile(patterns: &[String]) -> WorkspaceResult<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern)?);
        }
        Ok(Self {
            set: builder.build()?,
            empty: patterns.is_empty(),
        })
    }

    /// `true` if `path` matches at least one compiled pattern. A pattern
    /// set compiled from zero patterns matches nothing.
    pub fn matches(&self, path: &str) -> bool {
        !self.empty && self.set.is_match(path)
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }
}
