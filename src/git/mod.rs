//! Diff collection from the working tree using git2.

use git2::{Diff, DiffFormat, DiffOptions, ErrorCode, Repository, Tree};

use crate::error::{DifftideError, Result};

/// Maximum characters for the unified diff text before truncation.
const MAX_DIFF_LENGTH: usize = 30_000;

/// Staged and working-tree diffs of one repository.
#[derive(Debug, Clone, Default)]
pub struct WorkingDiff {
    pub staged: String,
    pub working: String,
}

impl WorkingDiff {
    /// The diff the generator should consume: staged changes when any
    /// exist, otherwise working-tree changes. `None` means no changes.
    pub fn effective(&self) -> Option<&str> {
        if !self.staged.is_empty() {
            Some(&self.staged)
        } else if !self.working.is_empty() {
            Some(&self.working)
        } else {
            None
        }
    }

    /// Like [`WorkingDiff::effective`], but a clean tree is an error.
    pub fn require_effective(&self) -> Result<&str> {
        self.effective().ok_or(DifftideError::NoChanges)
    }
}

/// Resolve the HEAD tree, distinguishing empty-repo errors from real
/// failures.
///
/// Returns `Ok(None)` for repos with no commits (unborn branch / not
/// found); the staged diff is then taken against the empty tree.
fn resolve_head_tree(repo: &Repository) -> Result<Option<Tree<'_>>> {
    let head_ref = match repo.head() {
        Ok(r) => r,
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let tree = head_ref.peel_to_tree()?;
    Ok(Some(tree))
}

/// Collect the staged (HEAD vs. index) and working (index vs. workdir)
/// diffs of `repo` as unified diff text.
pub fn collect_diff(repo: &Repository) -> Result<WorkingDiff> {
    let head_tree = resolve_head_tree(repo)?;

    let mut opts = DiffOptions::new();
    let staged = repo.diff_tree_to_index(head_tree.as_ref(), None, Some(&mut opts))?;

    let mut opts = DiffOptions::new();
    let working = repo.diff_index_to_workdir(None, Some(&mut opts))?;

    Ok(WorkingDiff {
        staged: render_diff(&staged)?,
        working: render_diff(&working)?,
    })
}

/// Render a diff as unified patch text, capped at [`MAX_DIFF_LENGTH`].
fn render_diff(diff: &Diff) -> Result<String> {
    let mut text = String::new();
    let mut truncated = false;

    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        if text.len() >= MAX_DIFF_LENGTH {
            truncated = true;
            return true;
        }
        match line.origin() {
            '+' | '-' | ' ' => text.push(line.origin()),
            _ => {}
        }
        text.push_str(&String::from_utf8_lossy(line.content()));
        true
    })?;

    if truncated {
        text.push_str("\n... (diff truncated)\n");
    }

    Ok(text)
}
