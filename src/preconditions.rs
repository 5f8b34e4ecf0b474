//! Workflow gates checked before a release touches the version file.
//!
//! Each check is a separate function over a [Vcs] so that it can be run and
//! tested on its own. [ModeFlags] relax the branch checks for CI runs and for
//! manual runs with `IGNORE_BRANCH=true`; cleanliness and remote sync are
//! always enforced.

use tracing::debug;

use crate::config::ModeFlags;
use crate::error::{ReleaseError, Result};
use crate::git::Vcs;

/// Precondition checks a task can require
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Clean,
    OnBranch,
    UpToDate,
    OnRemoteRelease,
}

impl Check {
    pub fn name(&self) -> &'static str {
        match self {
            Check::Clean => "clean",
            Check::OnBranch => "on-branch",
            Check::UpToDate => "up-to-date",
            Check::OnRemoteRelease => "on-remote-branch",
        }
    }
}

/// Run one check against `vcs`.
pub fn check<V: Vcs + ?Sized>(
    vcs: &V,
    check: Check,
    context: &BranchContext,
    flags: ModeFlags,
) -> Result<CheckStatus> {
    match check {
        Check::Clean => check_clean(vcs),
        Check::OnBranch => check_on_release_branch(vcs, context, flags),
        Check::UpToDate => check_up_to_date(vcs, context),
        Check::OnRemoteRelease => check_on_remote_release(vcs, context, flags),
    }
}

/// Branch and remote a release is cut from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchContext {
    pub branch: String,
    pub remote: String,
}

impl BranchContext {
    pub fn new(branch: impl Into<String>, remote: impl Into<String>) -> Self {
        BranchContext {
            branch: branch.into(),
            remote: remote.into(),
        }
    }
}

/// Outcome of a check that may be relaxed by the mode flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Passed,
    /// Not evaluated because of a mode flag
    Skipped(&'static str),
}

/// The working tree must have no uncommitted or untracked changes.
pub fn check_clean<V: Vcs + ?Sized>(vcs: &V) -> Result<CheckStatus> {
    if vcs.is_clean()? {
        Ok(CheckStatus::Passed)
    } else {
        Err(ReleaseError::precondition(
            "clean",
            "working tree has uncommitted changes",
        ))
    }
}

/// HEAD must be on the release branch.
pub fn check_on_release_branch<V: Vcs + ?Sized>(
    vcs: &V,
    context: &BranchContext,
    flags: ModeFlags,
) -> Result<CheckStatus> {
    if flags.ci_mode {
        return Ok(CheckStatus::Skipped("ci"));
    }
    if flags.ignore_branch {
        return Ok(CheckStatus::Skipped("ignore-branch"));
    }

    let current = vcs.current_branch()?;
    debug!(current = %current, expected = %context.branch, "checking branch");
    if current == context.branch {
        Ok(CheckStatus::Passed)
    } else {
        Err(ReleaseError::precondition(
            "on-branch",
            format!("on branch '{}', expected '{}'", current, context.branch),
        ))
    }
}

/// After fetching, HEAD must be neither ahead of nor behind the remote branch.
pub fn check_up_to_date<V: Vcs + ?Sized>(vcs: &V, context: &BranchContext) -> Result<CheckStatus> {
    if vcs.is_synced_with_remote(&context.remote, &context.branch)? {
        Ok(CheckStatus::Passed)
    } else {
        Err(ReleaseError::precondition(
            "up-to-date",
            format!(
                "HEAD differs from {}/{}; pull or push first",
                context.remote, context.branch
            ),
        ))
    }
}

/// HEAD must be exactly the remote release branch's last known commit.
pub fn check_on_remote_release<V: Vcs + ?Sized>(
    vcs: &V,
    context: &BranchContext,
    flags: ModeFlags,
) -> Result<CheckStatus> {
    if flags.ci_mode {
        return Ok(CheckStatus::Skipped("ci"));
    }
    if flags.ignore_branch {
        return Ok(CheckStatus::Skipped("ignore-branch"));
    }

    if vcs.is_at_remote_head(&context.remote, &context.branch)? {
        Ok(CheckStatus::Passed)
    } else {
        Err(ReleaseError::precondition(
            "on-remote-branch",
            format!("HEAD is not {}/{}", context.remote, context.branch),
        ))
    }
}

/// HEAD must still be the release commit made earlier in this run.
///
/// Stands in for [check_on_remote_release] when the release commit was not
/// pushed, so HEAD is expected to lead the remote by exactly that commit.
pub fn check_at_local_release<V: Vcs + ?Sized>(vcs: &V, commit: &str) -> Result<CheckStatus> {
    let head = vcs.head_commit()?;
    if head == commit {
        Ok(CheckStatus::Passed)
    } else {
        Err(ReleaseError::precondition(
            "at-local-release",
            format!("HEAD is {}, expected release commit {}", head, commit),
        ))
    }
}
