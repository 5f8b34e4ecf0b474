//! Version control abstraction layer
//!
//! This module provides a trait-based abstraction over the handful of version
//! control operations a release needs, so the workflow never scrapes the
//! output of command-line tools.
//!
//! # Overview
//!
//! The primary abstraction is the [Vcs] trait. The concrete implementations include:
//!
//! - [repository::Git2Repository]: A real implementation using the `git2` crate
//! - [mock::MockRepository]: A scripted implementation for testing
//!
//! # Usage
//!
//! ```rust
//! # use release_tasks::git::Vcs;
//! # fn example<V: Vcs>(vcs: &V) -> release_tasks::Result<()> {
//! if vcs.is_clean()? && vcs.current_branch()? == "master" {
//!     vcs.commit_and_push(&[std::path::Path::new("lib/foo/version.rb")], "origin", "master", "Version 1.2.3")?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::error::Result;
use std::path::Path;

/// Version control operations used by the release workflow
///
/// All queries return structured answers; failures surface as
/// [crate::error::ReleaseError] values, never as parsed tool output.
///
/// ## Implementations
///
/// - [Git2Repository](repository::Git2Repository): Real Git implementation using the `git2` crate
/// - [MockRepository](mock::MockRepository): Test implementation recording every mutation
pub trait Vcs {
    /// Whether the working tree has no modified, staged or untracked files
    fn is_clean(&self) -> Result<bool>;

    /// Name of the checked-out branch
    ///
    /// # Returns
    /// * `Ok(String)` - Short branch name (e.g., "master")
    /// * `Err` - If HEAD is detached or unreadable
    fn current_branch(&self) -> Result<String>;

    /// Fetch `branch` from `remote` and report whether local HEAD neither
    /// trails nor leads the remote-tracking branch
    fn is_synced_with_remote(&self, remote: &str, branch: &str) -> Result<bool>;

    /// Hash of the commit HEAD points at
    fn head_commit(&self) -> Result<String>;

    /// Whether HEAD points at the same commit as `remote/branch`, without fetching
    fn is_at_remote_head(&self, remote: &str, branch: &str) -> Result<bool>;

    /// Stage `paths` and commit them on HEAD
    ///
    /// # Returns
    /// * `Ok(String)` - The new commit's hash
    fn commit(&self, paths: &[&Path], message: &str) -> Result<String>;

    /// Push the local `branch` to the same branch on `remote`
    fn push(&self, remote: &str, branch: &str) -> Result<()>;

    /// Commit `paths` and push the branch in one step
    fn commit_and_push(
        &self,
        paths: &[&Path],
        remote: &str,
        branch: &str,
        message: &str,
    ) -> Result<String> {
        let sha = self.commit(paths, message)?;
        self.push(remote, branch)?;
        Ok(sha)
    }

    /// Create a lightweight tag on HEAD
    fn create_tag(&self, name: &str) -> Result<()>;

    /// Push one tag to `remote`
    fn push_tag(&self, remote: &str, name: &str) -> Result<()>;
}
