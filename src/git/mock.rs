use crate::error::{ReleaseError, Result};
use crate::git::Vcs;
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};

/// A commit recorded by [MockRepository]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCommit {
    pub paths: Vec<PathBuf>,
    pub message: String,
}

/// Mock repository for testing without actual git operations
///
/// Cleanliness is derived from tracked files: a tracked file whose content
/// differs from its last committed snapshot makes the tree dirty, as does
/// [MockRepository::set_untracked_changes]. A commit leaves HEAD ahead of the
/// remote until the branch is pushed.
pub struct MockRepository {
    branch: String,
    synced: Cell<bool>,
    at_remote_head: Cell<bool>,
    untracked_changes: Cell<bool>,
    fail_push: Cell<bool>,
    tracked: RefCell<Vec<(PathBuf, Option<String>)>>,
    commits: RefCell<Vec<RecordedCommit>>,
    pushes: RefCell<Vec<String>>,
    tags: RefCell<Vec<String>>,
}

impl MockRepository {
    /// Create a mock on `branch` that is clean and in sync with its remote
    pub fn new(branch: impl Into<String>) -> Self {
        MockRepository {
            branch: branch.into(),
            synced: Cell::new(true),
            at_remote_head: Cell::new(true),
            untracked_changes: Cell::new(false),
            fail_push: Cell::new(false),
            tracked: RefCell::new(Vec::new()),
            commits: RefCell::new(Vec::new()),
            pushes: RefCell::new(Vec::new()),
            tags: RefCell::new(Vec::new()),
        }
    }

    /// Snapshot `path` as committed content
    pub fn track(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let content = fs::read_to_string(&path).ok();
        self.tracked.borrow_mut().push((path, content));
    }

    pub fn set_synced(&self, synced: bool) {
        self.synced.set(synced);
    }

    pub fn set_at_remote_head(&self, at_head: bool) {
        self.at_remote_head.set(at_head);
    }

    pub fn set_untracked_changes(&self, dirty: bool) {
        self.untracked_changes.set(dirty);
    }

    pub fn set_fail_push(&self, fail: bool) {
        self.fail_push.set(fail);
    }

    pub fn commits(&self) -> Vec<RecordedCommit> {
        self.commits.borrow().clone()
    }

    /// Refspec-like descriptions of every push, e.g. `origin/master` or `origin tag v1.0.0`
    pub fn pushes(&self) -> Vec<String> {
        self.pushes.borrow().clone()
    }

    pub fn tags(&self) -> Vec<String> {
        self.tags.borrow().clone()
    }

    fn snapshot(&self, paths: &[&Path]) {
        for (tracked, content) in self.tracked.borrow_mut().iter_mut() {
            if paths.iter().any(|p| *p == tracked.as_path()) {
                *content = fs::read_to_string(&*tracked).ok();
            }
        }
    }
}

impl Vcs for MockRepository {
    fn is_clean(&self) -> Result<bool> {
        if self.untracked_changes.get() {
            return Ok(false);
        }
        let unchanged = self
            .tracked
            .borrow()
            .iter()
            .all(|(path, content)| fs::read_to_string(path).ok() == *content);
        Ok(unchanged)
    }

    fn head_commit(&self) -> Result<String> {
        Ok(format!("{:040x}", self.commits.borrow().len()))
    }

    fn current_branch(&self) -> Result<String> {
        Ok(self.branch.clone())
    }

    fn is_synced_with_remote(&self, _remote: &str, _branch: &str) -> Result<bool> {
        Ok(self.synced.get())
    }

    fn is_at_remote_head(&self, _remote: &str, _branch: &str) -> Result<bool> {
        Ok(self.at_remote_head.get())
    }

    fn commit(&self, paths: &[&Path], message: &str) -> Result<String> {
        self.snapshot(paths);
        self.synced.set(false);
        self.at_remote_head.set(false);
        let mut commits = self.commits.borrow_mut();
        commits.push(RecordedCommit {
            paths: paths.iter().map(|p| p.to_path_buf()).collect(),
            message: message.to_string(),
        });
        Ok(format!("{:040x}", commits.len()))
    }

    fn push(&self, remote: &str, branch: &str) -> Result<()> {
        if self.fail_push.get() {
            return Err(ReleaseError::remote(format!("Push to '{}' rejected", remote)));
        }
        self.pushes.borrow_mut().push(format!("{}/{}", remote, branch));
        self.synced.set(true);
        self.at_remote_head.set(true);
        Ok(())
    }

    fn create_tag(&self, name: &str) -> Result<()> {
        let mut tags = self.tags.borrow_mut();
        if tags.iter().any(|t| t == name) {
            return Err(ReleaseError::tag(format!("Tag '{}' already exists", name)));
        }
        tags.push(name.to_string());
        Ok(())
    }

    fn push_tag(&self, remote: &str, name: &str) -> Result<()> {
        if self.fail_push.get() {
            return Err(ReleaseError::remote(format!("Push to '{}' rejected", remote)));
        }
        self.pushes
            .borrow_mut()
            .push(format!("{} tag {}", remote, name));
        Ok(())
    }
}
