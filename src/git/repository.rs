use crate::error::{ReleaseError, Result};
use git2::{BranchType, Oid, Repository as Git2Repo};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Wrapper around git2::Repository implementing [super::Vcs]
pub struct Git2Repository {
    repo: Git2Repo,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path.as_ref()).map_err(|e| {
            ReleaseError::config(format!(
                "not in a git repository ({}): {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Ok(Git2Repository { repo })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository { repo }
    }

    fn head_oid(&self) -> Result<Oid> {
        self.repo
            .head()?
            .target()
            .ok_or_else(|| ReleaseError::config("HEAD is detached or invalid"))
    }

    fn remote_branch_oid(&self, remote: &str, branch: &str) -> Result<Oid> {
        let name = format!("{}/{}", remote, branch);
        let reference = self
            .repo
            .find_branch(&name, BranchType::Remote)
            .map_err(|e| ReleaseError::remote(format!("Cannot find '{}': {}", name, e)))?;

        reference
            .get()
            .target()
            .ok_or_else(|| ReleaseError::remote(format!("'{}' has no target", name)))
    }

    /// Convert `path` into a path relative to the working directory, as the index expects
    fn workdir_relative(&self, path: &Path) -> Result<PathBuf> {
        let workdir = self
            .repo
            .workdir()
            .ok_or_else(|| ReleaseError::config("repository has no working directory"))?;
        let workdir = fs::canonicalize(workdir).map_err(|e| ReleaseError::io(workdir, e))?;
        let absolute = fs::canonicalize(path).map_err(|e| ReleaseError::io(path, e))?;

        absolute
            .strip_prefix(&workdir)
            .map(Path::to_path_buf)
            .map_err(|_| {
                ReleaseError::config(format!(
                    "'{}' is outside the repository at '{}'",
                    path.display(),
                    workdir.display()
                ))
            })
    }
}

/// Remote callbacks with SSH key / agent / default credential lookup.
fn remote_callbacks<'a>() -> git2::RemoteCallbacks<'a> {
    let mut callbacks = git2::RemoteCallbacks::new();
    callbacks.credentials(|_url, username_from_url, allowed_types| {
        let username = username_from_url.unwrap_or("git");

        if allowed_types.contains(git2::CredentialType::SSH_KEY) {
            if let Some(home) = dirs::home_dir() {
                for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                    let path = home.join(".ssh").join(key);
                    if path.exists() {
                        if let Ok(cred) = git2::Cred::ssh_key(username, None, &path, None) {
                            return Ok(cred);
                        }
                    }
                }
            }

            if let Ok(cred) = git2::Cred::ssh_key_from_agent(username) {
                return Ok(cred);
            }
        }

        git2::Cred::default()
    });
    callbacks
}

impl super::Vcs for Git2Repository {
    fn is_clean(&self) -> Result<bool> {
        let statuses = self.repo.statuses(Some(
            git2::StatusOptions::new()
                .include_untracked(true)
                .recurse_untracked_dirs(true),
        ))?;

        Ok(statuses.is_empty())
    }

    fn head_commit(&self) -> Result<String> {
        Ok(self.head_oid()?.to_string())
    }

    fn current_branch(&self) -> Result<String> {
        let head = self.repo.head()?;

        if !head.is_branch() {
            return Err(ReleaseError::config("HEAD is detached, not on a branch"));
        }

        head.shorthand()
            .map(String::from)
            .ok_or_else(|| ReleaseError::config("branch name is not valid UTF-8"))
    }

    fn is_synced_with_remote(&self, remote: &str, branch: &str) -> Result<bool> {
        let mut git_remote = self
            .repo
            .find_remote(remote)
            .map_err(|e| ReleaseError::remote(format!("Cannot find remote '{}': {}", remote, e)))?;

        let mut fetch_options = git2::FetchOptions::new();
        fetch_options.remote_callbacks(remote_callbacks());

        let refspec = format!("+refs/heads/{0}:refs/remotes/{1}/{0}", branch, remote);
        git_remote
            .fetch(&[refspec.as_str()], Some(&mut fetch_options), None)
            .map_err(|e| ReleaseError::remote(format!("Fetch from '{}' failed: {}", remote, e)))?;

        let local = self.head_oid()?;
        let upstream = self.remote_branch_oid(remote, branch)?;
        let (ahead, behind) = self.repo.graph_ahead_behind(local, upstream)?;
        debug!(remote, branch, ahead, behind, "compared HEAD with remote");

        Ok(ahead == 0 && behind == 0)
    }

    fn is_at_remote_head(&self, remote: &str, branch: &str) -> Result<bool> {
        Ok(self.head_oid()? == self.remote_branch_oid(remote, branch)?)
    }

    fn commit(&self, paths: &[&Path], message: &str) -> Result<String> {
        let mut index = self.repo.index()?;
        for path in paths {
            index.add_path(&self.workdir_relative(path)?)?;
        }
        index.write()?;

        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let sig = self.repo.signature()?;

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
        debug!(%oid, message, "created commit");

        Ok(oid.to_string())
    }

    fn push(&self, remote: &str, branch: &str) -> Result<()> {
        let refspec = format!("refs/heads/{0}:refs/heads/{0}", branch);
        self.push_refspec(remote, &refspec)
    }

    fn create_tag(&self, name: &str) -> Result<()> {
        let head = self.repo.head()?.peel_to_commit()?;
        self.repo
            .tag_lightweight(name, head.as_object(), false)
            .map_err(|e| ReleaseError::tag(format!("Cannot create tag '{}': {}", name, e)))?;
        Ok(())
    }

    fn push_tag(&self, remote: &str, name: &str) -> Result<()> {
        let refspec = format!("refs/tags/{0}:refs/tags/{0}", name);
        self.push_refspec(remote, &refspec)
    }
}

impl Git2Repository {
    fn push_refspec(&self, remote: &str, refspec: &str) -> Result<()> {
        let mut git_remote = self
            .repo
            .find_remote(remote)
            .map_err(|e| ReleaseError::remote(format!("Cannot find remote '{}': {}", remote, e)))?;

        let mut callbacks = remote_callbacks();
        // The server reports per-ref rejections here rather than through push()'s result.
        callbacks.push_update_reference(|refname, status| match status {
            Some(message) => Err(git2::Error::from_str(&format!(
                "{} rejected: {}",
                refname, message
            ))),
            None => Ok(()),
        });

        let mut push_options = git2::PushOptions::new();
        push_options.remote_callbacks(callbacks);

        git_remote
            .push(&[refspec], Some(&mut push_options))
            .map_err(|e| ReleaseError::remote(format!("Push of '{}' failed: {}", refspec, e)))?;
        debug!(remote, refspec, "pushed");
        Ok(())
    }
}
