//! Reading and rewriting version declaration files
//!
//! A version file is handled as an ordered sequence of lines. Lines that parse
//! as a [`VersionRecord`] are handed to a transition and re-rendered; every
//! other line is copied through byte-for-byte, terminators included.
//!
//! The new content is computed in full before anything touches the disk, and
//! is then written through a temporary file in the same directory that is
//! renamed over the target. A failing transition leaves the file untouched.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::domain::{Transition, VersionRecord};
use crate::error::{ReleaseError, Result};

/// How to treat a file holding more than one version declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// Rewrite every matching line with the same transition
    #[default]
    All,
    /// Fail before writing when more than one line matches
    Strict,
}

/// What a call to [`VersionFileEditor::apply_transition`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    /// Number of lines that matched and were passed to the transition
    pub matched: usize,
    /// First matching record before the transition
    pub previous: Option<VersionRecord>,
    /// First matching record after the transition
    pub current: Option<VersionRecord>,
    /// Whether the file content was replaced
    pub written: bool,
}

impl EditOutcome {
    /// True if the transition changed the first declaration's value.
    pub fn changed(&self) -> bool {
        match (&self.previous, &self.current) {
            (Some(previous), Some(current)) => previous.version_string() != current.version_string(),
            _ => false,
        }
    }
}

/// Apply `transition` to every declaration in `content`.
///
/// Returns the new content and the outcome; `written` is left false, it is
/// for the caller to set once the content is persisted.
pub fn rewrite_content<F>(
    content: &str,
    policy: MatchPolicy,
    path: &Path,
    mut transition: F,
) -> Result<(String, EditOutcome)>
where
    F: FnMut(&VersionRecord) -> Result<VersionRecord>,
{
    let lines: Vec<(&str, Option<VersionRecord>)> = content
        .split_inclusive('\n')
        .map(|line| (line, VersionRecord::parse(line)))
        .collect();

    let matched = lines.iter().filter(|(_, record)| record.is_some()).count();
    if policy == MatchPolicy::Strict && matched > 1 {
        return Err(ReleaseError::MultipleVersionLines {
            path: path.to_path_buf(),
            count: matched,
        });
    }

    let mut output = String::with_capacity(content.len());
    let mut previous = None;
    let mut current = None;

    for (line, record) in lines {
        match record {
            Some(record) => {
                let next = transition(&record)?;
                output.push_str(&next.render());
                if previous.is_none() {
                    previous = Some(record);
                    current = Some(next);
                }
            }
            None => output.push_str(line),
        }
    }

    Ok((
        output,
        EditOutcome {
            matched,
            previous,
            current,
            written: false,
        },
    ))
}

/// Find the first declaration in `content`.
pub fn find_version(content: &str) -> Option<VersionRecord> {
    content.split_inclusive('\n').find_map(VersionRecord::parse)
}

/// Reads, transforms and rewrites one version declaration file.
#[derive(Debug, Clone)]
pub struct VersionFileEditor {
    path: PathBuf,
    policy: MatchPolicy,
}

impl VersionFileEditor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        VersionFileEditor {
            path: path.into(),
            policy: MatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite every declaration line through `transition`.
    ///
    /// Non-matching lines are preserved exactly. When nothing matches, or the
    /// rewritten content is identical, the file is not written at all. Callers
    /// that need a version line should check [`EditOutcome::matched`].
    ///
    /// # Errors
    /// * [`ReleaseError::Io`] if the file cannot be read or replaced
    /// * [`ReleaseError::MultipleVersionLines`] under [`MatchPolicy::Strict`]
    /// * any error returned by `transition`, in which case nothing is written
    pub fn apply_transition<F>(&self, transition: F) -> Result<EditOutcome>
    where
        F: FnMut(&VersionRecord) -> Result<VersionRecord>,
    {
        let original = self.read()?;
        let (content, mut outcome) =
            rewrite_content(&original, self.policy, &self.path, transition)?;

        if outcome.matched == 0 {
            debug!(path = %self.path.display(), "no version declaration matched");
            return Ok(outcome);
        }

        if content != original {
            write_atomic(&self.path, &content)?;
            outcome.written = true;
        }

        debug!(
            path = %self.path.display(),
            matched = outcome.matched,
            written = outcome.written,
            "applied version transition"
        );
        Ok(outcome)
    }

    /// Apply one of the named transitions.
    pub fn apply(&self, transition: Transition) -> Result<EditOutcome> {
        self.apply_transition(|record| transition.apply(record))
    }

    /// Re-read the file and return the declaration it now holds.
    ///
    /// # Errors
    /// * [`ReleaseError::ParseMismatch`] if no line is a declaration
    /// * [`ReleaseError::MultipleVersionLines`] under [`MatchPolicy::Strict`]
    pub fn reload_value(&self) -> Result<VersionRecord> {
        let content = self.read()?;

        if self.policy == MatchPolicy::Strict {
            let count = content
                .split_inclusive('\n')
                .filter(|line| VersionRecord::parse(line).is_some())
                .count();
            if count > 1 {
                return Err(ReleaseError::MultipleVersionLines {
                    path: self.path.clone(),
                    count,
                });
            }
        }

        find_version(&content).ok_or_else(|| ReleaseError::parse_mismatch(&self.path))
    }

    fn read(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| ReleaseError::io(&self.path, e))
    }
}

/// Replace `path` with `content` via a synced temp file and a rename.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp_file = NamedTempFile::new_in(dir).map_err(|e| ReleaseError::io(dir, e))?;
    temp_file
        .write_all(content.as_bytes())
        .map_err(|e| ReleaseError::io(temp_file.path(), e))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| ReleaseError::io(temp_file.path(), e))?;

    // NamedTempFile is created 0600; keep the target's mode.
    if let Ok(metadata) = fs::metadata(path) {
        temp_file
            .as_file()
            .set_permissions(metadata.permissions())
            .map_err(|e| ReleaseError::io(temp_file.path(), e))?;
    }

    temp_file
        .persist(path)
        .map_err(|e| ReleaseError::io(path, e.error))?;
    Ok(())
}

/// The version file a release operates on, with its value at setup time.
#[derive(Debug, Clone)]
pub struct ReleaseTarget {
    pub target_file_path: PathBuf,
    pub current_value: VersionRecord,
    policy: MatchPolicy,
}

impl ReleaseTarget {
    /// Validate that `path` exists and holds a version declaration.
    ///
    /// # Errors
    /// * [`ReleaseError::Config`] if the file does not exist
    /// * [`ReleaseError::ParseMismatch`] if it has no declaration
    pub fn setup(path: impl Into<PathBuf>, policy: MatchPolicy) -> Result<Self> {
        let target_file_path = path.into();
        if !target_file_path.is_file() {
            return Err(ReleaseError::config(format!(
                "version file '{}' does not exist",
                target_file_path.display()
            )));
        }

        let current_value = VersionFileEditor::new(&target_file_path)
            .with_policy(policy)
            .reload_value()?;

        Ok(ReleaseTarget {
            target_file_path,
            current_value,
            policy,
        })
    }

    pub fn editor(&self) -> VersionFileEditor {
        VersionFileEditor::new(&self.target_file_path).with_policy(self.policy)
    }

    /// Apply a transition and refresh `current_value` from disk.
    ///
    /// # Errors
    /// [`ReleaseError::ParseMismatch`] if the file no longer has a declaration.
    pub fn transition(&mut self, transition: Transition) -> Result<EditOutcome> {
        let outcome = self.editor().apply(transition)?;
        if outcome.matched == 0 {
            return Err(ReleaseError::parse_mismatch(&self.target_file_path));
        }
        self.reload()?;
        Ok(outcome)
    }

    /// Re-read the current value from disk.
    pub fn reload(&mut self) -> Result<&VersionRecord> {
        self.current_value = self.editor().reload_value()?;
        Ok(&self.current_value)
    }
}
