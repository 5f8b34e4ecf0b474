//! Release workflow orchestration
//!
//! Each release task is a method on [ReleaseContext] so that it can be run
//! programmatically without clap. Tasks compose the same way the command line
//! exposes them: `push_release` is `only_push_release` followed by
//! `next_dev_cycle`, `local_release` adds `release` between the two.
//!
//! With pushing disabled the release commit stays local, so `release` then
//! requires HEAD to be that commit instead of the remote branch head.
//!
//! The stored version is expected to be the next development version
//! (`N.pre`) or the release that was last shipped (`N`). A bare version that
//! was never actually released is bumped again by a release cut.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::{Config, ModeFlags};
use crate::domain::{Transition, VersionRecord};
use crate::error::{ReleaseError, Result};
use crate::git::Vcs;
use crate::preconditions::{self, BranchContext, Check, CheckStatus};
use crate::steps::{StepContext, StepExecutor, StepKind};
use crate::ui;
use crate::version_file::{EditOutcome, ReleaseTarget};

/// Prefix for commits that CI should not build again
pub const SKIP_CI: &str = "[skip ci] ";

/// Result of a successful workflow task
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkflowResult {
    /// Version held by the file when the task finished
    pub version: String,

    /// Release version cut by this task, if any
    pub released: Option<String>,

    /// Whether a commit was created
    pub committed: bool,

    /// Whether commits or tags were pushed
    pub pushed: bool,

    /// Tag created by this task
    pub tag: Option<String>,
}

impl WorkflowResult {
    fn merge(self, later: WorkflowResult) -> WorkflowResult {
        WorkflowResult {
            version: later.version,
            released: later.released.or(self.released),
            committed: self.committed || later.committed,
            pushed: self.pushed || later.pushed,
            tag: later.tag.or(self.tag),
        }
    }
}

/// Apply a named transition to the target, failing if the file has no declaration.
///
/// Reports the change and warns if the new value orders before the old one.
pub fn apply_version_transition(
    target: &mut ReleaseTarget,
    transition: Transition,
) -> Result<EditOutcome> {
    let outcome = target.transition(transition)?;
    let file = target.target_file_path.display().to_string();
    ui::display_edit_outcome(&file, &outcome);

    if let (Some(previous), Some(current)) = (&outcome.previous, &outcome.current) {
        if let (Ok(before), Ok(after)) = (previous.to_semver(), current.to_semver()) {
            if after < before {
                ui::display_warning(&format!(
                    "{} moved the version backwards ({} -> {})",
                    transition, previous, current
                ));
            }
        }
    }

    info!(%transition, version = %target.current_value, "version file updated");
    Ok(outcome)
}

/// Reload the target and require a release-format value.
pub fn require_release_version(target: &mut ReleaseTarget) -> Result<VersionRecord> {
    let current = target.reload()?.clone();
    if current.is_release_format() {
        Ok(current)
    } else {
        Err(ReleaseError::format_violation(
            &target.target_file_path,
            current.version_string(),
        ))
    }
}

/// Everything a release task needs: configuration, the version file, the
/// mode flags and a version control handle.
pub struct ReleaseContext<'a, V: Vcs + ?Sized> {
    pub config: Config,
    pub target: ReleaseTarget,
    pub flags: ModeFlags,
    pub branch: BranchContext,
    /// Push commits and tags; when false they stay local
    pub push: bool,
    /// Release commit made in this run and not pushed
    local_release: Option<String>,
    vcs: &'a V,
}

impl<'a, V: Vcs + ?Sized> ReleaseContext<'a, V> {
    /// Build a context from loaded configuration.
    ///
    /// # Errors
    /// * [ReleaseError::Config] if no version file is configured or it does not exist
    /// * [ReleaseError::ParseMismatch] if the version file has no declaration
    pub fn new(config: Config, flags: ModeFlags, vcs: &'a V) -> Result<Self> {
        let target = ReleaseTarget::setup(config.version_file()?, config.match_policy())?;
        let branch = BranchContext::new(config.release_branch.clone(), config.remote.clone());

        Ok(ReleaseContext {
            config,
            target,
            flags,
            branch,
            push: true,
            local_release: None,
            vcs,
        })
    }

    pub fn with_push(mut self, push: bool) -> Self {
        self.push = push;
        self
    }

    pub fn version_file(&self) -> PathBuf {
        self.target.target_file_path.clone()
    }

    /// Run one precondition and report it
    pub fn check(&self, check: Check) -> Result<CheckStatus> {
        let status = preconditions::check(self.vcs, check, &self.branch, self.flags)?;
        ui::display_check(check.name(), status);
        Ok(status)
    }

    /// Run checks in order, stopping at the first failure
    pub fn check_all(&self, checks: &[Check]) -> Result<()> {
        for check in checks {
            self.check(*check)?;
        }
        Ok(())
    }

    /// Apply a named transition to the version file
    pub fn set_version(&mut self, transition: Transition) -> Result<EditOutcome> {
        apply_version_transition(&mut self.target, transition)
    }

    /// Fail unless the version file holds a release version
    pub fn is_release_version(&mut self) -> Result<VersionRecord> {
        require_release_version(&mut self.target)
    }

    /// Clean, on the release branch and up to date, then cut the release version
    pub fn prepare_release_push(&mut self) -> Result<EditOutcome> {
        self.check_all(&[Check::Clean, Check::OnBranch, Check::UpToDate])?;
        self.set_version(Transition::Release)
    }

    /// Cut the release version, then commit and push it
    pub fn only_push_release(&mut self) -> Result<WorkflowResult> {
        self.prepare_release_push()?;
        let version = self.target.reload()?.clone();

        let marker = if self.flags.skip_ci_marker { SKIP_CI } else { "" };
        let message = format!("{}Version {}", marker, version);
        let (commit, pushed) = self.commit_version_file(&message)?;
        let committed = commit.is_some();
        self.local_release = if pushed { None } else { commit };

        Ok(WorkflowResult {
            version: version.version_string(),
            released: Some(version.version_string()),
            committed,
            pushed,
            tag: None,
        })
    }

    /// Move the version file to the next development version and commit it
    pub fn next_dev_cycle(&mut self) -> Result<WorkflowResult> {
        self.check(Check::Clean)?;
        self.set_version(Transition::Development)?;
        let version = self.target.reload()?.clone();

        let message = format!("{}New development cycle with version {}", SKIP_CI, version);
        let (commit, pushed) = self.commit_version_file(&message)?;
        let committed = commit.is_some();
        self.local_release = None;

        Ok(WorkflowResult {
            version: version.version_string(),
            released: None,
            committed,
            pushed,
            tag: None,
        })
    }

    /// Push a release commit for CI to publish, then open the next development cycle
    pub fn push_release(&mut self) -> Result<WorkflowResult> {
        let released = self.only_push_release()?;
        let next = self.next_dev_cycle()?;
        Ok(released.merge(next))
    }

    /// Tag the current release version and push the tag
    pub fn release(&mut self) -> Result<WorkflowResult> {
        self.check(Check::Clean)?;
        match self.local_release.clone() {
            Some(commit) => {
                let status = preconditions::check_at_local_release(self.vcs, &commit)?;
                ui::display_check("at-local-release", status);
            }
            None => {
                self.check(Check::OnRemoteRelease)?;
            }
        }
        let version = self.is_release_version()?;

        let tag = self.config.tag_pattern()?.format(&version.version_string());
        ui::display_status(&format!("Creating tag: {}", tag));
        self.vcs.create_tag(&tag)?;

        let pushed = if self.push {
            self.vcs.push_tag(&self.branch.remote, &tag)?;
            ui::display_success(&format!("Pushed tag {} to {}", tag, self.branch.remote));
            true
        } else {
            ui::display_success(&format!("Created tag {} locally", tag));
            false
        };

        Ok(WorkflowResult {
            version: version.version_string(),
            released: Some(version.version_string()),
            committed: false,
            pushed,
            tag: Some(tag),
        })
    }

    /// Release from this machine instead of after a CI build
    pub fn local_release(&mut self) -> Result<WorkflowResult> {
        let pushed = self.only_push_release()?;
        let tagged = self.release()?;
        let next = self.next_dev_cycle()?;
        Ok(pushed.merge(tagged).merge(next))
    }

    /// Release versions must be pushed from a clean, current release branch;
    /// pre-release versions may be pushed from anywhere
    pub fn validate_push(&mut self) -> Result<()> {
        let version = self.target.reload()?.clone();
        if version.is_pre_release() {
            debug!(%version, "pre-release push, skipping branch checks");
            return Ok(());
        }
        self.check_all(&[Check::Clean, Check::OnBranch, Check::UpToDate])
    }

    /// Validate, test, build and upload the package through the configured commands
    pub fn up(&mut self) -> Result<WorkflowResult> {
        self.validate_push()?;
        let version = self.target.current_value.clone();

        let mut step = StepContext::new(StepKind::Validate, version.version_string());
        step.package = self.config.package_name();
        step.artifact = step
            .package
            .as_ref()
            .map(|_| PathBuf::from(step.substitute(&self.config.package.artifact)));

        let commands = self.config.commands.clone();
        self.run_step(&step.for_step(StepKind::Validate), commands.validate.as_deref())?;
        self.run_step(&step.for_step(StepKind::Test), commands.test.as_deref())?;
        let built = self.run_step(&step.for_step(StepKind::Build), commands.build.as_deref())?;

        if let (true, Some(artifact)) = (built, &step.artifact) {
            if !artifact.is_file() {
                return Err(ReleaseError::command(format!(
                    "expected artifact '{}' was not built",
                    artifact.display()
                )));
            }
        }

        let uploaded = self.run_step(&step.for_step(StepKind::Upload), commands.upload.as_deref())?;

        Ok(WorkflowResult {
            version: version.version_string(),
            released: None,
            committed: false,
            pushed: uploaded,
            tag: None,
        })
    }

    fn run_step(&self, step: &StepContext, argv: Option<&[String]>) -> Result<bool> {
        let name = step.kind.name();
        if argv.is_none() {
            ui::display_status(&format!("{}: no command configured, skipping", name));
            return Ok(false);
        }

        ui::display_status(&format!("Running {} step...", name));
        StepExecutor::execute_configured(argv, step)?;
        ui::display_success(&format!("{} step finished", name));
        Ok(true)
    }

    /// Commit the version file if it changed, pushing unless disabled.
    ///
    /// Returns the new commit, if any, and whether it was pushed.
    fn commit_version_file(&self, message: &str) -> Result<(Option<String>, bool)> {
        if self.vcs.is_clean()? {
            ui::display_status("Version file unchanged, nothing to commit");
            return Ok((None, false));
        }

        let path = self.version_file();
        let paths = [path.as_path()];

        if self.push {
            let sha = self.vcs.commit_and_push(
                &paths,
                &self.branch.remote,
                &self.branch.branch,
                message,
            )?;
            ui::display_success(&format!("Committed and pushed: {}", message));
            Ok((Some(sha), true))
        } else {
            let sha = self.vcs.commit(&paths, message)?;
            ui::display_success(&format!("Committed: {}", message));
            ui::display_manual_push_instruction(&self.branch.remote, &self.branch.branch);
            Ok((Some(sha), false))
        }
    }
}
