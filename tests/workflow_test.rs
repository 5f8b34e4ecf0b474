use std::fs;
use std::path::PathBuf;

use release_tasks::cli::ReleaseContext;
use release_tasks::config::{Config, ModeFlags};
use release_tasks::git::{Git2Repository, MockRepository, Vcs};
use release_tasks::ReleaseError;
use tempfile::TempDir;

fn project(version: &str) -> (TempDir, PathBuf, Config) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("version.rb");
    fs::write(
        &path,
        format!("module Foo\n  VERSION = \"{}\"\nend\n", version),
    )
    .unwrap();

    let config = Config {
        version_file: Some(path.clone()),
        ..Config::default()
    };
    (dir, path, config)
}

fn repo_for(path: &PathBuf) -> MockRepository {
    let repo = MockRepository::new("master");
    repo.track(path);
    repo
}

fn version_in(path: &PathBuf) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn test_prepare_release_push_cuts_release() {
    let (_dir, path, config) = project("1.2.0.pre");
    let repo = repo_for(&path);

    let mut ctx = ReleaseContext::new(config, ModeFlags::default(), &repo).unwrap();
    let outcome = ctx.prepare_release_push().unwrap();

    assert!(outcome.changed());
    assert!(version_in(&path).contains("VERSION = \"1.2.0\""));
    assert!(repo.commits().is_empty());
}

#[test]
fn test_prepare_release_push_requires_clean_tree() {
    let (_dir, path, config) = project("1.2.0.pre");
    let repo = repo_for(&path);
    repo.set_untracked_changes(true);

    let mut ctx = ReleaseContext::new(config, ModeFlags::default(), &repo).unwrap();
    let err = ctx.prepare_release_push().unwrap_err();

    assert!(matches!(
        err,
        ReleaseError::PreconditionFailed { check: "clean", .. }
    ));
    assert!(version_in(&path).contains("1.2.0.pre"));
}

#[test]
fn test_prepare_release_push_requires_release_branch() {
    let (_dir, path, config) = project("1.2.0.pre");
    let repo = MockRepository::new("feature");
    repo.track(&path);

    let mut ctx = ReleaseContext::new(config.clone(), ModeFlags::default(), &repo).unwrap();
    assert!(ctx.prepare_release_push().is_err());
    assert!(version_in(&path).contains("1.2.0.pre"));

    let flags = ModeFlags {
        ignore_branch: true,
        ..ModeFlags::default()
    };
    let mut ctx = ReleaseContext::new(config, flags, &repo).unwrap();
    ctx.prepare_release_push().unwrap();
    assert!(version_in(&path).contains("VERSION = \"1.2.0\""));
}

#[test]
fn test_prepare_release_push_requires_up_to_date() {
    let (_dir, path, config) = project("1.2.0.pre");
    let repo = repo_for(&path);
    repo.set_synced(false);

    let flags = ModeFlags {
        ci_mode: true,
        ..ModeFlags::default()
    };
    let mut ctx = ReleaseContext::new(config, flags, &repo).unwrap();
    assert!(ctx.prepare_release_push().is_err());
}

#[test]
fn test_only_push_release_commits_and_pushes() {
    let (_dir, path, config) = project("1.2.0.pre");
    let repo = repo_for(&path);

    let mut ctx = ReleaseContext::new(config, ModeFlags::default(), &repo).unwrap();
    let result = ctx.only_push_release().unwrap();

    assert_eq!(result.released.as_deref(), Some("1.2.0"));
    assert!(result.committed);
    assert!(result.pushed);

    let commits = repo.commits();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].message, "Version 1.2.0");
    assert_eq!(commits[0].paths, vec![path.clone()]);
    assert_eq!(repo.pushes(), vec!["origin/master".to_string()]);
}

#[test]
fn test_only_push_release_marks_skip_ci() {
    let (_dir, path, config) = project("1.2.0.pre");
    let repo = repo_for(&path);
    let flags = ModeFlags {
        skip_ci_marker: true,
        ..ModeFlags::default()
    };

    let mut ctx = ReleaseContext::new(config, flags, &repo).unwrap();
    ctx.only_push_release().unwrap();

    assert_eq!(repo.commits()[0].message, "[skip ci] Version 1.2.0");
}

#[test]
fn test_only_push_release_without_push_keeps_commit_local() {
    let (_dir, path, config) = project("1.2.0.pre");
    let repo = repo_for(&path);

    let mut ctx = ReleaseContext::new(config, ModeFlags::default(), &repo)
        .unwrap()
        .with_push(false);
    let result = ctx.only_push_release().unwrap();

    assert!(result.committed);
    assert!(!result.pushed);
    assert_eq!(repo.commits().len(), 1);
    assert!(repo.pushes().is_empty());
}

#[test]
fn test_rejected_push_is_reported() {
    let (_dir, path, config) = project("1.2.0.pre");
    let repo = repo_for(&path);
    repo.set_fail_push(true);

    let mut ctx = ReleaseContext::new(config, ModeFlags::default(), &repo).unwrap();
    let err = ctx.only_push_release().unwrap_err();

    assert!(matches!(err, ReleaseError::Remote(_)));
}

#[test]
fn test_next_dev_cycle_opens_pre_version() {
    let (_dir, path, config) = project("1.2.0");
    let repo = repo_for(&path);

    let mut ctx = ReleaseContext::new(config, ModeFlags::default(), &repo).unwrap();
    let result = ctx.next_dev_cycle().unwrap();

    assert_eq!(result.version, "1.2.1.pre");
    assert!(version_in(&path).contains("VERSION = \"1.2.1.pre\""));
    assert_eq!(
        repo.commits()[0].message,
        "[skip ci] New development cycle with version 1.2.1.pre"
    );
}

#[test]
fn test_push_release_runs_full_cycle() {
    let (_dir, path, config) = project("1.2.0.pre");
    let repo = repo_for(&path);

    let mut ctx = ReleaseContext::new(config, ModeFlags::default(), &repo).unwrap();
    let result = ctx.push_release().unwrap();

    assert_eq!(result.released.as_deref(), Some("1.2.0"));
    assert_eq!(result.version, "1.2.1.pre");

    let messages: Vec<String> = repo.commits().into_iter().map(|c| c.message).collect();
    assert_eq!(
        messages,
        vec![
            "Version 1.2.0".to_string(),
            "[skip ci] New development cycle with version 1.2.1.pre".to_string(),
        ]
    );
    assert_eq!(repo.pushes().len(), 2);
}

#[test]
fn test_release_tags_release_version() {
    let (_dir, path, config) = project("1.2.0");
    let repo = repo_for(&path);

    let mut ctx = ReleaseContext::new(config, ModeFlags::default(), &repo).unwrap();
    let result = ctx.release().unwrap();

    assert_eq!(result.tag.as_deref(), Some("v1.2.0"));
    assert_eq!(repo.tags(), vec!["v1.2.0".to_string()]);
    assert_eq!(repo.pushes(), vec!["origin tag v1.2.0".to_string()]);
}

#[test]
fn test_release_rejects_pre_release_version() {
    let (_dir, path, config) = project("1.2.0.pre");
    let repo = repo_for(&path);

    let mut ctx = ReleaseContext::new(config, ModeFlags::default(), &repo).unwrap();
    let err = ctx.release().unwrap_err();

    match err {
        ReleaseError::FormatViolation { value, .. } => assert_eq!(value, "1.2.0.pre"),
        other => panic!("unexpected error: {}", other),
    }
    assert!(repo.tags().is_empty());
}

#[test]
fn test_release_requires_remote_head() {
    let (_dir, path, config) = project("1.2.0");
    let repo = repo_for(&path);
    repo.set_at_remote_head(false);

    let mut ctx = ReleaseContext::new(config, ModeFlags::default(), &repo).unwrap();
    assert!(ctx.release().is_err());
    assert!(repo.tags().is_empty());
}

#[test]
fn test_local_release_pushes_tags_and_reopens() {
    let (_dir, path, config) = project("2.0.0.pre");
    let repo = repo_for(&path);

    let mut ctx = ReleaseContext::new(config, ModeFlags::default(), &repo).unwrap();
    let result = ctx.local_release().unwrap();

    assert_eq!(result.released.as_deref(), Some("2.0.0"));
    assert_eq!(result.tag.as_deref(), Some("v2.0.0"));
    assert_eq!(result.version, "2.0.1.pre");
    assert_eq!(repo.commits().len(), 2);
    assert_eq!(
        repo.pushes(),
        vec![
            "origin/master".to_string(),
            "origin tag v2.0.0".to_string(),
            "origin/master".to_string(),
        ]
    );
}

#[test]
fn test_local_release_without_push() {
    let (_dir, path, config) = project("2.0.0.pre");
    let repo = repo_for(&path);

    let mut ctx = ReleaseContext::new(config, ModeFlags::default(), &repo)
        .unwrap()
        .with_push(false);
    let result = ctx.local_release().unwrap();

    assert_eq!(result.released.as_deref(), Some("2.0.0"));
    assert_eq!(result.tag.as_deref(), Some("v2.0.0"));
    assert_eq!(result.version, "2.0.1.pre");
    assert!(!result.pushed);
    assert_eq!(repo.commits().len(), 2);
    assert_eq!(repo.tags(), vec!["v2.0.0".to_string()]);
    assert!(repo.pushes().is_empty());
}

#[test]
fn test_release_after_unrelated_local_commit_is_rejected() {
    let (_dir, path, config) = project("2.0.0.pre");
    let repo = repo_for(&path);

    let mut ctx = ReleaseContext::new(config, ModeFlags::default(), &repo)
        .unwrap()
        .with_push(false);
    ctx.only_push_release().unwrap();
    repo.commit(&[], "Unrelated change").unwrap();

    let err = ctx.release().unwrap_err();
    assert!(matches!(
        err,
        ReleaseError::PreconditionFailed { check: "at-local-release", .. }
    ));
    assert!(repo.tags().is_empty());
}

#[test]
fn test_release_requires_push_of_earlier_release_commit() {
    let (_dir, path, config) = project("2.0.0.pre");
    let repo = repo_for(&path);

    let mut ctx = ReleaseContext::new(config.clone(), ModeFlags::default(), &repo)
        .unwrap()
        .with_push(false);
    ctx.only_push_release().unwrap();

    // A fresh run knows nothing of the unpushed commit.
    let mut ctx = ReleaseContext::new(config, ModeFlags::default(), &repo).unwrap();
    let err = ctx.release().unwrap_err();
    assert!(matches!(
        err,
        ReleaseError::PreconditionFailed { check: "on-remote-branch", .. }
    ));
}

fn git_project(version: &str) -> (TempDir, TempDir, PathBuf, Git2Repository) {
    let dir = TempDir::new().unwrap();
    let remote_dir = TempDir::new().unwrap();
    git2::Repository::init_bare(remote_dir.path()).unwrap();

    let repo = git2::Repository::init(dir.path()).unwrap();
    {
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@example.com").unwrap();
    }
    repo.remote("origin", remote_dir.path().to_str().unwrap())
        .unwrap();

    let path = dir.path().join("version.rb");
    fs::write(
        &path,
        format!("module Foo\n  VERSION = \"{}\"\nend\n", version),
    )
    .unwrap();

    let repo = Git2Repository::from_git2(repo);
    repo.commit(&[path.as_path()], "Initial commit").unwrap();
    let branch = repo.current_branch().unwrap();
    repo.push("origin", &branch).unwrap();

    (dir, remote_dir, path, repo)
}

#[test]
fn test_local_release_without_push_on_git_repository() {
    let (_dir, remote_dir, path, repo) = git_project("2.0.0.pre");
    let config = Config {
        version_file: Some(path.clone()),
        release_branch: repo.current_branch().unwrap(),
        ..Config::default()
    };

    let mut ctx = ReleaseContext::new(config, ModeFlags::default(), &repo)
        .unwrap()
        .with_push(false);
    let result = ctx.local_release().unwrap();

    assert_eq!(result.tag.as_deref(), Some("v2.0.0"));
    assert!(version_in(&path).contains("VERSION = \"2.0.1.pre\""));
    assert!(repo.is_clean().unwrap());

    let remote = git2::Repository::open_bare(remote_dir.path()).unwrap();
    assert!(remote.find_reference("refs/tags/v2.0.0").is_err());
}

#[test]
fn test_custom_tag_pattern() {
    let (_dir, path, mut config) = project("0.9.1");
    config.tag_pattern = "release-{version}".to_string();
    let repo = repo_for(&path);

    let mut ctx = ReleaseContext::new(config, ModeFlags::default(), &repo).unwrap();
    ctx.release().unwrap();

    assert_eq!(repo.tags(), vec!["release-0.9.1".to_string()]);
}

#[test]
fn test_validate_push_skips_checks_for_pre_release() {
    let (_dir, path, config) = project("1.2.0.pre");
    let repo = MockRepository::new("feature");
    repo.track(&path);
    repo.set_untracked_changes(true);

    let mut ctx = ReleaseContext::new(config, ModeFlags::default(), &repo).unwrap();
    ctx.validate_push().unwrap();
}

#[test]
fn test_validate_push_checks_release_version() {
    let (_dir, path, config) = project("1.2.0");
    let repo = MockRepository::new("feature");
    repo.track(&path);

    let mut ctx = ReleaseContext::new(config, ModeFlags::default(), &repo).unwrap();
    assert!(ctx.validate_push().is_err());
}

#[test]
fn test_up_without_commands_skips_steps() {
    let (_dir, path, config) = project("1.2.0.pre");
    let repo = repo_for(&path);

    let mut ctx = ReleaseContext::new(config, ModeFlags::default(), &repo).unwrap();
    let result = ctx.up().unwrap();

    assert_eq!(result.version, "1.2.0.pre");
    assert!(!result.pushed);
}

#[cfg(unix)]
#[test]
fn test_up_builds_and_uploads_artifact() {
    let (dir, path, mut config) = project("1.2.0");
    let uploaded = dir.path().join("uploaded");

    config.package.name = Some("foo".to_string());
    config.package.artifact = format!("{}/pkg/{{name}}-{{version}}.gem", dir.path().display());
    config.commands.build = Some(vec![
        "sh".to_string(),
        "-c".to_string(),
        "mkdir -p \"$(dirname \"$RELEASE_ARTIFACT\")\" && touch \"$RELEASE_ARTIFACT\"".to_string(),
    ]);
    config.commands.upload = Some(vec![
        "cp".to_string(),
        "{artifact}".to_string(),
        uploaded.display().to_string(),
    ]);
    let repo = repo_for(&path);

    let mut ctx = ReleaseContext::new(config, ModeFlags::default(), &repo).unwrap();
    let result = ctx.up().unwrap();

    assert!(result.pushed);
    assert!(dir.path().join("pkg/foo-1.2.0.gem").is_file());
    assert!(uploaded.is_file());
}

#[cfg(unix)]
#[test]
fn test_up_fails_when_artifact_missing() {
    let (dir, path, mut config) = project("1.2.0");
    config.package.name = Some("foo".to_string());
    config.package.artifact = format!("{}/pkg/{{name}}-{{version}}.gem", dir.path().display());
    config.commands.build = Some(vec!["true".to_string()]);
    let repo = repo_for(&path);

    let mut ctx = ReleaseContext::new(config, ModeFlags::default(), &repo).unwrap();
    let err = ctx.up().unwrap_err();

    assert!(matches!(err, ReleaseError::Command(_)));
}

#[test]
fn test_context_requires_version_file() {
    let repo = MockRepository::new("master");
    let err = ReleaseContext::new(Config::default(), ModeFlags::default(), &repo)
        .err()
        .unwrap();
    assert!(matches!(err, ReleaseError::Config(_)));
}
