use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::TagPattern;
use crate::error::{ReleaseError, Result};
use crate::version_file::MatchPolicy;

/// Name of the project-local configuration file.
pub const CONFIG_FILE_NAME: &str = "release.toml";

/// Represents the complete configuration for release-tasks.
///
/// Names the version file to operate on, the branch and remote releases are
/// cut from, and the external commands used to build and upload artifacts.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub version_file: Option<PathBuf>,

    #[serde(default = "default_release_branch")]
    pub release_branch: String,

    #[serde(default = "default_remote")]
    pub remote: String,

    /// Fail when the version file holds more than one declaration
    #[serde(default)]
    pub strict: bool,

    #[serde(default = "default_tag_pattern")]
    pub tag_pattern: String,

    #[serde(default)]
    pub package: PackageConfig,

    #[serde(default)]
    pub commands: CommandsConfig,
}

fn default_release_branch() -> String {
    "master".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_tag_pattern() -> String {
    "v{version}".to_string()
}

fn default_artifact_pattern() -> String {
    "pkg/{name}-{version}.gem".to_string()
}

/// Package naming used to locate the built artifact.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PackageConfig {
    #[serde(default)]
    pub name: Option<String>,

    /// Artifact path relative to the project root, with `{name}` and `{version}` placeholders
    #[serde(default = "default_artifact_pattern")]
    pub artifact: String,
}

impl Default for PackageConfig {
    fn default() -> Self {
        PackageConfig {
            name: None,
            artifact: default_artifact_pattern(),
        }
    }
}

/// External commands run by the `up` task, as argv arrays.
///
/// Each argument may use `{version}`, `{name}` and `{artifact}` placeholders.
/// A missing command is skipped.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct CommandsConfig {
    #[serde(default)]
    pub validate: Option<Vec<String>>,

    #[serde(default)]
    pub test: Option<Vec<String>>,

    #[serde(default)]
    pub build: Option<Vec<String>>,

    #[serde(default)]
    pub upload: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            version_file: None,
            release_branch: default_release_branch(),
            remote: default_remote(),
            strict: false,
            tag_pattern: default_tag_pattern(),
            package: PackageConfig::default(),
            commands: CommandsConfig::default(),
        }
    }
}

impl Config {
    /// The configured version file, or a configuration error naming the key.
    pub fn version_file(&self) -> Result<&Path> {
        self.version_file.as_deref().ok_or_else(|| {
            ReleaseError::config(format!(
                "no version_file configured; set it in {} or pass --version-file",
                CONFIG_FILE_NAME
            ))
        })
    }

    pub fn match_policy(&self) -> MatchPolicy {
        if self.strict {
            MatchPolicy::Strict
        } else {
            MatchPolicy::All
        }
    }

    pub fn tag_pattern(&self) -> Result<TagPattern> {
        TagPattern::new(self.tag_pattern.clone())
    }

    /// Package name from config, falling back to the version file's stem.
    pub fn package_name(&self) -> Option<String> {
        self.package.name.clone().or_else(|| {
            self.version_file
                .as_ref()
                .and_then(|path| path.parent())
                .and_then(|dir| dir.file_name())
                .map(|name| name.to_string_lossy().into_owned())
        })
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `release.toml` in current directory
/// 3. `release-tasks.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Arguments
/// * `config_path` - Optional path to custom configuration file
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let path = if let Some(path) = config_path {
        path.to_path_buf()
    } else if Path::new(CONFIG_FILE_NAME).exists() {
        PathBuf::from(CONFIG_FILE_NAME)
    } else if let Some(config_dir) = dirs::config_dir() {
        let user_path = config_dir.join("release-tasks.toml");
        if user_path.exists() {
            user_path
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    let config_str = fs::read_to_string(&path).map_err(|e| ReleaseError::io(&path, e))?;
    toml::from_str(&config_str).map_err(|e| {
        ReleaseError::config(format!("cannot parse '{}': {}", path.display(), e))
    })
}

/// Workflow switches derived from the CI environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeFlags {
    /// Running under CI on the release branch; branch checks pass
    pub ci_mode: bool,
    /// Skip branch checks entirely for local/manual runs
    pub ignore_branch: bool,
    /// Prefix release commits with `[skip ci] `
    pub skip_ci_marker: bool,
}

impl ModeFlags {
    /// Read the flags from the process environment.
    ///
    /// * `ci_mode` - `CI_BRANCH` (or `TRAVIS_BRANCH`) equals `release_branch`
    /// * `ignore_branch` - `IGNORE_BRANCH=true`
    /// * `skip_ci_marker` - `TRAVIS_SECURE_ENV_VARS` is set
    pub fn from_env(release_branch: &str) -> Self {
        Self::from_lookup(release_branch, |key| env::var(key).ok())
    }

    /// Build the flags from an arbitrary variable lookup.
    pub fn from_lookup<F>(release_branch: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let ci_branch = lookup("CI_BRANCH").or_else(|| lookup("TRAVIS_BRANCH"));

        ModeFlags {
            ci_mode: ci_branch.as_deref() == Some(release_branch),
            ignore_branch: lookup("IGNORE_BRANCH").as_deref() == Some("true"),
            skip_ci_marker: lookup("TRAVIS_SECURE_ENV_VARS").is_some(),
        }
    }
}
