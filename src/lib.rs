pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod preconditions;
pub mod steps;
pub mod ui;
pub mod version_file;

pub use domain::{Transition, VersionRecord};
pub use error::{ReleaseError, Result};
pub use version_file::{MatchPolicy, ReleaseTarget, VersionFileEditor};
