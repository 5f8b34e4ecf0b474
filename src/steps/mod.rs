//! External pipeline steps
//!
//! Validation, tests, packaging and upload are opaque commands configured in
//! `release.toml`; only their exit status matters:
//! - validate: check the package manifest
//! - test: run the project's test suite
//! - build: produce the artifact
//! - upload: publish the artifact

pub mod executor;
pub mod lifecycle;

pub use executor::StepExecutor;
pub use lifecycle::{StepContext, StepKind};
