//! Workflow layer shared by the binary and library callers

pub mod orchestration;

pub use crate::preconditions::Check;
pub use orchestration::{ReleaseContext, WorkflowResult};
