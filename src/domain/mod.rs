//! Domain logic - pure version rules independent of files, git and processes

pub mod tag;
pub mod transition;
pub mod version;

pub use tag::TagPattern;
pub use transition::Transition;
pub use version::{is_release_format, VersionRecord, DEVELOPMENT_TAG};
