use crate::domain::VersionRecord;
use crate::error::Result;
use std::fmt;

/// Named version transitions, one per release task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Leave the version untouched
    Identity,
    /// Drop a pre-release tag, or advance the patch of a bare version
    Release,
    /// Always advance the patch, dropping any tag
    IncrementRelease,
    /// Drop a pre-release tag without incrementing
    StripPreTag,
    /// Advance a bare version to the next `.pre`; keep a pre-release as is
    Development,
}

impl Transition {
    /// Apply this transition to a record
    ///
    /// Fails only when a patch increment would overflow.
    pub fn apply(&self, record: &VersionRecord) -> Result<VersionRecord> {
        match self {
            Transition::Identity => Ok(record.clone()),
            Transition::Release => record.to_release_version(),
            Transition::IncrementRelease => record.to_incremented_release_version(),
            Transition::StripPreTag => Ok(record.without_pre_tag()),
            Transition::Development => record.to_development_version(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transition::Identity => "identity",
            Transition::Release => "release",
            Transition::IncrementRelease => "increment-release",
            Transition::StripPreTag => "strip-pre-tag",
            Transition::Development => "development",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_matches_record_operations() {
        let bare = VersionRecord::new(1, 2, 3, None);
        let pre = VersionRecord::new(1, 2, 3, Some("pre"));

        assert_eq!(Transition::Identity.apply(&pre).unwrap(), pre);
        assert_eq!(Transition::Release.apply(&bare).unwrap().to_string(), "1.2.4");
        assert_eq!(Transition::Release.apply(&pre).unwrap().to_string(), "1.2.3");
        assert_eq!(Transition::IncrementRelease.apply(&pre).unwrap().to_string(), "1.2.4");
        assert_eq!(Transition::StripPreTag.apply(&pre).unwrap().to_string(), "1.2.3");
        assert_eq!(Transition::StripPreTag.apply(&bare).unwrap().to_string(), "1.2.3");
        assert_eq!(Transition::Development.apply(&bare).unwrap().to_string(), "1.2.4.pre");
        assert_eq!(Transition::Development.apply(&pre).unwrap().to_string(), "1.2.3.pre");
    }

    #[test]
    fn test_apply_reports_overflow() {
        let max = VersionRecord::new(0, 1, u64::MAX, None);
        assert!(Transition::Release.apply(&max).is_err());
        assert!(Transition::Development.apply(&max).is_err());
        assert_eq!(Transition::StripPreTag.apply(&max).unwrap(), max);
    }

    #[test]
    fn test_names() {
        assert_eq!(Transition::IncrementRelease.to_string(), "increment-release");
        assert_eq!(Transition::Development.name(), "development");
    }
}
