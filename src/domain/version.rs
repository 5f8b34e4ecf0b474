use regex::Regex;

use crate::error::{ReleaseError, Result};
use std::fmt;
use std::sync::OnceLock;

/// Pre-release tag appended by a development bump.
pub const DEVELOPMENT_TAG: &str = "pre";

fn declaration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^(?P<prefix>\s*\bVERSION\s*=\s*")(?P<major>[0-9]+)\.(?P<minor>[0-9]+)\.(?P<patch>[0-9]+)(?:\.(?P<pre>[A-Za-z0-9_]+))?(?P<suffix>".*)$"#,
        )
        .expect("version declaration pattern is valid")
    })
}

fn release_format_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]+\.[0-9]+\.[0-9]+$").expect("release pattern is valid"))
}

/// Splits a line into its content and its terminator (`\n`, `\r\n` or nothing).
fn split_terminator(line: &str) -> (&str, &str) {
    if let Some(content) = line.strip_suffix("\r\n") {
        (content, "\r\n")
    } else if let Some(content) = line.strip_suffix('\n') {
        (content, "\n")
    } else {
        (line, "")
    }
}

/// One parsed version declaration, e.g. `  VERSION = "1.2.3.pre"`.
///
/// The numeric fields and the optional pre-release tag are the version itself.
/// `prefix`, `suffix` and the line terminator are carried verbatim from the
/// source line so that [`VersionRecord::render`] reproduces it byte-for-byte.
///
/// Records are never mutated; every transition returns a new record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre_tag: Option<String>,
    prefix: String,
    suffix: String,
    terminator: String,
}

impl VersionRecord {
    /// Create a bare record with no surrounding source text.
    pub fn new(major: u64, minor: u64, patch: u64, pre_tag: Option<&str>) -> Self {
        VersionRecord {
            major,
            minor,
            patch,
            pre_tag: pre_tag.map(str::to_string),
            prefix: String::new(),
            suffix: String::new(),
            terminator: String::new(),
        }
    }

    /// Parse one line of a version declaration file.
    ///
    /// Returns `None` when the line is not a declaration; such lines are
    /// pass-through text for the editor. A numeric field too large for `u64`
    /// also yields `None`.
    ///
    /// # Example
    /// ```
    /// use release_tasks::domain::VersionRecord;
    ///
    /// let record = VersionRecord::parse("  VERSION = \"1.2.3.pre\"\n").unwrap();
    /// assert_eq!((record.major, record.minor, record.patch), (1, 2, 3));
    /// assert_eq!(record.pre_tag.as_deref(), Some("pre"));
    /// assert!(VersionRecord::parse("# VERSION is set below").is_none());
    /// ```
    pub fn parse(line: &str) -> Option<Self> {
        let (content, terminator) = split_terminator(line);
        let caps = declaration_regex().captures(content)?;

        Some(VersionRecord {
            major: caps["major"].parse().ok()?,
            minor: caps["minor"].parse().ok()?,
            patch: caps["patch"].parse().ok()?,
            pre_tag: caps.name("pre").map(|m| m.as_str().to_string()),
            prefix: caps["prefix"].to_string(),
            suffix: caps["suffix"].to_string(),
            terminator: terminator.to_string(),
        })
    }

    /// Text preceding the version numbers, including the opening quote.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Text following the version, starting at the closing quote.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn is_pre_release(&self) -> bool {
        self.pre_tag.is_some()
    }

    /// The bare version value, `major.minor.patch[.tag]`.
    pub fn version_string(&self) -> String {
        match &self.pre_tag {
            Some(tag) => format!("{}.{}.{}.{}", self.major, self.minor, self.patch, tag),
            None => format!("{}.{}.{}", self.major, self.minor, self.patch),
        }
    }

    /// Reconstruct the full source line.
    pub fn render(&self) -> String {
        format!(
            "{}{}{}{}",
            self.prefix,
            self.version_string(),
            self.suffix,
            self.terminator
        )
    }

    /// True iff the serialized value matches `^\d+\.\d+\.\d+$`.
    ///
    /// Checked against the rendered value rather than `pre_tag` alone.
    pub fn is_release_format(&self) -> bool {
        is_release_format(&self.version_string())
    }

    /// Cut the release for this record.
    ///
    /// A pre-release becomes its own release by dropping the tag. A bare
    /// version is taken to be the one already shipped, so the patch advances.
    ///
    /// # Errors
    /// [`ReleaseError::VersionOverflow`] if the patch is already `u64::MAX`.
    pub fn to_release_version(&self) -> Result<Self> {
        if self.is_pre_release() {
            Ok(self.without_pre_tag())
        } else {
            self.next_patch(None)
        }
    }

    /// Advance the patch and drop any tag.
    pub fn to_incremented_release_version(&self) -> Result<Self> {
        self.next_patch(None)
    }

    /// Start the next development cycle: `N` becomes `N+1.pre`, a pre-release stays put.
    pub fn to_development_version(&self) -> Result<Self> {
        if self.is_pre_release() {
            Ok(self.clone())
        } else {
            self.next_patch(Some(DEVELOPMENT_TAG.to_string()))
        }
    }

    /// Drop the tag without touching the numbers.
    pub fn without_pre_tag(&self) -> Self {
        VersionRecord {
            pre_tag: None,
            ..self.clone()
        }
    }

    /// Convert to a `semver::Version` for ordering.
    ///
    /// Underscores in the tag become hyphens since semver identifiers do not allow them.
    pub fn to_semver(&self) -> std::result::Result<semver::Version, semver::Error> {
        let mut version = semver::Version::new(self.major, self.minor, self.patch);
        if let Some(tag) = &self.pre_tag {
            version.pre = semver::Prerelease::new(&tag.replace('_', "-"))?;
        }
        Ok(version)
    }

    fn next_patch(&self, pre_tag: Option<String>) -> Result<Self> {
        let patch = self
            .patch
            .checked_add(1)
            .ok_or_else(|| ReleaseError::VersionOverflow {
                value: self.version_string(),
            })?;

        Ok(VersionRecord {
            patch,
            pre_tag,
            ..self.clone()
        })
    }
}

impl fmt::Display for VersionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.version_string())
    }
}

/// Strict check that a bare value is `major.minor.patch` with no tag.
pub fn is_release_format(value: &str) -> bool {
    release_format_regex().is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> VersionRecord {
        VersionRecord::parse(line).unwrap()
    }

    #[test]
    fn test_parse_release_line() {
        let v = parse("  VERSION = \"1.2.3\"\n");
        assert_eq!(v.major, 1);
        assert_eq!(v.minor, 2);
        assert_eq!(v.patch, 3);
        assert_eq!(v.pre_tag, None);
        assert_eq!(v.prefix(), "  VERSION = \"");
        assert_eq!(v.suffix(), "\"");
    }

    #[test]
    fn test_parse_pre_release_line() {
        let v = parse("VERSION=\"0.10.7.rc_2\" # bumped by CI\n");
        assert_eq!((v.major, v.minor, v.patch), (0, 10, 7));
        assert_eq!(v.pre_tag.as_deref(), Some("rc_2"));
        assert_eq!(v.suffix(), "\" # bumped by CI");
    }

    #[test]
    fn test_parse_rejects_non_declarations() {
        assert!(VersionRecord::parse("# comment\n").is_none());
        assert!(VersionRecord::parse("\n").is_none());
        assert!(VersionRecord::parse("MY_VERSION = \"1.2.3\"").is_none());
        assert!(VersionRecord::parse("VERSION = \"1.2\"").is_none());
        assert!(VersionRecord::parse("VERSION = \"1.2.3-beta\"").is_none());
        assert!(VersionRecord::parse("VERSION = 1.2.3").is_none());
    }

    #[test]
    fn test_parse_rejects_overflowing_numbers() {
        assert!(VersionRecord::parse("VERSION = \"1.2.99999999999999999999999\"").is_none());
    }

    #[test]
    fn test_render_round_trip() {
        let lines = [
            "  VERSION = \"1.2.3\"\n",
            "\tVERSION   =   \"4.5.6.pre\"   # trailing\n",
            "VERSION = \"0.0.1\".freeze\r\n",
            "VERSION = \"7.8.9\"",
        ];
        for line in lines {
            assert_eq!(parse(line).render(), line);
        }
    }

    #[test]
    fn test_release_version_strips_pre_tag() {
        let v = parse("VERSION = \"1.2.3.pre\"\n").to_release_version().unwrap();
        assert_eq!(v.version_string(), "1.2.3");
        assert_eq!(v.render(), "VERSION = \"1.2.3\"\n");
    }

    #[test]
    fn test_release_version_bumps_bare_version() {
        let v = VersionRecord::new(1, 2, 3, None).to_release_version().unwrap();
        assert_eq!(v, VersionRecord::new(1, 2, 4, None));
    }

    #[test]
    fn test_incremented_release_version_always_bumps() {
        assert_eq!(
            VersionRecord::new(1, 2, 3, Some("pre")).to_incremented_release_version().unwrap(),
            VersionRecord::new(1, 2, 4, None)
        );
        assert_eq!(
            VersionRecord::new(1, 2, 3, None).to_incremented_release_version().unwrap(),
            VersionRecord::new(1, 2, 4, None)
        );
    }

    #[test]
    fn test_development_version_is_noop_for_pre_release() {
        let v = VersionRecord::new(1, 2, 3, Some("pre"));
        assert_eq!(v.to_development_version().unwrap(), v);
    }

    #[test]
    fn test_development_version_advances_release() {
        let v = parse("VERSION = \"1.2.3\"\n").to_development_version().unwrap();
        assert_eq!(v.render(), "VERSION = \"1.2.4.pre\"\n");
    }

    #[test]
    fn test_without_pre_tag_keeps_numbers() {
        assert_eq!(
            VersionRecord::new(3, 0, 0, Some("rc1")).without_pre_tag(),
            VersionRecord::new(3, 0, 0, None)
        );
        assert_eq!(
            VersionRecord::new(3, 0, 0, None).without_pre_tag(),
            VersionRecord::new(3, 0, 0, None)
        );
    }

    #[test]
    fn test_release_format() {
        assert!(VersionRecord::new(2, 0, 0, None).is_release_format());
        assert!(!VersionRecord::new(2, 0, 0, Some("pre")).is_release_format());
        assert!(!VersionRecord::new(2, 0, 0, Some("rc1")).is_release_format());
        assert!(is_release_format("10.20.30"));
        assert!(!is_release_format("10.20.30\n"));
        assert!(!is_release_format("v1.2.3"));
    }

    #[test]
    fn test_transitions_never_move_backwards() {
        let start = [
            VersionRecord::new(1, 2, 3, None),
            VersionRecord::new(1, 2, 3, Some("pre")),
        ];
        for v in start {
            let before = v.to_semver().unwrap();
            for next in [
                v.to_release_version().unwrap(),
                v.to_incremented_release_version().unwrap(),
                v.to_development_version().unwrap(),
                v.without_pre_tag(),
            ] {
                assert!(next.to_semver().unwrap() >= before, "{} -> {}", v, next);
            }
        }
    }

    #[test]
    fn test_patch_overflow_is_an_error() {
        let v = parse("VERSION = \"1.2.18446744073709551615\"\n");
        assert_eq!(v.patch, u64::MAX);

        assert!(matches!(
            v.to_release_version(),
            Err(ReleaseError::VersionOverflow { .. })
        ));
        assert!(v.to_incremented_release_version().is_err());
        assert!(v.to_development_version().is_err());

        let pre = VersionRecord::new(1, 2, u64::MAX, Some("pre"));
        assert_eq!(pre.to_release_version().unwrap().patch, u64::MAX);
        assert_eq!(pre.to_development_version().unwrap(), pre);
    }

    #[test]
    fn test_to_semver_maps_underscores() {
        let v = VersionRecord::new(1, 0, 0, Some("rc_1")).to_semver().unwrap();
        assert_eq!(v.to_string(), "1.0.0-rc-1");
    }

    #[test]
    fn test_display() {
        assert_eq!(VersionRecord::new(1, 2, 3, Some("pre")).to_string(), "1.2.3.pre");
    }
}
