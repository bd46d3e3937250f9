//! Version values and extraction from command output.
//!
//! Pins are exact: two versions are equal iff their normalized strings are
//! identical. There is no semantic ordering, so "3.11.0rc1" is a mismatch
//! against "3.11.0", and a host running something *newer* than the pin is
//! just as out of spec as one running something older.
//!
//! Extraction is a structured pattern match, never a substring check: a
//! host reporting "13.11.0" must not satisfy a "3.11.0" pin.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// A normalized version string, e.g. "3.11.0", "4.82", "18.19.0rc1".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Create a version from a pin string. Leading "v" and whitespace are
    /// stripped so "v18.19.0" and "18.19.0" normalize identically.
    pub fn new(s: &str) -> Self {
        Self(s.trim().trim_start_matches('v').to_string())
    }

    /// The normalized version string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // A version token must start at a non-digit boundary so "13.11.0"
    // can never yield "3.11.0". Two or three numeric components plus an
    // optional pre-release suffix ("rc1", "b2").
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[^0-9.])(\d+\.\d+(?:\.\d+)?(?:[a-zA-Z]+\d*)?)").expect("valid regex")
    })
}

/// Extract the first version token from command output.
///
/// Scans stdout-style text for a "major.minor[.patch][suffix]" token.
/// Returns `None` when no such token exists, which the inspector reports
/// as a detection parse failure.
pub fn extract_version(output: &str) -> Option<Version> {
    version_regex()
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| Version::new(m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_three_part_version() {
        let out = "Python 3.11.0";
        assert_eq!(extract_version(out), Some(Version::new("3.11.0")));
    }

    #[test]
    fn extracts_two_part_version() {
        // Pyro4 reports a two-component version
        assert_eq!(extract_version("4.82"), Some(Version::new("4.82")));
    }

    #[test]
    fn extracts_version_with_v_prefix() {
        assert_eq!(extract_version("v18.19.0"), Some(Version::new("18.19.0")));
    }

    #[test]
    fn extracts_prerelease_suffix() {
        let out = "Python 3.11.0rc1";
        assert_eq!(extract_version(out), Some(Version::new("3.11.0rc1")));
    }

    #[test]
    fn prerelease_is_not_equal_to_release() {
        assert_ne!(Version::new("3.11.0rc1"), Version::new("3.11.0"));
    }

    #[test]
    fn no_substring_false_positive() {
        // "13.11.0" must parse as itself, never as "3.11.0"
        let out = "tool 13.11.0";
        assert_eq!(extract_version(out), Some(Version::new("13.11.0")));
        assert_ne!(extract_version(out), Some(Version::new("3.11.0")));
    }

    #[test]
    fn no_version_yields_none() {
        assert_eq!(extract_version("command not found"), None);
        assert_eq!(extract_version(""), None);
    }

    #[test]
    fn picks_first_token_in_noisy_output() {
        let out = "ruby 3.2.1 (2023-02-08 revision 31819e82c8)";
        assert_eq!(extract_version(out), Some(Version::new("3.2.1")));
    }

    #[test]
    fn exact_equality_only() {
        assert_eq!(Version::new("3.11.0"), Version::new("3.11.0"));
        assert_ne!(Version::new("3.11.0"), Version::new("3.11.9"));
        assert_ne!(Version::new("3.11.0"), Version::new("3.11"));
    }

    #[test]
    fn display_round_trips() {
        let v = Version::new("v16.1.4");
        assert_eq!(v.to_string(), "16.1.4");
        assert_eq!(v.as_str(), "16.1.4");
    }

    #[test]
    fn serializes_as_plain_string() {
        let v = Version::new("16.1.4");
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"16.1.4\"");
        let parsed: Version = serde_json::from_str("\"16.1.4\"").unwrap();
        assert_eq!(parsed, v);
    }
}
