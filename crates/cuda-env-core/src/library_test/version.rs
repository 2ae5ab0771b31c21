use std::fmt;
use std::str::FromStr;

use semver::Version;
use thiserror::Error;

/// Error type for library version parsing and checks
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid library version '{0}'")]
    InvalidFormat(String),

    #[error("Version mismatch: expected {expected} ({policy}), found {found}")]
    Mismatch {
        expected: LibraryVersion,
        found: LibraryVersion,
        policy: VersionPolicy,
    },
}

/// A library version such as "9.5.1".
///
/// Vendors often publish two-component versions ("12.4"), so a missing patch
/// component is read as zero.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LibraryVersion(Version);

impl LibraryVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(Version::new(major, minor, patch))
    }

    pub fn parse(version: &str) -> Result<Self, VersionError> {
        let trimmed = version.trim();
        let parts: Vec<&str> = trimmed.split('.').collect();
        let normalized = match parts.len() {
            1 => format!("{}.0.0", trimmed),
            2 => format!("{}.0", trimmed),
            _ => trimmed.to_string(),
        };
        Version::parse(&normalized)
            .map(Self)
            .map_err(|_| VersionError::InvalidFormat(version.to_string()))
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }

    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    pub fn patch(&self) -> u64 {
        self.0.patch
    }
}

impl FromStr for LibraryVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LibraryVersion::parse(s)
    }
}

impl fmt::Display for LibraryVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How strictly a detected version must match the declared one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionPolicy {
    /// major.minor.patch must all match
    Exact,
    /// major and minor must match, any patch
    SameMinor,
    /// major must match and found must not be older than expected
    Compatible,
}

impl fmt::Display for VersionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionPolicy::Exact => write!(f, "exact"),
            VersionPolicy::SameMinor => write!(f, "same major.minor"),
            VersionPolicy::Compatible => write!(f, "compatible"),
        }
    }
}

impl VersionPolicy {
    pub fn accepts(&self, expected: &LibraryVersion, found: &LibraryVersion) -> bool {
        match self {
            VersionPolicy::Exact => expected == found,
            VersionPolicy::SameMinor => {
                expected.major() == found.major() && expected.minor() == found.minor()
            }
            VersionPolicy::Compatible => expected.major() == found.major() && found >= expected,
        }
    }

    /// Check `found` against `expected`, returning a descriptive mismatch error.
    pub fn check(&self, expected: &LibraryVersion, found: &LibraryVersion) -> Result<(), VersionError> {
        if self.accepts(expected, found) {
            Ok(())
        } else {
            Err(VersionError::Mismatch {
                expected: expected.clone(),
                found: found.clone(),
                policy: *self,
            })
        }
    }
}
