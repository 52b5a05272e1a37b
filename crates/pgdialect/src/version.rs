//! Server version parsing and the feature switches keyed on it.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"PostgreSQL (\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("valid version regex")
});

/// A server version encoded as `major*10000 + minor*100 + patch`.
///
/// `9.3.4` is `90304`; `16.2` is `160200`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ServerVersion(u32);

impl ServerVersion {
    pub const fn from_number(number: u32) -> Self {
        Self(number)
    }

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self(major * 10000 + minor * 100 + patch)
    }

    /// Like [`ServerVersion::new`], but `None` when the number doesn't fit.
    pub fn checked(major: u32, minor: u32, patch: u32) -> Option<Self> {
        major
            .checked_mul(10000)?
            .checked_add(minor.checked_mul(100)?)?
            .checked_add(patch)
            .map(Self)
    }

    /// Parse the output of `SELECT version()`.
    ///
    /// Text without a recognizable version yields `0`, which gates every
    /// feature off.
    pub fn parse(version_string: &str) -> Self {
        let Some(caps) = VERSION_RE.captures(version_string) else {
            return Self(0);
        };
        let part = |i: usize| {
            caps.get(i)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .unwrap_or(0)
        };
        Self::checked(part(1), part(2).min(99), part(3).min(99)).unwrap_or_default()
    }

    pub fn number(&self) -> u32 {
        self.0
    }

    pub fn major(&self) -> u32 {
        self.0 / 10000
    }

    pub fn minor(&self) -> u32 {
        self.0 / 100 % 100
    }

    pub fn patch(&self) -> u32 {
        self.0 % 100
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.patch())
    }
}

/// Feature predicates for a given server version.
///
/// Every threshold is monotonic: once a version supports something, every
/// later version does too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionGate {
    version: ServerVersion,
}

impl VersionGate {
    const RETURNING: ServerVersion = ServerVersion::new(8, 2, 0);
    const IDENTIFIER_LENGTH_QUERY: ServerVersion = ServerVersion::new(8, 0, 0);
    const ALTER_COLUMN_TYPE: ServerVersion = ServerVersion::new(8, 0, 0);

    pub fn new(version: ServerVersion) -> Self {
        Self { version }
    }

    pub fn version(&self) -> ServerVersion {
        self.version
    }

    /// `INSERT ... RETURNING`
    pub fn supports_returning(&self) -> bool {
        self.version >= Self::RETURNING
    }

    /// `SHOW max_identifier_length`
    pub fn supports_identifier_length_query(&self) -> bool {
        self.version >= Self::IDENTIFIER_LENGTH_QUERY
    }

    /// `ALTER TABLE ... ALTER COLUMN ... TYPE`
    pub fn supports_alter_column_type(&self) -> bool {
        self.version >= Self::ALTER_COLUMN_TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_three_part() {
        let v = ServerVersion::parse(
            "PostgreSQL 9.3.4 on x86_64-unknown-linux-gnu, compiled by gcc 4.8.2, 64-bit",
        );
        assert_eq!(v.number(), 90304);
        assert_eq!((v.major(), v.minor(), v.patch()), (9, 3, 4));
        assert_eq!(v.to_string(), "9.3.4");
    }

    #[test]
    fn test_parse_two_part() {
        assert_eq!(ServerVersion::parse("PostgreSQL 16.2 (Debian 16.2-1)").number(), 160200);
        assert_eq!(ServerVersion::parse("PostgreSQL 17beta1").number(), 170000);
    }

    #[test]
    fn test_parse_garbage() {
        assert_eq!(ServerVersion::parse("CockroachDB CCL v23.1").number(), 0);
        assert_eq!(ServerVersion::parse("").number(), 0);
    }

    #[test]
    fn test_parse_out_of_range_major() {
        assert_eq!(ServerVersion::parse("PostgreSQL 500000.1.2").number(), 0);
        assert_eq!(ServerVersion::parse("PostgreSQL 99999999999.1").number(), 0);
        assert_eq!(ServerVersion::checked(429496, 72, 95).map(|v| v.number()), Some(4294967295));
        assert_eq!(ServerVersion::checked(429496, 72, 96), None);
    }

    #[test]
    fn test_gate_thresholds() {
        let old = VersionGate::new(ServerVersion::from_number(70400));
        assert!(!old.supports_returning());
        assert!(!old.supports_identifier_length_query());
        assert!(!old.supports_alter_column_type());

        let eight = VersionGate::new(ServerVersion::from_number(80000));
        assert!(!eight.supports_returning());
        assert!(eight.supports_identifier_length_query());
        assert!(eight.supports_alter_column_type());

        let returning = VersionGate::new(ServerVersion::from_number(80200));
        assert!(returning.supports_returning());

        let modern = VersionGate::new(ServerVersion::parse("PostgreSQL 16.2"));
        assert!(modern.supports_returning());
        assert!(modern.supports_alter_column_type());
    }
}
