//! Release version tags
//!
//! Every sub-library is versioned and released on its own. A release is
//! labelled `lib_name-X.Y.N`, for example `aws-1.1.0` or `data_type-1.2.3`.

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::ReleaseError;

static VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.(\d+)\.(\d+)$").expect("valid pattern"));

pub const PACKAGE_PREFIX: &str = "dataeng-utils";

/// Independently released sub-libraries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Library {
    Aws,
    S3,
    DataType,
    Gcs,
    BigQuery,
    Logging,
    Metadata,
    MsSql,
    MySql,
    Naming,
    Sftp,
    Threading,
}

impl Library {
    pub const ALL: [Library; 12] = [
        Library::Aws,
        Library::S3,
        Library::DataType,
        Library::Gcs,
        Library::BigQuery,
        Library::Logging,
        Library::Metadata,
        Library::MsSql,
        Library::MySql,
        Library::Naming,
        Library::Sftp,
        Library::Threading,
    ];

    /// Name used in version tags
    pub fn tag_name(&self) -> &'static str {
        match self {
            Library::Aws => "aws",
            Library::S3 => "s3",
            Library::DataType => "data_type",
            Library::Gcs => "gcs",
            Library::BigQuery => "bigquery",
            Library::Logging => "logging",
            Library::Metadata => "metadata",
            Library::MsSql => "mssql",
            Library::MySql => "mysql",
            Library::Naming => "naming",
            Library::Sftp => "sftp",
            Library::Threading => "threading",
        }
    }

    /// Distribution name, e.g. `dataeng-utils-data-type`
    pub fn package_name(&self) -> String {
        format!("{}-{}", PACKAGE_PREFIX, self.tag_name().replace('_', "-"))
    }

    /// Sub-libraries this one needs at runtime
    pub fn dependencies(&self) -> &'static [Library] {
        match self {
            Library::S3 => &[Library::DataType],
            Library::Sftp => &[Library::Gcs],
            _ => &[],
        }
    }

    /// Requirement range accepting any compatible release of `version`
    pub fn requirement_spec(&self, version: &Version) -> String {
        format!(
            "{} >= {}.{}.0, < {}.0dev",
            self.package_name(),
            version.major,
            version.minor,
            u128::from(version.major) + 1
        )
    }
}

impl fmt::Display for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag_name())
    }
}

impl FromStr for Library {
    type Err = ReleaseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Library::ALL
            .iter()
            .copied()
            .find(|lib| lib.tag_name() == value)
            .ok_or_else(|| ReleaseError::UnknownLibrary(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Same major version and not older than `requirement`
    pub fn is_compatible_with(&self, requirement: &Version) -> bool {
        self.major == requirement.major && self >= requirement
    }
}

impl FromStr for Version {
    type Err = ReleaseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ReleaseError::InvalidVersion(value.to_string());
        let caps = VERSION.captures(value).ok_or_else(invalid)?;
        let part = |i: usize| -> Result<u64, ReleaseError> {
            caps.get(i)
                .ok_or_else(invalid)?
                .as_str()
                .parse()
                .map_err(|_| invalid())
        };

        Ok(Version::new(part(1)?, part(2)?, part(3)?))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A `lib_name-X.Y.N` release label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionTag {
    pub library: Library,
    pub version: Version,
}

impl VersionTag {
    pub fn new(library: Library, version: Version) -> Self {
        Self { library, version }
    }
}

impl FromStr for VersionTag {
    type Err = ReleaseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        // Library names contain '_' but never '-', so the version starts after the last '-'.
        let (library, version) = value
            .trim()
            .rsplit_once('-')
            .ok_or_else(|| ReleaseError::MalformedTag(value.to_string()))?;

        Ok(VersionTag {
            library: library.parse()?,
            version: version.parse()?,
        })
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.library, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(value: &str) -> VersionTag {
        VersionTag::from_str(value).unwrap()
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            tag("aws-1.1.0"),
            VersionTag::new(Library::Aws, Version::new(1, 1, 0))
        );
        assert_eq!(
            tag("data_type-2.10.3"),
            VersionTag::new(Library::DataType, Version::new(2, 10, 3))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            VersionTag::from_str("aws"),
            Err(ReleaseError::MalformedTag(_))
        ));
        assert!(matches!(
            VersionTag::from_str("redshift-1.0.0"),
            Err(ReleaseError::UnknownLibrary(_))
        ));
        assert!(matches!(
            VersionTag::from_str("aws-1.1"),
            Err(ReleaseError::InvalidVersion(_))
        ));
        assert!(matches!(
            VersionTag::from_str("aws-1.x.0"),
            Err(ReleaseError::InvalidVersion(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!("aws-1.1.0", format!("{}", tag("aws-1.1.0")));
        assert_eq!("data_type-1.2.3", format!("{}", tag("data_type-1.2.3")));
    }

    #[test]
    fn test_every_library_round_trips_its_tag_name() {
        for library in Library::ALL {
            assert_eq!(library.tag_name().parse::<Library>().unwrap(), library);
        }
    }

    #[test]
    fn test_package_names() {
        assert_eq!(Library::DataType.package_name(), "dataeng-utils-data-type");
        assert_eq!(Library::S3.package_name(), "dataeng-utils-s3");
    }

    #[test]
    fn test_dependencies() {
        assert_eq!(Library::S3.dependencies(), &[Library::DataType]);
        assert_eq!(Library::Sftp.dependencies(), &[Library::Gcs]);
        assert!(Library::Naming.dependencies().is_empty());
    }

    #[test]
    fn test_requirement_spec() {
        assert_eq!(
            Library::DataType.requirement_spec(&Version::new(1, 1, 4)),
            "dataeng-utils-data-type >= 1.1.0, < 2.0dev"
        );
    }

    #[test]
    fn test_requirement_spec_for_largest_major() {
        assert_eq!(
            Library::S3.requirement_spec(&Version::new(u64::MAX, 0, 0)),
            "dataeng-utils-s3 >= 18446744073709551615.0.0, < 18446744073709551616.0dev"
        );
    }

    #[test]
    fn test_compatibility() {
        let requirement = Version::new(1, 1, 0);
        assert!(Version::new(1, 1, 0).is_compatible_with(&requirement));
        assert!(Version::new(1, 4, 2).is_compatible_with(&requirement));
        assert!(!Version::new(1, 0, 9).is_compatible_with(&requirement));
        assert!(!Version::new(2, 0, 0).is_compatible_with(&requirement));
    }

    #[test]
    fn test_comparison() {
        assert!(Version::new(0, 4, 2) < Version::new(0, 4, 10));
        assert!(Version::new(0, 4, 1) < Version::new(0, 5, 0));
    }
}
