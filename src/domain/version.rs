//! API version identifiers used to gate serialized fields.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

/// A `major.minor[.patch]` API version. Ordering is numeric, component by component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    major: u32,
    minor: u32,
    patch: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid api version `{input}`")]
pub struct VersionParseError {
    pub input: String,
}

impl ApiVersion {
    pub const V1_0: ApiVersion = ApiVersion::new(1, 0, 0);
    pub const V2_0: ApiVersion = ApiVersion::new(2, 0, 0);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl FromStr for ApiVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionParseError {
            input: s.to_string(),
        };

        let trimmed = s.trim().trim_start_matches(['v', 'V']);
        let mut parts = trimmed.split('.');
        let mut next = |required: bool| -> Result<u32, VersionParseError> {
            match parts.next() {
                Some(part) if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) => {
                    part.parse().map_err(|_| invalid())
                }
                None if !required => Ok(0),
                _ => Err(invalid()),
            }
        };

        let major = next(true)?;
        let minor = next(false)?;
        let patch = next(false)?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self::new(major, minor, patch))
    }
}

impl Display for ApiVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.patch == 0 {
            write!(f, "{}.{}", self.major, self.minor)
        } else {
            write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_full_forms() {
        assert_eq!("2".parse::<ApiVersion>(), Ok(ApiVersion::V2_0));
        assert_eq!("2.0".parse::<ApiVersion>(), Ok(ApiVersion::V2_0));
        assert_eq!("v1.0.0".parse::<ApiVersion>(), Ok(ApiVersion::V1_0));
        assert_eq!(
            "1.4.2".parse::<ApiVersion>(),
            Ok(ApiVersion::new(1, 4, 2))
        );
    }

    #[test]
    fn rejects_garbage() {
        for input in ["", "latest", "1..0", "1.0.0.0", "-1", "1.x"] {
            assert!(input.parse::<ApiVersion>().is_err(), "{input} should fail");
        }
    }

    #[test]
    fn orders_numerically() {
        let v1_10: ApiVersion = "1.10".parse().unwrap();
        let v1_9: ApiVersion = "1.9".parse().unwrap();
        assert!(v1_10 > v1_9);
        assert!(ApiVersion::V2_0 > v1_10);
    }

    #[test]
    fn displays_without_trailing_zero_patch() {
        assert_eq!(ApiVersion::V2_0.to_string(), "2.0");
        assert_eq!(ApiVersion::new(1, 2, 3).to_string(), "1.2.3");
    }
}
