//! Resolution of the API version a response is rendered at.

use thiserror::Error;

use crate::domain::version::{ApiVersion, VersionParseError};

const VERSION_PARAM: &str = "version";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("unsupported api version")]
    Unsupported(#[from] VersionParseError),
}

pub trait VersionResolver: Send + Sync {
    /// Resolve the version for a request given its raw `Accept` header.
    fn resolve(&self, accept: Option<&str>) -> Result<ApiVersion, VersionError>;
}

/// Reads `version=<x.y>` from the `Accept` media type parameters, falling back
/// to a configured default.
#[derive(Debug, Clone, Copy)]
pub struct AcceptHeaderVersionResolver {
    default: ApiVersion,
}

impl AcceptHeaderVersionResolver {
    pub fn new(default: ApiVersion) -> Self {
        Self { default }
    }

    pub fn default_version(&self) -> ApiVersion {
        self.default
    }
}

impl VersionResolver for AcceptHeaderVersionResolver {
    fn resolve(&self, accept: Option<&str>) -> Result<ApiVersion, VersionError> {
        let Some(accept) = accept else {
            return Ok(self.default);
        };

        let requested = accept
            .split(',')
            .flat_map(|media_type| media_type.split(';').skip(1))
            .filter_map(|param| param.split_once('='))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case(VERSION_PARAM))
            .map(|(_, value)| value.trim().trim_matches('"'));

        match requested {
            Some(value) => Ok(value.parse()?),
            None => Ok(self.default),
        }
    }
}
