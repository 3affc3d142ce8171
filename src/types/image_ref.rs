// ABOUTME: Container image reference validation.
// ABOUTME: The reference stays opaque and is passed verbatim to the pull tool.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseImageRefError {
    #[error("image reference cannot be empty")]
    Empty,

    #[error("invalid character in image reference: {0:?}")]
    InvalidChar(char),

    #[error("image reference cannot start with '-': {0}")]
    LooksLikeFlag(String),
}

/// A remote image reference such as `docker.io/library/alpine:3.20`.
///
/// No structure is imposed: registry, repository, tag and digest are left for
/// the selected pull tool to interpret. Validation only rejects values that
/// could never be a reference or could be mistaken for a command-line flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn parse(input: &str) -> Result<Self, ParseImageRefError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseImageRefError::Empty);
        }

        if let Some(c) = input
            .chars()
            .find(|c| c.is_whitespace() || c.is_control())
        {
            return Err(ParseImageRefError::InvalidChar(c));
        }

        if input.starts_with('-') {
            return Err(ParseImageRefError::LooksLikeFlag(input.to_string()));
        }

        Ok(Self(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for ImageRef {
    type Err = ParseImageRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
