//! Display names and the rules a candidate must satisfy before it is even
//! checked for uniqueness.

use std::borrow::Borrow;
use std::fmt;

use thiserror::Error;

/// Default upper bound on a display name, in characters.
pub const MAX_USERNAME_LENGTH: usize = 20;

/// Why a candidate name was refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UsernameError {
    #[error("username must not be empty")]
    Empty,
    #[error("username is {len} characters long; the maximum is {max}")]
    TooLong { len: usize, max: usize },
}

/// A display name that passed validation.
///
/// Validation is purely local (emptiness and length); uniqueness is the
/// server registry's business.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    /// Validates `raw` against [`MAX_USERNAME_LENGTH`].
    ///
    /// # Errors
    ///
    /// See [`Username::parse_with_limit`].
    pub fn parse(raw: &str) -> Result<Self, UsernameError> {
        Self::parse_with_limit(raw, MAX_USERNAME_LENGTH)
    }

    /// Validates `raw` against a caller-supplied maximum length.
    ///
    /// Length is counted in characters, not bytes, so `"zoë"` is three long.
    ///
    /// # Errors
    ///
    /// Returns [`UsernameError::Empty`] for `""` and
    /// [`UsernameError::TooLong`] when `raw` has more than `max` characters.
    pub fn parse_with_limit(raw: &str, max: usize) -> Result<Self, UsernameError> {
        if raw.is_empty() {
            return Err(UsernameError::Empty);
        }
        let len = raw.chars().count();
        if len > max {
            return Err(UsernameError::TooLong { len, max });
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Lets maps keyed by `Username` be queried with a plain `&str`.
impl Borrow<str> for Username {
    fn borrow(&self) -> &str {
        &self.0
    }
}
