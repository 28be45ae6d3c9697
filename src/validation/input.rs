//! Input validation for configuration values.
//!
//! Values such as the delegated role ARN, source locations and region end up
//! inside `COPY` statements as string literals. They are checked against the
//! shapes the warehouse accepts before any connection is attempted, and then
//! quoted again at render time.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length for a role ARN
pub const MAX_ARN_LENGTH: usize = 2048;

/// Maximum length for a source location
pub const MAX_LOCATION_LENGTH: usize = 1024;

static RE_IAM_ROLE_ARN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^arn:aws[a-z-]*:iam::\d{12}:role/[\w+=,.@/-]+$").expect("Invalid regex")
});
static RE_OBJECT_STORE_URI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^s3://[a-z0-9][a-z0-9.-]{1,61}[a-z0-9](/\S*)?$").expect("Invalid regex"));
static RE_REGION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{2}(-gov)?-[a-z]+-\d$").expect("Invalid regex"));

/// Errors that can occur during input validation.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum ValidationError {
    /// Input is empty when a value is required
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    /// Input exceeds maximum allowed length
    #[error("{field} exceeds maximum length (max: {max}, got: {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    /// Input contains invalid characters
    #[error("{field} contains invalid characters: {reason}")]
    InvalidCharacters { field: &'static str, reason: String },

    /// Input has invalid format
    #[error("{0}: {1}")]
    InvalidFormat(&'static str, String),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn check_common(field: &'static str, value: &str, max: usize) -> ValidationResult<()> {
    if value.is_empty() {
        return Err(ValidationError::Empty(field));
    }

    if value.len() > max {
        return Err(ValidationError::TooLong {
            field,
            max,
            actual: value.len(),
        });
    }

    if let Some(c) = value.chars().find(|c| c.is_control() || *c == '\'') {
        return Err(ValidationError::InvalidCharacters {
            field,
            reason: format!("invalid character: {:?}", c),
        });
    }

    Ok(())
}

/// Validate a delegated access role ARN.
///
/// # Examples
///
/// ```
/// use songplay_warehouse::validation::input::validate_iam_role_arn;
///
/// assert!(validate_iam_role_arn("arn:aws:iam::123456789012:role/dwhRole").is_ok());
/// assert!(validate_iam_role_arn("dwhRole").is_err());
/// ```
pub fn validate_iam_role_arn(arn: &str) -> ValidationResult<()> {
    check_common("iam_role.arn", arn, MAX_ARN_LENGTH)?;

    if !RE_IAM_ROLE_ARN.is_match(arn) {
        return Err(ValidationError::InvalidFormat(
            "iam_role.arn",
            format!("'{}' is not an IAM role ARN", arn),
        ));
    }

    Ok(())
}

/// Validate an object storage location (`s3://bucket/prefix`).
pub fn validate_object_store_uri(field: &'static str, uri: &str) -> ValidationResult<()> {
    check_common(field, uri, MAX_LOCATION_LENGTH)?;

    if !RE_OBJECT_STORE_URI.is_match(uri) {
        return Err(ValidationError::InvalidFormat(
            field,
            format!("'{}' is not an s3:// location", uri),
        ));
    }

    Ok(())
}

/// Validate a storage region name such as `us-west-2`.
pub fn validate_region(region: &str) -> ValidationResult<()> {
    check_common("s3.region", region, 32)?;

    if !RE_REGION.is_match(region) {
        return Err(ValidationError::InvalidFormat(
            "s3.region",
            format!("'{}' is not a region name", region),
        ));
    }

    Ok(())
}
