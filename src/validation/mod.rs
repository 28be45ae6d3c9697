//! Validation functionality
//!
//! Provides validation for configuration values that are embedded into
//! warehouse statements (role ARN, source locations, region).

pub mod input;

pub use input::{
    ValidationError, ValidationResult, validate_iam_role_arn, validate_object_store_uri,
    validate_region,
};
