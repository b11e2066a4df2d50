//! Request validation, run before any network call.

use crate::types::GenerationRequest;
use crate::{Error, ErrorContext, Result};

fn require_identifier(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation_with_context(
            format!("{} is required", field),
            ErrorContext::new()
                .with_field_path(format!("request.{}", field))
                .with_source("request_validator"),
        ));
    }
    Ok(())
}

/// Validate the identifiers a generation cannot be started without.
pub(crate) fn validate_request(request: &GenerationRequest) -> Result<()> {
    require_identifier(&request.template, "template")?;
    require_identifier(&request.style_profile, "style_profile")?;

    if request.timeout.is_zero() {
        return Err(Error::validation_with_context(
            "timeout must be greater than zero",
            ErrorContext::new()
                .with_field_path("request.timeout")
                .with_source("request_validator"),
        ));
    }

    Ok(())
}

/// Validate a generation id used in a URL path segment.
pub(crate) fn validate_generation_id(id: &str) -> Result<()> {
    require_identifier(id, "generation_id")?;
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
    {
        return Err(Error::validation_with_context(
            "generation_id contains unsupported characters",
            ErrorContext::new()
                .with_field_path("generation_id")
                .with_details(id.to_string())
                .with_source("request_validator"),
        ));
    }
    if id.contains("..") || id.chars().all(|c| c == '.') {
        return Err(Error::validation_with_context(
            "generation_id must not be a dot segment",
            ErrorContext::new()
                .with_field_path("generation_id")
                .with_details(id.to_string())
                .with_source("request_validator"),
        ));
    }
    Ok(())
}
