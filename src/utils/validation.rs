use crate::core::source::extract_identifier;
use crate::utils::error::{CampaignError, Result};
use std::fmt::Display;
use std::path::Path;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl Display, reason: impl Into<String>) -> CampaignError {
    CampaignError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Base URL of a remote API. Only http(s) with a host is accepted.
pub fn validate_api_base(field: &str, base: &str) -> Result<()> {
    let url = Url::parse(base).map_err(|e| invalid(field, base, format!("not a URL: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(field, base, format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid(field, base, "missing host"));
    }
    Ok(())
}

/// Spreadsheet link as pasted by the operator. Returns the identifier.
pub fn validate_sheet_url(url: &str) -> Result<&str> {
    extract_identifier(url).ok_or_else(|| CampaignError::InvalidUrl {
        url: url.to_string(),
    })
}

/// Directory holding `<id>.csv` exports.
pub fn validate_csv_dir(dir: &str) -> Result<()> {
    if dir.trim().is_empty() {
        return Err(invalid("csv_dir", dir, "path is empty"));
    }
    let path = Path::new(dir);
    if !path.exists() {
        return Err(invalid("csv_dir", dir, "directory does not exist"));
    }
    if !path.is_dir() {
        return Err(invalid("csv_dir", dir, "not a directory"));
    }
    Ok(())
}

/// HTTP timeout in whole seconds.
pub fn validate_timeout(field: &str, seconds: u64) -> Result<()> {
    if seconds == 0 {
        return Err(invalid(field, seconds, "timeout must be at least 1 second"));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + Display + Copy>(
    field: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(field, value, format!("expected {}..={}", min, max)));
    }
    Ok(())
}

/// Column names and A1 ranges: anything but blank.
pub fn validate_not_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field, value, "must not be blank"));
    }
    Ok(())
}
