use crate::utils::error::{BlastError, Result};
use std::fmt::Display;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl Display, reason: impl Into<String>) -> BlastError {
    BlastError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// 閘道端點只接受 http / https
pub fn validate_url(field: &str, url: &str) -> Result<()> {
    if url.is_empty() {
        return Err(invalid(field, url, "URL cannot be empty"));
    }
    let parsed = Url::parse(url).map_err(|e| invalid(field, url, format!("Invalid URL format: {}", e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(invalid(field, url, format!("Unsupported URL scheme: {}", scheme))),
    }
}

pub fn validate_path(field: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        Err(invalid(field, path, "Path cannot be empty"))
    } else if path.contains('\0') {
        Err(invalid(field, path, "Path contains null bytes"))
    } else {
        Ok(())
    }
}

pub fn validate_positive_number(field: &str, value: usize, min: usize) -> Result<()> {
    if value < min {
        return Err(invalid(field, value, format!("Value must be at least {}", min)));
    }
    Ok(())
}

pub fn validate_file_extension(field: &str, file: &str, allowed: &[&str]) -> Result<()> {
    let extension = std::path::Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| invalid(field, file, "File has no extension or invalid filename"))?;
    if allowed.contains(&extension) {
        Ok(())
    } else {
        Err(invalid(
            field,
            file,
            format!("Unsupported file extension: {}. Allowed extensions: {}", extension, allowed.join(", ")),
        ))
    }
}

pub fn validate_non_empty_string(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field, value, "Value cannot be empty or whitespace-only"));
    }
    Ok(())
}

/// SNS 用量報表的 bucket 名稱規則
pub fn validate_s3_bucket_name(field: &str, bucket: &str) -> Result<()> {
    if !(3..=63).contains(&bucket.len()) {
        return Err(invalid(field, bucket, "S3 bucket name must be between 3 and 63 characters"));
    }
    let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.';
    if !bucket.chars().all(allowed) {
        return Err(invalid(
            field,
            bucket,
            "S3 bucket name can only contain lowercase letters, numbers, hyphens, and dots",
        ));
    }
    if bucket.starts_with('-') || bucket.ends_with('-') {
        return Err(invalid(field, bucket, "S3 bucket name cannot start or end with a hyphen"));
    }
    Ok(())
}

pub fn validate_aws_region(field: &str, region: &str) -> Result<()> {
    validate_non_empty_string(field, region)?;
    if region.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        Ok(())
    } else {
        Err(invalid(
            field,
            region,
            "AWS region can only contain lowercase letters, numbers, and hyphens",
        ))
    }
}

pub fn validate_range<T: PartialOrd + Display + Copy>(field: &str, value: T, min: T, max: T) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(field, value, format!("Value must be between {} and {}", min, max)));
    }
    Ok(())
}
