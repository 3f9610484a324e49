use crate::error::{AppError, AppResult};
use regex::Regex;
use std::sync::LazyLock;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("valid email regex")
});

static PHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?\d{6,15}$").expect("valid phone regex")
});

/// Slugs are lowercase words joined by `-` or `_`; dots separate permission segments.
static SLUG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(?:[._\-]{1,2}[a-z0-9]+)*$").expect("valid slug regex")
});

pub fn is_email(value: &str) -> bool {
    EMAIL_REGEX.is_match(value)
}

pub fn validate_email(email: &str) -> AppResult<()> {
    if !is_email(email) {
        return Err(AppError::ValidationError("Invalid email".to_string()));
    }

    Ok(())
}

pub fn validate_phone(phone: &str) -> AppResult<()> {
    if !PHONE_REGEX.is_match(phone) {
        return Err(AppError::ValidationError("Invalid phone number".to_string()));
    }

    Ok(())
}

pub fn validate_slug(slug: &str) -> AppResult<()> {
    if !SLUG_REGEX.is_match(slug) {
        return Err(AppError::ValidationError(format!("Invalid slug: {slug}")));
    }

    Ok(())
}

/// Drop surrounding whitespace and turn blank strings into `None`.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("admin@leaa.com").is_ok());
        assert!(validate_email("first.last+tag@mail.example.org").is_ok());
        assert!(validate_email("admin@leaa").is_err());
        assert!(validate_email("admin.leaa.com").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+8613800000000").is_ok());
        assert!(validate_phone("13800000000").is_ok());
        assert!(validate_phone("138-0000").is_err());
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("coupon.list-read--all-status").is_ok());
        assert!(validate_slug("home-banner").is_ok());
        assert!(validate_slug("Home Banner").is_err());
        assert!(validate_slug("-leading").is_err());
    }

    #[test]
    fn test_normalize_optional() {
        assert_eq!(normalize_optional(Some("  q ".to_string())), Some("q".to_string()));
        assert_eq!(normalize_optional(Some("   ".to_string())), None);
        assert_eq!(normalize_optional(None), None);
    }
}
