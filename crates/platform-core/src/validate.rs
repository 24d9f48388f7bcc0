//! Boundary validation — name matching and other checks that must never
//! leak into SQL (§4.1: "no ad-hoc SQL at callers", §3: name invariants).

use std::sync::LazyLock;

use regex::Regex;

use crate::error::LifecycleError;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9_-]+$").expect("static regex is valid")
});

/// Maximum length allowed for a username or model name.
pub const MAX_NAME_LEN: usize = 128;

/// Validate a username or model name against `^[A-Za-z0-9_-]+$`, with a
/// minimum length of 1 and a maximum of [`MAX_NAME_LEN`] (§8 boundary
/// behaviors).
///
/// # Errors
///
/// Returns [`LifecycleError::Validation`] if `value` is empty, too long, or
/// contains a character outside the allowed set.
pub fn validate_name(field: &'static str, value: &str) -> Result<(), LifecycleError> {
    if value.is_empty() {
        return Err(LifecycleError::Validation {
            field,
            reason: "must not be empty".to_owned(),
        });
    }
    if value.len() > MAX_NAME_LEN {
        return Err(LifecycleError::Validation {
            field,
            reason: format!("must be at most {MAX_NAME_LEN} characters"),
        });
    }
    if !NAME_RE.is_match(value) {
        return Err(LifecycleError::Validation {
            field,
            reason: "must match ^[A-Za-z0-9_-]+$".to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_character_name_is_valid() {
        assert!(validate_name("model_name", "a").is_ok());
    }

    #[test]
    fn name_at_max_length_is_valid() {
        let name = "a".repeat(MAX_NAME_LEN);
        assert!(validate_name("model_name", &name).is_ok());
    }

    #[test]
    fn name_over_max_length_is_rejected() {
        let name = "a".repeat(MAX_NAME_LEN + 1);
        assert!(validate_name("model_name", &name).is_err());
    }

    #[test]
    fn disallowed_character_is_rejected() {
        assert!(validate_name("model_name", "has space").is_err());
        assert!(validate_name("model_name", "has/slash").is_err());
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(validate_name("model_name", "").is_err());
    }
}
