//! Request-permission guards: the three variants handlers wrap routes with.

use crate::cache::{PermissionCache, Permissions};
use crate::error::AuthError;

/// The header used for the API-key short-circuit path (spec.md §4.3).
pub const API_KEY_HEADER: &str = "x-api-key";

/// Identity/permissions resolved for one request, returned by a guard on
/// success.
#[derive(Debug, Clone)]
pub struct AuthzToken {
    pub token: String,
    pub username: String,
    pub r#override: bool,
}

impl From<(&str, Permissions)> for AuthzToken {
    fn from((token, permissions): (&str, Permissions)) -> Self {
        Self {
            token: token.to_owned(),
            username: permissions.username,
            r#override: permissions.r#override,
        }
    }
}

/// Require the token to have at least `read` permission.
///
/// # Errors
///
/// Returns [`AuthError::Unauthorized`] if the token does not resolve, or
/// [`AuthError::Forbidden`] if it resolves without `read`.
pub async fn require_read(
    cache: &PermissionCache,
    token: &str,
) -> Result<AuthzToken, AuthError> {
    let permissions = cache.get_permissions(token).await?;
    if !permissions.read {
        return Err(AuthError::Forbidden("read permission required".to_owned()));
    }
    Ok((token, permissions).into())
}

/// Require the token to have `write` permission.
///
/// # Errors
///
/// Returns [`AuthError::Forbidden`] if the token lacks `write`.
pub async fn require_write(
    cache: &PermissionCache,
    token: &str,
) -> Result<AuthzToken, AuthError> {
    let permissions = cache.get_permissions(token).await?;
    if !permissions.write {
        return Err(AuthError::Forbidden("write permission required".to_owned()));
    }
    Ok((token, permissions).into())
}

/// Require the token to have `override` permission (global-admin-equivalent
/// operations: access-level changes on another user's model, etc).
///
/// # Errors
///
/// Returns [`AuthError::Forbidden`] if the token lacks `override`.
pub async fn require_override(
    cache: &PermissionCache,
    token: &str,
) -> Result<AuthzToken, AuthError> {
    let permissions = cache.get_permissions(token).await?;
    if !permissions.r#override {
        return Err(AuthError::Forbidden(
            "override permission required".to_owned(),
        ));
    }
    Ok((token, permissions).into())
}

/// Resolve the bearer credential for a request: an `X-API-Key` header
/// short-circuits the JWT path when present, otherwise the `Authorization:
/// Bearer <jwt>` header is used. Both resolve through the same
/// [`PermissionCache`] and return the same tuple shape (spec.md §4.3).
#[must_use]
pub fn resolve_credential<'a>(
    api_key_header: Option<&'a str>,
    bearer_header: Option<&'a str>,
) -> Option<&'a str> {
    if let Some(key) = api_key_header {
        return Some(key);
    }
    bearer_header.and_then(|h| h.strip_prefix("Bearer "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_short_circuits_bearer() {
        let resolved = resolve_credential(Some("api-key-value"), Some("Bearer jwt-value"));
        assert_eq!(resolved, Some("api-key-value"));
    }

    #[test]
    fn bearer_used_when_no_api_key() {
        let resolved = resolve_credential(None, Some("Bearer jwt-value"));
        assert_eq!(resolved, Some("jwt-value"));
    }

    #[test]
    fn missing_both_resolves_to_none() {
        assert_eq!(resolve_credential(None, None), None);
    }
}
