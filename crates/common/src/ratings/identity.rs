//! Identity resolution
//!
//! Maps a request's `SessionIdentity` to a `Person` row. Identity is an
//! explicit argument, so resolution is a plain async function over the
//! store seam with no ambient state and no side effects.

use crate::auth::SessionIdentity;
use crate::db::models::Person;
use crate::errors::{AppError, Result};

use super::CatalogStore;

/// Canonical form of an email for storage and matching.
///
/// Always trims surrounding whitespace; lowercases when `normalize` is on
/// (the default configuration). With normalization off, matching is exact
/// and case-sensitive.
pub fn canonical_email(raw: &str, normalize: bool) -> String {
    let trimmed = raw.trim();
    if normalize {
        trimmed.to_ascii_lowercase()
    } else {
        trimmed.to_string()
    }
}

/// Resolve the person behind a session identity.
///
/// A missing email claim and an email unknown to the system are the same
/// failure: there is no usable identity, so both are `Unauthenticated`.
pub async fn resolve_person<S: CatalogStore>(
    store: &S,
    identity: &SessionIdentity,
    normalize_emails: bool,
) -> Result<Person> {
    let email = identity
        .email
        .as_deref()
        .ok_or_else(|| AppError::unauthenticated("no email claim in session"))?;

    let email = canonical_email(email, normalize_emails);

    store
        .person_by_email(&email)
        .await?
        .ok_or_else(|| AppError::unauthenticated("session identity is unknown"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_email_normalized() {
        assert_eq!(canonical_email("  Fan@Example.COM ", true), "fan@example.com");
    }

    #[test]
    fn test_canonical_email_exact() {
        assert_eq!(canonical_email("  Fan@Example.COM ", false), "Fan@Example.COM");
    }
}
