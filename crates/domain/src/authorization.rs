//! Ownership and role checks for owner-scoped resources.

use common::UserId;

use crate::error::DomainError;
use crate::identity::Principal;

/// Returns true if the principal owns the resource or is an admin.
pub fn is_owner_or_admin(principal: &Principal, owner_id: UserId) -> bool {
    principal.is_admin() || principal.owns(owner_id)
}

/// Fails with `Forbidden` unless the principal owns the resource or is an admin.
///
/// Callers run this against the freshly loaded resource, before any write.
pub fn ensure_owner_or_admin(
    principal: &Principal,
    owner_id: UserId,
    resource: impl std::fmt::Display,
) -> Result<(), DomainError> {
    if is_owner_or_admin(principal, owner_id) {
        return Ok(());
    }

    tracing::debug!(user_id = %principal.id, %owner_id, %resource, "access denied");
    Err(DomainError::Forbidden {
        user_id: principal.id,
        resource: resource.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn owner_is_allowed() {
        let owner = UserId::new();
        assert!(ensure_owner_or_admin(&Principal::user(owner), owner, "order").is_ok());
    }

    #[test]
    fn admin_is_allowed_on_foreign_resources() {
        let owner = UserId::new();
        assert!(ensure_owner_or_admin(&Principal::admin(UserId::new()), owner, "order").is_ok());
    }

    #[test]
    fn stranger_is_forbidden() {
        let owner = UserId::new();
        let stranger = Principal::user(UserId::new());

        let err = ensure_owner_or_admin(&stranger, owner, "order 42").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert!(err.to_string().contains("order 42"));
    }
}
