/// Ownership/role guard
///
/// The single predicate deciding whether a caller may mutate a resource:
/// admins may touch anything, everyone else only what they own. Pure
/// functions, no I/O — callers are responsible for fetching the caller's
/// role and the resource's owner from *current* database state (inside the
/// same transaction as the write) before asking.

use uuid::Uuid;

use crate::models::user::UserRole;

/// Error type for guard checks
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GuardError {
    /// Caller is neither an admin nor the resource owner
    #[error("not authorized to access this resource")]
    NotOwner,

    /// Caller lacks the admin role
    #[error("admin role required")]
    AdminRequired,
}

/// Returns true iff the caller is an admin or owns the resource.
pub fn is_allowed(role: UserRole, caller_id: Uuid, owner_id: Uuid) -> bool {
    role == UserRole::Admin || caller_id == owner_id
}

/// Guard for owner-or-admin mutations (todos, own account).
pub fn require_owner_or_admin(
    role: UserRole,
    caller_id: Uuid,
    owner_id: Uuid,
) -> Result<(), GuardError> {
    if is_allowed(role, caller_id, owner_id) {
        Ok(())
    } else {
        Err(GuardError::NotOwner)
    }
}

/// Guard for admin-only operations (user listing, user updates).
pub fn require_admin(role: UserRole) -> Result<(), GuardError> {
    if role == UserRole::Admin {
        Ok(())
    } else {
        Err(GuardError::AdminRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_allowed_only_for_own_resources() {
        let caller = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert!(is_allowed(UserRole::User, caller, caller));
        assert!(!is_allowed(UserRole::User, caller, other));
    }

    #[test]
    fn test_admin_allowed_for_any_owner() {
        let caller = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert!(is_allowed(UserRole::Admin, caller, caller));
        assert!(is_allowed(UserRole::Admin, caller, other));
    }

    // Denial requires BOTH checks to fail: a non-admin owner must pass, an
    // admin non-owner must pass. An or-of-negations variant of this predicate
    // (deny when not admin OR not owner) would reject both of them — that is
    // the wrong shape, and this table exists so nobody reintroduces it.
    #[test]
    fn test_denied_only_when_neither_admin_nor_owner() {
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        // owner, not admin -> allowed
        assert!(is_allowed(UserRole::User, owner, owner));
        // admin, not owner -> allowed
        assert!(is_allowed(UserRole::Admin, stranger, owner));
        // neither -> denied
        assert!(!is_allowed(UserRole::User, stranger, owner));
    }

    #[test]
    fn test_require_owner_or_admin() {
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        assert_eq!(require_owner_or_admin(UserRole::User, owner, owner), Ok(()));
        assert_eq!(
            require_owner_or_admin(UserRole::User, stranger, owner),
            Err(GuardError::NotOwner)
        );
        assert_eq!(require_owner_or_admin(UserRole::Admin, stranger, owner), Ok(()));
    }

    #[test]
    fn test_require_admin() {
        assert_eq!(require_admin(UserRole::Admin), Ok(()));
        assert_eq!(require_admin(UserRole::User), Err(GuardError::AdminRequired));
    }
}
