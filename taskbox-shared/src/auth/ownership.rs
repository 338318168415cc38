//! Per-resource ownership enforcement
//!
//! Every task, category, and tag row carries a `user_id`; a user may only
//! touch rows whose `user_id` equals their own. This module is the single
//! place that comparison lives, so every handler applies the same rule the
//! same way. Handlers fetch the resource by ID, then call
//! [`ensure_owner`] before reading or mutating it.
//!
//! A failed check is reported as [`OwnershipError::NotOwner`]; the API layer
//! maps it to 404 rather than 403 so a guessed ID does not reveal whether
//! the row exists.

use uuid::Uuid;

use super::middleware::AuthContext;

/// Error type for ownership checks
#[derive(Debug, thiserror::Error)]
pub enum OwnershipError {
    /// Resource belongs to a different user
    #[error("Resource is not owned by the acting user")]
    NotOwner,
}

/// Implemented by every user-scoped resource
pub trait Owned {
    /// ID of the user the resource belongs to
    fn owner_id(&self) -> Uuid;
}

/// Checks that `resource` belongs to the acting user.
///
/// With `admin_override` enabled, an admin identity passes the check for
/// any resource; the default deployment leaves it off, scoping admins like
/// everyone else.
pub fn ensure_owner(
    auth: &AuthContext,
    resource: &impl Owned,
    admin_override: bool,
) -> Result<(), OwnershipError> {
    if auth.user_id == resource.owner_id() {
        return Ok(());
    }

    if admin_override && auth.is_admin() {
        return Ok(());
    }

    Err(OwnershipError::NotOwner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;

    struct Resource {
        user_id: Uuid,
    }

    impl Owned for Resource {
        fn owner_id(&self) -> Uuid {
            self.user_id
        }
    }

    #[test]
    fn test_owner_passes() {
        let user_id = Uuid::new_v4();
        let auth = AuthContext::new(user_id, UserRole::User);
        let resource = Resource { user_id };

        assert!(ensure_owner(&auth, &resource, false).is_ok());
    }

    #[test]
    fn test_non_owner_rejected() {
        let auth = AuthContext::new(Uuid::new_v4(), UserRole::User);
        let resource = Resource { user_id: Uuid::new_v4() };

        assert!(ensure_owner(&auth, &resource, false).is_err());
    }

    #[test]
    fn test_admin_scoped_by_default() {
        let auth = AuthContext::new(Uuid::new_v4(), UserRole::Admin);
        let resource = Resource { user_id: Uuid::new_v4() };

        // Without the override flag admins own nothing extra
        assert!(ensure_owner(&auth, &resource, false).is_err());
    }

    #[test]
    fn test_admin_override_when_enabled() {
        let auth = AuthContext::new(Uuid::new_v4(), UserRole::Admin);
        let resource = Resource { user_id: Uuid::new_v4() };

        assert!(ensure_owner(&auth, &resource, true).is_ok());
    }

    #[test]
    fn test_override_does_not_help_regular_users() {
        let auth = AuthContext::new(Uuid::new_v4(), UserRole::User);
        let resource = Resource { user_id: Uuid::new_v4() };

        assert!(ensure_owner(&auth, &resource, true).is_err());
    }
}
