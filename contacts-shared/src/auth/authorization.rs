/// Role-based access checks
///
/// Users carry a single [`Role`]. Routes that are not open to every
/// authenticated user declare the roles they accept and call
/// [`require_role`] before doing any work.
///
/// Contact ownership is not checked here: every contact query is filtered
/// by `user_id`, so a foreign contact is simply never found.
///
/// # Example
///
/// ```
/// use contacts_shared::auth::authorization::{require_role, AuthzError};
/// use contacts_shared::models::user::Role;
///
/// assert!(require_role(Role::Admin, &[Role::Admin]).is_ok());
/// assert!(matches!(
///     require_role(Role::User, &[Role::Admin]),
///     Err(AuthzError::InsufficientRole { .. })
/// ));
/// ```

use crate::models::user::Role;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// User doesn't have one of the accepted roles
    #[error("Insufficient permissions: requires one of {allowed:?}, has {actual:?}")]
    InsufficientRole { allowed: Vec<Role>, actual: Role },
}

/// Roles allowed to change their own avatar
pub const AVATAR_UPDATE_ROLES: &[Role] = &[Role::Admin];

/// Roles allowed to change other users' roles
pub const ROLE_MANAGEMENT_ROLES: &[Role] = &[Role::Admin];

/// Checks that `actual` is one of `allowed`
pub fn require_role(actual: Role, allowed: &[Role]) -> Result<(), AuthzError> {
    if allowed.contains(&actual) {
        Ok(())
    } else {
        tracing::debug!(?actual, ?allowed, "Role check failed");
        Err(AuthzError::InsufficientRole {
            allowed: allowed.to_vec(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_may_update_avatar() {
        assert!(require_role(Role::Admin, AVATAR_UPDATE_ROLES).is_ok());
    }

    #[test]
    fn test_user_may_not_update_avatar() {
        let err = require_role(Role::User, AVATAR_UPDATE_ROLES).unwrap_err();
        match err {
            AuthzError::InsufficientRole { allowed, actual } => {
                assert_eq!(allowed, vec![Role::Admin]);
                assert_eq!(actual, Role::User);
            }
        }
    }

    #[test]
    fn test_multiple_roles_allowed() {
        assert!(require_role(Role::User, &[Role::Admin, Role::User]).is_ok());
        assert!(require_role(Role::User, &[]).is_err());
    }
}
