//! Role-based access decisions as a pure function, so the policy is
//! unit-testable without a database or a request in flight.

use crate::error::ApiError;
use crate::middleware::AuthUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Themes, shows, domes, sessions: world-readable, staff-writable.
    Catalog,
    /// Reservations: any authenticated caller, scoped to their own rows.
    Reservation,
}

pub fn authorize(
    actor: Option<&AuthUser>,
    action: Action,
    resource: Resource,
) -> Result<(), ApiError> {
    match (resource, action) {
        (Resource::Catalog, Action::Read) => Ok(()),
        (Resource::Catalog, Action::Write) => match actor {
            None => Err(ApiError::Unauthenticated),
            Some(user) if user.is_staff => Ok(()),
            Some(_) => Err(ApiError::Forbidden),
        },
        (Resource::Reservation, _) => match actor {
            None => Err(ApiError::Unauthenticated),
            Some(_) => Ok(()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff() -> AuthUser {
        AuthUser { user_id: 1, is_staff: true }
    }

    fn visitor() -> AuthUser {
        AuthUser { user_id: 2, is_staff: false }
    }

    #[test]
    fn anyone_can_read_the_catalog() {
        assert!(authorize(None, Action::Read, Resource::Catalog).is_ok());
        assert!(authorize(Some(&visitor()), Action::Read, Resource::Catalog).is_ok());
        assert!(authorize(Some(&staff()), Action::Read, Resource::Catalog).is_ok());
    }

    #[test]
    fn only_staff_can_write_the_catalog() {
        assert!(matches!(
            authorize(None, Action::Write, Resource::Catalog),
            Err(ApiError::Unauthenticated)
        ));
        assert!(matches!(
            authorize(Some(&visitor()), Action::Write, Resource::Catalog),
            Err(ApiError::Forbidden)
        ));
        assert!(authorize(Some(&staff()), Action::Write, Resource::Catalog).is_ok());
    }

    #[test]
    fn reservations_require_authentication() {
        assert!(matches!(
            authorize(None, Action::Read, Resource::Reservation),
            Err(ApiError::Unauthenticated)
        ));
        assert!(matches!(
            authorize(None, Action::Write, Resource::Reservation),
            Err(ApiError::Unauthenticated)
        ));
        assert!(authorize(Some(&visitor()), Action::Read, Resource::Reservation).is_ok());
        assert!(authorize(Some(&visitor()), Action::Write, Resource::Reservation).is_ok());
    }
}
