//! Permission predicates. Handlers combine them with `||` and pass the result
//! to [`require`] before any mutation.

use myth_db::models::ResearchScope;
use myth_types::models::{User, UserSummary};

use crate::error::{ApiError, ApiResult};

pub fn is_staff(user: &User) -> bool {
    user.is_staff
}

pub fn is_researcher(user: &User) -> bool {
    user.is_researcher
}

/// Owner check against an optional owner reference; an orphaned record has
/// no owner.
pub fn is_owner(user: &User, owner: Option<&UserSummary>) -> bool {
    owner.is_some_and(|o| o.id == user.id)
}

pub fn require(allowed: bool) -> ApiResult<()> {
    if allowed { Ok(()) } else { Err(ApiError::forbidden()) }
}

/// Which research requests `user` may see.
pub fn research_scope(user: &User) -> ResearchScope {
    if is_staff(user) {
        ResearchScope::All
    } else if is_researcher(user) {
        ResearchScope::AssignedOrRequested(user.id)
    } else {
        ResearchScope::RequestedBy(user.id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn user(id: i64, is_researcher: bool, is_staff: bool) -> User {
        User {
            id,
            email: format!("u{id}@example.com"),
            first_name: "U".into(),
            last_name: "Ser".into(),
            is_farmer: false,
            is_researcher,
            is_staff,
            phone_number: String::new(),
            bio: String::new(),
            location: String::new(),
            preferred_language: "en".into(),
            created_at: Utc::now(),
        }
    }

    fn summary(id: i64) -> UserSummary {
        UserSummary {
            id,
            email: format!("u{id}@example.com"),
            first_name: "U".into(),
            last_name: "Ser".into(),
        }
    }

    #[test]
    fn ownership() {
        let u = user(1, false, false);
        assert!(is_owner(&u, Some(&summary(1))));
        assert!(!is_owner(&u, Some(&summary(2))));
        assert!(!is_owner(&u, None));
        assert!(require(is_owner(&u, None) || is_staff(&user(3, false, true))).is_ok());
        assert!(require(false).is_err());
    }

    #[test]
    fn scopes_by_role() {
        assert!(matches!(research_scope(&user(1, true, true)), ResearchScope::All));
        assert!(matches!(
            research_scope(&user(2, true, false)),
            ResearchScope::AssignedOrRequested(2)
        ));
        assert!(matches!(research_scope(&user(3, false, false)), ResearchScope::RequestedBy(3)));
    }
}
