//! Ownership- and role-based authorization checks.
//!
//! Every check is a pure boolean over an [`Actor`] snapshot; handlers map a
//! `false` to [`BylineError::Forbidden`](crate::BylineError::Forbidden)
//! *before* touching any state, so a denial never leaves partial effects.

use sea_orm::{ConnectionTrait, EntityTrait};

use crate::error::BylineError;
use crate::models::profile::{self, Role};
use crate::models::user;

/// The authenticated caller, as far as authorization is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i32,
    pub is_staff: bool,
    pub role: Role,
}

impl Actor {
    /// Load the actor snapshot (user + profile) for an authenticated user id.
    pub async fn load<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Actor, BylineError> {
        let (user, profile) = user::Entity::find_by_id(user_id)
            .find_also_related(profile::Entity)
            .one(db)
            .await?
            .ok_or_else(|| BylineError::Unauthorized("Unknown user".to_string()))?;

        let profile = profile
            .ok_or_else(|| BylineError::Internal(format!("User {} has no profile", user.id)))?;

        Ok(Actor {
            id: user.id,
            is_staff: user.is_staff,
            role: profile.role,
        })
    }
}

/// Post edit/delete: the post's own author, or any staff account.
pub fn can_modify_post(actor: Actor, post_author_id: i32) -> bool {
    actor.id == post_author_id || actor.is_staff
}

/// Comment delete: the comment's author, the author of the post it sits on,
/// or any staff account.
pub fn can_delete_comment(actor: Actor, comment_author_id: i32, post_author_id: i32) -> bool {
    actor.id == comment_author_id || actor.id == post_author_id || actor.is_staff
}

/// Post creation requires the author capability (role author or admin).
pub fn can_create_post(actor: Actor) -> bool {
    actor.role.is_author()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(id: i32, is_staff: bool, role: Role) -> Actor {
        Actor { id, is_staff, role }
    }

    #[test]
    fn post_owner_and_staff_may_modify() {
        let owner = actor(1, false, Role::Author);
        let staff = actor(2, true, Role::Reader);
        let other = actor(3, false, Role::Author);

        assert!(can_modify_post(owner, 1));
        assert!(can_modify_post(staff, 1));
        assert!(!can_modify_post(other, 1));
    }

    #[test]
    fn comment_delete_truth_table() {
        let commenter = actor(10, false, Role::Reader);
        let post_author = actor(20, false, Role::Author);
        let staff = actor(30, true, Role::Reader);
        let stranger = actor(40, false, Role::Author);

        for a in [commenter, post_author, staff] {
            assert!(can_delete_comment(a, 10, 20), "{a:?} should be allowed");
        }
        assert!(!can_delete_comment(stranger, 10, 20));
    }

    #[test]
    fn only_authors_and_admins_create_posts() {
        assert!(!can_create_post(actor(1, false, Role::Reader)));
        assert!(can_create_post(actor(1, false, Role::Author)));
        assert!(can_create_post(actor(1, false, Role::Admin)));
        // Staff flag alone does not grant the author capability.
        assert!(!can_create_post(actor(1, true, Role::Reader)));
    }
}
