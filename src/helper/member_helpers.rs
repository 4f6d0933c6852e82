use crate::models::db_operations::members_db_operations::{self, MembershipError};
use crate::models::Actor;
use crate::DbPool;

/// Looks the caller up in the member directory. `None` means they are not part of the organization.
pub fn resolve_actor(
    pool: &DbPool,
    user_id: &str,
    organization_id: &str,
) -> Result<Option<Actor>, MembershipError> {
    let conn = pool.get()?;
    let member = members_db_operations::read_member(&conn, user_id, organization_id)?;
    Ok(member.map(Actor::from))
}
