use crate::models::{Member, Role};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MembershipError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("R2D2 Pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("Member not found: {0}")]
    NotFound(String),
}

fn member_from_row(row: &Row) -> rusqlite::Result<Member> {
    let role: Option<String> = row.get(3)?;
    Ok(Member {
        user_id: row.get(0)?,
        organization_id: row.get(1)?,
        display_name: row.get(2)?,
        // An unknown role string is treated like no role at all.
        role: role.and_then(|r| r.parse::<Role>().ok()),
        created_at: row.get(4)?,
    })
}

pub fn add_member(
    conn: &Connection,
    user_id: &str,
    organization_id: &str,
    display_name: &str,
    role: Option<Role>,
) -> Result<(), MembershipError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO members (user_id, organization_id, display_name, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, organization_id, display_name, role.map(|r| r.as_str()), now],
    )?;
    Ok(())
}

pub fn read_member(
    conn: &Connection,
    user_id: &str,
    organization_id: &str,
) -> Result<Option<Member>, MembershipError> {
    let member = conn.query_row(
        "SELECT user_id, organization_id, display_name, role, created_at FROM members
         WHERE user_id = ?1 AND organization_id = ?2",
        params![user_id, organization_id],
        member_from_row,
    ).optional()?;
    Ok(member)
}

pub fn read_members_for_organization(
    conn: &Connection,
    organization_id: &str,
) -> Result<Vec<Member>, MembershipError> {
    let mut stmt = conn.prepare(
        "SELECT user_id, organization_id, display_name, role, created_at FROM members
         WHERE organization_id = ?1 ORDER BY display_name"
    )?;
    let rows = stmt.query_map([organization_id], member_from_row)?;

    let mut members = Vec::new();
    for member in rows {
        members.push(member?);
    }
    Ok(members)
}

pub fn update_member_role(
    conn: &Connection,
    user_id: &str,
    organization_id: &str,
    role: Option<Role>,
) -> Result<(), MembershipError> {
    let changed = conn.execute(
        "UPDATE members SET role = ?1 WHERE user_id = ?2 AND organization_id = ?3",
        params![role.map(|r| r.as_str()), user_id, organization_id],
    )?;
    if changed == 0 {
        return Err(MembershipError::NotFound(format!("{} in {}", user_id, organization_id)));
    }
    Ok(())
}

pub fn remove_member(
    conn: &Connection,
    user_id: &str,
    organization_id: &str,
) -> Result<usize, MembershipError> {
    Ok(conn.execute(
        "DELETE FROM members WHERE user_id = ?1 AND organization_id = ?2",
        params![user_id, organization_id],
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::db_setup;

    fn open() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        db_setup::setup_members_db(&mut conn).unwrap();
        conn
    }

    #[test]
    fn members_are_scoped_by_organization() {
        let conn = open();
        add_member(&conn, "u1", "org-a", "Una", Some(Role::Editor)).unwrap();
        add_member(&conn, "u1", "org-b", "Una", Some(Role::Admin)).unwrap();

        let a = read_member(&conn, "u1", "org-a").unwrap().unwrap();
        let b = read_member(&conn, "u1", "org-b").unwrap().unwrap();
        assert_eq!(a.role, Some(Role::Editor));
        assert_eq!(b.role, Some(Role::Admin));
        assert!(read_member(&conn, "u1", "org-c").unwrap().is_none());
    }

    #[test]
    fn role_can_be_changed_and_unset() {
        let conn = open();
        add_member(&conn, "u2", "org-a", "Ravi", Some(Role::Viewer)).unwrap();
        update_member_role(&conn, "u2", "org-a", Some(Role::Marketer)).unwrap();
        assert_eq!(read_member(&conn, "u2", "org-a").unwrap().unwrap().role, Some(Role::Marketer));

        update_member_role(&conn, "u2", "org-a", None).unwrap();
        assert_eq!(read_member(&conn, "u2", "org-a").unwrap().unwrap().role, None);

        assert!(matches!(
            update_member_role(&conn, "ghost", "org-a", None),
            Err(MembershipError::NotFound(_))
        ));
    }

    #[test]
    fn invalid_roles_are_rejected_by_the_schema() {
        let conn = open();
        let result = conn.execute(
            "INSERT INTO members (user_id, organization_id, display_name, role, created_at)
             VALUES ('u3', 'org-a', 'X', 'owner', '')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn listing_and_removal() {
        let conn = open();
        add_member(&conn, "u1", "org-a", "Zed", None).unwrap();
        add_member(&conn, "u2", "org-a", "Amy", Some(Role::Editor)).unwrap();
        let names: Vec<String> = read_members_for_organization(&conn, "org-a").unwrap()
            .into_iter().map(|m| m.display_name).collect();
        assert_eq!(names, vec!["Amy", "Zed"]);

        assert_eq!(remove_member(&conn, "u1", "org-a").unwrap(), 1);
        assert_eq!(read_members_for_organization(&conn, "org-a").unwrap().len(), 1);
    }
}
