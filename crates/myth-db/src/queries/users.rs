use myth_types::models::User;
use rusqlite::{Connection, Row};

use super::{Changeset, OptionalExt, ts};
use crate::models::{NewUser, ProfileChanges, UserRow};
use crate::{Database, DbError, DbResult};

const USER_COLUMNS: &str = "id, email, first_name, last_name, is_farmer, is_researcher, is_staff, \
     phone_number, bio, location, preferred_language, created_at";

impl Database {
    pub fn create_user(&self, new: &NewUser<'_>) -> DbResult<User> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (email, password, first_name, last_name, is_farmer, is_researcher)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    new.email,
                    new.password_hash,
                    new.first_name,
                    new.last_name,
                    new.is_farmer,
                    new.is_researcher
                ],
            )?;
            let id = conn.last_insert_rowid();
            query_user(conn, id)?.ok_or_else(|| DbError::not_found("User", id))
        })
    }

    pub fn get_user(&self, id: i64) -> DbResult<Option<User>> {
        self.with_conn(|conn| query_user(conn, id))
    }

    pub fn get_user_by_email(&self, email: &str) -> DbResult<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS}, password FROM users WHERE email = ?1"),
                [email],
                map_user_row,
            )
            .optional()
        })
    }

    pub fn get_user_row(&self, id: i64) -> DbResult<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS}, password FROM users WHERE id = ?1"),
                [id],
                map_user_row,
            )
            .optional()
        })
    }

    pub fn update_password(&self, id: i64, password_hash: &str) -> DbResult<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET password = ?1 WHERE id = ?2",
                rusqlite::params![password_hash, id],
            )?;
            if changed == 0 {
                return Err(DbError::not_found("User", id));
            }
            Ok(())
        })
    }

    pub fn update_profile(&self, id: i64, changes: ProfileChanges) -> DbResult<User> {
        self.with_conn(|conn| {
            let mut set = Changeset::default();
            set.set("first_name", changes.first_name)
                .set("last_name", changes.last_name)
                .set("is_farmer", changes.is_farmer)
                .set("is_researcher", changes.is_researcher)
                .set("phone_number", changes.phone_number)
                .set("bio", changes.bio)
                .set("location", changes.location)
                .set("preferred_language", changes.preferred_language);
            set.apply(conn, "users", id, false)?;
            query_user(conn, id)?.ok_or_else(|| DbError::not_found("User", id))
        })
    }
}

fn query_user(conn: &Connection, id: i64) -> DbResult<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        [id],
        map_user,
    )
    .optional()
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        is_farmer: row.get(4)?,
        is_researcher: row.get(5)?,
        is_staff: row.get(6)?,
        phone_number: row.get(7)?,
        bio: row.get(8)?,
        location: row.get(9)?,
        preferred_language: row.get(10)?,
        created_at: ts(row, 11)?,
    })
}

fn map_user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        user: map_user(row)?,
        password_hash: row.get(12)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;

    #[test]
    fn duplicate_email_is_a_conflict() {
        let db = fixtures::db();
        fixtures::user(&db, "ana@example.com");
        let err = db
            .create_user(&NewUser {
                email: "ana@example.com",
                password_hash: "y",
                first_name: "Ana",
                last_name: "Again",
                is_farmer: false,
                is_researcher: false,
            })
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)), "got {err:?}");
    }

    #[test]
    fn profile_update_leaves_unset_fields() {
        let db = fixtures::db();
        let user = fixtures::user(&db, "ben@example.com");
        let updated = db
            .update_profile(
                user.id,
                ProfileChanges {
                    location: Some("Nakuru".into()),
                    is_researcher: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.location, "Nakuru");
        assert!(updated.is_researcher);
        assert_eq!(updated.first_name, "Test");
        assert_eq!(updated.preferred_language, "en");
        assert!(!updated.is_staff);
    }

    #[test]
    fn lookup_by_email_returns_hash() {
        let db = fixtures::db();
        fixtures::user(&db, "cy@example.com");
        let row = db.get_user_by_email("cy@example.com").unwrap().unwrap();
        assert_eq!(row.password_hash, "x");
        assert!(db.get_user_by_email("nobody@example.com").unwrap().is_none());
    }
}
