mod activities;
mod categories;
mod comments;
mod evidence;
mod myths;
mod notifications;
mod research;
mod users;
mod votes;

pub use research::CompletedResearch;
pub use votes::CastVote;

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use myth_types::models::{UnknownVariant, UserSummary};
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, Row};

use crate::{DbError, DbResult};

/// SQLite's `datetime('now')` layout.
const SQLITE_TS: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn now_sql() -> String {
    Utc::now().format(SQLITE_TS).to_string()
}

fn parse_ts(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, SQLITE_TS).ok().map(|ndt| ndt.and_utc()))
}

pub(crate) fn ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("bad timestamp '{raw}'").into(),
        )
    })
}

pub(crate) fn ts_opt(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        None => Ok(None),
        Some(_) => ts(row, idx).map(Some),
    }
}

/// Read a string column into one of the domain enums.
pub(crate) fn parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: UnknownVariant| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Four joined user columns (id, email, first_name, last_name) starting at `idx`.
pub(crate) fn user_ref(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<UserSummary>> {
    let Some(id) = row.get::<_, Option<i64>>(idx)? else {
        return Ok(None);
    };
    Ok(Some(UserSummary {
        id,
        email: row.get(idx + 1)?,
        first_name: row.get(idx + 2)?,
        last_name: row.get(idx + 3)?,
    }))
}

pub(crate) fn exists(conn: &Connection, table: &str, id: i64) -> DbResult<bool> {
    let found: Option<i64> = conn
        .query_row(&format!("SELECT id FROM {table} WHERE id = ?1"), [id], |r| r.get(0))
        .optional()?;
    Ok(found.is_some())
}

/// `SET` list for a partial update. Only present values are written.
#[derive(Default)]
pub(crate) struct Changeset {
    sets: Vec<String>,
    params: Vec<Value>,
}

impl Changeset {
    pub(crate) fn set<V: Into<Value>>(&mut self, column: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.sets.push(format!("{column} = ?"));
            self.params.push(value.into());
        }
        self
    }

    /// Apply to row `id`, bumping `updated_at` when the table has one.
    pub(crate) fn apply(
        mut self,
        conn: &Connection,
        table: &str,
        id: i64,
        touch: bool,
    ) -> DbResult<usize> {
        if self.sets.is_empty() {
            return Ok(0);
        }
        if touch {
            self.sets.push("updated_at = datetime('now')".into());
        }
        let sql = format!("UPDATE {table} SET {} WHERE id = ?", self.sets.join(", "));
        self.params.push(Value::Integer(id));
        Ok(conn.execute(&sql, rusqlite::params_from_iter(self.params.iter()))?)
    }
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> DbResult<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> DbResult<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DbError::from(e)),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use myth_types::models::User;

    use crate::Database;
    use crate::models::NewUser;

    pub fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    pub fn user(db: &Database, email: &str) -> User {
        db.create_user(&NewUser {
            email,
            password_hash: "x",
            first_name: "Test",
            last_name: "User",
            is_farmer: true,
            is_researcher: false,
        })
        .unwrap()
    }

    pub fn staff(db: &Database, email: &str) -> User {
        let u = user(db, email);
        db.with_conn(|c| {
            c.execute("UPDATE users SET is_staff = 1 WHERE id = ?1", [u.id])?;
            Ok(())
        })
        .unwrap();
        db.get_user(u.id).unwrap().unwrap()
    }

    pub fn myth(db: &Database, owner: i64, title: &str) -> i64 {
        db.create_myth(owner, title, "description", "", None).unwrap().id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_timestamp_layouts() {
        let a = parse_ts("2024-03-01 10:11:12").unwrap();
        let b = parse_ts("2024-03-01T10:11:12Z").unwrap();
        assert_eq!(a, b);
        assert!(parse_ts("yesterday").is_none());
    }
}
