use myth_types::models::UserActivity;
use rusqlite::{Connection, Row};
use tracing::warn;

use super::{OptionalExt, ts};
use crate::filter::Page;
use crate::{Database, DbResult};

impl Database {
    pub fn record_activity(
        &self,
        user_id: i64,
        activity_type: &str,
        details: serde_json::Value,
    ) -> DbResult<()> {
        self.with_conn(|conn| insert_activity(conn, user_id, activity_type, &details))
    }

    pub fn list_activities(&self, user_id: i64, page: Page) -> DbResult<Vec<UserActivity>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{ACTIVITY_SELECT} WHERE user_id = ?1 ORDER BY created_at DESC, id DESC{}",
                page.sql()
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_activity)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// `None` when the entry does not exist or belongs to someone else.
    pub fn get_activity(&self, user_id: i64, id: i64) -> DbResult<Option<UserActivity>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("{ACTIVITY_SELECT} WHERE id = ?1 AND user_id = ?2"),
                [id, user_id],
                map_activity,
            )
            .optional()
        })
    }
}

const ACTIVITY_SELECT: &str =
    "SELECT id, user_id, activity_type, details, created_at FROM user_activities";

fn map_activity(row: &Row<'_>) -> rusqlite::Result<UserActivity> {
    let raw: String = row.get(3)?;
    let details = serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!("Corrupt activity details on row {}: {}", row.get::<_, i64>(0).unwrap_or_default(), e);
        serde_json::Value::Null
    });
    Ok(UserActivity {
        id: row.get(0)?,
        user_id: row.get(1)?,
        activity_type: row.get(2)?,
        details,
        created_at: ts(row, 4)?,
    })
}

/// Insert on an open connection, so callers can log inside their transaction.
pub(crate) fn insert_activity(
    conn: &Connection,
    user_id: i64,
    activity_type: &str,
    details: &serde_json::Value,
) -> DbResult<()> {
    conn.execute(
        "INSERT INTO user_activities (user_id, activity_type, details) VALUES (?1, ?2, ?3)",
        rusqlite::params![user_id, activity_type, details.to_string()],
    )?;
    Ok(())
}
