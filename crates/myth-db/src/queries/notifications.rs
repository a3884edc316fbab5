use myth_types::models::{Notification, NotificationType};
use rusqlite::{Connection, Row};

use super::{OptionalExt, parsed, ts};
use crate::filter::Filter;
use crate::models::{NewNotification, NotificationFilter};
use crate::{Database, DbResult};

const NOTIFICATION_SELECT: &str = "SELECT id, user_id, notification_type, title, message, \
     is_read, related_myth, created_at FROM notifications";

impl Database {
    pub fn list_notifications(
        &self,
        user_id: i64,
        filter: &NotificationFilter,
    ) -> DbResult<Vec<Notification>> {
        let mut f = Filter::new();
        f.eq("user_id", user_id).eq_opt("is_read", filter.is_read);

        self.with_conn(|conn| {
            let sql = format!(
                "{NOTIFICATION_SELECT}{} ORDER BY created_at DESC, id DESC{}",
                f.where_sql(),
                filter.page.sql()
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(f.params()), map_notification)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// A notification owned by `user_id`; other users' rows read as absent.
    pub fn get_notification(&self, user_id: i64, id: i64) -> DbResult<Option<Notification>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("{NOTIFICATION_SELECT} WHERE id = ?1 AND user_id = ?2"),
                [id, user_id],
                map_notification,
            )
            .optional()
        })
    }

    /// Returns false if the caller has no such notification.
    pub fn mark_notification_read(&self, user_id: i64, id: i64) -> DbResult<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
                [id, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Returns how many were unread.
    pub fn mark_all_notifications_read(&self, user_id: i64) -> DbResult<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
                [user_id],
            )?)
        })
    }

    pub fn delete_notification(&self, user_id: i64, id: i64) -> DbResult<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM notifications WHERE id = ?1 AND user_id = ?2",
                [id, user_id],
            )?;
            Ok(deleted > 0)
        })
    }
}

pub(crate) fn insert_notification(conn: &Connection, draft: &NewNotification) -> DbResult<()> {
    conn.execute(
        "INSERT INTO notifications (user_id, notification_type, title, message, related_myth)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            draft.user_id,
            draft.notification_type.as_str(),
            draft.title,
            draft.message,
            draft.related_myth
        ],
    )?;
    Ok(())
}

/// Draft a notification for the submitter of `myth_id`, unless there is none
/// or the submitter is the one acting. `compose` gets the myth title and
/// returns `(title, message)`.
pub(crate) fn notify_myth_owner<F>(
    conn: &Connection,
    myth_id: i64,
    actor_id: i64,
    notification_type: NotificationType,
    compose: F,
) -> DbResult<Option<NewNotification>>
where
    F: FnOnce(&str) -> (String, String),
{
    let row: Option<(Option<i64>, String)> = conn
        .query_row(
            "SELECT submitted_by, title FROM myths WHERE id = ?1",
            [myth_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;

    let Some((Some(owner), myth_title)) = row else {
        return Ok(None);
    };
    if owner == actor_id {
        return Ok(None);
    }
    let (title, message) = compose(&myth_title);
    Ok(Some(NewNotification {
        user_id: owner,
        notification_type,
        title,
        message,
        related_myth: Some(myth_id),
    }))
}

fn map_notification(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        notification_type: parsed(row, 2)?,
        title: row.get(3)?,
        message: row.get(4)?,
        is_read: row.get(5)?,
        related_myth: row.get(6)?,
        created_at: ts(row, 7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;

    fn seed(db: &Database, user_id: i64, n: usize) {
        db.with_conn(|conn| {
            for i in 0..n {
                insert_notification(
                    conn,
                    &NewNotification {
                        user_id,
                        notification_type: NotificationType::MythUpdate,
                        title: format!("update {i}"),
                        message: String::new(),
                        related_myth: None,
                    },
                )?;
            }
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn mark_read_is_scoped_to_owner() {
        let db = fixtures::db();
        let a = fixtures::user(&db, "a@example.com");
        let b = fixtures::user(&db, "b@example.com");
        seed(&db, a.id, 1);
        let id = db.list_notifications(a.id, &NotificationFilter::default()).unwrap()[0].id;

        assert!(!db.mark_notification_read(b.id, id).unwrap());
        assert!(db.get_notification(b.id, id).unwrap().is_none());
        assert!(db.mark_notification_read(a.id, id).unwrap());
        assert!(db.get_notification(a.id, id).unwrap().unwrap().is_read);
    }

    #[test]
    fn mark_all_counts_only_unread() {
        let db = fixtures::db();
        let a = fixtures::user(&db, "a@example.com");
        seed(&db, a.id, 3);
        let first = db.list_notifications(a.id, &NotificationFilter::default()).unwrap()[0].id;
        db.mark_notification_read(a.id, first).unwrap();

        assert_eq!(db.mark_all_notifications_read(a.id).unwrap(), 2);
        assert_eq!(db.mark_all_notifications_read(a.id).unwrap(), 0);

        let unread = db
            .list_notifications(a.id, &NotificationFilter { is_read: Some(false), ..Default::default() })
            .unwrap();
        assert!(unread.is_empty());
    }
}
