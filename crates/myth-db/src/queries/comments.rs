use myth_types::models::{Comment, NotificationType, UserSummary};
use rusqlite::{Connection, Row, TransactionBehavior};

use super::notifications::{insert_notification, notify_myth_owner};
use super::{Changeset, OptionalExt, exists, ts};
use crate::filter::{Filter, order_by};
use crate::models::CommentFilter;
use crate::{Database, DbError, DbResult};

const COMMENT_SELECT: &str = "SELECT cm.id, cm.myth_id, cm.content, cm.is_approved, \
     cm.created_at, cm.updated_at, u.id, u.email, u.first_name, u.last_name \
     FROM comments cm JOIN users u ON u.id = cm.user_id";

const ORDERING: &[(&str, &str)] =
    &[("created_at", "cm.created_at"), ("updated_at", "cm.updated_at")];

/// Longest comment excerpt carried in a notification.
const EXCERPT_CHARS: usize = 140;

impl Database {
    pub fn list_comments(&self, filter: &CommentFilter) -> DbResult<Vec<Comment>> {
        let mut f = Filter::new();
        f.eq_opt("cm.myth_id", filter.myth_id)
            .eq_opt("cm.user_id", filter.user_id)
            .eq_opt("cm.is_approved", filter.is_approved);
        let order = order_by(filter.ordering.as_deref(), ORDERING, "-created_at", "cm.id")?;

        self.with_conn(|conn| {
            let sql = format!("{COMMENT_SELECT}{}{order}{}", f.where_sql(), filter.page.sql());
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(f.params()), map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_comment(&self, id: i64) -> DbResult<Option<Comment>> {
        self.with_conn(|conn| query_comment(conn, id))
    }

    pub fn create_comment(&self, myth_id: i64, user_id: i64, content: &str) -> DbResult<Comment> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if !exists(&tx, "myths", myth_id)? {
                return Err(DbError::InvalidArgument(format!("myth {myth_id} does not exist")));
            }
            tx.execute(
                "INSERT INTO comments (myth_id, user_id, content) VALUES (?1, ?2, ?3)",
                rusqlite::params![myth_id, user_id, content],
            )?;
            let id = tx.last_insert_rowid();

            if let Some(draft) = notify_myth_owner(
                &tx,
                myth_id,
                user_id,
                NotificationType::NewComment,
                |title| (format!("New comment on \"{title}\""), excerpt(content)),
            )? {
                insert_notification(&tx, &draft)?;
            }

            let comment = query_comment(&tx, id)?.ok_or_else(|| DbError::not_found("Comment", id))?;
            tx.commit()?;
            Ok(comment)
        })
    }

    pub fn update_comment(
        &self,
        id: i64,
        content: Option<String>,
        is_approved: Option<bool>,
    ) -> DbResult<Comment> {
        self.with_conn(|conn| {
            if !exists(conn, "comments", id)? {
                return Err(DbError::not_found("Comment", id));
            }
            let mut set = Changeset::default();
            set.set("content", content).set("is_approved", is_approved);
            set.apply(conn, "comments", id, true)?;
            query_comment(conn, id)?.ok_or_else(|| DbError::not_found("Comment", id))
        })
    }

    pub fn delete_comment(&self, id: i64) -> DbResult<()> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
            if deleted == 0 {
                return Err(DbError::not_found("Comment", id));
            }
            Ok(())
        })
    }
}

fn query_comment(conn: &Connection, id: i64) -> DbResult<Option<Comment>> {
    conn.query_row(&format!("{COMMENT_SELECT} WHERE cm.id = ?1"), [id], map_comment)
        .optional()
}

pub(crate) fn for_myth(conn: &Connection, myth_id: i64) -> DbResult<Vec<Comment>> {
    let mut stmt = conn.prepare(&format!(
        "{COMMENT_SELECT} WHERE cm.myth_id = ?1 ORDER BY cm.created_at DESC, cm.id DESC"
    ))?;
    let rows = stmt
        .query_map([myth_id], map_comment)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        myth_id: row.get(1)?,
        content: row.get(2)?,
        is_approved: row.get(3)?,
        created_at: ts(row, 4)?,
        updated_at: ts(row, 5)?,
        user: UserSummary {
            id: row.get(6)?,
            email: row.get(7)?,
            first_name: row.get(8)?,
            last_name: row.get(9)?,
        },
    })
}

fn excerpt(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;
    use crate::models::NotificationFilter;

    #[test]
    fn comment_notifies_myth_owner() {
        let db = fixtures::db();
        let owner = fixtures::user(&db, "owner@example.com");
        let reader = fixtures::user(&db, "reader@example.com");
        let myth_id = fixtures::myth(&db, owner.id, "Moon planting");

        let comment = db.create_comment(myth_id, reader.id, "My grandfather swore by it").unwrap();
        assert!(comment.is_approved);
        assert_eq!(comment.user.id, reader.id);

        let inbox = db.list_notifications(owner.id, &NotificationFilter::default()).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].notification_type, NotificationType::NewComment);
        assert_eq!(inbox[0].message, "My grandfather swore by it");
    }

    #[test]
    fn filters_by_user_and_approval() {
        let db = fixtures::db();
        let owner = fixtures::user(&db, "owner@example.com");
        let reader = fixtures::user(&db, "reader@example.com");
        let myth_id = fixtures::myth(&db, owner.id, "Moon planting");
        db.create_comment(myth_id, owner.id, "first").unwrap();
        let hidden = db.create_comment(myth_id, reader.id, "second").unwrap();
        db.update_comment(hidden.id, None, Some(false)).unwrap();

        let mine = db
            .list_comments(&CommentFilter { user_id: Some(reader.id), ..Default::default() })
            .unwrap();
        assert_eq!(mine.len(), 1);

        let approved = db
            .list_comments(&CommentFilter { is_approved: Some(true), ..Default::default() })
            .unwrap();
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].content, "first");
    }

    #[test]
    fn long_comments_are_excerpted() {
        let long = "a".repeat(EXCERPT_CHARS + 10);
        let short = excerpt(&long);
        assert_eq!(short.chars().count(), EXCERPT_CHARS + 1);
        assert!(short.ends_with('…'));
        assert_eq!(excerpt("short"), "short");
    }
}
