//! Research requests and their resolution.

use myth_types::models::{MythStatus, NotificationType, ResearchRequest, ResearchStatus, UserSummary};
use myth_types::workflow::{check_assign, check_complete, check_status_edit, derive_myth_status};
use rusqlite::{Connection, Row, TransactionBehavior};
use serde_json::json;
use tracing::info;

use super::activities::insert_activity;
use super::notifications::{insert_notification, notify_myth_owner};
use super::{Changeset, OptionalExt, exists, now_sql, parsed, ts, ts_opt, user_ref};
use crate::filter::{Filter, order_by};
use crate::models::{NewNotification, ResearchFilter, ResearchScope};
use crate::{Database, DbError, DbResult};

const RESEARCH_SELECT: &str = "SELECT rr.id, rr.myth_id, rr.status, rr.description, rr.findings, \
     rr.completed_at, rr.created_at, rr.updated_at, \
     r.id, r.email, r.first_name, r.last_name, \
     a.id, a.email, a.first_name, a.last_name \
     FROM research_requests rr \
     JOIN users r ON r.id = rr.requested_by \
     LEFT JOIN users a ON a.id = rr.assigned_to";

const ORDERING: &[(&str, &str)] = &[
    ("created_at", "rr.created_at"),
    ("updated_at", "rr.updated_at"),
    ("completed_at", "rr.completed_at"),
];

/// A completed request and the status it wrote onto its myth.
#[derive(Debug, Clone)]
pub struct CompletedResearch {
    pub request: ResearchRequest,
    pub myth_status: MythStatus,
}

impl ResearchScope {
    /// Whether a caller with this scope may see `request`.
    pub fn can_see(&self, request: &ResearchRequest) -> bool {
        match *self {
            ResearchScope::All => true,
            ResearchScope::AssignedOrRequested(uid) => {
                request.requested_by.id == uid
                    || request.assigned_to.as_ref().is_some_and(|a| a.id == uid)
            }
            ResearchScope::RequestedBy(uid) => request.requested_by.id == uid,
        }
    }
}

impl Database {
    pub fn list_research(
        &self,
        scope: ResearchScope,
        filter: &ResearchFilter,
    ) -> DbResult<Vec<ResearchRequest>> {
        let mut f = Filter::new();
        match scope {
            ResearchScope::All => {}
            ResearchScope::AssignedOrRequested(uid) => {
                f.clause("(rr.assigned_to = ? OR rr.requested_by = ?)", vec![uid.into(), uid.into()]);
            }
            ResearchScope::RequestedBy(uid) => {
                f.eq("rr.requested_by", uid);
            }
        }
        f.eq_opt("rr.status", filter.status.map(|s| s.as_str().to_string()))
            .eq_opt("rr.myth_id", filter.myth_id)
            .eq_opt("rr.requested_by", filter.requested_by)
            .eq_opt("rr.assigned_to", filter.assigned_to);
        let order = order_by(filter.ordering.as_deref(), ORDERING, "-created_at", "rr.id")?;

        self.with_conn(|conn| {
            let sql = format!("{RESEARCH_SELECT}{}{order}{}", f.where_sql(), filter.page.sql());
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(f.params()), map_research)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Unscoped lookup. Callers apply [`ResearchScope::can_see`] themselves.
    pub fn get_research(&self, id: i64) -> DbResult<Option<ResearchRequest>> {
        self.with_conn(|conn| query_research(conn, id))
    }

    pub fn create_research(
        &self,
        myth_id: i64,
        requested_by: i64,
        description: &str,
    ) -> DbResult<ResearchRequest> {
        self.with_conn(|conn| {
            if !exists(conn, "myths", myth_id)? {
                return Err(DbError::InvalidArgument(format!("myth {myth_id} does not exist")));
            }
            conn.execute(
                "INSERT INTO research_requests (myth_id, requested_by, description) VALUES (?1, ?2, ?3)",
                rusqlite::params![myth_id, requested_by, description],
            )?;
            let id = conn.last_insert_rowid();
            info!(request_id = id, myth_id, user_id = requested_by, "research requested");
            query_research(conn, id)?.ok_or_else(|| DbError::not_found("ResearchRequest", id))
        })
    }

    /// Edit the description and, for staff, reject the request.
    pub fn update_research(
        &self,
        id: i64,
        description: Option<String>,
        status: Option<ResearchStatus>,
    ) -> DbResult<ResearchRequest> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let current = read_state(&tx, id)?;
            if let Some(requested) = status {
                check_status_edit(current.status, requested)?;
            }
            let mut set = Changeset::default();
            set.set("description", description)
                .set("status", status.map(|s| s.as_str().to_string()));
            set.apply(&tx, "research_requests", id, true)?;
            let request = query_research(&tx, id)?.ok_or_else(|| DbError::not_found("ResearchRequest", id))?;
            tx.commit()?;
            Ok(request)
        })
    }

    pub fn delete_research(&self, id: i64) -> DbResult<()> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM research_requests WHERE id = ?1", [id])?;
            if deleted == 0 {
                return Err(DbError::not_found("ResearchRequest", id));
            }
            Ok(())
        })
    }

    /// Take the request on. Re-assigning to the current assignee is a no-op.
    pub fn assign_research(&self, id: i64, user_id: i64) -> DbResult<ResearchRequest> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let current = read_state(&tx, id)?;
            check_assign(current.status, current.assigned_to, user_id)?;

            tx.execute(
                "UPDATE research_requests
                 SET assigned_to = ?1, status = ?2, updated_at = datetime('now')
                 WHERE id = ?3",
                rusqlite::params![user_id, ResearchStatus::InProgress.as_str(), id],
            )?;
            let request = query_research(&tx, id)?.ok_or_else(|| DbError::not_found("ResearchRequest", id))?;
            tx.commit()?;

            info!(request_id = id, user_id, "research request assigned");
            Ok(request)
        })
    }

    /// Close the request with `findings` and write the derived status onto
    /// its myth, all in one transaction.
    pub fn complete_research(
        &self,
        id: i64,
        caller_id: i64,
        caller_is_staff: bool,
        findings: &str,
    ) -> DbResult<CompletedResearch> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let current = read_state(&tx, id)?;
            check_complete(current.status, current.assigned_to, caller_id, caller_is_staff)?;

            let myth_status = derive_myth_status(findings);
            tx.execute(
                "UPDATE research_requests
                 SET status = ?1, findings = ?2, completed_at = ?3, updated_at = datetime('now')
                 WHERE id = ?4",
                rusqlite::params![ResearchStatus::Completed.as_str(), findings, now_sql(), id],
            )?;
            tx.execute(
                "UPDATE myths SET status = ?1, updated_at = datetime('now') WHERE id = ?2",
                rusqlite::params![myth_status.as_str(), current.myth_id],
            )?;

            let myth_title: String = tx.query_row(
                "SELECT title FROM myths WHERE id = ?1",
                [current.myth_id],
                |r| r.get(0),
            )?;
            if current.requested_by != caller_id {
                insert_notification(
                    &tx,
                    &NewNotification {
                        user_id: current.requested_by,
                        notification_type: NotificationType::ResearchUpdate,
                        title: format!("Research completed on \"{myth_title}\""),
                        message: format!("Your research request was completed. Result: {myth_status}."),
                        related_myth: Some(current.myth_id),
                    },
                )?;
            }
            // The requester already heard about it above.
            if let Some(draft) = notify_myth_owner(
                &tx,
                current.myth_id,
                caller_id,
                NotificationType::StatusChange,
                |title| {
                    (
                        format!("\"{title}\" is now {myth_status}"),
                        format!("Research on your myth concluded: {myth_status}."),
                    )
                },
            )? {
                if draft.user_id != current.requested_by {
                    insert_notification(&tx, &draft)?;
                }
            }

            insert_activity(
                &tx,
                caller_id,
                "research_completed",
                &json!({
                    "research_request_id": id,
                    "myth_id": current.myth_id,
                    "myth_status": myth_status.as_str(),
                }),
            )?;

            let request = query_research(&tx, id)?.ok_or_else(|| DbError::not_found("ResearchRequest", id))?;
            tx.commit()?;

            info!(
                request_id = id,
                myth_id = current.myth_id,
                user_id = caller_id,
                myth_status = %myth_status,
                "research request completed"
            );
            Ok(CompletedResearch { request, myth_status })
        })
    }
}

/// The columns the transition guards look at.
struct ResearchState {
    myth_id: i64,
    requested_by: i64,
    assigned_to: Option<i64>,
    status: ResearchStatus,
}

fn read_state(conn: &Connection, id: i64) -> DbResult<ResearchState> {
    conn.query_row(
        "SELECT myth_id, requested_by, assigned_to, status FROM research_requests WHERE id = ?1",
        [id],
        |row| {
            Ok(ResearchState {
                myth_id: row.get(0)?,
                requested_by: row.get(1)?,
                assigned_to: row.get(2)?,
                status: parsed(row, 3)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| DbError::not_found("ResearchRequest", id))
}

fn query_research(conn: &Connection, id: i64) -> DbResult<Option<ResearchRequest>> {
    conn.query_row(&format!("{RESEARCH_SELECT} WHERE rr.id = ?1"), [id], map_research)
        .optional()
}

pub(crate) fn for_myth(conn: &Connection, myth_id: i64) -> DbResult<Vec<ResearchRequest>> {
    let mut stmt = conn.prepare(&format!(
        "{RESEARCH_SELECT} WHERE rr.myth_id = ?1 ORDER BY rr.created_at DESC, rr.id DESC"
    ))?;
    let rows = stmt
        .query_map([myth_id], map_research)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_research(row: &Row<'_>) -> rusqlite::Result<ResearchRequest> {
    Ok(ResearchRequest {
        id: row.get(0)?,
        myth_id: row.get(1)?,
        status: parsed(row, 2)?,
        description: row.get(3)?,
        findings: row.get(4)?,
        completed_at: ts_opt(row, 5)?,
        created_at: ts(row, 6)?,
        updated_at: ts(row, 7)?,
        requested_by: UserSummary {
            id: row.get(8)?,
            email: row.get(9)?,
            first_name: row.get(10)?,
            last_name: row.get(11)?,
        },
        assigned_to: user_ref(row, 12)?,
    })
}
