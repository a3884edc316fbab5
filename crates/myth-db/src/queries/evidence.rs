use myth_types::models::{Evidence, NotificationType, Tally};
use rusqlite::{Connection, Row, TransactionBehavior};

use super::notifications::{insert_notification, notify_myth_owner};
use super::{Changeset, OptionalExt, exists, parsed, ts, user_ref};
use crate::filter::{Filter, order_by};
use crate::models::{EvidenceChanges, EvidenceFilter, NewEvidence};
use crate::{Database, DbError, DbResult};

const EVIDENCE_SELECT: &str = "SELECT e.id, e.myth_id, e.title, e.description, e.evidence_type, \
     e.source_url, e.source_citation, e.is_approved, e.upvotes, e.downvotes, e.total_votes, \
     e.created_at, e.updated_at, u.id, u.email, u.first_name, u.last_name \
     FROM evidence e LEFT JOIN users u ON u.id = e.submitted_by";

const ORDERING: &[(&str, &str)] = &[("created_at", "e.created_at"), ("updated_at", "e.updated_at")];

impl Database {
    pub fn list_evidence(&self, filter: &EvidenceFilter) -> DbResult<Vec<Evidence>> {
        let mut f = Filter::new();
        f.eq_opt("e.myth_id", filter.myth_id)
            .eq_opt("e.evidence_type", filter.evidence_type.map(|t| t.as_str().to_string()))
            .eq_opt("e.is_approved", filter.is_approved)
            .search(
                &["e.title", "e.description", "e.source_citation"],
                filter.search.as_deref(),
            );
        let order = order_by(filter.ordering.as_deref(), ORDERING, "-created_at", "e.id")?;

        self.with_conn(|conn| {
            let sql = format!("{EVIDENCE_SELECT}{}{order}{}", f.where_sql(), filter.page.sql());
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(f.params()), map_evidence)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_evidence(&self, id: i64) -> DbResult<Option<Evidence>> {
        self.with_conn(|conn| query_evidence(conn, id))
    }

    /// Insert evidence and tell the myth's submitter about it.
    pub fn create_evidence(&self, submitted_by: i64, new: &NewEvidence<'_>) -> DbResult<Evidence> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if !exists(&tx, "myths", new.myth_id)? {
                return Err(DbError::InvalidArgument(format!("myth {} does not exist", new.myth_id)));
            }
            tx.execute(
                "INSERT INTO evidence (myth_id, title, description, evidence_type, source_url, source_citation, submitted_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    new.myth_id,
                    new.title,
                    new.description,
                    new.evidence_type.as_str(),
                    new.source_url,
                    new.source_citation,
                    submitted_by
                ],
            )?;
            let id = tx.last_insert_rowid();

            if let Some(draft) = notify_myth_owner(
                &tx,
                new.myth_id,
                submitted_by,
                NotificationType::EvidenceAdded,
                |title| (format!("New evidence on \"{title}\""), new.title.to_string()),
            )? {
                insert_notification(&tx, &draft)?;
            }

            let evidence = query_evidence(&tx, id)?.ok_or_else(|| DbError::not_found("Evidence", id))?;
            tx.commit()?;
            Ok(evidence)
        })
    }

    pub fn update_evidence(&self, id: i64, changes: EvidenceChanges) -> DbResult<Evidence> {
        self.with_conn(|conn| {
            if !exists(conn, "evidence", id)? {
                return Err(DbError::not_found("Evidence", id));
            }
            let mut set = Changeset::default();
            set.set("title", changes.title)
                .set("description", changes.description)
                .set("evidence_type", changes.evidence_type.map(|t| t.as_str().to_string()))
                .set("source_url", changes.source_url)
                .set("source_citation", changes.source_citation)
                .set("is_approved", changes.is_approved);
            set.apply(conn, "evidence", id, true)?;
            query_evidence(conn, id)?.ok_or_else(|| DbError::not_found("Evidence", id))
        })
    }

    pub fn delete_evidence(&self, id: i64) -> DbResult<()> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM evidence WHERE id = ?1", [id])?;
            if deleted == 0 {
                return Err(DbError::not_found("Evidence", id));
            }
            Ok(())
        })
    }
}

fn query_evidence(conn: &Connection, id: i64) -> DbResult<Option<Evidence>> {
    conn.query_row(&format!("{EVIDENCE_SELECT} WHERE e.id = ?1"), [id], map_evidence)
        .optional()
}

pub(crate) fn for_myth(conn: &Connection, myth_id: i64) -> DbResult<Vec<Evidence>> {
    let mut stmt = conn.prepare(&format!(
        "{EVIDENCE_SELECT} WHERE e.myth_id = ?1 ORDER BY e.created_at DESC, e.id DESC"
    ))?;
    let rows = stmt
        .query_map([myth_id], map_evidence)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_evidence(row: &Row<'_>) -> rusqlite::Result<Evidence> {
    Ok(Evidence {
        id: row.get(0)?,
        myth_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        evidence_type: parsed(row, 4)?,
        source_url: row.get(5)?,
        source_citation: row.get(6)?,
        is_approved: row.get(7)?,
        tally: Tally {
            upvotes: row.get(8)?,
            downvotes: row.get(9)?,
            total_votes: row.get(10)?,
        },
        created_at: ts(row, 11)?,
        updated_at: ts(row, 12)?,
        submitted_by: user_ref(row, 13)?,
    })
}
