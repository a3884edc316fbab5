//! The vote ledger.
//!
//! Vote rows are the source of truth. Every cast runs in one immediate
//! transaction: the row change is applied, then the subject's counters are
//! recomputed from the rows and written back. The planned delta from
//! [`VoteChange`] is compared against the recount so drift left behind by
//! out-of-band edits gets logged when it is repaired.

use myth_types::models::{SubjectKind, Tally, Vote, VoteSubject, VoteType};
use myth_types::workflow::{VoteChange, VoteOutcome};
use rusqlite::{Connection, Row, TransactionBehavior};
use serde_json::json;
use tracing::{info, warn};

use super::activities::insert_activity;
use super::{OptionalExt, parsed, ts};
use crate::filter::Filter;
use crate::models::VoteFilter;
use crate::{Database, DbError, DbResult};

/// Where a subject kind keeps its counters and how votes reference it.
struct SubjectTable {
    entity: &'static str,
    table: &'static str,
    vote_column: &'static str,
}

const MYTH_SUBJECT: SubjectTable = SubjectTable {
    entity: "Myth",
    table: "myths",
    vote_column: "myth_id",
};

const EVIDENCE_SUBJECT: SubjectTable = SubjectTable {
    entity: "Evidence",
    table: "evidence",
    vote_column: "evidence_id",
};

fn subject_table(kind: SubjectKind) -> &'static SubjectTable {
    match kind {
        SubjectKind::Myth => &MYTH_SUBJECT,
        SubjectKind::Evidence => &EVIDENCE_SUBJECT,
    }
}

const VOTE_SELECT: &str = "SELECT id, myth_id, evidence_id, user_id, vote_type, created_at FROM votes";

/// Result of one ledger operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastVote {
    pub outcome: VoteOutcome,
    pub tally: Tally,
}

impl Database {
    /// Record, flip or retract `user_id`'s vote on `subject`.
    pub fn cast_vote(
        &self,
        subject: VoteSubject,
        user_id: i64,
        vote_type: VoteType,
    ) -> DbResult<CastVote> {
        let table = subject_table(subject.kind());
        let subject_id = subject.id();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let before = read_tally(&tx, table, subject_id)?
                .ok_or_else(|| DbError::not_found(table.entity, subject_id))?;

            let existing: Option<(i64, VoteType)> = tx
                .query_row(
                    &format!(
                        "SELECT id, vote_type FROM votes WHERE {} = ?1 AND user_id = ?2",
                        table.vote_column
                    ),
                    [subject_id, user_id],
                    |row| Ok((row.get(0)?, parsed(row, 1)?)),
                )
                .optional()?;

            let change = VoteChange::plan(existing.map(|(_, t)| t), vote_type);
            let existing_id = existing.map(|(id, _)| id);
            match change {
                VoteChange::Insert(t) => {
                    tx.execute(
                        &format!(
                            "INSERT INTO votes ({}, user_id, vote_type) VALUES (?1, ?2, ?3)",
                            table.vote_column
                        ),
                        rusqlite::params![subject_id, user_id, t.as_str()],
                    )?;
                }
                VoteChange::Delete(_) => {
                    tx.execute("DELETE FROM votes WHERE id = ?1", [existing_id])?;
                }
                VoteChange::Flip { to, .. } => {
                    tx.execute(
                        "UPDATE votes SET vote_type = ?1 WHERE id = ?2",
                        rusqlite::params![to.as_str(), existing_id],
                    )?;
                }
            }

            let mut expected = before;
            expected.apply(change.delta());
            let tally = recount(&tx, table, subject_id)?;
            if tally != expected {
                warn!(
                    subject = table.entity,
                    subject_id,
                    ?expected,
                    ?tally,
                    "vote tally drift repaired from vote rows"
                );
            }

            insert_activity(
                &tx,
                user_id,
                "vote_cast",
                &json!({
                    "content_type": subject.kind().as_str(),
                    "object_id": subject_id,
                    "vote_type": vote_type.as_str(),
                    "outcome": change.outcome(),
                }),
            )?;

            tx.commit()?;

            info!(
                subject = table.entity,
                subject_id,
                user_id,
                vote_type = %vote_type,
                outcome = ?change.outcome(),
                "vote cast"
            );
            Ok(CastVote { outcome: change.outcome(), tally })
        })
    }

    /// The caller's own votes.
    pub fn list_votes(&self, user_id: i64, filter: &VoteFilter) -> DbResult<Vec<Vote>> {
        let mut f = Filter::new();
        f.eq("user_id", user_id)
            .eq_opt("vote_type", filter.vote_type.map(|t| t.as_str().to_string()));
        match (filter.content_type, filter.object_id) {
            (Some(kind), Some(id)) => {
                f.eq(subject_table(kind).vote_column, id);
            }
            (Some(kind), None) => {
                f.clause(format!("{} IS NOT NULL", subject_table(kind).vote_column), vec![]);
            }
            (None, Some(id)) => {
                f.clause("(myth_id = ? OR evidence_id = ?)", vec![id.into(), id.into()]);
            }
            (None, None) => {}
        }

        self.with_conn(|conn| {
            let sql = format!(
                "{VOTE_SELECT}{} ORDER BY created_at DESC, id DESC{}",
                f.where_sql(),
                filter.page.sql()
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(f.params()), map_vote)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

pub(crate) fn for_myth(conn: &Connection, myth_id: i64) -> DbResult<Vec<Vote>> {
    let mut stmt = conn.prepare(&format!(
        "{VOTE_SELECT} WHERE myth_id = ?1 ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt
        .query_map([myth_id], map_vote)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn read_tally(conn: &Connection, table: &SubjectTable, id: i64) -> DbResult<Option<Tally>> {
    conn.query_row(
        &format!(
            "SELECT upvotes, downvotes, total_votes FROM {} WHERE id = ?1",
            table.table
        ),
        [id],
        |row| {
            Ok(Tally {
                upvotes: row.get(0)?,
                downvotes: row.get(1)?,
                total_votes: row.get(2)?,
            })
        },
    )
    .optional()
}

/// Rewrite the subject's counters from its vote rows.
fn recount(conn: &Connection, table: &SubjectTable, id: i64) -> DbResult<Tally> {
    let col = table.vote_column;
    conn.execute(
        &format!(
            "UPDATE {table} SET
                upvotes = (SELECT COUNT(*) FROM votes WHERE {col} = ?1 AND vote_type = 'upvote'),
                downvotes = (SELECT COUNT(*) FROM votes WHERE {col} = ?1 AND vote_type = 'downvote'),
                total_votes = (SELECT COUNT(*) FROM votes WHERE {col} = ?1)
             WHERE id = ?1",
            table = table.table,
        ),
        [id],
    )?;
    read_tally(conn, table, id)?.ok_or_else(|| DbError::not_found(table.entity, id))
}

fn map_vote(row: &Row<'_>) -> rusqlite::Result<Vote> {
    let myth_id: Option<i64> = row.get(1)?;
    let evidence_id: Option<i64> = row.get(2)?;
    let (content_type, object_id) = match (myth_id, evidence_id) {
        (Some(id), _) => (SubjectKind::Myth, id),
        (None, Some(id)) => (SubjectKind::Evidence, id),
        (None, None) => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Null,
                "vote has no subject".into(),
            ));
        }
    };
    Ok(Vote {
        id: row.get(0)?,
        content_type,
        object_id,
        user_id: row.get(3)?,
        vote_type: parsed(row, 4)?,
        created_at: ts(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use myth_types::models::EvidenceType;

    use super::super::fixtures;
    use super::*;
    use crate::models::NewEvidence;

    fn tally(up: i64, down: i64) -> Tally {
        Tally { upvotes: up, downvotes: down, total_votes: up + down }
    }

    fn vote_rows(db: &Database, myth_id: i64, user_id: i64) -> i64 {
        db.with_conn(|c| {
            Ok(c.query_row(
                "SELECT COUNT(*) FROM votes WHERE myth_id = ?1 AND user_id = ?2",
                [myth_id, user_id],
                |r| r.get(0),
            )?)
        })
        .unwrap()
    }

    #[test]
    fn upvote_toggle_then_downvote() {
        let db = fixtures::db();
        let a = fixtures::user(&db, "a@example.com");
        let myth = VoteSubject::Myth(fixtures::myth(&db, a.id, "Moon planting"));

        let first = db.cast_vote(myth, a.id, VoteType::Upvote).unwrap();
        assert_eq!(first.outcome, VoteOutcome::Recorded);
        assert_eq!(first.tally, tally(1, 0));

        let again = db.cast_vote(myth, a.id, VoteType::Upvote).unwrap();
        assert_eq!(again.outcome, VoteOutcome::Removed);
        assert_eq!(again.tally, tally(0, 0));
        assert_eq!(vote_rows(&db, myth.id(), a.id), 0);

        let down = db.cast_vote(myth, a.id, VoteType::Downvote).unwrap();
        assert_eq!(down.outcome, VoteOutcome::Recorded);
        assert_eq!(down.tally, tally(0, 1));

        let stored = db.get_myth(myth.id()).unwrap().unwrap();
        assert_eq!(stored.tally, tally(0, 1));
    }

    #[test]
    fn flip_keeps_total() {
        let db = fixtures::db();
        let a = fixtures::user(&db, "a@example.com");
        let b = fixtures::user(&db, "b@example.com");
        let myth = VoteSubject::Myth(fixtures::myth(&db, a.id, "Moon planting"));

        db.cast_vote(myth, a.id, VoteType::Upvote).unwrap();
        db.cast_vote(myth, b.id, VoteType::Upvote).unwrap();
        let flipped = db.cast_vote(myth, a.id, VoteType::Downvote).unwrap();

        assert_eq!(flipped.outcome, VoteOutcome::Recorded);
        assert_eq!(flipped.tally, tally(1, 1));
        assert_eq!(vote_rows(&db, myth.id(), a.id), 1);
    }

    #[test]
    fn many_users_stay_consistent() {
        let db = fixtures::db();
        let users: Vec<_> = (0..5)
            .map(|i| fixtures::user(&db, &format!("u{i}@example.com")))
            .collect();
        let myth = VoteSubject::Myth(fixtures::myth(&db, users[0].id, "Moon planting"));

        let script = [
            (0, VoteType::Upvote),
            (1, VoteType::Downvote),
            (2, VoteType::Upvote),
            (0, VoteType::Downvote),
            (1, VoteType::Downvote),
            (3, VoteType::Upvote),
            (2, VoteType::Upvote),
            (4, VoteType::Downvote),
        ];
        for (who, vote_type) in script {
            let cast = db.cast_vote(myth, users[who].id, vote_type).unwrap();
            assert!(cast.tally.is_consistent(), "{:?}", cast.tally);
        }
        // u0 down, u1 none, u2 none, u3 up, u4 down
        let stored = db.get_myth(myth.id()).unwrap().unwrap();
        assert_eq!(stored.tally, tally(1, 2));
    }

    #[test]
    fn missing_subject_is_not_found() {
        let db = fixtures::db();
        let a = fixtures::user(&db, "a@example.com");
        let err = db.cast_vote(VoteSubject::Myth(404), a.id, VoteType::Upvote).unwrap_err();
        assert!(matches!(err, DbError::NotFound { entity: "Myth", id: 404 }));
    }

    #[test]
    fn evidence_votes_use_their_own_counters() {
        let db = fixtures::db();
        let a = fixtures::user(&db, "a@example.com");
        let myth_id = fixtures::myth(&db, a.id, "Moon planting");
        let ev = db
            .create_evidence(
                a.id,
                &NewEvidence {
                    myth_id,
                    title: "Trial",
                    description: "d",
                    evidence_type: EvidenceType::FieldTrial,
                    source_url: "",
                    source_citation: "",
                },
            )
            .unwrap();

        let cast = db.cast_vote(VoteSubject::Evidence(ev.id), a.id, VoteType::Downvote).unwrap();
        assert_eq!(cast.tally, tally(0, 1));
        // Same user can also vote on the myth itself.
        db.cast_vote(VoteSubject::Myth(myth_id), a.id, VoteType::Upvote).unwrap();

        assert_eq!(db.get_evidence(ev.id).unwrap().unwrap().tally, tally(0, 1));
        assert_eq!(db.get_myth(myth_id).unwrap().unwrap().tally, tally(1, 0));

        let mine = db
            .list_votes(a.id, &VoteFilter { content_type: Some(SubjectKind::Evidence), ..Default::default() })
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].object_id, ev.id);
        assert_eq!(mine[0].vote_type, VoteType::Downvote);
    }

    #[test]
    fn duplicate_vote_row_is_rejected_by_constraint() {
        let db = fixtures::db();
        let a = fixtures::user(&db, "a@example.com");
        let myth_id = fixtures::myth(&db, a.id, "Moon planting");
        db.cast_vote(VoteSubject::Myth(myth_id), a.id, VoteType::Upvote).unwrap();

        let err = db
            .with_conn(|c| {
                c.execute(
                    "INSERT INTO votes (myth_id, user_id, vote_type) VALUES (?1, ?2, 'downvote')",
                    [myth_id, a.id],
                )?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)), "got {err:?}");
    }

    #[test]
    fn drifted_counters_are_repaired() {
        let db = fixtures::db();
        let a = fixtures::user(&db, "a@example.com");
        let b = fixtures::user(&db, "b@example.com");
        let myth_id = fixtures::myth(&db, a.id, "Moon planting");
        db.cast_vote(VoteSubject::Myth(myth_id), a.id, VoteType::Upvote).unwrap();
        db.with_conn(|c| {
            c.execute(
                "UPDATE myths SET upvotes = 5, total_votes = 5 WHERE id = ?1",
                [myth_id],
            )?;
            Ok(())
        })
        .unwrap();

        let cast = db.cast_vote(VoteSubject::Myth(myth_id), b.id, VoteType::Upvote).unwrap();
        assert_eq!(cast.tally, tally(2, 0));
    }

    #[test]
    fn concurrent_casts_leave_one_row_per_user() {
        use std::sync::Arc;

        let db = Arc::new(fixtures::db());
        let a = fixtures::user(&db, "a@example.com");
        let myth_id = fixtures::myth(&db, a.id, "Moon planting");

        let uid = a.id;
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = Arc::clone(&db);
                std::thread::spawn(move || {
                    db.cast_vote(VoteSubject::Myth(myth_id), uid, VoteType::Upvote).unwrap()
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        // Eight toggles by one user end where they started.
        assert_eq!(vote_rows(&db, myth_id, uid), 0);
        let stored = db.get_myth(myth_id).unwrap().unwrap();
        assert_eq!(stored.tally, tally(0, 0));
    }
}
