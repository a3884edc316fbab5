use myth_types::api::MythDetail;
use myth_types::models::{Myth, Tally};
use rusqlite::{Connection, Row, TransactionBehavior};
use serde_json::json;
use tracing::info;

use super::activities::insert_activity;
use super::categories::map_category;
use super::{Changeset, OptionalExt, comments, evidence, exists, parsed, research, ts, user_ref, votes};
use crate::filter::{Filter, order_by};
use crate::models::{MythChanges, MythFilter};
use crate::{Database, DbError, DbResult};

const MYTH_SELECT: &str = "SELECT m.id, m.title, m.slug, m.description, m.origin, m.status, \
     m.is_featured, m.upvotes, m.downvotes, m.total_votes, m.created_at, m.updated_at, \
     c.id, c.name, c.description, c.icon, c.created_at, c.updated_at, \
     u.id, u.email, u.first_name, u.last_name \
     FROM myths m \
     LEFT JOIN categories c ON c.id = m.category_id \
     LEFT JOIN users u ON u.id = m.submitted_by";

const ORDERING: &[(&str, &str)] = &[
    ("created_at", "m.created_at"),
    ("updated_at", "m.updated_at"),
    ("total_votes", "m.total_votes"),
];

impl Database {
    pub fn list_myths(&self, filter: &MythFilter) -> DbResult<Vec<Myth>> {
        let mut f = Filter::new();
        f.eq_opt("m.status", filter.status.map(|s| s.as_str().to_string()))
            .eq_opt("m.is_featured", filter.is_featured)
            .eq_opt("m.category_id", filter.category_id)
            .eq_opt("m.submitted_by", filter.submitted_by)
            .search(
                &["m.title", "m.description", "m.origin"],
                filter.search.as_deref(),
            );
        if let Some(name) = &filter.category_name {
            f.clause("c.name = ? COLLATE NOCASE", vec![name.clone().into()]);
        }
        let order = order_by(filter.ordering.as_deref(), ORDERING, "-created_at", "m.id")?;

        self.with_conn(|conn| {
            let sql = format!("{MYTH_SELECT}{}{order}{}", f.where_sql(), filter.page.sql());
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(f.params()), map_myth)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_myth(&self, id: i64) -> DbResult<Option<Myth>> {
        self.with_conn(|conn| query_myth(conn, id))
    }

    /// The myth with its evidence, comments, votes and research requests.
    pub fn get_myth_detail(&self, id: i64) -> DbResult<Option<MythDetail>> {
        self.with_conn(|conn| {
            let Some(myth) = query_myth(conn, id)? else {
                return Ok(None);
            };
            Ok(Some(MythDetail {
                evidence: evidence::for_myth(conn, id)?,
                comments: comments::for_myth(conn, id)?,
                votes: votes::for_myth(conn, id)?,
                research_requests: research::for_myth(conn, id)?,
                myth,
            }))
        })
    }

    pub fn create_myth(
        &self,
        submitted_by: i64,
        title: &str,
        description: &str,
        origin: &str,
        category_id: Option<i64>,
    ) -> DbResult<Myth> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if let Some(cid) = category_id {
                if !exists(&tx, "categories", cid)? {
                    return Err(DbError::InvalidArgument(format!("category {cid} does not exist")));
                }
            }

            let slug = unique_slug(&tx, title)?;
            tx.execute(
                "INSERT INTO myths (title, slug, description, origin, category_id, submitted_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![title, slug, description, origin, category_id, submitted_by],
            )?;
            let id = tx.last_insert_rowid();
            insert_activity(&tx, submitted_by, "myth_submitted", &json!({ "myth_id": id }))?;

            let myth = query_myth(&tx, id)?.ok_or_else(|| DbError::not_found("Myth", id))?;
            tx.commit()?;

            info!(myth_id = id, user_id = submitted_by, slug = %myth.slug, "myth submitted");
            Ok(myth)
        })
    }

    pub fn update_myth(&self, id: i64, changes: MythChanges) -> DbResult<Myth> {
        self.with_conn(|conn| {
            if !exists(conn, "myths", id)? {
                return Err(DbError::not_found("Myth", id));
            }
            if let Some(Some(cid)) = changes.category_id {
                if !exists(conn, "categories", cid)? {
                    return Err(DbError::InvalidArgument(format!("category {cid} does not exist")));
                }
            }
            let mut set = Changeset::default();
            set.set("title", changes.title)
                .set("description", changes.description)
                .set("origin", changes.origin)
                .set("category_id", changes.category_id)
                .set("status", changes.status.map(|s| s.as_str().to_string()))
                .set("is_featured", changes.is_featured);
            set.apply(conn, "myths", id, true)?;
            query_myth(conn, id)?.ok_or_else(|| DbError::not_found("Myth", id))
        })
    }

    /// Cascades to evidence, comments, votes and research requests.
    pub fn delete_myth(&self, id: i64) -> DbResult<()> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM myths WHERE id = ?1", [id])?;
            if deleted == 0 {
                return Err(DbError::not_found("Myth", id));
            }
            Ok(())
        })
    }
}

pub(crate) fn query_myth(conn: &Connection, id: i64) -> DbResult<Option<Myth>> {
    conn.query_row(&format!("{MYTH_SELECT} WHERE m.id = ?1"), [id], map_myth)
        .optional()
}

fn map_myth(row: &Row<'_>) -> rusqlite::Result<Myth> {
    let category = match row.get::<_, Option<i64>>(12)? {
        Some(_) => Some(map_category(row, 12)?),
        None => None,
    };
    Ok(Myth {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
        origin: row.get(4)?,
        status: parsed(row, 5)?,
        is_featured: row.get(6)?,
        tally: Tally {
            upvotes: row.get(7)?,
            downvotes: row.get(8)?,
            total_votes: row.get(9)?,
        },
        created_at: ts(row, 10)?,
        updated_at: ts(row, 11)?,
        category,
        submitted_by: user_ref(row, 18)?,
    })
}

fn unique_slug(conn: &Connection, title: &str) -> DbResult<String> {
    let base = slugify(title);
    let mut candidate = base.clone();
    let mut counter = 1;
    loop {
        let taken: Option<i64> = conn
            .query_row("SELECT id FROM myths WHERE slug = ?1", [&candidate], |r| r.get(0))
            .optional()?;
        if taken.is_none() {
            return Ok(candidate);
        }
        candidate = format!("{base}-{counter}");
        counter += 1;
    }
}

/// Lowercase, drop punctuation, join words with `-`.
fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_alphanumeric() || c == '_' {
            slug.extend(c.to_lowercase());
        } else if (c.is_whitespace() || c == '-') && !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "myth".to_string()
    } else {
        slug.to_string()
    }
}
