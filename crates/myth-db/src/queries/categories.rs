use myth_types::models::Category;
use rusqlite::{Connection, Row};

use super::{Changeset, OptionalExt, ts};
use crate::filter::{Filter, order_by};
use crate::models::{CategoryChanges, CategoryFilter};
use crate::{Database, DbError, DbResult};

const CATEGORY_SELECT: &str =
    "SELECT id, name, description, icon, created_at, updated_at FROM categories";

const ORDERING: &[(&str, &str)] = &[("name", "name"), ("created_at", "created_at")];

impl Database {
    pub fn list_categories(&self, filter: &CategoryFilter) -> DbResult<Vec<Category>> {
        let mut f = Filter::new();
        f.search(&["name", "description"], filter.search.as_deref());
        let order = order_by(filter.ordering.as_deref(), ORDERING, "name", "id")?;

        self.with_conn(|conn| {
            let sql = format!("{CATEGORY_SELECT}{}{order}", f.where_sql());
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(f.params()), |row| map_category(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_category(&self, id: i64) -> DbResult<Option<Category>> {
        self.with_conn(|conn| query_category(conn, id))
    }

    pub fn create_category(&self, name: &str, description: &str, icon: &str) -> DbResult<Category> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO categories (name, description, icon) VALUES (?1, ?2, ?3)",
                (name, description, icon),
            )?;
            let id = conn.last_insert_rowid();
            query_category(conn, id)?.ok_or_else(|| DbError::not_found("Category", id))
        })
    }

    pub fn update_category(&self, id: i64, changes: CategoryChanges) -> DbResult<Category> {
        self.with_conn(|conn| {
            if query_category(conn, id)?.is_none() {
                return Err(DbError::not_found("Category", id));
            }
            let mut set = Changeset::default();
            set.set("name", changes.name)
                .set("description", changes.description)
                .set("icon", changes.icon);
            set.apply(conn, "categories", id, true)?;
            query_category(conn, id)?.ok_or_else(|| DbError::not_found("Category", id))
        })
    }

    /// Myths in the category keep existing with no category.
    pub fn delete_category(&self, id: i64) -> DbResult<()> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM categories WHERE id = ?1", [id])?;
            if deleted == 0 {
                return Err(DbError::not_found("Category", id));
            }
            Ok(())
        })
    }
}

fn query_category(conn: &Connection, id: i64) -> DbResult<Option<Category>> {
    conn.query_row(&format!("{CATEGORY_SELECT} WHERE id = ?1"), [id], |row| {
        map_category(row, 0)
    })
    .optional()
}

/// Six category columns starting at `idx`.
pub(crate) fn map_category(row: &Row<'_>, idx: usize) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(idx)?,
        name: row.get(idx + 1)?,
        description: row.get(idx + 2)?,
        icon: row.get(idx + 3)?,
        created_at: ts(row, idx + 4)?,
        updated_at: ts(row, idx + 5)?,
    })
}
