use rusqlite::Connection;
use tracing::info;

use crate::DbResult;

pub fn run(conn: &Connection) -> DbResult<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("running migration v1 (initial schema)");
        conn.execute_batch(V1)?;
    }

    info!("Database migrations complete");
    Ok(())
}

const V1: &str = "
    CREATE TABLE users (
        id                  INTEGER PRIMARY KEY AUTOINCREMENT,
        email               TEXT NOT NULL UNIQUE,
        password            TEXT NOT NULL,
        first_name          TEXT NOT NULL,
        last_name           TEXT NOT NULL,
        is_farmer           INTEGER NOT NULL DEFAULT 0,
        is_researcher       INTEGER NOT NULL DEFAULT 0,
        is_staff            INTEGER NOT NULL DEFAULT 0,
        phone_number        TEXT NOT NULL DEFAULT '',
        bio                 TEXT NOT NULL DEFAULT '',
        location            TEXT NOT NULL DEFAULT '',
        preferred_language  TEXT NOT NULL DEFAULT 'en',
        created_at          TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE user_activities (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        activity_type   TEXT NOT NULL,
        details         TEXT NOT NULL DEFAULT '{}',
        created_at      TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE INDEX idx_activities_user ON user_activities(user_id, created_at);

    CREATE TABLE categories (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT NOT NULL UNIQUE,
        description TEXT NOT NULL DEFAULT '',
        icon        TEXT NOT NULL DEFAULT '',
        created_at  TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE myths (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        title           TEXT NOT NULL,
        slug            TEXT NOT NULL UNIQUE,
        description     TEXT NOT NULL,
        origin          TEXT NOT NULL DEFAULT '',
        category_id     INTEGER REFERENCES categories(id) ON DELETE SET NULL,
        submitted_by    INTEGER REFERENCES users(id) ON DELETE SET NULL,
        status          TEXT NOT NULL DEFAULT 'pending'
                        CHECK (status IN ('pending', 'under_review', 'verified', 'debunked', 'inconclusive')),
        is_featured     INTEGER NOT NULL DEFAULT 0,
        upvotes         INTEGER NOT NULL DEFAULT 0 CHECK (upvotes >= 0),
        downvotes       INTEGER NOT NULL DEFAULT 0 CHECK (downvotes >= 0),
        total_votes     INTEGER NOT NULL DEFAULT 0,
        created_at      TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at      TEXT NOT NULL DEFAULT (datetime('now')),
        CHECK (total_votes = upvotes + downvotes)
    );

    CREATE INDEX idx_myths_status ON myths(status, created_at);
    CREATE INDEX idx_myths_category ON myths(category_id, status);

    CREATE TABLE evidence (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        myth_id         INTEGER NOT NULL REFERENCES myths(id) ON DELETE CASCADE,
        title           TEXT NOT NULL,
        description     TEXT NOT NULL,
        evidence_type   TEXT NOT NULL DEFAULT 'other'
                        CHECK (evidence_type IN ('scientific_study', 'expert_opinion', 'field_trial', 'traditional_knowledge', 'other')),
        source_url      TEXT NOT NULL DEFAULT '',
        source_citation TEXT NOT NULL DEFAULT '',
        submitted_by    INTEGER REFERENCES users(id) ON DELETE SET NULL,
        is_approved     INTEGER NOT NULL DEFAULT 0,
        upvotes         INTEGER NOT NULL DEFAULT 0 CHECK (upvotes >= 0),
        downvotes       INTEGER NOT NULL DEFAULT 0 CHECK (downvotes >= 0),
        total_votes     INTEGER NOT NULL DEFAULT 0,
        created_at      TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at      TEXT NOT NULL DEFAULT (datetime('now')),
        CHECK (total_votes = upvotes + downvotes)
    );

    CREATE INDEX idx_evidence_myth ON evidence(myth_id);

    CREATE TABLE comments (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        myth_id     INTEGER NOT NULL REFERENCES myths(id) ON DELETE CASCADE,
        user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        content     TEXT NOT NULL,
        is_approved INTEGER NOT NULL DEFAULT 1,
        created_at  TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE INDEX idx_comments_myth ON comments(myth_id);

    -- Exactly one of myth_id / evidence_id is set.
    CREATE TABLE votes (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        myth_id     INTEGER REFERENCES myths(id) ON DELETE CASCADE,
        evidence_id INTEGER REFERENCES evidence(id) ON DELETE CASCADE,
        user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        vote_type   TEXT NOT NULL CHECK (vote_type IN ('upvote', 'downvote')),
        created_at  TEXT NOT NULL DEFAULT (datetime('now')),
        CHECK ((myth_id IS NULL) <> (evidence_id IS NULL))
    );

    CREATE UNIQUE INDEX uq_votes_myth_user ON votes(myth_id, user_id);
    CREATE UNIQUE INDEX uq_votes_evidence_user ON votes(evidence_id, user_id);

    CREATE TABLE research_requests (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        myth_id         INTEGER NOT NULL REFERENCES myths(id) ON DELETE CASCADE,
        requested_by    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        assigned_to     INTEGER REFERENCES users(id) ON DELETE SET NULL,
        status          TEXT NOT NULL DEFAULT 'open'
                        CHECK (status IN ('open', 'in_progress', 'completed', 'rejected')),
        description     TEXT NOT NULL DEFAULT '',
        findings        TEXT NOT NULL DEFAULT '',
        completed_at    TEXT,
        created_at      TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE INDEX idx_research_myth ON research_requests(myth_id);

    CREATE TABLE notifications (
        id                  INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id             INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        notification_type   TEXT NOT NULL,
        title               TEXT NOT NULL,
        message             TEXT NOT NULL,
        is_read             INTEGER NOT NULL DEFAULT 0,
        related_myth        INTEGER REFERENCES myths(id) ON DELETE CASCADE,
        created_at          TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE INDEX idx_notifications_user ON notifications(user_id, is_read);

    INSERT INTO schema_version (version) VALUES (1);
";
