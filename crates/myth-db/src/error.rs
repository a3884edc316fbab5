use myth_types::workflow::TransitionError;
use rusqlite::ffi;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("DB lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("sqlite: {0}")]
    Sqlite(rusqlite::Error),
}

impl DbError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        DbError::NotFound { entity, id }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, msg) = &err {
            if code.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || code.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            {
                let detail = msg.as_deref().unwrap_or("unique constraint failed");
                return DbError::Conflict(format!("Duplicate value: {detail}"));
            }
        }
        DbError::Sqlite(err)
    }
}

impl From<TransitionError> for DbError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::Conflict(msg) => DbError::Conflict(msg),
            TransitionError::Forbidden(msg) => DbError::Forbidden(msg),
        }
    }
}
