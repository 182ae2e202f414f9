use crate::Table;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database: {0}")]
    Open(#[source] rusqlite::Error),
    #[error("schema bootstrap failed: {0}")]
    Schema(#[source] rusqlite::Error),
    #[error("insert into {table} failed: {source}")]
    Insert { table: Table, #[source] source: rusqlite::Error },
    #[error(transparent)]
    Query(#[from] rusqlite::Error),
}

/// Uniqueness and primary-key conflicts mean the row is already loaded.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation
                && matches!(
                    e.extended_code,
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
        }
        _ => false,
    }
}
