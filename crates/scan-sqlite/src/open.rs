use crate::schema::{MIG_0001_INIT, SCHEMA_VERSION};
use crate::StoreError;
use rusqlite::Connection;
use tracing::debug;

/// The single connection held for a whole run. Closed when dropped.
pub struct Db {
    pub conn: Connection,
}

impl Db {
    pub fn open_or_create(path: impl AsRef<std::path::Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(StoreError::Open)?;
        apply_pragmas(&conn, true).map_err(StoreError::Open)?;
        migrate(&conn)?;
        Ok(Db { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(StoreError::Open)?;
        apply_pragmas(&conn, false).map_err(StoreError::Open)?;
        migrate(&conn)?;
        Ok(Db { conn })
    }
}

fn apply_pragmas(conn: &Connection, on_disk: bool) -> rusqlite::Result<()> {
    if on_disk {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
    }
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}

fn migrate(conn: &Connection) -> Result<(), StoreError> {
    let version: i64 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .map_err(StoreError::Schema)?;
    if version < SCHEMA_VERSION {
        debug!(from = version, to = SCHEMA_VERSION, "creating schema");
        conn.execute_batch(MIG_0001_INIT).map_err(StoreError::Schema)?;
    }
    Ok(())
}
