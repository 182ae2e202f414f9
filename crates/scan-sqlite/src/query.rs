use crate::{Db, StoreError, Table};

impl Db {
    pub fn table_exists(&self, name: &str) -> Result<bool, StoreError> {
        let cnt: i64 = self.conn.query_row(
            "SELECT COUNT(1) FROM sqlite_master WHERE type='table' AND name=?",
            [name],
            |r| r.get(0),
        )?;
        Ok(cnt > 0)
    }

    pub fn count_rows(&self, table: Table) -> Result<i64, StoreError> {
        let sql = format!("SELECT COUNT(1) FROM {}", table.name());
        Ok(self.conn.query_row(&sql, [], |r| r.get(0))?)
    }
}
