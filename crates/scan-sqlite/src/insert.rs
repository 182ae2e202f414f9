use crate::error::is_unique_violation;
use crate::{plan, Db, Insert, InsertOutcome, LoadReport, StoreError, Table};
use rusqlite::{params, Connection};
use scanload_core::NormalizedRecord;
use tracing::debug;

impl Insert<'_> {
    pub fn table(&self) -> Table {
        match self {
            Insert::Location { .. } => Table::Locations,
            Insert::Host { .. } => Table::Hosts,
            Insert::Service { .. } => Table::Services,
            Insert::App { .. } => Table::Apps,
            Insert::ServiceApp { .. } => Table::ServicesApps,
            Insert::Vuln { .. } => Table::Vulns,
            Insert::ServiceVuln { .. } => Table::ServicesVulns,
        }
    }

    fn execute(&self, conn: &Connection) -> rusqlite::Result<usize> {
        match self {
            Insert::Location { record: r } => conn.execute(
                "INSERT INTO locations(location_id,city,long,lat) VALUES (?,?,?,?)",
                params![r.location_id, r.city, r.longitude, r.latitude],
            ),
            Insert::Host { record: r } => conn.execute(
                "INSERT INTO hosts(ip,provider,dev_type,asn,location_id) VALUES (?,?,?,?,?)",
                params![r.ip, r.provider, r.device_type, r.asn, r.location_id],
            ),
            Insert::Service { record: r } => conn.execute(
                "INSERT INTO services(service_id,ip,port,os,protocol) VALUES (?,?,?,?,?)",
                params![r.service_id, r.ip, r.port, r.os, r.protocol.as_str()],
            ),
            Insert::App { app } => conn.execute(
                "INSERT INTO apps(cpe,vendor,version) VALUES (?,?,?)",
                params![app.cpe, app.vendor, app.version],
            ),
            Insert::ServiceApp { service_id, cpe } => conn.execute(
                "INSERT INTO services_apps(service_id,cpe) VALUES (?,?)",
                params![service_id, cpe],
            ),
            Insert::Vuln { vuln } => conn.execute(
                "INSERT INTO vulns(cve,cvss,descr) VALUES (?,?,?)",
                params![vuln.cve, vuln.cvss, vuln.descr],
            ),
            Insert::ServiceVuln { service_id, cve } => conn.execute(
                "INSERT INTO services_vulns(service_id,cve) VALUES (?,?)",
                params![service_id, cve],
            ),
        }
    }
}

impl Db {
    /// Run one insert in its own transaction. A uniqueness conflict rolls the
    /// statement back and reports `AlreadyExists`; every other failure is
    /// returned as an error.
    pub fn insert(&self, stmt: &Insert<'_>) -> Result<InsertOutcome, StoreError> {
        let table = stmt.table();
        let tx = self.conn.unchecked_transaction().map_err(|source| StoreError::Insert { table, source })?;
        match stmt.execute(&tx) {
            Ok(_) => {
                tx.commit().map_err(|source| StoreError::Insert { table, source })?;
                Ok(InsertOutcome::Inserted)
            }
            Err(e) if is_unique_violation(&e) => {
                debug!(%table, "already exists, ignored");
                Ok(InsertOutcome::AlreadyExists)
            }
            Err(source) => Err(StoreError::Insert { table, source }),
        }
    }

    /// Load every entity of one record in foreign-key order. Statements that
    /// committed before a failure stay committed.
    pub fn load_record(&self, record: &NormalizedRecord) -> Result<LoadReport, StoreError> {
        let mut report = LoadReport::default();
        for stmt in plan(record) {
            report.record(self.insert(&stmt)?);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use normalize::{normalize, KeyScheme};
    use serde_json::{json, Value};

    fn raw() -> Value {
        json!({
            "location": { "longitude": 12.34, "latitude": -56.78, "city": "Springfield" },
            "ip_str": "1.2.3.4",
            "isp": "Example Networks",
            "port": 443,
            "transport": "tcp",
            "os": "Linux",
            "asn": "AS64500",
            "cpe23": ["cpe:2.3:a:apache:http_server:2.4.1"],
            "vulns": { "CVE-2021-0001": { "cvss": 7.5, "summary": "it's bad" } }
        })
    }

    fn counts(db: &Db) -> Vec<(Table, i64)> {
        Table::ALL.iter().map(|&t| (t, db.count_rows(t).unwrap())).collect()
    }

    #[test]
    fn first_load_inserts_every_entity() {
        let db = Db::open_in_memory().unwrap();
        let rec = normalize(&raw(), KeyScheme::Legacy).unwrap();
        let report = db.load_record(&rec).unwrap();
        assert_eq!(report, LoadReport { inserted: 7, already_exists: 0 });
        for (t, n) in counts(&db) {
            assert_eq!(n, 1, "table {t}");
        }
        let (id, descr): (i64, String) = db
            .conn
            .query_row("SELECT s.service_id, v.descr FROM services s JOIN services_vulns sv USING(service_id) JOIN vulns v USING(cve)", [], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap();
        assert_eq!(id, 12344430);
        assert_eq!(descr, "it`s bad");
    }

    #[test]
    fn reloading_is_idempotent() {
        let db = Db::open_in_memory().unwrap();
        let rec = normalize(&raw(), KeyScheme::Hashed).unwrap();
        db.load_record(&rec).unwrap();
        let before = counts(&db);
        for _ in 0..3 {
            let report = db.load_record(&rec).unwrap();
            assert_eq!(report, LoadReport { inserted: 0, already_exists: 7 });
        }
        assert_eq!(counts(&db), before);
    }

    #[test]
    fn existing_app_is_not_updated_but_relinked() {
        let db = Db::open_in_memory().unwrap();
        let first = normalize(&raw(), KeyScheme::Hashed).unwrap();
        db.load_record(&first).unwrap();

        let mut other = raw();
        other["ip_str"] = json!("5.6.7.8");
        let mut second = normalize(&other, KeyScheme::Hashed).unwrap();
        second.apps[0].vendor = "someone-else".into();
        db.load_record(&second).unwrap();

        assert_eq!(db.count_rows(Table::Apps).unwrap(), 1);
        assert_eq!(db.count_rows(Table::ServicesApps).unwrap(), 2);
        let vendor: String = db.conn.query_row("SELECT vendor FROM apps", [], |r| r.get(0)).unwrap();
        assert_eq!(vendor, "apache");
    }

    #[test]
    fn record_without_apps_or_vulns_has_no_join_rows() {
        let db = Db::open_in_memory().unwrap();
        let mut bare = raw();
        bare.as_object_mut().unwrap().remove("cpe23");
        bare.as_object_mut().unwrap().remove("vulns");
        let report = db.load_record(&normalize(&bare, KeyScheme::Hashed).unwrap()).unwrap();
        assert_eq!(report.inserted, 3);
        assert_eq!(db.count_rows(Table::ServicesApps).unwrap(), 0);
        assert_eq!(db.count_rows(Table::ServicesVulns).unwrap(), 0);
    }

    #[test]
    fn negative_zero_longitude_shares_the_location_row() {
        let db = Db::open_in_memory().unwrap();
        let mut a = raw();
        a["location"] = json!({ "longitude": 0.0, "latitude": 10.5, "city": null });
        a["ip_str"] = json!("1.1.1.1");
        let mut b = a.clone();
        b["location"]["longitude"] = json!(-0.0);
        b["ip_str"] = json!("2.2.2.2");

        let first = normalize(&a, KeyScheme::Hashed).unwrap();
        let second = normalize(&b, KeyScheme::Hashed).unwrap();
        assert_eq!(first.location_id, second.location_id);

        db.load_record(&first).unwrap();
        db.load_record(&second).unwrap();
        assert_eq!(db.count_rows(Table::Locations).unwrap(), 1);
        assert_eq!(db.count_rows(Table::Hosts).unwrap(), 2);
    }

    #[test]
    fn foreign_key_violation_is_fatal() {
        let db = Db::open_in_memory().unwrap();
        let rec = normalize(&raw(), KeyScheme::Hashed).unwrap();
        let err = db.insert(&Insert::Service { record: &rec }).unwrap_err();
        assert!(matches!(err, StoreError::Insert { table: Table::Services, .. }));
        assert_eq!(db.count_rows(Table::Services).unwrap(), 0);
    }

    #[test]
    fn conflict_is_distinct_from_failure() {
        let db = Db::open_in_memory().unwrap();
        let rec = normalize(&raw(), KeyScheme::Hashed).unwrap();
        assert_eq!(db.insert(&Insert::Location { record: &rec }).unwrap(), InsertOutcome::Inserted);
        assert_eq!(db.insert(&Insert::Location { record: &rec }).unwrap(), InsertOutcome::AlreadyExists);

        // same coordinates under a different key still collide on UNIQUE(long, lat)
        let mut moved = rec.clone();
        moved.location_id += 1;
        assert_eq!(db.insert(&Insert::Location { record: &moved }).unwrap(), InsertOutcome::AlreadyExists);
    }
}
