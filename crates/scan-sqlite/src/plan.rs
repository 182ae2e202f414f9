use scanload_core::{App, NormalizedRecord, Vuln};

/// One row-level insert, borrowing its values from the record.
#[derive(Debug, Clone, PartialEq)]
pub enum Insert<'a> {
    Location { record: &'a NormalizedRecord },
    Host { record: &'a NormalizedRecord },
    Service { record: &'a NormalizedRecord },
    App { app: &'a App },
    ServiceApp { service_id: i64, cpe: &'a str },
    Vuln { vuln: &'a Vuln },
    ServiceVuln { service_id: i64, cve: &'a str },
}

/// Statements for one record in foreign-key order: location, host, service,
/// then each app with its link, then each vulnerability with its link.
pub fn plan(record: &NormalizedRecord) -> Vec<Insert<'_>> {
    let mut out = Vec::with_capacity(3 + 2 * (record.apps.len() + record.vulns.len()));
    out.push(Insert::Location { record });
    out.push(Insert::Host { record });
    out.push(Insert::Service { record });
    for app in &record.apps {
        out.push(Insert::App { app });
        out.push(Insert::ServiceApp { service_id: record.service_id, cpe: &app.cpe });
    }
    for vuln in &record.vulns {
        out.push(Insert::Vuln { vuln });
        out.push(Insert::ServiceVuln { service_id: record.service_id, cve: &vuln.cve });
    }
    out
}
