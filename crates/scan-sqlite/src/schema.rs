pub const SCHEMA_VERSION: i64 = 1;

pub const MIG_0001_INIT: &str = r#"
BEGIN;

CREATE TABLE IF NOT EXISTS locations (
  location_id     INTEGER NOT NULL PRIMARY KEY,
  city            TEXT,
  long            NUMERIC NOT NULL,
  lat             NUMERIC NOT NULL,
  UNIQUE (long, lat)
);

CREATE TABLE IF NOT EXISTS hosts (
  ip              TEXT NOT NULL PRIMARY KEY,
  provider        TEXT,
  dev_type        TEXT,
  asn             TEXT,
  location_id     INTEGER REFERENCES locations(location_id)
);

CREATE TABLE IF NOT EXISTS services (
  service_id      INTEGER NOT NULL PRIMARY KEY,
  ip              TEXT NOT NULL REFERENCES hosts(ip),
  port            INTEGER NOT NULL CHECK (port BETWEEN 0 AND 65535),
  os              TEXT,
  protocol        TEXT,
  UNIQUE (ip, port, protocol)
);

CREATE TABLE IF NOT EXISTS apps (
  cpe             TEXT NOT NULL PRIMARY KEY,
  vendor          TEXT,
  version         TEXT
);

CREATE TABLE IF NOT EXISTS vulns (
  cve             TEXT NOT NULL PRIMARY KEY,
  cvss            NUMERIC,
  descr           TEXT
);

CREATE TABLE IF NOT EXISTS services_apps (
  service_id      INTEGER NOT NULL REFERENCES services(service_id),
  cpe             TEXT NOT NULL REFERENCES apps(cpe),
  UNIQUE (service_id, cpe)
);

CREATE TABLE IF NOT EXISTS services_vulns (
  service_id      INTEGER NOT NULL REFERENCES services(service_id),
  cve             TEXT NOT NULL REFERENCES vulns(cve),
  UNIQUE (service_id, cve)
);

CREATE INDEX IF NOT EXISTS idx_hosts_location ON hosts(location_id);
CREATE INDEX IF NOT EXISTS idx_services_ip ON services(ip);

PRAGMA user_version = 1;

COMMIT;
"#;
