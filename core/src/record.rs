use serde::{Deserialize, Serialize};
use std::fmt;

pub type LocationId = i64;
pub type ServiceId = i64;

/// Transport of a scanned service as reported by the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Protocol {
    Tcp,
    Udp,
    Other(String),
}

impl Protocol {
    pub fn parse(s: &str) -> Self {
        match s {
            "tcp" => Protocol::Tcp,
            "udp" => Protocol::Udp,
            other => Protocol::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Other(s) => s,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl From<String> for Protocol {
    fn from(s: String) -> Self { Protocol::parse(&s) }
}

impl From<Protocol> for String {
    fn from(p: Protocol) -> Self { p.as_str().to_string() }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct App {
    pub cpe: String,
    pub name: String,
    pub vendor: String,
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vuln {
    pub cve: String,
    pub cvss: Option<f64>,
    pub descr: Option<String>,
}

/// One scan record flattened into the columns of the relational store,
/// with its derived surrogate keys already computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub longitude: f64,
    pub latitude: f64,
    pub city: Option<String>,
    pub location_id: LocationId,
    pub ip: String,
    pub provider: Option<String>,
    pub device_type: Option<String>,
    pub asn: Option<String>,
    pub service_id: ServiceId,
    pub port: u16,
    pub os: Option<String>,
    pub protocol: Protocol,
    pub apps: Vec<App>,
    pub vulns: Vec<Vuln>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_parse_known_and_other() {
        assert_eq!(Protocol::parse("tcp"), Protocol::Tcp);
        assert_eq!(Protocol::parse("udp"), Protocol::Udp);
        assert_eq!(Protocol::parse("sctp"), Protocol::Other("sctp".into()));
        assert_eq!(Protocol::parse("sctp").to_string(), "sctp");
    }

    #[test]
    fn protocol_serializes_as_plain_string() {
        let s = serde_json::to_string(&Protocol::Udp).unwrap();
        assert_eq!(s, "\"udp\"");
        let p: Protocol = serde_json::from_str("\"tcp\"").unwrap();
        assert_eq!(p, Protocol::Tcp);
    }
}
