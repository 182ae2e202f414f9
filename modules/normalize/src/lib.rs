//! Record normalizer: raw Shodan-style scan record to the flat, keyed shape
//! the relational store expects. Pure; no I/O.

mod cpe;
mod error;
mod fields;
mod keys;

pub use cpe::parse_cpe;
pub use error::NormalizeError;
pub use keys::{location_id, service_id, KeyScheme};

use fields::Fields;
use scanload_core::{App, NormalizedRecord, Protocol, Vuln};
use serde_json::Value;

pub fn normalize(raw: &Value, scheme: KeyScheme) -> Result<NormalizedRecord, NormalizeError> {
    let rec = Fields::new(raw, "")?;

    let loc = Fields::new(rec.required("location")?, "location")?;
    let lon = loc.required_number("longitude")?;
    let lat = loc.required_number("latitude")?;
    let longitude = lon.as_f64().ok_or_else(|| loc.invalid("longitude", "a number"))?;
    let latitude = lat.as_f64().ok_or_else(|| loc.invalid("latitude", "a number"))?;
    let city = loc.nullable_str("city")?;
    let location_id = location_id(lon, lat, scheme)?;

    let ip = rec.required_str("ip_str")?.to_string();
    let provider = rec.nullable_str("isp")?;
    let device_type = rec.optional_str("devicetype")?;
    let asn = rec.optional_text("asn")?;

    let port = rec
        .required("port")?
        .as_u64()
        .and_then(|p| u16::try_from(p).ok())
        .ok_or_else(|| rec.invalid("port", "an integer in 0..=65535"))?;
    let protocol = Protocol::parse(rec.required_str("transport")?);
    let os = rec.nullable_str("os")?;
    let service_id = service_id(&ip, port, &protocol, scheme)?;

    let apps = apps(&rec)?;
    let vulns = vulns(&rec)?;

    Ok(NormalizedRecord {
        longitude,
        latitude,
        city,
        location_id,
        ip,
        provider,
        device_type,
        asn,
        service_id,
        port,
        os,
        protocol,
        apps,
        vulns,
    })
}

/// Replace single quotes with backticks.
pub fn sanitize_description(s: &str) -> String {
    s.replace('\'', "`")
}

fn apps(rec: &Fields<'_>) -> Result<Vec<App>, NormalizeError> {
    let list = match rec.get("cpe23") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(list)) => list,
        Some(_) => return Err(rec.invalid("cpe23", "an array of strings")),
    };
    list.iter()
        .map(|v| v.as_str().ok_or_else(|| rec.invalid("cpe23", "an array of strings")).and_then(parse_cpe))
        .collect()
}

fn vulns(rec: &Fields<'_>) -> Result<Vec<Vuln>, NormalizeError> {
    let map = match rec.get("vulns") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(rec.invalid("vulns", "an object keyed by CVE id")),
    };
    let mut out = Vec::with_capacity(map.len());
    for (cve, entry) in map {
        let path = rec.name("vulns") + "." + cve;
        let v = Fields::new(entry, &path)?;
        out.push(Vuln {
            cve: cve.clone(),
            cvss: v.optional_f64("cvss")?,
            descr: v.optional_str("summary")?.map(|s| sanitize_description(&s)),
        });
    }
    Ok(out)
}
