use crate::NormalizeError;
use scanload_core::App;

/// Split a CPE 2.3 string on `:`. Vendor and product sit at fields 3 and 4;
/// the sixth field, when it is the last one, is the version.
pub fn parse_cpe(cpe: &str) -> Result<App, NormalizeError> {
    let wfns: Vec<&str> = cpe.split(':').collect();
    if wfns.len() < 5 {
        return Err(NormalizeError::MalformedCpe(cpe.to_string()));
    }
    let version = if wfns.len() == 6 { Some(wfns[5].to_string()) } else { None };
    Ok(App {
        cpe: cpe.to_string(),
        name: wfns[4].to_string(),
        vendor: wfns[3].to_string(),
        version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_fields_carry_version() {
        let app = parse_cpe("cpe:2.3:a:apache:http_server:2.4.1").unwrap();
        assert_eq!(app.vendor, "apache");
        assert_eq!(app.name, "http_server");
        assert_eq!(app.version.as_deref(), Some("2.4.1"));
        assert_eq!(app.cpe, "cpe:2.3:a:apache:http_server:2.4.1");
    }

    #[test]
    fn five_fields_have_no_version() {
        let app = parse_cpe("cpe:2.3:a:openbsd:openssh").unwrap();
        assert_eq!(app.vendor, "openbsd");
        assert_eq!(app.name, "openssh");
        assert_eq!(app.version, None);
    }

    #[test]
    fn longer_strings_have_no_version() {
        let app = parse_cpe("cpe:2.3:o:linux:linux_kernel:5.4:*:*").unwrap();
        assert_eq!(app.name, "linux_kernel");
        assert_eq!(app.version, None);
    }

    #[test]
    fn short_strings_are_rejected() {
        assert_eq!(parse_cpe("cpe:2.3:a").unwrap_err(), NormalizeError::MalformedCpe("cpe:2.3:a".into()));
    }
}
