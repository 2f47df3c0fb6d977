//! IP geolocation against a local MaxMind City database.
//!
//! The database is optional; without it every lookup yields empty fields
//! and click records persist with blank geo columns.

use std::net::IpAddr;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoInfo {
    /// ISO 3166-1 alpha-2 code.
    pub country_code: String,
    /// English subdivision name.
    pub region: String,
    /// English city name.
    pub city: String,
}

pub struct GeoResolver {
    reader: Option<maxminddb::Reader<Vec<u8>>>,
}

impl GeoResolver {
    pub fn load(path: Option<&str>) -> Self {
        let reader = path.and_then(|path| {
            if !std::path::Path::new(path).exists() {
                tracing::warn!(path = %path, "GeoIP database not found, geo enrichment disabled");
                return None;
            }
            match std::fs::read(path).map(maxminddb::Reader::from_source) {
                Ok(Ok(reader)) => {
                    tracing::info!(path = %path, "GeoIP database loaded");
                    Some(reader)
                }
                Ok(Err(e)) => {
                    tracing::warn!(path = %path, error = %e, "GeoIP database unreadable, geo enrichment disabled");
                    None
                }
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "GeoIP database unreadable, geo enrichment disabled");
                    None
                }
            }
        });
        Self { reader }
    }

    /// Resolve an IP; any failure returns empty fields.
    pub fn lookup(&self, ip: &str) -> GeoInfo {
        self.try_lookup(ip).unwrap_or_default()
    }

    fn try_lookup(&self, ip: &str) -> Option<GeoInfo> {
        let reader = self.reader.as_ref()?;
        let ip_addr = IpAddr::from_str(ip).ok()?;

        let lookup = reader.lookup(ip_addr).ok()?;
        let record = lookup.decode::<maxminddb::geoip2::City>().ok().flatten()?;

        let country_code = record
            .country
            .iso_code
            .map(|s| s.to_string())
            .unwrap_or_default();
        let region = record
            .subdivisions
            .first()
            .and_then(|sub| sub.names.english)
            .map(|s| s.to_string())
            .unwrap_or_default();
        let city = record
            .city
            .names
            .english
            .map(|s| s.to_string())
            .unwrap_or_default();

        Some(GeoInfo {
            country_code,
            region,
            city,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_database_yields_empty_fields() {
        let resolver = GeoResolver::load(Some("/nonexistent/GeoLite2-City.mmdb"));
        assert_eq!(resolver.lookup("203.0.113.9"), GeoInfo::default());
    }

    #[test]
    fn unparseable_ip_yields_empty_fields() {
        let resolver = GeoResolver::load(None);
        assert_eq!(resolver.lookup("unknown"), GeoInfo::default());
    }
}
