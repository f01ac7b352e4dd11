//! GeoIP lookup for viewer proximity scoring
//!
//! Backed by a MaxMind city database when one is configured; without it every
//! lookup returns `None` and selection falls back to load-only scoring.

use std::net::IpAddr;
use std::sync::Arc;

use maxminddb::geoip2;
use tracing::{info, warn};

use crate::models::GeoPosition;

#[derive(Clone)]
pub struct GeoIpResolver {
    reader: Option<Arc<maxminddb::Reader<Vec<u8>>>>,
}

impl GeoIpResolver {
    /// Open the database at `path`; a missing or unreadable database is a
    /// degraded mode, not a startup failure
    pub fn new(database_path: Option<&str>) -> Self {
        let reader = database_path.and_then(|path| match maxminddb::Reader::open_readfile(path) {
            Ok(reader) => {
                info!("GeoIP database loaded from {path}");
                Some(Arc::new(reader))
            }
            Err(e) => {
                warn!("GeoIP database unavailable at {path}: {e}; proximity scoring disabled");
                None
            }
        });
        Self { reader }
    }

    /// Resolver that never answers; used in tests and geo-less deployments
    pub fn disabled() -> Self {
        Self { reader: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.reader.is_some()
    }

    pub fn lookup(&self, ip: IpAddr) -> Option<GeoPosition> {
        let reader = self.reader.as_ref()?;
        let city: geoip2::City = reader.lookup(ip).ok()?;
        let location = city.location?;
        match (location.latitude, location.longitude) {
            (Some(lat), Some(lon)) => Some(GeoPosition { lat, lon }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_resolver_returns_none() {
        let resolver = GeoIpResolver::disabled();
        assert!(!resolver.is_enabled());
        assert!(resolver.lookup("203.0.113.7".parse().unwrap()).is_none());
    }

    #[test]
    fn missing_database_degrades_gracefully() {
        let resolver = GeoIpResolver::new(Some("/nonexistent/GeoLite2-City.mmdb"));
        assert!(!resolver.is_enabled());
    }
}
