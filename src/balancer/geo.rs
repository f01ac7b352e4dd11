//! Great-circle distance between viewer and node positions

use crate::models::GeoPosition;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometers
pub fn haversine_km(a: GeoPosition, b: GeoPosition) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}
