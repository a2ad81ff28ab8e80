//! Geographic utilities.

/// Earth radius in meters for the spherical-Earth approximation.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates, in meters.
///
/// Uses the haversine formula on a sphere of radius 6 371 000 m. Identical
/// coordinates return exactly 0.0; antipodal points stay numerically stable.
///
/// # Example
/// ```
/// use gpx_cadence::haversine_distance;
///
/// let london_to_paris = haversine_distance(51.5074, -0.1278, 48.8566, 2.3522);
/// assert!((london_to_paris / 1000.0 - 343.5).abs() < 1.0);
/// ```
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}
