//! Geodesic proximity check on the WGS-84 ellipsoid.
//!
//! Distances come from Vincenty's inverse formula. For nearly antipodal
//! pairs, where the iteration does not converge, the validator falls back
//! to a great-circle distance on the mean earth radius; such pairs are
//! thousands of kilometres outside any mission radius, so the gate
//! decision is unaffected.

use crate::error::{VerifyError, VerifyResult};
use serde::{Deserialize, Serialize};

const MAX_ITERATIONS: usize = 200;
const CONVERGENCE: f64 = 1e-12;

/// Latitude/longitude in degrees. Range-checked at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = VerifyError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> VerifyResult<Self> {
        let lat_ok = latitude.is_finite() && (-90.0..=90.0).contains(&latitude);
        let lon_ok = longitude.is_finite() && (-180.0..=180.0).contains(&longitude);
        if !lat_ok || !lon_ok {
            return Err(VerifyError::InvalidCoordinate {
                lat: latitude,
                lon: longitude,
            });
        }
        Ok(Self { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Reference ellipsoid: semi-major axis in meters and flattening.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    pub semi_major_axis: f64,
    pub flattening: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        semi_major_axis: 6_378_137.0,
        flattening: 1.0 / 298.257_223_563,
    };

    pub fn semi_minor_axis(&self) -> f64 {
        (1.0 - self.flattening) * self.semi_major_axis
    }

    /// IUGG mean radius, (2a + b) / 3.
    pub fn mean_radius(&self) -> f64 {
        (2.0 * self.semi_major_axis + self.semi_minor_axis()) / 3.0
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Ellipsoid::WGS84
    }
}

/// Result of one proximity check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCheck {
    pub distance_meters: f64,
    pub pass: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GeoValidator {
    ellipsoid: Ellipsoid,
}

impl GeoValidator {
    pub fn new(ellipsoid: Ellipsoid) -> Self {
        Self { ellipsoid }
    }

    pub fn ellipsoid(&self) -> Ellipsoid {
        self.ellipsoid
    }

    /// `pass` iff the geodesic distance is within `radius_meters`.
    pub fn check(&self, a: Coordinate, b: Coordinate, radius_meters: f64) -> GeoCheck {
        let distance_meters = self.distance_meters(a, b);
        GeoCheck {
            distance_meters,
            pass: distance_meters <= radius_meters,
        }
    }

    pub fn distance_meters(&self, a: Coordinate, b: Coordinate) -> f64 {
        if a == b {
            return 0.0;
        }
        match self.vincenty(a, b) {
            Some(distance) => distance,
            None => {
                tracing::debug!(
                    lat_a = a.latitude,
                    lat_b = b.latitude,
                    "vincenty did not converge, using great-circle distance"
                );
                self.great_circle(a, b)
            }
        }
    }

    fn vincenty(&self, a: Coordinate, b: Coordinate) -> Option<f64> {
        let major = self.ellipsoid.semi_major_axis;
        let f = self.ellipsoid.flattening;
        let minor = self.ellipsoid.semi_minor_axis();

        let l = wrap_longitude((b.longitude - a.longitude).to_radians());
        let u1 = ((1.0 - f) * a.latitude.to_radians().tan()).atan();
        let u2 = ((1.0 - f) * b.latitude.to_radians().tan()).atan();
        let (sin_u1, cos_u1) = u1.sin_cos();
        let (sin_u2, cos_u2) = u2.sin_cos();

        let mut lambda = l;
        for _ in 0..MAX_ITERATIONS {
            let (sin_lambda, cos_lambda) = lambda.sin_cos();
            let sin_sigma = ((cos_u2 * sin_lambda).powi(2)
                + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
            .sqrt();
            if sin_sigma == 0.0 {
                return Some(0.0);
            }
            let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
            let sigma = sin_sigma.atan2(cos_sigma);
            let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
            let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
            // equatorial line: cos_sq_alpha = 0
            let cos_2sigma_m = if cos_sq_alpha != 0.0 {
                cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
            } else {
                0.0
            };
            let c = f / 16.0 * cos_sq_alpha * (4.0 + f * (4.0 - 3.0 * cos_sq_alpha));
            let previous = lambda;
            lambda = l
                + (1.0 - c)
                    * f
                    * sin_alpha
                    * (sigma
                        + c * sin_sigma
                            * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));

            if (lambda - previous).abs() < CONVERGENCE {
                let u_sq = cos_sq_alpha * (major * major - minor * minor) / (minor * minor);
                let big_a =
                    1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
                let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
                let delta_sigma = big_b
                    * sin_sigma
                    * (cos_2sigma_m
                        + big_b / 4.0
                            * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)
                                - big_b / 6.0
                                    * cos_2sigma_m
                                    * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                                    * (-3.0 + 4.0 * cos_2sigma_m * cos_2sigma_m)));
                return Some((minor * big_a * (sigma - delta_sigma)).abs());
            }
        }
        None
    }

    fn great_circle(&self, a: Coordinate, b: Coordinate) -> f64 {
        let phi1 = a.latitude.to_radians();
        let phi2 = b.latitude.to_radians();
        let d_phi = phi2 - phi1;
        let d_lambda = (b.longitude - a.longitude).to_radians();
        let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        2.0 * self.ellipsoid.mean_radius() * h.sqrt().min(1.0).asin()
    }
}

fn wrap_longitude(radians: f64) -> f64 {
    use std::f64::consts::PI;
    let mut value = radians;
    while value > PI {
        value -= 2.0 * PI;
    }
    while value < -PI {
        value += 2.0 * PI;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    #[test]
    fn test_coordinate_range() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
        assert!(matches!(
            Coordinate::new(90.5, 0.0),
            Err(VerifyError::InvalidCoordinate { .. })
        ));
        assert!(Coordinate::new(0.0, -180.1).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_coordinate_deserialize_validates() {
        let ok: Coordinate = serde_json::from_str(r#"{"latitude": 37.5, "longitude": 127.0}"#).unwrap();
        assert_eq!(ok.latitude(), 37.5);
        let bad = serde_json::from_str::<Coordinate>(r#"{"latitude": 137.5, "longitude": 127.0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_identical_points() {
        let validator = GeoValidator::default();
        let p = coord(37.5665, 126.9780);
        let check = validator.check(p, p, 0.0);
        assert_eq!(check.distance_meters, 0.0);
        assert!(check.pass);
    }

    #[test]
    fn test_flinders_peak_to_buninyong() {
        // Vincenty (1975) reference pair
        let validator = GeoValidator::default();
        let flinders = coord(-37.951_033_416_7, 144.424_867_888_9);
        let buninyong = coord(-37.652_821_138_9, 143.926_495_527_8);
        let distance = validator.distance_meters(flinders, buninyong);
        assert!((distance - 54_972.271).abs() < 0.5, "got {}", distance);
    }

    #[test]
    fn test_short_distances_near_seoul() {
        let validator = GeoValidator::default();
        let target = coord(37.5665, 126.9780);

        let ten_north = coord(37.5665 + 0.00009, 126.9780);
        let d = validator.distance_meters(target, ten_north);
        assert!((9.5..10.5).contains(&d), "got {}", d);

        let eighty_north = coord(37.5665 + 0.00072, 126.9780);
        let check = validator.check(target, eighty_north, 50.0);
        assert!((79.0..81.0).contains(&check.distance_meters));
        assert!(!check.pass);
    }

    #[test]
    fn test_symmetry() {
        let validator = GeoValidator::default();
        let pairs = [
            (coord(37.5665, 126.9780), coord(35.1796, 129.0756)),
            (coord(0.0, 0.0), coord(0.0, 90.0)),
            (coord(-33.8688, 151.2093), coord(51.5074, -0.1278)),
            (coord(10.0, 179.9), coord(10.0, -179.9)),
        ];
        for (a, b) in pairs {
            let ab = validator.distance_meters(a, b);
            let ba = validator.distance_meters(b, a);
            assert!(ab >= 0.0);
            assert!((ab - ba).abs() < 1e-3, "{} vs {}", ab, ba);
        }
    }

    #[test]
    fn test_antimeridian_is_short() {
        let validator = GeoValidator::default();
        let d = validator.distance_meters(coord(10.0, 179.9), coord(10.0, -179.9));
        assert!(d < 25_000.0, "got {}", d);
    }

    #[test]
    fn test_near_antipodal_falls_back() {
        let validator = GeoValidator::default();
        let d = validator.distance_meters(coord(0.0, 0.0), coord(0.5, 179.7));
        assert!(d.is_finite());
        assert!(d > 19_000_000.0 && d < 20_100_000.0, "got {}", d);
    }
}
