/// WGS84 semi-major axis (meters). Also the sphere radius used by ground sampling.
pub const WGS84_A: f64 = 6_378_137.0;

/// Geodesic coordinates in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LatLng {
    pub lat_deg: f64,
    pub lng_deg: f64,
}

impl LatLng {
    pub fn new(lat_deg: f64, lng_deg: f64) -> Self {
        Self { lat_deg, lng_deg }
    }

    pub fn lat_rad(self) -> f64 {
        self.lat_deg.to_radians()
    }

    pub fn is_finite(self) -> bool {
        self.lat_deg.is_finite() && self.lng_deg.is_finite()
    }
}
