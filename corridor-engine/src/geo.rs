//! Great-circle distance
//!
//! Haversine formula over a spherical Earth. Accurate to well under a meter at
//! the few-hundred-meter scale the proximity threshold works at.

/// Earth mean radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Distance in meters between two latitude/longitude points (degrees)
///
/// Symmetric in its two points and zero when they coincide.
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1.0 for antipodal points
    let a = a.clamp(0.0, 1.0);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNAL_1: (f64, f64) = (12.9716, 77.5946);
    const SIGNAL_3: (f64, f64) = (12.9800, 77.6000);

    #[test]
    fn test_zero_distance() {
        assert_eq!(distance(SIGNAL_1.0, SIGNAL_1.1, SIGNAL_1.0, SIGNAL_1.1), 0.0);
    }

    #[test]
    fn test_symmetry() {
        let points = [
            SIGNAL_1,
            SIGNAL_3,
            (13.5, 78.0),
            (-33.8688, 151.2093),
            (51.5074, -0.1278),
            (0.0, 180.0),
        ];
        for a in &points {
            for b in &points {
                let ab = distance(a.0, a.1, b.0, b.1);
                let ba = distance(b.0, b.1, a.0, a.1);
                assert!((ab - ba).abs() < 1e-6, "{:?} <-> {:?}: {} vs {}", a, b, ab, ba);
                assert!(ab >= 0.0);
            }
        }
    }

    #[test]
    fn test_known_distance() {
        // Signal 1 to signal 3 is roughly 1.1 km
        let d = distance(SIGNAL_1.0, SIGNAL_1.1, SIGNAL_3.0, SIGNAL_3.1);
        assert!(d > 1_050.0 && d < 1_200.0, "got {}", d);

        // One degree of latitude along a meridian
        let d = distance(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_195.0).abs() < 1.0, "got {}", d);
    }

    #[test]
    fn test_monotonic_in_separation() {
        let mut previous = 0.0;
        for step in 1..=90 {
            let d = distance(0.0, 0.0, 0.0, step as f64 * 2.0);
            assert!(d > previous);
            previous = d;
        }
    }

    #[test]
    fn test_antipodal_is_finite() {
        let d = distance(0.0, 0.0, 0.0, 180.0);
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_M).abs() < 1.0);
    }
}
