//! Six-pointed star outline generation.

use crate::models::PlanarOffset;

/// Points in a closed star outline: twelve vertices plus the closing point.
pub const STAR_POINT_COUNT: usize = 13;

const STEP_DEG: f64 = 30.0;

/// Generate the vertex offsets of a closed six-pointed star.
///
/// Point `i` sits at `i * 30°` from north. Even indices use `outer_radius`,
/// odd indices use `inner_radius`. The last point closes the outline and is
/// an exact copy of the first.
///
/// Radius ordering is not checked: an inner radius at or above the outer
/// radius still yields a well-formed (convex or self-intersecting) polygon.
pub fn star_points(outer_radius: f64, inner_radius: f64) -> [PlanarOffset; STAR_POINT_COUNT] {
    let mut points = [PlanarOffset::default(); STAR_POINT_COUNT];

    for (i, point) in points.iter_mut().enumerate() {
        let angle = (i as f64 * STEP_DEG).to_radians();
        let radius = if i % 2 == 0 { outer_radius } else { inner_radius };
        *point = PlanarOffset::new(radius * angle.cos(), radius * angle.sin());
    }

    // cos/sin of 2π are not exact
    points[STAR_POINT_COUNT - 1] = points[0];
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn radius(point: &PlanarOffset) -> f64 {
        point.north.hypot(point.east)
    }

    #[test]
    fn test_star_has_thirteen_closed_points() {
        let points = star_points(50.0, 28.0);

        assert_eq!(points.len(), 13);
        assert_eq!(points[0], points[12]);
    }

    #[test]
    fn test_star_reference_points() {
        let points = star_points(50.0, 28.0);

        assert_eq!(points[0], PlanarOffset::new(50.0, 0.0));
        assert!((points[1].north - 24.249).abs() < 0.001);
        assert!((points[1].east - 14.0).abs() < 1e-9);
        assert_eq!(points[12], PlanarOffset::new(50.0, 0.0));
    }

    #[test]
    fn test_star_alternates_radii() {
        let points = star_points(40.0, 22.4);

        for (i, point) in points.iter().enumerate() {
            let expected = if i % 2 == 0 { 40.0 } else { 22.4 };
            assert!(
                (radius(point) - expected).abs() < 1e-9,
                "point {} has radius {}",
                i,
                radius(point)
            );
        }
    }

    #[test]
    fn test_star_angles_step_by_thirty_degrees() {
        let points = star_points(10.0, 10.0);

        for (i, point) in points.iter().enumerate().take(12) {
            let mut angle = point.east.atan2(point.north).to_degrees();
            if angle < 0.0 {
                angle += 360.0;
            }
            assert!((angle - i as f64 * 30.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_inverted_radii_still_generate() {
        let points = star_points(10.0, 30.0);

        assert_eq!(points.len(), 13);
        assert_eq!(points[0], points[12]);
        assert!((radius(&points[1]) - 30.0).abs() < 1e-9);
    }
}
