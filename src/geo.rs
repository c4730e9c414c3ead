/// A geographic position. Always stored latitude first.
///
/// Sources disagree on axis order (named `lat`/`lng` objects, `[lat, lng]`
/// arrays, GeoJSON `[lng, lat]` pairs), so every conversion goes through one
/// of the explicitly named constructors below.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    /// Build from a latitude/longitude pair, validating the range
    pub fn from_lat_lng(lat: f64, lng: f64) -> Option<Self> {
        let c = Self { lat, lng };
        c.is_valid().then_some(c)
    }

    /// Build from a longitude/latitude pair (GeoJSON order)
    pub fn from_lng_lat(lng: f64, lat: f64) -> Option<Self> {
        Self::from_lat_lng(lat, lng)
    }

    /// Finite and inside [-90, 90] x [-180, 180]
    #[inline(always)]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Format as "24.7°N, 46.7°E"
    pub fn to_compass_string(&self) -> String {
        format!(
            "{:.4}°{}, {:.4}°{}",
            self.lat.abs(),
            if self.lat >= 0.0 { "N" } else { "S" },
            self.lng.abs(),
            if self.lng >= 0.0 { "E" } else { "W" }
        )
    }
}

/// Centre of Riyadh
pub const RIYADH: Coordinate = Coordinate {
    lat: 24.6911,
    lng: 46.7167,
};

/// Axis-aligned bounds accumulated from a set of coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub south_west: Coordinate,
    pub north_east: Coordinate,
}

impl Bounds {
    /// Smallest bounds containing every coordinate, `None` for an empty set
    pub fn enclosing(coords: impl IntoIterator<Item = Coordinate>) -> Option<Self> {
        let mut iter = coords.into_iter();
        let first = iter.next()?;
        let mut bounds = Self {
            south_west: first,
            north_east: first,
        };
        for c in iter {
            bounds.extend(c);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, c: Coordinate) {
        self.south_west.lat = self.south_west.lat.min(c.lat);
        self.south_west.lng = self.south_west.lng.min(c.lng);
        self.north_east.lat = self.north_east.lat.max(c.lat);
        self.north_east.lng = self.north_east.lng.max(c.lng);
    }

    pub fn is_point(&self) -> bool {
        self.south_west == self.north_east
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_order_constructors_agree() {
        let a = Coordinate::from_lat_lng(24.69, 46.72).unwrap();
        let b = Coordinate::from_lng_lat(46.72, 24.69).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.lat, 24.69);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(Coordinate::from_lat_lng(91.0, 0.0).is_none());
        assert!(Coordinate::from_lat_lng(0.0, -180.5).is_none());
        assert!(Coordinate::from_lat_lng(f64::NAN, 0.0).is_none());
        // Swapped Riyadh axes still pass validation
        assert!(Coordinate::from_lat_lng(46.72, 24.69).is_some());
        assert!(Coordinate::from_lat_lng(124.69, 46.72).is_none());
    }

    #[test]
    fn test_bounds_enclosing() {
        let pts = [
            Coordinate::from_lat_lng(24.0, 46.0).unwrap(),
            Coordinate::from_lat_lng(25.0, 45.5).unwrap(),
            Coordinate::from_lat_lng(24.5, 47.0).unwrap(),
        ];
        let b = Bounds::enclosing(pts).unwrap();
        assert_eq!(b.south_west, Coordinate { lat: 24.0, lng: 45.5 });
        assert_eq!(b.north_east, Coordinate { lat: 25.0, lng: 47.0 });
        assert!(!b.is_point());
        assert!(Bounds::enclosing(std::iter::empty()).is_none());
    }
}
