use std::f64::consts::PI;

use glam::DVec2;

use crate::geo::{Bounds, Coordinate};

/// Web Mercator stops being useful past this latitude
const MAX_LAT: f64 = 85.051_128_78;
/// Zoom multipliers; 1.0 fits the whole world across the canvas
pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 131_072.0; // 2^17
/// Zoom level used when fitting a single point
const POINT_FIT_LEVEL: f64 = 15.0;
const EARTH_CIRCUMFERENCE_KM: f64 = 40_075.016_686;

/// Normalized Web Mercator position: x and y in [0, 1], y growing south
#[inline(always)]
fn mercator(c: Coordinate) -> DVec2 {
    let lat_rad = c.lat.clamp(-MAX_LAT, MAX_LAT).to_radians();
    DVec2::new(
        (c.lng + 180.0) / 360.0,
        (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0,
    )
}

#[inline(always)]
fn inverse_mercator(p: DVec2) -> Coordinate {
    let lng = p.x * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * p.y)).sinh().atan().to_degrees();
    Coordinate { lat, lng }
}

/// Visible map area: centre, zoom and canvas size in braille pixels
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    pub center: Coordinate,
    /// Zoom multiplier (higher = more zoomed in)
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(center: Coordinate, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            width,
            height,
        }
    }

    /// Convert a web-map zoom level (0 = world, 11 = city) to a multiplier
    pub fn zoom_from_level(level: f64) -> f64 {
        2f64.powf(level - 1.0).clamp(MIN_ZOOM, MAX_ZOOM)
    }

    /// Current zoom as a web-map level
    pub fn level(&self) -> f64 {
        self.zoom.log2() + 1.0
    }

    #[inline(always)]
    fn scale(&self) -> f64 {
        self.zoom * self.width.max(1) as f64
    }

    #[inline(always)]
    fn half(&self) -> DVec2 {
        DVec2::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    fn set_center_mercator(&mut self, p: DVec2) {
        let mut c = inverse_mercator(p);
        // Wrap longitude
        if c.lng > 180.0 {
            c.lng -= 360.0;
        } else if c.lng < -180.0 {
            c.lng += 360.0;
        }
        c.lat = c.lat.clamp(-MAX_LAT, MAX_LAT);
        self.center = c;
    }

    /// Project a coordinate to canvas pixels
    pub fn project(&self, c: Coordinate) -> (i32, i32) {
        let p = (mercator(c) - mercator(self.center)) * self.scale() + self.half();
        (p.x as i32, p.y as i32)
    }

    /// Canvas pixels back to a coordinate
    pub fn unproject(&self, px: i32, py: i32) -> Coordinate {
        let offset = (DVec2::new(px as f64, py as f64) - self.half()) / self.scale();
        inverse_mercator(mercator(self.center) + offset)
    }

    /// Pan by a pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let delta = DVec2::new(dx as f64, dy as f64) / self.scale();
        self.set_center_mercator(mercator(self.center) + delta);
    }

    /// Zoom in by a factor
    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * 1.5).min(MAX_ZOOM);
    }

    /// Zoom out by a factor
    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / 1.5).max(MIN_ZOOM);
    }

    /// Zoom in towards a specific pixel location
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.5);
    }

    /// Zoom out from a specific pixel location
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / 1.5);
    }

    /// Zoom by factor, keeping the coordinate under (px, py) in place
    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        let anchor = mercator(self.unproject(px, py));
        let cursor = DVec2::new(px as f64, py as f64) - self.half();
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.set_center_mercator(anchor - cursor / self.scale());
    }

    /// Centre and zoom so `bounds` fits with `padding` pixels on every side
    pub fn fit_bounds(&mut self, bounds: Bounds, padding: usize) {
        if bounds.is_point() {
            self.center = bounds.south_west;
            self.zoom = Self::zoom_from_level(POINT_FIT_LEVEL);
            return;
        }

        let a = mercator(bounds.south_west);
        let b = mercator(bounds.north_east);
        let span = (b - a).abs().max(DVec2::splat(f64::EPSILON));
        let avail = DVec2::new(
            self.width.saturating_sub(2 * padding).max(1) as f64,
            self.height.saturating_sub(2 * padding).max(1) as f64,
        );
        let width = self.width.max(1) as f64;
        let fit = (avail / (span * width)).min_element();

        self.zoom = fit.clamp(MIN_ZOOM, MAX_ZOOM);
        self.set_center_mercator((a + b) / 2.0);
    }

    /// Ground distance covered by one canvas pixel at the centre latitude
    pub fn km_per_pixel(&self) -> f64 {
        EARTH_CIRCUMFERENCE_KM * self.center.lat.to_radians().cos() / self.scale()
    }

    /// Check if a projected point is visible in the viewport
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= 0 && px < self.width as i32 && py >= 0 && py < self.height as i32
    }

    /// Check if a line segment might be visible (rough bounding box check)
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }
}
