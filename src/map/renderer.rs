use glam::IVec2;

use crate::braille::BrailleCanvas;
use crate::geo::Coordinate;
use crate::map::geometry::{draw_pin, draw_polyline};
use crate::map::projection::Viewport;

/// A geographic line
pub type LineString = Vec<Coordinate>;

/// Level of detail for map data
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lod {
    Low,    // 110m - world view
    Medium, // 50m - continental
    High,   // 10m - regional
}

impl Lod {
    /// Select LOD based on zoom level
    pub fn from_zoom(zoom: f64) -> Self {
        if zoom < 2.0 {
            Lod::Low
        } else if zoom < 8.0 {
            Lod::Medium
        } else {
            Lod::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Lod::Low => "110m",
            Lod::Medium => "50m",
            Lod::High => "10m",
        }
    }
}

/// A fixed labelled point drawn under the markers
#[derive(Clone, Debug)]
pub struct Landmark {
    pub id: &'static str,
    pub at: Coordinate,
    pub title: String,
    pub radius: i32,
}

/// Display settings for map layers
#[derive(Clone, Debug)]
pub struct DisplaySettings {
    pub show_coastlines: bool,
    pub show_borders: bool,
    pub show_labels: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_coastlines: true,
            show_borders: true,
            show_labels: true,
        }
    }
}

/// Rendered base map, one canvas per colour
pub struct MapLayers {
    pub coastlines: BrailleCanvas,
    pub borders: BrailleCanvas,
    pub landmarks: BrailleCanvas,
    /// (column, row, text) in character cells
    pub labels: Vec<(u16, u16, String)>,
}

/// Base map: multi-resolution coastlines, borders and landmarks
#[derive(Clone, Default)]
pub struct MapRenderer {
    coastlines_low: Vec<LineString>,
    coastlines_medium: Vec<LineString>,
    coastlines_high: Vec<LineString>,
    borders_medium: Vec<LineString>,
    borders_high: Vec<LineString>,
    landmarks: Vec<Landmark>,
    pub settings: DisplaySettings,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get coastlines for the given LOD, falling back to coarser data
    fn coastlines(&self, lod: Lod) -> &[LineString] {
        let candidates: &[&Vec<LineString>] = match lod {
            Lod::High => &[
                &self.coastlines_high,
                &self.coastlines_medium,
                &self.coastlines_low,
            ],
            Lod::Medium => &[&self.coastlines_medium, &self.coastlines_low],
            Lod::Low => &[&self.coastlines_low, &self.coastlines_medium],
        };
        candidates
            .iter()
            .find(|lines| !lines.is_empty())
            .map_or(&[][..], |lines| lines.as_slice())
    }

    fn borders(&self, lod: Lod) -> &[LineString] {
        match lod {
            Lod::High if !self.borders_high.is_empty() => &self.borders_high,
            _ => &self.borders_medium,
        }
    }

    /// Render base layers for a `width` x `height` character area
    pub fn render(&self, width: usize, height: usize, viewport: &Viewport) -> MapLayers {
        let lod = Lod::from_zoom(viewport.zoom);
        let mut layers = MapLayers {
            coastlines: BrailleCanvas::new(width, height),
            borders: BrailleCanvas::new(width, height),
            landmarks: BrailleCanvas::new(width, height),
            labels: Vec::new(),
        };

        if self.settings.show_coastlines {
            for line in self.coastlines(lod) {
                draw_polyline(&mut layers.coastlines, line, viewport);
            }
        }

        if self.settings.show_borders {
            for line in self.borders(lod) {
                draw_polyline(&mut layers.borders, line, viewport);
            }
        }

        for landmark in &self.landmarks {
            let (px, py) = viewport.project(landmark.at);
            if !viewport.is_visible(px, py) {
                continue;
            }
            draw_pin(&mut layers.landmarks, IVec2::new(px, py), landmark.radius);

            // Label sits above the point, centred
            if self.settings.show_labels {
                let char_x = (px / 2) as u16;
                let char_y = (py / 4) as u16;
                let half = (landmark.title.chars().count() / 2) as u16;
                if let Some(label_y) = char_y.checked_sub(1) {
                    layers.labels.push((
                        char_x.saturating_sub(half),
                        label_y,
                        landmark.title.clone(),
                    ));
                }
            }
        }

        layers
    }

    /// Add coastline data at a specific LOD
    pub fn add_coastline(&mut self, line: LineString, lod: Lod) {
        if line.len() < 2 {
            return;
        }
        match lod {
            Lod::Low => self.coastlines_low.push(line),
            Lod::Medium => self.coastlines_medium.push(line),
            Lod::High => self.coastlines_high.push(line),
        }
    }

    /// Add border data at a specific LOD
    pub fn add_border(&mut self, line: LineString, lod: Lod) {
        if line.len() < 2 {
            return;
        }
        match lod {
            Lod::High => self.borders_high.push(line),
            Lod::Low | Lod::Medium => self.borders_medium.push(line),
        }
    }

    /// Add a labelled point, replacing one with the same id
    pub fn add_landmark(&mut self, landmark: Landmark) {
        self.landmarks.retain(|l| l.id != landmark.id);
        self.landmarks.push(landmark);
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    /// Check if any coastline data is loaded
    pub fn has_data(&self) -> bool {
        !self.coastlines_low.is_empty()
            || !self.coastlines_medium.is_empty()
            || !self.coastlines_high.is_empty()
    }

    pub fn toggle_labels(&mut self) {
        self.settings.show_labels = !self.settings.show_labels;
    }

    pub fn toggle_borders(&mut self) {
        self.settings.show_borders = !self.settings.show_borders;
    }
}
