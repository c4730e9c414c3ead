use std::collections::HashMap;

use tracing::{debug, info};

use super::{Control, MapSurface, MarkerHandle, MarkerStyle, PopupHandle};
use crate::error::{MapError, SurfaceError};
use crate::geo::{Bounds, Coordinate, RIYADH};
use crate::map::{Landmark, MapLayers, MapRenderer, Viewport};
use crate::overlay::PopupContent;

/// Pixels kept clear around fitted bounds
const FIT_PADDING: usize = 6;
/// Longest scale bar, in character cells
const SCALE_MAX_CELLS: f64 = 12.0;

/// Size of the map pane in character cells
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContainerSize {
    pub cols: u16,
    pub rows: u16,
}

impl ContainerSize {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    pub fn has_area(&self) -> bool {
        self.cols > 0 && self.rows > 0
    }
}

/// A marker placed on a character cell
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedMarker {
    pub handle: MarkerHandle,
    pub col: u16,
    pub row: u16,
    pub style: MarkerStyle,
}

/// The open popup and the cell of the marker it belongs to
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedPopup {
    pub col: u16,
    pub row: u16,
    pub content: PopupContent,
}

/// Everything the UI needs to paint the map pane for one frame
pub struct SurfaceFrame {
    pub size: ContainerSize,
    pub layers: MapLayers,
    pub markers: Vec<PlacedMarker>,
    pub popup: Option<PlacedPopup>,
    /// Zoom readout, present once the navigation control is added
    pub navigation: Option<String>,
    /// Scale bar text, present once the scale control is added
    pub scale: Option<String>,
}

struct MarkerSlot {
    at: Coordinate,
    style: MarkerStyle,
}

/// Terminal map surface drawing markers over a braille base map.
///
/// Container size changes are recorded immediately but only applied to the
/// viewport on [`MapSurface::relayout`].
pub struct BrailleSurface {
    base: MapRenderer,
    viewport: Viewport,
    container: ContainerSize,
    laid_out: ContainerSize,
    markers: HashMap<MarkerHandle, MarkerSlot>,
    popups: HashMap<PopupHandle, MarkerHandle>,
    open: Option<(PopupHandle, PopupContent)>,
    controls: Vec<Control>,
    next_handle: u64,
    relayouts: usize,
    torn_down: bool,
}

impl BrailleSurface {
    /// Create the surface for a mounted container.
    ///
    /// Fails when the container has no area yet or the centre/zoom are
    /// unusable; the caller retries once the container has been laid out.
    pub fn initialize(
        container: ContainerSize,
        center: Coordinate,
        zoom_level: f64,
        mut base: MapRenderer,
    ) -> Result<Self, MapError> {
        if !container.has_area() {
            return Err(MapError::MapInit(format!(
                "container has no area ({}x{})",
                container.cols, container.rows
            )));
        }
        if !center.is_valid() {
            return Err(MapError::MapInit(format!("invalid centre {center:?}")));
        }
        if !zoom_level.is_finite() {
            return Err(MapError::MapInit(format!("invalid zoom {zoom_level}")));
        }

        base.add_landmark(Landmark {
            id: "riyadh",
            at: RIYADH,
            title: "Riyadh".to_string(),
            radius: 1,
        });

        let viewport = Viewport::new(
            center,
            Viewport::zoom_from_level(zoom_level),
            container.cols as usize * 2,
            container.rows as usize * 4,
        );
        info!(
            cols = container.cols,
            rows = container.rows,
            level = viewport.level(),
            "map surface initialized"
        );

        Ok(Self {
            base,
            viewport,
            container,
            laid_out: container,
            markers: HashMap::new(),
            popups: HashMap::new(),
            open: None,
            controls: Vec::new(),
            next_handle: 0,
            relayouts: 0,
            torn_down: false,
        })
    }

    fn live(&self) -> Result<(), SurfaceError> {
        if self.torn_down {
            Err(SurfaceError::TornDown)
        } else {
            Ok(())
        }
    }

    fn next(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    /// Record the container's current size. Takes effect on the next relayout.
    pub fn set_container_size(&mut self, size: ContainerSize) -> bool {
        let changed = self.container != size;
        self.container = size;
        changed
    }

    pub fn container(&self) -> ContainerSize {
        self.container
    }

    /// Size the viewport is currently laid out for
    pub fn laid_out(&self) -> ContainerSize {
        self.laid_out
    }

    pub fn relayout_count(&self) -> usize {
        self.relayouts
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn base_mut(&mut self) -> &mut MapRenderer {
        &mut self.base
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn marker_position(&self, marker: MarkerHandle) -> Option<Coordinate> {
        self.markers.get(&marker).map(|m| m.at)
    }

    pub fn open_popup(&self) -> Option<&(PopupHandle, PopupContent)> {
        self.open.as_ref()
    }

    pub fn center_on(&mut self, at: Coordinate) {
        if at.is_valid() {
            self.viewport.center = at;
        }
    }

    fn cell_of(&self, at: Coordinate) -> Option<(u16, u16)> {
        let (px, py) = self.viewport.project(at);
        self.viewport
            .is_visible(px, py)
            .then(|| ((px / 2) as u16, (py / 4) as u16))
    }

    /// Marker under (or right next to) a character cell of the map pane
    pub fn marker_at(&self, col: u16, row: u16) -> Option<MarkerHandle> {
        self.markers
            .iter()
            .filter_map(|(&handle, slot)| {
                let (c, r) = self.cell_of(slot.at)?;
                let dist = c.abs_diff(col).max(r.abs_diff(row));
                (dist <= 1).then_some((dist, handle))
            })
            .min()
            .map(|(_, handle)| handle)
    }

    /// Paint the current state
    pub fn render(&self) -> SurfaceFrame {
        let size = self.laid_out;
        let layers = self
            .base
            .render(size.cols as usize, size.rows as usize, &self.viewport);

        let mut markers: Vec<PlacedMarker> = self
            .markers
            .iter()
            .filter_map(|(&handle, slot)| {
                let (col, row) = self.cell_of(slot.at)?;
                Some(PlacedMarker {
                    handle,
                    col,
                    row,
                    style: slot.style,
                })
            })
            .collect();
        // Newer markers paint over older ones
        markers.sort_by_key(|m| m.handle);

        let popup = self.open.as_ref().and_then(|(popup, content)| {
            let marker = self.popups.get(popup)?;
            let (col, row) = self.cell_of(self.markers.get(marker)?.at)?;
            Some(PlacedPopup {
                col,
                row,
                content: content.clone(),
            })
        });

        let navigation = self
            .controls
            .contains(&Control::Navigation)
            .then(|| format!("z{:.1}  [+/-]", self.viewport.level()));
        let scale = self
            .controls
            .contains(&Control::Scale)
            .then(|| scale_bar(self.viewport.km_per_pixel()));

        SurfaceFrame {
            size,
            layers,
            markers,
            popup,
            navigation,
            scale,
        }
    }
}

/// Pick a round distance that fits the bar and draw it, e.g. "├────┤ 2 km"
pub fn scale_bar(km_per_pixel: f64) -> String {
    // Two braille pixels per character cell
    let km_per_cell = km_per_pixel * 2.0;
    let max_km = km_per_cell * SCALE_MAX_CELLS;
    if !max_km.is_finite() || max_km <= 0.0 {
        return String::new();
    }

    let magnitude = 10f64.powf(max_km.log10().floor());
    let step = [5.0, 2.0, 1.0]
        .into_iter()
        .map(|m| m * magnitude)
        .find(|d| *d <= max_km)
        .unwrap_or(magnitude);
    let cells = ((step / km_per_cell).round() as usize).max(1);

    let label = if step >= 1.0 {
        format!("{step:.0} km")
    } else {
        format!("{:.0} m", step * 1000.0)
    };
    format!("├{}┤ {label}", "─".repeat(cells))
}

impl MapSurface for BrailleSurface {
    fn add_control(&mut self, control: Control) -> Result<(), SurfaceError> {
        self.live()?;
        if !self.controls.contains(&control) {
            self.controls.push(control);
        }
        Ok(())
    }

    fn add_marker(
        &mut self,
        at: Coordinate,
        style: MarkerStyle,
    ) -> Result<MarkerHandle, SurfaceError> {
        self.live()?;
        let handle = MarkerHandle(self.next());
        self.markers.insert(handle, MarkerSlot { at, style });
        Ok(handle)
    }

    fn move_marker(&mut self, marker: MarkerHandle, to: Coordinate) -> Result<(), SurfaceError> {
        self.live()?;
        let slot = self
            .markers
            .get_mut(&marker)
            .ok_or(SurfaceError::UnknownMarker(marker))?;
        slot.at = to;
        Ok(())
    }

    fn remove_marker(&mut self, marker: MarkerHandle) -> Result<(), SurfaceError> {
        self.live()?;
        self.markers
            .remove(&marker)
            .ok_or(SurfaceError::UnknownMarker(marker))?;
        Ok(())
    }

    fn bind_popup(&mut self, marker: MarkerHandle) -> Result<PopupHandle, SurfaceError> {
        self.live()?;
        if !self.markers.contains_key(&marker) {
            return Err(SurfaceError::UnknownMarker(marker));
        }
        let handle = PopupHandle(self.next());
        self.popups.insert(handle, marker);
        Ok(handle)
    }

    fn show_popup(&mut self, popup: PopupHandle, content: PopupContent) -> Result<(), SurfaceError> {
        self.live()?;
        if !self.popups.contains_key(&popup) {
            return Err(SurfaceError::UnknownPopup(popup));
        }
        self.open = Some((popup, content));
        Ok(())
    }

    fn close_popup(&mut self) -> Result<(), SurfaceError> {
        self.live()?;
        self.open = None;
        Ok(())
    }

    fn release_popup(&mut self, popup: PopupHandle) -> Result<(), SurfaceError> {
        self.live()?;
        self.popups
            .remove(&popup)
            .ok_or(SurfaceError::UnknownPopup(popup))?;
        if self.open.as_ref().is_some_and(|(open, _)| *open == popup) {
            self.open = None;
        }
        Ok(())
    }

    fn relayout(&mut self) -> Result<(), SurfaceError> {
        self.live()?;
        let size = self.container;
        if size.has_area() {
            self.viewport.width = size.cols as usize * 2;
            self.viewport.height = size.rows as usize * 4;
        }
        self.laid_out = size;
        self.relayouts += 1;
        debug!(cols = size.cols, rows = size.rows, "map relayout");
        Ok(())
    }

    fn fit_bounds(&mut self, bounds: Bounds) -> Result<(), SurfaceError> {
        self.live()?;
        self.viewport.fit_bounds(bounds, FIT_PADDING);
        Ok(())
    }

    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.open = None;
        self.popups.clear();
        self.markers.clear();
        self.controls.clear();
        info!("map surface torn down");
    }

    fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

#[cfg(test)]
mod tests {
    use ratatui::style::Color;

    use super::*;

    const DOT: MarkerStyle = MarkerStyle {
        glyph: '●',
        color: Color::White,
    };

    fn surface() -> BrailleSurface {
        BrailleSurface::initialize(ContainerSize::new(40, 20), RIYADH, 11.0, MapRenderer::new())
            .unwrap()
    }

    #[test]
    fn test_initialize_requires_area() {
        let err = BrailleSurface::initialize(
            ContainerSize::new(0, 20),
            RIYADH,
            11.0,
            MapRenderer::new(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, MapError::MapInit(_)));

        let bad_centre = Coordinate { lat: 120.0, lng: 0.0 };
        assert!(BrailleSurface::initialize(
            ContainerSize::new(10, 10),
            bad_centre,
            11.0,
            MapRenderer::new()
        )
        .is_err());
    }

    #[test]
    fn test_initialize_adds_base_layers() {
        let s = surface();
        let frame = s.render();
        assert_eq!(frame.layers.labels.len(), 1);
        assert_eq!(frame.layers.labels[0].2, "Riyadh");
        assert!(frame.markers.is_empty());
    }

    #[test]
    fn test_handles_never_reused() {
        let mut s = surface();
        let a = s.add_marker(RIYADH, DOT).unwrap();
        s.remove_marker(a).unwrap();
        let b = s.add_marker(RIYADH, DOT).unwrap();
        assert!(b > a);
        assert_eq!(s.remove_marker(a), Err(SurfaceError::UnknownMarker(a)));
        assert_eq!(s.marker_count(), 1);
    }

    #[test]
    fn test_popup_requires_marker() {
        let mut s = surface();
        let m = s.add_marker(RIYADH, DOT).unwrap();
        let p = s.bind_popup(m).unwrap();
        s.show_popup(p, PopupContent::default()).unwrap();
        assert!(s.render().popup.is_some());

        s.release_popup(p).unwrap();
        assert!(s.open_popup().is_none());
        assert_eq!(s.release_popup(p), Err(SurfaceError::UnknownPopup(p)));
        assert_eq!(
            s.bind_popup(MarkerHandle(999)),
            Err(SurfaceError::UnknownMarker(MarkerHandle(999)))
        );
    }

    #[test]
    fn test_relayout_applies_pending_size() {
        let mut s = surface();
        assert!(s.set_container_size(ContainerSize::new(60, 20)));
        assert_eq!(s.viewport().width, 80);
        assert_eq!(s.render().size, ContainerSize::new(40, 20));

        s.relayout().unwrap();
        assert_eq!(s.viewport().width, 120);
        assert_eq!(s.laid_out(), ContainerSize::new(60, 20));
        assert_eq!(s.relayout_count(), 1);
    }

    #[test]
    fn test_marker_hit_testing() {
        let mut s = surface();
        let m = s.add_marker(RIYADH, DOT).unwrap();
        // Centre of a 40x20 pane
        assert_eq!(s.marker_at(20, 10), Some(m));
        assert_eq!(s.marker_at(21, 11), Some(m));
        assert_eq!(s.marker_at(0, 0), None);

        let frame = s.render();
        assert_eq!(frame.markers.len(), 1);
        assert_eq!((frame.markers[0].col, frame.markers[0].row), (20, 10));
    }

    #[test]
    fn test_teardown_is_final_and_idempotent() {
        let mut s = surface();
        let m = s.add_marker(RIYADH, DOT).unwrap();
        s.teardown();
        s.teardown();
        assert!(s.is_torn_down());
        assert_eq!(s.remove_marker(m), Err(SurfaceError::TornDown));
        assert_eq!(s.relayout(), Err(SurfaceError::TornDown));
        assert_eq!(s.add_control(Control::Scale), Err(SurfaceError::TornDown));
        assert_eq!(s.marker_count(), 0);
    }

    #[test]
    fn test_controls_render_text() {
        let mut s = surface();
        assert!(s.render().navigation.is_none());
        s.add_control(Control::Navigation).unwrap();
        s.add_control(Control::Scale).unwrap();
        let frame = s.render();
        assert_eq!(frame.navigation.as_deref(), Some("z11.0  [+/-]"));
        assert!(frame.scale.is_some_and(|bar| bar.starts_with('├')));
    }

    #[test]
    fn test_scale_bar_round_steps() {
        // 1 km per cell, 12 km available -> 10 km bar
        assert_eq!(scale_bar(0.5), format!("├{}┤ 10 km", "─".repeat(10)));
        // 50 m per cell -> 500 m bar over 10 cells
        assert_eq!(scale_bar(0.025), format!("├{}┤ 500 m", "─".repeat(10)));
        assert_eq!(scale_bar(0.0), "");
    }
}
