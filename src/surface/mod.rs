//! The map surface seen by the overlay code.
//!
//! Markers and popups are owned handles: whoever receives one from
//! [`MapSurface::add_marker`] or [`MapSurface::bind_popup`] must hand it back
//! exactly once. Handles are never reused, so a stale handle is reported as
//! unknown instead of silently hitting a newer marker.

mod braille;
mod resize;

pub use braille::{BrailleSurface, ContainerSize, PlacedMarker, PlacedPopup, SurfaceFrame};
pub use resize::{ResizeCoordinator, TimerId};

use ratatui::style::Color;

use crate::error::SurfaceError;
use crate::geo::{Bounds, Coordinate};
use crate::overlay::PopupContent;
use crate::records::{Category, GeoRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PopupHandle(pub u64);

/// Map chrome that can be attached once the surface exists
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    /// Zoom readout and +/- hints, top right
    Navigation,
    /// Distance scale bar, bottom right
    Scale,
}

/// How a marker is drawn
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarkerStyle {
    pub glyph: char,
    pub color: Color,
}

impl MarkerStyle {
    pub fn for_record(record: &GeoRecord) -> Self {
        if record.is_historical() {
            return Self {
                glyph: '⚜',
                color: Color::LightYellow,
            };
        }
        let (glyph, color) = match record.category {
            Some(Category::Food) => ('●', Color::LightRed),
            Some(Category::CoffeeShop) => ('◆', Color::Rgb(0xc6, 0x8e, 0x5b)),
            Some(Category::NightlifeSpot) => ('★', Color::LightMagenta),
            Some(Category::EventVenue) => ('■', Color::LightBlue),
            Some(Category::Hotel) => ('◘', Color::LightCyan),
            Some(Category::Shop) => ('◈', Color::LightGreen),
            None => ('○', Color::White),
        };
        Self { glyph, color }
    }
}

/// Facade over the map engine.
///
/// Every method fails with [`SurfaceError::TornDown`] after
/// [`MapSurface::teardown`], which itself is idempotent.
pub trait MapSurface {
    fn add_control(&mut self, control: Control) -> Result<(), SurfaceError>;

    fn add_marker(&mut self, at: Coordinate, style: MarkerStyle)
        -> Result<MarkerHandle, SurfaceError>;

    fn move_marker(&mut self, marker: MarkerHandle, to: Coordinate) -> Result<(), SurfaceError>;

    fn remove_marker(&mut self, marker: MarkerHandle) -> Result<(), SurfaceError>;

    /// Attach an empty popup trigger to a marker. Content is supplied later by
    /// [`MapSurface::show_popup`].
    fn bind_popup(&mut self, marker: MarkerHandle) -> Result<PopupHandle, SurfaceError>;

    /// Open `popup` with `content`, closing any other open popup
    fn show_popup(&mut self, popup: PopupHandle, content: PopupContent)
        -> Result<(), SurfaceError>;

    fn close_popup(&mut self) -> Result<(), SurfaceError>;

    /// Destroy a popup binding, closing it if open
    fn release_popup(&mut self, popup: PopupHandle) -> Result<(), SurfaceError>;

    /// Re-read the container size
    fn relayout(&mut self) -> Result<(), SurfaceError>;

    fn fit_bounds(&mut self, bounds: Bounds) -> Result<(), SurfaceError>;

    fn teardown(&mut self);

    fn is_torn_down(&self) -> bool;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::Cell;
    use std::collections::{HashMap, HashSet};
    use std::rc::Rc;

    use super::*;

    /// In-memory surface that counts every call
    #[derive(Default)]
    pub struct RecordingSurface {
        pub(crate) next_handle: u64,
        pub markers: HashMap<MarkerHandle, Coordinate>,
        pub popups: HashMap<PopupHandle, MarkerHandle>,
        pub open_popup: Option<(PopupHandle, PopupContent)>,
        pub markers_added: usize,
        pub markers_removed: usize,
        pub markers_moved: usize,
        pub popups_released: usize,
        pub relayouts: usize,
        pub fits: Vec<Bounds>,
        pub controls: Vec<Control>,
        pub teardowns: usize,
        /// Make every `move_marker` call fail
        pub fail_moves: bool,
        /// Receives the number of live markers and popups at teardown
        pub live_at_teardown: Option<Rc<Cell<Option<usize>>>>,
        pub(crate) released: HashSet<u64>,
        pub(crate) torn_down: bool,
    }

    impl RecordingSurface {
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

        /// No marker or popup left alive
        pub fn is_empty(&self) -> bool {
            self.markers.is_empty() && self.popups.is_empty()
        }
    }

    impl MapSurface for RecordingSurface {
        fn add_control(&mut self, control: Control) -> Result<(), SurfaceError> {
            self.live()?;
            self.controls.push(control);
            Ok(())
        }

        fn add_marker(
            &mut self,
            at: Coordinate,
            _style: MarkerStyle,
        ) -> Result<MarkerHandle, SurfaceError> {
            self.live()?;
            let handle = MarkerHandle(self.next());
            self.markers.insert(handle, at);
            self.markers_added += 1;
            Ok(handle)
        }

        fn move_marker(&mut self, marker: MarkerHandle, to: Coordinate) -> Result<(), SurfaceError> {
            self.live()?;
            if self.fail_moves {
                return Err(SurfaceError::UnknownMarker(marker));
            }
            let slot = self
                .markers
                .get_mut(&marker)
                .ok_or(SurfaceError::UnknownMarker(marker))?;
            *slot = to;
            self.markers_moved += 1;
            Ok(())
        }

        fn remove_marker(&mut self, marker: MarkerHandle) -> Result<(), SurfaceError> {
            self.live()?;
            self.markers
                .remove(&marker)
                .ok_or(SurfaceError::UnknownMarker(marker))?;
            assert!(self.released.insert(marker.0), "marker released twice");
            self.markers_removed += 1;
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

        fn show_popup(
            &mut self,
            popup: PopupHandle,
            content: PopupContent,
        ) -> Result<(), SurfaceError> {
            self.live()?;
            if !self.popups.contains_key(&popup) {
                return Err(SurfaceError::UnknownPopup(popup));
            }
            self.open_popup = Some((popup, content));
            Ok(())
        }

        fn close_popup(&mut self) -> Result<(), SurfaceError> {
            self.live()?;
            self.open_popup = None;
            Ok(())
        }

        fn release_popup(&mut self, popup: PopupHandle) -> Result<(), SurfaceError> {
            self.live()?;
            self.popups
                .remove(&popup)
                .ok_or(SurfaceError::UnknownPopup(popup))?;
            assert!(self.released.insert(popup.0), "popup released twice");
            if self.open_popup.as_ref().is_some_and(|(open, _)| *open == popup) {
                self.open_popup = None;
            }
            self.popups_released += 1;
            Ok(())
        }

        fn relayout(&mut self) -> Result<(), SurfaceError> {
            self.live()?;
            self.relayouts += 1;
            Ok(())
        }

        fn fit_bounds(&mut self, bounds: Bounds) -> Result<(), SurfaceError> {
            self.live()?;
            self.fits.push(bounds);
            Ok(())
        }

        fn teardown(&mut self) {
            if !self.torn_down {
                self.torn_down = true;
                self.teardowns += 1;
                if let Some(sink) = &self.live_at_teardown {
                    sink.set(Some(self.markers.len() + self.popups.len()));
                }
            }
        }

        fn is_torn_down(&self) -> bool {
            self.torn_down
        }
    }
}
