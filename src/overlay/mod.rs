//! Markers and popups derived from records and the user's filter.

pub mod filter;
pub mod popup;
pub mod registry;

pub use filter::{visible, FilterState};
pub use popup::{Photo, PopupContent};
pub use registry::{OverlayEntry, OverlayRegistry, ReconcileStats};
