//! Terminal map of trending venues and historical places.
//!
//! Two independently fetched record sets are normalized, filtered and
//! reconciled against markers on a braille Web-Mercator map.

pub mod app;
pub mod braille;
pub mod config;
pub mod controller;
pub mod data;
pub mod error;
pub mod fetch;
pub mod geo;
pub mod logging;
pub mod map;
pub mod overlay;
pub mod records;
pub mod surface;
pub mod ui;

pub use error::{MapError, SurfaceError};
