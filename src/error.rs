use thiserror::Error;

use crate::records::SourceKind;
use crate::surface::{MarkerHandle, PopupHandle};

/// Failures that surface to the application shell
#[derive(Debug, Error)]
pub enum MapError {
    /// Network or decode failure on one of the point sources
    #[error("failed to load {kind}: {reason}")]
    DataFetch { kind: SourceKind, reason: String },

    /// The map surface could not be created for this mount
    #[error("map unavailable: {0}")]
    MapInit(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Misuse of map surface handles
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("map surface already torn down")]
    TornDown,

    #[error("marker {0:?} is not on the map")]
    UnknownMarker(MarkerHandle),

    #[error("popup {0:?} is not bound")]
    UnknownPopup(PopupHandle),
}
