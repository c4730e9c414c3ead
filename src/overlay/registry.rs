use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::SurfaceError;
use crate::records::{GeoRecord, RecordId, SourceKind};
use crate::surface::{MapSurface, MarkerHandle, MarkerStyle, PopupHandle};

/// One record's marker and popup binding. Released exactly once, by value.
#[derive(Debug)]
pub struct OverlayEntry {
    record: Arc<GeoRecord>,
    marker: MarkerHandle,
    popup: PopupHandle,
}

impl OverlayEntry {
    fn create<S: MapSurface + ?Sized>(
        record: Arc<GeoRecord>,
        surface: &mut S,
    ) -> Result<Self, SurfaceError> {
        let marker = surface.add_marker(record.coordinate, MarkerStyle::for_record(&record))?;
        let popup = match surface.bind_popup(marker) {
            Ok(popup) => popup,
            Err(e) => {
                let _ = surface.remove_marker(marker);
                return Err(e);
            }
        };
        Ok(Self {
            record,
            marker,
            popup,
        })
    }

    fn destroy<S: MapSurface + ?Sized>(self, surface: &mut S) {
        if let Err(e) = surface.release_popup(self.popup) {
            warn!(id = %self.record.id, error = %e, "popup release failed");
        }
        if let Err(e) = surface.remove_marker(self.marker) {
            warn!(id = %self.record.id, error = %e, "marker removal failed");
        }
    }

    pub fn record(&self) -> &Arc<GeoRecord> {
        &self.record
    }

    pub fn marker(&self) -> MarkerHandle {
        self.marker
    }

    pub fn popup(&self) -> PopupHandle {
        self.popup
    }
}

/// Outcome counts of one reconcile pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub created: usize,
    pub destroyed: usize,
    /// Kept, but the re-fetched record sits somewhere else now
    pub moved: usize,
    pub retained: usize,
}

impl ReconcileStats {
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.destroyed == 0 && self.moved == 0
    }
}

/// Live overlays keyed by `(source, record id)`.
///
/// The two sources never share entries and are reconciled independently.
#[derive(Default)]
pub struct OverlayRegistry {
    sources: HashMap<SourceKind, BTreeMap<RecordId, OverlayEntry>>,
    by_marker: HashMap<MarkerHandle, (SourceKind, RecordId)>,
}

impl OverlayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring `source`'s overlays in line with `desired`.
    ///
    /// Entries whose id is in both sets are left alone (a changed coordinate
    /// moves the marker in place, or replaces the entry if the move fails);
    /// only the difference is created or destroyed. Destroys run before
    /// creates.
    pub fn reconcile<S: MapSurface + ?Sized>(
        &mut self,
        source: SourceKind,
        desired: &[Arc<GeoRecord>],
        surface: &mut S,
    ) -> ReconcileStats {
        let mut stats = ReconcileStats::default();
        let wanted: HashSet<&RecordId> = desired.iter().map(|r| &r.id).collect();

        let entries = self.sources.entry(source).or_default();

        let stale: Vec<RecordId> = entries
            .keys()
            .filter(|id| !wanted.contains(id))
            .cloned()
            .collect();
        for id in stale {
            if let Some(entry) = entries.remove(&id) {
                self.by_marker.remove(&entry.marker);
                entry.destroy(surface);
                stats.destroyed += 1;
            }
        }

        for record in desired {
            if let Some(entry) = entries.get_mut(&record.id) {
                if entry.record.coordinate == record.coordinate {
                    stats.retained += 1;
                    if !Arc::ptr_eq(&entry.record, record) {
                        entry.record = Arc::clone(record);
                    }
                    continue;
                }
                match surface.move_marker(entry.marker, record.coordinate) {
                    Ok(()) => {
                        stats.moved += 1;
                        entry.record = Arc::clone(record);
                        continue;
                    }
                    Err(e) => {
                        warn!(id = %record.id, error = %e, "marker move failed, replacing it");
                        if let Some(stuck) = entries.remove(&record.id) {
                            self.by_marker.remove(&stuck.marker);
                            stuck.destroy(surface);
                            stats.destroyed += 1;
                        }
                    }
                }
            }

            match OverlayEntry::create(Arc::clone(record), surface) {
                Ok(entry) => {
                    debug_assert!(
                        !self.by_marker.contains_key(&entry.marker),
                        "marker handle shared by two entries"
                    );
                    self.by_marker
                        .insert(entry.marker, (source, record.id.clone()));
                    entries.insert(record.id.clone(), entry);
                    stats.created += 1;
                }
                // Left unregistered; the next reconcile tries again
                Err(e) => warn!(id = %record.id, error = %e, "could not place marker"),
            }
        }

        if !stats.is_noop() {
            debug!(
                %source,
                created = stats.created,
                destroyed = stats.destroyed,
                moved = stats.moved,
                retained = stats.retained,
                "overlays reconciled"
            );
        }
        stats
    }

    /// Destroy every entry of every source
    pub fn clear<S: MapSurface + ?Sized>(&mut self, surface: &mut S) -> usize {
        let mut destroyed = 0;
        for (_, entries) in self.sources.drain() {
            for (_, entry) in entries {
                entry.destroy(surface);
                destroyed += 1;
            }
        }
        self.by_marker.clear();
        destroyed
    }

    pub fn get(&self, source: SourceKind, id: &RecordId) -> Option<&OverlayEntry> {
        self.sources.get(&source)?.get(id)
    }

    /// Entry owning `marker`, for hit-testing
    pub fn by_marker(&self, marker: MarkerHandle) -> Option<(SourceKind, &OverlayEntry)> {
        let (source, id) = self.by_marker.get(&marker)?;
        Some((*source, self.get(*source, id)?))
    }

    pub fn len(&self, source: SourceKind) -> usize {
        self.sources.get(&source).map_or(0, BTreeMap::len)
    }

    pub fn total(&self) -> usize {
        self.sources.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn contains(&self, source: SourceKind, id: &RecordId) -> bool {
        self.get(source, id).is_some()
    }

    /// All entries, venues first, each source ordered by id
    pub fn iter(&self) -> impl Iterator<Item = (SourceKind, &OverlayEntry)> + '_ {
        SourceKind::ALL.into_iter().flat_map(move |source| {
            self.sources
                .get(&source)
                .into_iter()
                .flat_map(|entries| entries.values())
                .map(move |entry| (source, entry))
        })
    }
}
