//! Glue between fetched record sets, the filter and the map surface.
//!
//! The controller owns the surface, the overlay registry and the resize
//! debounce. Inputs arrive as versioned values; [`MapController::sync`] only
//! reconciles a source whose inputs changed since the last pass. Teardown
//! runs exactly once, either explicitly or on drop, and afterwards every
//! entry point is a no-op.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::fetch::{FetchOutcome, FetchTicket};
use crate::geo::{Bounds, Coordinate};
use crate::overlay::{popup, visible, FilterState, OverlayRegistry, ReconcileStats};
use crate::records::{normalize, Category, GeoRecord, RecordSet, SourceKind};
use crate::surface::{Control, MapSurface, MarkerHandle, ResizeCoordinator};

/// A value with a counter bumped on every change
#[derive(Clone, Debug)]
pub struct Versioned<T> {
    value: T,
    version: u64,
}

impl<T> Versioned<T> {
    pub fn new(value: T) -> Self {
        Self { value, version: 0 }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
        self.version += 1;
    }
}

impl<T: PartialEq> Versioned<T> {
    /// Set only if different, returning whether the version moved
    pub fn replace(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.set(value);
        true
    }
}

/// Load state of one source, shown in the sidebar
#[derive(Clone, Debug, PartialEq)]
pub enum SourceStatus {
    Idle,
    Loading,
    Loaded { count: usize, dropped: usize },
    /// The response was not a list of records
    Degraded,
    Failed(String),
}

/// What happened to a fetch outcome
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchApplied {
    Applied,
    /// A newer request for the same source was already applied
    Stale,
    /// The controller was torn down
    Ignored,
}

struct SourceState {
    records: Versioned<RecordSet>,
    status: SourceStatus,
    issued: u64,
    applied: u64,
    /// (records version, filter version) at the last reconcile
    synced: Option<(u64, u64)>,
}

impl SourceState {
    fn new() -> Self {
        Self {
            records: Versioned::new(empty_set()),
            status: SourceStatus::Idle,
            issued: 0,
            applied: 0,
            synced: None,
        }
    }
}

fn empty_set() -> RecordSet {
    Arc::from(Vec::<Arc<GeoRecord>>::new())
}

fn slot(source: SourceKind) -> usize {
    match source {
        SourceKind::Venues => 0,
        SourceKind::Historical => 1,
    }
}

pub struct MapController<S: MapSurface> {
    surface: S,
    registry: OverlayRegistry,
    resize: ResizeCoordinator,
    sources: [SourceState; 2],
    filter: Versioned<FilterState>,
    /// Marker whose popup is open, with the record its content was built from
    selected: Option<(MarkerHandle, Arc<GeoRecord>)>,
    alive: bool,
}

impl<S: MapSurface> MapController<S> {
    /// Take ownership of a freshly initialized surface and attach its controls
    pub fn new(mut surface: S, resize_delay: Duration) -> Self {
        for control in [Control::Navigation, Control::Scale] {
            if let Err(e) = surface.add_control(control) {
                warn!(?control, error = %e, "could not add map control");
            }
        }
        Self {
            surface,
            registry: OverlayRegistry::new(),
            resize: ResizeCoordinator::new(resize_delay),
            sources: [SourceState::new(), SourceState::new()],
            filter: Versioned::new(FilterState::default()),
            selected: None,
            alive: true,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn registry(&self) -> &OverlayRegistry {
        &self.registry
    }

    pub fn filter(&self) -> &FilterState {
        self.filter.get()
    }

    pub fn status(&self, source: SourceKind) -> &SourceStatus {
        &self.sources[slot(source)].status
    }

    pub fn records(&self, source: SourceKind) -> &RecordSet {
        self.sources[slot(source)].records.get()
    }

    pub fn selected(&self) -> Option<MarkerHandle> {
        self.selected.as_ref().map(|(marker, _)| *marker)
    }

    /// Issue a ticket for a new request. `None` once torn down.
    pub fn begin_fetch(&mut self, source: SourceKind) -> Option<FetchTicket> {
        if !self.alive {
            return None;
        }
        let state = &mut self.sources[slot(source)];
        state.issued += 1;
        state.status = SourceStatus::Loading;
        Some(FetchTicket {
            source,
            seq: state.issued,
        })
    }

    /// Apply a finished request unless it is stale or arrives after teardown.
    ///
    /// A failed request empties the source when it is the latest one issued;
    /// an older failure leaves the current records for the newer request to
    /// replace. The map keeps running either way.
    pub fn apply_fetch(&mut self, outcome: FetchOutcome) -> FetchApplied {
        let FetchOutcome { ticket, body } = outcome;
        if !self.alive {
            debug!(source = %ticket.source, seq = ticket.seq, "fetch finished after teardown");
            return FetchApplied::Ignored;
        }
        let state = &mut self.sources[slot(ticket.source)];
        if ticket.seq <= state.applied || ticket.seq > state.issued {
            debug!(
                source = %ticket.source,
                seq = ticket.seq,
                applied = state.applied,
                "discarding stale fetch"
            );
            return FetchApplied::Stale;
        }
        state.applied = ticket.seq;
        let latest = ticket.seq == state.issued;

        match body {
            Ok(bytes) => {
                let normalized = normalize(ticket.source, &bytes);
                let status = if normalized.malformed_payload {
                    SourceStatus::Degraded
                } else {
                    SourceStatus::Loaded {
                        count: normalized.records.len(),
                        dropped: normalized.dropped,
                    }
                };
                info!(source = %ticket.source, ?status, "records loaded");
                if latest {
                    state.status = status;
                }
                state.records.set(Arc::from(normalized.records));
            }
            Err(e) if latest => {
                warn!(error = %e, "source unavailable");
                state.status = SourceStatus::Failed(e.to_string());
                state.records.set(empty_set());
            }
            Err(e) => {
                warn!(
                    error = %e,
                    pending = state.issued,
                    "earlier request failed, keeping records"
                );
            }
        }
        FetchApplied::Applied
    }

    /// Replace the record set of a source directly
    pub fn set_records(&mut self, source: SourceKind, records: Vec<Arc<GeoRecord>>) {
        if !self.alive {
            return;
        }
        let state = &mut self.sources[slot(source)];
        state.status = SourceStatus::Loaded {
            count: records.len(),
            dropped: 0,
        };
        state.records.set(Arc::from(records));
    }

    pub fn set_filter(&mut self, filter: FilterState) {
        if self.alive {
            self.filter.replace(filter);
        }
    }

    pub fn select_category(&mut self, category: Category) {
        let mut next = *self.filter.get();
        next.select_category(category);
        self.set_filter(next);
    }

    pub fn toggle_historical(&mut self) {
        let mut next = *self.filter.get();
        next.toggle_historical();
        self.set_filter(next);
    }

    /// Reconcile every source whose records or filter changed.
    ///
    /// A new venue record set also fits the map to the visible venues.
    pub fn sync(&mut self) -> ReconcileStats {
        let mut total = ReconcileStats::default();
        if !self.alive {
            return total;
        }

        for source in SourceKind::ALL {
            let state = &mut self.sources[slot(source)];
            let inputs = (state.records.version(), self.filter.version());
            if state.synced == Some(inputs) {
                continue;
            }
            let records_changed = state.synced.map_or(true, |(v, _)| v != inputs.0);
            state.synced = Some(inputs);

            let desired = visible(state.records.get(), self.filter.get());
            let stats = self.registry.reconcile(source, &desired, &mut self.surface);
            total.created += stats.created;
            total.destroyed += stats.destroyed;
            total.moved += stats.moved;
            total.retained += stats.retained;

            if source == SourceKind::Venues && records_changed {
                if let Some(bounds) = Bounds::enclosing(desired.iter().map(|r| r.coordinate)) {
                    if let Err(e) = self.surface.fit_bounds(bounds) {
                        warn!(error = %e, "fit to venues failed");
                    }
                }
            }
        }

        self.refresh_popup();
        total
    }

    /// Rebuild the open popup if a re-fetch changed its record
    fn refresh_popup(&mut self) {
        let Some((marker, shown)) = self.selected.take() else {
            return;
        };
        // Gone with its entry, popup released along with it
        let Some((_, entry)) = self.registry.by_marker(marker) else {
            return;
        };
        if *entry.record() == shown {
            self.selected = Some((marker, shown));
            return;
        }
        let current = Arc::clone(entry.record());
        match self.surface.show_popup(entry.popup(), popup::build(&current)) {
            Ok(()) => self.selected = Some((marker, current)),
            Err(e) => warn!(error = %e, "could not refresh popup"),
        }
    }

    /// Register a layout change; the relayout happens after the debounce
    pub fn notify_resize(&mut self, now: Instant) {
        if self.alive {
            self.resize.notify(now);
        }
    }

    /// Drive the debounce. Returns true when a relayout ran.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.alive || !self.resize.poll(now) {
            return false;
        }
        match self.surface.relayout() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "relayout failed");
                false
            }
        }
    }

    /// How long the event loop may sleep before [`Self::tick`] has work
    pub fn next_deadline(&self, now: Instant) -> Option<Duration> {
        self.resize.time_until_due(now)
    }

    /// Open the popup of `marker`, building its content now
    pub fn open_popup(&mut self, marker: MarkerHandle) -> bool {
        if !self.alive {
            return false;
        }
        let Some((_, entry)) = self.registry.by_marker(marker) else {
            return false;
        };
        let record = Arc::clone(entry.record());
        match self.surface.show_popup(entry.popup(), popup::build(&record)) {
            Ok(()) => {
                self.selected = Some((marker, record));
                true
            }
            Err(e) => {
                warn!(error = %e, "could not open popup");
                false
            }
        }
    }

    pub fn close_popup(&mut self) {
        if !self.alive {
            return;
        }
        self.selected = None;
        if let Err(e) = self.surface.close_popup() {
            warn!(error = %e, "could not close popup");
        }
    }

    /// Open the next marker's popup (venues first, by id) and return where it is
    pub fn select_next(&mut self) -> Option<Coordinate> {
        self.select_step(true)
    }

    pub fn select_prev(&mut self) -> Option<Coordinate> {
        self.select_step(false)
    }

    fn select_step(&mut self, forward: bool) -> Option<Coordinate> {
        if !self.alive {
            return None;
        }
        let order: Vec<(MarkerHandle, Coordinate)> = self
            .registry
            .iter()
            .map(|(_, e)| (e.marker(), e.record().coordinate))
            .collect();
        if order.is_empty() {
            return None;
        }
        let current = self
            .selected()
            .and_then(|m| order.iter().position(|(h, _)| *h == m));
        let idx = match (current, forward) {
            (None, true) => 0,
            (None, false) => order.len() - 1,
            (Some(i), true) => (i + 1) % order.len(),
            (Some(i), false) => (i + order.len() - 1) % order.len(),
        };
        let (marker, at) = order[idx];
        self.open_popup(marker).then_some(at)
    }

    /// Release every marker and popup, cancel the pending relayout and tear
    /// the surface down. Safe to call more than once.
    pub fn teardown(&mut self) {
        if !self.alive {
            return;
        }
        self.alive = false;
        self.resize.cancel();
        self.selected = None;
        let destroyed = self.registry.clear(&mut self.surface);
        self.surface.teardown();
        info!(destroyed, "map controller torn down");
    }
}

impl<S: MapSurface> Drop for MapController<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::error::MapError;
    use crate::records::fixtures::{historical, venue};
    use crate::records::{Detail, RecordId};
    use crate::surface::testing::RecordingSurface;

    const DELAY: Duration = Duration::from_millis(100);

    fn controller() -> MapController<RecordingSurface> {
        MapController::new(RecordingSurface::default(), DELAY)
    }

    fn ok(ticket: FetchTicket, json: &str) -> FetchOutcome {
        FetchOutcome {
            ticket,
            body: Ok(json.as_bytes().to_vec()),
        }
    }

    const TWO_VENUES: &str = r#"[
        {"id":"v1","name":"Najd Kitchen","location":{"lat":24.71,"lng":46.67},"categoryEnum":"FOOD"},
        {"id":"v2","name":"Qahwa","location":{"lat":24.69,"lng":46.70},"categoryEnum":"COFFEE_SHOP"}
    ]"#;

    #[test]
    fn test_controls_added_on_mount() {
        let c = controller();
        assert_eq!(c.surface().controls, vec![Control::Navigation, Control::Scale]);
    }

    #[test]
    fn test_food_venue_then_hotel_filter() {
        let mut c = controller();
        c.set_records(
            SourceKind::Venues,
            vec![venue("v1", Some(Category::Food), 24.7, 46.7)],
        );
        c.select_category(Category::Food);
        c.sync();
        assert!(c.registry().contains(SourceKind::Venues, &RecordId::from("v1")));

        c.select_category(Category::Hotel);
        let stats = c.sync();
        assert_eq!(stats.destroyed, 1);
        assert!(c.registry().is_empty());
        assert!(c.surface().is_empty());
    }

    #[test]
    fn test_sync_skips_unchanged_inputs() {
        let mut c = controller();
        c.set_records(
            SourceKind::Venues,
            vec![
                venue("a", Some(Category::Food), 24.7, 46.7),
                venue("b", Some(Category::Shop), 24.8, 46.8),
            ],
        );
        assert_eq!(c.sync().created, 2);
        assert_eq!(c.surface().fits.len(), 1);

        let again = c.sync();
        assert!(again.is_noop());
        assert_eq!(again.retained, 0, "nothing reconciled at all");

        // Same filter value does not bump the version
        c.set_filter(FilterState::default());
        assert!(c.sync().is_noop());

        // Filter changes do not refit the map
        c.toggle_historical();
        c.sync();
        assert_eq!(c.surface().fits.len(), 1);
    }

    #[test]
    fn test_fetch_applies_and_fits() {
        let mut c = controller();
        let ticket = c.begin_fetch(SourceKind::Venues).unwrap();
        assert_eq!(c.status(SourceKind::Venues), &SourceStatus::Loading);
        assert_eq!(c.apply_fetch(ok(ticket, TWO_VENUES)), FetchApplied::Applied);
        assert_eq!(
            c.status(SourceKind::Venues),
            &SourceStatus::Loaded {
                count: 2,
                dropped: 0
            }
        );
        c.sync();
        assert_eq!(c.registry().len(SourceKind::Venues), 2);
        let fit = c.surface().fits[0];
        assert_eq!(fit.south_west, Coordinate { lat: 24.69, lng: 46.67 });
        assert_eq!(fit.north_east, Coordinate { lat: 24.71, lng: 46.70 });
    }

    #[test]
    fn test_stale_fetch_discarded() {
        let mut c = controller();
        let first = c.begin_fetch(SourceKind::Venues).unwrap();
        let second = c.begin_fetch(SourceKind::Venues).unwrap();
        assert!(second.seq > first.seq);

        assert_eq!(c.apply_fetch(ok(second, TWO_VENUES)), FetchApplied::Applied);
        let late = r#"[{"id":"old","location":{"lat":24.0,"lng":46.0}}]"#;
        assert_eq!(c.apply_fetch(ok(first, late)), FetchApplied::Stale);

        c.sync();
        assert!(!c.registry().contains(SourceKind::Venues, &RecordId::from("old")));
        assert_eq!(c.registry().len(SourceKind::Venues), 2);
    }

    #[test]
    fn test_sources_are_independent() {
        let mut c = controller();
        let v = c.begin_fetch(SourceKind::Venues).unwrap();
        let h = c.begin_fetch(SourceKind::Historical).unwrap();
        let places = r#"[{"place":"Masmak Fortress","coordinates":[24.6312,46.7133]}]"#;
        assert_eq!(c.apply_fetch(ok(h, places)), FetchApplied::Applied);
        assert_eq!(c.apply_fetch(ok(v, TWO_VENUES)), FetchApplied::Applied);
        c.sync();
        assert_eq!(c.registry().len(SourceKind::Venues), 2);
        assert_eq!(c.registry().len(SourceKind::Historical), 1);

        c.toggle_historical();
        let stats = c.sync();
        assert_eq!(stats.destroyed, 1);
        assert_eq!(stats.created, 0);
        assert_eq!(c.registry().len(SourceKind::Venues), 2);
    }

    #[test]
    fn test_failed_fetch_empties_source() {
        let mut c = controller();
        c.set_records(
            SourceKind::Historical,
            vec![historical("Masmak", 24.63, 46.71)],
        );
        c.sync();
        let ticket = c.begin_fetch(SourceKind::Historical).unwrap();
        let failed = FetchOutcome {
            ticket,
            body: Err(MapError::DataFetch {
                kind: SourceKind::Historical,
                reason: "connection refused".into(),
            }),
        };
        assert_eq!(c.apply_fetch(failed), FetchApplied::Applied);
        assert!(matches!(c.status(SourceKind::Historical), SourceStatus::Failed(_)));
        c.sync();
        assert!(c.registry().is_empty());
    }

    #[test]
    fn test_older_failure_keeps_records() {
        let mut c = controller();
        let first = c.begin_fetch(SourceKind::Venues).unwrap();
        c.apply_fetch(ok(first, TWO_VENUES));
        c.sync();

        let older = c.begin_fetch(SourceKind::Venues).unwrap();
        let newer = c.begin_fetch(SourceKind::Venues).unwrap();
        let failed = FetchOutcome {
            ticket: older,
            body: Err(MapError::DataFetch {
                kind: SourceKind::Venues,
                reason: "timed out".into(),
            }),
        };
        assert_eq!(c.apply_fetch(failed), FetchApplied::Applied);
        assert_eq!(c.status(SourceKind::Venues), &SourceStatus::Loading);
        assert_eq!(c.records(SourceKind::Venues).len(), 2);
        assert!(c.sync().is_noop());
        assert_eq!(c.registry().len(SourceKind::Venues), 2);

        // The newer request still lands
        let one = r#"[{"id":"v1","location":{"lat":24.71,"lng":46.67}}]"#;
        assert_eq!(c.apply_fetch(ok(newer, one)), FetchApplied::Applied);
        c.sync();
        assert_eq!(c.registry().len(SourceKind::Venues), 1);
    }

    #[test]
    fn test_malformed_payload_degrades() {
        let mut c = controller();
        let ticket = c.begin_fetch(SourceKind::Venues).unwrap();
        c.apply_fetch(ok(ticket, r#"{"error":"rate limited"}"#));
        assert_eq!(c.status(SourceKind::Venues), &SourceStatus::Degraded);
        c.sync();
        assert!(c.registry().is_empty());
        assert!(c.records(SourceKind::Venues).is_empty());
    }

    #[test]
    fn test_resize_burst_single_relayout() {
        let mut c = controller();
        let t0 = Instant::now();
        for i in 0..5 {
            c.notify_resize(t0 + Duration::from_millis(i * 20));
        }
        assert!(!c.tick(t0 + Duration::from_millis(150)));
        assert!(c.tick(t0 + Duration::from_millis(181)));
        assert!(!c.tick(t0 + Duration::from_millis(400)));
        assert_eq!(c.surface().relayouts, 1);
    }

    #[test]
    fn test_spaced_resizes_each_relayout() {
        let mut c = controller();
        let t0 = Instant::now();
        for i in 0..3u64 {
            let at = t0 + Duration::from_millis(i * 300);
            c.notify_resize(at);
            assert!(c.tick(at + DELAY));
        }
        assert_eq!(c.surface().relayouts, 3);
    }

    #[test]
    fn test_teardown_cancels_pending_relayout() {
        let mut c = controller();
        let t0 = Instant::now();
        c.notify_resize(t0);
        c.teardown();
        assert!(!c.tick(t0 + Duration::from_secs(1)));
        assert_eq!(c.surface().relayouts, 0);
        assert_eq!(c.next_deadline(t0), None);
    }

    #[test]
    fn test_teardown_releases_everything_once() {
        let mut c = controller();
        c.set_records(
            SourceKind::Venues,
            vec![
                venue("a", Some(Category::Food), 24.7, 46.7),
                venue("b", None, 24.8, 46.8),
            ],
        );
        c.set_records(SourceKind::Historical, vec![historical("fort", 24.6, 46.7)]);
        c.sync();
        let marker = c.registry().iter().next().unwrap().1.marker();
        assert!(c.open_popup(marker));

        c.teardown();
        c.teardown();
        let s = c.surface();
        assert_eq!(s.teardowns, 1);
        assert_eq!(s.markers_added, 3);
        assert_eq!(s.markers_removed, 3);
        assert_eq!(s.popups_released, 3);
        assert!(s.is_empty());
        assert!(s.open_popup.is_none());
    }

    #[test]
    fn test_nothing_applies_after_teardown() {
        let mut c = controller();
        let ticket = c.begin_fetch(SourceKind::Venues).unwrap();
        c.teardown();
        assert_eq!(c.apply_fetch(ok(ticket, TWO_VENUES)), FetchApplied::Ignored);
        assert!(c.begin_fetch(SourceKind::Venues).is_none());
        c.select_category(Category::Food);
        assert!(c.sync().is_noop());
        assert_eq!(c.filter(), &FilterState::default());
        assert_eq!(c.surface().markers_added, 0);
    }

    #[test]
    fn test_drop_clears_registry_before_surface() {
        let live_left = Rc::new(Cell::new(None));
        let surface = RecordingSurface {
            live_at_teardown: Some(Rc::clone(&live_left)),
            ..RecordingSurface::default()
        };
        let mut c = MapController::new(surface, DELAY);
        c.set_records(
            SourceKind::Venues,
            vec![venue("a", Some(Category::Food), 24.7, 46.7)],
        );
        c.sync();
        drop(c);
        assert_eq!(live_left.get(), Some(0));
    }

    #[test]
    fn test_popup_built_lazily_from_current_record() {
        let mut c = controller();
        c.set_records(
            SourceKind::Venues,
            vec![venue("a", Some(Category::Food), 24.7, 46.7)],
        );
        c.sync();
        assert!(c.surface().open_popup.is_none());

        let marker = c.registry().iter().next().unwrap().1.marker();
        assert!(c.open_popup(marker));
        let (_, content) = c.surface().open_popup.as_ref().unwrap();
        assert_eq!(content.title, "Venue a");
        assert_eq!(content.price.as_deref(), Some("$$"));

        c.close_popup();
        assert!(c.surface().open_popup.is_none());
        assert_eq!(c.selected(), None);
    }

    #[test]
    fn test_open_popup_follows_refetched_record() {
        let mut c = controller();
        c.set_records(
            SourceKind::Venues,
            vec![venue("a", Some(Category::Food), 24.7, 46.7)],
        );
        c.sync();
        let marker = c.registry().iter().next().unwrap().1.marker();
        assert!(c.open_popup(marker));

        let mut renamed = (*venue("a", Some(Category::Food), 24.7, 46.7)).clone();
        if let Detail::Venue(v) = &mut renamed.detail {
            v.name = "Renamed".into();
            v.rating = Some(1.0);
        }
        c.set_records(SourceKind::Venues, vec![Arc::new(renamed)]);
        c.sync();

        assert_eq!(c.selected(), Some(marker));
        let (_, content) = c.surface().open_popup.as_ref().unwrap();
        assert_eq!(content.title, "Renamed");
        assert_eq!(content.rating.as_deref(), Some("1.0"));

        // Identical content from a later fetch leaves the popup alone
        let shown = c.surface().open_popup.clone();
        let same = c.records(SourceKind::Venues).to_vec();
        c.set_records(SourceKind::Venues, same);
        c.sync();
        assert_eq!(c.surface().open_popup, shown);
    }

    #[test]
    fn test_popup_closed_with_its_record() {
        let mut c = controller();
        c.set_records(
            SourceKind::Venues,
            vec![venue("a", Some(Category::Food), 24.7, 46.7)],
        );
        c.sync();
        let marker = c.registry().iter().next().unwrap().1.marker();
        assert!(c.open_popup(marker));

        c.set_records(SourceKind::Venues, Vec::new());
        c.sync();
        assert_eq!(c.selected(), None);
        assert!(c.surface().open_popup.is_none());
    }

    #[test]
    fn test_select_cycles_markers() {
        let mut c = controller();
        c.set_records(
            SourceKind::Venues,
            vec![
                venue("a", Some(Category::Food), 24.7, 46.7),
                venue("b", Some(Category::Food), 24.8, 46.8),
            ],
        );
        c.set_records(SourceKind::Historical, vec![historical("fort", 24.6, 46.6)]);
        c.sync();

        let first = c.select_next().unwrap();
        assert_eq!(first, Coordinate { lat: 24.7, lng: 46.7 });
        c.select_next();
        let third = c.select_next().unwrap();
        assert_eq!(third, Coordinate { lat: 24.6, lng: 46.6 });
        // Wraps around
        assert_eq!(c.select_next(), Some(first));
        assert_eq!(c.select_prev(), Some(third));
    }

    #[test]
    fn test_moved_record_updates_marker() {
        let mut c = controller();
        c.set_records(
            SourceKind::Venues,
            vec![venue("a", Some(Category::Food), 24.7, 46.7)],
        );
        c.sync();
        c.set_records(
            SourceKind::Venues,
            vec![venue("a", Some(Category::Food), 24.9, 46.9)],
        );
        let stats = c.sync();
        assert_eq!((stats.created, stats.destroyed, stats.moved), (0, 0, 1));
        let marker = c.registry().iter().next().unwrap().1.marker();
        assert_eq!(
            c.surface().markers[&marker],
            Coordinate { lat: 24.9, lng: 46.9 }
        );
    }
}
