//! Orchestration of the nearby-helpers screen.
//!
//! `ScreenController` does no I/O. Each input returns the work the host has
//! to perform (a [`FetchTicket`] to run through the query service) and each
//! completion is fed back in. Completions are checked against the request
//! sequence and against teardown before they touch any state.

use nearby_shared::{Category, Coordinate, FilterState, HelperRecord, RadiusKm, ResultSet};
use tracing::{debug, warn};

use crate::error::{LibraryLoadError, QueryError};
use crate::location::Located;
use crate::map::{MapBackend, MapViewController, Scene};
use crate::query::{FetchTicket, NearbyQuery, RequestSequence};

/// Non-fatal conditions the user should be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    LocationUnavailable,
    QueryFailed(String),
    MapUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    /// A newer request was issued after this one.
    Stale,
    /// Error reported, previous results kept.
    Failed,
    /// Arrived after teardown.
    Ignored,
}

pub struct ScreenController<B: MapBackend> {
    filter: FilterState,
    coordinate: Option<Coordinate>,
    results: ResultSet,
    has_results: bool,
    selected: Option<String>,
    sequence: RequestSequence,
    map: MapViewController<B>,
    notices: Vec<Notice>,
    torn_down: bool,
}

impl<B: MapBackend> ScreenController<B> {
    pub fn new(map: MapViewController<B>) -> Self {
        Self {
            filter: FilterState::default(),
            coordinate: None,
            results: Vec::new(),
            has_results: false,
            selected: None,
            sequence: RequestSequence::default(),
            map,
            notices: Vec::new(),
            torn_down: false,
        }
    }

    // --- Inputs ---

    /// Returns true when the host should start loading the map library.
    pub fn activate_map(&mut self) -> bool {
        !self.torn_down && self.map.activate()
    }

    pub fn library_loaded(&mut self, result: Result<(), LibraryLoadError>) {
        if self.torn_down {
            return;
        }
        if result.is_err() {
            self.notices.push(Notice::MapUnavailable);
        }
        self.map.library_loaded(result);
    }

    pub fn location_acquired(&mut self, located: Located) -> Option<FetchTicket> {
        if self.torn_down {
            return None;
        }
        if located.is_fallback() {
            self.notices.push(Notice::LocationUnavailable);
        }
        if self.coordinate == Some(located.coordinate) {
            return None;
        }
        self.coordinate = Some(located.coordinate);
        self.schedule_map();
        self.issue()
    }

    pub fn set_category(&mut self, category: Category) -> Option<FetchTicket> {
        if self.torn_down || !self.filter.set_category(category) {
            return None;
        }
        self.issue()
    }

    pub fn set_radius(&mut self, radius: RadiusKm) -> Option<FetchTicket> {
        if self.torn_down || !self.filter.set_radius(radius) {
            return None;
        }
        self.schedule_map();
        self.issue()
    }

    /// Re-run the current query; the only retry after a failure.
    pub fn refresh(&mut self) -> Option<FetchTicket> {
        if self.torn_down {
            return None;
        }
        self.issue()
    }

    pub fn fetch_completed(
        &mut self,
        seq: u64,
        outcome: Result<ResultSet, QueryError>,
    ) -> FetchOutcome {
        if self.torn_down {
            return FetchOutcome::Ignored;
        }
        if !self.sequence.accept(seq) {
            debug!(seq, latest = self.sequence.latest(), "discarding stale response");
            return FetchOutcome::Stale;
        }

        match outcome {
            Ok(results) => {
                self.results = results;
                self.has_results = true;
                if self
                    .selected
                    .as_deref()
                    .is_some_and(|id| !self.results.iter().any(|h| h.id == id))
                {
                    debug!("selected helper left the results; clearing selection");
                    self.selected = None;
                    self.map.set_highlight(None);
                }
                self.schedule_map();
                FetchOutcome::Applied
            }
            Err(err) => {
                warn!(error = %err, seq, "nearby helpers query failed; keeping previous results");
                self.notices.push(Notice::QueryFailed(err.to_string()));
                if !self.has_results {
                    // An empty first result still lets the map show the user.
                    self.has_results = true;
                    self.schedule_map();
                }
                FetchOutcome::Failed
            }
        }
    }

    /// Selects a helper from the list or a marker click. Ids not in the
    /// current results are rejected.
    pub fn select(&mut self, id: Option<&str>) -> bool {
        if self.torn_down {
            return false;
        }
        if let Some(id) = id {
            if !self.results.iter().any(|h| h.id == id) {
                return false;
            }
        }
        self.selected = id.map(str::to_string);
        self.map.set_highlight(id);
        true
    }

    /// Performs any queued map rebuild.
    pub fn flush_map(&mut self) {
        if self.torn_down {
            return;
        }
        if let Err(err) = self.map.flush() {
            warn!(error = %err, "map rebuild failed");
            self.notices.push(Notice::MapUnavailable);
        }
    }

    /// After this no input or completion changes state.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.map.dispose();
        debug!("nearby screen torn down");
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // --- View state ---

    pub fn filter(&self) -> FilterState {
        self.filter
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        self.coordinate
    }

    pub fn results(&self) -> &[HelperRecord] {
        &self.results
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_helper(&self) -> Option<&HelperRecord> {
        let id = self.selected.as_deref()?;
        self.results.iter().find(|h| h.id == id)
    }

    pub fn is_locating(&self) -> bool {
        self.coordinate.is_none() && !self.torn_down
    }

    pub fn is_fetching(&self) -> bool {
        self.sequence.is_pending() && !self.torn_down
    }

    /// Results arrived and there is nothing to list.
    pub fn is_empty(&self) -> bool {
        self.has_results && self.results.is_empty()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn map(&self) -> &MapViewController<B> {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut MapViewController<B> {
        &mut self.map
    }

    fn issue(&mut self) -> Option<FetchTicket> {
        let coordinate = self.coordinate?;
        let ticket = self.sequence.issue(NearbyQuery {
            coordinate,
            filter: self.filter,
        });
        debug!(seq = ticket.seq, "issuing nearby helpers query");
        Some(ticket)
    }

    /// Nothing is drawn until both a coordinate and a first result exist.
    fn schedule_map(&mut self) {
        let Some(center) = self.coordinate else {
            return;
        };
        if !self.has_results {
            return;
        }
        self.map
            .schedule(Scene::new(center, self.filter.radius(), &self.results));
    }
}

/// Deep link to the direct-chat screen for a helper.
pub fn chat_link(helper_id: &str) -> String {
    format!("/direct-chat/{helper_id}")
}

/// Categories shown on a list row and how many were left out.
pub fn visible_categories(helper: &HelperRecord, max: usize) -> (&[Category], usize) {
    let shown = helper.help_categories.len().min(max);
    (
        &helper.help_categories[..shown],
        helper.help_categories.len() - shown,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DiscoveryConfig, FALLBACK_COORDINATE};
    use crate::error::GeoError;
    use crate::location::LocationSource;
    use crate::map::{MapPhase, MarkerMeta};
    use crate::testing::{helper, helper_without_location, FakeBackend};
    use futures::{FutureExt, StreamExt};

    fn device(lat: f64, lng: f64) -> Located {
        Located {
            coordinate: Coordinate::new(lat, lng),
            source: LocationSource::Device,
        }
    }

    fn screen(backend: &FakeBackend) -> ScreenController<FakeBackend> {
        let map = MapViewController::new(
            backend.clone(),
            &DiscoveryConfig::default(),
            Box::new(|_: &MarkerMeta| String::new()),
        );
        let mut screen = ScreenController::new(map);
        assert!(screen.activate_map());
        screen.library_loaded(Ok(()));
        screen
    }

    fn ids(screen: &ScreenController<FakeBackend>) -> Vec<&str> {
        screen.results().iter().map(|h| h.id.as_str()).collect()
    }

    #[test]
    fn test_location_issues_first_query_with_default_filter() {
        let backend = FakeBackend::default();
        let mut s = screen(&backend);
        assert!(s.is_locating());
        let ticket = s.location_acquired(device(38.7, -9.1)).unwrap();
        assert_eq!(ticket.query.coordinate, Coordinate::new(38.7, -9.1));
        assert_eq!(ticket.query.filter, FilterState::default());
        assert!(s.is_fetching());
        assert!(s.take_notices().is_empty());
    }

    #[test]
    fn test_fallback_location_notifies_exactly_once() {
        let backend = FakeBackend::default();
        let mut s = screen(&backend);
        let ticket = s.location_acquired(Located {
            coordinate: FALLBACK_COORDINATE,
            source: LocationSource::Fallback(GeoError::PermissionDenied),
        });
        assert_eq!(ticket.unwrap().query.coordinate, Coordinate::new(48.8566, 2.3522));
        assert_eq!(s.take_notices(), vec![Notice::LocationUnavailable]);
        assert!(s.take_notices().is_empty());
    }

    #[test]
    fn test_filters_before_location_do_not_fetch() {
        let backend = FakeBackend::default();
        let mut s = screen(&backend);
        assert!(s.set_category(Category::Food).is_none());
        let ticket = s.location_acquired(device(1.0, 2.0)).unwrap();
        assert_eq!(ticket.query.filter.category(), Category::Food);
    }

    #[test]
    fn test_radius_change_issues_one_query_keeping_category() {
        let backend = FakeBackend::default();
        let mut s = screen(&backend);
        let t = s.location_acquired(device(1.0, 2.0)).unwrap();
        s.fetch_completed(t.seq, Ok(vec![]));
        let t = s.set_category(Category::Legal).unwrap();
        s.fetch_completed(t.seq, Ok(vec![]));

        let ticket = s.set_radius(RadiusKm::Fifty).unwrap();
        assert_eq!(ticket.query.filter.radius(), RadiusKm::Fifty);
        assert_eq!(ticket.query.filter.category(), Category::Legal);
        assert!(s.set_radius(RadiusKm::Fifty).is_none());
        assert_eq!(ticket.seq, t.seq + 1);
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let backend = FakeBackend::default();
        let mut s = screen(&backend);
        let a = s.location_acquired(device(1.0, 2.0)).unwrap();
        let b = s.set_category(Category::Health).unwrap();

        assert_eq!(s.fetch_completed(b.seq, Ok(vec![helper("from-b", 1.0, 2.0)])), FetchOutcome::Applied);
        assert_eq!(s.fetch_completed(a.seq, Ok(vec![helper("from-a", 1.0, 2.0)])), FetchOutcome::Stale);

        assert_eq!(ids(&s), vec!["from-b"]);
        s.flush_map();
        assert_eq!(backend.latest().unwrap().helper_ids, vec!["from-b"]);
    }

    #[test]
    fn test_older_response_arriving_first_is_not_applied() {
        let backend = FakeBackend::default();
        let mut s = screen(&backend);
        let a = s.location_acquired(device(1.0, 2.0)).unwrap();
        let b = s.refresh().unwrap();

        assert_eq!(s.fetch_completed(a.seq, Ok(vec![helper("from-a", 1.0, 2.0)])), FetchOutcome::Stale);
        assert!(s.results().is_empty());
        assert!(s.is_fetching());
        assert_eq!(s.fetch_completed(b.seq, Ok(vec![helper("from-b", 1.0, 2.0)])), FetchOutcome::Applied);
        assert_eq!(ids(&s), vec!["from-b"]);
        assert!(!s.is_fetching());
    }

    #[test]
    fn test_stale_failure_is_silent() {
        let backend = FakeBackend::default();
        let mut s = screen(&backend);
        let a = s.location_acquired(device(1.0, 2.0)).unwrap();
        let b = s.set_radius(RadiusKm::Twenty).unwrap();
        assert_eq!(s.fetch_completed(b.seq, Ok(vec![helper("from-b", 1.0, 2.0)])), FetchOutcome::Applied);
        s.take_notices();

        assert_eq!(s.fetch_completed(a.seq, Err(QueryError::Status(500))), FetchOutcome::Stale);
        assert!(s.take_notices().is_empty());
        assert_eq!(ids(&s), vec!["from-b"]);
    }

    #[test]
    fn test_refresh_supersedes_hung_request() {
        let backend = FakeBackend::default();
        let mut s = screen(&backend);
        let first = s.location_acquired(device(1.0, 2.0)).unwrap();
        s.fetch_completed(first.seq, Ok(vec![helper("a", 1.0, 2.0)]));

        let hung = s.refresh().unwrap();
        assert!(s.is_fetching());
        let retry = s.refresh().unwrap();
        assert!(retry.seq > hung.seq);
        assert_eq!(retry.query, hung.query);

        assert_eq!(s.fetch_completed(retry.seq, Ok(vec![helper("b", 1.0, 2.0)])), FetchOutcome::Applied);
        assert!(!s.is_fetching());
        assert_eq!(s.fetch_completed(hung.seq, Ok(vec![helper("late", 1.0, 2.0)])), FetchOutcome::Stale);
        assert_eq!(ids(&s), vec!["b"]);
    }

    #[test]
    fn test_failure_keeps_previous_results_and_notifies() {
        let backend = FakeBackend::default();
        let mut s = screen(&backend);
        let t = s.location_acquired(device(1.0, 2.0)).unwrap();
        s.fetch_completed(t.seq, Ok(vec![helper("kept", 1.0, 2.0)]));
        s.flush_map();

        let t = s.refresh().unwrap();
        assert_eq!(s.fetch_completed(t.seq, Err(QueryError::Status(500))), FetchOutcome::Failed);

        assert_eq!(ids(&s), vec!["kept"]);
        assert_eq!(
            s.take_notices(),
            vec![Notice::QueryFailed("server answered with status 500".to_string())]
        );
        s.flush_map();
        assert_eq!(backend.created(), 1);
    }

    #[test]
    fn test_first_query_failure_still_renders_self_marker() {
        let backend = FakeBackend::default();
        let mut s = screen(&backend);
        let t = s.location_acquired(device(1.0, 2.0)).unwrap();
        s.fetch_completed(t.seq, Err(QueryError::Status(502)));
        s.flush_map();
        let snap = backend.latest().unwrap();
        assert_eq!(snap.self_markers, 1);
        assert!(snap.helper_ids.is_empty());
    }

    #[test]
    fn test_map_waits_for_first_results() {
        let backend = FakeBackend::default();
        let mut s = screen(&backend);
        let t = s.location_acquired(device(1.0, 2.0)).unwrap();
        s.flush_map();
        assert_eq!(backend.created(), 0);

        s.fetch_completed(t.seq, Ok(vec![helper("a", 1.0, 2.0)]));
        s.flush_map();
        assert_eq!(backend.created(), 1);
        assert_eq!(s.map().phase(), &MapPhase::Active { center: Coordinate::new(1.0, 2.0) });
    }

    #[test]
    fn test_marker_count_tracks_each_completed_fetch() {
        let backend = FakeBackend::default();
        let mut s = screen(&backend);
        let t = s.location_acquired(device(1.0, 2.0)).unwrap();
        let batches = vec![
            vec![helper("a", 1.0, 2.0), helper_without_location("b"), helper("c", 1.1, 2.1)],
            vec![],
            vec![helper_without_location("d")],
            vec![helper("e", 1.0, 2.0)],
        ];
        let mut seq = t.seq;
        for (i, batch) in batches.into_iter().enumerate() {
            if i > 0 {
                seq = s.refresh().unwrap().seq;
            }
            let expected = batch.iter().filter(|h| h.location.is_some()).count();
            s.fetch_completed(seq, Ok(batch));
            s.flush_map();
            assert_eq!(s.map().live_marker_count(), Some(expected));
            assert_eq!(backend.live_maps(), 1);
        }
        assert_eq!(backend.max_live(), 1);
    }

    #[test]
    fn test_selection_cleared_when_helper_disappears() {
        let backend = FakeBackend::default();
        let mut s = screen(&backend);
        let t = s.location_acquired(device(1.0, 2.0)).unwrap();
        s.fetch_completed(t.seq, Ok(vec![helper("x", 1.0, 2.0), helper("y", 1.0, 2.0)]));
        assert!(s.select(Some("x")));

        let t = s.set_category(Category::Work).unwrap();
        s.fetch_completed(t.seq, Ok(vec![helper("y", 1.0, 2.0)]));
        assert_eq!(s.selected(), None);
        s.flush_map();
        assert_eq!(backend.latest().unwrap().highlight, None);
    }

    #[test]
    fn test_selection_preserved_across_rebuild() {
        let backend = FakeBackend::default();
        let mut s = screen(&backend);
        let t = s.location_acquired(device(1.0, 2.0)).unwrap();
        s.fetch_completed(t.seq, Ok(vec![helper("x", 1.0, 2.0)]));
        s.flush_map();
        assert!(s.select(Some("x")));

        let t = s.set_radius(RadiusKm::Twenty).unwrap();
        s.fetch_completed(t.seq, Ok(vec![helper("z", 1.0, 2.0), helper("x", 1.0, 2.0)]));
        s.flush_map();

        assert_eq!(s.selected(), Some("x"));
        assert_eq!(s.selected_helper().unwrap().id, "x");
        assert_eq!(backend.latest().unwrap().highlight.as_deref(), Some("x"));
    }

    #[test]
    fn test_select_rejects_unknown_ids() {
        let backend = FakeBackend::default();
        let mut s = screen(&backend);
        let t = s.location_acquired(device(1.0, 2.0)).unwrap();
        s.fetch_completed(t.seq, Ok(vec![helper("x", 1.0, 2.0)]));
        assert!(!s.select(Some("ghost")));
        assert_eq!(s.selected(), None);
        assert!(s.select(Some("x")));
        assert!(s.select(None));
        assert_eq!(s.selected(), None);
    }

    #[test]
    fn test_marker_click_selects_through_the_channel() {
        let backend = FakeBackend::default();
        let mut s = screen(&backend);
        let mut clicks = s.map_mut().selection_events().unwrap();
        let t = s.location_acquired(device(1.0, 2.0)).unwrap();
        s.fetch_completed(t.seq, Ok(vec![helper("x", 1.0, 2.0)]));
        s.flush_map();

        assert!(backend.click("x"));
        let id = clicks.next().now_or_never().flatten().unwrap();
        assert!(s.select(Some(&id)));
        assert_eq!(s.selected(), Some("x"));
    }

    #[test]
    fn test_empty_legal_five_km_scenario() {
        let backend = FakeBackend::default();
        let mut s = screen(&backend);
        let t = s.location_acquired(device(1.0, 2.0)).unwrap();
        s.fetch_completed(t.seq, Ok(vec![helper("a", 1.0, 2.0)]));
        s.set_category(Category::Legal);
        let t = s.set_radius(RadiusKm::Five).unwrap();
        assert_eq!(t.query.filter, FilterState::new(Category::Legal, RadiusKm::Five));

        assert_eq!(s.fetch_completed(t.seq, Ok(vec![])), FetchOutcome::Applied);
        s.flush_map();

        assert!(s.is_empty());
        let snap = backend.latest().unwrap();
        assert_eq!(snap.self_markers, 1);
        assert!(snap.helper_ids.is_empty());
        assert_eq!(snap.overlays, vec![(Coordinate::new(1.0, 2.0), 5_000.0)]);
    }

    #[test]
    fn test_library_failure_degrades_map_only() {
        let backend = FakeBackend::default();
        let map = MapViewController::new(
            backend.clone(),
            &DiscoveryConfig::default(),
            Box::new(|_: &MarkerMeta| String::new()),
        );
        let mut s = ScreenController::new(map);
        s.activate_map();
        s.library_loaded(Err(LibraryLoadError::MissingGlobal));
        assert_eq!(s.take_notices(), vec![Notice::MapUnavailable]);

        let t = s.location_acquired(device(1.0, 2.0)).unwrap();
        assert_eq!(s.fetch_completed(t.seq, Ok(vec![helper("a", 1.0, 2.0)])), FetchOutcome::Applied);
        s.flush_map();
        assert_eq!(ids(&s), vec!["a"]);
        assert_eq!(backend.created(), 0);
        assert!(s.map().is_degraded());
    }

    #[test]
    fn test_nothing_changes_after_teardown() {
        let backend = FakeBackend::default();
        let mut s = screen(&backend);
        let t = s.location_acquired(device(1.0, 2.0)).unwrap();
        s.fetch_completed(t.seq, Ok(vec![helper("a", 1.0, 2.0)]));
        s.flush_map();
        let pending = s.refresh().unwrap();

        s.teardown();
        s.teardown();
        assert_eq!(backend.live_maps(), 0);
        assert_eq!(backend.disposed(), 1);

        assert_eq!(s.fetch_completed(pending.seq, Ok(vec![])), FetchOutcome::Ignored);
        assert!(s.location_acquired(device(5.0, 5.0)).is_none());
        assert!(s.set_radius(RadiusKm::Fifty).is_none());
        assert!(!s.select(Some("a")));
        s.library_loaded(Err(LibraryLoadError::MissingGlobal));
        s.flush_map();

        assert_eq!(ids(&s), vec!["a"]);
        assert_eq!(s.coordinate(), Some(Coordinate::new(1.0, 2.0)));
        assert!(s.take_notices().is_empty());
        assert_eq!(backend.created(), 1);
        assert_eq!(s.map().phase(), &MapPhase::Disposed);
    }

    #[test]
    fn test_same_coordinate_does_not_refetch() {
        let backend = FakeBackend::default();
        let mut s = screen(&backend);
        assert!(s.location_acquired(device(1.0, 2.0)).is_some());
        assert!(s.location_acquired(device(1.0, 2.0)).is_none());
        assert!(s.location_acquired(device(1.5, 2.0)).is_some());
    }

    #[test]
    fn test_chat_link_and_visible_categories() {
        assert_eq!(chat_link("abc"), "/direct-chat/abc");

        let mut h = helper("x", 0.0, 0.0);
        h.help_categories = vec![
            Category::Food,
            Category::Legal,
            Category::Health,
            Category::Work,
            Category::Social,
            Category::Clothes,
        ];
        let (shown, more) = visible_categories(&h, 4);
        assert_eq!(shown.len(), 4);
        assert_eq!(more, 2);

        h.help_categories.truncate(1);
        assert_eq!(visible_categories(&h, 4), (&[Category::Food][..], 0));
    }
}
