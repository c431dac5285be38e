//! In-memory collaborators for unit tests.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use futures::channel::oneshot;
use nearby_shared::{Category, Coordinate, HelperRecord, HelperRole};

use crate::config::LibraryResources;
use crate::error::{GeoError, LibraryLoadError, MapError};
use crate::library::ResourceInjector;
use crate::location::{GeoOptions, Geolocator};
use crate::map::{MapBackend, MapSurface, MarkerMeta, Viewport};

pub fn helper(id: &str, lat: f64, lng: f64) -> HelperRecord {
    HelperRecord {
        id: id.to_string(),
        name: format!("Helper {id}"),
        role: HelperRole::Helper,
        location: Some(Coordinate::new(lat, lng)),
        help_categories: vec![Category::Food],
        distance_km: 1.0,
    }
}

pub fn helper_without_location(id: &str) -> HelperRecord {
    HelperRecord {
        location: None,
        ..helper(id, 0.0, 0.0)
    }
}

// --- Geolocation ---

#[derive(Clone)]
pub struct FakeGeolocator {
    outcome: Option<Result<Coordinate, GeoError>>,
    requests: Rc<RefCell<Vec<GeoOptions>>>,
}

impl FakeGeolocator {
    pub fn at(coordinate: Coordinate) -> Self {
        Self::with(Some(Ok(coordinate)))
    }

    pub fn failing(err: GeoError) -> Self {
        Self::with(Some(Err(err)))
    }

    /// Never answers.
    pub fn hanging() -> Self {
        Self::with(None)
    }

    fn with(outcome: Option<Result<Coordinate, GeoError>>) -> Self {
        Self {
            outcome,
            requests: Rc::default(),
        }
    }

    pub fn requests(&self) -> Vec<GeoOptions> {
        self.requests.borrow().clone()
    }
}

impl Geolocator for FakeGeolocator {
    fn locate(&self, options: &GeoOptions) -> impl Future<Output = Result<Coordinate, GeoError>> {
        self.requests.borrow_mut().push(*options);
        let outcome = self.outcome.clone();
        async move {
            match outcome {
                Some(result) => result,
                None => std::future::pending().await,
            }
        }
    }
}

// --- Library injection ---

enum InjectMode {
    Succeed,
    Fail,
    Gated(Option<oneshot::Receiver<Result<(), LibraryLoadError>>>),
}

pub struct FakeInjector {
    calls: Cell<usize>,
    mode: RefCell<InjectMode>,
}

impl FakeInjector {
    pub fn succeeding() -> Self {
        Self::with(InjectMode::Succeed)
    }

    pub fn failing() -> Self {
        Self::with(InjectMode::Fail)
    }

    /// Injection completes when the returned sender fires.
    pub fn gated() -> (Self, oneshot::Sender<Result<(), LibraryLoadError>>) {
        let (tx, rx) = oneshot::channel();
        (Self::with(InjectMode::Gated(Some(rx))), tx)
    }

    fn with(mode: InjectMode) -> Self {
        Self {
            calls: Cell::new(0),
            mode: RefCell::new(mode),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl ResourceInjector for FakeInjector {
    fn inject(
        &self,
        _resources: &LibraryResources,
    ) -> impl Future<Output = Result<(), LibraryLoadError>> {
        self.calls.set(self.calls.get() + 1);
        let (gate, fail) = match &mut *self.mode.borrow_mut() {
            InjectMode::Succeed => (None, false),
            InjectMode::Fail => (None, true),
            InjectMode::Gated(rx) => (rx.take(), false),
        };
        async move {
            if let Some(rx) = gate {
                return rx.await.unwrap_or(Err(LibraryLoadError::MissingGlobal));
            }
            if fail {
                Err(LibraryLoadError::Resource {
                    resource: "leaflet.js".to_string(),
                    reason: "network error".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }
}

// --- Map backend ---

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSnapshot {
    pub center: Coordinate,
    pub self_markers: usize,
    pub helper_ids: Vec<String>,
    pub popups: Vec<String>,
    pub overlays: Vec<(Coordinate, f64)>,
    pub highlight: Option<String>,
    pub disposed: bool,
}

#[derive(Default)]
struct BackendLog {
    created: usize,
    disposed: usize,
    live: usize,
    max_live: usize,
    fail_overlays: bool,
    surfaces: Vec<SurfaceSnapshot>,
    clicks: Vec<(usize, String, Rc<dyn Fn()>)>,
}

/// Records every map it creates so tests can check the live set.
#[derive(Clone, Default)]
pub struct FakeBackend {
    log: Rc<RefCell<BackendLog>>,
}

impl FakeBackend {
    pub fn created(&self) -> usize {
        self.log.borrow().created
    }

    pub fn disposed(&self) -> usize {
        self.log.borrow().disposed
    }

    pub fn live_maps(&self) -> usize {
        self.log.borrow().live
    }

    pub fn max_live(&self) -> usize {
        self.log.borrow().max_live
    }

    pub fn fail_overlays(&self, fail: bool) {
        self.log.borrow_mut().fail_overlays = fail;
    }

    /// Most recently created map.
    pub fn latest(&self) -> Option<SurfaceSnapshot> {
        self.log.borrow().surfaces.last().cloned()
    }

    /// Clicks the helper marker `id` on a live map.
    pub fn click(&self, id: &str) -> bool {
        let callback = {
            let log = self.log.borrow();
            log.clicks
                .iter()
                .find(|(surface, helper, _)| helper == id && !log.surfaces[*surface].disposed)
                .map(|(_, _, cb)| Rc::clone(cb))
        };
        match callback {
            Some(cb) => {
                cb();
                true
            }
            None => false,
        }
    }
}

pub struct FakeSurface {
    index: usize,
    log: Rc<RefCell<BackendLog>>,
}

impl MapBackend for FakeBackend {
    type Surface = FakeSurface;

    fn create(&self, viewport: &Viewport) -> Result<FakeSurface, MapError> {
        let mut log = self.log.borrow_mut();
        log.created += 1;
        log.live += 1;
        log.max_live = log.max_live.max(log.live);
        log.surfaces.push(SurfaceSnapshot {
            center: viewport.center,
            self_markers: 0,
            helper_ids: Vec::new(),
            popups: Vec::new(),
            overlays: Vec::new(),
            highlight: None,
            disposed: false,
        });
        Ok(FakeSurface {
            index: log.surfaces.len() - 1,
            log: Rc::clone(&self.log),
        })
    }
}

impl MapSurface for FakeSurface {
    fn add_marker(
        &mut self,
        meta: &MarkerMeta,
        popup: &str,
        on_click: Option<Box<dyn Fn()>>,
    ) -> Result<(), MapError> {
        let mut log = self.log.borrow_mut();
        let snap = &mut log.surfaces[self.index];
        snap.popups.push(popup.to_string());
        match meta.helper_id() {
            Some(id) => snap.helper_ids.push(id.to_string()),
            None => snap.self_markers += 1,
        }
        if let (Some(id), Some(cb)) = (meta.helper_id(), on_click) {
            let id = id.to_string();
            log.clicks.push((self.index, id, Rc::from(cb)));
        }
        Ok(())
    }

    fn add_radius_overlay(&mut self, center: Coordinate, radius_m: f64) -> Result<(), MapError> {
        let mut log = self.log.borrow_mut();
        if log.fail_overlays {
            return Err(MapError::Library("circle rejected".to_string()));
        }
        log.surfaces[self.index].overlays.push((center, radius_m));
        Ok(())
    }

    fn highlight(&mut self, helper_id: Option<&str>) {
        self.log.borrow_mut().surfaces[self.index].highlight = helper_id.map(str::to_string);
    }

    fn dispose(self) {
        let mut log = self.log.borrow_mut();
        log.disposed += 1;
        log.live -= 1;
        log.surfaces[self.index].disposed = true;
        let index = self.index;
        log.clicks.retain(|(surface, _, _)| *surface != index);
    }
}
