//! Ownership of the single live interactive map.
//!
//! The controller keeps at most one map alive and rebuilds it from scratch
//! whenever the scene (centre, radius, mapped helpers) changes. Every map it
//! creates is disposed exactly once: on the next rebuild, on teardown, or
//! when the controller itself is dropped.

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use nearby_shared::{Category, Coordinate, HelperRecord, HelperRole, RadiusKm};
use tracing::{debug, info, warn};

use crate::config::{DiscoveryConfig, TileSource};
use crate::error::{LibraryLoadError, MapError};

/// Initial view of a freshly created map.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub center: Coordinate,
    pub zoom: u8,
    pub tiles: TileSource,
}

/// Data behind a helper marker; presentation is left to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct HelperMarker {
    pub id: String,
    pub name: String,
    pub role: HelperRole,
    pub categories: Vec<Category>,
    pub distance_km: f64,
    pub position: Coordinate,
}

impl HelperMarker {
    /// `None` for records without a location.
    pub fn from_record(record: &HelperRecord) -> Option<Self> {
        let position = record.location?;
        Some(Self {
            id: record.id.clone(),
            name: record.name.clone(),
            role: record.role,
            categories: record.help_categories.clone(),
            distance_km: record.distance_km,
            position,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkerMeta {
    SelfLocation(Coordinate),
    Helper(HelperMarker),
}

impl MarkerMeta {
    pub fn position(&self) -> Coordinate {
        match self {
            MarkerMeta::SelfLocation(at) => *at,
            MarkerMeta::Helper(h) => h.position,
        }
    }

    pub fn helper_id(&self) -> Option<&str> {
        match self {
            MarkerMeta::SelfLocation(_) => None,
            MarkerMeta::Helper(h) => Some(&h.id),
        }
    }
}

/// Turns marker metadata into popup markup.
pub type PopupRenderer = Box<dyn Fn(&MarkerMeta) -> String>;

/// Everything a rebuilt map shows, apart from the highlight.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub center: Coordinate,
    pub radius: RadiusKm,
    pub helpers: Vec<HelperMarker>,
}

impl Scene {
    pub fn new(center: Coordinate, radius: RadiusKm, results: &[HelperRecord]) -> Self {
        Self {
            center,
            radius,
            helpers: results.iter().filter_map(HelperMarker::from_record).collect(),
        }
    }
}

/// Factory side of the mapping library.
pub trait MapBackend {
    type Surface: MapSurface;

    fn create(&self, viewport: &Viewport) -> Result<Self::Surface, MapError>;
}

/// One live map handle and the overlays placed on it.
pub trait MapSurface {
    fn add_marker(
        &mut self,
        meta: &MarkerMeta,
        popup: &str,
        on_click: Option<Box<dyn Fn()>>,
    ) -> Result<(), MapError>;

    fn add_radius_overlay(&mut self, center: Coordinate, radius_m: f64) -> Result<(), MapError>;

    fn highlight(&mut self, helper_id: Option<&str>);

    /// Releases the map and everything on it.
    fn dispose(self);
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapPhase {
    Uninitialized,
    /// `degraded` once the library failed to load; there is no way out.
    LibraryLoading { degraded: bool },
    Ready,
    Active { center: Coordinate },
    Disposed,
}

struct LiveMap<S> {
    surface: S,
    scene: Scene,
}

pub struct MapViewController<B: MapBackend> {
    backend: B,
    zoom: u8,
    tiles: TileSource,
    renderer: PopupRenderer,
    phase: MapPhase,
    live: Option<LiveMap<B::Surface>>,
    pending: Option<Scene>,
    highlighted: Option<String>,
    selections: UnboundedSender<String>,
    selection_rx: Option<UnboundedReceiver<String>>,
}

impl<B: MapBackend> MapViewController<B> {
    pub fn new(backend: B, config: &DiscoveryConfig, renderer: PopupRenderer) -> Self {
        let (selections, selection_rx) = mpsc::unbounded();
        Self {
            backend,
            zoom: config.zoom,
            tiles: config.tiles.clone(),
            renderer,
            phase: MapPhase::Uninitialized,
            live: None,
            pending: None,
            highlighted: None,
            selections,
            selection_rx: Some(selection_rx),
        }
    }

    pub fn phase(&self) -> &MapPhase {
        &self.phase
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.phase, MapPhase::LibraryLoading { degraded: true })
    }

    /// Helper ids of clicked markers. Can be taken once.
    pub fn selection_events(&mut self) -> Option<UnboundedReceiver<String>> {
        self.selection_rx.take()
    }

    /// Leaves `Uninitialized`. Returns true when the caller should start the
    /// library load.
    pub fn activate(&mut self) -> bool {
        if self.phase != MapPhase::Uninitialized {
            return false;
        }
        self.phase = MapPhase::LibraryLoading { degraded: false };
        true
    }

    pub fn library_loaded(&mut self, result: Result<(), LibraryLoadError>) {
        if !matches!(self.phase, MapPhase::LibraryLoading { .. }) {
            return;
        }
        self.phase = match result {
            Ok(()) => MapPhase::Ready,
            Err(err) => {
                warn!(error = %err, "map stays unavailable");
                MapPhase::LibraryLoading { degraded: true }
            }
        };
    }

    /// Queue a rebuild; later calls before `flush` replace earlier ones.
    pub fn schedule(&mut self, scene: Scene) {
        if self.phase == MapPhase::Disposed {
            return;
        }
        self.pending = Some(scene);
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Runs the queued rebuild if the library is ready. Returns whether a
    /// new map was built.
    pub fn flush(&mut self) -> Result<bool, MapError> {
        if !matches!(self.phase, MapPhase::Ready | MapPhase::Active { .. }) {
            return Ok(false);
        }
        let Some(scene) = self.pending.take() else {
            return Ok(false);
        };
        if self.live.as_ref().is_some_and(|live| live.scene == scene) {
            return Ok(false);
        }

        self.release_live();
        self.phase = MapPhase::Ready;

        let surface = self.build(&scene)?;
        info!(
            center = %scene.center,
            radius_km = scene.radius.km(),
            markers = scene.helpers.len(),
            "map rebuilt"
        );
        self.phase = MapPhase::Active {
            center: scene.center,
        };
        self.live = Some(LiveMap { surface, scene });
        Ok(true)
    }

    fn build(&self, scene: &Scene) -> Result<B::Surface, MapError> {
        let viewport = Viewport {
            center: scene.center,
            zoom: self.zoom,
            tiles: self.tiles.clone(),
        };
        let mut surface = self.backend.create(&viewport)?;
        match self.populate(&mut surface, scene) {
            Ok(()) => Ok(surface),
            Err(err) => {
                surface.dispose();
                Err(err)
            }
        }
    }

    fn populate(&self, surface: &mut B::Surface, scene: &Scene) -> Result<(), MapError> {
        let me = MarkerMeta::SelfLocation(scene.center);
        surface.add_marker(&me, &(self.renderer)(&me), None)?;

        for helper in &scene.helpers {
            let meta = MarkerMeta::Helper(helper.clone());
            let tx = self.selections.clone();
            let id = helper.id.clone();
            let on_click: Box<dyn Fn()> = Box::new(move || {
                let _ = tx.unbounded_send(id.clone());
            });
            surface.add_marker(&meta, &(self.renderer)(&meta), Some(on_click))?;
        }

        surface.add_radius_overlay(scene.center, scene.radius.meters())?;
        surface.highlight(self.highlighted.as_deref());
        Ok(())
    }

    /// Highlight follows selection without a rebuild; the marker set is
    /// untouched.
    pub fn set_highlight(&mut self, helper_id: Option<&str>) {
        self.highlighted = helper_id.map(str::to_string);
        if let Some(live) = self.live.as_mut() {
            live.surface.highlight(helper_id);
        }
    }

    pub fn has_live_map(&self) -> bool {
        self.live.is_some()
    }

    /// Helper markers on the live map, if there is one.
    pub fn live_marker_count(&self) -> Option<usize> {
        self.live.as_ref().map(|live| live.scene.helpers.len())
    }

    pub fn live_scene(&self) -> Option<&Scene> {
        self.live.as_ref().map(|live| &live.scene)
    }

    /// Screen teardown. The process-wide library stays loaded.
    pub fn dispose(&mut self) {
        self.release_live();
        self.pending = None;
        self.phase = MapPhase::Disposed;
        self.selections.close_channel();
    }

    fn release_live(&mut self) {
        if let Some(live) = self.live.take() {
            debug!("disposing map");
            live.surface.dispose();
        }
    }
}

impl<B: MapBackend> Drop for MapViewController<B> {
    fn drop(&mut self) {
        self.release_live();
    }
}
