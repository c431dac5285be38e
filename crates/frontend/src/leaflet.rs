//! Leaflet bindings behind the engine's `MapBackend` / `MapSurface` seam.

use nearby_discovery::{MapBackend, MapError, MapSurface, MarkerMeta, Viewport};
use nearby_shared::Coordinate;
use tracing::debug;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(inline_js = "
export function nearby_leaflet_loaded() {
    return typeof window.L !== 'undefined' && typeof window.L.map === 'function';
}

export function nearby_map_create(containerId, lat, lng, zoom, tileUrl, attribution) {
    const el = document.getElementById(containerId);
    if (!el) return null;
    const map = window.L.map(el).setView([lat, lng], zoom);
    window.L.tileLayer(tileUrl, { attribution }).addTo(map);
    return map;
}

export function nearby_map_marker(map, lat, lng, kind, html, popup, onClick) {
    const size = kind === 'self' ? 24 : 32;
    const icon = window.L.divIcon({
        className: 'nearby-marker',
        html: `<div class=\"nearby-pin nearby-pin--${kind}\">${html}</div>`,
        iconSize: [size, size],
        iconAnchor: [size / 2, size / 2],
    });
    const marker = window.L.marker([lat, lng], { icon }).addTo(map).bindPopup(popup);
    if (onClick) marker.on('click', () => onClick());
    return marker;
}

export function nearby_map_circle(map, lat, lng, radius) {
    window.L.circle([lat, lng], {
        color: '#3b82f6',
        fillColor: '#3b82f6',
        fillOpacity: 0.1,
        radius,
    }).addTo(map);
}

export function nearby_marker_selected(marker, selected) {
    const el = marker.getElement();
    if (el) el.classList.toggle('nearby-marker--selected', selected);
}

export function nearby_map_remove(map) {
    map.off();
    map.remove();
}
")]
extern "C" {
    fn nearby_leaflet_loaded() -> bool;

    #[wasm_bindgen(catch)]
    fn nearby_map_create(
        container_id: &str,
        lat: f64,
        lng: f64,
        zoom: u8,
        tile_url: &str,
        attribution: &str,
    ) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    fn nearby_map_marker(
        map: &JsValue,
        lat: f64,
        lng: f64,
        kind: &str,
        html: &str,
        popup: &str,
        on_click: &JsValue,
    ) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    fn nearby_map_circle(map: &JsValue, lat: f64, lng: f64, radius: f64) -> Result<(), JsValue>;

    fn nearby_marker_selected(marker: &JsValue, selected: bool);

    fn nearby_map_remove(map: &JsValue);
}

const HELPER_PIN: &str = "🤝";

pub fn is_loaded() -> bool {
    nearby_leaflet_loaded()
}

fn library_error(err: JsValue) -> MapError {
    MapError::Library(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

/// Creates maps inside the element with `container_id`.
pub struct LeafletBackend {
    container_id: String,
}

impl LeafletBackend {
    pub fn new(container_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
        }
    }
}

impl MapBackend for LeafletBackend {
    type Surface = LeafletSurface;

    fn create(&self, viewport: &Viewport) -> Result<LeafletSurface, MapError> {
        if !is_loaded() {
            return Err(MapError::Library("Leaflet is not loaded".to_string()));
        }
        let map = nearby_map_create(
            &self.container_id,
            viewport.center.lat,
            viewport.center.lng,
            viewport.zoom,
            &viewport.tiles.url_template,
            &viewport.tiles.attribution,
        )
        .map_err(library_error)?;
        if map.is_null() {
            return Err(MapError::MissingContainer(self.container_id.clone()));
        }
        debug!(container = %self.container_id, "Leaflet map created");
        Ok(LeafletSurface {
            map,
            helpers: Vec::new(),
            listeners: Vec::new(),
        })
    }
}

/// A live `L.map`. Click listeners are kept alive for as long as the map.
pub struct LeafletSurface {
    map: JsValue,
    helpers: Vec<(String, JsValue)>,
    listeners: Vec<Closure<dyn Fn()>>,
}

impl LeafletSurface {
    fn marker_at(
        &self,
        at: Coordinate,
        kind: &str,
        html: &str,
        popup: &str,
        on_click: &JsValue,
    ) -> Result<JsValue, MapError> {
        nearby_map_marker(&self.map, at.lat, at.lng, kind, html, popup, on_click)
            .map_err(library_error)
    }
}

impl MapSurface for LeafletSurface {
    fn add_marker(
        &mut self,
        meta: &MarkerMeta,
        popup: &str,
        on_click: Option<Box<dyn Fn()>>,
    ) -> Result<(), MapError> {
        let listener = on_click.map(Closure::wrap);
        let js_click = listener
            .as_ref()
            .map_or(JsValue::NULL, |c| c.as_ref().clone());

        match meta {
            MarkerMeta::SelfLocation(at) => {
                self.marker_at(*at, "self", "", popup, &js_click)?;
            }
            MarkerMeta::Helper(helper) => {
                let marker =
                    self.marker_at(helper.position, "helper", HELPER_PIN, popup, &js_click)?;
                self.helpers.push((helper.id.clone(), marker));
            }
        }
        self.listeners.extend(listener);
        Ok(())
    }

    fn add_radius_overlay(&mut self, center: Coordinate, radius_m: f64) -> Result<(), MapError> {
        nearby_map_circle(&self.map, center.lat, center.lng, radius_m).map_err(library_error)
    }

    fn highlight(&mut self, helper_id: Option<&str>) {
        for (id, marker) in &self.helpers {
            nearby_marker_selected(marker, Some(id.as_str()) == helper_id);
        }
    }

    fn dispose(self) {
        nearby_map_remove(&self.map);
        debug!(markers = self.helpers.len(), "Leaflet map removed");
    }
}
