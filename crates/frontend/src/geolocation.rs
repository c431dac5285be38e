use std::future::Future;

use nearby_discovery::{GeoError, GeoOptions, Geolocator};
use nearby_shared::Coordinate;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

#[wasm_bindgen(inline_js = "
export function nearby_locate(highAccuracy, timeoutMs) {
    return new Promise((resolve, reject) => {
        if (!('geolocation' in navigator)) {
            reject({ code: 0, message: 'unsupported' });
            return;
        }
        navigator.geolocation.getCurrentPosition(
            (p) => resolve([p.coords.latitude, p.coords.longitude]),
            (e) => reject({ code: e.code, message: e.message }),
            { enableHighAccuracy: highAccuracy, timeout: timeoutMs },
        );
    });
}
")]
extern "C" {
    #[wasm_bindgen(catch)]
    fn nearby_locate(high_accuracy: bool, timeout_ms: f64) -> Result<js_sys::Promise, JsValue>;
}

/// `navigator.geolocation.getCurrentPosition` as a future.
pub struct BrowserGeolocator;

fn field(value: &JsValue, name: &str) -> JsValue {
    js_sys::Reflect::get(value, &JsValue::from_str(name)).unwrap_or(JsValue::UNDEFINED)
}

/// Maps a `GeolocationPositionError` code onto the engine's taxonomy.
fn geo_error(code: Option<f64>, message: Option<String>) -> GeoError {
    match code.map(|c| c as u16) {
        Some(0) => GeoError::Unsupported,
        Some(1) => GeoError::PermissionDenied,
        Some(3) => GeoError::Timeout,
        _ => GeoError::Unavailable(message.unwrap_or_else(|| "unknown error".to_string())),
    }
}

impl Geolocator for BrowserGeolocator {
    fn locate(&self, options: &GeoOptions) -> impl Future<Output = Result<Coordinate, GeoError>> {
        let high_accuracy = options.high_accuracy;
        let timeout_ms = options.timeout.as_millis() as f64;
        async move {
            let promise = nearby_locate(high_accuracy, timeout_ms).map_err(|_| GeoError::Unsupported)?;
            match JsFuture::from(promise).await {
                Ok(position) => {
                    let pair = js_sys::Array::from(&position);
                    let lat = pair.get(0).as_f64();
                    let lng = pair.get(1).as_f64();
                    match (lat, lng) {
                        (Some(lat), Some(lng)) => Ok(Coordinate::new(lat, lng)),
                        _ => Err(GeoError::Unavailable("malformed position".to_string())),
                    }
                }
                Err(err) => Err(geo_error(
                    field(&err, "code").as_f64(),
                    field(&err, "message").as_string(),
                )),
            }
        }
    }
}
