//! Browser-side configuration and the one-time Leaflet resource injection.

use std::future::Future;

use nearby_discovery::{DiscoveryConfig, LibraryLoadError, LibraryResources, ResourceInjector};
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crate::leaflet;

const TOKEN_KEY: &str = "token";

#[wasm_bindgen(inline_js = "
export function nearby_inject_script(src) {
    return new Promise((resolve, reject) => {
        const script = document.createElement('script');
        script.src = src;
        script.async = true;
        script.onload = () => resolve();
        script.onerror = () => reject(new Error('network error'));
        document.body.appendChild(script);
    });
}
")]
extern "C" {
    #[wasm_bindgen(catch)]
    fn nearby_inject_script(src: &str) -> Result<js_sys::Promise, JsValue>;
}

/// Config for the page's own origin, carrying the stored session token.
pub fn browser_config() -> DiscoveryConfig {
    let Some(window) = web_sys::window() else {
        return DiscoveryConfig::default();
    };
    let origin = window.location().origin().unwrap_or_default();
    let token = window
        .local_storage()
        .ok()
        .flatten()
        .and_then(|storage| storage.get_item(TOKEN_KEY).ok().flatten());
    if token.is_none() {
        debug!("no session token stored; querying without authorization");
    }
    DiscoveryConfig::from_origin(&origin).with_token(token)
}

fn js_reason(err: &JsValue) -> String {
    js_sys::Reflect::get(err, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .or_else(|| err.as_string())
        .unwrap_or_else(|| "unknown error".to_string())
}

/// Appends the Leaflet `<link>` and `<script>` to the document.
pub struct DomInjector;

impl DomInjector {
    fn add_stylesheet(resources: &LibraryResources) -> Result<(), LibraryLoadError> {
        let fail = |reason: String| LibraryLoadError::Resource {
            resource: resources.stylesheet_url.clone(),
            reason,
        };
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| fail("no document".to_string()))?;
        if document.get_element_by_id(&resources.stylesheet_id).is_some() {
            return Ok(());
        }
        let link = document
            .create_element("link")
            .map_err(|e| fail(js_reason(&e)))?;
        link.set_id(&resources.stylesheet_id);
        link.set_attribute("rel", "stylesheet")
            .and_then(|()| link.set_attribute("href", &resources.stylesheet_url))
            .map_err(|e| fail(js_reason(&e)))?;
        let head = document.head().ok_or_else(|| fail("no <head>".to_string()))?;
        head.append_child(&link).map_err(|e| fail(js_reason(&e)))?;
        Ok(())
    }
}

impl ResourceInjector for DomInjector {
    fn inject(
        &self,
        resources: &LibraryResources,
    ) -> impl Future<Output = Result<(), LibraryLoadError>> {
        let stylesheet = Self::add_stylesheet(resources);
        let script_url = resources.script_url.clone();
        async move {
            stylesheet?;
            // A page that already ships Leaflet needs no script.
            if leaflet::is_loaded() {
                debug!("Leaflet already present on the page");
                return Ok(());
            }
            let fail = |err: JsValue| LibraryLoadError::Resource {
                resource: script_url.clone(),
                reason: js_reason(&err),
            };
            let promise = nearby_inject_script(&script_url).map_err(fail)?;
            JsFuture::from(promise).await.map_err(fail)?;
            if !leaflet::is_loaded() {
                warn!(script = %script_url, "script loaded without defining `L`");
                return Err(LibraryLoadError::MissingGlobal);
            }
            Ok(())
        }
    }
}
