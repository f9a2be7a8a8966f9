//! In-place field editing and Migaku Mode overlay for Anki webviews.
//!
//! The same module is loaded into the reviewer (editable fields, paste
//! callback) and the note editor (Migaku Mode). The host drives it through the
//! functions exported below and hears back through `pycmd` / `bridgeCommand`.

pub mod bridge;
pub mod codec;
pub mod config;
pub mod dom;
pub mod editor;
pub mod field;
pub mod markup;
pub mod models;
mod util;

use crate::bridge::JsBridge;
use crate::config::OverlayConfig;
use crate::models::FieldSettings;
use std::rc::Rc;
use tracing::Level;
use wasm_bindgen::prelude::*;

fn to_js_error(err: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

fn init_tracing(console_level: Level) {
    #[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
    {
        use tracing::subscriber::set_global_default;
        use tracing_subscriber::layer::SubscriberExt;
        use tracing_subscriber::Registry;

        let wasm_layer = tracing_wasm::WASMLayer::new(
            tracing_wasm::WASMLayerConfigBuilder::new()
                .set_max_level(console_level)
                .build(),
        );

        // Ignore the error if the host loaded us twice on one page.
        let _ = set_global_default(Registry::default().with(wasm_layer));
    }
    #[cfg(not(all(target_arch = "wasm32", target_os = "unknown")))]
    let _ = console_level;
}

/// Bind the editable fields of the card currently shown in the reviewer.
#[wasm_bindgen(js_name = init_editable_fields)]
pub fn init_editable_fields() -> Result<u32, JsValue> {
    dom::init_editable_fields(Rc::new(JsBridge::Pycmd))
        .map(|added| added as u32)
        .map_err(to_js_error)
}

/// Paste callback the host evaluates after an `inplace-paste` request.
#[wasm_bindgen(js_name = inplace_pasteHTML)]
pub fn inplace_paste_html(html: &str, _internal: bool, ext: bool) -> Result<(), JsValue> {
    dom::paste_html(html, ext).map_err(to_js_error)
}

#[wasm_bindgen(js_name = encode_b64)]
pub fn encode_b64(text: &str) -> String {
    codec::encode(text)
}

#[wasm_bindgen(js_name = decode_b64)]
pub fn decode_b64(encoded: &str) -> Result<String, JsValue> {
    codec::decode(encoded).map_err(to_js_error)
}

#[wasm_bindgen(js_name = set_show_empty_fields)]
pub fn show_empty_fields(show: bool) -> Result<(), JsValue> {
    dom::set_show_empty_fields(show).map_err(to_js_error)
}

#[wasm_bindgen(js_name = migaku_editor_init_buttons)]
pub fn editor_init_buttons(add_icon_path: String, remove_icon_path: String, img_filter: String) {
    editor::init_buttons(add_icon_path, remove_icon_path, img_filter);
}

#[wasm_bindgen(js_name = migaku_editor_hide_buttons)]
pub fn editor_hide_buttons() {
    editor::hide_buttons();
}

fn settings_from_js(settings: &JsValue) -> Result<FieldSettings, JsValue> {
    if settings.is_undefined() || settings.is_null() {
        return Ok(FieldSettings::default());
    }
    let json = String::from(js_sys::JSON::stringify(settings)?);
    FieldSettings::from_json(&json).map_err(to_js_error)
}

/// `settings` maps field labels to content types, e.g. `{"Front": "sentence"}`.
#[wasm_bindgen(js_name = migaku_editor_toggle_mode)]
pub fn editor_toggle_mode(settings: JsValue) -> Result<(), JsValue> {
    let settings = settings_from_js(&settings)?;
    editor::toggle_mode(&settings).map_err(to_js_error)
}

#[wasm_bindgen(js_name = migaku_editor_reset)]
pub fn editor_reset() -> Result<(), JsValue> {
    editor::reset().map_err(to_js_error)
}

#[wasm_bindgen(js_name = migaku_editor_install_intercept_toggle)]
pub fn editor_install_intercept_toggle() {
    editor::install_intercept_toggle();
}

// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();

    let config = OverlayConfig::new();
    init_tracing(config.console_level());

    if let Some(css_path) = &config.css_path {
        if let Err(e) = dom::inject_stylesheet(css_path) {
            tracing::warn!("stylesheet not injected: {e}");
        }
    }
    if let Err(e) = dom::set_show_empty_fields(config.show_empty_fields) {
        tracing::warn!("empty-field visibility not applied: {e}");
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "migaku overlay loaded");
}
