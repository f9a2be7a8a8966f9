use tracing::Level;
use wasm_bindgen::JsValue;

/// Name of the page global the host sets before loading the overlay.
pub(crate) const ENV_GLOBAL: &str = "MIGAKU_ENV";
/// Global the reviewer script has always defined for the stylesheet URL.
pub(crate) const LEGACY_CSS_GLOBAL: &str = "inplace_editor_css_path";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OverlayConfig {
    pub css_path: Option<String>,
    pub show_empty_fields: bool,
    pub log_level: Option<Level>,
}

impl OverlayConfig {
    pub fn new() -> Self {
        let Some(window) = web_sys::window() else {
            return Self::default();
        };

        let env = window
            .get(ENV_GLOBAL)
            .map(JsValue::from)
            .filter(|env| !env.is_undefined() && env.is_object());

        // We support BOTH `MIGAKU_ENV.CSS_PATH` and the older top-level
        // `inplace_editor_css_path` the reviewer hook injects.
        let css_path = env
            .as_ref()
            .and_then(|env| env_value(env, &["CSS_PATH", "css_path"]))
            .and_then(|v| v.as_string())
            .or_else(|| window.get(LEGACY_CSS_GLOBAL).and_then(|v| JsValue::from(v).as_string()))
            .filter(|p| !p.trim().is_empty());

        let show_empty_fields = env
            .as_ref()
            .and_then(|env| env_value(env, &["SHOW_EMPTY_FIELDS", "show_empty_fields"]))
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let log_level = env
            .as_ref()
            .and_then(|env| env_value(env, &["LOG_LEVEL", "log_level"]))
            .and_then(|v| v.as_string())
            .and_then(|s| parse_level(&s));

        Self {
            css_path,
            show_empty_fields,
            log_level,
        }
    }

    /// Console level: explicit setting, else DEBUG for debug builds.
    pub fn console_level(&self) -> Level {
        self.log_level.unwrap_or(if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        })
    }
}

fn env_value(env: &JsValue, keys: &[&str]) -> Option<JsValue> {
    keys.iter().find_map(|key| {
        js_sys::Reflect::get(env, &JsValue::from_str(key))
            .ok()
            .filter(|v| !v.is_undefined() && !v.is_null())
    })
}

pub(crate) fn parse_level(s: &str) -> Option<Level> {
    s.trim().parse().ok()
}
