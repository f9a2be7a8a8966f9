//! Migaku Mode overlay for Anki's note editor.
//!
//! Everything here is visibility toggling around the editor's own DOM plus the
//! two widgets in [`widgets`]. Commands go out through `bridgeCommand`.

mod widgets;

pub use widgets::{FieldSelector, InterceptToggle};

use crate::dom::DomError;
use crate::models::FieldSettings;
use crate::util::{document, js_error_message};
use gloo_timers::callback::Timeout;
use gloo_timers::future::TimeoutFuture;
use leptos::prelude::*;
use std::any::Any;
use std::cell::RefCell;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::spawn_local;
use widgets::{INTERCEPT_ID, SELECTOR_CLASS};

pub(crate) const GENERATE_BTN_ID: &str = "migaku_btn_syntax_generate";
pub(crate) const REMOVE_BTN_ID: &str = "migaku_btn_syntax_remove";
pub(crate) const TOGGLE_BTN_ID: &str = "migaku_btn_toggle_mode";

/// Toolbar groups hidden while Migaku Mode is on.
pub(crate) const HIDDEN_BUTTON_CATEGORIES: [&str; 6] = [
    "settings",
    "inlineFormatting",
    "blockFormatting",
    "template",
    "cloze",
    "image-occlusion-button",
];

const HIDDEN_SELECTORS: [&str; 2] = [".editing-area", ".plain-text-badge"];
const PIN_ICON_SELECTOR: &str = "svg#mdi-pin-outline";
const EDITOR_FIELD_SELECTOR: &str = ".editor-field";
const LABEL_SELECTOR: &str = ".label-name";

/// The editor needs a moment after load before the toolbar is in place.
const UI_SETTLE_MS: u32 = 400;
const HIDE_RETRY_MS: u32 = 100;

thread_local! {
    /// Unmount handles of the field selectors added by [`setup`].
    static SELECTORS: RefCell<Vec<Box<dyn Any>>> = const { RefCell::new(Vec::new()) };
    static INTERCEPT: RefCell<Option<Box<dyn Any>>> = const { RefCell::new(None) };
}

fn set_display(el: &web_sys::Element, display: &str) {
    let Some(el) = el.dyn_ref::<web_sys::HtmlElement>() else {
        return;
    };
    if let Err(e) = el.style().set_property("display", display) {
        tracing::warn!("display update failed: {}", js_error_message(&e));
    }
}

fn for_each_match(
    doc: &web_sys::Document,
    selector: &str,
    mut f: impl FnMut(web_sys::Element),
) -> Result<(), DomError> {
    let nodes = doc.query_selector_all(selector)?;
    for i in 0..nodes.length() {
        if let Some(el) = nodes.item(i).and_then(|n| n.dyn_into::<web_sys::Element>().ok()) {
            f(el);
        }
    }
    Ok(())
}

fn nth_parent(el: &web_sys::Element, n: usize) -> Option<web_sys::Element> {
    let mut cur = el.clone();
    for _ in 0..n {
        cur = cur.parent_element()?;
    }
    Some(cur)
}

fn category_selector(category: &str) -> String {
    format!(".item#{category}")
}

/// Point the syntax buttons at the note type's language icons and show them.
pub fn init_buttons(add_icon_path: String, remove_icon_path: String, img_filter: String) {
    spawn_local(async move {
        TimeoutFuture::new(UI_SETTLE_MS).await;
        if let Err(e) = show_syntax_buttons(&add_icon_path, &remove_icon_path, &img_filter) {
            tracing::warn!("syntax buttons not initialized: {e}");
        }
    });
}

fn show_syntax_buttons(add_icon: &str, remove_icon: &str, img_filter: &str) -> Result<(), DomError> {
    let doc = document().ok_or(DomError::NoDocument)?;

    for (id, icon) in [(GENERATE_BTN_ID, add_icon), (REMOVE_BTN_ID, remove_icon)] {
        let img_selector = format!("#{id} img");
        let img = doc
            .query_selector(&img_selector)?
            .and_then(|el| el.dyn_into::<web_sys::HtmlImageElement>().ok())
            .ok_or_else(|| DomError::NotFound(img_selector.clone()))?;
        img.set_src(icon);
        web_sys::HtmlElement::style(&img).set_property("filter", img_filter)?;
    }

    for id in [GENERATE_BTN_ID, REMOVE_BTN_ID] {
        let btn = doc
            .get_element_by_id(id)
            .ok_or_else(|| DomError::NotFound(format!("#{id}")))?;
        set_display(&btn, "");
    }
    Ok(())
}

/// Hide the syntax buttons (note type without a Migaku language).
pub fn hide_buttons() {
    fn hide() {
        let Some(doc) = document() else {
            return;
        };
        for id in [GENERATE_BTN_ID, REMOVE_BTN_ID] {
            match doc.get_element_by_id(id) {
                Some(btn) => set_display(&btn, "none"),
                None => tracing::debug!("#{id} missing; nothing to hide"),
            }
        }
    }

    let ready = document().is_some_and(|d| d.get_element_by_id(GENERATE_BTN_ID).is_some());
    if ready {
        hide();
    } else {
        Timeout::new(HIDE_RETRY_MS, hide).forget();
    }
}

pub fn is_mode_active() -> bool {
    document()
        .and_then(|d| d.query_selector(&format!(".{SELECTOR_CLASS}")).ok().flatten())
        .is_some()
}

/// Switch Migaku Mode on or off.
pub fn toggle_mode(settings: &FieldSettings) -> Result<(), DomError> {
    if is_mode_active() {
        reset()
    } else {
        setup(settings)
    }
}

fn apply_editor_visibility(doc: &web_sys::Document, display: &str) -> Result<(), DomError> {
    for selector in HIDDEN_SELECTORS {
        for_each_match(doc, selector, |el| set_display(&el, display))?;
    }
    for_each_match(doc, PIN_ICON_SELECTOR, |icon| {
        if let Some(row) = nth_parent(&icon, 3) {
            set_display(&row, display);
        }
    })?;
    for category in HIDDEN_BUTTON_CATEGORIES {
        if let Some(button) = doc.query_selector(&category_selector(category))? {
            set_display(&button, display);
        }
    }
    Ok(())
}

/// The label shown above an `.editor-field`, read from its grandparent.
fn field_label(editor_field: &web_sys::Element) -> Option<String> {
    let container = nth_parent(editor_field, 2)?;
    let label = container
        .query_selector(LABEL_SELECTOR)
        .ok()
        .flatten()?
        .dyn_into::<web_sys::HtmlElement>()
        .ok()?;
    Some(label.inner_text())
}

pub fn setup(settings: &FieldSettings) -> Result<(), DomError> {
    let doc = document().ok_or(DomError::NoDocument)?;
    apply_editor_visibility(&doc, "none")?;

    let mut mounted = 0;
    for_each_match(&doc, EDITOR_FIELD_SELECTOR, |field| {
        let Some(label) = field_label(&field) else {
            tracing::warn!("editor field without a label; no selector added");
            return;
        };
        let Ok(parent) = field.dyn_into::<web_sys::HtmlElement>() else {
            return;
        };
        let selected = settings.content_type_for(&label);
        let handle = leptos::mount::mount_to(parent, move || {
            view! { <FieldSelector label=label selected=selected /> }
        });
        SELECTORS.with(|s| s.borrow_mut().push(Box::new(handle)));
        mounted += 1;
    })?;

    tracing::debug!(selectors = mounted, "migaku mode on");
    Ok(())
}

pub fn reset() -> Result<(), DomError> {
    let doc = document().ok_or(DomError::NoDocument)?;
    apply_editor_visibility(&doc, "")?;
    // Dropping a handle unmounts its selector and disposes its owner.
    let handles = SELECTORS.with(|s| s.take());
    drop(handles);
    for_each_match(&doc, &format!(".{SELECTOR_CLASS}"), |selector| selector.remove())?;
    tracing::debug!("migaku mode off");
    Ok(())
}

/// Resolves once the editor's `anki/ui` module reports it has loaded.
async fn anki_ui_loaded() {
    let require = js_sys::Reflect::get(&js_sys::global(), &JsValue::from_str("require"))
        .ok()
        .and_then(|f| f.dyn_into::<js_sys::Function>().ok());
    let Some(require) = require else {
        tracing::debug!("no `require` on this page; not waiting for anki/ui");
        return;
    };

    let loaded = require
        .call1(&JsValue::NULL, &JsValue::from_str("anki/ui"))
        .and_then(|ui| js_sys::Reflect::get(&ui, &JsValue::from_str("loaded")));
    match loaded.map(|p| p.dyn_into::<js_sys::Promise>()) {
        Ok(Ok(promise)) => {
            if let Err(e) = wasm_bindgen_futures::JsFuture::from(promise).await {
                tracing::warn!("anki/ui failed to load: {}", js_error_message(&e));
            }
        }
        Ok(Err(_)) => tracing::debug!("anki/ui has no loaded promise"),
        Err(e) => tracing::warn!("anki/ui unavailable: {}", js_error_message(&e)),
    }
}

/// Add the "Intercept Fields" checkbox beside the Migaku Mode button.
pub fn install_intercept_toggle() {
    spawn_local(async {
        anki_ui_loaded().await;
        TimeoutFuture::new(UI_SETTLE_MS).await;
        mount_intercept_toggle();
    });
}

fn mount_intercept_toggle() {
    let Some(doc) = document() else {
        return;
    };
    if doc.get_element_by_id(INTERCEPT_ID).is_some() {
        return;
    }
    let Some(parent) = doc
        .get_element_by_id(TOGGLE_BTN_ID)
        .and_then(|btn| btn.parent_element())
        .and_then(|p| p.dyn_into::<web_sys::HtmlElement>().ok())
    else {
        tracing::debug!("#{TOGGLE_BTN_ID} missing; intercept toggle skipped");
        return;
    };
    let handle = leptos::mount::mount_to(parent, InterceptToggle);
    INTERCEPT.with(|slot| *slot.borrow_mut() = Some(Box::new(handle)));
}
