//! Reviewer-side DOM binding for editable fields.
//!
//! Each `.editable-field` element gets a [`FieldController`] plus three
//! listeners (dblclick, blur, keydown). Bindings live in a thread-local
//! registry; dropping one detaches its listeners.

use crate::bridge::{HostBridge, HostCommand};
use crate::codec::EncodedContent;
use crate::field::{FieldController, FieldSurface, KeyChord};
use crate::markup;
use crate::models::FieldRecord;
use crate::util::{document, js_error_message};
use gloo_events::{EventListener, EventListenerOptions};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;
use wasm_bindgen::JsCast;

pub(crate) const FIELD_SELECTOR: &str = ".editable-field";
pub(crate) const ACTIVE_CLASS: &str = "editable-field-active";
pub(crate) const EMPTY_CLASS: &str = "editable-field-empty";
pub(crate) const FIELD_CONTAINER_CLASS: &str = "field";
pub(crate) const NAME_ATTR: &str = "data-field-name";
pub(crate) const CONTENT_ATTR: &str = "data-content";

pub(crate) const QA_ID: &str = "qa";
pub(crate) const SHOW_EMPTY_CLASS: &str = "show-empty-editable-field";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("no document available")]
    NoDocument,
    #[error("element not found: {0}")]
    NotFound(String),
    #[error("DOM call failed: {0}")]
    Js(String),
}

impl From<wasm_bindgen::JsValue> for DomError {
    fn from(err: wasm_bindgen::JsValue) -> Self {
        DomError::Js(js_error_message(&err))
    }
}

/// A live `.editable-field` element.
#[derive(Clone, Debug)]
pub struct DomField {
    el: web_sys::HtmlElement,
}

impl DomField {
    pub fn new(el: web_sys::HtmlElement) -> Self {
        Self { el }
    }

    pub fn element(&self) -> &web_sys::HtmlElement {
        &self.el
    }

    fn record(&self) -> FieldRecord {
        let name = self.el.get_attribute(NAME_ATTR).unwrap_or_else(|| {
            tracing::warn!("editable field without {NAME_ATTR}");
            String::new()
        });
        let committed = self.el.get_attribute(CONTENT_ATTR).unwrap_or_else(|| {
            tracing::warn!(field = %name, "editable field without {CONTENT_ATTR}");
            String::new()
        });
        FieldRecord::new(name, EncodedContent::from_encoded(committed), &self.el.inner_html())
    }

    fn toggle_class(&self, class: &str, on: bool) {
        if let Err(e) = self.el.class_list().toggle_with_force(class, on) {
            tracing::warn!(class, "class toggle failed: {}", js_error_message(&e));
        }
    }
}

impl FieldSurface for DomField {
    fn inner_html(&self) -> String {
        self.el.inner_html()
    }

    fn set_inner_html(&self, html: &str) {
        self.el.set_inner_html(html);
    }

    fn set_editable(&self, editable: bool) {
        self.el
            .set_content_editable(if editable { "true" } else { "false" });
    }

    fn set_active_flag(&self, active: bool) {
        self.toggle_class(ACTIVE_CLASS, active);
    }

    fn set_empty_flag(&self, empty: bool) {
        self.toggle_class(EMPTY_CLASS, empty);
    }

    fn committed(&self) -> Option<EncodedContent> {
        self.el
            .get_attribute(CONTENT_ATTR)
            .map(EncodedContent::from_encoded)
    }

    fn set_committed(&self, content: &EncodedContent) {
        if let Err(e) = self.el.set_attribute(CONTENT_ATTR, content.as_str()) {
            tracing::warn!("writing {CONTENT_ATTR} failed: {}", js_error_message(&e));
        }
    }

    fn in_field_container(&self) -> bool {
        self.el
            .parent_element()
            .is_some_and(|p| p.class_list().contains(FIELD_CONTAINER_CLASS))
    }

    fn focus(&self) {
        if let Err(e) = self.el.focus() {
            tracing::warn!("focus failed: {}", js_error_message(&e));
        }
    }
}

struct BoundField {
    field: DomField,
    _listeners: [EventListener; 3],
}

thread_local! {
    static BOUND: RefCell<Vec<BoundField>> = const { RefCell::new(Vec::new()) };
}

fn bind(field: DomField, bridge: Rc<dyn HostBridge<HostCommand>>) -> BoundField {
    let controller = Rc::new(RefCell::new(FieldController::new(field.record(), bridge)));
    controller.borrow().attach(&field);
    let target: web_sys::EventTarget = field.element().clone().into();

    let on_dblclick = {
        let (field, controller) = (field.clone(), controller.clone());
        EventListener::new(&target, "dblclick", move |_| {
            let Ok(mut c) = controller.try_borrow_mut() else {
                tracing::debug!("dblclick during another transition; ignored");
                return;
            };
            if let Err(e) = c.activate(&field) {
                tracing::error!("activation failed: {e}");
            }
        })
    };

    let on_blur = {
        let (field, controller) = (field.clone(), controller.clone());
        EventListener::new(&target, "blur", move |_| {
            // Reached re-entrantly when a syntax key drops edit mode; that path
            // intentionally does not commit.
            let Ok(mut c) = controller.try_borrow_mut() else {
                tracing::debug!("blur during another transition; ignored");
                return;
            };
            if let Err(e) = c.deactivate(&field) {
                tracing::error!("commit failed: {e}");
            }
        })
    };

    let on_keydown = {
        let (field, controller) = (field.clone(), controller.clone());
        EventListener::new_with_options(
            &target,
            "keydown",
            EventListenerOptions::enable_prevent_default(),
            move |event| {
                let Some(event) = event.dyn_ref::<web_sys::KeyboardEvent>() else {
                    return;
                };
                let key = event.key();
                let chord = KeyChord {
                    key: &key,
                    ctrl: event.ctrl_key(),
                };

                let outcome = match controller.try_borrow_mut() {
                    Ok(mut c) => c.keydown(&field, chord),
                    Err(_) => return,
                };

                match outcome {
                    Ok(outcome) => {
                        if outcome.prevent_default {
                            event.prevent_default();
                        }
                        if outcome.release_focus {
                            // Dispatches blur synchronously, which commits.
                            if let Err(e) = field.element().blur() {
                                tracing::warn!("blur failed: {}", js_error_message(&e));
                            }
                        }
                    }
                    Err(e) => tracing::error!("key handling failed: {e}"),
                }
            },
        )
    };

    BoundField {
        field,
        _listeners: [on_dblclick, on_blur, on_keydown],
    }
}

/// Bind every `.editable-field` in the document that is not bound yet.
///
/// The host calls this each time a card side is shown. Bindings of elements
/// that have since left the document are dropped first. Returns the number of
/// newly bound fields.
pub fn init_editable_fields(bridge: Rc<dyn HostBridge<HostCommand>>) -> Result<usize, DomError> {
    let doc = document().ok_or(DomError::NoDocument)?;
    let nodes = doc.query_selector_all(FIELD_SELECTOR)?;

    BOUND.with(|bound| {
        let mut bound = bound.borrow_mut();
        bound.retain(|b| b.field.element().is_connected());

        let mut added = 0;
        for i in 0..nodes.length() {
            let Some(el) = nodes
                .item(i)
                .and_then(|n| n.dyn_into::<web_sys::HtmlElement>().ok())
            else {
                continue;
            };
            if bound
                .iter()
                .any(|b| b.field.element().is_same_node(Some(el.as_ref())))
            {
                continue;
            }
            bound.push(bind(DomField::new(el), bridge.clone()));
            added += 1;
        }

        tracing::debug!(added, total = bound.len(), "editable fields bound");
        Ok(added)
    })
}

/// Drop every binding, detaching all listeners.
pub fn clear_editable_fields() {
    BOUND.with(|bound| bound.borrow_mut().clear());
}

/// Insert pasted HTML at the cursor, the way the host's paste callback expects.
///
/// Unless the paste is `external` (extended paste), every tag but images is
/// stripped first.
pub fn paste_html(html: &str, external: bool) -> Result<(), DomError> {
    let html = if external {
        html.to_string()
    } else {
        markup::strip_non_image_tags(html)
    };

    let doc = document()
        .ok_or(DomError::NoDocument)?
        .dyn_into::<web_sys::HtmlDocument>()
        .map_err(|_| DomError::NoDocument)?;
    doc.exec_command_with_show_ui_and_value("insertHTML", false, &html)?;
    Ok(())
}

/// Append a stylesheet link to `<head>` unless one with this href exists.
pub fn inject_stylesheet(href: &str) -> Result<(), DomError> {
    let doc = document().ok_or(DomError::NoDocument)?;
    let head = doc
        .head()
        .ok_or_else(|| DomError::NotFound("head".to_string()))?;

    let links = doc.query_selector_all("link[rel=\"stylesheet\"]")?;
    for i in 0..links.length() {
        let existing = links
            .item(i)
            .and_then(|n| n.dyn_into::<web_sys::Element>().ok())
            .and_then(|el| el.get_attribute("href"));
        if existing.as_deref() == Some(href) {
            return Ok(());
        }
    }

    let link = doc.create_element("link")?;
    link.set_attribute("rel", "stylesheet")?;
    link.set_attribute("type", "text/css")?;
    link.set_attribute("href", href)?;
    head.append_child(&link)?;

    tracing::debug!(href, "stylesheet injected");
    Ok(())
}

/// Show or hide empty editable fields on the card.
pub fn set_show_empty_fields(show: bool) -> Result<(), DomError> {
    let doc = document().ok_or(DomError::NoDocument)?;
    let Some(qa) = doc.get_element_by_id(QA_ID) else {
        tracing::debug!("no #{QA_ID} on this page");
        return Ok(());
    };
    qa.class_list().toggle_with_force(SHOW_EMPTY_CLASS, show)?;
    Ok(())
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use crate::bridge::testing::RecordingBridge;
    use crate::codec;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn mount(html: &str) -> web_sys::HtmlElement {
        let doc = document().expect("document");
        let root = doc
            .create_element("div")
            .unwrap()
            .dyn_into::<web_sys::HtmlElement>()
            .unwrap();
        root.set_inner_html(html);
        doc.body().unwrap().append_child(&root).unwrap();
        root
    }

    fn field_el(root: &web_sys::HtmlElement) -> web_sys::HtmlElement {
        root.query_selector(FIELD_SELECTOR)
            .unwrap()
            .unwrap()
            .dyn_into()
            .unwrap()
    }

    fn fire(el: &web_sys::HtmlElement, ty: &str) {
        let ev = web_sys::Event::new(ty).unwrap();
        el.dispatch_event(&ev).unwrap();
    }

    fn press(el: &web_sys::HtmlElement, key: &str, ctrl: bool) -> bool {
        let init = web_sys::KeyboardEventInit::new();
        init.set_key(key);
        init.set_ctrl_key(ctrl);
        init.set_cancelable(true);
        let ev =
            web_sys::KeyboardEvent::new_with_keyboard_event_init_dict("keydown", &init).unwrap();
        el.dispatch_event(&ev).unwrap()
    }

    #[wasm_bindgen_test]
    fn test_full_edit_cycle_in_dom() {
        clear_editable_fields();
        let committed = codec::encode("wor[d]");
        let root = mount(&format!(
            r#"<div class="field"><div class="editable-field" data-field-name="Word" data-content="{committed}">word</div></div>"#
        ));
        let el = field_el(&root);
        let bridge = Rc::new(RecordingBridge::<HostCommand>::default());

        assert_eq!(init_editable_fields(bridge.clone()).unwrap(), 1);
        // A second call binds nothing new.
        assert_eq!(init_editable_fields(bridge.clone()).unwrap(), 0);
        assert!(!el.class_list().contains(EMPTY_CLASS));

        fire(&el, "dblclick");
        assert!(el.class_list().contains(ACTIVE_CLASS));
        assert_eq!(el.content_editable(), "true");
        assert_eq!(el.inner_html(), "wor[d]");

        el.set_inner_html("wor[ld]");
        fire(&el, "blur");

        assert!(!el.class_list().contains(ACTIVE_CLASS));
        assert_eq!(el.content_editable(), "false");
        assert_eq!(
            el.get_attribute(CONTENT_ATTR).as_deref(),
            Some(codec::encode("wor[ld]").as_str())
        );
        assert_eq!(
            bridge.take(),
            vec![HostCommand::Submit {
                field: "Word".to_string(),
                content: EncodedContent::encode("wor[ld]"),
                reload: true,
            }]
        );

        root.remove();
        clear_editable_fields();
    }

    #[wasm_bindgen_test]
    fn test_f2_prevents_default_and_requests_syntax() {
        clear_editable_fields();
        let root = mount(&format!(
            r#"<div class="editable-field" data-field-name="Front" data-content="{}"></div>"#,
            codec::encode("<b>x</b>")
        ));
        let el = field_el(&root);
        let bridge = Rc::new(RecordingBridge::<HostCommand>::default());
        init_editable_fields(bridge.clone()).unwrap();
        assert!(el.class_list().contains(EMPTY_CLASS));

        fire(&el, "dblclick");
        let not_cancelled = press(&el, "F2", false);

        assert!(!not_cancelled);
        assert_eq!(el.content_editable(), "false");
        assert_eq!(
            bridge.take(),
            vec![HostCommand::SyntaxAdd {
                field: "Front".to_string(),
                content: EncodedContent::encode("<b>x</b>"),
            }]
        );

        root.remove();
        clear_editable_fields();
    }

    #[wasm_bindgen_test]
    fn test_ctrl_enter_commits_exactly_once() {
        clear_editable_fields();
        let root = mount(&format!(
            r#"<div class="editable-field" data-field-name="Back" data-content="{}">a</div>"#,
            codec::encode("a")
        ));
        let el = field_el(&root);
        let bridge = Rc::new(RecordingBridge::<HostCommand>::default());
        init_editable_fields(bridge.clone()).unwrap();

        fire(&el, "dblclick");
        el.focus().unwrap();
        el.set_inner_html("ab");
        let not_cancelled = press(&el, "Enter", true);

        assert!(!not_cancelled);
        assert!(!el.class_list().contains(ACTIVE_CLASS));
        assert_eq!(el.content_editable(), "false");
        // A late blur from the browser must not submit a second time.
        fire(&el, "blur");
        assert_eq!(
            bridge.take(),
            vec![HostCommand::Submit {
                field: "Back".to_string(),
                content: EncodedContent::encode("ab"),
                reload: false,
            }]
        );

        root.remove();
        clear_editable_fields();
    }

    #[wasm_bindgen_test]
    fn test_activation_reads_rewritten_data_content() {
        clear_editable_fields();
        let root = mount(r#"<div class="editable-field" data-field-name="F" data-content="">x</div>"#);
        let el = field_el(&root);
        let bridge = Rc::new(RecordingBridge::<HostCommand>::default());
        init_editable_fields(bridge).unwrap();

        el.set_attribute(CONTENT_ATTR, &codec::encode("y[z]")).unwrap();
        fire(&el, "dblclick");

        assert_eq!(el.inner_html(), "y[z]");
        root.remove();
        clear_editable_fields();
    }

    #[wasm_bindgen_test]
    fn test_detached_fields_are_unbound() {
        clear_editable_fields();
        let bridge = Rc::new(RecordingBridge::<HostCommand>::default());
        let first = mount(r#"<div class="editable-field" data-field-name="A" data-content=""></div>"#);
        assert_eq!(init_editable_fields(bridge.clone()).unwrap(), 1);

        first.remove();
        let second = mount(r#"<div class="editable-field" data-field-name="B" data-content=""></div>"#);
        assert_eq!(init_editable_fields(bridge.clone()).unwrap(), 1);
        assert_eq!(BOUND.with(|b| b.borrow().len()), 1);

        second.remove();
        clear_editable_fields();
    }

    #[wasm_bindgen_test]
    fn test_show_empty_fields_and_stylesheet() {
        let root = mount(r#"<div id="qa"></div>"#);
        set_show_empty_fields(true).unwrap();
        let qa = document().unwrap().get_element_by_id(QA_ID).unwrap();
        assert!(qa.class_list().contains(SHOW_EMPTY_CLASS));
        set_show_empty_fields(false).unwrap();
        assert!(!qa.class_list().contains(SHOW_EMPTY_CLASS));
        root.remove();

        inject_stylesheet("inplace_editor.css").unwrap();
        inject_stylesheet("inplace_editor.css").unwrap();
        let links = document()
            .unwrap()
            .query_selector_all("link[href=\"inplace_editor.css\"]")
            .unwrap();
        assert_eq!(links.length(), 1);
    }
}
