use crate::bridge::{EditorCommand, HostBridge, JsBridge};
use crate::models::ContentType;
use leptos::prelude::*;
use strum::IntoEnumIterator;

pub(crate) const SELECTOR_CLASS: &str = "migaku-field-selector";
pub(crate) const INTERCEPT_ID: &str = "migaku_btn_intercept_fields";

fn send_editor_command(command: EditorCommand) {
    if let Err(e) = JsBridge::BridgeCommand.send(command) {
        tracing::error!("editor command not delivered: {e}");
    }
}

/// Content-type picker appended below a note field in Migaku Mode.
#[component]
pub fn FieldSelector(label: String, selected: ContentType) -> impl IntoView {
    let on_change = move |ev: web_sys::Event| {
        let value = event_target_value(&ev);
        let Ok(content_type) = value.parse::<ContentType>() else {
            tracing::warn!(value = %value, "unknown content type selected");
            return;
        };
        send_editor_command(EditorCommand::SelectChange {
            content_type,
            field_label: label.clone(),
        });
    };

    view! {
        <div class=SELECTOR_CLASS>
            <select style="margin: 2px" on:change=on_change>
                {ContentType::iter()
                    .map(|ct| {
                        let value: &'static str = ct.into();
                        view! {
                            <option value=value selected={ct == selected}>
                                {ct.label()}
                            </option>
                        }
                    })
                    .collect_view()}
            </select>
        </div>
    }
}

/// "Intercept Fields" checkbox next to the Migaku Mode button.
#[component]
pub fn InterceptToggle() -> impl IntoView {
    let on_change = move |ev: web_sys::Event| {
        send_editor_command(EditorCommand::Intercept(event_target_checked(&ev)));
    };

    view! {
        <input type="checkbox" id=INTERCEPT_ID style="margin: 0 3px" on:change=on_change />
        <label r#for=INTERCEPT_ID style="user-select: none; padding: 0 3px">
            "Intercept Fields"
        </label>
    }
}
