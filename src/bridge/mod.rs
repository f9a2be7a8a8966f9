//! Typed commands sent to the Python side, and the capability that sends them.
//!
//! The reviewer listens on `pycmd` with pipe-delimited messages, the note
//! editor on `bridgeCommand` with colon-delimited ones. Both wire formats only
//! exist in the `Display`/`FromStr` impls below.

use crate::codec::EncodedContent;
use crate::models::ContentType;
use crate::util::js_error_message;
use std::fmt;
use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};

pub(crate) const SUBMIT: &str = "inplace-edit-submit";
pub(crate) const SYNTAX_ADD: &str = "inplace-edit-syntax-add";
pub(crate) const SYNTAX_REMOVE: &str = "inplace-edit-syntax-remove";
pub(crate) const PASTE: &str = "inplace-paste";

pub(crate) const SELECT_CHANGE: &str = "migakuSelectChange";
pub(crate) const INTERCEPT: &str = "migakuIntercept";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("host function `{0}` is not defined")]
    MissingGlobal(&'static str),
    #[error("host call failed: {0}")]
    CallFailed(String),
    #[error("malformed command: {0}")]
    Malformed(String),
}

/// Commands from the reviewer's in-place editor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostCommand {
    Submit {
        field: String,
        content: EncodedContent,
        reload: bool,
    },
    SyntaxAdd {
        field: String,
        content: EncodedContent,
    },
    SyntaxRemove {
        field: String,
        content: EncodedContent,
    },
    Paste,
}

impl HostCommand {
    pub fn name(&self) -> &'static str {
        match self {
            HostCommand::Submit { .. } => SUBMIT,
            HostCommand::SyntaxAdd { .. } => SYNTAX_ADD,
            HostCommand::SyntaxRemove { .. } => SYNTAX_REMOVE,
            HostCommand::Paste => PASTE,
        }
    }
}

impl fmt::Display for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostCommand::Submit {
                field,
                content,
                reload,
            } => write!(f, "{SUBMIT}|{field}|{content}|{reload}"),
            HostCommand::SyntaxAdd { field, content } => write!(f, "{SYNTAX_ADD}|{field}|{content}"),
            HostCommand::SyntaxRemove { field, content } => {
                write!(f, "{SYNTAX_REMOVE}|{field}|{content}")
            }
            HostCommand::Paste => f.write_str(PASTE),
        }
    }
}

impl std::str::FromStr for HostCommand {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || BridgeError::Malformed(s.to_string());
        let parts: Vec<&str> = s.split('|').collect();

        match parts.as_slice() {
            [PASTE] => Ok(HostCommand::Paste),
            [SUBMIT, field, content, reload] => Ok(HostCommand::Submit {
                field: field.to_string(),
                content: EncodedContent::from_encoded(*content),
                reload: match *reload {
                    "true" => true,
                    "false" => false,
                    _ => return Err(malformed()),
                },
            }),
            [SYNTAX_ADD, field, content] => Ok(HostCommand::SyntaxAdd {
                field: field.to_string(),
                content: EncodedContent::from_encoded(*content),
            }),
            [SYNTAX_REMOVE, field, content] => Ok(HostCommand::SyntaxRemove {
                field: field.to_string(),
                content: EncodedContent::from_encoded(*content),
            }),
            _ => Err(malformed()),
        }
    }
}

/// Commands from the note editor's Migaku Mode overlay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditorCommand {
    SelectChange {
        content_type: ContentType,
        field_label: String,
    },
    Intercept(bool),
}

impl fmt::Display for EditorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditorCommand::SelectChange {
                content_type,
                field_label,
            } => write!(f, "{SELECT_CHANGE}:{}:{field_label}", content_type.as_ref()),
            EditorCommand::Intercept(on) => write!(f, "{INTERCEPT}:{on}"),
        }
    }
}

impl std::str::FromStr for EditorCommand {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || BridgeError::Malformed(s.to_string());

        // The host splits with maxsplit=2, so labels may contain ':'.
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(SELECT_CHANGE), Some(value), Some(label)) => Ok(EditorCommand::SelectChange {
                content_type: value.parse().map_err(|_| malformed())?,
                field_label: label.to_string(),
            }),
            (Some(INTERCEPT), Some("true"), None) => Ok(EditorCommand::Intercept(true)),
            (Some(INTERCEPT), Some("false"), None) => Ok(EditorCommand::Intercept(false)),
            _ => Err(malformed()),
        }
    }
}

/// Capability to deliver a command to the host application.
///
/// Delivery is fire-and-forget: `Ok` means the host function accepted the
/// call, not that the command had any effect.
pub trait HostBridge<C> {
    fn send(&self, command: C) -> Result<(), BridgeError>;
}

/// The host's global message functions as injected into the webview.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JsBridge {
    /// `pycmd`, available in the reviewer.
    Pycmd,
    /// `bridgeCommand`, available in the note editor.
    BridgeCommand,
}

impl JsBridge {
    pub fn global_name(self) -> &'static str {
        match self {
            JsBridge::Pycmd => "pycmd",
            JsBridge::BridgeCommand => "bridgeCommand",
        }
    }
}

impl<C: fmt::Display> HostBridge<C> for JsBridge {
    fn send(&self, command: C) -> Result<(), BridgeError> {
        let name = self.global_name();
        let wire = command.to_string();

        let target = js_sys::Reflect::get(&js_sys::global(), &JsValue::from_str(name))
            .map_err(|e| BridgeError::CallFailed(js_error_message(&e)))?;
        let Some(func) = target.dyn_ref::<js_sys::Function>() else {
            return Err(BridgeError::MissingGlobal(name));
        };

        func.call1(&JsValue::NULL, &JsValue::from_str(&wire))
            .map_err(|e| BridgeError::CallFailed(js_error_message(&e)))?;

        tracing::debug!(bridge = name, len = wire.len(), "sent host command");
        Ok(())
    }
}
