//! In-place editing lifecycle for one reviewer field.
//!
//! The controller owns the field's state and record. The element itself is
//! reached only through [`FieldSurface`], so everything here runs without a
//! browser.

use crate::bridge::{BridgeError, HostBridge, HostCommand};
use crate::codec::{CodecError, EncodedContent};
use crate::markup;
use crate::models::{FieldRecord, FieldState};
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("field `{field}` has undecodable content: {source}")]
    Codec {
        field: String,
        #[source]
        source: CodecError,
    },
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// The parts of an editable element the controller reads and writes.
pub trait FieldSurface {
    fn inner_html(&self) -> String;
    fn set_inner_html(&self, html: &str);
    fn set_editable(&self, editable: bool);
    fn set_active_flag(&self, active: bool);
    fn set_empty_flag(&self, empty: bool);
    /// The live `data-content` value, `None` when the attribute is absent.
    fn committed(&self) -> Option<EncodedContent>;
    fn set_committed(&self, content: &EncodedContent);
    /// Whether the element's parent carries the `field` class.
    fn in_field_container(&self) -> bool;
    fn focus(&self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyChord<'a> {
    pub key: &'a str,
    pub ctrl: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Commit,
    SyntaxAdd,
    SyntaxRemove,
    Paste,
}

impl KeyAction {
    pub fn from_chord(chord: KeyChord<'_>) -> Option<Self> {
        match chord.key {
            "Enter" if chord.ctrl => Some(KeyAction::Commit),
            "F2" => Some(KeyAction::SyntaxAdd),
            "F4" => Some(KeyAction::SyntaxRemove),
            k if chord.ctrl && k.eq_ignore_ascii_case("v") => Some(KeyAction::Paste),
            _ => None,
        }
    }
}

/// What the event glue has to do once the controller is done.
///
/// Blurring re-enters the controller through the blur handler, so it must
/// happen after the controller's borrow is released.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyOutcome {
    pub prevent_default: bool,
    pub release_focus: bool,
}

pub struct FieldController {
    state: FieldState,
    record: FieldRecord,
    bridge: Rc<dyn HostBridge<HostCommand>>,
}

impl FieldController {
    pub fn new(record: FieldRecord, bridge: Rc<dyn HostBridge<HostCommand>>) -> Self {
        Self {
            state: FieldState::Inactive,
            record,
            bridge,
        }
    }

    pub fn state(&self) -> FieldState {
        self.state
    }

    pub fn record(&self) -> &FieldRecord {
        &self.record
    }

    /// Project the initial record onto the element.
    pub fn attach<S: FieldSurface + ?Sized>(&self, surface: &S) {
        surface.set_empty_flag(self.record.empty);
    }

    pub fn activate<S: FieldSurface + ?Sized>(&mut self, surface: &S) -> Result<(), FieldError> {
        if self.state == FieldState::Active {
            return Ok(());
        }

        let committed = surface
            .committed()
            .unwrap_or_else(|| self.record.committed.clone());
        let content = committed.decode().map_err(|source| FieldError::Codec {
            field: self.record.name.clone(),
            source,
        })?;

        self.record.committed = committed;
        self.state = FieldState::Active;
        surface.set_active_flag(true);
        surface.set_editable(true);
        surface.set_inner_html(&content);
        surface.focus();

        tracing::debug!(field = %self.record.name, "field activated");
        Ok(())
    }

    pub fn deactivate<S: FieldSurface + ?Sized>(&mut self, surface: &S) -> Result<(), FieldError> {
        if self.state == FieldState::Inactive {
            return Ok(());
        }

        surface.set_editable(false);
        self.state = FieldState::Inactive;
        surface.set_active_flag(false);

        let html = surface.inner_html();
        self.record.empty = markup::is_blank(&html);
        surface.set_empty_flag(self.record.empty);

        let content = EncodedContent::encode(&html);
        self.record.committed = content.clone();
        surface.set_committed(&content);

        let reload = markup::needs_reload(&html, surface.in_field_container());
        tracing::debug!(field = %self.record.name, reload, "field committed");

        self.bridge.send(HostCommand::Submit {
            field: self.record.name.clone(),
            content,
            reload,
        })?;
        Ok(())
    }

    pub fn keydown<S: FieldSurface + ?Sized>(
        &mut self,
        surface: &S,
        chord: KeyChord<'_>,
    ) -> Result<KeyOutcome, FieldError> {
        if self.state == FieldState::Inactive {
            return Ok(KeyOutcome::default());
        }
        let Some(action) = KeyAction::from_chord(chord) else {
            return Ok(KeyOutcome::default());
        };

        let handled = KeyOutcome {
            prevent_default: true,
            release_focus: false,
        };

        match action {
            KeyAction::Commit => Ok(KeyOutcome {
                release_focus: true,
                ..handled
            }),
            KeyAction::SyntaxAdd | KeyAction::SyntaxRemove => {
                // Leaves edit mode without committing: `committed` and the
                // empty flag keep their previous values.
                surface.set_editable(false);
                self.state = FieldState::Inactive;
                surface.set_active_flag(false);

                let field = self.record.name.clone();
                let content = EncodedContent::encode(&surface.inner_html());
                let command = if action == KeyAction::SyntaxAdd {
                    HostCommand::SyntaxAdd { field, content }
                } else {
                    HostCommand::SyntaxRemove { field, content }
                };

                tracing::debug!(field = %self.record.name, command = command.name(), "syntax request");
                self.bridge.send(command)?;
                Ok(handled)
            }
            KeyAction::Paste => {
                self.bridge.send(HostCommand::Paste)?;
                Ok(handled)
            }
        }
    }
}
