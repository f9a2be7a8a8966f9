use crate::codec::EncodedContent;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{AsRefStr, EnumIter, EnumString, IntoStaticStr};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FieldState {
    #[default]
    Inactive,
    Active,
}

/// What the controller knows about one editable field.
///
/// `committed` mirrors `data-content`: the content as of the last completed
/// deactivation, in transport form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldRecord {
    pub name: String,
    pub committed: EncodedContent,
    pub empty: bool,
}

impl FieldRecord {
    pub fn new(name: impl Into<String>, committed: EncodedContent, rendered_html: &str) -> Self {
        Self {
            name: name.into(),
            committed,
            empty: crate::markup::is_blank(rendered_html),
        }
    }
}

/// Role of a note field in Migaku card creation, as picked in the editor's
/// field selector. Wire values are what the host stores in `migakuFields`.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    IntoStaticStr,
    EnumString,
    EnumIter,
)]
#[strum(serialize_all = "camelCase")]
pub enum ContentType {
    #[default]
    None,
    Sentence,
    TargetWord,
    Translation,
    SentenceAudio,
    WordAudio,
    Images,
    Definitions,
    ExampleSentences,
    Notes,
}

impl ContentType {
    pub fn label(self) -> &'static str {
        match self {
            ContentType::None => "(None)",
            ContentType::Sentence => "Sentence",
            ContentType::TargetWord => "Word",
            ContentType::Translation => "Sentence Translation",
            ContentType::SentenceAudio => "Sentence Audio",
            ContentType::WordAudio => "Word Audio",
            ContentType::Images => "Image",
            ContentType::Definitions => "Definitions",
            ContentType::ExampleSentences => "Example sentences",
            ContentType::Notes => "Notes",
        }
    }
}

/// Field label -> content type, as sent by the host when Migaku Mode opens.
///
/// Values are kept as raw strings: the host infers some types with names the
/// selector does not offer (e.g. `sentence_audio`), and those must not make
/// the whole payload fail.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct FieldSettings(pub BTreeMap<String, String>);

impl FieldSettings {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn content_type_for(&self, label: &str) -> ContentType {
        self.0
            .get(label)
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }
}
