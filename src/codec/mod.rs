//! Transport encoding for field HTML.
//!
//! The host side reads these strings with `base64.b64decode(..).decode('utf-8')`,
//! and the JS it replaced built them as `btoa` over the percent-encoded
//! UTF-8 bytes. Both reduce to standard base64 over the UTF-8 bytes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid base64 content: {0}")]
    InvalidBase64(String),
    #[error("decoded content is not valid UTF-8")]
    InvalidUtf8,
}

pub fn encode(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

pub fn decode(encoded: &str) -> Result<String, CodecError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| CodecError::InvalidBase64(e.to_string()))?;
    String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)
}

/// Field content as it travels in `data-content` and bridge payloads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EncodedContent(String);

impl EncodedContent {
    pub fn encode(text: &str) -> Self {
        Self(encode(text))
    }

    /// Wrap a string that is already in transport form (e.g. read back from
    /// a `data-content` attribute). Validity is only checked on `decode`.
    pub fn from_encoded(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn decode(&self) -> Result<String, CodecError> {
        decode(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EncodedContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_matches_host_base64() {
        // base64.b64encode("<b>x</b>".encode("utf-8"))
        assert_eq!(encode("<b>x</b>"), "PGI+eDwvYj4=");
        // btoa(unescape(encodeURIComponent("日本")))
        assert_eq!(encode("日本"), "5pel5pys");
        assert_eq!(encode(""), "");
    }

    #[test]
    fn test_roundtrip_unicode_and_markup() {
        let samples = [
            "plain",
            "<div class=\"a\">héllo &amp; 世界</div>",
            "tab\tnewline\ncr\r\0nul",
            "emoji 🦀 and combining e\u{301}",
            "{{c1::answer}} [sound:word.mp3] 100%",
        ];
        for s in samples {
            assert_eq!(decode(&encode(s)).as_deref(), Ok(s));
        }
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        assert!(matches!(decode("not base64!"), Err(CodecError::InvalidBase64(_))));
    }

    #[test]
    fn test_decode_rejects_non_utf8_bytes() {
        // 0xff 0xfe is not valid UTF-8; decodeURIComponent would throw here too.
        let raw = STANDARD.encode([0xffu8, 0xfe]);
        assert_eq!(decode(&raw), Err(CodecError::InvalidUtf8));
    }

    #[test]
    fn test_decode_tolerates_attribute_whitespace() {
        assert_eq!(decode(" PGI+eDwvYj4=\n").as_deref(), Ok("<b>x</b>"));
    }

    #[test]
    fn test_encoded_content_wraps_raw_attribute() {
        let c = EncodedContent::from_encoded("5pel5pys");
        assert_eq!(c.decode().as_deref(), Ok("日本"));
        assert_eq!(c.to_string(), "5pel5pys");
        assert_eq!(EncodedContent::encode("日本"), c);
    }
}
