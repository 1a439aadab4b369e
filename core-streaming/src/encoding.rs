//! Encoding descriptor model.

use serde::{Deserialize, Serialize};

/// One bitrate/codec/container variant of a track's audio stream.
///
/// At most one descriptor is persisted per track (the *chosen* encoding);
/// once a track has been played or downloaded at a given encoding the same
/// descriptor keeps being used so locally cached bytes stay consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingDescriptor {
    /// Remote format tag identifying this variant within the catalog.
    pub format_tag: i32,
    /// Container MIME type with parameters stripped (e.g. `audio/webm`).
    pub mime_type: String,
    /// Codec string extracted from the MIME `codecs` parameter.
    pub codec: String,
    /// Average bitrate in bits per second.
    pub bitrate_bps: i64,
    /// Audio sample rate, when reported.
    pub sample_rate_hz: Option<u32>,
    /// Total content length in bytes, when reported.
    pub content_length: Option<u64>,
    /// Perceptual loudness reported by the metadata service.
    pub loudness_db: Option<f32>,
}

impl EncodingDescriptor {
    /// Whether this encoding carries an audio stream.
    pub fn is_audio(&self) -> bool {
        self.mime_type.starts_with("audio/")
    }
}

/// Split a raw MIME string into (container, codec).
///
/// `audio/webm; codecs="opus"` → (`audio/webm`, `opus`). A missing `codecs`
/// parameter yields an empty codec string.
pub(crate) fn parse_mime(raw: &str) -> (String, String) {
    let container = raw
        .split(';')
        .next()
        .unwrap_or(raw)
        .trim()
        .to_string();

    let codec = raw
        .split_once("codecs=")
        .map(|(_, rest)| rest.trim().trim_matches('"').to_string())
        .unwrap_or_default();

    (container, codec)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(mime: &str) -> EncodingDescriptor {
        EncodingDescriptor {
            format_tag: 251,
            mime_type: mime.to_string(),
            codec: "opus".to_string(),
            bitrate_bps: 160_000,
            sample_rate_hz: Some(48_000),
            content_length: Some(4_000_000),
            loudness_db: None,
        }
    }

    #[test]
    fn test_is_audio() {
        assert!(descriptor("audio/webm").is_audio());
        assert!(descriptor("audio/mp4").is_audio());
        assert!(!descriptor("video/mp4").is_audio());
    }

    #[test]
    fn test_parse_mime_with_codecs() {
        let (container, codec) = parse_mime("audio/webm; codecs=\"opus\"");
        assert_eq!(container, "audio/webm");
        assert_eq!(codec, "opus");
    }

    #[test]
    fn test_parse_mime_mp4a() {
        let (container, codec) = parse_mime("audio/mp4; codecs=\"mp4a.40.2\"");
        assert_eq!(container, "audio/mp4");
        assert_eq!(codec, "mp4a.40.2");
    }

    #[test]
    fn test_parse_mime_without_codecs() {
        let (container, codec) = parse_mime("audio/mpeg");
        assert_eq!(container, "audio/mpeg");
        assert_eq!(codec, "");
    }
}
