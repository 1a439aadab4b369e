//! Deterministic encoding selection.
//!
//! Picks exactly one encoding from a catalog given the configured quality
//! policy and the current network-metering state. The decision is a pure
//! function of its inputs so repeated resolutions agree with each other.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::encoding::EncodingDescriptor;
use crate::error::{Result, StreamingError};

/// Externally configured audio quality policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamQuality {
    /// Adapt to the network: conservative on metered connections.
    Auto,
    Low,
    High,
    Max,
}

impl StreamQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamQuality::Auto => "auto",
            StreamQuality::Low => "low",
            StreamQuality::High => "high",
            StreamQuality::Max => "max",
        }
    }
}

impl Default for StreamQuality {
    fn default() -> Self {
        StreamQuality::Auto
    }
}

impl FromStr for StreamQuality {
    type Err = StreamingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(StreamQuality::Auto),
            "low" => Ok(StreamQuality::Low),
            "high" => Ok(StreamQuality::High),
            "max" => Ok(StreamQuality::Max),
            _ => Err(StreamingError::InvalidConfig(format!(
                "Unknown stream quality: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for StreamQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Score bonus for the Opus/WebM container at equal or near-equal bitrate.
const OPUS_CONTAINER_BONUS: i64 = 10_240;

/// Bitrate multiplier table.
///
/// The asymmetry between Auto-metered (−1) and Auto-unmetered (−4) is a
/// deliberate policy constant carried over from the shipped behavior; do not
/// rederive it from first principles.
fn quality_weight(quality: StreamQuality, metered: bool) -> i64 {
    match quality {
        StreamQuality::Auto => {
            if metered {
                -1
            } else {
                -4
            }
        }
        StreamQuality::Max => 5,
        StreamQuality::High => 1,
        StreamQuality::Low => -1,
    }
}

/// Select one encoding from `encodings`.
///
/// When `prior_tag` names an encoding still present in the catalog, that
/// encoding is returned unchanged — stability across resolutions matters more
/// than the current quality policy, because cached bytes and persisted
/// metadata belong to the previously chosen encoding.
///
/// Otherwise the audio-only encodings are scored as
/// `bitrate * quality_weight + opus_bonus` and the highest score wins; ties
/// keep the first occurrence in catalog order.
///
/// # Errors
///
/// Returns [`StreamingError::NoPlayableEncoding`] when no audio encoding
/// exists (and no prior tag matched).
pub fn select_encoding<'a>(
    encodings: &'a [EncodingDescriptor],
    prior_tag: Option<i32>,
    quality: StreamQuality,
    metered: bool,
) -> Result<&'a EncodingDescriptor> {
    if let Some(tag) = prior_tag {
        if let Some(encoding) = encodings.iter().find(|e| e.format_tag == tag) {
            return Ok(encoding);
        }
    }

    let weight = quality_weight(quality, metered);
    let mut best: Option<(&EncodingDescriptor, i64)> = None;

    for encoding in encodings.iter().filter(|e| e.is_audio()) {
        let bonus = if encoding.mime_type.starts_with("audio/webm") {
            OPUS_CONTAINER_BONUS
        } else {
            0
        };
        let score = encoding.bitrate_bps * weight + bonus;

        // strictly-greater keeps the first occurrence on ties
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((encoding, score)),
        }
    }

    best.map(|(encoding, _)| encoding)
        .ok_or(StreamingError::NoPlayableEncoding)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoding(tag: i32, mime: &str, bitrate: i64) -> EncodingDescriptor {
        EncodingDescriptor {
            format_tag: tag,
            mime_type: mime.to_string(),
            codec: String::new(),
            bitrate_bps: bitrate,
            sample_rate_hz: None,
            content_length: None,
            loudness_db: None,
        }
    }

    #[test]
    fn test_prior_tag_wins_regardless_of_policy() {
        let encodings = vec![
            encoding(140, "audio/mp4", 128_000),
            encoding(251, "audio/webm", 160_000),
        ];

        let chosen = select_encoding(&encodings, Some(140), StreamQuality::Max, false).unwrap();
        assert_eq!(chosen.format_tag, 140);
    }

    #[test]
    fn test_prior_tag_absent_falls_back_to_scoring() {
        let encodings = vec![encoding(251, "audio/webm", 160_000)];

        let chosen = select_encoding(&encodings, Some(140), StreamQuality::Auto, true).unwrap();
        assert_eq!(chosen.format_tag, 251);
    }

    #[test]
    fn test_opus_bonus_breaks_bitrate_tie() {
        // AUTO on an unmetered network: equal bitrates, webm must win
        let encodings = vec![
            encoding(140, "audio/mp4", 128_000),
            encoding(251, "audio/webm", 128_000),
        ];

        let chosen = select_encoding(&encodings, None, StreamQuality::Auto, false).unwrap();
        assert_eq!(chosen.mime_type, "audio/webm");
    }

    #[test]
    fn test_low_prefers_lower_bitrate() {
        let encodings = vec![
            encoding(139, "audio/mp4", 64_000),
            encoding(141, "audio/mp4", 160_000),
        ];

        let chosen = select_encoding(&encodings, None, StreamQuality::Low, false).unwrap();
        assert_eq!(chosen.bitrate_bps, 64_000);
    }

    #[test]
    fn test_max_prefers_higher_bitrate() {
        let encodings = vec![
            encoding(139, "audio/mp4", 64_000),
            encoding(141, "audio/mp4", 160_000),
        ];

        let chosen = select_encoding(&encodings, None, StreamQuality::Max, false).unwrap();
        assert_eq!(chosen.bitrate_bps, 160_000);
    }

    #[test]
    fn test_auto_metered_prefers_lower_bitrate() {
        let encodings = vec![
            encoding(139, "audio/mp4", 64_000),
            encoding(141, "audio/mp4", 160_000),
        ];

        let chosen = select_encoding(&encodings, None, StreamQuality::Auto, true).unwrap();
        assert_eq!(chosen.bitrate_bps, 64_000);
    }

    #[test]
    fn test_video_encodings_ignored() {
        let encodings = vec![
            encoding(137, "video/mp4", 4_000_000),
            encoding(140, "audio/mp4", 128_000),
        ];

        let chosen = select_encoding(&encodings, None, StreamQuality::Max, false).unwrap();
        assert_eq!(chosen.format_tag, 140);
    }

    #[test]
    fn test_no_audio_encoding_errors() {
        let encodings = vec![encoding(137, "video/mp4", 4_000_000)];

        let result = select_encoding(&encodings, None, StreamQuality::Auto, false);
        assert!(matches!(result, Err(StreamingError::NoPlayableEncoding)));
    }

    #[test]
    fn test_deterministic_for_equal_inputs() {
        let encodings = vec![
            encoding(140, "audio/mp4", 128_000),
            encoding(251, "audio/webm", 160_000),
            encoding(250, "audio/webm", 70_000),
        ];

        let first = select_encoding(&encodings, None, StreamQuality::High, false)
            .unwrap()
            .format_tag;
        for _ in 0..10 {
            let again = select_encoding(&encodings, None, StreamQuality::High, false)
                .unwrap()
                .format_tag;
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_tie_keeps_first_occurrence() {
        let encodings = vec![
            encoding(1, "audio/mp4", 128_000),
            encoding(2, "audio/mp4", 128_000),
        ];

        let chosen = select_encoding(&encodings, None, StreamQuality::High, false).unwrap();
        assert_eq!(chosen.format_tag, 1);
    }

    #[test]
    fn test_quality_parsing() {
        assert_eq!("auto".parse::<StreamQuality>().unwrap(), StreamQuality::Auto);
        assert_eq!("MAX".parse::<StreamQuality>().unwrap(), StreamQuality::Max);
        assert!("ultra".parse::<StreamQuality>().is_err());
    }
}
