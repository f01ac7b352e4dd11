//! Schema-validated stream metadata fetched from a node
//!
//! Node agents expose a per-stream JSON blob; only the fields below are
//! extracted and everything else in the document is ignored.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamMeta {
    #[serde(default)]
    pub live: bool,
    #[serde(rename = "buffer_window")]
    pub buffer_window: Option<u64>,
    pub jitter: Option<u64>,
    pub unixoffset: Option<i64>,
    #[serde(rename = "type")]
    pub stream_type: Option<String>,
    #[serde(default)]
    pub tracks: Vec<TrackMeta>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackMeta {
    #[serde(rename = "type")]
    pub track_type: Option<String>,
    pub codec: Option<String>,
    pub channels: Option<u32>,
    pub rate: Option<u32>,
    pub bps: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub nowms: Option<u64>,
    pub lastms: Option<u64>,
    pub firstms: Option<u64>,
}

impl StreamMeta {
    /// Parse the node's meta document, keeping only the known fields.
    ///
    /// The blob nests tracks under `meta.tracks` as a map keyed by track
    /// name; top-level `meta` carries the stream-wide fields.
    pub fn from_raw(raw: &serde_json::Value) -> Self {
        let meta = raw.get("meta").unwrap_or(raw);
        let tracks = meta
            .get("tracks")
            .and_then(|t| t.as_object())
            .map(|m| {
                m.values()
                    .filter_map(|v| serde_json::from_value(v.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            live: meta.get("live").and_then(|v| v.as_u64()).unwrap_or(0) != 0
                || meta.get("live").and_then(|v| v.as_bool()).unwrap_or(false),
            buffer_window: meta.get("buffer_window").and_then(|v| v.as_u64()),
            jitter: meta.get("jitter").and_then(|v| v.as_u64()),
            unixoffset: raw.get("unixoffset").and_then(|v| v.as_i64()),
            stream_type: raw
                .get("type")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            tracks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_known_fields_and_ignores_rest() {
        let raw = json!({
            "type": "live",
            "unixoffset": 1700000000,
            "meta": {
                "live": 1,
                "buffer_window": 50000,
                "jitter": 420,
                "unrecognized": {"deep": true},
                "tracks": {
                    "video_H264_1920x1080_30fps": {
                        "type": "video", "codec": "H264",
                        "width": 1920, "height": 1080,
                        "bps": 4000000, "nowms": 99000, "lastms": 99000, "firstms": 0,
                        "mystery_field": 7
                    },
                    "audio_AAC_2ch_44100hz": {
                        "type": "audio", "codec": "AAC",
                        "channels": 2, "rate": 44100, "bps": 128000
                    }
                }
            }
        });

        let meta = StreamMeta::from_raw(&raw);
        assert!(meta.live);
        assert_eq!(meta.buffer_window, Some(50000));
        assert_eq!(meta.jitter, Some(420));
        assert_eq!(meta.unixoffset, Some(1700000000));
        assert_eq!(meta.stream_type.as_deref(), Some("live"));
        assert_eq!(meta.tracks.len(), 2);
        let video = meta.tracks.iter().find(|t| t.track_type.as_deref() == Some("video")).unwrap();
        assert_eq!(video.width, Some(1920));
        assert_eq!(video.codec.as_deref(), Some("H264"));
    }

    #[test]
    fn empty_document_yields_defaults() {
        let meta = StreamMeta::from_raw(&json!({}));
        assert!(!meta.live);
        assert!(meta.tracks.is_empty());
        assert_eq!(meta.buffer_window, None);
    }
}
