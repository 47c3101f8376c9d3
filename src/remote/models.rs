//! Remote track models

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum description length (in characters) kept in a [`TrackInfo`]
const DESCRIPTION_EXCERPT_CHARS: usize = 200;

/// Metadata snapshot for a remote audio track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub title: String,
    pub author: String,
    pub duration_seconds: u64,
    pub view_count: u64,
    /// First 200 characters of the description, `...` appended if cut
    pub description_excerpt: String,
    pub thumbnail_url: Option<String>,
    pub video_id: String,
}

/// One audio-only stream offered by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioStream {
    pub format_id: String,
    pub url: String,
    /// Average bitrate in kbit/s, if the platform reports one
    pub bitrate_kbps: Option<f64>,
    /// Container extension, e.g. `webm` or `m4a`
    pub extension: String,
    pub byte_size: Option<u64>,
    /// Headers the platform expects on the download request
    #[serde(default)]
    pub http_headers: HashMap<String, String>,
}

/// Everything a single platform lookup returns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteTrack {
    pub video_id: String,
    pub title: String,
    pub author: String,
    pub duration_seconds: u64,
    pub view_count: u64,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub streams: Vec<AudioStream>,
}

impl RemoteTrack {
    /// Metadata view of this track with the description cut to an excerpt
    pub fn info(&self) -> TrackInfo {
        TrackInfo {
            title: self.title.clone(),
            author: self.author.clone(),
            duration_seconds: self.duration_seconds,
            view_count: self.view_count,
            description_excerpt: description_excerpt(&self.description),
            thumbnail_url: self.thumbnail_url.clone(),
            video_id: self.video_id.clone(),
        }
    }

    /// Audio-only stream with the highest bitrate
    pub fn best_audio_stream(&self) -> Option<&AudioStream> {
        self.streams.iter().max_by(|a, b| {
            let a = a.bitrate_kbps.unwrap_or(0.0);
            let b = b.bitrate_kbps.unwrap_or(0.0);
            a.total_cmp(&b)
        })
    }
}

fn description_excerpt(description: &str) -> String {
    if description.chars().count() > DESCRIPTION_EXCERPT_CHARS {
        let cut: String = description.chars().take(DESCRIPTION_EXCERPT_CHARS).collect();
        format!("{}...", cut)
    } else {
        description.to_string()
    }
}
