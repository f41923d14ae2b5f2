//! YouTube Data API v3 content source.
//!
//! Video metadata comes from the `videos` and `search` endpoints. Subtitles
//! are not available through the public API, so they are read from
//! `{subtitles_dir}/{video_id}.srt` when that file exists.

use super::{ContentDetails, ContentItem, ContentSource, VideoDetails};
use crate::error::{Result, WayfindError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Default API root.
pub const DEFAULT_YOUTUBE_API_URL: &str = "https://www.googleapis.com/youtube/v3/";

/// Largest page the search endpoint accepts.
const MAX_RESULTS_PER_PAGE: usize = 50;

// Matches various YouTube URL formats and bare video IDs
static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?:
            (?:https?://)?
            (?:www\.|m\.)?
            (?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/shorts/)
            ([a-zA-Z0-9_-]{11})
        )
        |
        ^([a-zA-Z0-9_-]{11})$
    ",
    )
    .expect("Invalid video id regex")
});

/// Extract a video ID from a YouTube URL or bare ID.
pub fn extract_video_id(input: &str) -> Option<String> {
    let caps = VIDEO_ID.captures(input.trim())?;

    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Canonical watch URL for a video.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoResource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResource {
    id: String,
    snippet: Snippet,
    content_details: Option<VideoContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    channel_id: String,
    #[serde(default)]
    channel_title: String,
    published_at: Option<DateTime<Utc>>,
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct VideoContentDetails {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: SearchResultId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResultId {
    video_id: Option<String>,
}

/// YouTube content source.
pub struct YoutubeSource {
    client: Client,
    base_url: Url,
    api_key: String,
    subtitles_dir: Option<PathBuf>,
}

impl YoutubeSource {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            base_url: Url::parse(DEFAULT_YOUTUBE_API_URL)?,
            api_key: api_key.into(),
            subtitles_dir: None,
        })
    }

    /// Point the client at a different API root.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
        Ok(self)
    }

    /// Directory holding `{video_id}.srt` subtitle files.
    pub fn with_subtitles_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.subtitles_dir = Some(dir.into());
        self
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let mut url = self.base_url.join(endpoint)?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())))
            .append_pair("key", &self.api_key);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WayfindError::Fetch(format!(
                "YouTube {} failed with {}: {}",
                endpoint, status, body
            )));
        }

        Ok(response.json().await?)
    }

    async fn read_subtitles(&self, video_id: &str) -> String {
        let Some(dir) = &self.subtitles_dir else {
            return String::new();
        };

        let path = dir.join(format!("{}.srt", video_id));
        match tokio::fs::read_to_string(&path).await {
            Ok(subtitles) => {
                debug!("Loaded subtitles from {:?}", path);
                subtitles
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                warn!("Failed to read subtitles {:?}: {}", path, e);
                String::new()
            }
        }
    }

    async fn to_item(&self, video: VideoResource) -> ContentItem {
        let body = self.read_subtitles(&video.id).await;
        let snippet = video.snippet;
        let thumbnail_url = snippet
            .thumbnails
            .and_then(|t| t.high.or(t.medium))
            .map(|t| t.url);

        let details = VideoDetails {
            channel_url: format!("https://www.youtube.com/channel/{}", snippet.channel_id),
            channel_id: snippet.channel_id,
            channel_name: snippet.channel_title,
            thumbnail_url,
            duration: video.content_details.and_then(|d| d.duration),
            description: snippet.description,
            published_at: snippet.published_at,
        };

        ContentItem::new(
            video.id.clone(),
            snippet.title,
            body,
            ContentDetails::Video(details),
        )
        .with_url(watch_url(&video.id))
    }

    /// Fetch full details for a batch of video ids, in the order YouTube
    /// returns them.
    async fn fetch_videos(&self, ids: &[String]) -> Result<Vec<ContentItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let response: VideoListResponse = self
            .get(
                "videos",
                &[
                    ("part", "snippet,contentDetails".to_string()),
                    ("id", ids.join(",")),
                ],
            )
            .await?;

        let mut items = Vec::with_capacity(response.items.len());
        for video in response.items {
            items.push(self.to_item(video).await);
        }
        Ok(items)
    }

    async fn search_ids(&self, params: &[(&str, String)], limit: usize) -> Result<Vec<String>> {
        let mut params = params.to_vec();
        params.push(("part", "snippet".to_string()));
        params.push(("type", "video".to_string()));
        params.push(("maxResults", limit.clamp(1, MAX_RESULTS_PER_PAGE).to_string()));

        let response: SearchResponse = self.get("search", &params).await?;
        Ok(response
            .items
            .into_iter()
            .filter_map(|r| r.id.video_id)
            .collect())
    }

    /// Most recent videos of a channel.
    #[instrument(skip(self))]
    pub async fn list_channel(&self, channel_id: &str, limit: usize) -> Result<Vec<ContentItem>> {
        let ids = self
            .search_ids(
                &[
                    ("channelId", channel_id.to_string()),
                    ("order", "date".to_string()),
                ],
                limit,
            )
            .await?;

        info!("Found {} videos in channel {}", ids.len(), channel_id);
        self.fetch_videos(&ids).await
    }
}

#[async_trait]
impl ContentSource for YoutubeSource {
    fn name(&self) -> &str {
        "youtube"
    }

    #[instrument(skip(self))]
    async fn fetch(&self, id: &str) -> Result<ContentItem> {
        let video_id = extract_video_id(id).ok_or_else(|| {
            WayfindError::InvalidInput(format!("Invalid YouTube video ID or URL: {}", id))
        })?;

        self.fetch_videos(std::slice::from_ref(&video_id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| WayfindError::NotFound(format!("No video found with ID: {}", video_id)))
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ContentItem>> {
        let ids = self.search_ids(&[("q", query.to_string())], limit).await?;
        info!("Found {} videos for '{}'", ids.len(), query);
        self.fetch_videos(&ids).await
    }
}
