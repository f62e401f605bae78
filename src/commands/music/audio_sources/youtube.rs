//! YouTube helpers and a thin client for the YouTube Data API `playlistItems`
//! endpoint, used to pick tracks out of the curated playlist.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serenity::async_trait;
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// The Data API refuses pages larger than this.
pub const MAX_PAGE_SIZE: u8 = 50;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("YouTube API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("YouTube API responded with {0}")]
    Status(StatusCode),

    #[error("Playlist ended before item {index}")]
    PlaylistExhausted { index: usize },
}

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistItem {
    pub video_id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlaylistPage {
    pub items: Vec<PlaylistItem>,
    pub next_page_token: Option<String>,
    pub total_results: usize,
}

/// Read access to hosted playlists.
#[async_trait]
pub trait VideoCatalog: Send + Sync {
    async fn list_playlist_items(
        &self,
        playlist_id: &str,
        page_token: Option<String>,
        page_size: u8,
    ) -> CatalogResult<PlaylistPage>;
}

/// `VideoCatalog` backed by the YouTube Data API v3.
pub struct YoutubeCatalog {
    http: Client,
    api_key: String,
    base_url: String,
}

impl YoutubeCatalog {
    pub fn new(http: Client, api_key: impl Into<String>) -> Self {
        Self::with_base_url(http, api_key, YOUTUBE_API_BASE)
    }

    /// Point the client at another API root (used against mock servers).
    pub fn with_base_url(http: Client, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl VideoCatalog for YoutubeCatalog {
    async fn list_playlist_items(
        &self,
        playlist_id: &str,
        page_token: Option<String>,
        page_size: u8,
    ) -> CatalogResult<PlaylistPage> {
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE).to_string();
        let mut params = vec![
            ("part", "snippet"),
            ("playlistId", playlist_id),
            ("maxResults", page_size.as_str()),
            ("key", self.api_key.as_str()),
        ];
        if let Some(token) = page_token.as_deref() {
            params.push(("pageToken", token));
        }

        debug!(
            "Listing playlist {} (page token {:?})",
            playlist_id, page_token
        );

        let response = self
            .http
            .get(format!("{}/playlistItems", self.base_url))
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CatalogError::Status(response.status()));
        }

        let body: PlaylistItemsResponse = response.json().await?;
        Ok(body.into())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemsResponse {
    next_page_token: Option<String>,
    page_info: PageInfo,
    #[serde(default)]
    items: Vec<PlaylistItemResource>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    total_results: usize,
}

#[derive(Deserialize)]
struct PlaylistItemResource {
    snippet: Snippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    resource_id: ResourceId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: String,
}

impl From<PlaylistItemsResponse> for PlaylistPage {
    fn from(value: PlaylistItemsResponse) -> Self {
        Self {
            items: value
                .items
                .into_iter()
                .map(|item| PlaylistItem {
                    video_id: item.snippet.resource_id.video_id,
                    title: item.snippet.title,
                })
                .collect(),
            next_page_token: value.next_page_token,
            total_results: value.page_info.total_results,
        }
    }
}

/// The watch page URL for a video id.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Checks if the input string is a YouTube watch page or youtu.be link.
pub fn is_youtube_url(query: &str) -> bool {
    match Url::parse(query) {
        Ok(url) => match url.host_str() {
            Some("www.youtube.com" | "youtube.com" | "m.youtube.com") => {
                url.path().starts_with("/watch")
            }
            Some("youtu.be") => url.path().len() > 1,
            _ => false,
        },
        Err(_) => false,
    }
}
