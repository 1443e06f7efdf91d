//! Blocking HTTP client for the weapi endpoints.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, trace};

use crate::api::{
    ApiError, CloudBody, CloudItem, Envelope, MusicApi, PlaylistDetail, PlaylistDetailBody,
    SongDetailBatch, SongUrl, SongUrlBody,
};
use crate::crypto::encrypt_request;
use crate::session::Cookies;

pub const DEFAULT_BASE_URL: &str = "https://music.163.com";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const REFERER: &str = "https://music.163.com/";

const PLAYLIST_DETAIL_PATH: &str = "/weapi/v6/playlist/detail";
const SONG_DETAIL_PATH: &str = "/weapi/v3/song/detail";
const SONG_URL_PATH: &str = "/weapi/song/enhance/player/url";
const CLOUD_PATH: &str = "/weapi/v1/cloud/get";

/// Bitrate requested when probing song URLs for pricing.
const PRICING_BITRATE: u32 = 320_000;

/// Tracks requested with the playlist detail.
const PLAYLIST_TRACK_LIMIT: usize = 1000;

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Authenticated client. The cookie header is fixed at construction.
#[derive(Debug, Clone)]
pub struct WeapiClient {
    http: Client,
    base_url: String,
}

impl WeapiClient {
    pub fn new(cfg: &HttpConfig, cookies: &Cookies) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::REFERER, HeaderValue::from_static(REFERER));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        if !cookies.is_empty() {
            let value = HeaderValue::from_str(&cookies.header_value())
                .map_err(|e| ApiError::Http(format!("invalid cookie header: {e}")))?;
            headers.insert(header::COOKIE, value);
        }

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(cfg.timeout)
            .connect_timeout(cfg.connect_timeout)
            .build()
            .map_err(|e| ApiError::Http(format!("build client: {e}")))?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Encrypt `payload`, POST it to `path` and decode the envelope.
    fn post<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        path: &str,
        payload: serde_json::Value,
    ) -> Result<T, ApiError> {
        trace!(endpoint, %payload, "weapi request");
        let form = encrypt_request(&payload)?;
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .form(&form)
            .send()?
            .error_for_status()?;
        let envelope: Envelope<T> = response.json()?;
        debug!(endpoint, code = envelope.code, "weapi response");
        envelope.into_body(endpoint)
    }
}

/// `[1,2,3]`
fn ids_json(ids: &[u64]) -> String {
    let joined: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    format!("[{}]", joined.join(","))
}

/// `[{"id":1},{"id":2}]`
fn id_objects_json(ids: &[u64]) -> String {
    let joined: Vec<String> = ids.iter().map(|id| format!(r#"{{"id":{id}}}"#)).collect();
    format!("[{}]", joined.join(","))
}

impl MusicApi for WeapiClient {
    fn playlist_detail(&self, playlist_id: &str) -> Result<PlaylistDetail, ApiError> {
        let body: PlaylistDetailBody = self.post(
            "playlist_detail",
            PLAYLIST_DETAIL_PATH,
            json!({ "id": playlist_id, "n": PLAYLIST_TRACK_LIMIT, "csrf_token": "" }),
        )?;
        body.playlist
            .ok_or_else(|| ApiError::Decode("playlist detail without playlist".to_string()))
    }

    fn song_details(&self, ids: &[u64]) -> Result<SongDetailBatch, ApiError> {
        self.post(
            "song_details",
            SONG_DETAIL_PATH,
            json!({ "c": id_objects_json(ids), "ids": ids_json(ids), "csrf_token": "" }),
        )
    }

    fn song_urls(&self, ids: &[u64]) -> Result<Vec<SongUrl>, ApiError> {
        let body: SongUrlBody = self.post(
            "song_urls",
            SONG_URL_PATH,
            json!({ "ids": ids_json(ids), "br": PRICING_BITRATE, "csrf_token": "" }),
        )?;
        Ok(body.data)
    }

    fn cloud_page(&self, limit: usize, offset: usize) -> Result<Vec<CloudItem>, ApiError> {
        let body: CloudBody = self.post(
            "cloud_page",
            CLOUD_PATH,
            json!({ "limit": limit, "offset": offset, "csrf_token": "" }),
        )?;
        Ok(body.data)
    }
}
