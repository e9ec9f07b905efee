//! StatusHub API Client
//!
//! reqwest-based client for a StatusHub server. One instance holds one
//! cookie jar, so a successful [`HubClient::login`] authenticates every
//! later API call and every live stream opened through
//! [`HubClient::stream_transport`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};
use reqwest::cookie::Jar;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{decode_envelope, ApiError};
use crate::config::HubConfig;
use crate::model::{EntryId, LogEntry, LogResource, MediaRecord};
use crate::snapshot::SnapshotFetcher;

#[cfg(feature = "websocket")]
use crate::transport::WebSocketTransport;

/// Client for one StatusHub server
#[derive(Clone)]
pub struct HubClient {
    /// Server root, e.g. `http://localhost:8080/`
    root: Url,
    /// Same root with a ws/wss scheme
    ws_root: Url,
    /// Session cookies shared with the stream transport
    jar: Arc<Jar>,
    /// HTTP client
    http: reqwest::Client,
    /// WebSocket handshake timeout
    connect_timeout: Duration,
}

impl HubClient {
    /// Create an unauthenticated client with default timeouts
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if `root_url` is not an http(s) URL.
    pub fn new(root_url: &str) -> Result<Self, ApiError> {
        Self::from_config(&HubConfig::new(root_url))
    }

    /// Create an unauthenticated client from configuration
    ///
    /// The password in `config` is not used here; see
    /// [`HubClient::authenticate`].
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] for a bad root URL and
    /// [`ApiError::Request`] if the HTTP client cannot be built.
    pub fn from_config(config: &HubConfig) -> Result<Self, ApiError> {
        let root = Url::parse(config.root_url.trim())
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", config.root_url)))?;
        let ws_root = websocket_root(&root)?;

        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            root,
            ws_root,
            jar,
            http,
            connect_timeout: config.connect_timeout(),
        })
    }

    /// Create a client and log in if the configuration carries a password
    ///
    /// # Errors
    ///
    /// Any error from [`HubClient::from_config`] or [`HubClient::login`].
    pub async fn authenticate(config: &HubConfig) -> Result<Self, ApiError> {
        let client = Self::from_config(config)?;
        if let Some(ref password) = config.password {
            client.login(password).await?;
        }
        Ok(client)
    }

    /// Server root URL
    pub fn root_url(&self) -> &Url {
        &self.root
    }

    /// Server root URL with the matching WebSocket scheme
    pub fn websocket_url(&self) -> &Url {
        &self.ws_root
    }

    /// Log in with the server password
    ///
    /// The server redirects away from `/login` on success and back to it on
    /// failure.
    ///
    /// # Errors
    ///
    /// [`ApiError::LoginFailed`] if the password was rejected, or
    /// [`ApiError::Request`] if the request failed.
    pub async fn login(&self, password: &str) -> Result<(), ApiError> {
        let mut url = self.root.clone();
        url.set_path("/login");

        let response = self
            .http
            .post(url.clone())
            .form(&[("password", password)])
            .send()
            .await?;

        if response.url().path() == url.path() {
            tracing::warn!(root = %self.root, "StatusHub login rejected");
            return Err(ApiError::LoginFailed);
        }
        tracing::info!(root = %self.root, "Logged in to StatusHub");
        Ok(())
    }

    /// Add a log entry and return its identifier
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] from the call.
    pub async fn add(&self, service: &str, message: &str) -> Result<EntryId, ApiError> {
        let body = serde_json::json!({
            "service": service,
            "message": message,
        });
        self.api_call("add", &body).await
    }

    /// Add several log entries to one service
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] from the call.
    pub async fn add_batch(
        &self,
        service: &str,
        messages: &[String],
    ) -> Result<Vec<EntryId>, ApiError> {
        let body = serde_json::json!({
            "service": service,
            "messages": messages,
        });
        self.api_call("addBatch", &body).await
    }

    /// Most recent entry of every service
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] from the call.
    pub async fn overview(&self) -> Result<Vec<LogEntry>, ApiError> {
        self.api_call("overview", &serde_json::json!({})).await
    }

    /// Log of one service, newest first
    ///
    /// # Errors
    ///
    /// [`ApiError::Remote`] if the service does not exist, or any other
    /// [`ApiError`] from the call.
    pub async fn service_log(&self, service: &str) -> Result<Vec<LogEntry>, ApiError> {
        let body = serde_json::json!({ "service": service });
        self.api_call("serviceLog", &body).await
    }

    /// Combined log of every service, newest first
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] from the call.
    pub async fn full_log(&self) -> Result<Vec<LogEntry>, ApiError> {
        self.api_call("fullLog", &serde_json::json!({})).await
    }

    /// Delete the log of a service
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] from the call.
    pub async fn delete(&self, service: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "service": service });
        let _: bool = self.api_call("delete", &body).await?;
        Ok(())
    }

    /// Upload a piece of media and return its identifier
    ///
    /// `data` travels base64-encoded in the JSON body.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] from the call.
    pub async fn add_media(
        &self,
        folder: &str,
        filename: &str,
        mime: &str,
        data: &[u8],
        replace: bool,
    ) -> Result<EntryId, ApiError> {
        let body = serde_json::json!({
            "folder": folder,
            "filename": filename,
            "mime": mime,
            "data": general_purpose::STANDARD.encode(data),
            "replace": replace,
        });
        self.api_call("addMedia", &body).await
    }

    /// Most recent media record of every folder
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] from the call.
    pub async fn media_overview(&self) -> Result<Vec<MediaRecord>, ApiError> {
        self.api_call("mediaOverview", &serde_json::json!({})).await
    }

    /// Media records of one folder, newest first
    ///
    /// # Errors
    ///
    /// [`ApiError::Remote`] if the folder does not exist, or any other
    /// [`ApiError`] from the call.
    pub async fn media_log(&self, folder: &str) -> Result<Vec<MediaRecord>, ApiError> {
        let body = serde_json::json!({ "folder": folder });
        self.api_call("mediaLog", &body).await
    }

    /// Delete every media record in a folder
    ///
    /// # Errors
    ///
    /// Any [`ApiError`] from the call.
    pub async fn delete_media(&self, folder: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "folder": folder });
        let _: bool = self.api_call("deleteMedia", &body).await?;
        Ok(())
    }

    /// URL that serves the content of a media record
    pub fn media_url(&self, id: &EntryId) -> Url {
        let mut url = self.root.clone();
        url.set_path("/api/mediaView");
        url.query_pairs_mut().clear().append_pair("id", &id.to_string());
        url
    }

    /// WebSocket transport for live streams, sharing this client's session
    #[cfg(feature = "websocket")]
    pub fn stream_transport(&self) -> WebSocketTransport {
        WebSocketTransport::new(self.ws_root.clone())
            .with_cookies(Arc::clone(&self.jar), self.root.clone())
            .with_connect_timeout(self.connect_timeout)
    }

    async fn api_call<B, T>(&self, name: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut url = self.root.clone();
        url.set_path(&format!("/api/{name}"));

        tracing::debug!(call = name, "StatusHub API request");
        let response = self.http.post(url).json(body).send().await?;
        let text = response.text().await?;
        decode_envelope(&text)
    }
}

impl std::fmt::Debug for HubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubClient")
            .field("root", &self.root.as_str())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SnapshotFetcher for HubClient {
    async fn fetch(&self, resource: &LogResource) -> Result<Vec<LogEntry>, ApiError> {
        match resource {
            LogResource::Service(name) => self.service_log(name).await,
            LogResource::All => self.full_log().await,
        }
    }
}

/// Map an http(s) root onto ws(s)
fn websocket_root(root: &Url) -> Result<Url, ApiError> {
    let scheme = match root.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => {
            return Err(ApiError::InvalidUrl(format!(
                "unsupported scheme {other:?} in {root}"
            )))
        }
    };
    let mut ws = root.clone();
    ws.set_scheme(scheme)
        .map_err(|()| ApiError::InvalidUrl(format!("cannot derive WebSocket URL from {root}")))?;
    Ok(ws)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_websocket_url_http() {
        let client = HubClient::new("http://localhost:8080").unwrap();
        assert_eq!(client.websocket_url().as_str(), "ws://localhost:8080/");
    }

    #[test]
    fn test_websocket_url_https() {
        let client = HubClient::new("https://hub.example.com").unwrap();
        assert_eq!(client.websocket_url().as_str(), "wss://hub.example.com/");
    }

    #[test]
    fn test_rejects_non_http_root() {
        assert!(matches!(
            HubClient::new("ftp://example.com"),
            Err(ApiError::InvalidUrl(_))
        ));
        assert!(matches!(
            HubClient::new("::nonsense::"),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_media_url() {
        let client = HubClient::new("http://localhost:8080/ignored?x=1").unwrap();
        assert_eq!(
            client.media_url(&EntryId::Number(7)).as_str(),
            "http://localhost:8080/api/mediaView?id=7"
        );
    }

    #[test]
    fn test_debug_hides_internals() {
        let client = HubClient::new("http://localhost:8080").unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("localhost:8080"));
        assert!(!debug.contains("jar"));
    }
}
