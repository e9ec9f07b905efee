//! WebSocket Transport
//!
//! Live channel to a StatusHub server:
//! - `GET /api/serviceStream?service=<name>` for one service
//! - `GET /api/fullStream` for every service
//!
//! The server pushes one JSON [`LogEntry`](crate::model::LogEntry) per text
//! frame and never expects anything back. Authentication rides on the
//! session cookie from the API client's jar.
//!
//! Each `open()` spawns one task that performs the handshake and then
//! forwards frames until either side closes.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::Url;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;

use crate::model::LogResource;

use super::traits::{ChannelCloser, LogTransport, TransportChannel, TransportError, TransportEvent};

/// Default handshake timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Events buffered per channel before the reader waits on the stream
const EVENT_BUFFER: usize = 100;

/// WebSocket transport for StatusHub live streams
#[derive(Clone)]
pub struct WebSocketTransport {
    /// Server root with a ws/wss scheme
    ws_root: Url,
    /// Session cookies and the http(s) URL they are scoped to
    cookies: Option<(Arc<Jar>, Url)>,
    /// Handshake timeout
    connect_timeout: Duration,
}

impl WebSocketTransport {
    /// Transport for the server at `ws_root` (a ws:// or wss:// URL)
    #[must_use]
    pub fn new(ws_root: Url) -> Self {
        Self {
            ws_root,
            cookies: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Send the cookies `jar` holds for `http_root` on every handshake
    #[must_use]
    pub fn with_cookies(mut self, jar: Arc<Jar>, http_root: Url) -> Self {
        self.cookies = Some((jar, http_root));
        self
    }

    /// Set the handshake timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// URL of the live stream for `resource`
    ///
    /// # Errors
    ///
    /// [`TransportError::InvalidUrl`] if the root is not a ws(s) URL.
    pub fn stream_url(&self, resource: &LogResource) -> Result<Url, TransportError> {
        if !matches!(self.ws_root.scheme(), "ws" | "wss") {
            return Err(TransportError::InvalidUrl(format!(
                "expected ws:// or wss:// root, got {}",
                self.ws_root
            )));
        }
        let mut url = self.ws_root.clone();
        match resource {
            LogResource::Service(name) => {
                url.set_path("/api/serviceStream");
                url.query_pairs_mut().clear().append_pair("service", name);
            }
            LogResource::All => {
                url.set_path("/api/fullStream");
                url.set_query(None);
            }
        }
        Ok(url)
    }

    fn cookie_header(&self) -> Option<HeaderValue> {
        let (jar, http_root) = self.cookies.as_ref()?;
        let value = jar.cookies(http_root)?;
        HeaderValue::from_bytes(value.as_bytes()).ok()
    }
}

impl LogTransport for WebSocketTransport {
    fn open(&self, resource: &LogResource) -> TransportChannel {
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (closer, close_rx) = ChannelCloser::new();

        let url = self.stream_url(resource);
        let cookie = self.cookie_header();
        let timeout = self.connect_timeout;

        tokio::spawn(async move {
            let reason = match url {
                Ok(url) => run_channel(url, cookie, timeout, &event_tx, close_rx).await,
                Err(e) => Some(e.to_string()),
            };
            if let Some(reason) = reason {
                let _ = event_tx
                    .send(TransportEvent::Closed {
                        reason: Some(reason),
                    })
                    .await;
            }
        });

        TransportChannel::new(event_rx, closer)
    }
}

/// Drive one connection until it ends
///
/// Returns the reason to report as `Closed`, or None when nothing more
/// should be reported (closed locally, or the close was already sent).
async fn run_channel(
    url: Url,
    cookie: Option<HeaderValue>,
    timeout: Duration,
    events: &mpsc::Sender<TransportEvent>,
    mut close_rx: oneshot::Receiver<()>,
) -> Option<String> {
    let mut request = match url.as_str().into_client_request() {
        Ok(request) => request,
        Err(e) => return Some(TransportError::InvalidUrl(e.to_string()).to_string()),
    };
    if let Some(cookie) = cookie {
        request.headers_mut().insert(COOKIE, cookie);
    }

    let connect = tokio::time::timeout(timeout, tokio_tungstenite::connect_async(request));
    let socket = tokio::select! {
        _ = &mut close_rx => {
            tracing::debug!(%url, "Stream closed before handshake finished");
            return None;
        }
        result = connect => match result {
            Ok(Ok((socket, _response))) => socket,
            Ok(Err(e)) => return Some(TransportError::ConnectionFailed(e.to_string()).to_string()),
            Err(_) => return Some(TransportError::Timeout(timeout).to_string()),
        },
    };

    tracing::debug!(%url, "Live stream connected");
    if events.send(TransportEvent::Opened).await.is_err() {
        return None;
    }

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            _ = &mut close_rx => {
                let _ = sink.send(Message::Close(None)).await;
                let _ = sink.close().await;
                tracing::debug!(%url, "Live stream closed locally");
                return None;
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if events.send(TransportEvent::Message(text)).await.is_err() {
                        return None;
                    }
                }
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => {
                        if events.send(TransportEvent::Message(text)).await.is_err() {
                            return None;
                        }
                    }
                    Err(_) => tracing::warn!(%url, "Dropping non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| "closed by server".to_string());
                    return Some(reason);
                }
                // Ping/pong are answered by tungstenite itself
                Some(Ok(_)) => {}
                Some(Err(e)) => return Some(e.to_string()),
                None => return Some("connection lost".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> WebSocketTransport {
        WebSocketTransport::new(Url::parse("ws://localhost:8080").unwrap())
    }

    #[test]
    fn test_service_stream_url_is_escaped() {
        let url = transport()
            .stream_url(&LogResource::from("nightly build&test"))
            .unwrap();
        assert_eq!(url.path(), "/api/serviceStream");
        assert_eq!(url.query(), Some("service=nightly+build%26test"));
    }

    #[test]
    fn test_full_stream_url() {
        let url = transport().stream_url(&LogResource::All).unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8080/api/fullStream");
    }

    #[test]
    fn test_rejects_http_root() {
        let transport = WebSocketTransport::new(Url::parse("http://localhost:8080").unwrap());
        assert!(matches!(
            transport.stream_url(&LogResource::All),
            Err(TransportError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_no_cookie_without_jar() {
        assert!(transport().cookie_header().is_none());
    }

    #[test]
    fn test_cookie_header_from_jar() {
        let http_root = Url::parse("http://localhost:8080/").unwrap();
        let jar = Arc::new(Jar::default());
        jar.add_cookie_str("session=abc123", &http_root);

        let transport = transport().with_cookies(jar, http_root);
        let header = transport.cookie_header().unwrap();
        assert_eq!(header.to_str().unwrap(), "session=abc123");
    }

    #[tokio::test]
    async fn test_connection_refused_reports_closed() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = WebSocketTransport::new(Url::parse(&format!("ws://{addr}")).unwrap())
            .with_connect_timeout(Duration::from_secs(2));
        let mut channel = transport.open(&LogResource::All);

        match channel.recv().await {
            Some(TransportEvent::Closed { reason }) => assert!(reason.is_some()),
            other => panic!("Expected Closed, got {other:?}"),
        }
    }
}
