use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, info, warn};
use reqwest::Client as HttpClient;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use super::events::parse_event;
use super::models::{SendRequest, SendResponse};
use super::{Handlers, ReceiptCallback, ReceivedCallback, Transport};
use crate::error::TransportError;
use crate::utils::{normalize_url, websocket_url};

/// Talks to a signal-cli-rest-api daemon running in json-rpc mode.
pub struct RestTransport {
    http: HttpClient,
    base_url: String,
    account: String,
    handlers: Handlers,
}

impl RestTransport {
    pub fn new(base_url: &str, account: &str) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: normalize_url(base_url),
            account: account.to_string(),
            handlers: Handlers::default(),
        }
    }

    fn handle_frame(&self, text: &str) {
        match parse_event(text) {
            Ok(Some(event)) => {
                // callback failures are logged by the dispatcher; keep the stream going
                let _ = self.handlers.dispatch(event);
            }
            Ok(None) => debug!("ignoring frame without text or receipt"),
            Err(e) => warn!("undecodable frame: {e}"),
        }
    }
}

#[async_trait]
impl Transport for RestTransport {
    async fn send(&self, number: &str, text: &str) -> Result<Option<i64>, TransportError> {
        let endpoint = format!("{}/v2/send", self.base_url);
        let body = SendRequest {
            message: text,
            number: &self.account,
            recipients: [number],
        };
        let resp = self.http.post(&endpoint).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        let reply: SendResponse = serde_json::from_slice(&bytes)?;
        Ok(reply.timestamp())
    }

    async fn receive(&self) -> Result<(), TransportError> {
        let url = websocket_url(&self.base_url, &self.account)?;
        let (mut stream, _) = connect_async(url.as_str()).await?;
        info!("websocket connected: {url}");

        while let Some(frame) = stream.next().await {
            match frame? {
                WsMessage::Text(text) => self.handle_frame(&text),
                WsMessage::Binary(bytes) => match std::str::from_utf8(&bytes) {
                    Ok(text) => self.handle_frame(text),
                    Err(e) => warn!("binary frame is not utf-8: {e}"),
                },
                WsMessage::Close(reason) => {
                    info!("websocket closed by server: {reason:?}");
                    break;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn on_received(&self, callback: ReceivedCallback) {
        self.handlers.add_received(callback);
    }

    fn on_receipt(&self, callback: ReceiptCallback) {
        self.handlers.add_receipt(callback);
    }
}
