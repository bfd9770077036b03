//! HTTP client for the battle server and the SSE binding of the play stream.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::api::{
    ApiKeyStatus, BattleDetail, BattleResponse, BattleSummary, BattlesResponse, Leaderboard,
    ModelInfo, ModelsResponse, PlayEvent,
};
use crate::config::ClientConfig;
use crate::error::BattleError;
use crate::session::PlayRequest;
use crate::stream::{
    Connection, SignalReceiver, SignalSender, SseDecoder, StreamSignal, Transport,
};

/// Client for the battle server's JSON endpoints.
#[derive(Debug, Clone)]
pub struct BattleClient {
    config: ClientConfig,
    client: reqwest::Client,
    stream_client: reqwest::Client,
}

impl BattleClient {
    pub fn new(config: ClientConfig) -> Self {
        // reqwest::Client::builder() can fail in extreme environments;
        // fall back to a default client instead of panicking.
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_default();
        let stream_client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .unwrap_or_default();
        Self {
            config,
            client,
            stream_client,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `GET /api/leaderboard`.
    pub async fn leaderboard(&self) -> Result<Leaderboard, BattleError> {
        self.get_json("/api/leaderboard").await
    }

    /// `GET /api/battles`, newest first as the server returns them.
    pub async fn battles(&self) -> Result<Vec<BattleSummary>, BattleError> {
        let resp: BattlesResponse = self.get_json("/api/battles").await?;
        Ok(resp.battles)
    }

    /// `GET /api/battle/{run_id}`.
    ///
    /// The server reports an unknown id as a 404 carrying `{ "error": ... }`;
    /// that message is returned verbatim as [`BattleError::Api`].
    pub async fn battle(&self, run_id: &str) -> Result<BattleDetail, BattleError> {
        if run_id.is_empty() || run_id.contains(['/', '?', '#']) {
            return Err(BattleError::Validation(format!("invalid battle id '{}'", run_id)));
        }
        let url = self.config.endpoint(&format!("/api/battle/{}", run_id));
        let (status, bytes) = self.get_bytes(&url).await?;

        match serde_json::from_slice::<BattleResponse>(&bytes) {
            Ok(BattleResponse {
                error: Some(error),
                ..
            }) => Err(BattleError::Api(error)),
            _ if !status.is_success() => Err(BattleError::Http {
                status: status.as_u16(),
                url,
            }),
            Ok(BattleResponse {
                battle: Some(battle),
                ..
            }) => Ok(battle),
            Ok(_) => Err(BattleError::Json {
                context: "battle".into(),
                detail: "response has neither battle nor error".into(),
            }),
            Err(e) => Err(BattleError::Json {
                context: "battle".into(),
                detail: e.to_string(),
            }),
        }
    }

    /// `GET /api/check_api_key`.
    pub async fn api_key_status(&self) -> Result<ApiKeyStatus, BattleError> {
        self.get_json("/api/check_api_key").await
    }

    /// `GET /api/models`, sorted by display name.
    pub async fn models(&self) -> Result<Vec<ModelInfo>, BattleError> {
        let resp: ModelsResponse = self.get_json("/api/models").await?;
        let mut models = resp.models;
        models.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(models)
    }

    /// Transport that opens `/api/play` streams against this server.
    pub fn play_transport(&self) -> SseTransport {
        SseTransport {
            client: self.stream_client.clone(),
            url: self.config.endpoint("/api/play"),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BattleError> {
        let url = self.config.endpoint(path);
        let (status, bytes) = self.get_bytes(&url).await?;
        if !status.is_success() {
            return Err(BattleError::Http {
                status: status.as_u16(),
                url,
            });
        }
        serde_json::from_slice(&bytes).map_err(|e| BattleError::Json {
            context: path.to_string(),
            detail: e.to_string(),
        })
    }

    async fn get_bytes(&self, url: &str) -> Result<(StatusCode, Vec<u8>), BattleError> {
        debug!(url, "GET");
        let connect_error = |e: reqwest::Error| BattleError::Connect {
            url: url.to_string(),
            detail: e.to_string(),
        };
        let resp = self.client.get(url).send().await.map_err(connect_error)?;
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(connect_error)?;
        Ok((status, bytes.to_vec()))
    }
}

// ---------------------------------------------------------------------------
// SSE transport
// ---------------------------------------------------------------------------

/// Opens `/api/play` as a `text/event-stream` and reads it on a spawned task.
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone)]
pub struct SseTransport {
    client: reqwest::Client,
    url: String,
}

impl SseTransport {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl Transport for SseTransport {
    fn open(
        &self,
        request: &PlayRequest,
    ) -> Result<(Box<dyn Connection>, SignalReceiver), BattleError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let questions = request.num_questions.to_string();
        let builder = self.client.get(&self.url).query(&[
            ("participant_model", request.participant_model.as_str()),
            ("interrogator_model", request.interrogator_model.as_str()),
            ("num_questions", questions.as_str()),
        ]);
        let url = self.url.clone();
        let task = tokio::spawn(read_stream(builder, url.clone(), tx));
        let connection = SseConnection {
            task: Some(task),
            url,
        };
        Ok((Box::new(connection), rx))
    }
}

async fn read_stream(builder: reqwest::RequestBuilder, url: String, tx: SignalSender) {
    let resp = match builder.header("Accept", "text/event-stream").send().await {
        Ok(resp) => resp,
        Err(e) => {
            let detail = format!("connection failed to {}: {}", url, e);
            let _ = tx.send(StreamSignal::Error(detail));
            return;
        }
    };

    // A rejected request (e.g. missing models) answers with a plain JSON
    // `{ "error": ... }` body instead of a stream. Forward it as an event so
    // the session shows the server's message.
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let signal = match serde_json::from_str::<PlayEvent>(&body) {
            Ok(event) if event.error.is_some() => StreamSignal::Message(body),
            _ => StreamSignal::Error(format!("HTTP {} from {}", status, url)),
        };
        let _ = tx.send(signal);
        return;
    }

    let mut stream = resp.bytes_stream();
    let mut decoder = SseDecoder::new();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                let _ = tx.send(StreamSignal::Error(e.to_string()));
                return;
            }
        };
        for data in decoder.feed(&chunk) {
            if tx.send(StreamSignal::Message(data)).is_err() {
                // Receiver gone: nobody is listening any more.
                return;
            }
        }
    }

    if decoder.has_pending() {
        // An event without its terminating blank line is discarded.
        warn!(url = %url, "stream ended mid-event");
    }
    let _ = tx.send(StreamSignal::Closed);
}

/// Handle to a stream being read by [`read_stream`]. Closing aborts the task.
#[derive(Debug)]
pub struct SseConnection {
    task: Option<JoinHandle<()>>,
    url: String,
}

impl Connection for SseConnection {
    fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(url = %self.url, "play stream closed");
        }
    }

    fn is_open(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for SseConnection {
    fn drop(&mut self) {
        self.close();
    }
}
