use error_types::SandboxError;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type PendingMap = Arc<Mutex<HashMap<i64, oneshot::Sender<Value>>>>;

const CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Raw CDP-over-WebSocket connection to a single page target, grounded in
/// `browser_orch_ext`'s `CdpConnection` but generalized: its original
/// `send_message` loop reads and discards any message that isn't the reply it's
/// waiting for, which silently drops the page-error/console-error events Phase 1
/// needs. Here a background reader task demultiplexes numbered responses
/// (delivered to the waiting caller via a oneshot) from unsolicited events
/// (appended to `page_errors` / `console_errors`).
pub struct CdpConnection {
    outbound: AsyncMutex<SplitSink<WsStream, Message>>,
    pending: PendingMap,
    counter: AtomicI64,
    page_errors: Arc<Mutex<Vec<String>>>,
    console_errors: Arc<Mutex<Vec<String>>>,
}

impl CdpConnection {
    /// Connects to the first `page` target exposed by the browser's
    /// `/json/list` endpoint on `debug_port`.
    pub async fn connect(debug_port: u16) -> Result<Self, SandboxError> {
        let list_url = format!("http://127.0.0.1:{debug_port}/json/list");
        let targets: Vec<Value> = reqwest::get(&list_url)
            .await
            .map_err(|e| SandboxError::Protocol(format!("failed to list targets: {e}")))?
            .json()
            .await
            .map_err(|e| SandboxError::Protocol(format!("failed to parse target list: {e}")))?;

        let ws_url = targets
            .into_iter()
            .find(|t| t["type"].as_str() == Some("page"))
            .and_then(|t| t["webSocketDebuggerUrl"].as_str().map(String::from))
            .ok_or_else(|| SandboxError::Protocol("no page target on debug port".to_string()))?;

        let (ws, _) = connect_async(ws_url)
            .await
            .map_err(|e| SandboxError::Protocol(format!("websocket connect failed: {e}")))?;
        let (sender, mut receiver) = ws.split();

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let page_errors = Arc::new(Mutex::new(Vec::new()));
        let console_errors = Arc::new(Mutex::new(Vec::new()));

        let reader_pending = pending.clone();
        let reader_page_errors = page_errors.clone();
        let reader_console_errors = console_errors.clone();
        tokio::spawn(async move {
            while let Some(Ok(msg)) = receiver.next().await {
                let Message::Text(text) = msg else { continue };
                let Ok(json) = serde_json::from_str::<Value>(&text) else { continue };

                if let Some(id) = json.get("id").and_then(Value::as_i64) {
                    if let Some(tx) = reader_pending.lock().unwrap().remove(&id) {
                        let _ = tx.send(json.get("result").cloned().unwrap_or(Value::Null));
                    }
                    continue;
                }

                match json.get("method").and_then(Value::as_str) {
                    Some("Runtime.exceptionThrown") => {
                        let detail = json["params"]["exceptionDetails"]["exception"]["description"]
                            .as_str()
                            .or_else(|| json["params"]["exceptionDetails"]["text"].as_str())
                            .unwrap_or("unknown JS exception")
                            .to_string();
                        reader_page_errors.lock().unwrap().push(detail);
                    }
                    Some("Log.entryAdded") => {
                        if json["params"]["entry"]["level"].as_str() == Some("error") {
                            let text = json["params"]["entry"]["text"].as_str().unwrap_or_default().to_string();
                            reader_console_errors.lock().unwrap().push(text);
                        }
                    }
                    _ => {}
                }
            }
        });

        Ok(Self {
            outbound: AsyncMutex::new(sender),
            pending,
            counter: AtomicI64::new(0),
            page_errors,
            console_errors,
        })
    }

    pub async fn send(&self, method: &str, params: Value) -> Result<Value, SandboxError> {
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(id, tx);

        let payload = serde_json::json!({"id": id, "method": method, "params": params}).to_string();
        self.outbound
            .lock()
            .await
            .send(Message::Text(payload))
            .await
            .map_err(|e| SandboxError::Protocol(format!("send failed: {e}")))?;

        tokio::time::timeout(CALL_TIMEOUT, rx)
            .await
            .map_err(|_| SandboxError::Protocol(format!("{method} timed out waiting for a response")))?
            .map_err(|_| SandboxError::Protocol(format!("{method} response channel closed before reply")))
    }

    /// Drains and clears the page-error log accumulated since the last drain.
    pub fn take_page_errors(&self) -> Vec<String> {
        std::mem::take(&mut self.page_errors.lock().unwrap())
    }

    pub fn take_console_errors(&self) -> Vec<String> {
        std::mem::take(&mut self.console_errors.lock().unwrap())
    }
}
