//! WebSocket bridge between the agent and its collaborators.
//!
//! Two kinds of clients connect and identify themselves with a `hello`:
//! the in-page helper (`from: "page"`), which services eval requests against
//! the live DOM, and any number of control surfaces (`from: "control"`),
//! which issue start/stop/ping commands and receive progress/done
//! notifications. Notifications are fire-and-forget; commands are each
//! acknowledged on the issuing connection.

use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::{
    net::TcpListener,
    sync::{mpsc, oneshot, Mutex},
    task::JoinHandle,
};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use uuid::Uuid;

use crate::agent::AgentEvent;
use crate::errors::AutomationError;

pub const DEFAULT_WS_ADDR: &str = "127.0.0.1:17380";

// Reduce type complexity for Clippy
type BridgeResult = Result<serde_json::Value, String>;
type PendingMap = HashMap<String, oneshot::Sender<BridgeResult>>;
type Pending = Arc<Mutex<PendingMap>>;
type Clients = Arc<Mutex<Vec<Client>>>;

/// Inbound commands from a control surface.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Command {
    Start {
        #[serde(default)]
        resume_from: Option<u64>,
    },
    Stop,
    Ping,
}

#[derive(Debug, Serialize)]
struct EvalRequest {
    id: String,
    action: String,
    code: String,
    #[serde(default)]
    await_promise: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BridgeIncoming {
    EvalResult {
        id: String,
        ok: bool,
        result: Option<serde_json::Value>,
        error: Option<String>,
    },
    Command(Command),
    Typed(TypedIncoming),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum TypedIncoming {
    #[serde(rename = "hello")]
    Hello { from: Option<String> },
    #[serde(rename = "pong")]
    Pong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClientRole {
    Unknown,
    Page,
    Control,
}

struct Client {
    id: u64,
    role: ClientRole,
    sender: mpsc::UnboundedSender<Message>,
}

pub struct ControlBridge {
    _server_task: JoinHandle<()>,
    clients: Clients,
    pending: Pending,
    local_addr: SocketAddr,
}

impl ControlBridge {
    /// Bind the bridge socket and start accepting clients. Commands from
    /// control clients arrive on the returned receiver.
    pub async fn start(
        addr: &str,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<Command>), AutomationError> {
        let clients: Clients = Arc::new(Mutex::new(Vec::new()));
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let listener = match TcpListener::bind(addr).await {
            Ok(l) => l,
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::warn!(%addr, ?e, "port in use, waiting 2 seconds and retrying once...");
                tokio::time::sleep(Duration::from_secs(2)).await;
                TcpListener::bind(addr)
                    .await
                    .map_err(|e2| AutomationError::BridgeError(format!("bind {addr}: {e2}")))?
            }
            Err(e) => {
                return Err(AutomationError::BridgeError(format!("bind {addr}: {e}")));
            }
        };
        let local_addr = listener
            .local_addr()
            .map_err(|e| AutomationError::BridgeError(format!("local_addr: {e}")))?;
        tracing::info!("control bridge listening on {}", local_addr);

        let clients_clone = clients.clone();
        let pending_clone = pending.clone();
        let server_task = tokio::spawn(async move {
            let mut next_client_id: u64 = 0;
            loop {
                let (stream, _peer) = match listener.accept().await {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!("ws accept error: {}", e);
                        continue;
                    }
                };
                let client_id = next_client_id;
                next_client_id += 1;
                let ws_clients = clients_clone.clone();
                let ws_pending = pending_clone.clone();
                let ws_commands = commands_tx.clone();
                tokio::spawn(async move {
                    let ws_stream = match accept_async(stream).await {
                        Ok(s) => s,
                        Err(e) => {
                            tracing::warn!("ws handshake error: {}", e);
                            return;
                        }
                    };
                    let (mut sink, mut stream) = ws_stream.split();
                    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

                    // writer task
                    let writer = tokio::spawn(async move {
                        while let Some(msg) = rx.recv().await {
                            if let Err(e) = sink.send(msg).await {
                                tracing::warn!("ws send error: {}", e);
                                break;
                            }
                        }
                    });

                    // register client
                    {
                        ws_clients.lock().await.push(Client {
                            id: client_id,
                            role: ClientRole::Unknown,
                            sender: tx.clone(),
                        });
                    }

                    // reader loop
                    while let Some(Ok(msg)) = stream.next().await {
                        if !msg.is_text() {
                            continue;
                        }
                        let txt = msg.into_text().unwrap_or_default();
                        match serde_json::from_str::<BridgeIncoming>(&txt) {
                            Ok(BridgeIncoming::EvalResult {
                                id,
                                ok,
                                result,
                                error,
                            }) => {
                                if let Some(waiter) = ws_pending.lock().await.remove(&id) {
                                    let _ = waiter.send(if ok {
                                        Ok(result.unwrap_or(serde_json::Value::Null))
                                    } else {
                                        Err(error.unwrap_or_else(|| "unknown error".into()))
                                    });
                                } else {
                                    tracing::warn!(id = %id, "eval result with no waiter");
                                }
                            }
                            Ok(BridgeIncoming::Command(command)) => {
                                // Commands come from the control surface;
                                // the page helper only answers evals.
                                let role = ws_clients
                                    .lock()
                                    .await
                                    .iter()
                                    .find(|c| c.id == client_id)
                                    .map(|c| c.role)
                                    .unwrap_or(ClientRole::Unknown);
                                if role == ClientRole::Page {
                                    tracing::warn!(
                                        client_id,
                                        ?command,
                                        "command from page helper ignored"
                                    );
                                    continue;
                                }
                                let ack = match &command {
                                    Command::Start { .. } => serde_json::json!({"started": true}),
                                    Command::Stop => serde_json::json!({"stopped": true}),
                                    Command::Ping => serde_json::json!({"ready": true}),
                                };
                                let _ = tx.send(Message::Text(ack.to_string()));
                                // Liveness checks are answered here; the rest
                                // goes to whoever drives the agent.
                                if command != Command::Ping {
                                    tracing::info!(?command, "control command received");
                                    let _ = ws_commands.send(command);
                                }
                            }
                            Ok(BridgeIncoming::Typed(TypedIncoming::Hello { from })) => {
                                let role = match from.as_deref() {
                                    Some("page") => ClientRole::Page,
                                    _ => ClientRole::Control,
                                };
                                tracing::info!(?role, client_id, "client connected");
                                let mut clients = ws_clients.lock().await;
                                if let Some(c) = clients.iter_mut().find(|c| c.id == client_id) {
                                    c.role = role;
                                }
                            }
                            Ok(BridgeIncoming::Typed(TypedIncoming::Pong)) => {}
                            Err(e) => tracing::warn!("invalid incoming JSON: {}", e),
                        }
                    }

                    // unregister on disconnect
                    ws_clients.lock().await.retain(|c| c.id != client_id);
                    tracing::info!(client_id, "client disconnected");
                    writer.abort();
                });
            }
        });

        let bridge = Arc::new(ControlBridge {
            _server_task: server_task,
            clients,
            pending,
            local_addr,
        });
        Ok((bridge, commands_rx))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether an in-page helper is connected.
    pub async fn has_page_client(&self) -> bool {
        self.clients
            .lock()
            .await
            .iter()
            .any(|c| c.role == ClientRole::Page)
    }

    /// Broadcast a notification to all control clients. Send failures are
    /// ignored; nobody listening is a valid state.
    pub async fn notify(&self, event: &AgentEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("event serialize: {}", e);
                return;
            }
        };
        let clients = self.clients.lock().await;
        for client in clients.iter().filter(|c| c.role != ClientRole::Page) {
            let _ = client.sender.send(Message::Text(payload.clone()));
        }
    }

    /// Evaluate a script in the page via the helper client. Returns `None`
    /// when no page client is connected or the result never arrives, so
    /// callers can treat an unreachable page as "nothing there".
    pub async fn eval(
        &self,
        code: &str,
        timeout: Duration,
    ) -> Result<Option<serde_json::Value>, AutomationError> {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel::<BridgeResult>();
        self.pending.lock().await.insert(id.clone(), tx);

        let req = EvalRequest {
            id: id.clone(),
            action: "eval".into(),
            code: code.to_string(),
            await_promise: true,
        };
        let payload = serde_json::to_string(&req)
            .map_err(|e| AutomationError::BridgeError(format!("bridge serialize: {e}")))?;

        let sent = {
            let clients = self.clients.lock().await;
            match clients.iter().find(|c| c.role == ClientRole::Page) {
                Some(page) => page.sender.send(Message::Text(payload)).is_ok(),
                None => false,
            }
        };
        if !sent {
            self.pending.lock().await.remove(&id);
            tracing::debug!("no page client connected; skipping eval");
            return Ok(None);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Ok(value))) => Ok(Some(value)),
            Ok(Ok(Err(err))) => Err(AutomationError::BridgeError(err)),
            Ok(Err(_canceled)) => {
                tracing::warn!("eval waiter canceled");
                Ok(None)
            }
            Err(_elapsed) => {
                let _ = self.pending.lock().await.remove(&id);
                tracing::warn!(id = %id, "timed out waiting for eval result");
                Ok(None)
            }
        }
    }
}
