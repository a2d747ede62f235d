//! OCPP 1.6 WebSocket server
//!
//! Accepts charge-point connections at `ws://<host>:<port>/ocpp/{charge_point_id}`.

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::application::{ActionTable, OcppSession, Services};
use crate::shared::shutdown::ShutdownSignal;

/// OCPP 1.6 WebSocket subprotocol
const OCPP_SUBPROTOCOL: &str = "ocpp1.6";

type ServerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Live sessions: session id → charge point code
pub type SessionMap = Arc<DashMap<Uuid, String>>;

/// OCPP WebSocket Server
pub struct OcppServer {
    address: String,
    table: Arc<ActionTable>,
    services: Arc<Services>,
    sessions: SessionMap,
    shutdown_signal: ShutdownSignal,
}

impl OcppServer {
    pub fn new(address: impl Into<String>, table: Arc<ActionTable>, services: Arc<Services>) -> Self {
        Self {
            address: address.into(),
            table,
            services,
            sessions: Arc::new(DashMap::new()),
            shutdown_signal: ShutdownSignal::new(),
        }
    }

    /// Set the shutdown signal for graceful shutdown
    pub fn with_shutdown(mut self, signal: ShutdownSignal) -> Self {
        self.shutdown_signal = signal;
        self
    }

    pub fn sessions(&self) -> SessionMap {
        self.sessions.clone()
    }

    /// Start the WebSocket server
    pub async fn run(&self) -> ServerResult {
        let listener = TcpListener::bind(&self.address).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> ServerResult {
        let addr = listener.local_addr()?;
        info!("OCPP 1.6 Central System started on ws://{}", addr);
        info!(
            "Charge points should connect to: ws://{}/ocpp/{{charge_point_id}}",
            addr
        );

        let shutdown = self.shutdown_signal.clone();
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => self.spawn_connection(stream, addr),
                        Err(e) => error!("Failed to accept connection: {}", e),
                    }
                }
                _ = shutdown.notified().wait() => {
                    info!(
                        sessions = self.sessions.len(),
                        "WebSocket server received shutdown signal"
                    );
                    return Ok(());
                }
            }
        }
    }

    fn spawn_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let table = self.table.clone();
        let services = self.services.clone();
        let sessions = self.sessions.clone();
        let shutdown = self.shutdown_signal.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, addr, table, services, sessions, shutdown).await
            {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Extract charge point ID from WebSocket request path.
/// Expected format: /ocpp/{charge_point_id} or /{charge_point_id}
pub fn extract_charge_point_id(path: &str) -> Option<String> {
    let path = path.trim_matches('/');

    if let Some(id) = path.strip_prefix("ocpp/") {
        let id = id.trim_matches('/');
        if !id.is_empty() && !id.contains('/') {
            return Some(id.to_string());
        }
        return None;
    }

    if !path.is_empty() && path != "ocpp" && !path.contains('/') {
        return Some(path.to_string());
    }

    None
}

fn offers_ocpp16(request: &Request) -> bool {
    request
        .headers()
        .get_all("Sec-WebSocket-Protocol")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|p| p.trim() == OCPP_SUBPROTOCOL)
}

fn reject(status: StatusCode, reason: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(reason.to_string()));
    *response.status_mut() = status;
    response
}

/// Handle a single WebSocket connection
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    table: Arc<ActionTable>,
    services: Arc<Services>,
    sessions: SessionMap,
    shutdown: ShutdownSignal,
) -> ServerResult {
    debug!("New connection from: {}", addr);

    let mut charge_point_id: Option<String> = None;

    let ws_stream = tokio_tungstenite::accept_hdr_async(
        stream,
        |req: &Request, mut response: Response| {
            let path = req.uri().path();
            info!("WebSocket handshake from: {}, path: {}", addr, path);

            let Some(id) = extract_charge_point_id(path) else {
                warn!("Rejecting {}: no charge point id in path {}", addr, path);
                return Err(reject(StatusCode::BAD_REQUEST, "missing charge point id"));
            };

            if offers_ocpp16(req) {
                response.headers_mut().insert(
                    "Sec-WebSocket-Protocol",
                    HeaderValue::from_static(OCPP_SUBPROTOCOL),
                );
            } else {
                warn!("[{}] Client did not offer ocpp1.6, continuing without subprotocol", id);
            }

            charge_point_id = Some(id);
            Ok(response)
        },
    )
    .await?;

    let Some(charge_point_id) = charge_point_id else {
        return Ok(());
    };

    let session_id = Uuid::new_v4();
    let span = info_span!(
        "session",
        %session_id,
        charge_point_id = charge_point_id.as_str(),
        peer = %addr
    );

    sessions.insert(session_id, charge_point_id.clone());
    let session = OcppSession::new(charge_point_id, table, services);

    run_session(ws_stream, session, shutdown).instrument(span).await;

    sessions.remove(&session_id);
    Ok(())
}

/// Read frames strictly in order, answering each before reading the next.
async fn run_session(
    ws_stream: tokio_tungstenite::WebSocketStream<TcpStream>,
    session: OcppSession,
    shutdown: ShutdownSignal,
) {
    info!("Connected");
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    loop {
        tokio::select! {
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = session.handle_text(&text).await {
                            debug!("-> {}", reply);
                            if let Err(e) = ws_sender.send(Message::Text(reply)).await {
                                error!("Send error: {}", e);
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        warn!("Binary message received ({} bytes), ignoring", data.len());
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                    Some(Ok(Message::Close(frame))) => {
                        info!("Close frame received: {:?}", frame);
                        break;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
            _ = shutdown.notified().wait() => {
                info!("Connection closing due to server shutdown");
                let _ = ws_sender.send(Message::Close(None)).await;
                break;
            }
        }
    }

    info!("Disconnected");
}
