//! Per-connection actor
//!
//! Handshake first, then message exchange: the first frame fixes the wire
//! dialect and must be a hello carrying an issued session token. One read
//! loop applies inbound messages in receipt order, one writer task
//! serializes all outbound traffic, and at most one emission loop streams
//! recommendations between `start` and `stop`.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use glosa_core::model::Position;
use glosa_core::planner;
use glosa_core::session::{NavigationSession, StartOutcome, StopOutcome};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::emission::EmissionLoop;
use crate::protocol::{self, Body, Envelope, jsonrpc};
use crate::state::{AppState, Claim};

/// Wire dialect of a connection, fixed on its first inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dialect {
    Flat,
    JsonRpc,
}

impl Dialect {
    fn sniff(raw: &str) -> Self {
        if jsonrpc::looks_like_rpc(raw) {
            Dialect::JsonRpc
        } else {
            Dialect::Flat
        }
    }

    fn decode(self, raw: &str) -> Result<Envelope, glosa_core::Error> {
        match self {
            Dialect::Flat => protocol::decode(raw),
            Dialect::JsonRpc => jsonrpc::decode(raw),
        }
    }

    pub(crate) fn encode(self, envelope: &Envelope) -> String {
        match self {
            Dialect::Flat => protocol::encode(envelope),
            Dialect::JsonRpc => jsonrpc::encode(envelope),
        }
    }
}

pub(crate) async fn handle(socket: WebSocket, state: Arc<AppState>) {
    let (sink, mut stream) = socket.split();
    let (outbound, outbound_rx) = mpsc::channel::<String>(32);
    let writer = tokio::spawn(write_loop(sink, outbound_rx));

    if let Some(mut driver) = handshake(&mut stream, &state, &outbound).await {
        driver.run(&mut stream).await;
        driver.shutdown();
    }

    // dropping the last sender ends the writer once queued frames flush
    drop(outbound);
    let _ = writer.await;
}

async fn write_loop(mut sink: SplitSink<WebSocket, Message>, mut rx: mpsc::Receiver<String>) {
    while let Some(frame) = rx.recv().await {
        if sink.send(Message::Text(frame.into())).await.is_err() {
            break;
        }
    }
    let _ = sink.close().await;
}

/// Read the first text frame and perform the hello handshake. Returns the
/// driver for the message-exchange phase, or None when the connection must
/// close (bad token, wrong first message, early disconnect).
async fn handshake(
    stream: &mut SplitStream<WebSocket>,
    state: &Arc<AppState>,
    outbound: &mpsc::Sender<String>,
) -> Option<Driver> {
    let idle = state.config.idle_timeout();
    let raw = loop {
        let frame = match tokio::time::timeout(idle, stream.next()).await {
            Err(_) | Ok(None) => return None,
            Ok(Some(Err(e))) => {
                debug!("websocket error during handshake: {e}");
                return None;
            }
            Ok(Some(Ok(frame))) => frame,
        };
        match frame {
            Message::Text(text) => break text,
            Message::Close(_) => return None,
            // ping/pong are handled by the transport
            _ => {}
        }
    };

    let dialect = Dialect::sniff(raw.as_str());
    let envelope = match dialect.decode(raw.as_str()) {
        Ok(envelope) => envelope,
        Err(e) => {
            send_raw(outbound, dialect, &Envelope::error("", e.to_string())).await;
            return None;
        }
    };
    let Body::Hello(hello) = envelope.body else {
        send_raw(
            outbound,
            dialect,
            &Envelope::error(envelope.id, "hello required before any other message"),
        )
        .await;
        return None;
    };

    let route = match state.registry.claim(&hello.session_id) {
        Claim::Unknown => {
            send_raw(outbound, dialect, &Envelope::error(envelope.id, "unknown session")).await;
            return None;
        }
        Claim::InUse => {
            send_raw(
                outbound,
                dialect,
                &Envelope::error(envelope.id, "session already connected"),
            )
            .await;
            return None;
        }
        Claim::Claimed(route) => route,
    };

    let mut session = NavigationSession::new(hello.session_id.clone());
    if let Some(route) = route {
        // planned over HTTP before the connection opened
        if let Err(e) = session.bind_route(route) {
            warn!(session = %hello.session_id, "parked route rejected: {e}");
        }
    }
    info!(session = %hello.session_id, "session opened");

    let (position_tx, _) = watch::channel(None);
    let driver = Driver {
        state: state.clone(),
        outbound: outbound.clone(),
        dialect,
        session,
        position_tx,
        active: Arc::new(AtomicBool::new(false)),
        emission: None,
    };
    driver
        .send(Envelope::reply(envelope.id, Body::Hello(hello)))
        .await;
    Some(driver)
}

async fn send_raw(outbound: &mpsc::Sender<String>, dialect: Dialect, envelope: &Envelope) {
    let _ = outbound.send(dialect.encode(envelope)).await;
}

/// Message-exchange phase of one connection.
struct Driver {
    state: Arc<AppState>,
    outbound: mpsc::Sender<String>,
    dialect: Dialect,
    session: NavigationSession,
    position_tx: watch::Sender<Option<Position>>,
    active: Arc<AtomicBool>,
    emission: Option<JoinHandle<()>>,
}

impl Driver {
    async fn run(&mut self, stream: &mut SplitStream<WebSocket>) {
        let idle = self.state.config.idle_timeout();
        loop {
            let frame = match tokio::time::timeout(idle, stream.next()).await {
                Err(_) => {
                    info!(session = %self.session.id(), "connection idle, dropping");
                    break;
                }
                Ok(None) => break,
                Ok(Some(Err(e))) => {
                    debug!("websocket error: {e}");
                    break;
                }
                Ok(Some(Ok(frame))) => frame,
            };
            match frame {
                Message::Text(raw) => {
                    if self.on_frame(raw.as_str()).await.is_break() {
                        break;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    }

    async fn on_frame(&mut self, raw: &str) -> ControlFlow<()> {
        let envelope = match self.dialect.decode(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.send(Envelope::error("", e.to_string())).await;
                return ControlFlow::Continue(());
            }
        };
        self.dispatch(envelope).await
    }

    async fn dispatch(&mut self, envelope: Envelope) -> ControlFlow<()> {
        let Envelope { id, body } = envelope;
        match body {
            Body::Start => match self.session.start() {
                Ok(StartOutcome::Started) => {
                    self.spawn_emission();
                    self.send(Envelope::reply(id, Body::Start)).await;
                }
                // already active: ack without spawning a second loop
                Ok(StartOutcome::AlreadyActive) => {
                    self.send(Envelope::reply(id, Body::Start)).await;
                }
                Err(e) => self.send(Envelope::error(id, e.to_string())).await,
            },
            Body::Stop => match self.session.stop() {
                Ok(StopOutcome::Stopped) => {
                    self.cancel_emission();
                    self.send(Envelope::reply(id, Body::Stop)).await;
                }
                Ok(StopOutcome::AlreadyIdle) => {
                    self.send(Envelope::reply(id, Body::Stop)).await;
                }
                Err(e) => self.send(Envelope::error(id, e.to_string())).await,
            },
            Body::Position(position) => {
                if !position.is_valid() {
                    self.send(Envelope::error(id, "invalid position fix")).await;
                } else if let Err(e) = self.session.update_position(position) {
                    self.send(Envelope::error(id, e.to_string())).await;
                } else {
                    // hand the fix to the emission loop; position updates
                    // are not acked (they arrive at client cadence)
                    self.position_tx.send_replace(Some(position));
                }
            }
            Body::RouteRequest(request) => {
                match planner::plan_route(self.state.engine.as_ref(), &request) {
                    Ok(route) => {
                        let route = Arc::new(route);
                        match self.session.bind_route(route.clone()) {
                            Ok(()) => {
                                self.send(Envelope::reply(
                                    id,
                                    Body::RouteResponse(Box::new((*route).clone())),
                                ))
                                .await;
                            }
                            Err(e) => self.send(Envelope::error(id, e.to_string())).await,
                        }
                    }
                    Err(e) => self.send(Envelope::error(id, e.to_string())).await,
                }
            }
            Body::Goodbye => {
                self.send(Envelope::reply(id, Body::Goodbye)).await;
                return ControlFlow::Break(());
            }
            Body::Hello(_) => {
                self.send(Envelope::error(id, "already authenticated")).await;
            }
            Body::RouteResponse(_) | Body::Recommendation(_) | Body::Error(_) => {
                self.send(Envelope::error(id, "unexpected message type")).await;
            }
        }
        ControlFlow::Continue(())
    }

    fn spawn_emission(&mut self) {
        // start() returning Started guarantees a bound route
        let Some(route) = self.session.route().cloned() else {
            return;
        };
        self.active.store(true, Ordering::Release);
        let emission = EmissionLoop {
            route,
            position: self.position_tx.subscribe(),
            active: self.active.clone(),
            feed: self.state.feed.clone(),
            outbound: self.outbound.clone(),
            dialect: self.dialect,
            tick: self.state.config.tick_interval(),
            prediction_timeout: self.state.config.prediction_timeout(),
            range: self.state.config.speed_range(),
        };
        self.emission = Some(tokio::spawn(emission.run()));
    }

    fn cancel_emission(&mut self) {
        // clear the flag first: an in-flight tick re-checks it before
        // sending, so nothing computed before the stop is delivered after
        self.active.store(false, Ordering::Release);
        if let Some(task) = self.emission.take() {
            task.abort();
        }
    }

    /// Only cleanup path: goodbye, disconnect, idle timeout and transport
    /// errors all end here.
    fn shutdown(&mut self) {
        self.cancel_emission();
        self.state.registry.release(self.session.id());
        self.session.close();
        info!(session = %self.session.id(), "session released");
    }

    async fn send(&self, envelope: Envelope) {
        let _ = self.outbound.send(self.dialect.encode(&envelope)).await;
    }
}
