//! Tokio driver for a [`SyncSession`]
//!
//! One task owns the session and feeds it events from a single queue:
//! handle calls, the batching and frame timers, socket reader tasks, decode
//! jobs and reconnect timers all post into that queue, so the session sees
//! them strictly one at a time.

use std::collections::BTreeMap;
use std::time::Duration;

use fresco_config::{DisplayConfig, SessionConfig};
use futures_util::{SinkExt, StreamExt};
use painting::{TileCoord, ToolMode, ViewTransform, decode_tile_base64};
use tokio::sync::{mpsc, watch};
use tokio::time::{MissedTickBehavior, interval, sleep, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

use crate::SyncError;
use crate::session::{
    ConnectionId, DebugInfo, PointerPhase, PointerSample, SessionCommand, SessionEvent,
    SessionState, SyncSession,
};
use crate::transport::ChannelTransport;

/// Snapshot published after every event that changed something observable
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStatus {
    pub state: SessionState,
    pub connection: ConnectionId,
    pub tiles: BTreeMap<TileCoord, u64>,
    pub last_debug: Option<DebugInfo>,
}

impl SessionStatus {
    fn capture(session: &SyncSession) -> Self {
        Self {
            state: session.state(),
            connection: session.connection(),
            tiles: session.tiles().known_versions(),
            last_debug: session.last_debug().cloned(),
        }
    }
}

/// Cloneable input side of a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionHandle {
    pub fn pointer_down(&self, samples: Vec<PointerSample>) -> Result<(), SyncError> {
        self.pointer(PointerPhase::Down, samples)
    }

    pub fn pointer_move(&self, samples: Vec<PointerSample>) -> Result<(), SyncError> {
        self.pointer(PointerPhase::Move, samples)
    }

    pub fn pointer_up(&self, samples: Vec<PointerSample>) -> Result<(), SyncError> {
        self.pointer(PointerPhase::Up, samples)
    }

    fn pointer(&self, phase: PointerPhase, samples: Vec<PointerSample>) -> Result<(), SyncError> {
        self.send(SessionEvent::Pointer { phase, samples })
    }

    pub fn set_tool(&self, tool: ToolMode) -> Result<(), SyncError> {
        self.send(SessionEvent::SetTool(tool))
    }

    pub fn set_view(&self, view: ViewTransform) -> Result<(), SyncError> {
        self.send(SessionEvent::ViewChanged(view))
    }

    pub fn resize(&self, display: DisplayConfig) -> Result<(), SyncError> {
        self.send(SessionEvent::SurfaceResized(display))
    }

    /// Stop the runner. Any stroke in progress is flushed first.
    pub fn shutdown(&self) -> Result<(), SyncError> {
        self.send(SessionEvent::Shutdown)
    }

    fn send(&self, event: SessionEvent) -> Result<(), SyncError> {
        self.events.send(event).map_err(|_| SyncError::Closed)
    }
}

pub struct SessionRunner {
    session: SyncSession,
    config: SessionConfig,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    status: watch::Sender<SessionStatus>,
}

impl SessionRunner {
    pub fn new(config: SessionConfig) -> Self {
        let session = SyncSession::new(&config);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status, _) = watch::channel(SessionStatus::capture(&session));
        Self {
            session,
            config,
            events_tx,
            events_rx,
            status,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            events: self.events_tx.clone(),
        }
    }

    pub fn status(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    pub fn session(&self) -> &SyncSession {
        &self.session
    }

    /// Drive the session until [`SessionHandle::shutdown`]. Returns the
    /// session so callers can inspect its final state.
    pub async fn run(mut self) -> SyncSession {
        let mut batch = interval(self.config.batch_interval());
        batch.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut frame = interval(self.config.frame_interval());
        frame.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.dispatch(SessionEvent::Start);
        loop {
            // The runner holds a sender, so the queue never reports closed
            let event = tokio::select! {
                Some(event) = self.events_rx.recv() => event,
                _ = batch.tick() => SessionEvent::Tick,
                _ = frame.tick() => SessionEvent::Frame,
            };
            let done = matches!(event, SessionEvent::Shutdown);
            self.dispatch(event);
            if done {
                break;
            }
        }
        debug!("SessionRunner: stopped");
        self.session
    }

    fn dispatch(&mut self, event: SessionEvent) {
        let observable = !matches!(event, SessionEvent::Tick | SessionEvent::Frame);
        for command in self.session.handle(event) {
            self.execute(command);
        }
        if observable {
            let next = SessionStatus::capture(&self.session);
            self.status.send_if_modified(|current| {
                if *current == next {
                    return false;
                }
                *current = next;
                true
            });
        }
    }

    fn execute(&self, command: SessionCommand) {
        let events = self.events_tx.clone();
        match command {
            SessionCommand::Connect { connection, url } => {
                let connect_timeout = self.config.connect_timeout();
                tokio::spawn(run_connection(connection, url, connect_timeout, events));
            }
            SessionCommand::ScheduleReconnect { delay } => {
                tokio::spawn(async move {
                    sleep(delay).await;
                    let _ = events.send(SessionEvent::ReconnectDue);
                });
            }
            SessionCommand::DecodePatch {
                coord,
                version,
                png_base64,
            } => {
                tokio::spawn(async move {
                    let decoded =
                        tokio::task::spawn_blocking(move || decode_tile_base64(&png_base64)).await;
                    let event = match decoded {
                        Ok(Ok(image)) => SessionEvent::PatchDecoded {
                            coord,
                            version,
                            image,
                        },
                        Ok(Err(error)) => SessionEvent::PatchDecodeFailed {
                            coord,
                            version,
                            error,
                        },
                        Err(e) => {
                            warn!(?coord, "SessionRunner: decode task failed: {}", e);
                            return;
                        }
                    };
                    let _ = events.send(event);
                });
            }
        }
    }
}

/// Own one socket for its lifetime: report open, forward inbound text,
/// write outbound text, and report the close exactly once.
///
/// A handshake that outlasts `connect_timeout` counts as a failed connect.
async fn run_connection(
    connection: ConnectionId,
    url: String,
    connect_timeout: Duration,
    events: mpsc::UnboundedSender<SessionEvent>,
) {
    let connected = match timeout(connect_timeout, connect_async(url.as_str())).await {
        Ok(Ok((ws_stream, _))) => Ok(ws_stream),
        Ok(Err(e)) => Err(SyncError::Connection(e.to_string())),
        Err(_) => Err(SyncError::Connection(format!(
            "no handshake after {connect_timeout:?}"
        ))),
    };
    let ws_stream = match connected {
        Ok(ws_stream) => ws_stream,
        Err(e) => {
            debug!(connection, "SessionRunner: connect failed: {}", e);
            let _ = events.send(SessionEvent::TransportClosed {
                connection,
                reason: Some(e.to_string()),
            });
            return;
        }
    };
    let (mut write, mut read) = ws_stream.split();

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let opened = SessionEvent::TransportOpened {
        connection,
        transport: Box::new(ChannelTransport::new(outbound_tx)),
    };
    if events.send(opened).is_err() {
        return;
    }

    let writer = tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if let Err(e) = write.send(Message::Text(text.into())).await {
                debug!(connection, "SessionRunner: write failed: {}", e);
                return;
            }
        }
        // Session dropped the transport
        let _ = write.close().await;
    });

    let mut reason = None;
    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let inbound = SessionEvent::Inbound {
                    connection,
                    text: text.as_str().to_owned(),
                };
                if events.send(inbound).is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                reason = Some(e.to_string());
                break;
            }
        }
    }

    writer.abort();
    let _ = events.send(SessionEvent::TransportClosed { connection, reason });
}
