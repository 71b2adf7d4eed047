//! Room session state machine
//!
//! `SyncSession` owns every piece of client state (tiles, echo layer,
//! sampler, outbound buffer) and advances only through [`SyncSession::handle`].
//! Anything that has to wait (sockets, timers, raster decode) is returned as a
//! [`SessionCommand`] for the runner to perform, and comes back later as a
//! [`SessionEvent`]. Handlers run to completion one at a time, so none of the
//! state needs locking.

use std::time::Duration;

use fresco_config::{DisplayConfig, SessionConfig};
use fresco_ipc::{ClientMessage, KnownVersions, ServerMessage, encode_tile_key};
use image::RgbaImage;
use painting::{
    Compositor, Dab, LocalEchoRenderer, Point, SamplerParams, StrokeSampler, TileCoord, TileError,
    TileStore, ToolMode, ViewTransform, dabs_from_floats,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dispatcher::{BatchDispatcher, FlushOutcome};
use crate::reconnect::ReconnectPolicy;
use crate::transport::Outbound;

/// Identifies one connection attempt. Events from older attempts are ignored.
pub type ConnectionId = u64;

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    /// Join sent, waiting for the server to catch us up
    Joining,
    Active,
}

/// Server metadata from the last `debug` message
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DebugInfo {
    pub port: Option<u16>,
    pub room_id: Option<String>,
}

/// One coalesced pointer sample in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    pub x: f32,
    pub y: f32,
    pub pressure: f32,
}

impl PointerSample {
    pub fn new(x: f32, y: f32, pressure: f32) -> Self {
        Self { x, y, pressure }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
}

/// Everything that can happen to a session
#[derive(Debug)]
pub enum SessionEvent {
    Start,
    TransportOpened {
        connection: ConnectionId,
        transport: Box<dyn Outbound>,
    },
    /// Connect failure, abrupt close and clean close all land here
    TransportClosed {
        connection: ConnectionId,
        reason: Option<String>,
    },
    Inbound {
        connection: ConnectionId,
        text: String,
    },
    PatchDecoded {
        coord: TileCoord,
        version: u64,
        image: RgbaImage,
    },
    PatchDecodeFailed {
        coord: TileCoord,
        version: u64,
        error: TileError,
    },
    /// Batching timer
    Tick,
    /// Compositor pacing
    Frame,
    Pointer {
        phase: PointerPhase,
        samples: Vec<PointerSample>,
    },
    SetTool(ToolMode),
    ViewChanged(ViewTransform),
    SurfaceResized(DisplayConfig),
    ReconnectDue,
    Shutdown,
}

/// Side effects requested by the session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Connect {
        connection: ConnectionId,
        url: String,
    },
    ScheduleReconnect {
        delay: Duration,
    },
    /// Decode off the event loop, then report back with
    /// `PatchDecoded` or `PatchDecodeFailed`
    DecodePatch {
        coord: TileCoord,
        version: u64,
        png_base64: String,
    },
}

pub struct SyncSession {
    state: SessionState,
    endpoint: String,
    room_id: Option<String>,
    display: DisplayConfig,

    tiles: TileStore,
    echo: LocalEchoRenderer,
    compositor: Compositor,
    sampler: StrokeSampler,
    dispatcher: BatchDispatcher,
    view: ViewTransform,
    tool: ToolMode,
    pointer_down: bool,

    connection: ConnectionId,
    transport: Option<Box<dyn Outbound>>,
    joined: Option<ConnectionId>,
    reconnect: ReconnectPolicy,
    shutting_down: bool,
    last_debug: Option<DebugInfo>,
}

impl SyncSession {
    pub fn new(config: &SessionConfig) -> Self {
        let display = config.display;
        let (width, height) = (display.physical_width(), display.physical_height());
        Self {
            state: SessionState::Disconnected,
            endpoint: config.endpoint(),
            room_id: config.room_id.clone(),
            display,
            tiles: TileStore::new(),
            echo: LocalEchoRenderer::new(width, height),
            compositor: Compositor::new(width, height),
            sampler: StrokeSampler::new(SamplerParams::default()),
            dispatcher: BatchDispatcher::new(),
            view: ViewTransform::default(),
            tool: ToolMode::Normal,
            pointer_down: false,
            connection: 0,
            transport: None,
            joined: None,
            reconnect: ReconnectPolicy::from_config(config),
            shutting_down: false,
            last_debug: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub fn tiles(&self) -> &TileStore {
        &self.tiles
    }

    pub fn echo(&self) -> &LocalEchoRenderer {
        &self.echo
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    /// Bring the mosaic up to date now instead of waiting for the next
    /// frame. Returns the number of tiles drawn, or `None` if nothing changed.
    pub fn redraw(&mut self) -> Option<usize> {
        self.compositor.redraw(&mut self.tiles, &self.view)
    }

    pub fn tool(&self) -> ToolMode {
        self.tool
    }

    pub fn display(&self) -> &DisplayConfig {
        &self.display
    }

    /// Dabs waiting for the next flush
    pub fn buffered(&self) -> usize {
        self.dispatcher.len()
    }

    pub fn is_pointer_down(&self) -> bool {
        self.pointer_down
    }

    pub fn last_debug(&self) -> Option<&DebugInfo> {
        self.last_debug.as_ref()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    /// Advance the state machine by one event
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionCommand> {
        match event {
            SessionEvent::Start | SessionEvent::ReconnectDue => self.connect(),
            SessionEvent::TransportOpened {
                connection,
                transport,
            } => {
                self.on_open(connection, transport);
                Vec::new()
            }
            SessionEvent::TransportClosed { connection, reason } => {
                self.on_close(connection, reason)
            }
            SessionEvent::Inbound { connection, text } => self.on_inbound(connection, &text),
            SessionEvent::PatchDecoded {
                coord,
                version,
                image,
            } => {
                // Re-checked here: a newer patch may have landed while this one decoded
                self.tiles.apply_image(coord, version, image);
                Vec::new()
            }
            SessionEvent::PatchDecodeFailed {
                coord,
                version,
                error,
            } => {
                warn!(
                    ?coord,
                    version, "SyncSession: dropping undecodable patch: {}", error
                );
                Vec::new()
            }
            SessionEvent::Tick => {
                if self.pointer_down {
                    self.flush();
                }
                Vec::new()
            }
            SessionEvent::Frame => {
                if let Some(drawn) = self.redraw() {
                    debug!("SyncSession: redrew mosaic, {} tiles", drawn);
                }
                Vec::new()
            }
            SessionEvent::Pointer { phase, samples } => {
                self.on_pointer(phase, &samples);
                Vec::new()
            }
            SessionEvent::SetTool(tool) => {
                self.set_tool(tool);
                Vec::new()
            }
            SessionEvent::ViewChanged(view) => {
                self.view = view;
                // Predictions are in screen space and would be misplaced
                self.echo.clear();
                self.compositor.invalidate();
                Vec::new()
            }
            SessionEvent::SurfaceResized(display) => {
                self.resize(display);
                Vec::new()
            }
            SessionEvent::Shutdown => {
                self.shutdown();
                Vec::new()
            }
        }
    }

    fn connect(&mut self) -> Vec<SessionCommand> {
        if self.shutting_down || self.state != SessionState::Disconnected {
            return Vec::new();
        }
        self.connection += 1;
        self.state = SessionState::Connecting;
        info!(
            connection = self.connection,
            "SyncSession: connecting to {}", self.endpoint
        );
        vec![SessionCommand::Connect {
            connection: self.connection,
            url: self.endpoint.clone(),
        }]
    }

    fn on_open(&mut self, connection: ConnectionId, mut transport: Box<dyn Outbound>) {
        if self.shutting_down
            || connection != self.connection
            || self.state != SessionState::Connecting
        {
            debug!(connection, "SyncSession: dropping transport from stale attempt");
            return;
        }
        self.reconnect.reset();

        if self.joined != Some(connection) {
            let join = ClientMessage::Join {
                room_id: self.room_id.clone(),
                known: self.known_versions(),
            };
            if let Err(e) = transport.send(&join) {
                warn!(connection, "SyncSession: failed to send join: {}", e);
            }
            self.joined = Some(connection);
        }

        self.transport = Some(transport);
        self.state = SessionState::Joining;
        info!(
            connection,
            known = self.tiles.len(),
            "SyncSession: joined room {:?}",
            self.room_id
        );
    }

    fn on_close(&mut self, connection: ConnectionId, reason: Option<String>) -> Vec<SessionCommand> {
        if connection != self.connection || self.state == SessionState::Disconnected {
            return Vec::new();
        }
        self.transport = None;
        self.state = SessionState::Disconnected;
        if self.shutting_down {
            return Vec::new();
        }

        let delay = self.reconnect.next_delay();
        match reason {
            Some(reason) => warn!(
                connection,
                "SyncSession: connection lost ({}), retrying in {:?}", reason, delay
            ),
            None => info!(
                connection,
                "SyncSession: connection closed, retrying in {:?}", delay
            ),
        }
        vec![SessionCommand::ScheduleReconnect { delay }]
    }

    fn on_inbound(&mut self, connection: ConnectionId, text: &str) -> Vec<SessionCommand> {
        if connection != self.connection || self.transport.is_none() {
            return Vec::new();
        }
        if self.state == SessionState::Joining {
            self.state = SessionState::Active;
        }

        let message = match ServerMessage::from_json(text) {
            Ok(message) => message,
            Err(e) => {
                debug!("SyncSession: ignoring malformed message: {}", e);
                return Vec::new();
            }
        };

        match message {
            ServerMessage::TilePatch {
                tx,
                ty,
                version,
                png_base64,
            } => {
                let coord = TileCoord::new(tx, ty);
                if self.tiles.is_stale(coord, version) {
                    debug!(?coord, version, "SyncSession: stale patch, not decoding");
                    return Vec::new();
                }
                return vec![SessionCommand::DecodePatch {
                    coord,
                    version,
                    png_base64,
                }];
            }
            ServerMessage::Dabs(payload) => {
                if let Err(e) = payload.validate() {
                    debug!("SyncSession: ignoring peer dabs: {}", e);
                    return Vec::new();
                }
                let dabs = dabs_from_floats(&payload.dabs).unwrap_or_default();
                let tool = ToolMode::from_wire(payload.tool);
                self.echo.paint(&dabs, tool, &self.view);
            }
            ServerMessage::Debug { port, room_id } => {
                info!(?port, ?room_id, "SyncSession: server debug");
                self.last_debug = Some(DebugInfo { port, room_id });
            }
            ServerMessage::Unknown => {
                debug!("SyncSession: ignoring unknown message type");
            }
        }
        Vec::new()
    }

    fn on_pointer(&mut self, phase: PointerPhase, samples: &[PointerSample]) {
        let world: Vec<(Point, f32)> = samples
            .iter()
            .map(|s| (self.view.screen_to_world(Point::new(s.x, s.y)), s.pressure))
            .collect();

        match phase {
            PointerPhase::Down => {
                let Some((&(first, pressure), rest)) = world.split_first() else {
                    return;
                };
                if self.pointer_down {
                    // Missed the previous up
                    self.end_stroke();
                }
                self.pointer_down = true;
                let mut dabs = vec![self.sampler.begin(first, pressure)];
                dabs.extend(self.sampler.extend_all(rest.iter().copied()));
                self.emit(dabs);
            }
            PointerPhase::Move => {
                if !self.pointer_down {
                    return;
                }
                let dabs = self.sampler.extend_all(world);
                self.emit(dabs);
            }
            PointerPhase::Up => {
                if !self.pointer_down {
                    return;
                }
                let dabs = self.sampler.extend_all(world);
                self.emit(dabs);
                self.end_stroke();
            }
        }
    }

    /// Local dabs: painted now, sent on the next flush
    fn emit(&mut self, dabs: Vec<Dab>) {
        if dabs.is_empty() {
            return;
        }
        self.echo.paint(&dabs, self.tool, &self.view);
        self.dispatcher.extend(dabs);
    }

    fn end_stroke(&mut self) {
        self.flush();
        self.sampler.end();
        self.pointer_down = false;
    }

    fn flush(&mut self) {
        match self.dispatcher.flush(self.transport.as_deref_mut(), self.tool) {
            Ok(FlushOutcome::Sent(dabs)) => {
                self.echo.paint(&dabs, self.tool, &self.view);
            }
            Ok(FlushOutcome::Discarded(count)) => {
                debug!("SyncSession: offline, dropped {} dabs", count);
            }
            Ok(FlushOutcome::Empty) => {}
            Err(e) => warn!("SyncSession: failed to send dabs: {}", e),
        }
    }

    fn set_tool(&mut self, tool: ToolMode) {
        if tool == self.tool {
            return;
        }
        // Buffered dabs belong to the old tool
        if self.pointer_down {
            self.flush();
        }
        debug!("SyncSession: tool {:?} -> {:?}", self.tool, tool);
        self.tool = tool;
    }

    fn resize(&mut self, display: DisplayConfig) {
        self.display = display;
        let (width, height) = (display.physical_width(), display.physical_height());
        self.echo.reset_surface(width, height);
        self.compositor.resize(width, height);
        info!("SyncSession: surface resized to {}x{}", width, height);
    }

    fn shutdown(&mut self) {
        if self.shutting_down {
            return;
        }
        self.shutting_down = true;
        if self.pointer_down {
            self.end_stroke();
        }
        self.transport = None;
        self.state = SessionState::Disconnected;
        info!("SyncSession: shut down");
    }

    /// Tile versions held locally, keyed for the join handshake
    pub fn known_versions(&self) -> KnownVersions {
        self.tiles
            .known_versions()
            .into_iter()
            .map(|(coord, version)| (encode_tile_key(coord.tx, coord.ty), version))
            .collect()
    }
}
