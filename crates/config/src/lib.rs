//! Shared configuration for Fresco
//!
//! Single source of truth for display dimensions and session settings.
//! Values come from defaults, overridden by `FRESCO_*` environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default surface width in logical pixels
pub const DEFAULT_WIDTH: u32 = 1280;

/// Default surface height in logical pixels
pub const DEFAULT_HEIGHT: u32 = 720;

/// Default device pixel ratio (1.0 = no scaling)
pub const DEFAULT_DEVICE_PIXEL_RATIO: f32 = 1.0;

/// Default room server
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:3000";

/// Default room id
pub const DEFAULT_ROOM: &str = "default";

/// Outbound dab batching window
pub const DEFAULT_BATCH_INTERVAL_MS: u64 = 12;

/// Compositor frame pacing
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

/// Delay before reconnecting after a close
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1000;

/// Give up on a connect attempt whose handshake takes longer than this
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Cap for exponential reconnect backoff
pub const DEFAULT_RECONNECT_MAX_DELAY_MS: u64 = 30_000;

/// Display configuration for the echo and mosaic surfaces
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Width in logical pixels
    pub width: u32,
    /// Height in logical pixels
    pub height: u32,
    /// Physical pixels per logical pixel
    pub device_pixel_ratio: f32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            device_pixel_ratio: DEFAULT_DEVICE_PIXEL_RATIO,
        }
    }
}

impl DisplayConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio: DEFAULT_DEVICE_PIXEL_RATIO,
        }
    }

    /// Width in physical pixels
    pub fn physical_width(&self) -> u32 {
        (self.width as f32 * self.device_pixel_ratio).floor() as u32
    }

    /// Height in physical pixels
    pub fn physical_height(&self) -> u32 {
        (self.height as f32 * self.device_pixel_ratio).floor() as u32
    }
}

/// How long to wait before reconnecting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackoffMode {
    /// Same delay every time
    #[default]
    Flat,
    /// Doubling delay, capped, reset after a successful connect
    Exponential,
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Base server URL, e.g. `ws://host:3000`
    pub server_url: String,
    /// Room to join; `None` lets the server pick one
    pub room_id: Option<String>,
    pub batch_interval_ms: u64,
    pub frame_interval_ms: u64,
    pub reconnect_delay_ms: u64,
    pub reconnect_max_delay_ms: u64,
    pub connect_timeout_ms: u64,
    pub backoff: BackoffMode,
    pub display: DisplayConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            room_id: Some(DEFAULT_ROOM.to_string()),
            batch_interval_ms: DEFAULT_BATCH_INTERVAL_MS,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            reconnect_max_delay_ms: DEFAULT_RECONNECT_MAX_DELAY_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            backoff: BackoffMode::Flat,
            display: DisplayConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("FRESCO_SERVER_URL") {
            config.server_url = url;
        }
        if let Some(room) = lookup("FRESCO_ROOM") {
            // An empty room lets the server allocate one
            config.room_id = (!room.is_empty()).then_some(room);
        }
        if let Some(ms) = parse_ms(&lookup, "FRESCO_BATCH_MS") {
            config.batch_interval_ms = ms.max(1);
        }
        if let Some(ms) = parse_ms(&lookup, "FRESCO_RECONNECT_MS") {
            config.reconnect_delay_ms = ms;
        }
        if let Some(ms) = parse_ms(&lookup, "FRESCO_CONNECT_TIMEOUT_MS") {
            config.connect_timeout_ms = ms;
        }
        match lookup("FRESCO_BACKOFF").as_deref() {
            Some("exponential") => config.backoff = BackoffMode::Exponential,
            Some("flat") | None => {}
            Some(other) => warn!("Unknown FRESCO_BACKOFF {:?}, using flat", other),
        }
        config
    }

    /// Room-scoped endpoint: `<server>/ws/<room>` or `<server>/ws`
    pub fn endpoint(&self) -> String {
        let base = self.server_url.trim_end_matches('/');
        match &self.room_id {
            Some(room) => format!("{base}/ws/{room}"),
            None => format!("{base}/ws"),
        }
    }

    /// Never zero, whatever was deserialized
    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.batch_interval_ms.max(1))
    }

    /// Never zero, whatever was deserialized
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms.max(1))
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn reconnect_max_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_delay_ms)
    }
}

fn parse_ms(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(ms) => Some(ms),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a millisecond count", key, raw);
            None
        }
    }
}
