//! Application configuration from the environment

use std::path::PathBuf;

use fresco_config::SessionConfig;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "fresco=debug,fresco_sync=debug,painting=info";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub session: SessionConfig,
    /// Draw a short stroke once joined (`FRESCO_DEMO_STROKE=1`)
    pub demo_stroke: bool,
    /// Write the final mosaic and echo layers here on exit (`FRESCO_SNAPSHOT_DIR`)
    pub snapshot_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            session: SessionConfig::from_env(),
            demo_stroke: matches!(
                std::env::var("FRESCO_DEMO_STROKE").as_deref(),
                Ok("1") | Ok("true")
            ),
            snapshot_dir: std::env::var_os("FRESCO_SNAPSHOT_DIR").map(PathBuf::from),
        }
    }
}
