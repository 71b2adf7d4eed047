//! Fresco - collaborative painting client
//!
//! Joins a room, keeps the tile mosaic in sync and runs until Ctrl-C.

mod config;

use std::path::Path;

use fresco_sync::{
    PointerSample, SessionHandle, SessionRunner, SessionState, SessionStatus, SyncSession,
};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use config::{AppConfig, DEFAULT_LOG_FILTER};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = AppConfig::from_env();
    info!("Starting Fresco, room endpoint {}", config.session.endpoint());

    let runner = SessionRunner::new(config.session.clone());
    let handle = runner.handle();
    let status = runner.status();
    let session = tokio::spawn(runner.run());

    let watcher = tokio::spawn(report_status(status.clone()));
    if config.demo_stroke {
        tokio::spawn(demo_stroke(handle.clone(), status));
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
    }
    info!("Shutting down");
    if let Err(e) = handle.shutdown() {
        warn!("Session already stopped: {}", e);
    }

    match session.await {
        Ok(mut session) => {
            info!(
                "Left room with {} tiles, {} dabs unsent",
                session.tiles().len(),
                session.buffered()
            );
            if let Some(dir) = &config.snapshot_dir {
                write_snapshot(&mut session, dir);
            }
        }
        Err(e) => error!("Session task failed: {}", e),
    }
    watcher.abort();
}

/// Log connection state changes and server debug info
async fn report_status(mut status: watch::Receiver<SessionStatus>) {
    let mut last_state = None;
    while status.changed().await.is_ok() {
        let current = status.borrow_and_update().clone();
        if last_state != Some(current.state) {
            info!(connection = current.connection, "Session {:?}", current.state);
            last_state = Some(current.state);
        }
        if let Some(server_debug) = &current.last_debug {
            info!(port = ?server_debug.port, room = ?server_debug.room_id, tiles = current.tiles.len(), "Server");
        }
    }
}

/// Wait for the join, then draw a gentle arc
async fn demo_stroke(handle: SessionHandle, mut status: watch::Receiver<SessionStatus>) {
    if status
        .wait_for(|s| matches!(s.state, SessionState::Joining | SessionState::Active))
        .await
        .is_err()
    {
        return;
    }

    let samples: Vec<PointerSample> = (0..=40)
        .map(|i| {
            let t = i as f32 / 40.0;
            let arc = (t * std::f32::consts::PI).sin();
            PointerSample::new(100.0 + 400.0 * t, 300.0 - 120.0 * arc, 0.3 + 0.7 * t)
        })
        .collect();
    let Some((first, rest)) = samples.split_first() else {
        return;
    };

    let mut result = handle.pointer_down(vec![*first]);
    for chunk in rest.chunks(4) {
        if result.is_err() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(16)).await;
        result = handle.pointer_move(chunk.to_vec());
    }
    if result.and_then(|_| handle.pointer_up(Vec::new())).is_err() {
        warn!("Demo stroke interrupted");
        return;
    }
    info!("Demo stroke sent");
}

fn write_snapshot(session: &mut SyncSession, dir: &Path) {
    // Patches that landed after the last frame tick
    session.redraw();
    let layers = [
        ("mosaic.png", session.compositor().surface().to_rgba8()),
        ("echo.png", session.echo().surface().to_rgba8()),
    ];
    for (name, image) in layers {
        let path = dir.join(name);
        match image.save(&path) {
            Ok(()) => info!("Wrote {}", path.display()),
            Err(e) => warn!("Failed to write {}: {}", path.display(), e),
        }
    }
}
