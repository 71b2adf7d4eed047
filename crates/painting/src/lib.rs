//! Fresco painting core - stroke sampling, local echo and the tile mosaic
//!
//! This crate provides the client-side painting pieces of a shared canvas:
//! - [`brush`] - Stroke sampler turning pointer input into spaced dabs
//! - [`tip`] - Brush tip masks and their cache
//! - [`echo`] - Local echo renderer for unconfirmed strokes
//! - [`tiles`] - Authoritative versioned tiles with dirty tracking
//! - [`compositor`] - Base-layer mosaic renderer
//! - [`view`] - World/screen transform
//! - [`surface`] - CPU RGBA surface

pub mod brush;
pub mod compositor;
pub mod constants;
pub mod echo;
pub mod surface;
pub mod tiles;
pub mod tip;
pub mod types;
pub mod view;

pub use brush::*;
pub use compositor::*;
pub use constants::*;
pub use echo::*;
pub use surface::*;
pub use tiles::*;
pub use tip::*;
pub use types::*;
pub use view::*;
