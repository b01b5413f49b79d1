//! Timed subtitle overlay for embedded video players.
//!
//! Raw SRT/WebVTT-style text is parsed into [`entry::EntrySet`]s, the
//! [`sync::SyncEngine`] picks the entry for the player's current position and
//! offset, and [`render`] turns that into the surface drawn over the video.
//! [`overlay::Overlay`] ties these to a [`platform::PlatformAdapter`] and a
//! [`render::RenderTarget`]; [`control::Controller`] feeds it control messages.

pub mod config;
pub mod control;
pub mod entry;
pub mod error;
pub mod overlay;
pub mod parser;
pub mod platform;
pub mod render;
pub mod sync;
pub mod timestamp;
