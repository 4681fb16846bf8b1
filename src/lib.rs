//! # lifx_lan_rs
//!
//! An async Rust client for discovering and controlling LIFX smart lights
//! over the LAN protocol.
//!
//! LIFX devices speak a proprietary binary protocol over UDP port 56700.
//! This crate implements the client side of that protocol: the packet codec
//! for every supported message type, UDP broadcast discovery with
//! online/offline tracking, rate-limited transmission with automatic
//! retries, and a typed per-device API for the common operations.
//!
//! ## Quick Start
//!
//! ```ignore
//! use lifx_lan_rs::{Client, ClientConfig, Event};
//!
//! async fn turn_kitchen_on() -> Result<(), lifx_lan_rs::Error> {
//!     // Bind a socket and start discovering lights on the local network.
//!     let client = Client::init(ClientConfig::default()).await?;
//!
//!     let mut events = client.subscribe();
//!     while let Ok(event) = events.recv().await {
//!         if let Event::Discovered(device) = event {
//!             let light = client.light(&device.id)?;
//!             light.turn_on(500).await?;
//!             break;
//!         }
//!     }
//!     client.destroy();
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Discovery**: periodic UDP broadcast (and optional direct probes to
//!   known addresses) with configurable offline hysteresis
//! - **Reliable requests**: sequence-correlated replies, bounded retries,
//!   and exactly-once resolution against two independent deadlines
//! - **Rate limiting**: a global minimum spacing between transmissions, so
//!   bursts queue instead of overwhelming the bulbs
//! - **Full codec**: device, light, multizone, tile and relay messages,
//!   with bit-exact round-trips
//! - **Capability table**: static vendor/product lookup for feature flags
//!   via [`products::lookup`]
//!
//! ## Communication
//!
//! All communication occurs over UDP; there is no encryption or
//! authentication in the protocol. The client binds one socket (any-address,
//! ephemeral port by default) and stamps every outgoing packet with a stable
//! 32-bit source id so it can recognize replies to its own broadcasts.

mod client;
mod color;
mod device;
mod dispatcher;
mod errors;
mod event;
mod light;
pub mod packet;
pub mod products;
mod queue;

// Re-export public API
pub use client::{Client, ClientConfig, SendOptions};
pub use color::{HsbColor, parse_rgb_hex, rgb_to_hsb};
pub use device::{Device, DeviceStatus};
pub use dispatcher::HandlerId;
pub use errors::Error;
pub use event::Event;
pub use light::{
    DeviceChain, FirmwareVersion, HardwareVersion, Light, LightColor, LightState, Power,
    SignalInfo, TileState, ZoneState,
};
pub use packet::{
    ApplicationRequest, Header, Hsbk, MessageKind, MoveDirection, MultiZoneEffect, Packet,
    PacketOptions, Payload, Tile, Waveform,
};
