//! camremote Library
//!
//! Remote control for Wi-Fi cameras speaking the Camera Remote JSON-RPC API
//!
//! ## Architecture (7 Components)
//!
//! 1. RpcChannel - Control round trips to the device
//! 2. EventHub - Event fan-out to subscribers
//! 3. LiveView - Frame decoding, backpressure, stall watchdog
//! 4. SettingsRegistry - Write-through settings with refresh suppression
//! 5. StateSynchronizer - getEvent polling and slot decoding
//! 6. Camera - Facade wiring the above together
//! 7. Config - Environment-driven tuning
//!
//! ## Design Principles
//!
//! - The device is the source of truth; local state is a mirror
//! - Device-reported values are never written back
//! - Live view prefers the newest frame over a complete sequence

pub mod camera;
pub mod config;
pub mod error;
pub mod event_hub;
pub mod event_sync;
pub mod live_view;
pub mod rpc_channel;
pub mod settings;

#[cfg(test)]
pub(crate) mod test_support;

pub use camera::Camera;
pub use config::AppConfig;
pub use error::{Error, Result};
pub use event_hub::{CameraEvent, ChangeSet};
