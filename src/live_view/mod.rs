//! LiveView - Binary Image Stream
//!
//! ## Responsibilities
//!
//! - Packet framing of the live-view byte stream (decoder)
//! - Backpressure against slow consumers (flow)
//! - Stall detection and reconnect (watchdog, client)
//! - HTTP stream opening (source)

pub mod client;
pub mod decoder;
pub mod flow;
pub mod source;
pub mod watchdog;

pub use client::LiveViewClient;
pub use decoder::{DecodedImage, FrameDecoder, FrameHeader};
pub use flow::{AckHandle, FlowController, ImageFrame};
pub use source::{HttpStreamSource, LiveStream, StreamSource};
pub use watchdog::{Watchdog, WatchdogAction, WatchdogState};
