//! Asynchronous client for Knocki
//!
//! Wraps the Knocki cloud API used by the Home Assistant integration:
//! logging in, linking the integration, listing triggers and receiving
//! trigger events over a WebSocket.
//!
//! # Example
//!
//! ```ignore
//! use knocki::{EventType, KnockiClient};
//!
//! let client = KnockiClient::new()?;
//! client.login("me@example.com", "password").await?;
//! client.link().await?;
//!
//! for trigger in client.get_triggers().await? {
//!     println!("{} {}", trigger.device_id, trigger.details.name);
//! }
//!
//! client.register_listener(EventType::Triggered, |event| {
//!     println!("triggered: {}", event.payload.details.name);
//! });
//! client.start_websocket().await?;
//! ```

mod client;
mod error;
mod websocket;

pub use client::{ClientBuilder, KnockiClient};
pub use error::{KnockiError, KnockiResult};

pub use knocki_config::KnockiConfig;
pub use knocki_core::{
    ApiError, ErrorDocument, Event, EventType, LoginRequest, TokenResponse, Trigger,
    TriggerDetails,
};
pub use knocki_event_bus::ListenerId;
