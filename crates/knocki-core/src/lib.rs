//! Core types for Knocki
//!
//! This crate provides the data model mirrored from the Knocki cloud API:
//! login tokens, triggers configured on a device, and the events pushed
//! over the WebSocket.

mod event;
mod token;
mod trigger;

pub use event::{Event, EventType, EventTypeError};
pub use token::{ApiError, ErrorDocument, LoginRequest, TokenResponse};
pub use trigger::{Trigger, TriggerDetails, TriggerList};

/// User agent the Knocki backend expects from its mobile app
pub const USER_AGENT: &str = "com.knocki.mobileapp";

/// Production REST endpoint
pub const DEFAULT_BASE_URL: &str = "https://production.knocki.com";

/// Production WebSocket endpoint
pub const DEFAULT_WEBSOCKET_URL: &str = "wss://ws-production.knocki.com";

/// Default request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// REST paths relative to the base URL
pub mod paths {
    /// Exchange credentials for a token
    pub const TOKENS: &str = "tokens";

    /// Register the Home Assistant integration with the account
    pub const LINK: &str = "accounts/homeassistant/v1/link";

    /// Remove the Home Assistant integration from the account
    pub const UNLINK: &str = "accounts/homeassistant";

    /// Triggers exposed to Home Assistant
    pub const TRIGGERS: &str = "actions/homeassistant";
}
