//! # Channel Protocol Messages
//!
//! JSON message types on the inventory push channel.
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Inventory Channel Messages                            │
//! │                                                                         │
//! │  SUBSCRIPTION (once per successful connect)                            │
//! │  ──────────────────────────────────────────                            │
//! │  Terminal ───► {"type":"subscribe","subscription_types":[...]}         │
//! │                                                                         │
//! │  KEEPALIVE (periodic while connected)                                  │
//! │  ────────────────────────────────────                                  │
//! │  Terminal ───► {"type":"ping","timestamp":"..."}                       │
//! │  Backend  ───► {"type":"pong", ...}                                    │
//! │                                                                         │
//! │  STOCK PUSH                                                            │
//! │  ──────────                                                            │
//! │  Backend  ───► {"type":"inventory_change","product_id":"...",          │
//! │                 "new_stock":4,"reason":"sale"}                         │
//! │                                                                         │
//! │  ERROR                                                                 │
//! │  ─────                                                                 │
//! │  Backend  ───► {"type":"error","code":"...","message":"..."}           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Messages are serialized as internally tagged JSON (`"type"` field,
//! snake_case). Unknown or malformed inbound messages are logged and
//! dropped by the channel; they never tear the connection down.

use serde::{Deserialize, Serialize};

use caja_core::types::{InventoryChangeEvent, StockChangeReason};

/// Subscription type for stock pushes.
pub const SUBSCRIPTION_INVENTORY: &str = "inventory_change";

// =============================================================================
// Outbound Messages (terminal → backend)
// =============================================================================

/// Messages the terminal sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscription request, sent once per successful connect.
    Subscribe { subscription_types: Vec<String> },

    /// Keepalive ping.
    Ping { timestamp: String },
}

impl ClientMessage {
    /// The standard inventory subscription.
    pub fn subscribe_inventory() -> Self {
        ClientMessage::Subscribe {
            subscription_types: vec![SUBSCRIPTION_INVENTORY.to_string()],
        }
    }

    /// A ping stamped with the current wall-clock time.
    pub fn ping() -> Self {
        ClientMessage::Ping {
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Returns the message type name as a string (for logging).
    pub fn type_name(&self) -> &'static str {
        match self {
            ClientMessage::Subscribe { .. } => "subscribe",
            ClientMessage::Ping { .. } => "ping",
        }
    }

    /// Serializes to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// =============================================================================
// Inbound Messages (backend → terminal)
// =============================================================================

/// Messages the backend pushes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A stock level changed somewhere in the branch.
    InventoryChange {
        product_id: String,
        new_stock: i64,
        #[serde(default)]
        reason: StockChangeReason,
    },

    /// Keepalive response.
    Pong {
        #[serde(default)]
        timestamp: Option<String>,
    },

    /// Backend-reported error.
    Error { code: String, message: String },
}

impl ServerMessage {
    /// Returns the message type name as a string (for logging).
    pub fn type_name(&self) -> &'static str {
        match self {
            ServerMessage::InventoryChange { .. } => "inventory_change",
            ServerMessage::Pong { .. } => "pong",
            ServerMessage::Error { .. } => "error",
        }
    }

    /// Deserializes from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Converts a stock push into the domain event the cart consumes.
    pub fn into_inventory_event(self) -> Option<InventoryChangeEvent> {
        match self {
            ServerMessage::InventoryChange {
                product_id,
                new_stock,
                reason,
            } => Some(InventoryChangeEvent {
                product_id,
                new_stock,
                reason,
            }),
            _ => None,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
