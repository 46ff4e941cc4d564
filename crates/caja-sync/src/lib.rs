//! # caja-sync: Inventory Push Channel
//!
//! Maintains a reconnecting WebSocket connection to the backend and
//! republishes pushed stock changes to the rest of the terminal.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Inventory Sync Flow                              │
//! │                                                                         │
//! │  Backend ──► {"type":"inventory_change", product_id, new_stock}        │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │  InventoryChannel (WebSocket, reconnect, keepalive)                    │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │  ChannelEvent::InventoryChange ──► CartStore revalidates quantities    │
//! │                                                                         │
//! │  Connection loss degrades to stale stock data; the checkout wizard     │
//! │  keeps working either way.                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`channel`] - The connection task, handle and event stream
//! - [`protocol`] - JSON message types on the wire
//! - [`config`] - Channel configuration and URL construction
//! - [`error`] - Typed sync errors

pub mod channel;
pub mod config;
pub mod error;
pub mod protocol;

pub use channel::{ChannelEvent, ChannelHandle, ConnectionState, InventoryChannel};
pub use config::ChannelConfig;
pub use error::{SyncError, SyncResult};
pub use protocol::{ClientMessage, ServerMessage, SUBSCRIPTION_INVENTORY};
