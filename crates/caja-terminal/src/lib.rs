//! # caja-terminal: Runtime Orchestration for Caja POS
//!
//! Wires the pure checkout core to its collaborators.
//!
//! ## Startup Sequence
//! 1. Initialize tracing ([`logging::init`])
//! 2. Load the station configuration ([`config::StationConfig`])
//! 3. Construct the backend client ([`api::BackendClient`]) - explicitly,
//!    no global singleton
//! 4. Spawn the scanner driver ([`scanner_service::ScannerService`])
//! 5. Spawn the inventory channel and feed its events into the
//!    [`store::CartStore`]
//! 6. Drive the [`checkout::CheckoutFlow`] from the UI's key events
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Terminal Runtime Wiring                            │
//! │                                                                         │
//! │  keystrokes ──► ScannerService ──► code ──► BackendClient.fetch_product │
//! │                                                  │                      │
//! │                                                  ▼                      │
//! │  wizard keys ──► CheckoutFlow ◄───────────── CartStore                  │
//! │                      │    ▲                      ▲                      │
//! │                      │    │ rates                │ stock events         │
//! │                      ▼    │                      │                      │
//! │           BackendClient.submit_sale      InventoryChannel (caja-sync)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod checkout;
pub mod config;
pub mod error;
pub mod logging;
pub mod scanner_service;
pub mod store;

pub use api::{enabled_methods, Backend, BackendClient, SaleItemRequest, SaleRequest, SaleResponse};
pub use checkout::{CheckoutFlow, FlowEvent, ScanOutcome};
pub use config::StationConfig;
pub use error::{ErrorCode, TerminalError, TerminalResult};
pub use scanner_service::ScannerService;
pub use store::CartStore;
