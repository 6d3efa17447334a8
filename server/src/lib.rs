//! # Ingress Server Library
//!
//! This library provides the network ingress for the visualiser: two
//! always-listening TCP servers that receive encrypted traffic from a remote
//! controller and hand decoded values to a single tick-driven consumer.
//!
//! ## Core Responsibilities
//!
//! ### Telemetry Ingress
//! Accepts one client streaming newline-delimited, base64-encoded,
//! AES-CBC/PKCS7 battery records (`VOLTAGE:<v>,PERCENTAGE:<p>`). Only the
//! newest percentage is kept; a reading that was never consumed is simply
//! replaced by the next one.
//!
//! ### Command Ingress
//! Accepts one client streaming 16-byte AES-CBC blocks, each holding a decimal
//! command code. Every code is queued in arrival order together with
//! operator-facing log lines. Nothing is dropped except frames that fail to
//! decrypt or parse.
//!
//! ### Tick Consumer
//! Once per frame the consumer drains both handoffs and applies their effects
//! through the [`dispatch::Collaborators`] interface, which is the only way
//! this crate touches the rest of the program.
//!
//! ## Architecture Design
//!
//! ### One Session At A Time
//! Each server's accept loop runs on its own task and spawns a session task
//! per connection, waiting for it to finish before accepting again. A peer
//! that disconnects or fails is logged and the server goes back to listening;
//! any number of reconnects is fine.
//!
//! ### Failure Containment
//! Per-frame failures (bad base64, bad padding, wrong block length, malformed
//! record, non-numeric command) drop that frame and keep the session open.
//! Read faults end the session. Only a bind failure or shutdown stops a
//! server.
//!
//! ### Shutdown
//! A single [`shutdown::Shutdown`] flag is raced against every blocking
//! accept and read, so triggering it closes the listener and any live session
//! promptly.
//!
//! ## Module Organization
//!
//! - `config`: immutable per-server configuration
//! - `framing`: newline and fixed-block stream framers
//! - `handoff`: overwrite slot and FIFO channel
//! - `shutdown`: process-wide shutdown flag
//! - `network`: accept loop, lifecycle states and the session handler
//! - `ingress`: the telemetry and command protocol bindings
//! - `dispatch`: tick consumer and command dispatch
//! - `stage`: console implementation of the collaborator interface
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::dispatch::TickConsumer;
//! use server::handoff::{fifo, OverwriteSlot};
//! use server::ingress::{CommandIngress, TelemetryIngress};
//! use server::network::IngressServer;
//! use server::shutdown::Shutdown;
//! use server::stage::ConsoleStage;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let shutdown = Shutdown::new();
//!     let slot = Arc::new(OverwriteSlot::new());
//!     let (commands_tx, commands_rx) = fifo();
//!     let (log_tx, log_rx) = fifo();
//!
//!     let telemetry_config = ServerConfig::telemetry();
//!     let command_config = ServerConfig::command();
//!     let telemetry = TelemetryIngress::new(&telemetry_config, Arc::clone(&slot));
//!     let command = CommandIngress::new(&command_config, commands_tx, log_tx);
//!
//!     let _telemetry = IngressServer::bind(&telemetry_config, telemetry, &shutdown).await?.spawn();
//!     let _command = IngressServer::bind(&command_config, command, &shutdown).await?.spawn();
//!
//!     let mut consumer = TickConsumer::new(slot, commands_rx, log_rx);
//!     let mut stage = ConsoleStage::new();
//!     loop {
//!         consumer.tick(&mut stage);
//!         tokio::time::sleep(std::time::Duration::from_millis(16)).await;
//!     }
//! }
//! ```
//!
//! ## Security Considerations
//!
//! Both links use fixed, pre-shared keys and IVs with no rotation, no message
//! authentication and no replay protection. The protocol is kept as-is for
//! compatibility with the existing controller; do not treat it as secure.

pub mod config;
pub mod dispatch;
pub mod framing;
pub mod handoff;
pub mod ingress;
pub mod network;
pub mod shutdown;
pub mod stage;
