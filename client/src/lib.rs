//! # Remote Controller Library
//!
//! The sending side of both ingress protocols. The visualiser server only
//! listens; everything it displays arrives from a controller built on this
//! crate.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! A reconnecting TCP [`network::Link`] plus a queued [`network::Outbox`].
//! Connect and write failures drop the socket and retry the same frame after
//! a fixed back-off, so frames are never reordered.
//!
//! ### Controller Module (`controller`)
//! Typed senders on top of a link: [`controller::CommandSender`] encrypts
//! command codes into 16-byte blocks and [`controller::TelemetrySender`]
//! encrypts battery readings into base64 lines.
//!
//! ### Battery Module (`battery`)
//! A random-walk battery used by the `simulate` subcommand.
//!
//! ### Relay Module (`relay`)
//! Parses the classifier's JSON payloads (`{"prediction": 5}`) into command
//! codes.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::controller::CommandSender;
//! use client::network::Link;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), client::ClientError> {
//!     let link = Link::new("command server", "127.0.0.1:6000".parse().unwrap());
//!     let mut sender = CommandSender::new(link);
//!     sender.send(5).await?;
//!     sender.close().await;
//!     Ok(())
//! }
//! ```

pub mod battery;
pub mod controller;
pub mod network;
pub mod relay;

use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{name} at {addr} unreachable after {attempts} attempts")]
    Unreachable {
        name: &'static str,
        addr: SocketAddr,
        attempts: u32,
    },
    #[error("outbox closed")]
    Closed,
    #[error(transparent)]
    Encode(#[from] shared::EncodeError),
    #[error(transparent)]
    Relay(#[from] relay::RelayError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
