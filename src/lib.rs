//! CoAP resources for a small sensor node, served from a sorted static resource table.
//!
//! * `/echo/` (GET, subtree) replies with the path below `/echo/`.
//! * `/sha256` (POST) hashes a payload sent whole or as a Block1 transfer.
//! * `/temp` (GET) reads a [`sensor::TemperatureSensor`].
//!
//! ```no_run
//! use coap_node::handlers::{DigestHandler, TemperatureHandler};
//! use coap_node::sensor::Unavailable;
//! use coap_node::{node, CoapServer, FatalServerError, UdpTransport};
//!
//! # async fn run() -> Result<(), FatalServerError> {
//! let server = CoapServer::bind(UdpTransport::new("0.0.0.0:5683")).await?;
//! server
//!     .serve(node::app(DigestHandler::new(), TemperatureHandler::new(Unavailable)))
//!     .await
//! # }
//! ```

pub use server::{CoapServer, FatalServerError};
pub use udp::UdpTransport;

pub mod app;
pub mod handlers;
pub mod node;
pub mod packet_handler;
pub mod sensor;
pub mod server;
pub mod transport;
pub mod udp;
