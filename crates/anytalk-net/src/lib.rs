//! Blocking transport for the ASR connection: TCP+TLS with read timeouts,
//! and a minimal RFC 6455 client on top.
//!
//! The session loop multiplexes audio writes and response reads on one
//! connection by polling reads with a short timeout; the whole layer is
//! built around surfacing that timeout as a distinct would-block error
//! instead of a failure.

pub mod tls;
pub mod ws;

pub use tls::MaybeTlsStream;
pub use ws::{Frame, Opcode, WebSocket};

/// The concrete connection type used by the pool and session.
pub type WsConnection = ws::WebSocket<tls::MaybeTlsStream>;
