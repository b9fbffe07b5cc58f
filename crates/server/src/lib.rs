//! WebSocket push transport for the ticker streaming service
//!
//! Bridges client connections to the distribution hub: inbound subscribe
//! messages become registrations, outbound quote channels become JSON frames.

pub mod server;

pub use server::WsServer;
