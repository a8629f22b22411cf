//! HTTP Gateway
//!
//! The host-facing surface. Chat commands and lifecycle events arrive
//! over HTTP, wager state is queryable, and settlement notices stream
//! back out over WebSocket.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod websocket;

pub use server::GatewayServer;
