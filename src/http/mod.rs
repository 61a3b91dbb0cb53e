// HTTP module: server and route registration.

#[path = "server/server.rs"]
pub mod server;

// Re-export server types
pub use server::HttpServer;

// Common controller interface
pub use crate::controller::Controller;
