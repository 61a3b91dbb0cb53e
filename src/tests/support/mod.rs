// Shared helpers for integration cases: in-process service and stub upstream.

pub mod service;
pub mod upstream;

pub use service::TestService;
pub use upstream::UpstreamServer;

/// Master token wired into the test configuration.
pub const MASTER_TOKEN: &str = "test-master-token-0123456789";
