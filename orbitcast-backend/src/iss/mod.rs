///! ISS position feed - upstream client, broadcast loop and connection tracking
pub mod api_client;
pub mod broadcaster;
pub mod registry;
pub mod types;

// Re-export the types the rest of the crate works with
pub use api_client::{IssApiClient, PositionSource};
pub use broadcaster::PositionBroadcaster;
pub use registry::ConnectionRegistry;
pub use types::PositionReport;
