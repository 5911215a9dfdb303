// Application Layer - Process lifecycle helpers

pub mod shutdown;

// Re-exports
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
