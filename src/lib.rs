pub mod config;
pub mod error;
pub mod kernel;
pub mod services;

// Re-export specific items for convenient access
pub use config::CaptureConfig;
pub use error::{CaptureError, CaptureResult};
pub use kernel::controller::CaptureController;
pub use kernel::reactor::{event_channel, Backends, CaptureHandle, Reactor};
