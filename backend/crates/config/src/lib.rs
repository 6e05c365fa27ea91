//! Environment-driven configuration and logging setup shared by all services.

pub mod env;
pub mod tracing_init;

pub use env::AppConfig;
pub use tracing_init::init_tracing;
