pub mod client;
pub mod models;
pub mod session;
pub mod token;

pub use client::{GhlClient, GhlClientConfig};
pub use session::{resolve_session, GhlSession};
pub use token::GhlTokenExchanger;
