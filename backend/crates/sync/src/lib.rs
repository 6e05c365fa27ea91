//! Paginated provider sync: token refresh, page walks, record mapping,
//! batched upserts and progress reporting.

pub mod appointments;
pub mod calls;
pub mod contacts;
pub mod error;
pub mod ghl;
pub mod mapper;
pub mod meta;
pub mod paginate;
pub mod progress;
pub mod token;
pub mod upsert;

pub use error::{SyncError, SyncResult};
