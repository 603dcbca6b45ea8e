pub mod error;
pub mod traits;
pub mod types;

pub use error::NestError;
pub use traits::Tool;
pub use types::{new_idempotency_key, AnnounceTarget, CleanupMode, Lane};
