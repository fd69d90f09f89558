pub mod config;
pub mod core;
pub mod error;
pub mod log;
pub mod snapshot;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
pub use snapshot::{BacklogSnapshot, BlockedTask};
pub use store::{DuplicatePolicy, Store, TaskFilter};
