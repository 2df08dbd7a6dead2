pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod router;
pub mod sim;
pub mod storage;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::{Dashboard, Environment};
