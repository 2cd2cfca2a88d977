//! Job state management: durable SQLite persistence and the in-memory
//! snapshot store the client layer polls.

pub mod db;
pub mod store;

pub use db::JobDb;
pub use store::JobStore;
