//! MySQL-backed job store.

mod job_store;

pub use job_store::MySqlJobStore;
