//! # Relaypost Store
//!
//! Durable job store for the publish dispatch pipeline:
//!
//! ```text
//! DispatchQueue / RetrySweeper
//!   ↓  Arc<dyn JobStore>   (persistence contract)
//! MySqlJobStore             (MySQL / SQLx)
//!   ↓
//! MySQL (publish_jobs)
//! ```
//!
//! The compare-and-swap requeue is the cross-process coordination point:
//! overlapping recovery sweeps must never both requeue the same job.

pub mod mysql;
pub mod pool;
pub mod traits;

pub use mysql::*;
pub use pool::*;
pub use traits::*;
