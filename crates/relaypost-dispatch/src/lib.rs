//! # Relaypost Dispatch
//!
//! The publish pipeline: everything between an accepted submission and a
//! delivered (or abandoned) post.
//!
//! ```text
//! submit ──► SafetyGate ──► JobStore (pending) ──► DispatchQueue
//!                                                      │ one at a time
//!                                                      ▼
//!                                               PlatformRouter
//!                                                      │ one attempt
//!                                                      ▼
//!                                              PublishAdapter (HTTP)
//!
//! failed rows ──► RetrySweeper ──► CAS requeue ──► DispatchQueue
//! ```
//!
//! Delivery failures are classified into an enumerated [`FailureKind`];
//! retry timing is the pure [`BackoffPolicy`]; crash recovery and retry
//! admission both go through the store's compare-and-swap.

pub mod adapters;
pub mod backoff;
pub mod failure;
pub mod gate;
pub mod idempotency;
pub mod metrics;
pub mod queue;
pub mod router;
pub mod sweep;

#[cfg(test)]
mod test_support;

pub use adapters::HttpConnectorAdapter;
pub use backoff::BackoffPolicy;
pub use failure::{FailureKind, PublishFailure};
pub use gate::{GateDecision, GateFlags, SafetyGate};
pub use idempotency::idempotency_key;
pub use metrics::{register_metrics, DispatchMetrics};
pub use queue::{DispatchQueue, QueueHandle, SubmitOutcome, SubmitRequest};
pub use router::{PlatformRouter, PublishAdapter, PublishReceipt};
pub use sweep::{RetrySweeper, SweepReport};
