//! # Relaypost Core
//!
//! Core domain types and error definitions for the Relaypost publish
//! dispatch pipeline. This crate provides the job entity, its status
//! machine, the platform enumeration, and the unified error type used
//! across all layers.

pub mod error;
pub mod id;
pub mod job;
pub mod platform;
pub mod result;

pub use error::*;
pub use id::*;
pub use job::*;
pub use platform::*;
pub use result::*;
