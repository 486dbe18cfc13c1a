//! Deferred deletion of source copies.
//!
//! Deletion jobs are registered with an external workflow scheduler, which
//! owns their lifecycle from then on. This crate only learns whether the
//! registration was accepted.

mod deletion;
mod http;
mod types;

pub use deletion::DeferredDeletionScheduler;
pub use http::HttpFlowScheduler;
pub use types::*;
