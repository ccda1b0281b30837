//! Per-host throttle state
//!
//! This module defines the state the concurrency controller keeps for every
//! host it has seen during a run.

mod domain_state;

pub use domain_state::HostThrottle;
