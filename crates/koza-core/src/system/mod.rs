//! # System Module
//!
//! Time-driven system state: the life-cycle stage schedule and auto-stage
//! progression. Pure and deterministic; the caller supplies the clock.

mod stage;

pub use stage::*;
