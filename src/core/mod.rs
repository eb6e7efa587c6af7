//! Core runtime components: device identity, sampling/aggregation, and
//! the periodic sampling loop.

pub mod identity;
pub mod runner;
pub mod sampler;
