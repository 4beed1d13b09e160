//! AudioTrigger core
//!
//! Platform-agnostic domain logic: sample bookkeeping, per-scene presence
//! hysteresis and the cue dispatcher. Network adapters live in the `infra` crate.

pub mod domain;
