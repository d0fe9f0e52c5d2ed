//! Domain logic for flakelab.
//!
//! This crate is intentionally I/O-free: it does math and policy.
//! Every operation is a pure function of its inputs; the reference tables
//! (archetype profiles, cost model) are built once and never mutated.

mod classify;
mod cost;
mod recommend;
mod score;

pub use classify::{
    assess, classify_predictability, classify_severity, implementation_notes, profiles,
};
pub use cost::{CostModel, recommendation_tier};
pub use recommend::recommend;
pub use score::{ScoreWeights, score};
