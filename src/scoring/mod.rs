// src/scoring/mod.rs
//
// Pure auto-scoring engine: per-question evaluation and whole-submission
// scoring. No I/O; callers own persistence.

pub mod evaluator;
pub mod scorer;

pub use evaluator::{Verdict, evaluate};
pub use scorer::{round2, score_submission};
