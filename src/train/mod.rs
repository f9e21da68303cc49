//! Training module for HMM models
//!
//! Training is a single counting pass over labeled sequences followed by
//! parameter estimation.

mod trainer;

pub use self::trainer::Trainer;
