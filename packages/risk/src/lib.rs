#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Wildfire risk scoring pipeline.
//!
//! Given an assembled [`terra_insight_risk_models::FeatureMapping`], the
//! [`report::RiskAssessor`] runs model inference, the four heuristic
//! component scorers, the recommendation rules and the single-shot spread
//! estimate, and combines them into one
//! [`terra_insight_risk_models::RiskReport`].

pub mod heuristics;
pub mod recommendations;
pub mod report;
pub mod spread;

use terra_insight_model::ModelError;
use thiserror::Error;

/// Errors that can occur while scoring a property.
#[derive(Debug, Error)]
pub enum RiskError {
    /// Model inference failed.
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// An argument was outside its accepted range.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of what went wrong.
        message: String,
    },
}
