//! Fever risk & severity classification.
//!
//! An offline [`ml::Trainer`] fits a standardizer and two random forests on
//! patient vitals and writes them to a model directory; the HTTP API in
//! [`api`] loads them once at startup through [`ml::PredictorService`].

pub mod api;
pub mod config;
pub mod error;
pub mod ml;
pub mod telemetry;

pub use error::{AppError, Result};
