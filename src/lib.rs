//! Corral: a pipeline-orchestration framework for ETL-style data-collection
//! jobs, with a transactional QA harness for its processing units.

pub use crate::errors::{CorralError, Result};

pub mod config;
pub mod db;
pub mod errors;
pub mod qa;
pub mod run;
